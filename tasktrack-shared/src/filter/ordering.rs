/// Task list ordering
///
/// Without an `ordering` parameter, tasks are listed incomplete first, then
/// newest `creation_time`, then newest `updated_at`. Clients may override this
/// with `?ordering=creation_time`, `?ordering=-updated_at`, or a comma-separated
/// combination. Unknown fields are dropped; if nothing valid remains the
/// default applies. Task id is always the final tie-breaker so pages are stable.

use std::cmp::Ordering;

use crate::models::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Completed,
    CreationTime,
    UpdatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Completed => "completed",
            SortField::CreationTime => "creation_time",
            SortField::UpdatedAt => "updated_at",
        }
    }

    /// Fields a client may order by
    fn from_client(name: &str) -> Option<Self> {
        match name {
            "creation_time" => Some(SortField::CreationTime),
            "updated_at" => Some(SortField::UpdatedAt),
            _ => None,
        }
    }

    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortField::Completed => a.completed.cmp(&b.completed),
            SortField::CreationTime => a.creation_time.cmp(&b.creation_time),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub const fn asc(field: SortField) -> Self {
        Self { field, descending: false }
    }

    pub const fn desc(field: SortField) -> Self {
        Self { field, descending: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOrdering {
    keys: Vec<SortKey>,
}

impl Default for TaskOrdering {
    fn default() -> Self {
        Self {
            keys: vec![
                SortKey::asc(SortField::Completed),
                SortKey::desc(SortField::CreationTime),
                SortKey::desc(SortField::UpdatedAt),
            ],
        }
    }
}

impl TaskOrdering {
    /// Parses the `ordering` query parameter
    pub fn from_param(raw: Option<&str>) -> Self {
        let keys: Vec<SortKey> = raw
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter_map(|term| {
                let (descending, name) = match term.strip_prefix('-') {
                    Some(name) => (true, name),
                    None => (false, term),
                };
                SortField::from_client(name).map(|field| SortKey { field, descending })
            })
            .collect();

        if keys.is_empty() {
            Self::default()
        } else {
            Self { keys }
        }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// `ORDER BY` body built only from fixed column names
    pub fn to_sql(&self) -> String {
        let mut terms: Vec<String> = self
            .keys
            .iter()
            .map(|key| {
                format!(
                    "{} {}",
                    key.field.column(),
                    if key.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();
        terms.push("id ASC".to_string());
        terms.join(", ")
    }

    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        self.keys
            .iter()
            .map(|key| {
                let ordering = key.field.compare(a, b);
                if key.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }

    /// Sorts a slice in place
    pub fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn task(description: &str, completed: bool, age_minutes: i64) -> Task {
        let created = Utc::now() - Duration::minutes(age_minutes);
        Task {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            description: description.to_string(),
            completed,
            creation_time: created,
            updated_at: created,
        }
    }

    fn descriptions(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.description.as_str()).collect()
    }

    #[test]
    fn test_default_puts_open_tasks_first_then_newest() {
        let mut tasks = vec![
            task("old open", false, 30),
            task("new done", true, 1),
            task("new open", false, 5),
            task("old done", true, 60),
        ];
        TaskOrdering::default().sort(&mut tasks);
        assert_eq!(
            descriptions(&tasks),
            vec!["new open", "old open", "new done", "old done"]
        );
    }

    #[test]
    fn test_client_ordering_replaces_default() {
        let mut tasks = vec![
            task("b", true, 10),
            task("a", false, 20),
            task("c", false, 5),
        ];
        TaskOrdering::from_param(Some("creation_time")).sort(&mut tasks);
        assert_eq!(descriptions(&tasks), vec!["a", "b", "c"]);

        TaskOrdering::from_param(Some("-creation_time")).sort(&mut tasks);
        assert_eq!(descriptions(&tasks), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_unknown_fields_fall_back_to_default() {
        assert_eq!(TaskOrdering::from_param(Some("description")), TaskOrdering::default());
        assert_eq!(TaskOrdering::from_param(Some("")), TaskOrdering::default());
        assert_eq!(TaskOrdering::from_param(None), TaskOrdering::default());

        let mixed = TaskOrdering::from_param(Some("password, -updated_at"));
        assert_eq!(mixed.keys(), [SortKey::desc(SortField::UpdatedAt)]);
    }

    #[test]
    fn test_to_sql() {
        assert_eq!(
            TaskOrdering::default().to_sql(),
            "completed ASC, creation_time DESC, updated_at DESC, id ASC"
        );
        assert_eq!(
            TaskOrdering::from_param(Some("updated_at,-creation_time")).to_sql(),
            "updated_at ASC, creation_time DESC, id ASC"
        );
    }
}
