/// Permission checks
///
/// Policies are plain predicates over a [`Principal`], a target and an
/// [`Action`]:
///
/// - **Tasks**: only the owner may read, update or delete a task. Staff get
///   no override.
/// - **Profiles**: staff may act on any profile; everybody else only on their
///   own.
/// - **User listing**: staff and superusers see every account, everybody else
///   sees only themselves.
///
/// The `authorize_*` wrappers turn a denial into the error the API reports.
/// A denied task is indistinguishable from a missing one, so task denials
/// come back as [`AuthzError::NotFound`].
///
/// # Example
///
/// ```
/// use tasktrack_shared::auth::authorization::{can_access_profile, Action};
/// use tasktrack_shared::auth::principal::Principal;
/// use uuid::Uuid;
///
/// let me = Principal {
///     id: Uuid::new_v4(),
///     username: "alice".into(),
///     is_staff: false,
///     is_superuser: false,
/// };
///
/// assert!(can_access_profile(&me, me.id, Action::Update));
/// assert!(!can_access_profile(&me, Uuid::new_v4(), Action::Read));
/// ```

use uuid::Uuid;

use super::principal::Principal;
use crate::models::task::Task;
use crate::models::user::UserScope;

/// What the principal wants to do with an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl Action {
    pub fn verb(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Missing, or not visible to the principal
    #[error("Not found")]
    NotFound,

    #[error("Not allowed to {} this object", .action.verb())]
    Forbidden { action: Action },
}

/// Only the owner may touch a task, whatever the action
pub fn can_access_task(principal: &Principal, task: &Task, _action: Action) -> bool {
    task.user_id == principal.id
}

pub fn can_access_profile(principal: &Principal, target: Uuid, _action: Action) -> bool {
    principal.is_staff || target == principal.id
}

/// Which accounts a user listing may return
pub fn user_list_scope(principal: &Principal) -> UserScope {
    if principal.is_staff || principal.is_superuser {
        UserScope::All
    } else {
        UserScope::Only(principal.id)
    }
}

/// Gates a looked-up task; `None` and a foreign task fail identically
pub fn authorize_task(
    principal: &Principal,
    task: Option<Task>,
    action: Action,
) -> Result<Task, AuthzError> {
    match task {
        Some(task) if can_access_task(principal, &task, action) => Ok(task),
        _ => Err(AuthzError::NotFound),
    }
}

pub fn authorize_profile(
    principal: &Principal,
    target: Uuid,
    action: Action,
) -> Result<(), AuthzError> {
    if can_access_profile(principal, target, action) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden { action })
    }
}
