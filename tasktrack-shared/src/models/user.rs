/// User model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     is_staff BOOLEAN NOT NULL DEFAULT FALSE,
///     is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ
/// );
/// ```
///
/// Role flags (`is_staff`, `is_superuser`) are written only by [`CreateUser`],
/// which the public registration path always fills with `false`.
/// [`UpdateUser`] has no role fields at all.
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::models::user::{CreateUser, User};
/// use tasktrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser::member("alice", "$argon2id$...")).await?;
/// let found = User::find_by_username(&pool, "alice").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::filter::user::UserFilter;
use crate::store::{Page, PageRequest};

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
                            is_staff, is_superuser, is_active, date_joined, last_login";

/// A user account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Email address, empty when not provided
    pub email: String,

    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,

    /// Staff may view and manage every profile and list all users
    pub is_staff: bool,

    /// Superusers may list all users
    pub is_superuser: bool,

    /// Inactive users cannot obtain or use tokens
    pub is_active: bool,

    pub date_joined: DateTime<Utc>,

    /// Set whenever a token pair is issued
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub username: String,
    pub email: String,

    /// Argon2id hash, never a plaintext password
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl CreateUser {
    /// A non-privileged account with no email or names
    pub fn member(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            ..Default::default()
        }
    }
}

/// Changes a user may make to a profile
///
/// Only non-`None` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,

    /// New Argon2id hash
    pub password_hash: Option<String>,
}

impl UpdateUser {
    /// Applies the changes to an in-memory copy
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
    }
}

/// Which users a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    /// Every account, inactive ones included
    All,

    /// Only the given account
    Only(Uuid),
}

/// Role buckets used by seeding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKind {
    Superuser,

    /// Staff without superuser rights
    Staff,

    /// Neither staff nor superuser
    Regular,
}

impl UserKind {
    pub fn matches(&self, user: &User) -> bool {
        match self {
            UserKind::Superuser => user.is_superuser,
            UserKind::Staff => user.is_staff && !user.is_superuser,
            UserKind::Regular => !user.is_staff && !user.is_superuser,
        }
    }

    fn sql_condition(&self) -> &'static str {
        match self {
            UserKind::Superuser => "is_superuser",
            UserKind::Staff => "is_staff AND NOT is_superuser",
            UserKind::Regular => "NOT is_staff AND NOT is_superuser",
        }
    }
}

/// Public representation of a user
///
/// The password hash and role flags never leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

impl User {
    /// Inserts a user
    ///
    /// # Errors
    ///
    /// Fails with a unique violation when the username is taken.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.is_staff)
            .bind(data.is_superuser)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Writes the non-`None` fields of `data`
    ///
    /// Returns `None` if the user does not exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE users SET \
                 email = COALESCE($2, email), \
                 first_name = COALESCE($3, first_name), \
                 last_name = COALESCE($4, last_name), \
                 password_hash = COALESCE($5, password_hash) \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(data.email)
            .bind(data.first_name)
            .bind(data.last_name)
            .bind(data.password_hash)
            .fetch_optional(pool)
            .await
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Deletes a user and, through the foreign key, all of their tasks
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists users visible in `scope`, narrowed by `filter`, oldest first
    pub async fn list(
        pool: &PgPool,
        scope: UserScope,
        filter: &UserFilter,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users WHERE TRUE");
        push_user_conditions(&mut count_query, scope, filter);
        let (count,): (i64,) = count_query.build_query_as().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE TRUE"
        ));
        push_user_conditions(&mut select, scope, filter);
        select.push(" ORDER BY date_joined ASC, id ASC LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let items = select.build_query_as::<User>().fetch_all(pool).await?;
        Ok(Page { items, count })
    }

    pub async fn count_by_kind(pool: &PgPool, kind: UserKind) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {}", kind.sql_condition());
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(pool).await?;
        Ok(count)
    }

    /// Ids of every user, used when seeding tasks
    pub async fn list_ids(pool: &PgPool) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM users ORDER BY date_joined ASC")
            .fetch_all(pool)
            .await
    }
}

fn push_user_conditions(qb: &mut QueryBuilder<'_, Postgres>, scope: UserScope, filter: &UserFilter) {
    if let UserScope::Only(id) = scope {
        qb.push(" AND id = ");
        qb.push_bind(id);
    }
    filter.push_conditions(qb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(is_staff: bool, is_superuser: bool) -> User {
        User {
            id: Uuid::new_v4(),
            username: "sample".to_string(),
            email: "sample@example.com".to_string(),
            password_hash: "$argon2id$hash".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Ple".to_string(),
            is_staff,
            is_superuser,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let json = serde_json::to_value(sample(false, false)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "sample");
    }

    #[test]
    fn test_profile_hides_role_flags() {
        let user = sample(true, true);
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 5);
        assert!(json.get("is_staff").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_user_kind_buckets() {
        assert!(UserKind::Superuser.matches(&sample(true, true)));
        assert!(UserKind::Staff.matches(&sample(true, false)));
        assert!(!UserKind::Staff.matches(&sample(true, true)));
        assert!(UserKind::Regular.matches(&sample(false, false)));
        assert!(!UserKind::Regular.matches(&sample(false, true)));
    }

    #[test]
    fn test_update_apply_only_touches_supplied_fields() {
        let mut user = sample(false, false);
        UpdateUser {
            first_name: Some("Samuel".to_string()),
            ..Default::default()
        }
        .apply(&mut user);

        assert_eq!(user.first_name, "Samuel");
        assert_eq!(user.last_name, "Ple");
        assert_eq!(user.email, "sample@example.com");
    }
}
