/// User list filters: `username` and `email`, both case-insensitive substrings

use sqlx::{Postgres, QueryBuilder};
use std::fmt;

use super::{icontains, like_escape, param, QueryParams};
use crate::models::user::User;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserFilter {
    /// Reads the filter from query parameters; unknown parameters are ignored
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            username: param(params, "username").map(str::to_string),
            email: param(params, "email").map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }

    pub fn matches(&self, user: &User) -> bool {
        self.username
            .as_deref()
            .map_or(true, |needle| icontains(&user.username, needle))
            && self
                .email
                .as_deref()
                .map_or(true, |needle| icontains(&user.email, needle))
    }

    pub fn push_conditions(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(username) = &self.username {
            qb.push(" AND username ILIKE ");
            qb.push_bind(format!("%{}%", like_escape(username)));
            qb.push(" ESCAPE '\\'");
        }
        if let Some(email) = &self.email {
            qb.push(" AND email ILIKE ");
            qb.push_bind(format!("%{}%", like_escape(email)));
            qb.push(" ESCAPE '\\'");
        }
    }
}

impl fmt::Display for UserFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.username, &self.email) {
            (None, None) => f.write_str("none"),
            (Some(u), None) => write!(f, "username={u}"),
            (None, Some(e)) => write!(f, "email={e}"),
            (Some(u), Some(e)) => write!(f, "username={u}, email={e}"),
        }
    }
}
