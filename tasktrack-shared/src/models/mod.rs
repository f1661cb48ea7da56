/// Database models
///
/// - `user`: Accounts, profiles and listing scopes
/// - `task`: To-do items and their list/detail representations

pub mod task;
pub mod user;
