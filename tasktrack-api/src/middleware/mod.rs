/// Middleware for the API server
///
/// Bearer authentication lives in [`crate::app`] next to the router it guards.

pub mod security;
