//! # Tasktrack API Server Library
//!
//! HTTP surface of Tasktrack: per-user task tracking with staff-managed
//! accounts, served as JSON over Axum.
//!
//! ## Modules
//!
//! - `app`: Application state, store selection and router builder
//! - `body`: Field-by-field reading of JSON request bodies
//! - `config`: Configuration from environment variables
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `pagination`: Page-number pagination envelopes
//! - `routes`: API route handlers

pub mod app;
pub mod body;
pub mod config;
pub mod error;
pub mod middleware;
pub mod pagination;
pub mod routes;
