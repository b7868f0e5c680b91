//! Server module for building the shop HTTP server
//!
//! This module provides a `ServerBuilder` that registers:
//! - Shop CRUD, listing and search routes
//! - Health check routes

pub mod builder;
pub mod handlers;
pub mod router;

pub use builder::{Collaborators, ServerBuilder};
pub use handlers::AppState;
