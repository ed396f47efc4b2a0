//! Axum route handlers, one module per concern.
//!
//! Handlers return [`crate::errors::Result`], which turns failures into plain-text responses with
//! the appropriate status code.

pub mod health;
pub mod images;
pub mod webhook;
