//! Quest daemon library - exposes modules for testing.

pub mod dispatch;
pub mod routes;
pub mod server;

pub use server::{build_router, AppState};
