//! REST backend for a personal expense tracker.
//!
//! Users keep expenses filed under categories, either their own or the shared
//! defaults, and list them through a filtered, paginated query that also
//! reports the count and sum of every matching expense.

pub mod config;
pub mod db;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod router;
pub mod services;
pub mod state;
pub mod validation;

pub use router::{ApiDoc, build_router};
pub use state::AppState;
