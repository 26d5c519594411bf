//! Task time tracking server.
//!
//! Exposes the REST API over [`tasktime_db::Database`] and the CLI commands
//! that drive it.

pub mod auth;
mod cli;
pub mod commands;
mod config;
pub mod error;
pub mod extract;
pub mod routes;
mod state;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{AppError, ErrorKind};
pub use routes::router;
pub use state::AppState;
