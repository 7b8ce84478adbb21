//! Verdict application library
//!
//! Feature modules (accounts, catalogue, reviews, auth) and the bootstrap
//! that wires them onto the kernel, database and HTTP server.

pub mod app;
pub mod extract;
pub mod mail;
pub mod modules;
pub mod security;
pub mod state;
pub mod utils;

pub use app::{build_registry, prepare, prepare_with, Prepared};
pub use state::AppState;
