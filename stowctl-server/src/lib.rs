//! stowctl-server: HTTP backend for a household inventory
//!
//! Items (optionally nested, labelled, tagged and photographed) live in a
//! single SQLite file; uploaded images and their thumbnails live under
//! `static/images` next to it. The binary in `stowctl-cli` wires
//! configuration, logging and migrations around [`run_server`].

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod images;
pub mod models;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use http::{build_router, run_server, AppState};
