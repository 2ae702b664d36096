pub mod api;
pub mod bootstrap;
pub mod collaborators;
pub mod comments;
pub mod config;
pub mod database;
pub mod error;
pub mod node;
pub mod reader;
pub mod reconcile;
pub mod telemetry;
pub mod utils;
pub mod votes;
