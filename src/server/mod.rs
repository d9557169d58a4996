pub mod config;
mod http_layers;
mod pieces;
#[allow(clippy::module_inception)]
pub mod server;
mod session;
pub mod state;

pub use config::ServerConfig;
pub use http_layers::*;
pub use pieces::ApiError;
pub use server::{make_app, run_server};
