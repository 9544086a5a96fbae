pub mod access_log;
pub mod app;
pub mod backend;
pub mod daemon;
pub mod handlers;
mod routes;
pub mod server;
pub mod state;

pub use daemon::run;
