pub mod config;
pub mod constants;
pub mod error;
pub mod job_id;
pub mod logging;

pub use error::{ContainerQuery, ResolutionError};
pub use job_id::JobId;
