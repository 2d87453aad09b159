#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod routes;

pub use config::Args;
pub use error::ApiError;
pub use routes::router;
