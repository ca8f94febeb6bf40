pub mod api;
pub mod backend;
pub mod config;
pub mod tools;
pub mod tracking;

pub use api::client::JobClient;
pub use api::id::{BlockId, JobId, ProjectId};
pub use config::Settings;
