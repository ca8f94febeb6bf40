
pub mod client;
pub mod error;
pub mod id;
pub mod job;
pub mod pipeline;
pub mod results;
pub mod training;
