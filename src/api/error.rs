use std::path::PathBuf;
use thiserror::Error;

pub type TransportError = anyhow::Error;

/// Outcome of a remote call that did not succeed.
///
/// Remote-reported failures are values of this type, never panics.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("the request could not be completed: {0:?}")]
    Transport(#[from] TransportError),
    #[error("the server answered with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("the server reported a failure: {body}")]
    Rejected { body: String },
    #[error("the response carried no `{0}`")]
    Missing(&'static str),
    #[error("could not write {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
