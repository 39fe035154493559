use std::path::PathBuf;

use thiserror::Error;

use crate::api::ApiError;
use crate::map::MapError;
use crate::segment::RoutingFailure;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[source] ApiError),
    #[error("backend reported an error: {0}")]
    BackendReported(String),
    #[error("routing failed: {0}")]
    Routing(#[from] RoutingFailure),
    #[error("failed to send marker-close: {0}")]
    NotificationDelivery(#[source] ApiError),
    #[error("map rendering failed: {0}")]
    Render(#[source] MapError),
    #[error("map teardown failed: {0}")]
    Teardown(#[source] MapError),
    #[error("failed to read gazetteer {path}: {source}")]
    GazetteerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid gazetteer {path}: {source}")]
    GazetteerParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Fatal errors move the session to `Error` and stop both timers.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::BackendReported(_) | Self::Render(_)
        )
    }
}
