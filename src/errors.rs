use crate::track::TrackError;
use thiserror::Error;

/// Everything an operator of the editor can be shown.
///
/// Superseded route resolutions are deliberately not represented here.
/// They are not failures, they are logged at debug level and dropped.
#[derive(Error, Debug)]
pub enum EditorError {
    /// The request never left the editor. No backend call was made.
    #[error("{0}")]
    Validation(String),

    /// The backend refused or the transport failed. Session state is
    /// left exactly as it was before the call.
    #[error("{detail}")]
    Persistence {
        status: Option<u16>,
        detail: String,
    },

    /// The routing engine could not produce a path through the current
    /// waypoints. Waypoints stay on the map as plain markers.
    #[error("no path found through the chosen stops")]
    NoPathFound,

    /// An uploaded track document was rejected before it touched the
    /// waypoint sequence.
    #[error("track rejected: {0}")]
    MalformedTrack(#[from] TrackError),
}

impl From<reqwest::Error> for EditorError {
    fn from(err: reqwest::Error) -> Self {
        EditorError::Persistence {
            status: err.status().map(|s| s.as_u16()),
            detail: err.to_string(),
        }
    }
}

impl EditorError {
    pub fn is_validation(&self) -> bool {
        matches!(self, EditorError::Validation(_))
    }
}
