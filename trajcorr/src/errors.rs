#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// A correlator was used out of order, e.g. written before being computed
    InvalidState(String),
    /// Error reported by a trajectory implementation
    Trajectory(String),
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Error while writing results
    Io(std::io::Error),
    /// Something that should never happen happened
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::InvalidState(e) => write!(f, "invalid state: {}", e),
            Error::Trajectory(e) => write!(f, "trajectory error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::InvalidState(_) |
            Error::Trajectory(_) |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
            Error::Io(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::Io(error)
    }
}
