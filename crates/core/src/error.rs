use crate::types::ResourceKind;

/// Errors that can occur when using the skiff client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no credentials found in any source")]
    Authentication,

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("port {port} not allowed: {reason}")]
    InvalidPort { port: u16, reason: String },

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("provisioning '{name}' failed: {reason}")]
    Provisioning { name: String, reason: String },

    #[error("conflict on '{name}': {reason}")]
    Conflict { name: String, reason: String },

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds a `NotFound` for the given resource kind and name.
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// True if this error means the named resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_authentication() {
        let err = Error::Authentication;
        assert_eq!(err.to_string(), "no credentials found in any source");
    }

    #[test]
    fn error_display_not_found() {
        let err = Error::not_found(ResourceKind::Sandbox, "my-sandbox");
        assert_eq!(err.to_string(), "sandbox 'my-sandbox' not found");
    }

    #[test]
    fn error_display_invalid_port() {
        let err = Error::InvalidPort {
            port: 443,
            reason: "reserved".to_string(),
        };
        assert_eq!(err.to_string(), "port 443 not allowed: reserved");
    }

    #[test]
    fn error_display_conflict() {
        let err = Error::Conflict {
            name: "dev-server".to_string(),
            reason: "process is still running".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "conflict on 'dev-server': process is still running"
        );
    }

    #[test]
    fn error_display_api() {
        let err = Error::Api {
            status: 500,
            body: "internal".to_string(),
        };
        assert_eq!(err.to_string(), "API error (status 500): internal");
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn is_not_found_matches_only_not_found() {
        assert!(Error::not_found(ResourceKind::Volume, "v").is_not_found());
        assert!(!Error::Authentication.is_not_found());
    }
}
