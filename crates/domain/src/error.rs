/// Shared error type used across all CTMS crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The platform answered with a non-success status.
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("auth: {0}")]
    Auth(String),

    /// The target service does not offer the requested resource or feature.
    #[error("not found: {0}")]
    NotFound(String),

    /// A response was not JSON or lacked a field the client depends on.
    #[error("parse: {0}")]
    Parse(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error came from the transport layer rather than from
    /// interpreting a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Timeout(_) | Error::Status { .. }
        )
    }

    /// The HTTP status carried by a [`Error::Status`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_names_request() {
        let err = Error::Status {
            method: "GET".into(),
            url: "https://ctms.example/auth".into(),
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "GET https://ctms.example/auth returned 503: unavailable"
        );
        assert_eq!(err.status(), Some(503));
        assert!(err.is_transport());
    }

    #[test]
    fn interpretation_errors_are_not_transport() {
        assert!(!Error::Parse("missing _links".into()).is_transport());
        assert!(!Error::NotFound("search:simple-search".into()).is_transport());
        assert!(!Error::Auth("rejected".into()).is_transport());
        assert!(Error::Timeout("60s".into()).is_transport());
        assert_eq!(Error::Http("reset".into()).status(), None);
    }
}
