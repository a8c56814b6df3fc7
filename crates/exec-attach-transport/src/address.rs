//! Transport addressing.
//!
//! A URI-like address selects the backend: `tcp://` and `http://` select the
//! stream socket, `unix://` and `npipe://` select the local duplex pipe.

use std::path::PathBuf;

use thiserror::Error;

/// Address parse failure.
#[derive(Debug, Error)]
pub enum AddrError {
    #[error("Missing scheme in address: {0}")]
    MissingScheme(String),
    #[error("Unsupported scheme '{scheme}' in address: {addr}")]
    UnsupportedScheme { scheme: String, addr: String },
    #[error("Empty target in address: {0}")]
    EmptyTarget(String),
}

/// A parsed transport address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAddr {
    /// `host:port` authority for the stream-socket backend.
    Tcp(String),
    /// Local pipe path for the named-pipe backend.
    Pipe(PathBuf),
}

impl TransportAddr {
    /// Parse a URI-like address into a backend selection.
    ///
    /// `tcp://host:port` and `http://host:port` map to [`Self::Tcp`];
    /// `unix:///path/to.sock` and `npipe://./pipe/name` map to
    /// [`Self::Pipe`].
    ///
    /// # Errors
    /// Returns error for a missing or unsupported scheme or an empty target.
    pub fn parse(addr: &str) -> Result<Self, AddrError> {
        let (scheme, rest) = addr
            .split_once("://")
            .ok_or_else(|| AddrError::MissingScheme(addr.to_string()))?;

        match scheme {
            "tcp" | "http" => {
                // Ignore any path component; only the authority matters.
                let authority = rest.split('/').next().unwrap_or_default();
                if authority.is_empty() {
                    return Err(AddrError::EmptyTarget(addr.to_string()));
                }
                Ok(Self::Tcp(authority.to_string()))
            }
            "unix" => {
                if rest.is_empty() {
                    return Err(AddrError::EmptyTarget(addr.to_string()));
                }
                Ok(Self::Pipe(PathBuf::from(rest)))
            }
            "npipe" => {
                let name = rest.trim_start_matches("./");
                if name.is_empty() {
                    return Err(AddrError::EmptyTarget(addr.to_string()));
                }
                Ok(Self::Pipe(PathBuf::from(format!(
                    r"\\.\{}",
                    name.replace('/', r"\")
                ))))
            }
            other => Err(AddrError::UnsupportedScheme {
                scheme: other.to_string(),
                addr: addr.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_and_http_select_socket() {
        assert_eq!(
            TransportAddr::parse("tcp://localhost:2375").unwrap(),
            TransportAddr::Tcp("localhost:2375".into())
        );
        assert_eq!(
            TransportAddr::parse("http://localhost:2375").unwrap(),
            TransportAddr::Tcp("localhost:2375".into())
        );
    }

    #[test]
    fn test_http_ignores_path_component() {
        assert_eq!(
            TransportAddr::parse("http://daemon:2375/v1.41").unwrap(),
            TransportAddr::Tcp("daemon:2375".into())
        );
    }

    #[test]
    fn test_unix_selects_pipe() {
        assert_eq!(
            TransportAddr::parse("unix:///var/run/daemon.sock").unwrap(),
            TransportAddr::Pipe(PathBuf::from("/var/run/daemon.sock"))
        );
    }

    #[test]
    fn test_npipe_maps_to_pipe_namespace() {
        assert_eq!(
            TransportAddr::parse("npipe://./pipe/docker_engine").unwrap(),
            TransportAddr::Pipe(PathBuf::from(r"\\.\pipe\docker_engine"))
        );
    }

    #[test]
    fn test_missing_scheme_rejected() {
        assert!(matches!(
            TransportAddr::parse("localhost:2375"),
            Err(AddrError::MissingScheme(_))
        ));
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        assert!(matches!(
            TransportAddr::parse("ftp://host"),
            Err(AddrError::UnsupportedScheme { .. })
        ));
    }

    #[test]
    fn test_empty_target_rejected() {
        assert!(matches!(
            TransportAddr::parse("tcp://"),
            Err(AddrError::EmptyTarget(_))
        ));
        assert!(matches!(
            TransportAddr::parse("unix://"),
            Err(AddrError::EmptyTarget(_))
        ));
    }
}
