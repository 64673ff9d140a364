//! Artifact sources: where the serialized model bytes come from

use crate::error::{PredictorError, Result};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Retrieves raw artifact bytes for a URL.
pub trait ArtifactSource: Send + Sync {
    /// Fetch the artifact. Called at most once per process by [`LazyAdapter`].
    ///
    /// [`LazyAdapter`]: crate::models::LazyAdapter
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Single blocking HTTP GET; only status 200 counts as success.
pub struct HttpArtifactSource {
    timeout: Option<Duration>,
}

impl HttpArtifactSource {
    /// Create a source with no request timeout
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Create a source that gives up after `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Default for HttpArtifactSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactSource for HttpArtifactSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let transport = |e: reqwest::Error| PredictorError::ArtifactTransport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;

        info!(url = %url, timeout = ?self.timeout, "Fetching model artifact");

        let response = client.get(url).send().map_err(transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(PredictorError::ArtifactFetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(transport)?;
        debug!(url = %url, size = bytes.len(), "Artifact downloaded");

        Ok(bytes.to_vec())
    }
}

/// Reads the artifact from the local filesystem (`file://` URLs).
pub struct FileArtifactSource;

impl FileArtifactSource {
    fn path_from_url(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

impl ArtifactSource for FileArtifactSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = Self::path_from_url(url);
        info!(path = %path.display(), "Reading model artifact from file");

        std::fs::read(&path).map_err(|e| PredictorError::ArtifactTransport {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Pick the source matching the URL scheme.
pub fn source_for_url(url: &str, timeout: Option<Duration>) -> Box<dyn ArtifactSource> {
    if url.starts_with("file://") {
        Box::new(FileArtifactSource)
    } else {
        Box::new(HttpArtifactSource::with_timeout(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve a single HTTP response on an ephemeral local port.
    fn serve_once(status_line: &'static str, body: &'static [u8]) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/model.json", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
        });

        (url, handle)
    }

    #[test]
    fn test_file_source_reads_bytes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"model-bytes").unwrap();

        let url = format!("file://{}", file.path().display());
        let bytes = FileArtifactSource.fetch(&url).unwrap();
        assert_eq!(bytes, b"model-bytes");
    }

    #[test]
    fn test_file_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("file://{}", dir.path().join("absent.json").display());

        let err = FileArtifactSource.fetch(&url).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactTransport { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_http_source_transport_failure() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let source = HttpArtifactSource::with_timeout(Some(Duration::from_secs(2)));
        let err = source.fetch("http://127.0.0.1:9/model.json").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_http_source_returns_body_on_200() {
        let (url, server) = serve_once("200 OK", b"abc");

        let bytes = HttpArtifactSource::new().fetch(&url).unwrap();
        assert_eq!(bytes, b"abc");
        server.join().unwrap();
    }

    #[test]
    fn test_http_source_rejects_not_found() {
        let (url, server) = serve_once("404 Not Found", b"missing");

        let err = HttpArtifactSource::new().fetch(&url).unwrap_err();
        assert_eq!(err, PredictorError::ArtifactFetch { url, status: 404 });
        assert!(err.is_fatal());
        server.join().unwrap();
    }

    #[test]
    fn test_http_source_rejects_other_success_codes() {
        let (url, server) = serve_once("204 No Content", b"");

        let err = HttpArtifactSource::new().fetch(&url).unwrap_err();
        assert!(matches!(err, PredictorError::ArtifactFetch { status: 204, .. }));
        server.join().unwrap();
    }
}
