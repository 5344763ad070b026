// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fetcher: resolves a job's document source into a local file.
//
// Remote documents are streamed chunk by chunk into a uniquely named
// transient file. The file is owned by the returned `LocalDocument`; on any
// failure before that handle is returned, the partial file is removed.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use spoolgate_core::DocumentSource;
use spoolgate_core::error::{DispatchError, Result};

use crate::document::{LocalDocument, OrientationState};

/// Prefix for every transient file this crate creates.
pub const TEMP_PREFIX: &str = "spoolgate-";

/// Downloads job documents into transient files.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    client: Client,
    temp_dir: PathBuf,
    suffix: String,
}

impl DocumentFetcher {
    /// Create a fetcher writing into `temp_dir`. `timeout` bounds each whole
    /// request, body included.
    pub fn new(temp_dir: impl Into<PathBuf>, suffix: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            temp_dir: temp_dir.into(),
            suffix: suffix.into(),
        })
    }

    /// Resolve `source` into a readable local file.
    ///
    /// Local sources are used in place and never copied or deleted.
    pub async fn fetch(&self, source: &DocumentSource) -> Result<LocalDocument> {
        match source {
            DocumentSource::Remote(url) => self.download(url).await,
            DocumentSource::Local(path) => {
                let metadata = tokio::fs::metadata(path).await.map_err(|e| {
                    DispatchError::Download(format!("local document {}: {e}", path.display()))
                })?;
                if !metadata.is_file() {
                    return Err(DispatchError::Download(format!(
                        "local document {} is not a regular file",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "using local document in place");
                Ok(LocalDocument::borrowed(path))
            }
        }
    }

    #[instrument(skip(self), fields(temp_dir = %self.temp_dir.display()))]
    async fn download(&self, url: &str) -> Result<LocalDocument> {
        let url = Url::parse(url)
            .map_err(|e| DispatchError::Download(format!("invalid URL '{url}': {e}")))?;

        let temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&self.suffix)
            .tempfile_in(&self.temp_dir)?;
        // From here on, returning early drops `temp_path`, which deletes the
        // partial file.
        let (file, temp_path) = temp.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        info!(%url, path = %temp_path.display(), "downloading document");
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DispatchError::Download(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Download(format!("GET {url} returned {status}")));
        }
        let expected = response.content_length();

        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DispatchError::Download(format!("reading body of {url}: {e}")))?
        {
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Some(expected) = expected
            && expected != written
        {
            return Err(DispatchError::Download(format!(
                "GET {url}: body truncated ({written} of {expected} bytes)"
            )));
        }

        let digest = hex::encode(hasher.finalize());
        info!(bytes = written, sha256 = %digest, "document downloaded");
        Ok(LocalDocument::owned(
            temp_path,
            OrientationState::Unrotated,
            Some(digest),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::get;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn entries(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    fn fetcher(dir: &tempfile::TempDir) -> DocumentFetcher {
        DocumentFetcher::new(dir.path(), ".pdf", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn downloads_whole_body_into_owned_file() {
        let body: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let served = body.clone();
        let addr = serve(Router::new().route(
            "/doc.pdf",
            get(move || {
                let served = served.clone();
                async move { served }
            }),
        ))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::Remote(format!("http://{addr}/doc.pdf"));
        let doc = fetcher(&dir).fetch(&source).await.unwrap();

        assert!(doc.is_owned());
        assert_eq!(doc.state(), OrientationState::Unrotated);
        assert!(doc.path().starts_with(dir.path()));
        assert!(doc.path().to_string_lossy().ends_with(".pdf"));
        assert_eq!(std::fs::read(doc.path()).unwrap(), body);
        assert_eq!(doc.sha256().map(str::len), Some(64));

        drop(doc);
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn each_download_gets_a_fresh_name() {
        let addr = serve(Router::new().route("/doc.pdf", get(|| async { "%PDF-1.5" }))).await;
        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::Remote(format!("http://{addr}/doc.pdf"));
        let f = fetcher(&dir);

        let first = f.fetch(&source).await.unwrap();
        let second = f.fetch(&source).await.unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[tokio::test]
    async fn not_found_fails_and_leaves_nothing_behind() {
        let addr = serve(Router::new().route(
            "/gone.pdf",
            get(|| async { StatusCode::NOT_FOUND }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::Remote(format!("http://{addr}/gone.pdf"));

        let err = fetcher(&dir).fetch(&source).await.unwrap_err();
        assert!(matches!(err, DispatchError::Download(_)));
        assert!(err.to_string().contains("404"));
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn unreachable_host_fails_and_leaves_nothing_behind() {
        // Bind then release a port so nothing is listening on it.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::Remote(format!("http://{addr}/doc.pdf"));
        let err = fetcher(&dir).fetch(&source).await.unwrap_err();

        assert!(matches!(err, DispatchError::Download(_)));
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn body_cut_short_fails_and_removes_partial_file() {
        use tokio::io::AsyncReadExt;

        // Announce 100 kB, send 20 kB, then hang up.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 100000\r\n\r\n",
                )
                .await
                .unwrap();
            socket.write_all(&[b'%'; 20_000]).await.unwrap();
            socket.flush().await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::Remote(format!("http://{addr}/doc.pdf"));
        let err = fetcher(&dir).fetch(&source).await.unwrap_err();

        assert!(matches!(err, DispatchError::Download(_)));
        assert_eq!(entries(&dir), 0);
    }

    #[tokio::test]
    async fn local_source_is_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("info-1.pdf");
        std::fs::write(&path, b"%PDF-1.5").unwrap();

        let doc = fetcher(&dir)
            .fetch(&DocumentSource::Local(path.clone()))
            .await
            .unwrap();
        assert_eq!(doc.path(), path.as_path());
        assert!(!doc.is_owned());

        drop(doc);
        assert!(path.exists());
        assert_eq!(entries(&dir), 1);
    }

    #[tokio::test]
    async fn missing_local_source_is_a_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DocumentSource::Local(dir.path().join("nope.pdf"));
        let err = fetcher(&dir).fetch(&source).await.unwrap_err();
        assert!(matches!(err, DispatchError::Download(_)));
    }
}
