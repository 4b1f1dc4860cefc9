//! Fetches vehicle detail documents through the response cache.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::cache::{ResponseCache, request_key};
use crate::document::VehicleDocument;
use crate::fetch::{HttpClient, fetch_json, vehicle_request};

pub struct VehicleFetcher<C> {
    client: C,
    cache: ResponseCache,
    endpoint: String,
    snapshot_dir: PathBuf,
}

impl<C: HttpClient> VehicleFetcher<C> {
    pub fn new(
        client: C,
        cache: ResponseCache,
        endpoint: impl Into<String>,
        snapshot_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            cache,
            endpoint: endpoint.into(),
            snapshot_dir: snapshot_dir.into(),
        }
    }

    /// Returns the detail document for `vehicle_id`, from cache when fresh.
    pub async fn fetch(&self, vehicle_id: &str) -> Result<VehicleDocument> {
        self.fetch_at(vehicle_id, Utc::now()).await
    }

    /// Same as [`fetch`](Self::fetch) with an explicit clock.
    ///
    /// A network response is cached before it is returned. Either way the
    /// snapshot `{snapshot_dir}/{id}.json` is rewritten.
    #[tracing::instrument(skip_all, fields(vehicle_id = %vehicle_id))]
    pub async fn fetch_at(&self, vehicle_id: &str, now: DateTime<Utc>) -> Result<VehicleDocument> {
        let req = vehicle_request(&self.endpoint, vehicle_id)?;
        let key = request_key(&req);
        let url = req.url().to_string();

        let body = match self.cache.get(&key, now) {
            Some(body) => {
                debug!("Served from cache");
                body
            }
            None => {
                info!("{vehicle_id} not from cache");
                let body = fetch_json(&self.client, req)
                    .await
                    .with_context(|| format!("failed to fetch vehicle {vehicle_id}"))?;
                self.cache.put(&key, &url, &body, now)?;
                body
            }
        };

        let doc = VehicleDocument::new(vehicle_id, body);
        let path = doc.write_snapshot(&self.snapshot_dir)?;
        debug!(path = %path.display(), "Snapshot written");
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::fixtures::sample_raw;
    use async_trait::async_trait;
    use chrono::Duration;
    use reqwest::{Request, Response};
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Serves canned bodies and records every request it sees.
    struct MockClient {
        status: u16,
        body: String,
        requests: Mutex<Vec<String>>,
    }

    impl MockClient {
        fn ok(body: String) -> Self {
            Self {
                status: 200,
                body,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpClient for MockClient {
        async fn execute(&self, req: Request) -> reqwest::Result<Response> {
            self.requests.lock().unwrap().push(req.url().to_string());
            let resp = http::Response::builder()
                .status(self.status)
                .body(self.body.clone())
                .unwrap();
            Ok(Response::from(resp))
        }
    }

    /// Formatted log output kept in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn fetcher(client: MockClient, dir: &TempDir) -> VehicleFetcher<MockClient> {
        VehicleFetcher::new(
            client,
            ResponseCache::new(dir.path().join("web_cache"), Duration::seconds(3600)),
            "https://example.test/vehicledetails",
            dir.path().join("json"),
        )
    }

    #[tokio::test]
    async fn test_first_fetch_hits_network_and_writes_snapshot() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::ok(sample_raw().to_string());
        let fetcher = fetcher(client, &dir);

        let doc = fetcher.fetch("3141592").await.unwrap();

        assert_eq!(fetcher.client.calls(), 1);
        assert_eq!(
            fetcher.client.requests.lock().unwrap()[0],
            "https://example.test/vehicledetails?vehicleId=3141592"
        );
        assert_eq!(doc.raw, sample_raw());
        assert!(dir.path().join("json/3141592.json").exists());
    }

    #[tokio::test]
    async fn test_cached_fetch_skips_network() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::ok(sample_raw().to_string());
        let fetcher = fetcher(client, &dir);
        let now = Utc::now();

        fetcher.fetch_at("1", now).await.unwrap();
        fetcher.fetch_at("1", now + Duration::seconds(60)).await.unwrap();

        assert_eq!(fetcher.client.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_miss_is_noted_and_hit_is_silent() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(MockClient::ok(sample_raw().to_string()), &dir);
        let now = Utc::now();

        fetcher.fetch_at("2718", now).await.unwrap();
        assert!(logs.contents().contains("2718 not from cache"));

        fetcher.fetch_at("2718", now + Duration::seconds(60)).await.unwrap();
        assert_eq!(logs.contents().matches("not from cache").count(), 1);
    }

    #[tokio::test]
    async fn test_expired_fetch_refetches_and_overwrites_snapshot() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::ok(sample_raw().to_string());
        let fetcher = fetcher(client, &dir);
        let now = Utc::now();
        let snapshot = dir.path().join("json/1.json");

        fetcher.fetch_at("1", now).await.unwrap();
        std::fs::write(&snapshot, "stale").unwrap();
        fetcher.fetch_at("1", now + Duration::seconds(3601)).await.unwrap();

        assert_eq!(fetcher.client.calls(), 2);
        let content = std::fs::read_to_string(&snapshot).unwrap();
        assert_ne!(content, "stale");
    }

    #[tokio::test]
    async fn test_malformed_json_is_fatal() {
        let dir = TempDir::new().unwrap();
        let client = MockClient::ok("<html>blocked</html>".to_string());
        let fetcher = fetcher(client, &dir);

        let err = fetcher.fetch("9").await.unwrap_err();

        assert!(format!("{err:#}").contains("malformed JSON"));
        assert!(!dir.path().join("json/9.json").exists());
    }

    #[tokio::test]
    async fn test_error_status_is_fatal_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let client = MockClient {
            status: 503,
            body: "unavailable".to_string(),
            requests: Mutex::new(Vec::new()),
        };
        let fetcher = fetcher(client, &dir);

        assert!(fetcher.fetch("9").await.is_err());
        assert!(fetcher.fetch("9").await.is_err());
        assert_eq!(fetcher.client.calls(), 2);
    }
}
