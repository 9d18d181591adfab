//! HTTP client for the cluster telemetry endpoint

use anyhow::Context;
use async_trait::async_trait;
use placement_lib::collector::TelemetrySource;
use placement_lib::{NodeId, PlacementError, ResourceSample};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads node listings and per-node statistics over HTTP
pub struct HttpTelemetrySource {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTelemetrySource {
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid telemetry endpoint: {endpoint}"))?;
        if endpoint.cannot_be_a_base() {
            anyhow::bail!("Telemetry endpoint cannot be a base URL: {endpoint}");
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Append path segments to the endpoint; each segment is percent-encoded
    fn url(&self, segments: &[&str]) -> placement_lib::Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PlacementError::Telemetry(format!("{} cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn transport_error(context: &str, err: reqwest::Error) -> PlacementError {
    PlacementError::Telemetry(format!("{context}: {err}"))
}

#[async_trait]
impl TelemetrySource for HttpTelemetrySource {
    async fn list_nodes(&self) -> placement_lib::Result<Vec<NodeId>> {
        let url = self.url(&["nodes"])?;

        self.client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| transport_error("listing nodes", e))?
            .json::<Vec<NodeId>>()
            .await
            .map_err(|e| transport_error("decoding node list", e))
    }

    async fn fetch_statistics(
        &self,
        node: &NodeId,
    ) -> placement_lib::Result<Option<ResourceSample>> {
        let url = self.url(&["nodes", node.as_str(), "statistics"])?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error("fetching statistics", e))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(node = %node, "No statistics reported yet");
            return Ok(None);
        }

        let sample = response
            .error_for_status()
            .map_err(|e| transport_error("fetching statistics", e))?
            .json::<ResourceSample>()
            .await
            .map_err(|e| transport_error("decoding statistics", e))?;

        Ok(Some(sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};

    async fn statistics(Path(id): Path<String>) -> Result<Json<ResourceSample>, AxumStatus> {
        match id.as_str() {
            "node-a" => Ok(Json(ResourceSample::new(
                Some(12.5),
                Some(6_000_000_000),
                Some(2_000_000_000),
                Some(8_000_000_000),
                false,
            ))),
            "node-b" => Err(AxumStatus::NOT_FOUND),
            "rack/1?zone=a#b" => Ok(Json(ResourceSample::new(Some(99.0), None, None, None, true))),
            _ => Err(AxumStatus::INTERNAL_SERVER_ERROR),
        }
    }

    /// Serve a fake telemetry endpoint on an ephemeral port
    async fn spawn_endpoint() -> String {
        let app = Router::new()
            .route(
                "/nodes",
                get(|| async { Json(vec!["node-a", "node-b", "node-c"]) }),
            )
            .route("/nodes/:id/statistics", get(statistics));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_list_nodes() {
        let source = HttpTelemetrySource::new(&spawn_endpoint().await).unwrap();

        let nodes = source.list_nodes().await.unwrap();
        assert_eq!(
            nodes,
            vec![
                NodeId::from("node-a"),
                NodeId::from("node-b"),
                NodeId::from("node-c")
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_statistics() {
        let source = HttpTelemetrySource::new(&spawn_endpoint().await).unwrap();

        let sample = source
            .fetch_statistics(&"node-a".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample.cpu_usage, Some(12.5));
        assert_eq!(sample.total_memory, Some(8_000_000_000));
    }

    #[tokio::test]
    async fn test_not_found_means_no_statistics_yet() {
        let source = HttpTelemetrySource::new(&spawn_endpoint().await).unwrap();
        assert_eq!(source.fetch_statistics(&"node-b".into()).await, Ok(None));
    }

    #[tokio::test]
    async fn test_server_error_is_a_telemetry_error() {
        let source = HttpTelemetrySource::new(&spawn_endpoint().await).unwrap();
        assert!(matches!(
            source.fetch_statistics(&"node-c".into()).await,
            Err(PlacementError::Telemetry(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_marks_failed_and_pending_nodes_unavailable() {
        let source = HttpTelemetrySource::new(&spawn_endpoint().await).unwrap();

        let snapshot = source.fetch_snapshot().await.unwrap();
        assert_eq!(snapshot.samples.len(), 1);
        assert!(snapshot.samples.contains_key(&NodeId::from("node-a")));
        assert!(snapshot.unavailable.contains(&NodeId::from("node-b")));
        assert!(snapshot.unavailable.contains(&NodeId::from("node-c")));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let source = HttpTelemetrySource::new("http://127.0.0.1:1").unwrap();
        assert!(matches!(
            source.list_nodes().await,
            Err(PlacementError::Telemetry(_))
        ));
    }

    #[tokio::test]
    async fn test_node_id_is_percent_encoded() {
        let source = HttpTelemetrySource::new(&spawn_endpoint().await).unwrap();

        let url = source
            .url(&["nodes", "rack/1?zone=a#b", "statistics"])
            .unwrap();
        assert!(url.path().ends_with("/nodes/rack%2F1%3Fzone=a%23b/statistics"), "{url}");
        assert!(url.query().is_none());

        let sample = source
            .fetch_statistics(&"rack/1?zone=a#b".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample.cpu_usage, Some(99.0));
        assert!(sample.is_overloaded);
    }

    #[test]
    fn test_endpoint_path_prefix_is_kept() {
        let source = HttpTelemetrySource::new("http://telemetry:9090/api/").unwrap();
        let url = source.url(&["nodes"]).unwrap();
        assert_eq!(url.as_str(), "http://telemetry:9090/api/nodes");

        let source = HttpTelemetrySource::new("http://telemetry:9090").unwrap();
        let url = source.url(&["nodes"]).unwrap();
        assert_eq!(url.as_str(), "http://telemetry:9090/nodes");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(HttpTelemetrySource::new("not a url").is_err());
        assert!(HttpTelemetrySource::new("mailto:ops@example.com").is_err());
    }
}
