//! HTTP client for the vector store
//!
//! One request per call, no retries and no local state beyond the base URL.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::VectorStoreConfig;
use crate::error::{Result, VectorError};
use crate::types::{
    ApiResponse, CollectionConfig, CollectionsList, Distance, Point, ScoredPoint, SearchRequest,
    UpsertRequest,
};

/// Default number of hits returned by a search
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Default minimum score for a search hit
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct VectorClient {
    base: Url,
    http: reqwest::Client,
}

impl VectorClient {
    /// Create a client for the configured endpoint
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(VectorError::Config("url cannot be empty".to_string()));
        }
        let base = Url::parse(&config.url)
            .map_err(|e| VectorError::Config(format!("invalid url {}: {}", config.url, e)))?;
        if base.cannot_be_a_base() {
            return Err(VectorError::Config(format!("url cannot be a base: {}", config.url)));
        }

        let mut builder = reqwest::Client::builder();
        // Local services are never reached through a proxy
        if matches!(base.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) {
            builder = builder.no_proxy();
        }
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| VectorError::Config(e.to_string()))?;

        Ok(Self { base, http })
    }

    /// The endpoint this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Check that the service is up
    ///
    /// True only for a success status with `"status": "ok"` in the body.
    /// Failures are logged, never returned.
    pub async fn health_check(&self) -> bool {
        let url = self.endpoint(&["health"]);
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Health check failed: {}", e);
                return false;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Health check returned {}", status);
            return false;
        }

        match response.json::<serde_json::Value>().await {
            Ok(body) => {
                let healthy = body.get("status").and_then(|s| s.as_str()) == Some("ok");
                if !healthy {
                    warn!("Health check reported status {:?}", body.get("status"));
                }
                healthy
            }
            Err(e) => {
                warn!("Health check body unreadable: {}", e);
                false
            }
        }
    }

    /// Create a collection of `vector_size`-dimensional vectors
    pub async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<()> {
        let url = self.endpoint(&["collections", name]);
        let body = CollectionConfig::new(vector_size, distance);
        debug!("Creating collection {} ({} dims, {})", name, vector_size, distance);

        let response = self.http.put(url).json(&body).send().await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT || body.contains("already exists") {
            return Err(VectorError::AlreadyExists(name.to_string()));
        }
        Err(VectorError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Names of all collections; empty when there are none
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["collections"]);
        let response = self.http.get(url).send().await?;
        let list: CollectionsList = Self::read_result(response, None).await?;
        Ok(list.collections.into_iter().map(|c| c.name).collect())
    }

    /// Insert or replace `points` in one request
    pub async fn upsert_points(&self, collection: &str, points: &[Point]) -> Result<()> {
        let url = self.endpoint(&["collections", collection, "points"]);
        debug!("Upserting {} points into {}", points.len(), collection);

        let response = self
            .http
            .put(url)
            .json(&UpsertRequest { points })
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(VectorError::NotFound(collection.to_string()));
        }
        Err(VectorError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Nearest neighbours of `query_vector`, in the service's order
    pub async fn search_points(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>> {
        let url = self.endpoint(&["collections", collection, "points", "search"]);
        let request = SearchRequest {
            vector: query_vector,
            limit,
            score_threshold,
            with_payload: true,
            with_vector: false,
        };

        let response = self.http.post(url).json(&request).send().await?;
        Self::read_result(response, Some(collection)).await
    }

    /// Unwrap the `result` field of a successful response
    async fn read_result<T: DeserializeOwned>(
        response: reqwest::Response,
        collection: Option<&str>,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            if let Some(name) = collection {
                return Err(VectorError::NotFound(name.to_string()));
            }
        }
        if !status.is_success() {
            return Err(VectorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| VectorError::Malformed(e.to_string()))?;
        if let Some(time) = envelope.time {
            debug!("Service reported {:.3}s", time);
        }
        envelope
            .result
            .ok_or_else(|| VectorError::Malformed("response has no result field".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PointId;
    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    /// In-memory stand-in for the vector service
    #[derive(Clone, Default)]
    struct MockStore {
        collections: Arc<Mutex<BTreeMap<String, Vec<Point>>>>,
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            dot / (na * nb)
        }
    }

    async fn health() -> Json<Value> {
        Json(json!({"title": "mock", "version": "0.0.0", "status": "ok"}))
    }

    async fn list(State(store): State<MockStore>) -> Json<Value> {
        let names: Vec<Value> = store
            .collections
            .lock()
            .unwrap()
            .keys()
            .map(|name| json!({"name": name}))
            .collect();
        Json(json!({"result": {"collections": names}, "status": "ok", "time": 0.0001}))
    }

    async fn create(
        State(store): State<MockStore>,
        Path(name): Path<String>,
        Json(_body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        let mut collections = store.collections.lock().unwrap();
        if collections.contains_key(&name) {
            let msg = format!("Wrong input: Collection `{}` already exists!", name);
            return (AxumStatus::CONFLICT, Json(json!({"status": {"error": msg}})));
        }
        collections.insert(name, Vec::new());
        (AxumStatus::OK, Json(json!({"result": true, "status": "ok"})))
    }

    async fn upsert(
        State(store): State<MockStore>,
        Path(name): Path<String>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        let mut collections = store.collections.lock().unwrap();
        let Some(stored) = collections.get_mut(&name) else {
            return (AxumStatus::NOT_FOUND, Json(json!({"status": {"error": "Not found"}})));
        };
        let points: Vec<Point> = serde_json::from_value(body["points"].clone()).unwrap();
        for point in points {
            stored.retain(|p| p.id != point.id);
            stored.push(point);
        }
        (
            AxumStatus::OK,
            Json(json!({"result": {"operation_id": 0, "status": "acknowledged"}, "status": "ok"})),
        )
    }

    async fn search(
        State(store): State<MockStore>,
        Path(name): Path<String>,
        Json(body): Json<Value>,
    ) -> (AxumStatus, Json<Value>) {
        let collections = store.collections.lock().unwrap();
        let Some(stored) = collections.get(&name) else {
            return (AxumStatus::NOT_FOUND, Json(json!({"status": {"error": "Not found"}})));
        };
        let query: Vec<f32> = serde_json::from_value(body["vector"].clone()).unwrap();
        let limit = body["limit"].as_u64().unwrap() as usize;
        let threshold = body["score_threshold"].as_f64().unwrap_or(f64::MIN) as f32;

        let mut hits: Vec<(f32, &Point)> = stored
            .iter()
            .map(|p| (cosine(&query, &p.vector), p))
            .filter(|(score, _)| *score >= threshold)
            .collect();
        hits.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        let result: Vec<Value> = hits
            .into_iter()
            .take(limit)
            .map(|(score, p)| json!({"id": p.id, "version": 0, "score": score, "payload": p.payload}))
            .collect();
        (AxumStatus::OK, Json(json!({"result": result, "status": "ok", "time": 0.0002})))
    }

    async fn serve(router: Router) -> VectorClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        VectorClient::new(&VectorStoreConfig::new(format!("http://{}", addr))).unwrap()
    }

    async fn mock_service() -> VectorClient {
        let router = Router::new()
            .route("/health", get(health))
            .route("/collections", get(list))
            .route("/collections/:name", put(create))
            .route("/collections/:name/points", put(upsert))
            .route("/collections/:name/points/search", post(search))
            .with_state(MockStore::default());
        serve(router).await
    }

    /// A client pointed at a port nothing listens on
    fn unreachable_client() -> VectorClient {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        VectorClient::new(&VectorStoreConfig::new(format!("http://{}", addr))).unwrap()
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            VectorClient::new(&VectorStoreConfig::new("")),
            Err(VectorError::Config(_))
        ));
        assert!(matches!(
            VectorClient::new(&VectorStoreConfig::new("not a url")),
            Err(VectorError::Config(_))
        ));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = VectorClient::new(&VectorStoreConfig::new("http://localhost:6333/")).unwrap();
        assert_eq!(
            client.endpoint(&["collections", "my docs", "points"]).as_str(),
            "http://localhost:6333/collections/my%20docs/points"
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let client = mock_service().await;
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_requires_ok_status() {
        let router = Router::new().route("/health", get(|| async { Json(json!({"status": "degraded"})) }));
        let client = serve(router).await;
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let client = mock_service().await;
        assert!(client.list_collections().await.unwrap().is_empty());

        client
            .create_collection("prompt_embeddings", 4, Distance::Cosine)
            .await
            .unwrap();
        let names = client.list_collections().await.unwrap();
        assert_eq!(names, vec!["prompt_embeddings".to_string()]);
    }

    #[tokio::test]
    async fn test_create_existing_collection_is_distinguishable() {
        let client = mock_service().await;
        client.create_collection("dup", 4, Distance::Dot).await.unwrap();

        let err = client.create_collection("dup", 4, Distance::Dot).await.unwrap_err();
        assert!(matches!(err, VectorError::AlreadyExists(ref name) if name == "dup"));
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let client = mock_service().await;
        client.create_collection("docs", 2, Distance::Cosine).await.unwrap();

        let points = vec![
            Point::new(1, vec![1.0, 0.0]).with_payload("text", "east"),
            Point::new(2, vec![0.0, 1.0]).with_payload("text", "north"),
            Point::new("5c56c793-69f3-4fbf-87e6-c4bf54c28c26", vec![0.7, 0.7])
                .with_payload("text", "north-east"),
        ];
        client.upsert_points("docs", &points).await.unwrap();

        let hits = client
            .search_points("docs", &[1.0, 0.1], 2, Some(DEFAULT_SCORE_THRESHOLD))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, PointId::Num(1));
        assert_eq!(hits[0].field("text"), Some(&json!("east")));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_with_no_matches_is_empty_not_error() {
        let client = mock_service().await;
        client.create_collection("docs", 2, Distance::Cosine).await.unwrap();
        client
            .upsert_points("docs", &[Point::new(1, vec![1.0, 0.0])])
            .await
            .unwrap();

        let hits = client
            .search_points("docs", &[-1.0, 0.0], DEFAULT_SEARCH_LIMIT, Some(0.9))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_missing_collection() {
        let client = mock_service().await;
        let err = client
            .upsert_points("nope", &[Point::new(1, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::NotFound(_)));

        let err = client.search_points("nope", &[1.0], 5, None).await.unwrap_err();
        assert!(matches!(err, VectorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let router = Router::new().route("/collections", get(|| async { "definitely not json" }));
        let client = serve(router).await;
        let err = client.list_collections().await.unwrap_err();
        assert!(matches!(err, VectorError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_server_error_keeps_status() {
        let router = Router::new().route(
            "/collections",
            get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "storage offline") }),
        );
        let client = serve(router).await;
        let err = client.list_collections().await.unwrap_err();
        assert!(matches!(err, VectorError::Status { status: 500, ref body } if body == "storage offline"));
    }

    #[tokio::test]
    async fn test_transport_failures_never_escape() {
        let client = unreachable_client();

        assert!(!client.health_check().await);
        assert!(client
            .create_collection("c", 4, Distance::Cosine)
            .await
            .unwrap_err()
            .is_transport());
        assert!(client.list_collections().await.unwrap_err().is_transport());
        assert!(client
            .upsert_points("c", &[Point::new(1, vec![0.0; 4])])
            .await
            .unwrap_err()
            .is_transport());
        assert!(client
            .search_points("c", &[0.0; 4], 5, None)
            .await
            .unwrap_err()
            .is_transport());
    }
}
