//! Wire types for the vector store API

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Similarity metric of a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    #[default]
    Cosine,
    #[serde(rename = "Euclid")]
    Euclidean,
    Dot,
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distance::Cosine => write!(f, "cosine"),
            Distance::Euclidean => write!(f, "euclidean"),
            Distance::Dot => write!(f, "dot"),
        }
    }
}

impl FromStr for Distance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Distance::Cosine),
            "euclidean" | "euclid" => Ok(Distance::Euclidean),
            "dot" => Ok(Distance::Dot),
            other => Err(format!("Unknown distance metric: {}", other)),
        }
    }
}

/// Body of a create-collection request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub vectors: VectorParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: Distance,
}

impl CollectionConfig {
    pub fn new(size: usize, distance: Distance) -> Self {
        Self {
            vectors: VectorParams { size, distance },
        }
    }
}

/// Point identifier: unsigned integer or UUID string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Num(u64),
    Uuid(String),
}

impl std::fmt::Display for PointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointId::Num(n) => write!(f, "{}", n),
            PointId::Uuid(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for PointId {
    fn from(n: u64) -> Self {
        PointId::Num(n)
    }
}

impl From<&str> for PointId {
    fn from(s: &str) -> Self {
        PointId::Uuid(s.to_string())
    }
}

/// One vector plus its payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Point {
    pub fn new(id: impl Into<PointId>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: Map::new(),
        }
    }

    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Body of an upsert request; all points travel in one batch
#[derive(Debug, Serialize)]
pub struct UpsertRequest<'a> {
    pub points: &'a [Point],
}

/// Body of a search request
#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub vector: &'a [f32],
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
    pub with_payload: bool,
    pub with_vector: bool,
}

/// A search hit, in the order the service returned it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    #[serde(default)]
    pub version: Option<u64>,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

impl ScoredPoint {
    /// Payload field by name
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }
}

/// Envelope every API response is wrapped in
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub result: Option<T>,
    #[serde(default)]
    pub time: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionsList {
    #[serde(default)]
    pub collections: Vec<CollectionDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDescription {
    pub name: String,
}
