//! Client for a Qdrant-style vector database HTTP API
//!
//! Maps vector store operations onto HTTP calls and decodes the JSON
//! envelope (`{"result": ..., "status": ..., "time": ...}`) the service
//! wraps its answers in.
//!
//! | operation            | request                                   |
//! |----------------------|-------------------------------------------|
//! | `health_check`       | `GET /health`                             |
//! | `list_collections`   | `GET /collections`                        |
//! | `create_collection`  | `PUT /collections/{name}`                 |
//! | `upsert_points`      | `PUT /collections/{name}/points`          |
//! | `search_points`      | `POST /collections/{name}/points/search`  |
//!
//! Every operation except `health_check` returns a [`Result`] whose error
//! says why it failed, so an unreachable service, a duplicate collection and
//! an empty search are all told apart.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vectors::{Distance, Point, VectorClient, VectorStoreConfig};
//!
//! let client = VectorClient::new(&VectorStoreConfig::default())?;
//! if client.health_check().await {
//!     client.create_collection("docs", 384, Distance::Cosine).await?;
//!     client.upsert_points("docs", &[Point::new(1, vec![0.1; 384])]).await?;
//!     let hits = client.search_points("docs", &[0.1; 384], 5, Some(0.5)).await?;
//! }
//! ```

mod client;
mod config;
mod error;
mod types;

pub use client::{VectorClient, DEFAULT_SCORE_THRESHOLD, DEFAULT_SEARCH_LIMIT};
pub use config::{VectorStoreConfig, DEFAULT_URL};
pub use error::{Result, VectorError};
pub use types::{Distance, Point, PointId, ScoredPoint};
