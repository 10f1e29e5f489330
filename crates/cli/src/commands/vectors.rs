use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write;
use std::io::Read;
use std::path::Path;

use vectors::{Distance, Point, ScoredPoint, VectorClient, VectorError, VectorStoreConfig};

/// Collection used by the demo walkthrough
pub const DEMO_COLLECTION: &str = "prompt_embeddings";
/// Dimensionality of the demo vectors
pub const DEMO_VECTOR_SIZE: usize = 1536;

pub fn connect(config: &VectorStoreConfig, url: Option<String>) -> Result<VectorClient> {
    let mut config = config.clone();
    if let Some(url) = url {
        config.url = url;
    }
    VectorClient::new(&config).with_context(|| format!("Invalid vector store url: {}", config.url))
}

pub async fn handle_health(client: &VectorClient) -> Result<()> {
    if client.health_check().await {
        println!("Vector store at {} is healthy", client.base_url());
    } else {
        println!("Vector store at {} is not responding", client.base_url());
    }
    Ok(())
}

pub async fn handle_collections(client: &VectorClient) -> Result<()> {
    let names = client.list_collections().await?;
    if names.is_empty() {
        println!("No collections");
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub async fn handle_create(
    client: &VectorClient,
    name: &str,
    size: usize,
    distance: Distance,
) -> Result<()> {
    match client.create_collection(name, size, distance).await {
        Ok(()) => println!("Created collection {} ({} dims, {})", name, size, distance),
        Err(VectorError::AlreadyExists(_)) => println!("Collection {} already exists", name),
        Err(e) => return Err(e).with_context(|| format!("Failed to create collection {}", name)),
    }
    Ok(())
}

pub async fn handle_upsert(client: &VectorClient, collection: &str, source: &str) -> Result<()> {
    let points = read_points(source)?;
    client
        .upsert_points(collection, &points)
        .await
        .with_context(|| format!("Failed to upsert into {}", collection))?;
    println!("Upserted {} points into {}", points.len(), collection);
    Ok(())
}

pub async fn handle_search(
    client: &VectorClient,
    collection: &str,
    vector: &str,
    limit: usize,
    threshold: Option<f32>,
) -> Result<()> {
    let vector = parse_vector(vector)?;
    let hits = client
        .search_points(collection, &vector, limit, threshold)
        .await
        .with_context(|| format!("Search in {} failed", collection))?;

    println!("Found {} similar vectors:", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        print!("{}", format_hit(i + 1, hit));
    }
    Ok(())
}

/// Walk through every operation against a live service
///
/// Each step reports its own failure; only an unhealthy service stops the
/// walkthrough.
pub async fn run_demo(client: &VectorClient, collection: &str, size: usize) -> Result<()> {
    println!("Vector Store Walkthrough");
    println!("{}", "=".repeat(50));

    println!("1. Health Check...");
    if client.health_check().await {
        println!("Vector store is healthy!");
    } else {
        println!("Vector store at {} is not responding", client.base_url());
        return Ok(());
    }

    println!("\n2. Listing Collections...");
    match client.list_collections().await {
        Ok(names) => println!("Found {} collections: {:?}", names.len(), names),
        Err(e) => println!("Failed to list collections: {}", e),
    }

    println!("\n3. Creating Collection: {}", collection);
    match client.create_collection(collection, size, Distance::Cosine).await {
        Ok(()) => println!("Collection created successfully!"),
        Err(VectorError::AlreadyExists(_)) => println!("Collection already exists, reusing it"),
        Err(e) => println!("Collection creation failed: {}", e),
    }

    println!("\n4. Adding Sample Vectors...");
    match client.upsert_points(collection, &sample_points(size)).await {
        Ok(()) => println!("Sample vectors added successfully!"),
        Err(e) => println!("Failed to add sample vectors: {}", e),
    }

    println!("\n5. Searching for Similar Vectors...");
    let query = vec![0.15; size];
    match client
        .search_points(collection, &query, 3, Some(vectors::DEFAULT_SCORE_THRESHOLD))
        .await
    {
        Ok(hits) => {
            println!("Found {} similar vectors:", hits.len());
            for (i, hit) in hits.iter().enumerate() {
                println!("{}", format_hit(i + 1, hit));
            }
        }
        Err(e) => println!("Search failed: {}", e),
    }

    println!("Walkthrough complete");
    Ok(())
}

/// Three prompt records with constant mock embeddings
pub fn sample_points(size: usize) -> Vec<Point> {
    [
        (1_u64, 0.1_f32, "Generate a REST API for user authentication", "coagulatio", 8.5_f64),
        (2, 0.2, "Create a Python function for data validation", "solutio", 7.8),
        (3, 0.3, "Write unit tests for authentication system", "prima-materia", 9.1),
    ]
    .into_iter()
    .map(|(id, fill, text, phase, score)| {
        Point::new(id, vec![fill; size])
            .with_payload("text", text)
            .with_payload("type", "prompt")
            .with_payload("phase", phase)
            .with_payload("score", score)
    })
    .collect()
}

/// One numbered search hit: score, then the prompt fields of its payload
pub fn format_hit(rank: usize, hit: &ScoredPoint) -> String {
    let field = |key: &str| match hit.field(key) {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => "-".to_string(),
    };

    let mut out = String::new();
    let _ = writeln!(out, "  {}. Score: {:.3}", rank, hit.score);
    let _ = writeln!(out, "     Text: {}", field("text"));
    let _ = writeln!(out, "     Phase: {}", field("phase"));
    let _ = writeln!(out, "     Quality: {}", field("score"));
    out
}

/// Parse a query vector
///
/// Accepts comma-separated components (`0.1,0.2,0.3`) or a constant fill
/// written as `value*dims` (`0.15*1536`).
pub fn parse_vector(spec: &str) -> Result<Vec<f32>> {
    let spec = spec.trim();
    if let Some((value, dims)) = spec.split_once('*') {
        let value: f32 = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid vector component: {}", value))?;
        let dims: usize = dims
            .trim()
            .parse()
            .with_context(|| format!("Invalid dimension count: {}", dims))?;
        if dims == 0 {
            bail!("Vector must have at least one dimension");
        }
        return Ok(vec![value; dims]);
    }

    let vector = spec
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .with_context(|| format!("Invalid vector component: {}", part))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(vector)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointsFile {
    Wrapped { points: Vec<Point> },
    Bare(Vec<Point>),
}

/// Read points from a JSON file, or stdin for `-`
///
/// Either a bare array or an upsert body (`{"points": [...]}`).
pub fn read_points(source: &str) -> Result<Vec<Point>> {
    let contents = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read points from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("Failed to read points file: {}", source))?
    };

    let parsed: PointsFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse points from {}", source))?;
    Ok(match parsed {
        PointsFile::Wrapped { points } | PointsFile::Bare(points) => points,
    })
}
