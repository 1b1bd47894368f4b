#![allow(dead_code)]

use anyhow::Result;
use serde_json::json;
use vecstore_schema::{CollectionService, InMemoryEngine, SchemaConfig};

/// Service over a fresh in-memory engine with default (non-env) configuration.
pub fn service() -> CollectionService<InMemoryEngine> {
    CollectionService::with_config(InMemoryEngine::new(), SchemaConfig::default())
}

/// Create `name` and add three records:
///
/// | id | embedding | metadata | document |
/// |----|-----------|----------|----------|
/// | a  | [0, 0, 0]   | score 10, tag x | "rust integration test" |
/// | b  | [1, 0, 0]   | score 20, tag y | "other document" |
/// | c  | [0, 1, 0]   | score 30, tag x | "rust and databases" |
pub async fn seeded(service: &CollectionService<InMemoryEngine>, name: &str) -> Result<()> {
    service.create_collection(&json!({ "name": name })).await?;
    service
        .add(
            name,
            &json!({
                "ids": ["a", "b", "c"],
                "embeddings": [[0, 0, 0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                "metadatas": [
                    {"score": 10, "tag": "x"},
                    {"score": 20, "tag": "y"},
                    {"score": 30, "tag": "x"}
                ],
                "documents": [
                    "rust integration test",
                    "other document",
                    "rust and databases"
                ]
            }),
        )
        .await?;
    Ok(())
}
