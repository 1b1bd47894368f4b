#![cfg(feature = "sync")]
//! Integration tests for the synchronous (`sync` feature) wrapper.

use anyhow::Result;
use serde_json::json;
use vecstore_schema::{ApiError, InMemoryEngine, SchemaConfig, SyncCollectionService};

fn sync_service() -> Result<SyncCollectionService<InMemoryEngine>> {
    Ok(SyncCollectionService::with_config(
        InMemoryEngine::new(),
        SchemaConfig::default(),
    )?)
}

/// Basic DML roundtrip using the blocking wrapper.
#[test]
fn sync_collection_dml_roundtrip() -> Result<()> {
    let svc = sync_service()?;
    svc.create_collection(&json!({"name": "sync_coll", "metadata": {"hnsw:space": "cosine"}}))?;

    svc.add(
        "sync_coll",
        &json!({
            "ids": ["s1", "s2"],
            "embeddings": [[1, 0, 0], [0, 1, 0]],
            "documents": ["first", "second"],
            "metadatas": [{"n": 1}, {"n": 2}]
        }),
    )?;
    assert_eq!(svc.count("sync_coll")?, 2);

    svc.update("sync_coll", &json!({"ids": ["s2"], "documents": ["second, edited"]}))?;
    let got = svc.get("sync_coll", &json!({"ids": ["s2"], "include": ["documents"]}))?;
    assert_eq!(
        got.documents.unwrap()[0].as_deref(),
        Some("second, edited")
    );

    let qr = svc.query("sync_coll", &json!({"query_embeddings": [[0, 2, 0]], "n_results": 1}))?;
    assert_eq!(qr.ids, vec![vec!["s2".to_string()]]);

    svc.delete("sync_coll", &json!({"where": {"n": 1}}))?;
    assert_eq!(svc.count("sync_coll")?, 1);
    Ok(())
}

#[test]
fn sync_collection_admin_and_errors() -> Result<()> {
    let svc = sync_service()?;
    svc.create_collection(&json!({"name": "one"}))?;
    svc.update_collection("one", &json!({"new_name": "two"}))?;
    assert_eq!(svc.get_collection("two")?.name, "two");
    assert_eq!(svc.list_collections()?.len(), 1);

    let res = svc.add("two", &json!({"ids": "not-a-list"}));
    assert!(matches!(res, Err(ApiError::Validation(_))));

    svc.delete_collection("two")?;
    assert!(matches!(svc.get_collection("two"), Err(ApiError::NotFound(_))));

    // clones share the same engine
    let other = svc.clone();
    other.create_collection(&json!({"name": "shared"}))?;
    assert_eq!(svc.get_collection("shared")?.name, "shared");
    Ok(())
}
