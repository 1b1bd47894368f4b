//! Integration tests for add/update/delete/get through the service layer.

use anyhow::Result;
use serde_json::json;
use vecstore_schema::{
    ApiError, CollectionService, EmbeddingValue, InMemoryEngine, MetadataValue, SchemaConfig,
    ValidationReason,
};

mod common;
use common::{seeded, service};

/// Parallel arrays shorter than ids are rejected before the engine sees them.
#[tokio::test]
async fn add_length_mismatch_is_validation_error() -> Result<()> {
    let svc = service();
    svc.create_collection(&json!({"name": "dml"})).await?;

    let res = svc
        .add(
            "dml",
            &json!({
                "ids": ["a", "b"],
                "documents": ["x", "y"],
                "metadatas": [{"t": 1}]
            }),
        )
        .await;
    match res {
        Err(ApiError::Validation(err)) => {
            assert_eq!(err.field, "metadatas");
            assert_eq!(
                err.reason,
                ValidationReason::LengthMismatch {
                    expected: 2,
                    actual: 1
                }
            );
        }
        other => panic!("expected ApiError::Validation, got: {other:?}"),
    }
    assert_eq!(svc.count("dml").await?, 0);
    Ok(())
}

/// Validation fails first even when the collection does not exist.
#[tokio::test]
async fn validation_precedes_storage_lookup() -> Result<()> {
    let svc = service();
    let res = svc.add("missing", &json!({"ids": []})).await;
    assert!(matches!(res, Err(ApiError::Validation(_))));

    let res = svc.add("missing", &json!({"ids": ["a"]})).await;
    assert!(matches!(res, Err(ApiError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn add_then_get_roundtrip() -> Result<()> {
    let svc = service();
    seeded(&svc, "rt").await?;
    assert_eq!(svc.count("rt").await?, 3);

    let got = svc
        .get(
            "rt",
            &json!({"ids": ["a"], "include": ["embeddings", "metadatas", "documents"]}),
        )
        .await?;
    assert_eq!(got.ids, vec!["a".to_string()]);
    // integers sent as integers come back as integers
    assert_eq!(
        got.embeddings.as_ref().unwrap()[0],
        Some(vec![EmbeddingValue::Int(0); 3])
    );
    assert_eq!(
        got.documents.as_ref().unwrap()[0].as_deref(),
        Some("rust integration test")
    );
    let meta = got.metadatas.as_ref().unwrap()[0].as_ref().unwrap();
    assert_eq!(meta["tag"], MetadataValue::Str("x".into()));

    let value = serde_json::to_value(&got)?;
    assert_eq!(value["embeddings"], json!([[0, 0, 0]]));
    Ok(())
}

#[tokio::test]
async fn add_duplicate_id_is_conflict() -> Result<()> {
    let svc = service();
    seeded(&svc, "dup").await?;
    let res = svc.add("dup", &json!({"ids": ["a"], "documents": ["again"]})).await;
    assert!(matches!(res, Err(ApiError::Conflict(_))));
    assert_eq!(svc.count("dup").await?, 3);
    Ok(())
}

#[tokio::test]
async fn update_changes_only_supplied_fields() -> Result<()> {
    let svc = service();
    seeded(&svc, "upd").await?;

    svc.update(
        "upd",
        &json!({
            "ids": ["a", "b"],
            "documents": ["rewritten", null],
            "metadatas": [null, {"score": 99}]
        }),
    )
    .await?;

    let got = svc
        .get("upd", &json!({"ids": ["a", "b"], "include": ["documents", "metadatas"]}))
        .await?;
    let docs = got.documents.unwrap();
    let metas = got.metadatas.unwrap();
    assert_eq!(docs[0].as_deref(), Some("rewritten"));
    assert_eq!(docs[1].as_deref(), Some("other document"));
    assert_eq!(
        metas[0].as_ref().unwrap()["score"],
        MetadataValue::Int(10)
    );
    let b_meta = metas[1].as_ref().unwrap();
    assert_eq!(b_meta["score"], MetadataValue::Int(99));
    assert_eq!(b_meta["tag"], MetadataValue::Str("y".into()));
    Ok(())
}

#[tokio::test]
async fn update_unknown_id_is_not_found_and_applies_nothing() -> Result<()> {
    let svc = service();
    seeded(&svc, "upd_nf").await?;

    let res = svc
        .update(
            "upd_nf",
            &json!({"ids": ["a", "zzz"], "documents": ["changed", "changed"]}),
        )
        .await;
    assert!(matches!(res, Err(ApiError::NotFound(_))));

    let got = svc
        .get("upd_nf", &json!({"ids": ["a"], "include": ["documents"]}))
        .await?;
    assert_eq!(
        got.documents.unwrap()[0].as_deref(),
        Some("rust integration test")
    );
    Ok(())
}

#[tokio::test]
async fn delete_by_ids_and_filters() -> Result<()> {
    let svc = service();
    seeded(&svc, "del").await?;

    svc.delete("del", &json!({"ids": ["b", "not-there"]})).await?;
    assert_eq!(svc.count("del").await?, 2);

    svc.delete("del", &json!({"where_document": {"$contains": "databases"}}))
        .await?;
    let got = svc.get("del", &json!({})).await?;
    assert_eq!(got.ids, vec!["a".to_string()]);
    Ok(())
}

#[tokio::test]
async fn empty_delete_is_rejected_but_explicit_empty_filter_deletes_all() -> Result<()> {
    let svc = service();
    seeded(&svc, "del_all").await?;

    let res = svc.delete("del_all", &json!({})).await;
    assert!(matches!(res, Err(ApiError::Validation(_))));
    assert_eq!(svc.count("del_all").await?, 3);

    svc.delete("del_all", &json!({"where": {}})).await?;
    assert_eq!(svc.count("del_all").await?, 0);
    Ok(())
}

#[tokio::test]
async fn delete_with_unknown_operator_is_filter_syntax_error() -> Result<()> {
    let svc = service();
    seeded(&svc, "del_syntax").await?;

    let res = svc
        .delete("del_syntax", &json!({"where": {"score": {"$between": [1, 2]}}}))
        .await;
    assert!(matches!(res, Err(ApiError::FilterSyntax(_))));
    assert_eq!(svc.count("del_syntax").await?, 3);
    Ok(())
}

#[tokio::test]
async fn get_paging_and_sort() -> Result<()> {
    let svc = service();
    seeded(&svc, "page").await?;

    let got = svc
        .get("page", &json!({"ids": ["x"], "limit": 10, "offset": 0}))
        .await?;
    assert!(got.ids.is_empty());

    let got = svc
        .get("page", &json!({"ids": ["a", "c"], "limit": 10, "offset": 0}))
        .await?;
    assert_eq!(got.ids, vec!["a".to_string(), "c".to_string()]);

    let got = svc.get("page", &json!({"limit": 2, "offset": 1})).await?;
    assert_eq!(got.ids, vec!["b".to_string(), "c".to_string()]);

    let got = svc
        .get("page", &json!({"sort": "tag", "limit": 2, "include": []}))
        .await?;
    assert_eq!(got.ids, vec!["a".to_string(), "c".to_string()]);
    assert_eq!(serde_json::to_value(&got)?, json!({"ids": ["a", "c"]}));
    Ok(())
}

#[tokio::test]
async fn get_default_include_omits_embeddings() -> Result<()> {
    let svc = service();
    seeded(&svc, "inc").await?;

    let got = svc.get("inc", &json!({"where": {"tag": "x"}})).await?;
    assert_eq!(got.ids, vec!["a".to_string(), "c".to_string()]);
    assert!(got.embeddings.is_none());
    assert!(got.metadatas.is_some());
    assert!(got.documents.is_some());

    let value = serde_json::to_value(&got)?;
    assert!(value.get("embeddings").is_none());
    Ok(())
}

#[tokio::test]
async fn batch_cap_from_config() -> Result<()> {
    let svc = CollectionService::with_config(
        InMemoryEngine::new(),
        SchemaConfig::default().with_max_batch_size(2),
    );
    svc.create_collection(&json!({"name": "capped"})).await?;

    let res = svc.add("capped", &json!({"ids": ["a", "b", "c"]})).await;
    match res {
        Err(ApiError::Validation(err)) => {
            assert_eq!(
                err.reason,
                ValidationReason::BatchTooLarge { max: 2, actual: 3 }
            );
        }
        other => panic!("expected batch size error, got: {other:?}"),
    }
    svc.add("capped", &json!({"ids": ["a", "b"]})).await?;
    assert_eq!(svc.count("capped").await?, 2);
    Ok(())
}

#[tokio::test]
async fn batch_cap_covers_get_and_delete_ids() -> Result<()> {
    let svc = CollectionService::with_config(
        InMemoryEngine::new(),
        SchemaConfig::default().with_max_batch_size(2),
    );
    svc.create_collection(&json!({"name": "capped_read"})).await?;
    svc.add("capped_read", &json!({"ids": ["a", "b"]})).await?;

    let three = json!({"ids": ["a", "b", "c"]});
    match svc.get("capped_read", &three).await {
        Err(ApiError::Validation(err)) => {
            assert_eq!(err.field, "ids");
            assert_eq!(
                err.reason,
                ValidationReason::BatchTooLarge { max: 2, actual: 3 }
            );
        }
        other => panic!("expected batch size error, got: {other:?}"),
    }
    let res = svc.delete("capped_read", &three).await;
    assert!(matches!(res, Err(ApiError::Validation(_))));
    assert_eq!(svc.count("capped_read").await?, 2);

    // filters are not capped
    svc.delete("capped_read", &json!({"where": {}})).await?;
    assert_eq!(svc.count("capped_read").await?, 0);
    Ok(())
}

#[tokio::test]
async fn emptied_collection_accepts_new_dimension() -> Result<()> {
    let svc = service();
    svc.create_collection(&json!({"name": "redim"})).await?;
    svc.add("redim", &json!({"ids": ["a"], "embeddings": [[1, 2]]}))
        .await?;

    svc.delete("redim", &json!({"where": {}})).await?;
    assert_eq!(svc.count("redim").await?, 0);

    svc.add("redim", &json!({"ids": ["b"], "embeddings": [[1, 2, 3]]}))
        .await?;
    let got = svc
        .get("redim", &json!({"ids": ["b"], "include": ["embeddings"]}))
        .await?;
    assert_eq!(
        got.embeddings.unwrap()[0],
        Some(vec![
            EmbeddingValue::Int(1),
            EmbeddingValue::Int(2),
            EmbeddingValue::Int(3)
        ])
    );
    Ok(())
}
