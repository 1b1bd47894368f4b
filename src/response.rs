//! Outbound shaping: keep ids, plus exactly the fields named in `include`.

use crate::backend::{QueryMatch, RecordRow};
use crate::types::{GetResult, Include, IncludeField, QueryResult};

impl GetResult {
    /// Shape engine rows for a get response.
    ///
    /// Get computes no distances, so `distances` never appears even when
    /// requested (it is part of the default include set).
    pub fn from_rows(rows: Vec<RecordRow>, include: Include) -> Self {
        let mut result = GetResult {
            ids: Vec::with_capacity(rows.len()),
            embeddings: include
                .contains(IncludeField::Embeddings)
                .then(|| Vec::with_capacity(rows.len())),
            metadatas: include
                .contains(IncludeField::Metadatas)
                .then(|| Vec::with_capacity(rows.len())),
            documents: include
                .contains(IncludeField::Documents)
                .then(|| Vec::with_capacity(rows.len())),
        };

        for row in rows {
            result.ids.push(row.id);
            if let Some(embs) = result.embeddings.as_mut() {
                embs.push(row.embedding);
            }
            if let Some(metas) = result.metadatas.as_mut() {
                metas.push(row.metadata);
            }
            if let Some(docs) = result.documents.as_mut() {
                docs.push(row.document);
            }
        }

        result
    }
}

impl QueryResult {
    /// Shape per-query match lists for a query response.
    pub fn from_matches(matches: Vec<Vec<QueryMatch>>, include: Include) -> Self {
        let mut result = QueryResult {
            ids: Vec::with_capacity(matches.len()),
            embeddings: include.contains(IncludeField::Embeddings).then(Vec::new),
            metadatas: include.contains(IncludeField::Metadatas).then(Vec::new),
            documents: include.contains(IncludeField::Documents).then(Vec::new),
            distances: include.contains(IncludeField::Distances).then(Vec::new),
        };

        for hits in matches {
            let mut ids = Vec::with_capacity(hits.len());
            let mut embs = Vec::new();
            let mut metas = Vec::new();
            let mut docs = Vec::new();
            let mut dists = Vec::new();

            for QueryMatch { row, distance } in hits {
                ids.push(row.id);
                embs.push(row.embedding);
                metas.push(row.metadata);
                docs.push(row.document);
                dists.push(distance);
            }

            result.ids.push(ids);
            if let Some(all) = result.embeddings.as_mut() {
                all.push(embs);
            }
            if let Some(all) = result.metadatas.as_mut() {
                all.push(metas);
            }
            if let Some(all) = result.documents.as_mut() {
                all.push(docs);
            }
            if let Some(all) = result.distances.as_mut() {
                all.push(dists);
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmbeddingValue, Metadata, MetadataValue};
    use serde_json::json;

    fn row(id: &str) -> RecordRow {
        let mut metadata = Metadata::new();
        metadata.insert("t".into(), MetadataValue::Int(1));
        RecordRow {
            id: id.into(),
            embedding: Some(vec![EmbeddingValue::Float(0.5)]),
            metadata: Some(metadata),
            document: Some(format!("doc {id}")),
        }
    }

    #[test]
    fn get_with_documents_only_omits_other_keys() {
        let include = Include::from_fields([IncludeField::Documents]);
        let result = GetResult::from_rows(vec![row("a"), row("b")], include);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"ids": ["a", "b"], "documents": ["doc a", "doc b"]})
        );
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("embeddings"));
        assert!(!obj.contains_key("metadatas"));
        assert!(!obj.contains_key("distances"));
    }

    #[test]
    fn get_default_include() {
        let result = GetResult::from_rows(vec![row("a")], Include::default_get());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"ids": ["a"], "metadatas": [{"t": 1}], "documents": ["doc a"]})
        );
    }

    #[test]
    fn missing_fields_are_null_entries() {
        let bare = RecordRow {
            id: "x".into(),
            embedding: None,
            metadata: None,
            document: None,
        };
        let result = GetResult::from_rows(vec![bare], Include::all());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"ids": ["x"], "embeddings": [null], "metadatas": [null], "documents": [null]})
        );
    }

    #[test]
    fn query_documents_only() {
        let matches = vec![vec![
            QueryMatch {
                row: row("a"),
                distance: 0.1,
            },
            QueryMatch {
                row: row("b"),
                distance: 0.4,
            },
        ]];
        let include = Include::from_fields([IncludeField::Documents]);
        let value = serde_json::to_value(QueryResult::from_matches(matches, include)).unwrap();
        assert_eq!(
            value,
            json!({"ids": [["a", "b"]], "documents": [["doc a", "doc b"]]})
        );
    }

    #[test]
    fn query_default_include_has_distances() {
        let matches = vec![
            vec![QueryMatch {
                row: row("a"),
                distance: 0.25,
            }],
            vec![],
        ];
        let result = QueryResult::from_matches(matches, Include::default_query());
        assert_eq!(result.ids, vec![vec!["a".to_string()], vec![]]);
        assert_eq!(result.distances, Some(vec![vec![0.25], vec![]]));
        assert!(result.embeddings.is_none());
        assert_eq!(result.documents.as_ref().map(|d| d.len()), Some(2));
    }

    #[test]
    fn ids_only() {
        let result = QueryResult::from_matches(
            vec![vec![QueryMatch {
                row: row("a"),
                distance: 1.0,
            }]],
            Include::none(),
        );
        assert_eq!(
            serde_json::to_value(result).unwrap(),
            json!({"ids": [["a"]]})
        );
    }
}
