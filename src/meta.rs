/// Wire field names and collection naming rules.
use crate::error::{ValidationError, ValidationReason};

pub struct CollectionNames;

impl CollectionNames {
    /// Maximum allowed collection name length, in bytes.
    pub const MAX_NAME_LEN: usize = 64;

    /// Validate a collection name supplied under `field`.
    ///
    /// Current rules:
    /// - must be non-empty
    /// - must not exceed `MAX_NAME_LEN` bytes
    /// - must not contain control characters
    pub fn validate(field: &str, name: &str) -> Result<(), ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::new(field, ValidationReason::Empty));
        }

        if name.len() > Self::MAX_NAME_LEN {
            return Err(ValidationError::new(
                field,
                ValidationReason::Invalid(format!(
                    "collection name exceeds {} bytes",
                    Self::MAX_NAME_LEN
                )),
            ));
        }

        if name.chars().any(char::is_control) {
            return Err(ValidationError::new(
                field,
                ValidationReason::Invalid("collection name must not contain control characters".into()),
            ));
        }

        Ok(())
    }
}

/// Payload key names.
pub struct FieldNames;

impl FieldNames {
    /// Reported when the problem is the payload as a whole.
    pub const BODY: &'static str = "body";
    pub const IDS: &'static str = "ids";
    pub const EMBEDDINGS: &'static str = "embeddings";
    pub const METADATAS: &'static str = "metadatas";
    pub const DOCUMENTS: &'static str = "documents";
    pub const WHERE: &'static str = "where";
    pub const WHERE_DOCUMENT: &'static str = "where_document";
    pub const SORT: &'static str = "sort";
    pub const LIMIT: &'static str = "limit";
    pub const OFFSET: &'static str = "offset";
    pub const INCLUDE: &'static str = "include";
    pub const QUERY_EMBEDDINGS: &'static str = "query_embeddings";
    pub const N_RESULTS: &'static str = "n_results";
    pub const NAME: &'static str = "name";
    pub const METADATA: &'static str = "metadata";
    pub const GET_OR_CREATE: &'static str = "get_or_create";
    pub const NEW_NAME: &'static str = "new_name";
    pub const NEW_METADATA: &'static str = "new_metadata";
}

#[cfg(test)]
mod tests {
    use super::CollectionNames;
    use crate::error::ValidationReason;

    #[test]
    fn valid_collection_name_passes() {
        assert!(CollectionNames::validate("name", "my-collection_1").is_ok());
    }

    #[test]
    fn empty_collection_name_fails() {
        let err = CollectionNames::validate("name", "").unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.reason, ValidationReason::Empty);
    }

    #[test]
    fn control_chars_collection_name_fails() {
        let err = CollectionNames::validate("new_name", "bad\nname").unwrap_err();
        assert_eq!(err.field, "new_name");
        assert!(matches!(err.reason, ValidationReason::Invalid(_)));
    }

    #[test]
    fn too_long_collection_name_fails() {
        let long_name = "a".repeat(CollectionNames::MAX_NAME_LEN + 1);
        let err = CollectionNames::validate("name", &long_name).unwrap_err();
        assert!(matches!(err.reason, ValidationReason::Invalid(_)));
    }
}
