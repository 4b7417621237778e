use crate::error::ApiError;
use crate::models::CollectionMap;

/// Resolve a GraphQL query name to the internal collection id.
///
/// An empty map means the refresh workflow never published one, which is a
/// server-side problem; a populated map without the name is the caller's.
pub fn resolve_collection(map: &CollectionMap, graphql_name: &str) -> Result<String, ApiError> {
    if map.is_empty() {
        return Err(ApiError::MappingNotConfigured);
    }
    map.get(graphql_name)
        .cloned()
        .ok_or_else(|| ApiError::UnknownCollection {
            name: graphql_name.to_string(),
            valid: map.keys().cloned().collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> CollectionMap {
        CollectionMap::from([
            ("Posts".to_string(), "posts".to_string()),
            ("Photographies".to_string(), "photography".to_string()),
        ])
    }

    #[test]
    fn resolves_known_name() {
        assert_eq!(resolve_collection(&map(), "Photographies").unwrap(), "photography");
    }

    #[test]
    fn empty_map_is_not_configured() {
        let err = resolve_collection(&CollectionMap::new(), "Posts").unwrap_err();
        assert!(matches!(err, ApiError::MappingNotConfigured));
    }

    #[test]
    fn unknown_name_lists_valid_keys() {
        match resolve_collection(&map(), "Comments").unwrap_err() {
            ApiError::UnknownCollection { name, valid } => {
                assert_eq!(name, "Comments");
                assert_eq!(valid, vec!["Photographies", "Posts"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(resolve_collection(&map(), "posts").is_err());
    }
}
