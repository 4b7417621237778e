//! Pulls the collection name out of a GraphQL query.
//!
//! This is a structural match, not a parser: the collection is the first
//! field selected after `query [Name] [($vars)] {`. Aliases, fragments and
//! multiple top-level fields are not understood. The build tool only sends
//! queries of that shape.

use once_cell::sync::Lazy;
use regex::Regex;

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"#[^\n]*").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
// Names are ASCII word characters; `\w` in `regex` would also take Unicode letters.
static FIRST_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"query\s*(?:[A-Za-z0-9_]+)?\s*(?:\([^)]*\))?\s*\{\s*([A-Za-z0-9_]+)")
        .expect("valid regex")
});

pub fn extract_collection_name(query: &str) -> Option<String> {
    let without_comments = COMMENT.replace_all(query, "");
    let normalized = WHITESPACE.replace_all(&without_comments, " ");
    FIRST_FIELD
        .captures(normalized.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_query() {
        assert_eq!(
            extract_collection_name("query { Posts { docs { id title } } }").as_deref(),
            Some("Posts")
        );
    }

    #[test]
    fn named_query_with_variables() {
        let query = "query GetPublished($limit: Int) { Posts(where: {...}) { docs { id } } }";
        assert_eq!(extract_collection_name(query).as_deref(), Some("Posts"));
    }

    #[test]
    fn multiline_query_with_comments() {
        let query = r#"
            # fetch the notes
            query GetPublished($limit: Int, $sort: String) {
              # first field wins
              WorkingNotes(where: { _status: { equals: published } }, limit: $limit) {
                docs { id }
                totalDocs
              }
            }
        "#;
        assert_eq!(extract_collection_name(query).as_deref(), Some("WorkingNotes"));
    }

    #[test]
    fn commented_out_query_is_ignored() {
        let query = "# query { Secret { id } }\nquery { Pages { docs { id } } }";
        assert_eq!(extract_collection_name(query).as_deref(), Some("Pages"));
    }

    #[test]
    fn no_selection_set_yields_none() {
        assert_eq!(extract_collection_name("query GetPublished($limit: Int) Posts"), None);
        assert_eq!(extract_collection_name("{ Posts { docs { id } } }"), None);
        assert_eq!(extract_collection_name(""), None);
    }

    #[test]
    fn names_stop_at_non_ascii_letters() {
        assert_eq!(
            extract_collection_name("query { Pöst { docs { id } } }").as_deref(),
            Some("P")
        );
        assert_eq!(extract_collection_name("query { Ünits { id } }"), None);
    }
}
