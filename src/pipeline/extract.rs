//! Document-id extraction from a shared Google Docs URL.

use crate::error::BookletError;
use once_cell::sync::Lazy;
use regex::Regex;

/// A Docs/Drive link carries the opaque id in a `/d/<id>` path segment;
/// ids are letters, digits, hyphen, underscore.
static DOC_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("valid literal regex"));

/// Extract the document id from a URL.
///
/// Fails with [`BookletError::InvalidReference`] when no `/d/<id>` segment
/// exists. No side effects, no network.
pub fn extract_document_id(url: &str) -> Result<String, BookletError> {
    DOC_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| BookletError::InvalidReference {
            url: url.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_edit_link() {
        let url = "https://docs.google.com/document/d/1AbC-d_E2f/edit#heading=h.x";
        assert_eq!(extract_document_id(url).unwrap(), "1AbC-d_E2f");
    }

    #[test]
    fn extracts_id_from_bare_share_link() {
        assert_eq!(
            extract_document_id("https://docs.google.com/document/d/ABC123/").unwrap(),
            "ABC123"
        );
    }

    #[test]
    fn id_stops_at_first_disallowed_character() {
        assert_eq!(
            extract_document_id("/d/abc123?usp=sharing").unwrap(),
            "abc123"
        );
    }

    #[test]
    fn rejects_url_without_segment() {
        for url in [
            "https://docs.google.com/document/",
            "https://example.com/files/ABC123",
            "",
            "/d/",
        ] {
            let err = extract_document_id(url).unwrap_err();
            assert!(
                matches!(err, BookletError::InvalidReference { .. }),
                "expected InvalidReference for {url:?}"
            );
        }
    }
}
