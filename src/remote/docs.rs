//! Structural editor client: document reads and atomic batched edits.
//!
//! Two mutations matter to the pipeline:
//!
//! * [`DocsClient::delete_before_second_break`] — remove the boilerplate
//!   that precedes the booklet body. Source documents open with tracking
//!   sheets and notes, then a page break, then a title page, then a second
//!   page break where the real content starts. Deleting `[1,
//!   second_break_start)` drops everything before that second break.
//! * [`DocsClient::replace_placeholders`] — instantiate the start-pages
//!   template by replacing each `{{token}}` with its literal value.
//!
//! Each mutation is one `batchUpdate` call, applied atomically upstream.
//! Neither is idempotent: re-running the deletion against an already
//! stripped document would cut into real content, so the orchestrator
//! never retries them.

use crate::auth::Authenticator;
use crate::error::BookletError;
use crate::remote::{error_from_response, transport_error};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

const DOCS_BASE: &str = "https://docs.googleapis.com/v1/documents";

// ── Document structure (the slice of the Docs schema we read) ────────────

/// Ordered structural content of a document, as returned by `documents.get`.
#[derive(Debug, Default, Deserialize)]
pub struct DocumentStructure {
    #[serde(default)]
    body: DocumentBody,
}

#[derive(Debug, Default, Deserialize)]
struct DocumentBody {
    #[serde(default)]
    content: Vec<StructuralElement>,
}

#[derive(Debug, Default, Deserialize)]
struct StructuralElement {
    #[serde(default)]
    paragraph: Option<Paragraph>,
}

#[derive(Debug, Default, Deserialize)]
struct Paragraph {
    #[serde(default)]
    elements: Vec<ParagraphElement>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphElement {
    #[serde(default)]
    start_index: i64,
    page_break: Option<Value>,
}

impl DocumentStructure {
    /// Start offsets of every page-break marker, in document order.
    pub fn page_break_offsets(&self) -> Vec<i64> {
        let mut offsets = Vec::new();
        for element in &self.body.content {
            if let Some(paragraph) = &element.paragraph {
                for elem in &paragraph.elements {
                    if elem.page_break.is_some() {
                        offsets.push(elem.start_index);
                    }
                }
            }
        }
        offsets
    }
}

/// What [`DocsClient::delete_before_second_break`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripOutcome {
    /// Fewer than two page breaks; no edit was issued.
    Skipped { breaks_found: usize },
    /// Content `[1, second_break_start)` was deleted.
    ///
    /// `breaks_remaining` is the page-break count the document should
    /// report once the edit is visible (the first break lay inside the
    /// deleted range).
    Applied { breaks_remaining: usize },
}

// ── Edit request builders ─────────────────────────────────────────────────

fn delete_range_request(start: i64, end: i64) -> Value {
    json!({
        "deleteContentRange": {
            "range": { "startIndex": start, "endIndex": end }
        }
    })
}

fn replace_all_request(token: &str, replacement: &str) -> Value {
    json!({
        "replaceAllText": {
            "containsText": { "text": token, "matchCase": true },
            "replaceText": replacement
        }
    })
}

/// Build the placeholder-substitution batch: one case-sensitive
/// replace-all sub-request per token.
fn placeholder_requests(map: &BTreeMap<String, String>) -> Vec<Value> {
    map.iter()
        .map(|(token, value)| replace_all_request(token, value))
        .collect()
}

// ── Client ────────────────────────────────────────────────────────────────

/// Docs REST client.
#[derive(Debug)]
pub struct DocsClient {
    http: reqwest::Client,
    auth: Arc<Authenticator>,
}

impl DocsClient {
    pub fn new(http: reqwest::Client, auth: Arc<Authenticator>) -> Self {
        Self { http, auth }
    }

    /// Fetch the document's structural content.
    pub async fn get_document(&self, doc_id: &str) -> Result<DocumentStructure, BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{DOCS_BASE}/{doc_id}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| transport_error("read-structure", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("read-structure", response).await);
        }
        response
            .json()
            .await
            .map_err(|e| transport_error("read-structure", e))
    }

    /// Apply a list of edits as one atomic batch.
    async fn batch_update(
        &self,
        doc_id: &str,
        requests: Vec<Value>,
        stage: &'static str,
    ) -> Result<(), BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{DOCS_BASE}/{doc_id}:batchUpdate");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| transport_error(stage, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(stage, response).await);
        }
        Ok(())
    }

    /// Delete everything before the second page break.
    ///
    /// With fewer than two breaks this is a logged no-op, not an error —
    /// some submissions arrive already stripped.
    pub async fn delete_before_second_break(
        &self,
        doc_id: &str,
    ) -> Result<StripOutcome, BookletError> {
        let structure = self.get_document(doc_id).await?;
        let offsets = structure.page_break_offsets();

        let Some(second_break) = offsets.get(1).copied() else {
            info!(
                doc_id,
                breaks = offsets.len(),
                "Fewer than two page breaks; nothing deleted"
            );
            return Ok(StripOutcome::Skipped {
                breaks_found: offsets.len(),
            });
        };

        self.batch_update(
            doc_id,
            vec![delete_range_request(1, second_break)],
            "strip-leading-content",
        )
        .await?;

        info!(doc_id, end = second_break, "Deleted content before second page break");
        Ok(StripOutcome::Applied {
            breaks_remaining: offsets.len() - 1,
        })
    }

    /// Replace every placeholder token with its mapped value, case
    /// sensitively, in one batch.
    pub async fn replace_placeholders(
        &self,
        doc_id: &str,
        map: &BTreeMap<String, String>,
    ) -> Result<(), BookletError> {
        if map.is_empty() {
            debug!(doc_id, "Empty placeholder map; nothing to replace");
            return Ok(());
        }
        self.batch_update(doc_id, placeholder_requests(map), "replace-placeholders")
            .await?;
        info!(doc_id, tokens = map.len(), "Placeholders substituted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure_with_breaks(offsets: &[i64]) -> DocumentStructure {
        let content: Vec<Value> = offsets
            .iter()
            .map(|off| {
                json!({
                    "paragraph": {
                        "elements": [
                            { "startIndex": off - 1, "textRun": { "content": "x" } },
                            { "startIndex": off, "pageBreak": {} }
                        ]
                    }
                })
            })
            .collect();
        let doc = json!({ "body": { "content": content } });
        serde_json::from_value(doc).unwrap()
    }

    #[test]
    fn page_break_offsets_in_document_order() {
        let structure = structure_with_breaks(&[12, 87, 240]);
        assert_eq!(structure.page_break_offsets(), vec![12, 87, 240]);
    }

    #[test]
    fn non_paragraph_elements_are_ignored() {
        let doc = json!({
            "body": {
                "content": [
                    { "sectionBreak": {} },
                    { "table": { "rows": 2 } },
                    { "paragraph": { "elements": [ { "startIndex": 5, "pageBreak": {} } ] } }
                ]
            }
        });
        let structure: DocumentStructure = serde_json::from_value(doc).unwrap();
        assert_eq!(structure.page_break_offsets(), vec![5]);
    }

    #[test]
    fn empty_document_has_no_breaks() {
        let structure: DocumentStructure = serde_json::from_str("{}").unwrap();
        assert!(structure.page_break_offsets().is_empty());
    }

    #[test]
    fn delete_request_shape() {
        let req = delete_range_request(1, 87);
        assert_eq!(
            req.pointer("/deleteContentRange/range/startIndex"),
            Some(&json!(1))
        );
        assert_eq!(
            req.pointer("/deleteContentRange/range/endIndex"),
            Some(&json!(87))
        );
    }

    #[test]
    fn replace_request_is_case_sensitive_and_literal() {
        let req = replace_all_request("{{title}}", "My Story");
        assert_eq!(
            req.pointer("/replaceAllText/containsText/text"),
            Some(&json!("{{title}}"))
        );
        assert_eq!(
            req.pointer("/replaceAllText/containsText/matchCase"),
            Some(&json!(true))
        );
        assert_eq!(
            req.pointer("/replaceAllText/replaceText"),
            Some(&json!("My Story"))
        );
    }

    #[test]
    fn placeholder_batch_is_exhaustive() {
        let mut map = BTreeMap::new();
        map.insert("{{a}}".to_string(), "1".to_string());
        map.insert("{{b}}".to_string(), "2".to_string());
        map.insert("{{c}}".to_string(), "3".to_string());
        let requests = placeholder_requests(&map);
        assert_eq!(requests.len(), 3);
        let tokens: Vec<&str> = requests
            .iter()
            .map(|r| {
                r.pointer("/replaceAllText/containsText/text")
                    .and_then(Value::as_str)
                    .unwrap()
            })
            .collect();
        assert_eq!(tokens, vec!["{{a}}", "{{b}}", "{{c}}"]);
    }
}
