//! The inbound submission and its placeholder rendering.
//!
//! A [`SubmissionRequest`] carries everything the front end collects: the
//! source document URL plus the text fields that fill the start-pages
//! template. Form values arrive with whatever line endings the browser sent,
//! so all string fields are normalised to `\n` before use — Google Docs
//! `replaceAllText` would otherwise embed literal `\r` characters in the
//! rendered booklet.

use std::collections::BTreeMap;

/// Placeholder tokens recognised by the start-pages template.
pub const TOKEN_TITLE: &str = "{{title}}";
pub const TOKEN_STORYTELLER_NAMES: &str = "{{storyteller_names}}";
pub const TOKEN_DIRECTOR_NAME: &str = "{{director_name}}";
pub const TOKEN_CREW_ID: &str = "{{crew_id}}";
pub const TOKEN_DEDICATION: &str = "{{dedication}}";
pub const TOKEN_YEAR: &str = "{{year}}";

/// One booklet request as submitted by the form front end.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SubmissionRequest {
    /// Link to the source Google Doc. Must contain a `/d/<id>` segment.
    pub source_url: String,
    /// Booklet title, substituted for `{{title}}`.
    pub title: String,
    /// Storyteller names; rendered sorted and comma-joined.
    pub storyteller_names: Vec<String>,
    /// Director name, substituted for `{{director_name}}`.
    pub director_name: String,
    /// Optional crew identifier; `{{crew_id}}` is only substituted when set.
    pub crew_id: Option<String>,
    /// Dedication text, substituted for `{{dedication}}`.
    pub dedication: String,
}

impl SubmissionRequest {
    /// Return a copy with CRLF/CR line endings collapsed to `\n` in every
    /// string field and storyteller names sorted.
    pub fn normalized(&self) -> Self {
        Self {
            source_url: normalize_newlines(&self.source_url),
            title: normalize_newlines(&self.title),
            storyteller_names: {
                let mut names: Vec<String> = self
                    .storyteller_names
                    .iter()
                    .map(|n| normalize_newlines(n))
                    .collect();
                names.sort();
                names
            },
            director_name: normalize_newlines(&self.director_name),
            crew_id: self.crew_id.as_deref().map(normalize_newlines),
            dedication: normalize_newlines(&self.dedication),
        }
    }

    /// Storyteller names rendered the way the template expects:
    /// sorted, comma-joined.
    pub fn joined_storyteller_names(&self) -> String {
        let mut names = self.storyteller_names.clone();
        names.sort();
        names.join(", ")
    }

    /// Build the placeholder map for the start-pages template.
    ///
    /// `{{year}}` is filled with the current calendar year at call time;
    /// `{{crew_id}}` appears only when the request carries one. Substitution
    /// is order-independent, so a `BTreeMap` keyed by token is enough.
    pub fn placeholder_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert(TOKEN_TITLE.to_string(), self.title.clone());
        map.insert(
            TOKEN_STORYTELLER_NAMES.to_string(),
            self.joined_storyteller_names(),
        );
        map.insert(TOKEN_DIRECTOR_NAME.to_string(), self.director_name.clone());
        if let Some(crew) = &self.crew_id {
            map.insert(TOKEN_CREW_ID.to_string(), crew.clone());
        }
        map.insert(TOKEN_DEDICATION.to_string(), self.dedication.clone());
        map.insert(
            TOKEN_YEAR.to_string(),
            chrono::Utc::now().format("%Y").to_string(),
        );
        map
    }
}

/// Collapse `\r\n` and lone `\r` to `\n`.
fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            source_url: "https://docs.google.com/document/d/ABC123/edit".into(),
            title: "My Story".into(),
            storyteller_names: vec!["Bob".into(), "Alice".into()],
            director_name: "Jane".into(),
            crew_id: None,
            dedication: "Thanks".into(),
        }
    }

    #[test]
    fn names_render_sorted_and_comma_joined() {
        assert_eq!(request().joined_storyteller_names(), "Alice, Bob");
    }

    #[test]
    fn normalization_collapses_line_endings() {
        let mut req = request();
        req.dedication = "line one\r\nline two\rline three".into();
        let norm = req.normalized();
        assert_eq!(norm.dedication, "line one\nline two\nline three");
    }

    #[test]
    fn normalization_sorts_names() {
        let norm = request().normalized();
        assert_eq!(norm.storyteller_names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn placeholder_map_covers_all_tokens() {
        let mut req = request();
        req.crew_id = Some("crew-7".into());
        let map = req.placeholder_map();
        assert_eq!(map[TOKEN_TITLE], "My Story");
        assert_eq!(map[TOKEN_STORYTELLER_NAMES], "Alice, Bob");
        assert_eq!(map[TOKEN_DIRECTOR_NAME], "Jane");
        assert_eq!(map[TOKEN_CREW_ID], "crew-7");
        assert_eq!(map[TOKEN_DEDICATION], "Thanks");
        // Year token is filled with a plausible calendar year.
        let year: i32 = map[TOKEN_YEAR].parse().unwrap();
        assert!((2020..2200).contains(&year));
    }

    #[test]
    fn crew_id_token_absent_when_not_supplied() {
        let map = request().placeholder_map();
        assert!(!map.contains_key(TOKEN_CREW_ID));
    }
}
