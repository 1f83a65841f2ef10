//! Interpretation of the legacy `updatenote.php` response.
//!
//! The endpoint has answered in three shapes over time: a JSON envelope, a bare
//! `1`, and a free-form "last saved" string. Everything else is a rejection so
//! the edit tracker keeps the note marked unsaved.

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum SaveOutcome {
    /// Saved. Carries the server's "last saved" label when it sent one.
    Saved { last_saved: Option<String> },
    Rejected(String),
}

/// Form body of a save. Field names are the ones `updatenote.php` reads.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub(crate) struct SaveNoteRequest {
    pub id: String,
    pub heading: String,
    pub entry: String,
    pub entrycontent: String,
    pub tags: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    pub workspace: String,
}

/// JSON body of `PATCH /api/v1/notes/{id}`, sent with `keepalive` while the
/// page unloads. Carries every edited field of a [`SaveNoteRequest`].
#[derive(Serialize, Clone, Debug, PartialEq)]
pub(crate) struct NoteUpdate<'a> {
    pub heading: &'a str,
    pub content: &'a str,
    pub tags: &'a str,
    pub folder: Option<&'a str>,
    pub folder_id: Option<&'a str>,
    pub workspace: &'a str,
}

impl SaveNoteRequest {
    pub fn as_update(&self) -> NoteUpdate<'_> {
        NoteUpdate {
            heading: &self.heading,
            content: &self.entry,
            tags: &self.tags,
            folder: self.folder.as_deref(),
            folder_id: self.folder_id.as_deref(),
            workspace: &self.workspace,
        }
    }
}

fn json_message(v: &serde_json::Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
        .map(str::to_string)
}

pub(crate) fn parse_save_response(body: &str) -> SaveOutcome {
    let trimmed = body.trim();

    if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(obj) = v.as_object() {
            let failed = obj.get("success").and_then(|s| s.as_bool()) == Some(false)
                || obj.get("status").and_then(|s| s.as_str()) == Some("error")
                || (obj.contains_key("error") && !obj.contains_key("success"));
            if failed {
                return SaveOutcome::Rejected(
                    json_message(&v).unwrap_or_else(|| "Save failed".to_string()),
                );
            }
            let last_saved = ["last_saved", "updated"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(|s| s.as_str()))
                .map(str::to_string);
            return SaveOutcome::Saved { last_saved };
        }
        if v.as_i64() == Some(1) {
            return SaveOutcome::Saved { last_saved: None };
        }
    }

    if trimmed == "1" {
        return SaveOutcome::Saved { last_saved: None };
    }
    if trimmed.is_empty() {
        return SaveOutcome::Rejected("Empty response from server".to_string());
    }
    // PHP fatal errors and login redirects come back as HTML pages.
    if trimmed.starts_with('<') {
        return SaveOutcome::Rejected("Unexpected HTML response from server".to_string());
    }
    SaveOutcome::Saved {
        last_saved: Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_one_is_legacy_success() {
        assert_eq!(parse_save_response("1\n"), SaveOutcome::Saved { last_saved: None });
    }

    #[test]
    fn date_string_is_last_saved_label() {
        assert_eq!(
            parse_save_response("Last modified on 2024-05-01 10:00"),
            SaveOutcome::Saved {
                last_saved: Some("Last modified on 2024-05-01 10:00".into())
            }
        );
    }

    #[test]
    fn json_error_is_rejected() {
        assert_eq!(
            parse_save_response(r#"{"status":"error","message":"heading is required"}"#),
            SaveOutcome::Rejected("heading is required".into())
        );
        assert_eq!(
            parse_save_response(r#"{"success":false}"#),
            SaveOutcome::Rejected("Save failed".into())
        );
        assert_eq!(
            parse_save_response(r#"{"error":"Note not found"}"#),
            SaveOutcome::Rejected("Note not found".into())
        );
    }

    #[test]
    fn json_success_carries_updated_label() {
        assert_eq!(
            parse_save_response(r#"{"success":true,"updated":"10:42"}"#),
            SaveOutcome::Saved {
                last_saved: Some("10:42".into())
            }
        );
    }

    #[test]
    fn empty_and_html_bodies_are_rejected() {
        assert!(matches!(parse_save_response("  "), SaveOutcome::Rejected(_)));
        assert!(matches!(
            parse_save_response("<html><body>Fatal error</body></html>"),
            SaveOutcome::Rejected(_)
        ));
    }

    #[test]
    fn unload_update_carries_title_tags_and_folder() {
        let req = SaveNoteRequest {
            id: "7".into(),
            heading: "Renamed".into(),
            entry: "a&nbsp;<br>b".into(),
            entrycontent: "a b".into(),
            tags: "work".into(),
            folder: Some("Projects".into()),
            folder_id: Some("3".into()),
            workspace: "Poznote".into(),
        };
        let v = serde_json::to_value(req.as_update()).expect("serialize");
        assert_eq!(
            v,
            serde_json::json!({
                "heading": "Renamed",
                "content": "a&nbsp;<br>b",
                "tags": "work",
                "folder": "Projects",
                "folder_id": "3",
                "workspace": "Poznote"
            })
        );
    }

    #[test]
    fn request_omits_missing_folder() {
        let req = SaveNoteRequest {
            id: "7".into(),
            heading: "T".into(),
            entry: "<p>x</p>".into(),
            entrycontent: "x".into(),
            tags: "a b".into(),
            folder: None,
            folder_id: None,
            workspace: "Poznote".into(),
        };
        let v = serde_json::to_value(&req).expect("serialize");
        assert!(v.get("folder").is_none());
        assert_eq!(v["id"], "7");
    }
}
