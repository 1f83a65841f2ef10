use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Backend ids are integers in the database but show up as strings in some
/// legacy payloads; accept both.
fn id_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn opt_id_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() && s != "0" => Some(s),
        Some(serde_json::Value::Number(n)) if n.as_i64() != Some(0) => Some(n.to_string()),
        _ => None,
    })
}

fn bool_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(serde_json::Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum NoteType {
    #[default]
    Note,
    Markdown,
    Tasklist,
    #[serde(other)]
    Other,
}

impl NoteType {
    /// Notes whose body is edited as raw text rather than contenteditable HTML.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Markdown | Self::Tasklist)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct Note {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default, rename = "type")]
    pub note_type: NoteType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default, deserialize_with = "opt_id_from_any")]
    pub folder_id: Option<String>,
    #[serde(default, deserialize_with = "bool_from_any")]
    pub favorite: bool,
    #[serde(default)]
    pub workspace: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct Folder {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "opt_id_from_any")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// Folders the sidebar renders with fixed semantics. They cannot be dragged,
/// renamed or used as drop targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString)]
pub(crate) enum SystemFolder {
    Tags,
    Favorites,
    Trash,
    Public,
}

impl SystemFolder {
    pub fn from_name(name: &str) -> Option<Self> {
        name.trim().parse().ok()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Workspace {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Workspace {
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct Attachment {
    #[serde(deserialize_with = "id_from_any")]
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default, alias = "mime_type")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

impl Attachment {
    pub fn display_name(&self) -> &str {
        self.original_filename
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.filename)
    }
}

/// Public share settings of a note or folder.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct ShareSettings {
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "custom_token")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexable: Option<u8>,
}

/// What a share dialog publishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ShareTarget {
    Note { id: String, title: String },
    Folder { id: String, name: String },
}

impl ShareTarget {
    pub fn label(&self) -> &str {
        match self {
            Self::Note { title, .. } if title.trim().is_empty() => "Untitled",
            Self::Note { title, .. } => title,
            Self::Folder { name, .. } => name,
        }
    }

    pub fn api_path(&self) -> String {
        match self {
            Self::Note { id, .. } => format!("/api/v1/notes/{id}/share"),
            Self::Folder { id, .. } => format!("/api/v1/folders/{id}/share"),
        }
    }

    /// Path prefix of the public link when the server answers with a bare token.
    pub fn public_prefix(&self) -> &'static str {
        match self {
            Self::Note { .. } => "/",
            Self::Folder { .. } => "/folder/",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RecentFolder {
    pub id: String,
    pub name: String,
    pub last_opened_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_accepts_numeric_ids_and_zero_folder() {
        let n: Note = serde_json::from_str(
            r#"{"id": 42, "heading": "Todo", "type": "markdown", "tags": "a b", "folder_id": 0, "favorite": "1"}"#,
        )
        .expect("note should parse");
        assert_eq!(n.id, "42");
        assert_eq!(n.note_type, NoteType::Markdown);
        assert!(n.folder_id.is_none());
        assert!(n.favorite);
    }

    #[test]
    fn unknown_note_type_is_other() {
        let n: Note = serde_json::from_str(r#"{"id": "7", "type": "excalidraw"}"#).expect("parse");
        assert_eq!(n.note_type, NoteType::Other);
        assert!(!n.note_type.is_text());
    }

    #[test]
    fn system_folders_match_exact_names() {
        assert_eq!(SystemFolder::from_name("Tags"), Some(SystemFolder::Tags));
        assert_eq!(SystemFolder::from_name(" Trash "), Some(SystemFolder::Trash));
        assert_eq!(SystemFolder::from_name("Projects"), None);
    }

    #[test]
    fn attachment_mime_alias() {
        let a: Attachment = serde_json::from_str(
            r#"{"id": "abc", "filename": "x.png", "mime_type": "image/png", "file_size": 12}"#,
        )
        .expect("parse");
        assert_eq!(a.file_type.as_deref(), Some("image/png"));
        assert_eq!(a.display_name(), "x.png");
    }

    #[test]
    fn share_serializes_only_set_fields() {
        let s = ShareSettings {
            indexable: Some(1),
            ..Default::default()
        };
        let v = serde_json::to_value(&s).expect("serialize");
        assert_eq!(v, serde_json::json!({"indexable": 1}));
    }

    #[test]
    fn share_targets_have_their_own_endpoint() {
        let note = ShareTarget::Note {
            id: "4".into(),
            title: " ".into(),
        };
        assert_eq!(note.api_path(), "/api/v1/notes/4/share");
        assert_eq!(note.label(), "Untitled");

        let folder = ShareTarget::Folder {
            id: "9".into(),
            name: "Work".into(),
        };
        assert_eq!(folder.api_path(), "/api/v1/folders/9/share");
        assert_eq!(folder.label(), "Work");
    }
}
