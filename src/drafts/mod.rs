use crate::search::strip_highlights;
use crate::storage::KvStore;

/// Unsaved local copy of a note, kept until the server confirms a save.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct NoteDraft {
    pub content: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
}

impl NoteDraft {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.title.is_none() && self.tags.is_none()
    }
}

fn content_key(note_id: &str) -> String {
    format!("poznote_draft_{note_id}")
}

fn title_key(note_id: &str) -> String {
    format!("poznote_title_{note_id}")
}

fn tags_key(note_id: &str) -> String {
    format!("poznote_tags_{note_id}")
}

/// Search highlights are view-only and never stored.
pub(crate) fn write_draft(
    store: &impl KvStore,
    note_id: &str,
    content: &str,
    title: &str,
    tags: &str,
) {
    if note_id.trim().is_empty() {
        return;
    }
    store.set(&content_key(note_id), &strip_highlights(content));
    store.set(&title_key(note_id), title);
    store.set(&tags_key(note_id), tags);
}

pub(crate) fn load_draft(store: &impl KvStore, note_id: &str) -> NoteDraft {
    if note_id.trim().is_empty() {
        return NoteDraft::default();
    }
    NoteDraft {
        content: store.get(&content_key(note_id)),
        title: store.get(&title_key(note_id)),
        tags: store.get(&tags_key(note_id)),
    }
}

pub(crate) fn clear_draft(store: &impl KvStore, note_id: &str) {
    store.remove(&content_key(note_id));
    store.remove(&title_key(note_id));
    store.remove(&tags_key(note_id));
}

/// Fields of `draft` that differ from the server copy. `None` when the draft adds nothing.
pub(crate) fn draft_override(
    draft: &NoteDraft,
    server_content: &str,
    server_title: &str,
    server_tags: &str,
) -> Option<NoteDraft> {
    let pick = |local: &Option<String>, server: &str| {
        local.as_ref().filter(|v| v.as_str() != server).cloned()
    };
    let content = draft.content.as_deref().map(strip_highlights);
    let out = NoteDraft {
        content: pick(&content, server_content),
        title: pick(&draft.title, server_title),
        tags: pick(&draft.tags, server_tags),
    };
    (!out.is_empty()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::highlight_html;
    use crate::storage::memory::MemoryStore;

    #[test]
    fn draft_uses_per_field_keys() {
        let store = MemoryStore::default();
        write_draft(&store, "42", "<p>hi</p>", "Title", "a b");
        assert_eq!(store.get("poznote_draft_42").as_deref(), Some("<p>hi</p>"));
        assert_eq!(store.get("poznote_title_42").as_deref(), Some("Title"));
        assert_eq!(store.get("poznote_tags_42").as_deref(), Some("a b"));

        clear_draft(&store, "42");
        assert!(load_draft(&store, "42").is_empty());
    }

    #[test]
    fn override_only_reports_changed_fields() {
        let draft = NoteDraft {
            content: Some("<p>local</p>".into()),
            title: Some("Same".into()),
            tags: None,
        };
        let o = draft_override(&draft, "<p>server</p>", "Same", "x").expect("content differs");
        assert_eq!(o.content.as_deref(), Some("<p>local</p>"));
        assert!(o.title.is_none());
        assert!(o.tags.is_none());
    }

    #[test]
    fn identical_draft_is_not_an_override() {
        let draft = NoteDraft {
            content: Some("c".into()),
            title: Some("t".into()),
            tags: Some("g".into()),
        };
        assert_eq!(draft_override(&draft, "c", "t", "g"), None);
    }

    #[test]
    fn highlighted_draft_matches_clean_server_copy() {
        let store = MemoryStore::default();
        let server = "<p>Budget for q3</p>";
        let on_screen = highlight_html(server, &["budget".to_string()]);
        write_draft(&store, "9", &on_screen, "Plan", "");

        assert_eq!(store.get("poznote_draft_9").as_deref(), Some(server));
        assert_eq!(draft_override(&load_draft(&store, "9"), server, "Plan", ""), None);
    }

    #[test]
    fn legacy_highlighted_draft_is_cleaned_before_compare() {
        let draft = NoteDraft {
            content: Some(r#"<p><span class="search-highlight">Budget</span> q3!</p>"#.into()),
            title: None,
            tags: None,
        };
        let o = draft_override(&draft, "<p>Budget q3</p>", "", "").expect("content differs");
        assert_eq!(o.content.as_deref(), Some("<p>Budget q3!</p>"));
    }

    #[test]
    fn blank_note_id_is_ignored() {
        let store = MemoryStore::default();
        write_draft(&store, " ", "c", "t", "g");
        assert!(store.items.borrow().is_empty());
    }
}
