//! Loading a note into the editor pane.
//!
//! Every entry point (sidebar click, programmatic navigation, `popstate`) goes
//! through [`controller::NoteLoader::load`]. Loads are sequenced so only the
//! latest request may touch the pane.

pub(crate) mod controller;

use leptos::prelude::*;

/// Query parameters carried over when the URL switches to another note.
pub(crate) const PRESERVED_PARAMS: [&str; 6] = [
    "search",
    "tags_search",
    "workspace",
    "folder",
    "preserve_notes",
    "preserve_tags",
];

pub(crate) const CACHE_BUST_PARAM: &str = "_refresh";

/// When the sidebar selection follows the load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum SelectionTiming {
    /// Highlight the clicked entry immediately.
    #[default]
    Before,
    /// Highlight once the note has arrived.
    After,
    Never,
}

#[derive(Clone, Default)]
pub(crate) struct LoadOptions {
    pub selection: SelectionTiming,
    pub cache_bust: bool,
    /// Overrides the configured load timeout.
    pub timeout_ms: Option<u32>,
    pub push_history: bool,
    /// Runs after the load settles with whether it succeeded. Skipped for superseded loads.
    pub on_complete: Option<Callback<bool>>,
}

impl LoadOptions {
    pub fn click() -> Self {
        Self {
            selection: SelectionTiming::Before,
            push_history: true,
            ..Default::default()
        }
    }

    pub fn navigate() -> Self {
        Self {
            selection: SelectionTiming::After,
            push_history: true,
            ..Default::default()
        }
    }

    /// Back/forward navigation: the URL is already right.
    pub fn history() -> Self {
        Self {
            selection: SelectionTiming::After,
            push_history: false,
            ..Default::default()
        }
    }

    /// Re-fetch the open note, bypassing caches.
    pub fn refresh() -> Self {
        Self {
            selection: SelectionTiming::Never,
            cache_bust: true,
            push_history: false,
            ..Default::default()
        }
    }

    pub fn with_on_complete(mut self, cb: Callback<bool>) -> Self {
        self.on_complete = Some(cb);
        self
    }

    pub(crate) fn notify(&self, ok: bool) {
        if let Some(cb) = self.on_complete {
            cb.run(ok);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LoadToken(u64);

/// Latest-wins sequencing for note loads. The loading flag belongs to the
/// newest token only, so an abandoned request can never leave it stuck.
#[derive(Clone, Debug, Default)]
pub(crate) struct LoadSequencer {
    latest: u64,
    loading: bool,
}

impl LoadSequencer {
    pub fn begin(&mut self) -> LoadToken {
        self.latest += 1;
        self.loading = true;
        LoadToken(self.latest)
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        token.0 == self.latest
    }

    /// Settles `token`. Returns false when a newer load superseded it.
    pub fn finish(&mut self, token: LoadToken) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.loading = false;
        true
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}

pub(crate) fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |s: &str| {
                let s = s.replace('+', " ");
                urlencoding::decode(&s)
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| s.clone())
            };
            (decode(k), decode(v))
        })
        .collect()
}

pub(crate) fn query_param(query: &str, key: &str) -> Option<String> {
    parse_query(query)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

/// Query string for a note, keeping the preserved parameters of `current_query`.
pub(crate) fn note_query(current_query: &str, note_id: &str, workspace: &str) -> String {
    let current = parse_query(current_query);
    let mut pairs: Vec<(String, String)> = vec![("note".to_string(), note_id.to_string())];
    if !workspace.is_empty() {
        pairs.push(("workspace".to_string(), workspace.to_string()));
    }
    for key in PRESERVED_PARAMS {
        if pairs.iter().any(|(k, _)| k == key) {
            continue;
        }
        if let Some((_, v)) = current.iter().find(|(k, v)| k == key && !v.is_empty()) {
            pairs.push((key.to_string(), v.clone()));
        }
    }

    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", encoded.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn newer_load_supersedes_older() {
        let mut seq = LoadSequencer::default();
        let first = seq.begin();
        let second = seq.begin();

        assert!(!seq.finish(first));
        assert!(seq.is_loading());

        assert!(seq.finish(second));
        assert!(!seq.is_loading());
    }

    #[test]
    fn failed_latest_load_clears_flag() {
        let mut seq = LoadSequencer::default();
        let t = seq.begin();
        // Error, timeout and parse failures all settle through `finish`.
        assert!(seq.finish(t));
        assert!(!seq.is_loading());
    }

    #[test]
    fn stale_response_after_latest_settled_is_dropped() {
        let mut seq = LoadSequencer::default();
        let old = seq.begin();
        let new = seq.begin();
        assert!(seq.finish(new));
        assert!(!seq.finish(old));
        assert!(!seq.is_loading());
    }

    #[test]
    fn note_query_keeps_search_context_and_drops_refresh() {
        let q = note_query(
            "?note=3&search=hello+world&_refresh=123&folder=Work&unrelated=1",
            "42",
            "Poznote",
        );
        assert_eq!(q, "?note=42&workspace=Poznote&search=hello%20world&folder=Work");
        assert!(!q.contains(CACHE_BUST_PARAM));
    }

    #[test]
    fn explicit_workspace_wins_over_current() {
        let q = note_query("?workspace=Old&tags_search=a%20b", "5", "New");
        assert_eq!(q, "?note=5&workspace=New&tags_search=a%20b");
    }

    #[test]
    fn query_param_decodes() {
        assert_eq!(query_param("?tags_search=a%20b&x=", "tags_search").as_deref(), Some("a b"));
        assert_eq!(query_param("?x=", "x"), None);
    }

    #[test]
    fn entry_points_differ_in_history_and_selection() {
        assert!(LoadOptions::click().push_history);
        assert!(!LoadOptions::history().push_history);
        assert_eq!(LoadOptions::refresh().selection, SelectionTiming::Never);
        assert!(LoadOptions::refresh().cache_bust);
    }
}
