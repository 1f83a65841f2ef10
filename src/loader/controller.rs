use super::{note_query, query_param, LoadOptions, LoadSequencer, SelectionTiming};
use crate::api::with_timeout;
use crate::attachments::migrate_base64_images;
use crate::autosave::controller::AutosaveController;
use crate::autosave::ActiveNote;
use crate::drafts::{clear_draft, draft_override, load_draft};
use crate::models::{Note, NoteType};
use crate::search::{highlight_html, SearchMode};
use crate::state::AppContext;
use crate::storage::LocalStorage;
use crate::util::{now_ms, push_url, title_fields};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::{window_event_listener, WindowListenerHandle};

fn location_search() -> String {
    web_sys::window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

#[derive(Clone)]
pub(crate) struct NoteLoader {
    app_state: AppContext,
    autosave: AutosaveController,
    seq: StoredValue<LoadSequencer>,
    _popstate_handle: StoredValue<Option<WindowListenerHandle>>,
}

impl NoteLoader {
    pub fn new(app_state: AppContext, autosave: AutosaveController) -> Self {
        let s = Self {
            app_state,
            autosave,
            seq: StoredValue::new(LoadSequencer::default()),
            _popstate_handle: StoredValue::new(None),
        };
        s.start_history_listener();
        s
    }

    fn start_history_listener(&self) {
        let s2 = self.clone();
        let handle = window_event_listener(ev::popstate, move |_ev: web_sys::PopStateEvent| {
            match query_param(&location_search(), "note") {
                Some(id) => s2.load(id, LoadOptions::history()),
                None => s2.close(),
            }
        });
        self._popstate_handle.set_value(Some(handle));
    }

    /// Search mode from the current URL, falling back to the sidebar search bar.
    pub fn detect_search_mode(&self) -> SearchMode {
        let st = &self.app_state.0;
        let query = location_search();
        SearchMode::detect(
            query_param(&query, "search").as_deref(),
            query_param(&query, "tags_search").as_deref(),
            &st.search_query.get_untracked(),
            st.search_kind.get_untracked(),
        )
    }

    pub fn load(&self, note_id: String, opts: LoadOptions) {
        if note_id.trim().is_empty() {
            opts.notify(false);
            return;
        }
        let st = &self.app_state.0;
        if !self.is_open(&note_id) {
            self.autosave.flush_pending();
        }

        let token = self.seq.try_update_value(|s| s.begin());
        let Some(token) = token else {
            return;
        };
        st.note_loading.set(true);
        st.note_error.set(None);
        if opts.selection == SelectionTiming::Before {
            st.selected_note_id.set(Some(note_id.clone()));
        }

        let api_client = st.api_client.get_untracked();
        let workspace = st.workspace.get_untracked();
        let timeout = opts.timeout_ms.unwrap_or(st.config.load_timeout_ms);
        let cache_bust = opts.cache_bust.then(now_ms);
        log::debug!("loading note {note_id}");

        let s2 = self.clone();
        spawn_local(async move {
            let res = with_timeout(
                api_client.get_note(&note_id, &workspace, cache_bust),
                timeout,
            )
            .await;

            let current = s2
                .seq
                .try_update_value(|s| s.finish(token))
                .unwrap_or(false);
            if !current {
                log::debug!("dropping superseded load of note {note_id}");
                return;
            }

            let st = &s2.app_state.0;
            st.note_loading.set(false);
            match res {
                Ok(note) => {
                    s2.apply(note, &opts);
                    opts.notify(true);
                }
                Err(e) => {
                    log::warn!("loading note {note_id} failed: {e}");
                    st.note_error.set(Some(e.to_string()));
                    st.toasts.error(format!("Could not open note: {e}"));
                    opts.notify(false);
                }
            }
        });
    }

    /// Puts a freshly fetched note on screen and re-initialises everything bound to it.
    fn apply(&self, note: Note, opts: &LoadOptions) {
        let st = &self.app_state.0;
        let note_id = note.id.clone();
        let workspace = note
            .workspace
            .clone()
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| st.workspace.get_untracked());

        // Edits typed into the previous note while this one was loading.
        if !self.is_open(&note_id) {
            self.autosave.flush_pending();
        }

        let (title_value, title_placeholder) = title_fields(&note.heading);
        let draft = load_draft(&LocalStorage, &note_id);
        let restored = draft_override(&draft, &note.content, &title_value, &note.tags);
        if restored.is_none() {
            clear_draft(&LocalStorage, &note_id);
        }
        let restored = restored.unwrap_or_default();

        let mode = self.detect_search_mode();
        let content = restored.content.clone().unwrap_or_else(|| note.content.clone());
        let content = if note.note_type == NoteType::Note {
            highlight_html(&content, mode.note_terms())
        } else {
            content
        };

        let buffer = st.buffer;
        buffer
            .title
            .set(restored.title.clone().unwrap_or(title_value));
        buffer.title_placeholder.set(title_placeholder);
        buffer
            .tags
            .set(restored.tags.clone().unwrap_or_else(|| note.tags.clone()));
        buffer.replace_content(content);
        st.search_mode.set(mode);
        st.attachments.set(vec![]);
        st.active_note.set(Some(note.clone()));
        if opts.selection != SelectionTiming::Never {
            st.selected_note_id.set(Some(note_id.clone()));
        }

        if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
            let heading = if note.heading.trim().is_empty() {
                "Poznote".to_string()
            } else {
                note.heading.clone()
            };
            doc.set_title(&heading);
        }

        self.autosave.activate(ActiveNote::Note(note_id.clone()));
        if !restored.is_empty() {
            log::debug!("restored local draft of note {note_id}");
            st.toasts.info("Restored unsaved local changes");
            self.autosave.on_edit();
        }

        if opts.push_history {
            push_url(&note_query(&location_search(), &note_id, &workspace));
        }

        self.refresh_attachments(&note_id, &workspace);
        if note.note_type == NoteType::Note {
            let source = restored.content.unwrap_or(note.content);
            self.migrate_inline_images(note_id, workspace, source);
        }
    }

    pub fn is_open(&self, note_id: &str) -> bool {
        self.autosave.active_note_id().as_deref() == Some(note_id)
    }

    pub fn refresh_attachments(&self, note_id: &str, workspace: &str) {
        let api_client = self.app_state.0.api_client.get_untracked();
        let (note_id, workspace) = (note_id.to_string(), workspace.to_string());
        let s2 = self.clone();
        spawn_local(async move {
            match api_client.list_attachments(&note_id, &workspace).await {
                Ok(list) if s2.is_open(&note_id) => s2.app_state.0.attachments.set(list),
                Ok(_) => {}
                Err(e) => log::warn!("listing attachments of note {note_id} failed: {e}"),
            }
        });
    }

    fn migrate_inline_images(&self, note_id: String, workspace: String, loaded_html: String) {
        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let Some(migration) =
                migrate_base64_images(&api_client, &note_id, &workspace, &loaded_html).await
            else {
                return;
            };
            if !s2.is_open(&note_id) {
                return;
            }

            let st = &s2.app_state.0;
            let report = &migration.report;
            if !report.converted.is_empty() {
                // Only image sources change; text typed during the uploads stays.
                if let Some(html) = migration.apply_to(&st.buffer.content.get_untracked()) {
                    st.buffer.replace_content(html);
                    s2.autosave.on_edit();
                }
                s2.refresh_attachments(&note_id, &workspace);
            }
            if report.failed.is_empty() {
                st.toasts.success(report.summary());
            } else {
                st.toasts.error(report.summary());
            }
        });
    }

    /// Supersedes any load in flight so its response is dropped.
    fn cancel_pending(&self) {
        self.seq.update_value(|s| {
            let token = s.begin();
            s.finish(token);
        });
        self.app_state.0.note_loading.set(false);
    }

    /// Re-fetches the open note, bypassing caches.
    pub fn reload_current(&self) {
        if let Some(id) = self.autosave.active_note_id() {
            self.load(id, LoadOptions::refresh());
        }
    }

    /// Switches the pane to search results. Edits there are never saved.
    pub fn show_search(&self) {
        let st = &self.app_state.0;
        self.autosave.flush_pending();
        self.cancel_pending();
        st.active_note.set(None);
        st.selected_note_id.set(None);
        st.search_mode.set(self.detect_search_mode());
        self.autosave.activate(ActiveNote::Search);
    }

    /// Empties the pane after saving what is still pending.
    pub fn close(&self) {
        self.autosave.flush_pending();
        self.autosave.activate(ActiveNote::None);
        self.clear_pane();
    }

    /// Empties the pane after the open note was deleted. Pending edits are dropped.
    pub fn close_deleted(&self) {
        self.autosave.discard();
        self.clear_pane();
    }

    fn clear_pane(&self) {
        let st = &self.app_state.0;
        self.cancel_pending();
        st.active_note.set(None);
        st.selected_note_id.set(None);
        st.attachments.set(vec![]);
        st.buffer.title.set(String::new());
        st.buffer.tags.set(String::new());
        st.buffer.replace_content(String::new());
    }
}
