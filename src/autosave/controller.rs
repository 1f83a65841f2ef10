use super::{marked_title, ActiveNote, EditTracker, SaveTicket};
use crate::api::{ApiError, SaveNoteRequest};
use crate::drafts::{clear_draft, write_draft};
use crate::search::strip_highlights;
use crate::state::AppContext;
use crate::storage::LocalStorage;
use crate::util::{effective_title, normalize_line_breaks, now_ms, plain_text};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::{window_event_listener, WindowListenerHandle};
use wasm_bindgen::JsCast;

/// App-wide auto-save for the active note.
///
/// Responsibilities:
/// - local drafts on every edit
/// - idle debounce through a periodic tick
/// - bounded retries for transient failures (see [`super::RetryPolicy`])
/// - saving pending edits before the editor moves to another note
/// - keepalive save when the page is hidden or unloaded, plus the leave warning
#[derive(Clone)]
pub(crate) struct AutosaveController {
    app_state: AppContext,
    tracker: StoredValue<EditTracker>,

    tick_ms: i32,
    tick_timer_id: RwSignal<Option<i32>>,

    /// Edit time already covered by an emergency save.
    emergency_sent_at: StoredValue<Option<i64>>,

    _online_handle: StoredValue<Option<WindowListenerHandle>>,
    _pagehide_handle: StoredValue<Option<WindowListenerHandle>>,
    _beforeunload_handle: StoredValue<Option<WindowListenerHandle>>,
}

const LEAVE_WARNING: &str = "You have unsaved changes. Are you sure you want to leave?";

impl AutosaveController {
    pub fn new(app_state: AppContext) -> Self {
        let tracker = StoredValue::new(EditTracker::from_config(&app_state.0.config));
        let tick_ms = app_state.0.config.autosave_tick_ms as i32;

        let s = Self {
            app_state,
            tracker,
            tick_ms,
            tick_timer_id: RwSignal::new(None),
            emergency_sent_at: StoredValue::new(None),
            _online_handle: StoredValue::new(None),
            _pagehide_handle: StoredValue::new(None),
            _beforeunload_handle: StoredValue::new(None),
        };

        s.start_global_listeners();
        s.start_tick_worker();

        s
    }

    pub fn active_note_id(&self) -> Option<String> {
        self.tracker
            .with_value(|t| t.active().note_id().map(str::to_string))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.tracker.with_value(|t| t.is_edited())
    }

    /// Called by the loader once a note (or the search view) is on screen.
    pub fn activate(&self, active: ActiveNote) {
        log::debug!("autosave bound to {active:?}");
        self.tracker.update_value(|t| t.activate(active));
        self.publish_status();
    }

    /// Called by the editor, title input and tag editor on each qualifying change.
    pub fn on_edit(&self) {
        let counted = self.tracker.try_update_value(|t| t.mark_edited(now_ms()));
        if counted != Some(true) {
            return;
        }

        if let Some(note_id) = self.active_note_id() {
            let buffer = self.app_state.0.buffer;
            write_draft(
                &LocalStorage,
                &note_id,
                &buffer.content.get_untracked(),
                &buffer.title.get_untracked(),
                &buffer.tags.get_untracked(),
            );
        }
        self.publish_status();
    }

    /// Sends the unsaved edits of the active note before the editor leaves it.
    /// Must run while the buffer still holds that note.
    pub fn flush_pending(&self) {
        let Some(ticket) = self.tracker.try_update_value(|t| t.take_pending()).flatten() else {
            return;
        };
        let Some(req) = self.build_request(&ticket.note_id) else {
            log::debug!("note {} left with an empty title, kept as draft", ticket.note_id);
            return;
        };
        log::info!("saving note {} before leaving it", req.id);

        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            match api_client.save_note(&req).await {
                Ok(_) => {
                    let reopened_dirty =
                        s2.active_note_id().as_deref() == Some(req.id.as_str()) && s2.has_unsaved_changes();
                    if !reopened_dirty {
                        clear_draft(&LocalStorage, &req.id);
                    }
                }
                Err(e) => s2.app_state.0.toasts.error(format!(
                    "Changes to \"{}\" were not saved: {e}. They are kept on this device.",
                    req.heading
                )),
            }
        });
    }

    /// Forgets the active note without saving, e.g. after it was deleted.
    pub fn discard(&self) {
        if let Some(note_id) = self.active_note_id() {
            clear_draft(&LocalStorage, &note_id);
        }
        self.activate(ActiveNote::None);
    }

    /// Manual save (toolbar button, Ctrl+S).
    pub fn save_now(&self) {
        let ticket = self.tracker.try_update_value(|t| t.save_now(now_ms())).flatten();
        if let Some(ticket) = ticket {
            self.run_save(ticket);
        }
    }

    fn tick(&self) {
        let ticket = self.tracker.try_update_value(|t| t.tick(now_ms())).flatten();
        if let Some(ticket) = ticket {
            self.run_save(ticket);
        }
    }

    fn publish_status(&self) {
        let status = self.tracker.with_value(|t| t.status());
        self.app_state.0.save_status.set(status);

        if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
            let title = doc.title();
            let next = marked_title(&title, status.is_dirty());
            if next != title {
                doc.set_title(&next);
            }
        }
    }

    fn build_request(&self, note_id: &str) -> Option<SaveNoteRequest> {
        let st = &self.app_state.0;
        let buffer = st.buffer;
        let heading = effective_title(
            &buffer.title.get_untracked(),
            &buffer.title_placeholder.get_untracked(),
        )?;

        let note = st.active_note.get_untracked();
        let is_text = note.as_ref().is_some_and(|n| n.note_type.is_text());
        let raw = strip_highlights(&buffer.content.get_untracked());
        let (entry, entrycontent) = if is_text {
            (raw.clone(), raw)
        } else {
            (normalize_line_breaks(&raw), plain_text(&raw))
        };

        Some(SaveNoteRequest {
            id: note_id.to_string(),
            heading,
            entry,
            entrycontent,
            tags: buffer.tags.get_untracked(),
            folder: note.as_ref().and_then(|n| n.folder.clone()),
            folder_id: note.as_ref().and_then(|n| n.folder_id.clone()),
            workspace: st.workspace.get_untracked(),
        })
    }

    fn run_save(&self, ticket: SaveTicket) {
        let Some(req) = self.build_request(&ticket.note_id) else {
            log::debug!("save of note {} skipped: empty title", ticket.note_id);
            self.tracker.update_value(|t| {
                t.abort(&ticket);
            });
            self.publish_status();
            return;
        };
        self.publish_status();

        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            let res = api_client.save_note(&req).await;
            let current = s2
                .tracker
                .try_update_value(|t| match &res {
                    Ok(_) => t.complete(&ticket, true, now_ms()),
                    Err(e) if e.is_transient() => t.complete(&ticket, false, now_ms()),
                    Err(_) => t.reject(&ticket),
                })
                .unwrap_or(false);
            if !current {
                log::debug!("dropping result of stale save for note {}", ticket.note_id);
                return;
            }

            let st = &s2.app_state.0;
            match res {
                Ok(last_saved) => {
                    if !s2.has_unsaved_changes() {
                        clear_draft(&LocalStorage, &ticket.note_id);
                    }
                    st.last_saved
                        .set(Some(last_saved.unwrap_or_else(|| "Last saved today".to_string())));
                }
                Err(e) => {
                    log::warn!("save of note {} failed: {e}", ticket.note_id);
                    let failed = s2.tracker.with_value(|t| t.status()) == super::SaveStatus::Failed;
                    if matches!(e, ApiError::Unauthorized) {
                        st.toasts.error("Session expired. Log in again to save.");
                    } else if failed {
                        st.toasts
                            .error(format!("Note could not be saved: {e}. Edit again to retry."));
                    }
                }
            }
            s2.publish_status();
        });
    }

    /// One last save while the page goes away: a keepalive `PATCH` with every
    /// field, or a content-only beacon when the browser refuses it.
    fn emergency_save(&self) {
        if !self.has_unsaved_changes() {
            return;
        }
        let Some(note_id) = self.active_note_id() else {
            return;
        };
        let edited_at = self.tracker.with_value(|t| t.last_edit_ms());
        if self.emergency_sent_at.get_value() == Some(edited_at) {
            return;
        }
        let Some(req) = self.build_request(&note_id) else {
            return;
        };

        let api_client = self.app_state.0.api_client.get_untracked();
        let sent = api_client.keepalive_save(&req)
            || api_client.beacon_save(&note_id, &req.entry, &req.workspace);
        if sent {
            self.emergency_sent_at.set_value(Some(edited_at));
        }
        log::debug!("emergency save of note {note_id} sent: {sent}");
    }

    fn start_tick_worker(&self) {
        if self.tick_timer_id.get_untracked().is_some() {
            return;
        }
        let Some(win) = web_sys::window() else {
            return;
        };

        let s2 = self.clone();
        let cb = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            s2.tick();
        }) as Box<dyn FnMut()>);

        let tid = win
            .set_interval_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                self.tick_ms,
            )
            .unwrap_or(0);
        self.tick_timer_id.set(Some(tid));

        // Lives for the whole app.
        cb.forget();
    }

    fn start_global_listeners(&self) {
        let s2 = self.clone();
        let online = window_event_listener(ev::online, move |_ev: web_sys::Event| {
            s2.tick();
        });
        self._online_handle.set_value(Some(online));

        let s3 = self.clone();
        let pagehide =
            window_event_listener(ev::pagehide, move |_ev: web_sys::PageTransitionEvent| {
                s3.emergency_save();
            });
        self._pagehide_handle.set_value(Some(pagehide));

        let s5 = self.clone();
        let beforeunload =
            window_event_listener(ev::beforeunload, move |ev: web_sys::BeforeUnloadEvent| {
                if !s5.has_unsaved_changes() {
                    return;
                }
                s5.emergency_save();
                ev.prevent_default();
                ev.set_return_value(LEAVE_WARNING);
            });
        self._beforeunload_handle.set_value(Some(beforeunload));

        // visibilitychange fires on the document, not the window.
        let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let s4 = self.clone();
        let doc2 = doc.clone();
        let cb = wasm_bindgen::closure::Closure::wrap(Box::new(move || {
            if doc2.visibility_state() == web_sys::VisibilityState::Hidden {
                s4.emergency_save();
            }
        }) as Box<dyn FnMut()>);
        let _ = doc.add_event_listener_with_callback("visibilitychange", cb.as_ref().unchecked_ref());
        cb.forget();
    }
}
