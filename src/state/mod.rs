use crate::api::ApiClient;
use crate::autosave::SaveStatus;
use crate::config::EnvConfig;
use crate::dnd::DragPayload;
use crate::models::{Attachment, Folder, Note, ShareTarget, Workspace};
use crate::search::{tag_search_query, SearchBarKind, SearchMode};
use crate::storage::{load_selected_workspace, LocalStorage};
use crate::tags::toggle_tag_search;
use crate::util::push_url;
use leptos::prelude::*;
use wasm_bindgen::JsCast;

pub(crate) const DEFAULT_WORKSPACE: &str = "Poznote";
const TOAST_MS: i32 = 4_000;

/// The editable fields of the open note. The editor writes here on every
/// input; saves and drafts read from here.
#[derive(Clone, Copy)]
pub(crate) struct EditorBuffer {
    pub title: RwSignal<String>,
    pub title_placeholder: RwSignal<String>,
    pub content: RwSignal<String>,
    pub tags: RwSignal<String>,
    /// Bumped when content is replaced from outside the editor so it re-renders its DOM.
    pub revision: RwSignal<u64>,
}

impl EditorBuffer {
    fn new() -> Self {
        Self {
            title: RwSignal::new(String::new()),
            title_placeholder: RwSignal::new("New note".to_string()),
            content: RwSignal::new(String::new()),
            tags: RwSignal::new(String::new()),
            revision: RwSignal::new(0),
        }
    }

    pub fn replace_content(&self, html: String) {
        self.content.set(html);
        self.revision.update(|r| *r += 1);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

/// User-visible notifications. Each toast dismisses itself after a few seconds.
#[derive(Clone, Copy)]
pub(crate) struct Toasts {
    pub items: RwSignal<Vec<Toast>>,
    next_id: StoredValue<u64>,
}

impl Toasts {
    fn new() -> Self {
        Self {
            items: RwSignal::new(vec![]),
            next_id: StoredValue::new(0),
        }
    }

    pub fn push(&self, kind: ToastKind, message: impl Into<String>) {
        let id = self.next_id.get_value() + 1;
        self.next_id.set_value(id);
        self.items.update(|items| {
            items.push(Toast {
                id,
                kind,
                message: message.into(),
            })
        });

        let items = self.items;
        if let Some(win) = web_sys::window() {
            let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
                items.update(|items| items.retain(|t| t.id != id));
            });
            let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                TOAST_MS,
            );
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(ToastKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(ToastKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.push(ToastKind::Error, message);
    }

    pub fn dismiss(&self, id: u64) {
        self.items.update(|items| items.retain(|t| t.id != id));
    }
}

#[derive(Clone)]
pub(crate) struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub on_confirm: Callback<()>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: EnvConfig,
    pub api_client: RwSignal<ApiClient>,

    pub workspace: RwSignal<String>,
    pub workspaces: RwSignal<Vec<Workspace>>,
    pub folders: RwSignal<Vec<Folder>>,
    pub notes: RwSignal<Vec<Note>>,
    pub notes_loading: RwSignal<bool>,
    /// Bumped to re-fetch folders and notes after a change on the server.
    pub refresh_tick: RwSignal<u64>,
    /// Known tags of the workspace, for suggestions.
    pub tag_cache: RwSignal<Vec<String>>,

    /// Sidebar folder filter; `None` lists every note of the workspace.
    pub current_folder_id: RwSignal<Option<String>>,
    pub selected_note_id: RwSignal<Option<String>>,
    pub active_note: RwSignal<Option<Note>>,
    pub note_loading: RwSignal<bool>,
    pub note_error: RwSignal<Option<String>>,
    pub buffer: EditorBuffer,
    pub attachments: RwSignal<Vec<Attachment>>,

    pub save_status: RwSignal<SaveStatus>,
    pub last_saved: RwSignal<Option<String>>,

    pub search_query: RwSignal<String>,
    pub search_kind: RwSignal<SearchBarKind>,
    pub search_mode: RwSignal<SearchMode>,

    /// Payload of the drag in progress, from `dragstart` to `dragend`.
    pub drag: RwSignal<Option<DragPayload>>,

    pub toasts: Toasts,
    pub confirm: RwSignal<Option<ConfirmRequest>>,
    pub note_picker_open: RwSignal<bool>,
    /// Note or folder whose share dialog is open.
    pub share_target: RwSignal<Option<ShareTarget>>,
}

impl AppState {
    pub fn new(config: EnvConfig) -> Self {
        let workspace = load_selected_workspace(&LocalStorage)
            .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());

        Self {
            api_client: RwSignal::new(ApiClient::new(config.api_url.clone())),
            config,
            workspace: RwSignal::new(workspace),
            workspaces: RwSignal::new(vec![]),
            folders: RwSignal::new(vec![]),
            notes: RwSignal::new(vec![]),
            notes_loading: RwSignal::new(false),
            refresh_tick: RwSignal::new(0),
            tag_cache: RwSignal::new(vec![]),
            current_folder_id: RwSignal::new(None),
            selected_note_id: RwSignal::new(None),
            active_note: RwSignal::new(None),
            note_loading: RwSignal::new(false),
            note_error: RwSignal::new(None),
            buffer: EditorBuffer::new(),
            attachments: RwSignal::new(vec![]),
            save_status: RwSignal::new(SaveStatus::Saved),
            last_saved: RwSignal::new(None),
            search_query: RwSignal::new(String::new()),
            search_kind: RwSignal::new(SearchBarKind::Notes),
            search_mode: RwSignal::new(SearchMode::None),
            drag: RwSignal::new(None),
            toasts: Toasts::new(),
            confirm: RwSignal::new(None),
            note_picker_open: RwSignal::new(false),
            share_target: RwSignal::new(None),
        }
    }

    pub fn request_refresh(&self) {
        self.refresh_tick.update(|t| *t += 1);
    }

    /// Tag chip click: toggles `tag` in the tag search and rewrites the URL to match.
    pub fn toggle_tag_filter(&self, tag: &str) {
        let current = self.search_mode.with_untracked(|m| m.tag_terms().join(" "));
        let next = toggle_tag_search(&current, tag);
        push_url(&tag_search_query(&next, &self.workspace.get_untracked()));
        self.search_kind.set(SearchBarKind::Tags);
        self.search_query.set(next.clone());
        self.search_mode
            .set(SearchMode::detect(None, Some(&next), "", SearchBarKind::Tags));
    }

    pub fn ask_confirm(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_label: impl Into<String>,
        on_confirm: impl Fn() + Send + Sync + 'static,
    ) {
        self.confirm.set(Some(ConfirmRequest {
            title: title.into(),
            message: message.into(),
            confirm_label: confirm_label.into(),
            on_confirm: Callback::new(move |_| on_confirm()),
        }));
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);
