use crate::dnd::{accepts, can_drag_folder, plan_drop, DragPayload, DropAction, DropTarget};
use crate::folders::FolderTree;
use crate::loader::controller::NoteLoader;
use crate::models::{ShareTarget, SystemFolder};
use crate::state::{AppContext, AppState};
use crate::storage::{
    is_folder_expanded, load_folder_search, load_recent_folders, set_folder_expanded,
    write_recent_folder, LocalStorage,
};
use icons::{ChevronDown, ChevronRight, Share2};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// Executes an accepted drop against the server, then refreshes the sidebar.
pub(crate) fn run_drop(state: AppState, loader: NoteLoader, action: DropAction) {
    let workspace = state.workspace.get_untracked();

    if let DropAction::TrashNote { note_id } = action {
        let state2 = state.clone();
        state.ask_confirm(
            "Delete note",
            "Move this note to the trash?",
            "Delete",
            move || {
                let (state, loader) = (state2.clone(), loader.clone());
                let (note_id, workspace) = (note_id.clone(), workspace.clone());
                spawn_local(async move {
                    let api_client = state.api_client.get_untracked();
                    match api_client.delete_note(&note_id, &workspace).await {
                        Ok(()) => {
                            if loader.is_open(&note_id) {
                                loader.close_deleted();
                            }
                            state.toasts.success("Note moved to trash");
                            state.request_refresh();
                        }
                        Err(e) => state.toasts.error(format!("Could not delete note: {e}")),
                    }
                });
            },
        );
        return;
    }

    if let DropAction::ShareNote { note_id } = action {
        let title = state
            .notes
            .with_untracked(|list| list.iter().find(|n| n.id == note_id).map(|n| n.heading.clone()))
            .unwrap_or_default();
        state.share_target.set(Some(ShareTarget::Note { id: note_id, title }));
        return;
    }

    spawn_local(async move {
        let api_client = state.api_client.get_untracked();
        let res = match &action {
            DropAction::MoveNote { note_id, folder_id } => api_client
                .move_note_to_folder(note_id, folder_id, &workspace)
                .await
                .map(|_| "Note moved".to_string()),
            DropAction::RemoveNoteFromFolder { note_id } => api_client
                .remove_note_from_folder(note_id, &workspace)
                .await
                .map(|_| "Note removed from folder".to_string()),
            DropAction::MoveFolder {
                folder_id,
                new_parent_id,
            } => api_client
                .move_folder(folder_id, new_parent_id.as_deref(), &workspace)
                .await
                .map(|_| "Folder moved".to_string()),
            DropAction::ToggleFavorite { note_id } => api_client
                .toggle_favorite(note_id, &workspace)
                .await
                .map(|fav| {
                    if fav {
                        "Added to favorites".to_string()
                    } else {
                        "Removed from favorites".to_string()
                    }
                }),
            DropAction::TrashNote { .. } | DropAction::ShareNote { .. } => return,
        };

        match res {
            Ok(msg) => {
                log::debug!("drop applied: {action:?}");
                state.toasts.success(msg);
                state.request_refresh();
                if let DropAction::MoveNote { note_id, .. }
                | DropAction::RemoveNoteFromFolder { note_id }
                | DropAction::ToggleFavorite { note_id } = &action
                {
                    if loader.is_open(note_id) {
                        loader.reload_current();
                    }
                }
            }
            Err(e) => state.toasts.error(format!("Drop failed: {e}")),
        }
    });
}

/// Shared `dragover`/`drop` wiring for a drop target.
fn handle_drop(app: &AppState, loader: &NoteLoader, tree: &FolderTree, target: DropTarget) {
    let Some(payload) = app.drag.get_untracked() else {
        return;
    };
    app.drag.set(None);
    match plan_drop(&payload, &target, tree) {
        Ok(action) => run_drop(app.clone(), loader.clone(), action),
        Err(rejection) => {
            log::warn!("drop of {payload:?} on {target:?} rejected: {rejection:?}");
            app.toasts.info(rejection.message());
        }
    }
}

fn start_drag(app: &AppState, ev: &web_sys::DragEvent, payload: DragPayload, id: &str) {
    if let Some(dt) = ev.data_transfer() {
        // Firefox only starts a drag when some data is set.
        let _ = dt.set_data("text/plain", id);
        dt.set_effect_allowed("move");
    }
    app.drag.set(Some(payload));
}

pub(crate) fn start_note_drag(
    app: &AppState,
    ev: &web_sys::DragEvent,
    note_id: String,
    current_folder_id: Option<String>,
) {
    let id = note_id.clone();
    start_drag(
        app,
        ev,
        DragPayload::Note {
            note_id,
            current_folder_id,
        },
        &id,
    );
}

/// Makes `folder_id` the sidebar filter and records it as recently opened.
pub(crate) fn open_folder(app: &AppState, folder_id: Option<String>, name: &str) {
    if let Some(id) = &folder_id {
        write_recent_folder(&LocalStorage, id, name);
        if let Some(q) = load_folder_search(&LocalStorage, name) {
            app.search_query.set(q);
        }
    }
    app.current_folder_id.set(folder_id);
}

#[component]
pub fn FolderSidebar() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let st = StoredValue::new(app_state.0.clone());

    let folders = app_state.0.folders;
    let current = app_state.0.current_folder_id;
    let drag = app_state.0.drag;
    let tree = Memo::new(move |_| folders.with(|f| FolderTree::build(f)));
    let root_hover = RwSignal::new(false);

    let recent = Memo::new(move |_| {
        // Re-read whenever the selection changes.
        let _ = current.get();
        let known = tree.get();
        load_recent_folders(&LocalStorage)
            .into_iter()
            .filter(|r| known.get(&r.id).is_some())
            .collect::<Vec<_>>()
    });

    view! {
        <nav class="flex flex-col gap-3 text-sm" data-name="FolderSidebar">
            <div
                class=move || {
                    let base = "flex items-center gap-2 rounded-md px-2 py-1.5 cursor-pointer hover:bg-accent";
                    match (current.get().is_none(), root_hover.get()) {
                        (_, true) => format!("{base} ring-2 ring-primary/50"),
                        (true, false) => format!("{base} bg-accent font-medium"),
                        _ => base.to_string(),
                    }
                }
                on:click=move |_| st.with_value(|s| open_folder(s, None, ""))
                on:dragover=move |ev: web_sys::DragEvent| {
                    let ok = drag.with_untracked(|p| accepts(p.as_ref(), &DropTarget::Root, &tree.get_untracked()));
                    if ok {
                        ev.prevent_default();
                        root_hover.set(true);
                    }
                }
                on:dragleave=move |_| root_hover.set(false)
                on:drop=move |ev: web_sys::DragEvent| {
                    ev.prevent_default();
                    root_hover.set(false);
                    st.with_value(|s| {
                        loader.with_value(|l| handle_drop(s, l, &tree.get_untracked(), DropTarget::Root))
                    });
                }
            >
                "All notes"
            </div>

            <Show when=move || !recent.with(Vec::is_empty)>
                <div class="flex flex-col gap-1">
                    <div class="px-2 text-xs font-medium text-muted-foreground">"Recent"</div>
                    {move || {
                        recent
                            .get()
                            .into_iter()
                            .map(|r| {
                                let (id, name) = (r.id.clone(), r.name.clone());
                                view! {
                                    <button
                                        type="button"
                                        class="truncate rounded-md px-2 py-1 text-left hover:bg-accent"
                                        on:click=move |_| st.with_value(|s| open_folder(s, Some(id.clone()), &name))
                                    >
                                        {r.name}
                                    </button>
                                }
                            })
                            .collect_view()
                    }}
                </div>
            </Show>

            <div class="flex flex-col">
                {move || {
                    tree.get()
                        .roots()
                        .into_iter()
                        .map(|f| {
                            view! { <FolderRow folder_id=f.id.clone() depth=0 tree=tree /> }
                                .into_any()
                        })
                        .collect_view()
                }}
            </div>
        </nav>
    }
}

#[component]
fn FolderRow(
    folder_id: String,
    depth: usize,
    tree: Memo<FolderTree>,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let st = StoredValue::new(app_state.0.clone());
    let current = app_state.0.current_folder_id;
    let drag = app_state.0.drag;
    let share_target = app_state.0.share_target;

    let id = StoredValue::new(folder_id.clone());
    let name = tree
        .with_untracked(|t| t.get(&folder_id).map(|f| f.name.clone()))
        .unwrap_or_default();
    let path = tree.with_untracked(|t| t.path(&folder_id));
    let name_sv = StoredValue::new(name.clone());
    let is_system = SystemFolder::from_name(&name).is_some();
    let expanded = RwSignal::new(is_folder_expanded(&LocalStorage, &folder_id));
    let hover = RwSignal::new(false);

    let target = move || DropTarget::Folder {
        id: id.get_value(),
        name: name_sv.get_value(),
    };

    let toggle = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        let next = !expanded.get_untracked();
        expanded.set(next);
        set_folder_expanded(&LocalStorage, &id.get_value(), next);
    };

    let has_children = move || tree.with(|t| !t.children_of(Some(&id.get_value())).is_empty());

    view! {
        <div class="flex flex-col">
            <div
                class=move || {
                    let mut c = "group flex items-center gap-1 rounded-md py-1 pr-2 cursor-pointer hover:bg-accent".to_string();
                    if current.get().as_deref() == Some(id.get_value().as_str()) {
                        c.push_str(" bg-accent font-medium");
                    }
                    if hover.get() {
                        c.push_str(" ring-2 ring-primary/50");
                    }
                    c
                }
                style=format!("padding-left: {}px", 8 + depth * 14)
                draggable={if can_drag_folder(&name) { "true" } else { "false" }}
                on:click=move |_| st.with_value(|s| open_folder(s, Some(id.get_value()), &name_sv.get_value()))
                on:dragstart=move |ev: web_sys::DragEvent| {
                    let folder_id = id.get_value();
                    st.with_value(|s| start_drag(s, &ev, DragPayload::Folder { folder_id: folder_id.clone() }, &folder_id));
                }
                on:dragend=move |_| drag.set(None)
                on:dragover=move |ev: web_sys::DragEvent| {
                    let ok = drag.with_untracked(|p| accepts(p.as_ref(), &target(), &tree.get_untracked()));
                    if ok {
                        ev.prevent_default();
                        hover.set(true);
                    }
                }
                on:dragleave=move |_| hover.set(false)
                on:drop=move |ev: web_sys::DragEvent| {
                    ev.prevent_default();
                    ev.stop_propagation();
                    hover.set(false);
                    st.with_value(|s| loader.with_value(|l| handle_drop(s, l, &tree.get_untracked(), target())));
                }
            >
                <button
                    type="button"
                    class=move || if has_children() { "size-4 shrink-0 opacity-70" } else { "size-4 shrink-0 invisible" }
                    on:click=toggle
                >
                    {move || if expanded.get() { view! { <ChevronDown class="size-4" /> }.into_any() } else { view! { <ChevronRight class="size-4" /> }.into_any() }}
                </button>
                <span class="min-w-0 flex-1 truncate" title=path>{name.clone()}</span>
                <Show when=move || !is_system>
                    <button
                        type="button"
                        class="hidden size-4 shrink-0 opacity-60 group-hover:block hover:opacity-100"
                        title="Share folder"
                        on:click=move |ev: web_sys::MouseEvent| {
                            ev.stop_propagation();
                            share_target.set(Some(ShareTarget::Folder {
                                id: id.get_value(),
                                name: name_sv.get_value(),
                            }));
                        }
                    >
                        <Share2 class="size-4" />
                    </button>
                </Show>
            </div>

            <Show when=move || expanded.get()>
                {move || {
                    tree.get()
                        .children_of(Some(&id.get_value()))
                        .into_iter()
                        .map(|f| {
                            view! { <FolderRow folder_id=f.id.clone() depth={depth + 1} tree=tree /> }
                                .into_any()
                        })
                        .collect_view()
                }}
            </Show>
        </div>
    }
}
