use crate::autosave::controller::AutosaveController;
use crate::components::attachments_panel::AttachmentsPanel;
use crate::components::confirm_dialog::ConfirmDialog;
use crate::components::folder_tree::{run_drop, FolderSidebar};
use crate::components::note_list::NoteList;
use crate::components::save_indicator::SaveIndicator;
use crate::components::share_dialog::ShareDialog;
use crate::components::tag_editor::TagEditor;
use crate::components::toasts::ToastContainer;
use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Input, Spinner,
};
use crate::dnd::DropAction;
use crate::editor::NoteEditor;
use crate::loader::controller::NoteLoader;
use crate::loader::LoadOptions;
use crate::models::{ShareTarget, Workspace};
use crate::search::{bar_search_query, SearchBarKind, SearchMode};
use crate::state::AppContext;
use crate::storage::{save_folder_search, save_selected_workspace, LocalStorage};
use crate::util::push_url;
use icons::{Search, Share2, Trash2, X};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_query_map;

#[component]
pub fn WorkspacePage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());

    let workspace = app_state.0.workspace;
    let current_folder = app_state.0.current_folder_id;
    let refresh_tick = app_state.0.refresh_tick;

    // Each list request carries an id so a slow response for an older
    // folder never overwrites a newer one.
    let notes_req_id: RwSignal<u64> = RwSignal::new(0);

    // Workspaces: once per page.
    Effect::new(move |_| {
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match api_client.list_workspaces().await {
                Ok(list) => app_state.0.workspaces.set(list),
                Err(e) => log::warn!("listing workspaces failed: {e}"),
            }
        });
    });

    // Folders and the tag cache follow the workspace.
    Effect::new(move |_| {
        let ws = workspace.get();
        let _ = refresh_tick.get();
        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match api_client.list_folders(&ws).await {
                Ok(list) if workspace.get_untracked() == ws => app_state.0.folders.set(list),
                Ok(_) => {}
                Err(e) => app_state
                    .0
                    .toasts
                    .error(format!("Could not load folders: {e}")),
            }
            match api_client.list_tags(Some(&ws)).await {
                Ok(tags) if workspace.get_untracked() == ws => app_state.0.tag_cache.set(tags),
                Ok(_) => {}
                Err(e) => log::warn!("listing tags failed: {e}"),
            }
        });
    });

    Effect::new(move |_| {
        let ws = workspace.get();
        let folder = current_folder.get();
        let _ = refresh_tick.get();

        let req_id = notes_req_id.get_untracked() + 1;
        notes_req_id.set(req_id);
        app_state.0.notes_loading.set(true);

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let res = api_client.list_notes(&ws, folder.as_deref()).await;
            if notes_req_id.get_untracked() != req_id {
                return;
            }
            app_state.0.notes_loading.set(false);
            match res {
                Ok(list) => app_state.0.notes.set(list),
                Err(e) => app_state.0.toasts.error(format!("Could not load notes: {e}")),
            }
        });
    });

    // Deep link: `?note=<id>` opens the note, `?workspace=` selects its workspace.
    let query = use_query_map();
    Effect::new(move |_| {
        let params = query.get_untracked();
        if let Some(ws) = params.get("workspace").filter(|w| !w.trim().is_empty()) {
            if workspace.get_untracked() != ws {
                workspace.set(ws.clone());
                save_selected_workspace(&LocalStorage, &ws);
            }
        }
        loader.with_value(|l| {
            app_state.0.search_mode.set(l.detect_search_mode());
            if let Some(id) = params.get("note").filter(|id| !id.trim().is_empty()) {
                // A dead link should not keep pointing at the missing note.
                let on_complete = Callback::new(move |ok: bool| {
                    if !ok {
                        let ws = workspace.get_untracked();
                        push_url(&format!("?workspace={}", urlencoding::encode(&ws)));
                    }
                });
                l.load(id, LoadOptions::history().with_on_complete(on_complete));
            }
        });
    });

    view! {
        <div class="flex h-screen w-full overflow-hidden bg-background text-foreground">
            <aside class="flex w-72 shrink-0 flex-col gap-3 border-r p-3">
                <WorkspaceSelector />
                <SearchBar />
                <div class="max-h-[45%] overflow-y-auto">
                    <FolderSidebar />
                </div>
                <NoteList />
            </aside>

            <main class="flex min-w-0 flex-1 flex-col">
                <NotePane />
            </main>

            <ToastContainer />
            <ConfirmDialog />
            <ShareDialog />
        </div>
    }
}

#[component]
fn WorkspaceSelector() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let workspace = app_state.0.workspace;
    let workspaces = app_state.0.workspaces;

    let on_change = move |ev: web_sys::Event| {
        let ws = event_target_value(&ev);
        if ws.trim().is_empty() || ws == workspace.get_untracked() {
            return;
        }
        log::info!("switching to workspace {ws}");
        save_selected_workspace(&LocalStorage, &ws);
        loader.with_value(|l| l.close());
        app_state.0.current_folder_id.set(None);
        app_state.0.folders.set(vec![]);
        app_state.0.notes.set(vec![]);
        push_url(&format!("?workspace={}", urlencoding::encode(&ws)));
        workspace.set(ws);
    };

    view! {
        <select
            class="h-9 w-full rounded-md border border-input bg-transparent px-2 text-sm shadow-xs"
            on:change=on_change
            prop:value=move || workspace.get()
        >
            {move || {
                let current = workspace.get();
                let mut list = workspaces.get();
                if !list.iter().any(|w| w.name == current) {
                    list.insert(
                        0,
                        Workspace {
                            name: current.clone(),
                            display_name: None,
                        },
                    );
                }
                list.into_iter()
                    .map(|w| {
                        let selected = w.name == current;
                        let label = w.label().to_string();
                        view! {
                            <option value=w.name selected=selected>
                                {label}
                            </option>
                        }
                    })
                    .collect_view()
            }}
        </select>
    }
}

#[component]
fn SearchBar() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let query = app_state.0.search_query;
    let kind = app_state.0.search_kind;
    let search_mode = app_state.0.search_mode;

    let current_folder_name = move || {
        let id = app_state.0.current_folder_id.get_untracked()?;
        app_state
            .0
            .folders
            .with_untracked(|f| f.iter().find(|f| f.id == id).map(|f| f.name.clone()))
    };

    let submit = move || {
        let q = query.get_untracked();
        let ws = app_state.0.workspace.get_untracked();
        if let Some(name) = current_folder_name() {
            save_folder_search(&LocalStorage, &name, &q);
        }
        push_url(&bar_search_query(kind.get_untracked(), &q, &ws));
        if q.trim().is_empty() {
            search_mode.set(SearchMode::None);
            loader.with_value(|l| l.close());
        } else {
            loader.with_value(|l| l.show_search());
        }
    };

    let clear = move |_| {
        query.set(String::new());
        submit();
    };

    let on_keydown = Callback::new(move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Enter" {
            ev.prevent_default();
            submit();
        }
    });

    let toggle_kind = move |_| {
        kind.update(|k| {
            *k = match k {
                SearchBarKind::Notes => SearchBarKind::Tags,
                SearchBarKind::Tags => SearchBarKind::Notes,
            }
        });
        if !query.get_untracked().trim().is_empty() {
            submit();
        }
    };

    view! {
        <div class="flex items-center gap-1">
            <Button
                variant=ButtonVariant::Outline
                size=ButtonSize::Sm
                attr:title="Switch between note and tag search"
                on:click=toggle_kind
            >
                {move || match kind.get() {
                    SearchBarKind::Notes => "Notes",
                    SearchBarKind::Tags => "Tags",
                }}
            </Button>
            <div class="relative flex-1">
                <Input
                    class="pr-8"
                    placeholder=Signal::derive(move || match kind.get() {
                        SearchBarKind::Notes => "Search notes".to_string(),
                        SearchBarKind::Tags => "Search tags".to_string(),
                    })
                    bind_value=query
                    on_keydown=on_keydown
                />
                <Show
                    when=move || !query.with(|q| q.is_empty())
                    fallback=|| view! { <Search class="pointer-events-none absolute right-2 top-2.5 size-4 opacity-50" /> }
                >
                    <button
                        type="button"
                        class="absolute right-2 top-2.5 opacity-60 hover:opacity-100"
                        title="Clear search"
                        on:click=clear
                    >
                        <X class="size-4" />
                    </button>
                </Show>
            </div>
        </div>
    }
}

#[component]
fn NotePane() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let autosave = StoredValue::new(expect_context::<AutosaveController>());
    let st = StoredValue::new(app_state.0.clone());

    let active_note = app_state.0.active_note;
    let note_loading = app_state.0.note_loading;
    let note_error = app_state.0.note_error;
    let search_mode = app_state.0.search_mode;
    let buffer = app_state.0.buffer;

    let delete_note = move |_| {
        let Some(note_id) = active_note.with_untracked(|n| n.as_ref().map(|n| n.id.clone())) else {
            return;
        };
        run_drop(
            st.get_value(),
            loader.get_value(),
            DropAction::TrashNote { note_id },
        );
    };

    let share_note = move |_| {
        let Some(note_id) = active_note.with_untracked(|n| n.as_ref().map(|n| n.id.clone())) else {
            return;
        };
        let title = Some(buffer.title.get_untracked())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| buffer.title_placeholder.get_untracked());
        st.with_value(|s| s.share_target.set(Some(ShareTarget::Note { id: note_id, title })));
    };

    let search_summary = move || match search_mode.get() {
        SearchMode::Notes(t) => format!("Notes matching \"{}\"", t.join(" ")),
        SearchMode::Tags(t) => format!("Notes tagged {}", t.join(", ")),
        SearchMode::None => "Select a note or create a new one".to_string(),
    };

    view! {
        <Show when=move || note_error.with(Option::is_some)>
            <Alert class="m-4 w-auto border-destructive/50 text-destructive">
                <AlertDescription>{move || note_error.get().unwrap_or_default()}</AlertDescription>
            </Alert>
        </Show>

        <Show
            when=move || active_note.with(Option::is_some)
            fallback=move || {
                view! {
                    <div class="flex flex-1 items-center justify-center text-sm text-muted-foreground">
                        <Show when=move || note_loading.get() fallback=move || view! { <span>{search_summary}</span> }>
                            <Spinner />
                        </Show>
                    </div>
                }
            }
        >
            <div
                class=move || {
                    if note_loading.get() {
                        "flex min-h-0 flex-1 flex-col gap-3 p-6 opacity-50 transition-opacity"
                    } else {
                        "flex min-h-0 flex-1 flex-col gap-3 p-6 transition-opacity"
                    }
                }
                data-name="NotePane"
            >
                <div class="flex items-center gap-3">
                    <Input
                        class="h-11 border-none text-2xl font-semibold shadow-none md:text-2xl"
                        placeholder=Signal::derive(move || buffer.title_placeholder.get())
                        bind_value=buffer.title
                        on_change=Callback::new(move |_| autosave.with_value(|a| a.on_edit()))
                    />
                    <SaveIndicator />
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Icon
                        attr:title="Share note"
                        on:click=share_note
                    >
                        <Share2 />
                    </Button>
                    <Button
                        variant=ButtonVariant::Ghost
                        size=ButtonSize::Icon
                        attr:title="Delete note"
                        on:click=delete_note
                    >
                        <Trash2 />
                    </Button>
                </div>
                <TagEditor />
                <AttachmentsPanel />
                <div class="min-h-0 flex-1 overflow-y-auto">
                    <NoteEditor />
                </div>
            </div>
        </Show>
    }
}
