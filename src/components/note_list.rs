use crate::api::CreateNoteRequest;
use crate::components::folder_tree::start_note_drag;
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Spinner};
use crate::loader::controller::NoteLoader;
use crate::loader::LoadOptions;
use crate::models::NoteType;
use crate::search::matches_search;
use crate::state::AppContext;
use icons::{Plus, Star};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// Notes of the selected folder, narrowed by the active search.
#[component]
pub fn NoteList() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let st = StoredValue::new(app_state.0.clone());

    let notes = app_state.0.notes;
    let notes_loading = app_state.0.notes_loading;
    let search_mode = app_state.0.search_mode;
    let selected = app_state.0.selected_note_id;
    let current_folder = app_state.0.current_folder_id;
    let drag = app_state.0.drag;
    let creating = RwSignal::new(false);

    let visible = Memo::new(move |_| {
        let mode = search_mode.get();
        notes.with(|list| {
            list.iter()
                .filter(|n| matches_search(n, &mode))
                .cloned()
                .collect::<Vec<_>>()
        })
    });

    let new_note = move |_| {
        if creating.get_untracked() {
            return;
        }
        let state = st.get_value();
        let req = CreateNoteRequest {
            heading: String::new(),
            workspace: state.workspace.get_untracked(),
            folder_id: state.current_folder_id.get_untracked(),
            note_type: NoteType::Note,
            content: String::new(),
        };
        creating.set(true);
        spawn_local(async move {
            let res = state.api_client.get_untracked().create_note(&req).await;
            creating.set(false);
            match res {
                Ok(note) => {
                    log::info!("created note {}", note.id);
                    state.request_refresh();
                    loader.with_value(|l| l.load(note.id, LoadOptions::navigate()));
                }
                Err(e) => state.toasts.error(format!("Could not create note: {e}")),
            }
        });
    };

    view! {
        <div class="flex min-h-0 flex-1 flex-col gap-2" data-name="NoteList">
            <div class="flex items-center justify-between px-2">
                <span class="text-xs font-medium text-muted-foreground">
                    {move || format!("{} notes", visible.with(Vec::len))}
                </span>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Sm
                    attr:disabled=move || creating.get()
                    on:click=new_note
                >
                    <Plus />
                    "New note"
                </Button>
            </div>

            <Show when=move || notes_loading.get()>
                <div class="flex justify-center py-2">
                    <Spinner />
                </div>
            </Show>

            <ul class="flex min-h-0 flex-1 flex-col overflow-y-auto">
                <For
                    each=move || visible.get()
                    key=|n| (n.id.clone(), n.heading.clone(), n.favorite)
                    children=move |note| {
                        let id = StoredValue::new(note.id.clone());
                        let folder_id = StoredValue::new(note.folder_id.clone());
                        let favorite = note.favorite;
                        let heading = if note.heading.trim().is_empty() {
                            "Untitled".to_string()
                        } else {
                            note.heading.clone()
                        };
                        view! {
                            <li
                                class=move || {
                                    let base = "flex cursor-pointer items-center gap-2 rounded-md px-2 py-1.5 text-sm hover:bg-accent";
                                    if selected.get().as_deref() == Some(id.get_value().as_str()) {
                                        format!("{base} bg-accent font-medium")
                                    } else {
                                        base.to_string()
                                    }
                                }
                                draggable="true"
                                on:click=move |_| {
                                    loader.with_value(|l| l.load(id.get_value(), LoadOptions::click()))
                                }
                                on:dragstart=move |ev: web_sys::DragEvent| {
                                    st.with_value(|s| {
                                        start_note_drag(s, &ev, id.get_value(), folder_id.get_value())
                                    })
                                }
                                on:dragend=move |_| drag.set(None)
                            >
                                <span class="min-w-0 flex-1 truncate">{heading}</span>
                                <Show when=move || favorite>
                                    <Star class="size-3.5 shrink-0 fill-current text-amber-500" />
                                </Show>
                            </li>
                        }
                    }
                />
            </ul>

            <Show when=move || {
                !notes_loading.get() && visible.with(Vec::is_empty)
            }>
                <div class="px-2 py-4 text-center text-sm text-muted-foreground">
                    {move || {
                        if current_folder.with(Option::is_some) {
                            "This folder is empty"
                        } else {
                            "No notes"
                        }
                    }}
                </div>
            </Show>
        </div>
    }
}
