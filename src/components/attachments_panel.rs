use crate::api::{attachment_url, read_file_bytes};
use crate::attachments::{has_attachment_badge, is_inline};
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Spinner};
use crate::loader::controller::NoteLoader;
use crate::models::Attachment;
use crate::state::AppContext;
use crate::util::format_size;
use icons::{Paperclip, Trash2};
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// File attachments of the open note. Inline images are left to the editor.
#[component]
pub fn AttachmentsPanel() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let loader = StoredValue::new(expect_context::<NoteLoader>());
    let st = StoredValue::new(app_state.0.clone());

    let attachments = app_state.0.attachments;
    let content = app_state.0.buffer.content;
    let active_note = app_state.0.active_note;
    let uploading = RwSignal::new(0usize);
    let file_ref: NodeRef<html::Input> = NodeRef::new();

    let files = Memo::new(move |_| {
        let body = content.get();
        attachments.with(|list| {
            list.iter()
                .filter(|a| !is_inline(a, &body))
                .cloned()
                .collect::<Vec<Attachment>>()
        })
    });
    let has_badge = Memo::new(move |_| attachments.with(|a| has_attachment_badge(a, &content.get())));

    let note_ids = move || {
        let note_id = active_note.with_untracked(|n| n.as_ref().map(|n| n.id.clone()))?;
        Some((note_id, st.with_value(|s| s.workspace.get_untracked())))
    };

    let on_files = move |_ev: web_sys::Event| {
        let Some(input) = file_ref.get_untracked() else {
            return;
        };
        let Some(list) = input.files() else {
            return;
        };
        let Some((note_id, workspace)) = note_ids() else {
            return;
        };
        let picked: Vec<web_sys::File> = (0..list.length()).filter_map(|i| list.get(i)).collect();
        input.set_value("");

        for file in picked {
            let (note_id, workspace) = (note_id.clone(), workspace.clone());
            let state = st.get_value();
            uploading.update(|n| *n += 1);
            spawn_local(async move {
                let name = file.name();
                let res = match read_file_bytes(&file).await {
                    Ok(bytes) => {
                        state
                            .api_client
                            .get_untracked()
                            .upload_attachment(&note_id, &workspace, &name, &file.type_(), bytes)
                            .await
                    }
                    Err(e) => Err(e),
                };
                uploading.update(|n| *n = n.saturating_sub(1));
                match res {
                    Ok(_) => {
                        state.toasts.success(format!("{name} attached"));
                        loader.with_value(|l| l.refresh_attachments(&note_id, &workspace));
                    }
                    Err(e) => state.toasts.error(format!("Upload of {name} failed: {e}")),
                }
            });
        }
    };

    let ask_delete = move |att: Attachment| {
        let Some((note_id, workspace)) = note_ids() else {
            return;
        };
        let state = st.get_value();
        let label = att.display_name().to_string();
        state.ask_confirm(
            "Delete attachment",
            format!("Delete \"{label}\"? This cannot be undone."),
            "Delete",
            move || {
                let (note_id, workspace, att_id) = (note_id.clone(), workspace.clone(), att.id.clone());
                let state = st.get_value();
                spawn_local(async move {
                    let api_client = state.api_client.get_untracked();
                    match api_client.delete_attachment(&note_id, &att_id, &workspace).await {
                        Ok(()) => state.attachments.update(|list| list.retain(|a| a.id != att_id)),
                        Err(e) => state.toasts.error(format!("Could not delete attachment: {e}")),
                    }
                });
            },
        );
    };

    view! {
        <div class="flex flex-col gap-2" data-name="AttachmentsPanel">
            <div class="flex items-center gap-2">
                <span class=move || {
                    if has_badge.get() { "has-attachments flex items-center gap-1 text-sm font-medium" } else { "flex items-center gap-1 text-sm text-muted-foreground" }
                }>
                    <Paperclip class="size-4" />
                    {move || format!("Attachments ({})", files.with(Vec::len))}
                </span>
                <Show when=move || { uploading.get() > 0 }>
                    <Spinner class="size-3" />
                </Show>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Sm
                    class="ml-auto"
                    on:click=move |_| {
                        if let Some(input) = file_ref.get_untracked() {
                            input.click();
                        }
                    }
                >
                    "Upload"
                </Button>
                <input node_ref=file_ref type="file" multiple class="hidden" on:change=on_files />
            </div>

            <ul class="flex flex-col gap-1">
                <For
                    each=move || files.get()
                    key=|a| a.id.clone()
                    children=move |att| {
                        let href = active_note
                            .with_untracked(|n| n.as_ref().map(|n| attachment_url(&n.id, &att.id)))
                            .unwrap_or_default();
                        let size = att.file_size.map(format_size).unwrap_or_default();
                        let name = att.display_name().to_string();
                        let for_delete = att.clone();
                        view! {
                            <li class="flex items-center gap-2 text-sm">
                                <a class="min-w-0 flex-1 truncate hover:underline" href=href target="_blank">
                                    {name}
                                </a>
                                <span class="shrink-0 text-xs text-muted-foreground">{size}</span>
                                <Button
                                    variant=ButtonVariant::Ghost
                                    size=ButtonSize::Icon
                                    class="h-7 w-7 text-destructive"
                                    attr:title="Delete"
                                    on:click=move |_| ask_delete(for_delete.clone())
                                >
                                    <Trash2 />
                                </Button>
                            </li>
                        }
                    }
                />
            </ul>
        </div>
    }
}
