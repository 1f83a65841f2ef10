//! Note body editor: a contenteditable surface for HTML notes and a textarea
//! for markdown and task list notes. Both feed the edit buffer, drive the
//! slash menu, and accept pasted or dropped files.

use crate::api::{attachment_url, read_file_bytes};
use crate::attachments::{resolve_placeholder, uploading_placeholder};
use crate::autosave::controller::AutosaveController;
use crate::components::note_picker::NotePicker;
use crate::components::slash_menu::SlashMenuPopup;
use crate::loader::controller::NoteLoader;
use crate::slash::{active_filter, catalog, note_link, EditorMode, SlashAction, SlashMenu, SlashOutcome};
use crate::state::AppContext;
use crate::util::random_token;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use wasm_bindgen::JsCast;

fn utf16_to_byte_idx(s: &str, pos_utf16: u32) -> usize {
    let mut acc: u32 = 0;
    for (i, ch) in s.char_indices() {
        if acc >= pos_utf16 {
            return i;
        }
        acc += ch.len_utf16() as u32;
    }
    s.len()
}

fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

/// Text node and UTF-16 offset of a collapsed caret inside a contenteditable.
fn caret_in_text() -> Option<(web_sys::Node, u32)> {
    let sel = web_sys::window()?.get_selection().ok()??;
    if !sel.is_collapsed() {
        return None;
    }
    let node = sel.anchor_node()?;
    (node.node_type() == web_sys::Node::TEXT_NODE).then(|| (node, sel.anchor_offset()))
}

fn current_range() -> Option<web_sys::Range> {
    let sel = web_sys::window()?.get_selection().ok()??;
    if sel.range_count() == 0 {
        return None;
    }
    sel.get_range_at(0).ok()
}

fn restore_range(range: &web_sys::Range) {
    if let Some(sel) = web_sys::window().and_then(|w| w.get_selection().ok().flatten()) {
        let _ = sel.remove_all_ranges();
        let _ = sel.add_range(range);
    }
}

fn exec_insert_html(markup: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.dyn_into::<web_sys::HtmlDocument>().ok())
        .and_then(|d| d.exec_command_with_show_ui_and_value("insertHTML", false, markup).ok())
        .unwrap_or(false)
}

fn files_of(list: Option<web_sys::FileList>) -> Vec<web_sys::File> {
    let Some(list) = list else {
        return vec![];
    };
    (0..list.length()).filter_map(|i| list.get(i)).collect()
}

fn is_image_file(file: &web_sys::File) -> bool {
    file.type_().starts_with("image/")
}

#[component]
pub fn NoteEditor() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let autosave = expect_context::<AutosaveController>();
    let loader = expect_context::<NoteLoader>();

    let buffer = app_state.0.buffer;
    let active_note = app_state.0.active_note;
    let mode = Memo::new(move |_| {
        if active_note.with(|n| n.as_ref().is_some_and(|n| n.note_type.is_text())) {
            EditorMode::Markdown
        } else {
            EditorMode::Html
        }
    });

    let html_ref: NodeRef<html::Div> = NodeRef::new();
    let md_ref: NodeRef<html::Textarea> = NodeRef::new();

    let slash: RwSignal<Option<SlashMenu>> = RwSignal::new(None);
    let slash_pos = RwSignal::new((0.0_f64, 0.0_f64));
    let picker_range = StoredValue::new_local(None::<web_sys::Range>);

    // Content replaced from outside (load, migration, upload) is pushed into the DOM.
    Effect::new(move |_| {
        let _ = buffer.revision.get();
        let content = buffer.content.get_untracked();
        if let Some(el) = html_ref.get() {
            if el.inner_html() != content {
                el.set_inner_html(&content);
            }
        }
        if let Some(el) = md_ref.get() {
            if el.value() != content {
                el.set_value(&content);
            }
        }
    });

    let sync_from_dom = move || {
        let content = match mode.get_untracked() {
            EditorMode::Html => html_ref.get_untracked().map(|el| el.inner_html()),
            EditorMode::Markdown => md_ref.get_untracked().map(|el| el.value()),
        };
        if let Some(content) = content {
            buffer.content.set(content);
        }
    };

    let autosave_sv = StoredValue::new(autosave);
    let on_edit = move || {
        sync_from_dom();
        autosave_sv.with_value(|a| a.on_edit());
    };

    // Opens, re-filters or closes the slash menu from the text before the caret.
    let refresh_slash = move || {
        let prefix = match mode.get_untracked() {
            EditorMode::Html => caret_in_text().map(|(node, offset)| {
                let text = node.text_content().unwrap_or_default();
                let end = utf16_to_byte_idx(&text, offset);
                text[..end].to_string()
            }),
            EditorMode::Markdown => md_ref.get_untracked().map(|ta| {
                let value = ta.value();
                let caret = ta.selection_start().ok().flatten().unwrap_or(utf16_len(&value));
                value[..utf16_to_byte_idx(&value, caret)].to_string()
            }),
        };

        let Some(filter) = prefix.as_deref().and_then(active_filter).map(str::to_string) else {
            slash.set(None);
            return;
        };

        if slash.with_untracked(|m| m.is_none()) {
            let pos = match mode.get_untracked() {
                EditorMode::Html => current_range().map(|r| {
                    let rect = r.get_bounding_client_rect();
                    (rect.left(), rect.bottom())
                }),
                EditorMode::Markdown => md_ref.get_untracked().map(|ta| {
                    let rect = ta.get_bounding_client_rect();
                    (rect.left() + 16.0, rect.top() + 32.0)
                }),
            };
            slash_pos.set(pos.unwrap_or_default());
            slash.set(Some(SlashMenu::open(catalog())));
        }
        slash.update(|m| {
            if let Some(m) = m {
                m.set_filter(&filter);
            }
        });
    };

    // Removes the typed `/filter` right before the caret.
    let delete_trigger = move |filter_len: u32| {
        let typed = filter_len + 1;
        match mode.get_untracked() {
            EditorMode::Html => {
                let Some((node, offset)) = caret_in_text() else {
                    return;
                };
                let Some(doc) = web_sys::window().and_then(|w| w.document()) else {
                    return;
                };
                let Ok(range) = doc.create_range() else {
                    return;
                };
                if range.set_start(&node, offset.saturating_sub(typed)).is_ok()
                    && range.set_end(&node, offset).is_ok()
                    && range.delete_contents().is_ok()
                {
                    range.collapse_with_to_start(true);
                    restore_range(&range);
                }
            }
            EditorMode::Markdown => {
                let Some(ta) = md_ref.get_untracked() else {
                    return;
                };
                let caret = ta.selection_start().ok().flatten().unwrap_or(0);
                let start = caret.saturating_sub(typed);
                let _ = ta.set_range_text_with_start_and_end("", start, caret);
                let _ = ta.set_selection_range(start, start);
            }
        }
    };

    let insert_markup = move |markup: &str| match mode.get_untracked() {
        EditorMode::Html => {
            if let Some(el) = html_ref.get_untracked() {
                let _ = el.focus();
            }
            if !exec_insert_html(markup) {
                log::warn!("insertHTML was refused by the browser");
            }
        }
        EditorMode::Markdown => {
            let Some(ta) = md_ref.get_untracked() else {
                return;
            };
            let start = ta.selection_start().ok().flatten().unwrap_or(0);
            let end = ta.selection_end().ok().flatten().unwrap_or(start);
            let _ = ta.set_range_text_with_start_and_end(markup, start, end);
            let caret = start + utf16_len(markup);
            let _ = ta.set_selection_range(caret, caret);
            let _ = ta.focus();
        }
    };

    let app_for_exec = app_state.clone();
    let execute = Callback::new(move |action: SlashAction| {
        let filter_len = slash.with_untracked(|m| m.as_ref().map(|m| utf16_len(m.filter())));
        slash.set(None);
        delete_trigger(filter_len.unwrap_or(0));

        if action == SlashAction::LinkToNote {
            if mode.get_untracked() == EditorMode::Html {
                picker_range.set_value(current_range().map(|r| r.clone_range()));
            }
            app_for_exec.0.note_picker_open.set(true);
            on_edit();
            return;
        }
        if let Some(markup) = action.render(mode.get_untracked(), "") {
            insert_markup(&markup);
        }
        on_edit();
    });

    let on_pick = Callback::new(move |(note_id, title): (String, String)| {
        if let Some(range) = picker_range.get_value() {
            restore_range(&range);
        }
        picker_range.set_value(None);
        insert_markup(&note_link(mode.get_untracked(), &note_id, &title));
        on_edit();
    });

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        let key = ev.key();
        if (ev.ctrl_key() || ev.meta_key()) && key.eq_ignore_ascii_case("s") {
            ev.prevent_default();
            sync_from_dom();
            autosave_sv.with_value(|a| a.save_now());
            return;
        }

        let outcome = slash
            .try_update(|m| m.as_mut().map(|m| m.handle_key(&key)))
            .flatten();
        match outcome {
            None | Some(SlashOutcome::Passthrough) => {}
            Some(SlashOutcome::Handled) => ev.prevent_default(),
            Some(SlashOutcome::Close) => {
                if key == "Escape" {
                    ev.prevent_default();
                }
                slash.set(None);
            }
            Some(SlashOutcome::Execute(action)) => {
                ev.prevent_default();
                execute.run(action);
            }
        }
    };

    // Uploads files as attachments. Images also go inline behind a placeholder.
    let app_for_upload = app_state.clone();
    let upload_files = move |files: Vec<web_sys::File>, inline_images: bool| {
        let st = &app_for_upload.0;
        let Some(note_id) = autosave_sv.with_value(|a| a.active_note_id()) else {
            return;
        };
        let workspace = st.workspace.get_untracked();
        let api_client = st.api_client.get_untracked();
        let inline_html = inline_images && mode.get_untracked() == EditorMode::Html;

        for file in files {
            let inline = inline_html && is_image_file(&file);
            let token = random_token();
            if inline {
                insert_markup(&uploading_placeholder(&token));
                sync_from_dom();
            }

            let (note_id, workspace, api_client) = (note_id.clone(), workspace.clone(), api_client.clone());
            let st = app_for_upload.0.clone();
            let loader = loader.clone();
            spawn_local(async move {
                let name = file.name();
                let res = match read_file_bytes(&file).await {
                    Ok(bytes) => {
                        api_client
                            .upload_attachment(&note_id, &workspace, &name, &file.type_(), bytes)
                            .await
                    }
                    Err(e) => Err(e),
                };

                let still_open = autosave_sv.with_value(|a| a.active_note_id()).as_deref()
                    == Some(note_id.as_str());
                let url = match &res {
                    Ok(id) => Some(attachment_url(&note_id, id)),
                    Err(e) => {
                        st.toasts.error(format!("Upload of {name} failed: {e}"));
                        None
                    }
                };
                if !still_open {
                    return;
                }
                if inline {
                    let html = resolve_placeholder(&st.buffer.content.get_untracked(), &token, url.as_deref());
                    st.buffer.replace_content(html);
                    autosave_sv.with_value(|a| a.on_edit());
                }
                if res.is_ok() {
                    loader.refresh_attachments(&note_id, &workspace);
                }
            });
        }
    };
    let upload_sv = StoredValue::new_local(upload_files);

    let on_paste = move |ev: web_sys::ClipboardEvent| {
        let files = files_of(ev.clipboard_data().and_then(|d| d.files()));
        let images: Vec<_> = files.into_iter().filter(is_image_file).collect();
        if images.is_empty() {
            // Plain text and HTML paste go through the browser; record the edit afterwards.
            let cb = wasm_bindgen::closure::Closure::once_into_js(move || on_edit());
            if let Some(win) = web_sys::window() {
                let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(
                    cb.as_ref().unchecked_ref(),
                    0,
                );
            }
            return;
        }
        ev.prevent_default();
        upload_sv.with_value(|f| f(images, true));
    };

    let drag = app_state.0.drag;
    let on_drop = move |ev: web_sys::DragEvent| {
        // Notes and folders dragged from the sidebar are not files.
        if drag.get_untracked().is_some() {
            return;
        }
        let files = files_of(ev.data_transfer().and_then(|d| d.files()));
        if files.is_empty() {
            return;
        }
        ev.prevent_default();
        upload_sv.with_value(|f| f(files, true));
    };

    let on_dragover = move |ev: web_sys::DragEvent| {
        if drag.get_untracked().is_none() {
            ev.prevent_default();
        }
    };

    view! {
        <div class="relative flex min-h-0 flex-1 flex-col">
            {move || match mode.get() {
                EditorMode::Html => view! {
                    <div
                        node_ref=html_ref
                        class="note-entry prose max-w-none min-h-[50vh] flex-1 overflow-auto rounded-md p-4 outline-none focus-visible:ring-2 focus-visible:ring-ring/50"
                        contenteditable="true"
                        spellcheck="true"
                        on:input=move |_| {
                            on_edit();
                            refresh_slash();
                        }
                        on:change=move |_| on_edit()
                        on:keydown=on_keydown
                        on:paste=on_paste
                        on:drop=on_drop
                        on:dragover=on_dragover
                        on:blur=move |_| slash.set(None)
                    ></div>
                }
                .into_any(),
                EditorMode::Markdown => view! {
                    <textarea
                        node_ref=md_ref
                        class="note-entry min-h-[50vh] w-full flex-1 resize-none rounded-md bg-transparent p-4 font-mono text-sm outline-none focus-visible:ring-2 focus-visible:ring-ring/50"
                        spellcheck="true"
                        on:input=move |_| {
                            on_edit();
                            refresh_slash();
                        }
                        on:keydown=on_keydown
                        on:paste=on_paste
                        on:drop=on_drop
                        on:dragover=on_dragover
                        on:blur=move |_| slash.set(None)
                    ></textarea>
                }
                .into_any(),
            }}

            <SlashMenuPopup menu=slash pos=slash_pos on_execute=execute />
            <NotePicker on_pick=on_pick />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_offsets_map_to_char_boundaries() {
        let s = "a😀b/";
        assert_eq!(utf16_to_byte_idx(s, 0), 0);
        assert_eq!(utf16_to_byte_idx(s, 1), 1);
        assert_eq!(utf16_to_byte_idx(s, 3), 5);
        assert_eq!(utf16_to_byte_idx(s, 5), s.len());
        assert_eq!(utf16_to_byte_idx(s, 99), s.len());
    }

    #[test]
    fn utf16_len_counts_surrogate_pairs() {
        assert_eq!(utf16_len("/he"), 3);
        assert_eq!(utf16_len("😀"), 2);
    }
}
