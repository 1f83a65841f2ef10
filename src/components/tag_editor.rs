use crate::autosave::controller::AutosaveController;
use crate::components::ui::{Badge, BadgeGroup, Input, MenuItem, MenuList, MenuPanel};
use crate::search::HIGHLIGHT_CLASS;
use crate::state::AppContext;
use crate::tags::{same_tag, suggest_tags, TagSet};
use icons::X;
use leptos::prelude::*;

const MAX_SUGGESTIONS: usize = 8;

/// Tag chips of the open note plus an input with suggestions from the tag cache.
#[component]
pub fn TagEditor() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let autosave = StoredValue::new(expect_context::<AutosaveController>());
    let st = StoredValue::new(app_state.0.clone());

    let tags_field = app_state.0.buffer.tags;
    let tag_cache = app_state.0.tag_cache;
    let search_mode = app_state.0.search_mode;
    let draft = RwSignal::new(String::new());
    let suggestion_idx = RwSignal::new(0usize);

    let tags = Memo::new(move |_| TagSet::parse(&tags_field.get()));
    let suggestions = Memo::new(move |_| {
        let current = tags.get();
        tag_cache.with(|known| {
            suggest_tags(known, &current, &draft.get(), MAX_SUGGESTIONS)
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
    });

    let write = move |set: TagSet| {
        tags_field.set(set.to_field());
        autosave.with_value(|a| a.on_edit());
    };

    let add = move |input: String| {
        let mut set = tags.get_untracked();
        if set.add(&input) {
            write(set);
        }
        draft.set(String::new());
        suggestion_idx.set(0);
    };

    let remove = move |tag: String| {
        let mut set = tags.get_untracked();
        if set.remove(&tag) {
            write(set);
        }
    };

    let on_keydown = Callback::new(move |ev: web_sys::KeyboardEvent| {
        let key = ev.key();
        let n = suggestions.with_untracked(Vec::len);
        match key.as_str() {
            "ArrowDown" if n > 0 => {
                ev.prevent_default();
                suggestion_idx.update(|i| *i = (*i + 1) % n);
            }
            "ArrowUp" if n > 0 => {
                ev.prevent_default();
                suggestion_idx.update(|i| *i = (*i + n - 1) % n);
            }
            "Enter" | "," | " " | "Tab" => {
                let picked = suggestions
                    .with_untracked(|s| s.get(suggestion_idx.get_untracked()).cloned());
                let value = match (key.as_str(), picked) {
                    ("Enter" | "Tab", Some(s)) => s,
                    _ => draft.get_untracked(),
                };
                if value.trim().is_empty() {
                    return;
                }
                ev.prevent_default();
                add(value);
            }
            "Backspace" if draft.with_untracked(String::is_empty) => {
                if let Some(last) = tags.with_untracked(|t| t.iter().last().map(str::to_string)) {
                    remove(last);
                }
            }
            _ => {}
        }
    });

    view! {
        <div class="relative flex flex-wrap items-center gap-2" data-name="TagEditor">
            <BadgeGroup>
                {move || {
                    tags.get()
                        .iter()
                        .map(|tag| {
                            let tag = tag.to_string();
                            let (for_click, for_remove) = (tag.clone(), tag.clone());
                            let highlighted = search_mode
                                .with(|m| m.tag_terms().iter().any(|t| same_tag(t, &tag)));
                            view! {
                                <Badge class={if highlighted { HIGHLIGHT_CLASS } else { "" }}>
                                    <button
                                        type="button"
                                        class="hover:underline"
                                        title="Search notes with this tag"
                                        on:click=move |_| st.with_value(|s| s.toggle_tag_filter(&for_click))
                                    >
                                        {tag}
                                    </button>
                                    <button
                                        type="button"
                                        class="opacity-60 hover:opacity-100"
                                        aria-label="Remove tag"
                                        on:click=move |_| remove(for_remove.clone())
                                    >
                                        <X />
                                    </button>
                                </Badge>
                            }
                        })
                        .collect_view()
                }}
            </BadgeGroup>

            <div class="relative w-40">
                <Input
                    class="h-7 text-xs"
                    placeholder="Add tag"
                    bind_value=draft
                    on_change=Callback::new(move |_| suggestion_idx.set(0))
                    on_keydown=on_keydown
                />
                <Show when=move || !suggestions.with(Vec::is_empty)>
                    <MenuPanel class="absolute top-8 left-0 w-full">
                        <MenuList>
                            {move || {
                                suggestions
                                    .get()
                                    .into_iter()
                                    .enumerate()
                                    .map(|(i, s)| {
                                        let label = s.clone();
                                        view! {
                                            <MenuItem
                                                selected=Signal::derive(move || suggestion_idx.get() == i)
                                                on_hover=Callback::new(move |_| suggestion_idx.set(i))
                                                on_select=Callback::new(move |_| add(s.clone()))
                                            >
                                                {label}
                                            </MenuItem>
                                        }
                                    })
                                    .collect_view()
                            }}
                        </MenuList>
                    </MenuPanel>
                </Show>
            </div>
        </div>
    }
}
