use crate::components::ui::{
    DialogBody, DialogHeader, DialogTitle, Input, MenuItem, MenuList, Modal,
};
use crate::state::AppContext;
use leptos::prelude::*;

const MAX_RESULTS: usize = 30;

/// "Link to note" dialog. Lists the notes of the current workspace by title.
#[component]
pub fn NotePicker(on_pick: Callback<(String, String)>) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let open = app_state.0.note_picker_open;
    let notes = app_state.0.notes;
    let active_note = app_state.0.active_note;
    let query = RwSignal::new(String::new());
    let idx = RwSignal::new(0usize);

    let results = Memo::new(move |_| {
        let q = query.get().trim().to_lowercase();
        let current = active_note.with(|n| n.as_ref().map(|n| n.id.clone()));
        notes.with(|list| {
            list.iter()
                .filter(|n| Some(&n.id) != current.as_ref())
                .filter(|n| q.is_empty() || n.heading.to_lowercase().contains(&q))
                .take(MAX_RESULTS)
                .map(|n| (n.id.clone(), n.heading.clone()))
                .collect::<Vec<_>>()
        })
    });

    let close = Callback::new(move |_| {
        open.set(false);
        query.set(String::new());
        idx.set(0);
    });

    let pick = move |i: usize| {
        let Some(item) = results.with_untracked(|r| r.get(i).cloned()) else {
            return;
        };
        close.run(());
        on_pick.run(item);
    };

    let on_keydown = Callback::new(move |ev: web_sys::KeyboardEvent| {
        let n = results.with_untracked(Vec::len);
        match ev.key().as_str() {
            "ArrowDown" if n > 0 => {
                ev.prevent_default();
                idx.update(|i| *i = (*i + 1) % n);
            }
            "ArrowUp" if n > 0 => {
                ev.prevent_default();
                idx.update(|i| *i = (*i + n - 1) % n);
            }
            "Enter" => {
                ev.prevent_default();
                pick(idx.get_untracked());
            }
            _ => {}
        }
    });

    view! {
        <Modal open=open on_close=close>
            <DialogBody>
                <DialogHeader>
                    <DialogTitle>"Link to note"</DialogTitle>
                </DialogHeader>
                <Input
                    placeholder="Search notes by title"
                    autofocus=true
                    bind_value=query
                    on_change=Callback::new(move |_| idx.set(0))
                    on_keydown=on_keydown
                />
                <MenuList>
                    {move || {
                        let items = results.get();
                        if items.is_empty() {
                            return view! {
                                <div class="px-2 py-1.5 text-sm text-muted-foreground">"No notes found"</div>
                            }
                            .into_any();
                        }
                        items
                            .into_iter()
                            .enumerate()
                            .map(|(i, (_, heading))| {
                                view! {
                                    <MenuItem
                                        selected=Signal::derive(move || idx.get() == i)
                                        on_hover=Callback::new(move |_| idx.set(i))
                                        on_select=Callback::new(move |_| pick(i))
                                    >
                                        <span class="truncate">{heading}</span>
                                    </MenuItem>
                                }
                            })
                            .collect_view()
                            .into_any()
                    }}
                </MenuList>
            </DialogBody>
        </Modal>
    }
}
