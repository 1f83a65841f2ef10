use crate::components::ui::{MenuItem, MenuList, MenuPanel};
use crate::slash::{SlashAction, SlashMenu, SlashOutcome};
use leptos::prelude::*;

/// Floating slash-command menu. Each open level renders as its own column.
#[component]
pub fn SlashMenuPopup(
    menu: RwSignal<Option<SlashMenu>>,
    #[prop(into)] pos: Signal<(f64, f64)>,
    on_execute: Callback<SlashAction>,
) -> impl IntoView {
    let activate = move |depth: usize, index: usize| {
        let outcome = menu
            .try_update(|m| m.as_mut().map(|m| m.activate(depth, index)))
            .flatten();
        if let Some(SlashOutcome::Execute(action)) = outcome {
            on_execute.run(action);
        }
    };

    let column = move |depth: usize| {
        let items = menu.with(|m| m.as_ref().map(|m| m.items(depth).to_vec()).unwrap_or_default());
        if items.is_empty() {
            return view! {
                <MenuPanel>
                    <div class="px-2 py-1.5 text-sm text-muted-foreground">"No matching command"</div>
                </MenuPanel>
            }
            .into_any();
        }

        view! {
            <MenuPanel>
                <MenuList>
                    {items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let selected = Signal::derive(move || {
                                menu.with(|m| m.as_ref().and_then(|m| m.selected(depth)) == Some(i))
                            });
                            view! {
                                <MenuItem
                                    selected=selected
                                    has_children=item.has_children()
                                    on_hover=Callback::new(move |_| {
                                        menu.update(|m| {
                                            if let Some(m) = m {
                                                m.hover(depth, i);
                                            }
                                        })
                                    })
                                    on_select=Callback::new(move |_| activate(depth, i))
                                >
                                    <span class="truncate">{item.label.clone()}</span>
                                </MenuItem>
                            }
                        })
                        .collect_view()}
                </MenuList>
            </MenuPanel>
        }
        .into_any()
    };

    view! {
        <Show when=move || menu.with(|m| m.is_some())>
            <div
                data-name="SlashMenu"
                class="fixed z-50 flex items-start gap-1"
                style:left=move || format!("{}px", pos.get().0)
                style:top=move || format!("{}px", pos.get().1 + 4.0)
            >
                {move || {
                    let depth = menu.with(|m| m.as_ref().map(|m| m.depth()).unwrap_or(0));
                    (0..depth).map(column).collect_view()
                }}
            </div>
        </Show>
    }
}
