use icons::ChevronRight;
use leptos::prelude::*;
use leptos_ui::clx;
use tw_merge::*;

mod components {
    use super::*;
    clx! {MenuPanel, div, "z-50 min-w-[12rem] rounded-md border bg-popover p-1 text-popover-foreground shadow-md"}
    clx! {MenuList, div, "max-h-72 overflow-y-auto overflow-x-hidden scroll-py-1"}
}

pub use components::*;

/// One selectable row. `mousedown` is swallowed so the editor keeps focus and its caret.
#[component]
pub fn MenuItem(
    children: Children,
    #[prop(optional, into)] class: String,
    #[prop(default = false.into(), into)] selected: Signal<bool>,
    #[prop(optional)] has_children: bool,
    #[prop(optional)] on_select: Option<Callback<()>>,
    #[prop(optional)] on_hover: Option<Callback<()>>,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "group relative flex gap-2 items-center px-2 py-1.5 text-sm rounded-sm cursor-default select-none outline-none aria-selected:bg-accent aria-selected:text-accent-foreground hover:bg-accent hover:text-accent-foreground",
        class
    );

    view! {
        <div
            data-name="MenuItem"
            class=merged_class
            role="option"
            aria-selected=move || selected.get().to_string()
            on:mousedown=move |ev: web_sys::MouseEvent| ev.prevent_default()
            on:mousemove=move |_| {
                if let Some(cb) = on_hover {
                    cb.run(());
                }
            }
            on:click=move |_| {
                if let Some(cb) = on_select {
                    cb.run(());
                }
            }
        >
            {children()}
            <Show when=move || has_children>
                <ChevronRight class="ml-auto size-4 text-muted-foreground" />
            </Show>
        </div>
    }
}
