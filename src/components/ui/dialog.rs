use icons::X;
use leptos::prelude::*;
use leptos_dom::helpers::window_event_listener;
use leptos_ui::clx;
use tw_merge::*;

mod components {
    use super::*;
    clx! {DialogBody, div, "flex flex-col gap-4"}
    clx! {DialogHeader, div, "flex flex-col gap-2 text-center sm:text-left"}
    clx! {DialogTitle, h3, "text-lg leading-none font-semibold"}
    clx! {DialogDescription, p, "text-muted-foreground text-sm"}
    clx! {DialogFooter, footer, "flex flex-col-reverse gap-2 sm:flex-row sm:justify-end"}
}

pub use components::*;

/// Signal-driven modal. Escape and a click on the backdrop both call `on_close`.
#[component]
pub fn Modal(
    children: ChildrenFn,
    #[prop(into)] open: Signal<bool>,
    on_close: Callback<()>,
    #[prop(optional, into)] class: String,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "relative z-50 grid w-full max-w-[calc(100%-2rem)] gap-4 rounded-lg border bg-background p-6 shadow-lg sm:max-w-lg",
        class
    );
    let class_sv = StoredValue::new(merged_class);
    let children = StoredValue::new(children);

    let esc = window_event_listener(leptos::ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if open.get_untracked() && ev.key() == "Escape" {
            on_close.run(());
        }
    });
    on_cleanup(move || esc.remove());

    view! {
        <Show when=move || open.get()>
            <div
                data-name="Modal"
                class="fixed inset-0 z-40 flex items-center justify-center bg-black/50"
                on:mousedown=move |ev: web_sys::MouseEvent| {
                    // Only the backdrop itself, not clicks bubbling from the panel.
                    if ev.target() == ev.current_target() {
                        on_close.run(());
                    }
                }
            >
                <div class=class_sv.get_value() role="dialog" aria-modal="true">
                    <button
                        type="button"
                        class="absolute top-4 right-4 rounded-xs opacity-70 hover:opacity-100 [&_svg:not([class*='size-'])]:size-4"
                        aria-label="Close"
                        on:click=move |_| on_close.run(())
                    >
                        <X />
                    </button>
                    {children.with_value(|c| c())}
                </div>
            </div>
        </Show>
    }
}
