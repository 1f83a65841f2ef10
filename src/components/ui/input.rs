use leptos::html;
use leptos::prelude::*;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

#[component]
pub fn Input(
    // Styling
    #[prop(into, optional)] class: String,

    // Common HTML attributes
    #[prop(into, default = "text")] r#type: &'static str,
    #[prop(into, optional)] placeholder: MaybeProp<String>,
    #[prop(into, optional)] id: String,
    #[prop(optional)] disabled: bool,
    #[prop(optional)] autofocus: bool,

    // Two-way binding, wired by hand rather than `bind:value`.
    #[prop(into)] bind_value: RwSignal<String>,

    /// Runs after `bind_value` took the new text.
    #[prop(optional)] on_change: Option<Callback<String>>,
    #[prop(optional)] on_keydown: Option<Callback<web_sys::KeyboardEvent>>,

    // Ref for direct DOM access
    #[prop(optional)] node_ref: NodeRef<html::Input>,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "placeholder:text-muted-foreground selection:bg-primary selection:text-primary-foreground dark:bg-input/30 border-input flex h-9 w-full min-w-0 rounded-md border bg-transparent px-3 py-1 text-base shadow-xs transition-[color,box-shadow] outline-none disabled:pointer-events-none disabled:cursor-not-allowed disabled:opacity-50 md:text-sm",
        "focus-visible:border-ring focus-visible:ring-ring/50",
        "focus-visible:ring-2",
        class
    );

    let on_input = move |ev: web_sys::Event| {
        let Some(input) = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
        else {
            return;
        };
        let value = input.value();
        bind_value.set(value.clone());
        if let Some(cb) = on_change {
            cb.run(value);
        }
    };

    view! {
        <input
            data-name="Input"
            type=r#type
            class=merged_class
            placeholder=move || placeholder.get()
            id=id
            disabled=disabled
            autofocus=autofocus
            prop:value=move || bind_value.get()
            on:input=on_input
            on:keydown=move |ev: web_sys::KeyboardEvent| {
                if let Some(cb) = on_keydown {
                    cb.run(ev);
                }
            }
            node_ref=node_ref
        />
    }
    .into_any()
}
