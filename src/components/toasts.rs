use crate::components::ui::{Alert, AlertDescription};
use crate::state::{AppContext, ToastKind};
use icons::X;
use leptos::prelude::*;

fn toast_class(kind: ToastKind) -> &'static str {
    match kind {
        ToastKind::Info => "bg-card",
        ToastKind::Success => "bg-card border-success text-success",
        ToastKind::Error => "bg-card border-destructive text-destructive",
    }
}

#[component]
pub fn ToastContainer() -> impl IntoView {
    let toasts = expect_context::<AppContext>().0.toasts;

    view! {
        <div class="pointer-events-none fixed right-4 bottom-4 z-[60] flex w-80 flex-col gap-2">
            <For
                each=move || toasts.items.get()
                key=|t| t.id
                children=move |t| {
                    let id = t.id;
                    view! {
                        <Alert class=format!("pointer-events-auto shadow-md pr-8 {}", toast_class(t.kind))>
                            <AlertDescription>{t.message}</AlertDescription>
                            <button
                                type="button"
                                class="absolute top-3 right-2 opacity-60 hover:opacity-100"
                                aria-label="Dismiss"
                                on:click=move |_| toasts.dismiss(id)
                            >
                                <X class="size-4" />
                            </button>
                        </Alert>
                    }
                }
            />
        </div>
    }
}
