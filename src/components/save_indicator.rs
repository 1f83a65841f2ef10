use crate::autosave::controller::AutosaveController;
use crate::autosave::SaveStatus;
use crate::components::ui::{Button, ButtonSize, ButtonVariant, Spinner};
use crate::state::AppContext;
use leptos::prelude::*;

#[component]
pub fn SaveIndicator() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let autosave = StoredValue::new(expect_context::<AutosaveController>());
    let status = app_state.0.save_status;
    let last_saved = app_state.0.last_saved;

    let dot_class = move || match status.get() {
        SaveStatus::Saved => "size-2 rounded-full bg-success",
        SaveStatus::Unsaved | SaveStatus::Retrying { .. } => "size-2 rounded-full bg-warning",
        SaveStatus::Saving => "hidden",
        SaveStatus::Failed => "size-2 rounded-full bg-destructive",
    };

    view! {
        <div class="flex items-center gap-2 text-xs text-muted-foreground" data-name="SaveIndicator">
            <Show when=move || status.get() == SaveStatus::Saving>
                <Spinner class="size-3" />
            </Show>
            <span class=dot_class></span>
            <span title=move || last_saved.get().unwrap_or_default()>
                {move || status.get().label()}
            </span>
            <Button
                variant=ButtonVariant::Ghost
                size=ButtonSize::Sm
                attr:disabled=move || status.get() == SaveStatus::Saving
                on:click=move |_| autosave.with_value(|a| a.save_now())
            >
                "Save"
            </Button>
        </div>
    }
}
