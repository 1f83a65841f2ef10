use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, DialogBody, DialogDescription, DialogFooter, DialogHeader,
    DialogTitle, Input, Modal,
};
use crate::models::{ShareSettings, ShareTarget};
use crate::state::AppContext;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// Public link of a note or folder, driven by `AppState::share_target`:
/// create it, change its settings, or revoke it.
#[component]
pub fn ShareDialog() -> impl IntoView {
    let st = StoredValue::new(expect_context::<AppContext>().0);
    let target = st.with_value(|s| s.share_target);
    let password = RwSignal::new(String::new());
    let indexable = RwSignal::new(false);
    let link = RwSignal::new(None::<String>);
    let busy = RwSignal::new(false);

    // Existing link of the item that was just opened.
    Effect::new(move |_| {
        let Some(t) = target.get() else {
            return;
        };
        let state = st.get_value();
        busy.set(true);
        spawn_local(async move {
            let res = state.api_client.get_untracked().get_share(&t).await;
            if target.get_untracked().as_ref() != Some(&t) {
                return;
            }
            busy.set(false);
            match res {
                Ok(url) => link.set(url),
                Err(e) => log::warn!("reading share of {t:?} failed: {e}"),
            }
        });
    });

    let close = Callback::new(move |_| {
        target.set(None);
        busy.set(false);
        password.set(String::new());
        indexable.set(false);
        link.set(None);
    });

    let save = move |_| {
        let Some(t) = target.get_untracked() else {
            return;
        };
        let settings = ShareSettings {
            token: None,
            password: Some(password.get_untracked()).filter(|p| !p.is_empty()),
            indexable: Some(indexable.get_untracked() as u8),
        };
        let existing = link.get_untracked();
        let state = st.get_value();
        busy.set(true);
        spawn_local(async move {
            let api_client = state.api_client.get_untracked();
            let res = if existing.is_some() {
                api_client.update_share(&t, &settings).await
            } else {
                api_client.create_share(&t, &settings).await
            };
            busy.set(false);
            match res {
                Ok(url) => {
                    link.set(url.or(existing));
                    log::info!("shared {t:?}");
                    state.toasts.success(format!("\"{}\" is shared", t.label()));
                }
                Err(e) => state.toasts.error(format!("Could not share: {e}")),
            }
        });
    };

    let revoke = move |_| {
        let Some(t) = target.get_untracked() else {
            return;
        };
        let state = st.get_value();
        busy.set(true);
        spawn_local(async move {
            let res = state.api_client.get_untracked().revoke_share(&t).await;
            busy.set(false);
            match res {
                Ok(()) => {
                    link.set(None);
                    state.toasts.success(format!("\"{}\" is no longer shared", t.label()));
                }
                Err(e) => state.toasts.error(format!("Could not revoke share: {e}")),
            }
        });
    };

    let description = move || match target.get() {
        Some(ShareTarget::Folder { .. }) => "Anyone with the link can read the notes of this folder.",
        _ => "Anyone with the link can read this note.",
    };

    view! {
        <Modal open=Signal::derive(move || target.with(Option::is_some)) on_close=close>
            <DialogBody>
                <DialogHeader>
                    <DialogTitle>
                        {move || {
                            format!(
                                "Share \"{}\"",
                                target.with(|t| t.as_ref().map(|t| t.label().to_string()).unwrap_or_default()),
                            )
                        }}
                    </DialogTitle>
                    <DialogDescription>{description}</DialogDescription>
                </DialogHeader>
                <Input r#type="password" placeholder="Password (optional)" bind_value=password />
                <label class="flex items-center gap-2 text-sm">
                    <input
                        type="checkbox"
                        prop:checked=move || indexable.get()
                        on:change=move |ev| indexable.set(event_target_checked(&ev))
                    />
                    "Allow search engines to index"
                </label>
                <Show when=move || link.with(Option::is_some)>
                    <code class="rounded bg-muted px-2 py-1 text-xs break-all">
                        {move || link.get().unwrap_or_default()}
                    </code>
                </Show>
                <DialogFooter>
                    <Show when=move || link.with(Option::is_some)>
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            attr:disabled=move || busy.get()
                            on:click=revoke
                        >
                            "Revoke"
                        </Button>
                    </Show>
                    <Button size=ButtonSize::Sm attr:disabled=move || busy.get() on:click=save>
                        {move || if link.with(Option::is_some) { "Update" } else { "Share" }}
                    </Button>
                </DialogFooter>
            </DialogBody>
        </Modal>
    }
}
