use crate::components::ui::{
    Button, ButtonVariant, DialogBody, DialogDescription, DialogFooter, DialogHeader, DialogTitle,
    Modal,
};
use crate::state::AppContext;
use leptos::prelude::*;

/// The one confirmation dialog of the app, driven by `AppState::confirm`.
#[component]
pub fn ConfirmDialog() -> impl IntoView {
    let confirm = expect_context::<AppContext>().0.confirm;
    let close = Callback::new(move |_| confirm.set(None));

    let field = move |f: fn(&crate::state::ConfirmRequest) -> String| {
        move || confirm.with(|c| c.as_ref().map(f).unwrap_or_default())
    };

    view! {
        <Modal open=Signal::derive(move || confirm.with(|c| c.is_some())) on_close=close>
            <DialogBody>
                <DialogHeader>
                    <DialogTitle>{field(|c| c.title.clone())}</DialogTitle>
                    <DialogDescription>{field(|c| c.message.clone())}</DialogDescription>
                </DialogHeader>
                <DialogFooter>
                    <Button variant=ButtonVariant::Outline on:click=move |_| close.run(())>
                        "Cancel"
                    </Button>
                    <Button
                        variant=ButtonVariant::Destructive
                        on:click=move |_| {
                            let req = confirm.get_untracked();
                            confirm.set(None);
                            if let Some(req) = req {
                                req.on_confirm.run(());
                            }
                        }
                    >
                        {field(|c| c.confirm_label.clone())}
                    </Button>
                </DialogFooter>
            </DialogBody>
        </Modal>
    }
}
