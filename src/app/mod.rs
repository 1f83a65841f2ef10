use crate::autosave::controller::AutosaveController;
use crate::config::EnvConfig;
use crate::loader::controller::NoteLoader;
use crate::pages::WorkspacePage;
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    let app_state = AppContext(AppState::new(EnvConfig::new()));
    provide_context(app_state.clone());

    // The loader drives the auto-save binding, so both live for the whole app.
    let autosave = AutosaveController::new(app_state.clone());
    provide_context(autosave.clone());
    provide_context(NoteLoader::new(app_state, autosave));

    // Notes are addressed by query string (`?note=`), so one route serves everything.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("") view=WorkspacePage />
            </Routes>
        </Router>
    }
}
