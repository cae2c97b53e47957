use crate::pages::{HomePage, NewNotePage, NotePage, Shell};
use crate::state::note_sync::AutosaveScheduler;
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    let app_state = AppContext(AppState::new());
    provide_context(app_state.clone());

    // The scheduler is app-global so pending saves survive navigation.
    provide_context(AutosaveScheduler::new(app_state));

    // IMPORTANT:
    // - Leptos CSR requires the `csr` feature on `leptos`.
    // - router hooks require a <Router> context.
    view! {
        <Router>
            <Routes fallback=|| view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }>
                <Route path=path!("new") view=|| view! {
                    <Shell>
                        <NewNotePage />
                    </Shell>
                } />
                <Route path=path!("note/:id") view=|| view! {
                    <Shell>
                        <NotePage />
                    </Shell>
                } />
                <Route path=path!("") view=|| view! {
                    <Shell>
                        <HomePage />
                    </Shell>
                } />
            </Routes>
        </Router>
    }
}
