use crate::api::ApiErrorKind;
use crate::components::ui::{Alert, AlertDescription, Input, Spinner};
use crate::editor::Editor;
use crate::models::Note;
use crate::search::{on_query_input, sanitize_excerpt, QueryAction, SEARCH_DEBOUNCE_MS};
use crate::state::{refresh_notes, AppContext, ListSource};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_location, use_navigate, use_params};
use leptos_router::params::Params;
use wasm_bindgen::JsCast;

/// App frame: the sidebar on the left, the routed page on the right.
#[component]
pub fn Shell(children: Children) -> impl IntoView {
    view! {
        <div class="flex h-screen overflow-hidden bg-background text-foreground">
            <aside class="h-full shrink-0">
                <Sidebar />
            </aside>
            <main class="relative flex h-full flex-1 flex-col overflow-hidden">
                {children()}
            </main>
        </div>
    }
}

/// Dispatch a search for `query` under sequence `seq`.
///
/// The response is applied only while `seq` is still the latest dispatched
/// sequence ("last query wins"); an out-of-order older response is dropped
/// silently. Failures keep whatever results are on screen.
fn run_search(app_state: AppContext, query: String, seq: u64) {
    let api_client = app_state.0.api_client.get_untracked();
    app_state.0.searching.set(true);

    spawn_local(async move {
        let result = api_client.search(&query).await;

        // Ignore stale responses.
        if !app_state.0.search_seq.get_untracked().is_current(seq) {
            return;
        }

        match result {
            Ok(results) => {
                // Excerpts arrive pre-highlighted but untrusted.
                let results: Vec<Note> = results
                    .into_iter()
                    .map(|mut n| {
                        n.content = sanitize_excerpt(&n.content);
                        n
                    })
                    .collect();

                app_state.0.search_error.set(None);
                app_state
                    .0
                    .list_source
                    .set(ListSource::Search { query, results });
            }
            Err(e) => {
                // Fail-soft: surface an indicator, keep the shown results.
                app_state.0.search_error.set(Some(e.to_string()));
            }
        }
        app_state.0.searching.set(false);
    });
}

/// Note list and search box. Renders whichever collection is authoritative:
/// the full list (most recently modified first) or the latest accepted
/// search results (server rank, verbatim).
#[component]
pub fn Sidebar() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let location = use_location();

    // Initial load of the full collection.
    {
        let app_state = app_state.clone();
        Effect::new(move |_| {
            refresh_notes(app_state.clone());
        });
    }

    // Pending search debounce timer handle.
    let search_timer: RwSignal<Option<i32>> = RwSignal::new(None);

    let clear_search_timer = move || {
        if let Some(tid) = search_timer.get_untracked() {
            if let Some(win) = web_sys::window() {
                let _ = win.clear_timeout_with_handle(tid);
            }
        }
        search_timer.set(None);
    };

    let on_search_input = {
        let app_state = app_state.clone();
        move |ev: web_sys::Event| {
            let v = ev
                .target()
                .and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok())
                .map(|t| t.value())
                .unwrap_or_else(|| app_state.0.search_input.get_untracked());

            match on_query_input(&v) {
                QueryAction::ClearNow => {
                    // Synchronous: no debounce, no network call. Outstanding
                    // responses are stranded by bumping the sequence.
                    clear_search_timer();
                    app_state.0.search_seq.update(|s| s.invalidate());
                    app_state.0.searching.set(false);
                    app_state.0.search_error.set(None);
                    app_state.0.list_source.set(ListSource::All);
                }
                QueryAction::Debounce(query) => {
                    clear_search_timer();

                    let Some(win) = web_sys::window() else {
                        return;
                    };

                    let app_state2 = app_state.clone();
                    let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
                        // The sequence is assigned at dispatch time, when
                        // the window expires, not at keystroke time.
                        let seq = app_state2
                            .0
                            .search_seq
                            .try_update(|s| s.dispatch())
                            .unwrap_or_default();
                        run_search(app_state2, query, seq);
                    });

                    let tid = win
                        .set_timeout_with_callback_and_timeout_and_arguments_0(
                            cb.as_ref().unchecked_ref(),
                            SEARCH_DEBOUNCE_MS,
                        )
                        .unwrap_or(0);
                    search_timer.set(Some(tid));
                }
            }
        }
    };

    let entries = {
        let app_state = app_state.clone();
        move || match app_state.0.list_source.get() {
            // Already in sidebar order.
            ListSource::All => app_state.0.notes.get(),
            // Server rank, never re-sorted.
            ListSource::Search { results, .. } => results,
        }
    };

    let is_search = {
        let app_state = app_state.clone();
        move || matches!(app_state.0.list_source.get(), ListSource::Search { .. })
    };

    let empty_label = {
        let app_state = app_state.clone();
        let is_search = is_search.clone();
        move || {
            if is_search() {
                "No notes match your search."
            } else if app_state.0.notes_loading.get() {
                "Loading notes..."
            } else {
                "No notes yet."
            }
        }
    };

    let entries2 = entries.clone();
    let is_search2 = is_search.clone();

    view! {
        <div class="flex h-full w-64 flex-col border-r border-border bg-muted/40">
            <div class="flex items-center justify-between border-b border-border p-4">
                <a href="/" class="text-sm font-semibold text-foreground">"Marko"</a>
                <a
                    href="/new"
                    title="New note"
                    class="rounded-md px-2 py-1 text-sm text-muted-foreground transition-colors hover:bg-accent hover:text-accent-foreground"
                >
                    "+ New"
                </a>
            </div>

            <div class="border-b border-border p-2">
                <div class="relative">
                    <Input
                        id="search"
                        placeholder="Search notes..."
                        bind_value=app_state.0.search_input
                        class="h-8 pr-8 text-sm"
                        on:input=on_search_input
                    />
                    <div class="absolute inset-y-0 right-2 flex items-center">
                        <Show when=move || app_state.0.searching.get() fallback=|| ().into_view()>
                            <Spinner class="text-muted-foreground" />
                        </Show>
                    </div>
                </div>

                <Show when=move || app_state.0.search_error.get().is_some() fallback=|| ().into_view()>
                    <div class="px-1 pt-1 text-xs text-destructive">
                        {move || app_state.0.search_error.get().unwrap_or_default()}
                    </div>
                </Show>
            </div>

            <div class="flex-1 overflow-y-auto p-2">
                <Show when=move || app_state.0.notes_error.get().is_some() fallback=|| ().into_view()>
                    {move || app_state.0.notes_error.get().map(|e| view! {
                        <Alert class="mb-2 border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                        </Alert>
                    })}
                </Show>

                <Show
                    when=move || !entries().is_empty()
                    fallback=move || view! {
                        <div class="py-8 text-center text-sm text-muted-foreground">
                            {empty_label.clone()}
                        </div>
                    }
                >
                    <nav class="space-y-0.5">
                        {move || {
                            let pathname = location.pathname.get();
                            let show_excerpt = is_search2();
                            entries2()
                                .into_iter()
                                .map(|n| {
                                    let href = format!("/note/{}", urlencoding::encode(&n.id));
                                    let active = pathname == href;
                                    let title = n.display_title().to_string();
                                    let excerpt = n.content.clone();
                                    let has_excerpt = show_excerpt && !excerpt.is_empty();
                                    view! {
                                        <a
                                            href=href
                                            class=move || {
                                                if active {
                                                    "block rounded-md border border-border bg-background px-3 py-2 text-sm text-foreground shadow-sm"
                                                } else {
                                                    "block rounded-md px-3 py-2 text-sm text-muted-foreground transition-colors hover:bg-accent/50 hover:text-foreground"
                                                }
                                            }
                                        >
                                            <div class="truncate">{title}</div>
                                            <Show when=move || has_excerpt fallback=|| ().into_view()>
                                                <div
                                                    class="mt-0.5 truncate text-xs text-muted-foreground [&_b]:font-semibold [&_b]:text-foreground"
                                                    inner_html=excerpt.clone()
                                                ></div>
                                            </Show>
                                        </a>
                                    }
                                })
                                .collect_view()
                        }}
                    </nav>
                </Show>
            </div>
        </div>
    }
}

/// Empty state for the root route.
#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="flex h-full flex-col items-center justify-center text-muted-foreground">
            <div class="space-y-2 text-center">
                <h2 class="text-2xl font-medium text-foreground">"No note selected"</h2>
                <p class="text-sm">"Select a note from the sidebar or create a new one."</p>
            </div>
        </div>
    }
}

#[derive(Params, PartialEq)]
struct NoteRouteParams {
    id: Option<String>,
}

#[component]
pub fn NotePage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<NoteRouteParams>();

    let note_id = move || params.get().ok().and_then(|p| p.id).unwrap_or_default();

    let note: RwSignal<Option<Note>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let not_found: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    // Stale-response guard across rapid navigations.
    let req_id: RwSignal<u64> = RwSignal::new(0);

    Effect::new(move |_| {
        let id = note_id();
        if id.trim().is_empty() {
            note.set(None);
            return;
        }

        let rid = req_id.get_untracked().saturating_add(1);
        req_id.set(rid);

        loading.set(true);
        not_found.set(false);
        error.set(None);
        note.set(None);

        let api_client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = api_client.get(&id).await;

            // Ignore stale responses.
            if req_id.get_untracked() != rid {
                return;
            }

            match result {
                Ok(n) => note.set(Some(n)),
                Err(e) if e.kind == ApiErrorKind::NotFound => not_found.set(true),
                Err(e) => error.set(Some(e.to_string())),
            }
            loading.set(false);
        });
    });

    view! {
        <Show when=move || !loading.get() fallback=|| view! {
            <div class="flex h-full items-center justify-center text-muted-foreground">
                <Spinner />
            </div>
        }>
            <Show when=move || !not_found.get() fallback=|| view! {
                <div class="flex h-full items-center justify-center text-muted-foreground">
                    "This note does not exist (it may have been deleted)."
                </div>
            }>
                <Show when=move || error.get().is_none() fallback=move || view! {
                    <div class="p-4">
                        <Alert class="border-destructive/30">
                            <AlertDescription class="text-destructive text-xs">
                                {move || error.get().unwrap_or_default()}
                            </AlertDescription>
                        </Alert>
                    </div>
                }>
                    {move || note.get().map(|n| view! { <Editor note=n /> })}
                </Show>
            </Show>
        </Show>
    }
}

/// Creates a stock note and redirects into it.
#[component]
pub fn NewNotePage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = use_navigate();
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    // Guard against effect re-runs issuing a second create.
    let started = StoredValue::new(false);

    Effect::new(move |_| {
        if started.get_value() {
            return;
        }
        started.set_value(true);

        let api_client = app_state.0.api_client.get_untracked();
        let app_state2 = app_state.clone();
        let navigate2 = navigate.clone();
        spawn_local(async move {
            match api_client.create("# New Note\n\nStarting writing...").await {
                Ok(created) => {
                    refresh_notes(app_state2);
                    navigate2(
                        &format!("/note/{}", urlencoding::encode(&created.id)),
                        Default::default(),
                    );
                }
                Err(e) => {
                    error.set(Some(e.to_string()));
                }
            }
        });
    });

    view! {
        <div class="flex h-full items-center justify-center text-muted-foreground">
            <Show
                when=move || error.get().is_none()
                fallback=move || view! {
                    <Alert class="max-w-md border-destructive/30">
                        <AlertDescription class="text-destructive text-xs">
                            {move || error.get().unwrap_or_default()}
                        </AlertDescription>
                    </Alert>
                }
            >
                <div class="flex items-center gap-2 text-sm">
                    <Spinner />
                    "Creating note..."
                </div>
            </Show>
        </div>
    }
}
