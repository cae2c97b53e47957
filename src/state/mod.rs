use crate::api::ApiClient;
use crate::models::{sort_for_sidebar, Note};
use crate::search::SearchSequencer;
use leptos::prelude::*;
use leptos::task::spawn_local;

pub(crate) mod note_sync;

/// The note collection the sidebar currently renders. Exactly one source is
/// authoritative at a time.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ListSource {
    /// The full collection, refreshed on demand and ordered client-side.
    All,
    /// Ranked results for `query`, replaced wholesale on each accepted
    /// response and rendered in server order.
    Search { query: String, results: Vec<Note> },
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub api_client: RwSignal<ApiClient>,

    /// Full notes collection, kept in sidebar order.
    pub notes: RwSignal<Vec<Note>>,
    pub notes_loading: RwSignal<bool>,
    pub notes_error: RwSignal<Option<String>>,

    /// Stale-response guard for list refreshes.
    pub notes_request_id: RwSignal<u64>,

    pub list_source: RwSignal<ListSource>,

    /// Search box state. The sequencer strands outstanding responses when
    /// the query changes or is cleared.
    pub search_input: RwSignal<String>,
    pub search_seq: RwSignal<SearchSequencer>,
    pub searching: RwSignal<bool>,
    pub search_error: RwSignal<Option<String>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            api_client: RwSignal::new(ApiClient::from_env()),
            notes: RwSignal::new(vec![]),
            notes_loading: RwSignal::new(false),
            notes_error: RwSignal::new(None),
            notes_request_id: RwSignal::new(0),
            list_source: RwSignal::new(ListSource::All),
            search_input: RwSignal::new(String::new()),
            search_seq: RwSignal::new(SearchSequencer::default()),
            searching: RwSignal::new(false),
            search_error: RwSignal::new(None),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub(crate) struct AppContext(pub AppState);

/// Re-fetch the full collection (after create/delete or an acked autosave,
/// so titles and ordering follow the edits).
///
/// A full re-list per mutation is deliberate: no incremental patching, at
/// the cost of one extra round trip. Stale responses are dropped by
/// request id so an older refresh can never clobber a newer one.
pub(crate) fn refresh_notes(app_state: AppContext) {
    let req_id = app_state
        .0
        .notes_request_id
        .get_untracked()
        .saturating_add(1);
    app_state.0.notes_request_id.set(req_id);

    app_state.0.notes_loading.set(true);
    app_state.0.notes_error.set(None);

    let api_client = app_state.0.api_client.get_untracked();
    spawn_local(async move {
        let result = api_client.list().await;

        // Ignore stale responses.
        if app_state.0.notes_request_id.get_untracked() != req_id {
            return;
        }

        match result {
            Ok(mut notes) => {
                sort_for_sidebar(&mut notes);
                app_state.0.notes.set(notes);
            }
            Err(e) => {
                app_state.0.notes_error.set(Some(e.to_string()));
            }
        }
        app_state.0.notes_loading.set(false);
    });
}
