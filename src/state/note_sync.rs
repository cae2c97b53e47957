use crate::editor::session::{EditSession, SaveState};
use crate::models::Note;
use crate::state::{refresh_notes, AppContext};
use crate::util::now_ms;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use wasm_bindgen::JsCast;

/// Debounce window between the last keystroke and the autosave dispatch.
pub(crate) const AUTOSAVE_DEBOUNCE_MS: i32 = 1000;

/// Browser window handle; None outside wasm (native test runs), where no
/// timer can be armed and flushes are driven by hand.
fn browser_window() -> Option<web_sys::Window> {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window()
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        None
    }
}

/// Debounced autosave engine for open notes.
///
/// Responsibilities:
/// - one [`EditSession`] per open note id (single owner of the edit buffer)
/// - per-id debounce timer, re-armed on every keystroke
/// - dispatching `update` calls, at most one in flight per id
/// - follow-up saves when edits land while an update is in flight
/// - cancelling the pending save when the note is deleted
///
/// Sessions and timers are keyed by note id and the controller is
/// app-global, so a pending or in-flight save completes in the background
/// after navigating away while the newly opened note runs its own session.
#[derive(Clone)]
pub(crate) struct AutosaveScheduler {
    app_state: AppContext,

    debounce_ms: i32,

    /// note id -> edit session. Settled sessions for other notes are
    /// pruned on open; unsettled ones stay until their save lands.
    sessions: RwSignal<HashMap<String, EditSession>>,

    /// note id -> pending debounce timer handle.
    timers: Arc<Mutex<HashMap<String, i32>>>,
}

impl AutosaveScheduler {
    pub fn new(app_state: AppContext) -> Self {
        Self {
            app_state,
            debounce_ms: AUTOSAVE_DEBOUNCE_MS,
            sessions: RwSignal::new(HashMap::new()),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Called when a note page mounts with its fetched content.
    ///
    /// An unsettled session for the same id is kept as-is: its buffer is
    /// newer than the copy just fetched (the pending write has not landed
    /// yet), and reseeding would drop those edits.
    pub fn open(&self, note: &Note) {
        let current = note.id.clone();
        let fresh = EditSession::open(note);
        self.sessions.update(|m| {
            let keep_live = m
                .get(&current)
                .map(|s| !s.state().is_settled())
                .unwrap_or(false);
            if !keep_live {
                m.insert(current.clone(), fresh);
            }

            m.retain(|id, s| *id == current || !s.state().is_settled());
        });
    }

    /// Called by the editor on each input.
    pub fn on_edit(&self, note_id: &str, content: &str) {
        let rearm = self
            .sessions
            .try_update(|m| {
                m.get_mut(note_id)
                    .map(|s| s.apply_edit(content))
                    .unwrap_or(false)
            })
            .unwrap_or(false);

        if rearm {
            self.schedule_autosave(note_id.to_string());
        }
    }

    /// Explicit retry after a failed save (the toolbar affordance).
    pub fn retry(&self, note_id: &str) {
        let rearm = self
            .sessions
            .try_update(|m| m.get_mut(note_id).map(|s| s.retry()).unwrap_or(false))
            .unwrap_or(false);

        if rearm {
            self.schedule_autosave(note_id.to_string());
        }
    }

    /// A delete supersedes the autosave for this id: the debounce timer is
    /// cancelled (not merely outraced) and the session is torn down, so a
    /// late timer callback or an in-flight ack finds nothing to dispatch.
    pub fn cancel(&self, note_id: &str) {
        if let Ok(mut map) = self.timers.lock() {
            if let Some(tid) = map.remove(note_id) {
                if let Some(win) = browser_window() {
                    let _ = win.clear_timeout_with_handle(tid);
                }
            }
        }

        self.sessions.update(|m| {
            m.remove(note_id);
        });
    }

    pub fn save_state(&self, note_id: &str) -> Option<SaveState> {
        self.sessions.with(|m| m.get(note_id).map(|s| s.state()))
    }

    pub fn buffer(&self, note_id: &str) -> Option<String> {
        self.sessions
            .with_untracked(|m| m.get(note_id).map(|s| s.buffer().to_string()))
    }

    pub fn last_saved_ms(&self, note_id: &str) -> Option<i64> {
        self.sessions
            .with(|m| m.get(note_id).and_then(|s| s.last_saved_ms()))
    }

    fn schedule_autosave(&self, note_id: String) {
        if note_id.trim().is_empty() {
            return;
        }

        let Some(win) = browser_window() else {
            return;
        };

        if let Ok(mut map) = self.timers.lock() {
            if let Some(tid) = map.remove(&note_id) {
                let _ = win.clear_timeout_with_handle(tid);
            }
        }

        let s2 = self.clone();
        let note_id2 = note_id.clone();
        let cb = wasm_bindgen::closure::Closure::once_into_js(move || {
            s2.flush(note_id2);
        });

        let tid = win
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                cb.as_ref().unchecked_ref(),
                self.debounce_ms,
            )
            .unwrap_or(0);

        if let Ok(mut map) = self.timers.lock() {
            map.insert(note_id, tid);
        }
    }

    /// Debounce window elapsed for `note_id`.
    fn flush(&self, note_id: String) {
        if let Ok(mut map) = self.timers.lock() {
            map.remove(&note_id);
        }

        let pending = self
            .sessions
            .try_update(|m| m.get_mut(&note_id).and_then(|s| s.debounce_elapsed()))
            .flatten();

        let Some(content) = pending else {
            return;
        };
        self.dispatch(note_id, content);
    }

    fn dispatch(&self, note_id: String, content: String) {
        let api_client = self.app_state.0.api_client.get_untracked();
        let s2 = self.clone();
        spawn_local(async move {
            match api_client.update(&note_id, &content).await {
                Ok(()) => {
                    let followup = s2
                        .sessions
                        .try_update(|m| {
                            m.get_mut(&note_id).map(|s| s.save_succeeded(now_ms()))
                        })
                        .flatten()
                        .flatten();

                    // The ack may have changed the title or the ordering.
                    refresh_notes(s2.app_state.clone());

                    // Edits arrived during the call: send the newest content
                    // immediately, without another debounce delay.
                    if let Some(next) = followup {
                        s2.dispatch(note_id, next);
                    }
                }
                Err(e) => {
                    s2.sessions.update(|m| {
                        if let Some(s) = m.get_mut(&note_id) {
                            s.save_failed();
                        }
                    });

                    // Background concern: fold into Failed and log, never a
                    // blocking error. The next edit or a retry re-arms.
                    web_sys::console::warn_1(
                        &format!("autosave failed for {note_id}: {e}").into(),
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::search::SearchSequencer;
    use crate::state::{AppState, ListSource};
    use chrono::{TimeZone, Utc};

    fn test_app_state() -> AppContext {
        AppContext(AppState {
            api_client: RwSignal::new(ApiClient::new("http://localhost:8080".to_string())),
            notes: RwSignal::new(vec![]),
            notes_loading: RwSignal::new(false),
            notes_error: RwSignal::new(None),
            notes_request_id: RwSignal::new(0),
            list_source: RwSignal::new(ListSource::All),
            search_input: RwSignal::new(String::new()),
            search_seq: RwSignal::new(SearchSequencer::default()),
            searching: RwSignal::new(false),
            search_error: RwSignal::new(None),
        })
    }

    fn note(id: &str, content: &str) -> Note {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        Note {
            id: id.to_string(),
            title: "T".to_string(),
            content: content.to_string(),
            created_at: t,
            updated_at: t,
        }
    }

    #[test]
    fn test_delete_supersedes_pending_autosave() {
        let scheduler = AutosaveScheduler::new(test_app_state());
        scheduler.open(&note("n1", "foo"));
        scheduler.on_edit("n1", "foobar");
        assert_eq!(scheduler.save_state("n1"), Some(SaveState::Dirty));

        // Delete wins: the session is torn down before the window fires.
        scheduler.cancel("n1");
        assert_eq!(scheduler.save_state("n1"), None);

        // A late timer callback finds nothing to dispatch.
        scheduler.flush("n1".to_string());
        assert_eq!(scheduler.save_state("n1"), None);
    }

    #[test]
    fn test_open_keeps_unsettled_session() {
        let scheduler = AutosaveScheduler::new(test_app_state());
        let n = note("n1", "foo");
        scheduler.open(&n);
        scheduler.on_edit("n1", "foobar");

        // A refetched (older) copy must not clobber the dirty buffer.
        scheduler.open(&n);
        assert_eq!(scheduler.buffer("n1").as_deref(), Some("foobar"));
        assert_eq!(scheduler.save_state("n1"), Some(SaveState::Dirty));
    }

    #[test]
    fn test_open_prunes_settled_sessions_for_other_notes() {
        let scheduler = AutosaveScheduler::new(test_app_state());
        scheduler.open(&note("n1", "a"));
        scheduler.open(&note("n2", "b"));

        assert_eq!(scheduler.save_state("n1"), None);
        assert_eq!(scheduler.save_state("n2"), Some(SaveState::Clean));
    }

    #[test]
    fn test_unsettled_session_survives_navigation() {
        let scheduler = AutosaveScheduler::new(test_app_state());
        scheduler.open(&note("n1", "a"));
        scheduler.on_edit("n1", "ab");

        // Opening another note leaves the dirty session alone, so its save
        // can still land in the background.
        scheduler.open(&note("n2", "b"));
        assert_eq!(scheduler.save_state("n1"), Some(SaveState::Dirty));
        assert_eq!(scheduler.buffer("n1").as_deref(), Some("ab"));
    }
}
