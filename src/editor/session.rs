use crate::models::Note;

/// Persistence status of the open edit buffer relative to the last
/// acknowledged write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub(crate) enum SaveState {
    /// Freshly opened; buffer matches the fetched content.
    #[strum(serialize = "Saved")]
    Clean,
    /// Buffer differs from the last acknowledged content.
    #[strum(serialize = "Unsaved")]
    Dirty,
    /// An update is in flight. At most one per note at any time.
    #[strum(serialize = "Saving...")]
    Saving,
    /// The last write was acknowledged and nothing changed since.
    #[strum(serialize = "Saved")]
    Saved,
    /// The last write failed; the buffer is retained, not reverted.
    #[strum(serialize = "Save failed")]
    Failed,
}

impl SaveState {
    /// Clean and Saved are equivalent for transition purposes; both mean
    /// "nothing to persist".
    pub fn is_settled(self) -> bool {
        matches!(self, SaveState::Clean | SaveState::Saved)
    }
}

/// Edit state of one open note.
///
/// The session owns the buffer exclusively and is driven from outside:
/// keystrokes via [`apply_edit`], the debounce timer via
/// [`debounce_elapsed`], network completions via [`save_succeeded`] /
/// [`save_failed`]. Keeping the transitions here, free of timers and
/// signals, is what lets the autosave scenarios run as plain unit tests.
///
/// [`apply_edit`]: EditSession::apply_edit
/// [`debounce_elapsed`]: EditSession::debounce_elapsed
/// [`save_succeeded`]: EditSession::save_succeeded
/// [`save_failed`]: EditSession::save_failed
#[derive(Clone, Debug)]
pub(crate) struct EditSession {
    buffer: String,
    /// Last content the service acknowledged (or the fetched content).
    synced_content: String,
    /// Content of the in-flight update, kept so an ack commits what was
    /// actually sent rather than whatever the buffer holds by then.
    in_flight: Option<String>,
    state: SaveState,
    last_saved_ms: Option<i64>,
}

impl EditSession {
    pub fn open(note: &Note) -> Self {
        Self {
            buffer: note.content.clone(),
            synced_content: note.content.clone(),
            in_flight: None,
            state: SaveState::Clean,
            last_saved_ms: None,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    pub fn last_saved_ms(&self) -> Option<i64> {
        self.last_saved_ms
    }

    /// Apply a keystroke. Returns true when the caller must (re)arm the
    /// debounce window.
    ///
    /// While Saving, no window is armed: the edit is picked up as a
    /// follow-up dispatch when the in-flight call resolves, so edits made
    /// during a save are never lost and never race it.
    pub fn apply_edit(&mut self, content: &str) -> bool {
        self.buffer.clear();
        self.buffer.push_str(content);

        if self.state == SaveState::Saving {
            return false;
        }

        if self.buffer == self.synced_content {
            // Typing back to the acknowledged content leaves nothing to
            // persist. A timer armed earlier may still fire; it will find
            // nothing dirty and dispatch nothing.
            self.state = SaveState::Clean;
            false
        } else {
            self.state = SaveState::Dirty;
            true
        }
    }

    /// The debounce window elapsed. Returns the content to persist, if the
    /// session is still dirty.
    pub fn debounce_elapsed(&mut self) -> Option<String> {
        if self.state != SaveState::Dirty {
            return None;
        }

        self.state = SaveState::Saving;
        self.in_flight = Some(self.buffer.clone());
        Some(self.buffer.clone())
    }

    /// The in-flight update was acknowledged at `now_ms`.
    ///
    /// Returns the next content to dispatch immediately (no extra debounce
    /// delay) when edits arrived during the call; None once settled.
    pub fn save_succeeded(&mut self, now_ms: i64) -> Option<String> {
        if let Some(acked) = self.in_flight.take() {
            self.synced_content = acked;
        }
        self.last_saved_ms = Some(now_ms);

        if self.buffer != self.synced_content {
            self.state = SaveState::Saving;
            self.in_flight = Some(self.buffer.clone());
            Some(self.buffer.clone())
        } else {
            self.state = SaveState::Saved;
            None
        }
    }

    /// The in-flight update failed. The buffer is kept as-is; the next
    /// edit (or an explicit retry) re-arms the window.
    pub fn save_failed(&mut self) {
        self.in_flight = None;
        self.state = SaveState::Failed;
    }

    /// Explicit retry from the Failed state. Returns true when the caller
    /// must re-arm the debounce window.
    pub fn retry(&mut self) -> bool {
        if self.state != SaveState::Failed {
            return false;
        }

        if self.buffer == self.synced_content {
            self.state = SaveState::Clean;
            false
        } else {
            self.state = SaveState::Dirty;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn open_with(content: &str) -> EditSession {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        EditSession::open(&Note {
            id: "n1".to_string(),
            title: "N1".to_string(),
            content: content.to_string(),
            created_at: t,
            updated_at: t,
        })
    }

    #[test]
    fn test_single_edit_saves_once_and_settles() {
        let mut s = open_with("foo");
        assert_eq!(s.state(), SaveState::Clean);

        assert!(s.apply_edit("foobar"));
        assert_eq!(s.state(), SaveState::Dirty);

        assert_eq!(s.debounce_elapsed().as_deref(), Some("foobar"));
        assert_eq!(s.state(), SaveState::Saving);

        assert_eq!(s.save_succeeded(1_000), None);
        assert_eq!(s.state(), SaveState::Saved);
        assert_eq!(s.last_saved_ms(), Some(1_000));
    }

    #[test]
    fn test_rapid_edits_coalesce_into_one_dispatch() {
        let mut s = open_with("");
        assert!(s.apply_edit("a"));
        assert!(s.apply_edit("ab"));

        // One window, one dispatch, newest content.
        assert_eq!(s.debounce_elapsed().as_deref(), Some("ab"));
        assert_eq!(s.debounce_elapsed(), None);
    }

    #[test]
    fn test_edit_during_save_triggers_immediate_followup() {
        let mut s = open_with("");
        s.apply_edit("x");
        assert_eq!(s.debounce_elapsed().as_deref(), Some("x"));

        // Arrives while the update is in flight: no new window, no loss.
        assert!(!s.apply_edit("xy"));
        assert_eq!(s.state(), SaveState::Saving);

        // First ack commits "x" and hands back "xy" to send right away.
        assert_eq!(s.save_succeeded(1_000).as_deref(), Some("xy"));
        assert_eq!(s.state(), SaveState::Saving);

        assert_eq!(s.save_succeeded(2_000), None);
        assert_eq!(s.state(), SaveState::Saved);
    }

    #[test]
    fn test_at_most_one_update_in_flight() {
        let mut s = open_with("");
        s.apply_edit("x");
        assert!(s.debounce_elapsed().is_some());

        // A stray timer firing mid-save must not dispatch a second update.
        s.apply_edit("xy");
        assert_eq!(s.debounce_elapsed(), None);
    }

    #[test]
    fn test_typing_back_to_synced_content_settles_clean() {
        let mut s = open_with("foo");
        assert!(s.apply_edit("foox"));
        assert!(!s.apply_edit("foo"));
        assert_eq!(s.state(), SaveState::Clean);

        // The earlier window still fires, but there is nothing to persist.
        assert_eq!(s.debounce_elapsed(), None);
    }

    #[test]
    fn test_failure_keeps_buffer_and_next_edit_rearms() {
        let mut s = open_with("foo");
        s.apply_edit("foobar");
        s.debounce_elapsed();
        s.save_failed();

        assert_eq!(s.state(), SaveState::Failed);
        assert_eq!(s.buffer(), "foobar");

        assert!(s.apply_edit("foobarbaz"));
        assert_eq!(s.state(), SaveState::Dirty);
        assert_eq!(s.debounce_elapsed().as_deref(), Some("foobarbaz"));
    }

    #[test]
    fn test_explicit_retry_from_failed() {
        let mut s = open_with("foo");
        s.apply_edit("foobar");
        s.debounce_elapsed();
        s.save_failed();

        assert!(s.retry());
        assert_eq!(s.state(), SaveState::Dirty);
        assert_eq!(s.debounce_elapsed().as_deref(), Some("foobar"));

        // Retry is a no-op outside Failed.
        assert!(!s.retry());
    }

    #[test]
    fn test_eventual_consistency_under_interleaved_edits() {
        // However edits interleave with acks, once the machine settles the
        // acknowledged content equals the final buffer.
        let mut s = open_with("");
        s.apply_edit("a");
        let first = s.debounce_elapsed().expect("dirty session must dispatch");
        assert_eq!(first, "a");

        s.apply_edit("ab");
        s.apply_edit("abc");

        let followup = s.save_succeeded(1_000).expect("edits during save");
        assert_eq!(followup, "abc");
        assert_eq!(s.save_succeeded(2_000), None);

        assert_eq!(s.state(), SaveState::Saved);
        assert_eq!(s.buffer(), "abc");
    }

    #[test]
    fn test_save_state_labels() {
        assert_eq!(SaveState::Clean.to_string(), "Saved");
        assert_eq!(SaveState::Saving.to_string(), "Saving...");
        assert_eq!(SaveState::Failed.to_string(), "Save failed");
        assert!(SaveState::Saved.is_settled());
        assert!(!SaveState::Dirty.is_settled());
    }
}
