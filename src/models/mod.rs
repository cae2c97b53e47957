use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A markdown note as served by the marko backend.
///
/// `title` is derived server-side from the first heading; the client never
/// writes it. `content` is omitted in list responses, and search responses
/// reuse the field for a highlighted excerpt, so it defaults to empty.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Note {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn display_title(&self) -> &str {
        let t = self.title.trim();
        if t.is_empty() {
            "Untitled"
        } else {
            t
        }
    }
}

/// Sidebar order for the full collection: most recently modified first,
/// ties broken by id so the order is stable across refreshes.
///
/// Search results are never passed through here; they keep server rank.
pub(crate) fn sort_for_sidebar(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(id: &str, updated_at: DateTime<Utc>) -> Note {
        Note {
            id: id.to_string(),
            title: format!("Note {id}"),
            content: String::new(),
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn test_note_list_contract_deserialize() {
        // Contract based on marko-backend: models/note.go (content omitempty).
        let json = r#"[
            {"id": "a", "title": "A", "createdAt": "2024-03-01T10:00:00Z", "updatedAt": "2024-03-02T10:00:00Z"},
            {"id": "b", "title": "B", "content": "# B", "createdAt": "2024-03-01T10:00:00Z", "updatedAt": "2024-03-01T10:00:00Z"}
        ]"#;
        let notes: Vec<Note> = serde_json::from_str(json).expect("note list should parse");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].content, "");
        assert_eq!(notes[1].content, "# B");
    }

    #[test]
    fn test_note_timestamps_accept_offsets() {
        // The store stamps notes with file mtimes, which may carry a zone offset.
        let json = r#"{"id": "a", "title": "A", "createdAt": "2024-03-01T10:00:00+02:00", "updatedAt": "2024-03-01T10:00:00+02:00"}"#;
        let n: Note = serde_json::from_str(json).expect("offset timestamp should parse");
        assert_eq!(
            n.updated_at,
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_sort_for_sidebar_most_recent_first() {
        let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap();
        let mut notes = vec![note("old", t1), note("new", t2)];
        sort_for_sidebar(&mut notes);
        assert_eq!(notes[0].id, "new");
        assert_eq!(notes[1].id, "old");
    }

    #[test]
    fn test_sort_for_sidebar_ties_break_by_id() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut notes = vec![note("b", t), note("a", t), note("c", t)];
        sort_for_sidebar(&mut notes);
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn test_display_title_falls_back_to_untitled() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let mut n = note("a", t);
        n.title = "  ".to_string();
        assert_eq!(n.display_title(), "Untitled");
        n.title = "Meeting notes".to_string();
        assert_eq!(n.display_title(), "Meeting notes");
    }
}
