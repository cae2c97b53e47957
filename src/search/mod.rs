//! Search dispatch sequencing and excerpt handling.
//!
//! The sidebar search box debounces keystrokes and races the service; the
//! rules that keep it coherent live here, signal-free, so they can be
//! exercised without timers: which inputs clear synchronously, which arm
//! the debounce window, and which responses are still worth applying.

/// Debounce window between the last keystroke and the search dispatch.
pub(crate) const SEARCH_DEBOUNCE_MS: i32 = 300;

/// What the search box must do in response to an input change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum QueryAction {
    /// Trimmed query is empty: drop any results and restore the full list
    /// immediately. No debounce, no network call.
    ClearNow,
    /// (Re)arm the debounce window for this trimmed query.
    Debounce(String),
}

pub(crate) fn on_query_input(raw: &str) -> QueryAction {
    let q = raw.trim();
    if q.is_empty() {
        QueryAction::ClearNow
    } else {
        QueryAction::Debounce(q.to_string())
    }
}

/// Monotonic sequence numbers for dispatched queries: last query wins,
/// never last response.
///
/// Responses are tagged with the sequence assigned at dispatch time and
/// applied only while that sequence is still the newest. Clearing the box
/// bumps the sequence so every outstanding response lands stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct SearchSequencer {
    latest: u64,
}

impl SearchSequencer {
    pub fn dispatch(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }

    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// Make a server-provided search excerpt safe to inject as markup.
///
/// The search service wraps matches in `<b>`/`</b>` inside an otherwise
/// plain-text snippet. The snippet is treated as untrusted: every
/// character is escaped and only the `<b>` markers are re-opened, with
/// unmatched closers escaped and unmatched openers closed at the end.
pub(crate) fn sanitize_excerpt(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth: usize = 0;
    let mut rest = raw;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("<b>") {
            depth += 1;
            out.push_str("<b>");
            rest = stripped;
            continue;
        }

        if let Some(stripped) = rest.strip_prefix("</b>") {
            if depth > 0 {
                depth -= 1;
                out.push_str("</b>");
            } else {
                out.push_str("&lt;/b&gt;");
            }
            rest = stripped;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
        rest = &rest[ch.len_utf8()..];
    }

    for _ in 0..depth {
        out.push_str("</b>");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_whitespace_queries_clear_synchronously() {
        assert_eq!(on_query_input(""), QueryAction::ClearNow);
        assert_eq!(on_query_input("   "), QueryAction::ClearNow);
    }

    #[test]
    fn test_query_is_trimmed_before_dispatch() {
        assert_eq!(
            on_query_input("  foo "),
            QueryAction::Debounce("foo".to_string())
        );
    }

    #[test]
    fn test_last_query_wins_over_late_response() {
        let mut seq = SearchSequencer::default();
        let first = seq.dispatch();
        let second = seq.dispatch();

        // The older response arrives after the newer one: only the newer
        // dispatch may touch the list.
        assert!(seq.is_current(second));
        assert!(!seq.is_current(first));
    }

    #[test]
    fn test_invalidate_strands_outstanding_dispatches() {
        let mut seq = SearchSequencer::default();
        let pending = seq.dispatch();
        seq.invalidate();

        // Clearing the box: whatever resolves for `pending` is discarded.
        assert!(!seq.is_current(pending));

        // And the next real dispatch is current again.
        let next = seq.dispatch();
        assert!(seq.is_current(next));
    }

    #[test]
    fn test_sanitize_keeps_highlight_markers() {
        assert_eq!(
            sanitize_excerpt("...the <b>foo</b> bar..."),
            "...the <b>foo</b> bar..."
        );
    }

    #[test]
    fn test_sanitize_escapes_foreign_markup() {
        assert_eq!(
            sanitize_excerpt("<script>alert(1)</script> <b>hit</b>"),
            "&lt;script&gt;alert(1)&lt;/script&gt; <b>hit</b>"
        );
        assert_eq!(sanitize_excerpt("a & b < c"), "a &amp; b &lt; c");
    }

    #[test]
    fn test_sanitize_balances_stray_markers() {
        // Unmatched closer stays visible text; unmatched opener is closed
        // so the highlight cannot swallow the rest of the page.
        assert_eq!(sanitize_excerpt("x</b>y"), "x&lt;/b&gt;y");
        assert_eq!(sanitize_excerpt("x<b>y"), "x<b>y</b>");
    }
}
