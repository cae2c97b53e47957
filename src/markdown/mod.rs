use comrak::{markdown_to_html, Options};

/// Render a note buffer to HTML for the preview pane.
///
/// Rendering is delegated entirely to comrak; default options keep raw
/// HTML in the note escaped rather than passed through.
pub(crate) fn render_preview(markdown: &str) -> String {
    markdown_to_html(markdown, &Options::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_headings_and_paragraphs() {
        let html = render_preview("# Title\n\nBody text.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Body text.</p>"));
    }

    #[test]
    fn test_raw_html_stays_escaped() {
        let html = render_preview("hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
    }
}
