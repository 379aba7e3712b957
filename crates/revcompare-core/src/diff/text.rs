//! Line diff of two display strings, rendered as HTML

use similar::{Algorithm, ChangeTag, TextDiff};

/// Renders the difference of two texts
///
/// Passed explicitly to the engine; there is no global switch.
pub trait TextDiffRenderer: Send + Sync {
    fn render(&self, old: &str, new: &str) -> String;
}

impl<F> TextDiffRenderer for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn render(&self, old: &str, new: &str) -> String {
        self(old, new)
    }
}

/// `ndiff` style line diff
///
/// Lines are aligned with the Myers algorithm. Output is one line per input
/// line prefixed with `"  "`, `"- "` or `"+ "`, HTML escaped, with removed
/// and inserted lines wrapped in `<del>` and `<ins>`, all inside
/// `<pre class="highlight">`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineDiffRenderer;

impl TextDiffRenderer for LineDiffRenderer {
    fn render(&self, old: &str, new: &str) -> String {
        // Diff over split lines so a missing trailing newline on one side
        // does not make the last line differ.
        let old_lines: Vec<&str> = old.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();
        let diff = TextDiff::configure()
            .algorithm(Algorithm::Myers)
            .diff_slices(&old_lines[..], &new_lines[..]);

        let mut html = vec![r#"<pre class="highlight">"#.to_string()];
        for change in diff.iter_all_changes() {
            let line = escape(change.value());
            html.push(match change.tag() {
                ChangeTag::Equal => format!("  {}", line),
                ChangeTag::Delete => format!("<del>- {}</del>", line),
                ChangeTag::Insert => format!("<ins>+ {}</ins>", line),
            });
        }
        html.push("</pre>".to_string());
        html.join("\n")
    }
}

/// Escape text for inclusion in HTML
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
