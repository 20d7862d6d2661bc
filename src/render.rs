//! HTML rendering for chat messages.

use markdown::{to_html_with_options, Options};

use crate::normalize::normalize_reply;

/// Render one chat message as an HTML fragment.
///
/// User text is escaped verbatim. Assistant text is normalized and rendered
/// as GitHub-flavored Markdown; raw HTML inside it stays escaped.
pub fn render_html(text: &str, is_user: bool) -> String {
    if is_user {
        return plain_paragraph(text);
    }
    let normalized = normalize_reply(text);
    if normalized.is_empty() {
        return String::new();
    }
    to_html_with_options(&normalized, &Options::gfm())
        .unwrap_or_else(|_| plain_paragraph(&normalized))
}

fn plain_paragraph(text: &str) -> String {
    format!("<p>{}</p>", escape_html(text).replace('\n', "<br />\n"))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{escape_html, render_html};

    #[test]
    fn user_messages_are_escaped_not_parsed() {
        assert_eq!(
            render_html("**hola** <script>\nadiós", true),
            "<p>**hola** &lt;script&gt;<br />\nadiós</p>"
        );
    }

    #[test]
    fn assistant_lists_render_as_list_items() {
        let html = render_html("Pasos: 1. Abrir SE80 2. Crear paquete", false);
        assert!(html.contains("<ol>"), "{html}");
        assert_eq!(html.matches("<li>").count(), 2, "{html}");
    }

    #[test]
    fn assistant_raw_html_stays_escaped() {
        let html = render_html("Usa <b>SU53</b>", false);
        assert!(!html.contains("<b>"), "{html}");
    }

    #[test]
    fn empty_reply_renders_nothing() {
        assert_eq!(render_html("", false), "");
        assert_eq!(render_html("   \n", false), "");
    }

    #[test]
    fn escape_covers_quotes() {
        assert_eq!(escape_html(r#"a"b'c"#), "a&quot;b&#x27;c");
    }
}
