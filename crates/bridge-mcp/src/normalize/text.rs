//! Plain-text extraction from rich upstream bodies.

use serde_json::Value;
use tracing::debug;

/// Render width handed to html2text; wide enough that prose is not rewrapped.
const RENDER_WIDTH: usize = 400;

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Reduce HTML / Confluence storage markup to plain text.
///
/// Markup is rendered with html2text, so every named and numeric entity is
/// decoded. CDATA sections (macro bodies such as code blocks) are kept as
/// preformatted text. If rendering fails the tags are stripped by hand.
pub fn strip_markup(markup: &str) -> String {
    let html = expand_cdata(markup);
    let text = match html2text::from_read(html.as_bytes(), RENDER_WIDTH) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => strip_tags(&html),
        Err(e) => {
            debug!("html2text rendering failed, stripping tags: {e}");
            strip_tags(&html)
        }
    };
    tidy_lines(&text)
}

/// Replace each `<![CDATA[...]]>` with an escaped `<pre>` block so its
/// content survives as text instead of being parsed as a comment.
fn expand_cdata(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(start) = rest.find(CDATA_OPEN) {
        out.push_str(&rest[..start]);
        let body = &rest[start + CDATA_OPEN.len()..];
        let (content, tail) = match body.find(CDATA_CLOSE) {
            Some(end) => (&body[..end], &body[end + CDATA_CLOSE.len()..]),
            None => (body, ""),
        };
        out.push_str("<pre>");
        out.push_str(&escape(content));
        out.push_str("</pre>");
        rest = tail;
    }
    out.push_str(rest);
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Tag stripper used when html2text cannot render the input.
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut tag = String::new();
    let mut inside_tag = false;

    for ch in html.chars() {
        match ch {
            '<' if !inside_tag => {
                inside_tag = true;
                tag.clear();
            }
            '>' if inside_tag => {
                inside_tag = false;
                out.push(if is_block_break(&tag) { '\n' } else { ' ' });
            }
            _ if inside_tag => tag.push(ch),
            _ => out.push(ch),
        }
    }

    out.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn is_block_break(tag: &str) -> bool {
    let name = tag
        .trim()
        .trim_end_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    matches!(
        name.as_str(),
        "br" | "/p" | "/li" | "/tr" | "/div" | "/blockquote" | "/pre" | "/h1" | "/h2" | "/h3"
            | "/h4" | "/h5" | "/h6"
    )
}

fn tidy_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Flatten an Atlassian Document Format node (or plain string) to text.
///
/// Paragraph-like nodes are separated by newlines; `text` leaves are joined.
pub fn flatten_document(value: &Value) -> String {
    let mut out = String::new();
    collect_text(value, &mut out);
    out.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => items.iter().for_each(|item| collect_text(item, out)),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                out.push_str(text);
            }
            if let Some(content) = map.get("content") {
                collect_text(content, out);
            }
            let block = matches!(
                map.get("type").and_then(Value::as_str),
                Some("paragraph" | "heading" | "listItem" | "codeBlock" | "blockquote" | "hardBreak")
            );
            if block {
                out.push('\n');
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_markup() {
        let body = "<h1>Q3 Planning</h1><p>Goals &amp; risks</p><ul><li>Ship&nbsp;v2</li><li>Hire</li></ul>";
        let text = strip_markup(body);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4, "{text}");
        assert!(lines[0].contains("Q3 Planning"));
        assert!(lines[1].contains("Goals & risks"));
        assert!(lines[2].contains("Ship v2"));
        assert!(lines[3].contains("Hire"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_strip_markup_plain_text_untouched() {
        assert_eq!(strip_markup("just text"), "just text");
    }

    #[test]
    fn test_strip_markup_keeps_cdata_code() {
        let body = concat!(
            "<p>To roll back:</p>",
            "<ac:structured-macro ac:name=\"code\"><ac:plain-text-body>",
            "<![CDATA[kubectl rollout restart deploy/api && echo <done>]]>",
            "</ac:plain-text-body></ac:structured-macro>"
        );
        let text = strip_markup(body);
        assert!(text.contains("To roll back:"), "{text}");
        assert!(text.contains("kubectl rollout restart deploy/api && echo <done>"), "{text}");
    }

    #[test]
    fn test_strip_markup_decodes_entities() {
        let text = strip_markup("<p>Don&rsquo;t &mdash; caf&eacute; &#8217;ok&#x2019;</p>");
        assert!(text.contains("Don\u{2019}t"), "{text}");
        assert!(text.contains('\u{2014}'), "{text}");
        assert!(text.contains("caf\u{e9}"), "{text}");
        assert!(text.contains("\u{2019}ok\u{2019}"), "{text}");
        assert!(!text.contains('&'), "{text}");
    }

    #[test]
    fn test_strip_tags_fallback() {
        let text = tidy_lines(&strip_tags("<p>One &amp; two</p><br/><div class=\"x\">Three</div>"));
        assert_eq!(text, "One & two\nThree");
    }

    #[test]
    fn test_expand_cdata_unterminated() {
        assert_eq!(expand_cdata("a<![CDATA[x < y"), "a<pre>x &lt; y</pre>");
    }

    #[test]
    fn test_flatten_document() {
        let adf = json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "Login fails "},
                    {"type": "text", "text": "on Safari"}
                ]},
                {"type": "paragraph", "content": [{"type": "text", "text": "Steps below"}]}
            ]
        });
        assert_eq!(flatten_document(&adf), "Login fails on Safari\nSteps below");
        assert_eq!(flatten_document(&json!("plain")), "plain");
    }
}
