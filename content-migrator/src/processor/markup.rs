//! Markup conversion: HTML to plain text and HTML to markdown.
//!
//! Source bodies are rendered HTML. Plain text fields receive the text content
//! only; markdown and rich-text fields go through [`html_to_markdown`] first.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap();
    static ref PRE: Regex = Regex::new(r"(?is)<pre(?:\s[^>]*)?>(.*?)</pre\s*>").unwrap();
    static ref HEADING: Regex = Regex::new(r"(?is)<h([1-6])(?:\s[^>]*)?>(.*?)</h[1-6]\s*>").unwrap();
    static ref IMAGE: Regex = Regex::new(r"(?is)<img\s[^>]*>").unwrap();
    static ref SRC: Regex = Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref ALT: Regex = Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref ANCHOR: Regex =
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap();
    static ref STRONG: Regex =
        Regex::new(r"(?is)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)\s*>").unwrap();
    static ref EMPHASIS: Regex = Regex::new(r"(?is)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)\s*>").unwrap();
    static ref CODE: Regex = Regex::new(r"(?is)<code(?:\s[^>]*)?>(.*?)</code\s*>").unwrap();
    static ref BLOCKQUOTE: Regex =
        Regex::new(r"(?is)<blockquote(?:\s[^>]*)?>(.*?)</blockquote\s*>").unwrap();
    static ref LIST: Regex = Regex::new(r"(?is)<(ul|ol)(?:\s[^>]*)?>(.*?)</(?:ul|ol)\s*>").unwrap();
    static ref LIST_ITEM: Regex = Regex::new(r"(?is)<li(?:\s[^>]*)?>(.*?)</li\s*>").unwrap();
    static ref BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();
    static ref RULE: Regex = Regex::new(r"(?i)<hr\s*/?>").unwrap();
    static ref BLOCK_END: Regex =
        Regex::new(r"(?i)</(?:p|div|figure|figcaption|section|table|tr)\s*>").unwrap();
}

fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Text content of an HTML fragment, entities decoded.
///
/// ```
/// use content_migrator::processor::markup::strip_tags;
///
/// assert_eq!(strip_tags("Hello <b>World</b>"), "Hello World");
/// assert_eq!(strip_tags("<p>Fish &amp; Chips</p>\n"), "Fish & Chips");
/// ```
pub fn strip_tags(html: &str) -> String {
    let without_comments = COMMENT.replace_all(html, "");
    let text = TAG.replace_all(&without_comments, "");
    decode(&text).trim().to_string()
}

fn inline_text(html: &str) -> String {
    TAG.replace_all(html, "").trim().to_string()
}

/// Convert an HTML fragment to markdown.
///
/// Handles the elements produced by block editors: headings, paragraphs,
/// emphasis, links, images, lists, quotes, code and rules. Unknown tags are
/// dropped and their text content kept.
pub fn html_to_markdown(html: &str) -> String {
    let mut md = COMMENT.replace_all(html, "").into_owned();

    md = PRE
        .replace_all(&md, |caps: &Captures| {
            format!("\n\n```\n{}\n```\n\n", TAG.replace_all(&caps[1], "").trim_end())
        })
        .into_owned();

    md = HEADING
        .replace_all(&md, |caps: &Captures| {
            let level = caps[1].parse::<usize>().unwrap_or(1);
            format!("\n\n{} {}\n\n", "#".repeat(level), inline_text(&caps[2]))
        })
        .into_owned();

    md = IMAGE
        .replace_all(&md, |caps: &Captures| {
            let tag = &caps[0];
            let src = SRC.captures(tag).map(|c| c[1].to_string()).unwrap_or_default();
            let alt = ALT.captures(tag).map(|c| c[1].to_string()).unwrap_or_default();
            format!("![{}]({})", alt, src)
        })
        .into_owned();

    md = ANCHOR
        .replace_all(&md, |caps: &Captures| format!("[{}]({})", caps[2].trim(), &caps[1]))
        .into_owned();

    md = STRONG
        .replace_all(&md, |caps: &Captures| format!("**{}**", &caps[1]))
        .into_owned();
    md = EMPHASIS
        .replace_all(&md, |caps: &Captures| format!("*{}*", &caps[1]))
        .into_owned();
    md = CODE
        .replace_all(&md, |caps: &Captures| format!("`{}`", &caps[1]))
        .into_owned();

    md = BLOCKQUOTE
        .replace_all(&md, |caps: &Captures| {
            let inner = BLOCK_END.replace_all(&caps[1], "\n");
            let quoted: Vec<String> = inline_text(&inner)
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| format!("> {}", l))
                .collect();
            format!("\n\n{}\n\n", quoted.join("\n"))
        })
        .into_owned();

    md = LIST
        .replace_all(&md, |caps: &Captures| {
            let ordered = caps[1].eq_ignore_ascii_case("ol");
            let items: Vec<String> = LIST_ITEM
                .captures_iter(&caps[2])
                .enumerate()
                .map(|(i, item)| {
                    let text = inline_text(&item[1]).replace('\n', " ");
                    if ordered {
                        format!("{}. {}", i + 1, text)
                    } else {
                        format!("- {}", text)
                    }
                })
                .collect();
            format!("\n\n{}\n\n", items.join("\n"))
        })
        .into_owned();

    md = BREAK.replace_all(&md, "  \n").into_owned();
    md = RULE.replace_all(&md, "\n\n---\n\n").into_owned();
    md = BLOCK_END.replace_all(&md, "\n\n").into_owned();
    md = TAG.replace_all(&md, "").into_owned();
    md = decode(&md);

    BLANK_LINES.replace_all(&md, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_tags_removes_comments() {
        assert_eq!(
            strip_tags("<!-- wp:paragraph --><p>Text</p><!-- /wp:paragraph -->"),
            "Text"
        );
    }

    #[test]
    fn test_paragraphs_and_emphasis() {
        let md = html_to_markdown("<p>Hello <strong>bold</strong> and <em>soft</em></p>\n<p>Second</p>");
        assert_eq!(md, "Hello **bold** and *soft*\n\nSecond");
    }

    #[test]
    fn test_headings_links_and_images() {
        let md = html_to_markdown(
            r#"<h2 class="x">Title</h2><p><a href="https://x.com/a">link</a> <img src="/up/a.png" alt="A"></p>"#,
        );
        assert_eq!(md, "## Title\n\n[link](https://x.com/a) ![A](/up/a.png)");
    }

    #[test]
    fn test_lists() {
        let md = html_to_markdown("<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol>");
        assert_eq!(md, "- one\n- two\n\n1. first");
    }

    #[test]
    fn test_blockquote_and_rule() {
        let md = html_to_markdown("<blockquote><p>Quoted</p></blockquote><hr/><p>After</p>");
        assert_eq!(md, "> Quoted\n\n---\n\nAfter");
    }

    #[test]
    fn test_br_and_entities() {
        let md = html_to_markdown("<p>a&nbsp;b<br>c &lt;d&gt;</p>");
        assert_eq!(md, "a\u{a0}b  \nc <d>");
    }

    #[test]
    fn test_does_not_confuse_br_with_bold() {
        assert_eq!(html_to_markdown("<p>x<br/>y</p>"), "x  \ny");
    }
}
