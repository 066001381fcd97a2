//! Markdown to Storyblok rich-text document conversion.
//!
//! Produces the ProseMirror-style tree the destination stores for rich-text
//! fields: `{"type": "doc", "content": [...]}` with paragraph, heading,
//! list, blockquote, code block, rule and image nodes, and bold, italic,
//! code and link marks on text nodes.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"^(#{1,6})\s+(.*)$").unwrap();
    static ref BULLET: Regex = Regex::new(r"^[-*+]\s+(.*)$").unwrap();
    static ref ORDERED: Regex = Regex::new(r"^\d+[.)]\s+(.*)$").unwrap();
    static ref RULE: Regex = Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})$").unwrap();
    static ref INLINE: Regex = Regex::new(concat!(
        r"!\[(?P<alt>[^\]]*)\]\((?P<src>[^)\s]+)\)",
        r"|\[(?P<label>[^\]]+)\]\((?P<href>[^)\s]+)\)",
        r"|\*\*(?P<bold>.+?)\*\*",
        r"|`(?P<code>[^`]+)`",
        r"|\*(?P<em>[^*\s][^*]*)\*",
    ))
    .unwrap();
}

enum Block {
    Paragraph(Vec<String>),
    Heading(usize, String),
    Bullets(Vec<String>),
    Ordered(Vec<String>),
    Quote(Vec<String>),
    Code(Vec<String>),
    Rule,
}

/// Convert markdown to a rich-text document.
///
/// ```
/// use content_migrator::processor::richtext::markdown_to_richtext;
///
/// let doc = markdown_to_richtext("Hello **World**");
/// assert_eq!(doc["type"], "doc");
/// assert_eq!(doc["content"][0]["content"][1]["marks"][0]["type"], "bold");
/// ```
pub fn markdown_to_richtext(markdown: &str) -> Value {
    let content: Vec<Value> = parse_blocks(markdown).into_iter().map(render_block).collect();
    json!({ "type": "doc", "content": content })
}

fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut lines = markdown.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("```") {
            let mut code = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                code.push(inner.to_string());
            }
            blocks.push(Block::Code(code));
        } else if RULE.is_match(trimmed) {
            blocks.push(Block::Rule);
        } else if let Some(caps) = HEADING.captures(trimmed) {
            blocks.push(Block::Heading(caps[1].len(), caps[2].trim().to_string()));
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            let mut quote = vec![rest.trim().to_string()];
            while let Some(next) = lines.peek().and_then(|l| l.trim().strip_prefix('>')) {
                quote.push(next.trim().to_string());
                lines.next();
            }
            blocks.push(Block::Quote(quote));
        } else if let Some(caps) = BULLET.captures(trimmed) {
            let mut items = vec![caps[1].to_string()];
            while let Some(next) = lines.peek().and_then(|l| BULLET.captures(l.trim())) {
                items.push(next[1].to_string());
                lines.next();
            }
            blocks.push(Block::Bullets(items));
        } else if let Some(caps) = ORDERED.captures(trimmed) {
            let mut items = vec![caps[1].to_string()];
            while let Some(next) = lines.peek().and_then(|l| ORDERED.captures(l.trim())) {
                items.push(next[1].to_string());
                lines.next();
            }
            blocks.push(Block::Ordered(items));
        } else {
            let mut paragraph = vec![line.to_string()];
            while let Some(next) = lines.peek() {
                let next_trimmed = next.trim();
                if next_trimmed.is_empty() || starts_block(next_trimmed) {
                    break;
                }
                paragraph.push(next.to_string());
                lines.next();
            }
            blocks.push(Block::Paragraph(paragraph));
        }
    }
    blocks
}

fn starts_block(line: &str) -> bool {
    line.starts_with("```")
        || line.starts_with('>')
        || RULE.is_match(line)
        || HEADING.is_match(line)
        || BULLET.is_match(line)
        || ORDERED.is_match(line)
}

fn render_block(block: Block) -> Value {
    match block {
        Block::Paragraph(lines) => paragraph(&lines),
        Block::Heading(level, text) => json!({
            "type": "heading",
            "attrs": { "level": level },
            "content": inline(&text, &[]),
        }),
        Block::Bullets(items) => json!({
            "type": "bullet_list",
            "content": items.iter().map(|i| list_item(i)).collect::<Vec<_>>(),
        }),
        Block::Ordered(items) => json!({
            "type": "ordered_list",
            "attrs": { "order": 1 },
            "content": items.iter().map(|i| list_item(i)).collect::<Vec<_>>(),
        }),
        Block::Quote(lines) => json!({
            "type": "blockquote",
            "content": [paragraph(&lines)],
        }),
        Block::Code(lines) => {
            let code = lines.join("\n");
            let content = if code.is_empty() {
                vec![]
            } else {
                vec![json!({ "type": "text", "text": code })]
            };
            json!({ "type": "code_block", "content": content })
        }
        Block::Rule => json!({ "type": "horizontal_rule" }),
    }
}

fn list_item(text: &str) -> Value {
    json!({
        "type": "list_item",
        "content": [{ "type": "paragraph", "content": inline(text, &[]) }],
    })
}

/// Paragraph from consecutive lines. A line ending with two spaces ends with
/// a hard break; other lines are joined with a space.
fn paragraph(lines: &[String]) -> Value {
    let mut content = Vec::new();
    let last = lines.len().saturating_sub(1);
    for (i, line) in lines.iter().enumerate() {
        let hard_break = i < last && line.ends_with("  ");
        let mut text = line.trim().to_string();
        if i < last && !hard_break {
            text.push(' ');
        }
        content.extend(inline(&text, &[]));
        if hard_break {
            content.push(json!({ "type": "hard_break" }));
        }
    }
    json!({ "type": "paragraph", "content": content })
}

fn text_node(text: &str, marks: &[Value]) -> Value {
    if marks.is_empty() {
        json!({ "type": "text", "text": text })
    } else {
        json!({ "type": "text", "text": text, "marks": marks })
    }
}

fn with_mark(marks: &[Value], mark: Value) -> Vec<Value> {
    let mut marks = marks.to_vec();
    marks.push(mark);
    marks
}

/// Inline nodes of a run of text, carrying `marks` from enclosing spans.
fn inline(text: &str, marks: &[Value]) -> Vec<Value> {
    let mut nodes = Vec::new();
    let mut cursor = 0;

    for caps in INLINE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > cursor {
            nodes.push(text_node(&text[cursor..whole.start()], marks));
        }
        cursor = whole.end();

        if let (Some(src), Some(alt)) = (caps.name("src"), caps.name("alt")) {
            nodes.push(json!({
                "type": "image",
                "attrs": { "src": src.as_str(), "alt": alt.as_str() },
            }));
        } else if let (Some(label), Some(href)) = (caps.name("label"), caps.name("href")) {
            let link = json!({
                "type": "link",
                "attrs": { "href": href.as_str(), "linktype": "url", "target": null },
            });
            nodes.extend(inline(label.as_str(), &with_mark(marks, link)));
        } else if let Some(bold) = caps.name("bold") {
            nodes.extend(inline(bold.as_str(), &with_mark(marks, json!({ "type": "bold" }))));
        } else if let Some(code) = caps.name("code") {
            nodes.push(text_node(
                code.as_str(),
                &with_mark(marks, json!({ "type": "code" })),
            ));
        } else if let Some(em) = caps.name("em") {
            nodes.extend(inline(em.as_str(), &with_mark(marks, json!({ "type": "italic" }))));
        }
    }

    if cursor < text.len() {
        nodes.push(text_node(&text[cursor..], marks));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_with_marks() {
        let doc = markdown_to_richtext("Hello **World** and *you*");
        assert_eq!(
            doc,
            json!({
                "type": "doc",
                "content": [{
                    "type": "paragraph",
                    "content": [
                        {"type": "text", "text": "Hello "},
                        {"type": "text", "text": "World", "marks": [{"type": "bold"}]},
                        {"type": "text", "text": " and "},
                        {"type": "text", "text": "you", "marks": [{"type": "italic"}]}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_heading_and_list() {
        let doc = markdown_to_richtext("## Title\n\n- one\n- two");
        assert_eq!(doc["content"][0]["type"], "heading");
        assert_eq!(doc["content"][0]["attrs"]["level"], 2);
        assert_eq!(doc["content"][1]["type"], "bullet_list");
        assert_eq!(doc["content"][1]["content"].as_array().unwrap().len(), 2);
        assert_eq!(
            doc["content"][1]["content"][1]["content"][0]["content"][0]["text"],
            "two"
        );
    }

    #[test]
    fn test_link_inside_bold_keeps_both_marks() {
        let doc = markdown_to_richtext("**[site](https://x.com)**");
        let node = &doc["content"][0]["content"][0];
        assert_eq!(node["text"], "site");
        assert_eq!(node["marks"][0]["type"], "bold");
        assert_eq!(node["marks"][1]["type"], "link");
        assert_eq!(node["marks"][1]["attrs"]["href"], "https://x.com");
    }

    #[test]
    fn test_image_and_hard_break() {
        let doc = markdown_to_richtext("a  \nb ![alt](https://x.com/a.png)");
        let content = &doc["content"][0]["content"];
        assert_eq!(content[0]["text"], "a");
        assert_eq!(content[1]["type"], "hard_break");
        assert_eq!(content[2]["text"], "b ");
        assert_eq!(content[3]["type"], "image");
        assert_eq!(content[3]["attrs"]["src"], "https://x.com/a.png");
    }

    #[test]
    fn test_code_block_quote_and_rule() {
        let doc = markdown_to_richtext("```\nlet x = 1;\n```\n\n> quoted\n\n---");
        assert_eq!(doc["content"][0]["type"], "code_block");
        assert_eq!(doc["content"][0]["content"][0]["text"], "let x = 1;");
        assert_eq!(doc["content"][1]["type"], "blockquote");
        assert_eq!(doc["content"][2]["type"], "horizontal_rule");
    }
}
