//! # GFM enhancement pass
//!
//! A tree rewrite run once over the finished document. Text nodes that
//! contain `~~`, `http://`, `https://` or `@` are split around:
//!
//! - `~~strikethrough~~` spans with non-whitespace content
//! - bare `http(s)://` URLs
//! - e-mail addresses (linked as `mailto:`)
//!
//! The URL pattern is shared with the tokenizer, which recognises bare URLs
//! at token starts so that `_` and `*` inside them never turn into emphasis.
//! Anything the tokenizer could not see (a URL glued to preceding text, an
//! e-mail address) is picked up here.
//!
//! Code is never touched, and no autolinks are created inside a [`Link`].
//!
//! [`Link`]: crate::NodeKind::Link

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Node, NodeKind};
use crate::token::SourceLocation;

const URL_BODY: &str = r"https?://(?:[^\s<>\[\]()]|\([^\s<>\[\]()]*\))+";

static URL_AT_START: OnceLock<Regex> = OnceLock::new();
static URL: OnceLock<Regex> = OnceLock::new();
static EMAIL: OnceLock<Regex> = OnceLock::new();
static STRIKETHROUGH: OnceLock<Regex> = OnceLock::new();

fn url_at_start() -> &'static Regex {
    URL_AT_START
        .get_or_init(|| Regex::new(&format!("^{URL_BODY}")).expect("URL regex should compile"))
}

fn url() -> &'static Regex {
    URL.get_or_init(|| Regex::new(URL_BODY).expect("URL regex should compile"))
}

fn email() -> &'static Regex {
    EMAIL.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}")
            .expect("email regex should compile")
    })
}

fn strikethrough() -> &'static Regex {
    STRIKETHROUGH
        .get_or_init(|| Regex::new(r"~~(.+?)~~").expect("strikethrough regex should compile"))
}

/// Length in bytes of the bare URL at the start of `text`, if there is one.
///
/// Trailing sentence punctuation is not part of the URL.
pub(crate) fn match_url(text: &str) -> Option<usize> {
    if !text.starts_with("http") {
        return None;
    }
    let found = url_at_start().find(text)?;
    let trimmed = trim_url(found.as_str());
    has_host(trimmed).then_some(trimmed.len())
}

fn trim_url(url: &str) -> &str {
    url.trim_end_matches(['.', ',', ':', ';', '!', '?', '\'', '"', '*', '_', '~'])
}

fn has_host(url: &str) -> bool {
    url.split_once("://")
        .is_some_and(|(_, host)| !host.is_empty())
}

fn has_trigger(text: &str) -> bool {
    text.contains("~~") || text.contains("http://") || text.contains("https://") || text.contains('@')
}

/// Apply the enhancement pass to a whole tree.
pub fn enhance(root: Node) -> Node {
    rewrite(root, false)
}

fn rewrite(node: Node, inside_link: bool) -> Node {
    let inside_link = inside_link || matches!(node.kind(), NodeKind::Link { .. });
    if node.children().is_empty() {
        return node;
    }

    let (kind, children, location) = node.into_parts();
    let mut rewritten = Vec::with_capacity(children.len());
    for child in children {
        let spliced = match child.kind() {
            NodeKind::Text { content } if has_trigger(content) => {
                Some(splice(content, child.location(), !inside_link, true))
            }
            _ => None,
        };
        match spliced {
            Some(nodes) => rewritten.extend(nodes),
            None => rewritten.push(rewrite(child, inside_link)),
        }
    }
    Node::from_parts(kind, rewritten, location)
}

#[derive(Debug)]
enum SpanKind {
    Strikethrough { inner_start: usize, inner_end: usize },
    Url,
    Email,
}

#[derive(Debug)]
struct Span {
    start: usize,
    end: usize,
    kind: SpanKind,
}

fn find_spans(content: &str, autolinks: bool, strike: bool) -> Vec<Span> {
    let mut spans = Vec::new();

    if strike && content.contains("~~") {
        for caps in strikethrough().captures_iter(content) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if inner.as_str().trim().is_empty() {
                continue;
            }
            spans.push(Span {
                start: whole.start(),
                end: whole.end(),
                kind: SpanKind::Strikethrough {
                    inner_start: inner.start(),
                    inner_end: inner.end(),
                },
            });
        }
    }

    if autolinks {
        for found in url().find_iter(content) {
            let trimmed = trim_url(found.as_str());
            if has_host(trimmed) {
                spans.push(Span {
                    start: found.start(),
                    end: found.start() + trimmed.len(),
                    kind: SpanKind::Url,
                });
            }
        }
        if content.contains('@') {
            for found in email().find_iter(content) {
                spans.push(Span {
                    start: found.start(),
                    end: found.end(),
                    kind: SpanKind::Email,
                });
            }
        }
    }

    // Earliest first; on a tie the longest wins. Overlaps are dropped.
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if kept.last().is_none_or(|last| span.start >= last.end) {
            kept.push(span);
        }
    }
    kept
}

fn splice(
    content: &str,
    location: Option<SourceLocation>,
    autolinks: bool,
    strike: bool,
) -> Vec<Node> {
    let spans = find_spans(content, autolinks, strike);
    if spans.is_empty() {
        return vec![Node::text(content).at(location)];
    }

    let at = |offset: usize| location.map(|loc| loc.advanced_by(&content[..offset]));
    let mut nodes = Vec::with_capacity(spans.len() * 2 + 1);
    let mut last = 0;
    for span in spans {
        if span.start > last {
            nodes.push(Node::text(&content[last..span.start]).at(at(last)));
        }
        let matched = &content[span.start..span.end];
        let node = match span.kind {
            SpanKind::Strikethrough {
                inner_start,
                inner_end,
            } => Node::strikethrough(splice(
                &content[inner_start..inner_end],
                at(inner_start),
                autolinks,
                false,
            )),
            SpanKind::Url => Node::autolink(matched, matched),
            SpanKind::Email => Node::autolink(format!("mailto:{matched}"), matched),
        };
        nodes.push(node.at(at(span.start)));
        last = span.end;
    }
    if last < content.len() {
        nodes.push(Node::text(&content[last..]).at(at(last)));
    }
    nodes
}
