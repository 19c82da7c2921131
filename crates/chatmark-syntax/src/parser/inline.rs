//! Inline grammar rules.
//!
//! Emphasis follows a simplified model with no flanking rules: a run of one
//! to three `*` or `_` opens, and the next run of the same character and the
//! same length closes. Without an exact match the first longer run closes
//! and keeps its surplus; without any closing run the delimiters are text.
//!
//! | run | `*`             | `_`                  |
//! |-----|-----------------|----------------------|
//! | 1   | Italic          | Italic               |
//! | 2   | Bold            | Underline            |
//! | 3   | Bold(Italic)    | Underline(Italic)    |

use std::sync::OnceLock;

use regex::Regex;

use crate::ast::{Node, NodeKind, TimestampStyle};
use crate::cursor::TokenCursor;
use crate::error::ParseError;
use crate::token::{SourceLocation, Token, TokenKind};

use super::Context;
use super::guard::{CODE_SPAN_SCAN_LIMIT, LoopGuard};

/// Inline content of a block stops at the end of its line.
pub(crate) const LINE_END: &[TokenKind] = &[TokenKind::Newline];

static ENTITY_PREFIX_ONLY: OnceLock<Regex> = OnceLock::new();
static ENTITY_WITH_ID: OnceLock<Regex> = OnceLock::new();

/// `<@>`, `<#>`, `<:name:>` and friends: an entity with its id missing.
fn entity_prefix_only() -> &'static Regex {
    ENTITY_PREFIX_ONLY.get_or_init(|| {
        Regex::new(r"^<(?:@|@&|#|t:|a:[^:]*:|:[^:]*:)>$").expect("entity regex should compile")
    })
}

fn entity_with_id() -> &'static Regex {
    ENTITY_WITH_ID.get_or_init(|| {
        Regex::new(r"^<(?:@|@&|#|t:|a:[^:]+:|:[^:]+:)[0-9]+.*>$")
            .expect("entity regex should compile")
    })
}

/// Collects inline nodes, merging adjacent text.
#[derive(Default)]
struct InlineBuffer {
    nodes: Vec<Node>,
    text: Option<(String, Option<SourceLocation>)>,
}

impl InlineBuffer {
    fn text(&mut self, content: &str, location: Option<SourceLocation>) {
        match &mut self.text {
            Some((buffer, _)) => buffer.push_str(content),
            None => self.text = Some((content.to_owned(), location)),
        }
    }

    fn node(&mut self, node: Node) {
        self.flush();
        self.nodes.push(node);
    }

    fn flush(&mut self) {
        if let Some((content, location)) = self.text.take() {
            self.nodes.push(Node::text(content).at(location));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush();
        self.nodes
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct InlineParser<'p> {
    ctx: Context<'p>,
    depth: usize,
}

impl<'p> InlineParser<'p> {
    pub(crate) fn new(ctx: Context<'p>, depth: usize) -> Self {
        Self { ctx, depth }
    }

    /// Parse until the cursor reaches a `boundary` kind or the end.
    ///
    /// The boundary token itself is left unconsumed.
    pub(crate) fn parse_inlines(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
    ) -> Result<Vec<Node>, ParseError> {
        let mut guard = LoopGuard::inline(self.ctx.config);
        let mut out = InlineBuffer::default();
        while !cursor.at_end() && !cursor.at_any(boundary) {
            guard.check(cursor.position())?;
            self.inline(cursor, boundary, &mut out)?;
        }
        Ok(out.finish())
    }

    /// Parse the tokens `start..end` one nesting level deeper.
    fn nested(
        &self,
        cursor: &TokenCursor<'_, '_>,
        start: usize,
        end: usize,
    ) -> Result<Vec<Node>, ParseError> {
        let inner = InlineParser::new(self.ctx, self.ctx.descend(self.depth)?);
        let mut sub = cursor.slice(start, end);
        inner.parse_inlines(&mut sub, &[])
    }

    fn inline(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
    ) -> Result<(), ParseError> {
        let token = cursor.current();
        match token.kind {
            TokenKind::Asterisk | TokenKind::Underscore => {
                self.emphasis(cursor, boundary, out)?
            }
            TokenKind::Backtick => self.code_span(cursor, boundary, out),
            TokenKind::Tilde => self.strikethrough(cursor, boundary, out)?,
            TokenKind::DoublePipe => self.spoiler(cursor, boundary, out)?,
            TokenKind::LeftBracket => self.link(cursor, boundary, out)?,
            TokenKind::Newline => {
                cursor.bump();
                out.node(Node::soft_break().at(self.ctx.locate(token.location)));
            }
            TokenKind::UserMention | TokenKind::RoleMention | TokenKind::ChannelMention => {
                cursor.bump();
                self.mention(token, out);
            }
            TokenKind::EveryoneMention => {
                cursor.bump();
                out.node(Node::leaf(NodeKind::EveryoneMention).at(self.ctx.locate(token.location)));
            }
            TokenKind::HereMention => {
                cursor.bump();
                out.node(Node::leaf(NodeKind::HereMention).at(self.ctx.locate(token.location)));
            }
            TokenKind::Timestamp => {
                cursor.bump();
                self.timestamp(token, out);
            }
            TokenKind::CustomEmoji => {
                cursor.bump();
                self.custom_emoji(token, out);
            }
            TokenKind::Autolink => {
                cursor.bump();
                self.autolink(token, out);
            }
            TokenKind::Backslash => {
                cursor.bump();
                self.escape(token, out);
            }
            _ => {
                cursor.bump();
                self.literal(token, out);
            }
        }
        Ok(())
    }

    fn literal(&self, token: &Token<'_>, out: &mut InlineBuffer) {
        out.text(token.text, self.ctx.locate(token.location));
    }

    fn literal_range(&self, tokens: &[Token<'_>], out: &mut InlineBuffer) {
        for token in tokens {
            self.literal(token, out);
        }
    }

    // Emphasis

    fn emphasis(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
    ) -> Result<(), ParseError> {
        let tokens = cursor.tokens();
        let kind = cursor.kind();
        let start = cursor.position();
        let limit = scan_limit(tokens, start, boundary);
        let run = run_length(tokens, start, limit, kind);

        // Only the last three delimiters of a long run can open.
        let opener = start + run.saturating_sub(3);
        let width = run.min(3);
        self.literal_range(&tokens[start..opener], out);

        let body_start = opener + width;
        let Some(close) = find_emphasis_closer(tokens, body_start, limit, kind, width) else {
            self.literal_range(&tokens[opener..body_start], out);
            cursor.reset(body_start);
            return Ok(());
        };

        let children = self.nested(cursor, body_start, close)?;
        let node = match (kind, width) {
            (TokenKind::Asterisk, 2) => Node::bold(children),
            (TokenKind::Asterisk, 3) => Node::bold(vec![Node::italic(children)]),
            (TokenKind::Underscore, 2) => Node::underline(children),
            (TokenKind::Underscore, 3) => Node::underline(vec![Node::italic(children)]),
            _ => Node::italic(children),
        };
        out.node(node.at(self.ctx.locate(tokens[opener].location)));
        cursor.reset(close + width);
        Ok(())
    }

    // Code spans

    fn code_span(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
    ) {
        let tokens = cursor.tokens();
        let start = cursor.position();
        let limit = scan_limit(tokens, start, boundary);
        let opening = &tokens[start];

        match find_code_span_closer(tokens, start, limit) {
            Some(close) => {
                let content = cursor.text_between(start + 1, close);
                out.node(
                    Node::code_span(trim_code_span(&content))
                        .at(self.ctx.locate(opening.location)),
                );
                cursor.reset(close + 1);
            }
            None => {
                cursor.bump();
                self.literal(opening, out);
            }
        }
    }

    // Strikethrough and spoilers

    fn strikethrough(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
    ) -> Result<(), ParseError> {
        let token = cursor.current();
        if token.text != "~~" {
            cursor.bump();
            self.literal(token, out);
            return Ok(());
        }
        self.paired(cursor, boundary, out, |t| {
            t.kind == TokenKind::Tilde && t.text == "~~"
        }, Node::strikethrough)
    }

    fn spoiler(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
    ) -> Result<(), ParseError> {
        self.paired(cursor, boundary, out, |t| t.kind == TokenKind::DoublePipe, Node::spoiler)
    }

    /// A single-token delimiter closed by the next matching token, with a
    /// non-empty body in between.
    fn paired(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
        is_closer: impl Fn(&Token<'_>) -> bool,
        build: fn(Vec<Node>) -> Node,
    ) -> Result<(), ParseError> {
        let tokens = cursor.tokens();
        let start = cursor.position();
        let limit = scan_limit(tokens, start, boundary);
        let opening = &tokens[start];

        let mut i = start + 1;
        let mut close = None;
        while i < limit {
            if is_closer(&tokens[i]) {
                close = Some(i);
                break;
            }
            i = skip_code_span(tokens, i, limit);
        }

        match close {
            Some(close) if close > start + 1 => {
                let children = self.nested(cursor, start + 1, close)?;
                out.node(build(children).at(self.ctx.locate(opening.location)));
                cursor.reset(close + 1);
            }
            _ => {
                cursor.bump();
                self.literal(opening, out);
            }
        }
        Ok(())
    }

    // Links

    fn link(
        &self,
        cursor: &mut TokenCursor<'_, '_>,
        boundary: &[TokenKind],
        out: &mut InlineBuffer,
    ) -> Result<(), ParseError> {
        let tokens = cursor.tokens();
        let start = cursor.position();
        let limit = scan_limit(tokens, start, boundary);
        let opening = &tokens[start];

        let resolved = match find_closing_bracket(tokens, start, limit) {
            Some(close) => self.link_target(cursor, start, close, limit),
            None => None,
        };

        match resolved {
            Some((close, url, title, end)) => {
                let children = self.nested(cursor, start + 1, close)?;
                out.node(Node::link(url, title, children).at(self.ctx.locate(opening.location)));
                cursor.reset(end);
            }
            None => {
                // Not a link: the bracket is text and its contents parse as usual.
                cursor.bump();
                self.literal(opening, out);
            }
        }
        Ok(())
    }

    /// Resolve what follows `[text]`: an inline destination, a full or
    /// collapsed reference, or a shortcut reference.
    ///
    /// Returns the closing bracket index, url, title and the position after
    /// the whole link.
    fn link_target(
        &self,
        cursor: &TokenCursor<'_, '_>,
        start: usize,
        close: usize,
        limit: usize,
    ) -> Option<(usize, String, Option<String>, usize)> {
        let tokens = cursor.tokens();
        let next = close + 1;
        let following = if next < limit {
            Some(tokens[next].kind)
        } else {
            None
        };

        match following {
            Some(TokenKind::LeftParen) => find_closing_paren(tokens, next, limit)
                .and_then(|end| {
                    let (url, title) = parse_destination(&cursor.text_between(next + 1, end))?;
                    Some((close, url, title, end + 1))
                })
                // `[label](` with no usable destination may still be a shortcut.
                .or_else(|| self.shortcut(cursor, start, close)),
            Some(TokenKind::LeftBracket) => {
                let label_end = (next + 1..limit).find(|&i| tokens[i].kind == TokenKind::RightBracket)?;
                let label = cursor.text_between(next + 1, label_end);
                let label = if label.trim().is_empty() {
                    cursor.text_between(start + 1, close)
                } else {
                    label
                };
                let reference = self.ctx.references.get(&label)?;
                Some((close, reference.url.clone(), reference.title.clone(), label_end + 1))
            }
            _ => self.shortcut(cursor, start, close),
        }
    }

    /// `[label]` resolved on its own against the reference table.
    fn shortcut(
        &self,
        cursor: &TokenCursor<'_, '_>,
        start: usize,
        close: usize,
    ) -> Option<(usize, String, Option<String>, usize)> {
        let label = cursor.text_between(start + 1, close);
        let reference = self.ctx.references.get(&label)?;
        Some((close, reference.url.clone(), reference.title.clone(), close + 1))
    }

    // Atomic entities

    fn mention(&self, token: &Token<'_>, out: &mut InlineBuffer) {
        let prefix = match token.kind {
            TokenKind::RoleMention => "<@&",
            TokenKind::ChannelMention => "<#",
            _ => "<@",
        };
        let Some(id) = token
            .text
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix('>'))
            .filter(|id| is_snowflake(id))
        else {
            self.literal(token, out);
            return;
        };

        let id = id.to_owned();
        let kind = match token.kind {
            TokenKind::RoleMention => NodeKind::RoleMention { id },
            TokenKind::ChannelMention => NodeKind::ChannelMention { id },
            _ => NodeKind::UserMention { id },
        };
        out.node(Node::leaf(kind).at(self.ctx.locate(token.location)));
    }

    fn timestamp(&self, token: &Token<'_>, out: &mut InlineBuffer) {
        let parsed = token
            .text
            .strip_prefix("<t:")
            .and_then(|rest| rest.strip_suffix('>'))
            .and_then(|inner| inner.split_once(':'))
            .and_then(|(date, style)| {
                Some((date.parse::<i64>().ok()?, TimestampStyle::from_code(style)?))
            });
        match parsed {
            Some((date, style)) => out.node(
                Node::leaf(NodeKind::Timestamp { date, style })
                    .at(self.ctx.locate(token.location)),
            ),
            None => self.literal(token, out),
        }
    }

    fn custom_emoji(&self, token: &Token<'_>, out: &mut InlineBuffer) {
        let inner = token
            .text
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'));
        let parsed = inner.and_then(|inner| {
            let (animated, rest) = match inner.strip_prefix("a:") {
                Some(rest) => (true, rest),
                None => (false, inner.strip_prefix(':')?),
            };
            let (name, id) = rest.split_once(':')?;
            (!name.is_empty() && is_snowflake(id)).then_some((name, id, animated))
        });
        match parsed {
            Some((name, id, animated)) => out.node(
                Node::leaf(NodeKind::CustomEmoji {
                    name: name.to_owned(),
                    id: id.to_owned(),
                    animated,
                })
                .at(self.ctx.locate(token.location)),
            ),
            None => self.literal(token, out),
        }
    }

    fn autolink(&self, token: &Token<'_>, out: &mut InlineBuffer) {
        let text = token.text;
        let Some(inner) = text.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')) else {
            out.node(Node::autolink(text, text).at(self.ctx.locate(token.location)));
            return;
        };

        // Malformed mentions and emoji must not come back as links.
        let looks_like_entity = ["<@", "<#", "<t:", "<a:", "<:"]
            .iter()
            .any(|prefix| text.starts_with(prefix));
        if entity_prefix_only().is_match(text)
            || (looks_like_entity && !entity_with_id().is_match(text))
        {
            self.literal(token, out);
            return;
        }

        let node = if inner.contains("://") {
            Node::autolink(inner, inner)
        } else {
            Node::autolink(format!("mailto:{inner}"), inner)
        };
        out.node(node.at(self.ctx.locate(token.location)));
    }

    fn escape(&self, token: &Token<'_>, out: &mut InlineBuffer) {
        match token.text.strip_prefix('\\') {
            // Escaped characters stay separate so later passes cannot
            // re-read them as markup.
            Some(escaped) if !escaped.is_empty() => {
                out.node(Node::text(escaped).at(self.ctx.locate(token.location)))
            }
            _ => self.literal(token, out),
        }
    }
}

fn is_snowflake(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Index of the first boundary token at or after `from`.
fn scan_limit(tokens: &[Token<'_>], from: usize, boundary: &[TokenKind]) -> usize {
    tokens[from..]
        .iter()
        .position(|t| t.kind == TokenKind::Eof || boundary.contains(&t.kind))
        .map_or(tokens.len(), |offset| from + offset)
}

fn run_length(tokens: &[Token<'_>], from: usize, limit: usize, kind: TokenKind) -> usize {
    tokens[from..limit]
        .iter()
        .take_while(|t| t.kind == kind)
        .count()
}

/// Index of the closing backtick run for the code span opening at `open`.
fn find_code_span_closer(tokens: &[Token<'_>], open: usize, limit: usize) -> Option<usize> {
    let width = tokens[open].length;
    let end = limit.min(open + 1 + CODE_SPAN_SCAN_LIMIT);
    (open + 1..end).find(|&i| tokens[i].kind == TokenKind::Backtick && tokens[i].length == width)
}

/// Step over the token at `i`, jumping a whole code span if one starts there.
fn skip_code_span(tokens: &[Token<'_>], i: usize, limit: usize) -> usize {
    if tokens[i].kind == TokenKind::Backtick {
        if let Some(close) = find_code_span_closer(tokens, i, limit) {
            return close + 1;
        }
    }
    i + 1
}

fn find_emphasis_closer(
    tokens: &[Token<'_>],
    from: usize,
    limit: usize,
    kind: TokenKind,
    width: usize,
) -> Option<usize> {
    let mut longer = None;
    let mut i = from;
    while i < limit {
        if tokens[i].kind == kind {
            let run = run_length(tokens, i, limit, kind);
            if i > from {
                if run == width {
                    return Some(i);
                }
                if run > width && longer.is_none() {
                    longer = Some(i);
                }
            }
            i += run;
            continue;
        }
        i = skip_code_span(tokens, i, limit);
    }
    longer
}

fn find_closing_bracket(tokens: &[Token<'_>], open: usize, limit: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open + 1;
    while i < limit {
        match tokens[i].kind {
            TokenKind::LeftBracket => depth += 1,
            TokenKind::RightBracket if depth == 0 => return Some(i),
            TokenKind::RightBracket => depth -= 1,
            TokenKind::Backtick => {
                i = skip_code_span(tokens, i, limit);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn find_closing_paren(tokens: &[Token<'_>], open: usize, limit: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in open + 1..limit {
        match tokens[i].kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen if depth == 0 => return Some(i),
            TokenKind::RightParen => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Split `url "title"` into its parts. The url may be wrapped in `<>`.
fn parse_destination(raw: &str) -> Option<(String, Option<String>)> {
    let raw = raw.trim();
    let (url, rest) = match raw.find(char::is_whitespace) {
        Some(i) => (&raw[..i], raw[i..].trim()),
        None => (raw, ""),
    };
    let url = url
        .strip_prefix('<')
        .and_then(|u| u.strip_suffix('>'))
        .unwrap_or(url);
    if url.is_empty() {
        return None;
    }

    let title = if rest.is_empty() {
        None
    } else {
        let quoted = ['"', '\''].iter().find_map(|&q| {
            rest.strip_prefix(q).and_then(|r| r.strip_suffix(q))
        })?;
        Some(quoted.to_owned())
    };
    Some((url.to_owned(), title))
}

/// One leading and one trailing space are padding when both are present.
fn trim_code_span(content: &str) -> &str {
    if content.len() > 2 && content.starts_with(' ') && content.ends_with(' ') {
        &content[1..content.len() - 1]
    } else {
        content
    }
}
