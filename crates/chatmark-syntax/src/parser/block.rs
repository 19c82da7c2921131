//! Block-level grammar rules.

use crate::ast::{Node, NodeKind};
use crate::cursor::TokenCursor;
use crate::error::ParseError;
use crate::lexer::tokenize;
use crate::token::{SourceLocation, Token, TokenKind};

use super::Context;
use super::guard::LoopGuard;
use super::inline::{InlineParser, LINE_END};

/// Inserted before a quoted line that itself starts with `>` so the marker
/// is read as text when the quote is parsed again.
const WORD_JOINER: &str = "\u{2060}";

/// Removed from every text node of a single-line quote after parsing.
const ZERO_WIDTH: [char; 4] = ['\u{200B}', '\u{200C}', '\u{2060}', '\u{FEFF}'];

pub(crate) struct BlockParser<'t, 'a, 'p> {
    cursor: TokenCursor<'t, 'a>,
    ctx: Context<'p>,
    depth: usize,
    last_was_code: bool,
}

impl<'t, 'a, 'p> BlockParser<'t, 'a, 'p> {
    pub(crate) fn new(tokens: &'t [Token<'a>], ctx: Context<'p>, depth: usize) -> Self {
        Self {
            cursor: TokenCursor::new(tokens),
            ctx,
            depth,
            last_was_code: false,
        }
    }

    /// Parse every remaining token into a `Document` node.
    pub(crate) fn parse_document(mut self) -> Result<Node, ParseError> {
        let mut guard = LoopGuard::block(self.ctx.config);
        let mut blocks = Vec::new();

        while !self.cursor.at_end() {
            guard.check(self.cursor.position())?;
            match self.block()? {
                Some(node) => {
                    self.last_was_code = matches!(node.kind(), NodeKind::CodeBlock { .. });
                    blocks.push(node);
                    guard.produced();
                }
                None => {
                    self.last_was_code = false;
                    guard.empty()?;
                }
            }
        }

        Ok(Node::document(blocks).at(self.ctx.locate(SourceLocation::START)))
    }

    fn inline(&self) -> InlineParser<'p> {
        InlineParser::new(self.ctx, self.depth)
    }

    fn locate(&self, token: &Token<'_>) -> Option<SourceLocation> {
        self.ctx.locate(token.location)
    }

    fn skip_trivia(&mut self) {
        while !self.cursor.at_end() && self.cursor.kind().is_trivia() {
            self.cursor.bump();
        }
    }

    fn block(&mut self) -> Result<Option<Node>, ParseError> {
        self.skip_trivia();
        if self.cursor.at_end() {
            return Ok(None);
        }

        let token = self.cursor.current();
        let node = match token.kind {
            TokenKind::FootnoteMarker => self.footnote()?,
            TokenKind::AtxHeaderStart => self.atx_heading()?,
            TokenKind::MultilineBlockQuoteMarker => self.multiline_quote()?,
            TokenKind::BlockQuoteMarker => self.block_quote()?,
            TokenKind::ListMarker => self.list(0)?,
            TokenKind::Backtick | TokenKind::TildeFence if token.length >= 3 => {
                self.fenced_code()
            }
            TokenKind::IndentedCodeBlock => self.indented_code(),
            TokenKind::Newline => return Ok(self.blank_lines()),
            _ => match self.setext_heading()? {
                Some(heading) => heading,
                None => self.paragraph()?,
            },
        };
        log::trace!("block {} at token {}", node.kind().tag(), self.cursor.position());
        Ok(Some(node))
    }

    /// One newline right after a code block is kept as a line break; any
    /// other run of newlines only separates blocks.
    fn blank_lines(&mut self) -> Option<Node> {
        let first = self.cursor.current();
        let mut newlines = 0;
        while self.cursor.at_any(&[TokenKind::Newline, TokenKind::Whitespace]) {
            if self.cursor.at(TokenKind::Newline) {
                newlines += 1;
            }
            self.cursor.bump();
        }
        (newlines == 1 && self.last_was_code).then(|| Node::soft_break().at(self.locate(first)))
    }

    // Leaf blocks

    fn atx_heading(&mut self) -> Result<Node, ParseError> {
        let marker = self.cursor.consume();
        let level = u8::try_from(marker.length).unwrap_or(6);
        self.cursor.eat(TokenKind::Whitespace);
        let children = self.inline().parse_inlines(&mut self.cursor, LINE_END)?;
        Ok(Node::heading(level, children).at(self.locate(marker)))
    }

    fn footnote(&mut self) -> Result<Node, ParseError> {
        let marker = self.cursor.consume();
        self.cursor.eat(TokenKind::Whitespace);
        let children = self.inline().parse_inlines(&mut self.cursor, LINE_END)?;
        Ok(Node::footnote(children).at(self.locate(marker)))
    }

    /// `Title` followed by a line of three or more `=` or `-`.
    fn setext_heading(&mut self) -> Result<Option<Node>, ParseError> {
        let tokens = self.cursor.tokens();
        let start = self.cursor.position();
        let title_end = line_end(tokens, start);
        if tokens.get(title_end).map(|t| t.kind) != Some(TokenKind::Newline) {
            return Ok(None);
        }
        if self.cursor.text_between(start, title_end).trim().is_empty() {
            return Ok(None);
        }

        let underline_end = line_end(tokens, title_end + 1);
        let underline = self.cursor.text_between(title_end + 1, underline_end);
        let underline = underline.trim();
        let level = match underline.chars().next() {
            _ if underline.chars().count() < 3 => return Ok(None),
            Some('=') if underline.chars().all(|c| c == '=') => 1,
            Some('-') if underline.chars().all(|c| c == '-') => 2,
            _ => return Ok(None),
        };

        let mut title = self.cursor.slice(start, title_end);
        let children = self.inline().parse_inlines(&mut title, &[])?;
        self.cursor.reset(underline_end);
        Ok(Some(
            Node::heading(level, children).at(self.locate(&tokens[start])),
        ))
    }

    fn paragraph(&mut self) -> Result<Node, ParseError> {
        let first = self.cursor.current();
        let mut children = Vec::new();

        loop {
            children.extend(self.inline().parse_inlines(&mut self.cursor, LINE_END)?);
            if !self.cursor.at(TokenKind::Newline) {
                break;
            }
            let newline = self.cursor.consume();
            // The blank line stays for the caller; list items end on it.
            if self.at_blank_line() || self.starts_new_block() {
                break;
            }
            self.cursor
                .skip_while(&[TokenKind::Whitespace, TokenKind::IndentedCodeBlock]);
            children.push(Node::soft_break().at(self.locate(newline)));
        }

        Ok(Node::paragraph(children).at(self.locate(first)))
    }

    fn at_blank_line(&self) -> bool {
        match self.cursor.kind() {
            TokenKind::Newline => true,
            TokenKind::Whitespace => self.cursor.nth(1).kind == TokenKind::Newline,
            _ => false,
        }
    }

    /// Whether the line under the cursor opens a block that interrupts a
    /// paragraph.
    fn starts_new_block(&self) -> bool {
        let indented = matches!(
            self.cursor.kind(),
            TokenKind::Whitespace | TokenKind::IndentedCodeBlock
        );
        let token = self.cursor.nth(usize::from(indented));
        match token.kind {
            TokenKind::AtxHeaderStart
            | TokenKind::BlockQuoteMarker
            | TokenKind::MultilineBlockQuoteMarker
            | TokenKind::ListMarker
            | TokenKind::FootnoteMarker
            | TokenKind::Eof => true,
            TokenKind::Backtick | TokenKind::TildeFence => token.length >= 3,
            _ => false,
        }
    }

    // Code blocks

    fn fenced_code(&mut self) -> Node {
        let open = self.cursor.consume();
        let closes = |token: &Token<'_>| token.kind == open.kind && token.length >= open.length;

        let mut info = String::new();
        while !self.cursor.at_end()
            && !self.cursor.at(TokenKind::Newline)
            && !closes(self.cursor.current())
        {
            info.push_str(self.cursor.consume().text);
        }

        // ```code``` on a single line: everything between the fences is code.
        if closes(self.cursor.current()) {
            self.cursor.bump();
            return code_block(info, None, None, true).at(self.locate(open));
        }

        self.cursor.eat(TokenKind::Newline);
        let mut content = String::new();
        while !self.cursor.at_end() && !closes(self.cursor.current()) {
            let token = self.cursor.consume();
            match token.kind {
                TokenKind::Newline => content.push('\n'),
                _ => content.push_str(token.text),
            }
        }
        if closes(self.cursor.current()) {
            self.cursor.bump();
        }

        let info = info.trim();
        let language = info
            .split_whitespace()
            .next()
            .filter(|_| !info.chars().all(|c| c == '`' || c == '~'))
            .map(str::to_owned);
        let info = (!info.is_empty()).then(|| info.to_owned());
        code_block(content, language, info, true).at(self.locate(open))
    }

    fn indented_code(&mut self) -> Node {
        let first = self.cursor.current();
        let mut lines = Vec::new();

        loop {
            let indent = self.cursor.consume();
            let mut line = indent.text.get(4..).unwrap_or_default().to_owned();
            while !self.cursor.at_end() && !self.cursor.at(TokenKind::Newline) {
                line.push_str(self.cursor.consume().text);
            }
            lines.push(line);

            if self.cursor.at(TokenKind::Newline)
                && self.cursor.nth(1).kind == TokenKind::IndentedCodeBlock
            {
                self.cursor.bump();
                continue;
            }
            break;
        }

        code_block(lines.join("\n"), None, None, false).at(self.locate(first))
    }

    // Block quotes

    fn block_quote(&mut self) -> Result<Node, ParseError> {
        let first = self.cursor.current();
        let tokens = self.cursor.tokens();
        let mut text = String::new();
        let mut lines = Vec::new();

        loop {
            self.cursor.bump();
            self.cursor.eat(TokenKind::Whitespace);
            let start = self.cursor.position();
            while !self.cursor.at_end() && !self.cursor.at(TokenKind::Newline) {
                self.cursor.bump();
            }
            let line = self.cursor.text_between(start, self.cursor.position());

            if !lines.is_empty() {
                text.push('\n');
            }
            let prefix = if line.starts_with('>') { WORD_JOINER } else { "" };
            lines.push(QuoteLine {
                source: tokens.get(start).map_or(first.location, |t| t.location),
                offset: text.len(),
                prefix: prefix.len(),
            });
            text.push_str(prefix);
            text.push_str(&line);

            if !self.continues_quote() {
                break;
            }
            self.cursor.bump();
            self.cursor.eat(TokenKind::Whitespace);
        }

        let depth = self.ctx.descend(self.depth)?;
        let mut children: Vec<Node> = self
            .sub_document(&text, depth)?
            .into_iter()
            .map(|node| node.map_text(&strip_zero_width))
            .collect();
        if self.ctx.config.track_source_locations {
            children = children
                .into_iter()
                .map(|node| relocate(node, &|loc| map_quote_location(&lines, loc)))
                .collect();
        }
        Ok(Node::block_quote(children).at(self.locate(first)))
    }

    /// At a newline whose next line is another `>` line.
    fn continues_quote(&self) -> bool {
        if !self.cursor.at(TokenKind::Newline) {
            return false;
        }
        match self.cursor.nth(1).kind {
            TokenKind::BlockQuoteMarker => true,
            TokenKind::Whitespace => self.cursor.nth(2).kind == TokenKind::BlockQuoteMarker,
            _ => false,
        }
    }

    /// `>>>` quotes everything to the end of the message.
    fn multiline_quote(&mut self) -> Result<Node, ParseError> {
        let marker = self.cursor.consume();
        self.cursor.eat(TokenKind::Whitespace);
        let tokens = self.cursor.tokens();
        let start = self.cursor.position();
        let base = self.cursor.current().location;
        let text = source_text(&tokens[start..]);
        self.cursor.reset(tokens.len());

        let depth = self.ctx.descend(self.depth)?;
        let mut children = self.sub_document(&text, depth)?;
        if self.ctx.config.track_source_locations {
            children = children
                .into_iter()
                .map(|node| relocate(node, &|loc| shift_location(base, loc)))
                .collect();
        }
        Ok(Node::block_quote(children).at(self.locate(marker)))
    }

    /// Tokenize and parse quoted text as its own document.
    fn sub_document(&self, text: &str, depth: usize) -> Result<Vec<Node>, ParseError> {
        let tokens = tokenize(text);
        log::trace!("quote sub-parse at depth {depth}: {} tokens", tokens.len());
        let root = BlockParser::new(&tokens, self.ctx, depth).parse_document()?;
        let (_, children, _) = root.into_parts();
        Ok(children)
    }

    // Lists

    fn list(&mut self, level: usize) -> Result<Node, ParseError> {
        self.ctx.descend(self.depth + level)?;

        let tokens = self.cursor.tokens();
        let first = self.cursor.current();
        let indent = marker_indent(tokens, self.cursor.position()) / 2;
        let style = MarkerStyle::of(first.text);
        let mut guard = LoopGuard::block(self.ctx.config);
        let mut items: Vec<Node> = Vec::new();

        'items: loop {
            guard.check(self.cursor.position())?;
            items.push(self.list_item(style)?);

            loop {
                let save = self.cursor.position();
                self.cursor.skip_while(&[
                    TokenKind::Newline,
                    TokenKind::Whitespace,
                    TokenKind::IndentedCodeBlock,
                ]);
                if !self.cursor.at(TokenKind::ListMarker) {
                    self.cursor.reset(save);
                    break 'items;
                }

                let next_indent = marker_indent(tokens, self.cursor.position()) / 2;
                if next_indent > indent {
                    let nested = self.list(level + 1)?;
                    if let Some(item) = items.pop() {
                        let (kind, mut children, location) = item.into_parts();
                        children.push(nested);
                        items.push(Node::from_parts(kind, children, location));
                    }
                    continue;
                }
                if next_indent == indent && MarkerStyle::of(self.cursor.current().text) == style
                {
                    continue 'items;
                }
                self.cursor.reset(save);
                break 'items;
            }
        }

        let kind = NodeKind::List {
            ordered: style.is_ordered(),
            start: style.number(first.text),
            level,
        };
        Ok(Node::new(kind, items).at(self.locate(first)))
    }

    fn list_item(&mut self, style: MarkerStyle) -> Result<Node, ParseError> {
        let marker = self.cursor.consume();
        self.cursor.eat(TokenKind::Whitespace);

        let mut children = Vec::new();
        let content = self.cursor.current();
        let first_line = self.inline().parse_inlines(&mut self.cursor, LINE_END)?;
        if !first_line.is_empty() {
            children.push(Node::paragraph(first_line).at(self.locate(content)));
        }
        self.cursor.eat(TokenKind::Newline);

        let mut guard = LoopGuard::block(self.ctx.config);
        while !self.item_ends() {
            guard.check(self.cursor.position())?;
            self.cursor.skip_while(&[
                TokenKind::Newline,
                TokenKind::Whitespace,
                TokenKind::IndentedCodeBlock,
            ]);
            match self.block()? {
                Some(node) => {
                    children.push(node);
                    guard.produced();
                }
                None => guard.empty()?,
            }
        }

        let kind = NodeKind::ListItem {
            number: style.number(marker.text),
        };
        Ok(Node::new(kind, children).at(self.locate(marker)))
    }

    /// Looks ahead without consuming: an item ends at the next list marker,
    /// at the end of input, or at unindented content after a blank line.
    fn item_ends(&mut self) -> bool {
        let save = self.cursor.position();
        let mut blank = false;
        while self
            .cursor
            .at_any(&[TokenKind::Newline, TokenKind::Whitespace])
        {
            blank |= self.cursor.at(TokenKind::Newline);
            self.cursor.bump();
        }

        let ends = match self.cursor.kind() {
            _ if self.cursor.at_end() => true,
            TokenKind::ListMarker => true,
            TokenKind::IndentedCodeBlock => self.cursor.nth(1).kind == TokenKind::ListMarker,
            _ => blank,
        };
        self.cursor.reset(save);
        ends
    }
}

/// Bullet character or ordered-list delimiter of a list marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerStyle {
    Bullet(char),
    Ordered(char),
}

impl MarkerStyle {
    fn of(marker: &str) -> Self {
        match marker.chars().last() {
            Some(c @ ('.' | ')')) => Self::Ordered(c),
            Some(c) => Self::Bullet(c),
            None => Self::Bullet('-'),
        }
    }

    fn is_ordered(self) -> bool {
        matches!(self, Self::Ordered(_))
    }

    fn number(self, marker: &str) -> Option<u64> {
        match self {
            Self::Ordered(_) => marker.get(..marker.len().saturating_sub(1))?.parse().ok(),
            Self::Bullet(_) => None,
        }
    }
}

/// Width of the indentation before the marker at `index`, tabs counting four.
fn marker_indent(tokens: &[Token<'_>], index: usize) -> usize {
    let Some(marker) = tokens.get(index) else {
        return 0;
    };
    let prefix = index
        .checked_sub(1)
        .and_then(|i| tokens.get(i))
        .filter(|t| {
            matches!(t.kind, TokenKind::Whitespace | TokenKind::IndentedCodeBlock)
                && t.location.column == 1
        });
    match prefix {
        Some(prefix) => prefix
            .text
            .chars()
            .map(|c| if c == '\t' { 4 } else { 1 })
            .sum(),
        None => marker.location.column.saturating_sub(1),
    }
}

/// Index of the first `Newline` or `Eof` at or after `from`.
fn line_end(tokens: &[Token<'_>], from: usize) -> usize {
    (from..tokens.len())
        .find(|&i| matches!(tokens[i].kind, TokenKind::Newline | TokenKind::Eof))
        .unwrap_or(tokens.len())
}

fn code_block(
    content: impl Into<String>,
    language: Option<String>,
    info: Option<String>,
    fenced: bool,
) -> Node {
    Node::leaf(NodeKind::CodeBlock {
        content: content.into(),
        language,
        info,
        fenced,
    })
}

fn strip_zero_width(text: &str) -> String {
    text.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect()
}

/// Rebuild source text from tokens, restoring the line breaks a closing
/// fence absorbs.
fn source_text(tokens: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut line = None;
    for token in tokens {
        if let Some(line) = line {
            for _ in line..token.location.line {
                out.push('\n');
            }
        }
        out.push_str(token.text);
        line = Some(token.location.line + usize::from(token.kind == TokenKind::Newline));
    }
    out
}

/// Where one line of a single-line quote came from.
#[derive(Debug, Clone, Copy)]
struct QuoteLine {
    /// Location of the first character after the marker.
    source: SourceLocation,
    /// Byte offset of the line in the rebuilt text.
    offset: usize,
    /// Bytes inserted before the line.
    prefix: usize,
}

fn map_quote_location(lines: &[QuoteLine], loc: SourceLocation) -> SourceLocation {
    let Some(line) = loc.line.checked_sub(1).and_then(|i| lines.get(i)) else {
        return loc;
    };
    let within = loc.offset.saturating_sub(line.offset);
    if within < line.prefix {
        return line.source;
    }
    let inserted_chars = usize::from(line.prefix > 0);
    SourceLocation {
        line: line.source.line,
        column: line.source.column + (loc.column - 1).saturating_sub(inserted_chars),
        offset: line.source.offset + within - line.prefix,
    }
}

fn shift_location(base: SourceLocation, loc: SourceLocation) -> SourceLocation {
    SourceLocation {
        line: base.line + loc.line - 1,
        column: if loc.line == 1 {
            base.column + loc.column - 1
        } else {
            loc.column
        },
        offset: base.offset + loc.offset,
    }
}

fn relocate(node: Node, map: &impl Fn(SourceLocation) -> SourceLocation) -> Node {
    let (kind, children, location) = node.into_parts();
    let children = children.into_iter().map(|c| relocate(c, map)).collect();
    Node::from_parts(kind, children, location.map(map))
}
