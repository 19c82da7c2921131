//! # Lexer - Tokenizing Chat Markdown
//!
//! The first stage of parsing turns source text into a flat [`Token`] stream.
//! Unlike a context-free lexer, the [`Tokenizer`] tracks where it is on the
//! line and whether it is inside a fenced code block, because chat markdown
//! gives the same character different meanings depending on position:
//!
//! ```text
//! "> quote"    → [BlockQuoteMarker, Whitespace, Text]
//! "a > b"      → [Text, Whitespace, Text(">"), Whitespace, Text]
//! "- item"     → [ListMarker, Whitespace, Text]
//! "well-known" → [Text("well"), Text("-"), Text("known")]
//! ```
//!
//! ## Line-start constructs
//!
//! Footnote markers (`-#`), ATX heading markers, block quote markers,
//! indented code and code fences are recognised only when nothing but
//! whitespace precedes them on the line. Numbered list markers allow at most
//! three columns of indentation. Bullet list markers only need whitespace
//! before and after them; the block parser decides whether one mid-line is
//! literal.
//!
//! ```text
//! "use ``` here" → [Text, Whitespace, Backtick("```"), Whitespace, Text]
//! "``` here"     → [Backtick("```"), ...fence mode...]
//! ```
//!
//! ## Fence mode
//!
//! After an opening fence of three or more backticks or tildes, everything is
//! code until a closing fence of the same character and at least the same
//! length:
//!
//! - On a later line, the closing fence must start the line, may be indented
//!   up to three columns and must be followed only by whitespace. The newline
//!   before it is absorbed into the closing fence.
//! - On the opening line itself, a long enough run closes the block even when
//!   text follows, and consumes exactly the opening length. A fence directly
//!   after such a close may open a new block, so ```` ```a``````b``` ```` is
//!   two code blocks.
//!
//! ## Guarantees
//!
//! Tokenization is total: every call consumes at least one character, the
//! stream always ends with exactly one [`TokenKind::Eof`], and outside fence
//! mode concatenating token texts gives back the input.
//!
//! ```
//! use chatmark_syntax::lexer::tokenize;
//! use chatmark_syntax::TokenKind;
//!
//! let tokens = tokenize("**hi** <@42>");
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(kinds.last(), Some(&TokenKind::Eof));
//! assert!(kinds.contains(&TokenKind::UserMention));
//! ```

mod entity;

use crate::gfm;
use crate::token::{SourceLocation, Token, TokenKind};

/// Characters that end a text run.
const SPECIAL: &str = "*_#`~[]()!>|\\&<-+@";

/// Tokenize `input` in one pass.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Tokenizer::new(input).tokenize()
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    ch: char,
    len: usize,
    line: usize,
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: usize,
    line: usize,
    column: usize,
}

/// Stateful single-pass tokenizer.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    fence: Option<Fence>,
    /// Byte position right after a fence closed mid-line; a fence starting
    /// exactly here may open a new block.
    reopen_at: Option<usize>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            fence: None,
            reopen_at: None,
        }
    }

    /// Consume the whole input, returning tokens terminated by `Eof`.
    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut tokens = Vec::new();

        while !self.at_end() {
            let token = self.next_token();
            let newline = token.kind == TokenKind::Newline;
            tokens.push(token);

            // A `>` right after a line break is always a quote marker, and so
            // is the whitespace that follows it.
            if newline && self.fence.is_none() && self.peek() == Some('>') {
                tokens.push(self.block_quote_marker());
                if self.peek().is_some_and(is_inline_space) {
                    tokens.push(self.whitespace());
                }
            }
        }

        tokens.push(Token::eof(self.location()));
        log::trace!(
            "tokenized {} bytes into {} tokens",
            self.input.len(),
            tokens.len()
        );
        tokens
    }

    fn next_token(&mut self) -> Token<'a> {
        if let Some(fence) = self.fence {
            return self.fenced_token(fence);
        }

        let start = self.checkpoint();
        let Some(c) = self.peek() else {
            return Token::eof(self.location());
        };

        if c == '\n' || c == '\r' {
            self.bump_line_break();
            return self.token_from(TokenKind::Newline, start);
        }

        if self.column == 1 || self.after_whitespace() || self.reopen_at == Some(self.pos) {
            if let Some(token) = self.line_start_token() {
                return token;
            }
        }

        if c.is_whitespace() {
            return self.whitespace();
        }

        match c {
            '*' => self.single(TokenKind::Asterisk),
            '_' => self.single(TokenKind::Underscore),
            '`' => self.run(TokenKind::Backtick, '`'),
            '~' => self.run(TokenKind::Tilde, '~'),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '!' => self.single(TokenKind::Exclamation),
            '>' if self.at_line_start() => self.block_quote_marker(),
            '|' => self.pipe(),
            '\\' => self.backslash(),
            '&' => self.entity(),
            '<' => self.angle(),
            '@' => self.at_mention(),
            '-' | '+' => match self.list_marker() {
                Some(token) => token,
                None => self.text(),
            },
            c if c.is_ascii_digit() => match self.numbered_list_marker() {
                Some(token) => token,
                None => self.text(),
            },
            'h' => match self.bare_url() {
                Some(token) => token,
                None => self.text(),
            },
            _ => self.text(),
        }
    }

    fn line_start_token(&mut self) -> Option<Token<'a>> {
        let c = self.peek()?;
        match c {
            '-' if self.at_line_start()
                && self.peek_nth(1) == Some('#')
                && self.space_or_end_at(2) =>
            {
                let start = self.checkpoint();
                self.bump_n(2);
                Some(self.token_from(TokenKind::FootnoteMarker, start))
            }
            '#' if self.at_line_start() => self.atx_marker(),
            '>' if self.at_line_start() => Some(self.block_quote_marker()),
            '-' | '+' | '*' => self.list_marker(),
            c if c.is_ascii_digit() => self.numbered_list_marker(),
            ' ' if self.at_line_start() => self.indented_code(),
            '`' | '~' if self.at_line_start() || self.reopen_at == Some(self.pos) => {
                self.fence_open(c)
            }
            _ => None,
        }
    }

    // Line-start constructs

    fn atx_marker(&mut self) -> Option<Token<'a>> {
        let start = self.checkpoint();
        let level = self.bump_while(|c| c == '#');
        if level <= 6 && self.space_or_end_at(0) {
            return Some(self.token_from(TokenKind::AtxHeaderStart, start));
        }
        self.restore(start);
        None
    }

    fn block_quote_marker(&mut self) -> Token<'a> {
        let start = self.checkpoint();
        if self.rest().starts_with(">>>") {
            self.bump_n(3);
            return self.token_from(TokenKind::MultilineBlockQuoteMarker, start);
        }
        self.bump();
        self.token_from(TokenKind::BlockQuoteMarker, start)
    }

    fn list_marker(&mut self) -> Option<Token<'a>> {
        if !self.space_or_end_at(1) {
            return None;
        }
        Some(self.single(TokenKind::ListMarker))
    }

    fn numbered_list_marker(&mut self) -> Option<Token<'a>> {
        if !self.at_actual_line_start() {
            return None;
        }
        let start = self.checkpoint();
        let digits = self.bump_while(|c| c.is_ascii_digit());
        if (1..=9).contains(&digits)
            && matches!(self.peek(), Some('.' | ')'))
            && self.space_or_end_at(1)
        {
            self.bump();
            return Some(self.token_from(TokenKind::ListMarker, start));
        }
        self.restore(start);
        None
    }

    fn indented_code(&mut self) -> Option<Token<'a>> {
        let start = self.checkpoint();
        if self.bump_while(|c| c == ' ') >= 4 {
            return Some(self.token_from(TokenKind::IndentedCodeBlock, start));
        }
        self.restore(start);
        None
    }

    fn fence_open(&mut self, ch: char) -> Option<Token<'a>> {
        let start = self.checkpoint();
        let len = self.bump_while(|c| c == ch);
        if len < 3 {
            self.restore(start);
            return None;
        }
        self.fence = Some(Fence {
            ch,
            len,
            line: start.line,
        });
        self.reopen_at = None;
        Some(self.token_from(fence_kind(ch), start))
    }

    // Fence mode

    fn fenced_token(&mut self, fence: Fence) -> Token<'a> {
        let start = self.checkpoint();

        if matches!(self.peek(), Some('\n' | '\r')) {
            self.bump_line_break();
            let after_break = self.checkpoint();
            if let Some(token) = self.closing_fence(fence, true) {
                return token;
            }
            self.restore(after_break);
            return self.token_from(TokenKind::Newline, start);
        }

        if let Some(token) = self.closing_fence(fence, false) {
            return token;
        }

        self.code_text(fence, start)
    }

    fn closing_fence(&mut self, fence: Fence, after_break: bool) -> Option<Token<'a>> {
        let before = self.checkpoint();

        let mut indent = 0;
        while indent < 3 && matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
            indent += 1;
        }

        let fence_start = self.checkpoint();
        let run = self.bump_while(|c| c == fence.ch);
        if run >= fence.len && self.rest_of_line_blank() {
            self.fence = None;
            return Some(self.token_from(fence_kind(fence.ch), fence_start));
        }

        if !after_break && indent == 0 && self.line == fence.line && run >= fence.len {
            self.restore(fence_start);
            self.bump_n(fence.len);
            self.fence = None;
            self.reopen_at = Some(self.pos);
            return Some(self.token_from(fence_kind(fence.ch), fence_start));
        }

        self.restore(before);
        None
    }

    fn code_text(&mut self, fence: Fence, start: Checkpoint) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            if c == fence.ch && self.pos > start.pos && self.closes_here(fence) {
                break;
            }
            self.bump();
        }
        if self.pos == start.pos {
            self.bump();
        }
        self.token_from(TokenKind::Text, start)
    }

    /// Whether a fence run starting at the current position closes the block
    /// mid-line. Only the opening line allows that; later lines close at
    /// their start or not at all.
    fn closes_here(&self, fence: Fence) -> bool {
        self.line == fence.line
            && self.rest().chars().take_while(|&c| c == fence.ch).count() >= fence.len
    }

    // Inline-position tokens

    fn whitespace(&mut self) -> Token<'a> {
        let start = self.checkpoint();
        self.bump_while(is_inline_space);
        self.token_from(TokenKind::Whitespace, start)
    }

    fn text(&mut self) -> Token<'a> {
        let start = self.checkpoint();
        self.bump_while(|c| !is_special(c));
        if self.pos == start.pos {
            self.bump();
        }
        self.token_from(TokenKind::Text, start)
    }

    fn pipe(&mut self) -> Token<'a> {
        if self.rest().starts_with("||") {
            let start = self.checkpoint();
            self.bump_n(2);
            return self.token_from(TokenKind::DoublePipe, start);
        }
        self.single(TokenKind::Pipe)
    }

    fn backslash(&mut self) -> Token<'a> {
        let start = self.checkpoint();
        self.bump();
        if self.peek().is_some_and(|c| c != '\n' && c != '\r') {
            self.bump();
        }
        self.token_from(TokenKind::Backslash, start)
    }

    fn entity(&mut self) -> Token<'a> {
        let start = self.checkpoint();
        self.bump();
        if self.bump_while(|c| c.is_ascii_alphanumeric() || c == '#') == 0 {
            return self.token_from(TokenKind::Text, start);
        }
        if self.peek() == Some(';') {
            self.bump();
        }
        self.token_from(TokenKind::Entity, start)
    }

    fn angle(&mut self) -> Token<'a> {
        match entity::scan(self.rest()) {
            Some((kind, len)) => {
                let start = self.checkpoint();
                self.bump_bytes(len);
                self.token_from(kind.token_kind(), start)
            }
            None => self.text(),
        }
    }

    fn at_mention(&mut self) -> Token<'a> {
        if self.prev_char().is_some_and(char::is_alphanumeric) {
            return self.text();
        }
        let start = self.checkpoint();
        if self.rest().starts_with("@everyone") {
            self.bump_bytes("@everyone".len());
            return self.token_from(TokenKind::EveryoneMention, start);
        }
        if self.rest().starts_with("@here") {
            self.bump_bytes("@here".len());
            return self.token_from(TokenKind::HereMention, start);
        }
        self.text()
    }

    fn bare_url(&mut self) -> Option<Token<'a>> {
        if self.prev_char().is_some_and(char::is_alphanumeric) {
            return None;
        }
        let len = gfm::match_url(self.rest())?;
        let start = self.checkpoint();
        self.bump_bytes(len);
        Some(self.token_from(TokenKind::Autolink, start))
    }

    fn single(&mut self, kind: TokenKind) -> Token<'a> {
        let start = self.checkpoint();
        self.bump();
        self.token_from(kind, start)
    }

    fn run(&mut self, kind: TokenKind, ch: char) -> Token<'a> {
        let start = self.checkpoint();
        self.bump_while(|c| c == ch);
        self.token_from(kind, start)
    }

    // Position helpers

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn prev_char(&self) -> Option<char> {
        self.input[..self.pos].chars().next_back()
    }

    /// The character `n` places ahead is whitespace or the input ends there.
    fn space_or_end_at(&self, n: usize) -> bool {
        self.peek_nth(n).is_none_or(char::is_whitespace)
    }

    fn after_whitespace(&self) -> bool {
        self.prev_char().is_none_or(char::is_whitespace)
    }

    /// Only whitespace precedes the current position on this line.
    fn at_line_start(&self) -> bool {
        self.line_prefix().chars().all(char::is_whitespace)
    }

    /// At most three columns of spaces or tabs precede the current position.
    fn at_actual_line_start(&self) -> bool {
        let mut width = 0;
        for c in self.line_prefix().chars() {
            width += match c {
                ' ' => 1,
                '\t' => 4,
                _ => return false,
            };
        }
        width <= 3
    }

    fn line_prefix(&self) -> &'a str {
        let before = &self.input[..self.pos];
        match before.rfind(['\n', '\r']) {
            Some(i) => &before[i + 1..],
            None => before,
        }
    }

    fn rest_of_line_blank(&self) -> bool {
        line_blank(self.rest())
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.line = checkpoint.line;
        self.column = checkpoint.column;
    }

    fn token_from(&self, kind: TokenKind, start: Checkpoint) -> Token<'a> {
        Token::new(
            kind,
            &self.input[start.pos..self.pos],
            SourceLocation {
                line: start.line,
                column: start.column,
                offset: start.pos,
            },
        )
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        let line_break = c == '\n' || (c == '\r' && self.peek() != Some('\n'));
        if line_break {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn bump_bytes(&mut self, len: usize) {
        let end = self.pos + len;
        while self.pos < end && self.bump().is_some() {}
    }

    fn bump_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(&pred) {
            self.bump();
            count += 1;
        }
        count
    }

    fn bump_line_break(&mut self) {
        if self.bump() == Some('\r') && self.peek() == Some('\n') {
            self.bump();
        }
    }
}

fn fence_kind(ch: char) -> TokenKind {
    if ch == '~' {
        TokenKind::TildeFence
    } else {
        TokenKind::Backtick
    }
}

fn is_special(c: char) -> bool {
    c.is_whitespace() || SPECIAL.contains(c)
}

fn is_inline_space(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

fn line_blank(s: &str) -> bool {
    s.chars()
        .take_while(|&c| c != '\n' && c != '\r')
        .all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn lex(input: &str) -> Vec<(TokenKind, &str)> {
        let tokens = tokenize(input);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
        tokens[..tokens.len() - 1]
            .iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    use TokenKind::*;

    #[test]
    fn test_empty_input_is_just_eof() {
        let tokens = tokenize("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, Eof);
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(
            lex("hello world"),
            vec![(Text, "hello"), (Whitespace, " "), (Text, "world")]
        );
    }

    #[test]
    fn test_atx_marker() {
        assert_eq!(
            lex("# Title"),
            vec![(AtxHeaderStart, "#"), (Whitespace, " "), (Text, "Title")]
        );
        assert_eq!(lex("#hashtag"), vec![(Text, "#"), (Text, "hashtag")]);
        assert_eq!(lex("#######"), vec![(Text, "#"); 7]);
    }

    #[test]
    fn test_list_markers() {
        assert_eq!(
            lex("- item"),
            vec![(ListMarker, "-"), (Whitespace, " "), (Text, "item")]
        );
        assert_eq!(
            lex("1. one"),
            vec![(ListMarker, "1."), (Whitespace, " "), (Text, "one")]
        );
        assert_eq!(
            lex("12) twelve"),
            vec![(ListMarker, "12)"), (Whitespace, " "), (Text, "twelve")]
        );
        assert_eq!(
            lex("1.5 apples"),
            vec![(Text, "1.5"), (Whitespace, " "), (Text, "apples")]
        );
    }

    #[test]
    fn test_dash_inside_word_is_text() {
        assert_eq!(
            lex("well-known"),
            vec![(Text, "well"), (Text, "-"), (Text, "known")]
        );
    }

    #[test]
    fn test_footnote_marker() {
        assert_eq!(
            lex("-# small"),
            vec![(FootnoteMarker, "-#"), (Whitespace, " "), (Text, "small")]
        );
    }

    #[test]
    fn test_indented_code_marker() {
        assert_eq!(
            lex("    code"),
            vec![(IndentedCodeBlock, "    "), (Text, "code")]
        );
    }

    #[test]
    fn test_entities() {
        assert_eq!(
            lex("<@123> <@&456> <#789>"),
            vec![
                (UserMention, "<@123>"),
                (Whitespace, " "),
                (RoleMention, "<@&456>"),
                (Whitespace, " "),
                (ChannelMention, "<#789>"),
            ]
        );
        assert_eq!(
            lex("<:smile:42><a:wave:7>"),
            vec![(CustomEmoji, "<:smile:42>"), (CustomEmoji, "<a:wave:7>")]
        );
        assert_eq!(lex("<t:1757847540:R>"), vec![(Timestamp, "<t:1757847540:R>")]);
    }

    #[test]
    fn test_malformed_entity_is_text() {
        assert_eq!(
            lex("<@abc>"),
            vec![(Text, "<"), (Text, "@"), (Text, "abc"), (Text, ">")]
        );
    }

    #[test]
    fn test_broadcast_mentions() {
        assert_eq!(
            lex("@everyone hi"),
            vec![(EveryoneMention, "@everyone"), (Whitespace, " "), (Text, "hi")]
        );
        assert_eq!(
            lex("mail a@here.com"),
            vec![
                (Text, "mail"),
                (Whitespace, " "),
                (Text, "a"),
                (Text, "@"),
                (Text, "here.com"),
            ]
        );
    }

    #[test]
    fn test_bare_url_swallows_underscores_but_not_trailing_dot() {
        assert_eq!(
            lex("see https://example.com/a_b."),
            vec![
                (Text, "see"),
                (Whitespace, " "),
                (Autolink, "https://example.com/a_b"),
                (Text, "."),
            ]
        );
    }

    #[test]
    fn test_fenced_code_block() {
        assert_eq!(
            lex("```rust\nfn main() {}\n```"),
            vec![
                (Backtick, "```"),
                (Text, "rust"),
                (Newline, "\n"),
                (Text, "fn main() {}"),
                (Backtick, "```"),
            ]
        );
    }

    #[test]
    fn test_tilde_fence() {
        assert_eq!(
            lex("~~~\nx\n~~~"),
            vec![
                (TildeFence, "~~~"),
                (Newline, "\n"),
                (Text, "x"),
                (TildeFence, "~~~"),
            ]
        );
    }

    #[test]
    fn test_adjacent_single_line_fences() {
        assert_eq!(
            lex("```hello``````world```"),
            vec![
                (Backtick, "```"),
                (Text, "hello"),
                (Backtick, "```"),
                (Backtick, "```"),
                (Text, "world"),
                (Backtick, "```"),
            ]
        );
    }

    #[test]
    fn test_quote_markers_are_code_inside_fence() {
        assert_eq!(
            lex("```\n> not quote\n```"),
            vec![
                (Backtick, "```"),
                (Newline, "\n"),
                (Text, "> not quote"),
                (Backtick, "```"),
            ]
        );
    }

    #[test]
    fn test_shorter_run_does_not_close_fence() {
        assert_eq!(
            lex("````\n```\n````"),
            vec![
                (Backtick, "````"),
                (Newline, "\n"),
                (Text, "```"),
                (Backtick, "````"),
            ]
        );
    }

    #[test]
    fn test_mid_line_backticks_do_not_open_a_fence() {
        assert_eq!(
            lex("use ``` here\n<@1>"),
            vec![
                (Text, "use"),
                (Whitespace, " "),
                (Backtick, "```"),
                (Whitespace, " "),
                (Text, "here"),
                (Newline, "\n"),
                (UserMention, "<@1>"),
            ]
        );
        assert_eq!(
            lex("a ~~~ b"),
            vec![
                (Text, "a"),
                (Whitespace, " "),
                (Tilde, "~~~"),
                (Whitespace, " "),
                (Text, "b"),
            ]
        );
    }

    #[test]
    fn test_mid_line_heading_and_footnote_markers_are_text() {
        assert_eq!(
            lex("a # b"),
            vec![
                (Text, "a"),
                (Whitespace, " "),
                (Text, "#"),
                (Whitespace, " "),
                (Text, "b"),
            ]
        );
        assert_eq!(
            lex("a -# b"),
            vec![
                (Text, "a"),
                (Whitespace, " "),
                (Text, "-"),
                (Text, "#"),
                (Whitespace, " "),
                (Text, "b"),
            ]
        );
    }

    #[test]
    fn test_fence_inside_quote_keeps_quote_markers() {
        assert_eq!(
            lex("> ```\n> x"),
            vec![
                (BlockQuoteMarker, ">"),
                (Whitespace, " "),
                (Backtick, "```"),
                (Newline, "\n"),
                (BlockQuoteMarker, ">"),
                (Whitespace, " "),
                (Text, "x"),
            ]
        );
    }

    #[rstest]
    #[case::indented_three("```\nx\n   ```", vec![(Text, "x"), (Backtick, "```")])]
    #[case::trailing_space("```\nx\n```  ", vec![(Text, "x"), (Backtick, "```"), (Whitespace, "  ")])]
    #[case::indented_four(
        "```\nx\n    ```",
        vec![(Text, "x"), (Newline, "\n"), (Text, "    ```")]
    )]
    #[case::mid_line("```\nx ```", vec![(Text, "x ```")])]
    #[case::trailing_text(
        "```\nx\n``` y",
        vec![(Text, "x"), (Newline, "\n"), (Text, "``` y")]
    )]
    fn test_closing_fence_rules(
        #[case] input: &str,
        #[case] after_open: Vec<(TokenKind, &str)>,
    ) {
        let mut expected = vec![(Backtick, "```"), (Newline, "\n")];
        expected.extend(after_open);
        assert_eq!(lex(input), expected);
    }

    #[test]
    fn test_quote_after_newline() {
        assert_eq!(
            lex("a\n> b"),
            vec![
                (Text, "a"),
                (Newline, "\n"),
                (BlockQuoteMarker, ">"),
                (Whitespace, " "),
                (Text, "b"),
            ]
        );
        assert_eq!(
            lex(">>> hi"),
            vec![
                (MultilineBlockQuoteMarker, ">>>"),
                (Whitespace, " "),
                (Text, "hi"),
            ]
        );
    }

    #[test]
    fn test_mid_line_gt_is_text() {
        assert_eq!(
            lex("a > b"),
            vec![
                (Text, "a"),
                (Whitespace, " "),
                (Text, ">"),
                (Whitespace, " "),
                (Text, "b"),
            ]
        );
    }

    #[test]
    fn test_punctuation_tokens() {
        assert_eq!(
            lex("||x||"),
            vec![(DoublePipe, "||"), (Text, "x"), (DoublePipe, "||")]
        );
        assert_eq!(lex("\\*"), vec![(Backslash, "\\*")]);
        assert_eq!(lex("&amp;"), vec![(Entity, "&amp;")]);
        assert_eq!(
            lex("a & b"),
            vec![
                (Text, "a"),
                (Whitespace, " "),
                (Text, "&"),
                (Whitespace, " "),
                (Text, "b"),
            ]
        );
    }

    #[test]
    fn test_crlf_is_one_newline() {
        assert_eq!(
            lex("a\r\nb"),
            vec![(Text, "a"), (Newline, "\r\n"), (Text, "b")]
        );
    }

    #[test]
    fn test_locations() {
        let tokens = tokenize("a\nbc");
        let locations: Vec<_> = tokens
            .iter()
            .map(|t| (t.location.line, t.location.column, t.location.offset))
            .collect();
        assert_eq!(locations, vec![(1, 1, 0), (1, 2, 1), (2, 1, 2), (2, 3, 4)]);
    }

    #[rstest]
    #[case("**bold** <@1> [x](y) `c` ~~s~~ ||p||\n> q")]
    #[case("- a\n  - b\n1. c\n-# d")]
    #[case("<t:1:R> <:e:1> <a:e:2> @here &lt; \\_")]
    #[case("héllo wörld, ünïcode 🎉")]
    fn test_lossless_outside_fences(#[case] input: &str) {
        let rebuilt: String = tokenize(input).iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, input);
    }

    #[rstest]
    #[case("`")]
    #[case("```")]
    #[case("```\n")]
    #[case("~~~~~~")]
    #[case("<<<<>>>>")]
    #[case("\\")]
    #[case("\r")]
    #[case("&")]
    #[case("\t\t    \n    ")]
    fn test_every_token_consumes_input(#[case] input: &str) {
        let tokens = tokenize(input);
        let (eof, rest) = tokens.split_last().unwrap();
        assert_eq!(eof.kind, Eof);
        assert!(rest.iter().all(|t| !t.text.is_empty()));
    }
}
