//! # Tokens
//!
//! The tokenizer produces a flat sequence of [`Token`]s. Each token borrows its
//! text from the input and records where it starts, so the parser never has to
//! copy source text until it builds a tree node.
//!
//! Tokens are context-sensitive: whether `>` is a [`TokenKind::BlockQuoteMarker`]
//! or plain [`TokenKind::Text`] depends on where it sits on the line. That
//! decision is made once, in the [`lexer`](crate::lexer), so the parsers only
//! ever ask "what kind is this?".

use serde::{Deserialize, Serialize};

/// Position of a token or node in the input that was parsed.
///
/// `line` and `column` are 1-based and count characters; `offset` is the
/// 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub const START: SourceLocation = SourceLocation {
        line: 1,
        column: 1,
        offset: 0,
    };

    /// Location of the character reached after `text` on the same line.
    ///
    /// Only valid when `text` contains no line break.
    pub fn advanced_by(self, text: &str) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column + text.chars().count(),
            offset: self.offset + text.len(),
        }
    }
}

/// Token kinds recognised by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A run of ordinary characters.
    Text,
    /// Horizontal whitespace (no line breaks).
    Whitespace,
    /// `\n` or `\r\n`.
    Newline,

    /// One to six `#` at line start, followed by whitespace or end of input.
    AtxHeaderStart,
    Asterisk,
    Underscore,
    /// A run of backticks. Also used for backtick fences.
    Backtick,
    /// A run of tildes outside fence position.
    Tilde,
    /// Three or more tildes opening or closing a fence.
    TildeFence,

    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Exclamation,

    /// `-`, `+`, `*`, `N.` or `N)` in list-item position.
    ListMarker,
    BlockQuoteMarker,
    MultilineBlockQuoteMarker,
    Pipe,
    /// `||`, the spoiler delimiter.
    DoublePipe,
    /// Four or more spaces at line start.
    IndentedCodeBlock,

    UserMention,
    RoleMention,
    ChannelMention,
    EveryoneMention,
    HereMention,
    Timestamp,
    CustomEmoji,
    Autolink,

    /// A backslash and the character it escapes.
    Backslash,
    Entity,
    /// `-#` at line start.
    FootnoteMarker,

    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace)
    }
}

/// A single token with its kind, source text and start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub location: SourceLocation,
    /// Length in characters.
    pub length: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, location: SourceLocation) -> Self {
        Self {
            kind,
            text,
            location,
            length: text.chars().count(),
        }
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self::new(TokenKind::Eof, "", location)
    }
}
