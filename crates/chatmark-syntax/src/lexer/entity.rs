//! Fixed-grammar constructs that start with `<`.
//!
//! Mentions, timestamps, custom emoji and angle-bracket autolinks all have a
//! closed syntax, so they are matched by a [Logos] DFA rather than by hand.
//! The tokenizer only asks for a match anchored at the current `<`; anything
//! the DFA rejects falls back to plain text.
//!
//! [Logos]: https://docs.rs/logos

use logos::Logos;

use crate::token::TokenKind;

/// Angle-bracket constructs. Priorities break ties where two patterns could
/// match the same text (a URL containing `@`, for instance).
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AngleKind {
    /// `<@123>`
    #[regex(r"<@[0-9]+>", priority = 20)]
    UserMention,

    /// `<@&123>`
    #[regex(r"<@&[0-9]+>", priority = 20)]
    RoleMention,

    /// `<#123>`
    #[regex(r"<#[0-9]+>", priority = 20)]
    ChannelMention,

    /// `<t:1757847540:R>`, any single style character; validated later.
    #[regex(r"<t:[0-9]+:[^>\s]>", priority = 18)]
    Timestamp,

    /// `<:name:123>` or `<a:name:123>`
    #[regex(r"<a?:[A-Za-z_][A-Za-z0-9_]*:[0-9]+>", priority = 16)]
    CustomEmoji,

    /// `<https://example.com>`
    #[regex(r"<https?://[^\s<>]+>", priority = 14)]
    UrlAutolink,

    /// `<someone@example.com>`
    #[regex(r"<[^@\s<>]+@[^@\s<>]+\.[^@\s<>]+>", priority = 12)]
    EmailAutolink,
}

impl AngleKind {
    pub(crate) fn token_kind(self) -> TokenKind {
        match self {
            AngleKind::UserMention => TokenKind::UserMention,
            AngleKind::RoleMention => TokenKind::RoleMention,
            AngleKind::ChannelMention => TokenKind::ChannelMention,
            AngleKind::Timestamp => TokenKind::Timestamp,
            AngleKind::CustomEmoji => TokenKind::CustomEmoji,
            AngleKind::UrlAutolink | AngleKind::EmailAutolink => TokenKind::Autolink,
        }
    }
}

/// Match an angle-bracket construct at the very start of `rest`.
///
/// Returns the construct and its length in bytes.
pub(crate) fn scan(rest: &str) -> Option<(AngleKind, usize)> {
    let mut lexer = AngleKind::lexer(rest);
    match lexer.next() {
        Some(Ok(kind)) if lexer.span().start == 0 => Some((kind, lexer.span().end)),
        _ => None,
    }
}
