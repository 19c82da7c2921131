//! # chatmark-syntax
//!
//! A parser for chat-flavoured Markdown: CommonMark-like blocks and inlines,
//! the chat platform's own entities (mentions, custom emoji, timestamps,
//! spoilers, underline, `-#` footnotes) and the GFM strikethrough and
//! autolink extensions.
//!
//! ## Architecture Overview
//!
//! The parsing pipeline has four stages:
//!
//! ```text
//! Source Text → Lexer → Tokens → Block parser → Tree → GFM pass → Document
//!                                  └─ Inline parser per leaf block
//! ```
//!
//! ### 1. Lexer ([`lexer`] module)
//!
//! A single left-to-right pass turns the message into a flat token stream.
//! The lexer knows about line starts and fenced code, so `>` at the start of
//! a line is a quote marker while `>` mid-sentence is text.
//!
//! ```text
//! "# Hi <@42>" → [AtxHeaderStart, Whitespace, Text("Hi"), Whitespace, UserMention]
//! ```
//!
//! ### 2. Parser ([`parser`] module)
//!
//! The block parser walks the tokens with a [`TokenCursor`] and hands the
//! content of each heading, paragraph and list item to the inline parser.
//! Quotes are re-tokenized and parsed as documents of their own.
//!
//! ### 3. GFM pass ([`gfm`] module)
//!
//! A final tree rewrite finds `~~strikethrough~~`, URLs and email addresses
//! that are still sitting in plain text nodes.
//!
//! ## Module Structure
//!
//! ```text
//! chatmark-syntax/
//! ├── lib.rs         # This file - public API and tree snapshots
//! ├── token.rs       # TokenKind, Token, SourceLocation
//! ├── lexer/         # Tokenizer and angle-bracket entity scanner
//! ├── cursor.rs      # TokenCursor
//! ├── ast.rs         # Node, NodeKind, Document
//! ├── parser/        # MarkdownParser, block and inline grammar, loop guards
//! ├── gfm.rs         # Strikethrough and autolink post-pass
//! ├── references.rs  # Link-reference table
//! ├── config.rs      # ParserConfig and TOML loading
//! └── error.rs       # ParseError
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use chatmark_syntax::{parse, NodeKind};
//!
//! let doc = parse("**hello** <@80351110224678912>").unwrap();
//! let paragraph = &doc.children()[0];
//! assert_eq!(paragraph.kind(), &NodeKind::Paragraph);
//! assert_eq!(
//!     paragraph.children()[2].kind(),
//!     &NodeKind::UserMention { id: "80351110224678912".into() }
//! );
//! ```
//!
//! Malformed markup is never an error. Unclosed delimiters and broken
//! entities come back as text; only the loop guards and the nesting limit
//! can make [`parse`] fail.

pub mod ast;
pub mod config;
pub mod cursor;
pub mod error;
pub mod gfm;
pub mod lexer;
pub mod parser;
pub mod references;
pub mod token;

pub use ast::{Document, Node, NodeKind, TimestampStyle};
pub use config::{ConfigError, ParserConfig};
pub use cursor::TokenCursor;
pub use error::{GuardScope, ParseError};
pub use parser::{MarkdownParser, parse};
pub use references::{LinkReference, LinkReferences};
pub use token::{SourceLocation, Token, TokenKind};

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    /// Helper to format a document tree for snapshot testing.
    fn format_tree(node: &Node, indent: usize, out: &mut Vec<String>) {
        out.push(format!("{}{:?}", "  ".repeat(indent), node.kind()));
        for child in node.children() {
            format_tree(child, indent + 1, out);
        }
    }

    fn tree(input: &str) -> String {
        let doc = parse(input).unwrap();
        let mut lines = Vec::new();
        format_tree(doc.as_node(), 0, &mut lines);
        lines.join("\n")
    }

    #[test]
    fn snapshot_mixed_blocks() {
        assert_snapshot!(tree("# Hello *world*\n\n> quoted\n- item"), @r#"
        Document
          Heading { level: 1 }
            Text { content: "Hello " }
            Italic
              Text { content: "world" }
          BlockQuote
            Paragraph
              Text { content: "quoted" }
          List { ordered: false, start: None, level: 0 }
            ListItem { number: None }
              Paragraph
                Text { content: "item" }
        "#);
    }

    #[test]
    fn snapshot_chat_entities() {
        let input = "hey <@123> ||spoiler <:wave:42>|| at <t:1757847540:R> ~~old~~ https://example.com";
        assert_snapshot!(tree(input), @r#"
        Document
          Paragraph
            Text { content: "hey " }
            UserMention { id: "123" }
            Text { content: " " }
            Spoiler
              Text { content: "spoiler " }
              CustomEmoji { name: "wave", id: "42", animated: false }
            Text { content: " at " }
            Timestamp { date: 1757847540, style: Relative }
            Text { content: " " }
            Strikethrough
              Text { content: "old" }
            Text { content: " " }
            Autolink { url: "https://example.com", text: "https://example.com" }
        "#);
    }

    #[test]
    fn snapshot_code_block_then_text() {
        assert_snapshot!(tree("```rust\nfn main() {}\n```\nafter *it*"), @r#"
        Document
          CodeBlock { content: "fn main() {}", language: Some("rust"), info: Some("rust"), fenced: true }
          LineBreak { hard: false }
          Paragraph
            Text { content: "after " }
            Italic
              Text { content: "it" }
        "#);
    }

    #[test]
    fn snapshot_nested_ordered_list() {
        assert_snapshot!(tree("1. one\n2. two\n   - nested\n3. three"), @r#"
        Document
          List { ordered: true, start: Some(1), level: 0 }
            ListItem { number: Some(1) }
              Paragraph
                Text { content: "one" }
            ListItem { number: Some(2) }
              Paragraph
                Text { content: "two" }
              List { ordered: false, start: None, level: 1 }
                ListItem { number: None }
                  Paragraph
                    Text { content: "nested" }
            ListItem { number: Some(3) }
              Paragraph
                Text { content: "three" }
        "#);
    }

    #[test]
    fn snapshot_broken_markup_degrades_to_text() {
        assert_snapshot!(tree("**no close [text `tick <@>"), @r#"
        Document
          Paragraph
            Text { content: "**no close [text `tick <@>" }
        "#);
    }

    #[test]
    fn snapshot_gfm_in_text() {
        assert_snapshot!(tree("mail me@example.com or ~~not *this*~~"), @r#"
        Document
          Paragraph
            Text { content: "mail " }
            Autolink { url: "mailto:me@example.com", text: "me@example.com" }
            Text { content: " or " }
            Strikethrough
              Text { content: "not " }
              Italic
                Text { content: "this" }
        "#);
    }
}
