//! # Parser - From Tokens to a Document Tree
//!
//! Parsing runs in three stages over one token stream:
//!
//! ```text
//! Source → Tokenizer → Tokens → BlockParser → tree → GFM pass → Document
//!                                    │
//!                                    └─ InlineParser for each line of content
//! ```
//!
//! ## Block parsing
//!
//! [`block`] walks the stream line by line and decides what each block is:
//! heading, footnote, quote, list, code block, or paragraph. Block quotes
//! rebuild their text and parse it again as a fresh document one level
//! deeper.
//!
//! ## Inline parsing
//!
//! [`inline`] turns a bounded run of tokens into inline nodes. Constructs
//! that contain other inlines (emphasis, strikethrough, spoilers, link text)
//! find their closing delimiter first and then parse the tokens in between
//! through a sub-cursor, so every recursion has a fixed token range.
//!
//! ## Guards
//!
//! Both loops run under a [`guard::LoopGuard`], and every nested sub-parse
//! counts against [`ParserConfig::max_nesting_depth`]. Pathological input
//! ends in a [`ParseError`] instead of a hang or a stack overflow.
//!
//! ```
//! use chatmark_syntax::{MarkdownParser, ParserConfig};
//!
//! let parser = MarkdownParser::new(ParserConfig::default());
//! let doc = parser.parse("||spoiler|| for <@123>").unwrap();
//! assert_eq!(doc.children().len(), 1);
//! ```

pub(crate) mod block;
pub(crate) mod guard;
pub(crate) mod inline;

use std::time::Instant;

use crate::ast::{Document, Node};
use crate::config::ParserConfig;
use crate::cursor::TokenCursor;
use crate::error::ParseError;
use crate::gfm;
use crate::lexer::tokenize;
use crate::references::LinkReferences;
use crate::token::SourceLocation;

use block::BlockParser;
use inline::InlineParser;

/// Settings shared by every block and inline parser of one run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'p> {
    pub(crate) config: &'p ParserConfig,
    pub(crate) references: &'p LinkReferences,
}

impl<'p> Context<'p> {
    /// The location to store on a node, if locations are tracked.
    pub(crate) fn locate(&self, location: SourceLocation) -> Option<SourceLocation> {
        self.config.track_source_locations.then_some(location)
    }

    /// Depth of a sub-parse started from `depth`.
    pub(crate) fn descend(&self, depth: usize) -> Result<usize, ParseError> {
        let next = depth + 1;
        let max = self.config.max_nesting_depth;
        if max > 0 && next > max {
            log::warn!("nesting depth {next} exceeds the maximum of {max}");
            return Err(ParseError::NestingTooDeep { depth: next });
        }
        Ok(next)
    }
}

/// Entry point holding configuration and the link-reference table.
#[derive(Debug, Clone, Default)]
pub struct MarkdownParser {
    config: ParserConfig,
    references: LinkReferences,
}

impl MarkdownParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            references: LinkReferences::default(),
        }
    }

    pub fn with_references(mut self, references: LinkReferences) -> Self {
        self.references = references;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn context(&self) -> Context<'_> {
        Context {
            config: &self.config,
            references: &self.references,
        }
    }

    /// Parse a complete message.
    pub fn parse(&self, markdown: &str) -> Result<Document, ParseError> {
        let started = Instant::now();
        let tokens = tokenize(markdown);
        let root = BlockParser::new(&tokens, self.context(), 0).parse_document()?;
        let root = gfm::enhance(root);
        let document = Document::try_from(root)?;
        log::debug!(
            "parsed {} bytes into {} blocks in {:?}",
            markdown.len(),
            document.children().len(),
            started.elapsed()
        );
        Ok(document)
    }

    /// Parse `text` as inline content only. Line breaks become soft breaks.
    pub fn parse_inline(&self, text: &str) -> Result<Vec<Node>, ParseError> {
        let tokens = tokenize(text);
        let mut cursor = TokenCursor::new(&tokens);
        InlineParser::new(self.context(), 0).parse_inlines(&mut cursor, &[])
    }
}

/// Parse a message with the default configuration.
pub fn parse(markdown: &str) -> Result<Document, ParseError> {
    MarkdownParser::default().parse(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::references::LinkReference;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input_is_empty_document() {
        let doc = parse("").unwrap();
        assert!(doc.children().is_empty());
        assert_eq!(doc.as_node().kind(), &NodeKind::Document);
    }

    #[test]
    fn test_locations_are_opt_in() {
        let plain = parse("hi").unwrap();
        assert_eq!(plain.children()[0].location(), None);

        let parser = MarkdownParser::new(ParserConfig {
            track_source_locations: true,
            ..ParserConfig::default()
        });
        let doc = parser.parse("a\n\n# b").unwrap();
        let heading = &doc.children()[1];
        assert_eq!(
            heading.location(),
            Some(SourceLocation {
                line: 3,
                column: 1,
                offset: 3
            })
        );
        assert_eq!(
            heading.children()[0].location(),
            Some(SourceLocation {
                line: 3,
                column: 3,
                offset: 5
            })
        );
    }

    #[test]
    fn test_parse_inline_keeps_line_breaks_soft() {
        let nodes = MarkdownParser::default().parse_inline("a\nb").unwrap();
        assert_eq!(
            nodes,
            vec![Node::text("a"), Node::soft_break(), Node::text("b")]
        );
    }

    #[test]
    fn test_references_flow_into_links() {
        let parser = MarkdownParser::default().with_references(
            [("docs", LinkReference::new("https://docs.example"))]
                .into_iter()
                .collect(),
        );
        let doc = parser.parse("see [Docs]").unwrap();
        assert_eq!(
            doc.children()[0],
            Node::paragraph(vec![
                Node::text("see "),
                Node::link("https://docs.example", None, vec![Node::text("Docs")]),
            ])
        );
    }

    #[test]
    fn test_nesting_limit_is_enforced() {
        let parser = MarkdownParser::new(ParserConfig {
            max_nesting_depth: 2,
            ..ParserConfig::default()
        });
        assert!(parser.parse("**a**").is_ok());
        assert_eq!(
            parser.parse("> > > deep").ok().map(|d| d.children().len()),
            Some(1)
        );
        assert_eq!(
            parser.parse("||**_x_**||"),
            Err(ParseError::NestingTooDeep { depth: 3 })
        );
    }

    #[test]
    fn test_zero_nesting_limit_disables_check() {
        let parser = MarkdownParser::new(ParserConfig {
            max_nesting_depth: 0,
            ..ParserConfig::default()
        });
        let input = format!("{}x", ">>> ".repeat(150));
        let doc = parser.parse(&input).unwrap();

        let mut depth = 0;
        let mut node = doc.as_node();
        while let Some(child) = node.children().first() {
            if child.kind() == &NodeKind::BlockQuote {
                depth += 1;
            }
            node = child;
        }
        assert_eq!(depth, 150);
    }
}
