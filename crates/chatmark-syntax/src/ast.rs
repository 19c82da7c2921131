//! # Document tree
//!
//! Parsing produces a tree of [`Node`]s. Every node has a [`NodeKind`] (the
//! closed set of block and inline constructs, with their attributes), an
//! ordered list of children, and an optional [`SourceLocation`].
//!
//! Nodes are built once and then only read: fields are private, and the
//! parser assembles children before it constructs the parent.
//!
//! ```
//! use chatmark_syntax::{parse, NodeKind};
//!
//! let doc = parse("# Hi **there**").unwrap();
//! let heading = &doc.children()[0];
//! assert_eq!(heading.kind(), &NodeKind::Heading { level: 1 });
//! assert_eq!(heading.text_content(), "Hi there");
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::token::SourceLocation;

/// Display style of a `<t:epoch:style>` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimestampStyle {
    /// `R`: "in 2 hours"
    #[serde(rename = "R")]
    Relative,
    /// `t`: 16:20
    #[serde(rename = "t")]
    ShortTime,
    /// `T`: 16:20:30
    #[serde(rename = "T")]
    LongTime,
    /// `d`: 20/04/2021
    #[serde(rename = "d")]
    ShortDate,
    /// `D`: 20 April 2021
    #[serde(rename = "D")]
    LongDate,
    /// `f`: 20 April 2021 16:20
    #[serde(rename = "f")]
    LongDateShortTime,
    /// `F`: Tuesday, 20 April 2021 16:20
    #[serde(rename = "F")]
    FullDateShortTime,
}

impl TimestampStyle {
    pub const ALL: [TimestampStyle; 7] = [
        TimestampStyle::Relative,
        TimestampStyle::ShortTime,
        TimestampStyle::LongTime,
        TimestampStyle::ShortDate,
        TimestampStyle::LongDate,
        TimestampStyle::LongDateShortTime,
        TimestampStyle::FullDateShortTime,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "R" => TimestampStyle::Relative,
            "t" => TimestampStyle::ShortTime,
            "T" => TimestampStyle::LongTime,
            "d" => TimestampStyle::ShortDate,
            "D" => TimestampStyle::LongDate,
            "f" => TimestampStyle::LongDateShortTime,
            "F" => TimestampStyle::FullDateShortTime,
            _ => return None,
        })
    }

    pub fn code(self) -> char {
        match self {
            TimestampStyle::Relative => 'R',
            TimestampStyle::ShortTime => 't',
            TimestampStyle::LongTime => 'T',
            TimestampStyle::ShortDate => 'd',
            TimestampStyle::LongDate => 'D',
            TimestampStyle::LongDateShortTime => 'f',
            TimestampStyle::FullDateShortTime => 'F',
        }
    }
}

/// What a node is, with the attributes that kind carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    // Blocks
    Document,
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    List {
        ordered: bool,
        start: Option<u64>,
        level: usize,
    },
    ListItem {
        number: Option<u64>,
    },
    CodeBlock {
        content: String,
        language: Option<String>,
        info: Option<String>,
        fenced: bool,
    },
    /// `-# small text`
    Footnote,

    // Inlines
    Text {
        content: String,
    },
    Italic,
    Bold,
    Underline,
    Spoiler,
    Strikethrough,
    Link {
        url: String,
        title: Option<String>,
    },
    Autolink {
        url: String,
        text: String,
    },
    CodeSpan {
        content: String,
    },
    LineBreak {
        hard: bool,
    },
    CustomEmoji {
        name: String,
        id: String,
        animated: bool,
    },
    UserMention {
        id: String,
    },
    RoleMention {
        id: String,
    },
    ChannelMention {
        id: String,
    },
    EveryoneMention,
    HereMention,
    Timestamp {
        /// Seconds since the Unix epoch.
        date: i64,
        style: TimestampStyle,
    },
}

impl NodeKind {
    pub fn is_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Document
                | NodeKind::Paragraph
                | NodeKind::Heading { .. }
                | NodeKind::BlockQuote
                | NodeKind::List { .. }
                | NodeKind::ListItem { .. }
                | NodeKind::CodeBlock { .. }
                | NodeKind::Footnote
        )
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// Short lowercase tag, matching the serialized `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::List { .. } => "list",
            NodeKind::ListItem { .. } => "list_item",
            NodeKind::CodeBlock { .. } => "code_block",
            NodeKind::Footnote => "footnote",
            NodeKind::Text { .. } => "text",
            NodeKind::Italic => "italic",
            NodeKind::Bold => "bold",
            NodeKind::Underline => "underline",
            NodeKind::Spoiler => "spoiler",
            NodeKind::Strikethrough => "strikethrough",
            NodeKind::Link { .. } => "link",
            NodeKind::Autolink { .. } => "autolink",
            NodeKind::CodeSpan { .. } => "code_span",
            NodeKind::LineBreak { .. } => "line_break",
            NodeKind::CustomEmoji { .. } => "custom_emoji",
            NodeKind::UserMention { .. } => "user_mention",
            NodeKind::RoleMention { .. } => "role_mention",
            NodeKind::ChannelMention { .. } => "channel_mention",
            NodeKind::EveryoneMention => "everyone_mention",
            NodeKind::HereMention => "here_mention",
            NodeKind::Timestamp { .. } => "timestamp",
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<SourceLocation>,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            location: None,
        }
    }

    pub fn leaf(kind: NodeKind) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn from_parts(
        kind: NodeKind,
        children: Vec<Node>,
        location: Option<SourceLocation>,
    ) -> Self {
        Self {
            kind,
            children,
            location,
        }
    }

    /// Attach a location.
    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    pub fn into_parts(self) -> (NodeKind, Vec<Node>, Option<SourceLocation>) {
        (self.kind, self.children, self.location)
    }

    /// Items of a list node; empty for anything else.
    pub fn items(&self) -> &[Node] {
        match self.kind {
            NodeKind::List { .. } => &self.children,
            _ => &[],
        }
    }

    /// The literal text under this node, with line breaks as `\n`.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { content }
            | NodeKind::CodeSpan { content }
            | NodeKind::CodeBlock { content, .. } => out.push_str(content),
            NodeKind::Autolink { text, .. } => out.push_str(text),
            NodeKind::LineBreak { .. } => out.push('\n'),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Rebuild the tree, replacing the content of every Text node.
    pub fn map_text(self, f: &impl Fn(&str) -> String) -> Node {
        let (kind, children, location) = self.into_parts();
        let kind = match kind {
            NodeKind::Text { content } => NodeKind::Text {
                content: f(&content),
            },
            other => other,
        };
        let children = children.into_iter().map(|c| c.map_text(f)).collect();
        Node::from_parts(kind, children, location)
    }

    // Shorthand constructors

    pub fn document(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Document, children)
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph, children)
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Heading { level }, children)
    }

    pub fn block_quote(children: Vec<Node>) -> Self {
        Self::new(NodeKind::BlockQuote, children)
    }

    pub fn footnote(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Footnote, children)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Text {
            content: content.into(),
        })
    }

    pub fn italic(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Italic, children)
    }

    pub fn bold(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Bold, children)
    }

    pub fn underline(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Underline, children)
    }

    pub fn spoiler(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Spoiler, children)
    }

    pub fn strikethrough(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Strikethrough, children)
    }

    pub fn link(url: impl Into<String>, title: Option<String>, children: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Link {
                url: url.into(),
                title,
            },
            children,
        )
    }

    pub fn autolink(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Autolink {
            url: url.into(),
            text: text.into(),
        })
    }

    pub fn code_span(content: impl Into<String>) -> Self {
        Self::leaf(NodeKind::CodeSpan {
            content: content.into(),
        })
    }

    pub fn soft_break() -> Self {
        Self::leaf(NodeKind::LineBreak { hard: false })
    }
}

/// The root of a parsed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Document {
    root: Node,
}

impl TryFrom<Node> for Document {
    type Error = ParseError;

    fn try_from(root: Node) -> Result<Self, Self::Error> {
        match root.kind() {
            NodeKind::Document => Ok(Self { root }),
            _ => Err(ParseError::NotADocument),
        }
    }
}

static EMOJI_TEXT: OnceLock<Regex> = OnceLock::new();

fn emoji_text() -> &'static Regex {
    EMOJI_TEXT.get_or_init(|| {
        Regex::new(
            r"^[\p{Extended_Pictographic}\p{Emoji_Presentation}\p{Emoji_Modifier}\p{Regional_Indicator}\u{200D}\u{FE0F}\u{20E3}\s]*$",
        )
        .expect("emoji regex should compile")
    })
}

impl Document {
    pub fn children(&self) -> &[Node] {
        self.root.children()
    }

    pub fn as_node(&self) -> &Node {
        &self.root
    }

    pub fn into_node(self) -> Node {
        self.root
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    /// Whether the message is nothing but emoji, so a client can render it
    /// large. Empty documents are not.
    pub fn is_emojis_only(&self) -> bool {
        if self.children().is_empty() {
            return false;
        }
        let mut seen_emoji = false;
        for block in self.children() {
            if block.kind() != &NodeKind::Paragraph {
                return false;
            }
            for inline in block.children() {
                match inline.kind() {
                    NodeKind::CustomEmoji { .. } => seen_emoji = true,
                    NodeKind::LineBreak { .. } => {}
                    NodeKind::Text { content } if emoji_text().is_match(content) => {
                        seen_emoji |= !content.trim().is_empty();
                    }
                    _ => return false,
                }
            }
        }
        seen_emoji
    }
}
