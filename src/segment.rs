// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Splitting message text into ordered text and code segments.
//!
//! Fenced code blocks are located in a message, cut out and replaced with
//! `[CODE_BLOCK_<id>]` placeholder tokens. The placeholder-bearing text is
//! then walked again to produce an ordered list of [`Segment`]s, which is
//! what the renderer lays out.
//!
//! Identifiers come from an [`Extractor`], which is created once per
//! request so identifiers never leak from one record into the next.
//!
//! ```
//! use cp2pdf::segment::{Extractor, Segment, reassemble};
//!
//! let mut extractor = Extractor::new();
//! let extraction = extractor.extract("before ```py\nprint(1)\n``` after");
//! assert_eq!(extraction.text, "before [CODE_BLOCK_0] after");
//!
//! let segments = reassemble(&extraction.text, extraction.blocks);
//! assert_eq!(segments.len(), 3);
//! assert!(matches!(&segments[1], Segment::Code(block) if block.code == "print(1)"));
//! ```

use crate::parser::{MetadataCodeBlock, Request, ResponseElement};
use regex::Regex;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)\n```").expect("fence pattern is valid"));

/// Where a [`CodeBlock`] came from.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOrigin {
    /// Found as a fenced region in message text.
    Inline {
        /// Byte range of the whole fenced region (fences included) in the source text.
        span: Range<usize>,
        /// Byte range of the block's placeholder in the extracted text.
        placeholder: Range<usize>,
    },
    /// Listed in the request's result metadata.
    Metadata {
        /// Markdown that preceded the block in the original response.
        markdown_before: Option<String>,
        /// The resource the block belongs to, uninterpreted.
        resource: Option<serde_json::Value>,
    },
}

/// A code block pulled out of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Identifier, unique within one request.
    pub id: usize,
    /// Language tag; empty when the fence had none.
    pub language: String,
    /// The code, verbatim.
    pub code: String,
    /// Where the block was found.
    pub origin: BlockOrigin,
}

/// One renderable unit of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Prose. May be empty or blank; such segments are not rendered.
    Text(String),
    /// A code block, rendered verbatim.
    Code(CodeBlock),
}

impl Segment {
    /// Returns `true` for text segments with nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

/// The result of extracting fenced blocks from a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The source text with each fenced region replaced by its placeholder.
    pub text: String,
    /// The extracted blocks, in source order.
    pub blocks: Vec<CodeBlock>,
}

/// Hands out code block identifiers for a single request.
#[derive(Debug, Default)]
pub struct Extractor {
    next_id: usize,
}

impl Extractor {
    /// Creates an extractor whose first identifier is 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next_id: 0 }
    }

    const fn allocate(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Finds fenced code blocks in `text` and replaces each with a placeholder.
    ///
    /// A fence is three backticks, an optional word-character language tag,
    /// a line break, then everything up to the next `\n` + three backticks.
    /// Matches never overlap. An opening fence with no closing fence is left
    /// in the text untouched.
    pub fn extract(&mut self, text: &str) -> Extraction {
        let mut substituted = String::with_capacity(text.len());
        let mut blocks = Vec::new();
        let mut cursor = 0;

        for caps in FENCE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            let id = self.allocate();

            substituted.push_str(&text[cursor..whole.start()]);
            let token_start = substituted.len();
            substituted.push_str(&placeholder(id));

            blocks.push(CodeBlock {
                id,
                language: caps.get(1).map_or("", |m| m.as_str()).to_owned(),
                code: caps.get(2).map_or("", |m| m.as_str()).to_owned(),
                origin: BlockOrigin::Inline {
                    span: whole.range(),
                    placeholder: token_start..substituted.len(),
                },
            });
            cursor = whole.end();
        }
        substituted.push_str(&text[cursor..]);

        Extraction {
            text: substituted,
            blocks,
        }
    }

    /// Converts metadata code blocks into [`CodeBlock`]s with fresh identifiers.
    pub fn metadata_blocks(&mut self, blocks: &[MetadataCodeBlock]) -> Vec<CodeBlock> {
        blocks
            .iter()
            .map(|block| CodeBlock {
                id: self.allocate(),
                language: block.language.clone(),
                code: block.code.clone(),
                origin: BlockOrigin::Metadata {
                    markdown_before: block.markdown_before_block.clone(),
                    resource: block.resource.clone(),
                },
            })
            .collect()
    }
}

/// Returns the placeholder token for a block identifier.
#[must_use]
pub fn placeholder(id: usize) -> String {
    format!("[CODE_BLOCK_{id}]")
}

/// Returns where `block`'s placeholder sits in `text`, if it is still there.
fn token_range(block: &CodeBlock, text: &str) -> Option<Range<usize>> {
    let BlockOrigin::Inline { placeholder: range, .. } = &block.origin else {
        return None;
    };
    (text.get(range.clone()) == Some(placeholder(block.id).as_str())).then(|| range.clone())
}

/// Walks placeholder-bearing text and yields text and code segments in order.
///
/// Each block is resolved only at the position its placeholder was inserted,
/// so `[CODE_BLOCK_n]` tokens that were already part of the source, or that
/// name no block, stay in the text literally. Text without any resolved
/// placeholder comes back as a single text segment, even when empty. Blocks
/// that cannot be placed follow the text as code segments in identifier
/// order.
#[must_use]
pub fn reassemble(text: &str, blocks: Vec<CodeBlock>) -> Vec<Segment> {
    let mut located = Vec::new();
    let mut unplaced = Vec::new();
    for block in blocks {
        match token_range(&block, text) {
            Some(range) => located.push((range, block)),
            None => unplaced.push(block),
        }
    }
    located.sort_by_key(|(range, _)| range.start);

    let mut segments = Vec::new();
    let mut cursor = 0;
    for (range, block) in located {
        if range.start < cursor {
            unplaced.push(block);
            continue;
        }
        if range.start > cursor {
            segments.push(Segment::Text(text[cursor..range.start].to_owned()));
        }
        segments.push(Segment::Code(block));
        cursor = range.end;
    }

    if cursor < text.len() || segments.is_empty() {
        segments.push(Segment::Text(text[cursor..].to_owned()));
    }

    if !unplaced.is_empty() {
        log::debug!("{} code block(s) without a placeholder position", unplaced.len());
        unplaced.sort_by_key(|block| block.id);
        segments.extend(unplaced.into_iter().map(Segment::Code));
    }

    segments
}

/// Splits a message into segments using the request's extractor.
pub fn message_segments(text: &str, extractor: &mut Extractor) -> Vec<Segment> {
    let extraction = extractor.extract(text);
    reassemble(&extraction.text, extraction.blocks)
}

/// Joins a response's fragments into the text that gets segmented.
///
/// Text fragments are concatenated as-is, so fences split across fragments
/// join up again. Inline references become inline code spans. Everything
/// else contributes no text.
#[must_use]
pub fn response_text(elements: &[ResponseElement]) -> String {
    let mut text = String::new();
    for elem in elements {
        match elem {
            ResponseElement::Text(value) => text.push_str(value),
            ResponseElement::InlineReference { name, path } => {
                let display = name
                    .as_deref()
                    .or_else(|| Path::new(path).file_name()?.to_str())
                    .unwrap_or(path);
                text.push('`');
                text.push_str(&display.replace('`', "'"));
                text.push('`');
            }
            _ => {}
        }
    }
    text
}

/// Produces the response segments for a request.
///
/// Inline text wins: metadata code blocks are only used when the response
/// has no text at all, and then each becomes a code segment in listed order.
/// A request with neither yields no segments.
pub fn response_segments(request: &Request, extractor: &mut Extractor) -> Vec<Segment> {
    let text = response_text(&request.response);
    if text.trim().is_empty() {
        if !request.code_blocks.is_empty() {
            log::debug!(
                "response has no text, using {} metadata code block(s)",
                request.code_blocks.len()
            );
        }
        return extractor
            .metadata_blocks(&request.code_blocks)
            .into_iter()
            .map(Segment::Code)
            .collect();
    }
    message_segments(&text, extractor)
}
