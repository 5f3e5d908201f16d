// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Turns a parsed chat export into an ordered story of layout blocks.
//!
//! The story is what the [`pdf`](crate::pdf) module paginates. Building it is
//! kept separate from layout so the document structure can be tested
//! without decoding PDF output.
//!
//! # Output Structure
//!
//! - An optional title page, followed by a page break
//! - For each request: a `Message N` header, the user's message, the
//!   assistant's response (prose paragraphs and code blocks in source
//!   order), and optional tool and edit summaries
//! - A page break after every few requests
//!
//! # Example
//!
//! ```
//! use cp2pdf::parser::{ChatExport, Message, Request, ResponseElement};
//! use cp2pdf::renderer::{Block, RenderOptions, render_chat};
//!
//! let chat = ChatExport {
//!     requester_username: Some("octocat".into()),
//!     responder_username: None,
//!     requests: vec![Request {
//!         timestamp: None,
//!         model_id: None,
//!         message: Message { text: "Hello!".into() },
//!         response: vec![ResponseElement::Text("```rust\nfn main() {}\n```".into())],
//!         code_blocks: Vec::new(),
//!     }],
//! };
//!
//! let story = render_chat(&chat, &RenderOptions::default());
//! assert!(story.iter().any(|b| matches!(b, Block::Code { code, .. } if code == "fn main() {}")));
//! ```

use crate::markup::{escape, to_markup};
use crate::parser::{ChatExport, Request, ResponseElement};
use crate::segment::{Extractor, Segment, message_segments, response_segments};
use chrono::{DateTime, Local, NaiveDate};
use std::path::Path;

/// Paragraph styles used by the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Title page heading.
    Title,
    /// Title page detail lines.
    Subtitle,
    /// `Message N` header above each request.
    ChatHeader,
    /// Small grey detail lines (model, tools, edits).
    Metadata,
    /// The user's prose.
    UserMessage,
    /// The assistant's prose.
    AssistantMessage,
}

/// One unit of the story.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// A paragraph of markup in the given style.
    Paragraph {
        /// Paragraph style.
        style: Style,
        /// Content in the markup dialect (see [`crate::markup`]).
        markup: String,
    },
    /// A code block, drawn verbatim in a monospace box.
    Code {
        /// Language label; empty for none.
        language: String,
        /// The code text.
        code: String,
    },
    /// Vertical space in points.
    Spacer(f32),
    /// Start a new page.
    PageBreak,
}

/// Configuration options for building the story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append the request time to each `Message N` header.
    pub show_timestamps: bool,

    /// Show the model identifier under each header.
    pub show_model: bool,

    /// Include tool invocation summaries.
    pub show_tools: bool,

    /// Start the document with a title page.
    pub title_page: bool,

    /// Insert a page break after this many requests. Zero disables it.
    pub requests_per_page: usize,

    /// Date printed as the export date on the title page.
    pub exported_on: NaiveDate,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            show_model: false,
            show_tools: false,
            title_page: true,
            requests_per_page: 3,
            exported_on: Local::now().date_naive(),
        }
    }
}

/// Builds the story for a parsed chat export.
///
/// Each request gets a fresh [`Extractor`], so code block identifiers are
/// scoped to the request they came from.
#[must_use]
pub fn render_chat(chat: &ChatExport, opts: &RenderOptions) -> Vec<Block> {
    let mut story = Vec::new();

    if opts.title_page {
        render_title_page(&mut story, chat, opts);
    }

    let total = chat.requests.len();
    for (i, request) in chat.requests.iter().enumerate() {
        render_request(&mut story, i + 1, request, opts);

        story.push(Block::Spacer(20.0));
        let per_page = opts.requests_per_page;
        if per_page > 0 && (i + 1) % per_page == 0 && i + 1 < total {
            story.push(Block::PageBreak);
        }
    }

    story
}

fn paragraph(style: Style, markup: String) -> Block {
    Block::Paragraph { style, markup }
}

fn render_title_page(story: &mut Vec<Block>, chat: &ChatExport, opts: &RenderOptions) {
    let requester = chat
        .requester_username
        .as_deref()
        .unwrap_or("Unknown User");

    story.push(Block::Spacer(144.0));
    story.push(paragraph(Style::Title, "GitHub Copilot Chat Export".into()));
    story.push(paragraph(
        Style::Subtitle,
        format!("Conversation with {}", escape(requester)),
    ));
    if let Some(responder) = &chat.responder_username {
        story.push(paragraph(
            Style::Subtitle,
            format!("Assistant: {}", escape(responder)),
        ));
    }
    story.push(paragraph(
        Style::Subtitle,
        format!("Exported on {}", opts.exported_on.format("%B %d, %Y")),
    ));
    story.push(paragraph(
        Style::Subtitle,
        format!("Total messages: {}", chat.requests.len()),
    ));
    story.push(Block::PageBreak);
}

fn render_request(story: &mut Vec<Block>, number: usize, req: &Request, opts: &RenderOptions) {
    let timestamp = req
        .timestamp
        .filter(|_| opts.show_timestamps)
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    let header = match timestamp {
        Some(ts) => format!("Message {number} - {ts}"),
        None => format!("Message {number}"),
    };
    story.push(paragraph(Style::ChatHeader, header));

    if opts.show_model
        && let Some(model) = &req.model_id
    {
        story.push(paragraph(Style::Metadata, format!("Model: {}", escape(model))));
    }

    let mut extractor = Extractor::new();

    if !req.message.text.is_empty() {
        let segments = message_segments(&req.message.text, &mut extractor);
        render_segments(story, &segments, Style::UserMessage, "User:");
        story.push(Block::Spacer(6.0));
    }

    if opts.show_tools {
        render_tool_invocations(story, &req.response);
    }

    let segments = response_segments(req, &mut extractor);
    log::debug!(
        "message {number}: {} response segment(s), {} code",
        segments.len(),
        segments
            .iter()
            .filter(|s| matches!(s, Segment::Code(_)))
            .count()
    );
    render_segments(story, &segments, Style::AssistantMessage, "Assistant:");
    render_edit_summaries(story, &req.response);
}

/// Emits paragraphs and code blocks for segments, skipping blank ones.
///
/// The first prose paragraph is prefixed with a bold `label`.
fn render_segments(story: &mut Vec<Block>, segments: &[Segment], style: Style, label: &str) {
    let mut labelled = false;
    for segment in segments {
        if segment.is_blank() {
            continue;
        }
        match segment {
            Segment::Text(text) => {
                let body = to_markup(text.trim());
                let markup = if labelled {
                    body
                } else {
                    labelled = true;
                    format!("<b>{label}</b> {body}")
                };
                story.push(paragraph(style, markup));
            }
            Segment::Code(block) => {
                if block.code.trim().is_empty() {
                    continue;
                }
                story.push(Block::Code {
                    language: block.language.clone(),
                    code: block.code.clone(),
                });
            }
        }
    }
}

fn render_tool_invocations(story: &mut Vec<Block>, elements: &[ResponseElement]) {
    for elem in elements {
        if let ResponseElement::ToolInvocation {
            past_tense: Some(msg),
        } = elem
        {
            story.push(paragraph(Style::Metadata, format!("Tool: {}", to_markup(msg))));
        }
    }
}

fn render_edit_summaries(story: &mut Vec<Block>, elements: &[ResponseElement]) {
    for elem in elements {
        if let ResponseElement::TextEditGroup { path, edits } = elem
            && !edits.is_empty()
        {
            let filename = Path::new(path)
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or(path);
            let line_count: usize = edits.iter().map(|e| e.lines().count()).sum();
            story.push(paragraph(
                Style::Metadata,
                format!(
                    r#"Modified <font name="Courier">{}</font> ({line_count} lines)"#,
                    escape(filename)
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Message, MetadataCodeBlock};

    fn make_chat(requests: Vec<Request>) -> ChatExport {
        ChatExport {
            requester_username: Some("octocat".into()),
            responder_username: Some("GitHub Copilot".into()),
            requests,
        }
    }

    fn make_request(message: &str, response: Vec<ResponseElement>) -> Request {
        Request {
            timestamp: Some(1_733_356_800_000), // 2024-12-05 00:00:00 UTC
            model_id: Some("claude-sonnet-4".into()),
            message: Message {
                text: message.into(),
            },
            response,
            code_blocks: Vec::new(),
        }
    }

    fn opts() -> RenderOptions {
        RenderOptions {
            title_page: false,
            exported_on: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            ..Default::default()
        }
    }

    fn paragraphs(story: &[Block], style: Style) -> Vec<&str> {
        story
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph { style: s, markup } if *s == style => Some(markup.as_str()),
                _ => None,
            })
            .collect()
    }

    fn code_blocks(story: &[Block]) -> Vec<(&str, &str)> {
        story
            .iter()
            .filter_map(|b| match b {
                Block::Code { language, code } => Some((language.as_str(), code.as_str())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn renders_title_page() {
        let chat = make_chat(vec![make_request("Hi", vec![])]);
        let story = render_chat(
            &chat,
            &RenderOptions {
                title_page: true,
                ..opts()
            },
        );

        assert_eq!(story[0], Block::Spacer(144.0));
        assert_eq!(paragraphs(&story, Style::Title), vec!["GitHub Copilot Chat Export"]);
        assert_eq!(
            paragraphs(&story, Style::Subtitle),
            vec![
                "Conversation with octocat",
                "Assistant: GitHub Copilot",
                "Exported on January 15, 2025",
                "Total messages: 1"
            ]
        );
        assert_eq!(story[6], Block::PageBreak);
    }

    #[test]
    fn title_page_defaults_unknown_requester() {
        let mut chat = make_chat(vec![]);
        chat.requester_username = None;
        let story = render_chat(
            &chat,
            &RenderOptions {
                title_page: true,
                ..opts()
            },
        );

        assert!(paragraphs(&story, Style::Subtitle).contains(&"Conversation with Unknown User"));
    }

    #[test]
    fn title_page_omits_missing_responder() {
        let mut chat = make_chat(vec![]);
        chat.responder_username = None;
        let story = render_chat(
            &chat,
            &RenderOptions {
                title_page: true,
                ..opts()
            },
        );

        assert!(
            !paragraphs(&story, Style::Subtitle)
                .iter()
                .any(|p| p.starts_with("Assistant:"))
        );
    }

    #[test]
    fn renders_header_with_timestamp() {
        let chat = make_chat(vec![make_request("Hi", vec![])]);
        let story = render_chat(&chat, &opts());

        assert_eq!(
            paragraphs(&story, Style::ChatHeader),
            vec!["Message 1 - 2024-12-05 00:00:00 UTC"]
        );
    }

    #[test]
    fn hides_timestamp_when_disabled_or_missing() {
        let mut without = make_request("Hi", vec![]);
        without.timestamp = None;
        let chat = make_chat(vec![make_request("Hi", vec![]), without]);
        let story = render_chat(
            &chat,
            &RenderOptions {
                show_timestamps: false,
                ..opts()
            },
        );

        assert_eq!(
            paragraphs(&story, Style::ChatHeader),
            vec!["Message 1", "Message 2"]
        );
    }

    #[test]
    fn shows_model_only_when_enabled() {
        let chat = make_chat(vec![make_request("Hi", vec![])]);

        assert!(paragraphs(&render_chat(&chat, &opts()), Style::Metadata).is_empty());

        let story = render_chat(
            &chat,
            &RenderOptions {
                show_model: true,
                ..opts()
            },
        );
        assert_eq!(paragraphs(&story, Style::Metadata), vec!["Model: claude-sonnet-4"]);
    }

    #[test]
    fn labels_user_and_assistant_messages() {
        let chat = make_chat(vec![make_request(
            "What is **Rust**?",
            vec![ResponseElement::Text("A language.".into())],
        )]);
        let story = render_chat(&chat, &opts());

        assert_eq!(
            paragraphs(&story, Style::UserMessage),
            vec!["<b>User:</b> What is <b>Rust</b>?"]
        );
        assert_eq!(
            paragraphs(&story, Style::AssistantMessage),
            vec!["<b>Assistant:</b> A language."]
        );
    }

    #[test]
    fn interleaves_prose_and_code_in_order() {
        let chat = make_chat(vec![make_request(
            "Show me",
            vec![ResponseElement::Text(
                "before ```py\nprint(1)\n``` after".into(),
            )],
        )]);
        let story = render_chat(&chat, &opts());

        let response: Vec<&Block> = story
            .iter()
            .skip_while(|b| !matches!(b, Block::Paragraph { style: Style::AssistantMessage, .. }))
            .take(3)
            .collect();
        assert_eq!(
            response,
            vec![
                &paragraph(Style::AssistantMessage, "<b>Assistant:</b> before".into()),
                &Block::Code {
                    language: "py".into(),
                    code: "print(1)".into()
                },
                &paragraph(Style::AssistantMessage, "after".into()),
            ]
        );
    }

    #[test]
    fn code_is_not_escaped_or_styled() {
        let chat = make_chat(vec![make_request(
            "Hi",
            vec![ResponseElement::Text("```html\n<b>**x**</b> & y\n```".into())],
        )]);
        let story = render_chat(&chat, &opts());

        assert_eq!(code_blocks(&story), vec![("html", "<b>**x**</b> & y")]);
    }

    #[test]
    fn renders_code_in_user_message() {
        let chat = make_chat(vec![make_request("Fix:\n```\nls\n```", vec![])]);
        let story = render_chat(&chat, &opts());

        assert_eq!(code_blocks(&story), vec![("", "ls")]);
        assert_eq!(paragraphs(&story, Style::UserMessage), vec!["<b>User:</b> Fix:"]);
    }

    #[test]
    fn empty_response_renders_no_assistant_blocks() {
        let chat = make_chat(vec![make_request("Still here", vec![])]);
        let story = render_chat(&chat, &opts());

        assert!(paragraphs(&story, Style::AssistantMessage).is_empty());
        assert!(code_blocks(&story).is_empty());
        assert_eq!(
            paragraphs(&story, Style::UserMessage),
            vec!["<b>User:</b> Still here"]
        );
    }

    #[test]
    fn falls_back_to_metadata_code_blocks() {
        let mut request = make_request("Run it", vec![]);
        request.code_blocks = vec![
            MetadataCodeBlock {
                code: "cargo test".into(),
                language: "sh".into(),
                markdown_before_block: None,
                resource: None,
            },
            MetadataCodeBlock {
                code: "cargo run".into(),
                language: "sh".into(),
                markdown_before_block: Some("Then:".into()),
                resource: None,
            },
        ];
        let story = render_chat(&make_chat(vec![request]), &opts());

        assert_eq!(
            code_blocks(&story),
            vec![("sh", "cargo test"), ("sh", "cargo run")]
        );
        assert!(paragraphs(&story, Style::AssistantMessage).is_empty());
    }

    #[test]
    fn skips_blank_code_blocks() {
        let chat = make_chat(vec![make_request(
            "Hi",
            vec![ResponseElement::Text("text\n```\n   \n```".into())],
        )]);
        let story = render_chat(&chat, &opts());

        assert!(code_blocks(&story).is_empty());
    }

    #[test]
    fn skips_blank_text_between_code_blocks() {
        let chat = make_chat(vec![make_request(
            "Hi",
            vec![ResponseElement::Text("```a\nx\n```\n  \n```b\ny\n```\nafter".into())],
        )]);
        let story = render_chat(&chat, &opts());

        assert_eq!(code_blocks(&story), vec![("a", "x"), ("b", "y")]);
        assert_eq!(
            paragraphs(&story, Style::AssistantMessage),
            vec!["<b>Assistant:</b> after"]
        );
    }

    #[test]
    fn renders_inline_reference_as_code_span() {
        let chat = make_chat(vec![make_request(
            "Check",
            vec![
                ResponseElement::Text("See ".into()),
                ResponseElement::InlineReference {
                    name: None,
                    path: "/some/deep/path/to/file.rs".into(),
                },
            ],
        )]);
        let story = render_chat(&chat, &opts());

        assert_eq!(
            paragraphs(&story, Style::AssistantMessage),
            vec![r#"<b>Assistant:</b> See <font name="Courier">file.rs</font>"#]
        );
    }

    #[test]
    fn shows_tool_invocations_only_when_enabled() {
        let chat = make_chat(vec![make_request(
            "Search",
            vec![
                ResponseElement::ToolInvocation {
                    past_tense: Some("Searched for <files>".into()),
                },
                ResponseElement::ToolInvocation { past_tense: None },
            ],
        )]);

        assert!(paragraphs(&render_chat(&chat, &opts()), Style::Metadata).is_empty());

        let story = render_chat(
            &chat,
            &RenderOptions {
                show_tools: true,
                ..opts()
            },
        );
        assert_eq!(
            paragraphs(&story, Style::Metadata),
            vec!["Tool: Searched for &lt;files&gt;"]
        );
    }

    #[test]
    fn summarizes_file_edits() {
        let chat = make_chat(vec![make_request(
            "Edit",
            vec![
                ResponseElement::TextEditGroup {
                    path: "/src/main.rs".into(),
                    edits: vec!["fn main() {\n    println!(\"hi\");\n}".into()],
                },
                ResponseElement::TextEditGroup {
                    path: "/src/empty.rs".into(),
                    edits: vec![],
                },
            ],
        )]);
        let story = render_chat(&chat, &opts());

        assert_eq!(
            paragraphs(&story, Style::Metadata),
            vec![r#"Modified <font name="Courier">main.rs</font> (3 lines)"#]
        );
    }

    #[test]
    fn breaks_pages_every_few_requests() {
        let requests = (0..7).map(|i| make_request(&format!("q{i}"), vec![])).collect();
        let story = render_chat(&make_chat(requests), &opts());

        assert_eq!(story.iter().filter(|b| **b == Block::PageBreak).count(), 2);
        assert_ne!(story.last(), Some(&Block::PageBreak));
    }

    #[test]
    fn no_trailing_page_break_on_exact_multiple() {
        let requests = (0..3).map(|i| make_request(&format!("q{i}"), vec![])).collect();
        let story = render_chat(&make_chat(requests), &opts());

        assert!(!story.contains(&Block::PageBreak));
    }

    #[test]
    fn zero_requests_per_page_disables_breaks() {
        let requests = (0..9).map(|i| make_request(&format!("q{i}"), vec![])).collect();
        let story = render_chat(
            &make_chat(requests),
            &RenderOptions {
                requests_per_page: 0,
                ..opts()
            },
        );

        assert!(!story.contains(&Block::PageBreak));
    }

    #[test]
    fn identifiers_restart_for_each_request() {
        let text = "```a\nfirst\n```";
        let chat = make_chat(vec![
            make_request("one", vec![ResponseElement::Text(text.into())]),
            make_request(
                "two [CODE_BLOCK_0]",
                vec![ResponseElement::Text("```b\nsecond\n```".into())],
            ),
        ]);
        let story = render_chat(&chat, &opts());

        // The literal token in the second user message has no block of its
        // own request behind it, so it stays text.
        assert_eq!(code_blocks(&story), vec![("a", "first"), ("b", "second")]);
        assert!(
            paragraphs(&story, Style::UserMessage).contains(&"<b>User:</b> two [CODE_BLOCK_0]")
        );
    }
}
