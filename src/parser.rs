// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for GitHub Copilot chat exports.
//!
//! This module handles deserialization of the JSON format produced by
//! GitHub Copilot's chat export feature. Parsing is deliberately lenient:
//! only the document root and its `requests` array are required, and every
//! per-request field that is missing or has an unexpected shape is treated
//! as absent rather than as an error.
//!
//! # Format Overview
//!
//! A Copilot chat export contains:
//! - The requester's and responder's usernames
//! - A list of request/response records
//! - Each response is a list of fragments: plain strings, `{ "value": ... }`
//!   objects, or `kind`-tagged objects (references, edits, tool calls)
//! - Optionally, `result.metadata.codeBlocks` with code blocks the exporter
//!   already identified
//!
//! # Example
//!
//! ```
//! use cp2pdf::parser::parse_chat;
//!
//! let json = r#"{
//!     "requesterUsername": "octocat",
//!     "requests": [{
//!         "timestamp": 1733356800000,
//!         "message": { "text": "Hello" },
//!         "response": ["Hi ", { "value": "there!" }]
//!     }]
//! }"#;
//!
//! let chat = parse_chat(json).unwrap();
//! assert_eq!(chat.requests.len(), 1);
//! assert_eq!(chat.requests[0].response.len(), 2);
//! ```

use serde::Deserialize;
use snafu::prelude::*;

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// The root structure of a GitHub Copilot chat export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExport {
    /// The user who held the conversation.
    #[serde(default)]
    pub requester_username: Option<String>,

    /// The display name of the assistant (typically "GitHub Copilot").
    #[serde(default)]
    pub responder_username: Option<String>,

    /// The sequence of request/response records in the conversation.
    pub requests: Vec<Request>,
}

/// A single request/response record in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Unix timestamp in milliseconds when the request was made.
    pub timestamp: Option<i64>,

    /// The model identifier used for this response (e.g., "claude-sonnet-4").
    pub model_id: Option<String>,

    /// The user's message that initiated this request.
    pub message: Message,

    /// The assistant's response fragments, in order.
    pub response: Vec<ResponseElement>,

    /// Code blocks the exporter recorded in the result metadata.
    pub code_blocks: Vec<MetadataCodeBlock>,
}

/// A user message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Message {
    /// The text content of the user's message.
    #[serde(default)]
    pub text: String,
}

/// A code block listed in `result.metadata.codeBlocks`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataCodeBlock {
    /// The code text, verbatim.
    pub code: String,

    /// The declared language, possibly empty.
    #[serde(default)]
    pub language: String,

    /// The markdown that preceded the block in the original response.
    #[serde(default)]
    pub markdown_before_block: Option<String>,

    /// The resource the block belongs to. Carried through uninterpreted.
    #[serde(default)]
    pub resource: Option<serde_json::Value>,
}

/// A fragment of an assistant's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseElement {
    /// Plain text content from the assistant.
    Text(String),

    /// A reference to a file or symbol mentioned inline.
    InlineReference {
        /// Optional display name for the reference.
        name: Option<String>,
        /// The file path being referenced (empty for symbols).
        path: String,
    },

    /// A URI indicating the source of a code block.
    CodeBlockUri {
        /// The file path associated with the code block.
        path: String,
    },

    /// A group of text edits applied to a file.
    TextEditGroup {
        /// The file path that was edited.
        path: String,
        /// The individual edit operations (replacement text).
        edits: Vec<String>,
    },

    /// A tool invocation performed by the assistant.
    ToolInvocation {
        /// A past-tense description of what the tool did (e.g., "Searched for files").
        past_tense: Option<String>,
    },

    /// An unrecognized or unsupported response fragment.
    Other,
}

impl<'de> Deserialize<'de> for ResponseElement {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        if let Some(text) = value.as_str() {
            return Ok(Self::Text(text.to_owned()));
        }

        if let Some(kind) = get_str(&value, &["kind"]) {
            return Ok(match kind {
                "inlineReference" => Self::InlineReference {
                    name: get_string(&value, &["name"])
                        .or_else(|| get_string(&value, &["inlineReference", "name"])),
                    path: get_str(&value, &["inlineReference", "path"])
                        .unwrap_or_default()
                        .to_owned(),
                },
                "codeblockUri" => Self::CodeBlockUri {
                    path: get_str(&value, &["uri", "path"])
                        .unwrap_or_default()
                        .to_owned(),
                },
                "textEditGroup" => Self::TextEditGroup {
                    path: get_str(&value, &["uri", "path"])
                        .unwrap_or_default()
                        .to_owned(),
                    edits: extract_edits(&value),
                },
                "toolInvocationSerialized" => Self::ToolInvocation {
                    past_tense: get_string(&value, &["pastTenseMessage", "value"]),
                },
                // Any other kind that still carries text (e.g. "markdownContent")
                _ => get_string(&value, &["value"]).map_or(Self::Other, Self::Text),
            });
        }

        Ok(get_string(&value, &["value"]).map_or(Self::Other, Self::Text))
    }
}

impl<'de> Deserialize<'de> for Request {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let timestamp = value.get("timestamp").and_then(serde_json::Value::as_i64);
        let model_id = get_string(&value, &["modelId"]);

        let message = value
            .get("message")
            .and_then(|m| serde_json::from_value(m.clone()).ok())
            .unwrap_or_default();

        let response = value
            .get("response")
            .and_then(|r| serde_json::from_value(r.clone()).ok())
            .unwrap_or_default();

        let code_blocks = extract_code_blocks(&value);

        Ok(Self {
            timestamp,
            model_id,
            message,
            response,
            code_blocks,
        })
    }
}

/// Extracts `result.metadata.codeBlocks`, skipping entries that don't parse.
fn extract_code_blocks(value: &serde_json::Value) -> Vec<MetadataCodeBlock> {
    value
        .pointer("/result/metadata/codeBlocks")
        .and_then(serde_json::Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|block| serde_json::from_value(block.clone()).ok())
        .collect()
}

/// Navigates a JSON path and returns the string value at the end.
fn get_str<'a>(value: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &serde_json::Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Extracts edit texts from the nested edits array structure.
///
/// The JSON format nests edits as: `edits: [[{text: "..."}], [{text: "..."}]]`
fn extract_edits(value: &serde_json::Value) -> Vec<String> {
    value
        .get("edits")
        .and_then(|e| e.as_array())
        .into_iter()
        .flatten()
        .filter_map(|group| group.as_array())
        .flatten()
        .filter_map(|edit| edit.get("text")?.as_str())
        .map(str::to_owned)
        .collect()
}

/// Parses a JSON string into a [`ChatExport`] structure.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or has no `requests` array.
///
/// # Example
///
/// ```
/// use cp2pdf::parser::parse_chat;
///
/// let chat = parse_chat(r#"{ "requests": [] }"#).unwrap();
/// assert!(chat.requester_username.is_none());
/// ```
pub fn parse_chat(json_str: &str) -> Result<ChatExport, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_chat_json(requests_json: &str) -> String {
        format!(
            r#"{{
                "requesterUsername": "octocat",
                "responderUsername": "GitHub Copilot",
                "requests": [{requests_json}]
            }}"#
        )
    }

    fn request_json(message: &str, response_elements: &str) -> String {
        format!(
            r#"{{
                "timestamp": 1733356800000,
                "modelId": "claude-sonnet-4",
                "message": {{ "text": "{message}" }},
                "response": [{response_elements}]
            }}"#
        )
    }

    fn request_json_with_metadata(code_blocks_json: &str) -> String {
        format!(
            r#"{{
                "message": {{ "text": "Hi" }},
                "response": [],
                "result": {{ "metadata": {{ "codeBlocks": [{code_blocks_json}] }} }}
            }}"#
        )
    }

    #[test]
    fn parses_minimal_chat() {
        let json = minimal_chat_json(&request_json("Hello", ""));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(chat.requester_username.as_deref(), Some("octocat"));
        assert_eq!(chat.responder_username.as_deref(), Some("GitHub Copilot"));
        assert_eq!(chat.requests.len(), 1);
        assert_eq!(chat.requests[0].message.text, "Hello");
        assert_eq!(chat.requests[0].timestamp, Some(1_733_356_800_000));
        assert_eq!(chat.requests[0].model_id, Some("claude-sonnet-4".into()));
    }

    #[test]
    fn parses_value_object_as_text() {
        let json = minimal_chat_json(&request_json("Hi", r#"{"value": "Hello there!"}"#));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(
            chat.requests[0].response,
            vec![ResponseElement::Text("Hello there!".into())]
        );
    }

    #[test]
    fn parses_plain_string_fragment_as_text() {
        let json = minimal_chat_json(&request_json("Hi", r#""raw string""#));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(
            chat.requests[0].response,
            vec![ResponseElement::Text("raw string".into())]
        );
    }

    #[test]
    fn parses_kinded_value_as_text() {
        let json = minimal_chat_json(&request_json(
            "Hi",
            r#"{"kind": "markdownContent", "value": "tagged text"}"#,
        ));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(
            chat.requests[0].response,
            vec![ResponseElement::Text("tagged text".into())]
        );
    }

    #[test]
    fn parses_inline_reference() {
        let json = minimal_chat_json(&request_json(
            "Check file",
            r#"{
                "kind": "inlineReference",
                "name": "main.rs",
                "inlineReference": { "path": "/src/main.rs" }
            }"#,
        ));
        let chat = parse_chat(&json).unwrap();

        match &chat.requests[0].response[0] {
            ResponseElement::InlineReference { name, path } => {
                assert_eq!(name.as_deref(), Some("main.rs"));
                assert_eq!(path, "/src/main.rs");
            }
            other => panic!("Expected InlineReference, got {other:?}"),
        }
    }

    #[test]
    fn parses_inline_reference_with_nested_name() {
        let json = minimal_chat_json(&request_json(
            "Check symbol",
            r#"{
                "kind": "inlineReference",
                "inlineReference": { "name": "Deserialize", "kind": 12 }
            }"#,
        ));
        let chat = parse_chat(&json).unwrap();

        match &chat.requests[0].response[0] {
            ResponseElement::InlineReference { name, path } => {
                assert_eq!(name.as_deref(), Some("Deserialize"));
                assert_eq!(path, "");
            }
            other => panic!("Expected InlineReference, got {other:?}"),
        }
    }

    #[test]
    fn parses_codeblock_uri_even_with_value() {
        let json = minimal_chat_json(&request_json(
            "Show code",
            r#"{
                "kind": "codeblockUri",
                "uri": { "path": "/src/parser.rs" },
                "value": "ignored"
            }"#,
        ));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(
            chat.requests[0].response,
            vec![ResponseElement::CodeBlockUri {
                path: "/src/parser.rs".into()
            }]
        );
    }

    #[test]
    fn parses_text_edit_group() {
        let json = minimal_chat_json(&request_json(
            "Edit file",
            r#"{
                "kind": "textEditGroup",
                "uri": { "path": "/src/main.rs" },
                "edits": [
                    [{"text": "fn main() {}"}],
                    [{"text": "// comment"}]
                ]
            }"#,
        ));
        let chat = parse_chat(&json).unwrap();

        match &chat.requests[0].response[0] {
            ResponseElement::TextEditGroup { path, edits } => {
                assert_eq!(path, "/src/main.rs");
                assert_eq!(edits, &["fn main() {}", "// comment"]);
            }
            other => panic!("Expected TextEditGroup, got {other:?}"),
        }
    }

    #[test]
    fn parses_tool_invocation() {
        let json = minimal_chat_json(&request_json(
            "Search",
            r#"{
                "kind": "toolInvocationSerialized",
                "pastTenseMessage": { "value": "Searched for text" }
            }"#,
        ));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(
            chat.requests[0].response,
            vec![ResponseElement::ToolInvocation {
                past_tense: Some("Searched for text".into())
            }]
        );
    }

    #[test]
    fn parses_unknown_kind_without_value_as_other() {
        let json = minimal_chat_json(&request_json(
            "Something",
            r#"{"kind": "unknownKind", "data": "whatever"}"#,
        ));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(chat.requests[0].response, vec![ResponseElement::Other]);
    }

    #[test]
    fn parses_object_without_kind_or_value_as_other() {
        let json = minimal_chat_json(&request_json("Something", r#"{"someField": 1}"#));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(chat.requests[0].response, vec![ResponseElement::Other]);
    }

    #[test]
    fn parses_request_with_missing_optional_fields() {
        let json = minimal_chat_json("{}");
        let chat = parse_chat(&json).unwrap();
        let request = &chat.requests[0];

        assert!(request.timestamp.is_none());
        assert!(request.model_id.is_none());
        assert_eq!(request.message.text, "");
        assert!(request.response.is_empty());
        assert!(request.code_blocks.is_empty());
    }

    #[test]
    fn treats_null_response_as_empty() {
        let json = minimal_chat_json(r#"{"message": {"text": "Hi"}, "response": null}"#);
        let chat = parse_chat(&json).unwrap();

        assert!(chat.requests[0].response.is_empty());
    }

    #[test]
    fn parses_metadata_code_blocks() {
        let json = minimal_chat_json(&request_json_with_metadata(
            r#"
                {
                    "code": "fn main() {}",
                    "language": "rust",
                    "markdownBeforeBlock": "Here it is:\n",
                    "resource": { "path": "/src/main.rs" }
                },
                { "code": "ls -la" }
            "#,
        ));
        let chat = parse_chat(&json).unwrap();
        let blocks = &chat.requests[0].code_blocks;

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].code, "fn main() {}");
        assert_eq!(blocks[0].language, "rust");
        assert_eq!(blocks[0].markdown_before_block.as_deref(), Some("Here it is:\n"));
        assert_eq!(
            blocks[0].resource,
            Some(serde_json::json!({ "path": "/src/main.rs" }))
        );
        assert_eq!(blocks[1].language, "");
        assert!(blocks[1].resource.is_none());
    }

    #[test]
    fn skips_malformed_metadata_code_blocks() {
        let json = minimal_chat_json(&request_json_with_metadata(
            r#"{ "language": "rust" }, { "code": "ok" }, 42"#,
        ));
        let chat = parse_chat(&json).unwrap();

        assert_eq!(chat.requests[0].code_blocks.len(), 1);
        assert_eq!(chat.requests[0].code_blocks[0].code, "ok");
    }

    #[test]
    fn returns_error_for_invalid_json() {
        let result = parse_chat("not valid json");
        assert!(result.is_err());
    }

    #[test]
    fn returns_error_for_missing_requests() {
        let result = parse_chat(r#"{"requesterUsername": "octocat"}"#);
        assert!(result.is_err());
    }
}
