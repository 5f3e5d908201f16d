// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Escaping, inline markdown rewriting, and reading back the markup dialect.
//!
//! Text segments are turned into a small HTML-like markup dialect before
//! layout: `<b>`, `<i>`, `<font name="Courier">`, `<font size="N">` and
//! `<br/>`, with `&amp;`-style entities for escaped characters. The layout
//! engine reads that markup back into styled [`Inline`] runs with [`parse`].
//!
//! ```
//! use cp2pdf::markup::to_markup;
//!
//! assert_eq!(
//!     to_markup("**bold** and <tags>"),
//!     "<b>bold</b> and &lt;tags&gt;"
//! );
//! ```

use regex::Regex;
use std::sync::LazyLock;

/// Ordered inline rewrites. Longer patterns come first so `**` is never read as `*`.
static SUBSTITUTIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\*\*(.*?)\*\*", "<b>${1}</b>"),
        (r"\*(.*?)\*", "<i>${1}</i>"),
        (r"`([^`]+)`", r#"<font name="Courier">${1}</font>"#),
        (r"(?m)^#### (.*?)$", "<b>${1}</b>"),
        (r"(?m)^### (.*?)$", "<b>${1}</b>"),
        (r#"(?m)^## (.*?)$"#, r#"<font size="12"><b>${1}</b></font>"#),
        (r#"(?m)^# (.*?)$"#, r#"<font size="14"><b>${1}</b></font>"#),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("substitution pattern is valid"),
            replacement,
        )
    })
    .collect()
});

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("attribute pattern is valid"));

/// Escapes the characters that are significant to the markup dialect.
///
/// Strings without `&`, `<`, `>`, `"` or `'` come back unchanged.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes `text` and rewrites its inline markdown into the markup dialect.
///
/// Bold, italic and inline code are rewritten first, then `####` down to `#`
/// headings. Line endings (`\r\n`, `\r` or `\n`) become `<br/>`. Only meant
/// for prose; code is never passed through here.
#[must_use]
pub fn to_markup(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut content = escape(&text);
    for (pattern, replacement) in SUBSTITUTIONS.iter() {
        content = pattern.replace_all(&content, *replacement).into_owned();
    }
    content.replace('\n', "<br/>")
}

/// Character styling carried by an [`Inline`] run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpanStyle {
    /// Inside `<b>`.
    pub bold: bool,
    /// Inside `<i>`.
    pub italic: bool,
    /// Inside `<font name="Courier...">`.
    pub mono: bool,
    /// Innermost `<font size="N">`, if any.
    pub size: Option<f32>,
}

/// A styled run of text, or a forced line break.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Text with entities decoded.
    Text {
        /// The decoded text.
        text: String,
        /// Its styling.
        style: SpanStyle,
    },
    /// A `<br/>`.
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct FontTag {
    mono: bool,
    size: Option<f32>,
}

enum Tag {
    Bold(bool),
    Italic(bool),
    FontOpen(FontTag),
    FontClose,
    Break,
}

impl Tag {
    fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Some(match tag {
            "b" => Self::Bold(true),
            "/b" => Self::Bold(false),
            "i" => Self::Italic(true),
            "/i" => Self::Italic(false),
            "br" | "br/" | "br /" => Self::Break,
            "/font" => Self::FontClose,
            _ => {
                let attrs = tag.strip_prefix("font ")?;
                let mut font = FontTag {
                    mono: false,
                    size: None,
                };
                for caps in ATTRIBUTE.captures_iter(attrs) {
                    match &caps[1] {
                        "name" => font.mono = caps[2].starts_with("Courier"),
                        "size" => font.size = caps[2].parse().ok(),
                        _ => {}
                    }
                }
                Self::FontOpen(font)
            }
        })
    }
}

/// Tracks open tags. Counters instead of a strict stack, so badly nested
/// input such as `<i>a <b>b</i> c</b>` still styles sensibly.
#[derive(Default)]
struct StyleState {
    bold: usize,
    italic: usize,
    fonts: Vec<FontTag>,
}

impl StyleState {
    fn current(&self) -> SpanStyle {
        SpanStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            mono: self.fonts.iter().any(|f| f.mono),
            size: self.fonts.iter().rev().find_map(|f| f.size),
        }
    }

    fn apply(&mut self, tag: Tag) {
        match tag {
            Tag::Bold(true) => self.bold += 1,
            Tag::Bold(false) => self.bold = self.bold.saturating_sub(1),
            Tag::Italic(true) => self.italic += 1,
            Tag::Italic(false) => self.italic = self.italic.saturating_sub(1),
            Tag::FontOpen(font) => self.fonts.push(font),
            Tag::FontClose => {
                self.fonts.pop();
            }
            Tag::Break => {}
        }
    }
}

fn decode_entity(s: &str) -> Option<(char, usize)> {
    const ENTITIES: [(&str, char); 6] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#x27;", '\''),
        ("&#39;", '\''),
    ];
    ENTITIES
        .iter()
        .find(|(entity, _)| s.starts_with(entity))
        .map(|(entity, c)| (*c, entity.len()))
}

/// Reads markup produced by [`to_markup`] into styled runs.
///
/// Unknown tags and stray `<` or `&` are kept as literal text.
#[must_use]
pub fn parse(markup: &str) -> Vec<Inline> {
    fn flush(out: &mut Vec<Inline>, buf: &mut String, style: SpanStyle) {
        if !buf.is_empty() {
            out.push(Inline::Text {
                text: std::mem::take(buf),
                style,
            });
        }
    }

    let mut out = Vec::new();
    let mut buf = String::new();
    let mut state = StyleState::default();
    let mut rest = markup;

    while let Some(idx) = rest.find(|c: char| c == '<' || c == '&') {
        buf.push_str(&rest[..idx]);
        rest = &rest[idx..];

        if rest.starts_with('<') {
            if let Some(end) = rest.find('>')
                && let Some(tag) = Tag::parse(&rest[1..end])
            {
                flush(&mut out, &mut buf, state.current());
                if matches!(tag, Tag::Break) {
                    out.push(Inline::Break);
                }
                state.apply(tag);
                rest = &rest[end + 1..];
                continue;
            }
            buf.push('<');
            rest = &rest[1..];
        } else if let Some((c, len)) = decode_entity(rest) {
            buf.push(c);
            rest = &rest[len..];
        } else {
            buf.push('&');
            rest = &rest[1..];
        }
    }
    buf.push_str(rest);
    flush(&mut out, &mut buf, state.current());

    out
}
