// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Page layout and PDF serialization.
//!
//! Blocks from the [`renderer`](crate::renderer) are flowed top to bottom
//! into a single frame per page. Paragraphs are word-wrapped, code blocks
//! are set line by line in Courier and hard-wrapped when a line is wider
//! than the frame, and both split across pages between lines. The result is
//! written with `lopdf` using the standard fonts from [`crate::fonts`].
//!
//! # Example
//!
//! ```
//! use cp2pdf::pdf::{PageSize, write_pdf};
//! use cp2pdf::renderer::{Block, Style};
//!
//! let story = vec![Block::Paragraph {
//!     style: Style::AssistantMessage,
//!     markup: "<b>Hello</b> world".into(),
//! }];
//! let bytes = write_pdf(&story, PageSize::A4, "Example").unwrap();
//! assert!(bytes.starts_with(b"%PDF-"));
//! ```

use crate::fonts::{Face, encode_win_ansi};
use crate::markup::{self, Inline};
use crate::renderer::{Block, Style};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use snafu::prelude::*;
use std::str::FromStr;

const MARGIN_LEFT: f32 = 72.0;
const MARGIN_RIGHT: f32 = 72.0;
const MARGIN_TOP: f32 = 72.0;
const MARGIN_BOTTOM: f32 = 18.0;

/// Line height as a multiple of font size.
const LEADING: f32 = 1.2;

const TAB_WIDTH: usize = 4;

/// Error type for PDF generation failures.
#[derive(Debug, Snafu)]
pub enum PdfError {
    /// A page's content stream could not be encoded.
    #[snafu(display("failed to encode page content: {source}"))]
    EncodeContent {
        /// The underlying lopdf error.
        source: lopdf::Error,
    },

    /// The finished document could not be serialized.
    #[snafu(display("failed to serialize PDF: {source}"))]
    Serialize {
        /// The underlying lopdf error.
        source: lopdf::Error,
    },
}

/// Error returned when parsing an unknown page size name.
#[derive(Debug, Snafu)]
#[snafu(display("unknown page size {name:?} (expected letter or a4)"))]
pub struct UnknownPageSize {
    name: String,
}

/// Physical page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    /// US Letter, 8.5 x 11 in.
    #[default]
    Letter,
    /// ISO A4, 210 x 297 mm.
    A4,
}

impl PageSize {
    /// Width and height in points.
    #[must_use]
    pub const fn dimensions(self) -> (f32, f32) {
        match self {
            Self::Letter => (612.0, 792.0),
            Self::A4 => (595.28, 841.89),
        }
    }
}

impl FromStr for PageSize {
    type Err = UnknownPageSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "letter" => Ok(Self::Letter),
            "a4" => Ok(Self::A4),
            _ => UnknownPageSizeSnafu { name: s }.fail(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f32, f32, f32);

impl Rgb {
    const BLACK: Self = Self(0.0, 0.0, 0.0);
    const GREY: Self = Self(0.5, 0.5, 0.5);
    const DARK_BLUE: Self = Self(0.0, 0.0, 0.545);
    const BLUE: Self = Self(0.0, 0.0, 1.0);

    #[allow(clippy::cast_precision_loss)]
    const fn hex(rgb: u32) -> Self {
        Self(
            ((rgb >> 16) & 0xff) as f32 / 255.0,
            ((rgb >> 8) & 0xff) as f32 / 255.0,
            (rgb & 0xff) as f32 / 255.0,
        )
    }

    fn operands(self) -> Vec<Object> {
        vec![real(self.0), real(self.1), real(self.2)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// Box-level appearance of a paragraph style.
#[derive(Debug, Clone, Copy)]
struct BoxStyle {
    size: f32,
    bold: bool,
    mono: bool,
    left_indent: f32,
    right_indent: f32,
    space_after: f32,
    align: Align,
    color: Rgb,
    background: Option<Rgb>,
    border: Option<Rgb>,
    padding: f32,
}

impl BoxStyle {
    const BODY: Self = Self {
        size: 11.0,
        bold: false,
        mono: false,
        left_indent: 0.0,
        right_indent: 0.0,
        space_after: 12.0,
        align: Align::Left,
        color: Rgb::BLACK,
        background: None,
        border: None,
        padding: 0.0,
    };

    const CODE: Self = Self {
        size: 9.0,
        mono: true,
        left_indent: 20.0,
        right_indent: 20.0,
        background: Some(Rgb::hex(0xF5_F5_F5)),
        border: Some(Rgb::GREY),
        padding: 8.0,
        ..Self::BODY
    };

    const fn for_style(style: Style) -> Self {
        match style {
            Style::Title => Self {
                size: 24.0,
                bold: true,
                space_after: 30.0,
                align: Align::Center,
                ..Self::BODY
            },
            Style::Subtitle => Self {
                size: 14.0,
                space_after: 20.0,
                align: Align::Center,
                color: Rgb::GREY,
                ..Self::BODY
            },
            Style::ChatHeader => Self {
                size: 14.0,
                bold: true,
                space_after: 16.0,
                color: Rgb::DARK_BLUE,
                ..Self::BODY
            },
            Style::Metadata => Self {
                size: 9.0,
                space_after: 8.0,
                color: Rgb::GREY,
                ..Self::BODY
            },
            Style::UserMessage => Self {
                right_indent: 20.0,
                background: Some(Rgb::hex(0xF8_F9_FA)),
                border: Some(Rgb::hex(0xE3_F2_FD)),
                padding: 8.0,
                ..Self::BODY
            },
            Style::AssistantMessage => Self {
                left_indent: 20.0,
                background: Some(Rgb::hex(0xF9_FF_F9)),
                border: Some(Rgb::hex(0xE8_F5_E8)),
                padding: 8.0,
                ..Self::BODY
            },
        }
    }

    const fn boxed(&self) -> bool {
        self.background.is_some() || self.border.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Piece {
    text: String,
    face: Face,
    size: f32,
    color: Rgb,
    width: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    pieces: Vec<Piece>,
    width: f32,
    /// Largest font size on the line; zero for an empty line.
    size: f32,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn push(&mut self, text: &str, face: Face, size: f32, color: Rgb) {
        let width = face.text_width(text, size);
        self.width += width;
        self.size = self.size.max(size);
        if let Some(last) = self.pieces.last_mut()
            && last.face == face
            && (last.size - size).abs() < f32::EPSILON
            && last.color == color
        {
            last.text.push_str(text);
            last.width += width;
            return;
        }
        self.pieces.push(Piece {
            text: text.to_owned(),
            face,
            size,
            color,
            width,
        });
    }

    /// Drops trailing spaces so centring and width checks see the ink only.
    fn trim_end(&mut self) {
        while let Some(last) = self.pieces.last_mut() {
            let trimmed = last.text.trim_end_matches(' ').len();
            if trimmed == last.text.len() {
                break;
            }
            last.text.truncate(trimmed);
            let width = last.face.text_width(&last.text, last.size);
            self.width -= last.width - width;
            last.width = width;
            if !last.text.is_empty() {
                break;
            }
            self.pieces.pop();
        }
    }

    fn height(&self, base_size: f32) -> f32 {
        let size = if self.size > 0.0 { self.size } else { base_size };
        size * LEADING
    }
}

/// Greedy word wrap of styled runs into lines no wider than `max_width`.
fn wrap(inlines: &[Inline], style: &BoxStyle, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();

    for inline in inlines {
        match inline {
            Inline::Break => {
                current.trim_end();
                lines.push(std::mem::take(&mut current));
            }
            Inline::Text { text, style: span } => {
                let face = Face::select(span.bold || style.bold, span.italic, span.mono || style.mono);
                let size = span.size.unwrap_or(style.size);
                for token in text.split_inclusive(' ') {
                    let ink = face.text_width(token.trim_end_matches(' '), size);
                    if !current.is_empty() && current.width + ink > max_width {
                        current.trim_end();
                        lines.push(std::mem::take(&mut current));
                        if token.trim().is_empty() {
                            continue;
                        }
                    }
                    if ink > max_width {
                        for c in token.chars() {
                            let mut buf = [0; 4];
                            let c = c.encode_utf8(&mut buf);
                            if !current.is_empty()
                                && current.width + face.text_width(c, size) > max_width
                            {
                                lines.push(std::mem::take(&mut current));
                            }
                            current.push(c, face, size, style.color);
                        }
                    } else {
                        current.push(token, face, size, style.color);
                    }
                }
            }
        }
    }

    if !current.is_empty() {
        current.trim_end();
        lines.push(current);
    }
    lines
}

/// Splits code into display lines: tabs expanded, long lines hard-wrapped.
fn code_lines(code: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::new();
    for raw in code.split('\n') {
        let line = raw.trim_end_matches('\r').replace('\t', &" ".repeat(TAB_WIDTH));
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            out.push(String::new());
            continue;
        }
        out.extend(chars.chunks(max_chars).map(|chunk| chunk.iter().collect()));
    }
    out
}

fn real(value: f32) -> Object {
    Object::Real(value)
}

/// Accumulates pages of content operations.
struct Layout {
    width: f32,
    height: f32,
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    y: f32,
    fresh: bool,
}

impl Layout {
    fn new(page_size: PageSize) -> Self {
        let (width, height) = page_size.dimensions();
        Self {
            width,
            height,
            pages: Vec::new(),
            ops: Vec::new(),
            y: height - MARGIN_TOP,
            fresh: true,
        }
    }

    fn frame_width(&self) -> f32 {
        self.width - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = self.height - MARGIN_TOP;
        self.fresh = true;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.pages.push(self.ops);
        self.pages
    }

    fn add(&mut self, block: &Block) {
        match block {
            Block::Paragraph { style, markup } => {
                let spec = BoxStyle::for_style(*style);
                let inner = self.inner_width(&spec);
                let lines = wrap(&markup::parse(markup), &spec, inner);
                self.place(&lines, &spec);
            }
            Block::Code { language, code } => {
                let spec = BoxStyle::CODE;
                let inner = self.inner_width(&spec);
                let char_width = Face::Mono.text_width(" ", spec.size);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let max_chars = (inner / char_width).floor().max(1.0) as usize;

                let mut lines = Vec::new();
                if !language.is_empty() {
                    let mut label = Line::default();
                    label.push(language, Face::SansBold, 8.0, Rgb::BLUE);
                    lines.push(label);
                }
                for text in code_lines(code, max_chars) {
                    let mut line = Line::default();
                    if !text.is_empty() {
                        line.push(&text, Face::Mono, spec.size, spec.color);
                    }
                    lines.push(line);
                }
                self.place(&lines, &spec);
            }
            Block::Spacer(height) => {
                if !self.fresh {
                    self.y -= height;
                    if self.y < MARGIN_BOTTOM {
                        self.new_page();
                    }
                } else if self.pages.is_empty() {
                    // Leading space on the first page, e.g. above the title.
                    self.y -= height;
                }
            }
            Block::PageBreak => {
                if !self.fresh {
                    self.new_page();
                }
            }
        }
    }

    fn inner_width(&self, spec: &BoxStyle) -> f32 {
        self.frame_width() - spec.left_indent - spec.right_indent - 2.0 * spec.padding
    }

    /// Places lines, splitting them across pages as needed.
    fn place(&mut self, lines: &[Line], spec: &BoxStyle) {
        let pad = spec.padding;
        let mut rest = lines;

        while !rest.is_empty() {
            let available = self.y - MARGIN_BOTTOM - 2.0 * pad;
            let mut used = 0.0;
            let mut count = 0;
            for line in rest {
                let h = line.height(spec.size);
                if used + h > available {
                    break;
                }
                used += h;
                count += 1;
            }

            if count == 0 {
                if self.fresh {
                    // Taller than a whole page; place it anyway.
                    count = 1;
                    used = rest[0].height(spec.size);
                } else {
                    self.new_page();
                    continue;
                }
            }

            let (chunk, tail) = rest.split_at(count);
            self.draw(chunk, spec, used);
            rest = tail;
            if !rest.is_empty() {
                self.new_page();
            }
        }

        self.y -= spec.space_after;
    }

    fn draw(&mut self, lines: &[Line], spec: &BoxStyle, text_height: f32) {
        let pad = spec.padding;
        let x = MARGIN_LEFT + spec.left_indent;
        let box_width = self.frame_width() - spec.left_indent - spec.right_indent;
        let box_height = text_height + 2.0 * pad;
        let top = self.y;

        if spec.boxed() {
            self.ops.push(Operation::new("q", vec![]));
            let rect = vec![real(x), real(top - box_height), real(box_width), real(box_height)];
            if let Some(fill) = spec.background {
                self.ops.push(Operation::new("rg", fill.operands()));
                self.ops.push(Operation::new("re", rect.clone()));
                self.ops.push(Operation::new("f", vec![]));
            }
            if let Some(stroke) = spec.border {
                self.ops.push(Operation::new("RG", stroke.operands()));
                self.ops.push(Operation::new("w", vec![real(1.0)]));
                self.ops.push(Operation::new("re", rect));
                self.ops.push(Operation::new("S", vec![]));
            }
            self.ops.push(Operation::new("Q", vec![]));
        }

        let inner_width = box_width - 2.0 * pad;
        let mut line_top = top - pad;
        self.ops.push(Operation::new("BT", vec![]));
        for line in lines {
            let ascent = if line.size > 0.0 { line.size } else { spec.size };
            let baseline = line_top - ascent;
            let mut pen = x + pad;
            if spec.align == Align::Center {
                pen += ((inner_width - line.width) / 2.0).max(0.0);
            }
            for piece in &line.pieces {
                self.ops.push(Operation::new("rg", piece.color.operands()));
                self.ops.push(Operation::new(
                    "Tf",
                    vec![piece.face.resource_name().into(), real(piece.size)],
                ));
                self.ops.push(Operation::new(
                    "Tm",
                    vec![
                        real(1.0),
                        real(0.0),
                        real(0.0),
                        real(1.0),
                        real(pen),
                        real(baseline),
                    ],
                ));
                self.ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_win_ansi(&piece.text),
                        StringFormat::Literal,
                    )],
                ));
                pen += piece.width;
            }
            line_top -= line.height(spec.size);
        }
        self.ops.push(Operation::new("ET", vec![]));

        self.y = top - box_height;
        self.fresh = false;
    }
}

/// Lays out a story and serializes it as a PDF document.
///
/// `title` goes into the document information dictionary.
///
/// # Errors
///
/// Returns an error if a content stream cannot be encoded or the document
/// cannot be serialized.
pub fn write_pdf(story: &[Block], page_size: PageSize, title: &str) -> Result<Vec<u8>, PdfError> {
    let mut layout = Layout::new(page_size);
    for block in story {
        layout.add(block);
    }
    let (width, height) = page_size.dimensions();
    let pages = layout.finish();
    log::debug!("laid out {} block(s) on {} page(s)", story.len(), pages.len());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for face in Face::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let bytes = content.encode().context(EncodeContentSnafu)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(width), real(height)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal(concat!(
            env!("CARGO_PKG_NAME"),
            " ",
            env!("CARGO_PKG_VERSION")
        )),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(lopdf::Error::from)
        .context(SerializeSnafu)?;
    Ok(out)
}
