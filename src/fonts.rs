// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Standard PDF font faces, their glyph widths, and WinAnsi text encoding.
//!
//! Only the built-in Helvetica and Courier families are used, so nothing
//! has to be embedded. Widths are in thousandths of an em, taken from the
//! Adobe core font metrics for the printable ASCII range.

/// Helvetica advance widths for `' '..='~'`.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for `' '..='~'`.
#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const COURIER_WIDTH: u16 = 600;
const FALLBACK_WIDTH: u16 = 556;

/// One of the eight faces the document draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    /// Helvetica.
    Sans,
    /// Helvetica-Bold.
    SansBold,
    /// Helvetica-Oblique.
    SansItalic,
    /// Helvetica-BoldOblique.
    SansBoldItalic,
    /// Courier.
    Mono,
    /// Courier-Bold.
    MonoBold,
    /// Courier-Oblique.
    MonoItalic,
    /// Courier-BoldOblique.
    MonoBoldItalic,
}

impl Face {
    /// Every face, in resource-name order.
    pub const ALL: [Self; 8] = [
        Self::Sans,
        Self::SansBold,
        Self::SansItalic,
        Self::SansBoldItalic,
        Self::Mono,
        Self::MonoBold,
        Self::MonoItalic,
        Self::MonoBoldItalic,
    ];

    /// Picks the face for a combination of styles.
    #[must_use]
    pub const fn select(bold: bool, italic: bool, mono: bool) -> Self {
        match (mono, bold, italic) {
            (false, false, false) => Self::Sans,
            (false, true, false) => Self::SansBold,
            (false, false, true) => Self::SansItalic,
            (false, true, true) => Self::SansBoldItalic,
            (true, false, false) => Self::Mono,
            (true, true, false) => Self::MonoBold,
            (true, false, true) => Self::MonoItalic,
            (true, true, true) => Self::MonoBoldItalic,
        }
    }

    /// The PostScript name of the standard font.
    #[must_use]
    pub const fn base_font(self) -> &'static str {
        match self {
            Self::Sans => "Helvetica",
            Self::SansBold => "Helvetica-Bold",
            Self::SansItalic => "Helvetica-Oblique",
            Self::SansBoldItalic => "Helvetica-BoldOblique",
            Self::Mono => "Courier",
            Self::MonoBold => "Courier-Bold",
            Self::MonoItalic => "Courier-Oblique",
            Self::MonoBoldItalic => "Courier-BoldOblique",
        }
    }

    /// The name the face is registered under in the page resources.
    #[must_use]
    pub const fn resource_name(self) -> &'static str {
        match self {
            Self::Sans => "F1",
            Self::SansBold => "F2",
            Self::SansItalic => "F3",
            Self::SansBoldItalic => "F4",
            Self::Mono => "F5",
            Self::MonoBold => "F6",
            Self::MonoItalic => "F7",
            Self::MonoBoldItalic => "F8",
        }
    }

    const fn is_mono(self) -> bool {
        matches!(
            self,
            Self::Mono | Self::MonoBold | Self::MonoItalic | Self::MonoBoldItalic
        )
    }

    const fn is_bold(self) -> bool {
        matches!(self, Self::SansBold | Self::SansBoldItalic)
    }

    /// Advance width of one encoded byte, in thousandths of an em.
    fn byte_width(self, byte: u8) -> u16 {
        if self.is_mono() {
            return COURIER_WIDTH;
        }
        let table = if self.is_bold() {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        };
        byte.checked_sub(b' ')
            .and_then(|i| table.get(usize::from(i)))
            .copied()
            .unwrap_or(FALLBACK_WIDTH)
    }

    /// Width of `text` set at `size` points.
    #[must_use]
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = encode_win_ansi(text)
            .into_iter()
            .map(|b| u32::from(self.byte_width(b)))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let units = units as f32;
        units * size / 1000.0
    }
}

/// Encodes text for a WinAnsi-encoded standard font.
///
/// Latin-1 maps directly, common typographic punctuation maps to its
/// Windows-1252 slot, tabs become spaces, and anything else becomes `?`.
#[must_use]
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' | '\u{a0}'..='\u{ff}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}
