// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert GitHub Copilot chat exports to PDF.
//!
//! This crate provides parsing, segmentation, layout and PDF output for
//! turning GitHub Copilot's JSON chat export format into a paginated
//! document, with fenced code rendered as separate monospace blocks.
//!
//! # Overview
//!
//! 1. [`parser`] reads the JSON export into typed requests
//! 2. [`segment`] cuts fenced code out of each message and yields ordered
//!    text and code segments
//! 3. [`markup`] escapes prose and rewrites its inline markdown
//! 4. [`renderer`] arranges everything into a story of blocks
//! 5. [`pdf`] paginates the story and writes the PDF
//!
//! # Example
//!
//! ```no_run
//! use cp2pdf::{parser, pdf, renderer};
//!
//! let json = std::fs::read_to_string("chat.json").unwrap();
//! let chat = parser::parse_chat(&json).unwrap();
//!
//! let opts = renderer::RenderOptions {
//!     show_model: true,
//!     ..Default::default()
//! };
//! let story = renderer::render_chat(&chat, &opts);
//!
//! let bytes = pdf::write_pdf(&story, pdf::PageSize::A4, "Copilot Chat").unwrap();
//! std::fs::write("chat.pdf", bytes).unwrap();
//! ```

#![deny(missing_docs)]

pub mod fonts;
pub mod markup;
pub mod parser;
pub mod pdf;
pub mod renderer;
pub mod segment;
