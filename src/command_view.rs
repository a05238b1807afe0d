// Copyright (c) 2026 MIPS-Memview Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The instruction viewer: one tab's position plus the per-frame pipeline.
//!
//! Every frame reads, decodes and formats each visible word while feeding
//! branches to the tree builder, then lays the finished forest out once.
//! Nothing survives between frames except the tab's base address.

use serde::{Deserialize, Serialize};

use crate::branch_tree::{BranchForest, BranchTreeBuilder};
use crate::decoder::Decoder;
use crate::error::ViewError;
use crate::formatter::{FormatOptions, FormattedRow, Formatter, Token};
use crate::layout::{self, DrawPrimitive, Geometry, Window};
use crate::memory::{Memory, KSEG0};
use crate::palette::{Palette, Rgba};
use crate::target;
use crate::utils;

/// Most rows one frame renders. Larger requests are clamped here and
/// refused by the helper protocol.
pub const MAX_FRAME_ROWS: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerTab {
    pub address: u32,
    pub open: bool,
    #[serde(default)]
    pub note: String,
}

impl Default for ViewerTab {
    fn default() -> Self {
        Self::new(KSEG0)
    }
}

impl ViewerTab {
    pub fn new(address: u32) -> Self {
        Self {
            address,
            open: true,
            note: String::new(),
        }
    }

    /// Mouse wheel: positive `wheel` moves towards lower addresses.
    pub fn scroll(&mut self, wheel: i32) {
        self.address = self.address.wrapping_sub((wheel as i64 * 4) as u32);
    }

    pub fn page_down(&mut self, rows: u32) {
        self.address = self.address.wrapping_add(rows.wrapping_mul(4));
    }

    pub fn page_up(&mut self, rows: u32) {
        self.address = self.address.wrapping_sub(rows.wrapping_mul(4));
    }

    /// Jump to a hex expression, absolute or relative to the current base.
    /// The result is word aligned.
    pub fn goto(&mut self, expr: &str) -> Result<u32, ViewError> {
        let address = utils::resolve_address(expr, self.address)? & !3;
        self.address = address;
        Ok(address)
    }

    /// Move to the destination of the branch or jump at `address`. Returns
    /// the new base, or `None` (leaving the tab alone) when the word there
    /// is unreadable or has no static target.
    pub fn follow(
        &mut self,
        memory: &dyn Memory,
        decoder: &dyn Decoder,
        address: u32,
    ) -> Option<u32> {
        let word = memory.read32(address).ok()?;
        let insn = decoder.decode(word).ok()?;
        let dest = target::resolve(address, &insn)?;
        log::debug!("follow 0x{:08x} -> 0x{:08x}", address, dest);
        self.address = dest;
        Some(dest)
    }

    pub fn window(&self, rows: u32) -> Window {
        Window {
            base: self.address,
            rows,
        }
    }
}

/// Everything a renderer needs for one redraw.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub base: u32,
    pub rows: Vec<FormattedRow>,
    pub primitives: Vec<DrawPrimitive>,
    pub max_depth: u32,
    #[serde(skip)]
    pub forest: BranchForest,
}

#[derive(Debug, Clone, Default)]
pub struct CommandView {
    formatter: Formatter,
    geometry: Geometry,
    palette: Palette,
    alignment_overlay: bool,
}

impl CommandView {
    pub fn new(options: FormatOptions, geometry: Geometry) -> Self {
        Self {
            formatter: Formatter::new(options),
            geometry,
            palette: Palette::default(),
            alignment_overlay: false,
        }
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Underline every token with a seeded colour.
    pub fn with_alignment_overlay(mut self, enabled: bool) -> Self {
        self.alignment_overlay = enabled;
        self
    }

    /// RGBA the palette assigns to a token's colour class.
    pub fn token_color(&self, token: &Token) -> Rgba {
        self.palette.color(token.color)
    }

    /// Decode, format and lay out `rows` words starting at the tab's base.
    ///
    /// A word that cannot be read or decoded becomes a placeholder row and
    /// the walk carries on with the next one.
    pub fn render(
        &self,
        memory: &dyn Memory,
        decoder: &dyn Decoder,
        tab: &ViewerTab,
        rows: u32,
    ) -> Frame {
        let window = tab.window(rows.min(MAX_FRAME_ROWS));
        let rows = window.rows;
        let mut builder = BranchTreeBuilder::new();
        let mut formatted = Vec::with_capacity(rows as usize);

        for index in 0..rows {
            let address = window.base.wrapping_add(index.wrapping_mul(4));
            let row = match memory.read32(address) {
                Err(e) => {
                    log::debug!("{}", e);
                    builder.observe(address, None);
                    self.formatter.format_unreadable(address, &e)
                }
                Ok(word) => match decoder.decode(word) {
                    Err(e) => {
                        log::debug!("0x{:08x}: {}", address, e);
                        builder.observe(address, None);
                        self.formatter.format_decode_error(address, &e)
                    }
                    Ok(insn) => {
                        builder.observe_instruction(address, &insn);
                        self.formatter.format(address, &insn)
                    }
                },
            };
            formatted.push(row);
        }

        let mut forest = builder.finish();
        let mut laid_out = layout::layout(
            &mut forest,
            window,
            self.formatter.options(),
            &self.geometry,
            &self.palette,
        );
        if self.alignment_overlay {
            laid_out.primitives.extend(layout::alignment_overlay(
                &formatted,
                window,
                &self.geometry,
            ));
        }

        Frame {
            base: window.base,
            rows: formatted,
            primitives: laid_out.primitives,
            max_depth: laid_out.max_depth,
            forest,
        }
    }
}
