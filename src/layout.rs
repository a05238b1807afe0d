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

//! Turns a branch forest into positioned draw primitives.
//!
//! Layout runs in two passes over the whole forest. The first assigns every
//! node its nesting depth and finds the deepest one. The second emits the
//! brackets: the deeper a branch, the closer its bracket sits to the text.

use serde::{Deserialize, Serialize};

use crate::branch_tree::BranchForest;
use crate::formatter::{FormatOptions, FormattedRow};
use crate::palette::{Palette, Rgba};

/// Small seeded generator. Same seed, same sequence.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f64 / 4_294_967_296.0) as f32
    }
}

/// Colour of the branch leaving `address`. Depends on nothing else, so a
/// branch keeps its colour while the window scrolls.
pub fn branch_color(address: u32) -> Rgba {
    let mut rand = Mulberry32::new(address);
    let r = rand.next_f32();
    let g = rand.next_f32();
    let b = rand.next_f32();
    Rgba::rgb(0.1 + r * 0.6, 0.1 + g * 0.6, 0.1 + b * 0.6)
}

fn overlay_color(seed: u32) -> Rgba {
    let mut rand = Mulberry32::new(seed);
    Rgba::rgb(rand.next_f32(), rand.next_f32(), rand.next_f32())
}

/// Pixel metrics of the instruction body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub char_width: f32,
    pub line_height: f32,
    /// y of the first row.
    pub body_top: f32,
    /// Horizontal step between nesting levels.
    pub unit_width: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 13.0,
            body_top: 0.0,
            unit_width: 4.0,
        }
    }
}

impl Geometry {
    /// One pixel per character cell, for rasterising onto a text grid.
    pub fn unit() -> Self {
        Self {
            char_width: 1.0,
            line_height: 1.0,
            body_top: 0.0,
            unit_width: 1.0,
        }
    }

    /// x of the boundary just left of `column`.
    pub fn separator_x(&self, column: u32) -> f32 {
        column.saturating_sub(1) as f32 * self.char_width
    }

    /// y of `address` inside a window starting at `base`, clamped to the top
    /// edge when the address is above the window.
    pub fn row_y(&self, base: u32, address: u32) -> f32 {
        let rows = (address as i64 - base as i64) as f32 / 4.0;
        let y = self.body_top + self.line_height * rows + self.line_height / 4.0;
        y.max(self.body_top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawPrimitive {
    Line {
        from: Point,
        to: Point,
        color: Rgba,
        thickness: f32,
    },
    Circle {
        center: Point,
        radius: f32,
        color: Rgba,
    },
}

impl DrawPrimitive {
    fn line(from: Point, to: Point, color: Rgba) -> Self {
        DrawPrimitive::Line {
            from,
            to,
            color,
            thickness: 1.0,
        }
    }

    pub fn color(&self) -> Rgba {
        match self {
            DrawPrimitive::Line { color, .. } | DrawPrimitive::Circle { color, .. } => *color,
        }
    }
}

/// The visible slice of memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub base: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub primitives: Vec<DrawPrimitive>,
    pub max_depth: u32,
}

/// Pass A: depth of every node, counting top-level branches as depth 1.
/// Returns the maximum depth over the whole forest.
pub fn assign_depths(forest: &mut BranchForest) -> u32 {
    let mut max_depth = 0;
    for id in forest.preorder() {
        let depth = match forest.node(id).parent {
            Some(parent) => forest.node(parent).depth.unwrap_or(0) + 1,
            None => 1,
        };
        forest.node_mut(id).depth = Some(depth);
        max_depth = max_depth.max(depth);
    }
    max_depth
}

/// Horizontal distance between a bracket and the baseline.
pub fn inset(depth: u32, max_depth: u32, geometry: &Geometry) -> f32 {
    (1 + max_depth.saturating_sub(depth)) as f32 * geometry.unit_width
}

/// Pass B: brackets for every node, in the same order as pass A.
pub fn draw_branches(
    forest: &BranchForest,
    max_depth: u32,
    window: Window,
    baseline_x: f32,
    geometry: &Geometry,
    out: &mut Vec<DrawPrimitive>,
) {
    for id in forest.preorder() {
        let node = forest.node(id);
        let depth = node.depth.unwrap_or(max_depth);
        let y0 = geometry.row_y(window.base, node.from);

        if node.is_self_loop() {
            let radius = geometry.line_height / 4.0;
            out.push(DrawPrimitive::Circle {
                center: Point::new(baseline_x - radius - 1.0, y0),
                radius,
                color: node.color,
            });
            continue;
        }

        let y1 = geometry.row_y(window.base, node.to);
        let x = baseline_x - inset(depth, max_depth, geometry);
        out.push(DrawPrimitive::line(
            Point::new(baseline_x, y0),
            Point::new(x, y0),
            node.color,
        ));
        out.push(DrawPrimitive::line(
            Point::new(baseline_x, y1),
            Point::new(x, y1),
            node.color,
        ));
        out.push(DrawPrimitive::line(
            Point::new(x, y0),
            Point::new(x, y1),
            node.color,
        ));
    }
}

/// Vertical rules left of the address, breakpoint and mnemonic columns.
pub fn separators(
    options: &FormatOptions,
    window: Window,
    geometry: &Geometry,
    palette: &Palette,
) -> Vec<DrawPrimitive> {
    let top = geometry.body_top;
    let bottom = top + geometry.line_height * window.rows as f32;
    [
        options.address_column(),
        options.breakpoint_column(),
        options.mnemonic_column(),
    ]
    .iter()
    .map(|col| {
        let x = geometry.separator_x(*col);
        DrawPrimitive::line(Point::new(x, top), Point::new(x, bottom), palette.separator)
    })
    .collect()
}

/// Underline every token so column alignment can be checked by eye. The
/// colour is seeded from the row address plus the token's column.
pub fn alignment_overlay(
    rows: &[FormattedRow],
    window: Window,
    geometry: &Geometry,
) -> Vec<DrawPrimitive> {
    let mut out = Vec::new();
    for row in rows {
        let row_top = geometry.body_top
            + geometry.line_height * ((row.address.wrapping_sub(window.base)) / 4) as f32;
        let y = row_top + geometry.line_height - 1.0;
        for token in &row.tokens {
            let x0 = token.column as f32 * geometry.char_width;
            let x1 = x0 + token.text.chars().count() as f32 * geometry.char_width;
            out.push(DrawPrimitive::Line {
                from: Point::new(x0, y),
                to: Point::new(x1, y),
                color: overlay_color(row.address.wrapping_add(token.column)),
                thickness: 2.0,
            });
        }
    }
    out
}

/// Both passes plus the static rules.
pub fn layout(
    forest: &mut BranchForest,
    window: Window,
    options: &FormatOptions,
    geometry: &Geometry,
    palette: &Palette,
) -> Layout {
    let max_depth = assign_depths(forest);
    let mut primitives = separators(options, window, geometry, palette);
    let baseline_x = geometry.separator_x(options.address_column());
    draw_branches(forest, max_depth, window, baseline_x, geometry, &mut primitives);
    Layout {
        primitives,
        max_depth,
    }
}
