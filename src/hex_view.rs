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

//! Raw hex/ASCII grid and the value readout under the cursor.

use serde::{Deserialize, Serialize};

use crate::command_view::MAX_FRAME_ROWS;
use crate::error::ViewError;
use crate::memory::{Memory, KSEG0};

/// Widest row the grid lays out; also the largest byte grouping.
pub const MAX_BYTES_PER_ROW: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default)]
pub struct HexOptions {
    pub bytes_per_row: u32,
    /// Bytes per visual group. Must be a power of two.
    pub byte_grouping: u32,
    pub uppercase: bool,
    pub show_text: bool,
    pub dark_zero: bool,
    /// Dim a zero byte only when its whole group is zero.
    pub group_dark_zero: bool,
    pub alt_columns: bool,
    pub alt_rows: bool,
    pub invalid_address: String,
    pub invalid_hex: String,
    pub invalid_text: String,
}

impl Default for HexOptions {
    fn default() -> Self {
        Self {
            bytes_per_row: 16,
            byte_grouping: 4,
            uppercase: true,
            show_text: true,
            dark_zero: true,
            group_dark_zero: true,
            alt_columns: true,
            alt_rows: true,
            invalid_address: "********".to_string(),
            invalid_hex: "**".to_string(),
            invalid_text: ".".to_string(),
        }
    }
}

impl HexOptions {
    /// Rejects row widths and groupings the grid cannot lay out. Rendering
    /// clamps them anyway.
    pub fn validate(&self) -> Result<(), ViewError> {
        if !(1..=MAX_BYTES_PER_ROW).contains(&self.bytes_per_row) {
            return Err(ViewError::InvalidOption(format!(
                "bytes_per_row must be 1..={}, got {}",
                MAX_BYTES_PER_ROW, self.bytes_per_row
            )));
        }
        if !(1..=MAX_BYTES_PER_ROW).contains(&self.byte_grouping) {
            return Err(ViewError::InvalidOption(format!(
                "byte_grouping must be 1..={}, got {}",
                MAX_BYTES_PER_ROW, self.byte_grouping
            )));
        }
        Ok(())
    }

    fn grouping(&self) -> u32 {
        self.byte_grouping
            .clamp(1, MAX_BYTES_PER_ROW)
            .next_power_of_two()
    }

    fn row_bytes(&self) -> u32 {
        self.bytes_per_row.clamp(1, MAX_BYTES_PER_ROW)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexCell {
    pub address: u32,
    pub value: Option<u8>,
    pub text: String,
    pub ascii: String,
    /// Alternate shading from the column group and row parity.
    pub shade: bool,
    /// Dimmed as a zero byte.
    pub dim: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexRow {
    pub address: u32,
    pub address_text: String,
    pub cells: Vec<HexCell>,
}

impl HexRow {
    /// `address  hh hh hh hh  hh ...  ascii`, with an extra space between
    /// groups.
    pub fn text(&self, options: &HexOptions) -> String {
        let grouping = options.grouping() as usize;
        let mut out = format!("{} ", self.address_text);
        for (i, cell) in self.cells.iter().enumerate() {
            if i % grouping == 0 {
                out.push(' ');
            }
            out.push_str(&cell.text);
            out.push(' ');
        }
        if options.show_text {
            out.push(' ');
            for cell in &self.cells {
                out.push_str(&cell.ascii);
            }
        }
        out.trim_end().to_string()
    }
}

fn parity(address: u32, divisor: u32) -> bool {
    let offset = address as i64 - KSEG0 as i64;
    offset.div_euclid(divisor as i64).rem_euclid(2) == 1
}

fn is_dim(memory: &dyn Memory, address: u32, value: u8, options: &HexOptions) -> bool {
    if !options.dark_zero {
        return false;
    }
    if options.group_dark_zero {
        let grouping = options.grouping();
        let start = address & !(grouping - 1);
        matches!(memory.read_buffer(start, grouping), Ok(group) if group.iter().all(|b| *b == 0))
    } else {
        value == 0
    }
}

fn ascii(value: u8, options: &HexOptions) -> String {
    if (value == 0 && options.dark_zero) || !(value.is_ascii_graphic() || value == b' ') {
        options.invalid_text.clone()
    } else {
        (value as char).to_string()
    }
}

pub fn render_hex(
    memory: &dyn Memory,
    base: u32,
    rows: u32,
    options: &HexOptions,
) -> Vec<HexRow> {
    let per_row = options.row_bytes();
    let grouping = options.grouping();
    (0..rows.min(MAX_FRAME_ROWS))
        .map(|r| {
            let address = base.wrapping_add(r.wrapping_mul(per_row));
            let address_text = if address >= KSEG0 {
                let s = format!("{:08x}", address);
                if options.uppercase {
                    s.to_uppercase()
                } else {
                    s
                }
            } else {
                options.invalid_address.clone()
            };
            let row_shade = options.alt_rows && parity(address, per_row);

            let cells = (0..per_row)
                .map(|c| {
                    let cell_address = address.wrapping_add(c);
                    let col_shade = options.alt_columns && parity(cell_address, grouping);
                    let shade = row_shade ^ col_shade;
                    match memory.read8(cell_address) {
                        Ok(value) => {
                            let text = if options.uppercase {
                                format!("{:02X}", value)
                            } else {
                                format!("{:02x}", value)
                            };
                            HexCell {
                                address: cell_address,
                                value: Some(value),
                                text,
                                ascii: ascii(value, options),
                                shade,
                                dim: is_dim(memory, cell_address, value, options),
                            }
                        }
                        Err(_) => HexCell {
                            address: cell_address,
                            value: None,
                            text: options.invalid_hex.clone(),
                            ascii: options.invalid_text.clone(),
                            shade,
                            dim: false,
                        },
                    }
                })
                .collect();

            HexRow {
                address,
                address_text,
                cells,
            }
        })
        .collect()
}

/// Values under the cursor, e.g. `80000000|u8:16 u16:4164 ...`.
///
/// A reading is left out when it would run past the end of memory. With a
/// selection, the end address and length are shown after the cursor.
pub fn readout(memory: &dyn Memory, cursor: u32, selection_end: Option<u32>) -> String {
    let mut out = format!("{:x}", cursor);
    if let Some(end) = selection_end.filter(|e| *e != cursor) {
        out.push_str(&format!(":{:x}({:x})", end, end.wrapping_sub(cursor)));
    }
    out.push('|');

    let Ok(u8v) = memory.read8(cursor) else {
        return out;
    };
    let mut parts = vec![format!("u8:{}", u8v)];
    let u16v = memory.read16(cursor).ok();
    let u32v = memory.read32(cursor).ok();
    let u64v = memory.read64(cursor).ok();

    if let Some(v) = u16v {
        parts.push(format!("u16:{}", v));
    }
    if let Some(v) = u32v {
        parts.push(format!("u32:{}", v));
    }
    if let Some(v) = u64v {
        parts.push(format!("u64:{}", v));
    }
    parts.push(format!("s8:{}", u8v as i8));
    if let Some(v) = u16v {
        parts.push(format!("s16:{}", v as i16));
    }
    if let Some(v) = u32v {
        parts.push(format!("s32:{}", v as i32));
    }
    if let Some(v) = u64v {
        parts.push(format!("s64:{}", v as i64));
    }
    if let Some(v) = u32v {
        parts.push(format!("f32:{}", f32::from_bits(v)));
    }
    if let Some(v) = u64v {
        parts.push(format!("f64:{}", f64::from_bits(v)));
    }
    out.push_str(&parts.join(" "));
    out
}

/// How a typed hex digit lands on the byte under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Replace the nibble under the cursor and step one nibble.
    #[default]
    Nibble,
    /// Both nibbles take the digit.
    Byte,
    /// Only the high nibble changes.
    High,
    /// Only the low nibble changes.
    Low,
}

const NIBBLE_SPACE: u64 = (1 << 33) - 1;

/// Edit cursor, one step per nibble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexCursor {
    pub address: u32,
    /// False while the cursor sits on the high nibble.
    #[serde(default)]
    pub low_nibble: bool,
}

impl HexCursor {
    pub fn new(address: u32) -> Self {
        Self {
            address,
            low_nibble: false,
        }
    }

    fn index(self) -> u64 {
        ((self.address as u64) << 1) | u64::from(self.low_nibble)
    }

    /// Move by `nibbles`, wrapping around the address space.
    pub fn step(self, nibbles: i64) -> Self {
        let index = self.index().wrapping_add(nibbles as u64) & NIBBLE_SPACE;
        Self {
            address: (index >> 1) as u32,
            low_nibble: index & 1 == 1,
        }
    }

    /// High nibble of the first byte in the cursor's row of a grid starting
    /// at `base`.
    pub fn home(self, base: u32, bytes_per_row: u32) -> Self {
        let per_row = bytes_per_row.clamp(1, MAX_BYTES_PER_ROW) as i64;
        let offset = self.address as i64 - base as i64;
        Self::new((base as i64 + offset.div_euclid(per_row) * per_row) as u32)
    }

    /// Low nibble of the last byte in the cursor's row.
    pub fn end(self, base: u32, bytes_per_row: u32) -> Self {
        let per_row = bytes_per_row.clamp(1, MAX_BYTES_PER_ROW);
        Self {
            address: self.home(base, bytes_per_row).address.wrapping_add(per_row - 1),
            low_nibble: true,
        }
    }
}

/// The byte left after typing `digit` at `cursor` over `current`, and where
/// the cursor moves next. Only the low four bits of `digit` are used.
pub fn edit_nibble(cursor: HexCursor, current: u8, digit: u8, mode: EditMode) -> (u8, HexCursor) {
    let low = digit & 0x0F;
    let high = low << 4;
    match mode {
        EditMode::Nibble if cursor.low_nibble => ((current & 0xF0) | low, cursor.step(1)),
        EditMode::Nibble => ((current & 0x0F) | high, cursor.step(1)),
        EditMode::Byte => (high | low, cursor.step(2)),
        EditMode::High => ((current & 0x0F) | high, cursor.step(2)),
        EditMode::Low => ((current & 0xF0) | low, cursor.step(2)),
    }
}

/// One keystroke's worth of change to memory under the hex cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HexEdit {
    Digit {
        digit: u8,
        #[serde(default)]
        mode: EditMode,
    },
    /// Clear the nibble before the cursor and move onto it.
    Backspace,
    /// Zero the byte under the cursor.
    Delete,
}

/// Apply `edit` at `cursor` and return the new cursor. Nothing moves when
/// the write is refused.
pub fn apply_edit(
    memory: &mut dyn Memory,
    cursor: HexCursor,
    edit: HexEdit,
) -> Result<HexCursor, ViewError> {
    match edit {
        HexEdit::Digit { digit, mode } => {
            if digit > 0xF {
                return Err(ViewError::InvalidOption(format!(
                    "{} is not a hex digit",
                    digit
                )));
            }
            let current = memory.read8(cursor.address)?;
            let (byte, next) = edit_nibble(cursor, current, digit, mode);
            memory.write8(cursor.address, byte)?;
            Ok(next)
        }
        HexEdit::Backspace => {
            let prev = cursor.step(-1);
            let current = memory.read8(prev.address)?;
            let byte = if prev.low_nibble {
                current & 0xF0
            } else {
                current & 0x0F
            };
            memory.write8(prev.address, byte)?;
            Ok(prev)
        }
        HexEdit::Delete => {
            memory.write8(cursor.address, 0)?;
            Ok(cursor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RamImage;

    fn image() -> RamImage {
        let mut bytes = vec![0u8; 32];
        bytes[0..4].copy_from_slice(b"Hi!\x01");
        bytes[4] = 0;
        bytes[5] = 0x7F;
        bytes[8..12].copy_from_slice(&1.0f32.to_bits().to_be_bytes());
        RamImage::from_bytes(bytes)
    }

    #[test]
    fn row_layout_and_ascii() {
        let rows = render_hex(&image(), 0x8000_0000, 1, &HexOptions::default());
        let row = &rows[0];
        assert_eq!(row.address_text, "80000000");
        assert_eq!(row.cells.len(), 16);
        assert_eq!(row.cells[0].text, "48");
        assert_eq!(row.cells[0].ascii, "H");
        assert_eq!(row.cells[3].ascii, ".");
        assert_eq!(row.cells[5].ascii, ".");
        assert!(row
            .text(&HexOptions::default())
            .starts_with("80000000  48 69 21 01  00 7F 00 00  3F 80 00 00"));
    }

    #[test]
    fn unreadable_cells_use_placeholders() {
        let opts = HexOptions::default();
        let rows = render_hex(&image(), 0x8000_0018, 2, &opts);
        assert_eq!(rows[0].cells[7].text, "00");
        assert_eq!(rows[0].cells[8].text, "**");
        assert_eq!(rows[0].cells[8].value, None);
        assert_eq!(rows[1].cells[0].ascii, ".");

        let below = render_hex(&image(), 0x7FFF_FFF0, 1, &opts);
        assert_eq!(below[0].address_text, "********");
        assert!(below[0].cells.iter().all(|c| c.text == "**"));
    }

    #[test]
    fn dark_zero_by_group_or_byte() {
        let mem = image();
        let grouped = render_hex(&mem, 0x8000_0000, 1, &HexOptions::default());
        // group 4..8 holds 0x7F, so its zero bytes stay lit
        assert!(!grouped[0].cells[4].dim);
        // group 12..16 is all zero
        assert!(grouped[0].cells[12].dim);

        let per_byte = HexOptions {
            group_dark_zero: false,
            ..HexOptions::default()
        };
        let rows = render_hex(&mem, 0x8000_0000, 1, &per_byte);
        assert!(rows[0].cells[4].dim);
        assert!(!rows[0].cells[5].dim);

        let off = HexOptions {
            dark_zero: false,
            ..HexOptions::default()
        };
        let rows = render_hex(&mem, 0x8000_0000, 1, &off);
        assert!(rows[0].cells.iter().all(|c| !c.dim));
    }

    #[test]
    fn shading_alternates_by_group_and_row() {
        let rows = render_hex(&image(), 0x8000_0000, 2, &HexOptions::default());
        assert!(!rows[0].cells[0].shade);
        assert!(rows[0].cells[4].shade);
        assert!(rows[1].cells[0].shade);
        assert!(!rows[1].cells[4].shade);
    }

    #[test]
    fn readout_values() {
        let mem = image();
        let s = readout(&mem, 0x8000_0008, None);
        assert!(s.starts_with("80000008|u8:63 u16:16256 u32:1065353216"), "{}", s);
        assert!(s.contains(" s8:63 "));
        assert!(s.contains(" f32:1 "));

        let s = readout(&mem, 0x8000_0000, Some(0x8000_0010));
        assert!(s.starts_with("80000000:80000010(10)|u8:72"));
    }

    #[test]
    fn readout_drops_readings_past_the_end() {
        let mem = image();
        let s = readout(&mem, 0x8000_001E, None);
        assert_eq!(s, "8000001e|u8:0 u16:0 s8:0 s16:0");
        assert_eq!(readout(&mem, 0x8000_0020, None), "80000020|");
    }

    #[test]
    fn out_of_range_options_are_rejected_and_clamped() {
        let wide = HexOptions {
            byte_grouping: 0x8000_0001,
            ..HexOptions::default()
        };
        assert!(matches!(wide.validate(), Err(ViewError::InvalidOption(_))));
        let rows = render_hex(&image(), 0x8000_0000, 1, &wide);
        assert_eq!(rows[0].cells.len(), 16);

        let huge = HexOptions {
            bytes_per_row: u32::MAX,
            ..HexOptions::default()
        };
        assert!(huge.validate().is_err());
        let rows = render_hex(&image(), 0x8000_0000, 1, &huge);
        assert_eq!(rows[0].cells.len(), MAX_BYTES_PER_ROW as usize);

        assert!(HexOptions::default().validate().is_ok());
        assert_eq!(
            render_hex(&image(), 0x8000_0000, u32::MAX, &HexOptions::default()).len(),
            MAX_FRAME_ROWS as usize
        );
    }

    #[test]
    fn typed_digit_modes() {
        let high = HexCursor::new(0x8000_0000);
        let low = high.step(1);
        assert_eq!(edit_nibble(high, 0x12, 0xA, EditMode::Nibble), (0xA2, low));
        assert_eq!(
            edit_nibble(low, 0x12, 0xA, EditMode::Nibble),
            (0x1A, HexCursor::new(0x8000_0001))
        );
        assert_eq!(
            edit_nibble(high, 0x12, 0xA, EditMode::Byte),
            (0xAA, HexCursor::new(0x8000_0001))
        );
        assert_eq!(edit_nibble(high, 0x12, 0xA, EditMode::High).0, 0xA2);
        assert_eq!(edit_nibble(high, 0x12, 0xA, EditMode::Low).0, 0x1A);
        assert_eq!(edit_nibble(low, 0x12, 0xA, EditMode::Low).1, low.step(2));
    }

    #[test]
    fn edits_write_through_to_memory() {
        let mut mem = image();
        let cursor = HexCursor::new(0x8000_0000);
        let digit = |d| HexEdit::Digit {
            digit: d,
            mode: EditMode::Nibble,
        };

        let next = apply_edit(&mut mem, cursor, digit(0xC)).unwrap();
        let next = apply_edit(&mut mem, next, digit(0x3)).unwrap();
        assert_eq!(mem.read8(0x8000_0000).unwrap(), 0xC3);
        assert_eq!(next, HexCursor::new(0x8000_0001));

        // backspace clears the nibble before the cursor
        let back = apply_edit(&mut mem, next, HexEdit::Backspace).unwrap();
        assert_eq!(back, HexCursor::new(0x8000_0000).step(1));
        assert_eq!(mem.read8(0x8000_0000).unwrap(), 0xC0);
        let back = apply_edit(&mut mem, back, HexEdit::Backspace).unwrap();
        assert_eq!(back, HexCursor::new(0x8000_0000));
        assert_eq!(mem.read8(0x8000_0000).unwrap(), 0x00);

        let at = HexCursor::new(0x8000_0001);
        assert_eq!(apply_edit(&mut mem, at, HexEdit::Delete).unwrap(), at);
        assert_eq!(mem.read8(0x8000_0001).unwrap(), 0);

        assert!(matches!(
            apply_edit(&mut mem, at, digit(0x10)),
            Err(ViewError::InvalidOption(_))
        ));
        assert!(matches!(
            apply_edit(&mut mem, HexCursor::new(0x8000_0020), digit(1)),
            Err(ViewError::OutOfRange(_))
        ));
    }

    #[test]
    fn home_and_end_stay_on_the_row() {
        let cursor = HexCursor {
            address: 0x8000_0015,
            low_nibble: true,
        };
        assert_eq!(cursor.home(0x8000_0000, 16), HexCursor::new(0x8000_0010));
        assert_eq!(
            cursor.end(0x8000_0000, 16),
            HexCursor {
                address: 0x8000_001F,
                low_nibble: true
            }
        );
        // above the grid's base
        assert_eq!(
            HexCursor::new(0x7FFF_FFFF).home(0x8000_0000, 16),
            HexCursor::new(0x7FFF_FFF0)
        );
        assert_eq!(HexCursor::new(0).step(-1).address, u32::MAX);
    }
}
