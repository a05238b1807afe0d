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

//! Turns decoded instructions into rows of coloured, column-aligned tokens.
//!
//! A row is laid out as
//!
//! ```text
//! | gutter (branch arcs) | address | breakpoint | mnemonic | operand, operand, ... |
//! ```
//!
//! The gutter and breakpoint columns hold no text here; the renderer draws
//! branch arcs and breakpoint markers into them. Every column start comes from
//! [`crate::columns::next_cursor`], so operands line up no matter how long the
//! mnemonic is.

use serde::{Deserialize, Serialize};

use crate::canonical;
use crate::columns::{next_cursor, ColumnCursor};
use crate::decoder::{DecodedInstruction, FloatFormat, Operands};
use crate::error::{DecodeError, OutOfRangeAddress, ViewError};
use crate::palette::ColorClass;
use crate::registers::{self, RA, SP};
use crate::target;

pub const GUTTER_CELLS: u32 = 8;
const GUTTER_ALIGN: u32 = 2;
const ADDRESS_ALIGN: u32 = 2;
const BREAKPOINT_CELLS: u32 = 6;
const MNEMONIC_ALIGN: u32 = 8;
pub const OPERAND_ALIGN: u32 = 4;

/// Shown in place of an instruction whose word could not be read.
pub const UNREADABLE_GLYPH: &str = "********";

/// Largest extra gap between tokens, in cells.
pub const MAX_SPACING: u32 = 16;

/// The formatter's mode flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(default)]
pub struct FormatOptions {
    pub uppercase: bool,
    pub hex_immediates: bool,
    /// `$sp` instead of `sp`. Each token also takes one extra cell.
    pub dollar_registers: bool,
    /// Extra cells after every token.
    pub spacing: u32,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            uppercase: true,
            hex_immediates: true,
            dollar_registers: false,
            spacing: 0,
        }
    }
}

impl FormatOptions {
    pub fn cell_spacing(&self) -> u32 {
        self.spacing.saturating_add(u32::from(self.dollar_registers))
    }

    /// Spacing wider than [`MAX_SPACING`] pushes operands off any screen.
    pub fn validate(&self) -> Result<(), ViewError> {
        if self.spacing > MAX_SPACING {
            return Err(ViewError::InvalidOption(format!(
                "spacing must be at most {}, got {}",
                MAX_SPACING, self.spacing
            )));
        }
        Ok(())
    }

    /// Column where the address text starts. Branch arcs live left of it.
    pub fn address_column(&self) -> u32 {
        next_cursor(0, GUTTER_CELLS, self.cell_spacing(), GUTTER_ALIGN)
    }

    pub fn breakpoint_column(&self) -> u32 {
        next_cursor(self.address_column(), 8, self.cell_spacing(), ADDRESS_ALIGN)
    }

    pub fn mnemonic_column(&self) -> u32 {
        next_cursor(
            self.breakpoint_column(),
            BREAKPOINT_CELLS,
            self.cell_spacing(),
            OPERAND_ALIGN,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct Token {
    pub text: String,
    pub color: ColorClass,
    /// Boundary the column after this token snaps to (0 = none).
    pub align: u32,
    /// Start column in character cells.
    pub column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Instruction,
    Unsupported,
    DecodeError,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct FormattedRow {
    pub address: u32,
    pub word: Option<u32>,
    pub kind: RowKind,
    pub tokens: Vec<Token>,
}

impl FormattedRow {
    /// Token texts joined with single spaces, ignoring columns.
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn token(&self, text: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.text == text)
    }
}

struct RowBuilder {
    cursor: ColumnCursor,
    tokens: Vec<Token>,
}

impl RowBuilder {
    fn new(options: &FormatOptions) -> Self {
        let mut cursor = ColumnCursor::new(options.cell_spacing());
        cursor.place(GUTTER_CELLS, GUTTER_ALIGN);
        Self {
            cursor,
            tokens: Vec::with_capacity(8),
        }
    }

    fn push(&mut self, text: String, color: ColorClass, align: u32) {
        let column = self.cursor.place(text.chars().count() as u32, align);
        self.tokens.push(Token {
            text,
            color,
            align,
            column,
        });
    }

    /// Reserve an empty column.
    fn skip(&mut self, width: u32, align: u32) {
        self.cursor.place(width, align);
    }

    fn finish(self, address: u32, word: Option<u32>, kind: RowKind) -> FormattedRow {
        FormattedRow {
            address,
            word,
            kind,
            tokens: self.tokens,
        }
    }
}

/// Formatting rules exist for every concrete mnemonic. A format-generic one
/// left over from canonicalization has none.
pub fn has_rule(mnemonic: &str) -> bool {
    !mnemonic.ends_with(".fmt")
}

/// `addiu sp, sp, imm` adjusts the stack frame.
pub fn stack_adjustment(mnemonic: &str, insn: &DecodedInstruction) -> Option<i32> {
    match insn.operands {
        Operands::Immediate { rt, rs, imm } if mnemonic == "addiu" && rt == SP && rs == SP => {
            Some(imm.value())
        }
        _ => None,
    }
}

pub fn mnemonic_color(mnemonic: &str, insn: &DecodedInstruction) -> ColorClass {
    match mnemonic {
        "nop" => ColorClass::Disabled,
        "jalr" => ColorClass::Jump,
        _ if insn.is_absolute_jump() => ColorClass::Jump,
        _ if insn.is_relative_branch() => ColorClass::Branch,
        _ => match stack_adjustment(mnemonic, insn) {
            Some(imm) if imm < 0 => ColorClass::StackIn,
            Some(_) => ColorClass::StackOut,
            None => ColorClass::Instruction,
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    options: FormatOptions,
}

impl Formatter {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    fn case(&self, s: &str) -> String {
        if self.options.uppercase {
            s.to_uppercase()
        } else {
            s.to_lowercase()
        }
    }

    fn register(&self, name: &str) -> String {
        let name = self.case(name);
        if self.options.dollar_registers {
            format!("${}", name)
        } else {
            name
        }
    }

    fn gpr(&self, r: u8) -> String {
        self.register(registers::gpr_name(r))
    }

    fn fpr(&self, r: u8) -> String {
        self.register(&registers::fpr_name(r))
    }

    fn cop0(&self, r: u8) -> String {
        self.register(registers::cop0_name(r))
    }

    /// Hex immediates keep a lowercase `0x` and case only the digits.
    pub fn immediate(&self, value: i64, pad: usize) -> String {
        if !self.options.hex_immediates {
            return value.to_string();
        }
        let digits = self.case(&format!("{:0width$x}", value.unsigned_abs(), width = pad));
        if value < 0 {
            format!("-0x{}", digits)
        } else {
            format!("0x{}", digits)
        }
    }

    pub fn address_text(&self, address: u32) -> String {
        self.case(&format!("{:08x}", address))
    }

    fn begin(&self, address: u32) -> RowBuilder {
        let mut row = RowBuilder::new(&self.options);
        row.push(self.address_text(address), ColorClass::Address, ADDRESS_ALIGN);
        row.skip(BREAKPOINT_CELLS, OPERAND_ALIGN);
        row
    }

    /// Format one decoded instruction located at `address`.
    pub fn format(&self, address: u32, insn: &DecodedInstruction) -> FormattedRow {
        let mnemonic = canonical::canonicalize(insn);
        if !has_rule(mnemonic) {
            let err = ViewError::UnsupportedMnemonic {
                mnemonic: mnemonic.to_string(),
            };
            log::debug!("0x{:08x}: {}", address, err);
            return self.format_unsupported(address, insn, mnemonic);
        }

        let mut row = self.begin(address);
        row.push(
            self.case(mnemonic),
            mnemonic_color(mnemonic, insn),
            MNEMONIC_ALIGN,
        );
        self.push_operands(&mut row, address, insn, mnemonic);
        row.finish(address, Some(insn.word), RowKind::Instruction)
    }

    fn push_operands(
        &self,
        row: &mut RowBuilder,
        address: u32,
        insn: &DecodedInstruction,
        mnemonic: &str,
    ) {
        const A: u32 = OPERAND_ALIGN;
        let text = ColorClass::Text;
        let list = |s: String| s + ",";

        match insn.operands {
            Operands::None => {}
            Operands::Code { code } => {
                if code != 0 {
                    row.push(self.immediate(code as i64, 0), ColorClass::Immediate, A);
                }
            }
            Operands::LoadStore { rt, base, offset } => {
                row.push(list(self.gpr(rt)), text, A);
                row.push(self.immediate(offset as i64, 4), ColorClass::Immediate, A);
                row.push(format!("({})", self.gpr(base)), ColorClass::RsOffset, A);
            }
            Operands::FloatLoadStore { ft, base, offset } => {
                row.push(list(self.fpr(ft)), text, A);
                row.push(self.immediate(offset as i64, 4), ColorClass::Immediate, A);
                row.push(format!("({})", self.gpr(base)), ColorClass::RsOffset, A);
            }
            Operands::Cache { op, base, offset } => {
                row.push(list(self.immediate(op as i64, 2)), ColorClass::Immediate, A);
                row.push(self.immediate(offset as i64, 4), ColorClass::Immediate, A);
                row.push(format!("({})", self.gpr(base)), ColorClass::RsOffset, A);
            }
            Operands::Immediate { rt, rs, imm } => match stack_adjustment(mnemonic, insn) {
                Some(adjust) => {
                    let color = if adjust < 0 {
                        ColorClass::StackIn
                    } else {
                        ColorClass::StackOut
                    };
                    row.push(list(self.gpr(rt)), color, A);
                    row.push(list(self.gpr(rs)), color, A);
                    row.push(self.immediate(adjust as i64, 0), color, A);
                }
                None => {
                    row.push(list(self.gpr(rt)), text, A);
                    row.push(list(self.gpr(rs)), text, A);
                    row.push(self.immediate(imm.value() as i64, 4), ColorClass::Immediate, A);
                }
            },
            Operands::LoadUpper { rt, imm } => {
                row.push(list(self.gpr(rt)), text, A);
                row.push(self.immediate(imm as i64, 4), ColorClass::Immediate, A);
            }
            Operands::TrapImmediate { rs, imm } => {
                row.push(list(self.gpr(rs)), text, A);
                row.push(self.immediate(imm as i64, 4), ColorClass::Immediate, A);
            }
            Operands::Register3 { rd, rs, rt } => {
                row.push(list(self.gpr(rd)), text, A);
                row.push(list(self.gpr(rs)), text, A);
                row.push(self.gpr(rt), text, A);
            }
            Operands::Shift { rd, rt, sa } => {
                row.push(list(self.gpr(rd)), text, A);
                row.push(list(self.gpr(rt)), text, A);
                row.push(self.immediate(sa as i64, 4), ColorClass::Immediate, A);
            }
            Operands::ShiftVariable { rd, rt, rs } => {
                row.push(list(self.gpr(rd)), text, A);
                row.push(list(self.gpr(rt)), text, A);
                row.push(self.gpr(rs), text, A);
            }
            Operands::RegisterPair { rs, rt } => {
                row.push(list(self.gpr(rs)), text, A);
                row.push(self.gpr(rt), text, A);
            }
            Operands::MoveFromHiLo { rd } => row.push(self.gpr(rd), text, A),
            Operands::MoveToHiLo { rs } => row.push(self.gpr(rs), text, A),
            Operands::JumpRegister { rs } => {
                let color = if rs == RA {
                    ColorClass::JrRa
                } else {
                    ColorClass::Jump
                };
                row.push(self.gpr(rs), color, A);
            }
            Operands::JumpLinkRegister { rd, rs } => {
                if rd != RA {
                    row.push(list(self.gpr(rd)), ColorClass::Jump, A);
                }
                row.push(self.gpr(rs), ColorClass::Jump, A);
            }
            Operands::Branch2 { rs, rt, offset } => {
                row.push(list(self.gpr(rs)), ColorClass::Branch, A);
                row.push(list(self.gpr(rt)), ColorClass::Branch, A);
                self.push_branch_target(row, address, offset);
            }
            Operands::Branch1 { rs, offset } => {
                row.push(list(self.gpr(rs)), ColorClass::Branch, A);
                self.push_branch_target(row, address, offset);
            }
            Operands::BranchFloat { offset } => self.push_branch_target(row, address, offset),
            Operands::Jump { target } => {
                let absolute = target::jump_target(address, target);
                row.push(self.immediate(absolute as i64, 8), ColorClass::Jump, A);
            }
            Operands::Cop0Move { rt, rd } => {
                row.push(list(self.gpr(rt)), text, A);
                row.push(self.cop0(rd), text, A);
            }
            Operands::FloatMove { rt, fs } => {
                row.push(list(self.gpr(rt)), text, A);
                row.push(self.fpr(fs), text, A);
            }
            Operands::FloatBinary { fd, fs, ft, .. } => {
                row.push(list(self.fpr(fd)), text, A);
                row.push(list(self.fpr(fs)), text, A);
                row.push(self.fpr(ft), text, A);
            }
            Operands::FloatUnary { fd, fs, .. } => {
                row.push(list(self.fpr(fd)), text, A);
                row.push(self.fpr(fs), text, A);
            }
            Operands::FloatCompare { fs, ft, .. } => {
                row.push(list(self.fpr(fs)), text, A);
                row.push(self.fpr(ft), text, A);
            }
        }
    }

    /// `target (offset)`: absolute destination, then the signed word offset.
    fn push_branch_target(&self, row: &mut RowBuilder, address: u32, offset: u16) {
        let absolute = target::branch_target(address, offset);
        row.push(
            self.immediate(absolute as i64, 8),
            ColorClass::Branch,
            OPERAND_ALIGN,
        );
        row.push(
            format!("({})", self.immediate(target::sign_extend16(offset) as i64, 4)),
            ColorClass::RsOffset,
            OPERAND_ALIGN,
        );
    }

    fn format_unsupported(
        &self,
        address: u32,
        insn: &DecodedInstruction,
        mnemonic: &str,
    ) -> FormattedRow {
        let mut text = format!("BOGUS! inst: {}", self.case(mnemonic));
        for (name, value) in self.fields(&insn.operands) {
            text.push_str(&format!(" {}: {}", name, value));
        }
        let mut row = self.begin(address);
        row.push(text, ColorClass::Diagnostic, 0);
        row.finish(address, Some(insn.word), RowKind::Unsupported)
    }

    /// Every operand field by role, for the diagnostic row.
    fn fields(&self, operands: &Operands) -> Vec<(&'static str, String)> {
        let imm = |v: i64| self.immediate(v, 0);
        let fmt = |f: FloatFormat| self.case(&format!("{:?}", f));
        match *operands {
            Operands::None => vec![],
            Operands::Code { code } => vec![("code", imm(code as i64))],
            Operands::LoadStore { rt, base, offset } => vec![
                ("rt", self.gpr(rt)),
                ("base", self.gpr(base)),
                ("offset", imm(offset as i64)),
            ],
            Operands::FloatLoadStore { ft, base, offset } => vec![
                ("ft", self.fpr(ft)),
                ("base", self.gpr(base)),
                ("offset", imm(offset as i64)),
            ],
            Operands::Cache { op, base, offset } => vec![
                ("op", imm(op as i64)),
                ("base", self.gpr(base)),
                ("offset", imm(offset as i64)),
            ],
            Operands::Immediate { rt, rs, imm: i } => vec![
                ("rt", self.gpr(rt)),
                ("rs", self.gpr(rs)),
                ("imm", imm(i.value() as i64)),
            ],
            Operands::LoadUpper { rt, imm: i } => {
                vec![("rt", self.gpr(rt)), ("imm", imm(i as i64))]
            }
            Operands::TrapImmediate { rs, imm: i } => {
                vec![("rs", self.gpr(rs)), ("imm", imm(i as i64))]
            }
            Operands::Register3 { rd, rs, rt } => vec![
                ("rd", self.gpr(rd)),
                ("rs", self.gpr(rs)),
                ("rt", self.gpr(rt)),
            ],
            Operands::Shift { rd, rt, sa } => vec![
                ("rd", self.gpr(rd)),
                ("rt", self.gpr(rt)),
                ("sa", imm(sa as i64)),
            ],
            Operands::ShiftVariable { rd, rt, rs } => vec![
                ("rd", self.gpr(rd)),
                ("rt", self.gpr(rt)),
                ("rs", self.gpr(rs)),
            ],
            Operands::RegisterPair { rs, rt } => {
                vec![("rs", self.gpr(rs)), ("rt", self.gpr(rt))]
            }
            Operands::MoveFromHiLo { rd } => vec![("rd", self.gpr(rd))],
            Operands::MoveToHiLo { rs } => vec![("rs", self.gpr(rs))],
            Operands::JumpRegister { rs } => vec![("rs", self.gpr(rs))],
            Operands::JumpLinkRegister { rd, rs } => {
                vec![("rd", self.gpr(rd)), ("rs", self.gpr(rs))]
            }
            Operands::Branch2 { rs, rt, offset } => vec![
                ("rs", self.gpr(rs)),
                ("rt", self.gpr(rt)),
                ("offset", imm(offset as i64)),
            ],
            Operands::Branch1 { rs, offset } => {
                vec![("rs", self.gpr(rs)), ("offset", imm(offset as i64))]
            }
            Operands::BranchFloat { offset } => vec![("offset", imm(offset as i64))],
            Operands::Jump { target } => vec![("target", imm(target as i64))],
            Operands::Cop0Move { rt, rd } => vec![("rt", self.gpr(rt)), ("rd", self.cop0(rd))],
            Operands::FloatMove { rt, fs } => vec![("rt", self.gpr(rt)), ("fs", self.fpr(fs))],
            Operands::FloatBinary { fmt: f, fd, fs, ft } => vec![
                ("fmt", fmt(f)),
                ("fd", self.fpr(fd)),
                ("fs", self.fpr(fs)),
                ("ft", self.fpr(ft)),
            ],
            Operands::FloatUnary { fmt: f, fd, fs } => vec![
                ("fmt", fmt(f)),
                ("fd", self.fpr(fd)),
                ("fs", self.fpr(fs)),
            ],
            Operands::FloatCompare { fmt: f, fs, ft } => vec![
                ("fmt", fmt(f)),
                ("fs", self.fpr(fs)),
                ("ft", self.fpr(ft)),
            ],
        }
    }

    /// Placeholder row for a word the decoder rejected.
    pub fn format_decode_error(&self, address: u32, error: &DecodeError) -> FormattedRow {
        let mut row = self.begin(address);
        row.push("ERROR:".to_string(), ColorClass::Error, OPERAND_ALIGN);
        row.push(error.to_string(), ColorClass::Error, 0);
        row.finish(address, Some(error.word), RowKind::DecodeError)
    }

    /// Placeholder row for an address memory could not supply.
    pub fn format_unreadable(&self, address: u32, _error: &OutOfRangeAddress) -> FormattedRow {
        let mut row = self.begin(address);
        row.push(
            UNREADABLE_GLYPH.to_string(),
            ColorClass::Disabled,
            MNEMONIC_ALIGN,
        );
        row.finish(address, None, RowKind::Unreadable)
    }
}
