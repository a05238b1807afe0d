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

//! Raw instruction decoder for the VR4300 (MIPS III) instruction set.
//!
//! Decoding is a pure function of the word. Every instruction class carries
//! exactly the typed operand fields it can have, so nothing downstream has to
//! guess which immediate width applies. Coprocessor 1 arithmetic is reported
//! with format-generic mnemonics (`add.fmt`, `cvt.s.fmt`, ...) plus a
//! [`FloatFormat`] tag; the canonicalizer turns those into concrete names.

use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatFormat {
    S,
    D,
    W,
    L,
}

impl FloatFormat {
    fn from_field(fmt: u8) -> Option<Self> {
        match fmt {
            0x10 => Some(FloatFormat::S),
            0x11 => Some(FloatFormat::D),
            0x14 => Some(FloatFormat::W),
            0x15 => Some(FloatFormat::L),
            _ => None,
        }
    }
}

/// A 16-bit immediate, tagged with how the instruction interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Immediate {
    Signed(i16),
    Unsigned(u16),
}

impl Immediate {
    pub fn value(self) -> i32 {
        match self {
            Immediate::Signed(v) => v as i32,
            Immediate::Unsigned(v) => v as i32,
        }
    }
}

/// Operand fields by role. The variant is the instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    /// `syscall` / `break` code field.
    Code { code: u32 },
    /// `rt, offset(base)`
    LoadStore { rt: u8, base: u8, offset: i16 },
    /// `ft, offset(base)`
    FloatLoadStore { ft: u8, base: u8, offset: i16 },
    /// `op, offset(base)`
    Cache { op: u8, base: u8, offset: i16 },
    /// `rt, rs, imm`
    Immediate { rt: u8, rs: u8, imm: Immediate },
    /// `rt, imm`
    LoadUpper { rt: u8, imm: u16 },
    /// `rs, imm` (trap immediates)
    TrapImmediate { rs: u8, imm: i16 },
    /// `rd, rs, rt`
    Register3 { rd: u8, rs: u8, rt: u8 },
    /// `rd, rt, sa`
    Shift { rd: u8, rt: u8, sa: u8 },
    /// `rd, rt, rs`
    ShiftVariable { rd: u8, rt: u8, rs: u8 },
    /// `rs, rt` (multiply, divide, register traps)
    RegisterPair { rs: u8, rt: u8 },
    MoveFromHiLo { rd: u8 },
    MoveToHiLo { rs: u8 },
    JumpRegister { rs: u8 },
    JumpLinkRegister { rd: u8, rs: u8 },
    /// `rs, rt, offset`; `offset` is the raw 16-bit field.
    Branch2 { rs: u8, rt: u8, offset: u16 },
    /// `rs, offset`
    Branch1 { rs: u8, offset: u16 },
    /// `offset` (`bc1f`, `bc1t`, ...)
    BranchFloat { offset: u16 },
    /// Raw 26-bit target field.
    Jump { target: u32 },
    /// `rt, rd` against a COP0 register.
    Cop0Move { rt: u8, rd: u8 },
    /// `rt, fs`
    FloatMove { rt: u8, fs: u8 },
    /// `fd, fs, ft`
    FloatBinary { fmt: FloatFormat, fd: u8, fs: u8, ft: u8 },
    /// `fd, fs`
    FloatUnary { fmt: FloatFormat, fd: u8, fs: u8 },
    /// `fs, ft`
    FloatCompare { fmt: FloatFormat, fs: u8, ft: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub word: u32,
    /// Lowercase decoder mnemonic, possibly format-generic.
    pub mnemonic: &'static str,
    pub operands: Operands,
}

impl DecodedInstruction {
    /// PC-relative conditional branches, the only instructions that open a
    /// branch node.
    pub fn is_relative_branch(&self) -> bool {
        matches!(
            self.operands,
            Operands::Branch1 { .. } | Operands::Branch2 { .. } | Operands::BranchFloat { .. }
        )
    }

    pub fn is_absolute_jump(&self) -> bool {
        matches!(self.operands, Operands::Jump { .. })
    }

    /// Raw 16-bit branch offset field, if this is a relative branch.
    pub fn branch_offset(&self) -> Option<u16> {
        match self.operands {
            Operands::Branch1 { offset, .. }
            | Operands::Branch2 { offset, .. }
            | Operands::BranchFloat { offset } => Some(offset),
            _ => None,
        }
    }

    pub fn float_format(&self) -> Option<FloatFormat> {
        match self.operands {
            Operands::FloatBinary { fmt, .. }
            | Operands::FloatUnary { fmt, .. }
            | Operands::FloatCompare { fmt, .. } => Some(fmt),
            _ => None,
        }
    }
}

/// The decoder collaborator: one word in, one instruction (or an error) out.
pub trait Decoder {
    fn decode(&self, word: u32) -> Result<DecodedInstruction, DecodeError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MipsDecoder;

impl Decoder for MipsDecoder {
    fn decode(&self, word: u32) -> Result<DecodedInstruction, DecodeError> {
        decode(word)
    }
}

struct Fields {
    op: u8,
    rs: u8,
    rt: u8,
    rd: u8,
    sa: u8,
    funct: u8,
    imm: u16,
    target: u32,
}

impl Fields {
    fn split(word: u32) -> Self {
        Self {
            op: ((word >> 26) & 0x3F) as u8,
            rs: ((word >> 21) & 0x1F) as u8,
            rt: ((word >> 16) & 0x1F) as u8,
            rd: ((word >> 11) & 0x1F) as u8,
            sa: ((word >> 6) & 0x1F) as u8,
            funct: (word & 0x3F) as u8,
            imm: (word & 0xFFFF) as u16,
            target: word & 0x03FF_FFFF,
        }
    }
}

const FLOAT_CONDITIONS: [&str; 16] = [
    "c.f.fmt",
    "c.un.fmt",
    "c.eq.fmt",
    "c.ueq.fmt",
    "c.olt.fmt",
    "c.ult.fmt",
    "c.ole.fmt",
    "c.ule.fmt",
    "c.sf.fmt",
    "c.ngle.fmt",
    "c.seq.fmt",
    "c.ngl.fmt",
    "c.lt.fmt",
    "c.nge.fmt",
    "c.le.fmt",
    "c.ngt.fmt",
];

pub fn decode(word: u32) -> Result<DecodedInstruction, DecodeError> {
    let f = Fields::split(word);
    let done = |mnemonic: &'static str, operands: Operands| {
        Ok(DecodedInstruction {
            word,
            mnemonic,
            operands,
        })
    };

    let load_store = Operands::LoadStore {
        rt: f.rt,
        base: f.rs,
        offset: f.imm as i16,
    };
    let float_load_store = Operands::FloatLoadStore {
        ft: f.rt,
        base: f.rs,
        offset: f.imm as i16,
    };
    let signed_imm = Operands::Immediate {
        rt: f.rt,
        rs: f.rs,
        imm: Immediate::Signed(f.imm as i16),
    };
    let unsigned_imm = Operands::Immediate {
        rt: f.rt,
        rs: f.rs,
        imm: Immediate::Unsigned(f.imm),
    };
    let branch2 = Operands::Branch2 {
        rs: f.rs,
        rt: f.rt,
        offset: f.imm,
    };
    let branch1 = Operands::Branch1 {
        rs: f.rs,
        offset: f.imm,
    };

    match f.op {
        0x00 => decode_special(word, &f),
        0x01 => decode_regimm(word, &f),
        0x02 => done("j", Operands::Jump { target: f.target }),
        0x03 => done("jal", Operands::Jump { target: f.target }),
        0x04 => done("beq", branch2),
        0x05 => done("bne", branch2),
        0x06 => done("blez", branch1),
        0x07 => done("bgtz", branch1),
        0x08 => done("addi", signed_imm),
        0x09 => done("addiu", signed_imm),
        0x0A => done("slti", signed_imm),
        0x0B => done("sltiu", signed_imm),
        0x0C => done("andi", unsigned_imm),
        0x0D => done("ori", unsigned_imm),
        0x0E => done("xori", unsigned_imm),
        0x0F => done("lui", Operands::LoadUpper { rt: f.rt, imm: f.imm }),
        0x10 => decode_cop0(word, &f),
        0x11 => decode_cop1(word, &f),
        0x12 => Err(DecodeError::new(word, "coprocessor 2 is unusable")),
        0x14 => done("beql", branch2),
        0x15 => done("bnel", branch2),
        0x16 => done("blezl", branch1),
        0x17 => done("bgtzl", branch1),
        0x18 => done("daddi", signed_imm),
        0x19 => done("daddiu", signed_imm),
        0x1A => done("ldl", load_store),
        0x1B => done("ldr", load_store),
        0x20 => done("lb", load_store),
        0x21 => done("lh", load_store),
        0x22 => done("lwl", load_store),
        0x23 => done("lw", load_store),
        0x24 => done("lbu", load_store),
        0x25 => done("lhu", load_store),
        0x26 => done("lwr", load_store),
        0x27 => done("lwu", load_store),
        0x28 => done("sb", load_store),
        0x29 => done("sh", load_store),
        0x2A => done("swl", load_store),
        0x2B => done("sw", load_store),
        0x2C => done("sdl", load_store),
        0x2D => done("sdr", load_store),
        0x2E => done("swr", load_store),
        0x2F => done(
            "cache",
            Operands::Cache {
                op: f.rt,
                base: f.rs,
                offset: f.imm as i16,
            },
        ),
        0x30 => done("ll", load_store),
        0x31 => done("lwc1", float_load_store),
        0x34 => done("lld", load_store),
        0x35 => done("ldc1", float_load_store),
        0x37 => done("ld", load_store),
        0x38 => done("sc", load_store),
        0x39 => done("swc1", float_load_store),
        0x3C => done("scd", load_store),
        0x3D => done("sdc1", float_load_store),
        0x3F => done("sd", load_store),
        op => Err(DecodeError::new(word, format!("reserved opcode 0x{:02x}", op))),
    }
}

fn decode_special(word: u32, f: &Fields) -> Result<DecodedInstruction, DecodeError> {
    let r3 = Operands::Register3 {
        rd: f.rd,
        rs: f.rs,
        rt: f.rt,
    };
    let shift = Operands::Shift {
        rd: f.rd,
        rt: f.rt,
        sa: f.sa,
    };
    let shiftv = Operands::ShiftVariable {
        rd: f.rd,
        rt: f.rt,
        rs: f.rs,
    };
    let pair = Operands::RegisterPair { rs: f.rs, rt: f.rt };

    let (mnemonic, operands) = match f.funct {
        0x00 if word == 0 => ("nop", Operands::None),
        0x00 => ("sll", shift),
        0x02 => ("srl", shift),
        0x03 => ("sra", shift),
        0x04 => ("sllv", shiftv),
        0x06 => ("srlv", shiftv),
        0x07 => ("srav", shiftv),
        0x08 => ("jr", Operands::JumpRegister { rs: f.rs }),
        0x09 => ("jalr", Operands::JumpLinkRegister { rd: f.rd, rs: f.rs }),
        0x0C => ("syscall", Operands::Code { code: (word >> 6) & 0xF_FFFF }),
        0x0D => ("break", Operands::Code { code: (word >> 6) & 0xF_FFFF }),
        0x0F => ("sync", Operands::None),
        0x10 => ("mfhi", Operands::MoveFromHiLo { rd: f.rd }),
        0x11 => ("mthi", Operands::MoveToHiLo { rs: f.rs }),
        0x12 => ("mflo", Operands::MoveFromHiLo { rd: f.rd }),
        0x13 => ("mtlo", Operands::MoveToHiLo { rs: f.rs }),
        0x14 => ("dsllv", shiftv),
        0x16 => ("dsrlv", shiftv),
        0x17 => ("dsrav", shiftv),
        0x18 => ("mult", pair),
        0x19 => ("multu", pair),
        0x1A => ("div", pair),
        0x1B => ("divu", pair),
        0x1C => ("dmult", pair),
        0x1D => ("dmultu", pair),
        0x1E => ("ddiv", pair),
        0x1F => ("ddivu", pair),
        0x20 => ("add", r3),
        0x21 => ("addu", r3),
        0x22 => ("sub", r3),
        0x23 => ("subu", r3),
        0x24 => ("and", r3),
        0x25 => ("or", r3),
        0x26 => ("xor", r3),
        0x27 => ("nor", r3),
        0x2A => ("slt", r3),
        0x2B => ("sltu", r3),
        0x2C => ("dadd", r3),
        0x2D => ("daddu", r3),
        0x2E => ("dsub", r3),
        0x2F => ("dsubu", r3),
        0x30 => ("tge", pair),
        0x31 => ("tgeu", pair),
        0x32 => ("tlt", pair),
        0x33 => ("tltu", pair),
        0x34 => ("teq", pair),
        0x36 => ("tne", pair),
        0x38 => ("dsll", shift),
        0x3A => ("dsrl", shift),
        0x3B => ("dsra", shift),
        0x3C => ("dsll32", shift),
        0x3E => ("dsrl32", shift),
        0x3F => ("dsra32", shift),
        funct => {
            return Err(DecodeError::new(
                word,
                format!("reserved SPECIAL function 0x{:02x}", funct),
            ))
        }
    };
    Ok(DecodedInstruction {
        word,
        mnemonic,
        operands,
    })
}

fn decode_regimm(word: u32, f: &Fields) -> Result<DecodedInstruction, DecodeError> {
    let branch1 = Operands::Branch1 {
        rs: f.rs,
        offset: f.imm,
    };
    let trap = Operands::TrapImmediate {
        rs: f.rs,
        imm: f.imm as i16,
    };
    let (mnemonic, operands) = match f.rt {
        0x00 => ("bltz", branch1),
        0x01 => ("bgez", branch1),
        0x02 => ("bltzl", branch1),
        0x03 => ("bgezl", branch1),
        0x08 => ("tgei", trap),
        0x09 => ("tgeiu", trap),
        0x0A => ("tlti", trap),
        0x0B => ("tltiu", trap),
        0x0C => ("teqi", trap),
        0x0E => ("tnei", trap),
        0x10 => ("bltzal", branch1),
        0x11 => ("bgezal", branch1),
        0x12 => ("bltzall", branch1),
        0x13 => ("bgezall", branch1),
        rt => {
            return Err(DecodeError::new(
                word,
                format!("reserved REGIMM selector 0x{:02x}", rt),
            ))
        }
    };
    Ok(DecodedInstruction {
        word,
        mnemonic,
        operands,
    })
}

fn decode_cop0(word: u32, f: &Fields) -> Result<DecodedInstruction, DecodeError> {
    let mv = Operands::Cop0Move { rt: f.rt, rd: f.rd };
    let (mnemonic, operands) = match f.rs {
        0x00 => ("mfc0", mv),
        0x01 => ("dmfc0", mv),
        0x04 => ("mtc0", mv),
        0x05 => ("dmtc0", mv),
        0x10..=0x1F => match f.funct {
            0x01 => ("tlbr", Operands::None),
            0x02 => ("tlbwi", Operands::None),
            0x06 => ("tlbwr", Operands::None),
            0x08 => ("tlbp", Operands::None),
            0x18 => ("eret", Operands::None),
            funct => {
                return Err(DecodeError::new(
                    word,
                    format!("reserved COP0 function 0x{:02x}", funct),
                ))
            }
        },
        rs => {
            return Err(DecodeError::new(
                word,
                format!("reserved COP0 selector 0x{:02x}", rs),
            ))
        }
    };
    Ok(DecodedInstruction {
        word,
        mnemonic,
        operands,
    })
}

fn decode_cop1(word: u32, f: &Fields) -> Result<DecodedInstruction, DecodeError> {
    let mv = Operands::FloatMove { rt: f.rt, fs: f.rd };
    let done = |mnemonic: &'static str, operands: Operands| {
        Ok(DecodedInstruction {
            word,
            mnemonic,
            operands,
        })
    };
    match f.rs {
        0x00 => return done("mfc1", mv),
        0x01 => return done("dmfc1", mv),
        0x02 => return done("cfc1", mv),
        0x04 => return done("mtc1", mv),
        0x05 => return done("dmtc1", mv),
        0x06 => return done("ctc1", mv),
        0x08 => {
            let mnemonic = match f.rt & 0x3 {
                0 => "bc1f",
                1 => "bc1t",
                2 => "bc1fl",
                _ => "bc1tl",
            };
            return done(mnemonic, Operands::BranchFloat { offset: f.imm });
        }
        _ => {}
    }

    let fmt = FloatFormat::from_field(f.rs).ok_or_else(|| {
        DecodeError::new(word, format!("reserved COP1 format 0x{:02x}", f.rs))
    })?;
    // COP1 arithmetic: fs in rd's slot, fd in sa's slot, ft in rt's slot
    let (ft, fs, fd) = (f.rt, f.rd, f.sa);
    let binary = Operands::FloatBinary { fmt, fd, fs, ft };
    let unary = Operands::FloatUnary { fmt, fd, fs };

    match f.funct {
        0x00 => done("add.fmt", binary),
        0x01 => done("sub.fmt", binary),
        0x02 => done("mul.fmt", binary),
        0x03 => done("div.fmt", binary),
        0x04 => done("sqrt.fmt", unary),
        0x05 => done("abs.fmt", unary),
        0x06 => done("mov.fmt", unary),
        0x07 => done("neg.fmt", unary),
        0x08 => done("round.l.fmt", unary),
        0x09 => done("trunc.l.fmt", unary),
        0x0A => done("ceil.l.fmt", unary),
        0x0B => done("floor.l.fmt", unary),
        0x0C => done("round.w.fmt", unary),
        0x0D => done("trunc.w.fmt", unary),
        0x0E => done("ceil.w.fmt", unary),
        0x0F => done("floor.w.fmt", unary),
        0x20 => done("cvt.s.fmt", unary),
        0x21 => done("cvt.d.fmt", unary),
        0x24 => done("cvt.w.fmt", unary),
        0x25 => done("cvt.l.fmt", unary),
        0x30..=0x3F => done(
            FLOAT_CONDITIONS[(f.funct & 0xF) as usize],
            Operands::FloatCompare { fmt, fs, ft },
        ),
        funct => Err(DecodeError::new(
            word,
            format!("reserved COP1 function 0x{:02x}", funct),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beq_fields() {
        let i = decode(0x1044_0003).unwrap();
        assert_eq!(i.mnemonic, "beq");
        assert_eq!(
            i.operands,
            Operands::Branch2 {
                rs: 2,
                rt: 4,
                offset: 3
            }
        );
        assert!(i.is_relative_branch());
        assert_eq!(i.branch_offset(), Some(3));
    }

    #[test]
    fn zero_word_is_nop_but_other_shifts_are_not() {
        assert_eq!(decode(0).unwrap().mnemonic, "nop");
        // sll t0, t1, 2
        let i = decode(0x0009_4080).unwrap();
        assert_eq!(i.mnemonic, "sll");
        assert_eq!(i.operands, Operands::Shift { rd: 8, rt: 9, sa: 2 });
    }

    #[test]
    fn immediates_carry_their_signedness() {
        // addiu sp, sp, -0x18
        let i = decode(0x27BD_FFE8).unwrap();
        assert_eq!(
            i.operands,
            Operands::Immediate {
                rt: 29,
                rs: 29,
                imm: Immediate::Signed(-0x18)
            }
        );
        // ori t0, t0, 0xffff
        let i = decode(0x3508_FFFF).unwrap();
        assert_eq!(
            i.operands,
            Operands::Immediate {
                rt: 8,
                rs: 8,
                imm: Immediate::Unsigned(0xFFFF)
            }
        );
    }

    #[test]
    fn load_store_and_jumps() {
        // lw ra, 0x14(sp)
        let i = decode(0x8FBF_0014).unwrap();
        assert_eq!(i.mnemonic, "lw");
        assert_eq!(
            i.operands,
            Operands::LoadStore {
                rt: 31,
                base: 29,
                offset: 0x14
            }
        );
        // jal 0x80001000
        let i = decode(0x0C00_0400).unwrap();
        assert_eq!(i.mnemonic, "jal");
        assert_eq!(i.operands, Operands::Jump { target: 0x400 });
        assert!(i.is_absolute_jump());
        assert!(!i.is_relative_branch());
        // jr ra
        let i = decode(0x03E0_0008).unwrap();
        assert_eq!(i.operands, Operands::JumpRegister { rs: 31 });
    }

    #[test]
    fn cop1_arithmetic_is_format_generic() {
        // add.s f0, f2, f4
        let i = decode(0x4604_1000).unwrap();
        assert_eq!(i.mnemonic, "add.fmt");
        assert_eq!(
            i.operands,
            Operands::FloatBinary {
                fmt: FloatFormat::S,
                fd: 0,
                fs: 2,
                ft: 4
            }
        );
        // cvt.s.w f0, f2
        let i = decode(0x4680_1020).unwrap();
        assert_eq!(i.mnemonic, "cvt.s.fmt");
        assert_eq!(i.float_format(), Some(FloatFormat::W));
        // c.lt.s f2, f4
        let i = decode(0x4604_103C).unwrap();
        assert_eq!(i.mnemonic, "c.lt.fmt");
        // bc1t +2
        let i = decode(0x4501_0002).unwrap();
        assert_eq!(i.mnemonic, "bc1t");
        assert_eq!(i.branch_offset(), Some(2));
    }

    #[test]
    fn reserved_encodings_are_errors() {
        let e = decode(0x7C00_0000).unwrap_err();
        assert_eq!(e.word, 0x7C00_0000);
        assert!(e.reason.contains("0x1f"));
        assert!(decode(0x0000_0001).is_err());
        assert!(decode(0x4A00_0000).is_err());
        // COP1 with format field 0x12
        assert!(decode(0x4640_0000).is_err());
    }
}
