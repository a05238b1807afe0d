//! Pseudo-op canonicalization: format-generic COP1 mnemonics to concrete ones.
//!
//! Pure lookup. The key is the decoder mnemonic plus the instruction's format
//! tag; operands are never touched. Mnemonics with no entry pass through as-is,
//! which is how an impossible pairing such as `add.fmt` on a word format
//! reaches the formatter's diagnostic path.

use crate::decoder::{DecodedInstruction, FloatFormat};

/// (generic, single, double)
static SINGLE_DOUBLE: &[(&str, &str, &str)] = &[
    ("add.fmt", "add.s", "add.d"),
    ("sub.fmt", "sub.s", "sub.d"),
    ("mul.fmt", "mul.s", "mul.d"),
    ("div.fmt", "div.s", "div.d"),
    ("sqrt.fmt", "sqrt.s", "sqrt.d"),
    ("abs.fmt", "abs.s", "abs.d"),
    ("mov.fmt", "mov.s", "mov.d"),
    ("neg.fmt", "neg.s", "neg.d"),
    ("round.l.fmt", "round.l.s", "round.l.d"),
    ("trunc.l.fmt", "trunc.l.s", "trunc.l.d"),
    ("ceil.l.fmt", "ceil.l.s", "ceil.l.d"),
    ("floor.l.fmt", "floor.l.s", "floor.l.d"),
    ("round.w.fmt", "round.w.s", "round.w.d"),
    ("trunc.w.fmt", "trunc.w.s", "trunc.w.d"),
    ("ceil.w.fmt", "ceil.w.s", "ceil.w.d"),
    ("floor.w.fmt", "floor.w.s", "floor.w.d"),
    ("cvt.w.fmt", "cvt.w.s", "cvt.w.d"),
    ("cvt.l.fmt", "cvt.l.s", "cvt.l.d"),
    ("c.f.fmt", "c.f.s", "c.f.d"),
    ("c.un.fmt", "c.un.s", "c.un.d"),
    ("c.eq.fmt", "c.eq.s", "c.eq.d"),
    ("c.ueq.fmt", "c.ueq.s", "c.ueq.d"),
    ("c.olt.fmt", "c.olt.s", "c.olt.d"),
    ("c.ult.fmt", "c.ult.s", "c.ult.d"),
    ("c.ole.fmt", "c.ole.s", "c.ole.d"),
    ("c.ule.fmt", "c.ule.s", "c.ule.d"),
    ("c.sf.fmt", "c.sf.s", "c.sf.d"),
    ("c.ngle.fmt", "c.ngle.s", "c.ngle.d"),
    ("c.seq.fmt", "c.seq.s", "c.seq.d"),
    ("c.ngl.fmt", "c.ngl.s", "c.ngl.d"),
    ("c.lt.fmt", "c.lt.s", "c.lt.d"),
    ("c.nge.fmt", "c.nge.s", "c.nge.d"),
    ("c.le.fmt", "c.le.s", "c.le.d"),
    ("c.ngt.fmt", "c.ngt.s", "c.ngt.d"),
];

/// Conversions whose source may also be a fixed point format.
static CONVERSIONS: &[(&str, FloatFormat, &str)] = &[
    ("cvt.s.fmt", FloatFormat::D, "cvt.s.d"),
    ("cvt.s.fmt", FloatFormat::W, "cvt.s.w"),
    ("cvt.s.fmt", FloatFormat::L, "cvt.s.l"),
    ("cvt.d.fmt", FloatFormat::S, "cvt.d.s"),
    ("cvt.d.fmt", FloatFormat::W, "cvt.d.w"),
    ("cvt.d.fmt", FloatFormat::L, "cvt.d.l"),
];

pub fn lookup(generic: &str, fmt: FloatFormat) -> Option<&'static str> {
    let single_double = match fmt {
        FloatFormat::S => SINGLE_DOUBLE
            .iter()
            .find(|(g, _, _)| *g == generic)
            .map(|(_, s, _)| *s),
        FloatFormat::D => SINGLE_DOUBLE
            .iter()
            .find(|(g, _, _)| *g == generic)
            .map(|(_, _, d)| *d),
        FloatFormat::W | FloatFormat::L => None,
    };
    single_double.or_else(|| {
        CONVERSIONS
            .iter()
            .find(|(g, f, _)| *g == generic && *f == fmt)
            .map(|(_, _, c)| *c)
    })
}

/// The concrete mnemonic for an instruction. Runs once per instruction,
/// before any case folding.
pub fn canonicalize(insn: &DecodedInstruction) -> &'static str {
    insn.float_format()
        .and_then(|fmt| lookup(insn.mnemonic, fmt))
        .unwrap_or(insn.mnemonic)
}
