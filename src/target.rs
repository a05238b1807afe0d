//! Branch and jump destination arithmetic.

use crate::decoder::{DecodedInstruction, Operands};

/// Sign-correct a raw 16-bit field: bit 15 set means subtract 0x10000.
pub fn sign_extend16(raw: u16) -> i32 {
    let v = raw as i32;
    if v & 0x8000 != 0 {
        v - 0x10000
    } else {
        v
    }
}

/// PC-relative branch: `(address + 4) + (sext(raw) * 4)`.
pub fn branch_target(address: u32, raw: u16) -> u32 {
    address
        .wrapping_add(4)
        .wrapping_add((sign_extend16(raw) * 4) as u32)
}

/// Absolute jump: the top four bits come from the jump's own address.
pub fn jump_target(address: u32, raw26: u32) -> u32 {
    (address & 0xF000_0000) | ((raw26 & 0x03FF_FFFF) << 2)
}

/// Destination of any control transfer with a static target.
pub fn resolve(address: u32, insn: &DecodedInstruction) -> Option<u32> {
    match insn.operands {
        Operands::Jump { target } => Some(jump_target(address, target)),
        _ => insn.branch_offset().map(|raw| branch_target(address, raw)),
    }
}
