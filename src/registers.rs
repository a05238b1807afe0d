/// General purpose register names, indexed by register number.
pub const GPR_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", //
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", //
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", //
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

pub const COP0_NAMES: [&str; 32] = [
    "Index", "Random", "EntryLo0", "EntryLo1", "Context", "PageMask", "Wired", "Reserved7",
    "BadVAddr", "Count", "EntryHi", "Compare", "Status", "Cause", "EPC", "PRId",
    "Config", "LLAddr", "WatchLo", "WatchHi", "XContext", "Reserved21", "Reserved22", "Reserved23",
    "Reserved24", "Reserved25", "PErr", "CacheErr", "TagLo", "TagHi", "ErrorEPC", "Reserved31",
];

pub const SP: u8 = 29;
pub const RA: u8 = 31;

/// Map a 5-bit register number to its conventional name.
pub fn gpr_name(r: u8) -> &'static str {
    GPR_NAMES[(r & 0x1F) as usize]
}

pub fn cop0_name(r: u8) -> &'static str {
    COP0_NAMES[(r & 0x1F) as usize]
}

/// Floating point registers have no ABI names here, just `f<n>`.
pub fn fpr_name(r: u8) -> String {
    format!("f{}", r & 0x1F)
}
