use std::sync::OnceLock;

use regex::Regex;

use crate::error::ViewError;

/// A goto target typed by the user: either an absolute address or a signed
/// displacement from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressExpr {
    Absolute(u32),
    Relative(i64),
}

fn address_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-])?\s*(?:0[xX])?([0-9A-Fa-f]{1,8})\s*$")
            .expect("address pattern is valid")
    })
}

/// Numbers are always hex, with or without `0x`. A leading sign makes the
/// expression relative.
pub fn parse_address_expr(input: &str) -> Result<AddressExpr, ViewError> {
    let caps = address_regex()
        .captures(input)
        .ok_or_else(|| ViewError::InvalidAddress(input.to_string()))?;
    let value = u32::from_str_radix(&caps[2], 16)
        .map_err(|_| ViewError::InvalidAddress(input.to_string()))?;
    Ok(match caps.get(1).map(|m| m.as_str()) {
        Some("+") => AddressExpr::Relative(value as i64),
        Some(_) => AddressExpr::Relative(-(value as i64)),
        None => AddressExpr::Absolute(value),
    })
}

/// Evaluate `input` against `current`. Relative results wrap around the
/// 32-bit address space.
pub fn resolve_address(input: &str, current: u32) -> Result<u32, ViewError> {
    Ok(match parse_address_expr(input)? {
        AddressExpr::Absolute(a) => a,
        AddressExpr::Relative(d) => (current as i64 + d) as u32,
    })
}

/// Parse hex address from string (supports "0x1234" or "1234" format)
pub fn parse_hex_address(input: &str) -> Option<u32> {
    match parse_address_expr(input) {
        Ok(AddressExpr::Absolute(a)) => Some(a),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_forms() {
        assert_eq!(
            parse_address_expr("0x80001000").unwrap(),
            AddressExpr::Absolute(0x8000_1000)
        );
        assert_eq!(
            parse_address_expr(" 80001000 ").unwrap(),
            AddressExpr::Absolute(0x8000_1000)
        );
        assert_eq!(parse_hex_address("0X8000abcd"), Some(0x8000_ABCD));
    }

    #[test]
    fn relative_forms() {
        assert_eq!(resolve_address("+0x40", 0x8000_0000).unwrap(), 0x8000_0040);
        assert_eq!(resolve_address("-8", 0x8000_0000).unwrap(), 0x7FFF_FFF8);
        assert_eq!(resolve_address("- 10", 0x8000_0020).unwrap(), 0x8000_0010);
        assert_eq!(parse_hex_address("+4"), None);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "0x", "zz", "123456789", "0x8000 1000", "--4"] {
            assert!(
                matches!(parse_address_expr(bad), Err(ViewError::InvalidAddress(_))),
                "{:?}",
                bad
            );
        }
    }
}
