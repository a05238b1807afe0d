//! Column alignment for the instruction grid.
//!
//! Positions are in character cells. Multiply by the font's character width
//! to get pixels.

/// Advance the cursor past a token and snap it to the next column boundary.
///
/// The token always occupies at least one cell. With `align == 0` the cursor
/// is not snapped; otherwise it is rounded up to the next multiple of `align`.
pub fn next_cursor(cursor: u32, token_width: u32, spacing: u32, align: u32) -> u32 {
    let advanced = cursor.saturating_add(token_width.saturating_add(spacing).max(1));
    if align == 0 {
        advanced
    } else {
        advanced.div_ceil(align).saturating_mul(align)
    }
}

/// Runs `next_cursor` over a sequence of tokens, remembering where each one
/// started.
#[derive(Debug, Clone, Default)]
pub struct ColumnCursor {
    cursor: u32,
    spacing: u32,
}

impl ColumnCursor {
    pub fn new(spacing: u32) -> Self {
        Self { cursor: 0, spacing }
    }

    pub fn position(&self) -> u32 {
        self.cursor
    }

    /// Place a token of `width` cells; returns the column it starts at.
    pub fn place(&mut self, width: u32, align: u32) -> u32 {
        let start = self.cursor;
        self.cursor = next_cursor(self.cursor, width, self.spacing, align);
        start
    }
}
