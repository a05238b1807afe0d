//! Rasterises a frame onto a character grid for terminals and tests.

use crate::command_view::Frame;
use crate::layout::DrawPrimitive;

pub struct TextCanvas {
    width: usize,
    height: usize,
    cells: Vec<char>,
}

impl TextCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![' '; width * height],
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<char> {
        self.index(x as i64, y as i64).map(|i| self.cells[i])
    }

    fn put(&mut self, x: i64, y: i64, c: char) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = c;
        }
    }

    /// Line glyphs merge into `+` where they cross.
    fn stroke(&mut self, x: i64, y: i64, c: char) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        self.cells[i] = match (self.cells[i], c) {
            (' ', c) => c,
            (old, c) if old == c => c,
            ('-' | '|' | '+', _) => '+',
            (_, c) => c,
        };
    }

    pub fn text(&mut self, x: usize, y: usize, s: &str) {
        for (i, c) in s.chars().enumerate() {
            self.put((x + i) as i64, y as i64, c);
        }
    }

    /// Coordinates are in cells; fractions are dropped.
    pub fn draw(&mut self, primitive: &DrawPrimitive) {
        match *primitive {
            DrawPrimitive::Line { from, to, .. } => {
                let (x0, y0) = (from.x.floor() as i64, from.y.floor() as i64);
                let (x1, y1) = (to.x.floor() as i64, to.y.floor() as i64);
                if y0 == y1 {
                    for x in x0.min(x1)..=x0.max(x1) {
                        self.stroke(x, y0, '-');
                    }
                } else if x0 == x1 {
                    for y in y0.min(y1)..=y0.max(y1) {
                        self.stroke(x0, y, '|');
                    }
                } else {
                    log::debug!("skipping diagonal line {:?} -> {:?}", from, to);
                }
            }
            DrawPrimitive::Circle { center, .. } => {
                self.put(center.x.floor() as i64, center.y.floor() as i64, 'o');
            }
        }
    }

    /// Primitives first, then row text on top.
    pub fn render_frame(frame: &Frame, width: usize) -> Self {
        let mut canvas = Self::new(width, frame.rows.len());
        for p in &frame.primitives {
            canvas.draw(p);
        }
        for (y, row) in frame.rows.iter().enumerate() {
            for token in &row.tokens {
                canvas.text(token.column as usize, y, &token.text);
            }
        }
        canvas
    }

    pub fn lines(&self) -> Vec<String> {
        self.cells
            .chunks(self.width.max(1))
            .map(|l| l.iter().collect::<String>().trim_end().to_string())
            .collect()
    }
}

impl std::fmt::Display for TextCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_view::{CommandView, ViewerTab};
    use crate::decoder::MipsDecoder;
    use crate::formatter::FormatOptions;
    use crate::layout::{Geometry, Point};
    use crate::memory::RamImage;
    use crate::palette::Rgba;

    #[test]
    fn crossing_lines_become_plus() {
        let mut c = TextCanvas::new(5, 3);
        let color = Rgba::rgb(1.0, 1.0, 1.0);
        c.draw(&DrawPrimitive::Line {
            from: Point::new(0.0, 1.0),
            to: Point::new(4.0, 1.0),
            color,
            thickness: 1.0,
        });
        c.draw(&DrawPrimitive::Line {
            from: Point::new(2.0, 0.0),
            to: Point::new(2.0, 2.0),
            color,
            thickness: 1.0,
        });
        assert_eq!(c.lines(), vec!["  |", "--+--", "  |"]);
    }

    #[test]
    fn frame_draws_nested_brackets_in_gutter() {
        // beq zero, zero -> +0x20 ; bne a0, zero -> +0x10
        let mut words = vec![0u32; 10];
        words[0] = 0x1000_0007;
        words[2] = 0x1480_0001;
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        let mem = RamImage::from_bytes(bytes);

        let view = CommandView::new(FormatOptions::default(), Geometry::unit());
        let frame = view.render(&mem, &MipsDecoder, &ViewerTab::default(), 10);
        let canvas = TextCanvas::render_frame(&frame, 60);
        let lines = canvas.lines();

        // baseline sits at column 7, the outer bracket two cells left of it
        assert_eq!(canvas.get(5, 0), Some('+'));
        assert_eq!(canvas.get(5, 4), Some('|'));
        assert_eq!(canvas.get(6, 2), Some('+'));
        assert_eq!(canvas.get(5, 8), Some('+'));
        assert!(lines[0].contains("80000000"));
        assert!(lines[2].contains("BNE"));
    }
}
