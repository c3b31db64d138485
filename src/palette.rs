use crate::models::DirectionRef;
use ahash::AHashMap;
use rgb::RGB8;

/// Stock line palette, cycled in the order directions first appear.
pub const LINE_PALETTE: [RGB8; 10] = [
    RGB8::new(0xff, 0x3b, 0x30),
    RGB8::new(0x34, 0xc7, 0x59),
    RGB8::new(0x00, 0x7a, 0xff),
    RGB8::new(0xff, 0xcc, 0x00),
    RGB8::new(0xaf, 0x52, 0xde),
    RGB8::new(0x5a, 0xc8, 0xfa),
    RGB8::new(0xff, 0x95, 0x00),
    RGB8::new(0x58, 0x56, 0xd6),
    RGB8::new(0x64, 0xd2, 0xff),
    RGB8::new(0xff, 0x2d, 0x55),
];

pub fn css_hex(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Hands out line colors per direction. A key keeps its color for the
/// allocator's whole lifetime, so toggling an overlay off and on again
/// redraws it in the same color.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<RGB8>,
    assigned: AHashMap<DirectionRef, RGB8>,
    cursor: usize,
}

impl ColorAllocator {
    pub fn new() -> Self {
        Self::with_palette(LINE_PALETTE.to_vec())
    }

    /// Empty palettes fall back to the stock set.
    pub fn with_palette(palette: Vec<RGB8>) -> Self {
        let palette = if palette.is_empty() {
            LINE_PALETTE.to_vec()
        } else {
            palette
        };
        ColorAllocator {
            palette,
            assigned: AHashMap::new(),
            cursor: 0,
        }
    }

    /// Restore an allocator from a previously assigned table. The cursor
    /// continues after the restored entries.
    pub fn with_table(palette: Vec<RGB8>, assigned: AHashMap<DirectionRef, RGB8>) -> Self {
        let cursor = assigned.len();
        let mut alloc = Self::with_palette(palette);
        alloc.assigned = assigned;
        alloc.cursor = cursor;
        alloc
    }

    pub fn color_for(&mut self, key: DirectionRef) -> RGB8 {
        if let Some(color) = self.assigned.get(&key) {
            return *color;
        }
        let color = self.palette[self.cursor % self.palette.len()];
        self.cursor += 1;
        self.assigned.insert(key, color);
        color
    }

    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new()
    }
}
