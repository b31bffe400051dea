use ratatui::prelude::Color;

/// 32-bit ARGB color as stored on tasks and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedColor(pub u32);

impl PackedColor {
    pub const WHITE: PackedColor = PackedColor(0xFFFF_FFFF);
    pub const LIGHT_GRAY: PackedColor = PackedColor(0xFFCC_CCCC);
    pub const YELLOW: PackedColor = PackedColor(0xFFFF_FF00);
    pub const CYAN: PackedColor = PackedColor(0xFF00_FFFF);
    pub const GREEN: PackedColor = PackedColor(0xFF00_FF00);
    pub const BLUE: PackedColor = PackedColor(0xFF00_00FF);
    pub const RED: PackedColor = PackedColor(0xFFFF_0000);
    pub const MAGENTA: PackedColor = PackedColor(0xFFFF_00FF);

    pub fn rgb(self) -> (u8, u8, u8) {
        let [_, r, g, b] = self.0.to_be_bytes();
        (r, g, b)
    }

    /// Wide form used in the stored board: ARGB in the upper word.
    pub fn to_wide(self) -> u64 {
        (self.0 as u64) << 32
    }

    /// Accepts both the wide form and a bare ARGB word.
    pub fn from_wide(value: u64) -> Self {
        if value > u32::MAX as u64 {
            PackedColor((value >> 32) as u32)
        } else {
            PackedColor(value as u32)
        }
    }

    pub fn to_terminal(self) -> Color {
        let (r, g, b) = self.rgb();
        Color::Rgb(r, g, b)
    }

    pub fn name(self) -> &'static str {
        PALETTE
            .iter()
            .find(|(color, _)| *color == self)
            .map(|(_, name)| *name)
            .unwrap_or("custom")
    }
}

/// Swatches offered by the color picker, in display order.
pub const PALETTE: [(PackedColor, &str); 8] = [
    (PackedColor::WHITE, "white"),
    (PackedColor::LIGHT_GRAY, "light gray"),
    (PackedColor::YELLOW, "yellow"),
    (PackedColor::CYAN, "cyan"),
    (PackedColor::GREEN, "green"),
    (PackedColor::BLUE, "blue"),
    (PackedColor::RED, "red"),
    (PackedColor::MAGENTA, "magenta"),
];

pub fn palette_index(color: PackedColor) -> Option<usize> {
    PALETTE.iter().position(|(c, _)| *c == color)
}
