//! PPU register bit layouts: PPUCTRL, PPUMASK, PPUSTATUS, and the internal
//! `v`/`t` loopy-address pair used for scroll and VRAM addressing.

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Control: u8 {
        const NAMETABLE_LOW       = 0b0000_0001;
        const NAMETABLE_HIGH      = 0b0000_0010;
        const VERTICAL_INCREMENT  = 0b0000_0100;
        const SPRITE_PATTERN_HIGH = 0b0000_1000;
        const BG_PATTERN_HIGH     = 0b0001_0000;
        const TALL_SPRITES        = 0b0010_0000;
        const MASTER_SLAVE        = 0b0100_0000;
        const GENERATE_NMI        = 0b1000_0000;
    }
}

impl Control {
    pub fn vram_increment(self) -> u16 {
        if self.contains(Self::VERTICAL_INCREMENT) {
            32
        } else {
            1
        }
    }

    pub fn bg_pattern_table_base(self) -> u16 {
        if self.contains(Self::BG_PATTERN_HIGH) {
            0x1000
        } else {
            0
        }
    }

    pub fn sprite_pattern_table_base(self) -> u16 {
        if self.contains(Self::SPRITE_PATTERN_HIGH) {
            0x1000
        } else {
            0
        }
    }

    pub fn sprite_height(self) -> u16 {
        if self.contains(Self::TALL_SPRITES) {
            16
        } else {
            8
        }
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mask: u8 {
        const GRAYSCALE          = 0b0000_0001;
        const SHOW_BG_LEFT       = 0b0000_0010;
        const SHOW_SPRITES_LEFT  = 0b0000_0100;
        const SHOW_BACKGROUND    = 0b0000_1000;
        const SHOW_SPRITES       = 0b0001_0000;
        const EMPHASIZE_RED      = 0b0010_0000;
        const EMPHASIZE_GREEN    = 0b0100_0000;
        const EMPHASIZE_BLUE     = 0b1000_0000;
    }
}

impl Mask {
    pub fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BACKGROUND | Self::SHOW_SPRITES)
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const VBLANK          = 0b1000_0000;
    }
}

/// The internal "loopy" VRAM address: 15 bits split into coarse x/y, a
/// nametable select, and fine y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct VramAddr(pub u16);

impl VramAddr {
    pub const COARSE_X_MASK: u16 = 0x001F;
    pub const COARSE_Y_MASK: u16 = 0x03E0;
    pub const NAMETABLE_MASK: u16 = 0x0C00;
    pub const FINE_Y_MASK: u16 = 0x7000;

    pub fn coarse_x(self) -> u16 {
        self.0 & Self::COARSE_X_MASK
    }

    pub fn coarse_y(self) -> u16 {
        (self.0 & Self::COARSE_Y_MASK) >> 5
    }

    pub fn fine_y(self) -> u16 {
        (self.0 & Self::FINE_Y_MASK) >> 12
    }

    pub fn set(&mut self, value: u16) {
        self.0 = value & 0x7FFF;
    }

    /// Increments coarse x, wrapping at 31 and toggling the horizontal
    /// nametable bit.
    pub fn increment_coarse_x(&mut self) {
        if self.coarse_x() == 31 {
            self.0 &= !Self::COARSE_X_MASK;
            self.0 ^= 0x0400;
        } else {
            self.0 += 1;
        }
    }

    /// Increments fine y, carrying into coarse y with the 29/31 wraparound
    /// quirk (scanline 29 wraps and toggles the vertical nametable bit;
    /// an out-of-range value of 31 wraps without toggling, matching a
    /// common real-hardware mis-set from modifying the address directly).
    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.0 += 0x1000;
        } else {
            self.0 &= !Self::FINE_Y_MASK;
            let mut coarse_y = self.coarse_y();
            if coarse_y == 29 {
                coarse_y = 0;
                self.0 ^= 0x0800;
            } else if coarse_y == 31 {
                coarse_y = 0;
            } else {
                coarse_y += 1;
            }
            self.0 = (self.0 & !Self::COARSE_Y_MASK) | (coarse_y << 5);
        }
    }

    pub fn copy_horizontal_bits_from(&mut self, t: VramAddr) {
        self.0 = (self.0 & !(Self::COARSE_X_MASK | 0x0400)) | (t.0 & (Self::COARSE_X_MASK | 0x0400));
    }

    pub fn copy_vertical_bits_from(&mut self, t: VramAddr) {
        let vertical_mask = Self::COARSE_Y_MASK | Self::FINE_Y_MASK | 0x0800;
        self.0 = (self.0 & !vertical_mask) | (t.0 & vertical_mask);
    }
}
