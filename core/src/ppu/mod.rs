//! The 2C02 picture processing unit: scanline/dot state machine, background
//! and sprite pipelines, and the CPU-visible `$2000-$2007` register file.
//!
//! Reimplements the source's two divergent PPU cores as a single
//! implementation carrying the richer behavior (open-bus decay, sprite-0
//! tracking, VBlank-suppression) that one of them has and the other
//! lacks.

pub mod open_bus;
pub mod palette;
pub mod registers;

use open_bus::OpenBus;
use registers::{Control, Mask, StatusFlags, VramAddr};

use crate::cartridge::header::Mirroring;
use crate::debug::RenderMode;
use crate::mem_block::ppu::{Nametables, OamRam, PaletteRam, SecondaryOamRam};
use crate::memory::ppu as ppu_mem;

/// What the PPU needs from the rest of the system: pattern-table (CHR)
/// access through the mapper, and the cartridge's current mirroring mode.
pub trait PpuBus {
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, value: u8);
    fn mirroring(&self) -> Mirroring;
    /// Lets the mapper clock an internal scanline counter (MMC3 IRQ) from
    /// pattern-table fetch activity.
    fn tick_mapper(&mut self, _scanline: u16, _tick: u16, _pattern_table_is_sprite_side: bool) {}
}

/// Where completed pixels and frames go. The host owns everything past
/// this boundary (windowing, scaling, presentation).
pub trait FrameSink {
    fn set_pixel(&mut self, x: u16, y: u16, rgb: (u8, u8, u8));
    fn submit_frame(&mut self);
}

/// A `FrameSink` that discards everything; used for headless runs that
/// only care about CPU-visible state (tests, trace tools).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn set_pixel(&mut self, _x: u16, _y: u16, _rgb: (u8, u8, u8)) {}
    fn submit_frame(&mut self) {}
}

pub const VISIBLE_WIDTH: u16 = 256;
pub const VISIBLE_HEIGHT: u16 = 240;
const SCANLINES_PER_FRAME: u16 = 262;
const TICKS_PER_SCANLINE: u16 = 341;

#[derive(Debug, Clone, Copy, Default)]
struct SpriteSlot {
    x: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    palette: u8,
    behind_background: bool,
    is_sprite_zero: bool,
    active: bool,
}

#[derive(Debug, Clone)]
pub struct Ppu {
    pub control: Control,
    pub mask: Mask,
    status: StatusFlags,
    oam_addr: u8,

    v: VramAddr,
    t: VramAddr,
    fine_x: u8,
    write_toggle: bool,

    read_buffer: u8,
    open_bus: OpenBus,

    nametables: Nametables,
    palette_ram: PaletteRam,
    oam: OamRam,
    secondary_oam: SecondaryOamRam,

    scanline: u16,
    tick: u16,
    odd_frame: bool,
    frame_ready: bool,

    suppress_vblank_this_tick: bool,
    nmi_occurred: bool,

    // Background pipeline latches/shift registers.
    nt_latch: u8,
    attr_latch: u8,
    pattern_lo_latch: u8,
    pattern_hi_latch: u8,
    bg_pattern_shift_lo: u16,
    bg_pattern_shift_hi: u16,
    bg_attr_shift_lo: u16,
    bg_attr_shift_hi: u16,

    sprite_slots: [SpriteSlot; 8],
    sprite_count: usize,
    sprite_zero_on_this_line: bool,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            control: Control::empty(),
            mask: Mask::empty(),
            status: StatusFlags::empty(),
            oam_addr: 0,
            v: VramAddr::default(),
            t: VramAddr::default(),
            fine_x: 0,
            write_toggle: false,
            read_buffer: 0,
            open_bus: OpenBus::new(),
            nametables: Nametables::new(),
            palette_ram: PaletteRam::new(),
            oam: OamRam::new(),
            secondary_oam: SecondaryOamRam::new(),
            scanline: 261,
            tick: 0,
            odd_frame: false,
            frame_ready: false,
            suppress_vblank_this_tick: false,
            nmi_occurred: false,
            nt_latch: 0,
            attr_latch: 0,
            pattern_lo_latch: 0,
            pattern_hi_latch: 0,
            bg_pattern_shift_lo: 0,
            bg_pattern_shift_hi: 0,
            bg_attr_shift_lo: 0,
            bg_attr_shift_hi: 0,
            sprite_slots: [SpriteSlot::default(); 8],
            sprite_count: 0,
            sprite_zero_on_this_line: false,
        }
    }

    pub fn get_scanline(&self) -> u16 {
        self.scanline
    }

    pub fn get_scanline_tick(&self) -> u16 {
        self.tick
    }

    pub fn is_rendering_enabled(&self) -> bool {
        self.mask.rendering_enabled()
    }

    /// Current level of the PPU's NMI output: set while VBlank is active
    /// and NMI generation is enabled. The CPU latches 0->1 transitions of
    /// this line.
    pub fn nmi_line(&self) -> bool {
        self.nmi_occurred && self.control.contains(Control::GENERATE_NMI)
    }

    pub fn frame_ready(&mut self) -> bool {
        let ready = self.frame_ready;
        self.frame_ready = false;
        ready
    }

    pub fn read_mmio(&mut self, bus: &mut impl PpuBus, register: u16) -> u8 {
        let result = match register & 7 {
            2 => {
                // A read landing on the cycle immediately before VBlank
                // would be set suppresses that set and its NMI for this
                // frame (spec: read-vs-set race at scanline 241, tick 1).
                if self.scanline == 241 && self.tick == 0 {
                    self.suppress_vblank_this_tick = true;
                }
                let mut byte = self.open_bus.value() & 0x1F;
                byte |= self.status.bits();
                self.status.remove(StatusFlags::VBLANK);
                self.nmi_occurred = false;
                self.write_toggle = false;
                self.open_bus.refresh(byte & 0xE0);
                return byte;
            }
            4 => {
                let idx = (self.oam_addr & 0xE3) as usize;
                self.oam.read(idx)
            }
            7 => {
                let addr = self.v.0 & ppu_mem::VRAM_MIRROR_MASK;
                let value = if addr >= ppu_mem::PALETTE_BASE {
                    let palette_byte = self.palette_ram.read(Self::palette_index(addr));
                    self.read_buffer = self.vram_read(bus, addr.wrapping_sub(0x1000));
                    palette_byte
                } else {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.vram_read(bus, addr);
                    buffered
                };
                self.v.set(self.v.0.wrapping_add(self.control.vram_increment()));
                value
            }
            _ => self.open_bus.value(),
        };
        self.open_bus.refresh_all(result);
        result
    }

    pub fn write_mmio(&mut self, bus: &mut impl PpuBus, register: u16, value: u8) {
        self.open_bus.refresh_all(value);
        match register & 7 {
            0 => {
                // Raising GENERATE_NMI while VBlank is already set produces
                // an immediate NMI: the orchestrator samples `nmi_line()`
                // right after this write and observes the 0->1 edge itself.
                self.control = Control::from_bits_truncate(value);
                self.t.0 = (self.t.0 & !0x0C00) | (u16::from(value & 0x03) << 10);
            }
            1 => self.mask = Mask::from_bits_truncate(value),
            3 => self.oam_addr = value,
            4 => {
                self.oam.write(self.oam_addr as usize, value);
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            5 => {
                if !self.write_toggle {
                    self.fine_x = value & 0x07;
                    self.t.0 = (self.t.0 & !0x001F) | u16::from(value >> 3);
                } else {
                    self.t.0 = (self.t.0 & !0x73E0)
                        | (u16::from(value & 0x07) << 12)
                        | (u16::from(value >> 3) << 5);
                }
                self.write_toggle = !self.write_toggle;
            }
            6 => {
                if !self.write_toggle {
                    self.t.0 = (self.t.0 & 0x00FF) | (u16::from(value & 0x3F) << 8);
                } else {
                    self.t.0 = (self.t.0 & 0xFF00) | u16::from(value);
                    self.v = self.t;
                }
                self.write_toggle = !self.write_toggle;
            }
            7 => {
                let addr = self.v.0 & ppu_mem::VRAM_MIRROR_MASK;
                self.vram_write(bus, addr, value);
                self.v.set(self.v.0.wrapping_add(self.control.vram_increment()));
            }
            _ => {}
        }
    }

    /// OAM DMA writes 256 bytes directly into primary OAM starting at the
    /// current OAMADDR.
    pub fn dma_write_oam(&mut self, index: u8, value: u8) {
        let addr = self.oam_addr.wrapping_add(index);
        self.oam.write(addr as usize, value);
    }

    fn palette_index(addr: u16) -> usize {
        let mut idx = (addr & 0x1F) as usize;
        if idx & 0x13 == 0x10 {
            idx &= !0x10;
        }
        idx
    }

    fn nametable_offset(&self, bus: &impl PpuBus, addr: u16) -> usize {
        let offset = (addr & 0x0FFF) as usize;
        let table = offset / ppu_mem::NAMETABLE_SIZE as usize;
        let within = offset % ppu_mem::NAMETABLE_SIZE as usize;
        let physical = match bus.mirroring() {
            Mirroring::Horizontal => {
                if table == 0 || table == 1 {
                    within
                } else {
                    1024 + within
                }
            }
            Mirroring::Vertical => {
                if table == 0 || table == 2 {
                    within
                } else {
                    1024 + within
                }
            }
            Mirroring::SingleLower => within,
            Mirroring::SingleUpper => 1024 + within,
            Mirroring::FourScreen => offset,
        };
        physical % ppu_mem::NAMETABLE_RAM_SIZE
    }

    fn vram_read(&mut self, bus: &mut impl PpuBus, addr: u16) -> u8 {
        if addr < 0x2000 {
            bus.ppu_read(addr)
        } else if addr < 0x3F00 {
            let idx = self.nametable_offset(bus, addr);
            self.nametables.read(idx)
        } else {
            self.palette_ram.read(Self::palette_index(addr))
        }
    }

    fn vram_write(&mut self, bus: &mut impl PpuBus, addr: u16, value: u8) {
        if addr < 0x2000 {
            bus.ppu_write(addr, value);
        } else if addr < 0x3F00 {
            let idx = self.nametable_offset(bus, addr);
            self.nametables.write(idx, value);
        } else {
            self.palette_ram.write(Self::palette_index(addr), value);
        }
    }

    /// Advances the PPU by one dot.
    pub fn tick(&mut self, bus: &mut impl PpuBus, sink: &mut impl FrameSink) {
        self.open_bus.tick();

        match self.scanline {
            0..=239 => self.tick_visible(bus, sink),
            240 => {}
            241 => self.tick_vblank_start(),
            242..=260 => {}
            261 => self.tick_prerender(bus),
            _ => unreachable!(),
        }

        self.advance_dot(sink);
    }

    fn advance_dot(&mut self, sink: &mut impl FrameSink) {
        self.tick += 1;
        let skip_last_dot =
            self.scanline == 261 && self.tick == TICKS_PER_SCANLINE - 1 && self.odd_frame && self.mask.contains(Mask::SHOW_BACKGROUND);
        if self.tick >= TICKS_PER_SCANLINE || skip_last_dot {
            self.tick = 0;
            self.scanline += 1;
            if self.scanline >= SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
                self.frame_ready = true;
                sink.submit_frame();
            }
        }
    }

    fn tick_vblank_start(&mut self) {
        if self.tick == 1 {
            if !self.suppress_vblank_this_tick {
                self.status.insert(StatusFlags::VBLANK);
                self.nmi_occurred = true;
            }
            self.suppress_vblank_this_tick = false;
        }
    }

    fn tick_prerender(&mut self, bus: &mut impl PpuBus) {
        if self.tick == 1 {
            self.status.remove(StatusFlags::VBLANK | StatusFlags::SPRITE_ZERO_HIT | StatusFlags::SPRITE_OVERFLOW);
            self.nmi_occurred = false;
        }
        if self.is_rendering_enabled() {
            self.run_background_pipeline(bus);
            if (280..=304).contains(&self.tick) {
                self.v.copy_vertical_bits_from(self.t);
            }
            self.tick_mapper_for_dot(bus);
        }
    }

    fn tick_visible(&mut self, bus: &mut impl PpuBus, sink: &mut impl FrameSink) {
        if self.tick == 1 {
            self.secondary_oam.fill(0xFF);
            self.sprite_count = 0;
        }
        if self.tick == 65 {
            self.evaluate_sprites(bus);
        }
        if self.tick == 257 {
            self.fetch_sprite_patterns(bus);
        }

        if (1..=256).contains(&self.tick) {
            let x = self.tick - 1;
            self.render_pixel(x, sink);
        }

        if self.is_rendering_enabled() {
            self.run_background_pipeline(bus);
            self.tick_mapper_for_dot(bus);
        }
    }

    /// Lets the mapper observe every rendering dot of the visible and
    /// pre-render lines, per spec.md §4.3's "near the end of a scanline"
    /// MMC3 IRQ clock. `pattern_table_is_sprite_side` mirrors which pattern
    /// table the PPU's address bus is driving at this dot: the sprite-fetch
    /// window (257..=320) versus every other dot, which fetches background
    /// tile data (or is idle, holding the background pattern-table
    /// address).
    fn tick_mapper_for_dot(&self, bus: &mut impl PpuBus) {
        let sprite_side = (257..=320).contains(&self.tick);
        bus.tick_mapper(self.scanline, self.tick, sprite_side);
    }

    /// Background fetch/shift pipeline shared by visible and pre-render
    /// scanlines (spec: ticks 1..256 and 321..336, 8-tick fetch groups).
    fn run_background_pipeline(&mut self, bus: &mut impl PpuBus) {
        let t = self.tick;
        let in_fetch_window = (1..=256).contains(&t) || (321..=336).contains(&t);

        if in_fetch_window {
            match t % 8 {
                1 => {
                    self.reload_shift_registers();
                    let addr = 0x2000 | (self.v.0 & 0x0FFF);
                    self.nt_latch = self.vram_read(bus, addr);
                }
                3 => {
                    let addr = 0x23C0
                        | (self.v.0 & 0x0C00)
                        | ((self.v.0 >> 4) & 0x38)
                        | ((self.v.0 >> 2) & 0x07);
                    let byte = self.vram_read(bus, addr);
                    let shift = ((self.v.coarse_y() & 2) << 1) | (self.v.coarse_x() & 2);
                    self.attr_latch = (byte >> shift) & 0x03;
                }
                5 => {
                    let base = self.control.bg_pattern_table_base();
                    let addr = base + u16::from(self.nt_latch) * 16 + self.v.fine_y();
                    self.pattern_lo_latch = bus.ppu_read(addr);
                }
                7 => {
                    let base = self.control.bg_pattern_table_base();
                    let addr = base + u16::from(self.nt_latch) * 16 + self.v.fine_y() + 8;
                    self.pattern_hi_latch = bus.ppu_read(addr);
                    self.v.increment_coarse_x();
                }
                _ => {}
            }
        }

        if (1..=256).contains(&t) || (321..=336).contains(&t) {
            self.shift_registers();
        }

        if t == 256 {
            self.v.increment_y();
        }
        if t == 257 {
            self.v.copy_horizontal_bits_from(self.t);
        }
    }

    fn reload_shift_registers(&mut self) {
        self.bg_pattern_shift_lo = (self.bg_pattern_shift_lo & 0xFF00) | u16::from(self.pattern_lo_latch);
        self.bg_pattern_shift_hi = (self.bg_pattern_shift_hi & 0xFF00) | u16::from(self.pattern_hi_latch);
        let attr_lo = if self.attr_latch & 0x01 != 0 { 0xFF } else { 0x00 };
        let attr_hi = if self.attr_latch & 0x02 != 0 { 0xFF } else { 0x00 };
        self.bg_attr_shift_lo = (self.bg_attr_shift_lo & 0xFF00) | attr_lo;
        self.bg_attr_shift_hi = (self.bg_attr_shift_hi & 0xFF00) | attr_hi;
    }

    fn shift_registers(&mut self) {
        self.bg_pattern_shift_lo <<= 1;
        self.bg_pattern_shift_hi <<= 1;
        self.bg_attr_shift_lo <<= 1;
        self.bg_attr_shift_hi <<= 1;
    }

    fn evaluate_sprites(&mut self, _bus: &mut impl PpuBus) {
        let height = self.control.sprite_height();
        let mut found = 0usize;
        self.sprite_zero_on_this_line = false;
        for i in 0..64 {
            let base = i * 4;
            let y = self.oam.read(base) as u16;
            if self.scanline < y || self.scanline >= y + height {
                continue;
            }
            if found == 8 {
                self.status.insert(StatusFlags::SPRITE_OVERFLOW);
                break;
            }
            let dst = found * 4;
            for b in 0..4 {
                let v = self.oam.read(base + b);
                self.secondary_oam.write(dst + b, v);
            }
            if i == 0 {
                self.sprite_zero_on_this_line = true;
            }
            found += 1;
        }
        self.sprite_count = found;
    }

    fn fetch_sprite_patterns(&mut self, bus: &mut impl PpuBus) {
        let height = self.control.sprite_height();
        for slot_idx in 0..8 {
            if slot_idx >= self.sprite_count {
                self.sprite_slots[slot_idx] = SpriteSlot::default();
                continue;
            }
            let base = slot_idx * 4;
            let y = self.secondary_oam.read(base);
            let tile = self.secondary_oam.read(base + 1);
            let attr = self.secondary_oam.read(base + 2);
            let x = self.secondary_oam.read(base + 3);

            let flip_v = attr & 0x80 != 0;
            let flip_h = attr & 0x40 != 0;
            let behind_background = attr & 0x20 != 0;
            let palette = attr & 0x03;

            let row = u16::from(self.scanline.saturating_sub(u16::from(y)) as u16);
            let row = row.min(height - 1);
            let cur_y = if flip_v { height - 1 - row } else { row };

            let (table_base, tile_index, fine_row) = if height == 16 {
                let table = if tile & 0x01 != 0 { 0x1000 } else { 0 };
                let tile_top = tile & 0xFE;
                if cur_y < 8 {
                    (table, u16::from(tile_top), cur_y)
                } else {
                    (table, u16::from(tile_top) + 1, cur_y - 8)
                }
            } else {
                (self.control.sprite_pattern_table_base(), u16::from(tile), cur_y)
            };

            let addr = table_base + tile_index * 16 + fine_row;
            let mut lo = bus.ppu_read(addr);
            let mut hi = bus.ppu_read(addr + 8);
            if flip_h {
                lo = lo.reverse_bits();
                hi = hi.reverse_bits();
            }

            self.sprite_slots[slot_idx] = SpriteSlot {
                x,
                pattern_lo: lo,
                pattern_hi: hi,
                palette,
                behind_background,
                is_sprite_zero: slot_idx == 0 && self.sprite_zero_on_this_line,
                active: true,
            };
        }
    }

    fn render_pixel(&mut self, x: u16, sink: &mut impl FrameSink) {
        let bg_pixel = if self.mask.contains(Mask::SHOW_BACKGROUND) && !(x < 8 && !self.mask.contains(Mask::SHOW_BG_LEFT)) {
            let shift = 15 - self.fine_x;
            let lo = (self.bg_pattern_shift_lo >> shift) & 1;
            let hi = (self.bg_pattern_shift_hi >> shift) & 1;
            let pal_lo = (self.bg_attr_shift_lo >> shift) & 1;
            let pal_hi = (self.bg_attr_shift_hi >> shift) & 1;
            let pixel = (hi << 1 | lo) as u8;
            let palette = (pal_hi << 1 | pal_lo) as u8;
            (pixel, palette)
        } else {
            (0, 0)
        };

        let mut sprite_pixel: Option<(u8, u8, bool, bool)> = None;
        if self.mask.contains(Mask::SHOW_SPRITES) && !(x < 8 && !self.mask.contains(Mask::SHOW_SPRITES_LEFT)) {
            for slot in &self.sprite_slots[..self.sprite_count.min(8)] {
                if !slot.active {
                    continue;
                }
                let slot_x = u16::from(slot.x);
                if x < slot_x || x >= slot_x + 8 {
                    continue;
                }
                let col = (x - slot_x) as u32;
                let lo = (slot.pattern_lo >> (7 - col)) & 1;
                let hi = (slot.pattern_hi >> (7 - col)) & 1;
                let pixel = (hi << 1 | lo) as u8;
                if pixel == 0 {
                    continue;
                }
                sprite_pixel = Some((pixel, slot.palette, slot.behind_background, slot.is_sprite_zero));
                break;
            }
        }

        let (bg_opaque, bg_idx, bg_pal) = (bg_pixel.0 != 0, bg_pixel.0, bg_pixel.1);

        if let Some((_, _, _, is_zero)) = sprite_pixel {
            if is_zero && bg_opaque && x != 255 {
                self.status.insert(StatusFlags::SPRITE_ZERO_HIT);
            }
        }

        let addr = if !bg_opaque && sprite_pixel.is_none() {
            0x3F00
        } else if !bg_opaque {
            let (idx, pal, _, _) = sprite_pixel.unwrap();
            0x3F10 + u16::from(pal) * 4 + u16::from(idx)
        } else if sprite_pixel.is_none() {
            0x3F00 + u16::from(bg_pal) * 4 + u16::from(bg_idx)
        } else {
            let (idx, pal, behind_bg, _) = sprite_pixel.unwrap();
            if behind_bg {
                0x3F00 + u16::from(bg_pal) * 4 + u16::from(bg_idx)
            } else {
                0x3F10 + u16::from(pal) * 4 + u16::from(idx)
            }
        };

        let palette_byte = self.palette_ram.read(Self::palette_index(addr)) & 0x3F;
        let rgb = palette::NES_PALETTE[palette_byte as usize];
        sink.set_pixel(x, self.scanline, rgb);
    }

    /// Renders one full frame for a debug `RenderMode` directly from VRAM,
    /// bypassing sprite composition entirely (spec.md §6). Intended for a
    /// host-side inspection tool driven independently of the normal
    /// per-dot `tick` pipeline; `Normal` is a no-op here since regular
    /// rendering already goes through `tick`/`render_pixel`.
    pub fn render_debug_frame(&mut self, bus: &mut impl PpuBus, mode: RenderMode, sink: &mut impl FrameSink) {
        match mode {
            RenderMode::Normal => return,
            RenderMode::Nametable0 => self.render_nametable_debug(bus, 0, sink),
            RenderMode::Nametable1 => self.render_nametable_debug(bus, 1, sink),
            RenderMode::Nametable2 => self.render_nametable_debug(bus, 2, sink),
            RenderMode::Nametable3 => self.render_nametable_debug(bus, 3, sink),
            RenderMode::PatternTables => self.render_pattern_tables_debug(bus, sink),
        }
        sink.submit_frame();
    }

    fn render_nametable_debug(&mut self, bus: &mut impl PpuBus, table: u16, sink: &mut impl FrameSink) {
        let pattern_base = self.control.bg_pattern_table_base();
        for y in 0..240u16 {
            for x in 0..256u16 {
                let tile_col = x / 8;
                let tile_row = y / 8;
                let nt_addr = 0x2000 + table * 0x400 + tile_row * 32 + tile_col;
                let tile_index = u16::from(self.vram_read(bus, nt_addr));
                let attr_addr = 0x23C0 + table * 0x400 + (tile_row / 4) * 8 + (tile_col / 4);
                let attr_byte = self.vram_read(bus, attr_addr);
                let shift = ((tile_row % 4) / 2) * 4 + ((tile_col % 4) / 2) * 2;
                let palette = u16::from((attr_byte >> shift) & 0x3);

                let fine_y = y % 8;
                let fine_x = x % 8;
                let plane_lo = self.vram_read(bus, pattern_base + tile_index * 16 + fine_y);
                let plane_hi = self.vram_read(bus, pattern_base + tile_index * 16 + fine_y + 8);
                let bit = 7 - fine_x;
                let lo = (plane_lo >> bit) & 1;
                let hi = (plane_hi >> bit) & 1;
                let pixel = u16::from((hi << 1) | lo);

                let addr = if pixel == 0 { 0x3F00 } else { 0x3F00 + palette * 4 + pixel };
                let palette_byte = self.palette_ram.read(Self::palette_index(addr)) & 0x3F;
                let rgb = palette::NES_PALETTE[palette_byte as usize];
                sink.set_pixel(x, y, rgb);
            }
        }
    }

    fn render_pattern_tables_debug(&mut self, bus: &mut impl PpuBus, sink: &mut impl FrameSink) {
        for table in 0..2u16 {
            let base = table * 0x1000;
            for tile in 0..256u16 {
                let tile_col = tile % 16;
                let tile_row = tile / 16;
                for fine_y in 0..8u16 {
                    let plane_lo = self.vram_read(bus, base + tile * 16 + fine_y);
                    let plane_hi = self.vram_read(bus, base + tile * 16 + fine_y + 8);
                    for fine_x in 0..8u16 {
                        let bit = 7 - fine_x;
                        let lo = (plane_lo >> bit) & 1;
                        let hi = (plane_hi >> bit) & 1;
                        let pixel = u16::from((hi << 1) | lo);
                        let palette_byte = self.palette_ram.read(Self::palette_index(0x3F00 + pixel)) & 0x3F;
                        let rgb = palette::NES_PALETTE[palette_byte as usize];
                        sink.set_pixel(table * 128 + tile_col * 8 + fine_x, tile_row * 8 + fine_y, rgb);
                    }
                }
            }
        }
    }

    /// Captures every piece of internal PPU state a save state needs:
    /// register file, loopy `v`/`t`, background pipeline latches, and
    /// memory contents. Sprite evaluation buffers (`sprite_slots`,
    /// `secondary_oam`) are not captured: they are fully recomputed by the
    /// next visible scanline's evaluation/fetch ticks, so omitting them
    /// costs at most the remainder of an already-in-flight scanline.
    pub fn snapshot(&self) -> PpuState {
        PpuState {
            control: self.control.bits(),
            mask: self.mask.bits(),
            status: self.status.bits(),
            oam_addr: self.oam_addr,
            v: self.v.0,
            t: self.t.0,
            fine_x: self.fine_x,
            write_toggle: self.write_toggle,
            read_buffer: self.read_buffer,
            open_bus: self.open_bus.value(),
            scanline: self.scanline,
            tick: self.tick,
            odd_frame: self.odd_frame,
            nmi_occurred: self.nmi_occurred,
            nt_latch: self.nt_latch,
            attr_latch: self.attr_latch,
            pattern_lo_latch: self.pattern_lo_latch,
            pattern_hi_latch: self.pattern_hi_latch,
            bg_pattern_shift_lo: self.bg_pattern_shift_lo,
            bg_pattern_shift_hi: self.bg_pattern_shift_hi,
            bg_attr_shift_lo: self.bg_attr_shift_lo,
            bg_attr_shift_hi: self.bg_attr_shift_hi,
            nametables: self.nametables.as_slice().to_vec(),
            palette_ram: self.palette_ram.as_slice().to_vec(),
            oam: self.oam.as_slice().to_vec(),
        }
    }

    pub fn restore(&mut self, state: &PpuState) {
        self.control = Control::from_bits_truncate(state.control);
        self.mask = Mask::from_bits_truncate(state.mask);
        self.status = StatusFlags::from_bits_truncate(state.status);
        self.oam_addr = state.oam_addr;
        self.v.set(state.v);
        self.t.set(state.t);
        self.fine_x = state.fine_x;
        self.write_toggle = state.write_toggle;
        self.read_buffer = state.read_buffer;
        self.open_bus = OpenBus::new();
        self.open_bus.refresh_all(state.open_bus);
        self.scanline = state.scanline;
        self.tick = state.tick;
        self.odd_frame = state.odd_frame;
        self.nmi_occurred = state.nmi_occurred;
        self.nt_latch = state.nt_latch;
        self.attr_latch = state.attr_latch;
        self.pattern_lo_latch = state.pattern_lo_latch;
        self.pattern_hi_latch = state.pattern_hi_latch;
        self.bg_pattern_shift_lo = state.bg_pattern_shift_lo;
        self.bg_pattern_shift_hi = state.bg_pattern_shift_hi;
        self.bg_attr_shift_lo = state.bg_attr_shift_lo;
        self.bg_attr_shift_hi = state.bg_attr_shift_hi;
        self.nametables.as_mut_slice().copy_from_slice(&state.nametables);
        self.palette_ram.as_mut_slice().copy_from_slice(&state.palette_ram);
        self.oam.as_mut_slice().copy_from_slice(&state.oam);
    }
}

/// Flat snapshot of PPU state for save-state serialization. Buffer fields
/// are plain `Vec<u8>` rather than fixed-size arrays so the format doesn't
/// need const-generic plumbing through `serde`/`postcard`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "savestate-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PpuState {
    pub control: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    pub v: u16,
    pub t: u16,
    pub fine_x: u8,
    pub write_toggle: bool,
    pub read_buffer: u8,
    pub open_bus: u8,
    pub scanline: u16,
    pub tick: u16,
    pub odd_frame: bool,
    pub nmi_occurred: bool,
    pub nt_latch: u8,
    pub attr_latch: u8,
    pub pattern_lo_latch: u8,
    pub pattern_hi_latch: u8,
    pub bg_pattern_shift_lo: u16,
    pub bg_pattern_shift_hi: u16,
    pub bg_attr_shift_lo: u16,
    pub bg_attr_shift_hi: u16,
    pub nametables: Vec<u8>,
    pub palette_ram: Vec<u8>,
    pub oam: Vec<u8>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct TestBus {
        chr: Vec<u8>,
        mirroring: Mirroring,
    }

    impl PpuBus for TestBus {
        fn ppu_read(&mut self, addr: u16) -> u8 {
            *self.chr.get(addr as usize).unwrap_or(&0)
        }
        fn ppu_write(&mut self, _addr: u16, _value: u8) {}
        fn mirroring(&self) -> Mirroring {
            self.mirroring
        }
    }

    fn test_bus() -> TestBus {
        TestBus {
            chr: vec![0; 0x2000],
            mirroring: Mirroring::Horizontal,
        }
    }

    fn run_to(ppu: &mut Ppu, bus: &mut TestBus, scanline: u16, tick: u16) {
        let mut sink = NullSink;
        while !(ppu.scanline == scanline && ppu.tick == tick) {
            ppu.tick(bus, &mut sink);
        }
    }

    #[test]
    fn vblank_sets_at_scanline_241_tick_1_and_clears_at_prerender() {
        let mut ppu = Ppu::new();
        let mut bus = test_bus();
        run_to(&mut ppu, &mut bus, 241, 1);
        assert!(ppu.status.contains(StatusFlags::VBLANK));
        run_to(&mut ppu, &mut bus, 261, 1);
        assert!(!ppu.status.contains(StatusFlags::VBLANK));
    }

    #[test]
    fn reading_status_clears_vblank_and_write_toggle() {
        let mut ppu = Ppu::new();
        let mut bus = test_bus();
        run_to(&mut ppu, &mut bus, 241, 2);
        ppu.write_toggle = true;
        let value = ppu.read_mmio(&mut bus, 2);
        assert_ne!(value & 0x80, 0);
        assert!(!ppu.status.contains(StatusFlags::VBLANK));
        assert!(!ppu.write_toggle);
    }

    #[test]
    fn palette_mirror_0x10_reads_same_as_0x00() {
        let mut ppu = Ppu::new();
        ppu.palette_ram.write(0x00, 0x20);
        assert_eq!(Ppu::palette_index(0x3F10), 0x00);
    }

    #[test]
    fn oam_dma_write_lands_at_oam_addr_plus_index() {
        let mut ppu = Ppu::new();
        ppu.oam_addr = 0x10;
        ppu.dma_write_oam(0x05, 0xAB);
        assert_eq!(ppu.oam.read(0x15), 0xAB);
    }

    #[test]
    fn snapshot_restore_round_trips_register_and_memory_state() {
        let mut ppu = Ppu::new();
        let mut bus = test_bus();
        run_to(&mut ppu, &mut bus, 241, 1);
        ppu.palette_ram.write(0x00, 0x16);
        let state = ppu.snapshot();

        let mut restored = Ppu::new();
        restored.restore(&state);
        assert_eq!(restored.scanline, ppu.scanline);
        assert_eq!(restored.tick, ppu.tick);
        assert_eq!(restored.status, ppu.status);
        assert_eq!(restored.palette_ram.read(0x00), 0x16);
    }

    #[test]
    fn horizontal_mirroring_maps_first_two_tables_to_the_same_bank() {
        let ppu = Ppu::new();
        let bus = test_bus();
        assert_eq!(ppu.nametable_offset(&bus, 0x2000), ppu.nametable_offset(&bus, 0x2400 + 0x10) - 0x10);
    }

    struct CapturingSink {
        pixels: Vec<(u16, u16, (u8, u8, u8))>,
        frames_submitted: u32,
    }

    impl FrameSink for CapturingSink {
        fn set_pixel(&mut self, x: u16, y: u16, rgb: (u8, u8, u8)) {
            self.pixels.push((x, y, rgb));
        }

        fn submit_frame(&mut self) {
            self.frames_submitted += 1;
        }
    }

    #[test]
    fn debug_nametable_render_reads_straight_from_nametable_ram_and_submits_once() {
        let mut ppu = Ppu::new();
        let mut bus = test_bus();
        ppu.nametables.write(0, 0x01);
        let mut sink = CapturingSink {
            pixels: Vec::new(),
            frames_submitted: 0,
        };
        ppu.render_debug_frame(&mut bus, RenderMode::Nametable0, &mut sink);
        assert_eq!(sink.pixels.len(), 256 * 240);
        assert_eq!(sink.frames_submitted, 1);
    }

    #[test]
    fn debug_pattern_table_render_covers_both_tables() {
        let mut ppu = Ppu::new();
        let mut bus = test_bus();
        let mut sink = CapturingSink {
            pixels: Vec::new(),
            frames_submitted: 0,
        };
        ppu.render_debug_frame(&mut bus, RenderMode::PatternTables, &mut sink);
        assert_eq!(sink.pixels.len(), 2 * 128 * 128);
        assert!(sink.pixels.iter().any(|(x, _, _)| *x >= 128));
    }

    #[test]
    fn debug_render_normal_mode_is_a_no_op() {
        let mut ppu = Ppu::new();
        let mut bus = test_bus();
        let mut sink = CapturingSink {
            pixels: Vec::new(),
            frames_submitted: 0,
        };
        ppu.render_debug_frame(&mut bus, RenderMode::Normal, &mut sink);
        assert!(sink.pixels.is_empty());
        assert_eq!(sink.frames_submitted, 0);
    }
}
