//! MMC3 (mapper 4): $8000 selects a bank-select register (PRG mode bit,
//! CHR-inversion bit, 3-bit target index); $8001 programs the targeted
//! bank; $A000 sets mirroring; $C000/$C001/$E000/$E001 drive a scanline
//! IRQ counter clocked by the mapper's PPU-tick hook.

use std::borrow::Cow;

use super::chr_storage::ChrStorage;
use super::{allocate_prg_ram, select_chr_storage, Mapper};
use crate::cartridge::header::{Header, Mirroring};

#[derive(Debug, Clone)]
pub struct Mmc3 {
    prg_rom: Cow<'static, [u8]>,
    prg_ram: Vec<u8>,
    chr: ChrStorage,

    bank_select: u8,
    chr_banks: [u8; 6],
    prg_banks: [u8; 2],

    mirroring: Mirroring,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload_pending: bool,
    irq_enabled: bool,
    irq_pending: bool,

    prg_bank_count: usize,
    chr_unit_count: usize,

    /// Tracks the rising edge of the PPU's "read pattern table from the
    /// sprite side" signal used by real MMC3 boards to derive the A12
    /// clock; we approximate it via the caller-supplied tick hint instead
    /// of reconstructing full A12 filtering.
    last_tick_high: bool,
}

impl Mmc3 {
    pub fn new(header: Header, prg_rom: Cow<'static, [u8]>, chr_rom: Option<Cow<'static, [u8]>>) -> Self {
        let prg_bank_count = (header.prg_rom_size / 0x2000).max(1);
        let mirroring = header.mirroring;
        let prg_ram = allocate_prg_ram(&header);
        let chr = select_chr_storage(&header, chr_rom);
        let chr_unit_count = (chr.len() / 0x0400).max(1);
        Self {
            prg_rom,
            prg_ram,
            chr,
            bank_select: 0,
            chr_banks: [0; 6],
            prg_banks: [0; 2],
            mirroring,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload_pending: false,
            irq_enabled: false,
            irq_pending: false,
            prg_bank_count,
            chr_unit_count,
            last_tick_high: false,
        }
    }

    fn prg_mode(&self) -> bool {
        self.bank_select & 0x40 != 0
    }

    fn chr_inverted(&self) -> bool {
        self.bank_select & 0x80 != 0
    }

    fn write_bank_select(&mut self, value: u8) {
        self.bank_select = value;
    }

    fn write_bank_data(&mut self, value: u8) {
        let target = self.bank_select & 0x07;
        match target {
            0..=5 => self.chr_banks[target as usize] = value,
            6 => self.prg_banks[0] = value & 0x3F,
            7 => self.prg_banks[1] = value & 0x3F,
            _ => unreachable!(),
        }
    }

    fn write_mirroring(&mut self, value: u8) {
        // Four-screen carts ignore this register; we only reach here for
        // the two mirroring-capable boards this mapper models.
        self.mirroring = if value & 0x01 != 0 {
            Mirroring::Horizontal
        } else {
            Mirroring::Vertical
        };
    }

    fn write_irq_latch(&mut self, value: u8) {
        self.irq_latch = value;
    }

    fn write_irq_reload(&mut self, _value: u8) {
        self.irq_reload_pending = true;
    }

    fn write_irq_disable(&mut self, _value: u8) {
        self.irq_enabled = false;
        self.irq_pending = false;
    }

    fn write_irq_enable(&mut self, _value: u8) {
        self.irq_enabled = true;
    }

    fn prg_bank8k(&self, slot_8000: usize, last: usize) -> usize {
        // Fixed layout (mode 0): $8000=R6, $A000=R7, $C000=second-to-last,
        // $E000=last. Mode 1 swaps the $8000 and $C000 windows.
        match (self.prg_mode(), slot_8000) {
            (false, 0) => usize::from(self.prg_banks[0]),
            (false, 1) => last - 1,
            (false, 2) => usize::from(self.prg_banks[1]),
            (false, 3) => last,
            (true, 0) => last - 1,
            (true, 1) => usize::from(self.prg_banks[0]),
            (true, 2) => usize::from(self.prg_banks[1]),
            (true, 3) => last,
            _ => last,
        }
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let slot = usize::from((addr - 0x8000) / 0x2000);
        let within = usize::from(addr) & 0x1FFF;
        let last = self.prg_bank_count.saturating_sub(1);
        let bank = self.prg_bank8k(slot, last) % self.prg_bank_count;
        bank * 0x2000 + within
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let addr = usize::from(addr);
        // Non-inverted layout: $0000 R0&~1 (2K), $0800 R1&~1 (2K), $1000
        // R2, $1400 R3, $1800 R4, $1C00 R5 (each 1K). Inversion swaps the
        // low and high 4 KiB halves.
        let addr = if self.chr_inverted() { addr ^ 0x1000 } else { addr };
        let within = addr % 0x0400;
        let bank = match addr / 0x0400 {
            0 => usize::from(self.chr_banks[0] & 0xFE),
            1 => usize::from(self.chr_banks[0] & 0xFE) + 1,
            2 => usize::from(self.chr_banks[1] & 0xFE),
            3 => usize::from(self.chr_banks[1] & 0xFE) + 1,
            4 => usize::from(self.chr_banks[2]),
            5 => usize::from(self.chr_banks[3]),
            6 => usize::from(self.chr_banks[4]),
            7 => usize::from(self.chr_banks[5]),
            _ => unreachable!(),
        };
        (bank % self.chr_unit_count) * 0x0400 + within
    }
}

impl Mapper for Mmc3 {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                let len = self.prg_ram.len();
                if len == 0 {
                    0
                } else {
                    self.prg_ram[usize::from(addr - 0x6000) % len]
                }
            }
            0x8000..=0xFFFF => {
                let offset = self.prg_offset(addr) % self.prg_rom.len().max(1);
                self.prg_rom[offset]
            }
            _ => 0,
        }
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        let even = addr % 2 == 0;
        match addr {
            0x6000..=0x7FFF => {
                let len = self.prg_ram.len();
                if len > 0 {
                    self.prg_ram[usize::from(addr - 0x6000) % len] = value;
                }
            }
            0x8000..=0x9FFF if even => self.write_bank_select(value),
            0x8000..=0x9FFF => self.write_bank_data(value),
            0xA000..=0xBFFF if even => self.write_mirroring(value),
            0xA000..=0xBFFF => {} // PRG-RAM protect: not modeled, no battery-protect bit tracked.
            0xC000..=0xDFFF if even => self.write_irq_latch(value),
            0xC000..=0xDFFF => self.write_irq_reload(value),
            0xE000..=0xFFFF if even => self.write_irq_disable(value),
            0xE000..=0xFFFF => self.write_irq_enable(value),
            _ => {}
        }
    }

    fn ppu_read(&mut self, addr: u16) -> u8 {
        let offset = self.chr_offset(addr);
        self.chr.read(offset)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        let offset = self.chr_offset(addr);
        self.chr.write(offset, value);
    }

    fn tick_ppu(&mut self, _scanline: u16, tick: u16, pattern_table_is_sprite_side: bool) {
        // MMC3's real IRQ clock derives from the PPU address bus's A12
        // line toggling high, which happens predictably near ticks 260
        // and 324 during active rendering. We approximate that edge with
        // the tick position the caller reports.
        let target_tick = if pattern_table_is_sprite_side { 260 } else { 324 };
        let is_high = tick == target_tick;
        if is_high && !self.last_tick_high {
            self.clock_irq_counter();
        }
        self.last_tick_high = is_high;
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn clear_irq(&mut self) {
        self.irq_pending = false;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_id(&self) -> u16 {
        4
    }

    fn name(&self) -> &'static str {
        "MMC3"
    }

    fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    fn chr_rom(&self) -> &[u8] {
        self.chr.as_slice()
    }

    fn prg_ram(&self) -> &[u8] {
        &self.prg_ram
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut self.prg_ram
    }

    fn chr_ram_mut(&mut self) -> Option<&mut [u8]> {
        self.chr.as_mut_slice()
    }

    fn save_blob(&self) -> [u8; 64] {
        let mut blob = [0u8; 64];
        blob[0] = self.bank_select;
        blob[1..7].copy_from_slice(&self.chr_banks);
        blob[7..9].copy_from_slice(&self.prg_banks);
        blob[9] = self.mirroring.to_byte();
        blob[10] = self.irq_latch;
        blob[11] = self.irq_counter;
        blob[12] = self.irq_reload_pending as u8;
        blob[13] = self.irq_enabled as u8;
        blob[14] = self.irq_pending as u8;
        blob[15] = self.last_tick_high as u8;
        blob
    }

    fn load_blob(&mut self, blob: &[u8; 64]) {
        self.bank_select = blob[0];
        self.chr_banks.copy_from_slice(&blob[1..7]);
        self.prg_banks.copy_from_slice(&blob[7..9]);
        self.mirroring = Mirroring::from_byte(blob[9]);
        self.irq_latch = blob[10];
        self.irq_counter = blob[11];
        self.irq_reload_pending = blob[12] != 0;
        self.irq_enabled = blob[13] != 0;
        self.irq_pending = blob[14] != 0;
        self.last_tick_high = blob[15] != 0;
    }
}

impl Mmc3 {
    fn clock_irq_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload_pending {
            self.irq_counter = self.irq_latch;
            self.irq_reload_pending = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Header {
        Header {
            prg_rom_size: 8 * 0x2000,
            chr_rom_size: 8 * 0x0400 * 4,
            mirroring: Mirroring::Horizontal,
            battery_backed: false,
            has_trainer: false,
            mapper: 4,
            prg_ram_size: 0x2000,
        }
    }

    fn mk(prg_banks: usize) -> Mmc3 {
        Mmc3::new(header(), Cow::Owned(vec![0u8; prg_banks * 0x2000]), None)
    }

    #[test]
    fn irq_fires_exactly_once_per_latch_reload_when_enabled() {
        let mut mmc3 = mk(8);
        mmc3.cpu_write(0xC000, 4); // latch = 4
        mmc3.cpu_write(0xC001, 0); // request reload
        mmc3.cpu_write(0xE001, 0); // enable

        let mut irqs = 0;
        for scanline in 0..20u16 {
            mmc3.tick_ppu(scanline, 100, true); // drop the A12 line low first
            mmc3.tick_ppu(scanline, 260, true); // rising edge triggers the clock
            if mmc3.irq_pending() {
                irqs += 1;
                mmc3.clear_irq();
            }
        }
        assert_eq!(irqs, 4); // one IRQ every 4 scanlines (latch=4) over 20 lines
    }

    #[test]
    fn e000_disables_and_clears_the_irq_line_synchronously() {
        let mut mmc3 = mk(8);
        mmc3.cpu_write(0xC000, 0);
        mmc3.cpu_write(0xC001, 0);
        mmc3.cpu_write(0xE001, 0);
        mmc3.tick_ppu(0, 260, true); // counter 0 -> reload to 0 -> irq set
        assert!(mmc3.irq_pending());
        mmc3.cpu_write(0xE000, 0);
        assert!(!mmc3.irq_pending());
    }

    #[test]
    fn mode_bit_swaps_8000_and_c000_prg_windows() {
        let mut prg = vec![0u8; 8 * 0x2000];
        prg[0] = 0x11; // bank 0, targeted by R6
        prg[6 * 0x2000] = 0x22; // bank 6, the second-to-last bank
        let mut mmc3 = Mmc3::new(header(), Cow::Owned(prg), None);
        mmc3.cpu_write(0x8000, 0x06); // select R6
        mmc3.cpu_write(0x8001, 0); // R6 = bank 0
        assert_eq!(mmc3.cpu_read(0x8000), 0x11); // mode 0: $8000 window = R6
        mmc3.cpu_write(0x8000, 0x40); // mode bit set (R6 still holds bank 0)
        assert_eq!(mmc3.cpu_read(0x8000), 0x22); // mode 1: $8000 fixed to second-to-last bank
    }
}
