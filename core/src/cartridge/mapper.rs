//! The cartridge-resident mapper abstraction.
//!
//! Reimplemented as a capability-object trait over `Box<dyn Mapper>` rather
//! than the original's function-pointer table: the set of variants is fixed
//! at load time from the header, so dynamic dispatch over a small closed set
//! of concrete types is the idiomatic fit (no open-world extension needed).

pub mod chr_storage;
pub mod mapper0;
pub mod mapper1;
pub mod mapper11;
pub mod mapper19;
pub mod mapper2;
pub mod mapper3;
pub mod mapper4;
pub mod mapper7;

use std::borrow::Cow;
use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::cartridge::header::{Header, Mirroring};
use crate::error::{Error, Result};

/// Operations every mapper variant implements; unused hooks default to a
/// no-op so simple mappers (NROM) don't carry dead overrides.
pub trait Mapper: Debug + DynClone {
    fn cpu_read(&mut self, addr: u16) -> u8;
    fn cpu_write(&mut self, addr: u16, value: u8);
    fn ppu_read(&mut self, addr: u16) -> u8;
    fn ppu_write(&mut self, addr: u16, value: u8);

    /// Advances any mapper-internal scanline counter. Called once per PPU
    /// tick; most mappers no-op here. MMC3 uses this hook for its IRQ
    /// counter, Namco 1xx instead increments on CPU cycles (see
    /// `clock_cpu_cycle`).
    fn tick_ppu(&mut self, _scanline: u16, _tick: u16, _pattern_table_offset_is_high: bool) {}

    /// Advances a per-CPU-cycle counter (Namco 1xx's 15-bit IRQ counter).
    fn clock_cpu_cycle(&mut self) {}

    fn irq_pending(&self) -> bool {
        false
    }

    fn clear_irq(&mut self) {}

    fn mirroring(&self) -> Mirroring {
        Mirroring::Horizontal
    }

    fn mapper_id(&self) -> u16;

    fn name(&self) -> &'static str;

    fn prg_rom(&self) -> &[u8] {
        &[]
    }

    fn chr_rom(&self) -> &[u8] {
        &[]
    }

    fn prg_ram(&self) -> &[u8] {
        &[]
    }

    fn prg_ram_mut(&mut self) -> &mut [u8] {
        &mut []
    }

    /// CHR RAM only; `None` for CHR ROM, which a save state never needs to
    /// restore since it's immutable and already identified by the image hash.
    fn chr_ram_mut(&mut self) -> Option<&mut [u8]> {
        None
    }

    /// Packs bank-select registers, IRQ counters, and shift-register state
    /// into a fixed 64-byte blob for save states. Mappers with no such state
    /// (NROM) can rely on the default. PRG/CHR RAM and PRG/CHR ROM bytes are
    /// captured separately by the save-state writer, not through this blob.
    fn save_blob(&self) -> [u8; 64] {
        [0; 64]
    }

    /// Restores state packed by `save_blob`. Implementations must tolerate a
    /// blob produced by a different mapper only in the sense that it's still
    /// exactly 64 bytes; the save-state loader is responsible for checking
    /// the mapper ID matches before calling this.
    fn load_blob(&mut self, _blob: &[u8; 64]) {}
}

dyn_clone::clone_trait_object!(Mapper);

/// Shared sections handed to a mapper constructor, sliced out of the raw
/// ROM image by `cartridge::load_cartridge`.
pub struct MapperSections {
    pub header: Header,
    pub prg_rom: Cow<'static, [u8]>,
    pub chr_rom: Option<Cow<'static, [u8]>>,
}

/// Builds the concrete mapper implementation named by the header, or
/// `Error::UnsupportedMapper` for anything outside the eight variants this
/// core implements.
pub fn build_mapper(sections: MapperSections) -> Result<Box<dyn Mapper>> {
    let MapperSections {
        header,
        prg_rom,
        chr_rom,
    } = sections;

    let mapper: Box<dyn Mapper> = match header.mapper {
        0 => Box::new(mapper0::Nrom::new(header, prg_rom, chr_rom)),
        1 => Box::new(mapper1::Mmc1::new(header, prg_rom, chr_rom)),
        2 => Box::new(mapper2::Unrom::new(header, prg_rom, chr_rom)),
        3 => Box::new(mapper3::Cnrom::new(header, prg_rom, chr_rom)),
        4 => Box::new(mapper4::Mmc3::new(header, prg_rom, chr_rom)),
        7 => Box::new(mapper7::Axrom::new(header, prg_rom, chr_rom)),
        11 => Box::new(mapper11::ColorDreams::new(header, prg_rom, chr_rom)),
        19 => Box::new(mapper19::Namco163::new(header, prg_rom, chr_rom)),
        other => return Err(Error::UnsupportedMapper(other)),
    };
    Ok(mapper)
}

/// Common PRG-RAM allocation helper shared by every mapper constructor.
pub(crate) fn allocate_prg_ram(header: &Header) -> Vec<u8> {
    vec![0u8; header.prg_ram_size]
}

/// Common CHR storage allocation: CHR-ROM if the header carries any,
/// otherwise CHR-RAM sized per the header (defaults to 8 KiB).
pub(crate) fn select_chr_storage(
    header: &Header,
    chr_rom: Option<Cow<'static, [u8]>>,
) -> chr_storage::ChrStorage {
    match chr_rom {
        Some(data) if !data.is_empty() => chr_storage::ChrStorage::new_rom(data),
        _ => chr_storage::ChrStorage::new_ram(header.chr_ram_size().max(0x2000)),
    }
}
