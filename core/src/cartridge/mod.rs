//! Cartridge loading: header parsing, ROM section slicing, and the
//! top-level `Cartridge` handle wrapping the selected mapper.

pub mod header;
pub mod mapper;

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use header::{Header, Mirroring};
use mapper::{Mapper, MapperSections};

use crate::error::Result;

/// A loaded ROM image: parsed header plus the concrete mapper it selected.
/// All cartridge state the emulator touches at runtime (PRG-RAM, CHR
/// banking, IRQ counters) lives behind the mapper trait object.
#[derive(Debug)]
pub struct Cartridge {
    pub header: Header,
    mapper: Box<dyn Mapper>,
}

impl Clone for Cartridge {
    fn clone(&self) -> Self {
        Self {
            header: self.header.clone(),
            mapper: self.mapper.clone(),
        }
    }
}

impl Cartridge {
    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        self.mapper.cpu_read(addr)
    }

    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        self.mapper.cpu_write(addr, value)
    }

    pub fn ppu_read(&mut self, addr: u16) -> u8 {
        self.mapper.ppu_read(addr)
    }

    pub fn ppu_write(&mut self, addr: u16, value: u8) {
        self.mapper.ppu_write(addr, value)
    }

    pub fn tick_ppu(&mut self, scanline: u16, tick: u16, pattern_table_offset_is_high: bool) {
        self.mapper
            .tick_ppu(scanline, tick, pattern_table_offset_is_high)
    }

    pub fn clock_cpu_cycle(&mut self) {
        self.mapper.clock_cpu_cycle()
    }

    pub fn irq_pending(&self) -> bool {
        self.mapper.irq_pending()
    }

    pub fn clear_irq(&mut self) {
        self.mapper.clear_irq()
    }

    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn mapper_name(&self) -> &'static str {
        self.mapper.name()
    }

    pub fn sha256(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.mapper.prg_rom());
        hasher.update(self.mapper.chr_rom());
        hasher.finalize().into()
    }

    pub fn mapper_id(&self) -> u16 {
        self.mapper.mapper_id()
    }

    pub fn prg_ram(&self) -> &[u8] {
        self.mapper.prg_ram()
    }

    pub fn prg_ram_mut(&mut self) -> &mut [u8] {
        self.mapper.prg_ram_mut()
    }

    /// CHR bytes regardless of ROM/RAM backing; only the RAM case needs
    /// writing back via `chr_ram_mut`, but both are readable for hashing
    /// and save-state capture.
    pub fn chr_rom(&self) -> &[u8] {
        self.mapper.chr_rom()
    }

    pub fn chr_ram_mut(&mut self) -> Option<&mut [u8]> {
        self.mapper.chr_ram_mut()
    }

    pub fn save_blob(&self) -> [u8; 64] {
        self.mapper.save_blob()
    }

    pub fn load_blob(&mut self, blob: &[u8; 64]) {
        self.mapper.load_blob(blob)
    }
}

/// Parses an iNES 1.0 ROM image and builds the cartridge's mapper.
pub fn load_cartridge(bytes: &[u8]) -> Result<Cartridge> {
    let header = Header::parse(bytes)?;

    let mut offset = header::NES_HEADER_LEN + header.trainer_len();
    let prg_len = header.prg_rom_size;
    let prg_end = offset + prg_len;
    if bytes.len() < prg_end {
        return Err(crate::error::Error::SectionTooShort {
            section: "PRG ROM",
            expected: prg_len,
            actual: bytes.len().saturating_sub(offset),
        });
    }
    let prg_rom: Cow<'static, [u8]> = Cow::Owned(bytes[offset..prg_end].to_vec());
    offset = prg_end;

    let chr_rom = if header.uses_chr_ram() {
        None
    } else {
        let chr_len = header.chr_rom_size;
        let chr_end = offset + chr_len;
        if bytes.len() < chr_end {
            return Err(crate::error::Error::SectionTooShort {
                section: "CHR ROM",
                expected: chr_len,
                actual: bytes.len().saturating_sub(offset),
            });
        }
        Some(Cow::Owned(bytes[offset..chr_end].to_vec()))
    };

    let mapper = mapper::build_mapper(MapperSections {
        header: header.clone(),
        prg_rom,
        chr_rom,
    })?;

    Ok(Cartridge { header, mapper })
}

pub fn load_cartridge_from_file(path: impl AsRef<Path>) -> Result<Cartridge> {
    let bytes = fs::read(path)?;
    load_cartridge(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nrom_rom() -> Vec<u8> {
        let mut bytes = vec![0u8; header::NES_HEADER_LEN];
        bytes[0..4].copy_from_slice(b"NES\x1A");
        bytes[4] = 1; // 16 KiB PRG
        bytes[5] = 1; // 8 KiB CHR
        bytes.extend(vec![0xEA; 0x4000]);
        bytes.extend(vec![0x00; 0x2000]);
        bytes
    }

    #[test]
    fn loads_an_nrom_image_and_exposes_its_mapper_name() {
        let rom = nrom_rom();
        let cart = load_cartridge(&rom).unwrap();
        assert_eq!(cart.mapper_name(), "NROM");
    }

    #[test]
    fn rejects_a_prg_section_shorter_than_the_header_declares() {
        let mut rom = nrom_rom();
        rom.truncate(header::NES_HEADER_LEN + 10);
        assert!(load_cartridge(&rom).is_err());
    }

    #[test]
    fn sha256_is_stable_for_identical_images() {
        let rom = nrom_rom();
        let a = load_cartridge(&rom).unwrap();
        let b = load_cartridge(&rom).unwrap();
        assert_eq!(a.sha256(), b.sha256());
    }
}
