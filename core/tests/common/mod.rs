#![allow(dead_code)]

//! Synthetic iNES image builders shared by the integration suites in this
//! directory. No real test ROMs ship with this sandbox, so every scenario
//! here is built from hand-assembled 6502 programs and minimal CHR data
//! rather than fetched binaries.

use nescore::cartridge::header::NES_HEADER_LEN;

const PRG_BANK: usize = 0x4000;
const CHR_BANK: usize = 0x2000;

/// Builds a 32 KiB-PRG / 8 KiB-CHR NROM (mapper 0) image with `code` placed
/// at `$8000` and the reset/NMI/IRQ vectors pointed at the given addresses.
/// `chr` is copied verbatim into the 8 KiB CHR ROM bank (zero-padded).
pub fn nrom_image(code: &[u8], reset: u16, nmi: u16, irq: u16, chr: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; NES_HEADER_LEN];
    bytes[0..4].copy_from_slice(b"NES\x1A");
    bytes[4] = 2; // 32 KiB PRG
    bytes[5] = 1; // 8 KiB CHR

    let mut prg = vec![0xEAu8; PRG_BANK * 2]; // NOP filler
    prg[..code.len()].copy_from_slice(code);
    prg[0x7FFA] = nmi.to_le_bytes()[0];
    prg[0x7FFB] = nmi.to_le_bytes()[1];
    prg[0x7FFC] = reset.to_le_bytes()[0];
    prg[0x7FFD] = reset.to_le_bytes()[1];
    prg[0x7FFE] = irq.to_le_bytes()[0];
    prg[0x7FFF] = irq.to_le_bytes()[1];
    bytes.extend(prg);

    let mut chr_bank = vec![0u8; CHR_BANK];
    chr_bank[..chr.len()].copy_from_slice(chr);
    bytes.extend(chr_bank);

    bytes
}

/// Builds an MMC3 (mapper 4) image with `prg_bank_count` 8 KiB PRG banks and
/// no CHR ROM (CHR RAM is selected automatically). `$E000-$FFFF` is fixed to
/// the last bank regardless of PRG mode, so `code` is placed there and the
/// reset vector always points at `$E000`.
pub fn mmc3_image(prg_bank_count: usize, code: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; NES_HEADER_LEN];
    bytes[0..4].copy_from_slice(b"NES\x1A");
    bytes[4] = (prg_bank_count * 0x2000 / PRG_BANK) as u8;
    bytes[5] = 0; // CHR RAM
    bytes[6] = 0x40; // mapper low nibble = 4

    let mut prg = vec![0xEAu8; prg_bank_count * 0x2000]; // NOP filler
    let last_bank_start = prg.len() - 0x2000;
    prg[last_bank_start..last_bank_start + code.len()].copy_from_slice(code);
    prg[last_bank_start + 0x1FFC] = 0x00; // reset -> $E000 (low)
    prg[last_bank_start + 0x1FFD] = 0xE0; // reset -> $E000 (high)
    bytes.extend(prg);

    bytes
}
