//! Save-state binary format, per spec.md §6: magic, a cartridge hash for
//! load-time validation, system RAM, VRAM/OAM, PRG/CHR-RAM, the CPU and PPU
//! register files and internal latches, bus state, cycle counters, and a
//! 64-byte mapper-specific blob.
//!
//! The fixed header (magic, hash, mapper id) is a raw little-endian byte
//! layout, since a loader needs to validate it before trusting anything else
//! in the buffer. Everything after it is one `postcard`-encoded body: field
//! ordering there follows `state.c`'s `create_save_state` in spirit (system
//! RAM, VRAM/PRG-RAM/CHR-RAM, CPU registers, PPU registers, then the
//! mapper-specific blob), widened to include what this core tracks that the
//! original didn't (OAM as its own array, the CPU-bus open-bus byte, the
//! pending OAM DMA page).

use serde::{Deserialize, Serialize};

use crate::cartridge::Cartridge;
use crate::cpu::CpuState;
use crate::error::{Error, Result};
use crate::ppu::PpuState;

pub const MAGIC: [u8; 4] = *b"CNES";
const HASH_LEN: usize = 32;
const HEADER_LEN: usize = MAGIC.len() + HASH_LEN + 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SaveStateBody {
    pub system_ram: Vec<u8>,
    pub prg_ram: Vec<u8>,
    pub chr_ram: Vec<u8>,
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub cpu_open_bus: u8,
    pub oam_dma_pending: Option<u8>,
    pub mapper_blob: [u8; 64],
}

/// Serializes a save state's fixed header plus its postcard-encoded body.
pub(crate) fn encode(cartridge: &Cartridge, body: &SaveStateBody) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 256);
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&cartridge.sha256());
    out.extend_from_slice(&cartridge.mapper_id().to_le_bytes());
    let encoded = postcard::to_allocvec(body).expect("save state body is always serializable");
    out.extend_from_slice(&encoded);
    out
}

/// Validates the fixed header against `cartridge` and decodes the body.
/// Returns `Error::InvalidSaveState` for bad magic, a hash or mapper
/// mismatch, or a body that doesn't decode to the expected shape —
/// spec.md §7's "truncated data: report and refuse to start".
pub(crate) fn decode(bytes: &[u8], cartridge: &Cartridge) -> Result<SaveStateBody> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::InvalidSaveState("buffer shorter than the fixed header"));
    }
    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(Error::InvalidSaveState("bad magic"));
    }
    let (hash, rest) = rest.split_at(HASH_LEN);
    if hash != cartridge.sha256() {
        return Err(Error::InvalidSaveState("cartridge hash mismatch"));
    }
    let (mapper_id_bytes, rest) = rest.split_at(2);
    let mapper_id = u16::from_le_bytes([mapper_id_bytes[0], mapper_id_bytes[1]]);
    if mapper_id != cartridge.mapper_id() {
        return Err(Error::InvalidSaveState("mapper id mismatch"));
    }

    postcard::from_bytes(rest).map_err(|_| Error::InvalidSaveState("malformed save state body"))
}

/// Copies `src` into `dst`, refusing a length mismatch instead of panicking
/// so a truncated or foreign save state is reported rather than crashing.
pub(crate) fn copy_checked(dst: &mut [u8], src: &[u8], what: &'static str) -> Result<()> {
    if dst.len() != src.len() {
        return Err(Error::InvalidSaveState(what));
    }
    dst.copy_from_slice(src);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::load_cartridge;

    fn nrom_rom() -> Vec<u8> {
        let mut bytes = vec![0u8; crate::cartridge::header::NES_HEADER_LEN];
        bytes[0..4].copy_from_slice(b"NES\x1A");
        bytes[4] = 1;
        bytes[5] = 1;
        bytes.extend(vec![0xEA; 0x4000]);
        bytes.extend(vec![0x00; 0x2000]);
        bytes
    }

    fn sample_body() -> SaveStateBody {
        SaveStateBody {
            system_ram: vec![0u8; 0x0800],
            prg_ram: Vec::new(),
            chr_ram: Vec::new(),
            cpu: CpuState::default(),
            ppu: PpuState::default(),
            cpu_open_bus: 0,
            oam_dma_pending: None,
            mapper_blob: [0; 64],
        }
    }

    #[test]
    fn round_trips_through_encode_and_decode() {
        let cart = load_cartridge(&nrom_rom()).unwrap();
        let mut body = sample_body();
        body.system_ram[10] = 0x42;
        let bytes = encode(&cart, &body);
        let decoded = decode(&bytes, &cart).unwrap();
        assert_eq!(decoded.system_ram[10], 0x42);
    }

    #[test]
    fn rejects_bad_magic() {
        let cart = load_cartridge(&nrom_rom()).unwrap();
        let mut bytes = encode(&cart, &sample_body());
        bytes[0] = b'X';
        assert!(matches!(decode(&bytes, &cart), Err(Error::InvalidSaveState(_))));
    }

    #[test]
    fn rejects_a_hash_that_does_not_match_the_loaded_cartridge() {
        let cart_a = load_cartridge(&nrom_rom()).unwrap();
        let mut other_rom = nrom_rom();
        other_rom[0x20] = 0xFF; // perturb PRG data so the hash differs
        let cart_b = load_cartridge(&other_rom).unwrap();
        let bytes = encode(&cart_a, &sample_body());
        assert!(matches!(decode(&bytes, &cart_b), Err(Error::InvalidSaveState(_))));
    }

    #[test]
    fn rejects_truncated_input() {
        let cart = load_cartridge(&nrom_rom()).unwrap();
        let bytes = encode(&cart, &sample_body());
        assert!(matches!(decode(&bytes[..4], &cart), Err(Error::InvalidSaveState(_))));
    }
}
