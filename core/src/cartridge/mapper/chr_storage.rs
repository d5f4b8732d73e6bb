//! Backing storage for the pattern-table window: either ROM (read-only) or
//! RAM (read/write), selected at load time from the header's CHR size.

use std::borrow::Cow;

#[derive(Debug, Clone)]
pub enum ChrStorage {
    Rom(Cow<'static, [u8]>),
    Ram(Vec<u8>),
}

impl ChrStorage {
    pub fn new_rom(data: Cow<'static, [u8]>) -> Self {
        Self::Rom(data)
    }

    pub fn new_ram(size: usize) -> Self {
        Self::Ram(vec![0u8; size])
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Rom(data) => data.len(),
            Self::Ram(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read(&self, offset: usize) -> u8 {
        match self {
            Self::Rom(data) => data[offset % data.len().max(1)],
            Self::Ram(data) => data[offset % data.len().max(1)],
        }
    }

    pub fn write(&mut self, offset: usize, value: u8) {
        if let Self::Ram(data) = self {
            let len = data.len();
            if len > 0 {
                data[offset % len] = value;
            }
        }
        // Writes to ROM are silently ignored (spec §7: "runtime silent
        // behavior", not an error).
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Rom(data) => data,
            Self::Ram(data) => data,
        }
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self {
            Self::Rom(_) => None,
            Self::Ram(data) => Some(data),
        }
    }
}
