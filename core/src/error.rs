use std::borrow::Cow;
use std::fmt;

use crate::cartridge::header::NES_HEADER_LEN;

/// Every way the core can fail to load a cartridge or reach an inconsistent
/// runtime state.
///
/// Load-time variants are recoverable from the caller's perspective (refuse
/// to start); `Fault` is not: it marks a programmer-visible invariant
/// violation and the orchestration loop treats it as fatal.
#[derive(Debug)]
pub enum Error {
    /// Provided buffer is shorter than the 16-byte iNES header.
    TooShort { actual: usize },
    /// Magic number (`NES\x1A`) is missing.
    InvalidMagic,
    /// Header advertises the NES 2.0 format, which this core does not parse.
    Nes20NotSupported,
    /// A ROM section (trainer/PRG/CHR) is shorter than the header advertises.
    SectionTooShort {
        section: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Header advertises a mapper number outside the eight supported here.
    UnsupportedMapper(u16),
    /// Save-state blob failed magic/hash/length validation.
    InvalidSaveState(&'static str),
    /// Programmer-visible fault: KIL opcode, PC out of PRG bounds, or an
    /// address-decoder invariant violation. Fatal; the orchestration loop
    /// halts rather than continuing on inconsistent state.
    Fault { pc: u16, message: Cow<'static, str> },
    /// Wrapper for I/O errors raised while reading ROMs from disk.
    Io(std::io::Error),
}

impl Error {
    pub fn fault(pc: u16, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Fault {
            pc,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { actual } => {
                write!(f, "header expected {NES_HEADER_LEN} bytes, got {actual}")
            }
            Self::InvalidMagic => write!(f, "missing NES magic bytes"),
            Self::Nes20NotSupported => write!(f, "NES 2.0 headers are not supported"),
            Self::SectionTooShort {
                section,
                expected,
                actual,
            } => write!(
                f,
                "{section} section expected {expected} bytes, got {actual}"
            ),
            Self::UnsupportedMapper(mapper) => {
                write!(f, "mapper {mapper} is not implemented")
            }
            Self::InvalidSaveState(reason) => write!(f, "invalid save state: {reason}"),
            Self::Fault { pc, message } => {
                write!(f, "fault at pc=${pc:04X}: {message}")
            }
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
