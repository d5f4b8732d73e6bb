//! Cycle-accurate NES emulator core: CPU, PPU, cartridge/mapper layer, and
//! the system bus tying them together. Host concerns (windowing, audio
//! output, input polling) are deliberately external; see `nescore::ppu::
//! FrameSink` and `nescore::controller::InputSource` for the boundary.

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod config;
pub mod controller;
pub mod cpu;
pub mod debug;
pub mod error;
pub mod mem_block;
pub mod memory;
pub mod nes;

#[cfg(feature = "savestate-postcard")]
pub mod savestate;

pub mod ppu;

pub use cartridge::{load_cartridge, load_cartridge_from_file, Cartridge};
pub use error::{Error, Result};
pub use nes::Nes;

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::TRACE)
            .pretty()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}
