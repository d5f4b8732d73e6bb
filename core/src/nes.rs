//! The top-level "machine": owns the CPU, PPU, cartridge slot, controller
//! ports, and bus-level open-bus state, and runs the NTSC master loop (three
//! PPU ticks per CPU tick) described in spec.md §9's design note. Nothing
//! below this module knows about host windowing, audio output, or save
//! files; `Nes` is the whole of what a host embeds.

use crate::apu::Apu;
use crate::bus::{CpuBus, OpenBus};
use crate::cartridge::Cartridge;
use crate::config::PPU_TICKS_PER_CPU_TICK;
use crate::controller::{ControllerPorts, InputSource, NoInput};
use crate::cpu::Cpu;
use crate::mem_block::cpu::Ram as CpuRam;
use crate::ppu::{FrameSink, Ppu};

/// Owns every emulated component and advances them in lockstep. Generic
/// over the two controller input sources so a host can plug in its own
/// polling closures without the core depending on any windowing crate.
pub struct Nes<S1: InputSource = NoInput, S2: InputSource = NoInput> {
    cpu: Cpu,
    ppu: Ppu,
    apu: Apu,
    ram: CpuRam,
    cartridge: Option<Cartridge>,
    controllers: ControllerPorts<S1, S2>,
    open_bus: OpenBus,
    oam_dma_request: Option<u8>,

    /// Cooperative cancellation: checked between CPU cycles so a host
    /// running this on its own thread can ask the loop to stop without
    /// tearing down the stack mid-instruction.
    kill_execution: bool,
}

impl<S1: InputSource, S2: InputSource> Nes<S1, S2> {
    pub fn new(source1: S1, source2: S2) -> Self {
        Self {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            ram: CpuRam::new(),
            cartridge: None,
            controllers: ControllerPorts::new(source1, source2),
            open_bus: OpenBus::new(),
            oam_dma_request: None,
            kill_execution: false,
        }
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn controllers_mut(&mut self) -> &mut ControllerPorts<S1, S2> {
        &mut self.controllers
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    /// Loads a cartridge and performs the power-on reset sequence. Any
    /// cartridge previously loaded is dropped.
    pub fn load_cartridge(&mut self, cartridge: Cartridge) {
        self.cartridge = Some(cartridge);
        self.reset();
    }

    /// Reruns the reset sequence against whatever cartridge (if any) is
    /// loaded, without touching RAM or re-parsing the ROM image.
    pub fn reset(&mut self) {
        self.ppu = Ppu::new();
        self.open_bus = OpenBus::new();
        self.oam_dma_request = None;
        let mut bus = self.cpu_bus();
        self.cpu.reset(&mut bus);
    }

    /// Asks the run loop to stop at the next cycle boundary. Idempotent and
    /// safe to call from outside the loop (e.g. a host's shutdown handler).
    pub fn request_stop(&mut self) {
        self.kill_execution = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.kill_execution
    }

    /// Renders one frame in a debug `RenderMode`, bypassing the normal
    /// per-cycle pipeline entirely. Host tooling calls this on demand
    /// instead of `run_frame`/`step_cpu_cycle`; it doesn't advance the CPU.
    pub fn render_debug_frame(&mut self, mode: crate::debug::RenderMode, sink: &mut impl FrameSink) {
        let mut pattern = crate::bus::CartridgePatternBus {
            cartridge: self.cartridge.as_mut(),
        };
        self.ppu.render_debug_frame(&mut pattern, mode, sink);
    }

    /// Advances the system by one CPU cycle: three PPU dots, the line
    /// updates the CPU reads off the PPU and cartridge each cycle, one CPU
    /// cycle, then any OAM DMA the CPU's bus access just triggered.
    pub fn step_cpu_cycle(&mut self, sink: &mut impl FrameSink) {
        for _ in 0..PPU_TICKS_PER_CPU_TICK {
            let mut pattern = crate::bus::CartridgePatternBus {
                cartridge: self.cartridge.as_mut(),
            };
            self.ppu.tick(&mut pattern, sink);
        }

        if self.ppu.nmi_line() {
            self.cpu.raise_nmi_line();
        } else {
            self.cpu.clear_nmi_line();
        }

        let mapper_irq = self.cartridge.as_ref().is_some_and(Cartridge::irq_pending);
        if mapper_irq {
            self.cpu.pull_down_irq_line();
        } else {
            self.cpu.raise_irq_line();
        }

        if let Some(cart) = self.cartridge.as_mut() {
            cart.clock_cpu_cycle();
        }

        let mut bus = self.cpu_bus();
        self.cpu.tick(&mut bus);
        self.open_bus.tick();

        if let Some(page) = self.oam_dma_request.take() {
            self.perform_oam_dma(page);
        }
    }

    /// Runs cycles until the PPU has submitted one full frame, or the host
    /// has asked the loop to stop. Returns `false` if it stopped early.
    pub fn run_frame(&mut self, sink: &mut impl FrameSink) -> bool {
        loop {
            if self.kill_execution {
                return false;
            }
            self.step_cpu_cycle(sink);
            if self.ppu.frame_ready() {
                return true;
            }
        }
    }

    /// Non-side-effecting read of the CPU's address space, for debuggers and
    /// tests that need to inspect RAM or register state without perturbing
    /// emulation (see `cpu::Bus::peek`).
    pub fn peek_cpu(&mut self, addr: u16) -> u8 {
        use crate::cpu::Bus;
        let mut bus = self.cpu_bus();
        bus.peek(addr)
    }

    fn cpu_bus(&mut self) -> CpuBus<'_, S1, S2> {
        CpuBus {
            ram: &mut self.ram,
            ppu: &mut self.ppu,
            apu: &mut self.apu,
            cartridge: self.cartridge.as_mut(),
            controllers: &mut self.controllers,
            open_bus: &mut self.open_bus,
            oam_dma_request: &mut self.oam_dma_request,
        }
    }

    /// Copies 256 bytes starting at `page * 0x100` into primary OAM and
    /// stalls the CPU for 513 (even start cycle) or 514 (odd) cycles, per
    /// spec.md §4.1. The copy itself is performed all at once rather than
    /// spread across the stall window; nothing else can observe RAM mid-DMA
    /// in this model, so the result is indistinguishable from hardware
    /// short of a second DMA device racing the first (not modeled).
    fn perform_oam_dma(&mut self, page: u8) {
        let odd_cycle = self.cpu.cycle_count() % 2 == 1;
        self.cpu.add_stall(if odd_cycle { 514 } else { 513 });

        let base = u16::from(page) << 8;
        for index in 0..256u16 {
            let addr = base.wrapping_add(index);
            let value = self.peek_dma_source(addr);
            self.ppu.dma_write_oam(index as u8, value);
        }
    }

    /// Reads a byte for OAM DMA's source page without routing through PPU
    /// or APU register side effects: real carts almost never point OAM DMA
    /// at `$2000-$401F`, and re-entrant register reads during DMA are not a
    /// testable property this core models.
    fn peek_dma_source(&mut self, addr: u16) -> u8 {
        use crate::memory::cpu as cpu_mem;
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram.read((addr & cpu_mem::INTERNAL_RAM_MASK) as usize)
            }
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => self
                .cartridge
                .as_mut()
                .map(|cart| cart.cpu_read(addr))
                .unwrap_or(0),
            _ => self.open_bus.value(),
        }
    }

    /// Captures a save state of the running machine: system RAM, the
    /// cartridge's PRG/CHR-RAM, the CPU and PPU register files and internal
    /// latches, the CPU-bus open-bus byte, the pending OAM DMA page, and the
    /// mapper's own blob. Fails if no cartridge is loaded, since a save
    /// state is only ever meaningful relative to one.
    #[cfg(feature = "savestate-postcard")]
    pub fn save_state(&self) -> crate::error::Result<Vec<u8>> {
        let cartridge = self
            .cartridge
            .as_ref()
            .ok_or(crate::error::Error::InvalidSaveState("no cartridge loaded"))?;
        let body = crate::savestate::SaveStateBody {
            system_ram: self.ram.as_slice().to_vec(),
            prg_ram: cartridge.prg_ram().to_vec(),
            chr_ram: cartridge.chr_rom().to_vec(),
            cpu: self.cpu.snapshot(),
            ppu: self.ppu.snapshot(),
            cpu_open_bus: self.open_bus.value(),
            oam_dma_pending: self.oam_dma_request,
            mapper_blob: cartridge.save_blob(),
        };
        Ok(crate::savestate::encode(cartridge, &body))
    }

    /// Restores a save state produced by `save_state` against whatever
    /// cartridge is presently loaded. The cartridge's hash and mapper id
    /// must match the ones the state was captured against.
    #[cfg(feature = "savestate-postcard")]
    pub fn load_state(&mut self, bytes: &[u8]) -> crate::error::Result<()> {
        use crate::savestate;

        let cartridge = self
            .cartridge
            .as_mut()
            .ok_or(crate::error::Error::InvalidSaveState("no cartridge loaded"))?;
        let body = savestate::decode(bytes, cartridge)?;

        savestate::copy_checked(self.ram.as_mut_slice(), &body.system_ram, "system RAM size mismatch")?;
        savestate::copy_checked(cartridge.prg_ram_mut(), &body.prg_ram, "PRG-RAM size mismatch")?;
        if let Some(chr_ram) = cartridge.chr_ram_mut() {
            savestate::copy_checked(chr_ram, &body.chr_ram, "CHR-RAM size mismatch")?;
        }

        self.cpu.restore(body.cpu);
        self.ppu.restore(&body.ppu);
        self.open_bus = OpenBus::new();
        self.open_bus.refresh(body.cpu_open_bus);
        self.oam_dma_request = body.oam_dma_pending;
        cartridge.load_blob(&body.mapper_blob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::load_cartridge;
    use crate::ppu::NullSink;

    fn nrom_rom() -> Vec<u8> {
        let mut bytes = vec![0u8; crate::cartridge::header::NES_HEADER_LEN];
        bytes[0..4].copy_from_slice(b"NES\x1A");
        bytes[4] = 2; // 32 KiB PRG
        bytes[5] = 1; // 8 KiB CHR
        let mut prg = vec![0xEAu8; 0x8000]; // NOP filler
        prg[0x7FFC] = 0x00; // reset vector low -> $8000
        prg[0x7FFD] = 0x80;
        bytes.extend(prg);
        bytes.extend(vec![0u8; 0x2000]);
        bytes
    }

    #[test]
    fn loading_a_cartridge_resets_the_cpu_to_its_vector() {
        let mut nes: Nes = Nes::new(NoInput, NoInput);
        let cart = load_cartridge(&nrom_rom()).unwrap();
        nes.load_cartridge(cart);
        assert_eq!(nes.cpu().reg.pc, 0x8000);
    }

    #[test]
    fn oam_dma_trigger_stalls_and_copies_into_primary_oam() {
        let mut nes: Nes = Nes::new(NoInput, NoInput);
        let cart = load_cartridge(&nrom_rom()).unwrap();
        nes.load_cartridge(cart);
        nes.ram.write(0x0000, 0xAB);
        nes.oam_dma_request = Some(0x00);
        nes.perform_oam_dma(0x00);
        assert!(nes.cpu.is_stalled());
        assert_eq!(nes.ppu().nmi_line(), false);
    }

    #[test]
    fn run_frame_completes_without_a_cartridge() {
        let mut nes: Nes = Nes::new(NoInput, NoInput);
        let mut sink = NullSink;
        assert!(nes.run_frame(&mut sink));
    }

    #[test]
    fn request_stop_halts_the_frame_loop() {
        let mut nes: Nes = Nes::new(NoInput, NoInput);
        nes.request_stop();
        let mut sink = NullSink;
        assert!(!nes.run_frame(&mut sink));
    }
}
