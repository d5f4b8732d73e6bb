//! CPU address decoding: internal RAM mirroring, PPU/APU register routing,
//! OAM DMA triggering, controller ports, and cartridge expansion space.

pub mod open_bus;

pub use open_bus::OpenBus;

use crate::apu::Apu;
use crate::cartridge::header::Mirroring;
use crate::cartridge::Cartridge;
use crate::controller::{ControllerPorts, InputSource};
use crate::cpu;
use crate::mem_block::cpu::Ram as CpuRam;
use crate::memory::cpu as cpu_mem;
use crate::ppu::{self, Ppu};

/// Bridges the PPU's pattern-table/mirroring needs to whatever cartridge is
/// presently loaded, so the PPU never has to know a cartridge is optional.
pub struct CartridgePatternBus<'a> {
    pub cartridge: Option<&'a mut Cartridge>,
}

impl ppu::PpuBus for CartridgePatternBus<'_> {
    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.cartridge
            .as_mut()
            .map(|cart| cart.ppu_read(addr))
            .unwrap_or(0)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        if let Some(cart) = self.cartridge.as_mut() {
            cart.ppu_write(addr, value);
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.cartridge
            .as_ref()
            .map(|cart| cart.mirroring())
            .unwrap_or(Mirroring::Horizontal)
    }

    fn tick_mapper(&mut self, scanline: u16, tick: u16, pattern_table_offset_is_high: bool) {
        if let Some(cart) = self.cartridge.as_mut() {
            cart.tick_ppu(scanline, tick, pattern_table_offset_is_high);
        }
    }
}

/// The CPU's view of the whole system for one tick: internal RAM, the PPU
/// register file, the APU register stub, cartridge expansion space, and
/// both controller ports. Borrowed fresh from `Nes` on every CPU cycle
/// rather than owned, since the PPU also needs independent access to the
/// cartridge's pattern tables in the same tick.
pub struct CpuBus<'a, S1: InputSource, S2: InputSource> {
    pub ram: &'a mut CpuRam,
    pub ppu: &'a mut Ppu,
    pub apu: &'a mut Apu,
    pub cartridge: Option<&'a mut Cartridge>,
    pub controllers: &'a mut ControllerPorts<S1, S2>,
    pub open_bus: &'a mut OpenBus,
    pub oam_dma_request: &'a mut Option<u8>,
}

impl<S1: InputSource, S2: InputSource> cpu::Bus for CpuBus<'_, S1, S2> {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram.read((addr & cpu_mem::INTERNAL_RAM_MASK) as usize)
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                let mut pattern = CartridgePatternBus {
                    cartridge: self.cartridge.as_mut().map(|cart| &mut **cart),
                };
                self.ppu.read_mmio(&mut pattern, addr)
            }
            cpu_mem::CONTROLLER_PORT_1 => self.controllers.port1.read(),
            cpu_mem::CONTROLLER_PORT_2 => self.controllers.port2.read(),
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::APU_REGISTER_END => self.apu.read_register(addr),
            cpu_mem::APU_STATUS => self.apu.read_register(addr),
            cpu_mem::TEST_MODE_BASE..=cpu_mem::TEST_MODE_END => self.open_bus.value(),
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => match self.cartridge.as_mut() {
                Some(cart) => cart.cpu_read(addr),
                None => self.open_bus.value(),
            },
            _ => self.open_bus.value(),
        };
        self.open_bus.refresh(value);
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus.refresh(value);
        match addr {
            cpu_mem::INTERNAL_RAM_START..=cpu_mem::INTERNAL_RAM_MIRROR_END => {
                self.ram.write((addr & cpu_mem::INTERNAL_RAM_MASK) as usize, value);
            }
            cpu_mem::PPU_REGISTER_BASE..=cpu_mem::PPU_REGISTER_END => {
                let mut pattern = CartridgePatternBus {
                    cartridge: self.cartridge.as_mut().map(|cart| &mut **cart),
                };
                self.ppu.write_mmio(&mut pattern, addr, value);
            }
            cpu_mem::OAM_DMA => {
                *self.oam_dma_request = Some(value);
            }
            cpu_mem::CONTROLLER_PORT_1 => self.controllers.write_strobe(value),
            // $4017 write is the APU frame counter register; only reads of
            // $4017 are routed to controller port 2 (real hardware quirk).
            cpu_mem::CONTROLLER_PORT_2 => self.apu.write_register(addr, value),
            cpu_mem::APU_REGISTER_BASE..=cpu_mem::APU_REGISTER_END => {
                self.apu.write_register(addr, value);
            }
            cpu_mem::APU_STATUS => self.apu.write_register(addr, value),
            cpu_mem::TEST_MODE_BASE..=cpu_mem::TEST_MODE_END => {}
            cpu_mem::CARTRIDGE_SPACE_BASE..=cpu_mem::CPU_ADDR_END => {
                if let Some(cart) = self.cartridge.as_mut() {
                    cart.cpu_write(addr, value);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::NoInput;
    use crate::cpu::Bus;

    fn harness() -> (CpuRam, Ppu, Apu, ControllerPorts<NoInput, NoInput>, OpenBus, Option<u8>) {
        (
            CpuRam::new(),
            Ppu::new(),
            Apu::new(),
            ControllerPorts::new(NoInput, NoInput),
            OpenBus::new(),
            None,
        )
    }

    #[test]
    fn mirrors_internal_ram_across_its_four_mirror_windows() {
        let (mut ram, mut ppu, mut apu, mut controllers, mut open_bus, mut dma) = harness();
        let mut bus = CpuBus {
            ram: &mut ram,
            ppu: &mut ppu,
            apu: &mut apu,
            cartridge: None,
            controllers: &mut controllers,
            open_bus: &mut open_bus,
            oam_dma_request: &mut dma,
        };
        bus.write(0x0001, 0x42);
        assert_eq!(bus.read(0x0801), 0x42);
        assert_eq!(bus.read(0x1801), 0x42);
    }

    #[test]
    fn oam_dma_write_sets_the_pending_request() {
        let (mut ram, mut ppu, mut apu, mut controllers, mut open_bus, mut dma) = harness();
        let mut bus = CpuBus {
            ram: &mut ram,
            ppu: &mut ppu,
            apu: &mut apu,
            cartridge: None,
            controllers: &mut controllers,
            open_bus: &mut open_bus,
            oam_dma_request: &mut dma,
        };
        bus.write(cpu_mem::OAM_DMA, 0x02);
        assert_eq!(dma, Some(0x02));
    }

    #[test]
    fn unmapped_cartridge_space_without_a_cartridge_reads_open_bus() {
        let (mut ram, mut ppu, mut apu, mut controllers, mut open_bus, mut dma) = harness();
        let mut bus = CpuBus {
            ram: &mut ram,
            ppu: &mut ppu,
            apu: &mut apu,
            cartridge: None,
            controllers: &mut controllers,
            open_bus: &mut open_bus,
            oam_dma_request: &mut dma,
        };
        bus.write(0x0000, 0x77);
        assert_eq!(bus.read(cpu_mem::PRG_ROM_START), 0x77);
    }

    #[test]
    fn controller_port_1_strobe_is_shared_with_port_2() {
        let (mut ram, mut ppu, mut apu, mut controllers, mut open_bus, mut dma) = harness();
        let mut bus = CpuBus {
            ram: &mut ram,
            ppu: &mut ppu,
            apu: &mut apu,
            cartridge: None,
            controllers: &mut controllers,
            open_bus: &mut open_bus,
            oam_dma_request: &mut dma,
        };
        bus.write(cpu_mem::CONTROLLER_PORT_1, 0x01);
        bus.write(cpu_mem::CONTROLLER_PORT_1, 0x00);
        assert_eq!(bus.read(cpu_mem::CONTROLLER_PORT_1), 0);
        assert_eq!(bus.read(cpu_mem::CONTROLLER_PORT_2), 0);
    }
}
