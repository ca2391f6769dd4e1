use std::{io::Write, sync::Arc};

use crate::{
    cartridge::CartError,
    hardware::MachineConfig,
    memory::{Attribute, MemoryMap},
    rtime8::WallClock,
    slot::{CART_IO_END, CART_IO_START, CartridgeSlot},
    statesav::{self, MachineHooks, SaveStateError, StateHeader},
};

/// A machine's memory map with a cartridge slot plugged into it.
///
/// CPU accesses go through [`Machine::read_byte`] and
/// [`Machine::write_byte`], which route the cartridge I/O page and the
/// Bounty Bob hook addresses to the slot.
pub struct Machine {
    pub memory: MemoryMap,
    pub cart: CartridgeSlot,
}

impl Machine {
    pub fn new(config: MachineConfig) -> Self {
        let memory = MemoryMap::new(config.ram_kb);
        Self::assemble(memory, CartridgeSlot::new(config))
    }

    pub fn with_clock(config: MachineConfig, clock: Box<dyn WallClock>) -> Self {
        let memory = MemoryMap::new(config.ram_kb);
        Self::assemble(memory, CartridgeSlot::with_clock(config, clock))
    }

    fn assemble(memory: MemoryMap, cart: CartridgeSlot) -> Self {
        let mut machine = Self { memory, cart };
        machine.cart.initialise(&mut machine.memory);
        machine
    }

    pub fn insert_cartridge(&mut self, image: impl Into<Arc<[u8]>>) -> Result<(), CartError> {
        self.cart.insert(&mut self.memory, image)
    }

    pub fn remove_cartridge(&mut self) {
        self.cart.remove(&mut self.memory);
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        if (CART_IO_START..=CART_IO_END).contains(&addr) {
            return self.cart.read_io(&mut self.memory, addr);
        }
        if self.memory.attribute(addr) == Attribute::Hook
            && let Some(value) = self.cart.bounty_bob_read(&mut self.memory, addr)
        {
            return value;
        }
        self.memory.peek(addr)
    }

    pub fn write_byte(&mut self, addr: u16, value: u8) {
        if (CART_IO_START..=CART_IO_END).contains(&addr) {
            self.cart.write_io(&mut self.memory, addr, value);
            return;
        }
        match self.memory.attribute(addr) {
            Attribute::Hook => {
                self.cart.bounty_bob_write(&mut self.memory, addr);
            }
            Attribute::Ram => {
                self.memory.poke(addr, value);
            }
            Attribute::Rom => {}
        }
    }

    pub fn save_state(
        &self,
        hooks: &mut dyn MachineHooks,
        out: &mut dyn Write,
        verbose: bool,
    ) -> Result<usize, SaveStateError> {
        statesav::save_state(&self.cart, hooks, out, verbose)
    }

    pub fn restore_state(
        &mut self,
        hooks: &mut dyn MachineHooks,
        data: &[u8],
    ) -> Result<StateHeader, SaveStateError> {
        statesav::restore_state(&mut self.cart, &mut self.memory, hooks, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::MachineType;

    #[test]
    fn rom_ignores_cpu_writes() {
        let mut m = Machine::new(MachineConfig::default());
        m.insert_cartridge(vec![0x42u8; 32 * 1024]).unwrap();
        m.write_byte(0x4000, 0x00);
        assert_eq!(m.read_byte(0x4000), 0x42);
        m.write_byte(0x0100, 0x99);
        assert_eq!(m.read_byte(0x0100), 0x99);
    }

    #[test]
    fn empty_5200_reads_crash_fill() {
        let mut m = Machine::new(MachineConfig::default());
        assert_eq!(m.read_byte(0x4000), 0x00);
        assert_eq!(m.read_byte(0xBFFF), 0x00);
    }

    #[test]
    fn bounty_bob_5200_hook_switches_and_reads_zero() {
        let mut m = Machine::new(MachineConfig::default());
        let image: Vec<u8> = (0..40 * 1024).map(|i| (i / 0x1000) as u8 + 1).collect();
        m.insert_cartridge(image).unwrap();
        assert_eq!(m.read_byte(0x4000), 0x01);
        assert_eq!(m.read_byte(0x5000), 0x05);

        assert_eq!(m.read_byte(0x4FF7), 0x00);
        assert_eq!(m.read_byte(0x4000), 0x02);
        m.write_byte(0x5FF9, 0xAA);
        assert_eq!(m.read_byte(0x5000), 0x08);
    }

    #[test]
    fn io_page_routes_to_cartridge() {
        let mut m = Machine::new(MachineConfig::for_machine(MachineType::XlXe));
        assert_eq!(m.read_byte(0xD500), 0xFF);
        m.write_byte(0xD5B8, 10);
        m.write_byte(0xD5B8, 0x0C);
        m.write_byte(0xD5B9, 0x03);
        assert_eq!(m.cart.rtime8().state().regs[10], 0xC3);
    }
}
