use log::debug;
#[cfg(feature = "bank-trace")]
use log::trace;

use crate::{
    cartridge::{MapperKind, bytes_padded},
    memory::CartridgeBus,
    slot::CartridgeSlot,
};

/// Computer cartridge windows.
pub const WINDOW_8000: (u16, u16) = (0x8000, 0x9FFF);
pub const WINDOW_A000: (u16, u16) = (0xA000, 0xBFFF);

/// Whole 5200 cartridge space.
pub const WINDOW_5200: (u16, u16) = (0x4000, 0xBFFF);

/// Fill byte of an empty 5200 cartridge space.
pub const CRASH_FILL: u8 = 0x00;

#[inline]
fn bank_offset(b: i32, unit: usize) -> usize {
    // Negative values only reach here through corrupt state; they land past
    // the end of any image and read back as open bus.
    (b as u32 as usize).saturating_mul(unit)
}

impl MapperKind {
    /// Offset of the fixed bank that XEGS-style boards keep at 0xA000.
    fn xegs_main_bank(self) -> usize {
        self.nominal_size().saturating_sub(0x2000)
    }
}

impl CartridgeSlot {
    /// Re-map the cartridge windows from scratch for the current kind.
    pub fn start(&mut self, bus: &mut dyn CartridgeBus) {
        let machine = self.config.machine;
        let (hook1, hook2) = machine.bounty_bob_hooks();
        bus.remove_fetch_hook(hook1, hook1 + 3);
        bus.remove_fetch_hook(hook2, hook2 + 3);

        if machine.is_5200() {
            self.start_5200(bus);
        } else {
            self.start_computer(bus);
        }
        debug!(
            "Cartridge start: {:?} bank {}",
            self.state.kind, self.state.bank
        );
    }

    fn start_5200(&mut self, bus: &mut dyn CartridgeBus) {
        match self.state.kind {
            MapperKind::A5200_32 => {
                bus.enable_window(0x4000, 0xBFFF);
                self.copy_rom(bus, 0x4000, 0xBFFF, 0);
            }
            MapperKind::A5200Ee16 => {
                bus.enable_window(0x4000, 0xBFFF);
                self.copy_rom(bus, 0x4000, 0x5FFF, 0);
                self.copy_rom(bus, 0x6000, 0x9FFF, 0);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0x2000);
            }
            MapperKind::A5200_40 => {
                bus.enable_window(0x4000, 0x5FFF);
                bus.enable_window(0x8000, 0xBFFF);
                self.copy_rom(bus, 0x4000, 0x4FFF, 0);
                self.copy_rom(bus, 0x5000, 0x5FFF, 0x4000);
                self.copy_rom(bus, 0x8000, 0x9FFF, 0x8000);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0x8000);
                self.install_bounty_bob_hooks(bus);
            }
            MapperKind::A5200Ns16 => {
                bus.enable_window(0x8000, 0xBFFF);
                self.copy_rom(bus, 0x8000, 0xBFFF, 0);
            }
            MapperKind::A5200_8 => {
                bus.enable_window(0x8000, 0xBFFF);
                self.copy_rom(bus, 0x8000, 0x9FFF, 0);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0);
            }
            MapperKind::A5200_4 => {
                bus.enable_window(0x8000, 0xBFFF);
                self.copy_rom(bus, 0x8000, 0x8FFF, 0);
                self.copy_rom(bus, 0x9000, 0x9FFF, 0);
                self.copy_rom(bus, 0xA000, 0xAFFF, 0);
                self.copy_rom(bus, 0xB000, 0xBFFF, 0);
            }
            _ => {
                let (start, end) = WINDOW_5200;
                bus.disable_window(start, end);
                bus.fill_memory(start, usize::from(end - start) + 1, CRASH_FILL);
            }
        }
    }

    fn start_computer(&mut self, bus: &mut dyn CartridgeBus) {
        use MapperKind::*;

        let kind = self.state.kind;
        match kind {
            Std8 | Phoenix8 => {
                disable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0);
                if kind == Phoenix8 {
                    self.state.bank = 0;
                }
            }
            Std16 | Blizzard16 => {
                enable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0x8000, 0xBFFF, 0);
                if kind == Blizzard16 {
                    self.state.bank = 0;
                }
            }
            Oss16 => {
                disable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0xA000, 0xAFFF, 0);
                self.copy_rom(bus, 0xB000, 0xBFFF, 0x3000);
                self.state.bank = 0;
            }
            Db32 | Xegs32 | Xegs64 | Xegs128 | Xegs256 | Xegs512 | Xegs1024 | SwXegs32
            | SwXegs64 | SwXegs128 | SwXegs256 | SwXegs512 | SwXegs1024 => {
                let main = if kind == Db32 { 0x6000 } else { kind.xegs_main_bank() };
                enable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0x8000, 0x9FFF, 0);
                self.copy_rom(bus, 0xA000, 0xBFFF, main);
                self.state.bank = 0;
            }
            Will64 | Will32 | Exp64 | Diamond64 | Sdx64 | Atrax128 | Atmax128 => {
                disable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0);
                self.state.bank = 0;
            }
            Oss2_16 => {
                disable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0xA000, 0xAFFF, 0x1000);
                self.copy_rom(bus, 0xB000, 0xBFFF, 0);
                self.state.bank = 0;
            }
            Bbsb40 => {
                enable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0x8000, 0x8FFF, 0);
                self.copy_rom(bus, 0x9000, 0x9FFF, 0x4000);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0x8000);
                self.install_bounty_bob_hooks(bus);
            }
            Right8 => {
                if self.config.machine.is_800() {
                    enable(bus, WINDOW_8000);
                    self.copy_rom(bus, 0x8000, 0x9FFF, 0);
                    self.map_basic_or_disable(bus);
                } else {
                    // XL/XE machines have no right slot.
                    disable(bus, WINDOW_8000);
                    disable(bus, WINDOW_A000);
                }
            }
            Mega16 | Mega32 | Mega64 | Mega128 | Mega256 | Mega512 | Mega1024 => {
                enable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0x8000, 0xBFFF, 0);
                self.state.bank = 0;
            }
            Atmax1024 => {
                disable(bus, WINDOW_8000);
                enable(bus, WINDOW_A000);
                self.copy_rom(bus, 0xA000, 0xBFFF, 0xFE000);
                self.state.bank = 0x7F;
            }
            None | A5200_32 | A5200Ee16 | A5200_40 | A5200Ns16 | A5200_8 | A5200_4 => {
                disable(bus, WINDOW_8000);
                self.map_basic_or_disable(bus);
            }
        }
    }

    fn map_basic_or_disable(&self, bus: &mut dyn CartridgeBus) {
        let (start, end) = WINDOW_A000;
        match self.config.basic() {
            Some(basic) => {
                bus.enable_window(start, end);
                let data = bytes_padded(basic, 0, usize::from(end - start) + 1);
                bus.copy_into_window(start, end, &data);
            }
            None => bus.disable_window(start, end),
        }
    }

    fn install_bounty_bob_hooks(&self, bus: &mut dyn CartridgeBus) {
        let (hook1, hook2) = self.config.machine.bounty_bob_hooks();
        bus.install_fetch_hook(hook1, hook1 + 3);
        bus.install_fetch_hook(hook2, hook2 + 3);
    }

    /// Copy ROM starting at `offset` into `start..=end`.
    fn copy_rom(&self, bus: &mut dyn CartridgeBus, start: u16, end: u16, offset: usize) {
        if let Some(cart) = &self.cart {
            let data = cart.bank_bytes(offset, usize::from(end - start) + 1);
            bus.copy_into_window(start, end, &data);
        }
    }

    #[inline]
    fn commit(&mut self, b: i32) {
        #[cfg(feature = "bank-trace")]
        trace!("Cartridge bank {} -> {}", self.state.bank, b);
        self.state.bank = b;
    }

    /// Address-decoded switching: any read or write in the I/O page.
    pub(crate) fn access(&mut self, bus: &mut dyn CartridgeBus, addr: u16) {
        let b = self.state.bank;
        let a = i32::from(addr);
        match self.state.kind {
            MapperKind::Oss16 => {
                let b = if addr & 0x08 != 0 {
                    -1
                } else {
                    match addr & 0x07 {
                        0x00 | 0x01 => 0,
                        0x03 | 0x07 => 1,
                        0x04 | 0x05 => 2,
                        _ => b,
                    }
                };
                self.switch_bank(bus, b);
            }
            MapperKind::Db32 => self.switch_bank(bus, a & 0x03),
            MapperKind::Will64 | MapperKind::Will32 => self.switch_bank(bus, a),
            MapperKind::Exp64 if addr & 0xF0 == 0x70 => self.switch_bank(bus, a),
            MapperKind::Diamond64 if addr & 0xF0 == 0xD0 => self.switch_bank(bus, a),
            MapperKind::Sdx64 if addr & 0xF0 == 0xE0 => self.switch_bank(bus, a),
            MapperKind::Oss2_16 => {
                let b = match addr & 0x09 {
                    0x00 => 1,
                    0x01 => 3,
                    0x08 => -1,
                    _ => 2,
                };
                self.switch_bank(bus, b);
            }
            MapperKind::Phoenix8 | MapperKind::Blizzard16 => self.switch_bank(bus, -1),
            MapperKind::Atmax128 | MapperKind::Atmax1024 => self.switch_bank(bus, a & 0xFF),
            _ => {}
        }
    }

    /// Data-decoded switching for the boards that latch the written byte,
    /// address decoding for everything else.
    pub(crate) fn put_byte(&mut self, bus: &mut dyn CartridgeBus, addr: u16, byte: u8) {
        use MapperKind::*;

        let v = i32::from(byte);
        let b = match self.state.kind {
            Xegs32 => v & 0x03,
            Xegs64 => v & 0x07,
            Xegs128 => v & 0x0F,
            Xegs256 => v & 0x1F,
            Xegs512 => v & 0x3F,
            Xegs1024 => v & 0x7F,
            Atrax128 => {
                if v & 0x80 != 0 {
                    -1
                } else {
                    v & 0x0F
                }
            }
            Mega16 => v & 0x80,
            Mega32 => v & 0x81,
            Mega64 => v & 0x83,
            Mega128 => v & 0x87,
            Mega256 => v & 0x8F,
            Mega512 => v & 0x9F,
            Mega1024 => v & 0xBF,
            SwXegs32 => v & 0x83,
            SwXegs64 => v & 0x87,
            SwXegs128 => v & 0x8F,
            SwXegs256 => v & 0x9F,
            SwXegs512 => v & 0xBF,
            SwXegs1024 => v,
            _ => {
                self.access(bus, addr);
                return;
            }
        };
        self.switch_bank(bus, b);
    }

    /// Move to bank `b` using the current kind's switch routine. Switching
    /// to the committed bank does nothing.
    pub fn switch_bank(&mut self, bus: &mut dyn CartridgeBus, b: i32) {
        use MapperKind::*;

        if b == self.state.bank {
            return;
        }
        let kind = self.state.kind;
        match kind {
            Db32 => self.set_bank_809f(bus, b, 0x6000),
            Xegs32 | Xegs64 | Xegs128 | Xegs256 | Xegs512 | Xegs1024 | SwXegs32 | SwXegs64
            | SwXegs128 | SwXegs256 | SwXegs512 | SwXegs1024 => {
                self.set_bank_809f(bus, b, kind.xegs_main_bank())
            }
            Oss16 => self.set_bank_a0af(bus, b, 0x3000),
            Oss2_16 => self.set_bank_a0af(bus, b, 0x0000),
            Will64 => self.set_bank_a0bf(bus, b, b & 0x07),
            Will32 => self.set_bank_a0bf(bus, b, b & 0x03),
            Exp64 | Diamond64 | Sdx64 => self.set_bank_a0bf(bus, b, !b & 0x07),
            Atrax128 => {
                if b < 0 {
                    if self.state.bank >= 0 {
                        disable(bus, WINDOW_A000);
                        self.commit(-1);
                    }
                } else {
                    enable(bus, WINDOW_A000);
                    self.copy_rom(bus, 0xA000, 0xBFFF, bank_offset(b, 0x2000));
                    self.commit(b);
                }
            }
            Mega16 | Mega32 | Mega64 | Mega128 | Mega256 | Mega512 | Mega1024 => {
                if b & 0x80 != 0 {
                    disable(bus, WINDOW_8000);
                    disable(bus, WINDOW_A000);
                } else {
                    enable(bus, WINDOW_8000);
                    enable(bus, WINDOW_A000);
                    self.copy_rom(bus, 0x8000, 0xBFFF, bank_offset(b, 0x4000));
                }
                self.commit(b);
            }
            Atmax128 => {
                if b >= 0x20 {
                    return;
                }
                if b >= 0x10 {
                    disable(bus, WINDOW_A000);
                } else {
                    enable(bus, WINDOW_A000);
                    self.copy_rom(bus, 0xA000, 0xBFFF, bank_offset(b, 0x2000));
                }
                self.commit(b);
            }
            Atmax1024 => {
                if b >= 0x80 {
                    disable(bus, WINDOW_A000);
                } else {
                    enable(bus, WINDOW_A000);
                    self.copy_rom(bus, 0xA000, 0xBFFF, bank_offset(b, 0x2000));
                }
                self.commit(b);
            }
            Phoenix8 if b < 0 => {
                disable(bus, WINDOW_A000);
                self.commit(-1);
            }
            Blizzard16 if b < 0 => {
                disable(bus, WINDOW_8000);
                disable(bus, WINDOW_A000);
                self.commit(-1);
            }
            _ => {}
        }
    }

    /// 8 KiB switchable bank at 0x8000 with a fixed bank at 0xA000.
    fn set_bank_809f(&mut self, bus: &mut dyn CartridgeBus, b: i32, main: usize) {
        if b & 0x80 != 0 {
            disable(bus, WINDOW_8000);
            disable(bus, WINDOW_A000);
        } else {
            enable(bus, WINDOW_8000);
            enable(bus, WINDOW_A000);
            self.copy_rom(bus, 0x8000, 0x9FFF, bank_offset(b, 0x2000));
            if self.state.bank & 0x80 != 0 {
                self.copy_rom(bus, 0xA000, 0xBFFF, main);
            }
        }
        self.commit(b);
    }

    /// 4 KiB switchable bank at 0xA000 with a fixed bank at 0xB000.
    fn set_bank_a0af(&mut self, bus: &mut dyn CartridgeBus, b: i32, main: usize) {
        if b < 0 {
            disable(bus, WINDOW_A000);
        } else {
            enable(bus, WINDOW_A000);
            self.copy_rom(bus, 0xA000, 0xAFFF, bank_offset(b, 0x1000));
            if self.state.bank < 0 {
                self.copy_rom(bus, 0xB000, 0xBFFF, main);
            }
        }
        self.commit(b);
    }

    /// 8 KiB bank at 0xA000 selected by an address; bit 3 switches it off.
    fn set_bank_a0bf(&mut self, bus: &mut dyn CartridgeBus, b: i32, index: i32) {
        if b & 0x08 != 0 {
            disable(bus, WINDOW_A000);
        } else {
            enable(bus, WINDOW_A000);
            self.copy_rom(bus, 0xA000, 0xBFFF, bank_offset(index, 0x2000));
        }
        self.commit(b);
    }

    /// Fetch or read inside a Bounty Bob hook window. Returns the value the
    /// CPU sees, or `None` if `addr` is not hooked by the inserted board.
    pub fn bounty_bob_read(&mut self, bus: &mut dyn CartridgeBus, addr: u16) -> Option<u8> {
        self.bounty_bob_switch(bus, addr).then_some(0)
    }

    /// Write inside a Bounty Bob hook window. The value is discarded.
    pub fn bounty_bob_write(&mut self, bus: &mut dyn CartridgeBus, addr: u16) -> bool {
        self.bounty_bob_switch(bus, addr)
    }

    fn bounty_bob_switch(&mut self, bus: &mut dyn CartridgeBus, addr: u16) -> bool {
        if !matches!(self.state.kind, MapperKind::A5200_40 | MapperKind::Bbsb40) {
            return false;
        }
        let machine = self.config.machine;
        let (hook1, hook2) = machine.bounty_bob_hooks();
        let base = machine.bounty_bob_base();

        if (hook1..=hook1 + 3).contains(&addr) {
            let n = usize::from(addr - hook1);
            self.copy_rom(bus, base, base + 0x0FFF, n * 0x1000);
            true
        } else if (hook2..=hook2 + 3).contains(&addr) {
            let n = usize::from(addr - hook2);
            self.copy_rom(bus, base + 0x1000, base + 0x1FFF, 0x4000 + n * 0x1000);
            true
        } else {
            false
        }
    }
}

#[inline]
fn enable(bus: &mut dyn CartridgeBus, (start, end): (u16, u16)) {
    bus.enable_window(start, end);
}

#[inline]
fn disable(bus: &mut dyn CartridgeBus, (start, end): (u16, u16)) {
    bus.disable_window(start, end);
}
