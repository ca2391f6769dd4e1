use std::sync::Arc;

use log::{info, warn};

use crate::{
    cartridge::{CartError, Cartridge, MapperKind},
    catalog::{CartDescriptor, Catalog},
    hardware::{MachineConfig, MachineType},
    memory::CartridgeBus,
    rtime8::{Phase, RTIME8_PORT_HI, RTIME8_PORT_LO, Rtime8, Rtime8State, WallClock},
    statesav::{StateReader, StateWriter},
};

/// First and last address of the shared cartridge I/O page.
pub const CART_IO_START: u16 = 0xD500;
pub const CART_IO_END: u16 = 0xD5FF;

/// Open bus value for cartridge I/O reads nothing answers.
pub const IO_NO_DATA: u8 = 0xFF;

/// Mapper kind and committed bank register.
///
/// A negative bank means "windows disabled" for the mappers that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankState {
    pub kind: MapperKind,
    pub bank: i32,
}

/// Cartridge section read from a save state, applied once the whole stream
/// has been read successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    pub kind_code: i32,
    pub bank: i32,
    pub rtime8: Rtime8State,
}

/// The cartridge slot of one machine.
pub struct CartridgeSlot {
    pub(crate) config: MachineConfig,
    pub(crate) cart: Option<Cartridge>,
    pub(crate) state: BankState,
    pub(crate) rtime8: Rtime8,
}

impl CartridgeSlot {
    pub fn new(config: MachineConfig) -> Self {
        let rtime8 = Rtime8::new(config.rtime8);
        Self {
            config,
            cart: None,
            state: BankState::default(),
            rtime8,
        }
    }

    pub fn with_clock(config: MachineConfig, clock: Box<dyn WallClock>) -> Self {
        let rtime8 = Rtime8::with_clock(config.rtime8, clock);
        Self {
            config,
            cart: None,
            state: BankState::default(),
            rtime8,
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    #[inline]
    pub fn machine(&self) -> MachineType {
        self.config.machine
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cart.as_ref()
    }

    pub fn descriptor(&self) -> &CartDescriptor {
        self.cart
            .as_ref()
            .map_or(&CartDescriptor::NONE, Cartridge::descriptor)
    }

    #[inline]
    pub fn kind(&self) -> MapperKind {
        self.state.kind
    }

    #[inline]
    pub fn bank(&self) -> i32 {
        self.state.bank
    }

    pub fn rtime8(&self) -> &Rtime8 {
        &self.rtime8
    }

    /// Power-on: reset the clock chip protocol and activate whatever is
    /// plugged in.
    pub fn initialise(&mut self, bus: &mut dyn CartridgeBus) {
        self.rtime8.initialise();
        self.start(bus);
    }

    /// Insert `image`, identifying it against the built-in catalog.
    pub fn insert(
        &mut self,
        bus: &mut dyn CartridgeBus,
        image: impl Into<Arc<[u8]>>,
    ) -> Result<(), CartError> {
        self.insert_with_catalog(bus, image, Catalog::builtin())
    }

    /// Insert `image`. The previous cartridge is always removed first, so a
    /// failed insertion leaves the slot empty.
    ///
    /// A bad checksum is reported after the cartridge has been activated.
    pub fn insert_with_catalog(
        &mut self,
        bus: &mut dyn CartridgeBus,
        image: impl Into<Arc<[u8]>>,
        catalog: &Catalog,
    ) -> Result<(), CartError> {
        self.remove(bus);

        let detection = Cartridge::detect(image.into(), self.config.machine, catalog)?;
        let cart = detection.cartridge;
        info!(
            "Inserted cartridge: {} ({}, {} KB)",
            cart.descriptor().name,
            cart.kind().description(),
            cart.descriptor().size_kb
        );
        self.state = BankState {
            kind: cart.kind(),
            bank: 0,
        };
        self.cart = Some(cart);
        self.start(bus);

        match detection.checksum_mismatch {
            Some((expected, actual)) => {
                warn!(
                    "Cartridge checksum mismatch: header {expected:#010X}, computed {actual:#010X}"
                );
                Err(CartError::BadChecksum { expected, actual })
            }
            None => Ok(()),
        }
    }

    /// Unplug the cartridge and leave cartridge space in the crash state.
    pub fn remove(&mut self, bus: &mut dyn CartridgeBus) {
        if let Some(cart) = self.cart.take() {
            info!("Removed cartridge: {}", cart.descriptor().name);
        }
        self.state = BankState::default();
        self.start(bus);
    }

    /// Read in the cartridge I/O page.
    pub fn read_io(&mut self, bus: &mut dyn CartridgeBus, addr: u16) -> u8 {
        if self.rtime8.enabled() && matches!(addr, RTIME8_PORT_LO | RTIME8_PORT_HI) {
            return self.rtime8.get_byte();
        }
        self.access(bus, addr);
        IO_NO_DATA
    }

    /// Write in the cartridge I/O page.
    pub fn write_io(&mut self, bus: &mut dyn CartridgeBus, addr: u16, byte: u8) {
        if self.rtime8.enabled() && matches!(addr, RTIME8_PORT_LO | RTIME8_PORT_HI) {
            self.rtime8.put_byte(byte);
            return;
        }
        self.put_byte(bus, addr, byte);
    }

    /// Write the cartridge save-state section.
    pub fn save_section(&self, w: &mut StateWriter<'_>) {
        let rt = self.rtime8.state();
        w.save_int(&[self.state.kind.code() as i32, self.state.bank]);
        w.save_ubyte(&[rt.phase.to_byte(), rt.register, rt.pending_high]);
        w.save_ubyte(&rt.regs);
    }

    /// Read the cartridge save-state section without applying it.
    pub fn read_section(&self, r: &mut StateReader<'_>) -> CartSnapshot {
        let mut ints = [0i32; 2];
        r.read_int(&mut ints);
        let mut flags = [0u8; 3];
        r.read_ubyte(&mut flags);
        let mut regs = [0u8; 16];
        r.read_ubyte(&mut regs);

        CartSnapshot {
            kind_code: ints[0],
            bank: ints[1],
            rtime8: Rtime8State {
                phase: Phase::from_byte(flags[0]),
                register: flags[1] & 0x0F,
                pending_high: flags[2],
                regs,
            },
        }
    }

    /// Commit a snapshot read by [`Self::read_section`].
    ///
    /// The saved mapper kind is not used: the host is expected to have
    /// re-inserted the same image. The cartridge is re-activated and the
    /// saved bank replayed through its switch routine. Whether the clock
    /// chip is plugged in stays as configured.
    pub fn apply_snapshot(&mut self, bus: &mut dyn CartridgeBus, snapshot: &CartSnapshot) {
        if self.state.kind.code() as i32 != snapshot.kind_code {
            warn!(
                "Save state was taken with cartridge type {}, current type is {}",
                snapshot.kind_code,
                self.state.kind.code()
            );
        }
        self.rtime8.restore(snapshot.rtime8);
        self.start(bus);
        self.switch_bank(bus, snapshot.bank);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryMap;

    #[test]
    fn failed_insert_leaves_slot_empty() {
        let mut mem = MemoryMap::new(16);
        let mut slot = CartridgeSlot::new(MachineConfig::default());
        slot.insert(&mut mem, vec![0x11u8; 32 * 1024]).unwrap();
        assert_eq!(slot.kind(), MapperKind::A5200_32);

        let err = slot.insert(&mut mem, vec![0u8; 12 * 1024]).unwrap_err();
        assert_eq!(err, CartError::BadFormat);
        assert_eq!(slot.kind(), MapperKind::None);
        assert!(slot.cartridge().is_none());
        assert!(mem.slice(0x4000, 0xBFFF).iter().all(|&b| b == 0x00));
    }

    #[test]
    fn io_reads_return_no_data() {
        let mut mem = MemoryMap::new(16);
        let mut slot = CartridgeSlot::new(MachineConfig::default());
        assert_eq!(slot.read_io(&mut mem, 0xD500), IO_NO_DATA);
        assert_eq!(slot.read_io(&mut mem, 0xD5FF), IO_NO_DATA);
    }

    #[test]
    fn disabled_rtime8_falls_through() {
        let mut mem = MemoryMap::new(16);
        let config = MachineConfig {
            rtime8: false,
            ..MachineConfig::default()
        };
        let mut slot = CartridgeSlot::new(config);
        slot.write_io(&mut mem, RTIME8_PORT_LO, 9);
        assert_eq!(slot.rtime8().phase(), Phase::AwaitingRegister);
        assert_eq!(slot.read_io(&mut mem, RTIME8_PORT_LO), IO_NO_DATA);
    }
}
