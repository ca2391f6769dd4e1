use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// Machine variant the cartridge slot is plugged into.
///
/// Activation recipes, the Bounty Bob hook addresses and which mapper kinds
/// are accepted all depend on it.
pub enum MachineType {
    #[default]
    Atari5200,
    /// 400/800 with OS revision A.
    Atari800OsA,
    /// 400/800 with OS revision B.
    Atari800OsB,
    /// XL/XE line (no right cartridge slot).
    XlXe,
}

impl MachineType {
    #[inline]
    pub const fn is_5200(self) -> bool {
        matches!(self, MachineType::Atari5200)
    }

    #[inline]
    /// Returns whether this machine has a right cartridge slot and maps
    /// BASIC from a separate ROM image.
    pub const fn is_800(self) -> bool {
        matches!(self, MachineType::Atari800OsA | MachineType::Atari800OsB)
    }

    #[inline]
    /// First address of the Bounty Bob "surprise bank switch" hooks.
    ///
    /// Returns the start of the low and the high 4-byte hook windows.
    pub const fn bounty_bob_hooks(self) -> (u16, u16) {
        if self.is_5200() {
            (0x4FF6, 0x5FF6)
        } else {
            (0x8FF6, 0x9FF6)
        }
    }

    #[inline]
    /// Base of the 4 KiB window the first Bounty Bob hook switches.
    pub const fn bounty_bob_base(self) -> u16 {
        if self.is_5200() { 0x4000 } else { 0x8000 }
    }
}

/// Static configuration of the emulated machine as far as the cartridge
/// slot and memory map are concerned.
#[derive(Clone, Debug)]
pub struct MachineConfig {
    pub machine: MachineType,
    /// Plug in the R-Time 8 clock alongside the cartridge.
    pub rtime8: bool,
    /// 8 KiB Atari BASIC image for the 400/800 machines.
    pub basic_rom: Option<Arc<[u8]>>,
    pub basic_enabled: bool,
    pub ram_kb: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            machine: MachineType::Atari5200,
            rtime8: true,
            basic_rom: None,
            basic_enabled: true,
            ram_kb: 16,
        }
    }
}

impl MachineConfig {
    pub fn for_machine(machine: MachineType) -> Self {
        Self {
            machine,
            ..Self::default()
        }
    }

    /// BASIC image to map at 0xA000 when nothing else claims the window.
    pub fn basic(&self) -> Option<&[u8]> {
        if self.machine.is_800() && self.basic_enabled {
            self.basic_rom.as_deref()
        } else {
            None
        }
    }
}
