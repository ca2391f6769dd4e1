//! Host memory seam used by the cartridge engine.

/// Operations a cartridge needs from the host memory system.
///
/// Ranges are inclusive on both ends. A window that is "enabled" serves
/// cartridge ROM; a "disabled" window falls back to whatever the machine
/// has there (RAM, or open bus).
pub trait CartridgeBus {
    fn enable_window(&mut self, start: u16, end: u16);
    fn disable_window(&mut self, start: u16, end: u16);
    /// Copy `data` into `start..=end`. `data` is exactly the window length.
    fn copy_into_window(&mut self, start: u16, end: u16, data: &[u8]);
    fn fill_memory(&mut self, start: u16, len: usize, value: u8);
    /// Route CPU accesses in `start..=end` back to the cartridge.
    fn install_fetch_hook(&mut self, start: u16, end: u16);
    fn remove_fetch_hook(&mut self, start: u16, end: u16);
}

/// How the CPU sees a single address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attribute {
    #[default]
    Ram,
    Rom,
    /// Accesses are forwarded to the cartridge instead of memory.
    Hook,
}

const ADDRESS_SPACE: usize = 0x1_0000;

/// Flat 64 KiB address space with per-byte attributes.
pub struct MemoryMap {
    bytes: Box<[u8]>,
    attrib: Box<[Attribute]>,
    ram_size: usize,
}

impl MemoryMap {
    /// Build a map with `ram_kb` kilobytes of RAM from address 0. The rest
    /// of the space reads as open bus ROM.
    pub fn new(ram_kb: u32) -> Self {
        let ram_size = (ram_kb as usize * 1024).min(ADDRESS_SPACE);
        let mut bytes = vec![0xFFu8; ADDRESS_SPACE].into_boxed_slice();
        bytes[..ram_size].fill(0);
        let mut attrib = vec![Attribute::Rom; ADDRESS_SPACE].into_boxed_slice();
        attrib[..ram_size].fill(Attribute::Ram);
        Self {
            bytes,
            attrib,
            ram_size,
        }
    }

    pub fn ram_size(&self) -> usize {
        self.ram_size
    }

    /// Raw byte at `addr`, ignoring attributes.
    #[inline]
    pub fn peek(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    /// Store `value` at `addr` regardless of attributes.
    #[inline]
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.bytes[addr as usize] = value;
    }

    #[inline]
    pub fn attribute(&self, addr: u16) -> Attribute {
        self.attrib[addr as usize]
    }

    pub fn is_hooked(&self, addr: u16) -> bool {
        self.attribute(addr) == Attribute::Hook
    }

    /// CPU store: only RAM accepts writes.
    pub fn store(&mut self, addr: u16, value: u8) -> bool {
        if self.attribute(addr) == Attribute::Ram {
            self.poke(addr, value);
            true
        } else {
            false
        }
    }

    pub fn slice(&self, start: u16, end: u16) -> &[u8] {
        &self.bytes[start as usize..=end as usize]
    }

    fn set_attribute(&mut self, start: u16, end: u16, attr: Attribute) {
        self.attrib[start as usize..=end as usize].fill(attr);
    }
}

impl CartridgeBus for MemoryMap {
    fn enable_window(&mut self, start: u16, end: u16) {
        self.set_attribute(start, end, Attribute::Rom);
    }

    fn disable_window(&mut self, start: u16, end: u16) {
        if (end as usize) < self.ram_size {
            self.set_attribute(start, end, Attribute::Ram);
        } else {
            self.bytes[start as usize..=end as usize].fill(0xFF);
            self.set_attribute(start, end, Attribute::Rom);
        }
    }

    fn copy_into_window(&mut self, start: u16, end: u16, data: &[u8]) {
        let dst = &mut self.bytes[start as usize..=end as usize];
        let n = dst.len().min(data.len());
        dst[..n].copy_from_slice(&data[..n]);
    }

    fn fill_memory(&mut self, start: u16, len: usize, value: u8) {
        let start = start as usize;
        let end = start.saturating_add(len).min(ADDRESS_SPACE);
        self.bytes[start..end].fill(value);
    }

    fn install_fetch_hook(&mut self, start: u16, end: u16) {
        self.set_attribute(start, end, Attribute::Hook);
    }

    fn remove_fetch_hook(&mut self, start: u16, end: u16) {
        self.set_attribute(start, end, Attribute::Rom);
    }
}
