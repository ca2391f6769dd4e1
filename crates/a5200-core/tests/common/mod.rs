#![allow(dead_code)]

use a5200_core::{
    cartridge::{CART_MAGIC, MapperKind, checksum},
    memory::{CartridgeBus, MemoryMap},
    rtime8::{CalendarTime, WallClock},
    statesav::{MachineHooks, StateReader, StateWriter},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusCall {
    Enable(u16, u16),
    Disable(u16, u16),
    Copy(u16, u16, Vec<u8>),
    Fill(u16, usize, u8),
    InstallHook(u16, u16),
    RemoveHook(u16, u16),
}

/// Host bus that records every call and forwards it to a real memory map.
pub struct RecordingBus {
    pub calls: Vec<BusCall>,
    pub memory: MemoryMap,
}

impl RecordingBus {
    pub fn new(ram_kb: u32) -> Self {
        Self {
            calls: Vec::new(),
            memory: MemoryMap::new(ram_kb),
        }
    }

    pub fn take(&mut self) -> Vec<BusCall> {
        std::mem::take(&mut self.calls)
    }

    /// Calls other than the hook resets every activation starts with.
    pub fn take_recipe(&mut self) -> Vec<BusCall> {
        self.take()
            .into_iter()
            .filter(|c| !matches!(c, BusCall::RemoveHook(..)))
            .collect()
    }
}

impl CartridgeBus for RecordingBus {
    fn enable_window(&mut self, start: u16, end: u16) {
        self.calls.push(BusCall::Enable(start, end));
        self.memory.enable_window(start, end);
    }

    fn disable_window(&mut self, start: u16, end: u16) {
        self.calls.push(BusCall::Disable(start, end));
        self.memory.disable_window(start, end);
    }

    fn copy_into_window(&mut self, start: u16, end: u16, data: &[u8]) {
        self.calls.push(BusCall::Copy(start, end, data.to_vec()));
        self.memory.copy_into_window(start, end, data);
    }

    fn fill_memory(&mut self, start: u16, len: usize, value: u8) {
        self.calls.push(BusCall::Fill(start, len, value));
        self.memory.fill_memory(start, len, value);
    }

    fn install_fetch_hook(&mut self, start: u16, end: u16) {
        self.calls.push(BusCall::InstallHook(start, end));
        self.memory.install_fetch_hook(start, end);
    }

    fn remove_fetch_hook(&mut self, start: u16, end: u16) {
        self.calls.push(BusCall::RemoveHook(start, end));
        self.memory.remove_fetch_hook(start, end);
    }
}

pub struct FixedClock(pub CalendarTime);

impl WallClock for FixedClock {
    fn now(&self) -> CalendarTime {
        self.0
    }
}

/// 2024-07-15 09:08:07, a Monday.
pub fn fixed_time() -> CalendarTime {
    CalendarTime {
        second: 7,
        minute: 8,
        hour: 9,
        day: 15,
        month: 7,
        year: 2024,
        weekday: 1,
    }
}

/// ROM whose bytes differ between 4 KiB blocks and within each block.
pub fn rom_image(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i >> 12) as u8).wrapping_mul(0x11) ^ (i as u8))
        .collect()
}

pub fn cart_container(kind: MapperKind, rom: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(16 + rom.len());
    data.extend_from_slice(CART_MAGIC);
    data.extend_from_slice(&kind.code().to_be_bytes());
    data.extend_from_slice(&checksum(rom).to_be_bytes());
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(rom);
    data
}

/// Subsystem stubs that write one marker byte per section and record the
/// order sections are visited in.
#[derive(Default)]
pub struct TracingHooks {
    pub trace: Vec<&'static str>,
    pub read_markers: Vec<u8>,
    pub cpu_verbose: Option<bool>,
}

pub const MAIN_MARKER: u8 = 0xA1;
pub const SIO_MARKER: u8 = 0xA2;
pub const ANTIC_MARKER: u8 = 0xA3;
pub const CPU_MARKER: u8 = 0xA4;
pub const GTIA_MARKER: u8 = 0xA5;
pub const PIA_MARKER: u8 = 0xA6;
pub const POKEY_MARKER: u8 = 0xA7;

impl TracingHooks {
    fn save(&mut self, w: &mut StateWriter<'_>, name: &'static str, marker: u8) {
        self.trace.push(name);
        w.save_ubyte(&[marker]);
    }

    fn read(&mut self, r: &mut StateReader<'_>, name: &'static str) {
        self.trace.push(name);
        let mut marker = [0u8];
        r.read_ubyte(&mut marker);
        self.read_markers.push(marker[0]);
    }
}

impl MachineHooks for TracingHooks {
    fn save_main(&mut self, w: &mut StateWriter<'_>) {
        self.save(w, "main", MAIN_MARKER);
    }
    fn read_main(&mut self, r: &mut StateReader<'_>) {
        self.read(r, "main");
    }
    fn save_sio(&mut self, w: &mut StateWriter<'_>) {
        self.save(w, "sio", SIO_MARKER);
    }
    fn read_sio(&mut self, r: &mut StateReader<'_>) {
        self.read(r, "sio");
    }
    fn save_antic(&mut self, w: &mut StateWriter<'_>) {
        self.save(w, "antic", ANTIC_MARKER);
    }
    fn read_antic(&mut self, r: &mut StateReader<'_>) {
        self.read(r, "antic");
    }
    fn save_cpu(&mut self, w: &mut StateWriter<'_>, verbose: bool) {
        self.cpu_verbose = Some(verbose);
        self.save(w, "cpu", CPU_MARKER);
    }
    fn read_cpu(&mut self, r: &mut StateReader<'_>, verbose: bool) {
        self.cpu_verbose = Some(verbose);
        self.read(r, "cpu");
    }
    fn save_gtia(&mut self, w: &mut StateWriter<'_>) {
        self.save(w, "gtia", GTIA_MARKER);
    }
    fn read_gtia(&mut self, r: &mut StateReader<'_>) {
        self.read(r, "gtia");
    }
    fn save_pia(&mut self, w: &mut StateWriter<'_>) {
        self.save(w, "pia", PIA_MARKER);
    }
    fn read_pia(&mut self, r: &mut StateReader<'_>) {
        self.read(r, "pia");
    }
    fn save_pokey(&mut self, w: &mut StateWriter<'_>) {
        self.save(w, "pokey", POKEY_MARKER);
    }
    fn read_pokey(&mut self, r: &mut StateReader<'_>) {
        self.read(r, "pokey");
    }
}
