//! Known cartridge dumps, keyed by CRC-32 of the raw image.
//!
//! Raw dumps carry no mapper information, and some sizes fit more than one
//! board. The catalog settles those cases and supplies per-title quirks.

use std::borrow::Cow;

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::cartridge::MapperKind;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Default joystick range shared by titles without a catalog override.
pub const DEFAULT_JOY_RANGE: f32 = 1.0;

/// Resolved identity of a cartridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartDescriptor {
    pub kind: MapperKind,
    pub size_kb: u32,
    /// Keypad presses must be debounced for this title.
    pub keys_debounced: bool,
    pub joy_digital_range: f32,
    pub joy_analog_range: f32,
    pub name: &'static str,
}

impl CartDescriptor {
    /// Descriptor of an empty slot.
    pub const NONE: CartDescriptor = CartDescriptor::generic(MapperKind::None);

    /// Descriptor with default quirks for a cartridge known only by kind.
    pub const fn generic(kind: MapperKind) -> Self {
        Self {
            kind,
            size_kb: kind.nominal_kb(),
            keys_debounced: false,
            joy_digital_range: DEFAULT_JOY_RANGE,
            joy_analog_range: DEFAULT_JOY_RANGE,
            name: kind.description(),
        }
    }

    const fn titled(kind: MapperKind, name: &'static str) -> Self {
        Self {
            name,
            ..Self::generic(kind)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogEntry {
    pub fingerprint: u32,
    pub descriptor: CartDescriptor,
}

impl CatalogEntry {
    pub const fn new(fingerprint: u32, descriptor: CartDescriptor) -> Self {
        Self {
            fingerprint,
            descriptor,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Cow<'static, [CatalogEntry]>,
}

static BUILTIN: Catalog = Catalog {
    entries: Cow::Borrowed(&BUILTIN_ENTRIES),
};

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries: Cow::Owned(entries),
        }
    }

    /// Table of known 5200 releases.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    pub fn fingerprint(data: &[u8]) -> u32 {
        CRC32.checksum(data)
    }

    pub fn lookup(&self, fingerprint: u32) -> Option<&CartDescriptor> {
        self.entries
            .iter()
            .find(|e| e.fingerprint == fingerprint)
            .map(|e| &e.descriptor)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const fn one_chip(fingerprint: u32, name: &'static str) -> CatalogEntry {
    CatalogEntry::new(
        fingerprint,
        CartDescriptor::titled(MapperKind::A5200Ns16, name),
    )
}

const fn two_chip(fingerprint: u32, name: &'static str) -> CatalogEntry {
    CatalogEntry::new(
        fingerprint,
        CartDescriptor::titled(MapperKind::A5200Ee16, name),
    )
}

// 16 KiB dumps are the only ambiguous raw size, so every entry here is one.
const BUILTIN_ENTRIES: [CatalogEntry; 40] = [
    one_chip(0x3548_4751, "A.E."),
    one_chip(0x9bae_58dc, "Beamrider"),
    one_chip(0xbe3c_d348, "Berzerk"),
    one_chip(0xc8f9_c094, "Blaster"),
    one_chip(0x0624_e6e7, "BluePrint"),
    one_chip(0x9ad5_3bbc, "Choplifter"),
    one_chip(0xf43e_7cd0, "Decathlon"),
    one_chip(0xd3bd_3221, "Final Legacy"),
    one_chip(0x18a7_3af3, "H.E.R.O."),
    one_chip(0x8351_7703, "Last Starfighter"),
    one_chip(0xab8e_035b, "Meteorites"),
    one_chip(0x969c_fe1a, "Millipede"),
    one_chip(0x7df1_adfb, "Miner 2049er"),
    one_chip(0xb8b6_a2fd, "Missile Command+"),
    one_chip(0xd0b2_f285, "Moon Patrol"),
    one_chip(0xe8b1_30c4, "PAM Diagnostics 2.0"),
    one_chip(0x4b91_0461, "Pitfall II"),
    one_chip(0x47dc_1314, "Preppie"),
    one_chip(0xf1e2_1530, "Preppie"),
    one_chip(0xb5f3_402b, "Quest for Quintana Roo"),
    one_chip(0x4252_abd9, "Robotron 2084"),
    one_chip(0x3873_65dc, "Space Shuttle"),
    one_chip(0x82e2_981f, "Super Pac-Man"),
    one_chip(0xfd8f_0cd4, "Super Pac-Man"),
    one_chip(0x0a4d_db1e, "Super Pac-Man"),
    one_chip(0x0e80_dbb2, "Time Runner"),
    one_chip(0x0ba2_2ece, "Track and Field"),
    one_chip(0xd6f7_ddfd, "Wizard of Wor"),
    one_chip(0x2959_d827, "Zone Ranger"),
    one_chip(0xb8fa_aec3, "Xari Arena"),
    one_chip(0x38f4_a6a4, "Xmas"),
    two_chip(0x8d2a_aab5, "Asteroids"),
    two_chip(0x4019_ecec, "Astro Chase"),
    two_chip(0xb3b8_e314, "Battlezone"),
    two_chip(0x0480_7705, "Buck Rogers"),
    two_chip(0x7a9d_9f85, "Boogie"),
    two_chip(0x536a_70fe, "Centipede"),
    two_chip(0x82b9_1800, "Congo Bongo"),
    two_chip(0xfd54_1c80, "Countermeasure"),
    two_chip(0x1187_342f, "Tempest"),
];
