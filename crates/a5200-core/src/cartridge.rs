use std::{borrow::Cow, sync::Arc};

use thiserror::Error;

use crate::{
    catalog::{CartDescriptor, Catalog},
    hardware::MachineType,
};

/// Size of the `CART` container header preceding the ROM data.
pub const CART_HEADER_SIZE: usize = 16;

/// Magic tag at the start of a `CART` container.
pub const CART_MAGIC: &[u8; 4] = b"CART";

/// Cartridge hardware variants, numbered as in the `CART` container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapperKind {
    /// Empty slot.
    #[default]
    None,
    Std8,
    Std16,
    Oss16,
    A5200_32,
    Db32,
    /// Two-chip 16 KiB 5200 board (mirrored low chip).
    A5200Ee16,
    /// Bounty Bob Strikes Back, 5200 edition.
    A5200_40,
    Will64,
    Exp64,
    Diamond64,
    Sdx64,
    Xegs32,
    Xegs64,
    Xegs128,
    Oss2_16,
    /// One-chip 16 KiB 5200 board.
    A5200Ns16,
    Atrax128,
    /// Bounty Bob Strikes Back, computer edition.
    Bbsb40,
    A5200_8,
    A5200_4,
    Right8,
    Will32,
    Xegs256,
    Xegs512,
    Xegs1024,
    Mega16,
    Mega32,
    Mega64,
    Mega128,
    Mega256,
    Mega512,
    Mega1024,
    SwXegs32,
    SwXegs64,
    SwXegs128,
    SwXegs256,
    SwXegs512,
    SwXegs1024,
    Phoenix8,
    Blizzard16,
    Atmax128,
    Atmax1024,
}

impl MapperKind {
    /// Every mapper kind with a `CART` code, in code order.
    pub const ALL: [MapperKind; 42] = [
        MapperKind::Std8,
        MapperKind::Std16,
        MapperKind::Oss16,
        MapperKind::A5200_32,
        MapperKind::Db32,
        MapperKind::A5200Ee16,
        MapperKind::A5200_40,
        MapperKind::Will64,
        MapperKind::Exp64,
        MapperKind::Diamond64,
        MapperKind::Sdx64,
        MapperKind::Xegs32,
        MapperKind::Xegs64,
        MapperKind::Xegs128,
        MapperKind::Oss2_16,
        MapperKind::A5200Ns16,
        MapperKind::Atrax128,
        MapperKind::Bbsb40,
        MapperKind::A5200_8,
        MapperKind::A5200_4,
        MapperKind::Right8,
        MapperKind::Will32,
        MapperKind::Xegs256,
        MapperKind::Xegs512,
        MapperKind::Xegs1024,
        MapperKind::Mega16,
        MapperKind::Mega32,
        MapperKind::Mega64,
        MapperKind::Mega128,
        MapperKind::Mega256,
        MapperKind::Mega512,
        MapperKind::Mega1024,
        MapperKind::SwXegs32,
        MapperKind::SwXegs64,
        MapperKind::SwXegs128,
        MapperKind::SwXegs256,
        MapperKind::SwXegs512,
        MapperKind::SwXegs1024,
        MapperKind::Phoenix8,
        MapperKind::Blizzard16,
        MapperKind::Atmax128,
        MapperKind::Atmax1024,
    ];

    /// Decode a `CART` header type code. Code 0 and anything past the last
    /// known kind are rejected.
    pub fn from_code(code: u32) -> Option<Self> {
        let idx = usize::try_from(code).ok()?.checked_sub(1)?;
        Self::ALL.get(idx).copied()
    }

    pub fn code(self) -> u32 {
        match self {
            MapperKind::None => 0,
            kind => Self::ALL
                .iter()
                .position(|&k| k == kind)
                .map_or(0, |idx| idx as u32 + 1),
        }
    }

    /// Nominal ROM size in kilobytes.
    pub const fn nominal_kb(self) -> u32 {
        use MapperKind::*;
        match self {
            None => 0,
            A5200_4 => 4,
            Std8 | A5200_8 | Right8 | Phoenix8 => 8,
            Std16 | Oss16 | A5200Ee16 | Oss2_16 | A5200Ns16 | Mega16 | Blizzard16 => 16,
            A5200_32 | Db32 | Xegs32 | Will32 | Mega32 | SwXegs32 => 32,
            A5200_40 | Bbsb40 => 40,
            Will64 | Exp64 | Diamond64 | Sdx64 | Xegs64 | Mega64 | SwXegs64 => 64,
            Xegs128 | Atrax128 | Mega128 | SwXegs128 | Atmax128 => 128,
            Xegs256 | Mega256 | SwXegs256 => 256,
            Xegs512 | Mega512 | SwXegs512 => 512,
            Xegs1024 | Mega1024 | SwXegs1024 | Atmax1024 => 1024,
        }
    }

    #[inline]
    pub const fn nominal_size(self) -> usize {
        self.nominal_kb() as usize * 1024
    }

    #[inline]
    /// Returns whether this kind only exists for the 5200 console.
    pub const fn is_for_5200(self) -> bool {
        use MapperKind::*;
        matches!(
            self,
            A5200_32 | A5200Ee16 | A5200_40 | A5200Ns16 | A5200_8 | A5200_4
        )
    }

    /// Returns whether a cartridge of this kind can be plugged into `machine`.
    pub const fn fits(self, machine: MachineType) -> bool {
        match self {
            MapperKind::None => true,
            kind => kind.is_for_5200() == machine.is_5200(),
        }
    }

    /// Kinds a raw (headerless) image may be identified as by size alone.
    pub const fn raw_detectable(self) -> bool {
        self.is_for_5200()
    }

    /// Human readable board name.
    pub const fn description(self) -> &'static str {
        use MapperKind::*;
        match self {
            None => "No cartridge",
            Std8 => "Standard 8 KB",
            Std16 => "Standard 16 KB",
            Oss16 => "OSS two-chip 16 KB",
            A5200_32 => "5200 32 KB",
            Db32 => "DB 32 KB",
            A5200Ee16 => "5200 two-chip 16 KB",
            A5200_40 => "5200 Bounty Bob 40 KB",
            Will64 => "Williams 64 KB",
            Exp64 => "Express 64 KB",
            Diamond64 => "Diamond 64 KB",
            Sdx64 => "SpartaDOS X 64 KB",
            Xegs32 => "XEGS 32 KB",
            Xegs64 => "XEGS 64 KB",
            Xegs128 => "XEGS 128 KB",
            Oss2_16 => "OSS one-chip 16 KB",
            A5200Ns16 => "5200 one-chip 16 KB",
            Atrax128 => "Atrax 128 KB",
            Bbsb40 => "Bounty Bob 40 KB",
            A5200_8 => "5200 8 KB",
            A5200_4 => "5200 4 KB",
            Right8 => "Right slot 8 KB",
            Will32 => "Williams 32 KB",
            Xegs256 => "XEGS 256 KB",
            Xegs512 => "XEGS 512 KB",
            Xegs1024 => "XEGS 1 MB",
            Mega16 => "MegaCart 16 KB",
            Mega32 => "MegaCart 32 KB",
            Mega64 => "MegaCart 64 KB",
            Mega128 => "MegaCart 128 KB",
            Mega256 => "MegaCart 256 KB",
            Mega512 => "MegaCart 512 KB",
            Mega1024 => "MegaCart 1 MB",
            SwXegs32 => "Switchable XEGS 32 KB",
            SwXegs64 => "Switchable XEGS 64 KB",
            SwXegs128 => "Switchable XEGS 128 KB",
            SwXegs256 => "Switchable XEGS 256 KB",
            SwXegs512 => "Switchable XEGS 512 KB",
            SwXegs1024 => "Switchable XEGS 1 MB",
            Phoenix8 => "Phoenix 8 KB",
            Blizzard16 => "Blizzard 16 KB",
            Atmax128 => "AtariMax 128 KB",
            Atmax1024 => "AtariMax 1 MB",
        }
    }

    /// Resolve a raw image size shared by more than one raw-detectable kind.
    ///
    /// Only 16 KiB is ambiguous. Unrecognised 16 KiB images use the two-chip
    /// layout; one-chip dumps are identified through the catalog instead.
    fn resolve_raw_size(kb: u32, candidates: &[MapperKind]) -> Option<MapperKind> {
        match (kb, candidates) {
            (_, []) => None,
            (_, [only]) => Some(*only),
            (16, _) => Some(MapperKind::A5200Ee16),
            (_, [first, ..]) => Some(*first),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CartError {
    #[error("cannot open cartridge image")]
    CannotOpen,
    #[error("unknown cartridge format")]
    BadFormat,
    #[error("cartridge checksum mismatch (header {expected:#010X}, computed {actual:#010X})")]
    BadChecksum { expected: u32, actual: u32 },
}

impl CartError {
    /// A bad checksum still leaves the cartridge inserted and running.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CartError::BadChecksum { .. })
    }
}

/// An inserted cartridge image together with its resolved descriptor.
///
/// The image buffer is shared with the host; it is never mutated.
#[derive(Debug, Clone)]
pub struct Cartridge {
    image: Arc<[u8]>,
    rom_offset: usize,
    descriptor: CartDescriptor,
}

/// Result of a successful identification.
#[derive(Debug, Clone)]
pub struct Detection {
    pub cartridge: Cartridge,
    /// `(header, computed)` when a `CART` container failed its checksum.
    pub checksum_mismatch: Option<(u32, u32)>,
}

impl Cartridge {
    pub fn descriptor(&self) -> &CartDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> MapperKind {
        self.descriptor.kind
    }

    /// ROM data following any container header.
    pub fn rom(&self) -> &[u8] {
        &self.image[self.rom_offset..]
    }

    /// `len` ROM bytes starting at `offset`. Bytes past the end of a short
    /// dump read back as open bus (0xFF).
    pub fn bank_bytes(&self, offset: usize, len: usize) -> Cow<'_, [u8]> {
        bytes_padded(self.rom(), offset, len)
    }

    /// Identify a cartridge image for `machine`.
    pub fn detect(
        image: Arc<[u8]>,
        machine: MachineType,
        catalog: &Catalog,
    ) -> Result<Detection, CartError> {
        if image.len() < CART_HEADER_SIZE {
            return Err(CartError::CannotOpen);
        }

        // Whole kilobytes means a raw dump; anything else must carry a header.
        if image.len() % 1024 == 0 {
            Self::detect_raw(image, machine, catalog)
        } else {
            Self::detect_container(image, machine, catalog)
        }
    }

    fn detect_raw(
        image: Arc<[u8]>,
        machine: MachineType,
        catalog: &Catalog,
    ) -> Result<Detection, CartError> {
        let fingerprint = Catalog::fingerprint(&image);
        let descriptor = match catalog.lookup(fingerprint) {
            Some(descriptor) => *descriptor,
            None => {
                let kb = (image.len() / 1024) as u32;
                let candidates: Vec<MapperKind> = MapperKind::ALL
                    .iter()
                    .copied()
                    .filter(|k| k.raw_detectable() && k.nominal_kb() == kb)
                    .collect();
                let kind = MapperKind::resolve_raw_size(kb, &candidates)
                    .ok_or(CartError::BadFormat)?;
                CartDescriptor::generic(kind)
            }
        };

        if !descriptor.kind.fits(machine) {
            return Err(CartError::BadFormat);
        }

        Ok(Detection {
            cartridge: Cartridge {
                image,
                rom_offset: 0,
                descriptor,
            },
            checksum_mismatch: None,
        })
    }

    fn detect_container(
        image: Arc<[u8]>,
        machine: MachineType,
        catalog: &Catalog,
    ) -> Result<Detection, CartError> {
        let header = &image[..CART_HEADER_SIZE];
        if &header[..4] != CART_MAGIC {
            return Err(CartError::BadFormat);
        }

        let code = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let expected = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
        let kind = MapperKind::from_code(code).ok_or(CartError::BadFormat)?;
        if !kind.fits(machine) {
            return Err(CartError::BadFormat);
        }

        let rom = &image[CART_HEADER_SIZE..];
        let checked = kind.nominal_size().min(rom.len());
        let actual = checksum(&rom[..checked]);

        // The header decides the mapper; a catalog hit only contributes the
        // title and per-title quirks.
        let descriptor = match catalog.lookup(Catalog::fingerprint(rom)) {
            Some(known) => CartDescriptor { kind, ..*known },
            None => CartDescriptor::generic(kind),
        };

        Ok(Detection {
            checksum_mismatch: (expected != actual).then_some((expected, actual)),
            cartridge: Cartridge {
                image,
                rom_offset: CART_HEADER_SIZE,
                descriptor,
            },
        })
    }
}

/// Additive byte checksum used by the `CART` container.
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

pub(crate) fn bytes_padded(data: &[u8], offset: usize, len: usize) -> Cow<'_, [u8]> {
    match data.get(offset..offset.saturating_add(len)) {
        Some(slice) => Cow::Borrowed(slice),
        None => {
            let mut out = vec![0xFF; len];
            if let Some(avail) = data.get(offset..) {
                out[..avail.len()].copy_from_slice(avail);
            }
            Cow::Owned(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(kind: MapperKind, rom: &[u8], checksum_delta: u32) -> Arc<[u8]> {
        let mut data = Vec::with_capacity(CART_HEADER_SIZE + rom.len());
        data.extend_from_slice(CART_MAGIC);
        data.extend_from_slice(&kind.code().to_be_bytes());
        data.extend_from_slice(&checksum(rom).wrapping_add(checksum_delta).to_be_bytes());
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(rom);
        data.into()
    }

    #[test]
    fn codes_round_trip_through_table() {
        for (idx, kind) in MapperKind::ALL.iter().enumerate() {
            assert_eq!(kind.code(), idx as u32 + 1);
            assert_eq!(MapperKind::from_code(kind.code()), Some(*kind));
        }
        assert_eq!(MapperKind::from_code(0), None);
        assert_eq!(MapperKind::from_code(43), None);
        assert_eq!(MapperKind::None.code(), 0);
    }

    #[test]
    fn undersized_image_cannot_open() {
        let image: Arc<[u8]> = vec![0u8; 15].into();
        let err = Cartridge::detect(image, MachineType::Atari5200, Catalog::builtin())
            .unwrap_err();
        assert_eq!(err, CartError::CannotOpen);
        assert!(err.is_fatal());
    }

    #[test]
    fn ambiguous_16k_defaults_to_two_chip() {
        let image: Arc<[u8]> = vec![0x5Au8; 16 * 1024].into();
        let det = Cartridge::detect(image, MachineType::Atari5200, &Catalog::new(Vec::new()))
            .unwrap();
        assert_eq!(det.cartridge.kind(), MapperKind::A5200Ee16);
    }

    #[test]
    fn raw_sizes_outside_table_are_rejected() {
        for kb in [1usize, 2, 12, 24, 48, 64] {
            let image: Arc<[u8]> = vec![0u8; kb * 1024].into();
            let err = Cartridge::detect(image, MachineType::Atari5200, &Catalog::new(Vec::new()))
                .unwrap_err();
            assert_eq!(err, CartError::BadFormat, "{kb} KiB");
        }
    }

    #[test]
    fn container_checksum_covers_nominal_size_only() {
        let mut rom = vec![1u8; 8 * 1024];
        rom.extend_from_slice(&[7u8; 100]);
        let mut data = Vec::new();
        data.extend_from_slice(CART_MAGIC);
        data.extend_from_slice(&MapperKind::Std8.code().to_be_bytes());
        data.extend_from_slice(&(8u32 * 1024).to_be_bytes());
        data.extend_from_slice(&[0; 4]);
        data.extend_from_slice(&rom);

        let det = Cartridge::detect(data.into(), MachineType::XlXe, Catalog::builtin()).unwrap();
        assert_eq!(det.checksum_mismatch, None);
        assert_eq!(det.cartridge.rom().len(), rom.len());
    }

    #[test]
    fn container_for_other_console_is_rejected() {
        let rom = vec![0u8; 4 * 1024 + 1];
        let image = container(MapperKind::A5200_4, &rom, 0);
        assert_eq!(
            Cartridge::detect(image.clone(), MachineType::XlXe, Catalog::builtin()).unwrap_err(),
            CartError::BadFormat
        );
        assert!(Cartridge::detect(image, MachineType::Atari5200, Catalog::builtin()).is_ok());
    }

    #[test]
    fn container_with_unknown_code_is_rejected() {
        let mut data = container(MapperKind::Std8, &[0u8; 8193], 0).to_vec();
        data[4..8].copy_from_slice(&99u32.to_be_bytes());
        assert_eq!(
            Cartridge::detect(data.into(), MachineType::XlXe, Catalog::builtin()).unwrap_err(),
            CartError::BadFormat
        );
    }

    #[test]
    fn short_dump_pads_with_open_bus() {
        let image = container(MapperKind::Std16, &[0x11u8; 0x1001], 0);
        let det = Cartridge::detect(image, MachineType::XlXe, Catalog::builtin()).unwrap();
        let bytes = det.cartridge.bank_bytes(0x1000, 4);
        assert_eq!(&bytes[..], &[0x11, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&det.cartridge.bank_bytes(0x8000, 2)[..], &[0xFF, 0xFF]);
    }
}
