//! Versioned binary save-state stream.
//!
//! Layout: the 9-byte signature `ATARI5200`, a version byte, a verbosity
//! byte, then every subsystem section in a fixed order. Multi-byte values
//! are little-endian. Signed integers carry their sign in the top bit of
//! the fourth byte rather than in two's complement, so a magnitude must fit
//! in 31 bits.

use std::io::{self, Cursor, Read, Write};

use log::{error, warn};
use thiserror::Error;

use crate::{memory::CartridgeBus, slot::CartridgeSlot};

pub const SIGNATURE: &[u8; 9] = b"ATARI5200";
pub const SAVE_VERSION: u8 = 4;
/// Oldest version still readable. It has no cartridge or SIO section.
pub const LEGACY_VERSION: u8 = 3;
/// Filenames this long or longer are refused on read.
pub const PATH_MAX_LENGTH: usize = 4096;

/// Signature, version and verbosity bytes.
pub const HEADER_LEN: usize = SIGNATURE.len() + 2;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SaveStateError {
    #[error("not an a5200 save state")]
    Signature,
    #[error("incompatible save state version {0}")]
    Version(u8),
    #[error("save state stream error: {0:?}")]
    Stream(io::ErrorKind),
    #[error("invalid save state buffer")]
    InvalidBuffer,
}

/// Fields preceding the subsystem sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHeader {
    pub version: u8,
    pub verbose: bool,
}

/// Writer half of the stream. After the first failed write every further
/// call is a no-op; check [`StateWriter::error`] once at the end.
pub struct StateWriter<'a> {
    out: &'a mut dyn Write,
    error: Option<io::ErrorKind>,
    written: usize,
}

impl<'a> StateWriter<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            error: None,
            written: 0,
        }
    }

    pub fn error(&self) -> Option<io::ErrorKind> {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    fn put(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }
        match self.out.write_all(bytes) {
            Ok(()) => self.written += bytes.len(),
            Err(e) => self.error = Some(e.kind()),
        }
    }

    pub fn save_ubyte(&mut self, data: &[u8]) {
        self.put(data);
    }

    pub fn save_uword(&mut self, data: &[u16]) {
        for &v in data {
            self.put(&v.to_le_bytes());
        }
    }

    pub fn save_int(&mut self, data: &[i32]) {
        for &v in data {
            self.put(&encode_int(v));
        }
    }

    /// Length-prefixed name with no terminator.
    pub fn save_fname(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let len = u16::try_from(bytes.len()).unwrap_or(u16::MAX);
        self.save_uword(&[len]);
        self.save_ubyte(&bytes[..usize::from(len)]);
    }
}

/// Reader half of the stream, with the same sticky error behaviour as
/// [`StateWriter`]. Values that could not be read are left untouched.
pub struct StateReader<'a> {
    input: &'a mut dyn Read,
    error: Option<io::ErrorKind>,
}

impl<'a> StateReader<'a> {
    pub fn new(input: &'a mut dyn Read) -> Self {
        Self { input, error: None }
    }

    pub fn error(&self) -> Option<io::ErrorKind> {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.error.is_some() {
            return None;
        }
        let mut buf = [0u8; N];
        match self.input.read_exact(&mut buf) {
            Ok(()) => Some(buf),
            Err(e) => {
                self.error = Some(e.kind());
                None
            }
        }
    }

    pub fn read_ubyte(&mut self, data: &mut [u8]) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.input.read_exact(data) {
            self.error = Some(e.kind());
        }
    }

    pub fn read_uword(&mut self, data: &mut [u16]) {
        for slot in data {
            match self.take::<2>() {
                Some(b) => *slot = u16::from_le_bytes(b),
                None => break,
            }
        }
    }

    pub fn read_int(&mut self, data: &mut [i32]) {
        for slot in data {
            match self.take::<4>() {
                Some(b) => *slot = decode_int(b),
                None => break,
            }
        }
    }

    /// Read a length-prefixed name. A length of [`PATH_MAX_LENGTH`] or more
    /// is logged and refused without consuming the name bytes.
    pub fn read_fname(&mut self) -> Option<String> {
        let mut len = [0u16];
        self.read_uword(&mut len);
        if !self.is_ok() {
            return None;
        }
        let len = usize::from(len[0]);
        if len >= PATH_MAX_LENGTH {
            warn!("Save state: filenames of {len} characters are not supported");
            return None;
        }
        let mut name = vec![0u8; len];
        self.read_ubyte(&mut name);
        self.is_ok()
            .then(|| String::from_utf8_lossy(&name).into_owned())
    }
}

/// Sign and magnitude, magnitude bits 0-30 little-endian, sign in bit 31.
pub fn encode_int(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs();
    let sign = if value < 0 { 0x80 } else { 0x00 };
    [
        magnitude as u8,
        (magnitude >> 8) as u8,
        (magnitude >> 16) as u8,
        ((magnitude >> 24) as u8 & 0x7F) | sign,
    ]
}

pub fn decode_int(bytes: [u8; 4]) -> i32 {
    let magnitude = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3] & 0x7F]);
    if bytes[3] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Per-subsystem save and restore routines supplied by the host.
///
/// The default implementations persist nothing. Restores should stage what
/// they read; the stream is only known to be intact once
/// [`restore_state`] returns `Ok`.
pub trait MachineHooks {
    /// Machine type and core flags. Always the first section.
    fn save_main(&mut self, _w: &mut StateWriter<'_>) {}
    fn read_main(&mut self, _r: &mut StateReader<'_>) {}
    fn save_sio(&mut self, _w: &mut StateWriter<'_>) {}
    fn read_sio(&mut self, _r: &mut StateReader<'_>) {}
    fn save_antic(&mut self, _w: &mut StateWriter<'_>) {}
    fn read_antic(&mut self, _r: &mut StateReader<'_>) {}
    fn save_cpu(&mut self, _w: &mut StateWriter<'_>, _verbose: bool) {}
    fn read_cpu(&mut self, _r: &mut StateReader<'_>, _verbose: bool) {}
    fn save_gtia(&mut self, _w: &mut StateWriter<'_>) {}
    fn read_gtia(&mut self, _r: &mut StateReader<'_>) {}
    fn save_pia(&mut self, _w: &mut StateWriter<'_>) {}
    fn read_pia(&mut self, _r: &mut StateReader<'_>) {}
    fn save_pokey(&mut self, _w: &mut StateWriter<'_>) {}
    fn read_pokey(&mut self, _r: &mut StateReader<'_>) {}
}

/// Hooks for a host with no subsystems of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl MachineHooks for NoHooks {}

/// Write a complete save state to `out`, returning the number of bytes
/// written.
pub fn save_state(
    slot: &CartridgeSlot,
    hooks: &mut dyn MachineHooks,
    out: &mut dyn Write,
    verbose: bool,
) -> Result<usize, SaveStateError> {
    let mut w = StateWriter::new(out);
    w.save_ubyte(SIGNATURE);
    if let Some(kind) = w.error() {
        error!("Save state: failed to write header: {kind:?}");
        return Err(SaveStateError::Stream(kind));
    }

    w.save_ubyte(&[SAVE_VERSION, u8::from(verbose)]);
    hooks.save_main(&mut w);
    slot.save_section(&mut w);
    hooks.save_sio(&mut w);
    hooks.save_antic(&mut w);
    hooks.save_cpu(&mut w, verbose);
    hooks.save_gtia(&mut w);
    hooks.save_pia(&mut w);
    hooks.save_pokey(&mut w);

    match w.error() {
        Some(kind) => {
            error!("Save state: failed to write state data: {kind:?}");
            Err(SaveStateError::Stream(kind))
        }
        None => Ok(w.bytes_written()),
    }
}

/// [`save_state`] into a fixed buffer. Running out of room is a stream
/// error.
pub fn save_state_to_buffer(
    slot: &CartridgeSlot,
    hooks: &mut dyn MachineHooks,
    buf: &mut [u8],
    verbose: bool,
) -> Result<usize, SaveStateError> {
    if buf.is_empty() {
        error!("Save state: invalid buffer");
        return Err(SaveStateError::InvalidBuffer);
    }
    let mut cursor = Cursor::new(buf);
    save_state(slot, hooks, &mut cursor, verbose)
}

/// Parse and validate the header of `data`.
pub fn peek_header(data: &[u8]) -> Result<StateHeader, SaveStateError> {
    if data.is_empty() {
        return Err(SaveStateError::InvalidBuffer);
    }
    let mut input = data;
    read_header(&mut input)
}

fn read_header(input: &mut dyn Read) -> Result<StateHeader, SaveStateError> {
    let mut signature = [0u8; SIGNATURE.len()];
    input
        .read_exact(&mut signature)
        .map_err(|e| SaveStateError::Stream(e.kind()))?;
    if &signature != SIGNATURE {
        return Err(SaveStateError::Signature);
    }

    let mut fields = [0u8; 2];
    input
        .read_exact(&mut fields)
        .map_err(|e| SaveStateError::Stream(e.kind()))?;
    let [version, verbose] = fields;
    if version != SAVE_VERSION && version != LEGACY_VERSION {
        return Err(SaveStateError::Version(version));
    }

    Ok(StateHeader {
        version,
        verbose: verbose != 0,
    })
}

/// Restore a save state produced by [`save_state`] or by a version 3 writer.
///
/// Nothing is touched when the header is rejected. The cartridge section is
/// applied only after the whole stream has been read without error.
pub fn restore_state(
    slot: &mut CartridgeSlot,
    bus: &mut dyn CartridgeBus,
    hooks: &mut dyn MachineHooks,
    data: &[u8],
) -> Result<StateHeader, SaveStateError> {
    if data.is_empty() {
        error!("Save state: invalid buffer");
        return Err(SaveStateError::InvalidBuffer);
    }

    let mut input = data;
    let header = read_header(&mut input).inspect_err(|e| {
        error!("Save state: {e}");
    })?;

    let mut r = StateReader::new(&mut input);
    hooks.read_main(&mut r);
    let snapshot = if header.version != LEGACY_VERSION {
        let snapshot = slot.read_section(&mut r);
        hooks.read_sio(&mut r);
        Some(snapshot)
    } else {
        None
    };
    hooks.read_antic(&mut r);
    hooks.read_cpu(&mut r, header.verbose);
    hooks.read_gtia(&mut r);
    hooks.read_pia(&mut r);
    hooks.read_pokey(&mut r);

    if let Some(kind) = r.error() {
        error!("Save state: failed to read state data: {kind:?}");
        return Err(SaveStateError::Stream(kind));
    }
    if let Some(snapshot) = snapshot {
        slot.apply_snapshot(bus, &snapshot);
    }
    Ok(header)
}
