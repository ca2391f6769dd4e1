//! Atari 5200 / 8-bit computer cartridge emulation core.
//!
//! This crate contains the platform-agnostic cartridge logic: catalog
//! lookup, bank switching, the R-Time 8 clock peripheral and the save-state
//! codec. Frontends drive it through the [`machine`] facade or embed the
//! [`slot::CartridgeSlot`] directly behind their own memory dispatcher.

/// Bank-switch engine: activation recipes and live bank switching.
pub mod banking;

/// Static cartridge catalog keyed by content fingerprint.
pub mod catalog;

/// Cartridge images, mapper kinds and detection.
pub mod cartridge;

/// Machine variants and their cartridge-relevant quirks.
pub mod hardware;

/// High-level facade that wires memory and the cartridge slot together.
pub mod machine;

/// Host memory primitives and the reference 64 KiB memory map.
pub mod memory;

/// ICD R-Time 8 real-time clock cartridge.
pub mod rtime8;

/// Cartridge slot: the per-machine cartridge state and its entry points.
pub mod slot;

/// Versioned binary save-state codec.
pub mod statesav;
