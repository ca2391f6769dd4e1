//! Plain-text summaries printed by the inspection commands.

use std::fmt::Write;

use a5200_core::{
    catalog::Catalog,
    memory::{Attribute, MemoryMap},
    slot::CartridgeSlot,
    statesav::StateHeader,
};

const PAGE: u16 = 0x1000;
const CART_SPACE_START: u16 = 0x4000;
const CART_SPACE_END: u16 = 0xBFFF;

fn attribute_name(attribute: Attribute) -> &'static str {
    match attribute {
        Attribute::Ram => "ram",
        Attribute::Rom => "rom",
        Attribute::Hook => "hook",
    }
}

/// Identity of the cartridge in `slot`.
pub fn cartridge(slot: &CartridgeSlot) -> String {
    let desc = slot.descriptor();
    let mut out = String::new();
    let _ = writeln!(out, "name:     {}", desc.name);
    let _ = writeln!(
        out,
        "mapper:   {} ({})",
        desc.kind.code(),
        desc.kind.description()
    );
    let _ = writeln!(out, "size:     {} KiB", desc.size_kb);
    if let Some(cart) = slot.cartridge() {
        let _ = writeln!(out, "crc32:    {:08x}", Catalog::fingerprint(cart.rom()));
    }
    let _ = writeln!(out, "bank:     {}", slot.bank());
    if desc.keys_debounced {
        let _ = writeln!(out, "keypad:   debounced");
    }
    let _ = writeln!(
        out,
        "joystick: digital {:.2}, analog {:.2}",
        desc.joy_digital_range, desc.joy_analog_range
    );
    out
}

/// One line per 4 KiB page of cartridge space, with the attribute of the
/// page's first byte and a CRC-32 of its contents.
///
/// Pages holding a fetch hook are reported as `hook`.
pub fn window_map(memory: &MemoryMap) -> String {
    let mut out = String::new();
    let mut page = CART_SPACE_START;
    loop {
        let end = page + (PAGE - 1);
        let attribute = if (page..=end).any(|a| memory.is_hooked(a)) {
            Attribute::Hook
        } else {
            memory.attribute(page)
        };
        let _ = writeln!(
            out,
            "{page:04X}-{end:04X} {:<4} {:08x}",
            attribute_name(attribute),
            Catalog::fingerprint(memory.slice(page, end))
        );
        if end >= CART_SPACE_END {
            break;
        }
        page = end + 1;
    }
    out
}

pub fn state_header(header: &StateHeader, len: usize) -> String {
    format!(
        "version {}{}, {len} bytes",
        header.version,
        if header.verbose { " (verbose)" } else { "" }
    )
}
