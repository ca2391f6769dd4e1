mod common;

use a5200_core::{
    hardware::{MachineConfig, MachineType},
    machine::Machine,
    rtime8::{Phase, RTIME8_PORT_HI, RTIME8_PORT_LO},
};
use common::{FixedClock, fixed_time};

fn machine() -> Machine {
    Machine::with_clock(
        MachineConfig::for_machine(MachineType::XlXe),
        Box::new(FixedClock(fixed_time())),
    )
}

fn write_register(m: &mut Machine, reg: u8, value: u8) {
    m.write_byte(RTIME8_PORT_LO, reg);
    m.write_byte(RTIME8_PORT_LO, value >> 4);
    m.write_byte(RTIME8_PORT_LO, value & 0x0F);
}

fn read_register(m: &mut Machine, reg: u8) -> u8 {
    m.write_byte(RTIME8_PORT_LO, reg);
    let hi = m.read_byte(RTIME8_PORT_LO);
    m.write_byte(RTIME8_PORT_LO, 0);
    let lo = m.read_byte(RTIME8_PORT_LO);
    (hi << 4) | lo
}

#[test]
fn scratch_register_round_trip() {
    let mut m = machine();
    write_register(&mut m, 9, 0xA5);
    assert_eq!(read_register(&mut m, 9), 0xA5);
    assert_eq!(m.cart.rtime8().phase(), Phase::AwaitingRegister);
}

#[test]
fn both_ports_reach_the_chip() {
    let mut m = machine();
    m.write_byte(RTIME8_PORT_HI, 12);
    m.write_byte(RTIME8_PORT_LO, 0x3);
    m.write_byte(RTIME8_PORT_HI, 0xC);
    assert_eq!(m.cart.rtime8().state().regs[12], 0x3C);
}

#[test]
fn clock_registers_follow_wall_clock() {
    let mut m = machine();
    assert_eq!(read_register(&mut m, 0), 0x07);
    assert_eq!(read_register(&mut m, 1), 0x08);
    assert_eq!(read_register(&mut m, 2), 0x09);
    assert_eq!(read_register(&mut m, 3), 0x15);
    assert_eq!(read_register(&mut m, 4), 0x07);
    assert_eq!(read_register(&mut m, 5), 0x24);
    // Monday: ((1 + 2) % 7) + 1.
    assert_eq!(read_register(&mut m, 6), 0x04);
}

#[test]
fn writes_to_clock_registers_do_not_stick() {
    let mut m = machine();
    write_register(&mut m, 0, 0x42);
    assert_eq!(read_register(&mut m, 0), 0x07);
}

#[test]
fn extra_reads_before_dummy_write_are_harmless() {
    let mut m = machine();
    write_register(&mut m, 11, 0x6E);

    m.write_byte(RTIME8_PORT_LO, 11);
    for _ in 0..5 {
        assert_eq!(m.read_byte(RTIME8_PORT_LO), 0x06);
        assert_eq!(m.cart.rtime8().phase(), Phase::AwaitingHighNybble);
    }
    m.write_byte(RTIME8_PORT_LO, 0xFF);
    assert_eq!(m.read_byte(RTIME8_PORT_LO), 0x0E);
    // The dummy write must not have committed anything.
    assert_eq!(m.cart.rtime8().state().regs[11], 0x6E);
}

#[test]
fn idle_reads_return_zero() {
    let mut m = machine();
    assert_eq!(m.read_byte(RTIME8_PORT_LO), 0);
    assert_eq!(m.read_byte(RTIME8_PORT_HI), 0);
}

#[test]
fn disabled_chip_leaves_ports_to_the_cartridge() {
    let config = MachineConfig {
        rtime8: false,
        ..MachineConfig::for_machine(MachineType::XlXe)
    };
    let mut m = Machine::with_clock(config, Box::new(FixedClock(fixed_time())));
    m.write_byte(RTIME8_PORT_LO, 9);
    assert_eq!(m.read_byte(RTIME8_PORT_LO), 0xFF);
    assert_eq!(m.cart.rtime8().phase(), Phase::AwaitingRegister);
}
