use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};

/// Data port of the clock chip in the cartridge I/O page.
pub const RTIME8_PORT_LO: u16 = 0xD5B8;
pub const RTIME8_PORT_HI: u16 = 0xD5B9;

pub const REGISTER_COUNT: usize = 16;

/// Registers backed by the wall clock; the remainder are scratch storage.
pub const CLOCK_REGISTERS: u8 = 7;

/// Broken-down local wall time as the clock chip reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalendarTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    /// Day of month, 1-based.
    pub day: u8,
    /// Month, 1-based.
    pub month: u8,
    pub year: i32,
    /// Day of week, 0 is Sunday.
    pub weekday: u8,
}

impl CalendarTime {
    /// Calendar fields of `time` in its own time zone.
    pub fn from_datetime<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        Self {
            second: time.second() as u8,
            minute: time.minute() as u8,
            hour: time.hour() as u8,
            day: time.day() as u8,
            month: time.month() as u8,
            year: time.year(),
            weekday: time.weekday().num_days_from_sunday() as u8,
        }
    }
}

/// Source of the current time for the clock chip.
pub trait WallClock: Send {
    fn now(&self) -> CalendarTime;
}

/// Host system clock in the host's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> CalendarTime {
        CalendarTime::from_datetime(&Local::now())
    }
}

/// Where the chip is in its nibble-serial protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    AwaitingRegister,
    AwaitingHighNybble,
    AwaitingLowNybble,
}

impl Phase {
    pub const fn to_byte(self) -> u8 {
        match self {
            Phase::AwaitingRegister => 0,
            Phase::AwaitingHighNybble => 1,
            Phase::AwaitingLowNybble => 2,
        }
    }

    /// Out-of-range values fall back to the idle phase.
    pub const fn from_byte(value: u8) -> Self {
        match value {
            1 => Phase::AwaitingHighNybble,
            2 => Phase::AwaitingLowNybble,
            _ => Phase::AwaitingRegister,
        }
    }
}

/// Serialisable part of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rtime8State {
    pub phase: Phase,
    pub register: u8,
    pub pending_high: u8,
    pub regs: [u8; REGISTER_COUNT],
}

/// R-Time 8 real-time clock cartridge.
///
/// Every register is reached through one data port, a nibble at a time:
/// write the register index, then move the high and low nibbles. Reading
/// follows the same sequence with a dummy write separating the two nibbles.
pub struct Rtime8 {
    /// Host switch; never taken from a save state.
    enabled: bool,
    state: Rtime8State,
    clock: Box<dyn WallClock>,
}

#[inline]
fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

impl Rtime8 {
    pub fn new(enabled: bool) -> Self {
        Self::with_clock(enabled, Box::new(SystemClock))
    }

    pub fn with_clock(enabled: bool, clock: Box<dyn WallClock>) -> Self {
        Self {
            enabled,
            state: Rtime8State::default(),
            clock,
        }
    }

    /// Reset the protocol and clear scratch registers.
    pub fn initialise(&mut self) {
        self.state = Rtime8State::default();
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn state(&self) -> &Rtime8State {
        &self.state
    }

    /// Restore protocol state and registers. The enable switch is kept.
    pub fn restore(&mut self, state: Rtime8State) {
        self.state = Rtime8State {
            register: state.register & 0x0F,
            ..state
        };
    }

    /// Value of `reg` as the chip would report it: BCD wall time for
    /// registers 0-6, stored scratch for the rest.
    pub fn register_value(&self, reg: u8) -> u8 {
        let reg = reg & 0x0F;
        if reg >= CLOCK_REGISTERS {
            return self.state.regs[reg as usize];
        }
        let now = self.clock.now();
        match reg {
            0 => to_bcd(now.second),
            1 => to_bcd(now.minute),
            2 => to_bcd(now.hour),
            3 => to_bcd(now.day),
            4 => to_bcd(now.month),
            5 => to_bcd(now.year.rem_euclid(100) as u8),
            _ => to_bcd((now.weekday + 2) % 7 + 1),
        }
    }

    /// Read the data port.
    pub fn get_byte(&mut self) -> u8 {
        match self.state.phase {
            Phase::AwaitingRegister => 0,
            // Stays put so that extra reads return the same nibble.
            Phase::AwaitingHighNybble => self.register_value(self.state.register) >> 4,
            Phase::AwaitingLowNybble => {
                self.state.phase = Phase::AwaitingRegister;
                self.register_value(self.state.register) & 0x0F
            }
        }
    }

    /// Write the data port.
    pub fn put_byte(&mut self, byte: u8) {
        match self.state.phase {
            Phase::AwaitingRegister => {
                self.state.register = byte & 0x0F;
                self.state.phase = Phase::AwaitingHighNybble;
            }
            Phase::AwaitingHighNybble => {
                self.state.pending_high = byte << 4;
                self.state.phase = Phase::AwaitingLowNybble;
            }
            Phase::AwaitingLowNybble => {
                let reg = self.state.register as usize;
                self.state.regs[reg] = self.state.pending_high | (byte & 0x0F);
                self.state.phase = Phase::AwaitingRegister;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    struct Fixed(CalendarTime);

    impl WallClock for Fixed {
        fn now(&self) -> CalendarTime {
            self.0
        }
    }

    fn chip(now: CalendarTime) -> Rtime8 {
        Rtime8::with_clock(true, Box::new(Fixed(now)))
    }

    #[test]
    fn calendar_fields_follow_offset() {
        // 2024-02-29 13:45:07 UTC
        let utc = DateTime::from_timestamp(1_709_214_307, 0).unwrap();
        let t = CalendarTime::from_datetime(&utc);
        assert_eq!((t.year, t.month, t.day), (2024, 2, 29));
        assert_eq!((t.hour, t.minute, t.second), (13, 45, 7));
        assert_eq!(t.weekday, 4);

        // Same instant at UTC+9 is already the next day.
        let tokyo = utc.with_timezone(&FixedOffset::east_opt(9 * 3_600).unwrap());
        let t = CalendarTime::from_datetime(&tokyo);
        assert_eq!((t.year, t.month, t.day), (2024, 3, 1));
        assert_eq!((t.hour, t.minute, t.second), (22, 45, 7));
        assert_eq!(t.weekday, 5);

        let honolulu = utc.with_timezone(&FixedOffset::west_opt(10 * 3_600).unwrap());
        assert_eq!(CalendarTime::from_datetime(&honolulu).hour, 3);
    }

    #[test]
    fn system_clock_reports_local_time() {
        let before = Local::now();
        let now = SystemClock.now();
        let after = Local::now();
        let expected = [
            CalendarTime::from_datetime(&before),
            CalendarTime::from_datetime(&after),
        ];
        let fields = |t: &CalendarTime| (t.year, t.month, t.day, t.hour);
        assert!(expected.iter().any(|t| fields(t) == fields(&now)));
    }

    #[test]
    fn clock_registers_are_bcd() {
        let rt = chip(CalendarTime {
            second: 59,
            minute: 7,
            hour: 23,
            day: 31,
            month: 12,
            year: 1999,
            weekday: 5,
        });
        assert_eq!(rt.register_value(0), 0x59);
        assert_eq!(rt.register_value(1), 0x07);
        assert_eq!(rt.register_value(2), 0x23);
        assert_eq!(rt.register_value(3), 0x31);
        assert_eq!(rt.register_value(4), 0x12);
        assert_eq!(rt.register_value(5), 0x99);
        // Friday maps to ((5 + 2) % 7) + 1.
        assert_eq!(rt.register_value(6), 0x01);
    }

    #[test]
    fn idle_reads_return_zero() {
        let mut rt = chip(CalendarTime::default());
        assert_eq!(rt.get_byte(), 0);
        assert_eq!(rt.phase(), Phase::AwaitingRegister);
    }

    #[test]
    fn write_then_read_scratch_register() {
        let mut rt = chip(CalendarTime::default());
        rt.put_byte(0x39); // only the low nibble selects
        rt.put_byte(0x0A);
        rt.put_byte(0x05);
        assert_eq!(rt.state().regs[9], 0xA5);
        assert_eq!(rt.phase(), Phase::AwaitingRegister);

        rt.put_byte(9);
        assert_eq!(rt.get_byte(), 0x0A);
        assert_eq!(rt.get_byte(), 0x0A);
        assert_eq!(rt.phase(), Phase::AwaitingHighNybble);
        rt.put_byte(0);
        assert_eq!(rt.get_byte(), 0x05);
        assert_eq!(rt.phase(), Phase::AwaitingRegister);
        assert_eq!(rt.state().regs[9], 0xA5);
    }

    #[test]
    fn restore_keeps_enable_switch() {
        let mut rt = Rtime8::with_clock(false, Box::new(Fixed(CalendarTime::default())));
        rt.restore(Rtime8State {
            phase: Phase::AwaitingLowNybble,
            register: 0x1B,
            ..Rtime8State::default()
        });
        assert!(!rt.enabled());
        assert_eq!(rt.phase(), Phase::AwaitingLowNybble);
        assert_eq!(rt.state().register, 0x0B);
    }

    #[test]
    fn initialise_keeps_enable_switch() {
        let mut rt = chip(CalendarTime::default());
        rt.put_byte(12);
        rt.put_byte(1);
        rt.put_byte(2);
        rt.put_byte(3);
        rt.initialise();
        assert!(rt.enabled());
        assert_eq!(rt.phase(), Phase::AwaitingRegister);
        assert_eq!(rt.state().regs, [0; REGISTER_COUNT]);
    }
}
