//! External interrupt request lines and their fixed vector/priority table.

/// Number of interrupt request lines.
pub const INTERRUPT_LINE_COUNT: usize = 11;

/// Device interrupt request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum InterruptLine {
    /// KW11-L line clock.
    LineClock = 0,
    /// Console keyboard receiver.
    ConsoleReceive = 1,
    /// Console printer transmitter.
    ConsoleTransmit = 2,
    /// RK11 disk controller.
    Rk11 = 3,
    /// RL11 disk controller.
    Rl11 = 4,
    /// RH70 Massbus controller.
    Rh70 = 5,
    /// TM11 magtape controller.
    Tm11 = 6,
    /// Paper-tape reader.
    PaperTapeReader = 7,
    /// Paper-tape punch.
    PaperTapePunch = 8,
    /// Line printer.
    LinePrinter = 9,
    /// KW11-P programmable clock.
    ProgrammableClock = 10,
}

impl InterruptLine {
    /// Every line in table order.
    pub const ALL: [Self; INTERRUPT_LINE_COUNT] = [
        Self::LineClock,
        Self::ConsoleReceive,
        Self::ConsoleTransmit,
        Self::Rk11,
        Self::Rl11,
        Self::Rh70,
        Self::Tm11,
        Self::PaperTapeReader,
        Self::PaperTapePunch,
        Self::LinePrinter,
        Self::ProgrammableClock,
    ];

    /// Returns the trap vector.
    #[must_use]
    pub const fn vector(self) -> u16 {
        match self {
            Self::LineClock => 0o100,
            Self::ConsoleReceive => 0o60,
            Self::ConsoleTransmit => 0o64,
            Self::Rk11 => 0o220,
            Self::Rl11 => 0o160,
            Self::Rh70 => 0o254,
            Self::Tm11 => 0o224,
            Self::PaperTapeReader => 0o70,
            Self::PaperTapePunch => 0o74,
            Self::LinePrinter => 0o200,
            Self::ProgrammableClock => 0o104,
        }
    }

    /// Returns the bus request priority level.
    #[must_use]
    pub const fn ipl(self) -> u8 {
        match self {
            Self::LineClock | Self::ProgrammableClock => 6,
            Self::Rk11 | Self::Rl11 | Self::Rh70 | Self::Tm11 => 5,
            Self::ConsoleReceive
            | Self::ConsoleTransmit
            | Self::PaperTapeReader
            | Self::PaperTapePunch
            | Self::LinePrinter => 4,
        }
    }

    /// Returns the request bit for this line.
    #[must_use]
    pub const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

/// Highest-priority request selected for service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingInterrupt {
    /// Requesting line.
    pub line: InterruptLine,
    /// Vector to enter.
    pub vector: u16,
    /// Request priority.
    pub ipl: u8,
}

/// Set of asserted interrupt request lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptLines {
    requests: u16,
}

impl InterruptLines {
    /// Asserts `line`.
    pub const fn request(&mut self, line: InterruptLine) {
        self.requests |= line.bit();
    }

    /// Deasserts `line`.
    pub const fn clear(&mut self, line: InterruptLine) {
        self.requests &= !line.bit();
    }

    /// Deasserts every line (bus `RESET`).
    pub const fn clear_all(&mut self) {
        self.requests = 0;
    }

    /// Returns `true` when `line` is asserted.
    #[must_use]
    pub const fn is_requested(&self, line: InterruptLine) -> bool {
        self.requests & line.bit() != 0
    }

    /// Returns the raw request mask.
    #[must_use]
    pub const fn requests(&self) -> u16 {
        self.requests
    }

    /// Returns the highest-priority request strictly above `cpu_ipl`.
    ///
    /// Among equal priorities the lower-numbered line wins.
    #[must_use]
    pub fn highest_above(&self, cpu_ipl: u8) -> Option<PendingInterrupt> {
        InterruptLine::ALL
            .iter()
            .copied()
            .filter(|line| self.is_requested(*line) && line.ipl() > cpu_ipl)
            .fold(None, |best: Option<InterruptLine>, line| match best {
                Some(current) if current.ipl() >= line.ipl() => Some(current),
                _ => Some(line),
            })
            .map(|line| PendingInterrupt {
                line,
                vector: line.vector(),
                ipl: line.ipl(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{InterruptLine, InterruptLines};

    #[test]
    fn requests_below_or_at_cpu_priority_are_masked() {
        let mut lines = InterruptLines::default();
        lines.request(InterruptLine::Rk11);
        assert_eq!(lines.highest_above(3).map(|p| p.vector), Some(0o220));
        assert_eq!(lines.highest_above(5), None);
        assert_eq!(lines.highest_above(6), None);
    }

    #[test]
    fn highest_priority_line_wins() {
        let mut lines = InterruptLines::default();
        lines.request(InterruptLine::ConsoleReceive);
        lines.request(InterruptLine::Rl11);
        lines.request(InterruptLine::LineClock);
        let pending = lines.highest_above(0);
        let expected = Some((InterruptLine::LineClock, 6));
        assert_eq!(pending.map(|p| (p.line, p.ipl)), expected);

        lines.clear(InterruptLine::LineClock);
        let pending = lines.highest_above(0);
        assert_eq!(pending.map(|p| p.line), Some(InterruptLine::Rl11));
    }

    #[test]
    fn clear_all_drops_every_request() {
        let mut lines = InterruptLines::default();
        for line in InterruptLine::ALL {
            lines.request(line);
        }
        assert_eq!(lines.requests().count_ones(), 11);
        lines.clear_all();
        assert_eq!(lines.highest_above(0), None);
    }
}
