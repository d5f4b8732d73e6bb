bitflags::bitflags! {
    /// The 6502 processor status byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        const CARRY     = 0b0000_0001;
        const ZERO      = 0b0000_0010;
        const INTERRUPT = 0b0000_0100;
        const DECIMAL   = 0b0000_1000;
        const BREAK     = 0b0001_0000;
        const UNUSED    = 0b0010_0000;
        const OVERFLOW  = 0b0100_0000;
        const NEGATIVE  = 0b1000_0000;
    }
}

impl Status {
    /// Power-on status value (I set, unused bit set).
    pub fn new() -> Self {
        Self::from_bits_truncate(0x24)
    }

    pub fn update_zero(&mut self, value: u8) {
        self.set(Self::ZERO, value == 0);
    }

    pub fn update_negative(&mut self, value: u8) {
        self.set(Self::NEGATIVE, value & 0x80 != 0);
    }

    pub fn update_zero_negative(&mut self, value: u8) {
        self.update_zero(value);
        self.update_negative(value);
    }

    /// The byte pushed to the stack by PHP/BRK: bits 4 and 5 both set.
    pub fn to_pushed_byte(self, b_flag: bool) -> u8 {
        let mut bits = self.bits() | Self::UNUSED.bits();
        if b_flag {
            bits |= Self::BREAK.bits();
        } else {
            bits &= !Self::BREAK.bits();
        }
        bits
    }

    /// Restores status from a pulled byte (PLP/RTI): B and bit-5 are not
    /// real flags and are ignored on restore, matching hardware, but the
    /// unused bit always reads back as set.
    pub fn from_pulled_byte(byte: u8) -> Self {
        Self::from_bits_truncate((byte | Self::UNUSED.bits()) & !Self::BREAK.bits())
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_value_has_interrupt_and_unused_set() {
        let status = Status::new();
        assert!(status.contains(Status::INTERRUPT));
        assert!(status.contains(Status::UNUSED));
        assert!(!status.contains(Status::CARRY));
    }

    #[test]
    fn brk_pushes_break_bit_irq_does_not() {
        let status = Status::new();
        assert_eq!(status.to_pushed_byte(true) & Status::BREAK.bits(), Status::BREAK.bits());
        assert_eq!(status.to_pushed_byte(false) & Status::BREAK.bits(), 0);
    }

    #[test]
    fn pulled_byte_ignores_break_bit() {
        let status = Status::from_pulled_byte(0xFF);
        assert!(!status.contains(Status::BREAK));
        assert!(status.contains(Status::UNUSED));
    }
}
