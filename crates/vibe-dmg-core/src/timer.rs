use crate::interrupts::{Interrupt, Interrupts};

pub struct Timer {
    /// 16-bit internal divider counter. DIV register is the upper 8 bits.
    pub div: u16,
    /// Timer counter
    pub tima: u8,
    /// Timer modulo
    pub tma: u8,
    /// Timer control
    pub tac: u8,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            div: 0,
            tima: 0,
            tma: 0,
            tac: 0,
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF04 => (self.div >> 8) as u8,
            0xFF05 => self.tima,
            0xFF06 => self.tma,
            0xFF07 => self.tac | 0xF8,
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8, ints: &mut Interrupts) {
        match addr {
            0xFF04 => self.reset_div(ints),
            0xFF05 => self.tima = val,
            0xFF06 => self.tma = val,
            0xFF07 => self.tac = val & 0x07,
            _ => {}
        }
    }

    /// Advance the divider by one dot.
    pub fn tick(&mut self, ints: &mut Interrupts) {
        let prev = self.signal();
        self.div = self.div.wrapping_add(1);
        if prev && !self.signal() {
            self.increment(ints);
        }
    }

    /// Clear the whole 16-bit divider. Dropping the selected bit this way
    /// counts as a falling edge.
    pub fn reset_div(&mut self, ints: &mut Interrupts) {
        let prev = self.signal();
        self.div = 0;
        if prev && !self.signal() {
            self.increment(ints);
        }
    }

    fn increment(&mut self, ints: &mut Interrupts) {
        let (next, overflow) = self.tima.overflowing_add(1);
        if overflow {
            self.tima = self.tma;
            ints.request(Interrupt::Timer);
        } else {
            self.tima = next;
        }
    }

    /// Divider bit watched for the configured frequency.
    fn timer_bit(&self) -> u16 {
        match self.tac & 0x03 {
            0x00 => 9, // 4096 Hz
            0x01 => 3, // 262144 Hz
            0x02 => 5, // 65536 Hz
            _ => 7,    // 16384 Hz
        }
    }

    fn signal(&self) -> bool {
        self.tac & 0x04 != 0 && (self.div >> self.timer_bit()) & 1 != 0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
