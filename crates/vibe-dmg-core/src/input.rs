use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::interrupts::{Interrupt, Interrupts};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Button {
    Right,
    Left,
    Up,
    Down,
    A,
    B,
    Select,
    Start,
}

impl Button {
    /// Bit in the shared pressed set: d-pad in the low nibble, buttons in
    /// the high nibble, each in P1 line order.
    const fn mask(self) -> u8 {
        match self {
            Button::Right => 0x01,
            Button::Left => 0x02,
            Button::Up => 0x04,
            Button::Down => 0x08,
            Button::A => 0x10,
            Button::B => 0x20,
            Button::Select => 0x40,
            Button::Start => 0x80,
        }
    }
}

/// Host-side view of the buttons. Clones share state, so a frontend thread
/// can hold one while the emulation thread owns the machine.
#[derive(Clone, Debug, Default)]
pub struct JoypadHandle {
    pressed: Arc<AtomicU8>,
}

impl JoypadHandle {
    pub fn press(&self, button: Button) {
        self.pressed.fetch_or(button.mask(), Ordering::Relaxed);
    }

    pub fn release(&self, button: Button) {
        self.pressed.fetch_and(!button.mask(), Ordering::Relaxed);
    }

    pub fn set(&self, button: Button, down: bool) {
        if down {
            self.press(button);
        } else {
            self.release(button);
        }
    }

    pub fn pressed(&self, button: Button) -> bool {
        self.bits() & button.mask() != 0
    }

    pub fn any_pressed(&self) -> bool {
        self.bits() != 0
    }

    fn bits(&self) -> u8 {
        self.pressed.load(Ordering::Relaxed)
    }
}

/// P1 register (0xFF00).
pub struct Joypad {
    handle: JoypadHandle,
    /// Select bits 4-5 as last written (0 = group selected).
    select: u8,
    /// Low nibble seen at the previous sample, for edge detection.
    last_lines: u8,
}

impl Joypad {
    pub fn new(handle: JoypadHandle) -> Self {
        Self {
            handle,
            select: 0x30,
            last_lines: 0x0F,
        }
    }

    pub fn handle(&self) -> JoypadHandle {
        self.handle.clone()
    }

    fn lines(&self) -> u8 {
        let pressed = self.handle.bits();
        let mut low = 0x0F;
        if self.select & 0x10 == 0 {
            low &= !(pressed & 0x0F);
        }
        if self.select & 0x20 == 0 {
            low &= !(pressed >> 4);
        }
        low
    }

    pub fn read(&self) -> u8 {
        0xC0 | self.select | self.lines()
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & 0x30;
    }

    /// Sample the input lines once per machine cycle; a line going low
    /// requests the joypad interrupt.
    pub fn tick(&mut self, ints: &mut Interrupts) {
        let lines = self.lines();
        if self.last_lines & !lines != 0 {
            ints.request(Interrupt::Joypad);
        }
        self.last_lines = lines;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_group_reads_active_low() {
        let handle = JoypadHandle::default();
        let mut pad = Joypad::new(handle.clone());
        handle.press(Button::Start);
        handle.press(Button::Left);

        pad.write(0x10);
        assert_eq!(pad.read(), 0xC0 | 0x10 | 0x07);
        pad.write(0x20);
        assert_eq!(pad.read(), 0xC0 | 0x20 | 0x0D);
        pad.write(0x30);
        assert_eq!(pad.read(), 0xFF);
    }

    #[test]
    fn new_press_requests_interrupt() {
        let handle = JoypadHandle::default();
        let mut pad = Joypad::new(handle.clone());
        let mut ints = Interrupts::default();
        pad.write(0x10);
        pad.tick(&mut ints);
        assert_eq!(ints.requested(), 0);

        handle.set(Button::A, true);
        pad.tick(&mut ints);
        assert_eq!(ints.requested(), Interrupt::Joypad.mask());

        ints.clear(Interrupt::Joypad);
        pad.tick(&mut ints);
        assert_eq!(ints.requested(), 0);
        assert!(handle.pressed(Button::A));
    }
}
