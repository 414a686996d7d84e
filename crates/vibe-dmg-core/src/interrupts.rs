/// Interrupt sources in priority order (lowest bit wins).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Interrupt {
    VBlank = 0,
    LcdStat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::LcdStat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    pub const fn mask(self) -> u8 {
        1 << self as u8
    }

    // gbdev.io/pandocs/Interrupts.html
    pub const fn vector(self) -> u16 {
        match self {
            Interrupt::VBlank => 0x40,
            Interrupt::LcdStat => 0x48,
            Interrupt::Timer => 0x50,
            Interrupt::Serial => 0x58,
            Interrupt::Joypad => 0x60,
        }
    }
}

/// IF (0xFF0F) and IE (0xFFFF).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interrupts {
    pub flag: u8,
    pub enable: u8,
}

impl Interrupts {
    pub fn request(&mut self, kind: Interrupt) {
        self.flag |= kind.mask();
    }

    pub fn clear(&mut self, kind: Interrupt) {
        self.flag &= !kind.mask();
    }

    /// Requested sources, regardless of IE.
    pub fn requested(&self) -> u8 {
        self.flag & 0x1F
    }

    /// Requested and enabled sources.
    pub fn pending(&self) -> u8 {
        self.flag & self.enable & 0x1F
    }

    /// Highest-priority source that is both requested and enabled.
    pub fn highest_pending(&self) -> Option<Interrupt> {
        let pending = self.pending();
        Interrupt::ALL
            .into_iter()
            .find(|kind| pending & kind.mask() != 0)
    }

    pub fn read_flag(&self) -> u8 {
        self.flag | 0xE0
    }

    pub fn write_flag(&mut self, val: u8) {
        self.flag = val & 0x1F;
    }
}
