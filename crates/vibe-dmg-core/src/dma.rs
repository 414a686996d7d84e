use log::debug;

// gbdev.io/pandocs/OAM_DMA_Transfer.html
pub const OAM_DMA_LEN: u8 = 160;
const START_DELAY: u8 = 1;

/// OAM DMA controller (0xFF46).
#[derive(Debug, Default)]
pub struct Dma {
    reg: u8,
    active: bool,
    byte: u8,
    delay: u8,
}

/// One byte to copy this machine cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DmaCopy {
    pub src: u16,
    pub index: u8,
}

impl Dma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, hi: u8) {
        debug!("OAM DMA from {:04X}", (hi as u16) << 8);
        self.reg = hi;
        self.active = true;
        self.byte = 0;
        self.delay = START_DELAY;
    }

    pub fn read(&self) -> u8 {
        self.reg
    }

    pub fn active(&self) -> bool {
        self.active
    }

    /// Advance one machine cycle, returning the byte to move, if any.
    pub fn tick(&mut self) -> Option<DmaCopy> {
        if !self.active {
            return None;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return None;
        }

        let mut src = ((self.reg as u16) << 8) | self.byte as u16;
        if src >= 0xE000 {
            src -= 0x2000;
        }
        let copy = DmaCopy {
            src,
            index: self.byte,
        };
        self.byte += 1;
        if self.byte >= OAM_DMA_LEN {
            self.active = false;
        }
        Some(copy)
    }
}
