use log::trace;

pub const WRAM_START: u16 = 0xC000;
pub const WRAM_END: u16 = 0xDFFF;
pub const HRAM_START: u16 = 0xFF80;
pub const HRAM_END: u16 = 0xFFFE;

/// 8 KiB of work RAM at 0xC000..=0xDFFF.
pub struct WorkRam {
    bytes: Box<[u8; 0x2000]>,
}

impl WorkRam {
    pub fn new() -> Self {
        Self {
            bytes: Box::new([0; 0x2000]),
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        if !(WRAM_START..=WRAM_END).contains(&addr) {
            trace!("WRAM read out of range: {addr:04X}");
            return 0xFF;
        }
        self.bytes[(addr - WRAM_START) as usize]
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if !(WRAM_START..=WRAM_END).contains(&addr) {
            trace!("WRAM write out of range: {addr:04X}");
            return;
        }
        self.bytes[(addr - WRAM_START) as usize] = val;
    }
}

impl Default for WorkRam {
    fn default() -> Self {
        Self::new()
    }
}

/// 127 bytes of high RAM at 0xFF80..=0xFFFE.
pub struct HighRam {
    bytes: [u8; 0x7F],
}

impl HighRam {
    pub fn new() -> Self {
        Self { bytes: [0; 0x7F] }
    }

    pub fn read(&self, addr: u16) -> u8 {
        if !(HRAM_START..=HRAM_END).contains(&addr) {
            trace!("HRAM read out of range: {addr:04X}");
            return 0xFF;
        }
        self.bytes[(addr - HRAM_START) as usize]
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if !(HRAM_START..=HRAM_END).contains(&addr) {
            trace!("HRAM write out of range: {addr:04X}");
            return;
        }
        self.bytes[(addr - HRAM_START) as usize] = val;
    }
}

impl Default for HighRam {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_enforced() {
        let mut wram = WorkRam::new();
        wram.write(0xDFFF, 0x12);
        wram.write(0xE000, 0x34);
        assert_eq!(wram.read(0xDFFF), 0x12);
        assert_eq!(wram.read(0xE000), 0xFF);

        let mut hram = HighRam::new();
        hram.write(0xFF80, 0x56);
        hram.write(0xFFFF, 0x78);
        assert_eq!(hram.read(0xFF80), 0x56);
        assert_eq!(hram.read(0xFFFF), 0xFF);
    }
}
