//! LCD control and status registers (0xFF40..=0xFF4B, minus DMA).

/// Shade table for the four DMG gray levels, packed as 0xAARRGGBB.
pub const DEFAULT_COLORS: [u32; 4] = [0xFFFFFFFF, 0xFFAAAAAA, 0xFF555555, 0xFF000000];

// LCD modes stored in STAT bits 0-1
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LcdMode {
    HBlank = 0,
    VBlank = 1,
    Oam = 2,
    Transfer = 3,
}

/// STAT interrupt source enable bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StatSource {
    HBlank = 0x08,
    VBlank = 0x10,
    Oam = 0x20,
    Lyc = 0x40,
}

pub struct Lcd {
    pub lcdc: u8,
    stat: u8,
    pub scy: u8,
    pub scx: u8,
    pub ly: u8,
    pub lyc: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    pub wy: u8,
    pub wx: u8,

    pub bg_colors: [u32; 4],
    pub sp1_colors: [u32; 4],
    pub sp2_colors: [u32; 4],
}

impl Lcd {
    pub fn new() -> Self {
        let mut lcd = Self {
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            bg_colors: DEFAULT_COLORS,
            sp1_colors: DEFAULT_COLORS,
            sp2_colors: DEFAULT_COLORS,
        };
        lcd.write(0xFF47, 0xFC);
        lcd.write(0xFF48, 0xFF);
        lcd.write(0xFF49, 0xFF);
        lcd
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => self.stat | 0x80,
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    /// Register write as seen from the CPU. LY is read-only.
    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => self.lcdc = val,
            0xFF41 => self.stat = (self.stat & 0x07) | (val & 0x78),
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF45 => self.lyc = val,
            0xFF47 => {
                self.bgp = val;
                update_palette(&mut self.bg_colors, val);
            }
            0xFF48 => {
                self.obp0 = val;
                update_palette(&mut self.sp1_colors, val & 0xFC);
            }
            0xFF49 => {
                self.obp1 = val;
                update_palette(&mut self.sp2_colors, val & 0xFC);
            }
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    pub fn mode(&self) -> LcdMode {
        match self.stat & 0x03 {
            0 => LcdMode::HBlank,
            1 => LcdMode::VBlank,
            2 => LcdMode::Oam,
            _ => LcdMode::Transfer,
        }
    }

    pub fn set_mode(&mut self, mode: LcdMode) {
        self.stat = (self.stat & !0x03) | mode as u8;
    }

    pub fn stat_enabled(&self, source: StatSource) -> bool {
        self.stat & source as u8 != 0
    }

    pub fn set_lyc_flag(&mut self, on: bool) {
        if on {
            self.stat |= 0x04;
        } else {
            self.stat &= !0x04;
        }
    }

    pub fn lyc_flag(&self) -> bool {
        self.stat & 0x04 != 0
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & 0x80 != 0
    }

    pub fn win_map_area(&self) -> u16 {
        if self.lcdc & 0x40 != 0 { 0x9C00 } else { 0x9800 }
    }

    pub fn win_enabled(&self) -> bool {
        self.lcdc & 0x20 != 0
    }

    /// Tile data base; 0x8800 means signed tile indices.
    pub fn bgw_data_area(&self) -> u16 {
        if self.lcdc & 0x10 != 0 { 0x8000 } else { 0x8800 }
    }

    pub fn bg_map_area(&self) -> u16 {
        if self.lcdc & 0x08 != 0 { 0x9C00 } else { 0x9800 }
    }

    pub fn obj_height(&self) -> u8 {
        if self.lcdc & 0x04 != 0 { 16 } else { 8 }
    }

    pub fn obj_enabled(&self) -> bool {
        self.lcdc & 0x02 != 0
    }

    pub fn bgw_enabled(&self) -> bool {
        self.lcdc & 0x01 != 0
    }
}

impl Default for Lcd {
    fn default() -> Self {
        Self::new()
    }
}

fn update_palette(colors: &mut [u32; 4], data: u8) {
    for (i, color) in colors.iter_mut().enumerate() {
        *color = DEFAULT_COLORS[((data >> (i * 2)) & 0x03) as usize];
    }
}
