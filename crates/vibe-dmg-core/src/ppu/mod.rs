use log::debug;

use crate::interrupts::{Interrupt, Interrupts};

pub mod fifo;
pub mod lcd;

use fifo::PixelFifo;
use lcd::{DEFAULT_COLORS, Lcd, LcdMode, StatSource};

// Screen resolution used by the Game Boy PPU
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

const LINES_PER_FRAME: u8 = 154;
const TICKS_PER_LINE: u32 = 456;
const OAM_SCAN_TICKS: u32 = 80;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;
/// Sprites the fetcher considers for one 8-pixel tile.
pub(crate) const MAX_FETCHED_SPRITES: usize = 3;

// Internal memory sizes
const VRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;

/// One decoded OAM entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OamEntry {
    pub y: u8,
    pub x: u8,
    pub tile: u8,
    pub flags: u8,
    pub index: u8,
}

impl OamEntry {
    fn from_oam(oam: &[u8; OAM_SIZE], index: usize) -> Self {
        let base = index * 4;
        Self {
            y: oam[base],
            x: oam[base + 1],
            tile: oam[base + 2],
            flags: oam[base + 3],
            index: index as u8,
        }
    }

    pub fn palette1(&self) -> bool {
        self.flags & 0x10 != 0
    }

    pub fn x_flip(&self) -> bool {
        self.flags & 0x20 != 0
    }

    pub fn y_flip(&self) -> bool {
        self.flags & 0x40 != 0
    }

    pub fn bg_priority(&self) -> bool {
        self.flags & 0x80 != 0
    }
}

/// Sprites selected for the current line, ordered by X then OAM index.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineSprites {
    entries: [OamEntry; MAX_SPRITES_PER_LINE],
    len: usize,
}

impl LineSprites {
    pub fn as_slice(&self) -> &[OamEntry] {
        &self.entries[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn clear(&mut self) {
        self.len = 0;
    }

    fn push(&mut self, entry: OamEntry) -> bool {
        if self.len >= MAX_SPRITES_PER_LINE {
            return false;
        }
        self.entries[self.len] = entry;
        self.len += 1;
        true
    }

    fn sort(&mut self) {
        self.entries[..self.len].sort_by_key(|e| (e.x, e.index));
    }
}

pub struct Ppu {
    vram: Box<[u8; VRAM_SIZE]>,
    oam: [u8; OAM_SIZE],
    pub lcd: Lcd,
    pub fifo: PixelFifo,

    line_sprites: LineSprites,
    fetched_entries: [OamEntry; MAX_FETCHED_SPRITES],
    fetched_entry_count: usize,

    /// Internal window line counter
    window_line: u8,
    line_ticks: u32,

    framebuffer: Box<[u32; SCREEN_WIDTH * SCREEN_HEIGHT]>,
    /// Indicates a completed frame is available in `framebuffer`
    frame_ready: bool,
    frames: u64,
}

impl Ppu {
    pub fn new() -> Self {
        let mut lcd = Lcd::new();
        lcd.set_mode(LcdMode::HBlank);
        Self {
            vram: Box::new([0; VRAM_SIZE]),
            oam: [0; OAM_SIZE],
            lcd,
            fifo: PixelFifo::default(),
            line_sprites: LineSprites::default(),
            fetched_entries: [OamEntry::default(); MAX_FETCHED_SPRITES],
            fetched_entry_count: 0,
            window_line: 0,
            line_ticks: 0,
            framebuffer: Box::new([DEFAULT_COLORS[0]; SCREEN_WIDTH * SCREEN_HEIGHT]),
            frame_ready: false,
            frames: 0,
        }
    }

    /// LCD state left behind by the boot ROM: display on at the top of a
    /// frame.
    pub fn apply_boot_state(&mut self) {
        self.lcd.write(0xFF47, 0xFC);
        self.lcd.write(0xFF40, 0x91);
        self.lcd.ly = 0;
        self.line_ticks = 0;
        self.window_line = 0;
        self.lcd.set_mode(LcdMode::Oam);
        self.update_lyc(&mut Interrupts::default());
    }

    pub fn read_vram(&self, addr: u16) -> u8 {
        self.vram_at(addr)
    }

    pub fn write_vram(&mut self, addr: u16, val: u8) {
        self.vram[(addr & 0x1FFF) as usize] = val;
    }

    pub fn read_oam(&self, addr: u16) -> u8 {
        self.oam.get(addr.wrapping_sub(0xFE00) as usize).copied().unwrap_or(0xFF)
    }

    pub fn write_oam(&mut self, addr: u16, val: u8) {
        if let Some(b) = self.oam.get_mut(addr.wrapping_sub(0xFE00) as usize) {
            *b = val;
        }
    }

    /// Store a byte delivered by OAM DMA.
    pub fn dma_write(&mut self, index: u8, val: u8) {
        if let Some(b) = self.oam.get_mut(index as usize) {
            *b = val;
        }
    }

    fn vram_at(&self, addr: u16) -> u8 {
        self.vram[(addr & 0x1FFF) as usize]
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        self.lcd.read(addr)
    }

    pub fn write_reg(&mut self, addr: u16, val: u8, ints: &mut Interrupts) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd.lcd_enabled();
                self.lcd.write(addr, val);
                let now_on = self.lcd.lcd_enabled();
                if was_on && !now_on {
                    debug!("LCD off");
                    self.lcd.ly = 0;
                    self.line_ticks = 0;
                    self.window_line = 0;
                    self.fifo.reset();
                    self.lcd.set_mode(LcdMode::HBlank);
                } else if !was_on && now_on {
                    debug!("LCD on");
                    self.lcd.ly = 0;
                    self.line_ticks = 0;
                    self.window_line = 0;
                    self.lcd.set_mode(LcdMode::Oam);
                    self.update_lyc(ints);
                }
            }
            0xFF45 => {
                self.lcd.write(addr, val);
                if self.lcd.lcd_enabled() {
                    self.update_lyc(ints);
                }
            }
            0xFF44 => {}
            _ => self.lcd.write(addr, val),
        }
    }

    pub fn ly(&self) -> u8 {
        self.lcd.ly
    }

    pub fn mode(&self) -> LcdMode {
        self.lcd.mode()
    }

    pub fn window_line(&self) -> u8 {
        self.window_line
    }

    pub fn line_sprites(&self) -> &[OamEntry] {
        self.line_sprites.as_slice()
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// Frames completed since power-on.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn framebuffer(&self) -> &[u32; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.framebuffer
    }

    /// Advance the PPU by one dot.
    pub fn tick(&mut self, ints: &mut Interrupts) {
        if !self.lcd.lcd_enabled() {
            return;
        }

        self.line_ticks += 1;
        match self.lcd.mode() {
            LcdMode::Oam => self.mode_oam(),
            LcdMode::Transfer => self.mode_xfer(ints),
            LcdMode::VBlank => self.mode_vblank(ints),
            LcdMode::HBlank => self.mode_hblank(ints),
        }
    }

    fn set_mode(&mut self, mode: LcdMode) {
        #[cfg(feature = "ppu-trace")]
        log::trace!(
            "ppu: LY={} dot={} {:?} -> {:?}",
            self.lcd.ly,
            self.line_ticks,
            self.lcd.mode(),
            mode
        );
        self.lcd.set_mode(mode);
    }

    fn stat_interrupt(&self, source: StatSource, ints: &mut Interrupts) {
        if self.lcd.stat_enabled(source) {
            ints.request(Interrupt::LcdStat);
        }
    }

    fn update_lyc(&mut self, ints: &mut Interrupts) {
        let equal = self.lcd.ly == self.lcd.lyc;
        self.lcd.set_lyc_flag(equal);
        if equal {
            self.stat_interrupt(StatSource::Lyc, ints);
        }
    }

    fn increment_ly(&mut self, ints: &mut Interrupts) {
        let ly = self.lcd.ly as u16;
        let wy = self.lcd.wy as u16;
        if self.window_visible() && ly >= wy && ly < wy + SCREEN_HEIGHT as u16 {
            self.window_line = self.window_line.wrapping_add(1);
        }

        self.lcd.ly += 1;
        if self.lcd.ly >= LINES_PER_FRAME {
            self.lcd.ly = 0;
            self.window_line = 0;
        }
        self.update_lyc(ints);
    }

    /// Select up to ten sprites on this line, in OAM order, then sort.
    fn load_line_sprites(&mut self) {
        let cur_y = self.lcd.ly as u16 + 16;
        let height = self.lcd.obj_height() as u16;
        self.line_sprites.clear();

        for i in 0..TOTAL_SPRITES {
            let entry = OamEntry::from_oam(&self.oam, i);
            if entry.x == 0 {
                // x = 0 means not visible
                continue;
            }
            let y = entry.y as u16;
            if y <= cur_y && y + height > cur_y && !self.line_sprites.push(entry) {
                break;
            }
        }
        self.line_sprites.sort();
    }

    fn mode_oam(&mut self) {
        if self.line_ticks >= OAM_SCAN_TICKS {
            self.set_mode(LcdMode::Transfer);
            self.fifo.start_line();
        }
        if self.line_ticks == 1 {
            self.load_line_sprites();
        }
    }

    fn mode_xfer(&mut self, ints: &mut Interrupts) {
        self.pipeline_process();
        if self.fifo.pushed_x as usize >= SCREEN_WIDTH {
            self.fifo.reset();
            self.set_mode(LcdMode::HBlank);
            self.stat_interrupt(StatSource::HBlank, ints);
        }
    }

    fn mode_hblank(&mut self, ints: &mut Interrupts) {
        if self.line_ticks < TICKS_PER_LINE {
            return;
        }
        self.increment_ly(ints);
        if self.lcd.ly as usize >= SCREEN_HEIGHT {
            self.set_mode(LcdMode::VBlank);
            ints.request(Interrupt::VBlank);
            self.stat_interrupt(StatSource::VBlank, ints);
            self.frames = self.frames.wrapping_add(1);
            self.frame_ready = true;
        } else {
            self.set_mode(LcdMode::Oam);
            self.stat_interrupt(StatSource::Oam, ints);
        }
        self.line_ticks = 0;
    }

    fn mode_vblank(&mut self, ints: &mut Interrupts) {
        if self.line_ticks < TICKS_PER_LINE {
            return;
        }
        self.increment_ly(ints);
        if self.lcd.ly == 0 {
            self.set_mode(LcdMode::Oam);
            self.stat_interrupt(StatSource::Oam, ints);
        }
        self.line_ticks = 0;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
