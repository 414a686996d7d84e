//! Background/window/sprite pixel fetcher and the FIFO feeding the LCD.

use std::collections::VecDeque;

use super::{MAX_FETCHED_SPRITES, Ppu, SCREEN_HEIGHT, SCREEN_WIDTH};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Tile,
    Data0,
    Data1,
    Idle,
    Push,
}

/// Fetcher cursors and the queue of finished pixel colors.
#[derive(Debug, Default)]
pub struct PixelFifo {
    pub state: FetchState,
    queue: VecDeque<u32>,
    /// Pixels popped this line, including the ones dropped for SCX.
    pub line_x: u8,
    /// Pixels written to the framebuffer this line.
    pub pushed_x: u8,
    /// Next screen X the fetcher will fetch a tile for.
    pub fetch_x: u8,
    /// Screen X of the next pixel entering the queue.
    pub fifo_x: u8,
    /// Tile index, low bit-plane, high bit-plane.
    bgw_fetch_data: [u8; 3],
    /// Two bit-planes per fetched sprite.
    fetch_entry_data: [u8; MAX_FETCHED_SPRITES * 2],
    map_y: u8,
    map_x: u8,
    /// Byte offset of the tile row inside a tile (row * 2).
    tile_y: u8,
    /// The current tile came from the window map.
    window_fetch: bool,
}

impl PixelFifo {
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Start a new line of pixel transfer.
    pub fn start_line(&mut self) {
        self.state = FetchState::Tile;
        self.line_x = 0;
        self.fetch_x = 0;
        self.pushed_x = 0;
        self.fifo_x = 0;
        self.window_fetch = false;
    }

    pub fn reset(&mut self) {
        self.queue.clear();
    }
}

impl Ppu {
    /// One dot of pixel transfer: fetch on even dots, pop every dot.
    pub(super) fn pipeline_process(&mut self) {
        let line = self.lcd.ly.wrapping_add(self.lcd.scy);
        self.fifo.map_y = line;
        self.fifo.map_x = self.fifo.fetch_x.wrapping_add(self.lcd.scx);
        self.fifo.tile_y = (line % 8) * 2;

        if self.line_ticks & 1 == 0 {
            self.pipeline_fetch();
        }
        self.pipeline_push_pixel();
    }

    fn pipeline_fetch(&mut self) {
        match self.fifo.state {
            FetchState::Tile => {
                self.fetched_entry_count = 0;
                self.fifo.window_fetch = false;

                if self.lcd.bgw_enabled() {
                    let addr = self.lcd.bg_map_area()
                        + (self.fifo.map_x / 8) as u16
                        + (self.fifo.map_y / 8) as u16 * 32;
                    self.fifo.bgw_fetch_data[0] = self.tile_index_at(addr);
                    self.pipeline_load_window_tile();
                }

                if self.lcd.obj_enabled() && !self.line_sprites.is_empty() {
                    self.pipeline_load_sprite_tile();
                }

                self.fifo.state = FetchState::Data0;
                self.fifo.fetch_x = self.fifo.fetch_x.wrapping_add(8);
            }
            FetchState::Data0 => {
                self.fifo.bgw_fetch_data[1] = self.vram_at(self.bgw_row_addr());
                self.pipeline_load_sprite_data(0);
                self.fifo.state = FetchState::Data1;
            }
            FetchState::Data1 => {
                self.fifo.bgw_fetch_data[2] = self.vram_at(self.bgw_row_addr() + 1);
                self.pipeline_load_sprite_data(1);
                self.fifo.state = FetchState::Idle;
            }
            FetchState::Idle => {
                self.fifo.state = FetchState::Push;
            }
            FetchState::Push => {
                if self.pipeline_fifo_add() {
                    self.fifo.state = FetchState::Tile;
                }
            }
        }
    }

    /// Read a BG/window map entry, rebased so 0x8800 addressing can use
    /// the same `base + index * 16` formula as 0x8000.
    fn tile_index_at(&self, addr: u16) -> u8 {
        let tile = self.vram_at(addr);
        if self.lcd.bgw_data_area() == 0x8800 {
            tile.wrapping_add(128)
        } else {
            tile
        }
    }

    fn bgw_row_addr(&self) -> u16 {
        let row = if self.fifo.window_fetch {
            (self.window_line % 8) * 2
        } else {
            self.fifo.tile_y
        };
        self.lcd.bgw_data_area() + self.fifo.bgw_fetch_data[0] as u16 * 16 + row as u16
    }

    pub(super) fn window_visible(&self) -> bool {
        self.lcd.win_enabled() && self.lcd.wx <= 166 && (self.lcd.wy as usize) < SCREEN_HEIGHT
    }

    fn pipeline_load_window_tile(&mut self) {
        if !self.window_visible() {
            return;
        }

        let x = self.fifo.fetch_x as i32 + 7;
        let wx = self.lcd.wx as i32;
        let ly = self.lcd.ly as i32;
        let wy = self.lcd.wy as i32;
        let in_x = x >= wx && x < wx + SCREEN_HEIGHT as i32 + 14;
        let in_y = ly >= wy && ly < wy + SCREEN_WIDTH as i32;
        if in_x && in_y {
            let w_tile_y = (self.window_line / 8) as u16;
            let addr = self.lcd.win_map_area() + ((x - wx) / 8) as u16 + w_tile_y * 32;
            self.fifo.bgw_fetch_data[0] = self.tile_index_at(addr);
            self.fifo.window_fetch = true;
        }
    }

    /// Pick up to three line sprites overlapping the tile being fetched.
    fn pipeline_load_sprite_tile(&mut self) {
        let fetch_x = self.fifo.fetch_x as i32;
        let fine_x = (self.lcd.scx % 8) as i32;
        for entry in self.line_sprites.as_slice() {
            let sp_x = (entry.x as i32 - 8) + fine_x;
            let left_inside = sp_x >= fetch_x && sp_x < fetch_x + 8;
            let right_inside = sp_x + 8 >= fetch_x && sp_x + 8 < fetch_x + 8;
            if left_inside || right_inside {
                self.fetched_entries[self.fetched_entry_count] = *entry;
                self.fetched_entry_count += 1;
            }
            if self.fetched_entry_count >= MAX_FETCHED_SPRITES {
                break;
            }
        }
    }

    fn pipeline_load_sprite_data(&mut self, offset: u8) {
        let ly = self.lcd.ly;
        let height = self.lcd.obj_height();
        for i in 0..self.fetched_entry_count {
            let entry = self.fetched_entries[i];
            let mut ty = ly.wrapping_add(16).wrapping_sub(entry.y).wrapping_mul(2);
            if entry.y_flip() {
                ty = (height * 2 - 2).wrapping_sub(ty);
            }
            let mut tile = entry.tile;
            if height == 16 {
                tile &= !1;
            }
            let addr = 0x8000 + tile as u16 * 16 + ty as u16 + offset as u16;
            self.fifo.fetch_entry_data[i * 2 + offset as usize] = self.vram_at(addr);
        }
    }

    /// Overlay the fetched sprites on one background pixel.
    fn fetch_sprite_pixels(&self, mut color: u32, bg_index: u8) -> u32 {
        let fifo_x = self.fifo.fifo_x as i32;
        let fine_x = (self.lcd.scx % 8) as i32;
        for (i, entry) in self.fetched_entries[..self.fetched_entry_count]
            .iter()
            .enumerate()
        {
            let sp_x = (entry.x as i32 - 8) + fine_x;
            if sp_x + 8 < fifo_x {
                continue;
            }
            let offset = fifo_x - sp_x;
            if !(0..=7).contains(&offset) {
                continue;
            }
            let bit = if entry.x_flip() { offset } else { 7 - offset };
            let lo = (self.fifo.fetch_entry_data[i * 2] >> bit) & 1;
            let hi = ((self.fifo.fetch_entry_data[i * 2 + 1] >> bit) & 1) << 1;
            let index = (lo | hi) as usize;
            if index == 0 {
                // transparent
                continue;
            }
            if !entry.bg_priority() || bg_index == 0 {
                color = if entry.palette1() {
                    self.lcd.sp2_colors[index]
                } else {
                    self.lcd.sp1_colors[index]
                };
                break;
            }
        }
        color
    }

    /// Decode the fetched tile row into eight colors. Fails while the
    /// queue still holds more than one tile's worth of pixels.
    fn pipeline_fifo_add(&mut self) -> bool {
        if self.fifo.queue.len() > 8 {
            return false;
        }

        let x = self.fifo.fetch_x as i32 - (8 - (self.lcd.scx % 8) as i32);
        for i in 0..8 {
            let bit = 7 - i;
            let lo = (self.fifo.bgw_fetch_data[1] >> bit) & 1;
            let hi = ((self.fifo.bgw_fetch_data[2] >> bit) & 1) << 1;
            let mut bg_index = lo | hi;
            if !self.lcd.bgw_enabled() {
                bg_index = 0;
            }
            let mut color = self.lcd.bg_colors[bg_index as usize];
            if self.lcd.obj_enabled() {
                color = self.fetch_sprite_pixels(color, bg_index);
            }
            if x >= 0 {
                self.fifo.queue.push_back(color);
                self.fifo.fifo_x = self.fifo.fifo_x.wrapping_add(1);
            }
        }
        true
    }

    fn pipeline_push_pixel(&mut self) {
        if self.fifo.queue.len() <= 8 {
            return;
        }
        let Some(pixel) = self.fifo.queue.pop_front() else {
            return;
        };
        if self.fifo.line_x >= self.lcd.scx % 8 {
            let idx = self.fifo.pushed_x as usize + self.lcd.ly as usize * SCREEN_WIDTH;
            if let Some(slot) = self.framebuffer.get_mut(idx) {
                *slot = pixel;
            }
            self.fifo.pushed_x += 1;
        }
        self.fifo.line_x = self.fifo.line_x.wrapping_add(1);
    }
}
