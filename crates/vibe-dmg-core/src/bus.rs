//! The address bus: owns every memory-mapped device and advances them in
//! lock-step with the CPU.

use log::{debug, info};

use crate::cartridge::Cartridge;
use crate::clock::{Clock, DOTS_PER_M_CYCLE};
use crate::cpu::MemoryBus;
use crate::diagnostics::{self, DiagnosticEvent, DiagnosticsSink, Region};
use crate::dma::Dma;
use crate::hardware::DmgRevision;
use crate::input::{Joypad, JoypadHandle};
use crate::interrupts::Interrupts;
use crate::memory::{HighRam, WorkRam};
use crate::ppu::Ppu;
use crate::serial::Serial;
use crate::timer::Timer;

pub const BOOT_ROM_SIZE: usize = 0x100;

// Sound registers after the DMG boot ROM, from NR10 (0xFF10) to 0xFF3F
// (gbdev.io/pandocs/Power_Up_State.html). Unlisted registers stay zero.
const POST_BOOT_SOUND: [(u16, u8); 15] = [
    (0xFF10, 0x80),
    (0xFF11, 0xBF),
    (0xFF12, 0xF3),
    (0xFF14, 0xBF),
    (0xFF16, 0x3F),
    (0xFF19, 0xBF),
    (0xFF1A, 0x7F),
    (0xFF1B, 0xFF),
    (0xFF1C, 0x9F),
    (0xFF1E, 0xBF),
    (0xFF20, 0xFF),
    (0xFF23, 0xBF),
    (0xFF24, 0x77),
    (0xFF25, 0xF3),
    (0xFF26, 0xF1),
];

pub struct Bus {
    pub cart: Option<Cartridge>,
    pub wram: WorkRam,
    pub hram: HighRam,
    pub ints: Interrupts,
    pub timer: Timer,
    pub serial: Serial,
    pub joypad: Joypad,
    pub dma: Dma,
    pub ppu: Ppu,
    pub clock: Clock,
    boot_rom: Option<Box<[u8; BOOT_ROM_SIZE]>>,
    /// Raw storage for the sound registers; no APU is attached.
    sound: [u8; 0x30],
    diagnostics: Option<Box<dyn DiagnosticsSink>>,
}

impl Bus {
    pub fn new(joypad: JoypadHandle) -> Self {
        Self {
            cart: None,
            wram: WorkRam::new(),
            hram: HighRam::new(),
            ints: Interrupts::default(),
            timer: Timer::new(),
            serial: Serial::new(),
            joypad: Joypad::new(joypad),
            dma: Dma::new(),
            ppu: Ppu::new(),
            clock: Clock::default(),
            boot_rom: None,
            sound: [0; 0x30],
            diagnostics: None,
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    /// Map a boot ROM over 0x0000..=0x00FF until 0xFF50 is written.
    /// Images shorter than 256 bytes are padded with 0xFF.
    pub fn load_boot_rom(&mut self, data: &[u8]) {
        let mut rom = Box::new([0xFF; BOOT_ROM_SIZE]);
        for (d, s) in rom.iter_mut().zip(data) {
            *d = *s;
        }
        self.boot_rom = Some(rom);
    }

    pub fn boot_rom_mapped(&self) -> bool {
        self.boot_rom.is_some()
    }

    /// I/O state the boot ROM leaves behind on `revision`.
    pub fn apply_boot_state(&mut self, revision: DmgRevision) {
        self.boot_rom = None;
        self.ints.write_flag(0xE1);
        self.timer.div = revision.boot_div();
        self.ppu.apply_boot_state();
        self.joypad.write(0x00);
        self.sound = [0; 0x30];
        for (addr, val) in POST_BOOT_SOUND {
            self.sound[(addr - 0xFF10) as usize] = val;
        }
    }

    pub fn set_diagnostics_sink(&mut self, sink: Option<Box<dyn DiagnosticsSink>>) {
        self.diagnostics = sink;
    }

    pub fn take_diagnostics_sink(&mut self) -> Option<Box<dyn DiagnosticsSink>> {
        self.diagnostics.take()
    }

    pub(crate) fn emit(&mut self, event: DiagnosticEvent) {
        diagnostics::emit(&mut self.diagnostics, event);
    }

    /// CPU-visible read.
    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0xFE00..=0xFE9F if self.dma.active() => {
                self.emit(DiagnosticEvent::BlockedRead {
                    addr,
                    region: Region::Oam,
                });
                0xFF
            }
            _ => self.read_unblocked(addr),
        }
    }

    /// Read as seen by the DMA engine, which is not locked out of OAM.
    fn read_unblocked(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x00FF if self.boot_rom.is_some() => {
                self.boot_rom.as_ref().map_or(0xFF, |rom| rom[addr as usize])
            }
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_ref().map_or(0xFF, |cart| cart.read(addr))
            }
            0x8000..=0x9FFF => self.ppu.read_vram(addr),
            0xC000..=0xDFFF => self.wram.read(addr),
            0xE000..=0xFDFF => 0x00,
            0xFE00..=0xFE9F => self.ppu.read_oam(addr),
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.joypad.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.ints.read_flag(),
            0xFF10..=0xFF3F => self.sound[(addr - 0xFF10) as usize],
            0xFF46 => self.dma.read(),
            0xFF40..=0xFF4B => self.ppu.read_reg(addr),
            0xFF50 => {
                if self.boot_rom.is_some() {
                    0xFE
                } else {
                    0xFF
                }
            }
            0xFF80..=0xFFFE => self.hram.read(addr),
            0xFFFF => self.ints.enable,
            _ => 0xFF,
        }
    }

    /// CPU-visible write.
    pub fn write(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                let applied = self
                    .cart
                    .as_mut()
                    .is_some_and(|cart| cart.write(addr, val));
                if !applied {
                    let region = if addr < 0x8000 {
                        Region::Rom
                    } else {
                        Region::CartRam
                    };
                    self.ignored_write(addr, val, region);
                }
            }
            0x8000..=0x9FFF => self.ppu.write_vram(addr, val),
            0xC000..=0xDFFF => self.wram.write(addr, val),
            0xE000..=0xFDFF => self.ignored_write(addr, val, Region::EchoRam),
            0xFE00..=0xFE9F => {
                if self.dma.active() {
                    self.ignored_write(addr, val, Region::Oam);
                } else {
                    self.ppu.write_oam(addr, val);
                }
            }
            0xFEA0..=0xFEFF => self.ignored_write(addr, val, Region::Unusable),
            0xFF00 => self.joypad.write(val),
            0xFF01 | 0xFF02 => {
                if let Some(byte) = self.serial.write(addr, val, &mut self.ints) {
                    self.emit(DiagnosticEvent::SerialByte(byte));
                }
            }
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.ints),
            0xFF0F => self.ints.write_flag(val),
            0xFF10..=0xFF3F => self.sound[(addr - 0xFF10) as usize] = val,
            0xFF46 => self.dma.start(val),
            0xFF40..=0xFF4B => self.ppu.write_reg(addr, val, &mut self.ints),
            0xFF50 => {
                if val != 0 && self.boot_rom.take().is_some() {
                    info!("boot ROM unmapped");
                }
            }
            0xFF80..=0xFFFE => self.hram.write(addr, val),
            0xFFFF => self.ints.enable = val,
            _ => self.ignored_write(addr, val, Region::Io),
        }
    }

    fn ignored_write(&mut self, addr: u16, value: u8, region: Region) {
        self.emit(DiagnosticEvent::IgnoredWrite {
            addr,
            value,
            region,
        });
    }

    /// Advance every device by one machine cycle: four dots of PPU and
    /// timer, one DMA byte, one joypad sample.
    pub fn tick_m_cycle(&mut self) {
        for _ in 0..DOTS_PER_M_CYCLE {
            self.clock.advance();
            self.ppu.tick(&mut self.ints);
            self.timer.tick(&mut self.ints);
        }
        if let Some(copy) = self.dma.tick() {
            let val = self.read_unblocked(copy.src);
            self.ppu.dma_write(copy.index, val);
        }
        self.joypad.tick(&mut self.ints);
    }

    /// STOP resets the divider.
    pub fn enter_stop(&mut self) {
        debug!("STOP at dot {}", self.clock.dots());
        self.timer.reset_div(&mut self.ints);
    }
}

impl MemoryBus for Bus {
    fn read(&mut self, addr: u16) -> u8 {
        Bus::read(self, addr)
    }

    fn write(&mut self, addr: u16, val: u8) {
        Bus::write(self, addr, val)
    }

    fn tick_m_cycle(&mut self) {
        Bus::tick_m_cycle(self)
    }

    fn interrupts(&mut self) -> &mut Interrupts {
        &mut self.ints
    }

    fn stop(&mut self) {
        self.enter_stop();
    }

    fn buttons_held(&self) -> bool {
        self.joypad.handle().any_pressed()
    }
}
