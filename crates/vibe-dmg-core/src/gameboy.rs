use crate::{
    bus::Bus,
    cartridge::Cartridge,
    clock::{DOTS_PER_FRAME, DOTS_PER_M_CYCLE},
    cpu::Cpu,
    diagnostics::{DiagnosticEvent, DiagnosticsSink},
    error::{CoreError, Result},
    hardware::{BootMode, DmgRevision, MachineConfig},
    input::JoypadHandle,
};

/// A complete DMG: the CPU plus the bus that owns every other device.
pub struct GameBoy {
    pub cpu: Cpu,
    pub bus: Bus,
    pub config: MachineConfig,
    boot_rom: Option<Vec<u8>>,
    joypad: JoypadHandle,
}

impl GameBoy {
    /// Revision C, post-boot state.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        let joypad = JoypadHandle::default();
        let mut gb = Self {
            cpu: Cpu::new(),
            bus: Bus::new(joypad.clone()),
            config,
            boot_rom: None,
            joypad,
        };
        gb.reset();
        gb
    }

    pub fn revision(&self) -> DmgRevision {
        self.config.revision
    }

    pub fn load_cartridge(&mut self, cart: Cartridge) {
        self.bus.load_cart(cart);
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.bus.cart.as_ref()
    }

    /// Map a boot ROM at 0x0000 and restart from the power-on state so it
    /// runs first.
    pub fn load_boot_rom(&mut self, data: &[u8]) {
        self.boot_rom = Some(data.to_vec());
        self.config.boot_mode = BootMode::PowerOn;
        self.reset();
    }

    /// Restart the machine per `config`, keeping the cartridge, boot ROM,
    /// joypad handle and diagnostics sink.
    pub fn reset(&mut self) {
        let cart = self.bus.cart.take();
        let sink = self.bus.take_diagnostics_sink();
        self.bus = Bus::new(self.joypad.clone());
        self.bus.cart = cart;
        self.bus.set_diagnostics_sink(sink);

        let revision = self.config.revision;
        match self.config.boot_mode {
            BootMode::PostBoot => {
                self.cpu = Cpu::post_boot(revision);
                self.bus.apply_boot_state(revision);
            }
            BootMode::PowerOn => {
                self.cpu = Cpu::new();
                if let Some(rom) = &self.boot_rom {
                    self.bus.load_boot_rom(rom);
                }
            }
        }
    }

    pub fn set_diagnostics_sink(&mut self, sink: Box<dyn DiagnosticsSink>) {
        self.bus.set_diagnostics_sink(Some(sink));
    }

    pub fn clear_diagnostics_sink(&mut self) {
        self.bus.set_diagnostics_sink(None);
    }

    /// Execute one instruction (or one idle cycle while halted) and return
    /// the machine cycles it took.
    pub fn step(&mut self) -> Result<u32> {
        let first_lockup = self.cpu.locked_up().is_none();
        let result = self.cpu.step(&mut self.bus);
        if let Err(CoreError::IllegalOpcode { opcode, pc }) = result {
            if first_lockup {
                self.bus.emit(DiagnosticEvent::IllegalOpcode { opcode, pc });
            }
        }
        result
    }

    /// Run until the dot counter reaches the next frame boundary. The
    /// boundary is absolute, so an instruction that overshoots it shortens
    /// the following frame instead of shifting every later one.
    pub fn step_frame(&mut self) -> Result<()> {
        let target = self.bus.clock.next_frame_boundary();
        self.run_until(target)
    }

    /// Run for at least `dots` dots.
    pub fn run_dots(&mut self, dots: u64) -> Result<()> {
        let target = self.bus.clock.dots() + dots;
        self.run_until(target)
    }

    fn run_until(&mut self, target: u64) -> Result<()> {
        while self.bus.clock.dots() < target {
            self.step()?;
        }
        Ok(())
    }

    pub fn dots(&self) -> u64 {
        self.bus.clock.dots()
    }

    /// Whole frames' worth of dots elapsed since reset.
    pub fn frame_count(&self) -> u64 {
        self.bus.clock.dots() / DOTS_PER_FRAME
    }

    pub fn joypad(&self) -> JoypadHandle {
        self.joypad.clone()
    }

    pub fn serial_output(&self) -> &[u8] {
        self.bus.serial.peek_output()
    }

    pub fn take_serial_output(&mut self) -> Vec<u8> {
        self.bus.serial.take_output()
    }

    pub fn framebuffer(&self) -> &[u32] {
        self.bus.ppu.framebuffer().as_slice()
    }

    /// Owned copy of the framebuffer for handing to another thread.
    pub fn frame_snapshot(&self) -> Vec<u32> {
        self.framebuffer().to_vec()
    }

    pub fn debug_state(&self) -> String {
        format!(
            "{} LY:{:02X} LCDC:{:02X} IF:{:02X} IE:{:02X} DOT:{} ({} M)",
            self.cpu.debug_state(),
            self.bus.ppu.ly(),
            self.bus.ppu.lcd.lcdc,
            self.bus.ints.read_flag(),
            self.bus.ints.enable,
            self.bus.clock.dots(),
            self.bus.clock.dots() / DOTS_PER_M_CYCLE
        )
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
