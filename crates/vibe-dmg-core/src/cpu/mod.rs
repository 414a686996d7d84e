//! SM83 CPU.
//!
//! The CPU advances the rest of the machine itself: every memory access and
//! every internal delay costs one M-cycle and calls
//! [`MemoryBus::tick_m_cycle`] before the instruction continues, so devices
//! observe accesses at the right time.

pub mod alu;
mod execute;
pub mod instruction;
pub mod registers;

#[cfg(feature = "cpu-trace")]
use log::trace;

use crate::error::{CoreError, Result};
use crate::hardware::{BootRegisters, DmgRevision};
use crate::interrupts::Interrupts;
use instruction::{INSTRUCTIONS, Instruction};
pub use registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg, Registers};

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

/// Everything the CPU can see of the machine.
pub trait MemoryBus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, val: u8);
    /// Advance every other device by one M-cycle (four dots).
    fn tick_m_cycle(&mut self);
    fn interrupts(&mut self) -> &mut Interrupts;
    /// Entered STOP; the real bus resets DIV here.
    fn stop(&mut self) {}
    /// A joypad button is held, which ends STOP.
    fn buttons_held(&self) -> bool {
        false
    }
}

/// Per-instruction scratch state plus the interrupt latches.
#[derive(Clone, Copy, Debug)]
pub struct ExecutionContext {
    pub fetched_data: u16,
    pub mem_dest: u16,
    pub dest_is_mem: bool,
    pub cur_opcode: u8,
    pub cur_inst: Instruction,
    pub halted: bool,
    pub stopped: bool,
    pub ime: bool,
    /// Set by EI; IME turns on after the next instruction.
    pub enabling_ime: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            fetched_data: 0,
            mem_dest: 0,
            dest_is_mem: false,
            cur_opcode: 0,
            cur_inst: INSTRUCTIONS[0],
            halted: false,
            stopped: false,
            ime: false,
            enabling_ime: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Cpu {
    pub regs: Registers,
    pub ctx: ExecutionContext,
    /// M-cycles executed since power on.
    pub cycles: u64,
    /// Opcode and address of the illegal instruction that hung the CPU.
    lockup: Option<(u8, u16)>,
}

impl Cpu {
    /// Power-on state: every register zero, execution at 0x0000.
    pub fn new() -> Self {
        Self::default()
    }

    /// State the boot ROM leaves behind on the given revision.
    pub fn post_boot(revision: DmgRevision) -> Self {
        let BootRegisters {
            a,
            f,
            b,
            c,
            d,
            e,
            h,
            l,
        } = revision.boot_registers();
        Self {
            regs: Registers {
                a,
                f: f & 0xF0,
                b,
                c,
                d,
                e,
                h,
                l,
                sp: BOOT_SP,
                pc: BOOT_PC,
            },
            ..Self::default()
        }
    }

    pub fn locked_up(&self) -> Option<(u8, u16)> {
        self.lockup
    }

    /// Run one instruction (or one idle cycle while halted or stopped),
    /// then service an interrupt if IME allows it. Returns the M-cycles
    /// consumed.
    pub fn step<B: MemoryBus>(&mut self, bus: &mut B) -> Result<u32> {
        if let Some((opcode, pc)) = self.lockup {
            return Err(CoreError::IllegalOpcode { opcode, pc });
        }
        let start = self.cycles;

        if self.ctx.stopped {
            self.tick(bus);
            if bus.buttons_held() {
                self.ctx.stopped = false;
            }
            return Ok((self.cycles - start) as u32);
        }

        if self.ctx.halted {
            self.tick(bus);
            if bus.interrupts().requested() != 0 {
                self.ctx.halted = false;
            }
        } else {
            let pc = self.regs.pc;
            let opcode = self.fetch8(bus);
            let inst = INSTRUCTIONS[opcode as usize];
            self.ctx.cur_opcode = opcode;
            self.ctx.cur_inst = inst;

            if inst.is_illegal() {
                self.lockup = Some((opcode, pc));
                return Err(CoreError::IllegalOpcode { opcode, pc });
            }

            #[cfg(feature = "cpu-trace")]
            trace!("{:04X}: {:02X} {:?} {}", pc, opcode, inst.kind, self.debug_state());

            self.fetch_data(bus);
            self.execute(bus);
        }

        if self.ctx.ime {
            self.handle_interrupts(bus);
            self.ctx.enabling_ime = false;
        }
        if self.ctx.enabling_ime {
            self.ctx.ime = true;
        }

        Ok((self.cycles - start) as u32)
    }

    fn handle_interrupts<B: MemoryBus>(&mut self, bus: &mut B) {
        let Some(kind) = bus.interrupts().highest_pending() else {
            return;
        };
        bus.interrupts().clear(kind);
        self.ctx.ime = false;
        self.ctx.halted = false;

        self.tick(bus);
        self.tick(bus);
        let pc = self.regs.pc;
        self.push16(bus, pc);
        self.tick(bus);
        self.regs.pc = kind.vector();
    }

    fn tick<B: MemoryBus>(&mut self, bus: &mut B) {
        bus.tick_m_cycle();
        self.cycles += 1;
    }

    fn read8<B: MemoryBus>(&mut self, bus: &mut B, addr: u16) -> u8 {
        let val = bus.read(addr);
        self.tick(bus);
        val
    }

    fn write8<B: MemoryBus>(&mut self, bus: &mut B, addr: u16, val: u8) {
        bus.write(addr, val);
        self.tick(bus);
    }

    fn fetch8<B: MemoryBus>(&mut self, bus: &mut B) -> u8 {
        let val = self.read8(bus, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        val
    }

    fn fetch16<B: MemoryBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.fetch8(bus);
        let hi = self.fetch8(bus);
        u16::from_le_bytes([lo, hi])
    }

    fn write16<B: MemoryBus>(&mut self, bus: &mut B, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write8(bus, addr, lo);
        self.write8(bus, addr.wrapping_add(1), hi);
    }

    fn push16<B: MemoryBus>(&mut self, bus: &mut B, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, hi);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write8(bus, self.regs.sp, lo);
    }

    fn pop16<B: MemoryBus>(&mut self, bus: &mut B) -> u16 {
        let lo = self.read8(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.read8(bus, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    pub fn debug_state(&self) -> String {
        format!(
            "AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} PC:{:04X} SP:{:04X} IME:{} CY:{}",
            self.regs.af(),
            self.regs.bc(),
            self.regs.de(),
            self.regs.hl(),
            self.regs.pc,
            self.regs.sp,
            self.ctx.ime as u8,
            self.cycles
        )
    }
}
