//! Operand fetch and instruction execution.

use super::instruction::{AddrMode, CB_INSTRUCTIONS, Cond, InstrKind};
use super::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Reg};
use super::{Cpu, MemoryBus, alu};

impl Cpu {
    /// Resolve the current instruction's source operand into
    /// `ctx.fetched_data` and, for memory destinations, the target address
    /// into `ctx.mem_dest`.
    pub(super) fn fetch_data<B: MemoryBus>(&mut self, bus: &mut B) {
        let inst = self.ctx.cur_inst;
        self.ctx.mem_dest = 0;
        self.ctx.dest_is_mem = false;

        let reg1 = inst.reg1.map_or(0, |r| self.regs.read(r));
        let reg2 = inst.reg2.map_or(0, |r| self.regs.read(r));

        match inst.mode {
            AddrMode::Imp => {}
            AddrMode::R => self.ctx.fetched_data = reg1,
            AddrMode::R_R => self.ctx.fetched_data = reg2,
            AddrMode::R_D8 | AddrMode::D8 | AddrMode::R_A8 | AddrMode::HL_SPR => {
                self.ctx.fetched_data = self.fetch8(bus) as u16;
            }
            AddrMode::R_D16 | AddrMode::D16 => {
                self.ctx.fetched_data = self.fetch16(bus);
            }
            AddrMode::MR_R => {
                self.ctx.fetched_data = reg2;
                self.ctx.mem_dest = if inst.reg1 == Some(Reg::C) {
                    0xFF00 | reg1
                } else {
                    reg1
                };
                self.ctx.dest_is_mem = true;
            }
            AddrMode::R_MR => {
                let addr = if inst.reg2 == Some(Reg::C) {
                    0xFF00 | reg2
                } else {
                    reg2
                };
                self.ctx.fetched_data = self.read8(bus, addr) as u16;
            }
            AddrMode::R_HLI | AddrMode::R_HLD => {
                let hl = self.regs.hl();
                self.ctx.fetched_data = self.read8(bus, hl) as u16;
                self.regs.set_hl(step_hl(hl, inst.mode == AddrMode::R_HLI));
            }
            AddrMode::HLI_R | AddrMode::HLD_R => {
                let hl = self.regs.hl();
                self.ctx.fetched_data = reg2;
                self.ctx.mem_dest = hl;
                self.ctx.dest_is_mem = true;
                self.regs.set_hl(step_hl(hl, inst.mode == AddrMode::HLI_R));
            }
            AddrMode::A8_R => {
                self.ctx.mem_dest = 0xFF00 | self.fetch8(bus) as u16;
                self.ctx.dest_is_mem = true;
                self.ctx.fetched_data = reg2;
            }
            AddrMode::A16_R => {
                self.ctx.mem_dest = self.fetch16(bus);
                self.ctx.dest_is_mem = true;
                self.ctx.fetched_data = reg2;
            }
            AddrMode::MR_D8 => {
                self.ctx.fetched_data = self.fetch8(bus) as u16;
                self.ctx.mem_dest = reg1;
                self.ctx.dest_is_mem = true;
            }
            AddrMode::MR => {
                self.ctx.mem_dest = reg1;
                self.ctx.dest_is_mem = true;
                self.ctx.fetched_data = self.read8(bus, reg1) as u16;
            }
            AddrMode::R_A16 => {
                let addr = self.fetch16(bus);
                self.ctx.fetched_data = self.read8(bus, addr) as u16;
            }
        }
    }

    pub(super) fn execute<B: MemoryBus>(&mut self, bus: &mut B) {
        let inst = self.ctx.cur_inst;
        let data = self.ctx.fetched_data;
        let f = self.regs.f;

        match inst.kind {
            InstrKind::Nop => {}
            InstrKind::Ld => self.exec_ld(bus),
            InstrKind::Ldh => {
                if inst.reg1 == Some(Reg::A) {
                    self.regs.a = self.read8(bus, 0xFF00 | data);
                } else {
                    self.write8(bus, self.ctx.mem_dest, self.regs.a);
                }
            }
            InstrKind::Inc | InstrKind::Dec => self.exec_inc_dec(bus),
            InstrKind::Rlca => self.rotate_a(alu::rlc(self.regs.a)),
            InstrKind::Rrca => self.rotate_a(alu::rrc(self.regs.a)),
            InstrKind::Rla => self.rotate_a(alu::rl(self.regs.a, f)),
            InstrKind::Rra => self.rotate_a(alu::rr(self.regs.a, f)),
            InstrKind::Add => self.exec_add(bus),
            InstrKind::Adc => self.set_a(alu::add8(self.regs.a, data as u8, f & FLAG_C != 0)),
            InstrKind::Sub => self.set_a(alu::sub8(self.regs.a, data as u8, false)),
            InstrKind::Sbc => self.set_a(alu::sub8(self.regs.a, data as u8, f & FLAG_C != 0)),
            InstrKind::And => self.set_a(alu::and8(self.regs.a, data as u8)),
            InstrKind::Xor => self.set_a(alu::xor8(self.regs.a, data as u8)),
            InstrKind::Or => self.set_a(alu::or8(self.regs.a, data as u8)),
            InstrKind::Cp => {
                let (_, flags) = alu::sub8(self.regs.a, data as u8, false);
                self.regs.f = flags;
            }
            InstrKind::Daa => self.set_a(alu::daa(self.regs.a, f)),
            InstrKind::Cpl => {
                self.regs.a = !self.regs.a;
                self.regs.f = f | FLAG_N | FLAG_H;
            }
            InstrKind::Scf => self.regs.f = (f & FLAG_Z) | FLAG_C,
            InstrKind::Ccf => self.regs.f = (f & FLAG_Z) | ((f & FLAG_C) ^ FLAG_C),
            InstrKind::Jr => {
                if self.check_cond(inst.cond) {
                    let offset = data as u8 as i8;
                    self.regs.pc = self.regs.pc.wrapping_add(offset as u16);
                    self.tick(bus);
                }
            }
            InstrKind::Jp => {
                if self.check_cond(inst.cond) {
                    self.regs.pc = data;
                    // JP HL loads PC without an extra cycle
                    if inst.mode != AddrMode::R {
                        self.tick(bus);
                    }
                }
            }
            InstrKind::Call => {
                if self.check_cond(inst.cond) {
                    self.tick(bus);
                    let pc = self.regs.pc;
                    self.push16(bus, pc);
                    self.regs.pc = data;
                }
            }
            InstrKind::Ret => self.exec_ret(bus),
            InstrKind::Reti => {
                self.ctx.ime = true;
                self.exec_ret(bus);
            }
            InstrKind::Rst => {
                self.tick(bus);
                let pc = self.regs.pc;
                self.push16(bus, pc);
                self.regs.pc = inst.param as u16;
            }
            InstrKind::Push => {
                self.tick(bus);
                self.push16(bus, data);
            }
            InstrKind::Pop => {
                let val = self.pop16(bus);
                if let Some(reg) = inst.reg1 {
                    self.regs.write(reg, val);
                }
            }
            InstrKind::Halt => self.ctx.halted = true,
            InstrKind::Stop => {
                // STOP is two bytes long; the second is ignored
                self.fetch8(bus);
                bus.stop();
                self.ctx.stopped = true;
            }
            InstrKind::Di => {
                self.ctx.ime = false;
                self.ctx.enabling_ime = false;
            }
            InstrKind::Ei => self.ctx.enabling_ime = true,
            InstrKind::Cb => self.exec_cb(bus, data as u8),
            // decode-only kinds; step() never dispatches them here
            InstrKind::Rlc
            | InstrKind::Rrc
            | InstrKind::Rl
            | InstrKind::Rr
            | InstrKind::Sla
            | InstrKind::Sra
            | InstrKind::Swap
            | InstrKind::Srl
            | InstrKind::Bit
            | InstrKind::Res
            | InstrKind::Set
            | InstrKind::Illegal => {}
        }
    }

    fn check_cond(&self, cond: Cond) -> bool {
        match cond {
            Cond::Always => true,
            Cond::NZ => !self.regs.flag(FLAG_Z),
            Cond::Z => self.regs.flag(FLAG_Z),
            Cond::NC => !self.regs.flag(FLAG_C),
            Cond::C => self.regs.flag(FLAG_C),
        }
    }

    fn set_a(&mut self, (val, flags): (u8, u8)) {
        self.regs.a = val;
        self.regs.f = flags;
    }

    /// RLCA/RRCA/RLA/RRA always clear Z.
    fn rotate_a(&mut self, (val, flags): (u8, u8)) {
        self.regs.a = val;
        self.regs.f = flags & !FLAG_Z;
    }

    fn exec_ld<B: MemoryBus>(&mut self, bus: &mut B) {
        let inst = self.ctx.cur_inst;
        let data = self.ctx.fetched_data;

        if self.ctx.dest_is_mem {
            if inst.reg2.is_some_and(Reg::is_16bit) {
                self.write16(bus, self.ctx.mem_dest, data);
            } else {
                self.write8(bus, self.ctx.mem_dest, data as u8);
            }
            return;
        }

        if inst.mode == AddrMode::HL_SPR {
            let (val, flags) = alu::add_sp_e8(self.regs.sp, data as u8 as i8);
            self.regs.set_hl(val);
            self.regs.f = flags;
            self.tick(bus);
            return;
        }

        // LD SP,HL
        if inst.mode == AddrMode::R_R && inst.reg1 == Some(Reg::SP) {
            self.tick(bus);
        }

        if let Some(reg) = inst.reg1 {
            self.regs.write(reg, data);
        }
    }

    fn exec_inc_dec<B: MemoryBus>(&mut self, bus: &mut B) {
        let inst = self.ctx.cur_inst;
        let inc = inst.kind == InstrKind::Inc;
        let data = self.ctx.fetched_data;

        if inst.mode == AddrMode::MR {
            let (val, flags) = if inc {
                alu::inc8(data as u8, self.regs.f)
            } else {
                alu::dec8(data as u8, self.regs.f)
            };
            self.regs.f = flags;
            self.write8(bus, self.ctx.mem_dest, val);
            return;
        }

        let Some(reg) = inst.reg1 else {
            return;
        };
        if reg.is_16bit() {
            let val = if inc {
                data.wrapping_add(1)
            } else {
                data.wrapping_sub(1)
            };
            self.regs.write(reg, val);
            self.tick(bus);
        } else {
            let (val, flags) = if inc {
                alu::inc8(data as u8, self.regs.f)
            } else {
                alu::dec8(data as u8, self.regs.f)
            };
            self.regs.write(reg, val as u16);
            self.regs.f = flags;
        }
    }

    fn exec_add<B: MemoryBus>(&mut self, bus: &mut B) {
        let inst = self.ctx.cur_inst;
        let data = self.ctx.fetched_data;

        match inst.reg1 {
            Some(Reg::HL) => {
                let (val, flags) = alu::add16(self.regs.hl(), data, self.regs.f);
                self.regs.set_hl(val);
                self.regs.f = flags;
                self.tick(bus);
            }
            Some(Reg::SP) => {
                let (val, flags) = alu::add_sp_e8(self.regs.sp, data as u8 as i8);
                self.regs.sp = val;
                self.regs.f = flags;
                self.tick(bus);
                self.tick(bus);
            }
            _ => self.set_a(alu::add8(self.regs.a, data as u8, false)),
        }
    }

    fn exec_ret<B: MemoryBus>(&mut self, bus: &mut B) {
        let cond = self.ctx.cur_inst.cond;
        if cond != Cond::Always {
            self.tick(bus);
        }
        if self.check_cond(cond) {
            self.regs.pc = self.pop16(bus);
            self.tick(bus);
        }
    }

    fn exec_cb<B: MemoryBus>(&mut self, bus: &mut B, op: u8) {
        let inst = CB_INSTRUCTIONS[op as usize];
        let in_memory = inst.mode == AddrMode::MR;
        let hl = self.regs.hl();
        let reg = inst.reg1.unwrap_or(Reg::A);

        let value = if in_memory {
            self.read8(bus, hl)
        } else {
            self.regs.read(reg) as u8
        };
        let f = self.regs.f;
        let bit = inst.param;

        let result = match inst.kind {
            InstrKind::Bit => {
                self.regs.f = alu::bit(value, bit, f);
                return;
            }
            InstrKind::Res => value & !(1 << bit),
            InstrKind::Set => value | (1 << bit),
            kind => {
                let (val, flags) = match kind {
                    InstrKind::Rlc => alu::rlc(value),
                    InstrKind::Rrc => alu::rrc(value),
                    InstrKind::Rl => alu::rl(value, f),
                    InstrKind::Rr => alu::rr(value, f),
                    InstrKind::Sla => alu::sla(value),
                    InstrKind::Sra => alu::sra(value),
                    InstrKind::Swap => alu::swap(value),
                    _ => alu::srl(value),
                };
                self.regs.f = flags;
                val
            }
        };

        if in_memory {
            self.write8(bus, hl, result);
        } else {
            self.regs.write(reg, result as u16);
        }
    }
}

fn step_hl(hl: u16, increment: bool) -> u16 {
    if increment {
        hl.wrapping_add(1)
    } else {
        hl.wrapping_sub(1)
    }
}
