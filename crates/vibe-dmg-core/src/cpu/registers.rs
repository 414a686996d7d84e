// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

/// Register operand named by an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reg {
    A,
    F,
    B,
    C,
    D,
    E,
    H,
    L,
    AF,
    BC,
    DE,
    HL,
    SP,
    PC,
}

impl Reg {
    pub const fn is_16bit(self) -> bool {
        matches!(self, Reg::AF | Reg::BC | Reg::DE | Reg::HL | Reg::SP | Reg::PC)
    }
}

/// Register file. The low nibble of F always reads as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f & 0xF0])
    }

    pub fn set_af(&mut self, val: u16) {
        let [a, f] = val.to_be_bytes();
        self.a = a;
        self.f = f & 0xF0;
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn set_bc(&mut self, val: u16) {
        [self.b, self.c] = val.to_be_bytes();
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn set_de(&mut self, val: u16) {
        [self.d, self.e] = val.to_be_bytes();
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn set_hl(&mut self, val: u16) {
        [self.h, self.l] = val.to_be_bytes();
    }

    pub fn read(&self, reg: Reg) -> u16 {
        match reg {
            Reg::A => self.a as u16,
            Reg::F => (self.f & 0xF0) as u16,
            Reg::B => self.b as u16,
            Reg::C => self.c as u16,
            Reg::D => self.d as u16,
            Reg::E => self.e as u16,
            Reg::H => self.h as u16,
            Reg::L => self.l as u16,
            Reg::AF => self.af(),
            Reg::BC => self.bc(),
            Reg::DE => self.de(),
            Reg::HL => self.hl(),
            Reg::SP => self.sp,
            Reg::PC => self.pc,
        }
    }

    /// Write a register; 8-bit registers take the low byte of `val`.
    pub fn write(&mut self, reg: Reg, val: u16) {
        match reg {
            Reg::A => self.a = val as u8,
            Reg::F => self.f = val as u8 & 0xF0,
            Reg::B => self.b = val as u8,
            Reg::C => self.c = val as u8,
            Reg::D => self.d = val as u8,
            Reg::E => self.e = val as u8,
            Reg::H => self.h = val as u8,
            Reg::L => self.l = val as u8,
            Reg::AF => self.set_af(val),
            Reg::BC => self.set_bc(val),
            Reg::DE => self.set_de(val),
            Reg::HL => self.set_hl(val),
            Reg::SP => self.sp = val,
            Reg::PC => self.pc = val,
        }
    }

    pub fn flag(&self, mask: u8) -> bool {
        self.f & mask != 0
    }
}
