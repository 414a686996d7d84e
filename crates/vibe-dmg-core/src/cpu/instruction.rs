//! Opcode decode tables.
//!
//! Every opcode maps to an [`Instruction`] describing what it does
//! ([`InstrKind`]), where its operands come from ([`AddrMode`]) and which
//! registers and condition it names. Both tables are built at compile time.

use super::registers::Reg;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrKind {
    Nop,
    Ld,
    Ldh,
    Inc,
    Dec,
    Rlca,
    Rrca,
    Rla,
    Rra,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Daa,
    Cpl,
    Scf,
    Ccf,
    Jr,
    Jp,
    Call,
    Ret,
    Reti,
    Rst,
    Push,
    Pop,
    Halt,
    Stop,
    Di,
    Ei,
    /// 0xCB prefix; the next byte selects from the CB table.
    Cb,
    // CB table
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
    Bit,
    Res,
    Set,
    /// Unassigned opcode; executing it locks the CPU.
    Illegal,
}

/// Operand sources and destinations. `R` is a register, `MR` the memory
/// cell a register points at, `D8`/`D16` immediates, `A8` an 0xFF00-page
/// immediate address, `A16` an absolute immediate address, `HLI`/`HLD`
/// (HL) with post-increment/decrement.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddrMode {
    Imp,
    R_D16,
    R_R,
    MR_R,
    R,
    R_D8,
    R_MR,
    R_HLI,
    R_HLD,
    HLI_R,
    HLD_R,
    R_A8,
    A8_R,
    HL_SPR,
    D16,
    D8,
    A16_R,
    MR_D8,
    MR,
    R_A16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cond {
    Always,
    NZ,
    Z,
    NC,
    C,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub kind: InstrKind,
    pub mode: AddrMode,
    pub reg1: Option<Reg>,
    pub reg2: Option<Reg>,
    pub cond: Cond,
    /// RST target or CB bit number.
    pub param: u8,
}

impl Instruction {
    const fn new(opcode: u8, kind: InstrKind, mode: AddrMode) -> Self {
        Self {
            opcode,
            kind,
            mode,
            reg1: None,
            reg2: None,
            cond: Cond::Always,
            param: 0,
        }
    }

    const fn r1(mut self, reg: Reg) -> Self {
        self.reg1 = Some(reg);
        self
    }

    const fn r2(mut self, reg: Reg) -> Self {
        self.reg2 = Some(reg);
        self
    }

    const fn cond(mut self, cond: Cond) -> Self {
        self.cond = cond;
        self
    }

    const fn param(mut self, param: u8) -> Self {
        self.param = param;
        self
    }

    pub const fn is_illegal(&self) -> bool {
        matches!(self.kind, InstrKind::Illegal)
    }
}

/// 8-bit operand encoding used by the regular opcode blocks; index 6 is (HL).
const R8: [Reg; 8] = [Reg::B, Reg::C, Reg::D, Reg::E, Reg::H, Reg::L, Reg::HL, Reg::A];
const R16: [Reg; 4] = [Reg::BC, Reg::DE, Reg::HL, Reg::SP];
const R16_STACK: [Reg; 4] = [Reg::BC, Reg::DE, Reg::HL, Reg::AF];
const CONDS: [Cond; 4] = [Cond::NZ, Cond::Z, Cond::NC, Cond::C];
const ALU: [InstrKind; 8] = [
    InstrKind::Add,
    InstrKind::Adc,
    InstrKind::Sub,
    InstrKind::Sbc,
    InstrKind::And,
    InstrKind::Xor,
    InstrKind::Or,
    InstrKind::Cp,
];
const CB_ROT: [InstrKind; 8] = [
    InstrKind::Rlc,
    InstrKind::Rrc,
    InstrKind::Rl,
    InstrKind::Rr,
    InstrKind::Sla,
    InstrKind::Sra,
    InstrKind::Swap,
    InstrKind::Srl,
];

pub const fn decode(op: u8) -> Instruction {
    use AddrMode::*;
    use InstrKind as K;

    let y = ((op >> 3) & 7) as usize;
    let z = (op & 7) as usize;
    let p = ((op >> 4) & 3) as usize;

    match op {
        0x00 => ins(op, K::Nop, Imp),
        0x07 => ins(op, K::Rlca, Imp),
        0x0F => ins(op, K::Rrca, Imp),
        0x17 => ins(op, K::Rla, Imp),
        0x1F => ins(op, K::Rra, Imp),
        0x27 => ins(op, K::Daa, Imp),
        0x2F => ins(op, K::Cpl, Imp),
        0x37 => ins(op, K::Scf, Imp),
        0x3F => ins(op, K::Ccf, Imp),
        0x08 => ins(op, K::Ld, A16_R).r2(Reg::SP),
        0x10 => ins(op, K::Stop, Imp),
        0x18 => ins(op, K::Jr, D8),
        0x20 | 0x28 | 0x30 | 0x38 => ins(op, K::Jr, D8).cond(CONDS[y - 4]),
        0x02 | 0x12 => ins(op, K::Ld, MR_R).r1(R16[p]).r2(Reg::A),
        0x0A | 0x1A => ins(op, K::Ld, R_MR).r1(Reg::A).r2(R16[p]),
        0x22 => ins(op, K::Ld, HLI_R).r1(Reg::HL).r2(Reg::A),
        0x32 => ins(op, K::Ld, HLD_R).r1(Reg::HL).r2(Reg::A),
        0x2A => ins(op, K::Ld, R_HLI).r1(Reg::A).r2(Reg::HL),
        0x3A => ins(op, K::Ld, R_HLD).r1(Reg::A).r2(Reg::HL),
        0x00..=0x3F if op & 0x0F == 0x01 => ins(op, K::Ld, R_D16).r1(R16[p]),
        0x00..=0x3F if op & 0x0F == 0x03 => ins(op, K::Inc, R).r1(R16[p]),
        0x00..=0x3F if op & 0x0F == 0x0B => ins(op, K::Dec, R).r1(R16[p]),
        0x00..=0x3F if op & 0x0F == 0x09 => ins(op, K::Add, R_R).r1(Reg::HL).r2(R16[p]),
        0x34 => ins(op, K::Inc, MR).r1(Reg::HL),
        0x35 => ins(op, K::Dec, MR).r1(Reg::HL),
        0x36 => ins(op, K::Ld, MR_D8).r1(Reg::HL),
        0x00..=0x3F if z == 4 => ins(op, K::Inc, R).r1(R8[y]),
        0x00..=0x3F if z == 5 => ins(op, K::Dec, R).r1(R8[y]),
        0x00..=0x3F => ins(op, K::Ld, R_D8).r1(R8[y]),

        0x76 => ins(op, K::Halt, Imp),
        0x40..=0x7F if y == 6 => ins(op, K::Ld, MR_R).r1(Reg::HL).r2(R8[z]),
        0x40..=0x7F if z == 6 => ins(op, K::Ld, R_MR).r1(R8[y]).r2(Reg::HL),
        0x40..=0x7F => ins(op, K::Ld, R_R).r1(R8[y]).r2(R8[z]),

        0x80..=0xBF if z == 6 => ins(op, ALU[y], R_MR).r1(Reg::A).r2(Reg::HL),
        0x80..=0xBF => ins(op, ALU[y], R_R).r1(Reg::A).r2(R8[z]),

        0xC0 | 0xC8 | 0xD0 | 0xD8 => ins(op, K::Ret, Imp).cond(CONDS[y]),
        0xC2 | 0xCA | 0xD2 | 0xDA => ins(op, K::Jp, D16).cond(CONDS[y]),
        0xC4 | 0xCC | 0xD4 | 0xDC => ins(op, K::Call, D16).cond(CONDS[y]),
        0xC1 | 0xD1 | 0xE1 | 0xF1 => ins(op, K::Pop, Imp).r1(R16_STACK[p]),
        0xC5 | 0xD5 | 0xE5 | 0xF5 => ins(op, K::Push, R).r1(R16_STACK[p]),
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
            ins(op, ALU[y], R_D8).r1(Reg::A)
        }
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
            ins(op, K::Rst, Imp).param(op & 0x38)
        }
        0xC3 => ins(op, K::Jp, D16),
        0xC9 => ins(op, K::Ret, Imp),
        0xCB => ins(op, K::Cb, D8),
        0xCD => ins(op, K::Call, D16),
        0xD9 => ins(op, K::Reti, Imp),
        0xE0 => ins(op, K::Ldh, A8_R).r2(Reg::A),
        0xE2 => ins(op, K::Ld, MR_R).r1(Reg::C).r2(Reg::A),
        0xE8 => ins(op, K::Add, R_D8).r1(Reg::SP),
        0xE9 => ins(op, K::Jp, R).r1(Reg::HL),
        0xEA => ins(op, K::Ld, A16_R).r2(Reg::A),
        0xF0 => ins(op, K::Ldh, R_A8).r1(Reg::A),
        0xF2 => ins(op, K::Ld, R_MR).r1(Reg::A).r2(Reg::C),
        0xF3 => ins(op, K::Di, Imp),
        0xF8 => ins(op, K::Ld, HL_SPR).r1(Reg::HL).r2(Reg::SP),
        0xF9 => ins(op, K::Ld, R_R).r1(Reg::SP).r2(Reg::HL),
        0xFA => ins(op, K::Ld, R_A16).r1(Reg::A),
        0xFB => ins(op, K::Ei, Imp),

        // 0xD3 0xDB 0xDD 0xE3 0xE4 0xEB 0xEC 0xED 0xF4 0xFC 0xFD
        _ => ins(op, K::Illegal, Imp),
    }
}

const fn ins(opcode: u8, kind: InstrKind, mode: AddrMode) -> Instruction {
    Instruction::new(opcode, kind, mode)
}

/// Decode the byte following 0xCB.
pub const fn decode_cb(op: u8) -> Instruction {
    let y = ((op >> 3) & 7) as usize;
    let reg = R8[(op & 7) as usize];
    let mode = if op & 7 == 6 { AddrMode::MR } else { AddrMode::R };
    let kind = match op >> 6 {
        0 => CB_ROT[y],
        1 => InstrKind::Bit,
        2 => InstrKind::Res,
        _ => InstrKind::Set,
    };
    Instruction::new(op, kind, mode).r1(reg).param(y as u8)
}

const fn build(cb: bool) -> [Instruction; 256] {
    let mut table = [Instruction::new(0, InstrKind::Illegal, AddrMode::Imp); 256];
    let mut op = 0;
    while op < 256 {
        table[op] = if cb {
            decode_cb(op as u8)
        } else {
            decode(op as u8)
        };
        op += 1;
    }
    table
}

pub static INSTRUCTIONS: [Instruction; 256] = build(false);
pub static CB_INSTRUCTIONS: [Instruction; 256] = build(true);

#[cfg(test)]
mod tests {
    use super::*;

    const ILLEGAL: [u8; 11] = [
        0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD,
    ];

    #[test]
    fn exactly_eleven_illegal_opcodes() {
        for (op, inst) in INSTRUCTIONS.iter().enumerate() {
            assert_eq!(inst.opcode as usize, op);
            assert_eq!(
                inst.is_illegal(),
                ILLEGAL.contains(&(op as u8)),
                "opcode {op:02X}"
            );
        }
    }

    #[test]
    fn cb_table_is_total() {
        assert!(CB_INSTRUCTIONS.iter().all(|i| !i.is_illegal()));
        let bit7_hl = CB_INSTRUCTIONS[0x7E];
        assert_eq!(bit7_hl.kind, InstrKind::Bit);
        assert_eq!(bit7_hl.mode, AddrMode::MR);
        assert_eq!(bit7_hl.param, 7);
        assert_eq!(CB_INSTRUCTIONS[0x37].kind, InstrKind::Swap);
        assert_eq!(CB_INSTRUCTIONS[0x37].reg1, Some(Reg::A));
    }

    #[test]
    fn spot_check_main_table() {
        let ld_b_hl = INSTRUCTIONS[0x46];
        assert_eq!(ld_b_hl.kind, InstrKind::Ld);
        assert_eq!(ld_b_hl.mode, AddrMode::R_MR);
        assert_eq!(ld_b_hl.reg1, Some(Reg::B));

        let ld_hl_d8 = INSTRUCTIONS[0x36];
        assert_eq!(ld_hl_d8.mode, AddrMode::MR_D8);

        let jr_c = INSTRUCTIONS[0x38];
        assert_eq!((jr_c.kind, jr_c.cond), (InstrKind::Jr, Cond::C));

        let cp_hl = INSTRUCTIONS[0xBE];
        assert_eq!((cp_hl.kind, cp_hl.mode), (InstrKind::Cp, AddrMode::R_MR));

        assert_eq!(INSTRUCTIONS[0xEF].param, 0x28);
        assert_eq!(INSTRUCTIONS[0xF1].reg1, Some(Reg::AF));
        assert_eq!(INSTRUCTIONS[0x3C].reg1, Some(Reg::A));
        assert_eq!(INSTRUCTIONS[0x33].reg1, Some(Reg::SP));
    }
}
