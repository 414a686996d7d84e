//! Flag arithmetic for the 8-bit ALU and the 16-bit adders.
//!
//! Each function takes the current F and returns `(result, new_f)`, so the
//! flag rules can be checked without a bus.

use super::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};

fn flags(z: bool, n: bool, h: bool, c: bool) -> u8 {
    (if z { FLAG_Z } else { 0 })
        | (if n { FLAG_N } else { 0 })
        | (if h { FLAG_H } else { 0 })
        | (if c { FLAG_C } else { 0 })
}

pub fn add8(a: u8, b: u8, carry_in: bool) -> (u8, u8) {
    let c = carry_in as u16;
    let sum = a as u16 + b as u16 + c;
    let res = sum as u8;
    let h = (a & 0x0F) as u16 + (b & 0x0F) as u16 + c > 0x0F;
    (res, flags(res == 0, false, h, sum > 0xFF))
}

pub fn sub8(a: u8, b: u8, carry_in: bool) -> (u8, u8) {
    let c = carry_in as u16;
    let res = (a as u16).wrapping_sub(b as u16).wrapping_sub(c) as u8;
    let h = ((a & 0x0F) as u16) < (b & 0x0F) as u16 + c;
    let carry = (a as u16) < b as u16 + c;
    (res, flags(res == 0, true, h, carry))
}

pub fn and8(a: u8, b: u8) -> (u8, u8) {
    let res = a & b;
    (res, flags(res == 0, false, true, false))
}

pub fn xor8(a: u8, b: u8) -> (u8, u8) {
    let res = a ^ b;
    (res, flags(res == 0, false, false, false))
}

pub fn or8(a: u8, b: u8) -> (u8, u8) {
    let res = a | b;
    (res, flags(res == 0, false, false, false))
}

/// INC r: C is untouched.
pub fn inc8(v: u8, f: u8) -> (u8, u8) {
    let res = v.wrapping_add(1);
    (res, flags(res == 0, false, v & 0x0F == 0x0F, f & FLAG_C != 0))
}

/// DEC r: C is untouched.
pub fn dec8(v: u8, f: u8) -> (u8, u8) {
    let res = v.wrapping_sub(1);
    (res, flags(res == 0, true, v & 0x0F == 0, f & FLAG_C != 0))
}

/// ADD HL,rr: Z is untouched, H/C come from bits 11 and 15.
pub fn add16(hl: u16, v: u16, f: u8) -> (u16, u8) {
    let sum = hl as u32 + v as u32;
    let h = (hl & 0x0FFF) + (v & 0x0FFF) > 0x0FFF;
    (sum as u16, flags(f & FLAG_Z != 0, false, h, sum > 0xFFFF))
}

/// ADD SP,e8 and LD HL,SP+e8: Z and N clear, H/C from the unsigned
/// low-byte addition.
pub fn add_sp_e8(sp: u16, e: i8) -> (u16, u8) {
    let off = e as i16 as u16;
    let h = (sp & 0x0F) + (off & 0x0F) > 0x0F;
    let c = (sp & 0xFF) + (off & 0xFF) > 0xFF;
    (sp.wrapping_add(off), flags(false, false, h, c))
}

/// Decimal adjust after a BCD add or subtract.
pub fn daa(a: u8, f: u8) -> (u8, u8) {
    let n = f & FLAG_N != 0;
    let h = f & FLAG_H != 0;
    let mut carry = f & FLAG_C != 0;
    let mut adjust = 0u8;
    let res = if n {
        if carry {
            adjust |= 0x60;
        }
        if h {
            adjust |= 0x06;
        }
        a.wrapping_sub(adjust)
    } else {
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        if h || a & 0x0F > 0x09 {
            adjust |= 0x06;
        }
        a.wrapping_add(adjust)
    };
    (res, flags(res == 0, n, false, carry))
}

pub fn rlc(v: u8) -> (u8, u8) {
    let res = v.rotate_left(1);
    (res, flags(res == 0, false, false, v & 0x80 != 0))
}

pub fn rrc(v: u8) -> (u8, u8) {
    let res = v.rotate_right(1);
    (res, flags(res == 0, false, false, v & 0x01 != 0))
}

pub fn rl(v: u8, f: u8) -> (u8, u8) {
    let res = (v << 1) | (f & FLAG_C != 0) as u8;
    (res, flags(res == 0, false, false, v & 0x80 != 0))
}

pub fn rr(v: u8, f: u8) -> (u8, u8) {
    let res = (v >> 1) | (((f & FLAG_C != 0) as u8) << 7);
    (res, flags(res == 0, false, false, v & 0x01 != 0))
}

pub fn sla(v: u8) -> (u8, u8) {
    let res = v << 1;
    (res, flags(res == 0, false, false, v & 0x80 != 0))
}

pub fn sra(v: u8) -> (u8, u8) {
    let res = (v >> 1) | (v & 0x80);
    (res, flags(res == 0, false, false, v & 0x01 != 0))
}

pub fn swap(v: u8) -> (u8, u8) {
    let res = v.rotate_left(4);
    (res, flags(res == 0, false, false, false))
}

pub fn srl(v: u8) -> (u8, u8) {
    let res = v >> 1;
    (res, flags(res == 0, false, false, v & 0x01 != 0))
}

/// BIT n,v: only the flags change.
pub fn bit(v: u8, n: u8, f: u8) -> u8 {
    flags(v & (1 << n) == 0, false, true, f & FLAG_C != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_half_and_full_carry() {
        assert_eq!(add8(0x0F, 0x01, false), (0x10, FLAG_H));
        assert_eq!(add8(0xFF, 0x01, false), (0x00, FLAG_Z | FLAG_H | FLAG_C));
        assert_eq!(add8(0x0E, 0x01, true), (0x10, FLAG_H));
        assert_eq!(add8(0x45, 0x45, false), (0x8A, 0));
    }

    #[test]
    fn sub_borrow_flags() {
        assert_eq!(sub8(0x10, 0x01, false), (0x0F, FLAG_N | FLAG_H));
        assert_eq!(sub8(0x00, 0x01, false), (0xFF, FLAG_N | FLAG_H | FLAG_C));
        assert_eq!(sub8(0x05, 0x05, false), (0x00, FLAG_Z | FLAG_N));
        assert_eq!(sub8(0x05, 0x04, true), (0x00, FLAG_Z | FLAG_N));
        assert_eq!(sub8(0x00, 0xFF, true), (0x00, FLAG_Z | FLAG_N | FLAG_H | FLAG_C));
    }

    #[test]
    fn inc_dec_keep_carry() {
        assert_eq!(inc8(0xFF, FLAG_C), (0x00, FLAG_Z | FLAG_H | FLAG_C));
        assert_eq!(dec8(0x01, 0), (0x00, FLAG_Z | FLAG_N));
        assert_eq!(dec8(0x10, FLAG_C), (0x0F, FLAG_N | FLAG_H | FLAG_C));
    }

    #[test]
    fn daa_after_add() {
        let (sum, f) = add8(0x45, 0x45, false);
        assert_eq!(daa(sum, f), (0x90, 0));

        let (sum, f) = add8(0x99, 0x01, false);
        assert_eq!(daa(sum, f), (0x00, FLAG_Z | FLAG_C));
    }

    #[test]
    fn daa_after_sub() {
        let (diff, f) = sub8(0x10, 0x01, false);
        assert_eq!(daa(diff, f), (0x09, FLAG_N));

        let (diff, f) = sub8(0x00, 0x01, false);
        assert_eq!(daa(diff, f), (0x99, FLAG_N | FLAG_C));
    }

    #[test]
    fn add16_preserves_zero() {
        assert_eq!(add16(0x0FFF, 0x0001, FLAG_Z), (0x1000, FLAG_Z | FLAG_H));
        assert_eq!(add16(0xFFFF, 0x0001, 0), (0x0000, FLAG_H | FLAG_C));
    }

    #[test]
    fn sp_offset_uses_low_byte() {
        assert_eq!(add_sp_e8(0x00FF, 1), (0x0100, FLAG_H | FLAG_C));
        assert_eq!(add_sp_e8(0x1000, -1), (0x0FFF, 0));
        assert_eq!(add_sp_e8(0x0001, -1), (0x0000, FLAG_H | FLAG_C));
    }

    #[test]
    fn rotates_and_shifts() {
        assert_eq!(rlc(0x80), (0x01, FLAG_C));
        assert_eq!(rl(0x80, 0), (0x00, FLAG_Z | FLAG_C));
        assert_eq!(rr(0x01, FLAG_C), (0x80, FLAG_C));
        assert_eq!(sra(0x81), (0xC0, FLAG_C));
        assert_eq!(srl(0x01), (0x00, FLAG_Z | FLAG_C));
        assert_eq!(swap(0xF0), (0x0F, 0));
        assert_eq!(bit(0x80, 7, FLAG_C), FLAG_H | FLAG_C);
        assert_eq!(bit(0x00, 0, 0), FLAG_Z | FLAG_H);
    }
}
