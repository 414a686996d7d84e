mod common;

use vibe_dmg_core::{
    cartridge::{Cartridge, header_checksum},
    diagnostics::{DiagnosticEvent, Region, SharedRingBuffer},
    gameboy::GameBoy,
    hardware::{DmgRevision, MachineConfig},
    input::Button,
    interrupts::Interrupt,
};

const BANK: usize = 0x4000;

/// MBC1 image with `banks` banks, each tagged with its number at 0x4000
/// offset 0, and `program` at 0x0150.
fn mbc1_rom(banks: usize, program: &[u8]) -> Vec<u8> {
    let mut rom = common::build_rom(program);
    rom.resize(banks * BANK, 0);
    for bank in 1..banks {
        rom[bank * BANK] = bank as u8;
    }
    rom[0x147] = 0x01;
    rom[0x148] = (banks / 2).trailing_zeros() as u8;
    rom[0x14D] = header_checksum(&rom);
    rom
}

#[test]
fn work_ram_and_high_ram() {
    let mut gb = common::machine(&[]);
    gb.bus.write(0xC000, 0x11);
    gb.bus.write(0xDFFF, 0x22);
    gb.bus.write(0xFF80, 0x33);
    gb.bus.write(0xFFFE, 0x44);
    assert_eq!(gb.bus.read(0xC000), 0x11);
    assert_eq!(gb.bus.read(0xDFFF), 0x22);
    assert_eq!(gb.bus.read(0xFF80), 0x33);
    assert_eq!(gb.bus.read(0xFFFE), 0x44);
    // echo RAM does not mirror
    assert_eq!(gb.bus.read(0xE000), 0x00);
}

#[test]
fn unmapped_reads_are_open_bus() {
    let mut gb = GameBoy::new();
    // no cartridge
    assert_eq!(gb.bus.read(0x0000), 0xFF);
    assert_eq!(gb.bus.read(0x4000), 0xFF);
    assert_eq!(gb.bus.read(0xA000), 0xFF);
    assert_eq!(gb.bus.read(0xFEA0), 0xFF);
    assert_eq!(gb.bus.read(0xFF03), 0xFF);
    assert_eq!(gb.bus.read(0xFF4C), 0xFF);
    assert_eq!(gb.bus.read(0xFF7F), 0xFF);
    // boot ROM already gone
    assert_eq!(gb.bus.read(0xFF50), 0xFF);
}

#[test]
fn interrupt_registers() {
    let mut gb = common::machine(&[]);
    gb.bus.write(0xFF0F, 0xFF);
    assert_eq!(gb.bus.read(0xFF0F), 0xFF);
    assert_eq!(gb.bus.ints.flag, 0x1F);
    gb.bus.write(0xFF0F, 0x00);
    assert_eq!(gb.bus.read(0xFF0F), 0xE0);

    gb.bus.write(0xFFFF, 0xA5);
    assert_eq!(gb.bus.read(0xFFFF), 0xA5);
}

#[test]
fn mbc1_switches_banks_through_the_bus() {
    let program = [
        0x3E, 0x05, // LD A,5
        0xEA, 0x00, 0x20, // LD (0x2000),A
        0xFA, 0x00, 0x40, // LD A,(0x4000)
        0x47, // LD B,A
        0xAF, // XOR A
        0xEA, 0x00, 0x20, // LD (0x2000),A
        0xFA, 0x00, 0x40, // LD A,(0x4000)
    ];
    let mut gb = GameBoy::new();
    gb.load_cartridge(Cartridge::from_bytes(mbc1_rom(8, &program)).unwrap());
    common::step_until(&mut gb, 2, |gb| gb.cpu.regs.pc == common::PROGRAM_START);

    for _ in 0..4 {
        gb.step().unwrap();
    }
    assert_eq!(gb.cpu.regs.b, 5);
    assert_eq!(gb.cartridge().map(|c| c.rom_bank()), Some(5));
    for _ in 0..3 {
        gb.step().unwrap();
    }
    // bank 0 selects bank 1
    assert_eq!(gb.cpu.regs.a, 1);
}

#[test]
fn cartridge_ram_needs_enable() {
    let mut rom = mbc1_rom(4, &[]);
    rom[0x147] = 0x03;
    rom[0x149] = 0x02;
    rom[0x14D] = header_checksum(&rom);
    let mut gb = GameBoy::new();
    gb.load_cartridge(Cartridge::from_bytes(rom).unwrap());
    let events = SharedRingBuffer::new(4);
    gb.set_diagnostics_sink(Box::new(events.clone()));

    gb.bus.write(0xA000, 0x12);
    assert_eq!(gb.bus.read(0xA000), 0xFF);
    assert_eq!(
        events.snapshot(),
        vec![DiagnosticEvent::IgnoredWrite {
            addr: 0xA000,
            value: 0x12,
            region: Region::CartRam,
        }]
    );

    gb.bus.write(0x0000, 0x0A);
    gb.bus.write(0xA000, 0x12);
    assert_eq!(gb.bus.read(0xA000), 0x12);
    assert_eq!(gb.cartridge().map(|c| c.ram()[0]), Some(0x12));
}

#[test]
fn dma_copies_into_oam_from_a_program() {
    let program = [
        0x3E, 0xC1, // LD A,0xC1
        0xE0, 0x46, // LDH (DMA),A
        0x18, 0xFE, // JR -2
    ];
    let mut gb = common::machine(&program);
    for i in 0..0xA0u16 {
        gb.bus.write(0xC100 + i, 0xA0 - i as u8);
    }
    gb.step().unwrap();
    gb.step().unwrap();
    assert!(gb.bus.dma.active());
    gb.run_dots(4 * 170).unwrap();
    assert!(!gb.bus.dma.active());
    assert_eq!(gb.bus.read(0xFE00), 0xA0);
    assert_eq!(gb.bus.read(0xFE9F), 0x01);
    assert_eq!(gb.bus.read(0xFF46), 0xC1);
}

#[test]
fn joypad_press_requests_interrupt() {
    let mut gb = common::machine(&[0x18, 0xFE]);
    // select buttons
    gb.bus.write(0xFF00, 0x10);
    gb.step().unwrap();
    gb.bus.ints.flag = 0;

    gb.joypad().press(Button::Start);
    gb.step().unwrap();
    assert_ne!(gb.bus.ints.flag & Interrupt::Joypad.mask(), 0);
    assert_eq!(gb.bus.read(0xFF00), 0xD7);

    gb.joypad().release(Button::Start);
    assert_eq!(gb.bus.read(0xFF00), 0xDF);
}

#[test]
fn boot_rom_hands_over_to_the_cartridge() {
    let mut boot = vec![0u8; 0x100];
    boot[0x00..0x03].copy_from_slice(&[0xC3, 0xFC, 0x00]); // JP 0x00FC
    boot[0xFC..0x100].copy_from_slice(&[0x3E, 0x01, 0xE0, 0x50]); // LD A,1 ; LDH (0x50),A

    let mut gb = GameBoy::with_config(MachineConfig::power_on(DmgRevision::RevC));
    gb.load_cartridge(Cartridge::from_bytes(common::build_rom(&[0x04])).unwrap());
    gb.load_boot_rom(&boot);
    assert!(gb.bus.boot_rom_mapped());
    assert_eq!(gb.cpu.regs.pc, 0x0000);
    assert_eq!(gb.bus.read(0xFF50), 0xFE);
    assert_eq!(gb.bus.read(0x0000), 0xC3);

    for _ in 0..3 {
        gb.step().unwrap();
    }
    assert!(!gb.bus.boot_rom_mapped());
    assert_eq!(gb.cpu.regs.pc, 0x0100);
    assert_eq!(gb.bus.read(0x0000), 0x00);

    common::step_until(&mut gb, 3, |gb| gb.cpu.regs.b == 1);
}

#[test]
fn reset_keeps_the_cartridge() {
    let mut gb = common::machine(&[0x04, 0x04]);
    gb.step().unwrap();
    gb.reset();
    assert_eq!(gb.cpu.regs.pc, 0x0100);
    assert_eq!(gb.cpu.regs.b, 0x00);
    assert_eq!(gb.dots(), 0);
    assert!(gb.cartridge().is_some());
    assert_eq!(gb.bus.read(0x0150), 0x04);
}
