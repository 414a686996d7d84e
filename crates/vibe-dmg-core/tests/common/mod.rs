use once_cell::sync::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use vibe_dmg_core::{
    cartridge::{Cartridge, header_checksum},
    gameboy::GameBoy,
};

static INIT: OnceCell<()> = OnceCell::new();

/// Where test programs start; the header's entry point jumps here.
#[allow(dead_code)]
pub const PROGRAM_START: u16 = 0x0150;

fn ensure_test_roms() {
    INIT.get_or_init(|| {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_roms");
        fs::create_dir_all(&dir).expect("failed to create test_roms directory");
        ensure_c_sp_test_rom_bundle(&dir);
    });
}

fn ensure_c_sp_test_rom_bundle(dir: &Path) {
    // ROM binaries are not checked in; fetch the bundle once per checkout.
    if dir.join("blargg").exists() {
        return;
    }

    let url = "https://github.com/c-sp/game-boy-test-roms/releases/download/v7.0/game-boy-test-roms-v7.0.zip";
    let resp = reqwest::blocking::get(url).expect("failed to download test roms");
    let status = resp.status();
    if !status.is_success() {
        panic!("failed to download test roms: {status}");
    }
    let bytes = resp.bytes().expect("failed to read rom bytes");
    let reader = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(reader).expect("failed to open zip archive");
    archive.extract(dir).expect("failed to extract test roms");
}

#[allow(dead_code)]
pub fn roms_dir() -> PathBuf {
    ensure_test_roms();
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test_roms")
}

#[allow(dead_code)]
pub fn rom_path<P: AsRef<Path>>(relative: P) -> PathBuf {
    roms_dir().join(relative)
}

/// 32 KiB ROM-only image whose entry point jumps to `program` at 0x0150.
#[allow(dead_code)]
pub fn build_rom(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    // NOP; JP 0x0150
    rom[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
    rom[0x134..0x138].copy_from_slice(b"TEST");
    let start = PROGRAM_START as usize;
    rom[start..start + program.len()].copy_from_slice(program);
    rom[0x14D] = header_checksum(&rom);
    rom
}

/// Post-boot machine with `program` loaded and PC at its first byte.
#[allow(dead_code)]
pub fn machine(program: &[u8]) -> GameBoy {
    let mut gb = GameBoy::new();
    let cart = Cartridge::from_bytes(build_rom(program)).expect("valid test rom");
    gb.load_cartridge(cart);
    gb.step().expect("entry NOP");
    gb.step().expect("entry JP");
    assert_eq!(gb.cpu.regs.pc, PROGRAM_START);
    gb
}

/// Program that writes `text` to the serial port one byte at a time, then
/// spins forever.
#[allow(dead_code)]
pub fn serial_print_program(text: &str) -> Vec<u8> {
    const MSG: u16 = PROGRAM_START + 0x11;
    let [lo, hi] = MSG.to_le_bytes();
    let mut program = vec![
        0x21, lo, hi, // LD HL,msg
        0x2A, // loop: LD A,(HL+)
        0xB7, // OR A
        0x28, 0x08, // JR Z,done
        0xE0, 0x01, // LDH (SB),A
        0x3E, 0x81, // LD A,0x81
        0xE0, 0x02, // LDH (SC),A
        0x18, 0xF4, // JR loop
        0x18, 0xFE, // done: JR done
    ];
    assert_eq!(program.len(), 0x11);
    program.extend_from_slice(text.as_bytes());
    program.push(0);
    program
}

/// Run until `pred` holds or `max_steps` instructions have executed.
#[allow(dead_code)]
pub fn step_until(gb: &mut GameBoy, max_steps: usize, mut pred: impl FnMut(&GameBoy) -> bool) {
    for _ in 0..max_steps {
        if pred(gb) {
            return;
        }
        gb.step().expect("cpu locked up");
    }
    assert!(pred(gb), "condition not reached in {max_steps} steps");
}
