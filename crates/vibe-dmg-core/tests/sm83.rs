//! Single-instruction CPU tests in the SingleStepTests `sm83` JSON format.
//!
//! Each `XX.json` / `cb XX.json` file holds cases for one opcode: an initial
//! register and RAM state, the expected final state, and one entry per
//! M-cycle. The corpus is fetched into `test_roms/` when the harness runs
//! with `--ignored` or `--include-ignored`; otherwise a missing corpus is
//! reported as one ignored trial.

use std::fs;
use std::path::{Path, PathBuf};

use libtest_mimic::{Arguments, Failed, Trial};
use serde::Deserialize;
use vibe_dmg_core::{
    cpu::{Cpu, MemoryBus, Registers},
    interrupts::Interrupts,
};

// STOP and HALT wait on the rest of the machine.
const SKIPPED: &[&str] = &["10", "76"];

#[derive(Debug, Deserialize)]
struct CpuState {
    pc: u16,
    sp: u16,
    a: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    f: u8,
    h: u8,
    l: u8,
    ime: u8,
    #[serde(default)]
    ie: Option<u8>,
    ram: Vec<(u16, u8)>,
}

#[derive(Debug, Deserialize)]
struct Case {
    name: String,
    initial: CpuState,
    #[serde(rename = "final")]
    expected: CpuState,
    cycles: Vec<serde_json::Value>,
}

/// 64 KiB of plain RAM with no devices behind it.
struct FlatBus {
    mem: Box<[u8; 0x10000]>,
    ints: Interrupts,
    ticks: u32,
}

impl FlatBus {
    fn new() -> Self {
        Self {
            mem: Box::new([0; 0x10000]),
            ints: Interrupts::default(),
            ticks: 0,
        }
    }
}

impl MemoryBus for FlatBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    fn write(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }

    fn tick_m_cycle(&mut self) {
        self.ticks += 1;
    }

    fn interrupts(&mut self) -> &mut Interrupts {
        &mut self.ints
    }
}

fn registers(state: &CpuState) -> Registers {
    Registers {
        a: state.a,
        f: state.f,
        b: state.b,
        c: state.c,
        d: state.d,
        e: state.e,
        h: state.h,
        l: state.l,
        sp: state.sp,
        pc: state.pc,
    }
}

fn run_case(case: &Case, check_ime: bool) -> Result<(), String> {
    let mut bus = FlatBus::new();
    for &(addr, val) in &case.initial.ram {
        bus.mem[addr as usize] = val;
    }
    if let Some(ie) = case.initial.ie {
        bus.ints.enable = ie;
    }

    let mut cpu = Cpu::new();
    cpu.regs = registers(&case.initial);
    cpu.ctx.ime = case.initial.ime != 0;

    let cycles = cpu
        .step(&mut bus)
        .map_err(|err| format!("{}: {err}", case.name))?;

    let expected = registers(&case.expected);
    if cpu.regs != expected {
        return Err(format!(
            "{}: registers\n  got      {:?}\n  expected {:?}",
            case.name, cpu.regs, expected
        ));
    }
    if check_ime && cpu.ctx.ime != (case.expected.ime != 0) {
        return Err(format!("{}: ime {}", case.name, cpu.ctx.ime));
    }
    for &(addr, val) in &case.expected.ram {
        let got = bus.mem[addr as usize];
        if got != val {
            return Err(format!(
                "{}: [{addr:04X}] = {got:02X}, expected {val:02X}",
                case.name
            ));
        }
    }
    if cycles as usize != case.cycles.len() || bus.ticks != cycles {
        return Err(format!(
            "{}: {cycles} cycles ({} ticks), expected {}",
            case.name,
            bus.ticks,
            case.cycles.len()
        ));
    }
    Ok(())
}

fn run_file(path: &Path, check_ime: bool) -> Result<(), Failed> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let cases: Vec<Case> =
        serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?;
    let failures: Vec<String> = cases
        .iter()
        .filter_map(|case| run_case(case, check_ime).err())
        .collect();
    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} cases failed; first: {}",
            failures.len(),
            cases.len(),
            failures[0]
        )
        .into())
    }
}

const CORPUS_URL: &str = "https://github.com/SingleStepTests/sm83/archive/refs/heads/main.zip";

fn roms_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test_roms")
}

fn test_dir() -> Option<PathBuf> {
    let roms = roms_dir();
    [
        roms.join("sm83/v1"),
        roms.join("sm83"),
        roms.join("sm83-main/v1"),
    ]
    .into_iter()
    .find(|dir| dir.join("00.json").exists())
}

fn download_corpus() -> Result<(), String> {
    let dir = roms_dir();
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let resp = reqwest::blocking::get(CORPUS_URL).map_err(|e| e.to_string())?;
    let status = resp.status();
    if !status.is_success() {
        return Err(format!("failed to download sm83 corpus: {status}"));
    }
    let bytes = resp.bytes().map_err(|e| e.to_string())?;
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
    archive.extract(&dir).map_err(|e| e.to_string())
}

fn main() {
    let args = Arguments::from_args();

    let mut trials = Vec::new();
    let mut dir = test_dir();
    if dir.is_none() && (args.ignored || args.include_ignored) {
        if let Err(err) = download_corpus() {
            eprintln!("{err}");
            std::process::exit(1);
        }
        dir = test_dir();
    }
    match dir {
        Some(dir) => {
            let mut files: Vec<PathBuf> = fs::read_dir(&dir)
                .map(|entries| {
                    entries
                        .filter_map(|e| e.ok().map(|e| e.path()))
                        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                        .collect()
                })
                .unwrap_or_default();
            files.sort();
            for path in files {
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };
                let ignored = SKIPPED.contains(&stem.as_str());
                // IME from EI becomes visible one instruction later than
                // these cases record.
                let check_ime = stem != "fb";
                let trial = Trial::test(format!("sm83::{stem}"), move || {
                    run_file(&path, check_ime)
                })
                .with_ignored_flag(ignored);
                trials.push(trial);
            }
        }
        None => {
            trials.push(Trial::test("sm83", || Ok(())).with_ignored_flag(true));
        }
    }

    libtest_mimic::run(&args, trials).exit();
}
