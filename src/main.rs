use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::{info, warn};
use vibe_dmg_core::{
    cartridge::Cartridge,
    diagnostics::SharedRingBuffer,
    gameboy::GameBoy,
    hardware::{BootMode, DmgRevision, MachineConfig},
    headless::{SerialMonitor, SerialVerdict},
    ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};

const BOOT_ROM_LEN: usize = 0x100;
const EXIT_ERROR: u8 = 3;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Revision {
    #[value(name = "0")]
    Rev0,
    A,
    B,
    C,
}

impl From<Revision> for DmgRevision {
    fn from(rev: Revision) -> Self {
        match rev {
            Revision::Rev0 => DmgRevision::Rev0,
            Revision::A => DmgRevision::RevA,
            Revision::B => DmgRevision::RevB,
            Revision::C => DmgRevision::RevC,
        }
    }
}

#[derive(Parser)]
#[command(version, about = "Headless DMG emulator")]
struct Args {
    /// Path to ROM file
    rom: PathBuf,

    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Stop at the first serial Passed/Failed marker; exit code 0 passed,
    /// 1 failed, 2 timeout
    #[arg(long)]
    serial: bool,

    /// Write the last frame to this PNG file
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Start from the power-on state instead of the post-boot state
    #[arg(long)]
    power_on: bool,

    /// Path to a 256-byte DMG boot ROM (implies --power-on)
    #[arg(long)]
    bootrom: Option<PathBuf>,

    /// Hardware revision for the post-boot state
    #[arg(long, value_enum, default_value_t = Revision::C)]
    revision: Revision,

    /// Keep the last N diagnostic events and print them at exit
    #[arg(long, value_name = "N")]
    trace_events: Option<usize>,

    /// Print CPU state every 60 frames
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn Error>> {
    let cart = Cartridge::from_file(&args.rom)?;
    println!(
        "{} ({:?}, header checksum {})",
        cart.title(),
        cart.mbc,
        if cart.header.checksum_ok() {
            "PASSED"
        } else {
            "FAILED"
        }
    );

    let config = MachineConfig {
        revision: args.revision.into(),
        boot_mode: if args.power_on {
            BootMode::PowerOn
        } else {
            BootMode::PostBoot
        },
    };
    let mut gb = GameBoy::with_config(config);
    gb.load_cartridge(cart);

    if let Some(path) = &args.bootrom {
        let data = std::fs::read(path)
            .map_err(|e| format!("failed to load boot ROM {}: {e}", path.display()))?;
        if data.len() != BOOT_ROM_LEN {
            warn!(
                "boot ROM is {} bytes, expected {BOOT_ROM_LEN}",
                data.len()
            );
        }
        gb.load_boot_rom(&data);
    }

    let events = args.trace_events.map(|n| {
        let buf = SharedRingBuffer::new(n);
        gb.set_diagnostics_sink(Box::new(buf.clone()));
        buf
    });

    info!("running {} frames", args.frames);
    let mut monitor = SerialMonitor::new();
    let mut verdict = SerialVerdict::Timeout;
    let mut result = Ok(());
    let mut stdout = io::stdout();
    let mut last_serial = None;
    for frame in 0..args.frames {
        if let Err(e) = gb.step_frame() {
            result = Err(e);
            break;
        }
        if args.debug && frame % 60 == 0 {
            println!("{}", gb.debug_state());
        }
        if args.serial {
            // the monitor scans the whole buffered transcript
            if let Some(v) = monitor.poll(gb.serial_output()) {
                verdict = v;
                break;
            }
        } else if let Some(b) = drain_serial(&mut gb, &mut stdout)? {
            last_serial = Some(b);
        }
    }

    if let Some(b) = drain_serial(&mut gb, &mut stdout)? {
        last_serial = Some(b);
    }
    if last_serial.is_some_and(|b| b != b'\n') {
        writeln!(stdout)?;
    }
    stdout.flush()?;

    if let Some(events) = &events {
        for event in events.snapshot() {
            println!("{event}");
        }
    }

    if let Some(path) = &args.screenshot {
        write_png(path, gb.framebuffer())?;
        info!("wrote {}", path.display());
    }

    result?;

    if args.serial {
        println!("serial test {verdict} after {} frames", gb.frame_count());
        let code = match verdict {
            SerialVerdict::Passed => 0,
            SerialVerdict::Failed => 1,
            SerialVerdict::Timeout => 2,
        };
        return Ok(ExitCode::from(code));
    }
    Ok(ExitCode::SUCCESS)
}

/// Copy pending serial output to `out` and empty the machine's buffer.
/// Returns the last byte written, if any.
fn drain_serial<W: Write>(gb: &mut GameBoy, out: &mut W) -> io::Result<Option<u8>> {
    let bytes = gb.take_serial_output();
    out.write_all(&bytes)?;
    Ok(bytes.last().copied())
}

fn frame_to_rgb(frame: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() * 3);
    for &px in frame {
        out.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, px as u8]);
    }
    out
}

fn write_png(path: &Path, frame: &[u32]) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    let w = BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&frame_to_rgb(frame))?;
    Ok(())
}
