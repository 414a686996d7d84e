//! Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic machine: the SM83 CPU, the
//! pixel-FIFO PPU, timer, interrupts, OAM DMA and MBC1 cartridges, all
//! clocked from a single dot counter. Frontends drive it through the
//! [`gameboy`] facade and read the framebuffer once per frame.

/// Address bus: routes CPU accesses to memory and I/O and owns the devices.
pub mod bus;

/// Cartridge header parsing and MBC1 bank switching.
pub mod cartridge;

/// Dot counter and frame-length constants.
pub mod clock;

/// SM83 CPU core.
pub mod cpu;

/// Per-machine diagnostic event channel.
pub mod diagnostics;

/// OAM DMA controller.
pub mod dma;

/// Fatal error type shared by the core.
pub mod error;

/// High-level facade that wires the CPU and bus into a single machine.
pub mod gameboy;

/// Hardware revisions and boot-state configuration.
pub mod hardware;

/// Headless serial test-ROM harness.
pub mod headless;

/// Joypad register and host-side button handle.
pub mod input;

/// Interrupt flag/enable registers and priority resolution.
pub mod interrupts;

/// Work RAM and high RAM.
pub mod memory;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Serial port and link cable plumbing.
pub mod serial;

/// Divider/timer unit.
pub mod timer;

pub use error::{CoreError, Result};
