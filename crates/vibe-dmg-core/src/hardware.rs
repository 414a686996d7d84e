#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
/// DMG hardware revision.
///
/// Selects the register contents the boot ROM leaves behind and the
/// divider phase at the first cartridge instruction.
pub enum DmgRevision {
    Rev0,
    RevA,
    RevB,
    #[default]
    RevC,
}

/// CPU registers as left by the boot ROM, in A F B C D E H L order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BootRegisters {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
}

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const DMG0_BOOT: BootRegisters = BootRegisters {
    a: 0x01,
    f: 0x00,
    b: 0xFF,
    c: 0x13,
    d: 0x00,
    e: 0xC1,
    h: 0x84,
    l: 0x03,
};

const DMG_ABC_BOOT: BootRegisters = BootRegisters {
    a: 0x01,
    f: 0xB0,
    b: 0x00,
    c: 0x13,
    d: 0x00,
    e: 0xD8,
    h: 0x01,
    l: 0x4D,
};

impl DmgRevision {
    pub const fn boot_registers(self) -> BootRegisters {
        match self {
            DmgRevision::Rev0 => DMG0_BOOT,
            DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC => DMG_ABC_BOOT,
        }
    }

    /// Internal divider value when the boot ROM hands over to the cartridge.
    /// Matches the phases measured by mooneye's boot_div tests.
    pub const fn boot_div(self) -> u16 {
        match self {
            DmgRevision::Rev0 => 0x1830,
            DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC => 0xABCC,
        }
    }
}

/// Where execution starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BootMode {
    /// Everything zeroed, PC at 0x0000. Pair with a boot ROM.
    PowerOn,
    /// Registers and I/O as the boot ROM leaves them, PC at 0x0100.
    #[default]
    PostBoot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MachineConfig {
    pub revision: DmgRevision,
    pub boot_mode: BootMode,
}

impl MachineConfig {
    pub fn power_on(revision: DmgRevision) -> Self {
        Self {
            revision,
            boot_mode: BootMode::PowerOn,
        }
    }
}
