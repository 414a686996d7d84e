use std::{fs, path::Path};

use log::{info, warn};

use crate::error::{CoreError, Result};

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;
const HEADER_END: usize = 0x150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcKind {
    RomOnly,
    Mbc1,
    /// A mapper this core does not emulate; banked with MBC1 rules.
    Unsupported(u8),
}

/// Fields of the cartridge header at 0x0100..0x0150.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub entry: [u8; 4],
    pub logo: [u8; 48],
    pub title: String,
    pub new_licensee: [u8; 2],
    pub sgb_flag: u8,
    pub cart_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub destination: u8,
    pub old_licensee: u8,
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
    computed: u8,
}

impl Header {
    /// Parse the header from a full ROM image.
    pub fn parse(rom: &[u8]) -> Result<Self> {
        if rom.is_empty() {
            return Err(CoreError::EmptyRom);
        }
        if rom.len() < HEADER_END {
            return Err(CoreError::RomTooSmall { len: rom.len() });
        }

        let mut entry = [0; 4];
        entry.copy_from_slice(&rom[0x0100..0x0104]);
        let mut logo = [0; 48];
        logo.copy_from_slice(&rom[0x0104..0x0134]);

        let mut title = &rom[0x0134..0x0144];
        if let Some(pos) = title.iter().position(|&b| b == 0) {
            title = &title[..pos];
        }

        Ok(Self {
            entry,
            logo,
            title: String::from_utf8_lossy(title).trim().to_string(),
            new_licensee: [rom[0x0144], rom[0x0145]],
            sgb_flag: rom[0x0146],
            cart_type: rom[0x0147],
            rom_size_code: rom[0x0148],
            ram_size_code: rom[0x0149],
            destination: rom[0x014A],
            old_licensee: rom[0x014B],
            version: rom[0x014C],
            header_checksum: rom[0x014D],
            global_checksum: u16::from_be_bytes([rom[0x014E], rom[0x014F]]),
            computed: header_checksum(rom),
        })
    }

    pub fn computed_checksum(&self) -> u8 {
        self.computed
    }

    pub fn checksum_ok(&self) -> bool {
        self.computed == self.header_checksum
    }

    pub fn mbc_kind(&self) -> MbcKind {
        match self.cart_type {
            0x00 | 0x08 | 0x09 => MbcKind::RomOnly,
            0x01..=0x03 => MbcKind::Mbc1,
            other => MbcKind::Unsupported(other),
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(self.cart_type, 0x03 | 0x09)
    }

    /// ROM size declared by the header, in bytes.
    pub fn rom_size(&self) -> usize {
        (32 * 1024usize).checked_shl(self.rom_size_code as u32).unwrap_or(0)
    }

    /// External RAM size declared by the header, in bytes.
    pub fn ram_size(&self) -> usize {
        match self.ram_size_code {
            0x00 => 0,
            0x01 => 0x800,   // 2KB
            0x02 => 0x2000,  // 8KB
            0x03 => 0x8000,  // 32KB (4 banks)
            0x04 => 0x20000, // 128KB (16 banks)
            0x05 => 0x10000, // 64KB (8 banks)
            _ => 0,
        }
    }

    pub fn licensee_name(&self) -> &'static str {
        if self.old_licensee == 0x33 {
            match &self.new_licensee {
                b"00" => "NONE",
                b"01" => "NINTENDO",
                b"08" => "CAPCOM",
                b"13" => "ELECTRONIC ARTS",
                b"18" => "HUDSON SOFT",
                b"20" => "KSS",
                b"31" => "NINTENDO",
                b"34" => "KONAMI",
                b"41" => "UBISOFT",
                b"51" => "ACCLAIM",
                b"52" => "ACTIVISION",
                b"64" => "LUCASARTS",
                b"69" => "ELECTRONIC ARTS",
                b"70" => "INFOGRAMES",
                b"78" => "THQ",
                b"A4" => "KONAMI",
                _ => "UNKNOWN",
            }
        } else {
            match self.old_licensee {
                0x00 => "NONE",
                0x01 | 0x31 => "NINTENDO",
                0x08 | 0x38 => "CAPCOM",
                0x09 => "HOT-B",
                0x0A => "JALECO",
                0x13 | 0x69 => "ELECTRONIC ARTS",
                0x18 => "HUDSON SOFT",
                0x34 | 0xA4 => "KONAMI",
                0x41 => "UBISOFT",
                0x51 | 0xB0 => "ACCLAIM",
                0x52 => "ACTIVISION",
                0x70 => "INFOGRAMES",
                0xC3 => "SQUARESOFT",
                _ => "UNKNOWN",
            }
        }
    }
}

/// `x = x - rom[i] - 1` over the title..version bytes.
pub fn header_checksum(rom: &[u8]) -> u8 {
    rom.get(0x0134..=0x014C)
        .unwrap_or(&[])
        .iter()
        .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
}

#[derive(Debug, Default)]
struct Mbc1 {
    /// Low five bits of the ROM bank; never zero.
    rom_bank: u8,
    /// Two-bit secondary register: upper ROM bits in mode 0, RAM bank in
    /// mode 1.
    upper: u8,
    /// 0 = ROM banking, 1 = RAM banking.
    mode: u8,
    ram_enable: bool,
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    ram: Vec<u8>,
    pub header: Header,
    pub mbc: MbcKind,
    mbc1: Mbc1,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(rom: Vec<u8>) -> Result<Self> {
        let header = Header::parse(&rom)?;
        let mbc = header.mbc_kind();

        info!(
            "Loaded ROM: {} (MBC: {:?}, licensee: {})",
            header.title,
            mbc,
            header.licensee_name()
        );
        info!(
            "header checksum: {:02X} ({})",
            header.header_checksum,
            if header.checksum_ok() {
                "PASSED"
            } else {
                "FAILED"
            }
        );
        if let MbcKind::Unsupported(code) = mbc {
            warn!("cartridge type {code:02X} is not supported; using MBC1 banking");
        }
        if header.rom_size() != rom.len() {
            warn!(
                "header declares {} bytes of ROM, image has {}",
                header.rom_size(),
                rom.len()
            );
        }

        Ok(Self {
            ram: vec![0; header.ram_size()],
            rom,
            header,
            mbc,
            mbc1: Mbc1 {
                rom_bank: 1,
                ..Default::default()
            },
        })
    }

    pub fn title(&self) -> &str {
        &self.header.title
    }

    pub fn has_battery(&self) -> bool {
        self.header.has_battery()
    }

    /// External RAM contents, for battery persistence by the host.
    pub fn ram(&self) -> &[u8] {
        &self.ram
    }

    /// Restore external RAM from a save image; extra bytes are dropped.
    pub fn load_ram(&mut self, data: &[u8]) {
        for (d, s) in self.ram.iter_mut().zip(data) {
            *d = *s;
        }
    }

    fn rom_bank_count(&self) -> usize {
        (self.rom.len() / ROM_BANK_SIZE).max(1)
    }

    /// Bank currently mapped at 0x4000..=0x7FFF. The 2-bit register only
    /// extends the ROM bank in mode 0; in mode 1 it belongs to cart RAM.
    pub fn rom_bank(&self) -> usize {
        match self.mbc {
            MbcKind::RomOnly => 1,
            MbcKind::Mbc1 | MbcKind::Unsupported(_) => {
                let upper = if self.mbc1.mode == 0 {
                    (self.mbc1.upper as usize) << 5
                } else {
                    0
                };
                (upper | self.mbc1.rom_bank as usize) % self.rom_bank_count()
            }
        }
    }

    fn ram_enabled(&self) -> bool {
        match self.mbc {
            MbcKind::RomOnly => true,
            _ => self.mbc1.ram_enable,
        }
    }

    fn ram_index(&self, addr: u16) -> Option<usize> {
        if self.ram.is_empty() || !self.ram_enabled() {
            return None;
        }
        let offset = addr as usize - 0xA000;
        let bank = match self.mbc {
            MbcKind::RomOnly => 0,
            _ if self.mbc1.mode == 0 => 0,
            _ => {
                let banks = self.ram.len().div_ceil(RAM_BANK_SIZE);
                self.mbc1.upper as usize % banks
            }
        };
        let idx = bank * RAM_BANK_SIZE + offset;
        (idx < self.ram.len()).then_some(idx)
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
            0x4000..=0x7FFF => {
                let offset = self.rom_bank() * ROM_BANK_SIZE + (addr as usize - 0x4000);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            0xA000..=0xBFFF => match self.ram_index(addr) {
                Some(idx) => self.ram[idx],
                None => 0xFF,
            },
            _ => 0xFF,
        }
    }

    /// Returns false when the write had no effect.
    pub fn write(&mut self, addr: u16, val: u8) -> bool {
        if self.mbc == MbcKind::RomOnly && addr < 0x8000 {
            return false;
        }
        match addr {
            0x0000..=0x1FFF => {
                self.mbc1.ram_enable = val & 0x0F == 0x0A;
                true
            }
            0x2000..=0x3FFF => {
                self.mbc1.rom_bank = val & 0x1F;
                if self.mbc1.rom_bank == 0 {
                    self.mbc1.rom_bank = 1;
                }
                true
            }
            0x4000..=0x5FFF => {
                self.mbc1.upper = val & 0x03;
                true
            }
            0x6000..=0x7FFF => {
                self.mbc1.mode = val & 0x01;
                true
            }
            0xA000..=0xBFFF => match self.ram_index(addr) {
                Some(idx) => {
                    self.ram[idx] = val;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }
}
