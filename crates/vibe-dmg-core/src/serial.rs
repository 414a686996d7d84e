use crate::interrupts::{Interrupt, Interrupts};

pub trait LinkPort: Send {
    /// Transfer a byte over the link. Returns the byte received from the
    /// partner.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// A stub link port for a cable with nothing on the other end.
/// Incoming bits are all 1, so a transfer receives 0xFF. When `loopback` is
/// true the sent byte is echoed back instead.
#[derive(Default)]
pub struct NullLinkPort {
    loopback: bool,
}

impl NullLinkPort {
    pub fn new(loopback: bool) -> Self {
        Self { loopback }
    }
}

impl LinkPort for NullLinkPort {
    fn transfer(&mut self, byte: u8) -> u8 {
        if self.loopback { byte } else { 0xFF }
    }
}

/// SB/SC registers with instant internal-clock transfers.
///
/// Test ROMs print by writing a character to SB and 0x81 to SC; every such
/// byte is kept in an output buffer the host can drain.
pub struct Serial {
    sb: u8,
    sc: u8,
    out_buf: Vec<u8>,
    port: Option<Box<dyn LinkPort>>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            sb: 0,
            sc: 0x7E,
            out_buf: Vec::new(),
            port: None,
        }
    }

    pub fn connect(&mut self, port: Box<dyn LinkPort>) {
        self.port = Some(port);
    }

    pub fn disconnect(&mut self) {
        self.port = None;
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0xFF01 => self.sb,
            0xFF02 => self.sc | 0x7E,
            _ => 0xFF,
        }
    }

    /// Returns the byte shifted out when the write started a transfer.
    pub fn write(&mut self, addr: u16, val: u8, ints: &mut Interrupts) -> Option<u8> {
        match addr {
            0xFF01 => {
                self.sb = val;
                None
            }
            0xFF02 => {
                self.sc = val;
                if val & 0x81 != 0x81 {
                    // External clock: nothing drives the shift register.
                    return None;
                }
                let outgoing = self.sb;
                self.sb = match self.port.as_mut() {
                    Some(port) => port.transfer(outgoing),
                    None => 0x00,
                };
                self.out_buf.push(outgoing);
                self.sc &= 0x7F;
                ints.request(Interrupt::Serial);
                Some(outgoing)
            }
            _ => None,
        }
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }

    pub fn peek_output(&self) -> &[u8] {
        &self.out_buf
    }

    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.out_buf).into_owned()
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}
