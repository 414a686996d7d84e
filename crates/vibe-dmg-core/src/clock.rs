pub const DOTS_PER_M_CYCLE: u64 = 4;
pub const DOTS_PER_LINE: u64 = 456;
pub const LINES_PER_FRAME: u64 = 154;
pub const DOTS_PER_FRAME: u64 = DOTS_PER_LINE * LINES_PER_FRAME;

/// Monotonic dot counter shared by every device on the bus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Clock {
    dots: u64,
}

impl Clock {
    pub fn advance(&mut self) {
        self.dots += 1;
    }

    pub fn dots(&self) -> u64 {
        self.dots
    }

    pub fn m_cycles(&self) -> u64 {
        self.dots / DOTS_PER_M_CYCLE
    }

    /// First dot of the frame after the current one.
    pub fn next_frame_boundary(&self) -> u64 {
        (self.dots / DOTS_PER_FRAME + 1) * DOTS_PER_FRAME
    }
}
