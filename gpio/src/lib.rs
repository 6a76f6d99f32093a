pub mod lcd;
pub mod raw;
pub mod recording;

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{BitOr, BitOrAssign};
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("formatting failed")]
    Format,
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

impl From<fmt::Error> for GpioError {
    fn from(_: fmt::Error) -> Self {
        GpioError::Format
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

/// Identifies one GPIO port (a bank of up to 32 pins sharing registers and a clock domain).
///
/// What a port index means is up to the backend, e.g. `0` for `GPIOA` on an STM32 or for the first
/// 32-pin bank on a BCM283x.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct GpioPort(pub u8);

impl GpioPort {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Display for GpioPort {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A set of pins within a single port, one bit per pin, LSb being pin 0.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct PinMask(pub u32);

impl PinMask {
    pub const EMPTY: PinMask = PinMask(0);

    /// The amount of pins addressable in a single port.
    pub const WIDTH: u8 = 32;

    /// Gets the mask of a single pin.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if the pin number doesn't fit in a port.
    pub fn pin(pin: u8) -> GpioResult<Self> {
        1u32.checked_shl(pin as u32)
            .map(PinMask)
            .ok_or(GpioError::InvalidArgument)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: PinMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Iterates over the numbers of the pins in the mask, lowest first.
    pub fn pins(self) -> impl Iterator<Item = u8> {
        (0..Self::WIDTH).filter(move |&pin| self.0 & (1 << pin) != 0)
    }
}

impl BitOr for PinMask {
    type Output = PinMask;

    fn bitor(self, rhs: PinMask) -> PinMask {
        PinMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for PinMask {
    fn bitor_assign(&mut self, rhs: PinMask) {
        self.0 |= rhs.0;
    }
}

impl Display for PinMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Low-level GPIO primitives the display drivers are built on.
///
/// Every operation works on a whole [PinMask] at once, so backends with set/reset registers can
/// update several pins of a port with a single write. Pins are never read back.
pub trait GpioBackend: Debug {
    /// Enables the clock domain of the given port, so its pins can be configured and driven.
    ///
    /// Enabling an already enabled port must be harmless.
    fn enable_clock(&mut self, port: GpioPort) -> GpioResult<()>;

    /// Configures all pins in the mask as push-pull outputs.
    fn configure_output(&mut self, port: GpioPort, mask: PinMask) -> GpioResult<()>;

    /// Drives all pins in the mask high or low.
    fn set_level(&mut self, port: GpioPort, mask: PinMask, high: bool) -> GpioResult<()>;

    /// Blocks the calling thread for at least the given amount of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}
