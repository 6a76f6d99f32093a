//! HD44780 LCD module.
//!
//! Drives HD44780-compatible character displays over a 4-bit or 8-bit parallel bus made of plain
//! GPIO pins. The bus is write-only: the busy flag is never polled, every instruction is instead
//! followed by a fixed, conservative delay.
//!
//! The pieces, from the pins up:
//! - [pins::PinMap] maps the display lines (RS, RW, E, D0-D7) to ports and pins.
//! - [state::DisplayState] mirrors the configuration written to the controller.
//! - [driver::GpioHD44780Driver] is the protocol engine, owning both of them together with a
//!   [GpioBackend](crate::GpioBackend).
//! - [driver::HD44780Driver] provides the command and printing surface on top of `command`/`write`.

pub mod command;
pub mod driver;
pub mod format;
pub mod pins;
pub mod state;

pub use driver::*;
