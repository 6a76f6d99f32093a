mod gpio;

pub use gpio::*;

use crate::lcd::hd44780::command::*;
use crate::lcd::hd44780::format::{FormatBuffer, FormattedPrint, MAX_FORMATTED_LEN};
use crate::GpioResult;
use std::fmt::{self, Debug};

/// Clear display and return home need up to 1.52 ms to complete.
pub const LONG_INSTRUCTION_DELAY_MS: u32 = 2;

pub trait HD44780Driver: Debug {
    /// Initializes the controller for a display of the given size.
    fn begin(&mut self, cols: u8, rows: u8) -> GpioResult<()>;

    // Low-level commands
    // The high-level functions below are built on these, implemented by the driver.

    /// Sends an instruction to the HD44780 controller.
    /// RS is held low (instruction register).
    fn command(&mut self, value: u8) -> GpioResult<()>;

    /// Sends data to the HD44780 controller, to be stored in DDRAM or CGRAM, whichever was
    /// addressed last. RS is held high (data register).
    ///
    /// Returns the amount of bytes written.
    fn write(&mut self, value: u8) -> GpioResult<usize>;

    /// Waits for the given amount of milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Writes a single character.
    fn putch(&mut self, value: u8) -> GpioResult<()> {
        self.write(value)?;
        Ok(())
    }

    /// Writes the bytes one by one at the cursor position.
    ///
    /// Stops at the first byte the driver reports as not written. Returns the amount of bytes
    /// written, `0` for empty text.
    fn print(&mut self, text: &[u8]) -> GpioResult<usize> {
        let mut written = 0;
        for &byte in text {
            match self.write(byte)? {
                0 => break,
                n => written += n,
            }
        }
        Ok(written)
    }

    /// Writes the UTF-8 bytes of the text. See [Self::print].
    fn print_str(&mut self, text: &str) -> GpioResult<usize> {
        self.print(text.as_bytes())
    }

    /// Formats the arguments and prints the result, at most [MAX_FORMATTED_LEN] bytes of it.
    ///
    /// Longer output is cut, which is reported through [FormattedPrint::truncated] rather than
    /// as an error. Fails with `GpioError::Format` only if formatting itself fails.
    fn print_formatted(&mut self, args: fmt::Arguments<'_>) -> GpioResult<FormattedPrint> {
        let buffer = FormatBuffer::<MAX_FORMATTED_LEN>::format(args)?;
        let written = if buffer.is_empty() {
            0
        } else {
            self.print(buffer.as_bytes())?
        };
        Ok(FormattedPrint {
            formatted: buffer.formatted_len(),
            written,
            truncated: buffer.is_truncated(),
        })
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear(&mut self) -> GpioResult<()> {
        self.command(CLEAR_DISPLAY)?;
        self.delay_ms(LONG_INSTRUCTION_DELAY_MS);
        Ok(())
    }

    /// Sets the cursor to the home position and undoes any display shift.
    fn home(&mut self) -> GpioResult<()> {
        self.command(RETURN_HOME)?;
        self.delay_ms(LONG_INSTRUCTION_DELAY_MS);
        Ok(())
    }

    /// Shifts the whole display one position to the left, without changing DDRAM.
    fn scroll_display_left(&mut self) -> GpioResult<()> {
        self.command(cursor_shift(true, CursorDirection::Left))
    }

    /// Shifts the whole display one position to the right, without changing DDRAM.
    fn scroll_display_right(&mut self) -> GpioResult<()> {
        self.command(cursor_shift(true, CursorDirection::Right))
    }

    /// Stores a custom 5x8 character in one of the 8 CGRAM slots.
    ///
    /// Only the lowest 3 bits of `location` are used. The character is then displayed by writing
    /// the slot number as data. Leaves CGRAM addressed, so set the cursor before printing again.
    fn create_char(&mut self, location: u8, charmap: &[u8; 8]) -> GpioResult<()> {
        let location = location & 0x7;
        self.command(SET_CGRAM_ADDR | (location << 3))?;
        for &row in charmap {
            self.write(row)?;
        }
        Ok(())
    }
}
