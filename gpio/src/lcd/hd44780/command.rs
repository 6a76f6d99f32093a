//! HD44780 instruction opcodes and their flag bits.
//!
//! Each instruction is identified by its highest set bit, the flags below it are OR-ed into the
//! same byte.

pub const CLEAR_DISPLAY: u8 = 0b00000001;
pub const RETURN_HOME: u8 = 0b00000010;
pub const ENTRY_MODE_SET: u8 = 0b00000100;
pub const DISPLAY_CONTROL: u8 = 0b00001000;
pub const CURSOR_SHIFT: u8 = 0b00010000;
pub const FUNCTION_SET: u8 = 0b00100000;
pub const SET_CGRAM_ADDR: u8 = 0b01000000;
pub const SET_DDRAM_ADDR: u8 = 0b10000000;

// Entry mode set
pub const ENTRY_RIGHT: u8 = 0b00000000;
pub const ENTRY_LEFT: u8 = 0b00000010;
pub const ENTRY_SHIFT_INCREMENT: u8 = 0b00000001;
pub const ENTRY_SHIFT_DECREMENT: u8 = 0b00000000;

// Display on/off control
pub const DISPLAY_ON: u8 = 0b00000100;
pub const DISPLAY_OFF: u8 = 0b00000000;
pub const CURSOR_ON: u8 = 0b00000010;
pub const CURSOR_OFF: u8 = 0b00000000;
pub const BLINK_ON: u8 = 0b00000001;
pub const BLINK_OFF: u8 = 0b00000000;

// Cursor or display shift
pub const DISPLAY_MOVE: u8 = 0b00001000;
pub const CURSOR_MOVE: u8 = 0b00000000;
pub const MOVE_RIGHT: u8 = 0b00000100;
pub const MOVE_LEFT: u8 = 0b00000000;

// Function set
pub const EIGHT_BIT_MODE: u8 = 0b00010000;
pub const FOUR_BIT_MODE: u8 = 0b00000000;
pub const TWO_LINE: u8 = 0b00001000;
pub const ONE_LINE: u8 = 0b00000000;
pub const DOTS_5X10: u8 = 0b00000100;
pub const DOTS_5X8: u8 = 0b00000000;

/// The direction the cursor or the display moves in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CursorDirection {
    /// Moves the cursor to the left after writing data.
    Left,
    /// Moves the cursor to the right after writing data.
    Right,
}

/// Character font of the display.
///
/// The 5x10 font is only available on displays with a single line.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum CharacterFont {
    #[default]
    Dots5x8,
    Dots5x10,
}

/// Builds the cursor/display shift instruction.
pub fn cursor_shift(display_shift: bool, direction: CursorDirection) -> u8 {
    let mut command = CURSOR_SHIFT;
    if display_shift {
        command |= DISPLAY_MOVE;
    }
    if direction == CursorDirection::Right {
        command |= MOVE_RIGHT;
    }
    command
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shift_commands() {
        assert_eq!(cursor_shift(true, CursorDirection::Left), 0x18);
        assert_eq!(cursor_shift(true, CursorDirection::Right), 0x1C);
        assert_eq!(cursor_shift(false, CursorDirection::Right), 0x14);
    }
}
