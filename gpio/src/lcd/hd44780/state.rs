use crate::lcd::hd44780::command::*;

/// The amount of rows an HD44780 can address.
pub const MAX_ROWS: usize = 4;

/// Mirror of the configuration last written to the controller.
///
/// The function, display control and entry mode bytes are only ever changed bit by bit, so
/// switching one feature leaves the others as they were. Every setter returns the complete
/// instruction to send to bring the controller up to date.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DisplayState {
    function: u8,
    control: u8,
    entry_mode: u8,
    font: CharacterFont,
    num_rows: u8,
    row_offsets: [u8; MAX_ROWS],
}

impl Default for DisplayState {
    fn default() -> Self {
        DisplayState {
            function: FOUR_BIT_MODE | ONE_LINE | DOTS_5X8,
            control: DISPLAY_OFF | CURSOR_OFF | BLINK_OFF,
            entry_mode: ENTRY_RIGHT | ENTRY_SHIFT_DECREMENT,
            font: CharacterFont::Dots5x8,
            num_rows: 1,
            row_offsets: [0; MAX_ROWS],
        }
    }
}

impl DisplayState {
    pub fn function(&self) -> u8 {
        self.function
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn entry_mode(&self) -> u8 {
        self.entry_mode
    }

    pub fn font(&self) -> CharacterFont {
        self.font
    }

    pub fn num_rows(&self) -> u8 {
        self.num_rows
    }

    /// Gets the DDRAM address of the first column of every configured row.
    pub fn row_offsets(&self) -> &[u8] {
        &self.row_offsets[..self.num_rows as usize]
    }

    pub fn is_8bit(&self) -> bool {
        self.function & EIGHT_BIT_MODE != 0
    }

    pub(crate) fn set_8bit(&mut self, eight_bit: bool) {
        set_flag(&mut self.function, EIGHT_BIT_MODE, eight_bit);
    }

    /// Selects the font used by the next [configure](Self::configure).
    pub(crate) fn set_font(&mut self, font: CharacterFont) {
        self.font = font;
    }

    /// Sets up the geometry of the display.
    ///
    /// The row count is kept within `1..=4`. The second line is enabled for anything above one
    /// row, and the 5x10 font only ever for a single row.
    pub(crate) fn configure(&mut self, cols: u8, rows: u8) {
        self.num_rows = rows.clamp(1, MAX_ROWS as u8);
        self.row_offsets = [0x00, 0x40, cols, 0x40u8.wrapping_add(cols)];
        set_flag(&mut self.function, TWO_LINE, rows > 1);
        set_flag(
            &mut self.function,
            DOTS_5X10,
            self.font == CharacterFont::Dots5x10 && rows == 1,
        );
    }

    pub fn function_set_command(&self) -> u8 {
        FUNCTION_SET | self.function
    }

    pub fn display_control_command(&self) -> u8 {
        DISPLAY_CONTROL | self.control
    }

    pub fn entry_mode_command(&self) -> u8 {
        ENTRY_MODE_SET | self.entry_mode
    }

    /// Sets or clears display control flags ([DISPLAY_ON], [CURSOR_ON], [BLINK_ON]).
    pub(crate) fn set_control(&mut self, flags: u8, on: bool) -> u8 {
        set_flag(&mut self.control, flags, on);
        self.display_control_command()
    }

    /// Replaces all display control flags at once.
    pub(crate) fn reset_control(&mut self, control: u8) -> u8 {
        self.control = control;
        self.display_control_command()
    }

    /// Sets or clears entry mode flags ([ENTRY_LEFT], [ENTRY_SHIFT_INCREMENT]).
    pub(crate) fn set_entry_mode(&mut self, flags: u8, on: bool) -> u8 {
        set_flag(&mut self.entry_mode, flags, on);
        self.entry_mode_command()
    }

    /// Replaces all entry mode flags at once.
    pub(crate) fn reset_entry_mode(&mut self, entry_mode: u8) -> u8 {
        self.entry_mode = entry_mode;
        self.entry_mode_command()
    }

    /// Builds the instruction moving the cursor to `col` of `row`.
    ///
    /// Rows past the last configured one are clamped to it. Columns are not checked, a column past
    /// the end of a row lands somewhere else in DDRAM (usually a later row).
    pub fn set_cursor_command(&self, col: u8, row: u8) -> u8 {
        let row = (row as usize).min(MAX_ROWS - 1).min(self.num_rows as usize - 1);
        SET_DDRAM_ADDR | col.wrapping_add(self.row_offsets[row])
    }
}

fn set_flag(byte: &mut u8, flags: u8, on: bool) {
    if on {
        *byte |= flags;
    } else {
        *byte &= !flags;
    }
}
