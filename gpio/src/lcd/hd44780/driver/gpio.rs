use crate::lcd::hd44780::command::*;
use crate::lcd::hd44780::driver::HD44780Driver;
use crate::lcd::hd44780::pins::{DataPins, PinMap, PinRole};
use crate::lcd::hd44780::state::DisplayState;
use crate::{GpioBackend, GpioPort, GpioResult};
use log::{debug, trace};

/// The controller needs 40 ms after the supply rises above 2.7 V.
pub const POWER_ON_DELAY_MS: u32 = 50;

/// Delays after each of the three resynchronization attempts of the init sequence.
pub const RESYNC_DELAYS_MS: [u32; 3] = [5, 5, 1];

/// Delay between the edges of an enable pulse. The controller needs the pulse to be high for
/// 450 ns and an instruction to settle for 37 us, a millisecond covers both.
pub const ENABLE_PULSE_DELAY_MS: u32 = 1;

/// Which register of the controller a transmitted byte goes to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegisterSelect {
    /// Instruction register, RS low.
    Command,
    /// Data register, RS high.
    Data,
}

impl RegisterSelect {
    fn level(self) -> bool {
        self == RegisterSelect::Data
    }
}

/// HD44780 driver bit-banging the parallel bus over a [GpioBackend].
///
/// One instance drives one display and owns everything about it: the backend, the pin map and
/// the mirrored display state. Pins are bound with [Self::init_ctrl_pins] and one of the
/// `init_data_pins_*` functions, after which [HD44780Driver::begin] brings the controller up.
///
/// Timing is coarse: every edge of the enable pulse is followed by a millisecond, so a single
/// byte takes 3 ms on an 8-bit bus and 6 ms on a 4-bit one.
#[derive(Debug)]
pub struct GpioHD44780Driver<B: GpioBackend> {
    backend: B,
    pins: PinMap,
    state: DisplayState,
}

impl<B: GpioBackend> GpioHD44780Driver<B> {
    /// Creates a driver for a display with its data lines on `port_data` and the control lines on
    /// the given ports. Any of the ports may be the same.
    pub fn new(
        backend: B,
        port_data: GpioPort,
        port_rw: GpioPort,
        port_en: GpioPort,
        port_rs: GpioPort,
    ) -> Self {
        GpioHD44780Driver {
            backend,
            pins: PinMap::new(port_data, port_rw, port_en, port_rs),
            state: DisplayState::default(),
        }
    }

    /// Binds the control pins. Pass `None` for `rw` when RW of the display is tied to ground.
    pub fn init_ctrl_pins(&mut self, rw: Option<u8>, en: u8, rs: u8) -> GpioResult<()> {
        self.pins.set_ctrl_pins(rw, en, rs)
    }

    /// Binds D4-D7 of the display and selects the 4-bit interface.
    pub fn init_data_pins_4bit(&mut self, pins: [u8; 4]) -> GpioResult<()> {
        self.init_data_pins(DataPins::Bus4Bit(pins))
    }

    /// Binds D0-D7 of the display and selects the 8-bit interface.
    pub fn init_data_pins_8bit(&mut self, pins: [u8; 8]) -> GpioResult<()> {
        self.init_data_pins(DataPins::Bus8Bit(pins))
    }

    pub fn init_data_pins(&mut self, data: DataPins) -> GpioResult<()> {
        self.pins.set_data_pins(data)?;
        self.state.set_8bit(data.is_8bit());
        Ok(())
    }

    /// Selects the font, applied by the next [HD44780Driver::begin].
    ///
    /// The 5x10 font is only used for single-row displays.
    pub fn set_font(&mut self, font: CharacterFont) {
        self.state.set_font(font);
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    fn set_line(&mut self, role: PinRole, high: bool) -> GpioResult<()> {
        if let Some((port, mask)) = self.pins.resolve(role) {
            self.backend.set_level(port, mask, high)?;
        }
        Ok(())
    }

    fn configure_outputs(&mut self) -> GpioResult<()> {
        for role in [PinRole::Rs, PinRole::Rw, PinRole::En] {
            if let Some((port, mask)) = self.pins.resolve(role) {
                self.backend.configure_output(port, mask)?;
            }
        }
        self.backend
            .configure_output(self.pins.data_port(), self.pins.data_mask())
    }

    fn pulse_enable(&mut self) -> GpioResult<()> {
        self.set_line(PinRole::En, false)?;
        self.backend.delay_ms(ENABLE_PULSE_DELAY_MS);
        self.set_line(PinRole::En, true)?;
        self.backend.delay_ms(ENABLE_PULSE_DELAY_MS);
        self.set_line(PinRole::En, false)?;
        self.backend.delay_ms(ENABLE_PULSE_DELAY_MS);
        Ok(())
    }

    /// Puts the value on the data bus, bit `n` on data line `n`.
    fn drive_data(&mut self, value: u8) -> GpioResult<()> {
        let port = self.pins.data_port();
        let (high, low) = self.pins.data_levels(value);
        if !high.is_empty() {
            self.backend.set_level(port, high, true)?;
        }
        if !low.is_empty() {
            self.backend.set_level(port, low, false)?;
        }
        Ok(())
    }

    fn write4bits(&mut self, value: u8) -> GpioResult<()> {
        self.drive_data(value & 0x0F)?;
        self.pulse_enable()
    }

    fn write8bits(&mut self, value: u8) -> GpioResult<()> {
        self.drive_data(value)?;
        self.pulse_enable()
    }

    /// Transmits one byte to the selected register.
    ///
    /// On a 4-bit bus the high nibble goes first, each nibble latched by its own enable pulse.
    pub fn send(&mut self, value: u8, mode: RegisterSelect) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {:?}", value, mode);

        self.set_line(PinRole::Rs, mode.level())?;

        // Set RW pin to write
        self.set_line(PinRole::Rw, false)?;

        if self.state.is_8bit() {
            self.write8bits(value)?;
        } else {
            let high_nibble = (value >> 4) & 0x0F;
            let low_nibble = value & 0x0F;
            trace!("Writing HN: {:04b}", high_nibble);
            self.write4bits(high_nibble)?;
            trace!("Writing LN: {:04b}", low_nibble);
            self.write4bits(low_nibble)?;
        }

        Ok(())
    }

    /// Moves the cursor to the given column and row, both counted from 0.
    ///
    /// Rows past the last one are clamped to it. Columns are not checked: a column past the end of
    /// the row addresses DDRAM beyond it, which usually shows up on another row.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> GpioResult<()> {
        let command = self.state.set_cursor_command(col, row);
        self.command(command)
    }

    fn update_control(&mut self, flags: u8, on: bool) -> GpioResult<()> {
        let command = self.state.set_control(flags, on);
        self.command(command)
    }

    fn update_entry_mode(&mut self, flags: u8, on: bool) -> GpioResult<()> {
        let command = self.state.set_entry_mode(flags, on);
        self.command(command)
    }

    /// Turns the display on. DDRAM is kept while the display is off.
    pub fn display(&mut self) -> GpioResult<()> {
        self.update_control(DISPLAY_ON, true)
    }

    pub fn no_display(&mut self) -> GpioResult<()> {
        self.update_control(DISPLAY_ON, false)
    }

    /// Shows the underline cursor.
    pub fn cursor(&mut self) -> GpioResult<()> {
        self.update_control(CURSOR_ON, true)
    }

    pub fn no_cursor(&mut self) -> GpioResult<()> {
        self.update_control(CURSOR_ON, false)
    }

    /// Shifts the display with every character written, so the text seems to flow out of a
    /// stationary cursor.
    pub fn autoscroll(&mut self) -> GpioResult<()> {
        self.update_entry_mode(ENTRY_SHIFT_INCREMENT, true)
    }

    pub fn no_autoscroll(&mut self) -> GpioResult<()> {
        self.update_entry_mode(ENTRY_SHIFT_INCREMENT, false)
    }

    pub fn left_to_right(&mut self) -> GpioResult<()> {
        self.update_entry_mode(ENTRY_LEFT, true)
    }

    pub fn right_to_left(&mut self) -> GpioResult<()> {
        self.update_entry_mode(ENTRY_LEFT, false)
    }

    /// Sets the direction text flows in.
    pub fn set_text_direction(&mut self, direction: CursorDirection) -> GpioResult<()> {
        match direction {
            CursorDirection::Right => self.left_to_right(),
            CursorDirection::Left => self.right_to_left(),
        }
    }
}

impl<B: GpioBackend> HD44780Driver for GpioHD44780Driver<B> {
    /// Runs the HD44780 power-on initialization (datasheet figures 23 and 24).
    ///
    /// The controller may be anywhere in a half-received instruction, so it is first forced into
    /// 8-bit mode three times before the real interface width is selected. Ends with the display
    /// on, cursor and blinking off, display cleared and text flowing left to right.
    fn begin(&mut self, cols: u8, rows: u8) -> GpioResult<()> {
        debug!(
            "Initializing {}x{} display, {}-bit bus",
            cols,
            rows,
            if self.state.is_8bit() { 8 } else { 4 }
        );

        self.state.configure(cols, rows);

        self.pins.enable_clocks(&mut self.backend)?;
        self.configure_outputs()?;

        self.backend.delay_ms(POWER_ON_DELAY_MS);

        // Pull RS, E and RW low to begin commands
        self.set_line(PinRole::Rs, false)?;
        self.set_line(PinRole::En, false)?;
        self.set_line(PinRole::Rw, false)?;

        // Synchronize
        if self.state.is_8bit() {
            let function_set = self.state.function_set_command();
            for delay in RESYNC_DELAYS_MS {
                self.command(function_set)?;
                self.backend.delay_ms(delay);
            }
        } else {
            for delay in RESYNC_DELAYS_MS {
                self.write4bits(0x03)?;
                self.backend.delay_ms(delay);
            }
            self.write4bits(0x02)?;
        }

        self.command(self.state.function_set_command())?;

        let command = self.state.reset_control(DISPLAY_ON | CURSOR_OFF | BLINK_OFF);
        self.command(command)?;

        self.clear()?;

        let command = self.state.reset_entry_mode(ENTRY_LEFT | ENTRY_SHIFT_DECREMENT);
        self.command(command)?;

        debug!("Display initialized, {:?}", self.state);
        Ok(())
    }

    fn command(&mut self, value: u8) -> GpioResult<()> {
        self.send(value, RegisterSelect::Command)
    }

    fn write(&mut self, value: u8) -> GpioResult<usize> {
        self.send(value, RegisterSelect::Data)?;
        Ok(1)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.backend.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcd::hd44780::driver::LONG_INSTRUCTION_DELAY_MS;
    use crate::recording::{GpioOp, RecordingBackend};
    use crate::PinMask;
    use std::collections::BTreeMap;

    const DATA: GpioPort = GpioPort(0);
    const CTRL: GpioPort = GpioPort(1);
    const RW_PORT: GpioPort = GpioPort(2);

    const RS_PIN: u8 = 0;
    const EN_PIN: u8 = 1;
    const RW_PIN: u8 = 2;

    fn set_level(port: GpioPort, pin: u8, high: bool) -> GpioOp {
        GpioOp::SetLevel {
            port,
            mask: PinMask(1 << pin),
            high,
        }
    }

    fn lcd_4bit() -> GpioHD44780Driver<RecordingBackend> {
        let mut lcd = GpioHD44780Driver::new(RecordingBackend::new(), DATA, RW_PORT, CTRL, CTRL);
        lcd.init_ctrl_pins(Some(RW_PIN), EN_PIN, RS_PIN).unwrap();
        lcd.init_data_pins_4bit([4, 5, 6, 7]).unwrap();
        lcd
    }

    fn lcd_8bit() -> GpioHD44780Driver<RecordingBackend> {
        let mut lcd = GpioHD44780Driver::new(RecordingBackend::new(), DATA, RW_PORT, CTRL, CTRL);
        lcd.init_ctrl_pins(Some(RW_PIN), EN_PIN, RS_PIN).unwrap();
        lcd.init_data_pins_8bit([8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
        lcd
    }

    /// Replays the recorded operations and returns what the controller latched on every rising
    /// edge of E: the level of RS and the value on the data lines.
    fn latched(lcd: &GpioHD44780Driver<RecordingBackend>) -> Vec<(bool, u8)> {
        let pins = lcd.pins();
        let (en_port, en_mask) = pins.resolve(PinRole::En).unwrap();
        let (rs_port, rs_mask) = pins.resolve(PinRole::Rs).unwrap();
        let data: Vec<(GpioPort, PinMask)> = (0..pins.data_pins().pins().len())
            .map(|n| pins.resolve(PinRole::Data(n)).unwrap())
            .collect();

        let mut levels: BTreeMap<GpioPort, u32> = BTreeMap::new();
        let mut result = Vec::new();
        for op in lcd.backend().ops() {
            if let GpioOp::SetLevel { port, mask, high } = *op {
                let level = levels.entry(port).or_default();
                if high {
                    *level |= mask.bits();
                } else {
                    *level &= !mask.bits();
                }
                if high && port == en_port && mask.contains(en_mask) {
                    let is_set = |port: GpioPort, mask: PinMask| {
                        levels.get(&port).copied().unwrap_or(0) & mask.bits() != 0
                    };
                    let value = data
                        .iter()
                        .enumerate()
                        .filter(|&(_, &(port, mask))| is_set(port, mask))
                        .fold(0u8, |acc, (bit, _)| acc | (1 << bit));
                    result.push((is_set(rs_port, rs_mask), value));
                }
            }
        }
        result
    }

    fn nibbles(rs: bool, bytes: &[u8]) -> Vec<(bool, u8)> {
        bytes
            .iter()
            .flat_map(|&byte| [(rs, byte >> 4), (rs, byte & 0x0F)])
            .collect()
    }

    #[test]
    fn four_bit_send_is_high_nibble_first() {
        let mut lcd = lcd_4bit();
        for byte in 0..=255u8 {
            lcd.backend_mut().clear_ops();
            lcd.write(byte).unwrap();
            assert_eq!(latched(&lcd), vec![(true, byte >> 4), (true, byte & 0x0F)]);

            lcd.backend_mut().clear_ops();
            lcd.command(byte).unwrap();
            assert_eq!(latched(&lcd), vec![(false, byte >> 4), (false, byte & 0x0F)]);
        }
    }

    #[test]
    fn eight_bit_send_is_one_pulse() {
        let mut lcd = lcd_8bit();
        for byte in 0..=255u8 {
            lcd.backend_mut().clear_ops();
            lcd.write(byte).unwrap();
            assert_eq!(latched(&lcd), vec![(true, byte)]);
        }
    }

    #[test]
    fn write_reports_one_byte() {
        let mut lcd = lcd_4bit();
        assert_eq!(lcd.write(b'x'), Ok(1));
    }

    #[test]
    fn send_pulls_rw_low_before_data() {
        let mut lcd = lcd_4bit();
        lcd.write(0xA5).unwrap();
        let ops = lcd.backend().ops();
        assert_eq!(ops[0], set_level(CTRL, RS_PIN, true));
        assert_eq!(ops[1], set_level(RW_PORT, RW_PIN, false));
    }

    #[test]
    fn enable_pulse_timing() {
        let mut lcd = lcd_8bit();
        lcd.command(0x01).unwrap();
        let ops = lcd.backend().ops();
        assert_eq!(
            &ops[ops.len() - 6..],
            &[
                set_level(CTRL, EN_PIN, false),
                GpioOp::Delay(1),
                set_level(CTRL, EN_PIN, true),
                GpioOp::Delay(1),
                set_level(CTRL, EN_PIN, false),
                GpioOp::Delay(1),
            ]
        );
    }

    #[test]
    fn begin_4bit_sequence() {
        let mut lcd = lcd_4bit();
        lcd.begin(16, 2).unwrap();

        let mut expected = vec![(false, 0x3), (false, 0x3), (false, 0x3), (false, 0x2)];
        expected.extend(nibbles(false, &[0x28, 0x0C, 0x01, 0x06]));
        assert_eq!(latched(&lcd), expected);

        assert_eq!(lcd.state().control(), DISPLAY_ON);
        assert_eq!(lcd.state().entry_mode(), ENTRY_LEFT);
        assert_eq!(lcd.state().row_offsets(), &[0x00, 0x40]);
    }

    #[test]
    fn begin_8bit_sequence() {
        let mut lcd = lcd_8bit();
        lcd.begin(20, 4).unwrap();
        let expected: Vec<_> = [0x38, 0x38, 0x38, 0x38, 0x0C, 0x01, 0x06]
            .into_iter()
            .map(|byte| (false, byte))
            .collect();
        assert_eq!(latched(&lcd), expected);
    }

    #[test]
    fn begin_single_row_tall_font() {
        let mut lcd = lcd_8bit();
        lcd.set_font(CharacterFont::Dots5x10);
        lcd.begin(16, 1).unwrap();
        assert_eq!(latched(&lcd)[3], (false, 0x34));
    }

    #[test]
    fn begin_prepares_pins_before_waiting() {
        let mut lcd = lcd_4bit();
        lcd.begin(16, 2).unwrap();
        let ops = lcd.backend().ops();
        assert_eq!(
            &ops[..6],
            &[
                GpioOp::EnableClock(DATA),
                GpioOp::EnableClock(RW_PORT),
                GpioOp::EnableClock(CTRL),
                GpioOp::ConfigureOutput(CTRL, PinMask(1 << RS_PIN)),
                GpioOp::ConfigureOutput(RW_PORT, PinMask(1 << RW_PIN)),
                GpioOp::ConfigureOutput(CTRL, PinMask(1 << EN_PIN)),
            ]
        );
        assert_eq!(ops[6], GpioOp::ConfigureOutput(DATA, PinMask(0xF0)));
        assert_eq!(ops[7], GpioOp::Delay(POWER_ON_DELAY_MS));
        assert_eq!(ops[8], set_level(CTRL, RS_PIN, false));
        assert_eq!(ops[9], set_level(CTRL, EN_PIN, false));
        assert_eq!(ops[10], set_level(RW_PORT, RW_PIN, false));
    }

    #[test]
    fn begin_waits_between_resync_attempts() {
        let mut lcd = lcd_4bit();
        lcd.begin(16, 2).unwrap();
        // Delays that don't belong to an enable pulse
        let delays: Vec<u32> = lcd
            .backend()
            .ops()
            .iter()
            .filter_map(|op| match op {
                GpioOp::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect::<Vec<_>>()
            .split(|&ms| ms == ENABLE_PULSE_DELAY_MS)
            .flat_map(|run| run.to_vec())
            .collect();
        assert_eq!(delays, vec![50, 5, 5, 2]);
        assert!(lcd.backend().total_delay_ms() >= 50 + 5 + 5 + 1 + 2);
    }

    #[test]
    fn single_port_display_enables_one_clock() {
        let mut lcd = GpioHD44780Driver::new(RecordingBackend::new(), DATA, DATA, DATA, DATA);
        lcd.init_ctrl_pins(Some(8), 9, 10).unwrap();
        lcd.init_data_pins_4bit([0, 1, 2, 3]).unwrap();
        lcd.begin(16, 2).unwrap();
        let clocks = lcd
            .backend()
            .ops()
            .iter()
            .filter(|op| matches!(op, GpioOp::EnableClock(_)))
            .count();
        assert_eq!(clocks, 1);
    }

    #[test]
    fn unwired_rw_is_never_touched() {
        let mut lcd = GpioHD44780Driver::new(RecordingBackend::new(), DATA, RW_PORT, CTRL, CTRL);
        lcd.init_ctrl_pins(None, EN_PIN, RS_PIN).unwrap();
        lcd.init_data_pins_4bit([4, 5, 6, 7]).unwrap();
        lcd.begin(16, 2).unwrap();
        lcd.print_str("hi").unwrap();

        assert!(lcd.backend().ops().iter().all(|op| match op {
            GpioOp::EnableClock(port) | GpioOp::ConfigureOutput(port, _) => *port != RW_PORT,
            GpioOp::SetLevel { port, .. } => *port != RW_PORT,
            GpioOp::Delay(_) => true,
        }));
    }

    #[test]
    fn print_sends_each_byte_as_data() {
        let mut lcd = lcd_4bit();
        lcd.begin(16, 2).unwrap();

        lcd.backend_mut().clear_ops();
        assert_eq!(lcd.print(b""), Ok(0));
        assert!(lcd.backend().ops().is_empty());

        assert_eq!(lcd.print_str("AB"), Ok(2));
        assert_eq!(latched(&lcd), nibbles(true, b"AB"));
    }

    #[test]
    fn clear_and_home_wait_two_ms() {
        let mut lcd = lcd_8bit();
        lcd.clear().unwrap();
        assert_eq!(latched(&lcd), vec![(false, CLEAR_DISPLAY)]);
        assert_eq!(lcd.backend().ops().last(), Some(&GpioOp::Delay(LONG_INSTRUCTION_DELAY_MS)));

        lcd.backend_mut().clear_ops();
        lcd.home().unwrap();
        assert_eq!(latched(&lcd), vec![(false, RETURN_HOME)]);
        assert_eq!(lcd.backend().ops().last(), Some(&GpioOp::Delay(LONG_INSTRUCTION_DELAY_MS)));
    }

    #[test]
    fn set_cursor_clamps_row() {
        let mut lcd = lcd_8bit();
        lcd.begin(16, 2).unwrap();

        lcd.backend_mut().clear_ops();
        lcd.set_cursor(5, 1).unwrap();
        lcd.set_cursor(5, 3).unwrap();
        lcd.set_cursor(5, 255).unwrap();
        assert_eq!(latched(&lcd), vec![(false, 0xC5); 3]);

        lcd.begin(20, 4).unwrap();
        lcd.backend_mut().clear_ops();
        lcd.set_cursor(1, 9).unwrap();
        assert_eq!(latched(&lcd), vec![(false, SET_DDRAM_ADDR | (0x54 + 1))]);
    }

    #[test]
    fn create_char_slot_wraps() {
        let pattern = [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F];

        let mut lcd = lcd_4bit();
        lcd.create_char(9, &pattern).unwrap();
        let wrapped = latched(&lcd);

        let mut lcd = lcd_4bit();
        lcd.create_char(1, &pattern).unwrap();
        assert_eq!(wrapped, latched(&lcd));

        let mut expected = nibbles(false, &[SET_CGRAM_ADDR | 0x08]);
        expected.extend(nibbles(true, &pattern));
        assert_eq!(wrapped, expected);
    }

    #[test]
    fn toggles_keep_other_flags() {
        let mut lcd = lcd_8bit();
        lcd.begin(16, 2).unwrap();
        lcd.state.reset_control(DISPLAY_ON | BLINK_ON);
        let before = lcd.state().control();

        lcd.cursor().unwrap();
        lcd.no_cursor().unwrap();
        assert_eq!(lcd.state().control(), before);

        lcd.backend_mut().clear_ops();
        lcd.no_display().unwrap();
        lcd.display().unwrap();
        assert_eq!(latched(&lcd), vec![(false, 0x09), (false, 0x0D)]);
        assert_eq!(lcd.state().control(), before);
    }

    #[test]
    fn entry_mode_toggles() {
        let mut lcd = lcd_8bit();
        lcd.begin(16, 2).unwrap();

        lcd.backend_mut().clear_ops();
        lcd.autoscroll().unwrap();
        lcd.right_to_left().unwrap();
        lcd.no_autoscroll().unwrap();
        lcd.set_text_direction(CursorDirection::Right).unwrap();
        assert_eq!(
            latched(&lcd),
            vec![(false, 0x07), (false, 0x05), (false, 0x04), (false, 0x06)]
        );
    }

    #[test]
    fn instances_do_not_share_state() {
        let mut first = lcd_4bit();
        let mut second = lcd_8bit();
        first.begin(16, 2).unwrap();
        second.begin(20, 4).unwrap();
        first.cursor().unwrap();

        assert_eq!(first.state().control(), DISPLAY_ON | CURSOR_ON);
        assert_eq!(second.state().control(), DISPLAY_ON);
        assert!(!first.state().is_8bit());
        assert!(second.state().is_8bit());
    }
}
