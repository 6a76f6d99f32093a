use charlcd_gpio::GpioResult;
use charlcd_gpio::lcd::hd44780::HD44780Driver;
use log::warn;

/// Replaces every non-ASCII character with `?`, which the HD44780 ROM can't show anyway.
pub fn to_ascii_lossy(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                c
            } else {
                warn!("Non-ASCII character: {}", c);
                '?'
            }
        })
        .collect()
}

pub trait DisplayExt {
    /// Prints the text, keeping the display's character ROM in mind.
    fn print_ascii(&mut self, s: &str) -> GpioResult<usize>;
}

impl<T: ?Sized + HD44780Driver> DisplayExt for T {
    fn print_ascii(&mut self, s: &str) -> GpioResult<usize> {
        self.print(to_ascii_lossy(s).as_bytes())
    }
}
