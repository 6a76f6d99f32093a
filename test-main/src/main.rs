mod config;
mod utils;

use crate::config::{BackendKind, Config};
use crate::utils::DisplayExt;
use charlcd_gpio::GpioBackend;
use charlcd_gpio::lcd::hd44780::{GpioHD44780Driver, HD44780Driver};
use charlcd_gpio::raw::RawGpioBackend;
use charlcd_gpio::recording::RecordingBackend;
use dotenv::dotenv;
use log::{debug, info};
use std::env::var;
use sysinfo::System;
use time::OffsetDateTime;

const UNKNOWN_STR: &str = "???";

/// A padlock, stored in CGRAM slot 0.
const LOCK_GLYPH: [u8; 8] = [
    0b01110,
    0b10001,
    0b10001,
    0b11111,
    0b11011,
    0b11011,
    0b11111,
    0b00000,
];

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    info!(
        "Hello, {}!",
        System::name().as_deref().unwrap_or(UNKNOWN_STR)
    );

    debug!("Trying to load config...");
    let config = match Config::try_load()? {
        Some(config) => {
            info!("Config loaded.");
            config
        }
        None => {
            info!("Config not found. Using default");
            let config = Config::default();
            config.save()?;
            info!("Default config saved.");
            config
        }
    };

    let dry_run = var("CHARLCD_DRY_RUN").is_ok_and(|v| v == "1");

    info!(
        "LCD {}x{} @ E: {}, RW: {:?}, RS: {}, Data: {:?}",
        config.cols, config.rows, config.pins.en, config.pins.rw, config.pins.rs, config.pins.data
    );

    match (dry_run, config.backend) {
        (true, _) | (false, BackendKind::Recording) => {
            let backend = run(RecordingBackend::new(), &config)?;
            info!(
                "Dry run done, {} GPIO operations, {} ms of delays.",
                backend.ops().len(),
                backend.total_delay_ms()
            );
        }
        (false, BackendKind::Gpiomem) => {
            run(RawGpioBackend::new_gpiomem()?, &config)?;
        }
        (false, BackendKind::Mem) => {
            run(RawGpioBackend::new_mem()?, &config)?;
        }
    }

    Ok(())
}

fn run<B: GpioBackend>(backend: B, config: &Config) -> eyre::Result<B> {
    debug!("Initializing LCD driver on {:?}...", backend);
    let ports = config.ports;
    let mut lcd = GpioHD44780Driver::new(backend, ports.data(), ports.rw(), ports.en(), ports.rs());

    lcd.init_ctrl_pins(config.pins.rw, config.pins.en, config.pins.rs)?;
    match config.pins.data.len() {
        4 => lcd.init_data_pins_4bit(config.pins.data[..].try_into()?)?,
        8 => lcd.init_data_pins_8bit(config.pins.data[..].try_into()?)?,
        _ => return Err(eyre::eyre!("Invalid number of data pins")),
    }
    lcd.set_font(config.font());

    lcd.begin(config.cols, config.rows)?;
    debug!("{:?} initialized.", lcd);

    lcd.create_char(0, &LOCK_GLYPH)?;
    lcd.set_cursor(0, 0)?;
    lcd.putch(0)?;
    lcd.print_str(" charlcd v.")?;
    lcd.print_str(env!("CARGO_PKG_VERSION"))?;

    if config.rows > 1 {
        lcd.set_cursor(0, 1)?;
        let host = System::host_name().unwrap_or_else(|| UNKNOWN_STR.to_string());
        lcd.print_ascii(&host)?;
    }

    if config.rows > 2 {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        lcd.set_cursor(0, 2)?;
        let printed = lcd.print_formatted(format_args!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute()
        ))?;
        debug!("Printed {:?}", printed);
    }

    Ok(lcd.into_backend())
}
