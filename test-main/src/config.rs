use charlcd_gpio::GpioPort;
use charlcd_gpio::lcd::hd44780::command::CharacterFont;
use dotenv::var;
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::ffi::OsStr;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "charlcd.json";

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// BCM283x registers through `/dev/gpiomem`.
    Gpiomem,
    /// BCM283x registers through `/dev/mem`, needs root.
    Mem,
    /// No hardware, operations are only logged.
    Recording,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone)]
pub struct PortsConfig {
    pub data: u8,
    pub rw: u8,
    pub en: u8,
    pub rs: u8,
}

impl PortsConfig {
    pub fn data(&self) -> GpioPort {
        GpioPort(self.data)
    }

    pub fn rw(&self) -> GpioPort {
        GpioPort(self.rw)
    }

    pub fn en(&self) -> GpioPort {
        GpioPort(self.en)
    }

    pub fn rs(&self) -> GpioPort {
        GpioPort(self.rs)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PinsConfig {
    /// `None` if RW is tied to ground.
    pub rw: Option<u8>,
    pub en: u8,
    pub rs: u8,
    /// 4 pins (D4-D7) or 8 pins (D0-D7), lowest bit first.
    pub data: Vec<u8>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub ports: PortsConfig,
    pub pins: PinsConfig,
    pub cols: u8,
    pub rows: u8,
    #[serde(default)]
    pub tall_font: bool,
}

impl Config {
    /// `Ok(None)` means there is no config file yet. A file that exists but can't be read
    /// or parsed is an error.
    pub fn try_load() -> eyre::Result<Option<Self>> {
        let config_str = var_os("CHARLCD_CONFIG_FILE");
        let config_str: &OsStr = config_str.as_deref().unwrap_or(OsStr::new(DEFAULT_CONFIG_FILE));
        Self::load_from(Path::new(config_str))
    }

    pub fn load_from(config_path: &Path) -> eyre::Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .wrap_err_with(|| format!("Failed to open {}", config_path.display()))?;
        let reader = std::io::BufReader::new(file);
        let config = serde_json::from_reader(reader)
            .wrap_err_with(|| format!("Invalid config in {}", config_path.display()))?;
        Ok(Some(config))
    }

    pub fn save(&self) -> std::io::Result<()> {
        let config_str =
            var("CHARLCD_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let config_path = Path::new(&config_str);
        let file = std::fs::File::create(config_path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn font(&self) -> CharacterFont {
        if self.tall_font {
            CharacterFont::Dots5x10
        } else {
            CharacterFont::Dots5x8
        }
    }
}

impl Default for Config {
    /// A 20x4 display on a Raspberry Pi, 4-bit bus, everything on the first bank.
    fn default() -> Self {
        Config {
            backend: BackendKind::Gpiomem,
            ports: PortsConfig {
                data: 0,
                rw: 0,
                en: 0,
                rs: 0,
            },
            pins: PinsConfig {
                rw: Some(27),
                en: 17,
                rs: 22,
                data: vec![26, 16, 20, 21],
            },
            cols: 20,
            rows: 4,
            tall_font: false,
        }
    }
}
