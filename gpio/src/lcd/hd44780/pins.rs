use crate::{GpioBackend, GpioPort, GpioResult, PinMask};
use bitvec::prelude::*;
use log::debug;

/// The data lines of the display, in order from the lowest bit.
///
/// In 4-bit mode only D4-D7 of the display are connected, the pins listed here are then
/// D4, D5, D6 and D7.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DataPins {
    Bus4Bit([u8; 4]),
    Bus8Bit([u8; 8]),
}

impl DataPins {
    pub fn is_8bit(&self) -> bool {
        matches!(self, DataPins::Bus8Bit(_))
    }

    pub fn is_4bit(&self) -> bool {
        matches!(self, DataPins::Bus4Bit(_))
    }

    pub fn pins(&self) -> &[u8] {
        match self {
            DataPins::Bus4Bit(pins) => pins,
            DataPins::Bus8Bit(pins) => pins,
        }
    }
}

impl Default for DataPins {
    fn default() -> Self {
        DataPins::Bus4Bit([0; 4])
    }
}

/// A logical line of the display.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PinRole {
    /// Data line `n` of the bus, `0` being the lowest bit transmitted.
    Data(usize),
    Rw,
    En,
    Rs,
}

/// Maps the lines of one display to physical pins.
///
/// The data lines all live on one port, while every control line has a port of its own, which may
/// be the same one as any other. RW is optional: a display with RW tied to ground is write-only,
/// which is all this driver needs.
///
/// Nothing is checked against the hardware, binding pins that don't exist or leaving the defaults
/// in place is up to the caller.
#[derive(Debug, Clone)]
pub struct PinMap {
    port_data: GpioPort,
    port_rw: GpioPort,
    port_en: GpioPort,
    port_rs: GpioPort,

    rw: Option<PinMask>,
    en: PinMask,
    rs: PinMask,
    data: DataPins,
    data_masks: [PinMask; 8],
}

impl PinMap {
    pub fn new(
        port_data: GpioPort,
        port_rw: GpioPort,
        port_en: GpioPort,
        port_rs: GpioPort,
    ) -> Self {
        PinMap {
            port_data,
            port_rw,
            port_en,
            port_rs,
            rw: None,
            en: PinMask(1),
            rs: PinMask(1),
            data: DataPins::default(),
            data_masks: [PinMask(1); 8],
        }
    }

    /// Binds the control lines. `rw` of `None` means RW isn't wired.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if any pin number doesn't fit in a port.
    pub fn set_ctrl_pins(&mut self, rw: Option<u8>, en: u8, rs: u8) -> GpioResult<()> {
        let rw = rw.map(PinMask::pin).transpose()?;
        let en = PinMask::pin(en)?;
        let rs = PinMask::pin(rs)?;
        self.rw = rw;
        self.en = en;
        self.rs = rs;
        Ok(())
    }

    /// Binds the data lines, which also decides the bus width.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if any pin number doesn't fit in a port.
    pub fn set_data_pins(&mut self, data: DataPins) -> GpioResult<()> {
        let mut masks = [PinMask::EMPTY; 8];
        for (mask, &pin) in masks.iter_mut().zip(data.pins()) {
            *mask = PinMask::pin(pin)?;
        }
        self.data = data;
        self.data_masks = masks;
        Ok(())
    }

    pub fn data_pins(&self) -> DataPins {
        self.data
    }

    pub fn has_rw(&self) -> bool {
        self.rw.is_some()
    }

    /// Resolves a line to its port and pin, `None` if it isn't wired.
    pub fn resolve(&self, role: PinRole) -> Option<(GpioPort, PinMask)> {
        match role {
            PinRole::Data(n) if n < self.data.pins().len() => {
                Some((self.port_data, self.data_masks[n]))
            }
            PinRole::Data(_) => None,
            PinRole::Rw => self.rw.map(|rw| (self.port_rw, rw)),
            PinRole::En => Some((self.port_en, self.en)),
            PinRole::Rs => Some((self.port_rs, self.rs)),
        }
    }

    pub fn data_port(&self) -> GpioPort {
        self.port_data
    }

    /// Gets the mask of all data lines in use.
    pub fn data_mask(&self) -> PinMask {
        self.active_data_masks()
            .iter()
            .fold(PinMask::EMPTY, |acc, &mask| acc | mask)
    }

    /// Splits the data lines into the ones to drive high and low to put `value` on the bus.
    ///
    /// Bit `n` of `value` goes to data line `n`. Bits above the bus width are ignored.
    pub fn data_levels(&self, value: u8) -> (PinMask, PinMask) {
        let mut high = PinMask::EMPTY;
        let mut low = PinMask::EMPTY;
        for (bit, &mask) in self.active_data_masks().iter().enumerate() {
            if value & (1 << bit) != 0 {
                high |= mask;
            } else {
                low |= mask;
            }
        }
        (high, low)
    }

    fn active_data_masks(&self) -> &[PinMask] {
        &self.data_masks[..self.data.pins().len()]
    }

    /// Gets every port used by the display exactly once, in the order data, RW, E, RS.
    ///
    /// The port of RW is skipped when RW isn't wired.
    pub fn distinct_ports(&self) -> Vec<GpioPort> {
        let mut seen = bitarr![u32, Lsb0; 0; 256];
        let rw = self.rw.map(|_| self.port_rw);
        [Some(self.port_data), rw, Some(self.port_en), Some(self.port_rs)]
            .into_iter()
            .flatten()
            .filter(|port| !seen.replace(port.index(), true))
            .collect()
    }

    /// Enables the clock of every port used by the display, each one only once.
    pub fn enable_clocks(&self, backend: &mut dyn GpioBackend) -> GpioResult<()> {
        for port in self.distinct_ports() {
            debug!("Enabling clock of port {}", port);
            backend.enable_clock(port)?;
        }
        Ok(())
    }
}
