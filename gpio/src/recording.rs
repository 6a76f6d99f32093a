//! GPIO backend that doesn't touch any hardware.
//!
//! Records every operation in order and keeps track of the output levels, which makes it possible
//! to replay what a driver did to the pins. Delays return immediately.
use crate::{GpioBackend, GpioPort, GpioResult, PinMask};
use log::trace;
use std::collections::BTreeMap;

/// A single operation performed on a [RecordingBackend].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GpioOp {
    EnableClock(GpioPort),
    ConfigureOutput(GpioPort, PinMask),
    SetLevel {
        port: GpioPort,
        mask: PinMask,
        high: bool,
    },
    Delay(u32),
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    ops: Vec<GpioOp>,
    levels: BTreeMap<GpioPort, u32>,
    outputs: BTreeMap<GpioPort, u32>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets all operations recorded so far, oldest first.
    pub fn ops(&self) -> &[GpioOp] {
        &self.ops
    }

    /// Forgets the recorded operations, keeping the pin levels.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Gets the current output levels of a port, one bit per pin.
    pub fn levels(&self, port: GpioPort) -> u32 {
        self.levels.get(&port).copied().unwrap_or(0)
    }

    /// Gets the pins of a port configured as outputs.
    pub fn outputs(&self, port: GpioPort) -> PinMask {
        PinMask(self.outputs.get(&port).copied().unwrap_or(0))
    }

    /// Gets the total time spent in delays, in milliseconds.
    pub fn total_delay_ms(&self) -> u64 {
        self.ops
            .iter()
            .map(|op| match op {
                GpioOp::Delay(ms) => *ms as u64,
                _ => 0,
            })
            .sum()
    }
}

impl GpioBackend for RecordingBackend {
    fn enable_clock(&mut self, port: GpioPort) -> GpioResult<()> {
        self.ops.push(GpioOp::EnableClock(port));
        Ok(())
    }

    fn configure_output(&mut self, port: GpioPort, mask: PinMask) -> GpioResult<()> {
        *self.outputs.entry(port).or_default() |= mask.bits();
        self.ops.push(GpioOp::ConfigureOutput(port, mask));
        Ok(())
    }

    fn set_level(&mut self, port: GpioPort, mask: PinMask, high: bool) -> GpioResult<()> {
        trace!("{} {} <- {}", port, mask, high);
        let level = self.levels.entry(port).or_default();
        if high {
            *level |= mask.bits();
        } else {
            *level &= !mask.bits();
        }
        self.ops.push(GpioOp::SetLevel { port, mask, high });
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.ops.push(GpioOp::Delay(ms));
    }
}
