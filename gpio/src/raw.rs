//! Memory-mapped GPIO backend for the BCM283x family (Raspberry Pi).
//!
//! The 58 GPIO lines are split into two ports matching the register banks of the chip:
//! port 0 holds GPIO 0-31 and port 1 holds GPIO 32-57. A [PinMask] of a port can then be
//! written directly into the `GPSETn`/`GPCLRn` registers.
use crate::{GpioBackend, GpioError, GpioPort, GpioResult, PinMask};
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::thread::sleep;
use std::time::Duration;

pub struct RawGpioBackend {
    mmap: MmapRaw,
}

impl RawGpioBackend {
    // 0x7e200000 on the VC bus
    const GPIO_BASE: u32 = 0x3F200000;

    const PIN_COUNT: usize = 58;
    const PORT_COUNT: usize = Self::PIN_COUNT.div_ceil(32);

    fn create(path: &str) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(Self::GPIO_BASE as u64)
            .len(4096)
            .map_raw(&file)?;

        Ok(RawGpioBackend { mmap })
    }

    pub fn new_gpiomem() -> GpioResult<Self> {
        Self::create("/dev/gpiomem")
    }

    pub fn new_mem() -> GpioResult<Self> {
        Self::create("/dev/mem")
    }

    /// Checks that every pin in the mask exists on the given port.
    fn check_mask(port: GpioPort, mask: PinMask) -> GpioResult<()> {
        if port.index() >= Self::PORT_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        if mask.pins().any(|pin| port.index() * 32 + pin as usize >= Self::PIN_COUNT) {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    pub fn raw_set_pin_function(&self, pin_index: usize, function: u8) -> GpioResult<()> {
        if function > 0b111 {
            return Err(GpioError::InvalidArgument);
        }

        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPFSELn register
        let register_ptr = unsafe { mmap.add(pin_index / 10) };
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift); // Clear the bits for this pin
        register_value |= (function as u32) << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    pub(crate) fn raw_write_bank(
        &self,
        port: GpioPort,
        mask: PinMask,
        high: bool,
    ) -> GpioResult<()> {
        Self::check_mask(port, mask)?;

        let mmap = self.mmap.as_mut_ptr() as *mut u32;
        // GPSETn/GPCLRn register, only the bits set to 1 are affected
        let offset = if high { 0x1c / 4 } else { 0x28 / 4 };
        let register_ptr = unsafe { mmap.add(offset + port.index()) };

        unsafe { register_ptr.write_volatile(mask.bits()) };

        Ok(())
    }
}

impl Debug for RawGpioBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioBackend({:?})", self.mmap.as_ptr().addr())
    }
}

impl GpioBackend for RawGpioBackend {
    /// The GPIO block of the BCM283x is always clocked, so this only validates the port.
    fn enable_clock(&mut self, port: GpioPort) -> GpioResult<()> {
        if port.index() >= Self::PORT_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        debug!("{:?}: clock of port {} is always on", self, port);
        Ok(())
    }

    fn configure_output(&mut self, port: GpioPort, mask: PinMask) -> GpioResult<()> {
        Self::check_mask(port, mask)?;
        for pin in mask.pins() {
            self.raw_set_pin_function(port.index() * 32 + pin as usize, 1)?; // Set to output
        }
        Ok(())
    }

    fn set_level(&mut self, port: GpioPort, mask: PinMask, high: bool) -> GpioResult<()> {
        self.raw_write_bank(port, mask, high)
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms as u64));
    }
}
