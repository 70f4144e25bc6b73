/*
 * Register bus transport.
 *
 * Every device on the power board is a register-mapped two-wire slave. The
 * drivers only ever need "read N registers starting at R" and "write one
 * register", so that is all the transport exposes. `I2cBus` adapts any
 * embedded-hal I2C peripheral. `SimulatedBus` backs the host tests and is
 * only built for tests or with the `sim` feature.
 */

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    Nack,
    Bus,
    ArbitrationLoss,
    Overrun,
    Other,
}

impl From<ErrorKind> for BusError {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoAcknowledge(_) => BusError::Nack,
            ErrorKind::Bus => BusError::Bus,
            ErrorKind::ArbitrationLoss => BusError::ArbitrationLoss,
            ErrorKind::Overrun => BusError::Overrun,
            _ => BusError::Other,
        }
    }
}

pub trait RegisterBus {
    /// Burst read of `buf.len()` consecutive registers starting at `register`.
    fn read_registers(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError>;

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError>;

    /// Raw write with no register pointer, used for broadcast commands.
    fn write_raw(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError>;

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        let mut value = [0u8; 1];
        self.read_registers(address, register, &mut value)?;
        Ok(value[0])
    }

    /// Read, transform and write back a single register.
    fn modify_register<F>(&mut self, address: u8, register: u8, f: F) -> Result<u8, BusError>
    where
        F: FnOnce(u8) -> u8,
    {
        let current = self.read_register(address, register)?;
        let updated = f(current);
        self.write_register(address, register, updated)?;
        Ok(updated)
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read_registers(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        (**self).read_registers(address, register, buf)
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write_register(address, register, value)
    }

    fn write_raw(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        (**self).write_raw(address, bytes)
    }
}

/// Register bus on top of a blocking embedded-hal I2C peripheral.
pub struct I2cBus<I> {
    i2c: I,
}

impl<I: I2c> I2cBus<I> {
    pub fn new(i2c: I) -> Self {
        I2cBus { i2c }
    }
}

impl<I: I2c> RegisterBus for I2cBus<I> {
    fn read_registers(&mut self, address: u8, register: u8, buf: &mut [u8]) -> Result<(), BusError> {
        self.i2c
            .write_read(address, &[register], buf)
            .map_err(|err| BusError::from(err.kind()))
    }

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(address, &[register, value])
            .map_err(|err| BusError::from(err.kind()))
    }

    fn write_raw(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.i2c
            .write(address, bytes)
            .map_err(|err| BusError::from(err.kind()))
    }
}

///////////////////////
//  simulated bus    //
///////////////////////

#[cfg(any(test, feature = "sim"))]
mod sim;
#[cfg(any(test, feature = "sim"))]
pub use sim::{BusWrite, SimulatedBus, SIM_NUM_ADDRESSES, SIM_NUM_REGISTERS, SIM_WRITE_LOG_DEPTH};
