//! Charger IC drivers.
//!
//! Both chargers on the board share a role (watchdog, telemetry, charge
//! enable, input current limit) but not their register layouts or variant
//! sets, so they meet at the [`Charger`] trait with associated types instead
//! of a common base.

use crate::bus::{BusError, RegisterBus};

pub mod bq24161;
pub mod bq24250;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargerError {
    Bus(BusError),
    /// The request is outside the device's documented range. Nothing was written.
    OutOfRange,
}

impl From<BusError> for ChargerError {
    fn from(err: BusError) -> Self {
        ChargerError::Bus(err)
    }
}

/// An input current limit setting with an optional milliamp meaning.
pub trait InputCurrentLimit: Copy + Sized {
    /// Current the setting allows, `None` for modes without a fixed value
    /// (external resistor, passthrough, high impedance).
    fn milliamps(self) -> Option<u16>;

    /// Exact inverse of `milliamps`.
    fn from_milliamps(milliamps: u16) -> Option<Self>;
}

pub trait Charger {
    type DeviceState: Copy + PartialEq;
    type Fault: Copy + PartialEq;
    type Telemetry: Copy;

    fn telemetry(&self) -> &Self::Telemetry;

    fn device_state(&self) -> Self::DeviceState;

    fn fault(&self) -> Self::Fault;

    fn is_charging(&self) -> bool;

    fn reset_watchdog<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError>;

    /// Refreshes the telemetry record. On error the previous record is kept.
    fn synchronize<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError>;

    fn set_charging_enabled<B: RegisterBus>(&mut self, bus: &mut B, enable: bool) -> Result<(), BusError>;
}
