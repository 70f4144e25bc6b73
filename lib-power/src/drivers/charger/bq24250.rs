/*
 * Driver for the TI bq24250 single-input Li-ion charger.
 *
 * http://www.ti.com/lit/ds/symlink/bq24250.pdf
 */

use crate::bus::{BusError, RegisterBus};

use super::{Charger, InputCurrentLimit};

pub const BQ24250_ADDRESS: u8 = 0x6A;

pub const NUM_SYNC_REGISTERS: usize = 2;

#[repr(u8)]
#[allow(non_camel_case_types, dead_code, clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug)]
enum Bq24250Registers {
    STATUS = 0x00,
    CONTROL = 0x01,
    BATTERY_VOLTAGE = 0x02,
    CHARGE_CURRENT = 0x03,
    VIN_DPM = 0x04,
    TIMER_TS = 0x05,
    OVP_THERMAL = 0x06,
}

// R0
const R0_WD_FAULT_MASK: u8 = 0x80;
const R0_WD_EN_MASK: u8 = 0x40;
const R0_STAT_MASK: u8 = 0x30;
const R0_FAULT_MASK: u8 = 0x0F;

// R1
const R1_RST_MASK: u8 = 0x80;
const R1_INPUT_LIMIT_MASK: u8 = 0x70;
const R1_CHG_DISABLE_MASK: u8 = 0x02;
const R1_HIZ_MASK: u8 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Ready,
    Charging,
    Done,
    Fault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    None,
    InputOverVoltage,
    InputUnderVoltage,
    Sleep,
    BatteryThermalShutdown,
    BatteryOverVoltage,
    DeviceThermalShutdown,
    DeviceTimerFault,
    BatteryDisconnected,
    IsetShorted,
    InputFault,
    Undefined,
}

impl Fault {
    /// Faults that point at the battery itself rather than the charger.
    pub const fn is_battery_fault(self) -> bool {
        matches!(self, Fault::BatteryOverVoltage | Fault::BatteryDisconnected)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SingleInputLimit {
    L100,
    L150,
    L500,
    L900,
    L1500,
    L2000,
    /// Limit set by the external ILIM resistor.
    External,
    PassThroughMode,
    HighImpedance,
}

impl SingleInputLimit {
    /// Fixed limits from the largest down.
    pub const LADDER: [SingleInputLimit; 6] = [
        SingleInputLimit::L2000,
        SingleInputLimit::L1500,
        SingleInputLimit::L900,
        SingleInputLimit::L500,
        SingleInputLimit::L150,
        SingleInputLimit::L100,
    ];

    /// Largest fixed limit that does not exceed `available_ma`, high
    /// impedance when even the smallest does not fit.
    pub fn for_budget(available_ma: u16) -> Self {
        SingleInputLimit::LADDER
            .into_iter()
            .find(|limit| limit.milliamps().is_some_and(|ma| ma <= available_ma))
            .unwrap_or(SingleInputLimit::HighImpedance)
    }
}

impl InputCurrentLimit for SingleInputLimit {
    fn milliamps(self) -> Option<u16> {
        match self {
            SingleInputLimit::L100 => Some(100),
            SingleInputLimit::L150 => Some(150),
            SingleInputLimit::L500 => Some(500),
            SingleInputLimit::L900 => Some(900),
            SingleInputLimit::L1500 => Some(1500),
            SingleInputLimit::L2000 => Some(2000),
            SingleInputLimit::External | SingleInputLimit::PassThroughMode | SingleInputLimit::HighImpedance => None,
        }
    }

    fn from_milliamps(milliamps: u16) -> Option<Self> {
        SingleInputLimit::LADDER
            .into_iter()
            .find(|limit| limit.milliamps() == Some(milliamps))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub device_state: DeviceState,
    pub fault: Fault,
    pub watchdog_enabled: bool,
    pub watchdog_fault: bool,
    pub input_limit: SingleInputLimit,
    pub charging_enabled: bool,
}

impl Telemetry {
    pub const fn new() -> Self {
        Telemetry {
            device_state: DeviceState::Ready,
            fault: Fault::None,
            watchdog_enabled: false,
            watchdog_fault: false,
            input_limit: SingleInputLimit::HighImpedance,
            charging_enabled: false,
        }
    }

    pub fn decode(registers: &[u8; NUM_SYNC_REGISTERS]) -> Self {
        let r0 = registers[Bq24250Registers::STATUS as usize];
        let r1 = registers[Bq24250Registers::CONTROL as usize];

        Telemetry {
            device_state: decode_status((r0 & R0_STAT_MASK) >> 4),
            fault: decode_fault(r0 & R0_FAULT_MASK),
            watchdog_enabled: r0 & R0_WD_EN_MASK != 0,
            watchdog_fault: r0 & R0_WD_FAULT_MASK != 0,
            input_limit: decode_input_limit(r1),
            charging_enabled: r1 & R1_CHG_DISABLE_MASK == 0,
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

pub const fn decode_status(code: u8) -> DeviceState {
    match code & 0x03 {
        0x00 => DeviceState::Ready,
        0x01 => DeviceState::Charging,
        0x02 => DeviceState::Done,
        _ => DeviceState::Fault,
    }
}

pub const fn decode_fault(code: u8) -> Fault {
    match code {
        0x00 => Fault::None,
        0x01 => Fault::InputOverVoltage,
        0x02 => Fault::InputUnderVoltage,
        0x03 => Fault::Sleep,
        0x04 => Fault::BatteryThermalShutdown,
        0x05 => Fault::BatteryOverVoltage,
        0x06 => Fault::DeviceThermalShutdown,
        0x07 => Fault::DeviceTimerFault,
        0x08 => Fault::BatteryDisconnected,
        0x09 => Fault::IsetShorted,
        0x0A => Fault::InputFault,
        _ => Fault::Undefined,
    }
}

/// High impedance overrides whatever limit code is programmed.
pub const fn decode_input_limit(r1: u8) -> SingleInputLimit {
    if r1 & R1_HIZ_MASK != 0 {
        return SingleInputLimit::HighImpedance;
    }

    match (r1 & R1_INPUT_LIMIT_MASK) >> 4 {
        0x00 => SingleInputLimit::L100,
        0x01 => SingleInputLimit::L150,
        0x02 => SingleInputLimit::L500,
        0x03 => SingleInputLimit::L900,
        0x04 => SingleInputLimit::L1500,
        0x05 => SingleInputLimit::L2000,
        0x06 => SingleInputLimit::External,
        _ => SingleInputLimit::PassThroughMode,
    }
}

/// Clears the reset bit and high impedance along with the limit field.
pub const fn encode_input_limit(r1: u8, limit: SingleInputLimit) -> u8 {
    let r1 = r1 & !(R1_RST_MASK | R1_INPUT_LIMIT_MASK | R1_HIZ_MASK);
    let code = match limit {
        SingleInputLimit::L100 => 0x00,
        SingleInputLimit::L150 => 0x01,
        SingleInputLimit::L500 => 0x02,
        SingleInputLimit::L900 => 0x03,
        SingleInputLimit::L1500 => 0x04,
        SingleInputLimit::L2000 => 0x05,
        SingleInputLimit::External => 0x06,
        SingleInputLimit::PassThroughMode => 0x07,
        SingleInputLimit::HighImpedance => return r1 | R1_HIZ_MASK,
    };

    r1 | (code << 4)
}

pub const fn encode_charging_enabled(r1: u8, enable: bool) -> u8 {
    let r1 = r1 & !R1_RST_MASK;
    // active low
    if enable {
        r1 & !R1_CHG_DISABLE_MASK
    } else {
        r1 | R1_CHG_DISABLE_MASK
    }
}

pub struct Bq24250 {
    telemetry: Telemetry,
    registers: [u8; NUM_SYNC_REGISTERS],
}

impl Bq24250 {
    pub const fn new() -> Self {
        Bq24250 {
            telemetry: Telemetry::new(),
            registers: [0; NUM_SYNC_REGISTERS],
        }
    }

    pub fn registers(&self) -> &[u8; NUM_SYNC_REGISTERS] {
        &self.registers
    }

    pub fn set_input_limit<B: RegisterBus>(&mut self, bus: &mut B, limit: SingleInputLimit) -> Result<(), BusError> {
        bus.modify_register(BQ24250_ADDRESS, Bq24250Registers::CONTROL as u8, |r1| {
            encode_input_limit(r1, limit)
        })?;

        Ok(())
    }
}

impl Default for Bq24250 {
    fn default() -> Self {
        Self::new()
    }
}

impl Charger for Bq24250 {
    type DeviceState = DeviceState;
    type Fault = Fault;
    type Telemetry = Telemetry;

    fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    fn device_state(&self) -> DeviceState {
        self.telemetry.device_state
    }

    fn fault(&self) -> Fault {
        self.telemetry.fault
    }

    fn is_charging(&self) -> bool {
        self.telemetry.device_state == DeviceState::Charging
    }

    /// Writing the enable bit restarts the timer. The rest of R0 is status.
    fn reset_watchdog<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        bus.write_register(BQ24250_ADDRESS, Bq24250Registers::STATUS as u8, R0_WD_EN_MASK)
    }

    fn synchronize<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let mut registers = [0u8; NUM_SYNC_REGISTERS];
        bus.read_registers(BQ24250_ADDRESS, Bq24250Registers::STATUS as u8, &mut registers)?;

        self.registers = registers;
        self.telemetry = Telemetry::decode(&registers);
        trace!("bq24250 sync {:x}", registers);

        Ok(())
    }

    fn set_charging_enabled<B: RegisterBus>(&mut self, bus: &mut B, enable: bool) -> Result<(), BusError> {
        bus.modify_register(BQ24250_ADDRESS, Bq24250Registers::CONTROL as u8, |r1| {
            encode_charging_enabled(r1, enable)
        })?;

        Ok(())
    }
}
