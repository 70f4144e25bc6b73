/*
 * Driver for the TI bq24161 dual-input (adapter + USB) Li-ion charger.
 *
 * http://www.ti.com/lit/ds/symlink/bq24161.pdf
 */

use crate::{
    bus::{BusError, RegisterBus},
    math::ladder::BinaryLadder,
};

use super::{Charger, ChargerError, InputCurrentLimit};

pub const BQ24161_ADDRESS: u8 = 0x6B;

/// Registers covered by one telemetry burst read, R0 through R5.
pub const NUM_SYNC_REGISTERS: usize = 6;

#[repr(u8)]
#[allow(non_camel_case_types, dead_code, clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug)]
enum Bq24161Registers {
    STATUS_CONTROL = 0x00,
    BATTERY_SUPPLY_STATUS = 0x01,
    CONTROL = 0x02,
    BATTERY_VOLTAGE = 0x03,
    VENDOR_PART_REVISION = 0x04,
    BATTERY_CURRENT = 0x05,
    VIN_DPM = 0x06,
    SAFETY_TIMER = 0x07,
}

// R0
const R0_WDT_RST_MASK: u8 = 0x80;
const R0_STAT_MASK: u8 = 0x70;
const R0_SUPPLY_SEL_MASK: u8 = 0x08;
const R0_FAULT_MASK: u8 = 0x07;

// R1
const R1_ADAPTER_STAT_MASK: u8 = 0xC0;
const R1_USB_STAT_MASK: u8 = 0x30;
const R1_OTG_LOCKOUT_MASK: u8 = 0x08;
const R1_BATT_STAT_MASK: u8 = 0x06;
const R1_NOBATT_OP_MASK: u8 = 0x01;

// R2
const R2_RST_MASK: u8 = 0x80;
const R2_USB_INPUT_LIMIT_MASK: u8 = 0x70;
const R2_TERM_EN_MASK: u8 = 0x04;
const R2_CHG_DISABLE_MASK: u8 = 0x02;

// R3
const R3_ADAPTER_INPUT_LIMIT_MASK: u8 = 0x02;

pub const REGULATION_VOLTAGE_LADDER: BinaryLadder = BinaryLadder::new(3500, 20, 6, 2, 4440);
pub const CHARGE_CURRENT_LADDER: BinaryLadder = BinaryLadder::new(550, 75, 5, 3, 2875);
// Termination is quoted up to the 2875 mA charge ceiling, but the 3-bit field
// tops out at 50 + 50 + 100 + 200 = 400 mA. Larger requests are rejected.
pub const TERMINATION_CURRENT_LADDER: BinaryLadder = BinaryLadder::new(50, 50, 3, 0, 400);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    Standby,
    Ready,
    Charging,
    Done,
    Fault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    None,
    DeviceThermalShutdown,
    BatteryThermalShutdown,
    WatchdogExpired,
    SafetyTimerExpired,
    AdapterFault,
    UsbFault,
    BatteryFault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputSource {
    None,
    Adapter,
    Usb,
}

impl InputSource {
    /// Candidate order for the input current search, preferred source first
    /// and `None` always last.
    pub const fn preference_order(preferred: InputSource) -> [InputSource; 3] {
        match preferred {
            InputSource::Usb => [InputSource::Usb, InputSource::Adapter, InputSource::None],
            InputSource::Adapter | InputSource::None => [InputSource::Adapter, InputSource::Usb, InputSource::None],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputState {
    Normal,
    OverVoltage,
    WeakSource,
    UnderVoltage,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputLimit {
    L0,
    L100,
    L150,
    L500,
    L800,
    L900,
    L1500,
    L2500,
}

impl InputLimit {
    pub const ALL: [InputLimit; 8] = [
        InputLimit::L0,
        InputLimit::L100,
        InputLimit::L150,
        InputLimit::L500,
        InputLimit::L800,
        InputLimit::L900,
        InputLimit::L1500,
        InputLimit::L2500,
    ];

    pub const fn as_milliamps(self) -> u16 {
        match self {
            InputLimit::L0 => 0,
            InputLimit::L100 => 100,
            InputLimit::L150 => 150,
            InputLimit::L500 => 500,
            InputLimit::L800 => 800,
            InputLimit::L900 => 900,
            InputLimit::L1500 => 1500,
            InputLimit::L2500 => 2500,
        }
    }
}

impl InputCurrentLimit for InputLimit {
    fn milliamps(self) -> Option<u16> {
        Some(self.as_milliamps())
    }

    fn from_milliamps(milliamps: u16) -> Option<Self> {
        InputLimit::ALL.into_iter().find(|limit| limit.as_milliamps() == milliamps)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryState {
    Normal,
    OverVoltage,
    Disconnected,
    Undefined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    pub device_state: DeviceState,
    pub fault: Fault,
    pub selected_source: InputSource,
    pub preferred_source: InputSource,
    pub adapter_input: InputState,
    pub usb_input: InputState,
    pub adapter_limit: InputLimit,
    pub usb_limit: InputLimit,
    pub battery_state: BatteryState,
    pub otg_lockout: bool,
    pub no_battery_operation: bool,
    pub charging_enabled: bool,
    pub termination_enabled: bool,
    pub regulation_voltage_mv: u16,
    pub charge_current_ma: u16,
    pub termination_current_ma: u16,
}

impl Telemetry {
    /// Record used before the first successful read: nothing connected,
    /// nothing known.
    pub const fn new() -> Self {
        Telemetry {
            device_state: DeviceState::Standby,
            fault: Fault::None,
            selected_source: InputSource::None,
            preferred_source: InputSource::Adapter,
            adapter_input: InputState::UnderVoltage,
            usb_input: InputState::UnderVoltage,
            adapter_limit: InputLimit::L0,
            usb_limit: InputLimit::L0,
            battery_state: BatteryState::Undefined,
            otg_lockout: false,
            no_battery_operation: false,
            charging_enabled: false,
            termination_enabled: false,
            regulation_voltage_mv: REGULATION_VOLTAGE_LADDER.min_value(),
            charge_current_ma: CHARGE_CURRENT_LADDER.min_value(),
            termination_current_ma: TERMINATION_CURRENT_LADDER.min_value(),
        }
    }

    pub fn decode(registers: &[u8; NUM_SYNC_REGISTERS]) -> Self {
        let r0 = registers[Bq24161Registers::STATUS_CONTROL as usize];
        let r1 = registers[Bq24161Registers::BATTERY_SUPPLY_STATUS as usize];
        let r2 = registers[Bq24161Registers::CONTROL as usize];
        let r3 = registers[Bq24161Registers::BATTERY_VOLTAGE as usize];
        let r5 = registers[Bq24161Registers::BATTERY_CURRENT as usize];

        let (selected_source, device_state) = decode_status((r0 & R0_STAT_MASK) >> 4);

        Telemetry {
            device_state,
            fault: decode_fault(r0 & R0_FAULT_MASK),
            selected_source,
            preferred_source: if r0 & R0_SUPPLY_SEL_MASK != 0 { InputSource::Usb } else { InputSource::Adapter },
            adapter_input: decode_input_state((r1 & R1_ADAPTER_STAT_MASK) >> 6),
            usb_input: decode_input_state((r1 & R1_USB_STAT_MASK) >> 4),
            adapter_limit: decode_adapter_input_limit(r3),
            usb_limit: decode_usb_input_limit((r2 & R2_USB_INPUT_LIMIT_MASK) >> 4),
            battery_state: decode_battery_state((r1 & R1_BATT_STAT_MASK) >> 1),
            otg_lockout: r1 & R1_OTG_LOCKOUT_MASK != 0,
            no_battery_operation: r1 & R1_NOBATT_OP_MASK != 0,
            charging_enabled: r2 & R2_CHG_DISABLE_MASK == 0,
            termination_enabled: r2 & R2_TERM_EN_MASK != 0,
            regulation_voltage_mv: REGULATION_VOLTAGE_LADDER.extract(r3),
            charge_current_ma: CHARGE_CURRENT_LADDER.extract(r5),
            termination_current_ma: TERMINATION_CURRENT_LADDER.extract(r5),
        }
    }

    /// Input state of a source. `None` is never a usable source.
    pub fn input_state(&self, source: InputSource) -> InputState {
        match source {
            InputSource::Adapter => self.adapter_input,
            InputSource::Usb => self.usb_input,
            InputSource::None => InputState::UnderVoltage,
        }
    }

    pub fn input_limit(&self, source: InputSource) -> InputLimit {
        match source {
            InputSource::Adapter => self.adapter_limit,
            InputSource::Usb => self.usb_limit,
            InputSource::None => InputLimit::L0,
        }
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

//////////////////////
//  field decoding  //
//////////////////////

pub const fn decode_status(code: u8) -> (InputSource, DeviceState) {
    match code & 0x07 {
        0x00 => (InputSource::None, DeviceState::Standby),
        0x01 => (InputSource::Adapter, DeviceState::Ready),
        0x02 => (InputSource::Usb, DeviceState::Ready),
        0x03 => (InputSource::Adapter, DeviceState::Charging),
        0x04 => (InputSource::Usb, DeviceState::Charging),
        0x05 => (InputSource::None, DeviceState::Done),
        _ => (InputSource::None, DeviceState::Fault),
    }
}

pub const fn decode_fault(code: u8) -> Fault {
    match code & 0x07 {
        0x00 => Fault::None,
        0x01 => Fault::DeviceThermalShutdown,
        0x02 => Fault::BatteryThermalShutdown,
        0x03 => Fault::WatchdogExpired,
        0x04 => Fault::SafetyTimerExpired,
        0x05 => Fault::AdapterFault,
        0x06 => Fault::UsbFault,
        _ => Fault::BatteryFault,
    }
}

pub const fn decode_input_state(code: u8) -> InputState {
    match code & 0x03 {
        0x00 => InputState::Normal,
        0x01 => InputState::OverVoltage,
        0x02 => InputState::WeakSource,
        _ => InputState::UnderVoltage,
    }
}

pub const fn decode_battery_state(code: u8) -> BatteryState {
    match code & 0x03 {
        0x00 => BatteryState::Normal,
        0x01 => BatteryState::OverVoltage,
        0x02 => BatteryState::Disconnected,
        _ => BatteryState::Undefined,
    }
}

/// Codes 6 and 7 are not documented and fall back to the zero current tier.
pub const fn decode_usb_input_limit(code: u8) -> InputLimit {
    match code & 0x07 {
        0x00 => InputLimit::L100,
        0x01 => InputLimit::L150,
        0x02 => InputLimit::L500,
        0x03 => InputLimit::L800,
        0x04 => InputLimit::L900,
        0x05 => InputLimit::L1500,
        _ => InputLimit::L0,
    }
}

pub const fn decode_adapter_input_limit(r3: u8) -> InputLimit {
    if r3 & R3_ADAPTER_INPUT_LIMIT_MASK != 0 {
        InputLimit::L2500
    } else {
        InputLimit::L1500
    }
}

//////////////////////
//  field encoding  //
//////////////////////

pub const fn encode_watchdog_reset(r0: u8) -> u8 {
    r0 | R0_WDT_RST_MASK
}

pub const fn encode_preferred_source(r0: u8, source: InputSource) -> Option<u8> {
    match source {
        InputSource::Adapter => Some(r0 & !R0_SUPPLY_SEL_MASK),
        InputSource::Usb => Some(r0 | R0_SUPPLY_SEL_MASK),
        InputSource::None => None,
    }
}

pub const fn encode_no_battery_operation(r1: u8, enable: bool) -> u8 {
    if enable {
        r1 | R1_NOBATT_OP_MASK
    } else {
        r1 & !R1_NOBATT_OP_MASK
    }
}

/// The reset bit always reads back set and must be cleared on every R2 write.
pub const fn encode_usb_input_limit(r2: u8, limit: InputLimit) -> Option<u8> {
    let code = match limit {
        InputLimit::L100 => 0x00,
        InputLimit::L150 => 0x01,
        InputLimit::L500 => 0x02,
        InputLimit::L800 => 0x03,
        InputLimit::L900 => 0x04,
        InputLimit::L1500 => 0x05,
        InputLimit::L0 | InputLimit::L2500 => return None,
    };

    Some((r2 & !(R2_RST_MASK | R2_USB_INPUT_LIMIT_MASK)) | (code << 4))
}

pub const fn encode_charging_enabled(r2: u8, enable: bool) -> u8 {
    let r2 = r2 & !R2_RST_MASK;
    // active low
    if enable {
        r2 & !R2_CHG_DISABLE_MASK
    } else {
        r2 | R2_CHG_DISABLE_MASK
    }
}

pub const fn encode_termination_enabled(r2: u8, enable: bool) -> u8 {
    let r2 = r2 & !R2_RST_MASK;
    if enable {
        r2 | R2_TERM_EN_MASK
    } else {
        r2 & !R2_TERM_EN_MASK
    }
}

pub const fn encode_adapter_input_limit(r3: u8, limit: InputLimit) -> Option<u8> {
    match limit {
        InputLimit::L1500 => Some(r3 & !R3_ADAPTER_INPUT_LIMIT_MASK),
        InputLimit::L2500 => Some(r3 | R3_ADAPTER_INPUT_LIMIT_MASK),
        _ => None,
    }
}

//////////////
//  driver  //
//////////////

pub struct Bq24161 {
    telemetry: Telemetry,
    registers: [u8; NUM_SYNC_REGISTERS],
}

impl Bq24161 {
    pub const fn new() -> Self {
        Bq24161 {
            telemetry: Telemetry::new(),
            registers: [0; NUM_SYNC_REGISTERS],
        }
    }

    /// Raw register block from the last successful synchronize.
    pub fn registers(&self) -> &[u8; NUM_SYNC_REGISTERS] {
        &self.registers
    }

    pub fn input_state(&self, source: InputSource) -> InputState {
        self.telemetry.input_state(source)
    }

    pub fn input_limit(&self, source: InputSource) -> InputLimit {
        self.telemetry.input_limit(source)
    }

    pub fn set_input_limit<B: RegisterBus>(&mut self, bus: &mut B, source: InputSource, limit: InputLimit) -> Result<(), ChargerError> {
        match source {
            InputSource::Usb => {
                // validate before touching the bus
                encode_usb_input_limit(0, limit).ok_or(ChargerError::OutOfRange)?;
                bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::CONTROL as u8, |r2| {
                    encode_usb_input_limit(r2, limit).unwrap_or(r2 & !R2_RST_MASK)
                })?;
            }
            InputSource::Adapter => {
                encode_adapter_input_limit(0, limit).ok_or(ChargerError::OutOfRange)?;
                bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::BATTERY_VOLTAGE as u8, |r3| {
                    encode_adapter_input_limit(r3, limit).unwrap_or(r3)
                })?;
            }
            InputSource::None => return Err(ChargerError::OutOfRange),
        }

        Ok(())
    }

    pub fn set_preferred_source<B: RegisterBus>(&mut self, bus: &mut B, source: InputSource) -> Result<(), ChargerError> {
        encode_preferred_source(0, source).ok_or(ChargerError::OutOfRange)?;
        bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::STATUS_CONTROL as u8, |r0| {
            encode_preferred_source(r0, source).unwrap_or(r0)
        })?;

        Ok(())
    }

    pub fn set_no_battery_operation<B: RegisterBus>(&mut self, bus: &mut B, enable: bool) -> Result<(), BusError> {
        bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::BATTERY_SUPPLY_STATUS as u8, |r1| {
            encode_no_battery_operation(r1, enable)
        })?;

        Ok(())
    }

    pub fn set_termination_enabled<B: RegisterBus>(&mut self, bus: &mut B, enable: bool) -> Result<(), BusError> {
        bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::CONTROL as u8, |r2| {
            encode_termination_enabled(r2, enable)
        })?;

        Ok(())
    }

    pub fn set_battery_regulation_voltage<B: RegisterBus>(&mut self, bus: &mut B, millivolts: u16) -> Result<(), ChargerError> {
        self.write_ladder(bus, Bq24161Registers::BATTERY_VOLTAGE, &REGULATION_VOLTAGE_LADDER, millivolts)
    }

    pub fn set_charge_current<B: RegisterBus>(&mut self, bus: &mut B, milliamps: u16) -> Result<(), ChargerError> {
        self.write_ladder(bus, Bq24161Registers::BATTERY_CURRENT, &CHARGE_CURRENT_LADDER, milliamps)
    }

    pub fn set_termination_current<B: RegisterBus>(&mut self, bus: &mut B, milliamps: u16) -> Result<(), ChargerError> {
        self.write_ladder(bus, Bq24161Registers::BATTERY_CURRENT, &TERMINATION_CURRENT_LADDER, milliamps)
    }

    fn write_ladder<B: RegisterBus>(&mut self, bus: &mut B, register: Bq24161Registers, ladder: &BinaryLadder, value: u16) -> Result<(), ChargerError> {
        let code = ladder.encode(value).ok_or(ChargerError::OutOfRange)?;
        bus.modify_register(BQ24161_ADDRESS, register as u8, |current| ladder.insert(current, code))?;

        Ok(())
    }
}

impl Default for Bq24161 {
    fn default() -> Self {
        Self::new()
    }
}

impl Charger for Bq24161 {
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

    fn reset_watchdog<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::STATUS_CONTROL as u8, encode_watchdog_reset)?;

        Ok(())
    }

    fn synchronize<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        let mut registers = [0u8; NUM_SYNC_REGISTERS];
        bus.read_registers(BQ24161_ADDRESS, Bq24161Registers::STATUS_CONTROL as u8, &mut registers)?;

        self.registers = registers;
        self.telemetry = Telemetry::decode(&registers);
        trace!("bq24161 sync {:x}", registers);

        Ok(())
    }

    fn set_charging_enabled<B: RegisterBus>(&mut self, bus: &mut B, enable: bool) -> Result<(), BusError> {
        bus.modify_register(BQ24161_ADDRESS, Bq24161Registers::CONTROL as u8, |r2| {
            encode_charging_enabled(r2, enable)
        })?;

        Ok(())
    }
}
