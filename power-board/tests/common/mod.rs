#![allow(dead_code)]

use pmfw_lib_power::{
    bus::SimulatedBus,
    drivers::{
        adc::{AdcReader, ACTUATOR_BATTERY_CHANNEL, BATTERY_MV_PER_COUNT, SYSTEM_BATTERY_CHANNEL},
        charger::{bq24161::BQ24161_ADDRESS, bq24250::BQ24250_ADDRESS},
    },
};
use pmfw_power_board::power_state::PowerDomainState;

pub const SYS: u8 = BQ24161_ADDRESS;
pub const ACT: u8 = BQ24250_ADDRESS;

// dual-input charger input state codes
pub const NORMAL: u8 = 0;
pub const OVER_VOLTAGE: u8 = 1;
pub const WEAK_SOURCE: u8 = 2;
pub const UNDER_VOLTAGE: u8 = 3;

// dual-input charger status codes
pub const STANDBY: u8 = 0;
pub const READY_ADAPTER: u8 = 1;
pub const READY_USB: u8 = 2;
pub const CHARGING_ADAPTER: u8 = 3;
pub const CHARGING_USB: u8 = 4;
pub const DONE: u8 = 5;

// single-input charger status codes
pub const ACT_READY: u8 = 0;
pub const ACT_CHARGING: u8 = 1;
pub const ACT_DONE: u8 = 2;
pub const ACT_FAULT: u8 = 3;

/// Fixed samples on the two battery taps.
pub struct TestAdc {
    pub system_counts: u16,
    pub actuator_counts: u16,
}

impl TestAdc {
    /// Nearest count at or below the requested voltage.
    pub fn from_millivolts(system_mv: u16, actuator_mv: u16) -> Self {
        TestAdc {
            system_counts: system_mv / BATTERY_MV_PER_COUNT,
            actuator_counts: actuator_mv / BATTERY_MV_PER_COUNT,
        }
    }
}

impl AdcReader for TestAdc {
    fn read_channel(&mut self, channel: u8) -> u16 {
        match channel {
            SYSTEM_BATTERY_CHANNEL => self.system_counts,
            ACTUATOR_BATTERY_CHANNEL => self.actuator_counts,
            _ => 0,
        }
    }
}

/// Register file with the chargers' status bits read-only and the
/// dual-input reset bit stuck high, the way the parts behave.
pub fn board() -> SimulatedBus {
    let mut bus = SimulatedBus::new();
    bus.set_read_only_mask(SYS, 0x00, 0x77);
    bus.set_read_only_mask(SYS, 0x01, 0xFE);
    bus.set_sticky_bits(SYS, 0x02, 0x80);
    bus.set_read_only_mask(ACT, 0x00, 0xBF);
    // charge disabled, USB limit 500 mA out of reset
    bus.set_register(SYS, 0x02, 0x22);
    bus.set_register(ACT, 0x01, 0x02);
    bus
}

pub fn set_system_status(bus: &mut SimulatedBus, status: u8, fault: u8) {
    bus.set_register(SYS, 0x00, (status << 4) | fault);
}

pub fn set_supply_status(bus: &mut SimulatedBus, adapter: u8, usb: u8, battery: u8) {
    bus.set_register(SYS, 0x01, (adapter << 6) | (usb << 4) | (battery << 1));
}

pub fn set_usb_limit_code(bus: &mut SimulatedBus, code: u8) {
    let r2 = bus.register(SYS, 0x02) & !0xF0;
    bus.set_register(SYS, 0x02, r2 | (code << 4));
}

pub fn set_adapter_limit_high(bus: &mut SimulatedBus, high: bool) {
    let r3 = bus.register(SYS, 0x03) & !0x02;
    bus.set_register(SYS, 0x03, if high { r3 | 0x02 } else { r3 });
}

pub fn set_actuator_status(bus: &mut SimulatedBus, status: u8, fault: u8) {
    bus.set_register(ACT, 0x00, (status << 4) | fault);
}

pub fn system_charge_enabled(bus: &SimulatedBus) -> bool {
    bus.register(SYS, 0x02) & 0x02 == 0
}

pub fn actuator_charge_enabled(bus: &SimulatedBus) -> bool {
    bus.register(ACT, 0x01) & 0x02 == 0
}

pub const fn domains(system_on: bool, actuator_on: bool) -> PowerDomainState {
    PowerDomainState {
        system_on,
        actuator_on,
        passthrough_on: false,
    }
}
