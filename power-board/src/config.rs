// Naming scheme
// operating currents are worst case draw of a powered domain, taken from the input budget
// charge costs are the input current a charger pulls while charging, a third of the programmed charge current
// thresholds are raw battery tap voltages after the ADC coefficient, in mV

use embassy_time::Duration;
use pmfw_lib_power::drivers::charger::bq24161::InputSource;

/// How often the arbiter runs without being asked.
pub const SYNC_PERIOD: Duration = Duration::from_millis(5000);
/// Power button hold time that forces both domains off.
pub const HARD_POWER_DOWN_HOLD: Duration = Duration::from_millis(750);
/// Power button and charger interrupt poll interval.
pub const INPUT_POLL_PERIOD: Duration = Duration::from_millis(25);

pub const INPUT_LED_BANK_ADDRESS: u8 = 0x60;
pub const BATTERY_LED_BANK_ADDRESS: u8 = 0x61;

// input bank
pub const ADAPTER_LED_INDEX: usize = 0;
pub const USB_LOW_POWER_LED_INDEX: usize = 1;
pub const USB_MID_POWER_LED_INDEX: usize = 2;
pub const USB_HIGH_POWER_LED_INDEX: usize = 3;

// battery bank
pub const SYSTEM_BATTERY_STATUS_LED_INDEX: usize = 0;
pub const SYSTEM_BATTERY_CHARGE_LED_INDEX: usize = 1;
pub const ACTUATOR_BATTERY_STATUS_LED_INDEX: usize = 2;
pub const ACTUATOR_BATTERY_CHARGE_LED_INDEX: usize = 3;

pub const SYSTEM_OPERATING_CURRENT_MA: u16 = 750;
pub const ACTUATOR_OPERATING_CURRENT_MA: u16 = 500;
pub const PASSTHROUGH_LOSS_MA: u16 = 100;

pub const SYSTEM_CHARGE_CURRENT_MA: u16 = 740;
pub const SYSTEM_TERMINATION_CURRENT_MA: u16 = 50;
pub const ACTUATOR_CHARGE_CURRENT_MA: u16 = 1000;

/// Extra headroom needed to start a charger that is not already charging.
pub const CHARGE_ENABLE_HYSTERESIS_MA: u16 = 50;

// single cell li-ion, both packs
pub const BATTERY_NOT_PRESENT_MV: u16 = 500;
pub const BATTERY_LOW_MV: u16 = 3200;
pub const BATTERY_INITIAL_CHARGE_MV: u16 = 4000;
pub const BATTERY_REGULATION_MV: u16 = 4200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryThresholds {
    /// Below this the tap is floating, no pack is connected.
    pub not_present_mv: u16,
    pub low_mv: u16,
    /// Above this a pack is considered topped off and is not bulk charged.
    pub initial_charge_mv: u16,
    pub regulation_mv: u16,
}

impl BatteryThresholds {
    pub const fn new(not_present_mv: u16, low_mv: u16, initial_charge_mv: u16, regulation_mv: u16) -> Self {
        BatteryThresholds {
            not_present_mv,
            low_mv,
            initial_charge_mv,
            regulation_mv,
        }
    }

    pub const fn is_ordered(&self) -> bool {
        self.not_present_mv < self.low_mv
            && self.low_mv < self.initial_charge_mv
            && self.initial_charge_mv < self.regulation_mv
    }
}

pub const SINGLE_CELL_THRESHOLDS: BatteryThresholds = BatteryThresholds::new(
    BATTERY_NOT_PRESENT_MV,
    BATTERY_LOW_MV,
    BATTERY_INITIAL_CHARGE_MV,
    BATTERY_REGULATION_MV,
);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerConfig {
    pub preferred_source: InputSource,
    pub system_operating_current_ma: u16,
    pub actuator_operating_current_ma: u16,
    pub passthrough_loss_ma: u16,
    pub system_charge_current_ma: u16,
    pub system_termination_current_ma: u16,
    pub actuator_charge_current_ma: u16,
    pub charge_enable_hysteresis_ma: u16,
    pub system_battery: BatteryThresholds,
    pub actuator_battery: BatteryThresholds,
}

impl PowerConfig {
    pub const fn new() -> Self {
        PowerConfig {
            preferred_source: InputSource::Adapter,
            system_operating_current_ma: SYSTEM_OPERATING_CURRENT_MA,
            actuator_operating_current_ma: ACTUATOR_OPERATING_CURRENT_MA,
            passthrough_loss_ma: PASSTHROUGH_LOSS_MA,
            system_charge_current_ma: SYSTEM_CHARGE_CURRENT_MA,
            system_termination_current_ma: SYSTEM_TERMINATION_CURRENT_MA,
            actuator_charge_current_ma: ACTUATOR_CHARGE_CURRENT_MA,
            charge_enable_hysteresis_ma: CHARGE_ENABLE_HYSTERESIS_MA,
            system_battery: SINGLE_CELL_THRESHOLDS,
            actuator_battery: SINGLE_CELL_THRESHOLDS,
        }
    }

    /// Input current the system charger pulls while charging.
    pub const fn system_charge_cost_ma(&self) -> u16 {
        self.system_charge_current_ma / 3
    }

    pub const fn actuator_charge_cost_ma(&self) -> u16 {
        self.actuator_charge_current_ma / 3
    }
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self::new()
    }
}
