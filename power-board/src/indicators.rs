//! Maps charger inputs and battery indications onto the two LED banks.

use pmfw_lib_power::drivers::{
    charger::bq24161::{InputLimit, InputState},
    led::pca9633::{LedMode, PCA9633_NUM_LEDS},
};

use crate::config::{
    ACTUATOR_BATTERY_CHARGE_LED_INDEX, ACTUATOR_BATTERY_STATUS_LED_INDEX, ADAPTER_LED_INDEX,
    SYSTEM_BATTERY_CHARGE_LED_INDEX, SYSTEM_BATTERY_STATUS_LED_INDEX, USB_HIGH_POWER_LED_INDEX,
    USB_LOW_POWER_LED_INDEX, USB_MID_POWER_LED_INDEX,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryPresence {
    Absent,
    Healthy,
    /// Present but faulted or low.
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeIndication {
    Idle,
    Charging,
    /// Topped off or charge done.
    Full,
    /// The charger itself has faulted.
    Fault,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryIndication {
    pub presence: BatteryPresence,
    pub charge: ChargeIndication,
}

impl BatteryIndication {
    pub const fn new(presence: BatteryPresence, charge: ChargeIndication) -> Self {
        BatteryIndication { presence, charge }
    }

    pub const fn absent() -> Self {
        Self::new(BatteryPresence::Absent, ChargeIndication::Idle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndicatorInputs {
    pub adapter_input: InputState,
    pub usb_input: InputState,
    pub usb_limit: InputLimit,
    pub system_battery: BatteryIndication,
    pub actuator_battery: BatteryIndication,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndicatorFrame {
    pub input_bank: [LedMode; PCA9633_NUM_LEDS],
    pub battery_bank: [LedMode; PCA9633_NUM_LEDS],
}

impl IndicatorFrame {
    pub const fn dark() -> Self {
        IndicatorFrame {
            input_bank: [LedMode::Off; PCA9633_NUM_LEDS],
            battery_bank: [LedMode::Off; PCA9633_NUM_LEDS],
        }
    }
}

/// Number of USB LEDs lit for a limit.
pub const fn usb_tier(limit: InputLimit) -> usize {
    match limit {
        InputLimit::L0 => 0,
        InputLimit::L100 | InputLimit::L150 => 1,
        InputLimit::L500 | InputLimit::L800 | InputLimit::L900 => 2,
        InputLimit::L1500 | InputLimit::L2500 => 3,
    }
}

pub const fn adapter_led(state: InputState) -> LedMode {
    match state {
        InputState::Normal => LedMode::On,
        InputState::UnderVoltage => LedMode::Off,
        InputState::OverVoltage | InputState::WeakSource => LedMode::Blink,
    }
}

pub fn usb_leds(state: InputState, limit: InputLimit) -> [LedMode; 3] {
    match state {
        InputState::Normal => {
            let lit = usb_tier(limit);
            let mut leds = [LedMode::Off; 3];
            for led in leds.iter_mut().take(lit) {
                *led = LedMode::On;
            }
            leds
        }
        InputState::UnderVoltage => [LedMode::Off; 3],
        InputState::OverVoltage | InputState::WeakSource => [LedMode::Blink; 3],
    }
}

pub const fn presence_led(presence: BatteryPresence) -> LedMode {
    match presence {
        BatteryPresence::Absent => LedMode::Off,
        BatteryPresence::Healthy => LedMode::On,
        BatteryPresence::Warning => LedMode::Blink,
    }
}

pub const fn charge_led(charge: ChargeIndication) -> LedMode {
    match charge {
        ChargeIndication::Idle => LedMode::Off,
        ChargeIndication::Charging | ChargeIndication::Fault => LedMode::Blink,
        ChargeIndication::Full => LedMode::On,
    }
}

pub fn map_indicators(inputs: &IndicatorInputs) -> IndicatorFrame {
    let mut frame = IndicatorFrame::dark();

    frame.input_bank[ADAPTER_LED_INDEX] = adapter_led(inputs.adapter_input);
    let [low, mid, high] = usb_leds(inputs.usb_input, inputs.usb_limit);
    frame.input_bank[USB_LOW_POWER_LED_INDEX] = low;
    frame.input_bank[USB_MID_POWER_LED_INDEX] = mid;
    frame.input_bank[USB_HIGH_POWER_LED_INDEX] = high;

    frame.battery_bank[SYSTEM_BATTERY_STATUS_LED_INDEX] = presence_led(inputs.system_battery.presence);
    frame.battery_bank[SYSTEM_BATTERY_CHARGE_LED_INDEX] = charge_led(inputs.system_battery.charge);
    frame.battery_bank[ACTUATOR_BATTERY_STATUS_LED_INDEX] = presence_led(inputs.actuator_battery.presence);
    frame.battery_bank[ACTUATOR_BATTERY_CHARGE_LED_INDEX] = charge_led(inputs.actuator_battery.charge);

    frame
}
