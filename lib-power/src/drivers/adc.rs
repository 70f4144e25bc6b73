/*
 * Battery voltage sampling.
 *
 * Both battery taps go through the same divider into the MCU ADC, so one
 * coefficient converts either channel to millivolts.
 */

pub const SYSTEM_BATTERY_CHANNEL: u8 = 6;
pub const ACTUATOR_BATTERY_CHANNEL: u8 = 7;

/// Divider and reference folded into one step, mV per count. Assumes an 8 bit
/// conversion against a 3.3 V reference (12.9 mV per count at the pin) behind
/// a 1.32:1 tap divider.
pub const BATTERY_MV_PER_COUNT: u16 = 17;
/// Largest count of the 8 bit conversion the coefficient assumes.
pub const BATTERY_ADC_FULL_SCALE: u16 = 255;

/// Single-shot conversion on a numbered channel.
pub trait AdcReader {
    fn read_channel(&mut self, channel: u8) -> u16;
}

impl<T: AdcReader + ?Sized> AdcReader for &mut T {
    fn read_channel(&mut self, channel: u8) -> u16 {
        (**self).read_channel(channel)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryVoltages {
    pub system_mv: u16,
    pub actuator_mv: u16,
}

pub struct BatteryVoltageSampler {
    mv_per_count: u16,
    system_channel: u8,
    actuator_channel: u8,
}

impl BatteryVoltageSampler {
    pub const fn new(mv_per_count: u16, system_channel: u8, actuator_channel: u8) -> Self {
        BatteryVoltageSampler {
            mv_per_count,
            system_channel,
            actuator_channel,
        }
    }

    pub const fn raw_sample_to_mv(&self, sample: u16) -> u16 {
        sample.saturating_mul(self.mv_per_count)
    }

    pub fn system_battery_mv<A: AdcReader>(&self, adc: &mut A) -> u16 {
        self.raw_sample_to_mv(adc.read_channel(self.system_channel))
    }

    pub fn actuator_battery_mv<A: AdcReader>(&self, adc: &mut A) -> u16 {
        self.raw_sample_to_mv(adc.read_channel(self.actuator_channel))
    }

    pub fn sample<A: AdcReader>(&self, adc: &mut A) -> BatteryVoltages {
        BatteryVoltages {
            system_mv: self.system_battery_mv(adc),
            actuator_mv: self.actuator_battery_mv(adc),
        }
    }
}

impl Default for BatteryVoltageSampler {
    fn default() -> Self {
        BatteryVoltageSampler::new(BATTERY_MV_PER_COUNT, SYSTEM_BATTERY_CHANNEL, ACTUATOR_BATTERY_CHANNEL)
    }
}
