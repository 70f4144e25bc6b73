/*
 * Driver for the NXP PCA9633 4-channel LED controller.
 *
 * Each LED is driven fully on, fully off, or through the group PWM which the
 * driver configures as a ~1 Hz blink.
 */

use crate::bus::{BusError, RegisterBus};

pub const PCA9633_NUM_LEDS: usize = 4;

/// General call address answering the software reset sequence.
pub const PCA9633_RESET_ADDRESS: u8 = 0x03;
const SOFTWARE_RESET_SEQUENCE: [u8; 2] = [0xA5, 0x5A];

#[repr(u8)]
#[allow(non_camel_case_types, dead_code, clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug)]
enum Pca9633Registers {
    MODE1 = 0x00,
    MODE2 = 0x01,
    PWM0 = 0x02,
    PWM1 = 0x03,
    PWM2 = 0x04,
    PWM3 = 0x05,
    GRPPWM = 0x06,
    GRPFREQ = 0x07,
    LEDOUT = 0x08,
}

// MODE1: oscillator on, no sub-addresses, no all-call
const MODE1_NORMAL: u8 = 0x00;
// MODE2: group control = blinking, totem pole outputs
const MODE2_DMBLNK: u8 = 0x20;
const MODE2_OUTDRV: u8 = 0x04;

const PWM_FULL: u8 = 0xFF;
const GROUP_DUTY_HALF: u8 = 0x80;
// blink period = (GRPFREQ + 1) / 24 s
const GROUP_FREQ_1HZ: u8 = 0x17;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedMode {
    Off,
    On,
    Blink,
}

impl LedMode {
    const fn bits(self) -> u8 {
        match self {
            LedMode::Off => 0b00,
            LedMode::On => 0b01,
            LedMode::Blink => 0b11,
        }
    }

    /// Individual PWM control (0b10) is never programmed by this driver and is
    /// reported as on since the PWM registers are held at full duty.
    const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => LedMode::Off,
            0b11 => LedMode::Blink,
            _ => LedMode::On,
        }
    }
}

pub const fn encode_led_output(modes: &[LedMode; PCA9633_NUM_LEDS]) -> u8 {
    modes[0].bits() | (modes[1].bits() << 2) | (modes[2].bits() << 4) | (modes[3].bits() << 6)
}

pub const fn decode_led_output(ledout: u8) -> [LedMode; PCA9633_NUM_LEDS] {
    [
        LedMode::from_bits(ledout),
        LedMode::from_bits(ledout >> 2),
        LedMode::from_bits(ledout >> 4),
        LedMode::from_bits(ledout >> 6),
    ]
}

pub struct Pca9633 {
    address: u8,
    ledout: u8,
}

impl Pca9633 {
    pub const fn new(address: u8) -> Self {
        Pca9633 { address, ledout: 0 }
    }

    pub fn led_modes(&self) -> [LedMode; PCA9633_NUM_LEDS] {
        decode_led_output(self.ledout)
    }

    /// Resets every PCA9633 on the bus to its power-on state.
    pub fn software_reset<B: RegisterBus>(bus: &mut B) -> Result<(), BusError> {
        bus.write_raw(PCA9633_RESET_ADDRESS, &SOFTWARE_RESET_SEQUENCE)
    }

    /// Wakes the device, enables group blinking and turns every LED off.
    pub fn init<B: RegisterBus>(&mut self, bus: &mut B) -> Result<(), BusError> {
        bus.write_register(self.address, Pca9633Registers::MODE1 as u8, MODE1_NORMAL)?;
        bus.write_register(self.address, Pca9633Registers::MODE2 as u8, MODE2_DMBLNK | MODE2_OUTDRV)?;

        for pwm in [Pca9633Registers::PWM0, Pca9633Registers::PWM1, Pca9633Registers::PWM2, Pca9633Registers::PWM3] {
            bus.write_register(self.address, pwm as u8, PWM_FULL)?;
        }

        bus.write_register(self.address, Pca9633Registers::GRPPWM as u8, GROUP_DUTY_HALF)?;
        bus.write_register(self.address, Pca9633Registers::GRPFREQ as u8, GROUP_FREQ_1HZ)?;

        self.set_led_modes(bus, [LedMode::Off; PCA9633_NUM_LEDS])
    }

    pub fn set_led_modes<B: RegisterBus>(&mut self, bus: &mut B, modes: [LedMode; PCA9633_NUM_LEDS]) -> Result<(), BusError> {
        let ledout = encode_led_output(&modes);
        bus.write_register(self.address, Pca9633Registers::LEDOUT as u8, ledout)?;
        self.ledout = ledout;

        Ok(())
    }

    /// Changes one LED, leaving the cached state of the others in place.
    /// Indices past the last LED are ignored.
    pub fn set_led_mode<B: RegisterBus>(&mut self, bus: &mut B, index: usize, mode: LedMode) -> Result<(), BusError> {
        let mut modes = self.led_modes();
        match modes.get_mut(index) {
            Some(slot) => *slot = mode,
            None => {
                warn!("pca9633 {=u8:x} has no led {=usize}", self.address, index);
                return Ok(());
            }
        }

        self.set_led_modes(bus, modes)
    }
}
