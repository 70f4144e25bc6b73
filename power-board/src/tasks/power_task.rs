use embassy_executor::Spawner;
use embassy_stm32::{
    adc::{Adc, Resolution},
    dma::NoDma,
    gpio::{AnyPin, Input, Level, Output, Pin, Pull, Speed},
    i2c::{self, I2c},
    time::khz,
};
use embassy_time::{Delay, Instant, Ticker};
use pmfw_lib_power::{
    bus::I2cBus,
    drivers::adc::{AdcReader, ACTUATOR_BATTERY_CHANNEL, SYSTEM_BATTERY_CHANNEL},
};

use crate::{
    arbiter::PowerBudgetArbiter,
    config::{PowerConfig, HARD_POWER_DOWN_HOLD, INPUT_POLL_PERIOD, SYNC_PERIOD},
    pins::*,
    power_state::{ButtonAction, PowerButton, PowerRails, SyncScheduler},
};

#[macro_export]
macro_rules! create_power_task {
    ($spawner:ident, $sync_request:expr, $p:ident) => {
        pmfw_power_board::tasks::power_task::start_power_task(&$spawner, $sync_request,
            $p.I2C1, $p.PB8, $p.PB9,
            $p.ADC1, $p.PA6, $p.PA7,
            $p.PC4, $p.PC6, $p.PC5,
            $p.PC0);
    };
}

/// Battery taps on the MCU ADC, addressed by channel number.
pub struct BatteryAdcChannels {
    adc: Adc<'static, BatteryAdc>,
    system_pin: SystemBatteryAdcPin,
    actuator_pin: ActuatorBatteryAdcPin,
}

impl AdcReader for BatteryAdcChannels {
    fn read_channel(&mut self, channel: u8) -> u16 {
        match channel {
            SYSTEM_BATTERY_CHANNEL => self.adc.read(&mut self.system_pin),
            ACTUATOR_BATTERY_CHANNEL => self.adc.read(&mut self.actuator_pin),
            _ => {
                defmt::warn!("no battery tap on adc channel {}", channel);
                0
            }
        }
    }
}

pub struct PowerTask {
    bus: I2cBus<I2c<'static, PowerI2c, NoDma, NoDma>>,
    adc: BatteryAdcChannels,
    rails: PowerRails<Output<'static, AnyPin>>,
    power_button: Input<'static, AnyPin>,
    sync_request: &'static SyncRequestSignal,
    arbiter: PowerBudgetArbiter,
}

impl PowerTask {
    async fn power_task_entry(&mut self) {
        defmt::info!("power task startup");

        // rails the arbiter does not own start off
        if self.rails.set_passthrough_power(false).is_err() || self.rails.set_actuator_power(false).is_err() {
            defmt::warn!("failed to switch off actuator rails");
        }

        self.arbiter.init(&mut self.bus, &mut self.adc, self.rails.state());

        let mut scheduler = SyncScheduler::new(SYNC_PERIOD);
        scheduler.mark_synced(Instant::now());
        let mut button = PowerButton::new(HARD_POWER_DOWN_HOLD);
        let mut input_poll_ticker = Ticker::every(INPUT_POLL_PERIOD);

        loop {
            if self.sync_request.try_take().is_some() {
                scheduler.request();
            }

            let now = Instant::now();
            match button.poll(self.power_button.is_low(), now, self.rails.state().system_on) {
                ButtonAction::PowerOn => {
                    defmt::info!("power switch pressed, system on");
                    if self.rails.set_system_power(true).is_err() {
                        defmt::warn!("failed to enable system rail");
                    }
                    scheduler.request();
                }
                ButtonAction::HardPowerDown => {
                    defmt::warn!("power switch held, hard power down");
                    if self.rails.hard_power_down().is_err() {
                        defmt::warn!("failed to disable domain rails");
                    }
                    scheduler.request();
                }
                ButtonAction::None => {}
            }

            if scheduler.poll(now) {
                self.arbiter.update(&mut self.bus, &mut self.adc, self.rails.state());
            }

            input_poll_ticker.next().await;
        }
    }
}

#[embassy_executor::task]
async fn power_task_entry(mut power_task: PowerTask) {
    loop {
        power_task.power_task_entry().await;
        defmt::error!("power task returned");
    }
}

#[allow(clippy::too_many_arguments)]
pub fn start_power_task(power_task_spawner: &Spawner,
        sync_request: &'static SyncRequestSignal,
        i2c_peri: PowerI2c,
        i2c_scl_pin: PowerI2cSclPin,
        i2c_sda_pin: PowerI2cSdaPin,
        adc_peri: BatteryAdc,
        system_battery_pin: SystemBatteryAdcPin,
        actuator_battery_pin: ActuatorBatteryAdcPin,
        system_en_pin: SystemPowerEnablePin,
        actuator_en_pin: ActuatorPowerEnablePin,
        passthrough_en_pin: PassthroughPowerEnablePin,
        power_button_pin: PowerButtonPin,
        ) {

    let i2c = I2c::new(i2c_peri, i2c_scl_pin, i2c_sda_pin, SystemIrqs, NoDma, NoDma, khz(100), i2c::Config::default());
    defmt::trace!("charger i2c initialized");

    // 8 bit against VDDA so one count is BATTERY_MV_PER_COUNT at the tap
    let mut battery_adc = Adc::new(adc_peri, &mut Delay);
    battery_adc.set_resolution(Resolution::EightBit);

    let adc = BatteryAdcChannels {
        adc: battery_adc,
        system_pin: system_battery_pin,
        actuator_pin: actuator_battery_pin,
    };

    let rails = PowerRails::new(
        Output::new(system_en_pin.degrade(), Level::Low, Speed::Low),
        Output::new(actuator_en_pin.degrade(), Level::Low, Speed::Low),
        Output::new(passthrough_en_pin.degrade(), Level::Low, Speed::Low),
    );

    let power_task = PowerTask {
        bus: I2cBus::new(i2c),
        adc,
        rails,
        power_button: Input::new(power_button_pin.degrade(), Pull::Up),
        sync_request,
        arbiter: PowerBudgetArbiter::new(PowerConfig::new()),
    };

    if power_task_spawner.spawn(power_task_entry(power_task)).is_err() {
        defmt::error!("failed to spawn power task");
        return;
    }
    defmt::info!("power task online");
}
