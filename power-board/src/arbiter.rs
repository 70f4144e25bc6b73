/*
 * Input current arbitration between the system and actuator domains.
 *
 * One pass of `update` walks a fixed priority order: powered loads first,
 * then the system battery, then the passthrough, then whatever is left goes
 * to the actuator charger input and its battery. Each consumer takes from a
 * single saturating budget so the chargers never ask the source for more than
 * it advertised.
 */

use pmfw_lib_power::{
    bus::RegisterBus,
    drivers::{
        adc::{AdcReader, BatteryVoltageSampler, BatteryVoltages},
        charger::{
            bq24161::{self, Bq24161, InputSource, InputState},
            bq24250::{self, Bq24250, SingleInputLimit},
            Charger,
        },
        led::pca9633::Pca9633,
    },
};

use crate::{
    budget::PowerBudget,
    config::{BatteryThresholds, PowerConfig, BATTERY_LED_BANK_ADDRESS, INPUT_LED_BANK_ADDRESS},
    indicators::{map_indicators, BatteryIndication, BatteryPresence, ChargeIndication, IndicatorFrame, IndicatorInputs},
    power_state::PowerDomainState,
    status::PowerStatus,
};

/// Everything one `update` decided, in the order it decided it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateReport {
    pub input_source: InputSource,
    pub input_current_ma: u16,
    pub after_system_load_ma: u16,
    pub after_system_charge_ma: u16,
    pub after_passthrough_ma: u16,
    pub after_actuator_load_ma: u16,
    pub after_actuator_charge_ma: u16,
    pub voltages: BatteryVoltages,
    pub system_charge_enabled: bool,
    pub actuator_charge_enabled: bool,
    pub actuator_input_limit: SingleInputLimit,
    pub indicators: IndicatorFrame,
    /// Telemetry could not be refreshed and the previous record was used.
    pub system_telemetry_stale: bool,
    pub actuator_telemetry_stale: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeDecision {
    pub enable: bool,
    pub indication: BatteryIndication,
}

impl ChargeDecision {
    const fn new(enable: bool, presence: BatteryPresence, charge: ChargeIndication) -> Self {
        ChargeDecision {
            enable,
            indication: BatteryIndication::new(presence, charge),
        }
    }

    const fn disabled(presence: BatteryPresence, charge: ChargeIndication) -> Self {
        Self::new(false, presence, charge)
    }
}

/// Charge cost and the extra headroom a charger that is not yet charging
/// must clear before it is started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargeCost {
    pub cost_ma: u16,
    pub hysteresis_ma: u16,
}

impl ChargeCost {
    pub const fn required_ma(&self, charging: bool) -> u16 {
        if charging {
            self.cost_ma
        } else {
            self.cost_ma.saturating_add(self.hysteresis_ma)
        }
    }

    fn reserve(&self, budget: &mut PowerBudget, charging: bool) -> bool {
        budget.try_reserve(self.required_ma(charging), self.cost_ma)
    }
}

/// First source in preference order that is Normal and advertises a non-zero
/// limit. Sources with a zero limit are skipped rather than ending the search.
pub fn select_input(telemetry: &bq24161::Telemetry, preferred: InputSource) -> (InputSource, u16) {
    InputSource::preference_order(preferred)
        .into_iter()
        .filter(|source| *source != InputSource::None)
        .filter(|source| telemetry.input_state(*source) == InputState::Normal)
        .map(|source| (source, telemetry.input_limit(source).as_milliamps()))
        .find(|(_, milliamps)| *milliamps > 0)
        .unwrap_or((InputSource::None, 0))
}

pub fn decide_system_charge(
    telemetry: &bq24161::Telemetry,
    battery_mv: u16,
    thresholds: &BatteryThresholds,
    cost: &ChargeCost,
    budget: &mut PowerBudget,
) -> ChargeDecision {
    let charging = telemetry.device_state == bq24161::DeviceState::Charging;

    let battery_fault = telemetry.battery_state != bq24161::BatteryState::Normal
        || matches!(telemetry.fault, bq24161::Fault::BatteryFault | bq24161::Fault::BatteryThermalShutdown);

    if battery_fault {
        let presence = if battery_mv < thresholds.not_present_mv {
            BatteryPresence::Absent
        } else {
            BatteryPresence::Warning
        };
        return ChargeDecision::disabled(presence, ChargeIndication::Idle);
    }

    if battery_mv > thresholds.initial_charge_mv {
        // topped off: only a charge already in progress may finish
        return if charging && cost.reserve(budget, true) {
            ChargeDecision::new(true, BatteryPresence::Healthy, ChargeIndication::Charging)
        } else {
            ChargeDecision::disabled(BatteryPresence::Healthy, ChargeIndication::Full)
        };
    }

    if cost.reserve(budget, charging) {
        ChargeDecision::new(true, BatteryPresence::Healthy, ChargeIndication::Charging)
    } else {
        let presence = if battery_mv < thresholds.low_mv {
            BatteryPresence::Warning
        } else {
            BatteryPresence::Healthy
        };
        ChargeDecision::disabled(presence, ChargeIndication::Idle)
    }
}

pub fn decide_actuator_charge(
    telemetry: &bq24250::Telemetry,
    battery_mv: u16,
    thresholds: &BatteryThresholds,
    cost: &ChargeCost,
    budget: &mut PowerBudget,
) -> ChargeDecision {
    let present = battery_mv > thresholds.not_present_mv;

    match telemetry.device_state {
        bq24250::DeviceState::Fault => {
            let absent_below_threshold = battery_mv < thresholds.not_present_mv;
            match telemetry.fault {
                fault if fault.is_battery_fault() || fault == bq24250::Fault::BatteryThermalShutdown => {
                    let presence = if absent_below_threshold {
                        BatteryPresence::Absent
                    } else {
                        BatteryPresence::Warning
                    };
                    ChargeDecision::disabled(presence, ChargeIndication::Idle)
                }
                _ => {
                    let presence = if present {
                        BatteryPresence::Healthy
                    } else {
                        BatteryPresence::Absent
                    };
                    ChargeDecision::disabled(presence, ChargeIndication::Fault)
                }
            }
        }
        bq24250::DeviceState::Ready => {
            if !present {
                ChargeDecision::disabled(BatteryPresence::Absent, ChargeIndication::Idle)
            } else if battery_mv < thresholds.initial_charge_mv && cost.reserve(budget, false) {
                ChargeDecision::new(true, BatteryPresence::Healthy, ChargeIndication::Charging)
            } else {
                ChargeDecision::disabled(BatteryPresence::Healthy, ChargeIndication::Idle)
            }
        }
        bq24250::DeviceState::Charging => {
            if cost.reserve(budget, true) {
                ChargeDecision::new(true, BatteryPresence::Healthy, ChargeIndication::Charging)
            } else {
                ChargeDecision::disabled(BatteryPresence::Healthy, ChargeIndication::Idle)
            }
        }
        bq24250::DeviceState::Done => ChargeDecision::disabled(BatteryPresence::Healthy, ChargeIndication::Idle),
    }
}

pub struct PowerBudgetArbiter {
    config: PowerConfig,
    system_charger: Bq24161,
    actuator_charger: Bq24250,
    input_leds: Pca9633,
    battery_leds: Pca9633,
    sampler: BatteryVoltageSampler,
    last_report: Option<UpdateReport>,
}

impl PowerBudgetArbiter {
    pub fn new(config: PowerConfig) -> Self {
        debug_assert!(config.system_battery.is_ordered());
        debug_assert!(config.actuator_battery.is_ordered());

        PowerBudgetArbiter {
            config,
            system_charger: Bq24161::new(),
            actuator_charger: Bq24250::new(),
            input_leds: Pca9633::new(INPUT_LED_BANK_ADDRESS),
            battery_leds: Pca9633::new(BATTERY_LED_BANK_ADDRESS),
            sampler: BatteryVoltageSampler::default(),
            last_report: None,
        }
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    pub fn source_preference(&self) -> [InputSource; 3] {
        InputSource::preference_order(self.config.preferred_source)
    }

    pub fn set_preferred_source(&mut self, source: InputSource) {
        self.config.preferred_source = source;
    }

    pub fn system_charger(&self) -> &Bq24161 {
        &self.system_charger
    }

    pub fn actuator_charger(&self) -> &Bq24250 {
        &self.actuator_charger
    }

    pub fn last_report(&self) -> Option<&UpdateReport> {
        self.last_report.as_ref()
    }

    /// Programs the fixed charger setpoints, brings up both LED banks and runs
    /// a first update. The actuator input starts in high impedance so nothing
    /// is drawn before the first budget exists.
    pub fn init<B: RegisterBus, A: AdcReader>(&mut self, bus: &mut B, adc: &mut A, domains: PowerDomainState) -> UpdateReport {
        if let Err(err) = self.actuator_charger.set_input_limit(bus, SingleInputLimit::HighImpedance) {
            warn!("actuator charger input limit write failed {}", err);
        }

        let thresholds = self.config.system_battery;
        if let Err(err) = self.system_charger.set_battery_regulation_voltage(bus, thresholds.regulation_mv) {
            warn!("system charger regulation voltage rejected {}", err);
        }
        if let Err(err) = self.system_charger.set_charge_current(bus, self.config.system_charge_current_ma) {
            warn!("system charger charge current rejected {}", err);
        }
        if let Err(err) = self.system_charger.set_termination_current(bus, self.config.system_termination_current_ma) {
            warn!("system charger termination current rejected {}", err);
        }

        if let Err(err) = Pca9633::software_reset(bus) {
            warn!("led driver reset failed {}", err);
        }
        if let Err(err) = self.input_leds.init(bus) {
            warn!("input led bank init failed {}", err);
        }
        if let Err(err) = self.battery_leds.init(bus) {
            warn!("battery led bank init failed {}", err);
        }

        info!("power budget arbiter initialized");

        self.update(bus, adc, domains)
    }

    /// One full arbitration pass. Never fails: unreadable chargers keep their
    /// last telemetry and failed writes are logged and dropped.
    pub fn update<B: RegisterBus, A: AdcReader>(&mut self, bus: &mut B, adc: &mut A, domains: PowerDomainState) -> UpdateReport {
        ///////////////////////
        //  refresh devices  //
        ///////////////////////

        if let Err(err) = self.system_charger.reset_watchdog(bus) {
            warn!("system charger watchdog reset failed {}", err);
        }
        let system_telemetry_stale = match self.system_charger.synchronize(bus) {
            Ok(()) => false,
            Err(err) => {
                warn!("system charger sync failed, using stale telemetry {}", err);
                true
            }
        };

        if let Err(err) = self.actuator_charger.reset_watchdog(bus) {
            warn!("actuator charger watchdog reset failed {}", err);
        }
        let actuator_telemetry_stale = match self.actuator_charger.synchronize(bus) {
            Ok(()) => false,
            Err(err) => {
                warn!("actuator charger sync failed, using stale telemetry {}", err);
                true
            }
        };

        let system_telemetry = *self.system_charger.telemetry();
        let actuator_telemetry = *self.actuator_charger.telemetry();

        ////////////////////
        //  input budget  //
        ////////////////////

        let (input_source, input_current_ma) = select_input(&system_telemetry, self.config.preferred_source);
        let mut budget = PowerBudget::new(input_current_ma);

        let voltages = self.sampler.sample(adc);

        if domains.system_on {
            budget.deduct(self.config.system_operating_current_ma);
        }
        let after_system_load_ma = budget.available_ma();

        ///////////////////////
        //  system battery   //
        ///////////////////////

        let system_cost = ChargeCost {
            cost_ma: self.config.system_charge_cost_ma(),
            hysteresis_ma: self.config.charge_enable_hysteresis_ma,
        };
        let system = decide_system_charge(
            &system_telemetry,
            voltages.system_mv,
            &self.config.system_battery,
            &system_cost,
            &mut budget,
        );
        if let Err(err) = self.system_charger.set_charging_enabled(bus, system.enable) {
            warn!("system charger enable write failed {}", err);
        }
        let after_system_charge_ma = budget.available_ma();

        budget.deduct(self.config.passthrough_loss_ma);
        let after_passthrough_ma = budget.available_ma();

        /////////////////////////
        //  actuator battery   //
        /////////////////////////

        let actuator_input_limit = SingleInputLimit::for_budget(after_passthrough_ma);
        if let Err(err) = self.actuator_charger.set_input_limit(bus, actuator_input_limit) {
            warn!("actuator charger input limit write failed {}", err);
        }

        if domains.actuator_on {
            budget.deduct(self.config.actuator_operating_current_ma);
        }
        let after_actuator_load_ma = budget.available_ma();

        let actuator_cost = ChargeCost {
            cost_ma: self.config.actuator_charge_cost_ma(),
            hysteresis_ma: self.config.charge_enable_hysteresis_ma,
        };
        let actuator = decide_actuator_charge(
            &actuator_telemetry,
            voltages.actuator_mv,
            &self.config.actuator_battery,
            &actuator_cost,
            &mut budget,
        );
        if let Err(err) = self.actuator_charger.set_charging_enabled(bus, actuator.enable) {
            warn!("actuator charger enable write failed {}", err);
        }
        let after_actuator_charge_ma = budget.available_ma();

        //////////////////
        //  indicators  //
        //////////////////

        let indicators = map_indicators(&IndicatorInputs {
            adapter_input: system_telemetry.adapter_input,
            usb_input: system_telemetry.usb_input,
            usb_limit: system_telemetry.usb_limit,
            system_battery: system.indication,
            actuator_battery: actuator.indication,
        });
        if let Err(err) = self.input_leds.set_led_modes(bus, indicators.input_bank) {
            warn!("input led bank write failed {}", err);
        }
        if let Err(err) = self.battery_leds.set_led_modes(bus, indicators.battery_bank) {
            warn!("battery led bank write failed {}", err);
        }

        let report = UpdateReport {
            input_source,
            input_current_ma,
            after_system_load_ma,
            after_system_charge_ma,
            after_passthrough_ma,
            after_actuator_load_ma,
            after_actuator_charge_ma,
            voltages,
            system_charge_enabled: system.enable,
            actuator_charge_enabled: actuator.enable,
            actuator_input_limit,
            indicators,
            system_telemetry_stale,
            actuator_telemetry_stale,
        };

        debug!("power update {}", report);
        self.last_report = Some(report);

        report
    }

    pub fn is_usb_connected(&self) -> bool {
        self.system_charger.input_state(InputSource::Usb) == InputState::Normal
    }

    pub fn status(&self) -> PowerStatus {
        PowerStatus {
            system_registers: *self.system_charger.registers(),
            system: *self.system_charger.telemetry(),
            actuator_registers: *self.actuator_charger.registers(),
            actuator: *self.actuator_charger.telemetry(),
            last_report: self.last_report,
        }
    }

    pub fn log_status(&self) {
        self.status().log();
    }
}
