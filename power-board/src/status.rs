use pmfw_lib_power::drivers::charger::{bq24161, bq24250};

use crate::arbiter::UpdateReport;

/// Snapshot of both chargers for the diagnostic dump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerStatus {
    pub system_registers: [u8; bq24161::NUM_SYNC_REGISTERS],
    pub system: bq24161::Telemetry,
    pub actuator_registers: [u8; bq24250::NUM_SYNC_REGISTERS],
    pub actuator: bq24250::Telemetry,
    pub last_report: Option<UpdateReport>,
}

impl PowerStatus {
    pub fn log(&self) {
        info!("<system charger> registers {:x}", self.system_registers);
        info!(
            "state {} fault {} source {} (preferred {})",
            self.system.device_state,
            self.system.fault,
            self.system.selected_source,
            self.system.preferred_source
        );
        info!(
            "adapter {} {} usb {} {} battery {}",
            self.system.adapter_input,
            self.system.adapter_limit,
            self.system.usb_input,
            self.system.usb_limit,
            self.system.battery_state
        );
        info!(
            "charging enabled {} regulation {} mV charge {} mA termination {} mA",
            self.system.charging_enabled,
            self.system.regulation_voltage_mv,
            self.system.charge_current_ma,
            self.system.termination_current_ma
        );

        info!("<actuator charger> registers {:x}", self.actuator_registers);
        info!(
            "state {} fault {} input {} charging enabled {}",
            self.actuator.device_state,
            self.actuator.fault,
            self.actuator.input_limit,
            self.actuator.charging_enabled
        );
        info!(
            "watchdog enabled {} watchdog fault {}",
            self.actuator.watchdog_enabled,
            self.actuator.watchdog_fault
        );

        match &self.last_report {
            Some(report) => info!("last update {}", report),
            None => info!("no update has run yet"),
        }
    }
}
