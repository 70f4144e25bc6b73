use embassy_time::{Duration, Instant};
use embedded_hal::digital::OutputPin;

/// Which rails are currently switched on. Only `PowerRails` changes this.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerDomainState {
    pub system_on: bool,
    pub actuator_on: bool,
    pub passthrough_on: bool,
}

impl PowerDomainState {
    pub const fn new() -> Self {
        PowerDomainState {
            system_on: false,
            actuator_on: false,
            passthrough_on: false,
        }
    }
}

/// Enable outputs for the system, actuator and system-to-actuator
/// passthrough regulators. The tracked state only changes when the pin
/// write succeeds.
pub struct PowerRails<P: OutputPin> {
    system_en: P,
    actuator_en: P,
    passthrough_en: P,
    state: PowerDomainState,
}

impl<P: OutputPin> PowerRails<P> {
    /// Takes the pins as they are, the caller is expected to have created
    /// them driven low.
    pub fn new(system_en: P, actuator_en: P, passthrough_en: P) -> Self {
        PowerRails {
            system_en,
            actuator_en,
            passthrough_en,
            state: PowerDomainState::new(),
        }
    }

    pub fn state(&self) -> PowerDomainState {
        self.state
    }

    pub fn set_system_power(&mut self, on: bool) -> Result<(), P::Error> {
        drive(&mut self.system_en, on)?;
        self.state.system_on = on;
        Ok(())
    }

    pub fn set_actuator_power(&mut self, on: bool) -> Result<(), P::Error> {
        drive(&mut self.actuator_en, on)?;
        self.state.actuator_on = on;
        Ok(())
    }

    pub fn set_passthrough_power(&mut self, on: bool) -> Result<(), P::Error> {
        drive(&mut self.passthrough_en, on)?;
        self.state.passthrough_on = on;
        Ok(())
    }

    /// Actuators first so they never run without the system domain.
    pub fn hard_power_down(&mut self) -> Result<(), P::Error> {
        self.set_actuator_power(false)?;
        self.set_system_power(false)
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool) -> Result<(), P::Error> {
    if on {
        pin.set_high()
    } else {
        pin.set_low()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonAction {
    None,
    PowerOn,
    HardPowerDown,
}

/// Power switch policy: a press while the system is off turns it on, a hold
/// longer than the hard power down time while it is on turns everything off.
/// Each press produces at most one action.
pub struct PowerButton {
    hold_time: Duration,
    pressed_at: Option<Instant>,
    was_pressed: bool,
}

impl PowerButton {
    pub const fn new(hold_time: Duration) -> Self {
        PowerButton {
            hold_time,
            pressed_at: None,
            was_pressed: false,
        }
    }

    pub fn poll(&mut self, pressed: bool, now: Instant, system_on: bool) -> ButtonAction {
        if pressed && !self.was_pressed {
            self.pressed_at = Some(now);
        } else if !pressed {
            self.pressed_at = None;
        }
        self.was_pressed = pressed;

        let Some(pressed_at) = self.pressed_at else {
            return ButtonAction::None;
        };

        if !system_on {
            self.pressed_at = None;
            return ButtonAction::PowerOn;
        }

        match now.checked_duration_since(pressed_at) {
            Some(held) if held > self.hold_time => {
                self.pressed_at = None;
                ButtonAction::HardPowerDown
            }
            _ => ButtonAction::None,
        }
    }
}

/// Decides when the arbiter runs: once the period has elapsed since the last
/// run, or as soon as a sync was requested. Requests latch until the next run.
pub struct SyncScheduler {
    period: Duration,
    last_sync: Option<Instant>,
    requested: bool,
}

impl SyncScheduler {
    pub const fn new(period: Duration) -> Self {
        SyncScheduler {
            period,
            last_sync: None,
            requested: false,
        }
    }

    pub fn request(&mut self) {
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    pub fn is_due(&self, now: Instant) -> bool {
        if self.requested {
            return true;
        }

        match self.last_sync {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed > self.period),
        }
    }

    pub fn mark_synced(&mut self, now: Instant) {
        self.last_sync = Some(now);
        self.requested = false;
    }

    /// Returns true and restarts the period when a sync is due.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.mark_synced(now);
            true
        } else {
            false
        }
    }
}
