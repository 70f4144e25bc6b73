mod common;

use common::*;

use pmfw_lib_power::{
    bus::{BusWrite, SimulatedBus},
    drivers::{
        charger::{
            bq24161::{self, InputSource},
            bq24250::{self, SingleInputLimit},
            Charger, InputCurrentLimit,
        },
        led::pca9633::{LedMode, PCA9633_RESET_ADDRESS},
    },
};
use pmfw_power_board::{
    arbiter::PowerBudgetArbiter,
    config::{PowerConfig, BATTERY_LED_BANK_ADDRESS, INPUT_LED_BANK_ADDRESS},
};

use LedMode::{Blink, Off, On};

fn arbiter() -> PowerBudgetArbiter {
    PowerBudgetArbiter::new(PowerConfig::new())
}

/// Adapter at 1500 mA, USB unplugged, system pack idle at 3808 mV and no
/// actuator pack.
fn adapter_only_board() -> SimulatedBus {
    let mut bus = board();
    set_system_status(&mut bus, READY_ADAPTER, 0);
    set_supply_status(&mut bus, NORMAL, UNDER_VOLTAGE, 0);
    set_adapter_limit_high(&mut bus, false);
    set_actuator_status(&mut bus, ACT_READY, 0);
    bus
}

#[test]
fn adapter_powers_system_and_charges_system_battery() {
    let mut bus = adapter_only_board();
    let mut adc = TestAdc { system_counts: 224, actuator_counts: 0 };
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert_eq!(report.voltages.system_mv, 3808);
    assert_eq!(report.input_source, InputSource::Adapter);
    assert_eq!(report.input_current_ma, 1500);
    assert_eq!(report.after_system_load_ma, 750);
    assert!(report.system_charge_enabled);
    assert_eq!(report.after_system_charge_ma, 504);
    assert_eq!(report.after_passthrough_ma, 404);
    assert_eq!(report.actuator_input_limit, SingleInputLimit::L150);
    assert!(!report.actuator_charge_enabled);
    assert_eq!(report.after_actuator_charge_ma, 404);

    assert_eq!(report.indicators.input_bank, [On, Off, Off, Off]);
    assert_eq!(report.indicators.battery_bank, [On, Blink, Off, Off]);

    assert!(system_charge_enabled(&bus));
    assert!(!actuator_charge_enabled(&bus));
    assert_eq!(bq24250::decode_input_limit(bus.register(ACT, 0x01)), SingleInputLimit::L150);
    assert_eq!(bus.register(INPUT_LED_BANK_ADDRESS, 0x08), 0b0000_0001);
    assert_eq!(bus.register(BATTERY_LED_BANK_ADDRESS, 0x08), 0b0000_1101);
}

#[test]
fn no_input_with_low_battery_warns_and_isolates_actuator() {
    let mut bus = board();
    set_system_status(&mut bus, STANDBY, 0);
    set_supply_status(&mut bus, UNDER_VOLTAGE, UNDER_VOLTAGE, 0);
    set_actuator_status(&mut bus, ACT_READY, 0);
    // 2992 mV
    let mut adc = TestAdc { system_counts: 176, actuator_counts: 0 };
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert_eq!(report.input_source, InputSource::None);
    assert_eq!(report.input_current_ma, 0);
    assert_eq!(report.after_system_load_ma, 0);
    assert!(!report.system_charge_enabled);
    assert_eq!(report.indicators.battery_bank[0], Blink);
    assert_eq!(report.indicators.battery_bank[1], Off);
    assert_eq!(report.indicators.input_bank, [Off; 4]);

    assert_eq!(report.actuator_input_limit, SingleInputLimit::HighImpedance);
    assert_eq!(bus.register(ACT, 0x01) & 0x01, 0x01);
    assert!(!system_charge_enabled(&bus));
}

#[test]
fn disconnected_system_battery_reads_absent() {
    let mut bus = board();
    set_system_status(&mut bus, READY_ADAPTER, 0);
    set_supply_status(&mut bus, NORMAL, UNDER_VOLTAGE, 0b10);
    set_actuator_status(&mut bus, ACT_READY, 0);
    // 408 mV, floating tap
    let mut adc = TestAdc { system_counts: 24, actuator_counts: 0 };
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert!(!report.system_charge_enabled);
    assert_eq!(report.indicators.battery_bank[0], Off);
    assert_eq!(report.indicators.battery_bank[1], Off);
    assert_eq!(report.after_system_charge_ma, report.after_system_load_ma);
}

#[test]
fn disconnected_system_battery_with_voltage_warns() {
    let mut bus = board();
    set_system_status(&mut bus, READY_ADAPTER, 0);
    set_supply_status(&mut bus, NORMAL, UNDER_VOLTAGE, 0b10);
    let mut adc = TestAdc::from_millivolts(3700, 0);
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert!(!report.system_charge_enabled);
    assert_eq!(report.indicators.battery_bank[0], Blink);
    assert_eq!(report.indicators.battery_bank[1], Off);
}

#[test]
fn finished_actuator_charge_is_left_off() {
    let mut bus = adapter_only_board();
    set_adapter_limit_high(&mut bus, true);
    set_actuator_status(&mut bus, ACT_DONE, 0);
    let mut adc = TestAdc { system_counts: 224, actuator_counts: 244 };
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert_eq!(report.input_current_ma, 2500);
    assert_eq!(report.after_system_charge_ma, 1504);
    assert_eq!(report.after_passthrough_ma, 1404);
    assert_eq!(report.actuator_input_limit, SingleInputLimit::L900);

    assert!(!report.actuator_charge_enabled);
    assert!(!actuator_charge_enabled(&bus));
    assert_eq!(report.after_actuator_charge_ma, report.after_actuator_load_ma);
    assert_eq!(report.indicators.battery_bank[2], On);
    assert_eq!(report.indicators.battery_bank[3], Off);
}

#[test]
fn spare_input_charges_actuator_battery() {
    let mut bus = adapter_only_board();
    set_adapter_limit_high(&mut bus, true);
    let mut adc = TestAdc::from_millivolts(3808, 3500);
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(false, true));

    assert_eq!(report.after_system_load_ma, 2500);
    assert_eq!(report.after_system_charge_ma, 2254);
    assert_eq!(report.after_passthrough_ma, 2154);
    assert_eq!(report.actuator_input_limit, SingleInputLimit::L2000);
    assert_eq!(report.after_actuator_load_ma, 1654);
    assert!(report.actuator_charge_enabled);
    assert_eq!(report.after_actuator_charge_ma, 1321);

    assert!(actuator_charge_enabled(&bus));
    assert_eq!(report.indicators.battery_bank, [On, Blink, On, Blink]);
}

#[test]
fn actuator_charger_fault_blinks_its_charge_led() {
    let mut bus = adapter_only_board();
    // thermal shutdown
    set_actuator_status(&mut bus, ACT_FAULT, 0x06);
    let mut adc = TestAdc::from_millivolts(3808, 3900);
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, true));

    assert_eq!(arbiter.actuator_charger().fault(), bq24250::Fault::DeviceThermalShutdown);
    assert!(!report.actuator_charge_enabled);
    assert_eq!(report.indicators.battery_bank[2], On);
    assert_eq!(report.indicators.battery_bank[3], Blink);
}

#[test]
fn repeated_update_issues_identical_commands() {
    let mut bus = adapter_only_board();
    set_usb_limit_code(&mut bus, 0x05);
    set_supply_status(&mut bus, NORMAL, NORMAL, 0);
    let mut adc = TestAdc::from_millivolts(3808, 3500);
    let mut arbiter = arbiter();

    let first = arbiter.update(&mut bus, &mut adc, domains(true, true));
    let first_writes = bus.writes().to_vec();
    bus.clear_writes();

    let second = arbiter.update(&mut bus, &mut adc, domains(true, true));

    assert_eq!(first, second);
    assert!(!first_writes.is_empty());
    assert_eq!(first_writes.as_slice(), bus.writes());
}

#[test]
fn preferred_source_picks_between_normal_inputs() {
    let mut bus = adapter_only_board();
    set_supply_status(&mut bus, NORMAL, NORMAL, 0);
    set_adapter_limit_high(&mut bus, false);
    set_usb_limit_code(&mut bus, 0x02);
    let mut adc = TestAdc::from_millivolts(3808, 0);
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));
    assert_eq!((report.input_source, report.input_current_ma), (InputSource::Adapter, 1500));
    // USB 500 mA lights two of three
    assert_eq!(report.indicators.input_bank, [On, On, On, Off]);

    arbiter.set_preferred_source(InputSource::Usb);
    assert_eq!(
        arbiter.source_preference(),
        [InputSource::Usb, InputSource::Adapter, InputSource::None]
    );

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));
    assert_eq!((report.input_source, report.input_current_ma), (InputSource::Usb, 500));
    assert!(!report.system_charge_enabled);
    assert_eq!(report.after_system_load_ma, 0);
}

#[test]
fn unusable_preferred_source_falls_back() {
    let mut bus = adapter_only_board();
    // USB at code 6 reports no current
    set_supply_status(&mut bus, NORMAL, NORMAL, 0);
    set_usb_limit_code(&mut bus, 0x06);
    let mut adc = TestAdc::from_millivolts(3808, 0);
    let mut arbiter = PowerBudgetArbiter::new(PowerConfig {
        preferred_source: InputSource::Usb,
        ..PowerConfig::new()
    });

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert_eq!((report.input_source, report.input_current_ma), (InputSource::Adapter, 1500));
    assert_eq!(report.indicators.input_bank, [On, Off, Off, Off]);
}

#[test]
fn offline_charger_keeps_previous_telemetry() {
    let mut bus = adapter_only_board();
    let mut adc = TestAdc { system_counts: 224, actuator_counts: 0 };
    let mut arbiter = arbiter();

    let first = arbiter.update(&mut bus, &mut adc, domains(true, false));
    assert!(!first.system_telemetry_stale);

    bus.set_offline(SYS, true);
    bus.clear_writes();

    let second = arbiter.update(&mut bus, &mut adc, domains(true, false));

    assert!(second.system_telemetry_stale);
    assert!(!second.actuator_telemetry_stale);
    assert_eq!(second.input_source, InputSource::Adapter);
    assert_eq!(second.input_current_ma, 1500);
    assert_eq!(arbiter.system_charger().device_state(), bq24161::DeviceState::Ready);

    // the rest of the board is still driven
    assert_eq!(bus.register_writes_to(SYS).count(), 0);
    assert!(bus.register_writes_to(ACT).count() > 0);
    assert!(bus.register_writes_to(BATTERY_LED_BANK_ADDRESS).count() > 0);
}

#[test]
fn unreachable_board_still_reports() {
    let mut bus = board();
    bus.set_offline(SYS, true);
    bus.set_offline(ACT, true);
    bus.set_offline(INPUT_LED_BANK_ADDRESS, true);
    bus.set_offline(BATTERY_LED_BANK_ADDRESS, true);
    let mut adc = TestAdc::from_millivolts(3808, 3808);
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, true));

    assert!(report.system_telemetry_stale);
    assert!(report.actuator_telemetry_stale);
    assert_eq!(report.input_current_ma, 0);
    assert!(bus.writes().is_empty());
    assert_eq!(arbiter.last_report(), Some(&report));
}

#[test]
fn init_programs_setpoints_before_first_update() {
    let mut bus = adapter_only_board();
    let mut adc = TestAdc { system_counts: 224, actuator_counts: 0 };
    let mut arbiter = arbiter();

    let report = arbiter.init(&mut bus, &mut adc, domains(true, false));

    // actuator input is isolated before anything else happens
    assert_eq!(
        bus.writes().first(),
        Some(&BusWrite::Register { address: ACT, register: 0x01, value: 0x03 })
    );

    // 4200 mV regulation, 740 mA charge (550 + 2 * 75), 50 mA termination
    assert_eq!(bus.register(SYS, 0x03) >> 2, 35);
    assert_eq!(bus.register(SYS, 0x05), 0x10);

    let reset_at = bus
        .writes()
        .iter()
        .position(|w| matches!(w, BusWrite::Raw { address, .. } if *address == PCA9633_RESET_ADDRESS));
    let first_led_write = bus
        .writes()
        .iter()
        .position(|w| matches!(w, BusWrite::Register { address, .. } if *address == INPUT_LED_BANK_ADDRESS));
    assert!(reset_at.is_some());
    assert!(reset_at < first_led_write);

    for bank in [INPUT_LED_BANK_ADDRESS, BATTERY_LED_BANK_ADDRESS] {
        assert_eq!(bus.register(bank, 0x01), 0x24);
        assert_eq!(bus.register(bank, 0x06), 0x80);
        assert_eq!(bus.register(bank, 0x07), 0x17);
    }

    // the trailing update lifts high impedance again
    assert_eq!(report.actuator_input_limit, SingleInputLimit::L150);
    assert_eq!(bus.register(ACT, 0x01) & 0x01, 0);
    assert_eq!(arbiter.last_report(), Some(&report));
}

#[test]
fn usb_connection_follows_usb_input_state() {
    let mut bus = adapter_only_board();
    let mut adc = TestAdc::from_millivolts(3808, 0);
    let mut arbiter = arbiter();

    assert!(!arbiter.is_usb_connected());

    arbiter.update(&mut bus, &mut adc, domains(false, false));
    assert!(!arbiter.is_usb_connected());

    set_supply_status(&mut bus, NORMAL, NORMAL, 0);
    arbiter.update(&mut bus, &mut adc, domains(false, false));
    assert!(arbiter.is_usb_connected());

    set_supply_status(&mut bus, NORMAL, WEAK_SOURCE, 0);
    arbiter.update(&mut bus, &mut adc, domains(false, false));
    assert!(!arbiter.is_usb_connected());
}

#[test]
fn status_snapshot_matches_last_sync() {
    let mut bus = adapter_only_board();
    let mut adc = TestAdc { system_counts: 224, actuator_counts: 0 };
    let mut arbiter = arbiter();

    let report = arbiter.update(&mut bus, &mut adc, domains(true, false));
    let status = arbiter.status();

    assert_eq!(status.system_registers[1], bus.register(SYS, 0x01));
    assert_eq!(status.system.adapter_limit, bq24161::InputLimit::L1500);
    assert_eq!(status.actuator.device_state, bq24250::DeviceState::Ready);
    assert_eq!(status.last_report, Some(report));

    arbiter.log_status();
}

/// xorshift32, fixed seed
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    fn below(&mut self, n: u32) -> u8 {
        (self.next() % n) as u8
    }

    fn flag(&mut self) -> bool {
        self.next() & 1 == 1
    }
}

#[test]
fn chargers_only_start_with_enough_budget() {
    let config = PowerConfig::new();
    let system_cost = config.system_charge_cost_ma();
    let actuator_cost = config.actuator_charge_cost_ma();
    let hysteresis = config.charge_enable_hysteresis_ma;
    let mut rng = Rng(0x1BAD_5EED);

    for _ in 0..500 {
        let mut bus = board();
        let system_state = rng.below(8);
        set_system_status(&mut bus, system_state, rng.below(8));
        set_supply_status(&mut bus, rng.below(4), rng.below(4), rng.below(4));
        set_usb_limit_code(&mut bus, rng.below(8));
        set_adapter_limit_high(&mut bus, rng.flag());
        let actuator_state = rng.below(4);
        set_actuator_status(&mut bus, actuator_state, rng.below(12));

        let mut adc = TestAdc {
            system_counts: rng.below(255) as u16,
            actuator_counts: rng.below(255) as u16,
        };
        let mut arbiter = PowerBudgetArbiter::new(config);
        let report = arbiter.update(&mut bus, &mut adc, domains(rng.flag(), rng.flag()));

        assert!(report.after_system_load_ma <= report.input_current_ma);
        assert!(report.after_system_charge_ma <= report.after_system_load_ma);
        assert!(report.after_passthrough_ma <= report.after_system_charge_ma);
        assert!(report.after_actuator_load_ma <= report.after_passthrough_ma);
        assert!(report.after_actuator_charge_ma <= report.after_actuator_load_ma);

        if report.system_charge_enabled {
            let required = if system_state == CHARGING_ADAPTER || system_state == CHARGING_USB {
                system_cost
            } else {
                system_cost + hysteresis
            };
            assert!(report.after_system_load_ma >= required);
            assert_eq!(report.after_system_load_ma - report.after_system_charge_ma, system_cost);
        } else {
            assert_eq!(report.after_system_charge_ma, report.after_system_load_ma);
        }

        if report.actuator_charge_enabled {
            let required = if actuator_state == ACT_CHARGING {
                actuator_cost
            } else {
                actuator_cost + hysteresis
            };
            assert!(report.after_actuator_load_ma >= required);
            assert_eq!(report.after_actuator_load_ma - report.after_actuator_charge_ma, actuator_cost);
        } else {
            assert_eq!(report.after_actuator_charge_ma, report.after_actuator_load_ma);
        }

        match report.actuator_input_limit {
            SingleInputLimit::HighImpedance => assert!(report.after_passthrough_ma < 100),
            limit => {
                assert!(limit.milliamps().is_some_and(|ma| ma <= report.after_passthrough_ma));
            }
        }

        assert_eq!(system_charge_enabled(&bus), report.system_charge_enabled);
        assert_eq!(actuator_charge_enabled(&bus), report.actuator_charge_enabled);
    }
}
