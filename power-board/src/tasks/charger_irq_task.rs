use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::{
    exti::ExtiInput,
    gpio::{Input, Pull},
};

use crate::pins::*;

#[macro_export]
macro_rules! create_charger_irq_task {
    ($spawner:ident, $sync_request:expr, $p:ident) => {
        pmfw_power_board::tasks::charger_irq_task::start_charger_irq_task(&$spawner, $sync_request,
            $p.PC2, $p.EXTI2,
            $p.PC3, $p.EXTI3);
    };
}

// Both chargers pull their open drain interrupt line low on any status change.
#[embassy_executor::task]
async fn charger_irq_task_entry(
    mut system_irq: ExtiInput<'static, SystemChargerIrqPin>,
    mut actuator_irq: ExtiInput<'static, ActuatorChargerIrqPin>,
    sync_request: &'static SyncRequestSignal,
) {
    loop {
        match select(system_irq.wait_for_falling_edge(), actuator_irq.wait_for_falling_edge()).await {
            Either::First(_) => defmt::debug!("system charger interrupt"),
            Either::Second(_) => defmt::debug!("actuator charger interrupt"),
        }

        sync_request.signal(());
    }
}

pub fn start_charger_irq_task(spawner: &Spawner,
        sync_request: &'static SyncRequestSignal,
        system_irq_pin: SystemChargerIrqPin,
        system_irq_exti: SystemChargerIrqExti,
        actuator_irq_pin: ActuatorChargerIrqPin,
        actuator_irq_exti: ActuatorChargerIrqExti,
        ) {

    let system_irq = ExtiInput::new(Input::new(system_irq_pin, Pull::Up), system_irq_exti);
    let actuator_irq = ExtiInput::new(Input::new(actuator_irq_pin, Pull::Up), actuator_irq_exti);

    if spawner.spawn(charger_irq_task_entry(system_irq, actuator_irq, sync_request)).is_err() {
        defmt::error!("failed to spawn charger irq task");
    }
}
