#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_sync::signal::Signal;
use {defmt_rtt as _, panic_probe as _};

use pmfw_power_board::{create_charger_irq_task, create_power_task, pins::SyncRequestSignal};

static SYNC_REQUEST: SyncRequestSignal = Signal::new();

#[embassy_executor::main]
async fn main(main_spawner: Spawner) {
    let p = embassy_stm32::init(Default::default());
    defmt::info!("embassy HAL configured.");

    ///////////////////
    //  start tasks  //
    ///////////////////

    create_power_task!(main_spawner, &SYNC_REQUEST, p);
    create_charger_irq_task!(main_spawner, &SYNC_REQUEST, p);

    defmt::info!("power board online");
}
