pub mod charger_irq_task;
pub mod power_task;
