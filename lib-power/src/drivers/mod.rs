pub mod adc;
pub mod charger;
pub mod led;
