use embassy_stm32::{bind_interrupts, i2c, peripherals::*};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};

/////////////////////
//  power control  //
/////////////////////

pub type SystemPowerEnablePin = PC4;
pub type ActuatorPowerEnablePin = PC6;
pub type PassthroughPowerEnablePin = PC5;

pub type PowerButtonPin = PC0;

///////////////////
//  charger bus  //
///////////////////

pub type PowerI2c = I2C1;
pub type PowerI2cSclPin = PB8;
pub type PowerI2cSdaPin = PB9;

pub type SystemChargerIrqPin = PC2;
pub type SystemChargerIrqExti = EXTI2;
pub type ActuatorChargerIrqPin = PC3;
pub type ActuatorChargerIrqExti = EXTI3;

///////////////////////
//  voltage monitor  //
///////////////////////

pub type BatteryAdc = ADC1;
// ADC1_IN6 and ADC1_IN7
pub type SystemBatteryAdcPin = PA6;
pub type ActuatorBatteryAdcPin = PA7;

//////////////////////////////
//  Communication Channels  //
//////////////////////////////

pub type SyncRequestSignal = Signal<CriticalSectionRawMutex, ()>;

bind_interrupts!(pub struct SystemIrqs {
    I2C1 => i2c::EventInterruptHandler<I2C1>, i2c::ErrorInterruptHandler<I2C1>;
});
