use bme280::i2c::BME280;
use esp_hal::gpio::AnyPin;
use esp_hal::{
    delay::Delay,
    i2c::master::{Config as I2cConfig, I2c},
    peripherals::I2C0,
    time::Rate,
};

use crate::traits::TemperatureSensor;

const I2C_FREQ_KHZ: u32 = 100;

/// BME280/BMP280 on I2C0, primary address 0x76.
pub struct Bme280Sensor<'a> {
    driver: BME280<I2c<'a, esp_hal::Blocking>>,
    delay: Delay,
}

impl<'a> Bme280Sensor<'a> {
    pub fn new<SDA, SCL>(i2c_periph: I2C0<'a>, sda: SDA, scl: SCL) -> Result<Self, &'static str>
    where
        SDA: Into<AnyPin<'a>>,
        SCL: Into<AnyPin<'a>>,
    {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQ_KHZ)),
        )
        .map_err(|_| "invalid I2C configuration")?
        .with_sda(sda.into())
        .with_scl(scl.into());

        Ok(Self {
            driver: BME280::new_primary(i2c),
            delay: Delay::new(),
        })
    }
}

impl TemperatureSensor for Bme280Sensor<'_> {
    fn init(&mut self) -> Result<(), &'static str> {
        self.driver
            .init(&mut self.delay)
            .map_err(|_| "Failed to initialize BME280")?;
        log::info!("[BME280] Initialized - ready to measure");
        Ok(())
    }

    fn read_temperature(&mut self) -> Result<f32, &'static str> {
        let measurements = self
            .driver
            .measure(&mut self.delay)
            .map_err(|_| "BME280 measurement failed")?;
        Ok(measurements.temperature)
    }
}
