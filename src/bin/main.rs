#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::Delay;
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};

use thermopush::{
    client::PushClient,
    config::{ClientConfig, LoopConfig},
    hardware::Bme280Sensor,
    logic::SamplingLoop,
    network::{self, DnsResolver, TcpNetwork},
    traits::TemperatureSensor,
};

esp_bootloader_esp_idf::esp_app_desc!();

/// Give the UART a moment to drain before the chip resets.
const RESTART_GRACE_MS: u32 = 100;

fn restart() -> ! {
    info!("Restarting now.");
    esp_hal::delay::Delay::new().delay_millis(RESTART_GRACE_MS);
    esp_hal::system::software_reset()
}

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: 72 * 1024);

    info!("Temperature sensor app loading...");
    info!("This is an {} chip", esp_hal::chip!());

    // Initialize RTOS timer for embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let stack = match network::start_wifi(&spawner, peripherals.WIFI) {
        Ok(stack) => stack,
        Err(e) => {
            error!("[ERROR] Network bring-up failed: {}", e);
            restart()
        }
    };

    let mut sensor = match Bme280Sensor::new(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
        Ok(sensor) => sensor,
        Err(e) => {
            error!("[ERROR] Sensor bus setup failed: {}", e);
            restart()
        }
    };
    if let Err(e) = sensor.init() {
        error!("[ERROR] Sensor init failed: {}", e);
        restart()
    }

    info!("Waiting for DHCP lease...");
    stack.wait_config_up().await;
    if let Some(config) = stack.config_v4() {
        info!("Got IP {}", config.address);
    }

    let client = PushClient::new(
        TcpNetwork::new(stack),
        DnsResolver::new(stack),
        Delay,
        ClientConfig::DEFAULT,
    );
    let mut sampler = SamplingLoop::new(sensor, client, Delay, LoopConfig::DEFAULT);

    let exit = sampler.run().await;
    info!(
        "Exited loop after {} cycles: {} submitted, {} rejected, {} failed",
        exit.stats.cycles, exit.stats.submitted, exit.stats.rejected, exit.stats.failed
    );
    restart()
}
