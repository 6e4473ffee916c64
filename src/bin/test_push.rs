//! One-shot push over WiFi.
//!
//! Brings up the network, submits a fixed reading to the collector and
//! reports the outcome on the console. Useful to check credentials, DNS and
//! the collector without waiting for the sampling cadence.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;

use thermopush::{
    client::PushClient,
    config::{COLLECTOR_HOST, COLLECTOR_PORT, ClientConfig, VALID_RANGE},
    model::Reading,
    network::{self, DnsResolver, TcpNetwork},
};

esp_bootloader_esp_idf::esp_app_desc!();

const PROBE_CELSIUS: f32 = 21.0;

#[esp_rtos::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: 72 * 1024);

    esp_println::println!("=== Push Test ===");

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let stack = match network::start_wifi(&spawner, peripherals.WIFI) {
        Ok(stack) => stack,
        Err(e) => {
            esp_println::println!("[ERROR] {}", e);
            loop {
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    };

    stack.wait_config_up().await;
    esp_println::println!("Network up, pushing to {}:{}", COLLECTOR_HOST, COLLECTOR_PORT);

    let mut client = PushClient::new(
        TcpNetwork::new(stack),
        DnsResolver::new(stack),
        Delay,
        ClientConfig::DEFAULT,
    );

    match Reading::validate(PROBE_CELSIUS, VALID_RANGE) {
        Ok(reading) => match client.submit(reading).await {
            Ok(()) => esp_println::println!("✓ push delivered"),
            Err(e) => esp_println::println!("✗ push failed: {}", e),
        },
        Err(e) => esp_println::println!("✗ probe value rejected: {}", e),
    }

    if let Some(addr) = client.resolver().cached() {
        esp_println::println!("Collector resolved to {}", addr);
    }

    loop {
        Timer::after(Duration::from_secs(5)).await;
    }
}
