#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;

use thermopush::{
    config::{METRIC_NAME, PushTarget, VALID_RANGE},
    hardware::Bme280Sensor,
    metrics::{Gauge, build_request, render_body},
    model::Reading,
    traits::TemperatureSensor,
};

esp_bootloader_esp_idf::esp_app_desc!();

// Test result tracking
struct TestResults {
    passed: u32,
    failed: u32,
    total: u32,
}

impl TestResults {
    fn new() -> Self {
        Self {
            passed: 0,
            failed: 0,
            total: 0,
        }
    }

    fn assert(&mut self, condition: bool, test_name: &str) {
        self.total += 1;
        if condition {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED", test_name);
        }
    }

    fn assert_eq<T: PartialEq + core::fmt::Debug>(&mut self, left: T, right: T, test_name: &str) {
        self.total += 1;
        if left == right {
            self.passed += 1;
            esp_println::println!("  ✓ {}", test_name);
        } else {
            self.failed += 1;
            esp_println::println!("  ✗ {} FAILED: {:?} != {:?}", test_name, left, right);
        }
    }

    fn print_summary(&self) {
        esp_println::println!("\n==========================================");
        esp_println::println!("Test Summary:");
        esp_println::println!("  Total:  {}", self.total);
        esp_println::println!("  Passed: {}", self.passed);
        esp_println::println!("  Failed: {}", self.failed);
        if self.failed == 0 {
            esp_println::println!("\n✓ ALL TESTS PASSED!");
        } else {
            esp_println::println!("\n✗ SOME TESTS FAILED");
        }
        esp_println::println!("==========================================");
    }
}

fn test_validation(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Reading validation");

    results.assert(Reading::validate(22.5, VALID_RANGE).is_ok(), "22.5 accepted");
    results.assert(Reading::validate(VALID_RANGE.low(), VALID_RANGE).is_err(), "lower bound rejected");
    results.assert(Reading::validate(VALID_RANGE.high(), VALID_RANGE).is_err(), "upper bound rejected");
    results.assert(Reading::validate(50.0, VALID_RANGE).is_err(), "50.0 rejected");
    results.assert(Reading::validate(f32::NAN, VALID_RANGE).is_err(), "NaN rejected");
}

fn test_formatting(results: &mut TestResults) {
    esp_println::println!("\n[TEST] Request formatting");

    match render_body(&Gauge { name: METRIC_NAME, value: 22.5 }) {
        Ok(body) => {
            results.assert_eq(
                body.as_str(),
                "#TYPE temperature_slaapkamer gauge\ntemperature_slaapkamer 22.500000\n",
                "body for 22.5",
            );
        }
        Err(_) => results.assert(false, "body for 22.5"),
    }

    // The float formatting on target must agree with the host.
    match build_request(&PushTarget::DEFAULT, METRIC_NAME, 22.5) {
        Ok(request) => {
            let split = request.split_once("\r\n\r\n");
            results.assert(split.is_some(), "header terminator present");
            if let Some((head, body)) = split {
                let declared = head
                    .lines()
                    .find_map(|line| line.strip_prefix("Content-Length: "))
                    .and_then(|value| value.parse::<usize>().ok());
                results.assert_eq(declared, Some(body.len()), "Content-Length matches body");
                results.assert(head.starts_with("POST "), "request line is POST");
            }
        }
        Err(_) => results.assert(false, "request fits buffer"),
    }
}

async fn test_sensor<SDA, SCL>(
    results: &mut TestResults,
    i2c0: esp_hal::peripherals::I2C0<'static>,
    sda: SDA,
    scl: SCL,
) where
    SDA: Into<esp_hal::gpio::AnyPin<'static>>,
    SCL: Into<esp_hal::gpio::AnyPin<'static>>,
{
    esp_println::println!("\n[TEST] BME280 Sensor Tests");

    let mut sensor = match Bme280Sensor::new(i2c0, sda, scl) {
        Ok(sensor) => sensor,
        Err(e) => {
            esp_println::println!("  Failed to set up I2C: {}", e);
            results.assert(false, "I2C setup");
            return;
        }
    };

    if let Err(e) = sensor.init() {
        esp_println::println!("  Failed to initialize sensor: {}", e);
        results.assert(false, "sensor initialization");
        return;
    }
    results.assert(true, "sensor initialization");

    esp_println::println!("  Reading temperatures (5 samples)...");
    let mut accepted = 0;
    for i in 0..5 {
        Timer::after(Duration::from_millis(100)).await;
        match sensor.read_temperature() {
            Ok(temp) => {
                esp_println::println!("    Sample {}: {:.2}°C", i + 1, temp);
                if Reading::validate(temp, VALID_RANGE).is_ok() {
                    accepted += 1;
                }
            }
            Err(e) => esp_println::println!("    Failed to read temperature: {}", e),
        }
    }

    // Indoors every sample should be pushable.
    results.assert_eq(accepted, 5, "all samples inside valid range");
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default());

    esp_println::println!("\n==========================================");
    esp_println::println!("=== Hardware Unit Test Runner ===");
    esp_println::println!("==========================================");

    let mut results = TestResults::new();

    // Run tests that don't need hardware
    test_validation(&mut results);
    test_formatting(&mut results);

    // Extract the peripherals we need before initializing RTOS timer
    let i2c0 = peripherals.I2C0;
    let gpio8 = peripherals.GPIO8;
    let gpio9 = peripherals.GPIO9;

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    test_sensor(&mut results, i2c0, gpio8, gpio9).await;

    results.print_summary();

    esp_println::println!("\nTest run complete. Looping...");
    loop {
        Timer::after(Duration::from_millis(1000)).await;
    }
}
