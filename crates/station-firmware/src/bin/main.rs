#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use esp_hal::clock::CpuClock;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::rng::Rng;
use esp_hal::rtc_cntl::Rtc;
use esp_hal::rtc_cntl::sleep::TimerWakeupSource;
use esp_hal::timer::timg::TimerGroup;
use log::{info, warn};
use static_cell::StaticCell;

use station_core::cycle::{Station, StationParts};
use station_core::device::SystemInfo;
use station_firmware::hardware::{create_i2c_bus, i2c_device, share_i2c_bus};
use station_firmware::ntp::NtpClock;
use station_firmware::secrets;
use station_firmware::sensors::{AdcBattery, Bme280Sensor, Veml7700};
use station_firmware::system::{self, ChipInfo};
use station_firmware::thingspeak::ThingSpeakClient;
use station_firmware::wifi::{self, WifiLink};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    // 80 MHz is plenty and keeps the awake phase cheap.
    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::_80MHz);
    let peripherals = esp_hal::init(hal_config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 66320);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_int = SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_int.software_interrupt0);

    let config = secrets::station_config()
        .unwrap_or_else(|e| panic!("Invalid station configuration: {}", e));

    let chip = ChipInfo::capture();
    info!(
        "Reset reason: {}, wake cause: {}",
        chip.reset_reason(),
        chip.wake_cause()
    );

    // Network
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi controller"));
    let (controller, interfaces) =
        esp_radio::wifi::new(radio, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    static NET_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(StackResources::new()),
        seed,
    );
    spawner.spawn(wifi::net_task(runner)).ok();

    // Sensors
    let i2c = create_i2c_bus(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9)
        .expect("Failed to configure I2C0");
    let bus = share_i2c_bus(i2c);

    let mut climate = Bme280Sensor::new(i2c_device(bus));
    if let Err(e) = climate.init() {
        warn!("{}", e);
    }
    let mut light = Veml7700::new(i2c_device(bus));
    if let Err(e) = light.init() {
        warn!("{}", e);
    }
    let battery = AdcBattery::new(peripherals.ADC1, peripherals.GPIO0);

    let parts = StationParts {
        network: WifiLink::new(controller, stack, &config.internet),
        clock: NtpClock::new(stack, &config.schedule),
        climate,
        light,
        battery,
        system: chip,
        uploader: ThingSpeakClient::new(stack, &config.channel),
        delay: embassy_time::Delay,
    };
    let mut station = Station::new(parts, config, system::restore_sleep_counter());
    let mut rtc = Rtc::new(peripherals.LPWR);

    loop {
        let report = station.run_cycle().await;
        for issue in &report.issues {
            warn!("{}", issue);
        }
        info!("Status: {}", report.record);

        let sleep = core::time::Duration::from_secs(station.sleep_duration().as_secs());
        info!("Go to light sleep mode.");
        let timer = TimerWakeupSource::new(sleep);
        rtc.sleep_light(&[&timer]);

        system::retain_sleep_counter(station.wake());
    }
}
