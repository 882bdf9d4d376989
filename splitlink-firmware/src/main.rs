//! Splitlink - Split Keyboard Link Firmware
//!
//! Firmware binary for RP2040-based split keyboard halves. Each half reads
//! its role from a strap pin at boot. The target serves transactions from
//! an executor of its own on core 1; the initiator drives them from an
//! Embassy task on core 0, next to the key scan.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{Executor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Uart};
use embassy_time::Timer;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use splitlink_core::{Initiator, Role, Target};
use splitlink_hal_rp2040::{uart_config, IoSerial, UptimeClock};

use crate::channels::LINK_STATUS;
use crate::config::{parse_config, FirmwareConfig};
use crate::transactions::LinkRegistry;

mod channels;
mod config;
mod state;
mod tasks;
mod transactions;
mod wpm;

/// Embedded link configuration (compiled into firmware)
/// Edit split.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../split.toml");

/// Core 1 stack for the target executor
const CORE1_STACK_SIZE: usize = 4096;

/// Indicator refresh period on the target (ms)
const INDICATOR_INTERVAL_MS: u64 = 50;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

static REGISTRY: StaticCell<LinkRegistry> = StaticCell::new();
static CORE1_STACK: StaticCell<Stack<CORE1_STACK_SIZE>> = StaticCell::new();
static CORE1_EXECUTOR: StaticCell<Executor> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Splitlink firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = load_config();

    // Pull towards the target level so an unstrapped half never initiates
    let pull = if config.initiator_level {
        Pull::Down
    } else {
        Pull::Up
    };
    let mut strap = Input::new(p.PIN_2, pull);
    let role = Role::from_pin(&mut strap, config.initiator_level);
    info!("Role: {}", role);

    // Setup UART for the link (Pro Micro RP2040 footprint: GPIO0 TX, GPIO1 RX)
    let uart_config = unwrap!(uart_config(&config.link.serial));
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let port = IoSerial::new(uart);

    info!(
        "Link on UART0 at {} baud, {}",
        config.link.serial.speed.baudrate(),
        config.link.duplex()
    );

    let registry = REGISTRY.init(unwrap!(transactions::registry()));

    match role {
        Role::Target => {
            let target = Target::new(port, &config.link);
            spawn_core1(p.CORE1, CORE1_STACK.init(Stack::new()), move || {
                let executor = CORE1_EXECUTOR.init(Executor::new());
                executor.run(|spawner| {
                    spawner
                        .spawn(tasks::target_task(target, registry))
                        .unwrap()
                })
            });
            info!("Target executor started on core 1");

            // Show the initiator's layer and caps lock state
            let mut indicator = Output::new(p.PIN_25, Level::Low);
            loop {
                Timer::after_millis(INDICATOR_INTERVAL_MS).await;
                let peer = state::peer();
                if peer.indicator() {
                    indicator.set_high();
                } else {
                    indicator.set_low();
                }
                trace!("Peer state {}, max WPM {}", peer, state::peer_max_wpm());
            }
        }
        Role::Initiator => {
            let keys: [Input<'static>; tasks::NUM_KEYS] = [
                Input::new(p.PIN_3, Pull::Up),
                Input::new(p.PIN_4, Pull::Up),
                Input::new(p.PIN_5, Pull::Up),
                Input::new(p.PIN_6, Pull::Up),
                Input::new(p.PIN_7, Pull::Up),
                Input::new(p.PIN_8, Pull::Up),
                Input::new(p.PIN_9, Pull::Up),
            ];
            spawner.spawn(tasks::keys_task(keys)).unwrap();

            let initiator = Initiator::new(port, UptimeClock, &config.link);
            spawner
                .spawn(tasks::housekeeping_task(initiator, registry))
                .unwrap();
            info!("Housekeeping task spawned");

            loop {
                let status = LINK_STATUS.wait().await;
                if status.connected {
                    info!("Target connected, stats {}", status.stats);
                } else {
                    warn!(
                        "Target disconnected, last heartbeat {}, stats {}",
                        status.peer_heartbeat, status.stats
                    );
                }
            }
        }
    }
}

/// Parse the embedded split.toml
///
/// Falls back to defaults if the embedded configuration is broken, which
/// build.rs should have caught.
fn load_config() -> FirmwareConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            error!("Using default link configuration");
            FirmwareConfig::default()
        }
    }
}
