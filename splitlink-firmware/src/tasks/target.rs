//! Target task
//!
//! Serves the initiator from core 1's own executor. While no byte is due
//! the task is parked on the UART waker, and core 1 sleeps.

use embassy_rp::uart::BufferedUart;
use splitlink_core::Target;
use splitlink_hal_rp2040::IoSerial;

use crate::transactions::LinkRegistry;

pub type LinkTarget = Target<IoSerial<BufferedUart>>;

#[embassy_executor::task]
pub async fn target_task(mut target: LinkTarget, registry: &'static mut LinkRegistry) {
    target.run(registry).await
}
