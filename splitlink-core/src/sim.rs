//! Host simulation of the split link
//!
//! [`wire_pair`] returns the two ends of an in-memory serial line. Each end
//! is a [`SerialPort`] with real wall-clock timeouts, so an initiator and a
//! target can run on separate threads exactly as they run on separate cores
//! of the keyboard. On a half-duplex wire every byte written is also
//! received by its writer.
//!
//! The port futures block their thread on a condition variable instead of
//! registering a waker; drive each end with its own `block_on`.

use core::convert::Infallible;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use splitlink_hal::{Clock, Duplex, InputQueue, SerialPort};

/// Receive buffer per end, bytes
pub const WIRE_CAPACITY: usize = 256;

type Queues = [InputQueue<WIRE_CAPACITY>; 2];

struct Wire {
    duplex: Duplex,
    queues: Mutex<Queues>,
    ready: Condvar,
}

impl Wire {
    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One end of a simulated wire
pub struct SimPort {
    wire: Arc<Wire>,
    side: usize,
}

/// Create a connected pair of ports
pub fn wire_pair(duplex: Duplex) -> (SimPort, SimPort) {
    let wire = Arc::new(Wire {
        duplex,
        queues: Mutex::new([InputQueue::new(), InputQueue::new()]),
        ready: Condvar::new(),
    });

    (
        SimPort {
            wire: wire.clone(),
            side: 0,
        },
        SimPort { wire, side: 1 },
    )
}

impl SimPort {
    /// Bytes waiting on this end
    pub fn pending(&self) -> usize {
        self.wire.lock()[self.side].len()
    }

    /// Bytes dropped because this end's receive buffer was full
    pub fn overruns(&self) -> u32 {
        self.wire.lock()[self.side].overruns()
    }

    /// Consume up to `want` bytes with `step` until done or out of time
    fn consume<F>(&self, want: usize, timeout_ms: u32, mut step: F) -> usize
    where
        F: FnMut(&mut InputQueue<WIRE_CAPACITY>, usize) -> usize,
    {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut queues = self.wire.lock();
        let mut done = 0;

        loop {
            done += step(&mut queues[self.side], done);
            if done >= want {
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            queues = self
                .wire
                .ready
                .wait_timeout(queues, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        done
    }
}

impl SerialPort for SimPort {
    type Error = Infallible;

    async fn write_timeout(&mut self, data: &[u8], _timeout_ms: u32) -> Result<usize, Infallible> {
        let mut queues = self.wire.lock();
        for &byte in data {
            queues[1 - self.side].push(byte);
            if self.wire.duplex == Duplex::Half {
                queues[self.side].push(byte);
            }
        }
        drop(queues);

        self.wire.ready.notify_all();
        Ok(data.len())
    }

    async fn read_timeout(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Infallible> {
        let want = buf.len();
        Ok(self.consume(want, timeout_ms, |queue, done| queue.read(&mut buf[done..])))
    }

    async fn skip_timeout(&mut self, n: usize, timeout_ms: u32) -> Result<usize, Infallible> {
        Ok(self.consume(n, timeout_ms, |queue, done| queue.skip(n - done)))
    }

    async fn clear_input(&mut self) {
        self.wire.lock()[self.side].reset();
    }
}

/// Wall clock counting from its creation
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        // Truncation wraps like the hardware counter
        self.start.elapsed().as_millis() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkConfig;
    use crate::initiator::{Initiator, Phase, TransactionError};
    use crate::registry::{Registry, TransactionHandler};
    use crate::target::Target;
    use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use embassy_futures::block_on;
    use splitlink_protocol::TransactionStatus;
    use std::thread;

    const PING: u8 = 0;
    const SUM: u8 = 1;
    const NOTIFY: u8 = 2;
    const COUNTER: u8 = 3;

    /// Replies to SUM with the byte sum, counts every call
    #[derive(Default)]
    struct Adder {
        calls: AtomicUsize,
    }

    impl TransactionHandler for Adder {
        fn handle(&self, input: &[u8], output: &mut [u8]) {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            let sum = input.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
            if let Some(first) = output.first_mut() {
                *first = sum;
            }
            // COUNTER-shaped replies carry the call number
            if output.len() == 2 {
                output.copy_from_slice(&(n as u16).to_le_bytes());
            }
        }
    }

    fn config(duplex: Duplex) -> LinkConfig {
        let mut config = LinkConfig::default().with_duplex(duplex).with_timeout(20);
        config.idle_timeout_ms = 5;
        config
    }

    fn table<'a>(registry: &mut Registry<'a, 4, 32>, handler: Option<&'a Adder>) {
        registry.register(PING, 0, 0).unwrap();
        registry.register(SUM, 3, 1).unwrap();
        registry.register(NOTIFY, 4, 0).unwrap();
        registry.register(COUNTER, 0, 2).unwrap();
        if let Some(handler) = handler {
            for id in [SUM, NOTIFY, COUNTER] {
                registry.set_handler(id, handler).unwrap();
            }
        }
    }

    /// Stops the target thread even if the initiator side panics
    struct Stop<'a>(&'a AtomicBool);

    impl Drop for Stop<'_> {
        fn drop(&mut self) {
            self.0.store(true, Ordering::Release);
        }
    }

    /// Run `body` against a target serving on another thread
    fn with_target<F>(duplex: Duplex, adder: &Adder, body: F)
    where
        F: FnOnce(&mut Initiator<SimPort, StdClock>, &mut Registry<'static, 4, 32>),
    {
        let (near, far) = wire_pair(duplex);
        let stop = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                let mut registry = Registry::new();
                table(&mut registry, Some(adder));
                let mut target = Target::new(far, &config(duplex));
                while !stop.load(Ordering::Acquire) {
                    let _ = block_on(target.poll(&mut registry));
                }
            });

            let _stop = Stop(&stop);
            let mut registry = Registry::new();
            table(&mut registry, None);
            let mut initiator = Initiator::new(near, StdClock::new(), &config(duplex));
            body(&mut initiator, &mut registry);
        });
    }

    fn exchange_all(duplex: Duplex) {
        let adder = Adder::default();
        with_target(duplex, &adder, |init, registry| {
            assert_eq!(block_on(init.transaction(registry, PING)), Ok(()));
            assert!(init.is_connected());

            registry.initiator_buffer_mut(SUM).unwrap().copy_from_slice(&[1, 2, 3]);
            assert_eq!(block_on(init.transaction(registry, SUM)), Ok(()));
            assert_eq!(registry.target_buffer(SUM), Some(&[6][..]));

            assert_eq!(block_on(init.rpc_send(registry, NOTIFY, &[9, 9])), Ok(()));

            let mut counter = [0u8; 2];
            assert_eq!(block_on(init.rpc_exec(registry, COUNTER, &[], &mut counter)), Ok(2));
            assert_eq!(u16::from_le_bytes(counter), 2);

            assert_eq!(init.stats().completed, 4);
            assert_eq!(init.link().port().pending(), 0);
        });
        assert_eq!(adder.calls.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_full_duplex_exchange() {
        exchange_all(Duplex::Full);
    }

    #[test]
    fn test_half_duplex_exchange() {
        exchange_all(Duplex::Half);
    }

    #[test]
    fn test_many_transactions_stay_in_sync() {
        let adder = Adder::default();
        with_target(Duplex::Half, &adder, |init, registry| {
            for i in 0..50u8 {
                registry
                    .initiator_buffer_mut(SUM)
                    .unwrap()
                    .copy_from_slice(&[i, 1, 1]);
                assert_eq!(block_on(init.transaction(registry, SUM)), Ok(()));
                assert_eq!(registry.target_buffer(SUM), Some(&[i.wrapping_add(2)][..]));
            }
        });
    }

    #[test]
    fn test_silent_peer_is_bounded() {
        let (near, _far) = wire_pair(Duplex::Full);
        let mut registry = Registry::<4, 32>::new();
        table(&mut registry, None);
        let mut init = Initiator::new(near, StdClock::new(), &config(Duplex::Full));

        let start = Instant::now();
        assert_eq!(
            block_on(init.transaction(&mut registry, SUM)),
            Err(TransactionError::NoResponse(Phase::AwaitingHandshake))
        );
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_secs(1));

        // Retried straight away: throttled without waiting
        let start = Instant::now();
        assert_eq!(
            block_on(init.transaction(&mut registry, SUM)),
            Err(TransactionError::Throttled)
        );
        assert!(start.elapsed() < Duration::from_millis(20));
    }

    #[test]
    fn test_target_marks_status() {
        let (mut near, far) = wire_pair(Duplex::Full);
        let adder = Adder::default();
        let mut registry = Registry::<4, 32>::new();
        table(&mut registry, Some(&adder));
        let mut target = Target::new(far, &config(Duplex::Full));

        // Initiator side driven by hand: ID, then a truncated payload
        block_on(near.write_timeout(&[SUM, 1], 0)).unwrap();
        assert!(block_on(target.poll(&mut registry)).is_err());
        assert_eq!(registry.status(SUM), Some(TransactionStatus::DataError));
        assert_eq!(adder.calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_clear_input() {
        let (mut near, mut far) = wire_pair(Duplex::Full);
        block_on(near.write_timeout(&[1, 2, 3], 0)).unwrap();
        assert_eq!(far.pending(), 3);
        block_on(far.clear_input());
        assert_eq!(block_on(far.read_timeout(&mut [0u8; 1], 1)).unwrap(), 0);
    }

    #[test]
    fn test_half_duplex_echo() {
        let (mut near, far) = wire_pair(Duplex::Half);
        block_on(near.write_timeout(&[4, 5], 0)).unwrap();
        assert_eq!(near.pending(), 2);
        assert_eq!(far.pending(), 2);
        assert_eq!(block_on(near.skip_timeout(2, 1)).unwrap(), 2);
        assert_eq!(near.pending(), 0);
    }

    #[test]
    fn test_full_receive_buffer_counts_overruns() {
        let (mut near, far) = wire_pair(Duplex::Full);
        let burst = [0xAA; WIRE_CAPACITY + 4];
        assert_eq!(block_on(near.write_timeout(&burst, 0)).unwrap(), burst.len());
        assert_eq!(far.pending(), WIRE_CAPACITY);
        assert_eq!(far.overruns(), 4);
        assert_eq!(near.overruns(), 0);
    }
}
