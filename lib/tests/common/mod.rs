// SPDX-FileCopyrightText: 2023 Kent Gibson <warthog618@gmail.com>
//
// SPDX-License-Identifier: Apache-2.0 OR MIT

use gpiowatch::{Backend, Gpio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

// max time a wait loop blocks before checking if it should stop
pub const POLL_PERIOD: Duration = Duration::from_millis(5);

// max time to allow events to propagate from the sim to the handlers
const PROPAGATION_DELAY: Duration = Duration::from_millis(30);

pub fn wait_propagation_delay() {
    std::thread::sleep(PROPAGATION_DELAY);
}

/// Dispatches events from a background thread until stopped.
pub struct EventLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventLoop {
    pub fn spawn<B>(gpio: &Gpio<B>) -> EventLoop
    where
        B: Backend + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let gpio = gpio.clone();
        let flag = stop.clone();
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::Acquire) {
                gpio.wait(Some(POLL_PERIOD)).expect("wait should succeed");
            }
        });
        EventLoop {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().expect("event loop should not panic");
        }
    }
}
