//! Connection poll loop implementation

use crate::controller::AppController;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep, so `stop()` is noticed quickly
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Calls [`AppController::update`] periodically on a background thread
pub struct ConnectionMonitor {
    controller: Arc<AppController>,
    /// Fixed interval; `None` follows the poll interval preference
    interval: Option<Duration>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionMonitor {
    /// Monitor polling at the interval from the user preferences
    ///
    /// The preference is re-read every tick, so changes apply without a restart.
    pub fn new(controller: Arc<AppController>) -> Self {
        Self {
            controller,
            interval: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Monitor polling at a fixed interval
    pub fn with_interval(controller: Arc<AppController>, interval: Duration) -> Self {
        Self {
            interval: Some(interval),
            ..Self::new(controller)
        }
    }

    /// Interval used for the next sleep
    pub fn interval(&self) -> Duration {
        self.interval
            .unwrap_or_else(|| self.controller.service().preferences().poll_interval())
    }

    /// Start the monitoring thread
    pub fn start(&self) -> JoinHandle<()> {
        use tracing::info;

        let monitor = Self {
            controller: Arc::clone(&self.controller),
            interval: self.interval,
            shutdown: Arc::clone(&self.shutdown),
        };

        thread::spawn(move || {
            info!("Connection monitor started");
            while !monitor.is_stopped() {
                monitor.controller.update();
                monitor.sleep(monitor.interval());
            }
            info!("Connection monitor stopped");
        })
    }

    /// Ask the thread to exit after the current tick
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn sleep(&self, interval: Duration) {
        let deadline = Instant::now() + interval;
        loop {
            let now = Instant::now();
            if now >= deadline || self.is_stopped() {
                return;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
