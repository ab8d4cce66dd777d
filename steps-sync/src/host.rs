//! Host environment probes.

use std::sync::atomic::{AtomicBool, Ordering};

/// What the platform tells us about connectivity and app visibility.
pub trait HostEnvironment: Send + Sync {
    fn is_network_available(&self) -> bool;

    fn is_in_foreground(&self) -> bool;
}

/// [`HostEnvironment`] backed by flags the host flips from its callbacks.
#[derive(Debug)]
pub struct HostFlags {
    network: AtomicBool,
    foreground: AtomicBool,
}

impl HostFlags {
    pub fn new(network: bool, foreground: bool) -> Self {
        Self {
            network: AtomicBool::new(network),
            foreground: AtomicBool::new(foreground),
        }
    }

    pub fn set_network_available(&self, available: bool) {
        self.network.store(available, Ordering::Release);
    }

    pub fn set_in_foreground(&self, foreground: bool) {
        self.foreground.store(foreground, Ordering::Release);
    }
}

impl Default for HostFlags {
    /// Online and in foreground.
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl HostEnvironment for HostFlags {
    fn is_network_available(&self) -> bool {
        self.network.load(Ordering::Acquire)
    }

    fn is_in_foreground(&self) -> bool {
        self.foreground.load(Ordering::Acquire)
    }
}
