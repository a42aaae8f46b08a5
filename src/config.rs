//! # Runtime configuration.
//!
//! Provides [`ProviderConfig`], the settings for the provider's broadcast bus.
//! Plugin configurations live next to their plugins
//! ([`RouterConfig`](crate::RouterConfig), [`BasicTaskConfig`](crate::BasicTaskConfig)).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → synchronous hand-off: relaying an event waits until
//!   every subscriber has received it.

use serde::Deserialize;

/// Configuration for the [`Provider`](crate::Provider).
///
/// ## Field semantics
/// - `bus_capacity`: buffer size of each subscriber channel created by
///   [`Provider::subscribe`](crate::Provider::subscribe). A full subscriber is
///   skipped rather than waited for.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Capacity of each broadcast subscriber channel (`0` = synchronous hand-off).
    pub bus_capacity: usize,
}

impl ProviderConfig {
    /// Returns `true` when subscribers use synchronous hand-off.
    #[inline]
    pub fn is_synchronous(&self) -> bool {
        self.bus_capacity == 0
    }
}

impl Default for ProviderConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self { bus_capacity: 1024 }
    }
}
