//! Registry configuration

/// Default per-connection outbound queue depth
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Configuration for [`ClientRegistry`](super::ClientRegistry)
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Frames a peer may have pending before it is considered unresponsive
    pub outbound_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl RegistryConfig {
    /// Set the outbound queue depth (minimum 1)
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }
}
