//! Hub configuration

use crate::registry::config::DEFAULT_OUTBOUND_CAPACITY;

/// Whether an accepted message is echoed back to its sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SenderPolicy {
    /// Deliver to every peer except the sender
    #[default]
    Exclude,
    /// Deliver to every peer including the sender
    Include,
}

/// Configuration for [`Hub`](super::Hub)
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Outbound queue depth per connection
    pub outbound_capacity: usize,

    /// Echo policy for the sending connection
    pub sender_policy: SenderPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            sender_policy: SenderPolicy::Exclude,
        }
    }
}

impl HubConfig {
    /// Set the per-connection outbound queue depth (minimum 1)
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Set the sender echo policy
    pub fn sender_policy(mut self, policy: SenderPolicy) -> Self {
        self.sender_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.outbound_capacity, DEFAULT_OUTBOUND_CAPACITY);
        assert_eq!(config.sender_policy, SenderPolicy::Exclude);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .outbound_capacity(8)
            .sender_policy(SenderPolicy::Include);

        assert_eq!(config.outbound_capacity, 8);
        assert_eq!(config.sender_policy, SenderPolicy::Include);
    }

    #[test]
    fn test_builder_capacity_floor() {
        assert_eq!(HubConfig::default().outbound_capacity(0).outbound_capacity, 1);
    }
}
