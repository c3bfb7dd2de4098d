//! Arbiter configuration.
//!
//! Holds the static parameters of the arbiter: the number of competing
//! clients, the weight bit width, and the per-client weight table. All
//! parameters are validated once at construction; the weight table may be
//! replaced between cycles via [`ArbiterConfig::set_weights`], never
//! mid-cycle.
//!
//! A client's weight is the number of *extra* cycles it may hold the bus
//! after its granting cycle, so a weight of 0 means one cycle per turn.

use thiserror::Error;

use crate::arbiter::{ClientId, MAX_CLIENTS, MAX_WEIGHT_WIDTH};

/// Errors raised for malformed static configuration.
///
/// These are the only recoverable errors in the crate: once a
/// configuration is accepted, the per-cycle transition is total.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// At least one client is required.
    #[error("arbiter needs at least one client")]
    NoClients,

    /// More clients than the request/grant vectors can carry.
    #[error("{0} clients exceeds the maximum of {MAX_CLIENTS}")]
    TooManyClients(usize),

    /// The weight width must be at least one bit.
    #[error("weight width must be at least 1 bit")]
    ZeroWeightWidth,

    /// The weight width exceeds the credit register width.
    #[error("weight width {0} exceeds the maximum of {MAX_WEIGHT_WIDTH} bits")]
    WeightWidthTooWide(u32),

    /// The weight table must have one entry per client.
    #[error("weight table has {got} entries, expected {expected}")]
    WeightTableLength { got: usize, expected: usize },

    /// A weight value does not fit in the configured bit width.
    #[error("weight {weight} for client {client} exceeds the {width}-bit maximum of {max}")]
    WeightOutOfRange {
        client: ClientId,
        weight: u32,
        width: u32,
        max: u32,
    },
}

/// Static arbiter configuration.
///
/// Immutable within a cycle. The weight table is read by the grant state
/// machine when a fresh grant is issued; it is never consulted while an
/// owner retains the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterConfig {
    /// Number of competing clients, in `[1, MAX_CLIENTS]`.
    num_clients: usize,
    /// Weight bit width, in `[1, MAX_WEIGHT_WIDTH]`.
    weight_width: u32,
    /// Per-client weights, each in `[0, 2^weight_width - 1]`.
    weights: Vec<u32>,
}

impl ArbiterConfig {
    /// Create a validated configuration.
    pub fn new(
        num_clients: usize,
        weight_width: u32,
        weights: Vec<u32>,
    ) -> Result<Self, ConfigError> {
        if num_clients < 1 {
            return Err(ConfigError::NoClients);
        }
        if num_clients > MAX_CLIENTS {
            return Err(ConfigError::TooManyClients(num_clients));
        }
        if weight_width < 1 {
            return Err(ConfigError::ZeroWeightWidth);
        }
        if weight_width > MAX_WEIGHT_WIDTH {
            return Err(ConfigError::WeightWidthTooWide(weight_width));
        }

        let mut config = Self {
            num_clients,
            weight_width,
            weights: Vec::new(),
        };
        config.set_weights(weights)?;
        Ok(config)
    }

    /// Create a configuration where every client has the same weight.
    pub fn uniform(
        num_clients: usize,
        weight_width: u32,
        weight: u32,
    ) -> Result<Self, ConfigError> {
        Self::new(num_clients, weight_width, vec![weight; num_clients])
    }

    /// Replace the weight table.
    ///
    /// Validated under the same rules as construction. Only call between
    /// cycles; the table must be stable during a step.
    pub fn set_weights(&mut self, weights: Vec<u32>) -> Result<(), ConfigError> {
        if weights.len() != self.num_clients {
            return Err(ConfigError::WeightTableLength {
                got: weights.len(),
                expected: self.num_clients,
            });
        }

        let max = self.max_weight();
        for (client, &weight) in weights.iter().enumerate() {
            if weight > max {
                return Err(ConfigError::WeightOutOfRange {
                    client: client as ClientId,
                    weight,
                    width: self.weight_width,
                    max,
                });
            }
        }

        self.weights = weights;
        Ok(())
    }

    /// Weight configured for a client.
    ///
    /// Panics if `client` is out of range; passing an invalid index is a
    /// caller contract violation.
    #[inline]
    pub fn weight_of(&self, client: ClientId) -> u32 {
        self.weights[client as usize]
    }

    /// Largest weight representable in the configured bit width.
    #[inline]
    pub fn max_weight(&self) -> u32 {
        (((1u64) << self.weight_width) - 1) as u32
    }

    /// Number of clients.
    #[inline]
    pub fn num_clients(&self) -> usize {
        self.num_clients
    }

    /// Weight bit width.
    #[inline]
    pub fn weight_width(&self) -> u32 {
        self.weight_width
    }

    /// Mask with one bit set per valid client index.
    #[inline]
    pub fn client_mask(&self) -> u64 {
        if self.num_clients == MAX_CLIENTS {
            u64::MAX
        } else {
            (1u64 << self.num_clients) - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ArbiterConfig::new(4, 4, vec![1, 3, 0, 0]).unwrap();
        assert_eq!(config.num_clients(), 4);
        assert_eq!(config.weight_width(), 4);
        assert_eq!(config.max_weight(), 15);
        assert_eq!(config.weight_of(1), 3);
        assert_eq!(config.client_mask(), 0xF);
    }

    #[test]
    fn test_rejects_zero_clients() {
        assert_eq!(
            ArbiterConfig::new(0, 4, vec![]),
            Err(ConfigError::NoClients)
        );
    }

    #[test]
    fn test_rejects_too_many_clients() {
        assert_eq!(
            ArbiterConfig::new(65, 4, vec![0; 65]),
            Err(ConfigError::TooManyClients(65))
        );
    }

    #[test]
    fn test_rejects_zero_weight_width() {
        assert_eq!(
            ArbiterConfig::new(4, 0, vec![0; 4]),
            Err(ConfigError::ZeroWeightWidth)
        );
    }

    #[test]
    fn test_rejects_wide_weight_width() {
        assert_eq!(
            ArbiterConfig::new(4, 33, vec![0; 4]),
            Err(ConfigError::WeightWidthTooWide(33))
        );
    }

    #[test]
    fn test_rejects_short_weight_table() {
        assert_eq!(
            ArbiterConfig::new(4, 4, vec![0; 3]),
            Err(ConfigError::WeightTableLength { got: 3, expected: 4 })
        );
    }

    #[test]
    fn test_rejects_oversized_weight() {
        assert_eq!(
            ArbiterConfig::new(2, 4, vec![0, 16]),
            Err(ConfigError::WeightOutOfRange {
                client: 1,
                weight: 16,
                width: 4,
                max: 15,
            })
        );
    }

    #[test]
    fn test_set_weights_between_cycles() {
        let mut config = ArbiterConfig::uniform(4, 4, 0).unwrap();
        config.set_weights(vec![15, 0, 7, 1]).unwrap();
        assert_eq!(config.weight_of(0), 15);
        assert_eq!(config.weight_of(2), 7);

        // Re-validation still applies.
        assert!(config.set_weights(vec![16, 0, 0, 0]).is_err());
        assert_eq!(config.weight_of(0), 15);
    }

    #[test]
    fn test_max_clients_mask() {
        let config = ArbiterConfig::uniform(64, 1, 0).unwrap();
        assert_eq!(config.client_mask(), u64::MAX);
    }

    #[test]
    fn test_full_width_weight() {
        let config = ArbiterConfig::uniform(1, 32, u32::MAX).unwrap();
        assert_eq!(config.max_weight(), u32::MAX);
        assert_eq!(config.weight_of(0), u32::MAX);
    }
}
