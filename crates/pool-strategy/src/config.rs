//! Declarative strategy chains.
//!
//! ```
//! use nebula_pool_strategy::config::ChainConfig;
//!
//! let config: ChainConfig = serde_json::from_str(r#"{
//!     "layers": [
//!         { "strategy": "retry", "attempts": 3 },
//!         { "strategy": "grow_on_timeout", "max_overflow_pool_size": 20 }
//!     ]
//! }"#).unwrap();
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapter::PoolAdapter;
use crate::context::StrategyContext;
use crate::error::{Error, Result};
use crate::strategy::{BoxedStrategy, GrowOnTimeoutStrategy, PoolStrategy, RetryStrategy};

/// One layer of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum StrategyConfig {
    /// [`RetryStrategy`] with the given number of attempts.
    Retry {
        /// Inner attempts per acquire call
        attempts: u32,
    },
    /// [`GrowOnTimeoutStrategy`] with the given capacity ceiling.
    GrowOnTimeout {
        /// Capacity the pool may grow to
        max_overflow_pool_size: usize,
    },
}

/// Layers of a chain, innermost first.
///
/// Each layer wraps everything listed before it; the first layer wraps the
/// pool adapter itself. No layers means callers hit the adapter directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Strategy layers, innermost first
    #[serde(default)]
    pub layers: Vec<StrategyConfig>,
}

impl ChainConfig {
    /// Empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer outside the current ones.
    #[must_use]
    pub fn layer(mut self, layer: StrategyConfig) -> Self {
        self.layers.push(layer);
        self
    }

    /// Reject values no strategy can be built from.
    ///
    /// Ceilings are also checked against the live pool capacity in
    /// [`build`](Self::build).
    pub fn validate(&self) -> Result<()> {
        for (index, layer) in self.layers.iter().enumerate() {
            match *layer {
                StrategyConfig::Retry { attempts: 0 } => {
                    return Err(Error::invalid_configuration(format!(
                        "layer {index}: retry attempts must be greater than 0"
                    )));
                }
                StrategyConfig::GrowOnTimeout {
                    max_overflow_pool_size: 0,
                } => {
                    return Err(Error::invalid_configuration(format!(
                        "layer {index}: max_overflow_pool_size must be greater than 0"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Assemble the chain over `context`'s pool adapter.
    pub fn build<P>(&self, context: &StrategyContext<P>) -> Result<BoxedStrategy<P::Connection>>
    where
        P: PoolAdapter + 'static,
        P::Connection: 'static,
    {
        self.validate()?;

        let mut chain: BoxedStrategy<P::Connection> = Box::new(PoolStrategy::new(context));
        for layer in &self.layers {
            debug!(?layer, "wrapping strategy chain");
            let wrapped: BoxedStrategy<P::Connection> = match *layer {
                StrategyConfig::Retry { attempts } => {
                    Box::new(RetryStrategy::with_inner(context, chain, attempts)?)
                }
                StrategyConfig::GrowOnTimeout {
                    max_overflow_pool_size,
                } => Box::new(GrowOnTimeoutStrategy::with_inner(
                    context,
                    chain,
                    max_overflow_pool_size,
                )?),
            };
            chain = wrapped;
        }
        Ok(chain)
    }
}
