//! Request cadence.
//!
//! The inter-page delay is a deliberate throughput ceiling: with the default
//! 1-3s jitter a 20-post page takes at least a second, so large sites harvest
//! slowly. Shortening it makes rate limiting much more likely.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::PacingConfig;
use crate::contract::{Pacer, Pause};

/// Sleeps on the tokio timer. Pauses are not cancellable once started.
pub struct TokioPacer {
    config: PacingConfig,
}

impl TokioPacer {
    pub fn new(config: PacingConfig) -> Self {
        Self { config }
    }

    /// Duration for `pause`, drawing fresh jitter for inter-page delays.
    pub fn duration_for(&self, pause: Pause) -> Duration {
        match pause {
            Pause::BetweenPages => {
                jitter_between(self.config.min_delay_ms, self.config.max_delay_ms, random_unit())
            }
            Pause::BlockedCooldown => Duration::from_millis(self.config.blocked_cooldown_ms),
            Pause::NetworkBackoff => Duration::from_millis(self.config.network_backoff_ms),
        }
    }
}

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, pause: Pause) {
        let duration = self.duration_for(pause);
        debug!(?pause, millis = duration.as_millis() as u64, "Pausing");
        tokio::time::sleep(duration).await;
    }
}

/// Uniform value in `[0, 1)` from a v4 UUID. The low 62 bits are all random;
/// the version and variant bits sit above them.
fn random_unit() -> f64 {
    const MANTISSA: u64 = (1u64 << 53) - 1;
    let bits = (uuid::Uuid::new_v4().as_u128() as u64) & MANTISSA;
    bits as f64 / (1u64 << 53) as f64
}

/// Map `unit` in `[0, 1)` onto `[min_ms, max_ms]`. Bounds given in the wrong
/// order are swapped.
pub fn jitter_between(min_ms: u64, max_ms: u64, unit: f64) -> Duration {
    let (lo, hi) = if min_ms <= max_ms {
        (min_ms, max_ms)
    } else {
        (max_ms, min_ms)
    };
    let span = (hi - lo) as f64;
    let offset = (span * unit.clamp(0.0, 1.0)).round() as u64;
    Duration::from_millis(lo + offset.min(hi - lo))
}
