//! Per-page anti-detection randomization
//!
//! Each page gets its own user agent and viewport drawn from the configured
//! pools, a short randomized pause before extraction and, in the browser, a
//! wandering mouse pointer.

use crate::config::{FetcherConfig, StealthConfig, Viewport};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::time::Duration;

pub(crate) const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36";
pub(crate) const FALLBACK_VIEWPORT: Viewport = Viewport::new(1920, 1080);

/// The browser identity presented for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthProfile {
    pub user_agent: String,
    pub viewport: Viewport,
}

impl StealthProfile {
    /// Draws a user agent and viewport from the pools
    pub fn sample(config: &StealthConfig) -> Self {
        let mut rng = thread_rng();
        Self {
            user_agent: config
                .user_agents
                .choose(&mut rng)
                .cloned()
                .unwrap_or_else(|| FALLBACK_USER_AGENT.to_string()),
            viewport: config
                .viewports
                .choose(&mut rng)
                .copied()
                .unwrap_or(FALLBACK_VIEWPORT),
        }
    }
}

/// Random pause between the configured bounds
pub fn human_delay(config: &FetcherConfig) -> Duration {
    if config.human_delay_max_ms == 0 {
        return Duration::ZERO;
    }
    let min = config.human_delay_min_ms.min(config.human_delay_max_ms);
    let ms = thread_rng().gen_range(min..=config.human_delay_max_ms);
    Duration::from_millis(ms)
}

/// Pointer moves stay inside this corner of the viewport
const MOUSE_AREA: f64 = 200.0;

/// A short randomized pointer path across the top-left of the viewport
///
/// Starts and ends at random points within [`MOUSE_AREA`] pixels of the
/// origin, clamped to the viewport, with slightly jittered steps between.
pub fn mouse_path(viewport: Viewport) -> Vec<(f64, f64)> {
    let mut rng = thread_rng();
    let max_x = MOUSE_AREA.min(f64::from(viewport.width)).max(1.0);
    let max_y = MOUSE_AREA.min(f64::from(viewport.height)).max(1.0);

    let from = (rng.gen_range(0.0..max_x), rng.gen_range(0.0..max_y));
    let to = (rng.gen_range(0.0..max_x), rng.gen_range(0.0..max_y));
    let steps: u32 = rng.gen_range(4..=10);

    (1..=steps)
        .map(|i| {
            let t = f64::from(i) / f64::from(steps);
            let jitter = if i == steps { 0.0 } else { rng.gen_range(-3.0..3.0) };
            (
                (from.0 + (to.0 - from.0) * t + jitter).clamp(0.0, max_x),
                (from.1 + (to.1 - from.1) * t + jitter).clamp(0.0, max_y),
            )
        })
        .collect()
}

/// Backoff before retry `attempt` (0-based): `base * 2^attempt + jitter(0..base)`
pub fn backoff(config: &FetcherConfig, attempt: u32) -> Duration {
    let base = config.backoff_base_ms;
    let exp = base.saturating_mul(1u64 << attempt.min(16));
    let jitter = if base > 0 {
        thread_rng().gen_range(0..base)
    } else {
        0
    };
    Duration::from_millis(exp.saturating_add(jitter))
}
