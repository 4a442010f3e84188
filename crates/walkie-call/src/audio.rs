//! Volume metering for live audio streams.
//!
//! One [`AudioAnalysis`] per stream: a periodic task samples the stream's
//! frequency bins at display-refresh cadence, reduces them to a scalar
//! volume (mean magnitude across bins), and publishes it on a `watch`
//! sender. The task is cancelled by dropping the `AudioAnalysis`, which is
//! owned by the stream's session — no self-rescheduling, no flag checks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::media::SpectrumSource;

/// Sampling cadence, matching a 60 Hz display refresh.
pub const DISPLAY_REFRESH: Duration = Duration::from_millis(16);

/// A running volume meter bound to one stream.
pub struct AudioAnalysis {
    task: JoinHandle<()>,
}

impl AudioAnalysis {
    /// Start sampling `source`, publishing the volume on `volume_tx`.
    pub fn start(
        mut source: Box<dyn SpectrumSource>,
        cadence: Duration,
        volume_tx: Arc<watch::Sender<f32>>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut bins = vec![0u8; source.bin_count()];
            let mut tick = tokio::time::interval(cadence);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tick.tick().await;
                source.frequency_bins(&mut bins);
                let _ = volume_tx.send(mean_magnitude(&bins));
            }
        });
        Self { task }
    }

    /// Stop sampling. Dropping the analysis has the same effect.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for AudioAnalysis {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Scalar volume: mean magnitude across frequency bins.
pub(crate) fn mean_magnitude(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    bins.iter().map(|&b| b as f32).sum::<f32>() / bins.len() as f32
}
