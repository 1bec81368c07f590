//! Staged progress simulation.
//!
//! Walks the four stages in order, emitting one snapshot per step and
//! sleeping a fixed delay between steps. There is no error path and no
//! cancellation: a started run always walks every step.

use crate::model::{AppEvent, ProgressSnapshot, Stage, StreamData, STAGES};
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;

/// Steps per stage; step values run 0..=STEPS_PER_STAGE inclusive.
pub const STEPS_PER_STAGE: u32 = 10;

/// Samples per synthesized waveform array.
pub const WAVEFORM_SAMPLES: usize = 100;

/// Uniform jitter added to each waveform sample.
const WAVEFORM_JITTER: f64 = 0.25;

/// Overall percentage for a given stage/step position.
pub fn progress_percent(stage_index: usize, step: u32) -> u8 {
    let stage_fraction = stage_index as f64 / STAGES.len() as f64;
    let step_fraction = (step as f64 / STEPS_PER_STAGE as f64) / STAGES.len() as f64;
    ((stage_fraction + step_fraction) * 100.0).floor() as u8
}

/// Synthesize one waveform: a sine sweep with uniform jitter.
pub fn waveform(rng: &mut impl Rng) -> Vec<f64> {
    (0..WAVEFORM_SAMPLES)
        .map(|i| (i as f64 / 10.0).sin() + rng.gen_range(-WAVEFORM_JITTER..WAVEFORM_JITTER))
        .collect()
}

fn snapshot(stage: Stage, stage_index: usize, step: u32) -> ProgressSnapshot {
    let mut rng = rand::thread_rng();
    ProgressSnapshot {
        stage,
        progress: progress_percent(stage_index, step),
        stream_data: StreamData {
            signal: waveform(&mut rng),
            noise: waveform(&mut rng),
            confidence: waveform(&mut rng),
        },
    }
}

/// Drive all stages to completion, emitting snapshots to `event_tx`.
///
/// Sends are best-effort: the channel is unbounded, so a slow consumer never
/// stalls the step cadence, and a dropped receiver is ignored.
pub async fn run_stages(event_tx: &mpsc::UnboundedSender<AppEvent>, step_delay: Duration) {
    for (stage_index, stage) in STAGES.iter().enumerate() {
        for step in 0..=STEPS_PER_STAGE {
            let _ = event_tx.send(AppEvent::Progress(snapshot(*stage, stage_index, step)));
            tokio::time::sleep(step_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stage;

    #[test]
    fn percent_starts_at_zero_and_ends_at_hundred() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(STAGES.len() - 1, STEPS_PER_STAGE), 100);
    }

    #[test]
    fn percent_is_monotonic_across_the_whole_run() {
        let mut last = 0u8;
        for stage_index in 0..STAGES.len() {
            for step in 0..=STEPS_PER_STAGE {
                let p = progress_percent(stage_index, step);
                assert!(p >= last, "progress went backwards at {stage_index}/{step}");
                last = p;
            }
        }
    }

    #[test]
    fn waveform_shape_and_bounds() {
        let mut rng = rand::thread_rng();
        let w = waveform(&mut rng);
        assert_eq!(w.len(), WAVEFORM_SAMPLES);
        assert!(w.iter().all(|v| (-1.25..1.25).contains(v)));
    }

    #[tokio::test(start_paused = true)]
    async fn run_emits_44_snapshots_in_stage_order() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        run_stages(&tx, Duration::from_millis(150)).await;
        drop(tx);

        let mut snapshots = Vec::new();
        while let Some(ev) = rx.recv().await {
            if let crate::model::AppEvent::Progress(s) = ev {
                snapshots.push(s);
            }
        }
        assert_eq!(snapshots.len(), STAGES.len() * (STEPS_PER_STAGE as usize + 1));
        let first = snapshots.first().unwrap();
        assert_eq!(first.stage, Stage::Loading);
        assert_eq!(first.progress, 0);
        let last = snapshots.last().unwrap();
        assert_eq!(last.stage, Stage::Complete);
        assert_eq!(last.progress, 100);
        assert_eq!(last.stream_data.signal.len(), WAVEFORM_SAMPLES);
    }
}
