//! Pseudo-random candidate and metrics generation.
//!
//! All parameters here are arbitrary simulation knobs, not domain truths.
//! They are named constants so the ranges stay auditable, and their numeric
//! values must not drift: persisted records produced under these rules are
//! what the dashboard and tests expect.

use crate::model::{AnalysisOutcome, CandidateDraft, Classification, ModelMetrics};
use rand::Rng;
use std::collections::BTreeMap;

/// Fraction of total samples that become candidates.
pub const CANDIDATE_FRACTION: f64 = 0.1;

/// Hard cap on candidates per run regardless of dataset size.
pub const MAX_CANDIDATES: usize = 50;

/// Probability that a candidate is classified as an exoplanet.
pub const EXOPLANET_PROBABILITY: f64 = 0.7;

/// Candidate naming offset: candidates are `KOI-1000`, `KOI-1001`, ...
const CANDIDATE_NAME_BASE: u64 = 1000;

const DETECTION_METHOD: &str = "transit";

// Confidence ranges per classification; exoplanet scores skew high.
const CONFIDENCE_EXOPLANET: std::ops::Range<f64> = 0.65..1.0;
const CONFIDENCE_FALSE_POSITIVE: std::ops::Range<f64> = 0.30..0.70;

// Physical-parameter ranges for exoplanet-classified candidates.
const ORBITAL_PERIOD_DAYS: std::ops::Range<f64> = 1.0..501.0;
const PLANET_RADIUS: std::ops::Range<f64> = 0.5..15.5;
const STELLAR_MAGNITUDE: std::ops::Range<f64> = 10.0..18.0;

// Synthetic feature ranges attached to every candidate.
const TRANSIT_DEPTH: std::ops::Range<f64> = 0.0..0.05;
const TRANSIT_DURATION: std::ops::Range<f64> = 0.0..10.0;
const SIGNAL_TO_NOISE: std::ops::Range<f64> = 5.0..20.0;

// Aggregate score ranges. Sampled independently of the candidate set.
const ACCURACY: std::ops::Range<f64> = 0.92..0.98;
const PRECISION: std::ops::Range<f64> = 0.88..0.96;
const RECALL: std::ops::Range<f64> = 0.85..0.95;
const F1: std::ops::Range<f64> = 0.87..0.95;

// Reported execution time: base plus uniform integer jitter, in ms.
const EXECUTION_TIME_BASE_MS: u64 = 1500;
const EXECUTION_TIME_JITTER_MS: u64 = 1000;

/// Candidate count for a dataset of `total_samples` rows.
pub fn candidate_count(total_samples: u64) -> usize {
    ((total_samples as f64 * CANDIDATE_FRACTION).floor() as usize).min(MAX_CANDIDATES)
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn random_candidate(rng: &mut impl Rng, index: usize) -> CandidateDraft {
    let is_exoplanet = rng.gen_bool(EXOPLANET_PROBABILITY);
    let confidence = if is_exoplanet {
        rng.gen_range(CONFIDENCE_EXOPLANET)
    } else {
        rng.gen_range(CONFIDENCE_FALSE_POSITIVE)
    };

    let mut features = BTreeMap::new();
    features.insert("transit_depth".to_string(), rng.gen_range(TRANSIT_DEPTH));
    features.insert(
        "transit_duration".to_string(),
        rng.gen_range(TRANSIT_DURATION),
    );
    features.insert(
        "signal_to_noise".to_string(),
        rng.gen_range(SIGNAL_TO_NOISE),
    );

    CandidateDraft {
        candidate_name: format!("KOI-{}", CANDIDATE_NAME_BASE + index as u64),
        confidence_score: round4(confidence),
        classification: if is_exoplanet {
            Classification::Exoplanet
        } else {
            Classification::FalsePositive
        },
        detection_method: DETECTION_METHOD.to_string(),
        orbital_period: is_exoplanet.then(|| rng.gen_range(ORBITAL_PERIOD_DAYS)),
        planet_radius: is_exoplanet.then(|| rng.gen_range(PLANET_RADIUS)),
        stellar_magnitude: Some(rng.gen_range(STELLAR_MAGNITUDE)),
        features,
    }
}

/// Generate the full outcome of a completed run: the candidate set plus one
/// aggregate metrics record.
pub fn analysis_outcome(total_samples: u64) -> AnalysisOutcome {
    let mut rng = rand::thread_rng();
    let n = candidate_count(total_samples);

    let candidates: Vec<CandidateDraft> =
        (0..n).map(|i| random_candidate(&mut rng, i)).collect();

    let exoplanet_count = candidates
        .iter()
        .filter(|c| c.classification == Classification::Exoplanet)
        .count() as u64;
    let false_positive_count = candidates.len() as u64 - exoplanet_count;

    AnalysisOutcome {
        candidates,
        metrics: ModelMetrics {
            accuracy: rng.gen_range(ACCURACY),
            precision_score: rng.gen_range(PRECISION),
            recall_score: rng.gen_range(RECALL),
            f1_score: rng.gen_range(F1),
            total_predictions: n as u64,
            exoplanet_count,
            false_positive_count,
            execution_time: EXECUTION_TIME_BASE_MS
                + rng.gen_range(0..EXECUTION_TIME_JITTER_MS),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_count_scales_and_caps() {
        assert_eq!(candidate_count(10), 1);
        assert_eq!(candidate_count(99), 9);
        assert_eq!(candidate_count(500), 50);
        assert_eq!(candidate_count(1_000_000), MAX_CANDIDATES);
        assert_eq!(candidate_count(0), 0);
        for s in (10..10_000).step_by(37) {
            let n = candidate_count(s);
            assert_eq!(n, ((s as f64 * 0.1).floor() as usize).min(50));
            assert!(n <= MAX_CANDIDATES);
        }
    }

    #[test]
    fn classification_matches_orbital_fields() {
        let outcome = analysis_outcome(500);
        assert_eq!(outcome.candidates.len(), 50);
        for c in &outcome.candidates {
            match c.classification {
                Classification::Exoplanet => {
                    let period = c.orbital_period.expect("exoplanet without period");
                    let radius = c.planet_radius.expect("exoplanet without radius");
                    assert!((1.0..501.0).contains(&period));
                    assert!((0.5..15.5).contains(&radius));
                }
                Classification::FalsePositive => {
                    assert!(c.orbital_period.is_none());
                    assert!(c.planet_radius.is_none());
                }
            }
        }
    }

    #[test]
    fn confidence_is_bounded_and_rounded() {
        let outcome = analysis_outcome(400);
        for c in &outcome.candidates {
            assert!((0.0..=1.0).contains(&c.confidence_score));
            let scaled = c.confidence_score * 10_000.0;
            assert!(
                (scaled - scaled.round()).abs() < 1e-9,
                "confidence {} not rounded to 4 decimals",
                c.confidence_score
            );
        }
    }

    #[test]
    fn every_candidate_carries_the_feature_set() {
        let outcome = analysis_outcome(100);
        for c in &outcome.candidates {
            for key in ["transit_depth", "transit_duration", "signal_to_noise"] {
                assert!(c.features.contains_key(key), "missing feature {key}");
            }
            assert!(c.stellar_magnitude.is_some());
            assert_eq!(c.detection_method, "transit");
        }
    }

    #[test]
    fn metrics_tally_the_generated_set() {
        let outcome = analysis_outcome(300);
        let m = &outcome.metrics;
        assert_eq!(m.total_predictions, outcome.candidates.len() as u64);
        assert_eq!(m.exoplanet_count + m.false_positive_count, m.total_predictions);
        assert!((0.92..0.98).contains(&m.accuracy));
        assert!((0.88..0.96).contains(&m.precision_score));
        assert!((0.85..0.95).contains(&m.recall_score));
        assert!((0.87..0.95).contains(&m.f1_score));
        assert!((1500..2500).contains(&m.execution_time));
    }

    #[test]
    fn candidate_names_are_sequential() {
        let outcome = analysis_outcome(50);
        let names: Vec<&str> = outcome
            .candidates
            .iter()
            .map(|c| c.candidate_name.as_str())
            .collect();
        assert_eq!(names, ["KOI-1000", "KOI-1001", "KOI-1002", "KOI-1003", "KOI-1004"]);
    }
}
