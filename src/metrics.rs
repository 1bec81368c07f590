use crate::model::{Candidate, Classification, ModelRun};

/// Aggregates shown on the dashboard summary cards.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardSummary {
    pub exoplanet_count: usize,
    pub false_positive_count: usize,
    pub avg_confidence: f64,
    pub model_accuracy: Option<f64>,
}

/// Compute the summary cards from the candidate set and the latest run.
pub fn dashboard_summary(candidates: &[Candidate], latest_run: Option<&ModelRun>) -> DashboardSummary {
    let exoplanet_count = candidates
        .iter()
        .filter(|c| c.classification == Classification::Exoplanet)
        .count();
    let avg_confidence = if candidates.is_empty() {
        0.0
    } else {
        candidates.iter().map(|c| c.confidence_score).sum::<f64>() / candidates.len() as f64
    };
    DashboardSummary {
        exoplanet_count,
        false_positive_count: candidates.len() - exoplanet_count,
        avg_confidence,
        model_accuracy: latest_run.and_then(|r| r.accuracy),
    }
}

/// Confidence threshold for the top-candidates table.
pub const HIGH_CONFIDENCE: f64 = 0.8;

/// Exoplanet-classified candidates at or above [`HIGH_CONFIDENCE`], sorted by
/// confidence descending, capped at `limit`.
pub fn top_candidates(candidates: &[Candidate], limit: usize) -> Vec<&Candidate> {
    let mut top: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            c.classification == Classification::Exoplanet && c.confidence_score >= HIGH_CONFIDENCE
        })
        .collect();
    top.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top.truncate(limit);
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OWNER_TAG;
    use std::collections::BTreeMap;

    fn candidate(name: &str, score: f64, classification: Classification) -> Candidate {
        Candidate {
            id: name.to_string(),
            dataset_id: "d1".into(),
            candidate_name: name.into(),
            confidence_score: score,
            classification,
            detection_method: "transit".into(),
            orbital_period: None,
            planet_radius: None,
            stellar_magnitude: None,
            features: BTreeMap::new(),
            detected_at: "2026-01-01T00:00:00Z".into(),
            user_id: OWNER_TAG.into(),
        }
    }

    #[test]
    fn summary_counts_and_averages() {
        let candidates = vec![
            candidate("a", 0.9, Classification::Exoplanet),
            candidate("b", 0.5, Classification::FalsePositive),
            candidate("c", 0.7, Classification::Exoplanet),
        ];
        let s = dashboard_summary(&candidates, None);
        assert_eq!(s.exoplanet_count, 2);
        assert_eq!(s.false_positive_count, 1);
        assert!((s.avg_confidence - 0.7).abs() < 1e-9);
        assert!(s.model_accuracy.is_none());
    }

    #[test]
    fn empty_candidate_set_has_zero_confidence() {
        let s = dashboard_summary(&[], None);
        assert_eq!(s.avg_confidence, 0.0);
        assert_eq!(s.exoplanet_count, 0);
    }

    #[test]
    fn top_candidates_filters_sorts_and_caps() {
        let candidates = vec![
            candidate("low", 0.70, Classification::Exoplanet),
            candidate("fp", 0.95, Classification::FalsePositive),
            candidate("mid", 0.85, Classification::Exoplanet),
            candidate("high", 0.99, Classification::Exoplanet),
            candidate("edge", 0.80, Classification::Exoplanet),
        ];
        let top = top_candidates(&candidates, 2);
        let names: Vec<&str> = top.iter().map(|c| c.candidate_name.as_str()).collect();
        assert_eq!(names, ["high", "mid"]);
    }
}
