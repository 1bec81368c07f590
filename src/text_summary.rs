//! Text summary builder for CLI output.
//!
//! Formats a completed analysis into human-readable lines for text mode.

use crate::metrics;
use crate::model::{Candidate, Dataset, ModelRun};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn pct(v: Option<f64>) -> String {
    v.map(|x| format!("{:.1}%", x * 100.0))
        .unwrap_or_else(|| "N/A".into())
}

/// Build a text summary for one dataset's completed run.
pub(crate) fn build_text_summary(
    dataset: &Dataset,
    candidates: &[Candidate],
    run: &ModelRun,
) -> TextSummary {
    let mut lines = Vec::new();

    lines.push(format!(
        "Dataset: {} ({}, {} samples)",
        dataset.name, dataset.mission_source, dataset.total_samples
    ));
    lines.push(format!(
        "Model run {} ({}): {} predictions in {} ms",
        run.model_version, run.id, run.total_predictions, run.execution_time
    ));

    let summary = metrics::dashboard_summary(candidates, Some(run));
    lines.push(format!(
        "Candidates: {} exoplanets, {} false positives (avg confidence {:.1}%)",
        summary.exoplanet_count,
        summary.false_positive_count,
        summary.avg_confidence * 100.0
    ));
    lines.push(format!(
        "Scores: accuracy {} precision {} recall {} f1 {}",
        pct(run.accuracy),
        pct(run.precision_score),
        pct(run.recall_score),
        pct(run.f1_score)
    ));

    let top = metrics::top_candidates(candidates, 5);
    if !top.is_empty() {
        lines.push("Top candidates:".into());
        for c in top {
            let period = c
                .orbital_period
                .map(|p| format!("{p:.2} days"))
                .unwrap_or_else(|| "N/A".into());
            let radius = c
                .planet_radius
                .map(|r| format!("{r:.2} Re"))
                .unwrap_or_else(|| "N/A".into());
            lines.push(format!(
                "  {}  {:.1}%  period {}  radius {}  ({})",
                c.candidate_name,
                c.confidence_score * 100.0,
                period,
                radius,
                c.detection_method
            ));
        }
    }

    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generate;
    use crate::model::{now_rfc3339, OWNER_TAG};

    #[test]
    fn summary_covers_counts_and_scores() {
        let dataset = Dataset {
            id: "d1".into(),
            name: "Kepler Q1".into(),
            mission_source: "Kepler".into(),
            uploaded_at: now_rfc3339(),
            total_samples: 200,
            processed: true,
            user_id: OWNER_TAG.into(),
        };
        let outcome = generate::analysis_outcome(200);
        let candidates: Vec<Candidate> = outcome
            .candidates
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, draft)| Candidate {
                id: format!("c{i}"),
                dataset_id: dataset.id.clone(),
                candidate_name: draft.candidate_name,
                confidence_score: draft.confidence_score,
                classification: draft.classification,
                detection_method: draft.detection_method,
                orbital_period: draft.orbital_period,
                planet_radius: draft.planet_radius,
                stellar_magnitude: draft.stellar_magnitude,
                features: draft.features,
                detected_at: now_rfc3339(),
                user_id: OWNER_TAG.into(),
            })
            .collect();
        let m = &outcome.metrics;
        let run = ModelRun {
            id: "r1".into(),
            dataset_id: dataset.id.clone(),
            model_version: "v1.0".into(),
            accuracy: Some(m.accuracy),
            precision_score: Some(m.precision_score),
            recall_score: Some(m.recall_score),
            f1_score: Some(m.f1_score),
            total_predictions: m.total_predictions,
            exoplanet_count: m.exoplanet_count,
            false_positive_count: m.false_positive_count,
            execution_time: m.execution_time,
            started_at: now_rfc3339(),
            completed_at: Some(now_rfc3339()),
            user_id: OWNER_TAG.into(),
        };

        let summary = build_text_summary(&dataset, &candidates, &run);
        assert!(summary.lines[0].contains("Kepler Q1"));
        assert!(summary
            .lines
            .iter()
            .any(|l| l.contains("exoplanets") && l.contains("false positives")));
        assert!(summary.lines.iter().any(|l| l.starts_with("Scores:")));
    }
}
