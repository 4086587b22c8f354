use super::record::{AlbumAggregate, CategoricalSummary, ContinuousFeature, FeatureSummary};
use crate::models::{Mode, RawTrackFeature};

/// Collapses an album's per-track audio features into one summary
pub struct FeatureAggregator;

impl FeatureAggregator {
    /// Aggregate the resolved tracks of an album.
    ///
    /// `None` entries are tracks the catalog could not resolve; they are
    /// dropped before any statistic is computed and only counted in
    /// `unresolved_tracks`. Every ratio with a zero denominator is `None`.
    pub fn aggregate(tracks: &[Option<RawTrackFeature>]) -> AlbumAggregate {
        let present: Vec<&RawTrackFeature> = tracks.iter().flatten().collect();
        let total_duration_ms: u64 = present.iter().map(|t| t.duration_ms).sum();

        let continuous = ContinuousFeature::ALL
            .map(|feature| Self::summarize(&present, total_duration_ms, feature));

        AlbumAggregate {
            continuous,
            mode_0_fraction: Self::mode_fraction(&present, total_duration_ms, Mode::Minor),
            mode_1_fraction: Self::mode_fraction(&present, total_duration_ms, Mode::Major),
            key: Self::most_common(present.iter().map(|t| t.key), present.len()),
            time_signature: Self::most_common(
                present.iter().map(|t| t.time_signature),
                present.len(),
            ),
            total_duration_ms,
            track_count: present.len(),
            unresolved_tracks: tracks.len() - present.len(),
        }
    }

    fn summarize(
        tracks: &[&RawTrackFeature],
        total_duration_ms: u64,
        feature: ContinuousFeature,
    ) -> FeatureSummary {
        let weighted_sum: f64 = tracks
            .iter()
            .map(|t| feature.value(t) * t.duration_ms as f64)
            .sum();
        let weighted_mean = divide(weighted_sum, total_duration_ms as f64);

        // Spread is unweighted while the mean it is scaled by is duration-weighted
        let dispersion = weighted_mean.and_then(|mean| {
            let spread = population_std_dev(tracks.iter().map(|t| feature.value(t)))?;
            divide(spread, mean)
        });

        FeatureSummary {
            weighted_mean,
            dispersion,
        }
    }

    fn mode_fraction(
        tracks: &[&RawTrackFeature],
        total_duration_ms: u64,
        mode: Mode,
    ) -> Option<f64> {
        let in_mode: u64 = tracks
            .iter()
            .filter(|t| t.mode == mode)
            .map(|t| t.duration_ms)
            .sum();
        divide(in_mode as f64, total_duration_ms as f64)
    }

    /// Modal value by track count; ties go to the value seen first
    fn most_common(values: impl Iterator<Item = i32>, track_count: usize) -> CategoricalSummary {
        let mut tally: Vec<(i32, usize)> = Vec::new();
        for value in values {
            match tally.iter_mut().find(|entry| entry.0 == value) {
                Some(entry) => entry.1 += 1,
                None => tally.push((value, 1)),
            }
        }

        let mut best: Option<(i32, usize)> = None;
        for &(value, count) in &tally {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((value, count));
            }
        }

        match best {
            Some((value, count)) => CategoricalSummary {
                value: Some(value),
                share: divide(count as f64, track_count as f64),
            },
            None => CategoricalSummary::default(),
        }
    }
}

/// `None` instead of a non-finite quotient
fn divide(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 || denominator.is_nan() {
        None
    } else {
        Some(numerator / denominator)
    }
}

fn population_std_dev(values: impl Iterator<Item = f64>) -> Option<f64> {
    let values: Vec<f64> = values.collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}
