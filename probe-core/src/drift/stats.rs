//! Pure statistics used by the drift channels (spec §4.8/§9): KS statistic,
//! Shannon entropy, PSI, cosine similarity, χ², Jaccard. No I/O, no
//! randomness — every function is a deterministic computation over its
//! inputs.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Entropy-delta divisor floor (spec §4.8.1).
pub const ENTROPY_DIVISOR_EPSILON: f64 = 1e-3;
/// PSI zero-bucket guard (spec §4.8.3).
pub const PSI_ZERO_GUARD: f64 = 1e-4;

/// Two-sample Kolmogorov-Smirnov statistic D ∈ [0, 1]: the maximum
/// difference between the two samples' empirical CDFs.
pub fn ks_statistic(sample_a: &[f64], sample_b: &[f64]) -> f64 {
    if sample_a.is_empty() || sample_b.is_empty() {
        return 0.0;
    }
    let n_a = sample_a.len() as f64;
    let n_b = sample_b.len() as f64;

    let mut thresholds: Vec<f64> = sample_a.iter().chain(sample_b.iter()).copied().collect();
    thresholds.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN sample"));
    thresholds.dedup();

    thresholds
        .into_iter()
        .map(|x| {
            let cdf_a = sample_a.iter().filter(|&&v| v <= x).count() as f64 / n_a;
            let cdf_b = sample_b.iter().filter(|&&v| v <= x).count() as f64 / n_b;
            (cdf_a - cdf_b).abs()
        })
        .fold(0.0, f64::max)
}

/// Shannon entropy (natural log) of one string's character histogram.
pub fn shannon_entropy(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let mut histogram: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *histogram.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    let total = total as f64;
    -histogram
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            p * p.ln()
        })
        .sum::<f64>()
}

/// Mean Shannon entropy across a set of responses.
pub fn mean_entropy<'a>(responses: impl IntoIterator<Item = &'a str>) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for response in responses {
        total += shannon_entropy(response);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Population Stability Index between two fraction distributions over the
/// same bucket keys. Zero fractions are replaced with `PSI_ZERO_GUARD`
/// before the log ratio (spec §4.8.3).
pub fn population_stability_index<K: Eq + Hash>(
    baseline_fractions: &HashMap<K, f64>,
    current_fractions: &HashMap<K, f64>,
) -> f64 {
    let keys: HashSet<&K> = baseline_fractions.keys().chain(current_fractions.keys()).collect();
    keys.into_iter()
        .map(|key| {
            let p = baseline_fractions.get(key).copied().unwrap_or(0.0).max(PSI_ZERO_GUARD);
            let q = current_fractions.get(key).copied().unwrap_or(0.0).max(PSI_ZERO_GUARD);
            (q - p) * (q / p).ln()
        })
        .sum()
}

/// Cosine similarity of two equal-length vectors; `0.0` if either has zero
/// magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Arithmetic-mean centroid of a set of equal-length vectors.
pub fn centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    let Some(dims) = vectors.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut sums = vec![0.0_f64; dims];
    for vector in vectors {
        for (sum, value) in sums.iter_mut().zip(vector) {
            *sum += *value as f64;
        }
    }
    let n = vectors.len() as f64;
    sums.into_iter().map(|sum| (sum / n) as f32).collect()
}

/// Sample variance of pairwise cosine similarities within one side.
pub fn pairwise_similarity_variance(vectors: &[Vec<f32>]) -> f64 {
    let mut similarities = Vec::new();
    for i in 0..vectors.len() {
        for j in (i + 1)..vectors.len() {
            similarities.push(cosine_similarity(&vectors[i], &vectors[j]));
        }
    }
    if similarities.len() < 2 {
        return 0.0;
    }
    let mean = similarities.iter().sum::<f64>() / similarities.len() as f64;
    similarities.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / similarities.len() as f64
}

/// χ² statistic between an observed histogram and a baseline-derived
/// expected histogram (baseline proportions scaled to the observed total),
/// normalized into `[0, 1]` as `min(1, χ² / (χ² + N))` (spec §4.8.5).
pub fn chi_square_normalized<K: Eq + Hash>(
    baseline_counts: &HashMap<K, u64>,
    current_counts: &HashMap<K, u64>,
) -> f64 {
    let baseline_total: f64 = baseline_counts.values().sum::<u64>() as f64;
    let current_total: f64 = current_counts.values().sum::<u64>() as f64;
    if baseline_total == 0.0 || current_total == 0.0 {
        return 0.0;
    }

    let keys: HashSet<&K> = baseline_counts.keys().chain(current_counts.keys()).collect();
    let epsilon = 1e-6;
    let chi_square: f64 = keys
        .into_iter()
        .map(|key| {
            let baseline_fraction = baseline_counts.get(key).copied().unwrap_or(0) as f64 / baseline_total;
            let expected = (baseline_fraction * current_total).max(epsilon);
            let observed = current_counts.get(key).copied().unwrap_or(0) as f64;
            (observed - expected).powi(2) / expected
        })
        .sum();

    chi_square / (chi_square + current_total)
}

/// Jaccard distance-complement: `|A ∩ B| / |A ∪ B|`. Two empty sets are
/// treated as identical (similarity `1.0`).
pub fn jaccard_similarity<T: Eq + Hash + Clone>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        1.0
    } else {
        intersection / union
    }
}
