use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::homography::{
    homography_4pt, homography_least_squares, is_degenerate_sample, reprojection_error,
    Homography,
};
use crate::HomographyError;

/// Number of points in a minimal homography sample.
pub const SAMPLE_SIZE: usize = 4;

/// Number of trials drawn and scored together before the budget is re-evaluated.
const TRIAL_BATCH: usize = 32;

/// Parameters for robust homography estimation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Maximum Euclidean reprojection error (pixels) for a pair to count as an inlier.
    pub reprojection_threshold: f64,
    /// Desired probability that at least one drawn sample is outlier-free.
    pub confidence: f64,
    /// Hard cap on the number of trials.
    pub max_iterations: usize,
    /// Minimum number of inliers required to accept a model (never below 4).
    pub min_inliers: usize,
    /// Minimum fraction of correspondences that must be inliers.
    pub min_inlier_ratio: f64,
    /// Number of least-squares refit and rescore rounds on the inlier set.
    pub refine_iterations: usize,
    /// Optional RNG seed for deterministic runs.
    pub random_seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reprojection_threshold: 3.0,
            confidence: 0.995,
            max_iterations: 2000,
            min_inliers: 8,
            min_inlier_ratio: 0.0,
            refine_iterations: 1,
            random_seed: Some(0),
        }
    }
}

/// Result of a robust homography fit.
#[derive(Clone, Debug, PartialEq)]
pub struct HomographyResult {
    /// Estimated source to target transform.
    pub homography: Homography,
    /// Per-correspondence inlier mask.
    pub inliers: Vec<bool>,
    /// Total inlier count.
    pub inlier_count: usize,
    /// Sum of inlier reprojection errors (lower is better).
    pub score: f64,
    /// Number of RANSAC trials drawn.
    pub iterations: usize,
}

impl HomographyResult {
    /// Fraction of correspondences that are inliers.
    pub fn inlier_ratio(&self) -> f64 {
        if self.inliers.is_empty() {
            return 0.0;
        }
        self.inlier_count as f64 / self.inliers.len() as f64
    }
}

/// A scored hypothesis.
#[derive(Clone, Debug)]
struct Candidate {
    trial: usize,
    model: Homography,
    inliers: Vec<bool>,
    count: usize,
    score: f64,
}

impl Candidate {
    /// Total order used to pick the best model: more inliers, then lower summed error,
    /// then the earlier trial.
    fn is_better_than(&self, other: &Candidate) -> bool {
        match self.count.cmp(&other.count) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => match self.score.total_cmp(&other.score) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => self.trial < other.trial,
            },
        }
    }
}

/// Classify every correspondence against `model`.
///
/// # Returns
///
/// The inlier mask, the inlier count and the summed inlier error.
pub fn score_homography(
    model: &Homography,
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    threshold: f64,
) -> (Vec<bool>, usize, f64) {
    let mut inliers = vec![false; src.len()];
    let mut count = 0usize;
    let mut score = 0.0f64;
    for (i, (p, q)) in src.iter().zip(dst.iter()).enumerate() {
        let err = reprojection_error(model, p, q);
        if err <= threshold {
            inliers[i] = true;
            count += 1;
            score += err;
        }
    }
    (inliers, count, score)
}

/// Number of trials needed to draw an all-inlier sample with probability `confidence`.
///
/// Computes `ceil(log(1 - confidence) / log(1 - w^s))` for inlier ratio `w` and sample
/// size `s`, clamped to `[1, max_iterations]`.
pub fn required_iterations(
    inlier_ratio: f64,
    confidence: f64,
    sample_size: usize,
    max_iterations: usize,
) -> usize {
    let max_iterations = max_iterations.max(1);
    if inlier_ratio >= 1.0 {
        return 1;
    }
    if inlier_ratio <= 0.0 || !inlier_ratio.is_finite() {
        return max_iterations;
    }
    if confidence <= 0.0 {
        return 1;
    }

    let p_good = inlier_ratio.powi(sample_size as i32);
    let log_fail = (1.0 - p_good).ln();
    if !log_fail.is_finite() || log_fail >= 0.0 {
        return max_iterations;
    }
    let log_conf = (1.0 - confidence.min(1.0 - 1e-12)).ln();
    let est = (log_conf / log_fail).ceil();
    if !est.is_finite() || est >= max_iterations as f64 {
        return max_iterations;
    }
    (est as usize).max(1)
}

/// Estimate a homography robustly with RANSAC and least-squares refinement.
///
/// Trials are drawn sequentially from a seeded RNG in batches, scored in parallel, and
/// reduced with a total order (inlier count, summed inlier error, trial index), so the
/// result for a given seed does not depend on thread scheduling. Samples that are
/// degenerate or whose linear system is singular are discarded but still consume the
/// trial budget. The budget shrinks adaptively from the best inlier ratio seen so far.
///
/// After the loop the best model is re-solved in the least-squares sense over all its
/// inliers and the inlier set is recomputed.
///
/// # Arguments
///
/// * `src` - Source points `[x, y]`.
/// * `dst` - Target points `[x, y]`, index-aligned with `src`.
/// * `params` - Estimation parameters.
///
/// # Errors
///
/// - [`HomographyError::MismatchedLengths`] if the point lists differ in length.
/// - [`HomographyError::InsufficientCorrespondences`] with fewer than 4 pairs.
/// - [`HomographyError::DegenerateGeometry`] if no model reaches the minimum support.
pub fn find_homography(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    params: &RansacParams,
) -> Result<HomographyResult, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            source_len: src.len(),
            target_len: dst.len(),
        });
    }
    let n = src.len();
    if n < SAMPLE_SIZE {
        return Err(HomographyError::InsufficientCorrespondences {
            required: SAMPLE_SIZE,
            actual: n,
        });
    }

    let min_inliers = params
        .min_inliers
        .max(SAMPLE_SIZE)
        .max((params.min_inlier_ratio * n as f64).ceil() as usize);

    let mut rng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let mut tr = rand::rng();
            StdRng::from_rng(&mut tr)
        }
    };

    let max_iterations = params.max_iterations.max(1);
    let mut budget = max_iterations;
    let mut trial = 0usize;
    let mut best: Option<Candidate> = None;

    while trial < budget {
        let batch_len = (budget - trial).min(TRIAL_BATCH);
        let samples: Vec<[usize; SAMPLE_SIZE]> = (0..batch_len)
            .map(|_| {
                let idx = rand::seq::index::sample(&mut rng, n, SAMPLE_SIZE);
                [idx.index(0), idx.index(1), idx.index(2), idx.index(3)]
            })
            .collect();

        let batch_best = samples
            .par_iter()
            .enumerate()
            .filter_map(|(k, sample)| evaluate_sample(trial + k, sample, src, dst, params))
            .reduce_with(|a, b| if b.is_better_than(&a) { b } else { a });

        trial += batch_len;

        if let Some(candidate) = batch_best {
            if best.as_ref().map_or(true, |b| candidate.is_better_than(b)) {
                let w = candidate.count as f64 / n as f64;
                budget = required_iterations(w, params.confidence, SAMPLE_SIZE, max_iterations);
                log::debug!(
                    "ransac trial {}: {} inliers ({:.1}%), budget {}",
                    candidate.trial,
                    candidate.count,
                    100.0 * w,
                    budget
                );
                best = Some(candidate);
            }
        }
    }

    let Some(best) = best else {
        log::debug!("ransac found no valid model in {trial} trials");
        return Err(HomographyError::DegenerateGeometry {
            inliers: 0,
            required: min_inliers,
        });
    };

    if best.count < min_inliers {
        return Err(HomographyError::DegenerateGeometry {
            inliers: best.count,
            required: min_inliers,
        });
    }

    let refined = refine(best, src, dst, params);

    log::debug!(
        "ransac finished after {trial} trials with {}/{n} inliers",
        refined.count
    );

    Ok(HomographyResult {
        homography: refined.model,
        inliers: refined.inliers,
        inlier_count: refined.count,
        score: refined.score,
        iterations: trial,
    })
}

fn evaluate_sample(
    trial: usize,
    sample: &[usize; SAMPLE_SIZE],
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    params: &RansacParams,
) -> Option<Candidate> {
    let s1 = sample.map(|i| src[i]);
    let s2 = sample.map(|i| dst[i]);
    if is_degenerate_sample(&s1) || is_degenerate_sample(&s2) {
        log::trace!("ransac trial {trial}: degenerate sample {sample:?}");
        return None;
    }

    let model = match homography_4pt(&s1, &s2) {
        Ok(h) => h,
        Err(err) => {
            log::trace!("ransac trial {trial}: {err}");
            return None;
        }
    };

    let (inliers, count, score) =
        score_homography(&model, src, dst, params.reprojection_threshold);

    Some(Candidate {
        trial,
        model,
        inliers,
        count,
        score,
    })
}

/// Refit the model on its inliers until the inlier set stops changing.
///
/// A refit that loses support, or whose linear system fails, is discarded.
fn refine(
    mut best: Candidate,
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    params: &RansacParams,
) -> Candidate {
    for _ in 0..params.refine_iterations {
        let (s1, s2): (Vec<[f64; 2]>, Vec<[f64; 2]>) = best
            .inliers
            .iter()
            .enumerate()
            .filter(|(_, &inlier)| inlier)
            .map(|(i, _)| (src[i], dst[i]))
            .unzip();

        let model = match homography_least_squares(&s1, &s2) {
            Ok(h) => h,
            Err(err) => {
                log::warn!("homography refinement failed, keeping minimal model: {err}");
                break;
            }
        };

        let (inliers, count, score) =
            score_homography(&model, src, dst, params.reprojection_threshold);
        if count < best.count {
            log::warn!(
                "homography refinement lost support ({} -> {count}), keeping previous model",
                best.count
            );
            break;
        }

        let converged = inliers == best.inliers;
        best = Candidate {
            trial: best.trial,
            model,
            inliers,
            count,
            score,
        };
        if converged {
            break;
        }
    }
    best
}
