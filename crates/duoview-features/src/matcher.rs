use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Descriptor, Feature};

/// Floor used by the absolute distance filter of [`MatchConfig::stitching`].
pub const DEFAULT_DISTANCE_FLOOR: u32 = 30;

/// A tentative correspondence between a source and a target feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Index into the source feature list.
    pub source_index: usize,
    /// Index into the target feature list.
    pub target_index: usize,
    /// Descriptor distance of the pair.
    pub distance: u32,
}

/// Optional filters applied on top of brute-force nearest neighbour matching.
///
/// The default configuration applies no filter, so every source feature yields exactly
/// one match. Filters run in the order: ratio test, cross check, absolute distance,
/// top-K cap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Lowe's ratio test: keep a match only if `best < ratio * second_best`.
    pub ratio_threshold: Option<f32>,
    /// Keep only mutual nearest neighbours.
    pub cross_check: bool,
    /// Keep a match only if `distance <= max(2 * min_distance, floor)`.
    pub distance_floor: Option<u32>,
    /// Keep at most this many matches, best distance first.
    pub max_matches: Option<usize>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: None,
            cross_check: false,
            distance_floor: None,
            max_matches: None,
        }
    }
}

impl MatchConfig {
    /// Filtering used for panorama stitching: absolute distance filter with a floor of 30.
    pub fn stitching() -> Self {
        Self {
            distance_floor: Some(DEFAULT_DISTANCE_FLOOR),
            ..Default::default()
        }
    }

    /// Keep only the `k` closest matches, as used for plain homography estimation.
    pub fn best_k(k: usize) -> Self {
        Self {
            max_matches: Some(k),
            ..Default::default()
        }
    }
}

/// Nearest and second nearest neighbour of one query descriptor.
#[derive(Clone, Copy, Debug)]
struct Neighbors {
    best_index: usize,
    best: u32,
    second: Option<u32>,
}

fn nearest_neighbors<D: Descriptor>(query: &D, candidates: &[Feature<D>]) -> Neighbors {
    let mut nn = Neighbors {
        best_index: 0,
        best: u32::MAX,
        second: None,
    };
    for (j, candidate) in candidates.iter().enumerate() {
        let dist = query.distance(&candidate.descriptor);
        // strict comparison keeps the lowest index on ties
        if j == 0 || dist < nn.best {
            if j > 0 {
                nn.second = Some(nn.best);
            }
            nn.best = dist;
            nn.best_index = j;
        } else if nn.second.map_or(true, |s| dist < s) {
            nn.second = Some(dist);
        }
    }
    nn
}

/// Match descriptors using brute-force nearest neighbour search.
///
/// For each source feature, finds the target feature with the smallest descriptor
/// distance (ties resolved towards the lowest target index), then applies the optional
/// filters of `config`. Source features are processed in parallel; the output keeps
/// source order unless `max_matches` is set, in which case it is sorted by
/// `(distance, source_index)`.
///
/// # Arguments
///
/// * `source` - Features of the image to be warped.
/// * `target` - Features of the reference image.
/// * `config` - Filtering options.
///
/// # Returns
///
/// The list of tentative correspondences. Empty when either input is empty.
pub fn match_descriptors<D: Descriptor>(
    source: &[Feature<D>],
    target: &[Feature<D>],
    config: &MatchConfig,
) -> Vec<Match> {
    if source.is_empty() || target.is_empty() {
        return vec![];
    }

    // forward pass: for each source feature, best and second-best target.
    let forward: Vec<Neighbors> = source
        .par_iter()
        .map(|f| nearest_neighbors(&f.descriptor, target))
        .collect();

    // reverse pass (only if cross-check): for each target feature, best source.
    let reverse: Option<Vec<usize>> = config.cross_check.then(|| {
        target
            .par_iter()
            .map(|f| nearest_neighbors(&f.descriptor, source).best_index)
            .collect()
    });

    let mut matches: Vec<Match> = forward
        .iter()
        .enumerate()
        .filter(|(_, nn)| match config.ratio_threshold {
            Some(ratio) => nn.second.map_or(true, |s| (nn.best as f32) < ratio * s as f32),
            None => true,
        })
        .filter(|(i, nn)| match &reverse {
            Some(rev) => rev[nn.best_index] == *i,
            None => true,
        })
        .map(|(i, nn)| Match {
            source_index: i,
            target_index: nn.best_index,
            distance: nn.best,
        })
        .collect();

    if let Some(floor) = config.distance_floor {
        matches = filter_by_distance(matches, floor);
    }

    if let Some(k) = config.max_matches {
        matches.sort_by_key(|m| (m.distance, m.source_index));
        matches.truncate(k);
    }

    log::debug!(
        "matched {} of {} source features against {} targets",
        matches.len(),
        source.len(),
        target.len()
    );

    matches
}

/// Keep matches with `distance <= max(2 * min_distance, floor)`.
///
/// The floor prevents a near-zero minimum from collapsing the threshold.
pub fn filter_by_distance(matches: Vec<Match>, floor: u32) -> Vec<Match> {
    let Some(min_distance) = matches.iter().map(|m| m.distance).min() else {
        return matches;
    };
    let threshold = min_distance.saturating_mul(2).max(floor);
    matches
        .into_iter()
        .filter(|m| m.distance <= threshold)
        .collect()
}

/// Gather the coordinates of each matched pair.
///
/// # Returns
///
/// The source locations and the target locations, index-aligned with `matches`.
pub fn matched_points<D>(
    matches: &[Match],
    source: &[Feature<D>],
    target: &[Feature<D>],
) -> (Vec<[f64; 2]>, Vec<[f64; 2]>) {
    matches
        .iter()
        .map(|m| {
            (
                source[m.source_index].location,
                target[m.target_index].location,
            )
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BinaryDescriptor, FloatDescriptor};

    fn features(descs: &[[u8; 2]]) -> Vec<Feature<BinaryDescriptor<2>>> {
        descs
            .iter()
            .enumerate()
            .map(|(i, d)| Feature::new([i as f64, 2.0 * i as f64], BinaryDescriptor::new(*d)))
            .collect()
    }

    #[test]
    fn test_match_empty_inputs() {
        let some = features(&[[0, 0]]);
        let none = features(&[]);
        let config = MatchConfig::default();
        assert!(match_descriptors(&some, &none, &config).is_empty());
        assert!(match_descriptors(&none, &some, &config).is_empty());
    }

    #[test]
    fn test_match_totality_and_order() {
        let source = features(&[[0xff, 0x00], [0x00, 0x00], [0x0f, 0xf0], [0x01, 0x00]]);
        let target = features(&[[0x00, 0x01], [0xff, 0x01], [0x0f, 0xf0]]);
        let matches = match_descriptors(&source, &target, &MatchConfig::default());

        assert_eq!(matches.len(), source.len());
        let idx: Vec<_> = matches.iter().map(|m| m.source_index).collect();
        assert_eq!(idx, vec![0, 1, 2, 3]);
        assert_eq!(matches[0].target_index, 1);
        assert_eq!(matches[0].distance, 1);
        assert_eq!(matches[2].target_index, 2);
        assert_eq!(matches[2].distance, 0);
    }

    #[test]
    fn test_match_tie_lowest_index() {
        let source = features(&[[0x00, 0x00]]);
        let target = features(&[[0x03, 0x00], [0x01, 0x00], [0x00, 0x01]]);
        let matches = match_descriptors(&source, &target, &MatchConfig::default());
        assert_eq!(matches[0].target_index, 1);
        assert_eq!(matches[0].distance, 1);
    }

    #[test]
    fn test_match_deterministic() {
        let source = features(&[[0x12, 0x34], [0x56, 0x78], [0x9a, 0xbc], [0xde, 0xf0]]);
        let target = features(&[[0x13, 0x34], [0x9a, 0xbd], [0x00, 0x00]]);
        let config = MatchConfig::default();
        let first = match_descriptors(&source, &target, &config);
        for _ in 0..10 {
            assert_eq!(match_descriptors(&source, &target, &config), first);
        }
    }

    #[test]
    fn test_match_thread_count_independent() -> Result<(), rayon::ThreadPoolBuildError> {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(3);
        let source: Vec<Feature<BinaryDescriptor<8>>> = (0..300)
            .map(|i| Feature::new([i as f64, 0.0], BinaryDescriptor::new(rng.random())))
            .collect();
        // half of the sources reappear with one flipped bit, the rest is clutter
        let mut target: Vec<_> = source
            .iter()
            .step_by(2)
            .map(|f| {
                let mut bits = f.descriptor.0;
                bits[0] ^= 1;
                Feature::new(f.location, BinaryDescriptor::new(bits))
            })
            .collect();
        target.extend(
            (0..50).map(|i| Feature::new([i as f64, 1.0], BinaryDescriptor::new(rng.random()))),
        );
        let config = MatchConfig {
            ratio_threshold: Some(0.9),
            cross_check: true,
            distance_floor: Some(2),
            max_matches: Some(40),
        };

        let run = |threads: usize| -> Result<Vec<Match>, rayon::ThreadPoolBuildError> {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?;
            Ok(pool.install(|| match_descriptors(&source, &target, &config)))
        };

        let single = run(1)?;
        assert!(!single.is_empty());
        assert_eq!(run(4)?, single);
        Ok(())
    }

    #[test]
    fn test_match_float_descriptors() {
        let feature = |x: f64, d: [f32; 3]| Feature::new([x, 0.0], FloatDescriptor(d));
        let source = vec![
            feature(0.0, [10.0, 20.0, 30.0]),
            feature(1.0, [200.0, 0.0, 50.0]),
            feature(2.0, [0.0, 0.0, 0.0]),
        ];
        let target = vec![
            feature(0.0, [198.0, 1.0, 50.0]),
            feature(1.0, [11.0, 19.5, 30.0]),
            feature(2.0, [5.0, 5.0, 5.0]),
        ];

        let matches = match_descriptors(&source, &target, &MatchConfig::default());
        let pairs: Vec<_> = matches
            .iter()
            .map(|m| (m.source_index, m.target_index, m.distance))
            .collect();
        // L1 distances: 1.5 rounds to 2, 3, 15
        assert_eq!(pairs, vec![(0, 1, 2), (1, 0, 3), (2, 2, 15)]);

        // the absolute filter works on the same distance scale
        let config = MatchConfig {
            distance_floor: Some(4),
            ..Default::default()
        };
        let matches = match_descriptors(&source, &target, &config);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_match_ratio_filter() {
        let source = features(&[[0x00, 0x00], [0xf0, 0x00]]);
        // source 0 is ambiguous (two targets at distance 1), source 1 is distinctive
        let target = features(&[[0x01, 0x00], [0x00, 0x01], [0xf0, 0x00]]);
        let config = MatchConfig {
            ratio_threshold: Some(0.8),
            ..Default::default()
        };
        let matches = match_descriptors(&source, &target, &config);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_index, 1);
        assert_eq!(matches[0].target_index, 2);
    }

    #[test]
    fn test_match_ratio_single_target() {
        let source = features(&[[0x00, 0x00]]);
        let target = features(&[[0xff, 0xff]]);
        let config = MatchConfig {
            ratio_threshold: Some(0.5),
            ..Default::default()
        };
        assert_eq!(match_descriptors(&source, &target, &config).len(), 1);
    }

    #[test]
    fn test_match_cross_check() {
        // both sources prefer target 0, but target 0 prefers source 1
        let source = features(&[[0x03, 0x00], [0x01, 0x00]]);
        let target = features(&[[0x00, 0x00], [0xff, 0xff]]);
        let config = MatchConfig {
            cross_check: true,
            ..Default::default()
        };
        let matches = match_descriptors(&source, &target, &config);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source_index, 1);
    }

    #[test]
    fn test_filter_by_distance() {
        let m = |i, d| Match {
            source_index: i,
            target_index: i,
            distance: d,
        };
        let matches = vec![m(0, 20), m(1, 45), m(2, 40), m(3, 41)];
        let kept: Vec<_> = filter_by_distance(matches.clone(), 30)
            .iter()
            .map(|m| m.source_index)
            .collect();
        assert_eq!(kept, vec![0, 2]);

        // floor dominates when the minimum is tiny
        let matches = vec![m(0, 0), m(1, 30), m(2, 31)];
        assert_eq!(filter_by_distance(matches, 30).len(), 2);

        assert!(filter_by_distance(vec![], 30).is_empty());
    }

    #[test]
    fn test_match_max_matches() {
        let source = features(&[[0x0f, 0x00], [0x00, 0x00], [0x01, 0x00], [0x03, 0x00]]);
        let target = features(&[[0x00, 0x00]]);
        let matches = match_descriptors(&source, &target, &MatchConfig::best_k(2));
        let idx: Vec<_> = matches.iter().map(|m| m.source_index).collect();
        assert_eq!(idx, vec![1, 2]);
    }

    #[test]
    fn test_matched_points() {
        let source = features(&[[0, 0], [1, 1]]);
        let target = features(&[[0, 0], [1, 1], [2, 2]]);
        let matches = vec![Match {
            source_index: 1,
            target_index: 2,
            distance: 0,
        }];
        let (p1, p2) = matched_points(&matches, &source, &target);
        assert_eq!(p1, vec![[1.0, 2.0]]);
        assert_eq!(p2, vec![[2.0, 4.0]]);
    }

    #[test]
    fn test_match_config_presets() {
        assert_eq!(
            MatchConfig::stitching().distance_floor,
            Some(DEFAULT_DISTANCE_FLOOR)
        );
        assert_eq!(MatchConfig::best_k(50).max_matches, Some(50));
    }
}
