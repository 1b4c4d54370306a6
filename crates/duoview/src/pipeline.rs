use duoview_features::{
    match_descriptors, matched_points, Descriptor, Feature, FeatureExtractor, Match, MatchConfig,
};
use duoview_geometry::{find_homography, HomographyResult, RansacParams};
use duoview_image::{Image, ImageDtype};
use duoview_imgproc::composite::{composite, CompositeConfig};
use serde::{Deserialize, Serialize};

use crate::StitchError;

/// Settings for every stage of the pipeline.
///
/// Missing sections or fields fall back to their defaults when deserialized, so a JSON
/// file only needs to list what it overrides:
///
/// ```
/// use duoview::StitchConfig;
///
/// let config: StitchConfig =
///     serde_json::from_str(r#"{"ransac": {"reprojection_threshold": 1.5}}"#).unwrap();
/// assert_eq!(config.ransac.reprojection_threshold, 1.5);
/// assert_eq!(config.ransac.max_iterations, 2000);
/// assert_eq!(config.matching.distance_floor, Some(30));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Descriptor matching filters.
    pub matching: MatchConfig,
    /// Robust estimation parameters.
    pub ransac: RansacParams,
    /// Canvas and resampling options.
    pub composite: CompositeConfig,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::stitching(),
            ransac: RansacParams::default(),
            composite: CompositeConfig::default(),
        }
    }
}

/// Correspondences and the homography estimated from them.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    /// Tentative matches, in the order handed to the estimator.
    pub matches: Vec<Match>,
    /// Estimated homography and the inlier mask over `matches`.
    pub result: HomographyResult,
}

impl Registration {
    /// The matches flagged as inliers.
    pub fn inlier_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches
            .iter()
            .zip(self.result.inliers.iter())
            .filter_map(|(m, &inlier)| inlier.then_some(m))
    }
}

/// The composited canvas together with the registration that produced it.
#[derive(Clone, Debug)]
pub struct Panorama<T, const C: usize> {
    /// Target and warped source on one canvas.
    pub image: Image<T, C>,
    /// Matches and homography used for the warp.
    pub registration: Registration,
}

/// Estimate the source -> target homography from two feature sets.
///
/// # Arguments
///
/// * `source` - Features of the image to be warped.
/// * `target` - Features of the reference image.
/// * `config` - Matching and estimation settings; compositing settings are ignored.
///
/// # Errors
///
/// Fails with [`StitchError::Registration`] if fewer than four matches survive the
/// filters or no model reaches the required support.
pub fn register<D: Descriptor>(
    source: &[Feature<D>],
    target: &[Feature<D>],
    config: &StitchConfig,
) -> Result<Registration, StitchError> {
    let matches = match_descriptors(source, target, &config.matching);
    let (src_pts, dst_pts) = matched_points(&matches, source, target);

    let result = find_homography(&src_pts, &dst_pts, &config.ransac)?;

    log::info!(
        "registered {} source / {} target features: {} matches, {} inliers after {} trials",
        source.len(),
        target.len(),
        matches.len(),
        result.inlier_count,
        result.iterations
    );

    Ok(Registration { matches, result })
}

/// Register `source` onto `target` and composite both images.
///
/// The target is kept at the canvas origin and wins wherever the images overlap.
///
/// # Arguments
///
/// * `source_image` - The image to be warped.
/// * `target_image` - The reference image.
/// * `source_features` - Features extracted from `source_image`.
/// * `target_features` - Features extracted from `target_image`.
/// * `config` - Settings for every stage.
///
/// # Errors
///
/// Fails if registration fails or the canvas cannot be built. No canvas is produced
/// on failure.
pub fn stitch<T, const C: usize, D>(
    source_image: &Image<T, C>,
    target_image: &Image<T, C>,
    source_features: &[Feature<D>],
    target_features: &[Feature<D>],
    config: &StitchConfig,
) -> Result<Panorama<T, C>, StitchError>
where
    T: ImageDtype,
    D: Descriptor,
{
    let registration = register(source_features, target_features, config)?;

    let image = composite(
        source_image,
        target_image,
        &registration.result.homography,
        &config.composite,
    )?;

    Ok(Panorama {
        image,
        registration,
    })
}

/// Extract features from both images with `extractor`, then [`stitch`] them.
///
/// # Errors
///
/// Extraction failures are reported as [`StitchError::FeatureExtraction`]; the other
/// failure modes are those of [`stitch`].
pub fn stitch_with<T, const C: usize, E>(
    source_image: &Image<T, C>,
    target_image: &Image<T, C>,
    extractor: &E,
    config: &StitchConfig,
) -> Result<Panorama<T, C>, StitchError>
where
    T: ImageDtype,
    E: FeatureExtractor<T, C>,
{
    let source_features = extractor
        .extract(source_image)
        .map_err(|e| StitchError::FeatureExtraction(Box::new(e)))?;
    let target_features = extractor
        .extract(target_image)
        .map_err(|e| StitchError::FeatureExtraction(Box::new(e)))?;

    log::debug!(
        "extracted {} source and {} target features",
        source_features.len(),
        target_features.len()
    );

    stitch(
        source_image,
        target_image,
        &source_features,
        &target_features,
        config,
    )
}
