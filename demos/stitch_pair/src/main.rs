use argh::FromArgs;
use std::path::PathBuf;

use duoview::imgproc::{composite::CanvasMode, interpolation::InterpolationMode};
use duoview::io as F;
use duoview::{stitch, StitchConfig};

#[derive(FromArgs)]
/// Register two images from precomputed features and write the stitched panorama
struct Args {
    /// path to the image to be warped
    #[argh(option, short = 's')]
    source: PathBuf,

    /// path to the reference image
    #[argh(option, short = 't')]
    target: PathBuf,

    /// path to the JSON features of the source image (32-byte descriptors)
    #[argh(option)]
    source_features: PathBuf,

    /// path to the JSON features of the target image (32-byte descriptors)
    #[argh(option)]
    target_features: PathBuf,

    /// path to the output panorama
    #[argh(option, short = 'o', default = "PathBuf::from(\"panorama.png\")")]
    output: PathBuf,

    /// optional JSON file with the pipeline settings
    #[argh(option)]
    config: Option<PathBuf>,

    /// override the RANSAC inlier threshold in pixels
    #[argh(option)]
    threshold: Option<f64>,

    /// override the RANSAC random seed
    #[argh(option)]
    seed: Option<u64>,

    /// size the canvas to the projected source instead of side by side
    #[argh(switch)]
    bounded: bool,

    /// use nearest neighbour instead of bilinear sampling
    #[argh(switch)]
    nearest: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut config = match &args.config {
        Some(path) => serde_json::from_reader(std::fs::File::open(path)?)?,
        None => StitchConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.ransac.reprojection_threshold = threshold;
    }
    if args.seed.is_some() {
        config.ransac.random_seed = args.seed;
    }
    if args.bounded {
        config.composite.canvas_mode = CanvasMode::Bounded;
    }
    if args.nearest {
        config.composite.interpolation = InterpolationMode::Nearest;
    }
    log::debug!("settings: {config:?}");

    let source = F::read_image_rgb8(&args.source)?;
    let target = F::read_image_rgb8(&args.target)?;

    // ORB style binary descriptors, one file per image
    let source_features = F::read_features_json::<32>(&args.source_features)?;
    let target_features = F::read_features_json::<32>(&args.target_features)?;
    log::info!(
        "source {} with {} features, target {} with {} features",
        source.size(),
        source_features.len(),
        target.size(),
        target_features.len()
    );

    let panorama = stitch(
        &source,
        &target,
        &source_features,
        &target_features,
        &config,
    )?;

    let result = &panorama.registration.result;
    log::info!(
        "{} / {} inliers ({:.1}%) after {} trials",
        result.inlier_count,
        panorama.registration.matches.len(),
        100.0 * result.inlier_ratio(),
        result.iterations
    );
    for row in result.homography.as_array() {
        log::info!("H: [{:>12.6} {:>12.6} {:>12.6}]", row[0], row[1], row[2]);
    }

    F::write_image_rgb8(&args.output, &panorama.image)?;
    println!("Wrote {} ({})", args.output.display(), panorama.image.size());

    Ok(())
}
