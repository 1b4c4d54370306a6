use std::{io::Write, path::Path};

use duoview_features::{BinaryDescriptor, Feature, FeatureExtractor};
use duoview_image::Image;
use serde::{Deserialize, Serialize};

use crate::error::IoError;

// on-disk layout of one feature: `{"location": [x, y], "descriptor": [b0, b1, ...]}`
#[derive(Serialize, Deserialize)]
struct FeatureRecord {
    location: [f64; 2],
    descriptor: Vec<u8>,
}

/// Read a list of binary features from a JSON file.
///
/// The file holds an array of objects with a `location` pair and a `descriptor` byte
/// array of exactly `N` entries.
///
/// # Arguments
///
/// * `file_path` - Path to the JSON file.
///
/// # Returns
///
/// The features in file order.
///
/// # Errors
///
/// Fails if the file is missing, is not valid JSON, or holds a descriptor whose length
/// differs from `N`.
pub fn read_features_json<const N: usize>(
    file_path: impl AsRef<Path>,
) -> Result<Vec<Feature<BinaryDescriptor<N>>>, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let file = std::fs::File::open(file_path)?;
    let records: Vec<FeatureRecord> = serde_json::from_reader(std::io::BufReader::new(file))?;

    let features: Vec<Feature<BinaryDescriptor<N>>> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| -> Result<_, IoError> {
            let descriptor = BinaryDescriptor::try_from(record.descriptor.as_slice()).map_err(
                |_| IoError::InvalidDescriptorLength {
                    index,
                    expected: N,
                    actual: record.descriptor.len(),
                },
            )?;
            Ok(Feature::new(record.location, descriptor))
        })
        .collect::<Result<_, _>>()?;

    log::debug!("read {} features from {}", features.len(), file_path.display());

    Ok(features)
}

/// Write a list of binary features to a JSON file readable by [`read_features_json`].
pub fn write_features_json<const N: usize>(
    file_path: impl AsRef<Path>,
    features: &[Feature<BinaryDescriptor<N>>],
) -> Result<(), IoError> {
    let records: Vec<FeatureRecord> = features
        .iter()
        .map(|f| FeatureRecord {
            location: f.location,
            descriptor: f.descriptor.as_bytes().to_vec(),
        })
        .collect();

    let mut writer = std::io::BufWriter::new(std::fs::File::create(file_path)?);
    serde_json::to_writer(&mut writer, &records)?;
    writer.flush()?;

    Ok(())
}

/// Features computed ahead of time, served through the [`FeatureExtractor`] interface.
///
/// Useful when detection runs in another process and its output is stored on disk.
/// The image handed to [`FeatureExtractor::extract`] is ignored.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedFeatures<const N: usize> {
    features: Vec<Feature<BinaryDescriptor<N>>>,
}

impl<const N: usize> PrecomputedFeatures<N> {
    /// Wrap an in-memory feature list.
    pub fn new(features: Vec<Feature<BinaryDescriptor<N>>>) -> Self {
        Self { features }
    }

    /// Load the features from a JSON file, see [`read_features_json`].
    pub fn from_json_file(file_path: impl AsRef<Path>) -> Result<Self, IoError> {
        Ok(Self::new(read_features_json(file_path)?))
    }

    /// The stored features.
    pub fn features(&self) -> &[Feature<BinaryDescriptor<N>>] {
        &self.features
    }
}

impl<T, const C: usize, const N: usize> FeatureExtractor<T, C> for PrecomputedFeatures<N> {
    type Descriptor = BinaryDescriptor<N>;
    type Error = IoError;

    fn extract(&self, _image: &Image<T, C>) -> Result<Vec<Feature<Self::Descriptor>>, IoError> {
        Ok(self.features.clone())
    }
}
