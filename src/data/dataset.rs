use std::path::PathBuf;

use crate::domain::image_spec::ImageGeometry;

/// One decoded, fitted and normalised training image.
/// `pixels` is channel-major: all of channel 0 row by row, then channel 1, ...
/// Every value lies in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pub source:   PathBuf,
    pub geometry: ImageGeometry,
    pub pixels:   Vec<f32>,
}

impl ImageSample {
    pub fn channels(&self) -> usize { self.geometry.channels() }

    pub fn height(&self) -> usize { self.geometry.height as usize }

    pub fn width(&self) -> usize { self.geometry.width as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_follow_geometry() {
        let geometry = ImageGeometry::new(2, 1, 3).unwrap();
        let sample   = ImageSample { source: PathBuf::from("a.png"), geometry, pixels: vec![0.5; 6] };
        assert_eq!(sample.channels(), 3);
        assert_eq!(sample.width(), 2);
        assert_eq!(sample.height(), 1);
    }
}
