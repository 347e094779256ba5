use image::RgbImage;
use tracing::debug;

use crate::color::Color;
use crate::contours::ContourExtractor;
use crate::detail::DetailParams;
use crate::document::VectorDocument;
use crate::partition::ColorRegion;
use crate::simplify::PathSimplifier;

/// Monochrome vectorizer: traces ink and emits black filled paths.
#[derive(Debug, Clone)]
pub struct Vectorizer {
    extractor: ContourExtractor,
    simplifier: PathSimplifier,
    fill: Color,
}

impl Vectorizer {
    pub fn new(params: DetailParams) -> Self {
        Self {
            extractor: ContourExtractor::new(params),
            simplifier: PathSimplifier::from_params(&params),
            fill: Color::BLACK,
        }
    }

    /// Each outer boundary becomes a path; its direct holes are appended as
    /// even-odd subpaths. Shapes nested inside holes get their own paths.
    pub fn vectorize(&self, image: &RgbImage) -> VectorDocument {
        let contours = self.extractor.extract(image);
        let mut doc = VectorDocument::new(image.width(), image.height());
        for shape in self.simplifier.simplify_shapes(&contours) {
            doc.push(shape.to_path(self.fill));
        }

        debug!(contours = contours.len(), paths = doc.len(), "vectorized image");
        doc
    }
}

/// Lay out color regions as filled paths, one per shape, in region order.
pub fn regions_to_document(width: u32, height: u32, regions: &[ColorRegion]) -> VectorDocument {
    let mut doc = VectorDocument::new(width, height);
    for region in regions {
        for shape in &region.shapes {
            doc.push(shape.to_path(region.color));
        }
    }
    doc
}
