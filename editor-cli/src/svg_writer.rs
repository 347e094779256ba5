use editor_core::VectorDocument;
use svg::node::element::Path;
use svg::Document;

/// Render a vector document as SVG markup sized to the source image.
pub fn to_svg(doc: &VectorDocument) -> Document {
    let mut document = Document::new()
        .set("width", doc.width.to_string())
        .set("height", doc.height.to_string())
        .set("viewBox", format!("0 0 {} {}", doc.width, doc.height));

    for path in &doc.paths {
        let element = Path::new()
            .set("d", path.to_path_data())
            .set("fill", path.fill.hex())
            .set("fill-rule", path.fill_rule.svg_name())
            .set("stroke", "none");
        document = document.add(element);
    }
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use editor_core::{Color, PathCommand, VectorPath};
    use geo::Coord;

    #[test]
    fn test_renders_paths() {
        let mut doc = VectorDocument::new(20, 10);
        doc.push(VectorPath::new(
            vec![
                PathCommand::MoveTo(Coord { x: 1.0, y: 1.0 }),
                PathCommand::LineTo(Coord { x: 5.0, y: 1.0 }),
                PathCommand::LineTo(Coord { x: 5.0, y: 5.0 }),
                PathCommand::Close,
            ],
            Color::new(255, 0, 0),
        ));

        let markup = to_svg(&doc).to_string();
        assert!(markup.contains("viewBox=\"0 0 20 10\""));
        assert!(markup.contains("d=\"M 1 1 L 5 1 L 5 5 Z\""));
        assert!(markup.contains("fill=\"#ff0000\""));
    }

    #[test]
    fn test_empty_document() {
        let markup = to_svg(&VectorDocument::new(3, 3)).to_string();
        assert!(!markup.contains("<path"));
    }
}
