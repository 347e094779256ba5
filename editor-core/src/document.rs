use geo::{BoundingRect, Coord, LineString, Rect};
use serde::{Deserialize, Serialize};

use crate::color::Color;

/// One drawing instruction in absolute image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(Coord<f64>),
    LineTo(Coord<f64>),
    QuadTo { control: Coord<f64>, end: Coord<f64> },
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn svg_name(&self) -> &'static str {
        match self {
            Self::NonZero => "nonzero",
            Self::EvenOdd => "evenodd",
        }
    }
}

/// A flat-filled shape made of one or more closed subpaths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorPath {
    pub commands: Vec<PathCommand>,
    pub fill: Color,
    pub fill_rule: FillRule,
}

impl VectorPath {
    pub fn new(commands: Vec<PathCommand>, fill: Color) -> Self {
        Self {
            commands,
            fill,
            fill_rule: FillRule::NonZero,
        }
    }

    /// Append another closed subpath, switching to even-odd filling.
    pub fn push_hole(&mut self, commands: Vec<PathCommand>) {
        self.commands.extend(commands);
        self.fill_rule = FillRule::EvenOdd;
    }

    /// Anchor vertices in drawing order; curve control points are the
    /// simplified vertices, so they are included.
    pub fn vertices(&self) -> Vec<Coord<f64>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => Some(*p),
                PathCommand::QuadTo { control, .. } => Some(*control),
                PathCommand::Close => None,
            })
            .collect()
    }

    pub fn subpath_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PathCommand::MoveTo(_)))
            .count()
    }

    /// Bounds of every point the path touches, curve controls included.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let points: Vec<Coord<f64>> = self
            .commands
            .iter()
            .flat_map(|c| match c {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => vec![*p],
                PathCommand::QuadTo { control, end } => vec![*control, *end],
                PathCommand::Close => vec![],
            })
            .collect();
        LineString::from(points).bounding_rect()
    }

    /// SVG path data, e.g. `M 0 0 L 4 0 Q 4 4 2 4 Z`.
    pub fn to_path_data(&self) -> String {
        let mut d = String::new();
        for (i, c) in self.commands.iter().enumerate() {
            if i > 0 {
                d.push(' ');
            }
            let part = match c {
                PathCommand::MoveTo(p) => format!("M {} {}", p.x, p.y),
                PathCommand::LineTo(p) => format!("L {} {}", p.x, p.y),
                PathCommand::QuadTo { control, end } => {
                    format!("Q {} {} {} {}", control.x, control.y, end.x, end.y)
                }
                PathCommand::Close => "Z".to_string(),
            };
            d.push_str(&part);
        }
        d
    }
}

/// Declarative vector output sized to the source image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub width: u32,
    pub height: u32,
    pub paths: Vec<VectorPath>,
}

impl VectorDocument {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            paths: Vec::new(),
        }
    }

    pub fn push(&mut self, path: VectorPath) {
        self.paths.push(path);
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Union of all path bounds.
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.paths
            .iter()
            .filter_map(|p| p.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })
    }
}
