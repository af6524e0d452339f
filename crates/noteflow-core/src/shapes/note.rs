//! Note shape: a rectangular card with text and named connection points.

use super::{SerializableColor, ShapeCommon, point_in_rotated_rect};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Horizontal text alignment inside a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical text alignment inside a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Drop shadow drawn under a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub offset: Vec2,
    pub blur: f64,
    pub color: SerializableColor,
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            offset: Vec2::new(2.0, 3.0),
            blur: 6.0,
            color: SerializableColor::new(0, 0, 0, 40),
        }
    }
}

/// Style properties for notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteStyle {
    pub fill: SerializableColor,
    pub border_color: Option<SerializableColor>,
    pub border_width: f64,
    /// Corner radius (0 = sharp corners).
    pub corner_radius: f64,
    pub shadow: Option<Shadow>,
    pub text_color: SerializableColor,
    pub font_size: f64,
    /// Inner padding between the border and the text block.
    pub padding: f64,
    pub h_align: HorizontalAlign,
    pub v_align: VerticalAlign,
}

impl Default for NoteStyle {
    fn default() -> Self {
        Self {
            fill: SerializableColor::new(255, 241, 118, 255),
            border_color: Some(SerializableColor::new(202, 178, 58, 255)),
            border_width: 1.0,
            corner_radius: 6.0,
            shadow: Some(Shadow::default()),
            text_color: SerializableColor::new(33, 33, 33, 255),
            font_size: 14.0,
            padding: 8.0,
            h_align: HorizontalAlign::default(),
            v_align: VerticalAlign::default(),
        }
    }
}

/// A named anchor where connectors attach.
///
/// `anchor` is expressed in unit coordinates of the note rectangle:
/// (0, 0) is the top-left corner and (1, 1) the bottom-right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPoint {
    pub name: String,
    pub anchor: Point,
}

impl ConnectionPoint {
    pub fn new(name: impl Into<String>, anchor: Point) -> Self {
        Self {
            name: name.into(),
            anchor,
        }
    }

    /// The four edge midpoints every new note gets.
    pub fn defaults() -> Vec<ConnectionPoint> {
        vec![
            ConnectionPoint::new("top", Point::new(0.5, 0.0)),
            ConnectionPoint::new("right", Point::new(1.0, 0.5)),
            ConnectionPoint::new("bottom", Point::new(0.5, 1.0)),
            ConnectionPoint::new("left", Point::new(0.0, 0.5)),
        ]
    }
}

/// A sticky-note style card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(flatten)]
    pub base: ShapeCommon,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub style: NoteStyle,
    #[serde(default = "ConnectionPoint::defaults")]
    pub connection_points: Vec<ConnectionPoint>,
}

impl Note {
    /// Create a new empty note.
    pub fn new(position: Point, size: Size) -> Self {
        Self {
            base: ShapeCommon::new(position, size),
            text: String::new(),
            style: NoteStyle::default(),
            connection_points: ConnectionPoint::defaults(),
        }
    }

    /// Builder-style text setter.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder-style z-index setter.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.base.z_index = z_index;
        self
    }

    /// The unrotated rectangle.
    pub fn rect(&self) -> Rect {
        self.base.rect()
    }

    /// Axis-aligned bounds, accounting for rotation.
    pub fn bounds(&self) -> Rect {
        self.base.bounds()
    }

    /// Transform from note-local unit space to world space (rotation included).
    fn unit_to_world(&self) -> Affine {
        let rect = self.rect();
        Affine::rotate_about(self.base.rotation, rect.center())
            * Affine::translate(rect.origin().to_vec2())
            * Affine::scale_non_uniform(rect.width(), rect.height())
    }

    /// World position of the connection point called `name`.
    pub fn connection_point(&self, name: &str) -> Option<Point> {
        let xf = self.unit_to_world();
        self.connection_points
            .iter()
            .find(|cp| cp.name == name)
            .map(|cp| xf * cp.anchor)
    }

    /// All connection points with their index and world position.
    pub fn connection_points_world(&self) -> Vec<(usize, &ConnectionPoint, Point)> {
        let xf = self.unit_to_world();
        self.connection_points
            .iter()
            .enumerate()
            .map(|(i, cp)| (i, cp, xf * cp.anchor))
            .collect()
    }

    /// Point-in-note test with rotation compensation.
    pub fn contains(&self, point: Point, tolerance: f64) -> bool {
        point_in_rotated_rect(point, self.rect(), self.base.rotation, tolerance)
    }
}
