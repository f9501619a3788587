//! Core value types for the layout engine

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::error::LayoutError;

/// One of the two layout axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Both axes in evaluation order
    pub const ALL: [Axis; 2] = [Axis::X, Axis::Y];

    /// The orthogonal axis
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// A named position along one axis of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorSite {
    /// The near edge (left or top)
    Here,
    /// Halfway between the near and far edges
    Centre,
    /// The far edge (right or bottom)
    Far,
}

impl AnchorSite {
    /// Names accepted by [`AnchorSite::from_str`]
    pub const NAMES: [&'static str; 3] = ["here", "centre", "far"];

    /// Fraction of the extent at which this site sits
    pub(crate) fn fraction(self) -> f64 {
        match self {
            AnchorSite::Here => 0.0,
            AnchorSite::Centre => 0.5,
            AnchorSite::Far => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorSite::Here => "here",
            AnchorSite::Centre => "centre",
            AnchorSite::Far => "far",
        }
    }
}

impl FromStr for AnchorSite {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "here" => Ok(AnchorSite::Here),
            "centre" | "center" => Ok(AnchorSite::Centre),
            "far" => Ok(AnchorSite::Far),
            other => Err(LayoutError::unknown_anchor_site(other)),
        }
    }
}

impl fmt::Display for AnchorSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cross-axis placement of stacked children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    #[default]
    Here,
    Centre,
    Far,
    /// The child manages its own cross-axis placement
    None,
}

impl Alignment {
    /// The anchor site this alignment binds, if any
    pub fn site(self) -> Option<AnchorSite> {
        match self {
            Alignment::Here => Some(AnchorSite::Here),
            Alignment::Centre => Some(AnchorSite::Centre),
            Alignment::Far => Some(AnchorSite::Far),
            Alignment::None => None,
        }
    }
}

impl FromStr for Alignment {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "none" {
            return Ok(Alignment::None);
        }
        Ok(match s.parse::<AnchorSite>()? {
            AnchorSite::Here => Alignment::Here,
            AnchorSite::Centre => Alignment::Centre,
            AnchorSite::Far => Alignment::Far,
        })
    }
}

/// Four-sided padding between the outer box and the content box
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "PaddingRepr")]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Scene files accept either a single number or `[top, right, bottom, left]`
#[derive(Deserialize)]
#[serde(untagged)]
enum PaddingRepr {
    Uniform(f64),
    Sides([f64; 4]),
}

impl From<PaddingRepr> for Padding {
    fn from(repr: PaddingRepr) -> Self {
        match repr {
            PaddingRepr::Uniform(v) => Padding::uniform(v),
            PaddingRepr::Sides([top, right, bottom, left]) => Padding::new(top, right, bottom, left),
        }
    }
}

impl Padding {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    /// Padding on the near side of an axis (left or top)
    pub fn near(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.left,
            Axis::Y => self.top,
        }
    }

    /// Padding on the far side of an axis (right or bottom)
    pub fn far(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.right,
            Axis::Y => self.bottom,
        }
    }

    /// Combined padding along an axis
    pub fn total(&self, axis: Axis) -> f64 {
        self.near(axis) + self.far(axis)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.top, self.right, self.bottom, self.left]
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// An axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Near coordinate on an axis
    pub fn near(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// Extent along an axis
    pub fn size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.width,
            Axis::Y => self.height,
        }
    }

    /// Translate by an offset
    pub fn translate(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::zero()
    }
}

/// Cached union of a container's children
///
/// Axes with no fully defined child collapse onto the container's own
/// content position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChildBounds {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl ChildBounds {
    /// Near and far coordinates on an axis
    pub fn span(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::X => (self.left, self.right),
            Axis::Y => (self.top, self.bottom),
        }
    }

    pub(crate) fn set_span(&mut self, axis: Axis, near: f64, far: f64) {
        match axis {
            Axis::X => {
                self.left = near;
                self.right = far;
            }
            Axis::Y => {
                self.top = near;
                self.bottom = far;
            }
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_other() {
        assert_eq!(Axis::X.other(), Axis::Y);
        assert_eq!(Axis::Y.other(), Axis::X);
    }

    #[test]
    fn test_anchor_site_parse() {
        assert_eq!("here".parse::<AnchorSite>().unwrap(), AnchorSite::Here);
        assert_eq!("centre".parse::<AnchorSite>().unwrap(), AnchorSite::Centre);
        assert_eq!("center".parse::<AnchorSite>().unwrap(), AnchorSite::Centre);
        assert_eq!("far".parse::<AnchorSite>().unwrap(), AnchorSite::Far);
    }

    #[test]
    fn test_anchor_site_unknown() {
        let err = "middle".parse::<AnchorSite>().unwrap_err();
        assert!(matches!(err, LayoutError::UnknownAnchorSite { .. }));
        assert!(err.to_string().contains("middle"));
    }

    #[test]
    fn test_alignment_parse() {
        assert_eq!("none".parse::<Alignment>().unwrap(), Alignment::None);
        assert_eq!("far".parse::<Alignment>().unwrap(), Alignment::Far);
        assert!("top".parse::<Alignment>().is_err());
        assert_eq!(Alignment::None.site(), None);
        assert_eq!(Alignment::Centre.site(), Some(AnchorSite::Centre));
    }

    #[test]
    fn test_padding_sides() {
        let p = Padding::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(p.near(Axis::X), 4.0);
        assert_eq!(p.far(Axis::X), 2.0);
        assert_eq!(p.total(Axis::Y), 4.0);
        assert!(p.is_valid());
        assert!(!Padding::uniform(-1.0).is_valid());
    }

    #[test]
    fn test_rect_union() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 5.0, 10.0, 10.0);
        assert_eq!(a.union(&b), Rect::new(0.0, 0.0, 30.0, 15.0));
    }

    #[test]
    fn test_child_bounds_span() {
        let mut bounds = ChildBounds::default();
        bounds.set_span(Axis::X, 2.0, 12.0);
        assert_eq!(bounds.span(Axis::X), (2.0, 12.0));
        assert_eq!(bounds.width(), 10.0);
        assert_eq!(bounds.height(), 0.0);
    }
}
