//! Minimal 2D geometry used by textures and quads.

/// Width and height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Size {
    /// Zero size.
    pub const ZERO: Size = Size::new(0.0, 0.0);

    /// Creates a new size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Origin.
    pub const ZERO: Point = Point::new(0.0, 0.0);

    /// Creates a new point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle given by its origin (minimal corner) and size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Minimal corner.
    pub origin: Point,
    /// Extent.
    pub size: Size,
}

impl Rect {
    /// Creates a new rectangle.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Minimal x.
    pub fn min_x(&self) -> f32 {
        self.origin.x
    }

    /// Minimal y.
    pub fn min_y(&self) -> f32 {
        self.origin.y
    }

    /// Maximal x.
    pub fn max_x(&self) -> f32 {
        self.origin.x + self.size.width
    }

    /// Maximal y.
    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.height
    }
}

/// Returns true if `value` is a non-zero power of two.
pub fn is_power_of_two(value: u32) -> bool {
    value.is_power_of_two()
}

/// Smallest power of two that is not less than `value`. Zero maps to one.
pub fn next_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}
