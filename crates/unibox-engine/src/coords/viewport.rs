/// Device viewport rectangle in pixels, origin bottom-left as the backend
/// expects it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport anchored at the origin.
    #[inline]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width over height; 0 for a degenerate viewport.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_size_is_anchored_at_origin() {
        let v = Viewport::from_size(800, 600);
        assert_eq!((v.x, v.y), (0, 0));
        assert!(v.is_valid());
        assert!((v.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_height_is_invalid() {
        let v = Viewport::from_size(800, 0);
        assert!(!v.is_valid());
        assert_eq!(v.aspect(), 0.0);
    }
}
