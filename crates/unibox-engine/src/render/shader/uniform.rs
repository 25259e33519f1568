use glam::{Vec2, Vec3, Vec4};

/// Tolerance used when comparing cached float components.
pub const UNIFORM_EPSILON: f32 = 1e-6;

/// Discriminant of a [`UniformValue`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
}

/// Cacheable uniform value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Bool(_) => UniformKind::Bool,
            Self::Int(_) => UniformKind::Int,
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
        }
    }

    /// Exact for bool/int, [`UNIFORM_EPSILON`] per float component.
    /// Values of different kinds never match.
    pub fn approx_eq(&self, other: &Self) -> bool {
        fn close(a: &[f32], b: &[f32]) -> bool {
            a.iter().zip(b).all(|(x, y)| (x - y).abs() <= UNIFORM_EPSILON)
        }

        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => close(&[*a], &[*b]),
            (Self::Vec2(a), Self::Vec2(b)) => close(&a.to_array(), &b.to_array()),
            (Self::Vec3(a), Self::Vec3(b)) => close(&a.to_array(), &b.to_array()),
            (Self::Vec4(a), Self::Vec4(b)) => close(&a.to_array(), &b.to_array()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_within_epsilon_match() {
        let a = UniformValue::Float(0.5);
        assert!(a.approx_eq(&UniformValue::Float(0.5 + 5e-7)));
        assert!(!a.approx_eq(&UniformValue::Float(0.5 + 1e-5)));
    }

    #[test]
    fn vectors_compare_per_component() {
        let a = UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0));
        assert!(a.approx_eq(&UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))));
        assert!(!a.approx_eq(&UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.001))));
    }

    #[test]
    fn different_kinds_never_match() {
        assert!(!UniformValue::Int(1).approx_eq(&UniformValue::Bool(true)));
        assert_eq!(UniformValue::Vec4(Vec4::ONE).kind(), UniformKind::Vec4);
    }
}
