//! Color space helpers.

use glam::Vec3;

use crate::constants::GAMMA;

/// Decode a gamma-encoded color to linear space.
#[inline]
pub fn gamma_to_linear(color: Vec3) -> Vec3 {
    color.max(Vec3::ZERO).powf(GAMMA)
}

/// Encode a linear color for display.
#[inline]
pub fn linear_to_gamma(color: Vec3) -> Vec3 {
    color.max(Vec3::ZERO).powf(1.0 / GAMMA)
}

/// Rec. 709 relative luminance.
#[inline]
pub fn luminance(color: Vec3) -> f32 {
    color.dot(Vec3::new(0.2126, 0.7152, 0.0722))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gamma_round_trip() {
        let c = Vec3::new(0.1, 0.5, 0.9);
        let back = linear_to_gamma(gamma_to_linear(c));
        assert_relative_eq!(back.x, c.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, c.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, c.z, epsilon = 1e-5);
    }

    #[test]
    fn white_has_unit_luminance() {
        assert_relative_eq!(luminance(Vec3::ONE), 1.0, epsilon = 1e-6);
    }
}
