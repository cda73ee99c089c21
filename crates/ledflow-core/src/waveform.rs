//! Stateless periodic building blocks shared by the generators.
//!
//! All waves have period 1 and range `[0, 1]`.

/// Triangle wave: 0 at integers, 1 at half-integers.
pub fn triangle(x: f32) -> f32 {
    let f = x - x.floor();
    1.0 - (2.0 * f - 1.0).abs()
}

/// Rising sawtooth: the fractional part of `x`.
pub fn sawtooth(x: f32) -> f32 {
    x - x.floor()
}

/// A unit-width triangle pulse followed by a flat gap of `spacing` units.
///
/// The full period is `1 + spacing`. A negative spacing is treated as zero,
/// which degenerates to [`triangle`].
pub fn spaced_triangle(x: f32, spacing: f32) -> f32 {
    let period = 1.0 + spacing.max(0.0);
    let f = x - (x / period).floor() * period;
    if f < 1.0 {
        triangle(f)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_shape() {
        assert_eq!(triangle(0.0), 0.0);
        assert_eq!(triangle(0.5), 1.0);
        assert!((triangle(0.25) - 0.5).abs() < 1e-6);
        assert!((triangle(1.75) - 0.5).abs() < 1e-6);
        assert!((triangle(-0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sawtooth_wraps() {
        assert!((sawtooth(2.25) - 0.25).abs() < 1e-6);
        assert!((sawtooth(-0.25) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_spaced_triangle_gap() {
        // Pulse in [0, 1), gap in [1, 3)
        assert_eq!(spaced_triangle(0.5, 2.0), 1.0);
        assert_eq!(spaced_triangle(1.5, 2.0), 0.0);
        assert_eq!(spaced_triangle(2.9, 2.0), 0.0);
        assert_eq!(spaced_triangle(3.5, 2.0), 1.0);
        // Zero spacing is a plain triangle
        assert!((spaced_triangle(1.25, 0.0) - triangle(1.25)).abs() < 1e-6);
    }
}
