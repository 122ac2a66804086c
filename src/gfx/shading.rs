//! Scalar helpers matching the WGSL builtins of the same name
//!
//! The CPU-side mirrors of the lighting and filter maths build on these, so
//! they behave exactly like the shaders.

/// Hermite interpolation between `edge0` and `edge1`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation, `a` at `t = 0` and `b` at `t = 1`
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(1.0, 2.0, 0.5), 0.0);
        assert_eq!(smoothstep(1.0, 2.0, 1.5), 0.5);
        assert_eq!(smoothstep(1.0, 2.0, 3.0), 1.0);
        assert_eq!(smoothstep(1.0, 1.0, 0.9), 0.0);
        assert_eq!(smoothstep(1.0, 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_mix() {
        assert_eq!(mix(2.0, 4.0, 0.0), 2.0);
        assert_eq!(mix(2.0, 4.0, 0.5), 3.0);
        assert_eq!(mix(2.0, 4.0, 1.0), 4.0);
    }
}
