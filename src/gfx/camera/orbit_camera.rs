use cgmath::{Point3, Vector3};

/// Camera path circling a target at fixed height
///
/// Advances by a constant angle per frame. The eye sits on a circle of
/// `radius` around `center` (in the XZ plane) at height `height` and looks at
/// `target`.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub radius: f32,
    pub height: f32,
    pub center: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Angle advanced per call to [`OrbitCamera::advance`], in radians
    pub step: f32,
    angle: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            radius: 6.0,
            height: 3.0,
            center: Point3::new(0.0, 0.0, 0.7),
            target: Point3::new(0.0, 0.6, 0.7),
            up: Vector3::unit_y(),
            step: 0.9_f32.to_radians(),
            angle: 0.0,
        }
    }
}

impl OrbitCamera {
    pub fn new(radius: f32, height: f32, target: Point3<f32>) -> Self {
        Self {
            radius,
            height,
            center: Point3::new(target.x, 0.0, target.z),
            target,
            ..Default::default()
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle.rem_euclid(std::f32::consts::TAU);
    }

    pub fn advance(&mut self) {
        self.set_angle(self.angle + self.step);
    }

    pub fn eye(&self) -> Point3<f32> {
        Point3::new(
            self.center.x - self.radius * self.angle.sin(),
            self.height,
            self.center.z - self.radius * self.angle.cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::MetricSpace;

    #[test]
    fn test_eye_stays_on_circle() {
        let mut camera = OrbitCamera::default();
        for _ in 0..500 {
            camera.advance();
            let eye = camera.eye();
            let flat = Point3::new(eye.x, 0.0, eye.z);
            assert!((flat.distance(camera.center) - camera.radius).abs() < 1e-4);
            assert_eq!(eye.y, camera.height);
        }
    }

    #[test]
    fn test_angle_wraps() {
        let mut camera = OrbitCamera::default().with_step(1.0);
        for _ in 0..10 {
            camera.advance();
        }
        assert!(camera.angle() >= 0.0 && camera.angle() < std::f32::consts::TAU);
    }
}
