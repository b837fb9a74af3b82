//! View transforms: mapping between device pointer space and scene space.
//!
//! The rendering host owns the camera. The engine only reads it through the
//! [`ViewTransform`] capability, so any backend (a pan/zoom [`Camera`], a raw
//! [`Affine`] taken from the host's render state) can drive gestures.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use kurbo::{Affine, Point};

/// Read-only conversion between device coordinates and scene coordinates.
pub trait ViewTransform {
    /// Convert a device-space point (CSS pixels) to scene coordinates.
    fn to_scene(&self, device: Point) -> Point;

    /// Convert a scene-space point to device coordinates.
    fn to_device(&self, scene: Point) -> Point;

    /// Convert a device-space distance to a scene-space distance.
    fn device_distance_to_scene(&self, device_dist: f64) -> f64 {
        let origin = self.to_scene(Point::ZERO);
        let probe = self.to_scene(Point::new(device_dist, 0.0));
        origin.distance(probe)
    }
}

/// Camera state for pan/zoom.
///
/// `pan_x` / `pan_y` are in CSS pixels.
/// `zoom` is a scale factor (1.0 = no zoom).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: 1.0 }
    }
}

impl ViewTransform for Camera {
    fn to_scene(&self, device: Point) -> Point {
        Point::new((device.x - self.pan_x) / self.zoom, (device.y - self.pan_y) / self.zoom)
    }

    fn to_device(&self, scene: Point) -> Point {
        Point::new(scene.x * self.zoom + self.pan_x, scene.y * self.zoom + self.pan_y)
    }

    fn device_distance_to_scene(&self, device_dist: f64) -> f64 {
        device_dist / self.zoom
    }
}

/// A host-supplied scene-to-device matrix.
impl ViewTransform for Affine {
    fn to_scene(&self, device: Point) -> Point {
        self.inverse() * device
    }

    fn to_device(&self, scene: Point) -> Point {
        *self * scene
    }
}
