use crate::geometry::{Matrix4x4, Vec3};

// focal plane distance used for exporter cameras
const DEFAULT_FOCUS_DISTANCE: f32 = 10.0;

/// Pinhole (or thin lens, if `lens_radius > 0`) camera described by its viewport.
///
/// A screen coordinate `(s, t)` in `[0, 1]^2` maps to the point
/// `lower_left_corner + s * horizontal + t * vertical`; `t = 0` is the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub origin: Vec3,
    pub lower_left_corner: Vec3,
    pub horizontal: Vec3,
    pub vertical: Vec3,
    pub u: Vec3,
    pub v: Vec3,
    pub lens_radius: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::look_at(
            Vec3::zero(),
            Vec3(0.0, 0.0, -1.0),
            Vec3(0.0, 1.0, 0.0),
            std::f32::consts::FRAC_PI_2,
            1.0,
        )
    }
}

impl Camera {
    /// Camera from raw viewport vectors, as provided by a scene exporter
    pub fn new(
        origin: Vec3,
        lower_left_corner: Vec3,
        horizontal: Vec3,
        vertical: Vec3,
        u: Vec3,
        v: Vec3,
    ) -> Camera {
        Camera {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius: 0.0,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn from_frame(
        origin: Vec3,
        u: Vec3,
        v: Vec3,
        w: Vec3,
        viewport_width: f32,
        viewport_height: f32,
        focus_distance: f32,
        lens_radius: f32,
    ) -> Camera {
        let horizontal = focus_distance * viewport_width * u;
        let vertical = focus_distance * viewport_height * v;
        let lower_left_corner = origin - horizontal / 2.0 - vertical / 2.0 - focus_distance * w;

        Camera {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius,
        }
    }

    /// Camera from a camera-to-world matrix whose columns are the right, up and backward axes
    /// plus the position. `fov` is in radians and is divided by the aspect ratio, matching
    /// how the host application reports its camera angle.
    pub fn from_camera_to_world(camera_to_world: &Matrix4x4, fov: f32, width: u32, height: u32) -> Camera {
        Camera::from_camera_to_world_with_lens(
            camera_to_world,
            fov,
            width,
            height,
            0.0,
            DEFAULT_FOCUS_DISTANCE,
        )
    }

    pub fn from_camera_to_world_with_lens(
        camera_to_world: &Matrix4x4,
        fov: f32,
        width: u32,
        height: u32,
        aperture: f32,
        focus_distance: f32,
    ) -> Camera {
        let aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
        let theta = fov / aspect_ratio;
        let h = f32::tan(theta / 2.0);
        let viewport_height = 2.0 * h;
        let viewport_width = aspect_ratio * viewport_height;

        Camera::from_frame(
            camera_to_world.column(3),
            camera_to_world.column(0),
            camera_to_world.column(1),
            camera_to_world.column(2),
            viewport_width,
            viewport_height,
            focus_distance,
            aperture / 2.0,
        )
    }

    // vfov in radians, aspect = width / height
    pub fn look_at(from: Vec3, target: Vec3, up: Vec3, vfov: f32, aspect: f32) -> Camera {
        let w = (from - target).unit();
        let u = Vec3::cross(up, w).unit();
        let v = Vec3::cross(w, u);

        let viewport_height = 2.0 * f32::tan(vfov / 2.0);
        let viewport_width = aspect * viewport_height;

        Camera::from_frame(from, u, v, w, viewport_width, viewport_height, 1.0, 0.0)
    }

    /// Point on the viewport for screen coordinate `(s, t)`
    pub fn viewport_point(&self, s: f32, t: f32) -> Vec3 {
        self.lower_left_corner + s * self.horizontal + t * self.vertical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn look_at_centers_on_target() {
        let camera = Camera::look_at(
            Vec3(0.0, 0.0, 5.0),
            Vec3::zero(),
            Vec3(0.0, 1.0, 0.0),
            std::f32::consts::FRAC_PI_2,
            2.0,
        );
        let center = camera.viewport_point(0.5, 0.5);
        assert_near(center, Vec3(0.0, 0.0, 4.0));
        assert_near(camera.horizontal, Vec3(4.0, 0.0, 0.0));
        assert_near(camera.vertical, Vec3(0.0, 2.0, 0.0));
        // t = 1 is the top of the viewport
        assert!(camera.viewport_point(0.5, 1.0).y() > center.y());
    }

    #[test]
    fn camera_to_world_uses_matrix_columns() {
        let m = Matrix4x4::translation(Vec3(1.0, 2.0, 3.0));
        let camera = Camera::from_camera_to_world(&m, std::f32::consts::FRAC_PI_2, 100, 100);

        assert_eq!(camera.origin, Vec3(1.0, 2.0, 3.0));
        assert_eq!(camera.u, Vec3(1.0, 0.0, 0.0));
        assert_eq!(camera.v, Vec3(0.0, 1.0, 0.0));
        // looks down -z at the focus distance
        assert_near(camera.viewport_point(0.5, 0.5), Vec3(1.0, 2.0, 3.0 - 10.0));
        assert_near(camera.horizontal, Vec3(20.0, 0.0, 0.0));
    }
}
