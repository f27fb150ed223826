//! Quaternion orbit camera over the scene's bounding box.

use glam::{Mat4, Quat, Vec3};
use scenejson::View;

pub struct Camera {
    pub rotate: Quat,
    pub translate: Vec3,
    /// Focal point the model is translated back by; Z scaled by
    /// `orientation`.
    pub focus: Vec3,
    /// Centre of rotation, normally equal to `focus`.
    pub centre: Vec3,
    pub scale: Vec3,
    /// +1 right-handed, -1 left-handed (flips Z).
    pub orientation: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near_clip: f32,
    pub far_clip: f32,

    pub min: Vec3,
    pub max: Vec3,
    pub dims: Vec3,
    pub model_size: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            rotate: Quat::IDENTITY,
            translate: Vec3::ZERO,
            focus: Vec3::ZERO,
            centre: Vec3::ZERO,
            scale: Vec3::ONE,
            orientation: 1.0,
            fov: 45.0,
            near_clip: 0.0,
            far_clip: 0.0,
            min: Vec3::ZERO,
            max: Vec3::ONE,
            dims: Vec3::ONE,
            model_size: 0.0,
        }
    }
}

impl Camera {
    /// Builds a camera from a scene view: bounding box first, then any
    /// saved rotation/translation/focus/scale on top of the derived
    /// defaults.
    pub fn from_view(view: &View) -> Self {
        let mut cam = Camera {
            orientation: view.orientation.unwrap_or(1.0),
            ..Camera::default()
        };
        let min = view.min.unwrap_or([0.0; 3]);
        let max = view.max.unwrap_or([1.0; 3]);
        cam.update_dims(Vec3::from(min), Vec3::from(max));

        if let Some(rotate) = &view.rotate {
            if rotate.len() == 4 {
                cam.rotate = Quat::from_xyzw(rotate[0], rotate[1], rotate[2], rotate[3]);
            } else if rotate.len() == 3 {
                cam.set_rotation_euler(rotate[0], rotate[1], rotate[2]);
            }
        }
        if let Some(t) = view.translate {
            cam.translate = Vec3::from(t);
        }
        if let Some(f) = view.focus {
            cam.focus = Vec3::from(f);
            cam.centre = cam.focus;
        }
        if let Some(s) = view.scale {
            cam.scale = Vec3::from(s);
        }
        if let Some(near) = view.near {
            cam.near_clip = near;
        }
        if let Some(far) = view.far {
            cam.far_clip = far;
        }
        cam
    }

    /// Recomputes model dimensions from a bounding box, recentres the
    /// focus and resets the pose. Camera distance and clip planes are
    /// only re-derived when the model size actually changed.
    pub fn update_dims(&mut self, min: Vec3, max: Vec3) {
        self.min = min;
        self.max = max;
        self.dims = max - min;
        let model_size = self.dims.length();
        self.focus = min + 0.5 * self.dims;
        self.centre = self.focus;
        self.translate = Vec3::ZERO;

        if model_size != self.model_size {
            self.model_size = model_size;
            self.translate.z = -self.model_size * 1.25;
            if self.near_clip == 0.0 {
                self.near_clip = self.model_size / 10.0;
            }
            if self.far_clip == 0.0 {
                self.far_clip = self.model_size * 10.0;
            }
        }
        self.rotate = Quat::IDENTITY;
    }

    /// A view with no Z extent is flat; camera moves never change its
    /// draw order.
    pub fn is_flat(&self) -> bool {
        self.dims.z == 0.0
    }

    fn rotate_axis(&mut self, axis: Vec3, degrees: f32) {
        let q = Quat::from_axis_angle(axis, degrees.to_radians());
        self.rotate = q * self.rotate;
    }

    pub fn rotate_x(&mut self, degrees: f32) {
        self.rotate_axis(Vec3::X, degrees);
    }

    pub fn rotate_y(&mut self, degrees: f32) {
        self.rotate_axis(Vec3::Y, degrees);
    }

    pub fn rotate_z(&mut self, degrees: f32) {
        self.rotate_axis(Vec3::Z, degrees);
    }

    /// Saved 3-angle rotations apply as -Z, -Y, -X in degrees.
    pub fn set_rotation_euler(&mut self, x: f32, y: f32, z: f32) {
        self.rotate = Quat::IDENTITY;
        self.rotate_z(-z);
        self.rotate_y(-y);
        self.rotate_x(-x);
    }

    /// Dolly along Z, scaled down 10x once inside the model, clamped so
    /// the camera cannot pass far beyond the focal plane.
    pub fn zoom(&mut self, factor: f32) {
        let mut adj = factor * self.model_size;
        if self.translate.z.abs() < self.model_size {
            adj *= 0.1;
        }
        self.translate.z += adj;
        if self.translate.z > self.model_size * 0.3 {
            self.translate.z = self.model_size * 0.3;
        }
    }

    /// Moves the near clip plane, never closer than 0.1% of model size.
    pub fn zoom_clip(&mut self, factor: f32) {
        let adj = self.near_clip + factor * self.model_size;
        if adj >= self.model_size * 0.001 {
            self.near_clip = adj;
        }
    }

    /// Model-view matrix: translate, shift to the rotation centre,
    /// rotate, scale, shift back, then translate by the negated focal
    /// point (Z scaled by orientation).
    pub fn model_view(&self) -> Mat4 {
        let adjust = self.centre - self.focus;
        Mat4::from_translation(self.translate)
            * Mat4::from_translation(adjust)
            * Mat4::from_quat(self.rotate)
            * Mat4::from_scale(self.scale)
            * Mat4::from_translation(-adjust)
            * Mat4::from_translation(Vec3::new(
                -self.focus.x,
                -self.focus.y,
                -self.focus.z * self.orientation,
            ))
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near_clip, self.far_clip)
    }

    /// Writes the pose back into a scene view for export.
    pub fn write_to_view(&self, view: &mut View) {
        view.rotate = Some(vec![
            self.rotate.x,
            self.rotate.y,
            self.rotate.z,
            self.rotate.w,
        ]);
        view.translate = Some(self.translate.into());
        view.focus = Some(self.focus.into());
        view.scale = Some(self.scale.into());
        view.near = Some(self.near_clip);
        view.far = Some(self.far_clip);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_camera() -> Camera {
        let mut cam = Camera::default();
        cam.update_dims(Vec3::ZERO, Vec3::ONE);
        cam
    }

    #[test]
    fn update_dims_derives_pose_and_clip() {
        let cam = unit_camera();
        let size = 3f32.sqrt();
        assert!((cam.model_size - size).abs() < 1e-6);
        assert!((cam.translate.z + size * 1.25).abs() < 1e-6);
        assert!((cam.near_clip - size / 10.0).abs() < 1e-6);
        assert!((cam.far_clip - size * 10.0).abs() < 1e-6);
        assert_eq!(cam.focus, Vec3::splat(0.5));
    }

    #[test]
    fn same_size_box_keeps_camera_distance_untouched() {
        let mut cam = unit_camera();
        cam.translate.z = -9.0;
        // Shifted box, identical dimensions
        cam.update_dims(Vec3::ONE, Vec3::splat(2.0));
        assert_eq!(cam.translate.z, 0.0);
        assert_eq!(cam.focus, Vec3::splat(1.5));
    }

    #[test]
    fn zoom_clamps_at_the_focal_plane() {
        let mut cam = unit_camera();
        for _ in 0..100 {
            cam.zoom(0.5);
        }
        assert!(cam.translate.z <= cam.model_size * 0.3 + 1e-6);
    }

    #[test]
    fn zoom_is_damped_inside_the_model() {
        let mut cam = unit_camera();
        cam.translate.z = -cam.model_size * 0.5;
        let before = cam.translate.z;
        cam.zoom(0.1);
        let moved = cam.translate.z - before;
        assert!((moved - 0.1 * cam.model_size * 0.1).abs() < 1e-6);
    }

    #[test]
    fn flat_view_detected_from_z_extent() {
        let mut cam = Camera::default();
        cam.update_dims(Vec3::ZERO, Vec3::new(2.0, 2.0, 0.0));
        assert!(cam.is_flat());
        assert!(!unit_camera().is_flat());
    }

    #[test]
    fn model_view_translates_focus_to_origin() {
        let mut cam = unit_camera();
        cam.translate = Vec3::ZERO;
        let p = cam.model_view().transform_point3(cam.focus);
        assert!(p.length() < 1e-6);
    }

    #[test]
    fn rotations_premultiply() {
        let mut cam = unit_camera();
        cam.rotate_y(90.0);
        cam.rotate_x(90.0);
        let expected = Quat::from_axis_angle(Vec3::X, 90f32.to_radians())
            * Quat::from_axis_angle(Vec3::Y, 90f32.to_radians());
        assert!(cam.rotate.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn view_round_trip() {
        let mut cam = unit_camera();
        cam.rotate_y(30.0);
        cam.translate.x = 0.25;
        let mut view = View::default();
        cam.write_to_view(&mut view);

        view.min = Some([0.0; 3]);
        view.max = Some([1.0; 3]);
        let restored = Camera::from_view(&view);
        assert!(cam.rotate.dot(restored.rotate).abs() > 0.9999);
        assert_eq!(cam.translate, restored.translate);
    }
}
