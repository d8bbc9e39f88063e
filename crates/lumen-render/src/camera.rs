//! Camera poses, the fly controller, and per-mode view/projection selection

use glam::{Mat4, Quat, Vec2, Vec3};

/// Where the fly camera starts and returns to on reset
pub const START_POSITION: Vec3 = Vec3::new(0.0, 0.0, -3.0);
/// Default look-at offset; normalized it is the default forward direction
/// for cameras and lights
pub const START_LOOK_AT: Vec3 = Vec3::new(0.0, 0.0, 3.0);

/// Vertical field of view of every perspective camera, in degrees
pub const FOV_Y_DEGREES: f32 = 90.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 200.0;

pub const MINIMAP_NEAR: f32 = 0.1;
pub const MINIMAP_FAR: f32 = 100.0;
pub const DEFAULT_MINIMAP_ORTHO_HEIGHT: f32 = 25.0;

/// Mouse-drag look sensitivity, radians per pixel
pub const LOOK_SPEED: f32 = 0.005;

/// Largest |forward.y| a pitch rotation may reach before it is refused
const MAX_PITCH_Y: f32 = 0.995;

/// Position plus orientation of anything that can be looked through
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::new(START_POSITION)
    }
}

impl CameraPose {
    /// Pose at `position` facing the default direction with world up
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            forward: START_LOOK_AT.normalize(),
            up: Vec3::Y,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    /// Screen-right direction in world space
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or(Vec3::X)
    }

    /// Axis in the horizontal plane perpendicular to forward
    fn horizontal_axis(&self) -> Vec3 {
        Vec3::Y.cross(self.forward).normalize_or(Vec3::X)
    }

    /// Yaw around world Y
    pub fn rotate_y(&mut self, angle: f32) {
        self.forward = (Quat::from_axis_angle(Vec3::Y, angle) * self.forward).normalize();
        let hor = self.horizontal_axis();
        self.up = self.forward.cross(hor).normalize_or(Vec3::Y);
    }

    /// Pitch around the horizontal axis
    pub fn rotate_x(&mut self, angle: f32) {
        let hor = self.horizontal_axis();
        let forward = (Quat::from_axis_angle(hor, angle) * self.forward).normalize();
        if forward.y.abs() > MAX_PITCH_Y {
            return;
        }
        self.forward = forward;
        self.up = self.forward.cross(hor).normalize_or(Vec3::Y);
    }

    /// Apply a mouse-drag delta in pixels (dragging moves the view with the cursor)
    pub fn look(&mut self, drag: Vec2) {
        let delta = -drag * LOOK_SPEED;
        if delta.x != 0.0 {
            self.rotate_y(delta.x);
        }
        if delta.y != 0.0 {
            self.rotate_x(delta.y);
        }
    }
}

/// Which pose and projection the main pass renders with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    Fly,
    ThirdPerson,
    Minimap,
    Light,
}

impl CameraMode {
    pub const ALL: [CameraMode; 4] = [
        CameraMode::Fly,
        CameraMode::ThirdPerson,
        CameraMode::Minimap,
        CameraMode::Light,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CameraMode::Fly => "Fly Camera",
            CameraMode::ThirdPerson => "Third Person Camera",
            CameraMode::Minimap => "Minimap Camera",
            CameraMode::Light => "Light Camera",
        }
    }

    /// Keyboard shortcut toggle between fly and third person
    pub fn toggled_view(self) -> Self {
        match self {
            CameraMode::Fly => CameraMode::ThirdPerson,
            _ => CameraMode::Fly,
        }
    }
}

/// Keys and mouse state sampled for one frame of fly movement
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlyInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    /// Shift: stronger acceleration and higher top speed
    pub fast: bool,
    /// Alt: low top speed
    pub slow: bool,
    /// Cursor movement in pixels while the look button is held
    pub look_drag: Vec2,
}

/// Velocity-based free-flight movement with decay
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlyController {
    pub velocity: Vec3,
}

impl FlyController {
    pub const ACCELERATION: f32 = 0.05;
    pub const MAX_SPEED: f32 = 1.0;
    pub const FAST_ACCELERATION: f32 = 1.0;
    pub const FAST_MAX_SPEED: f32 = 2.0;
    pub const SLOW_MAX_SPEED: f32 = 0.3;
    pub const DECAY: f32 = 0.6;
    pub const STOP_SPEED: f32 = 0.001;

    /// Advance `pose` by one frame of input
    pub fn apply(&mut self, pose: &mut CameraPose, input: &FlyInput) {
        let (mut acceleration, mut max_speed) = (Self::ACCELERATION, Self::MAX_SPEED);
        if input.fast {
            acceleration = Self::FAST_ACCELERATION;
            max_speed = Self::FAST_MAX_SPEED;
        }
        if input.slow {
            max_speed = Self::SLOW_MAX_SPEED;
        }

        let right = pose.right();
        let mut push = Vec3::ZERO;
        if input.left {
            push -= right;
        }
        if input.right {
            push += right;
        }
        if input.forward {
            push += pose.forward;
        }
        if input.back {
            push -= pose.forward;
        }
        if input.up {
            push += pose.up;
        }
        if input.down {
            push -= pose.up;
        }
        let push = push * acceleration;

        self.velocity += push;
        if self.velocity.length() > max_speed {
            self.velocity = self.velocity.normalize() * max_speed;
        }
        pose.position += self.velocity;

        if push == Vec3::ZERO {
            self.velocity *= Self::DECAY;
            if self.velocity.length() < Self::STOP_SPEED {
                self.velocity = Vec3::ZERO;
            }
        }

        pose.look(input.look_drag);
    }

    pub fn stop(&mut self) {
        self.velocity = Vec3::ZERO;
    }
}

/// Offsets of the third-person camera relative to the fly pose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThirdPersonSettings {
    pub follow_distance: f32,
    pub height_offset: f32,
    pub side_offset: f32,
}

impl Default for ThirdPersonSettings {
    fn default() -> Self {
        Self {
            follow_distance: 5.0,
            height_offset: 1.5,
            side_offset: 1.5,
        }
    }
}

/// Over-the-shoulder pose trailing `fly`
pub fn third_person_pose(fly: &CameraPose, settings: &ThirdPersonSettings) -> CameraPose {
    let side = fly.forward.cross(Vec3::Y).normalize_or(Vec3::X);
    let position = fly.position - settings.follow_distance * fly.forward
        + Vec3::new(0.0, settings.height_offset, 0.0)
        + side * settings.side_offset;
    CameraPose {
        position,
        forward: fly.forward,
        up: side.cross(fly.forward),
    }
}

/// Top-down pose above `fly`, with the top of the map pointing where `fly` faces
pub fn minimap_pose(fly: &CameraPose) -> CameraPose {
    let heading = Vec3::new(fly.forward.x, 0.0, fly.forward.z);
    CameraPose {
        position: fly.position,
        forward: Vec3::NEG_Y,
        up: heading.normalize_or(Vec3::Z),
    }
}

pub fn perspective(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(FOV_Y_DEGREES.to_radians(), aspect.max(1e-4), NEAR_PLANE, FAR_PLANE)
}

pub fn minimap_orthographic(half_height: f32, aspect: f32) -> Mat4 {
    let half_width = half_height * aspect;
    Mat4::orthographic_rh(
        -half_width,
        half_width,
        -half_height,
        half_height,
        MINIMAP_NEAR,
        MINIMAP_FAR,
    )
}

/// View and projection chosen for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameView {
    pub mode: CameraMode,
    pub pose: CameraPose,
    pub view: Mat4,
    pub projection: Mat4,
}

impl FrameView {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// The fly camera plus the poses derived from it
#[derive(Debug, Clone, Default)]
pub struct CameraRig {
    pub fly: CameraPose,
    pub controller: FlyController,
    pub third_person: ThirdPersonSettings,
}

impl CameraRig {
    pub fn reset_fly(&mut self) {
        self.fly = CameraPose::default();
        self.controller.stop();
    }

    pub fn update_fly(&mut self, input: &FlyInput) {
        self.controller.apply(&mut self.fly, input);
    }

    pub fn third_person_pose(&self) -> CameraPose {
        third_person_pose(&self.fly, &self.third_person)
    }

    pub fn minimap_pose(&self) -> CameraPose {
        minimap_pose(&self.fly)
    }

    /// Pose and projection for `mode`. `light` is the pose of the selected
    /// light, used in light mode.
    pub fn frame_view(
        &self,
        mode: CameraMode,
        aspect: f32,
        minimap_ortho_height: f32,
        light: &CameraPose,
    ) -> FrameView {
        let (pose, projection) = match mode {
            CameraMode::Fly => (self.fly, perspective(aspect)),
            CameraMode::ThirdPerson => (self.third_person_pose(), perspective(aspect)),
            CameraMode::Minimap => (
                self.minimap_pose(),
                minimap_orthographic(minimap_ortho_height, aspect),
            ),
            CameraMode::Light => (*light, perspective(aspect)),
        };
        FrameView {
            mode,
            pose,
            view: pose.view_matrix(),
            projection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn default_pose_faces_positive_z() {
        let pose = CameraPose::default();
        assert_eq!(pose.position, START_POSITION);
        assert!(close(pose.forward, Vec3::Z));
        assert!(close(pose.right(), Vec3::NEG_X));
    }

    #[test]
    fn yaw_keeps_up_vertical() {
        let mut pose = CameraPose::default();
        pose.rotate_y(std::f32::consts::FRAC_PI_2);
        assert!(close(pose.forward, Vec3::X));
        assert!(close(pose.up, Vec3::Y));
    }

    #[test]
    fn pitch_is_refused_at_the_pole() {
        let mut pose = CameraPose::default();
        pose.rotate_x(-std::f32::consts::FRAC_PI_2);
        assert!(close(pose.forward, Vec3::Z));
    }

    #[test]
    fn fly_accelerates_and_clamps() {
        let mut pose = CameraPose::default();
        let mut ctl = FlyController::default();
        let input = FlyInput {
            forward: true,
            ..Default::default()
        };
        ctl.apply(&mut pose, &input);
        assert!((ctl.velocity.length() - FlyController::ACCELERATION).abs() < 1e-6);
        for _ in 0..100 {
            ctl.apply(&mut pose, &input);
        }
        assert!((ctl.velocity.length() - FlyController::MAX_SPEED).abs() < 1e-5);
        assert!(pose.position.z > START_POSITION.z);
    }

    #[test]
    fn fly_decays_to_rest() {
        let mut pose = CameraPose::default();
        let mut ctl = FlyController {
            velocity: Vec3::new(0.0, 0.0, 1.0),
        };
        for _ in 0..20 {
            ctl.apply(&mut pose, &FlyInput::default());
        }
        assert_eq!(ctl.velocity, Vec3::ZERO);
    }

    #[test]
    fn slow_modifier_caps_speed() {
        let mut pose = CameraPose::default();
        let mut ctl = FlyController::default();
        let input = FlyInput {
            forward: true,
            fast: true,
            slow: true,
            ..Default::default()
        };
        ctl.apply(&mut pose, &input);
        assert!((ctl.velocity.length() - FlyController::SLOW_MAX_SPEED).abs() < 1e-6);
    }

    #[test]
    fn third_person_trails_behind_and_above() {
        let fly = CameraPose::new(Vec3::ZERO);
        let pose = third_person_pose(&fly, &ThirdPersonSettings::default());
        assert!(close(pose.position, Vec3::new(-1.5, 1.5, -5.0)));
        assert!(close(pose.forward, fly.forward));
        assert!(close(pose.up, Vec3::Y));
    }

    #[test]
    fn minimap_looks_down_with_heading_up() {
        let mut fly = CameraPose::new(Vec3::new(3.0, 2.0, 1.0));
        fly.rotate_y(std::f32::consts::FRAC_PI_2);
        let pose = minimap_pose(&fly);
        assert_eq!(pose.position, fly.position);
        assert_eq!(pose.forward, Vec3::NEG_Y);
        assert!(close(pose.up, Vec3::X));
    }

    #[test]
    fn minimap_mode_uses_orthographic_projection() {
        let rig = CameraRig::default();
        let light = CameraPose::new(Vec3::new(6.0, 3.0, -10.0));
        let ortho = rig.frame_view(CameraMode::Minimap, 2.0, 25.0, &light);
        assert_eq!(ortho.projection, minimap_orthographic(25.0, 2.0));
        let lit = rig.frame_view(CameraMode::Light, 2.0, 25.0, &light);
        assert_eq!(lit.view, light.view_matrix());
        assert_eq!(lit.projection, perspective(2.0));
    }

    #[test]
    fn view_toggle_returns_to_fly() {
        assert_eq!(CameraMode::Fly.toggled_view(), CameraMode::ThirdPerson);
        assert_eq!(CameraMode::ThirdPerson.toggled_view(), CameraMode::Fly);
        assert_eq!(CameraMode::Light.toggled_view(), CameraMode::Fly);
    }
}
