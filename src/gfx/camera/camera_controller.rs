use winit::{
    event::{DeviceEvent, ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Movement requested by the controller for one frame, in camera space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraMotion {
    pub right: f32,
    pub up: f32,
    pub forward: f32,
    pub yaw: f32,
    pub pitch: f32,
}

/// Keyboard move / mouse-drag look.
///
/// Input is accumulated between frames and turned into a [`CameraMotion`]
/// scaled by the frame's delta time.
#[derive(Debug, Clone)]
pub struct CameraController {
    pub move_speed: f32,
    pub look_speed: f32,
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    is_mouse_pressed: bool,
    pending_look: (f32, f32),
}

impl CameraController {
    pub fn new(move_speed: f32, look_speed: f32) -> Self {
        Self {
            move_speed,
            look_speed,
            forward: false,
            backward: false,
            left: false,
            right: false,
            up: false,
            down: false,
            is_mouse_pressed: false,
            pending_look: (0.0, 0.0),
        }
    }

    pub fn process_events(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.set_mouse_pressed(*state == ElementState::Pressed);
            }
            DeviceEvent::MouseMotion { delta } => {
                self.add_mouse_delta(delta.0 as f32, delta.1 as f32);
            }
            _ => (),
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            self.set_key(code, event.state == ElementState::Pressed);
        }
    }

    /// Returns whether the key is bound to a movement.
    pub fn set_key(&mut self, code: KeyCode, pressed: bool) -> bool {
        let flag = match code {
            KeyCode::KeyW | KeyCode::ArrowUp => &mut self.forward,
            KeyCode::KeyS | KeyCode::ArrowDown => &mut self.backward,
            KeyCode::KeyA | KeyCode::ArrowLeft => &mut self.left,
            KeyCode::KeyD | KeyCode::ArrowRight => &mut self.right,
            KeyCode::Space => &mut self.up,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => &mut self.down,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    pub fn set_mouse_pressed(&mut self, pressed: bool) {
        self.is_mouse_pressed = pressed;
    }

    /// Mouse motion only looks around while the button is held.
    pub fn add_mouse_delta(&mut self, dx: f32, dy: f32) {
        if self.is_mouse_pressed {
            self.pending_look.0 += dx;
            self.pending_look.1 += dy;
        }
    }

    /// Consumes accumulated look input and returns this frame's motion.
    pub fn take_motion(&mut self, dt: f32) -> CameraMotion {
        let axis = |positive: bool, negative: bool| (positive as i8 - negative as i8) as f32;
        let step = self.move_speed * dt;
        let (dx, dy) = std::mem::take(&mut self.pending_look);

        CameraMotion {
            right: axis(self.right, self.left) * step,
            up: axis(self.up, self.down) * step,
            forward: axis(self.forward, self.backward) * step,
            yaw: dx * self.look_speed,
            pitch: -dy * self.look_speed,
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(2.0, 0.003)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motion_scales_with_delta_time() {
        let mut controller = CameraController::new(2.0, 0.01);
        assert!(controller.set_key(KeyCode::KeyW, true));
        let motion = controller.take_motion(0.5);
        assert_eq!(motion.forward, 1.0);
        assert_eq!(motion.right, 0.0);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut controller = CameraController::default();
        controller.set_key(KeyCode::KeyA, true);
        controller.set_key(KeyCode::KeyD, true);
        assert_eq!(controller.take_motion(1.0).right, 0.0);
    }

    #[test]
    fn test_look_needs_mouse_button_and_is_consumed() {
        let mut controller = CameraController::new(1.0, 0.5);
        controller.add_mouse_delta(10.0, 0.0);
        assert_eq!(controller.take_motion(0.1).yaw, 0.0);

        controller.set_mouse_pressed(true);
        controller.add_mouse_delta(10.0, 4.0);
        let motion = controller.take_motion(0.1);
        assert_eq!(motion.yaw, 5.0);
        assert_eq!(motion.pitch, -2.0);
        assert_eq!(controller.take_motion(0.1), CameraMotion::default());
    }

    #[test]
    fn test_unbound_key_is_ignored() {
        let mut controller = CameraController::default();
        assert!(!controller.set_key(KeyCode::KeyZ, true));
    }
}
