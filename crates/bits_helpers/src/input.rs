use bevy::prelude::*;

fn to_world(camera: &Query<(&Camera, &GlobalTransform)>, screen: Vec2) -> Option<Vec2> {
    let (camera, camera_transform) = camera.get_single().ok()?;
    camera
        .viewport_to_world(camera_transform, screen)
        .map(|ray| ray.origin.truncate())
        .ok()
}

fn cursor_position(windows: &Query<&Window>) -> Option<Vec2> {
    windows.get_single().ok()?.cursor_position()
}

pub fn just_pressed_screen_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
) -> Option<Vec2> {
    if button_input.just_pressed(MouseButton::Left) {
        cursor_position(windows)
    } else if touch_input.any_just_pressed() {
        let touch = touch_input.iter_just_pressed().next()?;
        Some(touch.position())
    } else {
        None
    }
}

pub fn just_pressed_world_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let position = just_pressed_screen_position(button_input, touch_input, windows)?;
    to_world(camera, position)
}

/// Position of a pointer that is currently held down, mouse first, then the first touch.
pub fn held_screen_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
) -> Option<Vec2> {
    if button_input.pressed(MouseButton::Left) {
        cursor_position(windows)
    } else {
        touch_input.iter().next().map(|touch| touch.position())
    }
}

pub fn held_world_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let position = held_screen_position(button_input, touch_input, windows)?;
    to_world(camera, position)
}

/// Whether the pointer was let go this frame, even where no position is known.
pub fn pointer_just_released(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
) -> bool {
    button_input.just_released(MouseButton::Left)
        || touch_input.any_just_released()
        || touch_input.any_just_canceled()
}

pub fn just_released_screen_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
) -> Option<Vec2> {
    if button_input.just_released(MouseButton::Left) {
        cursor_position(windows)
    } else if touch_input.any_just_released() {
        let touch = touch_input.iter_just_released().next()?;
        Some(touch.position())
    } else {
        None
    }
}

pub fn just_released_world_position(
    button_input: &Res<ButtonInput<MouseButton>>,
    touch_input: &Res<Touches>,
    windows: &Query<&Window>,
    camera: &Query<(&Camera, &GlobalTransform)>,
) -> Option<Vec2> {
    let position = just_released_screen_position(button_input, touch_input, windows)?;
    to_world(camera, position)
}
