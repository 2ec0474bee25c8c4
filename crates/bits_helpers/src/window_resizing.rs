use bevy::prelude::*;

/// Largest surface wgpu accepts on the devices we ship to.
pub const MAX_CANVAS_EXTENT: f32 = 2048.0;

/// Canvas size for a browser viewport of `width` x `height`, or `None` when the window
/// already has it.
pub fn canvas_resize_target(current: Vec2, width: f32, height: f32) -> Option<Vec2> {
    if (current.x - width).abs() <= f32::EPSILON && (current.y - height).abs() <= f32::EPSILON {
        return None;
    }
    Some(Vec2::new(
        width.min(MAX_CANVAS_EXTENT),
        height.min(MAX_CANVAS_EXTENT),
    ))
}

#[cfg(target_arch = "wasm32")]
pub fn handle_browser_resize(
    mut primary_query: Query<&mut Window, With<bevy::window::PrimaryWindow>>,
) {
    let Some(wasm_window) = web_sys::window() else {
        return;
    };
    let (Ok(inner_width), Ok(inner_height)) = (wasm_window.inner_width(), wasm_window.inner_height())
    else {
        return;
    };
    let (Some(width), Some(height)) = (inner_width.as_f64(), inner_height.as_f64()) else {
        return;
    };

    for mut window in &mut primary_query {
        let current = Vec2::new(window.resolution.width(), window.resolution.height());
        if let Some(target) = canvas_resize_target(current, width as f32, height as f32) {
            window.resolution.set(target.x, target.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_is_left_alone() {
        assert_eq!(
            canvas_resize_target(Vec2::new(360., 640.), 360., 640.),
            None,
            "no resize without a change"
        );
    }

    #[test]
    fn large_viewports_are_clamped() {
        assert_eq!(
            canvas_resize_target(Vec2::new(360., 640.), 1284., 2418.),
            Some(Vec2::new(1284., MAX_CANVAS_EXTENT)),
            "height exceeds the surface limit"
        );
    }
}
