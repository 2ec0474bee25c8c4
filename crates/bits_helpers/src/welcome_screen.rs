use bevy::prelude::*;

use crate::{FONT, WINDOW_HEIGHT, WINDOW_WIDTH};

#[derive(Component)]
pub struct WelcomeScreenElement;

/// Full-screen title card with a "Tap to start" prompt below `title` and `subtitle`.
pub fn spawn_welcome_screen_text(
    commands: &mut Commands,
    asset_server: &AssetServer,
    title: &str,
    subtitle: &str,
) {
    commands.spawn((
        Sprite::from_color(Color::BLACK, Vec2::new(WINDOW_WIDTH, WINDOW_HEIGHT)),
        Transform::from_xyz(0.0, 0.0, 50.0),
        WelcomeScreenElement,
    ));

    let lines = [
        (title, 36.0, WINDOW_HEIGHT / 4.0),
        (subtitle, 22.0, 0.0),
        ("Tap to start", 30.0, -WINDOW_HEIGHT / 4.0),
    ];
    for (text, font_size, y) in lines {
        commands.spawn((
            Text2d::new(text),
            TextFont {
                font: asset_server.load(FONT),
                font_size,
                ..default()
            },
            TextColor(Color::WHITE),
            TextLayout::new_with_justify(JustifyText::Center),
            Transform::from_xyz(0.0, y, 51.0),
            WelcomeScreenElement,
        ));
    }
}

pub fn despawn_welcome_screen(
    mut commands: Commands,
    welcome_elements: Query<Entity, With<WelcomeScreenElement>>,
) {
    for entity in &welcome_elements {
        commands.entity(entity).despawn_recursive();
    }
}
