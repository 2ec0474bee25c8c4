use bevy::prelude::*;
use bevy::state::state::FreelyMutableState;

use crate::FONT;

#[derive(Component)]
pub struct RestartButton;

/// Entities despawned by [`cleanup_marked_entities`].
#[derive(Component)]
pub struct CleanupMarker;

pub trait Restartable: Resource {
    fn reset(&mut self);
    fn initial_state() -> Self::State;
    type State: States + FreelyMutableState;
}

pub fn handle_restart<T: Restartable>(
    mut next_state: ResMut<NextState<T::State>>,
    mut restartable: ResMut<T>,
    interaction_query: Query<&Interaction, (Changed<Interaction>, With<RestartButton>)>,
) {
    for interaction in &interaction_query {
        if *interaction == Interaction::Pressed {
            restartable.reset();
            next_state.set(T::initial_state());
        }
    }
}

/// Spawns a small UI button that triggers [`handle_restart`] when pressed.
pub fn spawn_restart_button(commands: &mut Commands, asset_server: &AssetServer, label: &str) {
    commands
        .spawn((
            Button,
            Node {
                position_type: PositionType::Absolute,
                bottom: Val::Px(20.0),
                right: Val::Px(20.0),
                padding: UiRect::axes(Val::Px(14.0), Val::Px(8.0)),
                ..default()
            },
            BackgroundColor::from(Color::srgb(0.2, 0.2, 0.2)),
            RestartButton,
            CleanupMarker,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new(label),
                TextFont {
                    font: asset_server.load(FONT),
                    font_size: 20.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
        });
}

pub fn cleanup_marked_entities(mut commands: Commands, query: Query<Entity, With<CleanupMarker>>) {
    for entity in &query {
        commands.entity(entity).despawn_recursive();
    }
}
