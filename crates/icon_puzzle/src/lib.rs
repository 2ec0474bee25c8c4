use std::time::Duration;

use bevy::asset::LoadState;
use bevy::ecs::system::EntityCommands;
use bevy::prelude::*;
use bits_helpers::input::{
    held_world_position, just_pressed_world_position, just_released_world_position,
    pointer_just_released,
};
use bits_helpers::restart::{
    cleanup_marked_entities, handle_restart, spawn_restart_button, CleanupMarker, Restartable,
};
use bits_helpers::welcome_screen::{despawn_welcome_screen, spawn_welcome_screen_text};
use bits_helpers::{send_bit_message, FONT};
use ribbit::IconPuzzle;
use ribbit_bits::BitMessage;

pub mod completion;
pub mod config;
pub mod game;
pub mod grid;
pub mod placement;
pub mod progression;
pub mod session;
pub mod storage;
pub mod tiles;

mod ribbit;

use config::PuzzleConfig;
use game::{GamePhase, IconPuzzleGame, MiniGameResult, SessionHost};
use progression::ProgressionOutcome;
use session::PuzzleSession;
use storage::PlatformStore;

const FRAME_MARGIN: f32 = 8.;
const TILE_GAP: f32 = 2.;
const SETTLE_SPEED: f32 = 12.;
const BOARD_Y: f32 = -20.;

#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash)]
enum GameState {
    #[default]
    Welcome,
    Playing,
    Solved,
    Decided,
    Finished,
}

#[derive(Resource, Deref, DerefMut)]
struct PuzzleGame(IconPuzzleGame<PlatformStore>);

impl Restartable for PuzzleGame {
    fn reset(&mut self) {
        if let Err(err) = self.reset_puzzle() {
            warn!("Nothing to reshuffle: {err}");
        }
    }

    fn initial_state() -> Self::State {
        GameState::Playing
    }

    type State = GameState;
}

struct SolvedIcon {
    title: String,
    story: String,
}

/// Collects what the puzzle reports back to its host until the UI picks it up.
#[derive(Resource, Default)]
struct HostInbox {
    gate_open: bool,
    solved: Option<SolvedIcon>,
    finished: Option<MiniGameResult>,
}

impl SessionHost for HostInbox {
    fn can_start(&self) -> bool {
        self.gate_open
    }

    fn on_puzzle_solved(&mut self, id: u32, title: &str, story: &str) {
        info!("Icon {id} solved: {title}");
        self.solved = Some(SolvedIcon {
            title: title.to_owned(),
            story: story.to_owned(),
        });
    }

    fn on_session_finished(&mut self, result: MiniGameResult) {
        self.finished = Some(result);
    }
}

/// Which board the tile sprites currently show.
#[derive(Resource, Default)]
struct BoardView {
    serial: u64,
    image: Handle<Image>,
    spawned: bool,
}

#[derive(Component)]
struct TileVisual {
    id: usize,
}

#[derive(Component)]
struct HudText;

#[derive(Component)]
struct SolvedPopup;

#[derive(Component)]
struct SettleTimer {
    timer: Timer,
}

#[derive(Component, Clone, Copy)]
enum DecisionButton {
    Next,
    Finish,
}

pub fn run() {
    let config = PuzzleConfig::bundled();
    let game = IconPuzzleGame::new(config.clone(), PlatformStore::platform_default());

    bits_helpers::get_default_app::<IconPuzzle>(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .init_state::<GameState>()
        .insert_resource(config)
        .insert_resource(PuzzleGame(game))
        .init_resource::<HostInbox>()
        .init_resource::<BoardView>()
        .add_systems(Startup, setup)
        .add_systems(OnEnter(GameState::Welcome), spawn_welcome)
        .add_systems(
            OnExit(GameState::Welcome),
            (despawn_welcome_screen, spawn_board),
        )
        .add_systems(OnEnter(GameState::Playing), spawn_playing_ui)
        .add_systems(OnExit(GameState::Playing), cleanup_marked_entities)
        .add_systems(OnEnter(GameState::Solved), start_settle_timer)
        .add_systems(OnExit(GameState::Solved), cleanup_marked_entities)
        .add_systems(OnEnter(GameState::Decided), spawn_decision_buttons)
        .add_systems(OnExit(GameState::Decided), cleanup_marked_entities)
        .add_systems(OnEnter(GameState::Finished), spawn_finished_screen)
        .add_systems(OnExit(GameState::Finished), cleanup_marked_entities)
        .add_systems(
            Update,
            (
                (handle_welcome_input, start_when_gate_open)
                    .chain()
                    .run_if(in_state(GameState::Welcome)),
                (
                    refresh_board,
                    spawn_tiles_when_loaded,
                    handle_drag_input,
                    handle_restart::<PuzzleGame>,
                )
                    .chain()
                    .run_if(in_state(GameState::Playing)),
                (show_solved_popup, handle_popup_tap)
                    .chain()
                    .run_if(in_state(GameState::Solved)),
                handle_decision_buttons.run_if(in_state(GameState::Decided)),
                handle_finished_tap.run_if(in_state(GameState::Finished)),
                sync_tile_transforms,
                update_hud,
            ),
        )
        .run();
}

fn setup(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn spawn_welcome(mut commands: Commands, asset_server: Res<AssetServer>, game: Res<PuzzleGame>) {
    spawn_welcome_screen_text(
        &mut commands,
        &asset_server,
        "Icon Puzzle",
        &game.requirement_text(),
    );
}

fn handle_welcome_input(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut inbox: ResMut<HostInbox>,
) {
    if just_pressed_world_position(&mouse_input, &touch_input, &windows, &camera).is_some() {
        inbox.gate_open = true;
    }
}

fn start_when_gate_open(
    mut game: ResMut<PuzzleGame>,
    inbox: Res<HostInbox>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if inbox.gate_open && game.try_start(&*inbox) {
        next_state.set(GameState::Playing);
    }
}

fn spawn_board(mut commands: Commands, asset_server: Res<AssetServer>, config: Res<PuzzleConfig>) {
    let frame = config.board_size + FRAME_MARGIN * 2.;
    commands
        .spawn((
            Sprite::from_color(Color::WHITE, Vec2::splat(frame)),
            Transform::from_xyz(0., BOARD_Y, -10.),
        ))
        .with_children(|parent| {
            parent.spawn((
                Sprite::from_color(Color::BLACK, Vec2::splat(config.board_size)),
                Transform::from_xyz(0., 0., 5.),
            ));
        });

    commands.spawn((
        Text::new(""),
        TextFont {
            font: asset_server.load(FONT),
            font_size: 20.,
            ..default()
        },
        TextColor(Color::WHITE),
        TextLayout::new_with_justify(JustifyText::Center),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(16.),
            width: Val::Percent(100.),
            ..default()
        },
        HudText,
    ));
}

fn spawn_playing_ui(mut commands: Commands, asset_server: Res<AssetServer>) {
    spawn_restart_button(&mut commands, &asset_server, "Shuffle");
}

fn board_to_world(session: &PuzzleSession, position: Vec2) -> Vec2 {
    session.board().origin_to_world(position) + Vec2::new(0., BOARD_Y)
}

fn world_to_board(session: &PuzzleSession, world: Vec2) -> Vec2 {
    session.board().world_to_board(world - Vec2::new(0., BOARD_Y))
}

/// Pointer travel in board space, where y points down.
fn board_offset(start: Vec2, world: Vec2) -> Vec2 {
    let delta = world - start;
    Vec2::new(delta.x, -delta.y)
}

/// Despawns the tile sprites when a new board has been dealt and starts loading its icon.
fn refresh_board(
    mut commands: Commands,
    game: Res<PuzzleGame>,
    mut view: ResMut<BoardView>,
    asset_server: Res<AssetServer>,
    tiles: Query<Entity, With<TileVisual>>,
) {
    if view.serial == game.serial() {
        return;
    }
    for entity in &tiles {
        commands.entity(entity).despawn_recursive();
    }
    let Some(definition) = game.current_definition() else {
        return;
    };
    view.serial = game.serial();
    view.image = asset_server.load(definition.image_path());
    view.spawned = false;
}

fn spawn_tiles_when_loaded(
    mut commands: Commands,
    game: Res<PuzzleGame>,
    mut view: ResMut<BoardView>,
    images: Res<Assets<Image>>,
    asset_server: Res<AssetServer>,
) {
    if view.spawned {
        return;
    }
    let Some(session) = game.session() else {
        return;
    };
    let board = session.board();
    let tile_size = Vec2::splat(board.tile_size() - TILE_GAP);

    if let Some(image) = images.get(&view.image) {
        let image_size = image.size().as_vec2();
        for tile in session.tiles() {
            let position = board_to_world(session, tile.position);
            commands.spawn((
                Sprite {
                    image: view.image.clone(),
                    rect: Some(tile.source_rect(image_size, board.grid_size())),
                    custom_size: Some(tile_size),
                    ..default()
                },
                Transform::from_translation(position.extend(1.)),
                TileVisual { id: tile.id },
            ));
        }
    } else if matches!(asset_server.load_state(&view.image), LoadState::Failed(_)) {
        warn!("Icon image unavailable, showing numbered tiles");
        for tile in session.tiles() {
            let position = board_to_world(session, tile.position);
            commands
                .spawn((
                    Sprite::from_color(Color::WHITE, tile_size),
                    Transform::from_translation(position.extend(1.)),
                    TileVisual { id: tile.id },
                ))
                .with_child((
                    Text2d::new((tile.id + 1).to_string()),
                    TextFont {
                        font: asset_server.load(FONT),
                        font_size: tile_size.y * 0.6,
                        ..default()
                    },
                    TextColor(Color::BLACK),
                    Transform::from_xyz(0., 0., 10.),
                ));
        }
    } else {
        return;
    }
    view.spawned = true;
}

/// What the active drag does with this frame's pointer state.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerUpdate {
    Release(Vec2),
    /// Released or canceled where no position is known.
    Lost,
    Move(Vec2),
    /// Still pressed but outside the window, the last offset stays.
    Hold,
}

fn pointer_update(
    released: bool,
    release_at: Option<Vec2>,
    held_at: Option<Vec2>,
    still_down: bool,
) -> PointerUpdate {
    match (released, release_at, held_at) {
        (true, Some(world), _) => PointerUpdate::Release(world),
        (true, None, _) => PointerUpdate::Lost,
        (false, _, Some(world)) => PointerUpdate::Move(world),
        (false, _, None) if still_down => PointerUpdate::Hold,
        (false, _, None) => PointerUpdate::Lost,
    }
}

fn handle_drag_input(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut game: ResMut<PuzzleGame>,
    mut inbox: ResMut<HostInbox>,
    mut drag_start: Local<Option<Vec2>>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if drag_start.is_some() && game.session().and_then(PuzzleSession::drag).is_none() {
        // The board was reshuffled under the pointer.
        *drag_start = None;
    }

    if let Some(start) = *drag_start {
        let still_down =
            mouse_input.pressed(MouseButton::Left) || touch_input.iter().next().is_some();
        let update = pointer_update(
            pointer_just_released(&mouse_input, &touch_input),
            just_released_world_position(&mouse_input, &touch_input, &windows, &camera),
            held_world_position(&mouse_input, &touch_input, &windows, &camera),
            still_down,
        );
        let result = match update {
            PointerUpdate::Release(world) => {
                game.release(board_offset(start, world), &mut *inbox)
            }
            PointerUpdate::Lost => game.cancel_drag(&mut *inbox),
            PointerUpdate::Move(world) => {
                if let Err(err) = game.drag_to(board_offset(start, world)) {
                    warn!("Drag update ignored: {err}");
                }
                return;
            }
            PointerUpdate::Hold => return,
        };
        *drag_start = None;
        match result {
            Ok(outcome) => {
                debug!("Release: {:?} after {} moves", outcome.effect, outcome.move_count);
                if outcome.solved {
                    next_state.set(GameState::Solved);
                }
            }
            Err(err) => warn!("Release ignored: {err}"),
        }
        return;
    }

    let Some(world) = just_pressed_world_position(&mouse_input, &touch_input, &windows, &camera)
    else {
        return;
    };
    let Some(tile_id) = game
        .session()
        .and_then(|session| session.tile_at(world_to_board(session, world)))
    else {
        return;
    };
    match game.begin_drag(tile_id) {
        Ok(()) => *drag_start = Some(world),
        Err(err) => warn!("Drag rejected: {err}"),
    }
}

fn sync_tile_transforms(
    game: Res<PuzzleGame>,
    time: Res<Time>,
    mut tiles: Query<(&TileVisual, &mut Transform)>,
) {
    let Some(session) = game.session() else {
        return;
    };
    let blend = (time.delta_secs() * SETTLE_SPEED).min(1.);
    for (visual, mut transform) in &mut tiles {
        let Some(position) = session.display_position(visual.id) else {
            continue;
        };
        let dragged = session
            .drag()
            .is_some_and(|drag| drag.tile_id == visual.id);
        let target = board_to_world(session, position).extend(if dragged { 10. } else { 1. });
        transform.translation = if dragged {
            target
        } else {
            transform.translation.lerp(target, blend)
        };
    }
}

fn update_hud(game: Res<PuzzleGame>, mut texts: Query<(&mut Text, Ref<HudText>)>) {
    let refresh = game.is_changed();
    for (mut text, hud) in &mut texts {
        if !refresh && !hud.is_added() {
            continue;
        }
        **text = format!(
            "Moves: {}\n{}\n{}",
            game.move_count(),
            game.progress_text(),
            game.requirement_text()
        );
    }
}

fn start_settle_timer(mut commands: Commands, config: Res<PuzzleConfig>) {
    commands.spawn((
        SettleTimer {
            timer: Timer::new(Duration::from_millis(config.settle_delay_ms), TimerMode::Once),
        },
        CleanupMarker,
    ));
}

fn spawn_overlay<'a>(commands: &'a mut Commands, marker: impl Bundle) -> EntityCommands<'a> {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.),
            height: Val::Percent(100.),
            flex_direction: FlexDirection::Column,
            align_items: AlignItems::Center,
            justify_content: JustifyContent::SpaceEvenly,
            padding: UiRect::all(Val::Px(24.)),
            ..default()
        },
        BackgroundColor::from(Color::srgba(0., 0., 0., 0.8)),
        CleanupMarker,
        marker,
    ))
}

fn overlay_text(text: impl Into<String>, font_size: f32, asset_server: &AssetServer) -> impl Bundle {
    (
        Text::new(text),
        TextFont {
            font: asset_server.load(FONT),
            font_size,
            ..default()
        },
        TextColor(Color::WHITE),
        TextLayout::new_with_justify(JustifyText::Center),
    )
}

fn show_solved_popup(
    mut commands: Commands,
    time: Res<Time>,
    asset_server: Res<AssetServer>,
    mut timers: Query<(Entity, &mut SettleTimer)>,
    mut inbox: ResMut<HostInbox>,
) {
    for (entity, mut settle) in &mut timers {
        settle.timer.tick(time.delta());
        if !settle.timer.finished() {
            continue;
        }
        commands.entity(entity).despawn();

        let Some(icon) = inbox.solved.take() else {
            continue;
        };
        spawn_overlay(&mut commands, SolvedPopup).with_children(|parent| {
            parent.spawn(overlay_text(icon.title, 28., &asset_server));
            parent.spawn(overlay_text(icon.story, 18., &asset_server));
            parent.spawn(overlay_text("Tap to continue", 22., &asset_server));
        });
    }
}

fn handle_popup_tap(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    popups: Query<(), With<SolvedPopup>>,
    mut game: ResMut<PuzzleGame>,
    mut inbox: ResMut<HostInbox>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if popups.is_empty()
        || just_pressed_world_position(&mouse_input, &touch_input, &windows, &camera).is_none()
    {
        return;
    }
    match game.acknowledge(&mut *inbox) {
        Ok(ProgressionOutcome::AllComplete) => next_state.set(GameState::Finished),
        Ok(_) => next_state.set(GameState::Decided),
        Err(err) => warn!("Acknowledge ignored: {err}"),
    }
}

fn spawn_decision_buttons(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    game: Res<PuzzleGame>,
) {
    let GamePhase::Decided(outcome) = game.phase() else {
        return;
    };
    let (message, buttons): (&str, &[(DecisionButton, &str)]) = match outcome {
        ProgressionOutcome::MustContinue => (
            "Solve more icons to complete this place",
            &[(DecisionButton::Next, "Next puzzle")],
        ),
        ProgressionOutcome::MayContinueOrFinish => (
            "You may keep going or finish now",
            &[
                (DecisionButton::Next, "Next puzzle"),
                (DecisionButton::Finish, "Finish"),
            ],
        ),
        ProgressionOutcome::AllComplete => ("Every icon is complete", &[]),
    };

    let requirement = game.requirement_text();
    spawn_overlay(&mut commands, ()).with_children(|parent| {
        parent.spawn(overlay_text(message, 24., &asset_server));
        parent.spawn(overlay_text(requirement, 20., &asset_server));
        for &(button, label) in buttons {
            parent
                .spawn((
                    Button,
                    Node {
                        width: Val::Px(200.),
                        height: Val::Px(56.),
                        justify_content: JustifyContent::Center,
                        align_items: AlignItems::Center,
                        ..default()
                    },
                    BackgroundColor::from(Color::srgb(0.15, 0.35, 0.6)),
                    button,
                ))
                .with_child(overlay_text(label, 24., &asset_server));
        }
    });
}

fn handle_decision_buttons(
    buttons: Query<(&Interaction, &DecisionButton), Changed<Interaction>>,
    mut game: ResMut<PuzzleGame>,
    mut inbox: ResMut<HostInbox>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    for (interaction, button) in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }
        let result = match button {
            DecisionButton::Next => game.next_puzzle().map(|()| GameState::Playing),
            DecisionButton::Finish => game.finish(&mut *inbox).map(|_| GameState::Finished),
        };
        match result {
            Ok(state) => next_state.set(state),
            Err(err) => warn!("Choice ignored: {err}"),
        }
    }
}

fn spawn_finished_screen(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    game: Res<PuzzleGame>,
    mut inbox: ResMut<HostInbox>,
) {
    // Only a finish chosen in the bit is reported here; Ribbit's own end request
    // is answered by the message handler.
    if let Some(result) = inbox.finished.take() {
        send_bit_message(BitMessage::End(ribbit::bit_result(&result)));
    }

    let result = game.result();
    let headline = if result.passed {
        "Well done!"
    } else {
        "Keep practicing!"
    };
    spawn_overlay(&mut commands, ()).with_children(|parent| {
        parent.spawn(overlay_text(headline, 40., &asset_server));
        parent.spawn(overlay_text(
            format!(
                "{} of {} icons solved",
                result.score, result.total_definitions
            ),
            26.,
            &asset_server,
        ));
        parent.spawn(overlay_text("Tap to play again", 22., &asset_server));
    });
}

fn handle_finished_tap(
    mouse_input: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    windows: Query<&Window>,
    camera: Query<(&Camera, &GlobalTransform)>,
    mut game: ResMut<PuzzleGame>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    if just_pressed_world_position(&mouse_input, &touch_input, &windows, &camera).is_none() {
        return;
    }
    match game.next_puzzle() {
        Ok(()) => next_state.set(GameState::Playing),
        Err(err) => warn!("Replay ignored: {err}"),
    }
}
