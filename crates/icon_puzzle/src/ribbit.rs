use bevy::log::info;
use bevy::prelude::*;
use bits_helpers::RibbitMessageHandler;
use ribbit_bits::{BitDuration, BitResult};

use crate::game::MiniGameResult;
use crate::{GameState, HostInbox, PuzzleGame};

#[derive(Default, Clone, Copy)]
pub struct IconPuzzle;

pub fn bit_result(result: &MiniGameResult) -> BitResult {
    if result.passed {
        BitResult::Success
    } else {
        BitResult::Failure
    }
}

impl RibbitMessageHandler for IconPuzzle {
    fn start(world: &mut World) {
        info!("Starting IconPuzzle");
        world.resource_mut::<HostInbox>().gate_open = true;
    }

    fn restart(world: &mut World) {
        info!("Restarting IconPuzzle");

        let mut game = world.resource_mut::<PuzzleGame>();
        // Without a board, as after an end before the first deal, start the next one.
        if let Err(err) = game.reset_puzzle().or_else(|_| game.next_puzzle()) {
            warn!("Nothing to restart: {err}");
            return;
        }
        world
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
    }

    fn end(world: &mut World) -> BitResult {
        info!("Ending IconPuzzle");

        let result = world.resource_mut::<PuzzleGame>().end_by_host();
        world
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Finished);

        bit_result(&result)
    }

    fn duration(_world: &mut World) -> BitDuration {
        BitDuration::max_duration()
    }
}
