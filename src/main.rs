//! Void Arena headless demo.
//!
//! Runs the simulation at a fixed cadence with a scripted input source and
//! logs periodic snapshots. No renderer: this exercises the full game loop
//! (hub, waves, bosses, intermissions) end to end from the command line.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec2;

use void_arena::audio::{AudioSink, LogSink};
use void_arena::consts::{ARENA_HEIGHT, ARENA_WIDTH};
use void_arena::persistence::JsonFileStore;
use void_arena::settings::Settings;
use void_arena::sim::{Game, GamePhase, TickInput};

const TICK_DT: f32 = 1.0 / 60.0;
const MAX_TICKS: u32 = 60 * 300;

fn main() {
    env_logger::init();

    let data_dir = PathBuf::from("data");
    let settings = Settings::load(&data_dir.join("settings.json"));
    let store = JsonFileStore::new(data_dir.join("save.json"));

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
    log::info!("void arena headless demo, seed {seed}");

    let mut game = Game::new(seed, Box::new(store));
    let mut sink = LogSink::default();

    for tick in 0..MAX_TICKS {
        let input = scripted_input(&game, tick);
        game.tick(TICK_DT, &input);

        for cue in game.take_cues() {
            sink.play(cue);
        }
        sink.set_music(game.music());

        if game.phase == GamePhase::Intermission {
            game.apply_intermission_choice(0);
        }

        // One snapshot line per simulated second
        if tick % 60 == 0 {
            let snapshot = game.snapshot();
            if settings.effective_screen_shake() || snapshot.shake == 0.0 {
                match serde_json::to_string(&snapshot) {
                    Ok(json) => log::info!("snapshot: {json}"),
                    Err(e) => log::warn!("snapshot serialize failed: {e}"),
                }
            }
        }

        match game.phase {
            GamePhase::Victory => {
                log::info!("the void is cleared, all seven guardians down");
                break;
            }
            GamePhase::GameOver => {
                let snapshot = game.snapshot();
                log::info!(
                    "run over at stage {} wave {}, {} shards banked",
                    snapshot.stage + 1,
                    snapshot.wave + 1,
                    snapshot.shards
                );
                break;
            }
            _ => {}
        }
    }
}

/// Deterministic pilot: walks to the portal in the hub, then orbits the
/// arena firing at whatever is closest.
fn scripted_input(game: &Game, tick: u32) -> TickInput {
    let mut input = TickInput::default();
    let Some(player) = game.player.as_ref() else {
        return input;
    };
    let center = player.body.center();

    match game.phase {
        GamePhase::Hub => {
            let portal = Vec2::new(ARENA_WIDTH / 2.0, 200.0);
            steer(&mut input, center, portal);
            input.interact = tick % 10 == 0;
        }
        GamePhase::Playing | GamePhase::BossIntro => {
            // Figure-eight sweep keeps the pilot off the walls
            let t = tick as f32 * TICK_DT;
            let target = Vec2::new(
                ARENA_WIDTH / 2.0 + (t * 0.7).sin() * 400.0,
                ARENA_HEIGHT / 2.0 + (t * 1.3).cos() * 220.0,
            );
            steer(&mut input, center, target);

            input.fire = true;
            input.cursor = nearest_target(game, center)
                .unwrap_or(Vec2::new(ARENA_WIDTH / 2.0, ARENA_HEIGHT / 2.0));
            input.dash = tick % 150 == 0;
            input.ultimate = tick % 45 == 0;
        }
        _ => {}
    }
    input
}

fn steer(input: &mut TickInput, from: Vec2, to: Vec2) {
    let delta = to - from;
    input.left = delta.x < -10.0;
    input.right = delta.x > 10.0;
    input.up = delta.y < -10.0;
    input.down = delta.y > 10.0;
}

fn nearest_target(game: &Game, from: Vec2) -> Option<Vec2> {
    game.bosses
        .iter()
        .map(|b| b.body.center())
        .chain(game.enemies.iter().map(|e| e.body.center()))
        .min_by(|a, b| {
            from.distance_squared(*a)
                .total_cmp(&from.distance_squared(*b))
        })
}
