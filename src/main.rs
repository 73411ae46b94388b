/// Entry point and game loop.

use std::time::{Duration, Instant};

use tracing::{error, info};

use gridstrike::config::GameConfig;
use gridstrike::logging::init_logging;
use gridstrike::sim::engine::GameEngine;
use gridstrike::sim::event::GameEvent;
use gridstrike::sim::highscore::{FileHighScoreStore, HighScoreStore};
use gridstrike::sim::session::GameStatus;
use gridstrike::ui::gamepad::GamepadState;
use gridstrike::ui::input::InputState;
use gridstrike::ui::renderer::{Renderer, View};
use gridstrike::ui::sound::SoundEngine;
use gridstrike::ui::{apply_action, Applied, Cursor};

fn main() {
    let config = match GameConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Warning: {e}");
            eprintln!("Using default settings.");
            GameConfig::default()
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let store = FileHighScoreStore::locate(&config.high_score_file);
    info!(
        path = %store.path().display(),
        difficulty = %config.difficulty,
        "starting"
    );
    let mut engine = GameEngine::new(config.difficulty, store);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = if config.sound.enabled { SoundEngine::new() } else { None };

    let result = game_loop(&mut engine, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game loop failed");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Grid Strike!");
    println!(
        "Last score: {}   Best ({}): {}",
        engine.score(),
        engine.difficulty(),
        engine.high_score()
    );
}

fn game_loop<S: HighScoreStore>(
    engine: &mut GameEngine<S>,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.reports_key_release();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let frame = Duration::from_millis(config.frame_ms);

    let mut cursor = Cursor::default();
    let mut new_record = false;
    let mut anim_tick: u32 = 0;
    let mut last_frame = Instant::now();

    loop {
        // Timers first, so input sees the board as it is now
        let now = Instant::now();
        engine.advance(now.duration_since(last_frame));
        last_frame = now;

        kb.drain_events();
        gp.update();
        for action in kb.actions().into_iter().chain(gp.actions()) {
            if apply_action(engine, &mut cursor, action) == Applied::Quit {
                info!(score = engine.score(), "quit");
                return Ok(());
            }
        }

        let events = engine.drain_events();
        for event in &events {
            match event {
                GameEvent::GameEnded { new_record: record, .. } => new_record = *record,
                GameEvent::StatusChanged { to: GameStatus::Ready, .. } => new_record = false,
                _ => {}
            }
        }
        if let Some(sfx) = sound {
            sfx.play_events(&events);
        }

        let snapshot = engine.snapshot();
        renderer.render(&View { snapshot: &snapshot, cursor, new_record, anim_tick })?;
        anim_tick = anim_tick.wrapping_add(1);

        std::thread::sleep(frame);
    }
}
