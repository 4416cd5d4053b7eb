//! Headless bouncing-ball demo
//!
//! A title screen, a play screen that ticks an ECS schedule until the ball
//! has bounced a few times, and a game-over screen. Input comes from a
//! fixed script of per-frame key presses instead of a window.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run -p gskin --example bouncing
//! ```

use anyhow::Result;
use gskin::prelude::*;

const CONFIG: &str = r#"
[game]
title = "Bouncing"
fps = 30

[logging]
filter = "bouncing=info,gskin=debug"

[systems.report]
interval_ms = 500
"#;

const FLOOR: f32 = 0.0;
const CEILING: f32 = 10.0;
const BOUNCES_TO_WIN: u32 = 4;
const MAX_FRAMES: u64 = 2_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Scene {
    Title,
    Play,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Key {
    Start,
    Quit,
}

#[derive(Clone, Copy, Debug)]
struct Vec2 {
    x: f32,
    y: f32,
}

struct Game {
    world: World,
    schedule: Schedule,
    ball: Option<EntityId>,
}

impl Game {
    fn new(config: &GameConfig) -> Result<Self> {
        let mut schedule: Schedule = Schedule::new();

        schedule.register_system(System::new(
            "movement",
            ["pos", "velocity"],
            |pos: &mut Vec2, vel: &mut Vec2, tick: &Tick| -> SystemResult {
                pos.x += vel.x * tick.delta;
                pos.y += vel.y * tick.delta;
                Ok(())
            },
        ))?;

        schedule.register_system(System::new(
            "bounce",
            ["pos", "velocity", "bounces"],
            |pos: &mut Vec2, vel: &mut Vec2, bounces: &mut u32, _: &Tick| -> SystemResult {
                if pos.y < FLOOR || pos.y > CEILING {
                    pos.y = pos.y.clamp(FLOOR, CEILING);
                    vel.y = -vel.y;
                    *bounces += 1;
                    tracing::info!(bounces = *bounces, "bounce");
                }
                Ok(())
            },
        ))?;

        schedule.register_system(System::for_entity(
            "report",
            ["pos"],
            |entity: &mut Entity, tick: &Tick| -> SystemResult {
                if let Some(pos) = entity.get::<Vec2>("pos") {
                    tracing::info!(frame = tick.frame, x = pos.x, y = pos.y, "ball");
                }
                Ok(())
            },
        ))?;

        config.apply_to_schedule(&mut schedule)?;

        Ok(Self {
            world: World::new(),
            schedule,
            ball: None,
        })
    }

    fn bounces(&self) -> u32 {
        self.ball
            .and_then(|id| self.world.get(id))
            .and_then(|ball| ball.get::<u32>("bounces"))
            .copied()
            .unwrap_or(0)
    }
}

struct Play;

impl Screen<Scene, Game, Key> for Play {
    fn enter(&mut self, game: &mut Game) -> Result<()> {
        let ball = Entity::named("ball")
            .with("pos", Vec2 { x: 0.0, y: 5.0 })
            .with("velocity", Vec2 { x: 1.0, y: 12.0 })
            .with("bounces", 0u32);
        game.ball = Some(game.world.spawn(ball));
        Ok(())
    }

    fn update(&mut self, game: &mut Game, events: &[Key]) -> Result<Next<Scene>> {
        if events.contains(&Key::Quit) {
            return Ok(Next::Exit);
        }

        game.schedule.tick(&mut game.world)?;

        if game.bounces() >= BOUNCES_TO_WIN {
            return Ok(Next::Goto(Scene::GameOver));
        }
        Ok(Next::Stay)
    }

    fn exit(&mut self, game: &mut Game) -> Result<()> {
        if let Some(id) = game.ball.take() {
            game.world.despawn(id);
        }
        Ok(())
    }
}

/// Key presses by frame
fn scripted_input(frame: u64) -> Vec<Key> {
    match frame {
        3 => vec![Key::Start],
        f if f > 1_000 => vec![Key::Quit],
        _ => Vec::new(),
    }
}

fn main() -> Result<()> {
    let config = GameConfig::from_toml_str(CONFIG)?;
    gskin::logging::init(&config.logging)?;
    tracing::info!(title = %config.game.title, "starting");

    let mut game = Game::new(&config)?;

    let mut screens = ScreenManager::builder()
        .screen(
            Scene::Title,
            screen_fn(|_: &mut Game, events: &[Key]| -> Result<Next<Scene>> {
                Ok(if events.contains(&Key::Start) {
                    Next::Goto(Scene::Play)
                } else {
                    Next::Stay
                })
            }),
        )
        .screen(Scene::Play, Play)
        .screen(
            Scene::GameOver,
            screen_fn(|game: &mut Game, _: &[Key]| -> Result<Next<Scene>> {
                tracing::info!(frames = game.schedule.frame(), "game over");
                Ok(Next::Exit)
            }),
        )
        .build()?;

    screens.entered().subscribe(|scene: &Scene| tracing::info!(?scene, "entered"));

    screens.start(&mut game)?;

    let mut frame = 0;
    while screens.is_running() && frame < MAX_FRAMES {
        let events = scripted_input(frame);
        screens.update(&mut game, &events)?;
        frame += 1;
    }

    tracing::info!(frame, entities = game.world.len(), "finished");
    Ok(())
}
