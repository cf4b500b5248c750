//! Headless platform climber.
//!
//! The player jumps between platforms labelled with small sums. Only
//! platforms whose answer is odd hold the player; the rest are passed
//! through. Landing resets a ten-second timer; when it runs out the round
//! restarts. Input is scripted from a seeded PRNG, and render output is
//! collected into plain command lists instead of being drawn.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example climber -p drecs-engine -- [seed]

use anyhow::Context;
use drecs_engine::prelude::*;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, info};

const GRID: i64 = 80;
const SIZE: f64 = 64.0;
const SCREEN_W: f64 = 1280.0;
const ROUND_SECONDS: f64 = 10.0;
const SPEED: f64 = 6.0;
const FRAMES: u64 = 60 * 30;

// ---------------------------------------------------------------------------
// Per-tick context
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Input {
    jump: bool,
    left_right: f64,
}

#[derive(Debug)]
struct Sprite {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    path: String,
    tile_x: i64,
    tile_y: i64,
}

#[derive(Debug)]
struct Label {
    x: f64,
    y: f64,
    text: String,
}

#[derive(Debug, Default)]
struct Outputs {
    sprites: Vec<Sprite>,
    labels: Vec<Label>,
    sounds: Vec<String>,
}

/// Everything a behavior may read or emit besides the world itself.
struct Args {
    input: Input,
    outputs: Outputs,
    rng: Pcg32,
}

impl Args {
    fn new(seed: u64) -> Self {
        Self {
            input: Input::default(),
            outputs: Outputs::default(),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Clear last frame's output and roll this frame's input.
    fn begin_frame(&mut self) {
        self.outputs = Outputs::default();
        self.input.jump = self.rng.gen_bool(0.08);
        self.input.left_right = self.rng.gen_range(-1i32..=1) as f64;
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

impl Rect {
    fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

fn alias(frame: &Frame<'_, Args>, name: &str) -> anyhow::Result<EntityId> {
    frame
        .resolve_alias(name)
        .with_context(|| format!("no entity aliased '{name}'"))
}

fn rect(frame: &Frame<'_, Args>, e: EntityId) -> Rect {
    Rect {
        x: frame.float(e, "position", "x").unwrap_or(0.0),
        y: frame.float(e, "position", "y").unwrap_or(0.0),
        w: frame.float(e, "size", "w").unwrap_or(0.0),
        h: frame.float(e, "size", "h").unwrap_or(0.0),
    }
}

/// A one-digit sum or difference whose answer has the requested parity.
fn generate_equation(rng: &mut Pcg32, odd: bool) -> (i64, String) {
    loop {
        let a: i64 = rng.gen_range(0..10);
        let b: i64 = rng.gen_range(0..10);
        let (answer, op) = if rng.gen_bool(0.5) { (a + b, '+') } else { (a - b, '-') };
        if (answer % 2 != 0) == odd {
            return (answer, format!("{a} {op} {b}"));
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Spawn a labelled platform made of three parts at height `y`.
fn make_platform(
    frame: &mut Frame<'_, Args>,
    rng: &mut Pcg32,
    side: Side,
    y: f64,
    odd: bool,
) -> anyhow::Result<EntityId> {
    let x = match side {
        Side::Left => rng.gen_range(SIZE..SCREEN_W / 2.0),
        Side::Right => rng.gen_range(SCREEN_W / 2.0..SCREEN_W - SIZE),
    };
    let (answer, text) = generate_equation(rng, odd);

    let platform = frame.spawn("platform")?;
    frame.set(platform, "equation", "answer", answer)?;
    frame.set(platform, "equation", "equation", text)?;

    let pieces = [
        (x - SIZE, GRID, GRID * 4 - 13),
        (x, GRID * 2, GRID * 4),
        (x + SIZE, 0, GRID * 6 - 13),
    ];
    let mut parts = Vec::with_capacity(pieces.len());
    for (part_x, tile_x, tile_y) in pieces {
        let overrides = Overrides::new()
            .with("position", "x", part_x)
            .with("position", "y", y)
            .with("sprite", "tile_x", tile_x)
            .with("sprite", "tile_y", tile_y)
            .with("parent", "parent", platform);
        parts.push(frame.create_entity("platform_part", None, &overrides)?);
    }

    let min_x = parts.iter().map(|&p| rect(frame, p).x).fold(f64::INFINITY, f64::min);
    let width: f64 = parts.iter().map(|&p| rect(frame, p).w).sum();
    frame.set(platform, "position", "x", min_x + SIZE + SIZE / 2.0)?;
    frame.set(platform, "position", "y", y + SIZE * 2.0 - 5.0)?;
    frame.set(platform, "size", "w", width)?;
    frame.set(
        platform,
        "parts",
        "parts",
        parts.into_iter().map(Value::from).collect::<Vec<_>>(),
    )?;
    Ok(platform)
}

// ---------------------------------------------------------------------------
// Systems
// ---------------------------------------------------------------------------

fn tick_timer(frame: &mut Frame<'_, Args>, _: &[EntityId], _: &mut Args) -> anyhow::Result<()> {
    let timer = alias(frame, "timer")?;
    let left = frame.float(timer, "time", "left").unwrap_or(0.0) - 1.0 / 60.0;
    if left > 0.0 {
        frame.set(timer, "time", "left", left)?;
        return Ok(());
    }

    info!("time is up, restarting the round");
    let player = alias(frame, "player")?;
    frame.delete_entity(player)?;
    frame.create_entity("player", Some("player"), &Overrides::new())?;
    frame.set(timer, "time", "left", ROUND_SECONDS)?;

    let mut doomed = frame.query(&["platform"]);
    doomed.extend(frame.query(&["equation"]));
    for e in doomed {
        frame.delete_entity(e)?;
    }
    Ok(())
}

fn gravity(frame: &mut Frame<'_, Args>, _: &[EntityId], args: &mut Args) -> anyhow::Result<()> {
    let player = alias(frame, "player")?;
    let here = rect(frame, player);
    let below = Rect {
        y: here.y - SIZE,
        ..here
    };

    let mut landing = None;
    for &e in frame.entities() {
        if !frame.has_components(e, &["platform"]) && !frame.has_components(e, &["floor"]) {
            continue;
        }
        let r = rect(frame, e);
        if !r.intersects(&below) {
            continue;
        }
        // Platform parts only hold when their equation's answer is odd.
        let solid = match frame.get(e, "parent", "parent").and_then(Value::as_entity) {
            None => true,
            Some(parent) => frame
                .get(parent, "equation", "answer")
                .and_then(Value::as_int)
                .is_some_and(|answer| answer % 2 != 0),
        };
        if solid {
            landing = Some(r);
            break;
        }
    }

    let accel_y = frame.float(player, "accel", "y").unwrap_or(0.0);
    let grounded = frame.has_components(player, &["on_ground"]);
    match landing {
        Some(ground) if accel_y < 0.0 => {
            frame.set(player, "accel", "y", 0.0)?;
            frame.set(player, "position", "y", ground.y + SIZE)?;
            if !grounded {
                let n = args.rng.gen_range(0..4);
                args.outputs.sounds.push(format!("sounds/footstep_carpet_00{n}.ogg"));
                let timer = alias(frame, "timer")?;
                frame.set(timer, "time", "left", ROUND_SECONDS)?;
            }
            frame.add_component(player, "on_ground", &AttrMap::new())?;
        }
        Some(_) => {}
        None => {
            frame.set(player, "accel", "y", accel_y - 0.98)?;
        }
    }

    let y = frame.float(player, "position", "y").unwrap_or(0.0);
    let best = frame.float(player, "max_height", "y").unwrap_or(0.0);
    frame.set(player, "max_height", "y", y.max(best))?;
    Ok(())
}

fn controls(frame: &mut Frame<'_, Args>, _: &[EntityId], args: &mut Args) -> anyhow::Result<()> {
    let player = alias(frame, "player")?;

    if args.input.jump && frame.has_components(player, &["on_ground"]) {
        frame.remove_component(player, "on_ground")?;
        let accel_y = frame.float(player, "accel", "y").unwrap_or(0.0);
        frame.set(player, "accel", "y", accel_y + SPEED * 5.0)?;
        let n = args.rng.gen_range(0..5);
        args.outputs.sounds.push(format!("sounds/impactPlate_light_00{n}.ogg"));
    }

    let accel_x = frame.float(player, "accel", "x").unwrap_or(0.0);
    frame.set(
        player,
        "accel",
        "x",
        (accel_x + args.input.left_right * SPEED) * 0.79,
    )?;
    Ok(())
}

fn acceleration(
    frame: &mut Frame<'_, Args>,
    entities: &[EntityId],
    _: &mut Args,
) -> anyhow::Result<()> {
    for &e in entities {
        let r = rect(frame, e);
        let ax = frame.float(e, "accel", "x").unwrap_or(0.0);
        let ay = frame.float(e, "accel", "y").unwrap_or(0.0);
        frame.set(e, "position", "x", r.x + ax)?;
        frame.set(e, "position", "y", r.y + ay)?;
    }
    Ok(())
}

fn manage_platforms(
    frame: &mut Frame<'_, Args>,
    entities: &[EntityId],
    args: &mut Args,
) -> anyhow::Result<()> {
    let step = SIZE * 5.0;
    // Two platforms of three parts per row.
    let rows = entities.len() / 6;

    let player = alias(frame, "player")?;
    let best = frame.float(player, "max_height", "y").unwrap_or(0.0);
    if ((best / step).ceil() as usize) < rows {
        return Ok(());
    }

    for i in 0..3 {
        let y = step * (rows + i + 1) as f64;
        let left_odd = args.rng.gen_bool(0.5);
        make_platform(frame, &mut args.rng, Side::Left, y, left_odd)?;
        make_platform(frame, &mut args.rng, Side::Right, y, !left_odd)?;
    }
    debug!(rows = rows + 3, "spawned platform rows");
    Ok(())
}

fn render_equations(
    frame: &mut Frame<'_, Args>,
    entities: &[EntityId],
    args: &mut Args,
) -> anyhow::Result<()> {
    let player_y = rect(frame, alias(frame, "player")?).y;
    for &e in entities {
        let r = rect(frame, e);
        let text = frame
            .get(e, "equation", "equation")
            .and_then(Value::as_str)
            .unwrap_or_default();
        args.outputs.labels.push(Label {
            x: r.x,
            y: r.y - player_y,
            text: text.to_owned(),
        });
    }
    Ok(())
}

fn render_sprites(
    frame: &mut Frame<'_, Args>,
    entities: &[EntityId],
    args: &mut Args,
) -> anyhow::Result<()> {
    let player = alias(frame, "player")?;
    let player_y = rect(frame, player).y;
    for &e in entities {
        let r = rect(frame, e);
        let tile = |attribute| frame.get(e, "sprite", attribute).and_then(Value::as_int);
        args.outputs.sprites.push(Sprite {
            x: r.x,
            // The camera follows the player vertically.
            y: if e == player { SIZE } else { r.y - player_y + SIZE },
            w: r.w,
            h: r.h,
            path: frame
                .get(e, "sprite", "path")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            tile_x: tile("tile_x").unwrap_or(0),
            tile_y: tile("tile_y").unwrap_or(0),
        });
    }
    Ok(())
}

fn render_score(frame: &mut Frame<'_, Args>, _: &[EntityId], args: &mut Args) -> anyhow::Result<()> {
    let player = alias(frame, "player")?;
    let best = frame.float(player, "max_height", "y").unwrap_or(0.0);
    args.outputs.labels.push(Label {
        x: 0.0,
        y: 720.0,
        text: format!("Score: {}", best as i64),
    });
    Ok(())
}

fn render_timer(frame: &mut Frame<'_, Args>, _: &[EntityId], args: &mut Args) -> anyhow::Result<()> {
    let timer = alias(frame, "timer")?;
    let left = frame.float(timer, "time", "left").unwrap_or(0.0);
    args.outputs.labels.push(Label {
        x: SCREEN_W / 2.0,
        y: 720.0,
        text: format!("{}", left.ceil() as i64),
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

fn registry() -> Registry<Args> {
    let mut reg = Registry::new();
    reg.register_component("position", attrs([("x", SCREEN_W / 2.0), ("y", SIZE)]))
        .register_component("gravity", AttrMap::new())
        .register_component("size", attrs([("w", SIZE), ("h", SIZE)]))
        .register_component("platform", AttrMap::new())
        .register_component("floor", AttrMap::new())
        .register_component(
            "sprite",
            attrs([
                ("path", Value::from("sprites/spritesheet_default.png")),
                ("tile_w", Value::from(GRID)),
                ("tile_h", Value::from(GRID)),
                ("tile_x", Value::from(0)),
                ("tile_y", Value::from(0)),
            ]),
        )
        .register_component("accel", attrs([("x", 0.0), ("y", 0.0)]))
        .register_component("on_ground", AttrMap::new())
        .register_component(
            "equation",
            attrs([("answer", Value::from(0)), ("equation", Value::from(""))]),
        )
        .register_component("parent", attrs([("parent", Value::Nil)]))
        .register_component("max_height", attrs([("y", 0.0)]))
        .register_component("parts", attrs([("parts", Value::List(Vec::new()))]))
        .register_component("time", attrs([("left", ROUND_SECONDS)]));

    reg.register_template(
        "player",
        TemplateDef::new(["position", "on_ground", "gravity", "size", "max_height", "accel"])
            .with_override("sprite", "tile_x", 175)
            .with_override("sprite", "tile_y", 0),
    )
    .register_template(
        "floor",
        TemplateDef::new(["position", "floor", "size"])
            .with_override("sprite", "tile_x", GRID * 2)
            .with_override("sprite", "tile_y", GRID * 4),
    )
    .register_template(
        "platform_part",
        TemplateDef::new(["position", "platform", "size", "parent"])
            .with_override("sprite", "tile_x", GRID * 2)
            .with_override("sprite", "tile_y", GRID * 4),
    )
    .register_template(
        "platform",
        TemplateDef::new(["parts", "equation", "position", "size"]),
    )
    .register_template("timer", TemplateDef::new(["time"]));

    reg.register_system("tick_timer", Vec::<String>::new(), tick_timer)
        .register_system("gravity", Vec::<String>::new(), gravity)
        .register_system("controls", Vec::<String>::new(), controls)
        .register_system("acceleration", ["accel"], acceleration)
        .register_system("manage_platforms", ["platform"], manage_platforms)
        .register_system("render_equations", ["equation"], render_equations)
        .register_system("render_sprites", ["position", "size", "sprite"], render_sprites)
        .register_system("render_score_system", Vec::<String>::new(), render_score)
        .register_system("render_timer", Vec::<String>::new(), render_timer);

    let floor_tiles = (SCREEN_W / SIZE) as i64;
    reg.register_world(
        "default",
        WorldDef::new()
            .with_systems([
                "tick_timer",
                "gravity",
                "controls",
                "acceleration",
                "manage_platforms",
                "render_equations",
                "render_sprites",
                // Resolves to `render_score_system`.
                "render_score",
                "render_timer",
            ])
            .with_entity(EntitySpec::new("timer").alias("timer"))
            .with_entity(EntitySpec::new("player").alias("player"))
            .with_entities((0..floor_tiles).map(|i| {
                EntitySpec::new("floor")
                    .with("position", "x", i as f64 * SIZE)
                    .with("position", "y", 0.0)
            })),
    );
    reg
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let seed = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("seed must be an unsigned integer")?,
        None => 7,
    };

    let mut runtime = Runtime::new(registry(), RuntimeConfig::default())?;
    runtime.set_world("default")?;
    let mut args = Args::new(seed);

    for frame in 0..FRAMES {
        args.begin_frame();
        runtime.tick(&mut args)?;

        for sound in &args.outputs.sounds {
            debug!(frame, sound = %sound, "play");
        }
        if frame % 60 == 0 {
            let score = args
                .outputs
                .labels
                .iter()
                .find(|l| l.text.starts_with("Score"))
                .map(|l| l.text.as_str())
                .unwrap_or_default();
            let entities = runtime.store()?.len();
            info!(
                frame,
                entities,
                sprites = args.outputs.sprites.len(),
                labels = args.outputs.labels.len(),
                score,
                "frame"
            );
        }
    }

    // Draw list of the final frame.
    for s in &args.outputs.sprites {
        debug!(
            x = s.x,
            y = s.y,
            w = s.w,
            h = s.h,
            path = %s.path,
            tile_x = s.tile_x,
            tile_y = s.tile_y,
            "sprite"
        );
    }
    for l in &args.outputs.labels {
        debug!(x = l.x, y = l.y, text = %l.text, "label");
    }

    let diag = runtime.last_diagnostics();
    info!(
        ticks = runtime.tick_count(),
        last_tick_us = diag.total_time.as_micros() as u64,
        state = %runtime.state_hash().to_hex(),
        "done"
    );
    Ok(())
}
