use anyhow::{Context, Result};
use clap::Parser;
use flappy_neat::assets::Assets;
use flappy_neat::config::Config;
use flappy_neat::neat::Genome;
use flappy_neat::render::{Hud, draw_hud, draw_scene};
use flappy_neat::sim::{WINDOW_HEIGHT, WINDOW_WIDTH};
use flappy_neat::trainer::{Progress, Trainer, train_headless};
use pixels::{Pixels, SurfaceTexture};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{error, info};
use winit::dpi::LogicalSize;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;
use winit_input_helper::WinitInputHelper;

#[derive(Parser, Debug)]
#[command(name = "flappy-neat", version, about = "Evolve Flappy Bird players with NEAT")]
struct Args {
    /// NEAT and simulation settings.
    #[arg(long, default_value = "neat_config.json")]
    config: PathBuf,
    /// Directory of `bird1..3`, `pipe`, `base`, `bg` PNGs replacing the built-in sprites.
    #[arg(long)]
    assets: Option<PathBuf>,
    #[arg(long)]
    generations: Option<u32>,
    /// Cap on ticks per generation.
    #[arg(long)]
    max_ticks: Option<u64>,
    #[arg(long)]
    seed: Option<u64>,
    /// Train without opening a window.
    #[arg(long)]
    headless: bool,
    /// Write the winning genome here as JSON.
    #[arg(long)]
    save_winner: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = if args.config.exists() {
        Config::load(&args.config).with_context(|| format!("loading {}", args.config.display()))?
    } else {
        info!(path = %args.config.display(), "config file not found, using defaults");
        Config::default()
    };
    if let Some(g) = args.generations {
        config.simulation.generations = g;
    }
    if let Some(t) = args.max_ticks {
        config.simulation.max_ticks = Some(t);
    }
    config.validate()?;

    let assets = Rc::new(Assets::load(args.assets.as_deref())?);
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, pop_size = config.neat.pop_size, generations = config.simulation.generations, "starting");

    if args.headless {
        let winner = train_headless(config, assets, seed)?;
        info!(genome = winner.key, fitness = winner.fitness, "best genome");
        if let Some(path) = &args.save_winner {
            save_winner(path, &winner)?;
        }
        return Ok(());
    }
    run_window(config, assets, seed, args.save_winner)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn save_winner(path: &Path, winner: &Genome) -> Result<()> {
    let json = serde_json::to_string_pretty(winner)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "winner saved");
    Ok(())
}

// ============================
// Windowed training
// ============================

fn run_window(config: Config, assets: Rc<Assets>, seed: u64, save_path: Option<PathBuf>) -> Result<()> {
    let event_loop = EventLoop::new();
    let mut input = WinitInputHelper::new();

    let window = WindowBuilder::new()
        .with_title("Flappy Bird")
        .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
        .with_resizable(false)
        .build(&event_loop)?;

    let mut pixels = {
        let window_size = window.inner_size();
        let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
        Pixels::new(WINDOW_WIDTH, WINDOW_HEIGHT, surface_texture)?
    };

    let tick_duration = Duration::from_secs_f64(1.0 / config.simulation.tick_rate_hz as f64);
    let mut trainer = Trainer::new(config, assets, seed);
    let mut last_update = Instant::now();
    let mut ticks_per_frame: u32 = 1;
    let mut paused = false;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        if let Event::RedrawRequested(_) = event {
            let frame = pixels.frame_mut();
            let sim = trainer.simulation();
            draw_scene(frame, sim);
            let population = trainer.population();
            let history = population.stats().best_fitness_history();
            let best_fitness = population.best_genome().and_then(|g| g.fitness).unwrap_or(0.0);
            draw_hud(frame, &Hud {
                generation: population.generation(),
                alive: sim.alive(),
                population: population.genomes().len(),
                best_fitness,
                ticks_per_frame,
                paused,
                history: &history,
            });
            if let Err(e) = pixels.render() {
                error!(error = %e, "render failed");
                *control_flow = ControlFlow::Exit;
            }
        }

        if input.update(&event) {
            if input.key_pressed(VirtualKeyCode::Escape) || input.close_requested() || input.destroyed() {
                *control_flow = ControlFlow::Exit;
                return;
            }
            if input.key_pressed(VirtualKeyCode::P) {
                paused = !paused;
            }
            if input.key_pressed(VirtualKeyCode::NumpadAdd) || input.key_pressed(VirtualKeyCode::Equals) {
                ticks_per_frame = ticks_per_frame.saturating_mul(2).min(256);
            }
            if input.key_pressed(VirtualKeyCode::NumpadSubtract) || input.key_pressed(VirtualKeyCode::Minus) {
                ticks_per_frame = (ticks_per_frame / 2).max(1);
            }

            if !paused && last_update.elapsed() >= tick_duration {
                last_update = Instant::now();
                for _ in 0..ticks_per_frame {
                    match trainer.tick() {
                        Ok(Progress::Running) => {}
                        Ok(Progress::Finished { winner, .. }) => {
                            if let Some(path) = &save_path {
                                if let Err(e) = save_winner(path, winner) {
                                    error!(error = %e, "could not save winner");
                                }
                            }
                            *control_flow = ControlFlow::Exit;
                            return;
                        }
                        Err(e) => {
                            error!(error = %e, "training stopped");
                            *control_flow = ControlFlow::Exit;
                            return;
                        }
                    }
                }
            }
            window.request_redraw();
        }
    })
}
