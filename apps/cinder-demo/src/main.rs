//! Headless cinder demo CLI.
//!
//! Provides two modes of operation:
//! - `drop`: Simulate circles falling onto a static floor and print
//!   contact statistics and final poses
//! - `info`: Print workspace crate versions and the default config

use clap::{Parser, Subcommand};
use glam::Vec2;
use tracing::info;

use cinder_core::PhysicsConfig;
use cinder_physics::prelude::*;
use cinder_scene::{Node, Scene};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// cinder scene/physics synchronization demo.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drop circles onto a floor and print what happened.
    Drop {
        /// Number of circles to drop.
        #[arg(short, long, default_value_t = 3)]
        bodies: u32,

        /// Number of frames to simulate at 60 fps.
        #[arg(short, long, default_value_t = 300)]
        frames: u32,

        /// Fixed steps per second; 0 uses substep mode.
        #[arg(long, default_value_t = 0)]
        fixed_rate: u32,

        /// Path to a TOML physics config; flags override its stepping.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Contact counting
// ---------------------------------------------------------------------------

/// Delegate that tallies begin/end notifications and logs each one.
#[derive(Default)]
struct CountingDelegate {
    begun: u32,
    ended: u32,
}

impl ContactDelegate for CountingDelegate {
    fn did_begin(&mut self, contact: &Contact) {
        self.begun += 1;
        let (a, b) = contact.nodes();
        info!(node_a = a.index(), node_b = b.index(), "contact begin");
    }

    fn did_end(&mut self, contact: &Contact) {
        self.ended += 1;
        let (a, b) = contact.nodes();
        info!(node_a = a.index(), node_b = b.index(), "contact end");
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn run_drop(bodies: u32, frames: u32, fixed_rate: u32, config_path: Option<&str>) {
    let mut config = match config_path {
        Some(path) => match PhysicsConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config {path}: {e}");
                std::process::exit(1);
            }
        },
        None => PhysicsConfig::default(),
    };
    if fixed_rate > 0 {
        config.fixed_rate = fixed_rate;
    }

    let mut scene = Scene::new();
    let mut world = PhysicsWorld::new(&config);

    // Static floor.
    let mut floor = Node::new();
    floor.set_position(Vec2::new(0.0, 0.0));
    let floor = scene.add_node(scene.root(), floor);
    let mut floor_body = PhysicsBody::rect(Vec2::new(400.0, 20.0), PhysicsMaterial::default());
    floor_body.set_dynamic(false);
    world.attach_body(floor, body_ref(floor_body));

    // Circles staggered in x and y so they land at different times.
    let mut circles = Vec::new();
    for i in 0..bodies {
        let mut node = Node::new();
        node.set_position(Vec2::new(
            (i as f32 - bodies as f32 / 2.0) * 30.0,
            80.0 + 20.0 * i as f32,
        ));
        let id = scene.add_node(scene.root(), node);
        world.attach_body(id, body_ref(PhysicsBody::circle(8.0, PhysicsMaterial::default())));
        circles.push(id);
    }

    world.set_contact_delegate(Box::new(CountingDelegate::default()));

    for _ in 0..frames {
        world.update(&mut scene, 1.0 / 60.0, false);
    }

    println!(
        "simulated {frames} frames, {} active bodies",
        world.active_body_count()
    );
    for id in circles {
        let p = scene.node(id).position();
        println!("circle at node {}: ({:.2}, {:.2})", id.index(), p.x, p.y);
    }
}

fn run_info() {
    println!("cinder v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  cinder-core    {}", env!("CARGO_PKG_VERSION"));
    println!("  cinder-scene   {}", env!("CARGO_PKG_VERSION"));
    println!("  cinder-physics {}", env!("CARGO_PKG_VERSION"));
    println!();
    let defaults = PhysicsConfig::default();
    println!(
        "default config: gravity=({}, {}), fixed_rate={}, substeps={}, speed={}",
        defaults.gravity[0], defaults.gravity[1], defaults.fixed_rate, defaults.substeps, defaults.speed
    );
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Drop {
            bodies,
            frames,
            fixed_rate,
            config,
        }) => run_drop(bodies, frames, fixed_rate, config.as_deref()),
        Some(Commands::Info) => run_info(),
        None => run_drop(3, 300, 0, None),
    }
}
