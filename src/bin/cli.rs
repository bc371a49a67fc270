//! battle-agent CLI - run arenas headless and inspect action encoding

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use battle_agent::config::ArenaConfig;
use battle_agent::game::actions::{ActionVector, ControlInputs, QueuedAction};
use battle_agent::game::instance::{GameInstance, InstanceSnapshot, TickReport};

#[derive(Parser)]
#[command(name = "battle-agent")]
#[command(about = "Headless runner for agent-controlled battle arenas", long_about = None)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "BATTLE_AGENT_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter arena.toml
    Init {
        /// Directory to create. Omit to init in the current directory.
        name: Option<String>,
    },
    /// Run an arena for a fixed number of ticks, printing one JSON snapshot per tick
    Run {
        /// Arena file, or a directory containing arena.toml
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "500")]
        ticks: u64,
        /// JSON-lines action file, one line per tick
        #[arg(short, long)]
        actions: Option<PathBuf>,
    },
    /// Load and validate an arena without running it
    Validate {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the action vector for analog human controls
    Encode {
        #[arg(long, allow_hyphen_values = true, default_value = "0")]
        forward: f32,
        #[arg(long, allow_hyphen_values = true, default_value = "0")]
        turn: f32,
        #[arg(long)]
        jump: bool,
        #[arg(long)]
        shoot: bool,
        #[arg(long)]
        throw: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Init { name } => init_arena(name),
        Commands::Run {
            path,
            ticks,
            actions,
        } => run_arena(&path, ticks, actions.as_deref()),
        Commands::Validate { path } => validate_arena(&path),
        Commands::Encode {
            forward,
            turn,
            jump,
            shoot,
            throw,
        } => encode(ControlInputs {
            forward,
            turn,
            jump,
            shoot,
            throw,
        }),
    }
}

/// Logs go to stderr so stdout stays a clean JSON-lines stream.
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_arena(path: &Path) -> Result<ArenaConfig> {
    let config = if path.is_dir() {
        ArenaConfig::from_dir(path)?
    } else {
        ArenaConfig::from_file(path)?
    };
    Ok(config)
}

// =============================================================================
// Init Command
// =============================================================================

const ARENA_TEMPLATE: &str = r#"name = "{name}"
tick_rate = 50
gravity = 9.81

[controller]
slope_limit_degrees = 45
move_speed = 6.0
turn_speed = 300.0
allow_jump = true
jump_speed = 5.0
allow_battle = true
max_bullets = 10
bullet_cooldown_seconds = 1.0
max_bombs = 1
bomb_cooldown_seconds = 5.0
projectile_speed = 10.0
trigger_mode = "autofire"

[geometry]
radius = 0.5
height = 2.0

# Floor
[[parts]]
id = 1
position = [0.0, -0.5, 0.0]
size = [60.0, 1.0, 60.0]

# Ramp, 30 degrees about X
[[parts]]
id = 2
position = [8.0, 0.0, -8.0]
size = [6.0, 0.5, 10.0]
rotation = [30.0, 0.0, 0.0]

# Target dummy
[[parts]]
id = 3
position = [0.0, 1.0, -15.0]
size = [1.0, 2.0, 1.0]
category = "target"

[[characters]]
id = 10
position = [0.0, 1.0, 0.0]
muzzle = [0.0, 0.5, -0.6]
"#;

fn init_arena(name: Option<String>) -> Result<()> {
    let (dir, arena_name) = match name {
        Some(name) => (PathBuf::from(&name), name),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            let dir_name = cwd
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "arena".to_string());
            (cwd, dir_name)
        }
    };

    let arena_path = dir.join("arena.toml");
    if arena_path.exists() {
        bail!("{} already exists", arena_path.display());
    }
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&arena_path, ARENA_TEMPLATE.replace("{name}", &arena_name))
        .with_context(|| format!("Failed to write {}", arena_path.display()))?;

    println!("Created {}", arena_path.display());
    Ok(())
}

// =============================================================================
// Run Command
// =============================================================================

/// One line of an action file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ActionLine {
    /// Applied to every character
    Broadcast(ActionVector),
    Single(QueuedAction),
    Many(Vec<QueuedAction>),
    /// Character id to action
    Keyed(BTreeMap<u64, ActionVector>),
}

impl ActionLine {
    /// Bare integer arrays are parsed as an action vector directly so slot
    /// errors are reported instead of the untagged "no variant matched".
    fn parse(line: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        if let Some(items) = value.as_array() {
            if !items.is_empty() && items.iter().all(serde_json::Value::is_i64) {
                let slots: Vec<i32> = serde_json::from_value(value)?;
                return Ok(ActionLine::Broadcast(ActionVector::try_from(slots)?));
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    fn queue(self, instance: &GameInstance) {
        match self {
            ActionLine::Broadcast(action) => {
                for &id in instance.characters.keys() {
                    instance.queue_action(id, action);
                }
            }
            ActionLine::Single(queued) => instance.queue_action(queued.character_id, queued.action),
            ActionLine::Many(list) => {
                for queued in list {
                    instance.queue_action(queued.character_id, queued.action);
                }
            }
            ActionLine::Keyed(map) => {
                for (id, action) in map {
                    instance.queue_action(id, action);
                }
            }
        }
    }
}

/// Output line: the state after a tick plus what happened during it.
#[derive(Serialize)]
struct TickLine<'a> {
    #[serde(flatten)]
    snapshot: &'a InstanceSnapshot,
    #[serde(flatten)]
    report: &'a TickReport,
}

fn run_arena(path: &Path, ticks: u64, actions: Option<&Path>) -> Result<()> {
    let config = load_arena(path)?;
    let mut instance = GameInstance::from_config(&config)?;

    let mut action_lines = match actions {
        Some(actions_path) => {
            let file = std::fs::File::open(actions_path)
                .with_context(|| format!("Failed to open {}", actions_path.display()))?;
            Some(BufReader::new(file).lines().enumerate())
        }
        None => None,
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut failures = 0usize;

    for _ in 0..ticks {
        if let Some((index, line)) = action_lines.as_mut().and_then(|lines| lines.next()) {
            let line = line.context("Failed to read action file")?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                let parsed = ActionLine::parse(trimmed)
                    .with_context(|| format!("Invalid action on line {}", index + 1))?;
                parsed.queue(&instance);
            }
        }

        let report = instance.tick();
        failures += report.failures.len();

        let snapshot = instance.snapshot();
        serde_json::to_writer(
            &mut out,
            &TickLine {
                snapshot: &snapshot,
                report: &report,
            },
        )?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    if failures > 0 {
        warn!(failures, "Some characters failed during the run");
    }
    info!(arena = %config.name, ticks, "Run finished");
    Ok(())
}

// =============================================================================
// Validate / Encode Commands
// =============================================================================

fn validate_arena(path: &Path) -> Result<()> {
    let config = load_arena(path)?;
    // Building the instance also checks every character's geometry.
    let instance = GameInstance::from_config(&config)?;
    println!(
        "{}: ok ({} parts, {} characters, {} Hz)",
        config.name,
        config.parts.len(),
        instance.characters.len(),
        config.tick_rate
    );
    Ok(())
}

fn encode(inputs: ControlInputs) -> Result<()> {
    let action = ActionVector::encode(&inputs);
    println!("{}", serde_json::to_string(&action)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_line_forms() {
        assert!(matches!(ActionLine::parse("[1,0,0,0,0]").unwrap(), ActionLine::Broadcast(_)));
        assert!(matches!(
            ActionLine::parse(r#"{"character_id":1,"action":[1,0,0,0,0]}"#).unwrap(),
            ActionLine::Single(_)
        ));
        assert!(matches!(
            ActionLine::parse(r#"{"1":[0,2,0,0,0]}"#).unwrap(),
            ActionLine::Keyed(_)
        ));
        assert!(matches!(ActionLine::parse("[]").unwrap(), ActionLine::Many(list) if list.is_empty()));
    }

    #[test]
    fn test_bare_array_reports_slot_error() {
        let err = ActionLine::parse("[0,0,0,0,5]").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("out of range"), "{}", message);

        let err = ActionLine::parse("[0,0,0]").unwrap_err();
        assert!(!format!("{:#}", err).contains("did not match any variant"));
    }
}
