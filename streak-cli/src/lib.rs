//! # Streak CLI
//!
//! Command-line front end for serialized Streak stages.
//!
//! ## Usage
//!
//! ```bash
//! streak render scene.json --out scene.png --pixel-ratio 2
//! streak pick scene.json --x 100 --y 100 --selector .button
//! streak tree scene.json
//! ```
//!
//! The commands live here rather than in `main.rs` so they can be driven
//! from tests without spawning a process.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use serde_json::json;
use streak_core::{EngineConfig, NodeId, Stage, Vector2d};
use streak_renderer::{export, StageRenderer};

/// Command-line arguments for `streak`.
#[derive(Debug, Clone, Parser)]
#[command(name = "streak")]
#[command(about = "Render, pick and inspect Streak stage documents")]
#[command(version)]
pub struct CliArgs {
    /// Engine configuration file (JSON)
    #[arg(long, global = true, env = "STREAK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device pixel ratio, overriding the configuration file
    #[arg(long, global = true, env = "STREAK_PIXEL_RATIO")]
    pub pixel_ratio: Option<f64>,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Rasterize a stage document to PNG
    Render {
        /// Stage document
        scene: PathBuf,
        /// Output PNG file
        #[arg(long, short)]
        out: PathBuf,
        /// Render only the layer at this index (bottom is 0)
        #[arg(long)]
        layer: Option<usize>,
    },
    /// Report the topmost shape under a point
    Pick {
        /// Stage document
        scene: PathBuf,
        /// X coordinate in CSS pixels
        #[arg(long, allow_negative_numbers = true)]
        x: f64,
        /// Y coordinate in CSS pixels
        #[arg(long, allow_negative_numbers = true)]
        y: f64,
        /// Resolve the hit to its nearest ancestor matching this selector
        #[arg(long)]
        selector: Option<String>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print an indented outline of the node tree
    Tree {
        /// Stage document
        scene: PathBuf,
    },
}

/// Engine configuration from the optional config file and flags.
///
/// # Errors
///
/// Returns an error when the configuration file cannot be read or parsed.
pub fn load_config(path: Option<&Path>, pixel_ratio: Option<f64>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            EngineConfig::from_json(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    Ok(match pixel_ratio {
        Some(ratio) => config.with_pixel_ratio(ratio),
        None => config,
    })
}

/// Load a stage document from disk.
///
/// # Errors
///
/// Returns an error when the file cannot be read or is not a stage document.
pub fn load_stage(path: &Path, config: EngineConfig) -> anyhow::Result<Stage> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scene {}", path.display()))?;
    let stage = Stage::from_json_with_config(&text, config)
        .with_context(|| format!("Invalid scene {}", path.display()))?;
    let (width, height) = stage.size();
    if width <= 0.0 || height <= 0.0 {
        bail!("Scene {} has no size (set width and height on the Stage)", path.display());
    }
    Ok(stage)
}

/// Rasterize a stage, or one of its layers, to PNG bytes.
///
/// # Errors
///
/// Returns an error when the layer index is out of range or rendering fails.
pub fn render(stage: &Stage, layer: Option<usize>) -> anyhow::Result<Vec<u8>> {
    let mut renderer = StageRenderer::new();
    renderer.draw(stage)?;
    let png = match layer {
        Some(index) => {
            let Some(id) = stage.layers().get(index).copied() else {
                bail!(
                    "Layer index {index} out of range (stage has {} layers)",
                    stage.layers().len()
                );
            };
            let surface = renderer
                .layer_surface(id)
                .with_context(|| format!("Layer {id} was not drawn"))?;
            export::to_png(surface)?
        }
        None => export::to_png(&renderer.composite(stage)?)?,
    };
    Ok(png)
}

/// Describe the shape (or matching ancestor) under a point.
///
/// # Errors
///
/// Returns an error when a hit surface cannot be allocated.
pub fn pick(
    stage: &Stage,
    point: Vector2d,
    selector: Option<&str>,
    as_json: bool,
) -> anyhow::Result<String> {
    let mut renderer = StageRenderer::new();
    let hit = renderer.get_intersection(stage, point, selector)?;
    if as_json {
        let value = match hit {
            Some(id) => {
                let attrs = stage.node(id).map(|n| n.attrs());
                json!({
                    "node": id.to_string(),
                    "className": stage.node(id).map(|n| n.class_name()),
                    "id": attrs.and_then(|a| a.id.clone()),
                    "name": attrs.and_then(|a| a.name.clone()),
                })
            }
            None => serde_json::Value::Null,
        };
        return Ok(value.to_string());
    }
    Ok(match hit {
        Some(id) => describe(stage, id),
        None => "no hit".to_string(),
    })
}

/// Indented outline of the whole tree, one node per line.
#[must_use]
pub fn tree(stage: &Stage) -> String {
    let mut out = String::new();
    let root = stage.root();
    let _ = writeln!(out, "{}", describe(stage, root));
    for id in stage.descendants(root) {
        let depth = stage.depth(id).unwrap_or(0);
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), describe(stage, id));
    }
    out
}

fn describe(stage: &Stage, id: NodeId) -> String {
    let Some(node) = stage.node(id) else {
        return format!("<missing {id}>");
    };
    let mut line = node.class_name().to_string();
    if let Some(name) = &node.attrs().id {
        let _ = write!(line, " #{name}");
    }
    if let Some(names) = &node.attrs().name {
        for name in names.split_whitespace() {
            let _ = write!(line, " .{name}");
        }
    }
    if !stage.is_visible(id) {
        line.push_str(" (hidden)");
    }
    line
}

/// Run a parsed command, returning what should be printed.
///
/// # Errors
///
/// Returns an error when inputs cannot be loaded or output cannot be
/// written.
pub fn run(args: &CliArgs) -> anyhow::Result<String> {
    let config = load_config(args.config.as_deref(), args.pixel_ratio)?;
    match &args.command {
        Command::Render { scene, out, layer } => {
            let stage = load_stage(scene, config)?;
            let png = render(&stage, *layer)?;
            std::fs::write(out, &png)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            tracing::info!(path = %out.display(), bytes = png.len(), "wrote PNG");
            Ok(format!("wrote {} ({} bytes)", out.display(), png.len()))
        }
        Command::Pick {
            scene,
            x,
            y,
            selector,
            json,
        } => {
            let stage = load_stage(scene, config)?;
            pick(&stage, Vector2d::new(*x, *y), selector.as_deref(), *json)
        }
        Command::Tree { scene } => {
            let stage = load_stage(scene, config)?;
            Ok(tree(&stage))
        }
    }
}
