//! # Streak Core
//!
//! Retained-mode 2D scene graph: a stage of layers, groups and shapes with
//! attribute-driven transforms, paint, selectors, JSON documents and a
//! frame scheduler for callbacks and tweens.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 streak-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Stage (arena)    │  Attributes             │
//! │  - Layers         │  - Schema + validation  │
//! │  - Groups/Shapes  │  - Transforms, paint    │
//! │  - Pick keys      │  - Selectors            │
//! ├─────────────────────────────────────────────┤
//! │  Animation        │  Serialization          │
//! │  - Scheduler      │  - Node documents       │
//! │  - Tweens/easing  │  - Byte-stable JSON     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Rasterization lives in `streak-renderer`; this crate only describes
//! drawing through the [`Context`] trait.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod attrs;
pub mod color;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod node;
pub mod paint;
pub mod selector;
pub mod serialize;
pub mod shape;
pub mod stage;

pub use attrs::Tristate;
pub use color::{ColorKey, Rgba};
pub use config::EngineConfig;
pub use context::Context;
pub use error::{SceneError, SceneResult};
pub use geometry::{Matrix, Rect, Vector2d};
pub use node::{LayerAttrs, Node, NodeAttrs, NodeId, NodeKind, NodeType};
pub use paint::{FillPriority, LineCap, LineJoin, Paint, PatternFill, PatternImage, Shadow};
pub use selector::Selector;
pub use serialize::NodeDocument;
pub use shape::{DrawFn, Shape, ShapeKind};
pub use stage::Stage;

/// Streak core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
