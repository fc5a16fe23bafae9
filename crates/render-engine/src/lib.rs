//! Recast Render Engine
//!
//! The media-facing side of Recast: everything the assembly engine
//! treats as an external collaborator.
//!
//! # Pipeline Architecture
//!
//! ```text
//! session.json ──┐
//!                ├── TimelineBuilder ◄── FfprobeProbe (dimensions, durations, caps)
//! config ────────┘         │        ◄── SvgCompositeRenderer (annotation frames)
//!                          ▼
//!                     Composition
//!                          │
//!                          ├── emit() ──► CompositionBackend
//!                          ▼
//!                     XgesBackend
//!                          │
//!                          ▼
//!                    project.xges
//! ```

pub mod backend;
pub mod composite;
pub mod export;
pub mod probe;
pub mod xges;

pub use backend::{emit, CompositionBackend};
pub use composite::SvgCompositeRenderer;
pub use export::*;
pub use probe::FfprobeProbe;
pub use xges::XgesBackend;
