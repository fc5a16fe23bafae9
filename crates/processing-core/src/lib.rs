//! Recast Processing Core: The Timeline Assembly Engine
//!
//! Turns a parsed conference recording into a layered composition:
//! - **Geometry:** Aspect-preserving fits and the canvas column layout
//! - **Windowing:** Re-basing clips onto the trimmed output timeline
//! - **Intervals:** Splitting overlapping annotation shapes into composite spans
//! - **Assets:** Deduplicated, probe-once media registration
//! - **Timeline:** Layer-by-layer assembly of the final composition
//!
//! This crate is pure computation. Media probing and composite rendering
//! go through the [`MediaProbe`] and [`CompositeRenderer`] traits.

pub mod assets;
pub mod geometry;
pub mod intervals;
pub mod timeline;
pub mod window;

pub use assets::{AssetRegistry, MediaProbe, StaticProbe};
pub use geometry::{constrain, CanvasLayout};
pub use intervals::{partition, resolve_annotations, Interval, ShapeInterval};
pub use timeline::{CompositeRenderer, TimelineBuilder};
pub use window::{window_clip, ClipTiming, VisibleWindow};
