//! Recast Project Model
//!
//! Defines the data contracts shared by the assembly engine and its
//! collaborators:
//! - **Time:** integer nanosecond time points anchored at recording start
//! - **Session:** already-parsed event streams of a recorded conference
//!   (slides, pointer, screen share, annotation shapes)
//! - **Composition:** the assembled output, an ordered list of layers of
//!   placed clips referencing registered assets
//!
//! Cursor positions are normalized to `[0.0, 1.0]` relative to the slide
//! they were recorded over.

pub mod composition;
pub mod session;
pub mod time;

pub use composition::*;
pub use session::*;
pub use time::{format_ns, ns_to_secs, secs_to_ns, TimeNs, SECOND};
