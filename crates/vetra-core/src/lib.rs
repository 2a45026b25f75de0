//! Vetra core: the types every other vetra crate speaks.
//!
//! Paths come in as verb streams, geometry travels as `kurbo` scalars
//! next to our own integer rectangles, and the error types for the
//! persisted-state layer live here so both subsystems can share them.
//!
//! - [`geom`]: `IPoint`/`IRect` plus bridges to `kurbo::Rect`
//! - [`path`]: verb/point storage and the force-closing [`path::PathCursor`]
//! - [`error`]: `thiserror` enums and the crate-level [`Result`]

pub mod error;
pub mod geom;
pub mod path;

pub use error::{DeserializeError, Result};
pub use geom::{IPoint, IRect};
pub use path::{Path, PathCursor, SegmentMask, Verb};
