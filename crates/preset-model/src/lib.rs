//! Reelsmith Preset Model
//!
//! Defines the data contracts for video-assembly recipes:
//! - **Preset:** tagged `Standard` (multi-segment + text) or `ShortForm`
//!   (source clip + image overlays) recipes, validated once at load time
//! - **Resolution:** strict `"<width>x<height>"` output dimension parsing
//! - **Store:** a JSON file mapping preset names to presets
//!
//! Field names on disk are camelCase so existing preset files load as-is.

pub mod preset;
pub mod resolution;
pub mod store;

pub use preset::*;
pub use resolution::*;
pub use store::*;
