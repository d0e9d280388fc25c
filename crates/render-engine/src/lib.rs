//! Reelsmith Render Engine
//!
//! Turns validated presets into encoded videos:
//!
//! ```text
//! media pools ──► selector ──► normalizer (stills)
//!                                  │
//! preset ─────────────────────► graph builder ──► FilterGraph (typed)
//!                                                     │
//!                            render request ◄─────────┘
//!                                  │
//!                                  ▼
//!                           ffmpeg (-filter_complex)
//!                                  │
//!                                  ▼
//!                              output.mp4
//! ```
//!
//! The batch controller repeats the short-form pipeline over many source
//! clips, one at a time, isolating per-item failures.

pub mod batch;
pub mod builder;
pub mod compose;
pub mod graph;
pub mod jobs;
pub mod render;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::*;
pub use builder::*;
pub use compose::*;
pub use graph::*;
pub use jobs::*;
pub use render::*;
pub use thumbnail::*;
