//! Reelsmith Media Core
//!
//! Everything that touches the media library before a render is planned:
//! - **Listing:** extension-filtered, case-insensitive directory scans
//! - **Selector:** uniform random picks from a pool, with or without repetition
//! - **Normalize:** re-encode arbitrary stills into a fixed JPEG profile
//!
//! Randomness is always injected so that callers can seed it.

pub mod listing;
pub mod normalize;
pub mod selector;

pub use listing::{list_files, list_subdirectories};
pub use normalize::{normalize_image, normalize_image_blocking};
pub use selector::{media_pool, MediaSelector};
