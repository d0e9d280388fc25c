//! Uniform random selection from media pools.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};

use crate::listing::list_files;
use crate::normalize::is_converted_artifact;

/// The eligible files of `dir`: regular files matching `extensions`,
/// excluding previously normalized stills.
pub fn media_pool(dir: &Path, extensions: &[String]) -> ReelsmithResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ReelsmithError::not_found(dir));
    }
    let pool: Vec<PathBuf> = list_files(dir, extensions)?
        .into_iter()
        .filter(|p| !is_converted_artifact(p))
        .collect();
    if pool.is_empty() {
        return Err(ReelsmithError::EmptyPool {
            dir: dir.to_path_buf(),
            extensions: extensions.to_vec(),
        });
    }
    Ok(pool)
}

/// Picks media files uniformly at random from a pool.
///
/// The random source is owned by the selector so that a seeded selector
/// reproduces the same picks and audio offsets.
#[derive(Debug, Clone)]
pub struct MediaSelector<R = StdRng> {
    rng: R,
}

impl MediaSelector<StdRng> {
    /// Selector seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Deterministic selector.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> MediaSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// One uniformly random file from `dir`.
    pub fn select(&mut self, dir: &Path, extensions: &[String]) -> ReelsmithResult<PathBuf> {
        let pool = media_pool(dir, extensions)?;
        let picked = self.pick(&pool).clone();
        tracing::debug!(dir = %dir.display(), picked = %picked.display(), "Selected media");
        Ok(picked)
    }

    /// `count` independent picks from `dir`; the same file may repeat.
    pub fn select_many(
        &mut self,
        dir: &Path,
        extensions: &[String],
        count: usize,
    ) -> ReelsmithResult<Vec<PathBuf>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let pool = media_pool(dir, extensions)?;
        Ok((0..count).map(|_| self.pick(&pool).clone()).collect())
    }

    /// Two different elements, uniform over unordered pairs.
    ///
    /// The second draw is repeated until it differs from the first.
    pub fn select_two_distinct<'a, T>(&mut self, pool: &'a [T]) -> ReelsmithResult<(&'a T, &'a T)> {
        if pool.len() < 2 {
            return Err(ReelsmithError::InsufficientPool {
                required: 2,
                available: pool.len(),
            });
        }
        let first = self.rng.gen_range(0..pool.len());
        let second = loop {
            let candidate = self.rng.gen_range(0..pool.len());
            if candidate != first {
                break candidate;
            }
        };
        Ok((&pool[first], &pool[second]))
    }

    /// Uniform offset in `[0, max]`.
    pub fn offset_within(&mut self, max: f64) -> f64 {
        if max <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..=max)
    }

    // Callers guarantee a non-empty pool.
    fn pick<'a, T>(&mut self, pool: &'a [T]) -> &'a T {
        &pool[self.rng.gen_range(0..pool.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
    }

    #[test]
    fn test_select_returns_member_of_filtered_set() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["a.mp4", "b.MOV", "c.txt", "d_converted.jpg"]);
        let allowed = exts(&[".mp4", ".mov"]);
        let mut selector = MediaSelector::seeded(7);

        for _ in 0..50 {
            let picked = selector.select(dir.path(), &allowed).unwrap();
            let name = picked.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name == "a.mp4" || name == "b.MOV", "unexpected pick {name}");
        }
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MediaSelector::seeded(1)
            .select(&dir.path().join("nope"), &exts(&[".mp4"]))
            .unwrap_err();
        assert!(matches!(err, ReelsmithError::NotFound { .. }));
    }

    #[test]
    fn test_no_matching_files_is_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["readme.md"]);
        let err = MediaSelector::seeded(1)
            .select(dir.path(), &exts(&[".mp3", ".wav"]))
            .unwrap_err();
        assert!(matches!(err, ReelsmithError::EmptyPool { .. }));
        assert!(err.to_string().contains(".mp3, .wav"));
    }

    #[test]
    fn test_select_many_repeats_from_small_pool() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &["only.mp4"]);
        let picks = MediaSelector::seeded(3)
            .select_many(dir.path(), &exts(&[".mp4"]), 9)
            .unwrap();
        assert_eq!(picks.len(), 9);
        assert!(picks.iter().all(|p| p.ends_with("only.mp4")));
    }

    #[test]
    fn test_two_distinct_requires_two() {
        let mut selector = MediaSelector::seeded(1);
        let err = selector.select_two_distinct(&["solo"]).unwrap_err();
        assert!(matches!(
            err,
            ReelsmithError::InsufficientPool {
                required: 2,
                available: 1
            }
        ));
        let empty: [&str; 0] = [];
        assert!(selector.select_two_distinct(&empty).is_err());
    }

    #[test]
    fn test_two_distinct_is_uniform_over_unordered_pairs() {
        let pool = [0usize, 1, 2, 3];
        let mut selector = MediaSelector::seeded(42);
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        let trials = 60_000;

        for _ in 0..trials {
            let (a, b) = selector.select_two_distinct(&pool).unwrap();
            let key = ((*a).min(*b), (*a).max(*b));
            *counts.entry(key).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        let expected = trials as f64 / 6.0;
        for (pair, count) in counts {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "pair {pair:?} drawn {count} times");
        }
    }

    #[test]
    fn test_seeded_selectors_agree() {
        let pool: Vec<u32> = (0..100).collect();
        let mut a = MediaSelector::seeded(9);
        let mut b = MediaSelector::seeded(9);
        for _ in 0..20 {
            assert_eq!(
                a.select_two_distinct(&pool).unwrap(),
                b.select_two_distinct(&pool).unwrap()
            );
            assert_eq!(a.offset_within(10.0), b.offset_within(10.0));
        }
    }

    proptest! {
        #[test]
        fn prop_two_distinct_never_collide(len in 2usize..50, seed in any::<u64>()) {
            let pool: Vec<usize> = (0..len).collect();
            let mut selector = MediaSelector::seeded(seed);
            let (a, b) = selector.select_two_distinct(&pool).unwrap();
            prop_assert_ne!(a, b);
        }

        #[test]
        fn prop_offset_within_bounds(max in 0.0f64..1_000.0, seed in any::<u64>()) {
            let offset = MediaSelector::seeded(seed).offset_within(max);
            prop_assert!((0.0..=max).contains(&offset));
        }
    }
}
