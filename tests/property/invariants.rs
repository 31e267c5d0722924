//! Numeric and capacity bounds

use proptest::prelude::*;
use specforge::cache::{CacheKey, RegenerationCache};
use specforge::context::filter::reduction_percent;
use std::time::Duration;

/// Test that reduction stays within [0, 100] for any counts
#[test]
fn test_reduction_percent_bounds_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(&(0usize..10_000, 0usize..10_000), |(original, filtered)| {
        let percent = reduction_percent(original, filtered);
        assert!((0.0..=100.0).contains(&percent));
        if filtered >= original {
            assert_eq!(percent, 0.0);
        }
        Ok(())
    }).unwrap();
}

/// Test that the cache never holds more entries than its capacity
#[test]
fn test_cache_respects_capacity_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner.run(
        &(1usize..8, prop::collection::vec(("[a-c]", "[a-e]"), 0..40)),
        |(capacity, keys)| {
            let cache: RegenerationCache<usize> =
                RegenerationCache::new(capacity, Duration::from_secs(60));
            for (i, (hash, package)) in keys.iter().enumerate() {
                cache.insert(CacheKey::new(hash.as_str(), package.as_str()), i);
                assert!(cache.stats().entries <= capacity);
            }
            if let Some((hash, package)) = keys.last() {
                assert_eq!(
                    cache.get(&CacheKey::new(hash.as_str(), package.as_str())),
                    Some(keys.len() - 1)
                );
            }
            Ok(())
        },
    ).unwrap();
}
