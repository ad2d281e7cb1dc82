//! Record-count heuristic against catastrophic truncation.
//!
//! Coarse by nature: it catches a codec bug that would wipe most of a
//! document, not ordinary deletes.

use crate::config::GuardConfig;
use crate::error::{EngineError, EngineResult};
use std::path::Path;

/// Whether replacing `existing` records with `proposed` trips the guard.
pub fn trips(guard: &GuardConfig, existing: usize, proposed: usize) -> bool {
    existing > guard.min_existing_records
        && (proposed as f64) < (existing as f64) * guard.max_drop_ratio
}

/// Fail with `DataLossGuard` when the rewrite would drop too many records.
pub fn check_data_loss(
    guard: &GuardConfig,
    path: &Path,
    existing: usize,
    proposed: usize,
) -> EngineResult<()> {
    if trips(guard, existing, proposed) {
        return Err(EngineError::DataLossGuard {
            path: path.to_path_buf(),
            existing,
            proposed,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_at_half() {
        let guard = GuardConfig::default();
        assert!(!trips(&guard, 6, 3));
        assert!(trips(&guard, 6, 2));
    }

    #[test]
    fn small_documents_are_never_guarded() {
        let guard = GuardConfig::default();
        assert!(!trips(&guard, 5, 0));
        assert!(!trips(&guard, 0, 0));
    }

    #[test]
    fn growth_is_always_allowed() {
        let guard = GuardConfig::default();
        assert!(!trips(&guard, 40, 41));
    }

    #[test]
    fn thresholds_are_configurable() {
        let guard = GuardConfig {
            min_existing_records: 2,
            max_drop_ratio: 0.9,
        };
        assert!(trips(&guard, 3, 2));
    }
}
