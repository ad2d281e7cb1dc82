//! Field-by-field merging of configuration tiers.
//!
//! Each tier is parsed from YAML into a `serde_json::Value`; later tiers win
//! key by key. Arrays and scalars are replaced whole.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// - Objects merge recursively, overlay keys winning
/// - A null overlay keeps the base value (null means "not specified")
/// - Anything else in the overlay replaces the base
///
/// # Example
/// ```
/// use serde_json::json;
/// use plandoc::config::deep_merge;
///
/// let base = json!({ "storage": { "docs_root": "docs", "plan_file": "plan.md" } });
/// let overlay = json!({ "storage": { "docs_root": "/srv/roadmap" } });
/// let merged = deep_merge(base, overlay);
/// assert_eq!(merged["storage"]["docs_root"], "/srv/roadmap");
/// assert_eq!(merged["storage"]["plan_file"], "plan.md");
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold `deep_merge` over tiers ordered lowest to highest priority.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_keys_merge_individually() {
        let base = json!({"guard": {"min_existing_records": 5, "max_drop_ratio": 0.5}});
        let overlay = json!({"guard": {"min_existing_records": 10}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"guard": {"min_existing_records": 10, "max_drop_ratio": 0.5}})
        );
    }

    #[test]
    fn null_keeps_lower_tier() {
        let base = json!({"server": {"port": 31995}});
        let overlay = json!({"server": {"port": null}});
        assert_eq!(deep_merge(base, overlay), json!({"server": {"port": 31995}}));
    }

    #[test]
    fn arrays_and_scalars_are_replaced() {
        let base = json!({"headers": ["## A", "## B"], "port": 1});
        let overlay = json!({"headers": ["## C"], "port": {"nested": true}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"headers": ["## C"], "port": {"nested": true}})
        );
    }

    #[test]
    fn later_tiers_win() {
        let tiers = vec![json!({"a": 1}), json!({"b": 2}), json!({"a": 3})];
        assert_eq!(deep_merge_all(tiers), json!({"a": 3, "b": 2}));
    }
}
