//! The merge engine: recursive mapping merge with pluggable conflict resolution.
//!
//! Mapping values meeting under the same key always recurse. Every other
//! collision is handed to a [`ConflictResolver`], so each layer of a
//! configuration stack can choose additive, authoritative, or deduplicating
//! semantics per merge call.

use serde_json::Value;

use crate::types::Mapping;

/// Arbitrates a key present in both mappings where at least one side is not a
/// mapping. Implementations mutate `first[key]`.
///
/// Any `Fn(&mut Mapping, &Mapping, &str)` closure is a resolver too.
pub trait ConflictResolver {
    fn resolve(&self, first: &mut Mapping, second: &Mapping, key: &str);
}

impl<F> ConflictResolver for F
where
    F: Fn(&mut Mapping, &Mapping, &str),
{
    fn resolve(&self, first: &mut Mapping, second: &Mapping, key: &str) {
        self(first, second, key)
    }
}

/// `second` always wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Greedy;

impl ConflictResolver for Greedy {
    fn resolve(&self, first: &mut Mapping, second: &Mapping, key: &str) {
        if let Some(incoming) = second.get(key) {
            first.insert(key.to_string(), incoming.clone());
        }
    }
}

/// Accumulates into sequences; otherwise only replaces a null.
///
/// A sequence in `first` is extended by a sequence in `second`, or gets a
/// scalar appended. A null in `second` never changes anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoneAware;

impl ConflictResolver for NoneAware {
    fn resolve(&self, first: &mut Mapping, second: &Mapping, key: &str) {
        let Some(incoming) = second.get(key) else {
            return;
        };
        match first.get_mut(key) {
            Some(Value::Array(items)) => match incoming {
                Value::Array(more) => items.extend(more.iter().cloned()),
                Value::Null => {}
                other => items.push(other.clone()),
            },
            Some(Value::Null) | None => {
                first.insert(key.to_string(), incoming.clone());
            }
            Some(_) => {}
        }
    }
}

/// Appends the items of `second`'s sequence that `first`'s sequence lacks,
/// keeping `first`'s order. Anything else falls back to [`Greedy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniqueAppendList;

impl ConflictResolver for UniqueAppendList {
    fn resolve(&self, first: &mut Mapping, second: &Mapping, key: &str) {
        if let (Some(Value::Array(items)), Some(Value::Array(more))) =
            (first.get_mut(key), second.get(key))
        {
            for item in more {
                if !items.contains(item) {
                    items.push(item.clone());
                }
            }
            return;
        }
        Greedy.resolve(first, second, key);
    }
}

/// Merge `second` into `first` in place.
///
/// Keys missing from `first` are copied without consulting `resolver`. Keys
/// holding a mapping on both sides recurse with the same resolver.
pub fn merge<R>(first: &mut Mapping, second: &Mapping, resolver: &R)
where
    R: ConflictResolver + ?Sized,
{
    for (key, incoming) in second {
        if let (Some(Value::Object(existing)), Value::Object(nested)) = (first.get_mut(key), incoming)
        {
            merge(existing, nested, resolver);
        } else if first.contains_key(key) {
            resolver.resolve(first, second, key);
        } else {
            first.insert(key.clone(), incoming.clone());
        }
    }
}

/// Insert `value` at the nested location named by `path`, creating
/// intermediate mappings as needed.
///
/// When the leaf already holds a mapping and `value` is a mapping too, the two
/// are merged greedily. An intermediate segment holding a non-mapping value is
/// replaced by a mapping. An empty `path` is a no-op.
pub fn insert<S: AsRef<str>>(mapping: &mut Mapping, value: Value, path: &[S]) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = mapping;
    for segment in parents {
        let slot = current
            .entry(segment.as_ref())
            .or_insert_with(|| Value::Object(Mapping::new()));
        if !slot.is_object() {
            *slot = Value::Object(Mapping::new());
        }
        let Value::Object(next) = slot else {
            return;
        };
        current = next;
    }

    let leaf = leaf.as_ref();
    if let Some(Value::Object(existing)) = current.get_mut(leaf)
        && let Value::Object(incoming) = &value
    {
        merge(existing, incoming, &Greedy);
        return;
    }
    current.insert(leaf.to_string(), value);
}

/// [`insert`] with a dotted key (`"db.host"` → `{db = {host = ...}}`).
pub fn insert_dotted(mapping: &mut Mapping, value: Value, dotted_key: &str) {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    insert(mapping, value, &segments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strategy;
    use serde_json::json;
    use std::cell::Cell;

    fn mapping(value: Value) -> Mapping {
        match value {
            Value::Object(m) => m,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn disjoint_keys_union_under_every_strategy() {
        for strategy in [Strategy::Greedy, Strategy::NoneAware, Strategy::UniqueAppendList] {
            let mut first = mapping(json!({"host": "localhost", "tags": ["a"]}));
            let second = mapping(json!({"port": 3000, "db": {"url": "pg://"}}));
            merge(&mut first, &second, &strategy);
            assert_eq!(
                Value::Object(first),
                json!({"host": "localhost", "tags": ["a"], "port": 3000, "db": {"url": "pg://"}})
            );
        }
    }

    #[test]
    fn greedy_second_wins() {
        let mut first = mapping(json!({"port": 8080}));
        merge(&mut first, &mapping(json!({"port": 3000})), &Greedy);
        assert_eq!(first["port"], json!(3000));
    }

    #[test]
    fn nested_mappings_recurse_without_calling_resolver() {
        let calls = Cell::new(0);
        let counting = |first: &mut Mapping, second: &Mapping, key: &str| {
            assert!(!(first[key].is_object() && second[key].is_object()));
            calls.set(calls.get() + 1);
            Greedy.resolve(first, second, key);
        };
        let mut first = mapping(json!({"database": {"url": "pg://old", "pool_size": 5}}));
        let second = mapping(json!({"database": {"pool_size": 20}}));
        merge(&mut first, &second, &counting);
        assert_eq!(calls.get(), 1);
        assert_eq!(
            Value::Object(first),
            json!({"database": {"url": "pg://old", "pool_size": 20}})
        );
    }

    #[test]
    fn resolver_never_called_for_key_missing_from_first() {
        let calls = Cell::new(0);
        let counting = |_: &mut Mapping, _: &Mapping, _: &str| calls.set(calls.get() + 1);
        let mut first = mapping(json!({"a": 1}));
        merge(&mut first, &mapping(json!({"b": [1, 2], "c": null})), &counting);
        assert_eq!(calls.get(), 0);
        assert_eq!(Value::Object(first), json!({"a": 1, "b": [1, 2], "c": null}));
    }

    #[test]
    fn scalar_replaces_mapping_under_greedy() {
        let mut first = mapping(json!({"database": {"url": "x"}}));
        merge(&mut first, &mapping(json!({"database": "flat"})), &Greedy);
        assert_eq!(first["database"], json!("flat"));
    }

    #[test]
    fn deeply_nested_three_levels() {
        let mut first = mapping(json!({"a": {"b": {"c": {"val": 1, "other": "keep"}}}}));
        merge(&mut first, &mapping(json!({"a": {"b": {"c": {"val": 99}}}})), &Greedy);
        assert_eq!(first["a"]["b"]["c"], json!({"val": 99, "other": "keep"}));
    }

    #[test]
    fn none_aware_fills_null_only() {
        let mut first = mapping(json!({"host": null, "port": 8080}));
        merge(&mut first, &mapping(json!({"host": "db", "port": 3000})), &NoneAware);
        assert_eq!(first["host"], json!("db"));
        assert_eq!(first["port"], json!(8080));
    }

    #[test]
    fn none_aware_extends_and_appends_lists() {
        let mut first = mapping(json!({"hosts": ["a"], "tags": ["x"]}));
        let second = mapping(json!({"hosts": ["b", "a"], "tags": "y"}));
        merge(&mut first, &second, &NoneAware);
        assert_eq!(first["hosts"], json!(["a", "b", "a"]));
        assert_eq!(first["tags"], json!(["x", "y"]));
    }

    #[test]
    fn none_aware_ignores_null_into_list() {
        let mut first = mapping(json!({"hosts": ["a"]}));
        merge(&mut first, &mapping(json!({"hosts": null})), &NoneAware);
        assert_eq!(first["hosts"], json!(["a"]));
    }

    #[test]
    fn none_aware_null_replaced_by_list() {
        let mut first = mapping(json!({"hosts": null}));
        merge(&mut first, &mapping(json!({"hosts": ["a"]})), &NoneAware);
        assert_eq!(first["hosts"], json!(["a"]));
    }

    #[test]
    fn unique_append_keeps_order_without_duplicates() {
        let mut first = mapping(json!({"nodes": ["c", "a", "b"]}));
        let second = mapping(json!({"nodes": ["a", "d", "c", "e", "d"]}));
        merge(&mut first, &second, &UniqueAppendList);
        assert_eq!(first["nodes"], json!(["c", "a", "b", "d", "e"]));
    }

    #[test]
    fn unique_append_falls_back_to_greedy() {
        let mut first = mapping(json!({"nodes": ["a"], "name": "old"}));
        merge(&mut first, &mapping(json!({"nodes": "z", "name": "new"})), &UniqueAppendList);
        assert_eq!(first["nodes"], json!("z"));
        assert_eq!(first["name"], json!("new"));
    }

    #[test]
    fn insert_creates_intermediate_mappings() {
        let mut target = Mapping::new();
        insert(&mut target, json!(42), &["a", "b", "c"]);
        assert_eq!(Value::Object(target), json!({"a": {"b": {"c": 42}}}));
    }

    #[test]
    fn insert_keeps_sibling_keys() {
        let mut target = mapping(json!({"db": {"port": 5432}}));
        insert_dotted(&mut target, json!("x"), "db.host");
        assert_eq!(Value::Object(target), json!({"db": {"port": 5432, "host": "x"}}));
    }

    #[test]
    fn insert_merges_mapping_into_existing_mapping() {
        let mut target = mapping(json!({"db": {"host": "a", "port": 1}}));
        insert(&mut target, json!({"port": 2, "user": "u"}), &["db"]);
        assert_eq!(target["db"], json!({"host": "a", "port": 2, "user": "u"}));
    }

    #[test]
    fn insert_scalar_overwrites_leaf() {
        let mut target = mapping(json!({"db": {"host": "a"}}));
        insert(&mut target, json!("flat"), &["db"]);
        assert_eq!(target["db"], json!("flat"));
    }

    #[test]
    fn insert_replaces_scalar_on_the_path() {
        let mut target = mapping(json!({"db": "flat"}));
        insert_dotted(&mut target, json!("h"), "db.host");
        assert_eq!(target["db"], json!({"host": "h"}));
    }

    #[test]
    fn insert_empty_path_is_noop() {
        let mut target = mapping(json!({"a": 1}));
        let empty: [&str; 0] = [];
        insert(&mut target, json!(2), &empty);
        assert_eq!(Value::Object(target), json!({"a": 1}));
    }
}
