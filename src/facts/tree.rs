//! Conversion between flat, path-addressed entries and nested trees
//!
//! Agents publish their state into the key/value store as flat entries:
//!
//! ```text
//! trento/v0/clusters/cluster1/name      -> "c1"
//! trento/v0/clusters/cluster1/nodes/h1  -> "up"
//! trento/v0/clusters/cluster1/nodes/h2  -> "down"
//! ```
//!
//! The hub reasons about the same data as a [`Tree`]:
//!
//! ```text
//! cluster1
//! ├── name: "c1"
//! └── nodes
//!     ├── h1: "up"
//!     └── h2: "down"
//! ```
//!
//! Everything in here is pure and operates on caller-owned data.
//!
//! ## Path policies
//!
//! - An empty segment (`a//b`, trailing `/`) stops the descent. Branches
//!   created before it are kept, the value is dropped.
//! - Colliding paths are resolved with last-write-wins. Collisions are logged,
//!   never returned as errors.
//! - Entries whose path equals the offset are skipped.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

/// Hierarchy separator used by the key/value store
pub const SEPARATOR: char = '/';

/// Nested representation of a set of key/value entries
///
/// Serializes as plain JSON: leaves are strings, branches are objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tree {
    Leaf(String),
    Branch(BTreeMap<String, Tree>),
}

impl Default for Tree {
    fn default() -> Self {
        Tree::branch()
    }
}

impl Tree {
    /// An empty branch
    pub fn branch() -> Self {
        Tree::Branch(BTreeMap::new())
    }

    pub fn leaf(value: impl Into<String>) -> Self {
        Tree::Leaf(value.into())
    }

    /// Add a child, turning a leaf into a branch first
    pub fn with(mut self, key: impl Into<String>, child: impl Into<Tree>) -> Self {
        if let Tree::Leaf(_) = self {
            self = Tree::branch();
        }
        if let Tree::Branch(children) = &mut self {
            children.insert(key.into(), child.into());
        }
        self
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Tree::Leaf(value) => Some(value),
            Tree::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&BTreeMap<String, Tree>> {
        match self {
            Tree::Leaf(_) => None,
            Tree::Branch(children) => Some(children),
        }
    }

    /// Look up a node by a `/`-separated path relative to this node
    pub fn get(&self, path: &str) -> Option<&Tree> {
        path.split(SEPARATOR)
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| match node {
                Tree::Branch(children) => children.get(segment),
                Tree::Leaf(_) => None,
            })
    }

    /// Look up a leaf value by path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Tree::as_leaf)
    }

    /// Number of leaves reachable from this node
    pub fn leaf_count(&self) -> usize {
        match self {
            Tree::Leaf(_) => 1,
            Tree::Branch(children) => children.values().map(Tree::leaf_count).sum(),
        }
    }

    /// `true` for a branch without children
    pub fn is_empty(&self) -> bool {
        matches!(self, Tree::Branch(children) if children.is_empty())
    }
}

impl From<&str> for Tree {
    fn from(value: &str) -> Self {
        Tree::Leaf(value.to_string())
    }
}

impl From<String> for Tree {
    fn from(value: String) -> Self {
        Tree::Leaf(value)
    }
}

impl From<BTreeMap<String, Tree>> for Tree {
    fn from(children: BTreeMap<String, Tree>) -> Self {
        Tree::Branch(children)
    }
}

impl<K: Into<String>> FromIterator<(K, Tree)> for Tree {
    fn from_iter<I: IntoIterator<Item = (K, Tree)>>(iter: I) -> Self {
        Tree::Branch(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Join a key onto a path, ignoring a trailing separator on the path
pub fn join(prefix: &str, key: &str) -> String {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{key}")
    }
}

/// Flatten a tree into `(path, value)` entries below `prefix`
///
/// The walk is depth-first in key order, so the output is deterministic.
/// Empty keys are never emitted and empty branches produce no entries.
pub fn flatten(prefix: &str, tree: &Tree) -> Vec<(String, String)> {
    let mut entries = Vec::with_capacity(tree.leaf_count());
    flatten_into(prefix.trim_end_matches(SEPARATOR), tree, &mut entries);
    entries
}

fn flatten_into(path: &str, tree: &Tree, entries: &mut Vec<(String, String)>) {
    match tree {
        Tree::Leaf(value) => {
            if path.is_empty() {
                warn!("dropping value {value:?} without a path");
                return;
            }
            entries.push((path.to_string(), value.clone()));
        }
        Tree::Branch(children) => {
            for (key, child) in children {
                if key.is_empty() {
                    trace!("skipping empty key below {path:?}");
                    continue;
                }
                flatten_into(&join(path, key), child, entries);
            }
        }
    }
}

/// Rebuild a tree from flat entries, stripping `offset` from every path
///
/// `offset` behaves the same with or without a trailing separator. Paths that
/// do not start with the offset are kept whole. Values are decoded as UTF-8,
/// replacing invalid sequences.
pub fn unflatten<I, K, V>(entries: I, offset: &str) -> Tree
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<[u8]>,
{
    let offset = normalize_offset(offset);
    let offset_key = offset.trim_end_matches(SEPARATOR);
    let mut root = BTreeMap::new();

    for (key, value) in entries {
        let key = key.as_ref().trim_matches(' ');

        let relative = match key.strip_prefix(offset.as_str()) {
            Some(rest) => rest,
            None if key == offset_key => "",
            None => key,
        };

        if relative.is_empty() {
            trace!("skipping entry at the offset itself: {key:?}");
            continue;
        }

        let value = String::from_utf8_lossy(value.as_ref()).into_owned();
        insert_path(&mut root, key, relative, value);
    }

    Tree::Branch(root)
}

fn normalize_offset(offset: &str) -> String {
    if offset.ends_with(SEPARATOR) {
        offset.to_string()
    } else {
        format!("{offset}{SEPARATOR}")
    }
}

fn insert_path(root: &mut BTreeMap<String, Tree>, key: &str, relative: &str, value: String) {
    let segments: Vec<&str> = relative.split(SEPARATOR).collect();
    let last = segments.len() - 1;
    let mut current = root;

    for (index, segment) in segments.into_iter().enumerate() {
        if segment.is_empty() {
            trace!("empty segment in {key:?}, dropping the rest of the path");
            return;
        }

        if index == last {
            if current
                .insert(segment.to_string(), Tree::Leaf(value))
                .is_some()
            {
                warn!("colliding path {key:?}, keeping the last written value");
            }
            return;
        }

        let child = current
            .entry(segment.to_string())
            .or_insert_with(Tree::branch);

        if let Tree::Leaf(previous) = child {
            warn!("colliding path {key:?} replaces value {previous:?} with a branch");
            *child = Tree::branch();
        }

        current = match child {
            Tree::Branch(children) => children,
            Tree::Leaf(_) => return,
        };
    }
}

/// Explicit decomposition of a value into a [`Tree`]
///
/// Implementations enumerate their own fields. Primitive values become
/// leaves, records become branches keyed by field name.
pub trait ToTree {
    fn to_tree(&self) -> Tree;
}

/// Decompose `value` and flatten it under `prefix`
///
/// A plain string ends up directly at `prefix`, anything structured ends up
/// below it, one entry per primitive field.
pub fn encode_for_storage<T: ToTree + ?Sized>(prefix: &str, value: &T) -> Vec<(String, String)> {
    flatten(prefix, &value.to_tree())
}

impl ToTree for Tree {
    fn to_tree(&self) -> Tree {
        self.clone()
    }
}

impl ToTree for str {
    fn to_tree(&self) -> Tree {
        Tree::Leaf(self.to_string())
    }
}

impl ToTree for String {
    fn to_tree(&self) -> Tree {
        Tree::Leaf(self.clone())
    }
}

impl<T: ToTree + ?Sized> ToTree for &T {
    fn to_tree(&self) -> Tree {
        (**self).to_tree()
    }
}

impl<T: ToTree> ToTree for Option<T> {
    fn to_tree(&self) -> Tree {
        match self {
            Some(value) => value.to_tree(),
            None => Tree::branch(),
        }
    }
}

impl<T: ToTree> ToTree for [T] {
    fn to_tree(&self) -> Tree {
        self.iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item.to_tree()))
            .collect()
    }
}

impl<T: ToTree> ToTree for Vec<T> {
    fn to_tree(&self) -> Tree {
        self.as_slice().to_tree()
    }
}

impl<V: ToTree> ToTree for BTreeMap<String, V> {
    fn to_tree(&self) -> Tree {
        self.iter().map(|(k, v)| (k.clone(), v.to_tree())).collect()
    }
}

impl<V: ToTree> ToTree for HashMap<String, V> {
    fn to_tree(&self) -> Tree {
        self.iter().map(|(k, v)| (k.clone(), v.to_tree())).collect()
    }
}

impl ToTree for serde_json::Value {
    fn to_tree(&self) -> Tree {
        use serde_json::Value;

        match self {
            Value::Null => Tree::branch(),
            Value::Bool(b) => Tree::Leaf(b.to_string()),
            Value::Number(n) => Tree::Leaf(n.to_string()),
            Value::String(s) => Tree::Leaf(s.clone()),
            Value::Array(items) => items.to_tree(),
            Value::Object(fields) => fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_tree()))
                .collect(),
        }
    }
}

macro_rules! leaf_to_tree {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToTree for $ty {
                fn to_tree(&self) -> Tree {
                    Tree::Leaf(self.to_string())
                }
            }
        )*
    };
}

leaf_to_tree!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cluster_tree() -> Tree {
        Tree::branch().with(
            "cluster1",
            Tree::branch().with("name", "c1").with(
                "nodes",
                Tree::branch().with("h1", "up").with("h2", "down"),
            ),
        )
    }

    fn entries(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_flatten_cluster_tree() {
        let flat = flatten("trento/v0/clusters", &cluster_tree());

        assert_eq!(
            flat,
            entries(&[
                ("trento/v0/clusters/cluster1/name", "c1"),
                ("trento/v0/clusters/cluster1/nodes/h1", "up"),
                ("trento/v0/clusters/cluster1/nodes/h2", "down"),
            ])
        );
    }

    #[test]
    fn test_unflatten_cluster_entries() {
        let flat = entries(&[
            ("trento/v0/clusters/cluster1/name", "c1"),
            ("trento/v0/clusters/cluster1/nodes/h1", "up"),
            ("trento/v0/clusters/cluster1/nodes/h2", "down"),
        ]);

        assert_eq!(unflatten(flat, "trento/v0/clusters"), cluster_tree());
    }

    #[test]
    fn test_flatten_ignores_trailing_separator_on_prefix() {
        assert_eq!(
            flatten("trento/v0/clusters/", &cluster_tree()),
            flatten("trento/v0/clusters", &cluster_tree())
        );
    }

    #[test]
    fn test_flatten_with_empty_prefix() {
        let tree = Tree::branch().with("a", Tree::branch().with("b", "1"));
        assert_eq!(flatten("", &tree), entries(&[("a/b", "1")]));
    }

    #[test]
    fn test_flatten_skips_empty_keys() {
        let tree = Tree::branch()
            .with("", "hidden")
            .with("k", Tree::branch().with("", "hidden").with("v", "1"));

        assert_eq!(flatten("p", &tree), entries(&[("p/k/v", "1")]));
    }

    #[test]
    fn test_flatten_leaf_at_prefix() {
        assert_eq!(flatten("p/q", &Tree::leaf("x")), entries(&[("p/q", "x")]));
        assert!(flatten("", &Tree::leaf("x")).is_empty());
    }

    #[test]
    fn test_offset_normalization() {
        let flat = entries(&[("a/b/c", "1"), ("a/b/d/e", "2")]);

        let without = unflatten(flat.clone(), "a/b");
        let with = unflatten(flat, "a/b/");

        assert_eq!(without, with);
        assert_eq!(without.get_str("c"), Some("1"));
        assert_eq!(without.get_str("d/e"), Some("2"));
    }

    #[test]
    fn test_entry_at_offset_is_skipped() {
        let flat = entries(&[("a/b", "self"), ("a/b/", "folder"), ("a/b/c", "1")]);

        let tree = unflatten(flat, "a/b");

        assert_eq!(tree, Tree::branch().with("c", "1"));
    }

    #[test]
    fn test_empty_segment_truncates_descent() {
        let flat = entries(&[("a/b//c", "dropped"), ("x/y", "kept")]);

        let tree = unflatten(flat, "");

        assert_eq!(
            tree,
            Tree::branch()
                .with("a", Tree::branch().with("b", Tree::branch()))
                .with("x", Tree::branch().with("y", "kept"))
        );
    }

    #[test]
    fn test_folder_keys_become_empty_branches() {
        let flat = entries(&[("hosts/h1/", ""), ("hosts/h2/name", "h2")]);

        let tree = unflatten(flat, "hosts");

        assert!(tree.get("h1").is_some_and(Tree::is_empty));
        assert_eq!(tree.get_str("h2/name"), Some("h2"));
    }

    #[test]
    fn test_colliding_leaf_last_write_wins() {
        let flat = entries(&[("a/b", "1"), ("a/b", "2")]);
        assert_eq!(unflatten(flat, "").get_str("a/b"), Some("2"));
    }

    #[test]
    fn test_branch_replaces_earlier_leaf() {
        let flat = entries(&[("a/b", "1"), ("a/b/c", "2")]);

        let tree = unflatten(flat, "");

        assert_eq!(tree.get_str("a/b/c"), Some("2"));
        assert_eq!(tree.leaf_count(), 1);
    }

    #[test]
    fn test_leaf_replaces_earlier_branch() {
        let flat = entries(&[("a/b/c", "2"), ("a/b", "1")]);

        let tree = unflatten(flat, "");

        assert_eq!(tree.get_str("a/b"), Some("1"));
        assert!(tree.get("a/b/c").is_none());
    }

    #[test]
    fn test_unflatten_trims_spaces_and_keeps_foreign_paths() {
        let flat = entries(&[("  a/b/c ", "1"), ("other/key", "2")]);

        let tree = unflatten(flat, "a/b");

        assert_eq!(tree.get_str("c"), Some("1"));
        assert_eq!(tree.get_str("other/key"), Some("2"));
    }

    #[test]
    fn test_unflatten_decodes_raw_bytes() {
        let flat = vec![("k".to_string(), b"value".to_vec())];
        assert_eq!(unflatten(flat, "").get_str("k"), Some("value"));
    }

    #[test]
    fn test_encode_string_at_prefix() {
        assert_eq!(
            encode_for_storage("trento/v0/hosts/h1/name", "h1"),
            entries(&[("trento/v0/hosts/h1/name", "h1")])
        );
    }

    #[test]
    fn test_encode_structured_json_value() {
        let value = serde_json::json!({
            "name": "h1",
            "cpus": 4,
            "virtual": false,
            "addresses": ["10.0.0.1", "10.0.0.2"],
            "cloud": null,
            "meta": { "env": "prod" }
        });

        let flat = encode_for_storage("hosts/h1", &value);

        assert_eq!(
            flat,
            entries(&[
                ("hosts/h1/addresses/0", "10.0.0.1"),
                ("hosts/h1/addresses/1", "10.0.0.2"),
                ("hosts/h1/cpus", "4"),
                ("hosts/h1/meta/env", "prod"),
                ("hosts/h1/name", "h1"),
                ("hosts/h1/virtual", "false"),
            ])
        );
    }

    #[test]
    fn test_encode_optional_values() {
        let none: Option<String> = None;
        assert!(encode_for_storage("p", &none).is_empty());
        assert_eq!(
            encode_for_storage("p", &Some(42u32)),
            entries(&[("p", "42")])
        );
    }

    #[test]
    fn test_tree_serializes_as_plain_json() {
        let json = serde_json::to_value(cluster_tree()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"cluster1": {"name": "c1", "nodes": {"h1": "up", "h2": "down"}}})
        );

        let back: Tree = serde_json::from_value(json).unwrap();
        assert_eq!(back, cluster_tree());
    }
}
