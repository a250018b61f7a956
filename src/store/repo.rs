//! Per-repository documents: the stack tree and the branch cache.
//!
//! The tree is the authoritative parent relation, stored as a nested map
//! (branch → children) so cycles are structurally impossible and a
//! reparent is a local edit. Branch metadata (worktree path, PR identity,
//! flags) lives in a separate cache document so cosmetic re-parenting does
//! not rewrite cache lines.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{load_json, save_json};

/// Nested children map. Keys are branch names; values are their children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeNode(pub BTreeMap<String, TreeNode>);

impl TreeNode {
    /// Depth-first traversal of all names in the subtree, parents first.
    /// Siblings come out in sorted order (BTreeMap iteration).
    pub fn dfs(&self, out: &mut Vec<(String, Option<String>)>, parent: Option<&str>) {
        for (name, children) in &self.0 {
            out.push((name.clone(), parent.map(|p| p.to_string())));
            children.dfs(out, Some(name));
        }
    }

    /// Find the node for `name` in this subtree.
    pub fn find(&self, name: &str) -> Option<&TreeNode> {
        if let Some(node) = self.0.get(name) {
            return Some(node);
        }
        self.0.values().find_map(|child| child.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut TreeNode> {
        if self.0.contains_key(name) {
            return self.0.get_mut(name);
        }
        self.0.values_mut().find_map(|child| child.find_mut(name))
    }

    /// Remove `name` from the subtree, splicing its children into its
    /// former position (they reparent to the removed node's parent).
    /// Returns true when the node was found.
    pub fn remove_splice(&mut self, name: &str) -> bool {
        if let Some(removed) = self.0.remove(name) {
            for (child, grandchildren) in removed.0 {
                self.0.insert(child, grandchildren);
            }
            return true;
        }
        self.0.values_mut().any(|child| child.remove_splice(name))
    }

    /// Detach `name` with its whole subtree. Returns the subtree when found.
    pub fn detach(&mut self, name: &str) -> Option<TreeNode> {
        if let Some(node) = self.0.remove(name) {
            return Some(node);
        }
        self.0.values_mut().find_map(|child| child.detach(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One stack in the persistent document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRecord {
    pub name: String,
    /// Short hash derived from the root branch name
    pub hash: String,
    /// Root branch (its parent is `base_branch`)
    pub root: String,
    pub base_branch: String,
    /// Authoritative parent relation: root → children, recursively
    pub tree: TreeNode,
}

/// `stacks.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackDoc {
    #[serde(default)]
    pub stacks: BTreeMap<String, StackRecord>,
}

impl StackDoc {
    pub fn path(state_dir: &Path) -> PathBuf {
        state_dir.join("stacks.json")
    }

    pub fn load(state_dir: &Path) -> Result<Self> {
        load_json(&Self::path(state_dir))
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        save_json(&Self::path(state_dir), self)
    }
}

/// Cached per-branch metadata, joined onto the tree on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub worktree_path: String,
    #[serde(default)]
    pub pr_number: u64,
    #[serde(default)]
    pub pr_url: String,
    #[serde(default)]
    pub is_merged: bool,
    #[serde(default)]
    pub is_remote: bool,
}

/// `cache.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheDoc {
    #[serde(default)]
    pub branches: BTreeMap<String, CacheEntry>,
}

impl CacheDoc {
    pub fn path(state_dir: &Path) -> PathBuf {
        state_dir.join("cache.json")
    }

    pub fn load(state_dir: &Path) -> Result<Self> {
        load_json(&Self::path(state_dir))
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        save_json(&Self::path(state_dir), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree(pairs: &[(&str, &str)]) -> TreeNode {
        // Build from (child, parent) pairs; "" parent means root
        let mut root = TreeNode::default();
        for (child, parent) in pairs {
            if parent.is_empty() {
                root.0.insert(child.to_string(), TreeNode::default());
            } else {
                root.find_mut(parent)
                    .expect("parent must be inserted first")
                    .0
                    .insert(child.to_string(), TreeNode::default());
            }
        }
        root
    }

    #[test]
    fn test_dfs_parents_first() {
        let t = tree(&[("a", ""), ("b", "a"), ("c", "b"), ("d", "a")]);
        let mut out = Vec::new();
        t.dfs(&mut out, None);

        let names: Vec<&str> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
        assert_eq!(out[0].1, None);
        assert_eq!(out[1].1.as_deref(), Some("a"));
        assert_eq!(out[2].1.as_deref(), Some("b"));
        assert_eq!(out[3].1.as_deref(), Some("a"));
    }

    #[test]
    fn test_remove_splice_reparents_children() {
        let mut t = tree(&[("a", ""), ("b", "a"), ("c", "b")]);
        assert!(t.remove_splice("b"));

        // c now hangs directly under a
        let mut out = Vec::new();
        t.dfs(&mut out, None);
        assert_eq!(
            out,
            vec![
                ("a".to_string(), None),
                ("c".to_string(), Some("a".to_string()))
            ]
        );
    }

    #[test]
    fn test_remove_splice_missing() {
        let mut t = tree(&[("a", "")]);
        assert!(!t.remove_splice("zzz"));
    }

    #[test]
    fn test_detach_subtree() {
        let mut t = tree(&[("a", ""), ("b", "a"), ("c", "b")]);
        let sub = t.detach("b").unwrap();
        assert!(sub.contains("c"));
        assert!(!t.contains("b"));
        assert!(!t.contains("c"));
        assert!(t.contains("a"));
    }

    #[test]
    fn test_stack_doc_roundtrip() {
        let dir = tempdir().unwrap();

        let mut doc = StackDoc::default();
        doc.stacks.insert(
            "feature-a".to_string(),
            StackRecord {
                name: "feature-a".to_string(),
                hash: "0011aabb".to_string(),
                root: "feature-a".to_string(),
                base_branch: "main".to_string(),
                tree: tree(&[("feature-a", ""), ("feature-b", "feature-a")]),
            },
        );
        doc.save(dir.path()).unwrap();

        let loaded = StackDoc::load(dir.path()).unwrap();
        assert_eq!(loaded.stacks.len(), 1);
        let rec = &loaded.stacks["feature-a"];
        assert_eq!(rec.root, "feature-a");
        assert_eq!(rec.tree, doc.stacks["feature-a"].tree);
    }

    #[test]
    fn test_cache_doc_roundtrip_and_defaults() {
        let dir = tempdir().unwrap();

        let mut doc = CacheDoc::default();
        doc.branches.insert(
            "feature-a".to_string(),
            CacheEntry {
                worktree_path: "/wt/feature-a".to_string(),
                pr_number: 12,
                pr_url: "https://github.com/acme/widgets/pull/12".to_string(),
                is_merged: false,
                is_remote: false,
            },
        );
        doc.save(dir.path()).unwrap();

        let loaded = CacheDoc::load(dir.path()).unwrap();
        assert_eq!(loaded.branches["feature-a"].pr_number, 12);

        // Missing documents load as empty
        let empty = CacheDoc::load(&dir.path().join("elsewhere")).unwrap();
        assert!(empty.branches.is_empty());
    }

    #[test]
    fn test_tree_serializes_as_plain_nested_map() {
        let t = tree(&[("a", ""), ("b", "a")]);
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, r#"{"a":{"b":{}}}"#);
    }
}
