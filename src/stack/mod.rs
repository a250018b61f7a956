//! In-memory stack model.
//!
//! A stack is a rooted tree of branches whose root's parent is the base
//! branch. The authoritative structure is the nested tree from
//! `stacks.json`; the flat `branches` list every consumer reads is derived
//! from it on load and after each mutation, joining each node with its
//! cache entry. Keeping the split (authoritative tree, derived list) makes
//! the invariants cheap to re-check.

pub mod ops;

use anyhow::{bail, Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::store::{stack_hash, CacheDoc, CacheEntry, StackDoc, StackRecord, TreeNode};

/// A tracked branch: one node of a stack joined with its cached metadata.
#[derive(Debug, Clone)]
pub struct Branch {
    pub name: String,
    /// Parent branch; equals `base_branch` for stack roots
    pub parent: String,
    pub base_branch: String,
    /// Empty iff `is_remote`
    pub worktree_path: PathBuf,
    /// 0 means no PR known
    pub pr_number: u64,
    pub pr_url: String,
    /// Sticky: set when the PR is observed merged, cleared only by deletion
    pub is_merged: bool,
    /// Imported upstream branch: always a root, never rebased or deleted
    pub is_remote: bool,
}

impl Branch {
    pub fn has_pr(&self) -> bool {
        self.pr_number > 0
    }
}

/// One stack: identity + authoritative tree + derived branch list.
#[derive(Debug, Clone)]
pub struct Stack {
    pub name: String,
    pub hash: String,
    pub root: String,
    pub base_branch: String,
    pub tree: TreeNode,
    /// DFS order, parents before children
    pub branches: Vec<Branch>,
}

impl Stack {
    fn from_parts(root: String, base_branch: String, tree: TreeNode) -> Self {
        Self {
            hash: stack_hash(&root),
            name: root.clone(),
            root,
            base_branch,
            tree,
            branches: Vec::new(),
        }
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.tree.contains(branch)
    }
}

/// All stacks of one repository plus the branch cache.
#[derive(Debug, Clone, Default)]
pub struct Stacks {
    pub base_branch: String,
    stacks: Vec<Stack>,
    meta: BTreeMap<String, CacheEntry>,
}

impl Stacks {
    pub fn new(base_branch: &str) -> Self {
        Self {
            base_branch: base_branch.to_string(),
            stacks: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Persistence mapping
    // ──────────────────────────────────────────────────────────────

    pub fn from_docs(doc: StackDoc, cache: CacheDoc, base_branch: &str) -> Self {
        let mut stacks = Vec::new();
        for record in doc.stacks.into_values() {
            let mut stack = Stack::from_parts(record.root, record.base_branch, record.tree);
            stack.name = record.name;
            stack.hash = record.hash;
            stacks.push(stack);
        }

        let mut model = Self {
            base_branch: base_branch.to_string(),
            stacks,
            meta: cache.branches,
        };
        model.normalize();
        model
    }

    pub fn to_docs(&self) -> (StackDoc, CacheDoc) {
        let mut doc = StackDoc::default();
        for stack in &self.stacks {
            doc.stacks.insert(
                stack.name.clone(),
                StackRecord {
                    name: stack.name.clone(),
                    hash: stack.hash.clone(),
                    root: stack.root.clone(),
                    base_branch: stack.base_branch.clone(),
                    tree: stack.tree.clone(),
                },
            );
        }

        // Persist cache entries only for tracked branches
        let mut cache = CacheDoc::default();
        for branch in self.all_branches() {
            let entry = self.meta.get(&branch.name).cloned().unwrap_or_default();
            cache.branches.insert(branch.name.clone(), entry);
        }
        (doc, cache)
    }

    /// Re-establish structural form after a mutation: split stacks whose
    /// tree grew multiple roots, drop empty ones, re-key identity from the
    /// root, then rebuild the derived branch lists.
    fn normalize(&mut self) {
        let mut rebuilt = Vec::new();
        for stack in self.stacks.drain(..) {
            let base = stack.base_branch.clone();
            let roots: Vec<String> = stack.tree.0.keys().cloned().collect();
            if roots.len() == 1 && roots[0] == stack.root {
                rebuilt.push(stack);
                continue;
            }
            // Root changed or multiple roots: one stack per top-level entry
            let mut tree = stack.tree;
            for root in roots {
                if let Some(subtree) = tree.0.remove(&root) {
                    let mut node = TreeNode::default();
                    node.0.insert(root.clone(), subtree);
                    rebuilt.push(Stack::from_parts(root, base.clone(), node));
                }
            }
        }
        rebuilt.retain(|s| !s.tree.is_empty());
        rebuilt.sort_by(|a, b| a.name.cmp(&b.name));
        self.stacks = rebuilt;
        self.rebuild();
    }

    /// Derive each stack's flat branch list from its tree + the cache.
    fn rebuild(&mut self) {
        for stack in &mut self.stacks {
            let mut order = Vec::new();
            stack.tree.dfs(&mut order, None);

            let base = stack.base_branch.clone();
            stack.branches = order
                .into_iter()
                .map(|(name, parent)| {
                    let entry = self.meta.entry(name.clone()).or_default();
                    Branch {
                        parent: parent.unwrap_or_else(|| base.clone()),
                        base_branch: base.clone(),
                        worktree_path: PathBuf::from(&entry.worktree_path),
                        pr_number: entry.pr_number,
                        pr_url: entry.pr_url.clone(),
                        is_merged: entry.is_merged,
                        is_remote: entry.is_remote,
                        name,
                    }
                })
                .collect();
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Queries
    // ──────────────────────────────────────────────────────────────

    pub fn list_stacks(&self) -> &[Stack] {
        &self.stacks
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.stacks.iter().any(|s| s.contains(name))
    }

    /// The repository's base branch (or any stack's base) is "main".
    pub fn is_main_branch(&self, name: &str) -> bool {
        name == self.base_branch || self.stacks.iter().any(|s| s.base_branch == name)
    }

    pub fn get_branch(&self, name: &str) -> Option<&Branch> {
        self.stacks
            .iter()
            .flat_map(|s| s.branches.iter())
            .find(|b| b.name == name)
    }

    pub fn stack_of(&self, branch: &str) -> Option<&Stack> {
        self.stacks.iter().find(|s| s.contains(branch))
    }

    /// Stack containing the checked-out branch; error when there is none.
    pub fn current_stack(&self, current_branch: &str) -> Result<&Stack> {
        self.stack_of(current_branch).with_context(|| {
            format!(
                "Branch '{}' is not part of any stack. Run 'ezs stack' to register it, or 'ezs new' to start one.",
                current_branch
            )
        })
    }

    pub fn get_children(&self, name: &str) -> Vec<String> {
        if self.is_main_branch(name) {
            return self.stacks.iter().map(|s| s.root.clone()).collect();
        }
        match self.stacks.iter().find_map(|s| s.tree.find(name)) {
            Some(node) => node.0.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// All descendants of `name` in DFS order (excluding `name` itself).
    pub fn get_descendants(&self, name: &str) -> Vec<String> {
        match self.stacks.iter().find_map(|s| s.tree.find(name)) {
            Some(node) => {
                let mut out = Vec::new();
                node.dfs(&mut out, Some(name));
                out.into_iter().map(|(n, _)| n).collect()
            }
            None => Vec::new(),
        }
    }

    pub fn is_descendant_of(&self, candidate: &str, ancestor: &str) -> bool {
        self.get_descendants(ancestor).iter().any(|d| d == candidate)
    }

    pub fn all_branches(&self) -> Vec<&Branch> {
        self.stacks.iter().flat_map(|s| s.branches.iter()).collect()
    }

    /// Resolve a stack by its hash prefix (at least 3 characters).
    pub fn stack_by_hash_prefix(&self, prefix: &str) -> Result<&Stack> {
        if prefix.len() < 3 {
            bail!("Stack hash prefix must be at least 3 characters");
        }
        let matches: Vec<&Stack> = self
            .stacks
            .iter()
            .filter(|s| s.hash.starts_with(prefix))
            .collect();
        match matches.as_slice() {
            [one] => Ok(one),
            [] => bail!("No stack matches hash prefix '{}'", prefix),
            many => bail!(
                "Hash prefix '{}' is ambiguous ({} stacks match)",
                prefix,
                many.len()
            ),
        }
    }

    // ──────────────────────────────────────────────────────────────
    // Cache metadata access
    // ──────────────────────────────────────────────────────────────

    pub fn set_pr(&mut self, name: &str, number: u64, url: &str) {
        let entry = self.meta.entry(name.to_string()).or_default();
        entry.pr_number = number;
        entry.pr_url = url.to_string();
        self.rebuild();
    }

    /// Mark a branch merged. Sticky: never cleared except by deletion.
    pub fn set_merged(&mut self, name: &str) {
        self.meta.entry(name.to_string()).or_default().is_merged = true;
        self.rebuild();
    }

    // ──────────────────────────────────────────────────────────────
    // Structural mutations (model only; git wiring lives in ops)
    // ──────────────────────────────────────────────────────────────

    /// Insert a new stack rooted at `name`.
    pub fn insert_root(&mut self, name: &str, base_branch: &str, entry: CacheEntry) -> Result<()> {
        if self.is_tracked(name) {
            bail!("Branch '{}' is already tracked", name);
        }
        let mut tree = TreeNode::default();
        tree.0.insert(name.to_string(), TreeNode::default());
        self.stacks
            .push(Stack::from_parts(name.to_string(), base_branch.to_string(), tree));
        self.meta.insert(name.to_string(), entry);
        self.normalize();
        self.check_invariants()
    }

    /// Insert `name` as a child of a tracked `parent`.
    pub fn insert_under(&mut self, parent: &str, name: &str, entry: CacheEntry) -> Result<()> {
        if self.is_tracked(name) {
            bail!("Branch '{}' is already tracked", name);
        }
        let stack = self
            .stacks
            .iter_mut()
            .find(|s| s.contains(parent))
            .with_context(|| format!("Parent branch '{}' is not tracked", parent))?;
        stack
            .tree
            .find_mut(parent)
            .with_context(|| format!("Parent branch '{}' vanished from its stack", parent))?
            .0
            .insert(name.to_string(), TreeNode::default());
        self.meta.insert(name.to_string(), entry);
        self.normalize();
        self.check_invariants()
    }

    /// Remove `name` from its stack; children reparent to the removed
    /// node's parent (for a root, they become new stack roots).
    pub fn remove_branch(&mut self, name: &str) -> Result<()> {
        let stack = self
            .stacks
            .iter_mut()
            .find(|s| s.contains(name))
            .with_context(|| format!("Branch '{}' is not tracked", name))?;
        stack.tree.remove_splice(name);
        self.meta.remove(name);
        self.normalize();
        self.check_invariants()
    }

    /// Move `name` (with its subtree) under `new_parent`, which may be the
    /// base branch (making it a stack root).
    pub fn reparent(&mut self, name: &str, new_parent: &str) -> Result<()> {
        if name == new_parent {
            bail!("Cannot reparent '{}' onto itself", name);
        }
        if self.is_descendant_of(new_parent, name) {
            bail!(
                "Cannot reparent '{}' under its own descendant '{}'",
                name,
                new_parent
            );
        }

        let to_base = self.is_main_branch(new_parent);
        if !to_base && !self.is_tracked(new_parent) {
            bail!("Parent branch '{}' is not tracked", new_parent);
        }

        let (base, subtree) = {
            let stack = self
                .stacks
                .iter_mut()
                .find(|s| s.contains(name))
                .with_context(|| format!("Branch '{}' is not tracked", name))?;
            let subtree = stack
                .tree
                .detach(name)
                .with_context(|| format!("Branch '{}' vanished from its stack", name))?;
            (stack.base_branch.clone(), subtree)
        };

        if to_base {
            let mut tree = TreeNode::default();
            tree.0.insert(name.to_string(), subtree);
            self.stacks
                .push(Stack::from_parts(name.to_string(), base, tree));
        } else {
            let stack = self
                .stacks
                .iter_mut()
                .find(|s| s.contains(new_parent))
                .with_context(|| format!("Parent branch '{}' is not tracked", new_parent))?;
            stack
                .tree
                .find_mut(new_parent)
                .with_context(|| format!("Parent branch '{}' vanished from its stack", new_parent))?
                .0
                .insert(name.to_string(), subtree);
        }

        self.normalize();
        self.check_invariants()
    }

    // ──────────────────────────────────────────────────────────────
    // Invariants
    // ──────────────────────────────────────────────────────────────

    /// Re-checked after every mutation; a violation is a fatal bug.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for stack in &self.stacks {
            for branch in &stack.branches {
                if !seen.insert(branch.name.clone()) {
                    bail!(
                        "Invariant violation: branch '{}' appears in more than one stack",
                        branch.name
                    );
                }
                let parent_ok = branch.parent == stack.base_branch || stack.contains(&branch.parent);
                if !parent_ok {
                    bail!(
                        "Invariant violation: parent '{}' of '{}' is neither in the stack nor the base branch",
                        branch.parent,
                        branch.name
                    );
                }
                if branch.is_remote {
                    if branch.name != stack.root {
                        bail!(
                            "Invariant violation: remote branch '{}' must be a stack root",
                            branch.name
                        );
                    }
                    if !branch.worktree_path.as_os_str().is_empty() {
                        bail!(
                            "Invariant violation: remote branch '{}' must not have a worktree",
                            branch.name
                        );
                    }
                }
                if (branch.pr_number > 0) != !branch.pr_url.is_empty() {
                    bail!(
                        "Invariant violation: PR number/url mismatch on '{}'",
                        branch.name
                    );
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_worktree(path: &str) -> CacheEntry {
        CacheEntry {
            worktree_path: path.to_string(),
            ..Default::default()
        }
    }

    /// main → a → b → c plus an independent main → x
    fn sample() -> Stacks {
        let mut model = Stacks::new("main");
        model
            .insert_root("a", "main", entry_with_worktree("/wt/a"))
            .unwrap();
        model
            .insert_under("a", "b", entry_with_worktree("/wt/b"))
            .unwrap();
        model
            .insert_under("b", "c", entry_with_worktree("/wt/c"))
            .unwrap();
        model
            .insert_root("x", "main", entry_with_worktree("/wt/x"))
            .unwrap();
        model
    }

    #[test]
    fn test_chain_create_shape() {
        let model = sample();
        assert_eq!(model.list_stacks().len(), 2);
        assert_eq!(model.get_children("a"), vec!["b".to_string()]);
        assert_eq!(model.get_children("c"), Vec::<String>::new());
        assert_eq!(model.get_branch("b").unwrap().parent, "a");
        assert_eq!(model.get_branch("a").unwrap().parent, "main");
    }

    #[test]
    fn test_children_of_main_are_roots() {
        let model = sample();
        assert_eq!(model.get_children("main"), vec!["a".to_string(), "x".to_string()]);
    }

    #[test]
    fn test_descendants() {
        let model = sample();
        assert_eq!(model.get_descendants("a"), vec!["b".to_string(), "c".to_string()]);
        assert!(model.is_descendant_of("c", "a"));
        assert!(!model.is_descendant_of("a", "c"));
        assert!(!model.is_descendant_of("x", "a"));
    }

    #[test]
    fn test_current_stack() {
        let model = sample();
        assert_eq!(model.current_stack("b").unwrap().root, "a");
        assert!(model.current_stack("unknown").is_err());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut model = sample();
        assert!(model.insert_root("a", "main", CacheEntry::default()).is_err());
        assert!(model
            .insert_under("x", "b", CacheEntry::default())
            .is_err());
    }

    #[test]
    fn test_remove_mid_branch_reparents_children() {
        let mut model = sample();
        model.remove_branch("b").unwrap();

        assert!(!model.is_tracked("b"));
        assert_eq!(model.get_branch("c").unwrap().parent, "a");
        assert_eq!(model.get_children("a"), vec!["c".to_string()]);
    }

    #[test]
    fn test_remove_root_splits_into_new_stacks() {
        let mut model = sample();
        // Give a a second child to observe the split
        model
            .insert_under("a", "d", entry_with_worktree("/wt/d"))
            .unwrap();
        model.remove_branch("a").unwrap();

        // b and d each become roots of their own stack
        let roots: Vec<&str> = model.list_stacks().iter().map(|s| s.root.as_str()).collect();
        assert_eq!(roots, vec!["b", "d", "x"]);
        assert_eq!(model.get_branch("b").unwrap().parent, "main");
        assert_eq!(model.get_branch("c").unwrap().parent, "b");
    }

    #[test]
    fn test_reparent_within_and_across() {
        let mut model = sample();
        // Move c under a (sibling of b)
        model.reparent("c", "a").unwrap();
        assert_eq!(model.get_branch("c").unwrap().parent, "a");

        // Move b (now leaf) into x's stack
        model.reparent("b", "x").unwrap();
        assert_eq!(model.get_branch("b").unwrap().parent, "x");
        assert_eq!(model.current_stack("b").unwrap().root, "x");
    }

    #[test]
    fn test_reparent_to_base_creates_stack() {
        let mut model = sample();
        model.reparent("b", "main").unwrap();

        let stack = model.current_stack("b").unwrap();
        assert_eq!(stack.root, "b");
        // c follows its parent into the new stack
        assert!(stack.contains("c"));
        assert_eq!(model.get_branch("b").unwrap().parent, "main");
    }

    #[test]
    fn test_reparent_cycle_rejected() {
        let mut model = sample();
        assert!(model.reparent("a", "c").is_err());
        assert!(model.reparent("a", "a").is_err());
    }

    #[test]
    fn test_hash_prefix_lookup() {
        let model = sample();
        let hash = model.list_stacks()[0].hash.clone();

        assert_eq!(model.stack_by_hash_prefix(&hash[..3]).unwrap().hash, hash);
        assert!(model.stack_by_hash_prefix("zz").is_err()); // too short
        assert!(model.stack_by_hash_prefix("zzz").is_err()); // no match
    }

    #[test]
    fn test_docs_roundtrip_preserves_shape() {
        let model = sample();
        let (doc, cache) = model.to_docs();
        let restored = Stacks::from_docs(doc, cache, "main");

        assert_eq!(restored.list_stacks().len(), 2);
        assert_eq!(restored.get_descendants("a"), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(
            restored.get_branch("b").unwrap().worktree_path,
            PathBuf::from("/wt/b")
        );
    }

    #[test]
    fn test_cache_drops_untracked_on_save() {
        let mut model = sample();
        model.set_pr("b", 7, "https://github.com/acme/w/pull/7");
        model.remove_branch("b").unwrap();

        let (_, cache) = model.to_docs();
        assert!(!cache.branches.contains_key("b"));
        assert!(cache.branches.contains_key("c"));
    }

    #[test]
    fn test_set_pr_and_merged() {
        let mut model = sample();
        model.set_pr("a", 12, "https://github.com/acme/w/pull/12");
        let a = model.get_branch("a").unwrap();
        assert_eq!(a.pr_number, 12);
        assert!(a.has_pr());

        model.set_merged("a");
        assert!(model.get_branch("a").unwrap().is_merged);
        model.check_invariants().unwrap();
    }

    #[test]
    fn test_remote_branch_invariants() {
        let mut model = Stacks::new("main");
        model
            .insert_root(
                "upstream-work",
                "main",
                CacheEntry {
                    is_remote: true,
                    ..Default::default()
                },
            )
            .unwrap();
        model
            .insert_under("upstream-work", "mine", entry_with_worktree("/wt/mine"))
            .unwrap();

        model.check_invariants().unwrap();
        assert!(model.get_branch("upstream-work").unwrap().is_remote);
    }

    #[test]
    fn test_invariant_pr_url_mismatch_detected() {
        let mut model = sample();
        model.meta.get_mut("a").unwrap().pr_number = 5;
        model.rebuild();
        assert!(model.check_invariants().is_err());
    }

    #[test]
    fn test_is_main_branch() {
        let model = sample();
        assert!(model.is_main_branch("main"));
        assert!(!model.is_main_branch("a"));
    }
}
