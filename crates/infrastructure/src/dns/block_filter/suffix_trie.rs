use compact_str::CompactString;
use rustc_hash::FxBuildHasher;
use smallvec::SmallVec;
use std::collections::HashMap;

#[derive(Default)]
struct TrieNode {
    children: HashMap<CompactString, TrieNode, FxBuildHasher>,
    terminal: bool,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            children: HashMap::with_hasher(FxBuildHasher),
            terminal: false,
        }
    }
}

/// Domain suffixes stored label by label from the TLD down, so a lookup
/// walks at most as many nodes as the queried name has labels.
#[derive(Default)]
pub struct SuffixTrie {
    root: TrieNode,
    len: usize,
}

impl SuffixTrie {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            len: 0,
        }
    }

    /// Registers `domain` and all its subdomains. `domain` must already be
    /// normalized (lowercase, no trailing dot). Returns false for duplicates.
    pub fn insert(&mut self, domain: &str) -> bool {
        let mut node = &mut self.root;
        for label in domain.split('.').rev() {
            node = node.children.entry(CompactString::new(label)).or_default();
        }
        if node.terminal {
            return false;
        }
        node.terminal = true;
        self.len += 1;
        true
    }

    /// Number of labels in the longest registered suffix of `domain`,
    /// counting an exact match.
    #[inline]
    pub fn longest_match(&self, domain: &str) -> Option<usize> {
        let labels: SmallVec<[&str; 8]> = domain.split('.').rev().collect();
        let mut node = &self.root;
        let mut deepest = None;

        for (i, label) in labels.iter().enumerate() {
            match node.children.get(*label) {
                Some(child) => {
                    if child.terminal {
                        deepest = Some(i + 1);
                    }
                    node = child;
                }
                None => break,
            }
        }

        deepest
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
