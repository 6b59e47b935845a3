mod blocked_table;
mod suffix_trie;

pub use blocked_table::BlockedDomainTable;
pub use suffix_trie::SuffixTrie;
