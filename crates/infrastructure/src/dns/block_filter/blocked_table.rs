use super::suffix_trie::SuffixTrie;
use dohproxy_application::ports::{BlockedDomainMatcher, FilterDecision};
use dohproxy_domain::DomainError;
use tracing::{info, warn};

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Immutable set of blocked domain suffixes. A name matches when it equals a
/// listed domain or is a subdomain of one; everything else is forwarded.
pub struct BlockedDomainTable {
    trie: SuffixTrie,
}

impl BlockedDomainTable {
    pub fn empty() -> Self {
        Self {
            trie: SuffixTrie::new(),
        }
    }

    /// Reads a newline-delimited domain list. Comments (`#`) and blank lines
    /// are skipped, invalid entries are logged and skipped, duplicates
    /// collapse. A missing or unreadable file is an error.
    pub async fn load(path: &str) -> Result<Self, DomainError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::BlockedDomainsLoad {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let mut skipped = 0usize;
        let mut trie = SuffixTrie::new();
        for (index, line) in text.lines().enumerate() {
            match parse_blocked_line(line) {
                Ok(Some(domain)) => {
                    trie.insert(&domain);
                }
                Ok(None) => {}
                Err(reason) => {
                    skipped += 1;
                    warn!(path, line = index + 1, entry = line.trim(), reason, "Skipping blocked domain entry");
                }
            }
        }

        info!(path, domains = trie.len(), skipped, "Loaded blocked domains");
        Ok(Self { trie })
    }

    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = SuffixTrie::new();
        for domain in domains {
            if let Ok(Some(normalized)) = parse_blocked_line(domain.as_ref()) {
                trie.insert(&normalized);
            }
        }
        Self { trie }
    }

    pub fn is_blocked(&self, name: &str) -> bool {
        let normalized = normalize(name);
        !normalized.is_empty() && self.trie.longest_match(&normalized).is_some()
    }
}

impl BlockedDomainMatcher for BlockedDomainTable {
    fn check(&self, domain: &str) -> FilterDecision {
        if self.is_blocked(domain) {
            FilterDecision::Block
        } else {
            FilterDecision::Forward
        }
    }

    fn domain_count(&self) -> usize {
        self.trie.len()
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// `Ok(None)` for lines that carry no entry, `Err` with a reason for lines
/// that are not a usable domain name.
fn parse_blocked_line(line: &str) -> Result<Option<String>, &'static str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let domain = normalize(line);
    if domain.is_empty() {
        return Err("root cannot be blocked");
    }
    if domain.len() > MAX_NAME_LEN {
        return Err("name too long");
    }
    for label in domain.split('.') {
        if label.is_empty() {
            return Err("empty label");
        }
        if label.len() > MAX_LABEL_LEN {
            return Err("label too long");
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err("invalid character");
        }
    }

    Ok(Some(domain))
}
