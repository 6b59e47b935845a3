#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Block,
    Forward,
}

pub trait BlockedDomainMatcher: Send + Sync {
    /// Decides how a query for `domain` is routed. Matching is by domain
    /// suffix, so a blocked `example.com` also blocks `ads.example.com`.
    fn check(&self, domain: &str) -> FilterDecision;

    fn domain_count(&self) -> usize;
}
