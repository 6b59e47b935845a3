use dohproxy_application::ports::{BlockedDomainMatcher, FilterDecision};
use dohproxy_domain::DomainError;
use dohproxy_infrastructure::dns::BlockedDomainTable;
use std::io::Write;

fn write_list(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[tokio::test]
async fn test_load_counts_unique_valid_entries() {
    let file = write_list(&[
        "# comment",
        "",
        "doubleclick.net",
        "DoubleClick.NET.",
        "  tracker.example.org  ",
        "spaces in name.com",
        "a..b",
    ]);

    let table = BlockedDomainTable::load(file.path().to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(table.domain_count(), 2);
    assert_eq!(table.check("ad.doubleclick.net."), FilterDecision::Block);
    assert_eq!(table.check("tracker.example.org."), FilterDecision::Block);
    assert_eq!(table.check("example.org."), FilterDecision::Forward);
}

#[tokio::test]
async fn test_empty_file_blocks_nothing() {
    let file = write_list(&[]);

    let table = BlockedDomainTable::load(file.path().to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(table.domain_count(), 0);
    assert_eq!(table.check("anything.example."), FilterDecision::Forward);
}

#[tokio::test]
async fn test_missing_file_is_load_error() {
    let result = BlockedDomainTable::load("/nonexistent/blocked.txt").await;

    match result {
        Err(DomainError::BlockedDomainsLoad { path, .. }) => {
            assert_eq!(path, "/nonexistent/blocked.txt")
        }
        Err(other) => panic!("unexpected error {}", other),
        Ok(_) => panic!("missing file must fail"),
    }
}

#[tokio::test]
async fn test_subdomain_entry_does_not_block_parent() {
    let file = write_list(&["ads.example.com"]);

    let table = BlockedDomainTable::load(file.path().to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(table.check("x.ads.example.com."), FilterDecision::Block);
    assert_eq!(table.check("example.com."), FilterDecision::Forward);
    assert_eq!(table.check("www.example.com."), FilterDecision::Forward);
}
