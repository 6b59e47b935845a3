use crate::DomainError;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Returns true for addresses that belong to an internal network:
/// RFC 1918, loopback, link-local and IPv6 unique-local ranges.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(mapped));
            }
            v6.is_loopback() || is_unique_local(&v6) || is_unicast_link_local(&v6)
        }
    }
}

fn is_unique_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

fn is_unicast_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// Turns an IP literal and a port string into a connectable address,
/// refusing anything that points into a private network.
pub fn resolve_public_addr(host: &str, port: &str) -> Result<SocketAddr, DomainError> {
    let port: u16 = port
        .trim()
        .parse()
        .map_err(|_| DomainError::InvalidAddress(format!("invalid port '{}'", port)))?;

    let literal = host
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    let ip: IpAddr = literal
        .parse()
        .map_err(|_| DomainError::InvalidAddress(format!("no suitable IP address in '{}'", host)))?;

    if is_private_ip(ip) {
        return Err(DomainError::PrivateAddress(ip.to_string()));
    }

    Ok(SocketAddr::new(ip, port))
}
