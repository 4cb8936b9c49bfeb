//! Subnet descriptor to probe target list.

use std::net::Ipv4Addr;

use lanwatch_core::Subnet;

use crate::error::Result;

/// Expand a parsed subnet into `base.1` ..= `base.254`, ascending.
pub fn expand(subnet: &Subnet) -> Vec<Ipv4Addr> {
    subnet.hosts().collect()
}

/// Parse a configured range. Fails with `InvalidSubnet` when the
/// three-octet prefix is missing; warns when a non-24 prefix is dropped.
pub fn parse_range(descriptor: &str) -> Result<Subnet> {
    let subnet = Subnet::parse(descriptor)?;
    if subnet.prefix_ignored() {
        tracing::warn!(
            descriptor,
            swept = %subnet,
            "Only /24 ranges are swept; prefix length ignored"
        );
    }
    Ok(subnet)
}
