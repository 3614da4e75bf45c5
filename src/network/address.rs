use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

use crate::error::{Result, RouterError};

pub const ADDRESS_BITS: u8 = 32;

/// Converts `a.b.c.d[/n]` to `a<<24 | b<<16 | c<<8 | d`. The prefix length,
/// if any, is ignored; host bits are kept.
pub fn to_integer(prefix: &str) -> Result<u32> {
    let ip = prefix.split('/').next().unwrap_or_default();
    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(RouterError::MalformedAddress(prefix.to_string()));
    }

    let mut value = 0u32;
    for octet in octets {
        let byte: u8 = octet
            .trim()
            .parse()
            .map_err(|_| RouterError::MalformedAddress(prefix.to_string()))?;
        value = (value << 8) | u32::from(byte);
    }
    Ok(value)
}

/// Parses the `/n` suffix of a CIDR string.
pub fn prefix_len(prefix: &str) -> Result<u8> {
    let (_, len) = prefix
        .split_once('/')
        .ok_or_else(|| RouterError::MalformedAddress(prefix.to_string()))?;
    match len.trim().parse::<u8>() {
        Ok(len) if len <= ADDRESS_BITS => Ok(len),
        _ => Err(RouterError::MalformedAddress(prefix.to_string())),
    }
}

/// Parses `a.b.c.d/n` into a prefix, keeping any host bits as written.
pub fn parse_prefix(prefix: &str) -> Result<Ipv4Net> {
    let len = prefix_len(prefix)?;
    let addr = to_integer(prefix)?;
    from_integer(addr, len)
}

pub fn from_integer(addr: u32, prefix_len: u8) -> Result<Ipv4Net> {
    Ipv4Net::new(Ipv4Addr::from(addr), prefix_len)
        .map_err(|_| RouterError::MalformedAddress(format!("{}/{}", Ipv4Addr::from(addr), prefix_len)))
}

/// Number of addresses in a block of the given prefix length.
pub fn block_size(prefix_len: u8) -> u64 {
    1u64 << (ADDRESS_BITS - prefix_len.min(ADDRESS_BITS))
}

pub fn mask_for(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len => u32::MAX << (ADDRESS_BITS - len.min(ADDRESS_BITS)),
    }
}

pub fn value_of(net: &Ipv4Net) -> u32 {
    u32::from(net.addr())
}

/// True when `received` is no more specific than `local` and both agree on
/// the bits `received` fixes, i.e. the announced block contains the local one.
pub fn covers(received: &Ipv4Net, local: &Ipv4Net) -> bool {
    if received.prefix_len() > local.prefix_len() {
        return false;
    }
    let mask = mask_for(received.prefix_len());
    value_of(received) & mask == value_of(local) & mask
}
