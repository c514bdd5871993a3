//! The textual subnet codec (§4.3): `parse_subnet` / `format_subnet`.

use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::address::MacAddr;
use crate::error::ParseError;
use crate::subnet::{Subnet, SubnetKey, DEFAULT_WEIGHT};

/// Input longer than this is truncated before parsing, matching the
/// reference implementation's fixed-size stack buffer. Inputs that rely on
/// bytes past this length will typically fail to parse.
pub const MAX_INPUT_LEN: usize = 64;

/// Parses the textual form of a subnet (§4.3 grammar). Never sets `owner` —
/// that is the mutation API's job.
pub fn parse_subnet(input: &str) -> Result<Subnet, ParseError> {
    let mut buf = input;
    if buf.len() > MAX_INPUT_LEN {
        let mut end = MAX_INPUT_LEN;
        while end > 0 && !buf.is_char_boundary(end) {
            end -= 1;
        }
        buf = &buf[..end];
    }
    if buf.is_empty() {
        return Err(ParseError::Empty);
    }

    // Parse and strip "#weight" first.
    let (body_and_prefix, weight) = match buf.find('#') {
        Some(idx) => {
            let weight_str = &buf[idx + 1..];
            let weight = parse_full_i32(weight_str).ok_or(ParseError::InvalidWeight)?;
            (&buf[..idx], weight)
        }
        None => (buf, DEFAULT_WEIGHT),
    };

    // Parse and strip "/prefix" next.
    let (body, explicit_prefix) = match body_and_prefix.find('/') {
        Some(idx) => {
            let prefix_str = &body_and_prefix[idx + 1..];
            let prefix = parse_full_i32(prefix_str).ok_or(ParseError::InvalidPrefix)?;
            if prefix < 0 {
                return Err(ParseError::InvalidPrefix);
            }
            (&body_and_prefix[..idx], Some(prefix as u32))
        }
        None => (body_and_prefix, None),
    };

    if body.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(address) = try_parse_mac(body) {
        if explicit_prefix.is_some() {
            return Err(ParseError::PrefixWithMac);
        }
        return Ok(Subnet::with_weight(SubnetKey::Mac { address }, weight));
    }

    if let Ok(address) = body.parse::<Ipv4Addr>() {
        let prefix = explicit_prefix.unwrap_or(32);
        if prefix > 32 {
            return Err(ParseError::PrefixOutOfRange);
        }
        return Ok(Subnet::with_weight(
            SubnetKey::Ipv4 {
                address,
                prefix: prefix as u8,
            },
            weight,
        ));
    }

    if let Ok(address) = body.parse::<Ipv6Addr>() {
        let prefix = explicit_prefix.unwrap_or(128);
        if prefix > 128 {
            return Err(ParseError::PrefixOutOfRange);
        }
        return Ok(Subnet::with_weight(
            SubnetKey::Ipv6 {
                address,
                prefix: prefix as u8,
            },
            weight,
        ));
    }

    Err(ParseError::UnrecognizedBody)
}

/// Parses `s` as a signed decimal integer, rejecting any trailing garbage
/// (including leading/trailing whitespace, which `str::parse` would accept
/// for some representations but the reference `sscanf`-based parser does
/// not).
fn parse_full_i32(s: &str) -> Option<i32> {
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Accepts `hex{1,2}(:hex{1,2}){5}` — six colon-separated one-or-two-digit
/// hex groups, including the one-digit-per-group legacy form old tinc peers
/// emit.
fn try_parse_mac(body: &str) -> Option<MacAddr> {
    let mut bytes = [0u8; 6];
    let mut parts = body.split(':');
    for byte in bytes.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        *byte = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(MacAddr::new(bytes))
}

/// Formats a subnet back to its textual form (§4.3). `/N` is emitted only
/// when the prefix differs from the family default; `#N` only when the
/// weight differs from [`DEFAULT_WEIGHT`]. Round-trips with
/// [`parse_subnet`] for every well-formed [`Subnet`].
pub fn format_subnet(subnet: &Subnet) -> String {
    let mut out = String::new();
    match subnet.key {
        SubnetKey::Mac { address } => {
            let _ = write!(out, "{address}");
        }
        SubnetKey::Ipv4 { address, prefix } => {
            let _ = write!(out, "{address}");
            if prefix != 32 {
                let _ = write!(out, "/{prefix}");
            }
        }
        SubnetKey::Ipv6 { address, prefix } => {
            let _ = write!(out, "{address}");
            if prefix != 128 {
                let _ = write!(out, "/{prefix}");
            }
        }
    }
    if subnet.weight != DEFAULT_WEIGHT {
        let _ = write!(out, "#{}", subnet.weight);
    }
    out
}
