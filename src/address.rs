//! Reversible compact encoding of `host:port` pairs.
//!
//! Instance addresses are not exposed directly as external identifiers. Each
//! IPv4 octet and the port are written in lowercase hex and joined by
//! [`SEPARATOR`], e.g. `127.0.0.1:8080` becomes `7fg0g0g1g1f90`. Any letter
//! past `f` works as a separator; `g` keeps tokens short and never collides
//! with characters a browser treats specially (`#`, `?`, `&`).

use thiserror::Error;

pub const SEPARATOR: char = 'g';

pub const LOCALHOST: &str = "localhost";
pub const LOCALHOST_IP: &str = "127.0.0.1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("host is not a dotted-quad IPv4 address: {0}")]
    InvalidHost(String),

    #[error("malformed address token: {0}")]
    InvalidToken(String),
}

pub fn encode(host: &str, port: u16) -> Result<String, AddressError> {
    let host = if host == LOCALHOST { LOCALHOST_IP } else { host };

    let octets: Vec<u8> = host
        .split('.')
        .map(|part| part.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| AddressError::InvalidHost(host.to_string()))?;

    if octets.len() != 4 {
        return Err(AddressError::InvalidHost(host.to_string()));
    }

    let mut token = String::with_capacity(16);
    for octet in octets {
        token.push_str(&format!("{:x}", octet));
        token.push(SEPARATOR);
    }
    token.push_str(&format!("{:x}", port));

    Ok(token)
}

/// Inverse of [`encode`], yielding `host:port`.
pub fn decode(token: &str) -> Result<String, AddressError> {
    let fields: Vec<&str> = token.split(SEPARATOR).collect();
    if fields.len() != 5 {
        return Err(AddressError::InvalidToken(token.to_string()));
    }

    let invalid = |_| AddressError::InvalidToken(token.to_string());

    let mut octets = [0u8; 4];
    for (slot, field) in octets.iter_mut().zip(&fields[..4]) {
        *slot = u8::from_str_radix(field, 16).map_err(invalid)?;
    }
    let port = u16::from_str_radix(fields[4], 16).map_err(invalid)?;

    Ok(format!(
        "{}.{}.{}.{}:{}",
        octets[0], octets[1], octets[2], octets[3], port
    ))
}
