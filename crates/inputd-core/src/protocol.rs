//! Wire protocol constants and response encoding.
//!
//! All integers are big-endian. One command per connection:
//!
//! ```text
//! Request:  [i32 tokenLen] [tokenLen bytes token] [i32 commandId] [fixed payload]
//! Response: [i32 authStatus: 1 = ok, -1 = rejected]   (closes here if rejected)
//!           [command-specific response]
//! ```
//!
//! Booleans are one byte on the wire, strings a u16 byte length followed by
//! UTF-8. The framing matches the controller's existing client exactly.

use bytes::BufMut;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 23456;

/// Protocol version reported by PING.
pub const VERSION: i32 = 2;

/// Upper bound on the claimed token length; validated before any buffer is
/// sized from the wire value.
pub const MAX_TOKEN_LEN: i32 = 1024;

pub const AUTH_OK: i32 = 1;
pub const AUTH_REJECTED: i32 = -1;

// Command ids
pub const CMD_PING: i32 = 1;
pub const CMD_INJECT_TOUCH: i32 = 2;
pub const CMD_INJECT_KEY: i32 = 3;
pub const CMD_CAPTURE_SCREEN: i32 = 4;
pub const CMD_DESTROY: i32 = 99;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("token length {0} outside [0, {MAX_TOKEN_LEN}]")]
    TokenLength(i32),
}

/// Validate a claimed token length from the wire.
pub fn check_token_len(len: i32) -> Result<usize, ProtocolError> {
    if (0..=MAX_TOKEN_LEN).contains(&len) {
        Ok(len as usize)
    } else {
        Err(ProtocolError::TokenLength(len))
    }
}

/// A command response as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Version(i32),
    Flag(bool),
    Text(String),
}

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Response::Version(v) => buf.put_i32(*v),
            Response::Flag(b) => buf.put_u8(*b as u8),
            Response::Text(s) => {
                buf.put_u16(s.len() as u16);
                buf.extend_from_slice(s.as_bytes());
            }
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_len_bounds() {
        assert_eq!(check_token_len(0).unwrap(), 0);
        assert_eq!(check_token_len(1024).unwrap(), 1024);
        assert!(check_token_len(-1).is_err());
        assert!(check_token_len(-5).is_err());
        assert!(check_token_len(1025).is_err());
        assert!(check_token_len(i32::MIN).is_err());
    }

    #[test]
    fn version_response_is_big_endian_i32() {
        assert_eq!(Response::Version(VERSION).encode(), vec![0, 0, 0, 2]);
    }

    #[test]
    fn flag_response_is_one_byte() {
        assert_eq!(Response::Flag(true).encode(), vec![1]);
        assert_eq!(Response::Flag(false).encode(), vec![0]);
    }

    #[test]
    fn text_response_is_length_prefixed() {
        assert_eq!(Response::Text(String::new()).encode(), vec![0, 0]);
        assert_eq!(
            Response::Text("ab".to_string()).encode(),
            vec![0, 2, b'a', b'b']
        );
    }
}
