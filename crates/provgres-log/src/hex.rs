//! Lowercase hex encoding for raw-I/O capture records.

use crate::error::LogError;

pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(digit(byte >> 4));
        out.push(digit(byte & 0x0f));
    }
    out
}

fn digit(nibble: u8) -> char {
    char::from(if nibble > 9 {
        nibble - 10 + b'a'
    } else {
        nibble + b'0'
    })
}

pub fn decode(text: &str) -> Result<Vec<u8>, LogError> {
    if text.len() % 2 != 0 {
        return Err(LogError::InvalidHex(format!(
            "odd length {}",
            text.len()
        )));
    }
    let mut out = Vec::with_capacity(text.len() / 2);
    let bytes = text.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = value(pair[0])?;
        let lo = value(pair[1])?;
        out.push(hi << 4 | lo);
    }
    Ok(out)
}

fn value(digit: u8) -> Result<u8, LogError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(LogError::InvalidHex(format!(
            "invalid digit '{}'",
            char::from(other)
        ))),
    }
}
