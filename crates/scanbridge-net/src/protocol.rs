// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Button-event datagram codec.
//
// The device reports a menu press with a one-way UDP datagram:
//
// ```text
// byte 0      0x02
// byte 1      0x00
// byte 2      unconstrained
// byte 3      0x30
// byte 4..    UTF-8 text, `KEY=VALUE` fields joined by `;`
// ```
//
// Only `APPNUM` (menu slot) and `SEQ` (per-event counter) are consumed.  Every
// event is sent twice; duplicate suppression happens in the listener.

use thiserror::Error;

/// Length of the fixed header preceding the text fields.
pub const HEADER_LEN: usize = 4;

/// Why a datagram could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatagramError {
    #[error("datagram too short: {0} bytes")]
    TooShort(usize),

    #[error("unexpected header {0:02X?}")]
    BadHeader([u8; HEADER_LEN]),

    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("no or invalid SEQ field")]
    MissingSeq,

    #[error("SEQ {0} does not fit in 64 bits")]
    SeqOutOfRange(String),
}

/// A decoded button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Device-assigned event counter.
    pub seq: u64,
    /// Menu slot, if present and numeric. Range is checked by the caller.
    pub appnum: Option<u64>,
}

/// Decode one datagram.
pub fn decode(data: &[u8]) -> Result<ButtonEvent, DatagramError> {
    if data.len() < HEADER_LEN {
        return Err(DatagramError::TooShort(data.len()));
    }

    let header = [data[0], data[1], data[2], data[3]];
    if header[0] != 0x02 || header[1] != 0x00 || header[3] != 0x30 {
        return Err(DatagramError::BadHeader(header));
    }

    let text = std::str::from_utf8(&data[HEADER_LEN..]).map_err(|_| DatagramError::InvalidUtf8)?;

    let mut seq_text = None;
    let mut appnum = None;

    // Later occurrences of a key replace earlier ones, valid or not.
    for (key, value) in fields(text) {
        match key {
            "SEQ" => seq_text = Some(value),
            "APPNUM" => appnum = parse_decimal(value),
            _ => {}
        }
    }

    let seq_text = seq_text.filter(|v| is_decimal(v)).ok_or(DatagramError::MissingSeq)?;
    let seq = seq_text
        .parse()
        .map_err(|_| DatagramError::SeqOutOfRange(seq_text.to_string()))?;
    Ok(ButtonEvent { seq, appnum })
}

/// Iterate the `KEY=VALUE` pairs of a payload, skipping segments without `=`.
fn fields(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split(';').filter_map(|segment| segment.split_once('='))
}

/// Plain ASCII decimal. No sign, no whitespace, no empty string.
fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Decimal value, `None` if it is not decimal or exceeds `u64`. An oversized
/// APPNUM is out of the slot range either way.
fn parse_decimal(value: &str) -> Option<u64> {
    if !is_decimal(value) {
        return None;
    }
    value.parse().ok()
}
