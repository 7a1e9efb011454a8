//! BOLT 11 invoice decoding (payment hash, amount, description)
//!
//! Only the fields the ticket allocator needs are extracted. The invoice
//! signature is not checked: receipts are signed events, and authenticity
//! of the event is the network's concern.
//!
//! ```text
//! ln<currency>[amount[multiplier]] 1 <timestamp:7> <tagged fields...> <signature:104> <checksum:6>
//! ```
//!
//! The bech32 layer (checksum, case rules, 5-bit regrouping) is the
//! `bech32` crate; this module only knows the BOLT 11 field layout.

use bech32::{FromBase32, Variant, u5};
use thiserror::Error;

const TIMESTAMP_WORDS: usize = 7;
const SIGNATURE_WORDS: usize = 104;

const TAG_PAYMENT_HASH: u8 = 1;
const TAG_DESCRIPTION: u8 = 13;
/// 256 bits in 5-bit words, rounded up.
const PAYMENT_HASH_WORDS: usize = 52;

/// Millisatoshis per bitcoin.
const MSAT_PER_BTC: u64 = 100_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Bolt11Error {
    #[error("missing bech32 separator")]
    MissingSeparator,
    #[error("mixed-case invoice")]
    MixedCase,
    #[error("invalid character {0:?}")]
    InvalidChar(char),
    #[error("bech32 checksum mismatch")]
    InvalidChecksum,
    #[error("bech32m checksum; BOLT 11 uses bech32")]
    WrongVariant,
    #[error("malformed bech32: {0}")]
    Malformed(String),
    #[error("invalid prefix {0:?}")]
    InvalidPrefix(String),
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("invoice data too short")]
    TooShort,
    #[error("tagged field overruns invoice data")]
    TruncatedField,
}

impl From<bech32::Error> for Bolt11Error {
    fn from(e: bech32::Error) -> Self {
        match e {
            bech32::Error::MissingSeparator => Bolt11Error::MissingSeparator,
            bech32::Error::MixedCase => Bolt11Error::MixedCase,
            bech32::Error::InvalidChar(c) => Bolt11Error::InvalidChar(c),
            bech32::Error::InvalidChecksum => Bolt11Error::InvalidChecksum,
            other => Bolt11Error::Malformed(other.to_string()),
        }
    }
}

/// Decoded invoice fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    /// Currency prefix, e.g. `bc`, `tb`, `bcrt`
    pub currency: String,
    /// Amount in millisatoshis; `None` for "any amount" invoices
    pub amount_msat: Option<u64>,
    /// Creation time, seconds since epoch
    pub timestamp: u64,
    /// Payment hash as 64 lowercase hex chars
    pub payment_hash: Option<String>,
    pub description: Option<String>,
}

impl Invoice {
    /// Amount floored to whole satoshis.
    pub fn amount_sats(&self) -> Option<u64> {
        self.amount_msat.map(|msat| msat / 1000)
    }
}

/// Decode a BOLT 11 payment request.
pub fn decode(invoice: &str) -> Result<Invoice, Bolt11Error> {
    let (hrp, words, variant) = bech32::decode(invoice)?;
    if variant != Variant::Bech32 {
        return Err(Bolt11Error::WrongVariant);
    }
    let (currency, amount_msat) = parse_hrp(&hrp)?;

    if words.len() < TIMESTAMP_WORDS + SIGNATURE_WORDS {
        return Err(Bolt11Error::TooShort);
    }

    let timestamp = words[..TIMESTAMP_WORDS]
        .iter()
        .fold(0u64, |acc, w| (acc << 5) | w.to_u8() as u64);

    let fields = &words[TIMESTAMP_WORDS..words.len() - SIGNATURE_WORDS];
    let mut payment_hash = None;
    let mut description = None;

    let mut pos = 0;
    while pos < fields.len() {
        if pos + 3 > fields.len() {
            return Err(Bolt11Error::TruncatedField);
        }
        let tag = fields[pos].to_u8();
        let len = fields[pos + 1].to_u8() as usize * 32 + fields[pos + 2].to_u8() as usize;
        let start = pos + 3;
        let end = start + len;
        if end > fields.len() {
            return Err(Bolt11Error::TruncatedField);
        }
        let data: &[u5] = &fields[start..end];

        match tag {
            // Readers skip `p` fields of the wrong length.
            TAG_PAYMENT_HASH if len == PAYMENT_HASH_WORDS && payment_hash.is_none() => {
                let bytes = Vec::<u8>::from_base32(data)?;
                payment_hash = Some(hex::encode(bytes));
            }
            TAG_DESCRIPTION if description.is_none() => {
                description = Vec::<u8>::from_base32(data)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok());
            }
            _ => {}
        }
        pos = end;
    }

    Ok(Invoice {
        currency,
        amount_msat,
        timestamp,
        payment_hash,
        description,
    })
}

fn parse_hrp(hrp: &str) -> Result<(String, Option<u64>), Bolt11Error> {
    let rest = hrp
        .strip_prefix("ln")
        .ok_or_else(|| Bolt11Error::InvalidPrefix(hrp.to_string()))?;

    let digits_at = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
    let currency = &rest[..digits_at];
    if currency.is_empty() {
        return Err(Bolt11Error::InvalidPrefix(hrp.to_string()));
    }

    let amount = &rest[digits_at..];
    if amount.is_empty() {
        return Ok((currency.to_string(), None));
    }

    let invalid = || Bolt11Error::InvalidAmount(amount.to_string());
    let (number, multiplier) = match amount.chars().last() {
        Some(c) if c.is_ascii_digit() => (amount, None),
        Some(c) => (&amount[..amount.len() - 1], Some(c)),
        None => return Err(invalid()),
    };
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: u64 = number.parse().map_err(|_| invalid())?;

    let msat = match multiplier {
        None => value.checked_mul(MSAT_PER_BTC),
        Some('m') => value.checked_mul(MSAT_PER_BTC / 1_000),
        Some('u') => value.checked_mul(MSAT_PER_BTC / 1_000_000),
        Some('n') => value.checked_mul(MSAT_PER_BTC / 1_000_000_000),
        // pico-BTC: sub-millisatoshi precision is not representable
        Some('p') if value % 10 == 0 => Some(value / 10),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Ok((currency.to_string(), Some(msat)))
}
