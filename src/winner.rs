//! Winner selection from a Bitcoin block hash
//!
//! ```text
//! ticket = (uint256(block_hash) mod total_tickets) + 1
//! ```
//!
//! The block hash is read as a big-endian 256-bit integer, exactly as it is
//! displayed by block explorers. Anyone holding the committed assignment
//! and the draw block hash recomputes the same ticket; the `Verification`
//! trace carries the intermediate values so a third party can check the
//! arithmetic without re-deriving it.

use crate::tickets::{TicketEntry, find_ticket_owner, total_tickets};
use crate::types::{LotteryError, is_hash_hex};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::error;

/// Arithmetic trace of a selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub block_hash_hex: String,
    /// Block hash as a decimal integer
    pub block_hash_bigint: String,
    pub total_tickets: u64,
    /// e.g. `(17 % 8) + 1 = 2`
    pub winning_ticket_calc: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerResult {
    pub ticket_number: u64,
    pub winner: TicketEntry,
    pub block_hash: String,
    pub verification: Verification,
}

fn parse_block_hash(block_hash: &str) -> Result<BigUint, LotteryError> {
    if !is_hash_hex(block_hash) {
        return Err(LotteryError::InvalidBlockHash(block_hash.to_string()));
    }
    let bytes =
        hex::decode(block_hash).map_err(|_| LotteryError::InvalidBlockHash(block_hash.to_string()))?;
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Select the winning ticket for `entries` using `block_hash`.
///
/// `Ok(None)` when nobody bought a ticket, whatever the hash. A malformed
/// hash is an error. An in-range ticket without owner means the entries
/// violate the range invariants and is reported as `InvariantViolation`.
pub fn select_winner(
    entries: &[TicketEntry],
    block_hash: &str,
) -> Result<Option<WinnerResult>, LotteryError> {
    let total = total_tickets(entries);
    if entries.is_empty() || total == 0 {
        return Ok(None);
    }

    let hash_int = parse_block_hash(block_hash)?;
    let remainder = (&hash_int % BigUint::from(total))
        .to_u64()
        .ok_or(LotteryError::InvariantViolation { ticket: 0, total })?;
    let ticket_number = remainder + 1;

    let winner = match find_ticket_owner(entries, ticket_number) {
        Some(entry) => entry.clone(),
        None => {
            error!(
                "No owner for ticket {} of {}, allocation invariants broken",
                ticket_number, total
            );
            return Err(LotteryError::InvariantViolation { ticket: ticket_number, total });
        }
    };

    let decimal = hash_int.to_string();
    Ok(Some(WinnerResult {
        ticket_number,
        winner,
        block_hash: block_hash.to_string(),
        verification: Verification {
            block_hash_hex: block_hash.to_string(),
            winning_ticket_calc: format!("({} % {}) + 1 = {}", decimal, total, ticket_number),
            block_hash_bigint: decimal,
            total_tickets: total,
        },
    }))
}

/// Which part of a claimed result disagrees with recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum SelectionMismatch {
    /// No tickets, so no winner can be computed
    NoWinner,
    Ticket { claimed: u64, calculated: u64 },
    Buyer { claimed: String, calculated: String },
}

impl fmt::Display for SelectionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMismatch::NoWinner => {
                write!(f, "Could not calculate winner from provided data")
            }
            SelectionMismatch::Ticket { claimed, calculated } => write!(
                f,
                "Claimed ticket {} does not match calculated ticket {}",
                claimed, calculated
            ),
            SelectionMismatch::Buyer { claimed, calculated } => write!(
                f,
                "Claimed winner {} does not match calculated winner {}",
                claimed, calculated
            ),
        }
    }
}

/// Outcome of auditing a published result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionVerdict {
    pub valid: bool,
    pub mismatch: Option<SelectionMismatch>,
    pub calculated_ticket: Option<u64>,
    pub calculated_winner: Option<String>,
}

/// Recompute the selection and compare it against an operator's claim.
pub fn verify_winner_selection(
    entries: &[TicketEntry],
    block_hash: &str,
    claimed_ticket: u64,
    claimed_buyer: &str,
) -> Result<SelectionVerdict, LotteryError> {
    let Some(result) = select_winner(entries, block_hash)? else {
        return Ok(SelectionVerdict {
            valid: false,
            mismatch: Some(SelectionMismatch::NoWinner),
            calculated_ticket: None,
            calculated_winner: None,
        });
    };

    let calculated = result.ticket_number;
    let winner = result.winner.buyer_key;

    let mismatch = if calculated != claimed_ticket {
        Some(SelectionMismatch::Ticket { claimed: claimed_ticket, calculated })
    } else if winner != claimed_buyer {
        Some(SelectionMismatch::Buyer {
            claimed: claimed_buyer.to_string(),
            calculated: winner.clone(),
        })
    } else {
        None
    };

    Ok(SelectionVerdict {
        valid: mismatch.is_none(),
        mismatch,
        calculated_ticket: Some(calculated),
        calculated_winner: Some(winner),
    })
}

/// Prize split after the platform fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeBreakdown {
    pub gross_prize: u64,
    pub platform_fee: u64,
    pub net_prize: u64,
}

/// `fee = floor(total * percent / 100)`, `net = total - fee`.
///
/// Floor division is part of the public contract; never round.
pub fn calculate_prize_amount(
    total_sats: u64,
    platform_fee_percent: u8,
) -> Result<PrizeBreakdown, LotteryError> {
    if platform_fee_percent > 100 {
        return Err(LotteryError::InvalidFeePercent(platform_fee_percent));
    }
    // u128 keeps total * 100 from overflowing; the quotient fits in u64.
    let fee = (total_sats as u128 * platform_fee_percent as u128 / 100) as u64;
    Ok(PrizeBreakdown {
        gross_prize: total_sats,
        platform_fee: fee,
        net_prize: total_sats - fee,
    })
}

/// Human-readable summary of a result.
pub fn format_winner_result(result: &WinnerResult) -> String {
    let short_key: String = result.winner.buyer_key.chars().take(8).collect();
    [
        format!("Winning Ticket: #{}", result.ticket_number),
        format!("Winner: {}...", short_key),
        format!("Prize: {} sats worth of tickets", result.winner.amount_sats),
        String::new(),
        "Verification:".to_string(),
        format!("Block Hash: {}", result.block_hash),
        format!("Calculation: {}", result.verification.winning_ticket_calc),
    ]
    .join("\n")
}
