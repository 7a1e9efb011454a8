//! Lottery constants, configuration and shared errors.
//!
//! Every value that feeds the public verification contract lives here:
//! ticket pricing, block cadence and the event kinds used on the wire.
//! Nothing in this module reads ambient state; configuration is always
//! passed explicitly into the scheduler, allocator and selector.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ROUND CADENCE
// =============================================================================

/// Blocks between draws. One round per ~16.7 hours at 10 min/block.
pub const DEFAULT_BLOCK_CADENCE: u64 = 100;

/// Ticket sales close this many blocks before the draw block.
pub const DEFAULT_SALES_CLOSE_BLOCKS: u64 = 6;

/// Confirmations on top of the draw block before the prize is paid.
/// 6 blocks makes a reorg of the draw block practically impossible.
pub const DEFAULT_CONFIRMATIONS: u64 = 6;

/// Minimum receipt amount (sats) that buys tickets.
pub const DEFAULT_MIN_TICKET_PURCHASE: u64 = 1;

/// Average block interval used for time estimates only.
pub const MINUTES_PER_BLOCK: u64 = 10;

// =============================================================================
// WIRE CONSTANTS
// =============================================================================

/// Event kind of a payment receipt (zap receipt).
pub const RECEIPT_KIND: u32 = 9735;

/// Event kind of the addressable ticket commitment.
pub const COMMITMENT_KIND: u32 = 30078;

/// Event kind of plain text notes (announcements, results).
pub const NOTE_KIND: u32 = 1;

/// Hashtag marking lottery-related notes.
pub const LOTTERY_TAG: &str = "nostr-lottery";

/// Hex length of a payment hash and of a block hash (32 bytes).
pub const HASH_HEX_LEN: usize = 64;

/// Configuration for a lottery round.
///
/// Immutable for the duration of one computation. Loaded from JSON with
/// every field optional; missing fields take the defaults above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    /// Blocks per round
    pub block_cadence: u64,
    /// Blocks before the draw block at which sales close
    pub sales_close_blocks_before_draw: u64,
    /// Confirmations required on the draw block before payout
    pub confirmations_required: u64,
    /// Minimum sats a receipt must carry to buy tickets
    pub min_ticket_purchase: u64,
    /// Platform fee, whole percent (0-100)
    pub platform_fee_percent: u8,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            block_cadence: DEFAULT_BLOCK_CADENCE,
            sales_close_blocks_before_draw: DEFAULT_SALES_CLOSE_BLOCKS,
            confirmations_required: DEFAULT_CONFIRMATIONS,
            min_ticket_purchase: DEFAULT_MIN_TICKET_PURCHASE,
            platform_fee_percent: 0,
        }
    }
}

impl LotteryConfig {
    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), LotteryError> {
        if self.block_cadence == 0 {
            return Err(LotteryError::InvalidConfig(
                "block_cadence must be positive".into(),
            ));
        }
        if self.sales_close_blocks_before_draw >= self.block_cadence {
            return Err(LotteryError::InvalidConfig(format!(
                "sales_close_blocks_before_draw ({}) must be below block_cadence ({})",
                self.sales_close_blocks_before_draw, self.block_cadence
            )));
        }
        if self.min_ticket_purchase == 0 {
            return Err(LotteryError::InvalidConfig(
                "min_ticket_purchase must be positive".into(),
            ));
        }
        if self.platform_fee_percent > 100 {
            return Err(LotteryError::InvalidFeePercent(self.platform_fee_percent));
        }
        Ok(())
    }
}

/// Errors raised by the allocation and selection core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("platform fee {0}% is outside 0-100")]
    InvalidFeePercent(u8),

    #[error("duplicate payment hash: {0}")]
    DuplicatePaymentHash(String),

    #[error("invalid block hash: {0}")]
    InvalidBlockHash(String),

    #[error("ticket count overflows u64")]
    TicketOverflow,

    /// Allocator and selector disagree; never expected outside a bug.
    #[error("ticket {ticket} of {total} has no owner")]
    InvariantViolation { ticket: u64, total: u64 },

    #[error("invalid commitment: {0}")]
    InvalidCommitment(String),
}

/// Check that `s` is a 32-byte hash in hex (either case).
pub fn is_hash_hex(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}
