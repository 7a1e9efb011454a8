//! Round scheduler: block height to round milestones
//!
//! ```text
//! start                 sales close      draw        payout
//!   │◀──────── open ────────▶│◀─ closed ─▶│◀─ confirming ─▶│ completed
//!   k·cadence          draw − s      (k+1)·cadence   draw + confirmations
//! ```
//!
//! Rounds are a pure view over the chain: nothing is stored, every query
//! recomputes from the current height and the config.

use crate::types::{LotteryConfig, LotteryError, MINUTES_PER_BLOCK};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Round lifecycle.
///
/// `pending → open → closed → confirming → paying → completed`, with
/// `failed` reachable from any non-terminal state. The scheduler derives
/// every state except `paying` and `failed`, which only the operator
/// performing the payout can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Pending,
    Open,
    Closed,
    Confirming,
    Paying,
    Completed,
    Failed,
}

impl RoundStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RoundStatus::Completed | RoundStatus::Failed)
    }

    /// Draw block hash exists from here on.
    pub fn can_draw(self) -> bool {
        matches!(
            self,
            RoundStatus::Confirming | RoundStatus::Paying | RoundStatus::Completed
        )
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundStatus::Pending => "pending",
            RoundStatus::Open => "open",
            RoundStatus::Closed => "closed",
            RoundStatus::Confirming => "confirming",
            RoundStatus::Paying => "paying",
            RoundStatus::Completed => "completed",
            RoundStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Milestones and status of one round, as seen from a given height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub id: String,
    pub start_block: u64,
    pub sales_close_block: u64,
    pub draw_block: u64,
    pub payout_block: u64,
    pub next_round_start: u64,
    pub blocks_until_sales_close: u64,
    pub blocks_until_draw: u64,
    pub blocks_until_payout: u64,
    pub status: RoundStatus,
}

/// Round identifier derived from its draw block.
pub fn lottery_id(draw_block: u64) -> String {
    format!("lottery-{}", draw_block)
}

/// Compute the round containing `current_block`.
///
/// `note_tracked` reports whether an announcement note is collecting
/// receipts; without one an unexpired round is `pending`, not `open`.
pub fn compute_round(
    current_block: u64,
    config: &LotteryConfig,
    note_tracked: bool,
) -> Result<RoundInfo, LotteryError> {
    config.validate()?;

    let start = (current_block / config.block_cadence) * config.block_cadence;
    let draw_block = start
        .checked_add(config.block_cadence)
        .ok_or_else(|| LotteryError::InvalidConfig("draw block overflows u64".into()))?;

    round_for_draw_block(draw_block, current_block, config, note_tracked)
}

/// Milestones of the round drawing at `draw_block`, evaluated at `current_block`.
///
/// `compute_round` always returns a round whose draw block lies in the
/// future, so a caller that committed to a round uses this to follow it
/// through `confirming` and `completed`.
pub fn round_for_draw_block(
    draw_block: u64,
    current_block: u64,
    config: &LotteryConfig,
    note_tracked: bool,
) -> Result<RoundInfo, LotteryError> {
    config.validate()?;
    if draw_block < config.block_cadence {
        return Err(LotteryError::InvalidConfig(format!(
            "draw block {} precedes the first full round",
            draw_block
        )));
    }

    let start_block = draw_block - config.block_cadence;
    let sales_close_block = draw_block - config.sales_close_blocks_before_draw;
    // Single threshold for both payout-time checks.
    let payout_block = draw_block
        .checked_add(config.confirmations_required)
        .ok_or_else(|| LotteryError::InvalidConfig("payout block overflows u64".into()))?;

    let status = if current_block >= payout_block {
        RoundStatus::Completed
    } else if current_block >= draw_block {
        RoundStatus::Confirming
    } else if current_block >= sales_close_block {
        RoundStatus::Closed
    } else if note_tracked {
        RoundStatus::Open
    } else {
        RoundStatus::Pending
    };

    Ok(RoundInfo {
        id: lottery_id(draw_block),
        start_block,
        sales_close_block,
        draw_block,
        payout_block,
        next_round_start: draw_block,
        blocks_until_sales_close: sales_close_block.saturating_sub(current_block),
        blocks_until_draw: draw_block.saturating_sub(current_block),
        blocks_until_payout: payout_block.saturating_sub(current_block),
        status,
    })
}

/// Rough wall-clock estimate for a block distance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeEstimate {
    pub minutes: u64,
    pub hours: f64,
    pub formatted: String,
}

pub fn estimate_time_to_block(blocks_away: u64) -> TimeEstimate {
    let minutes = blocks_away.saturating_mul(MINUTES_PER_BLOCK);
    let hours = minutes as f64 / 60.0;

    let formatted = if minutes < 60 {
        format!("~{} min", minutes)
    } else if hours < 24.0 {
        format!("~{:.1} hours", hours)
    } else {
        format!("~{:.1} days", hours / 24.0)
    };

    TimeEstimate { minutes, hours, formatted }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones() {
        let config = LotteryConfig::default();
        let round = compute_round(850_042, &config, true).unwrap();

        assert_eq!(round.start_block, 850_000);
        assert_eq!(round.draw_block, 850_100);
        assert_eq!(round.sales_close_block, 850_094);
        assert_eq!(round.payout_block, 850_106);
        assert_eq!(round.next_round_start, 850_100);
        assert_eq!(round.blocks_until_draw, 58);
        assert_eq!(round.id, "lottery-850100");
        assert_eq!(round.status, RoundStatus::Open);
    }

    #[test]
    fn test_round_boundary_starts_new_round() {
        let config = LotteryConfig::default();
        let round = compute_round(850_100, &config, true).unwrap();
        assert_eq!(round.start_block, 850_100);
        assert_eq!(round.draw_block, 850_200);
    }

    #[test]
    fn test_pending_without_note() {
        let config = LotteryConfig::default();
        let round = compute_round(850_001, &config, false).unwrap();
        assert_eq!(round.status, RoundStatus::Pending);
    }

    #[test]
    fn test_closed_regardless_of_note() {
        let config = LotteryConfig::default();
        assert_eq!(compute_round(850_094, &config, false).unwrap().status, RoundStatus::Closed);
        assert_eq!(compute_round(850_099, &config, true).unwrap().status, RoundStatus::Closed);
    }

    #[test]
    fn test_pinned_round_progression() {
        let config = LotteryConfig::default();
        let at = |h| round_for_draw_block(850_100, h, &config, true).unwrap().status;

        assert_eq!(at(850_050), RoundStatus::Open);
        assert_eq!(at(850_094), RoundStatus::Closed);
        assert_eq!(at(850_100), RoundStatus::Confirming);
        assert_eq!(at(850_105), RoundStatus::Confirming);
        assert_eq!(at(850_106), RoundStatus::Completed);
        assert_eq!(at(900_000), RoundStatus::Completed);
    }

    #[test]
    fn test_blocks_until_saturate() {
        let config = LotteryConfig::default();
        let round = round_for_draw_block(850_100, 850_200, &config, true).unwrap();
        assert_eq!(round.blocks_until_sales_close, 0);
        assert_eq!(round.blocks_until_draw, 0);
        assert_eq!(round.blocks_until_payout, 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LotteryConfig { block_cadence: 0, ..Default::default() };
        assert!(compute_round(10, &config, true).is_err());
    }

    #[test]
    fn test_genesis_round() {
        let config = LotteryConfig::default();
        let round = compute_round(0, &config, true).unwrap();
        assert_eq!(round.start_block, 0);
        assert_eq!(round.draw_block, 100);
    }

    #[test]
    fn test_time_estimate_format() {
        assert_eq!(estimate_time_to_block(3).formatted, "~30 min");
        assert_eq!(estimate_time_to_block(9).formatted, "~1.5 hours");
        assert_eq!(estimate_time_to_block(288).formatted, "~2.0 days");
        assert_eq!(estimate_time_to_block(0).minutes, 0);
    }
}
