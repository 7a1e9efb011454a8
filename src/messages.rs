//! Announcement, commitment and result messages
//!
//! The publisher signs and distributes these; here they are only rendered
//! into note text and tags.

use crate::commitment::TicketCommitment;
use crate::schedule::RoundInfo;
use crate::types::{COMMITMENT_KIND, LOTTERY_TAG, NOTE_KIND};
use crate::winner::WinnerResult;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LotteryMessage {
    /// Opens a round; payments toward this note buy tickets
    Announcement { round: RoundInfo },
    /// Published before the draw block is mined
    Commitment { commitment: TicketCommitment },
    /// Winner announcement, with proof of payment once paid
    Result {
        draw_block: u64,
        result: WinnerResult,
        prize_sats: u64,
        preimage: Option<String>,
    },
}

impl LotteryMessage {
    pub fn kind(&self) -> u32 {
        match self {
            LotteryMessage::Commitment { .. } => COMMITMENT_KIND,
            _ => NOTE_KIND,
        }
    }

    pub fn draw_block(&self) -> u64 {
        match self {
            LotteryMessage::Announcement { round } => round.draw_block,
            LotteryMessage::Commitment { commitment } => commitment.draw_block,
            LotteryMessage::Result { draw_block, .. } => *draw_block,
        }
    }

    pub fn content(&self) -> String {
        match self {
            LotteryMessage::Announcement { round } => [
                format!("Lightning Lottery Round #{}", round.draw_block),
                String::new(),
                "Zap this note to buy tickets!".to_string(),
                "1 sat = 1 ticket".to_string(),
                String::new(),
                format!("Draw Block: {}", round.draw_block),
                format!("Sales Close: Block {}", round.sales_close_block),
                format!("Payout: Block {}", round.payout_block),
                String::new(),
                format!("Blocks until sales close: {}", round.blocks_until_sales_close),
                String::new(),
                "Winner determined by Bitcoin block hash - provably fair!".to_string(),
                String::new(),
                format!("#{} #bitcoin #lightning", LOTTERY_TAG),
            ]
            .join("\n"),
            LotteryMessage::Commitment { commitment } => [
                format!("Ticket Commitment for Lottery #{}", commitment.draw_block),
                String::new(),
                format!("Total Tickets: {}", commitment.total_tickets),
                format!("Commitment Hash: {}", commitment.ticket_hash),
                String::new(),
                format!(
                    "This commitment was published before block {} was mined.",
                    commitment.draw_block
                ),
                "Anyone can verify the winner by checking the ticket assignments below.".to_string(),
            ]
            .join("\n"),
            LotteryMessage::Result { draw_block, result, prize_sats, preimage } => [
                format!("Lottery #{} Winner Announced!", draw_block),
                String::new(),
                format!("Winning Ticket: #{}", result.ticket_number),
                format!("Winner: nostr:{}", result.winner.buyer_key),
                format!("Prize: {} sats", prize_sats),
                String::new(),
                "Verification:".to_string(),
                format!("Block Hash: {}", result.block_hash),
                format!("Calculation: {}", result.verification.winning_ticket_calc),
                String::new(),
                match preimage {
                    Some(p) => format!("Payment Preimage: {}", p),
                    None => "Payout pending...".to_string(),
                },
                String::new(),
                format!("#{} #bitcoin #lightning", LOTTERY_TAG),
            ]
            .join("\n"),
        }
    }

    pub fn tags(&self) -> Vec<Vec<String>> {
        fn tag(name: &str, value: impl ToString) -> Vec<String> {
            vec![name.to_string(), value.to_string()]
        }

        match self {
            LotteryMessage::Announcement { round } => vec![
                tag("t", LOTTERY_TAG),
                tag("t", "bitcoin"),
                tag("t", "lightning"),
                tag("draw_block", round.draw_block),
                tag("sales_close_block", round.sales_close_block),
            ],
            LotteryMessage::Commitment { commitment } => vec![
                tag("d", format!("lottery-commitment-{}", commitment.draw_block)),
                tag("t", LOTTERY_TAG),
                tag("draw_block", commitment.draw_block),
                tag("total_tickets", commitment.total_tickets),
                tag("ticket_hash", &commitment.ticket_hash),
                tag("ticket_assignments", &commitment.ticket_assignments),
                tag(
                    "alt",
                    format!("Lottery ticket commitment for block {}", commitment.draw_block),
                ),
            ],
            LotteryMessage::Result { draw_block, result, prize_sats, preimage } => {
                let mut tags = vec![
                    tag("t", LOTTERY_TAG),
                    tag("p", &result.winner.buyer_key),
                    tag("draw_block", draw_block),
                    tag("block_hash", &result.block_hash),
                    tag("winning_ticket", result.ticket_number),
                    tag("total_tickets", result.verification.total_tickets),
                    tag("prize_sats", prize_sats),
                ];
                if let Some(p) = preimage {
                    tags.push(tag("preimage", p));
                }
                tags
            }
        }
    }
}
