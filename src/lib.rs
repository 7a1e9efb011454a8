pub mod bolt11;
pub mod commitment;
pub mod crypto;
pub mod messages;
pub mod operator;
pub mod payout;
pub mod provider;
pub mod receipt;
pub mod schedule;
pub mod tickets;
pub mod types;
pub mod winner;

pub use commitment::{TicketCommitment, commit, verify_commitment};
pub use crypto::{sha3, sha3_hex};
pub use messages::LotteryMessage;
pub use operator::{Operator, OperatorError, RoundState};
pub use payout::{ProfileMetadata, is_valid_lightning_address, lightning_address_from_metadata};
pub use provider::{BlockSource, EventSource, PaymentProof, PaymentSender, ProviderError, Publisher};
pub use receipt::{ParsedReceipt, Receipt, ReceiptRejection, parse_receipt, parse_receipts};
pub use schedule::{
    RoundInfo, RoundStatus, TimeEstimate, compute_round, estimate_time_to_block, lottery_id,
    round_for_draw_block,
};
pub use tickets::{
    BuyerStats, TicketDistribution, TicketEntry, allocate, allocate_parsed, check_ranges,
    distribution, find_ticket_owner, total_tickets,
};
pub use types::*;
pub use winner::{
    PrizeBreakdown, SelectionMismatch, SelectionVerdict, Verification, WinnerResult,
    calculate_prize_amount, format_winner_result, select_winner, verify_winner_selection,
};
