//! Ticket commitment: binds the operator to an assignment before the draw
//!
//! The commitment is published while the draw block is still unmined. Its
//! `ticket_assignments` field is the canonical serialization of every
//! range; `ticket_hash` is SHA3-256 over exactly those bytes, so anyone
//! holding the published text can check both the digest and the winner.
//!
//! Canonical form: a JSON array of objects with fixed field order
//! `paymentHash, pubkey, sats, start, end`, integers only, no whitespace.

use crate::crypto::sha3_hex;
use crate::tickets::{TicketEntry, check_ranges, total_tickets};
use crate::types::LotteryError;
use serde::{Deserialize, Serialize};

/// Published pre-draw snapshot of the ticket assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCommitment {
    pub draw_block: u64,
    pub total_tickets: u64,
    /// SHA3-256 of `ticket_assignments`, hex
    pub ticket_hash: String,
    /// Canonical JSON of the assignment list
    pub ticket_assignments: String,
}

/// Wire form of one assignment. Field order is part of the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assignment {
    payment_hash: String,
    pubkey: String,
    sats: u64,
    start: u64,
    end: u64,
}

impl From<&TicketEntry> for Assignment {
    fn from(e: &TicketEntry) -> Self {
        Self {
            payment_hash: e.payment_hash.clone(),
            pubkey: e.buyer_key.clone(),
            sats: e.amount_sats,
            start: e.ticket_start,
            end: e.ticket_end,
        }
    }
}

impl From<Assignment> for TicketEntry {
    fn from(a: Assignment) -> Self {
        Self {
            payment_hash: a.payment_hash,
            buyer_key: a.pubkey,
            amount_sats: a.sats,
            ticket_start: a.start,
            ticket_end: a.end,
            timestamp: 0,
        }
    }
}

fn canonical_assignments(entries: &[TicketEntry]) -> Result<String, LotteryError> {
    let assignments: Vec<Assignment> = entries.iter().map(Assignment::from).collect();
    serde_json::to_string(&assignments).map_err(|e| LotteryError::InvalidCommitment(e.to_string()))
}

/// Commit to `entries` for the round drawing at `draw_block`.
pub fn commit(entries: &[TicketEntry], draw_block: u64) -> Result<TicketCommitment, LotteryError> {
    let ticket_assignments = canonical_assignments(entries)?;
    let ticket_hash = sha3_hex(ticket_assignments.as_bytes());

    Ok(TicketCommitment {
        draw_block,
        total_tickets: total_tickets(entries),
        ticket_hash,
        ticket_assignments,
    })
}

/// Recompute the commitment for `entries` and compare hash and total.
pub fn verify_commitment(
    entries: &[TicketEntry],
    commitment: &TicketCommitment,
) -> Result<bool, LotteryError> {
    let recomputed = commit(entries, commitment.draw_block)?;
    Ok(recomputed.ticket_hash.eq_ignore_ascii_case(&commitment.ticket_hash)
        && recomputed.total_tickets == commitment.total_tickets)
}

impl TicketCommitment {
    /// Rebuild ticket entries from the published assignment text.
    ///
    /// Fails if the text is not valid assignment JSON, if its digest does
    /// not match `ticket_hash`, or if the ranges are not contiguous from 1.
    pub fn assignments(&self) -> Result<Vec<TicketEntry>, LotteryError> {
        if !sha3_hex(self.ticket_assignments.as_bytes()).eq_ignore_ascii_case(&self.ticket_hash) {
            return Err(LotteryError::InvalidCommitment(
                "ticket_hash does not match ticket_assignments".into(),
            ));
        }

        let parsed: Vec<Assignment> = serde_json::from_str(&self.ticket_assignments)
            .map_err(|e| LotteryError::InvalidCommitment(e.to_string()))?;
        let entries: Vec<TicketEntry> = parsed.into_iter().map(TicketEntry::from).collect();

        check_ranges(&entries)?;
        if total_tickets(&entries) != self.total_tickets {
            return Err(LotteryError::InvalidCommitment(format!(
                "total_tickets {} but assignments end at {}",
                self.total_tickets,
                total_tickets(&entries)
            )));
        }
        Ok(entries)
    }
}
