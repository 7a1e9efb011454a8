//! Ticket allocation: receipts to contiguous ticket ranges
//!
//! # Algorithm
//!
//! 1. Parse receipts; drop unparseable ones and those below the minimum.
//! 2. Sort by payment hash (byte-wise on the lowercase hex).
//! 3. Walk the sorted list handing out `[start, start + sats - 1]`,
//!    starting at ticket 1.
//!
//! 1 sat = 1 ticket. Payment hashes are unpredictable to the payer, so the
//! resulting order cannot be steered by choosing when to pay. The whole
//! assignment is recomputed from scratch on every refresh.

use crate::receipt::{parse_receipt, ParsedReceipt, Receipt};
use crate::types::{LotteryError, is_hash_hex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// One receipt's ticket range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketEntry {
    pub payment_hash: String,
    pub buyer_key: String,
    pub amount_sats: u64,
    /// First ticket (1-indexed, inclusive)
    pub ticket_start: u64,
    /// Last ticket (inclusive)
    pub ticket_end: u64,
    /// Receipt creation time; 0 when rebuilt from a commitment
    pub timestamp: u64,
}

impl TicketEntry {
    pub fn ticket_count(&self) -> u64 {
        self.ticket_end - self.ticket_start + 1
    }

    pub fn contains(&self, ticket: u64) -> bool {
        self.ticket_start <= ticket && ticket <= self.ticket_end
    }
}

/// Build ticket entries from raw receipts.
///
/// Malformed receipts are excluded silently (logged at debug). The same
/// event delivered twice (same receipt id) counts once. Two distinct
/// receipts carrying the same payment hash make the order ambiguous and
/// fail the whole allocation.
pub fn allocate(
    receipts: &[Receipt],
    min_ticket_purchase: u64,
) -> Result<Vec<TicketEntry>, LotteryError> {
    let mut seen = HashSet::new();
    let parsed: Vec<ParsedReceipt> = receipts
        .iter()
        .filter(|r| {
            let first = seen.insert(r.id.as_str());
            if !first {
                debug!("Receipt {} delivered more than once", r.id);
            }
            first
        })
        .filter_map(|r| match parse_receipt(r) {
            Ok(p) => Some(p),
            Err(reason) => {
                debug!("Receipt {} excluded: {} ({})", r.id, reason, reason.code());
                None
            }
        })
        .collect();

    allocate_parsed(parsed, min_ticket_purchase)
}

/// Allocation over already-parsed receipts.
pub fn allocate_parsed(
    receipts: Vec<ParsedReceipt>,
    min_ticket_purchase: u64,
) -> Result<Vec<TicketEntry>, LotteryError> {
    let mut eligible: Vec<ParsedReceipt> = receipts
        .into_iter()
        .filter(|r| {
            let keep = r.amount_sats >= min_ticket_purchase && r.amount_sats > 0;
            if !keep {
                debug!(
                    "Receipt {} below minimum purchase: {} < {}",
                    r.receipt_id, r.amount_sats, min_ticket_purchase
                );
            }
            keep
        })
        .map(|mut r| {
            r.payment_hash.make_ascii_lowercase();
            r
        })
        .collect();

    eligible.sort_by(|a, b| a.payment_hash.as_bytes().cmp(b.payment_hash.as_bytes()));

    if let Some(dup) = eligible.windows(2).find(|w| w[0].payment_hash == w[1].payment_hash) {
        return Err(LotteryError::DuplicatePaymentHash(dup[0].payment_hash.clone()));
    }

    let mut entries = Vec::with_capacity(eligible.len());
    let mut next_ticket: u64 = 1;

    for r in eligible {
        let ticket_start = next_ticket;
        let ticket_end = ticket_start
            .checked_add(r.amount_sats - 1)
            .ok_or(LotteryError::TicketOverflow)?;
        next_ticket = ticket_end.checked_add(1).ok_or(LotteryError::TicketOverflow)?;

        entries.push(TicketEntry {
            payment_hash: r.payment_hash,
            buyer_key: r.buyer_key,
            amount_sats: r.amount_sats,
            ticket_start,
            ticket_end,
            timestamp: r.timestamp,
        });
    }

    Ok(entries)
}

/// Total tickets sold: the last entry's end, or 0.
pub fn total_tickets(entries: &[TicketEntry]) -> u64 {
    entries.last().map_or(0, |e| e.ticket_end)
}

/// Entry owning `ticket`, by binary search over the sorted ranges.
pub fn find_ticket_owner(entries: &[TicketEntry], ticket: u64) -> Option<&TicketEntry> {
    if ticket == 0 || ticket > total_tickets(entries) {
        return None;
    }

    let idx = entries.partition_point(|e| e.ticket_end < ticket);
    entries.get(idx).filter(|e| e.contains(ticket))
}

/// Check the range invariants of an externally supplied entry list.
///
/// Entries from `allocate` always pass; lists rebuilt from a published
/// commitment are checked before anyone searches them.
pub fn check_ranges(entries: &[TicketEntry]) -> Result<(), LotteryError> {
    let mut expected_start: u64 = 1;
    let mut seen = BTreeSet::new();

    for e in entries {
        if !is_hash_hex(&e.payment_hash) {
            return Err(LotteryError::InvalidCommitment(format!(
                "malformed payment hash {:?}",
                e.payment_hash
            )));
        }
        if !seen.insert(e.payment_hash.to_ascii_lowercase()) {
            return Err(LotteryError::DuplicatePaymentHash(e.payment_hash.clone()));
        }
        if e.amount_sats == 0
            || e.ticket_start != expected_start
            || e.ticket_end < e.ticket_start
            || e.ticket_end - e.ticket_start + 1 != e.amount_sats
        {
            return Err(LotteryError::InvalidCommitment(format!(
                "range {}-{} for {} sats breaks contiguity at ticket {}",
                e.ticket_start, e.ticket_end, e.amount_sats, expected_start
            )));
        }
        expected_start = e.ticket_end.checked_add(1).ok_or(LotteryError::TicketOverflow)?;
    }
    Ok(())
}

/// Per-buyer share of the ticket pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyerStats {
    pub buyer_key: String,
    pub tickets: u64,
    /// Share of all tickets, 0-100
    pub percentage: f64,
}

/// Aggregate view of an allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketDistribution {
    pub total_tickets: u64,
    pub total_sats: u64,
    pub unique_buyers: usize,
    /// Sorted by ticket count, descending; ties by buyer key
    pub buyer_stats: Vec<BuyerStats>,
}

pub fn distribution(entries: &[TicketEntry]) -> TicketDistribution {
    let total = total_tickets(entries);
    let total_sats = entries.iter().map(|e| e.amount_sats).sum();

    let mut per_buyer: HashMap<&str, u64> = HashMap::new();
    for e in entries {
        *per_buyer.entry(e.buyer_key.as_str()).or_insert(0) += e.amount_sats;
    }

    let mut buyer_stats: Vec<BuyerStats> = per_buyer
        .iter()
        .map(|(key, &tickets)| BuyerStats {
            buyer_key: key.to_string(),
            tickets,
            percentage: if total > 0 {
                tickets as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();
    buyer_stats.sort_by(|a, b| b.tickets.cmp(&a.tickets).then_with(|| a.buyer_key.cmp(&b.buyer_key)));

    TicketDistribution {
        total_tickets: total,
        total_sats,
        unique_buyers: per_buyer.len(),
        buyer_stats,
    }
}
