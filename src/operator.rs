//! Round operator: drives one round through its lifecycle
//!
//! ```text
//! announce ──▶ open ──▶ closed ──▶ confirming ──▶ paying ──▶ completed
//!                         │            │             │
//!                    publish       select         pay winner,
//!                   commitment     winner       publish result
//!                                                    └──▶ failed
//! ```
//!
//! The operator owns all round state (pinned draw block, commitment,
//! result, payout proof). The allocation and selection core stays pure:
//! each tick re-reads the chain and the event network and recomputes.
//!
//! Entries freeze and the commitment goes out no later than one block
//! before the draw block, even when sales close at the draw block itself.
//! Once published, the committed assignment is what gets drawn. Receipts
//! arriving after the freeze never change it, and a round holding tickets
//! but no commitment when the draw hash appears fails instead of drawing.

use crate::commitment::{TicketCommitment, commit};
use crate::messages::LotteryMessage;
use crate::payout::lightning_address_from_metadata;
use crate::provider::{BlockSource, EventSource, PaymentProof, PaymentSender, ProviderError, Publisher};
use crate::schedule::{RoundStatus, compute_round, round_for_draw_block};
use crate::tickets::{TicketEntry, allocate, distribution};
use crate::types::{LotteryConfig, LotteryError};
use crate::winner::{PrizeBreakdown, WinnerResult, calculate_prize_amount, select_winner};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error(transparent)]
    Lottery(#[from] LotteryError),
    #[error("provider: {0}")]
    Provider(#[from] ProviderError),
    #[error("ticket sales for round {0} are closed")]
    SalesClosed(String),
}

impl OperatorError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperatorError::Provider(e) if e.is_retryable())
    }
}

/// Everything the operator knows about the round it is running.
#[derive(Debug, Clone, Serialize)]
pub struct RoundState {
    pub id: String,
    pub draw_block: u64,
    pub status: RoundStatus,
    pub note_id: Option<String>,
    pub entries: Vec<TicketEntry>,
    pub commitment: Option<TicketCommitment>,
    pub commitment_event: Option<String>,
    pub result: Option<WinnerResult>,
    pub prize: Option<PrizeBreakdown>,
    pub payout: Option<PaymentProof>,
    pub result_event: Option<String>,
    pub failure: Option<String>,
    /// Entries frozen at sales close
    pub sealed: bool,
}

impl RoundState {
    fn new(id: String, draw_block: u64, note_id: Option<String>) -> Self {
        Self {
            id,
            draw_block,
            status: RoundStatus::Pending,
            note_id,
            entries: Vec::new(),
            commitment: None,
            commitment_event: None,
            result: None,
            prize: None,
            payout: None,
            result_event: None,
            failure: None,
            sealed: false,
        }
    }

    /// Round is over and the operator may move on.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

pub struct Operator<B, E, P, S> {
    config: LotteryConfig,
    blocks: Arc<B>,
    events: Arc<E>,
    publisher: Arc<P>,
    wallet: Arc<S>,
    state: Option<RoundState>,
    history: Vec<RoundState>,
}

impl<B, E, P, S> Operator<B, E, P, S>
where
    B: BlockSource,
    E: EventSource,
    P: Publisher,
    S: PaymentSender,
{
    pub fn new(
        config: LotteryConfig,
        blocks: Arc<B>,
        events: Arc<E>,
        publisher: Arc<P>,
        wallet: Arc<S>,
    ) -> Result<Self, OperatorError> {
        config.validate()?;
        Ok(Self {
            config,
            blocks,
            events,
            publisher,
            wallet,
            state: None,
            history: Vec::new(),
        })
    }

    pub fn state(&self) -> Option<&RoundState> {
        self.state.as_ref()
    }

    /// Finished rounds, oldest first.
    pub fn history(&self) -> &[RoundState] {
        &self.history
    }

    /// Publish an announcement for the current round and track its note.
    pub async fn announce(&mut self) -> Result<String, OperatorError> {
        let height = self.blocks.current_height().await?;
        let round = compute_round(height, &self.config, true)?;
        if round.status != RoundStatus::Open {
            return Err(OperatorError::SalesClosed(round.id));
        }

        let (id, draw_block) = (round.id.clone(), round.draw_block);
        let note_id = self.publisher.publish(&LotteryMessage::Announcement { round }).await?;
        info!("Announced {} (note {})", id, note_id);

        self.track_note(id, draw_block, note_id.clone());
        Ok(note_id)
    }

    /// Track receipts toward a note published elsewhere, for the current round.
    pub async fn track_existing_note(&mut self, note_id: &str) -> Result<(), OperatorError> {
        let height = self.blocks.current_height().await?;
        let round = compute_round(height, &self.config, true)?;
        self.track_note(round.id, round.draw_block, note_id.to_string());
        Ok(())
    }

    fn track_note(&mut self, id: String, draw_block: u64, note_id: String) {
        match &mut self.state {
            Some(state) if state.draw_block == draw_block => state.note_id = Some(note_id),
            _ => {
                if let Some(old) = self.state.take() {
                    if !old.is_finished() {
                        warn!("Abandoning unfinished {} for {}", old.id, id);
                    }
                    self.history.push(old);
                }
                self.state = Some(RoundState::new(id, draw_block, Some(note_id)));
            }
        }
    }

    /// One poll: read the chain, advance the round as far as it can go.
    ///
    /// Transient provider errors leave the round where it was for the next
    /// poll. Any other error ends the round as failed.
    pub async fn tick(&mut self) -> Result<&RoundState, OperatorError> {
        let height = self.blocks.current_height().await?;
        let current = compute_round(height, &self.config, false)?;

        let mut state = match self.state.take() {
            Some(done) if done.is_finished() && done.draw_block < current.draw_block => {
                info!("{} finished as {}", done.id, done.status);
                self.history.push(done);
                RoundState::new(current.id, current.draw_block, None)
            }
            Some(state) => state,
            None => RoundState::new(current.id, current.draw_block, None),
        };

        let outcome = self.advance(&mut state, height).await;
        if let Err(e) = &outcome {
            if !e.is_retryable() && !state.is_finished() {
                self.fail(&mut state, &e.to_string());
            }
        }
        let state = &*self.state.insert(state);
        outcome.map(|()| state)
    }

    /// Last height at which entries may still change.
    fn commit_deadline(&self, draw_block: u64) -> u64 {
        draw_block.saturating_sub(self.config.sales_close_blocks_before_draw.max(1))
    }

    async fn advance(&self, state: &mut RoundState, height: u64) -> Result<(), OperatorError> {
        if state.is_finished() {
            return Ok(());
        }
        let round =
            round_for_draw_block(state.draw_block, height, &self.config, state.note_id.is_some())?;
        debug!("{} at height {}: {}", round.id, height, round.status);

        match round.status {
            RoundStatus::Pending | RoundStatus::Open | RoundStatus::Closed => {
                state.status = round.status;
                if !state.sealed {
                    self.refresh_entries(state).await?;
                }
                let due = round.status == RoundStatus::Closed
                    || (state.note_id.is_some() && height >= self.commit_deadline(state.draw_block));
                if due {
                    state.sealed = true;
                    if state.commitment.is_none() {
                        self.publish_commitment(state).await?;
                    }
                }
            }
            RoundStatus::Confirming | RoundStatus::Completed => {
                if state.status < RoundStatus::Confirming {
                    state.status = RoundStatus::Confirming;
                }
                if state.result.is_none() && !self.draw(state).await? {
                    return Ok(());
                }
                if round.status == RoundStatus::Completed {
                    self.settle(state).await?;
                }
            }
            RoundStatus::Paying | RoundStatus::Failed => {}
        }
        Ok(())
    }

    async fn refresh_entries(&self, state: &mut RoundState) -> Result<(), OperatorError> {
        let Some(note_id) = &state.note_id else {
            return Ok(());
        };
        let receipts = self.events.receipts(note_id).await?;
        state.entries = allocate(&receipts, self.config.min_ticket_purchase)?;
        debug!(
            "{}: {} receipts → {} entries",
            state.id,
            receipts.len(),
            state.entries.len()
        );
        Ok(())
    }

    async fn publish_commitment(&self, state: &mut RoundState) -> Result<(), OperatorError> {
        if state.entries.is_empty() {
            return Ok(());
        }
        let commitment = commit(&state.entries, state.draw_block)?;
        let event = self
            .publisher
            .publish(&LotteryMessage::Commitment { commitment: commitment.clone() })
            .await?;
        info!(
            "{}: committed {} tickets, hash {}",
            state.id, commitment.total_tickets, commitment.ticket_hash
        );
        state.commitment = Some(commitment);
        state.commitment_event = Some(event);
        Ok(())
    }

    /// Select the winner once the draw block hash is known.
    /// Returns false while the hash is not available yet.
    async fn draw(&self, state: &mut RoundState) -> Result<bool, OperatorError> {
        let Some(block_hash) = self.blocks.block_hash(state.draw_block).await? else {
            debug!("{}: draw block {} not available yet", state.id, state.draw_block);
            return Ok(false);
        };

        match state.commitment.as_ref().map(TicketCommitment::assignments) {
            Some(committed) => state.entries = committed?,
            // Untracked round, or nothing sold by the freeze.
            None if state.note_id.is_none() || (state.sealed && state.entries.is_empty()) => {}
            None => {
                warn!("{}: draw block {} arrived with no commitment", state.id, state.draw_block);
                self.fail(state, "no commitment published before the draw block");
                return Ok(true);
            }
        }

        match select_winner(&state.entries, &block_hash)? {
            Some(result) => {
                let total_sats = distribution(&state.entries).total_sats;
                let prize = calculate_prize_amount(total_sats, self.config.platform_fee_percent)?;
                info!(
                    "{}: ticket #{} wins ({})",
                    state.id, result.ticket_number, result.verification.winning_ticket_calc
                );
                state.prize = Some(prize);
                state.result = Some(result);
            }
            None => {
                info!("{}: no tickets sold, nothing to draw", state.id);
                state.status = RoundStatus::Completed;
            }
        }
        Ok(true)
    }

    /// Pay the winner and publish the result.
    async fn settle(&self, state: &mut RoundState) -> Result<(), OperatorError> {
        let (Some(result), Some(prize)) = (state.result.clone(), state.prize) else {
            return Ok(());
        };

        if state.payout.is_none() && prize.net_prize > 0 {
            state.status = RoundStatus::Paying;

            let profile = match self.events.profile(&result.winner.buyer_key).await {
                Ok(profile) => profile,
                Err(e) if e.is_retryable() => return Err(e.into()),
                Err(e) => {
                    self.fail(state, &format!("profile lookup failed: {}", e));
                    return Ok(());
                }
            };
            let Some(address) = lightning_address_from_metadata(profile.as_ref()) else {
                self.fail(state, "winner has no lightning address");
                return Ok(());
            };

            let comment = format!("Lottery prize! You won {} sats!", prize.net_prize);
            match self.wallet.pay(&address, prize.net_prize, &comment).await {
                Ok(proof) => {
                    info!("{}: paid {} sats to {}", state.id, prize.net_prize, address);
                    state.payout = Some(proof);
                }
                Err(e) if e.is_retryable() => return Err(e.into()),
                Err(e) => {
                    self.fail(state, &format!("payout failed: {}", e));
                    return Ok(());
                }
            }
        }

        if state.result_event.is_none() {
            let message = LotteryMessage::Result {
                draw_block: state.draw_block,
                result,
                prize_sats: prize.net_prize,
                preimage: state.payout.as_ref().map(|p| p.preimage.clone()),
            };
            state.result_event = Some(self.publisher.publish(&message).await?);
        }

        state.status = RoundStatus::Completed;
        Ok(())
    }

    fn fail(&self, state: &mut RoundState, reason: &str) {
        error!("{} failed: {}", state.id, reason);
        state.status = RoundStatus::Failed;
        state.failure = Some(reason.to_string());
    }

    /// Poll every `period` until `shutdown` resolves.
    pub async fn run<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Operator shutting down");
                    break;
                }
                _ = interval.tick() => match self.tick().await {
                    Ok(state) => info!(
                        "{}: {} | {} entries",
                        state.id, state.status, state.entries.len()
                    ),
                    Err(e) if e.is_retryable() => warn!("Tick failed, will retry: {}", e),
                    Err(e) => error!("Tick failed: {}", e),
                },
            }
        }
    }
}
