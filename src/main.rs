//! blockdraw: audit and run block-hash lottery rounds from the command line

use anyhow::{Context, Result, bail};
use blockdraw::{
    LotteryConfig, Receipt, RoundStatus, TicketCommitment, allocate, calculate_prize_amount,
    commit, compute_round, distribution, estimate_time_to_block, format_winner_result,
    parse_receipts, round_for_draw_block, select_winner, verify_commitment,
    verify_winner_selection,
};
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blockdraw", version, about = "Provably fair Lightning lottery")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON config file; missing fields take defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Blocks per round
    #[arg(long, global = true)]
    cadence: Option<u64>,

    /// Sales close this many blocks before the draw
    #[arg(long, global = true)]
    sales_close: Option<u64>,

    /// Confirmations before payout
    #[arg(long, global = true)]
    confirmations: Option<u64>,

    /// Minimum sats per receipt
    #[arg(long, global = true)]
    min_purchase: Option<u64>,

    /// Platform fee percent (0-100)
    #[arg(long, global = true)]
    fee: Option<u8>,
}

impl ConfigArgs {
    fn load(&self) -> Result<LotteryConfig> {
        let mut config = match &self.config {
            Some(path) => read_json::<LotteryConfig>(path)?,
            None => LotteryConfig::default(),
        };
        if let Some(v) = self.cadence {
            config.block_cadence = v;
        }
        if let Some(v) = self.sales_close {
            config.sales_close_blocks_before_draw = v;
        }
        if let Some(v) = self.confirmations {
            config.confirmations_required = v;
        }
        if let Some(v) = self.min_purchase {
            config.min_ticket_purchase = v;
        }
        if let Some(v) = self.fee {
            config.platform_fee_percent = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Show the round at a block height
    Round {
        /// Current block height
        #[arg(long)]
        height: u64,

        /// Follow the round drawing at this block instead of the current one
        #[arg(long)]
        draw_block: Option<u64>,

        /// An announcement note is collecting receipts
        #[arg(long)]
        tracked: bool,
    },

    /// Allocate tickets from a JSON array of receipts
    Tickets {
        #[arg(long)]
        receipts: PathBuf,
    },

    /// Build the ticket commitment for a round
    Commit {
        #[arg(long)]
        receipts: PathBuf,

        #[arg(long)]
        draw_block: u64,
    },

    /// Select the winner from a published commitment
    Draw {
        #[arg(long)]
        commitment: PathBuf,

        /// Draw block hash, 64 hex chars
        #[arg(long)]
        block_hash: String,
    },

    /// Audit a commitment and, optionally, a claimed winner
    Verify {
        #[arg(long)]
        commitment: PathBuf,

        /// Receipts to recompute the commitment from
        #[arg(long)]
        receipts: Option<PathBuf>,

        #[arg(long, requires_all = ["ticket", "buyer"])]
        block_hash: Option<String>,

        /// Claimed winning ticket
        #[arg(long)]
        ticket: Option<u64>,

        /// Claimed winner key
        #[arg(long)]
        buyer: Option<String>,
    },

    /// Split a pot into fee and net prize
    Prize {
        /// Total sats collected
        #[arg(long)]
        total: u64,
    },
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_receipts(path: &Path) -> Result<Vec<Receipt>> {
    let receipts: Vec<Receipt> = read_json(path)?;
    info!("Loaded {} receipts from {}", receipts.len(), path.display());
    Ok(receipts)
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("blockdraw=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.load()?;

    match cli.command {
        Command::Round { height, draw_block, tracked } => {
            let round = match draw_block {
                Some(draw) => round_for_draw_block(draw, height, &config, tracked)?,
                None => compute_round(height, &config, tracked)?,
            };
            let until_draw = estimate_time_to_block(round.blocks_until_draw);
            let draw_eta = i64::try_from(until_draw.minutes)
                .ok()
                .and_then(Duration::try_minutes)
                .and_then(|d| Utc::now().checked_add_signed(d))
                .map(|t| t.to_rfc3339());

            print_json(&json!({
                "round": round,
                "drawable": round.status.can_draw(),
                "timeToSalesClose": estimate_time_to_block(round.blocks_until_sales_close),
                "timeToDraw": until_draw,
                "estimatedDrawTime": draw_eta,
            }))?;
        }

        Command::Tickets { receipts } => {
            let receipts = read_receipts(&receipts)?;
            let (_, rejected) = parse_receipts(&receipts);
            for (id, reason) in &rejected {
                warn!("Receipt {} rejected: {}", id, reason);
            }
            let entries = allocate(&receipts, config.min_ticket_purchase)?;

            print_json(&json!({
                "entries": entries,
                "distribution": distribution(&entries),
                "rejected": rejected
                    .iter()
                    .map(|(id, reason)| json!({ "id": id, "reason": reason.code() }))
                    .collect::<Vec<_>>(),
            }))?;
        }

        Command::Commit { receipts, draw_block } => {
            let receipts = read_receipts(&receipts)?;
            let entries = allocate(&receipts, config.min_ticket_purchase)?;
            let commitment = commit(&entries, draw_block)?;
            info!(
                "Committed {} tickets for block {}: {}",
                commitment.total_tickets, draw_block, commitment.ticket_hash
            );
            print_json(&commitment)?;
        }

        Command::Draw { commitment, block_hash } => {
            let commitment: TicketCommitment = read_json(&commitment)?;
            let entries = commitment.assignments()?;

            match select_winner(&entries, &block_hash)? {
                Some(result) => {
                    let prize = calculate_prize_amount(
                        distribution(&entries).total_sats,
                        config.platform_fee_percent,
                    )?;
                    eprintln!("{}", format_winner_result(&result));
                    print_json(&json!({ "result": result, "prize": prize }))?;
                }
                None => {
                    info!("No tickets in commitment for block {}", commitment.draw_block);
                    print_json(&json!({ "result": null, "status": RoundStatus::Completed }))?;
                }
            }
        }

        Command::Verify { commitment, receipts, block_hash, ticket, buyer } => {
            let commitment: TicketCommitment = read_json(&commitment)?;
            let entries = match commitment.assignments() {
                Ok(entries) => entries,
                Err(e) => {
                    print_json(&json!({ "commitmentValid": false, "reason": e.to_string() }))?;
                    return Ok(ExitCode::FAILURE);
                }
            };

            let mut valid = true;
            let mut report = json!({ "commitmentValid": true });

            if let Some(path) = receipts {
                let recomputed = allocate(&read_receipts(&path)?, config.min_ticket_purchase)?;
                let matches = verify_commitment(&recomputed, &commitment)?;
                valid &= matches;
                report["receiptsMatch"] = json!(matches);
            }

            if let Some(hash) = block_hash {
                let (Some(ticket), Some(buyer)) = (ticket, buyer) else {
                    bail!("--block-hash needs both --ticket and --buyer");
                };
                let verdict = verify_winner_selection(&entries, &hash, ticket, &buyer)?;
                valid &= verdict.valid;
                if let Some(mismatch) = &verdict.mismatch {
                    warn!("Winner claim rejected: {}", mismatch);
                }
                report["selection"] = json!(verdict);
            }

            report["valid"] = json!(valid);
            print_json(&report)?;
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Prize { total } => {
            print_json(&calculate_prize_amount(total, config.platform_fee_percent)?)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
