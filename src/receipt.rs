//! Payment receipt parsing
//!
//! Receipts arrive as loosely-shaped network events. Parsing either yields
//! a `ParsedReceipt` with every required field present, or a
//! `ReceiptRejection` naming why the receipt buys no ticket. The allocator
//! only ever sees parsed receipts.

use crate::bolt11::{self, Bolt11Error};
use crate::types::RECEIPT_KIND;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A signed payment receipt event as delivered by the event network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    /// Key of the wallet service that issued the receipt
    pub pubkey: String,
    pub created_at: u64,
    pub kind: u32,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
}

impl Receipt {
    /// Value of the first tag named `name`.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some(name))
            .and_then(|t| t.get(1))
            .map(String::as_str)
    }
}

/// Receipt fields the allocator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    pub receipt_id: String,
    /// 64 lowercase hex chars
    pub payment_hash: String,
    pub buyer_key: String,
    pub amount_sats: u64,
    pub timestamp: u64,
    /// Note the payment was made toward
    pub target: Option<String>,
}

/// Why a receipt buys no ticket.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiptRejection {
    #[error("event kind {0} is not a payment receipt")]
    WrongKind(u32),
    #[error("missing bolt11 tag")]
    MissingInvoice,
    #[error("undecodable invoice: {0}")]
    InvalidInvoice(#[from] Bolt11Error),
    #[error("invoice has no payment hash")]
    MissingPaymentHash,
    #[error("no amount in invoice or payment request")]
    MissingAmount,
    #[error("zero-sat payment")]
    ZeroAmount,
    #[error("sender key not found")]
    MissingSender,
}

impl ReceiptRejection {
    /// Stable reason code for logs and reports.
    pub fn code(&self) -> &'static str {
        match self {
            ReceiptRejection::WrongKind(_) => "wrong_kind",
            ReceiptRejection::MissingInvoice => "missing_invoice",
            ReceiptRejection::InvalidInvoice(_) => "invalid_invoice",
            ReceiptRejection::MissingPaymentHash => "missing_payment_hash",
            ReceiptRejection::MissingAmount => "missing_amount",
            ReceiptRejection::ZeroAmount => "zero_amount",
            ReceiptRejection::MissingSender => "missing_sender",
        }
    }
}

/// Payment request embedded in the receipt's `description` tag.
#[derive(Debug, Deserialize)]
struct EmbeddedRequest {
    pubkey: Option<String>,
    #[serde(default)]
    tags: Vec<Vec<String>>,
}

impl EmbeddedRequest {
    fn from_receipt(receipt: &Receipt) -> Option<Self> {
        serde_json::from_str(receipt.tag("description")?).ok()
    }

    fn amount_msat(&self) -> Option<u64> {
        self.tags
            .iter()
            .find(|t| t.first().map(String::as_str) == Some("amount"))
            .and_then(|t| t.get(1))
            .and_then(|v| v.parse().ok())
    }
}

/// Extract payer, payment hash and amount from a receipt.
pub fn parse_receipt(receipt: &Receipt) -> Result<ParsedReceipt, ReceiptRejection> {
    if receipt.kind != RECEIPT_KIND {
        return Err(ReceiptRejection::WrongKind(receipt.kind));
    }

    let invoice = bolt11::decode(receipt.tag("bolt11").ok_or(ReceiptRejection::MissingInvoice)?)?;
    let payment_hash = invoice.payment_hash.clone().ok_or(ReceiptRejection::MissingPaymentHash)?;

    let request = EmbeddedRequest::from_receipt(receipt);

    let amount_sats = match invoice.amount_sats() {
        Some(sats) => sats,
        None => request
            .as_ref()
            .and_then(EmbeddedRequest::amount_msat)
            .map(|msat| msat / 1000)
            .ok_or(ReceiptRejection::MissingAmount)?,
    };
    if amount_sats == 0 {
        return Err(ReceiptRejection::ZeroAmount);
    }

    // Uppercase P = sender; fall back to the signer of the embedded request.
    let buyer_key = receipt
        .tag("P")
        .map(str::to_string)
        .or_else(|| request.and_then(|r| r.pubkey))
        .filter(|k| !k.is_empty())
        .ok_or(ReceiptRejection::MissingSender)?;

    Ok(ParsedReceipt {
        receipt_id: receipt.id.clone(),
        payment_hash,
        buyer_key,
        amount_sats,
        timestamp: receipt.created_at,
        target: receipt.tag("e").map(str::to_string),
    })
}

/// Parse a batch, keeping the rejections alongside the receipt ids.
pub fn parse_receipts(
    receipts: &[Receipt],
) -> (Vec<ParsedReceipt>, Vec<(String, ReceiptRejection)>) {
    let mut parsed = Vec::with_capacity(receipts.len());
    let mut rejected = Vec::new();
    for receipt in receipts {
        match parse_receipt(receipt) {
            Ok(p) => parsed.push(p),
            Err(e) => rejected.push((receipt.id.clone(), e)),
        }
    }
    (parsed, rejected)
}
