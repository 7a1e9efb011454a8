//! Receipt fixtures shared by integration tests
#![allow(dead_code)]

use blockdraw::{RECEIPT_KIND, Receipt};

/// 5 sats, payment hash 11..11
pub const INVOICE_5_SATS: &str = "lnbc50n1pvjluezpp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygsqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqwvuufr";
/// 3 sats, payment hash 22..22
pub const INVOICE_3_SATS: &str = "lnbc30n1pvjluezpp5yg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqwycppt";
/// No amount, payment hash 33..33
pub const INVOICE_NO_AMOUNT: &str = "lnbc1pvjluezpp5xvenxvenxvenxvenxvenxvenxvenxvenxvenxvenxvenxvenxvesqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqvh6g2p";
/// 100 sats, payment hash 44..44
pub const INVOICE_100_SATS: &str = "lnbc1u1pvjluezpp5g3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqguxstk";
/// 1 msat, floors to 0 sats; payment hash 55..55
pub const INVOICE_1_MSAT: &str = "lnbc10p1pvjluezpp5242424242424242424242424242424242424242424242424242sqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqq9qh295";
/// Testnet, 5 sats, payment hash 66..66
pub const INVOICE_TESTNET: &str = "lntb50n1pvjluezpp5venxvenxvenxvenxvenxvenxvenxvenxvenxvenxvenxvenxvenqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqtgqnsm";

pub const NOTE: &str = "note-lottery-850100";

/// Receipt for `invoice` paid by `sender` toward `NOTE`.
pub fn zap(id: &str, invoice: &str, sender: &str) -> Receipt {
    Receipt {
        id: id.to_string(),
        pubkey: "wallet-service".to_string(),
        created_at: 1_700_000_000,
        kind: RECEIPT_KIND,
        tags: vec![
            vec!["p".to_string(), "operator".to_string()],
            vec!["e".to_string(), NOTE.to_string()],
            vec!["bolt11".to_string(), invoice.to_string()],
            vec!["P".to_string(), sender.to_string()],
        ],
        content: String::new(),
    }
}

/// Receipt whose payer and amount come from the embedded payment request.
pub fn zap_with_request(id: &str, invoice: &str, request_json: &str) -> Receipt {
    Receipt {
        id: id.to_string(),
        pubkey: "wallet-service".to_string(),
        created_at: 1_700_000_100,
        kind: RECEIPT_KIND,
        tags: vec![
            vec!["e".to_string(), NOTE.to_string()],
            vec!["bolt11".to_string(), invoice.to_string()],
            vec!["description".to_string(), request_json.to_string()],
        ],
        content: String::new(),
    }
}
