//! Receipt parsing and end-to-end allocation from raw receipts

mod common;

use blockdraw::bolt11::{self, Bolt11Error};
use blockdraw::{
    LotteryError, ReceiptRejection, allocate, parse_receipt, parse_receipts, select_winner,
};
use common::*;

#[test]
fn test_parse_sender_tag() {
    let parsed = parse_receipt(&zap("z1", INVOICE_5_SATS, "buyer-y")).unwrap();
    assert_eq!(parsed.payment_hash, "11".repeat(32));
    assert_eq!(parsed.amount_sats, 5);
    assert_eq!(parsed.buyer_key, "buyer-y");
    assert_eq!(parsed.timestamp, 1_700_000_000);
    assert_eq!(parsed.target.as_deref(), Some(NOTE));
}

#[test]
fn test_amount_from_embedded_request() {
    let request = r#"{"kind":9734,"pubkey":"buyer-z","tags":[["amount","21000"],["e","note"]]}"#;
    let parsed = parse_receipt(&zap_with_request("z2", INVOICE_NO_AMOUNT, request)).unwrap();
    assert_eq!(parsed.amount_sats, 21);
    assert_eq!(parsed.buyer_key, "buyer-z");
}

#[test]
fn test_invoice_amount_wins_over_request() {
    let request = r#"{"pubkey":"buyer-z","tags":[["amount","999000"]]}"#;
    let parsed = parse_receipt(&zap_with_request("z3", INVOICE_100_SATS, request)).unwrap();
    assert_eq!(parsed.amount_sats, 100);
}

#[test]
fn test_no_amount_anywhere() {
    let request = r#"{"pubkey":"buyer-z","tags":[]}"#;
    assert_eq!(
        parse_receipt(&zap_with_request("z4", INVOICE_NO_AMOUNT, request)),
        Err(ReceiptRejection::MissingAmount)
    );
}

#[test]
fn test_sub_sat_payment_rejected() {
    assert_eq!(
        parse_receipt(&zap("z5", INVOICE_1_MSAT, "buyer")),
        Err(ReceiptRejection::ZeroAmount)
    );
}

#[test]
fn test_broken_checksum_rejected() {
    let mut invoice = INVOICE_5_SATS.to_string();
    invoice.pop();
    invoice.push('q');
    assert_eq!(
        parse_receipt(&zap("z6", &invoice, "buyer")),
        Err(ReceiptRejection::InvalidInvoice(Bolt11Error::InvalidChecksum))
    );
}

#[test]
fn test_testnet_invoice() {
    let invoice = bolt11::decode(INVOICE_TESTNET).unwrap();
    assert_eq!(invoice.currency, "tb");
    assert_eq!(invoice.amount_sats(), Some(5));
    assert_eq!(invoice.payment_hash.as_deref(), Some("66".repeat(32).as_str()));
    assert_eq!(invoice.timestamp, 1496314658);
}

#[test]
fn test_rejection_codes() {
    let mut not_a_receipt = zap("z7", INVOICE_5_SATS, "buyer");
    not_a_receipt.kind = 1;
    let mut no_invoice = zap("z8", INVOICE_5_SATS, "buyer");
    no_invoice.tags.retain(|t| t[0] != "bolt11");

    let (parsed, rejected) = parse_receipts(&[
        zap("ok", INVOICE_3_SATS, "buyer"),
        not_a_receipt,
        no_invoice,
    ]);
    assert_eq!(parsed.len(), 1);
    let codes: Vec<_> = rejected.iter().map(|(id, r)| (id.as_str(), r.code())).collect();
    assert_eq!(codes, vec![("z7", "wrong_kind"), ("z8", "missing_invoice")]);
}

#[test]
fn test_raw_receipts_to_winner() {
    // Received out of hash order; malformed receipts drop out silently.
    let mut junk = zap("junk", INVOICE_100_SATS, "nobody");
    junk.kind = 7;
    let receipts = vec![
        zap("x", INVOICE_3_SATS, "X"),
        junk,
        zap("dust", INVOICE_1_MSAT, "dust"),
        zap("y", INVOICE_5_SATS, "Y"),
    ];

    let entries = allocate(&receipts, 1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].buyer_key, "Y");
    assert_eq!((entries[0].ticket_start, entries[0].ticket_end), (1, 5));
    assert_eq!(entries[1].buyer_key, "X");
    assert_eq!((entries[1].ticket_start, entries[1].ticket_end), (6, 8));

    let result = select_winner(&entries, &format!("{:064x}", 17)).unwrap().unwrap();
    assert_eq!(result.ticket_number, 2);
    assert_eq!(result.winner.buyer_key, "Y");
}

#[test]
fn test_same_payment_reported_twice() {
    let receipts = vec![zap("a", INVOICE_5_SATS, "Y"), zap("b", INVOICE_5_SATS, "Y")];
    let hash = "11".repeat(32);
    assert_eq!(allocate(&receipts, 1), Err(LotteryError::DuplicatePaymentHash(hash)));
}

#[test]
fn test_redelivered_receipt_counts_once() {
    // Relays routinely hand back the same event more than once.
    let receipts = vec![
        zap("y", INVOICE_5_SATS, "Y"),
        zap("x", INVOICE_3_SATS, "X"),
        zap("y", INVOICE_5_SATS, "Y"),
    ];
    let entries = allocate(&receipts, 1).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!((entries[0].ticket_start, entries[0].ticket_end), (1, 5));
    assert_eq!((entries[1].ticket_start, entries[1].ticket_end), (6, 8));
}
