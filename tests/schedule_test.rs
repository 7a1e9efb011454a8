//! Round scheduler tests

use blockdraw::{
    LotteryConfig, LotteryError, RoundStatus, compute_round, estimate_time_to_block, lottery_id,
    round_for_draw_block,
};
use proptest::prelude::*;

#[test]
fn test_default_round_at_850042() {
    let round = compute_round(850_042, &LotteryConfig::default(), true).unwrap();

    assert_eq!(round.id, "lottery-850100");
    assert_eq!(round.start_block, 850_000);
    assert_eq!(round.sales_close_block, 850_094);
    assert_eq!(round.draw_block, 850_100);
    assert_eq!(round.payout_block, 850_106);
    assert_eq!(round.blocks_until_sales_close, 52);
    assert_eq!(round.blocks_until_draw, 58);
    assert_eq!(round.blocks_until_payout, 64);
    assert_eq!(round.status, RoundStatus::Open);
}

#[test]
fn test_sales_close_window() {
    let config = LotteryConfig::default();
    assert_eq!(compute_round(850_093, &config, true).unwrap().status, RoundStatus::Open);
    assert_eq!(compute_round(850_094, &config, true).unwrap().status, RoundStatus::Closed);
    assert_eq!(compute_round(850_099, &config, true).unwrap().status, RoundStatus::Closed);
    // Draw block itself belongs to the next round.
    let next = compute_round(850_100, &config, true).unwrap();
    assert_eq!(next.id, lottery_id(850_200));
    assert_eq!(next.status, RoundStatus::Open);
}

#[test]
fn test_custom_cadence() {
    let config = LotteryConfig {
        block_cadence: 144,
        sales_close_blocks_before_draw: 12,
        confirmations_required: 3,
        ..Default::default()
    };
    let round = compute_round(1_000, &config, false).unwrap();

    assert_eq!(round.start_block, 864);
    assert_eq!(round.draw_block, 1_008);
    assert_eq!(round.sales_close_block, 996);
    assert_eq!(round.payout_block, 1_011);
    assert_eq!(round.status, RoundStatus::Closed);
}

#[test]
fn test_pinned_round_lifecycle() {
    let config = LotteryConfig::default();
    let status = |height, tracked| {
        round_for_draw_block(850_100, height, &config, tracked).unwrap().status
    };

    assert_eq!(status(850_010, false), RoundStatus::Pending);
    assert_eq!(status(850_010, true), RoundStatus::Open);
    assert_eq!(status(850_094, true), RoundStatus::Closed);
    assert_eq!(status(850_100, true), RoundStatus::Confirming);
    assert_eq!(status(850_106, false), RoundStatus::Completed);
}

#[test]
fn test_status_helpers() {
    assert!(RoundStatus::Confirming.can_draw());
    assert!(RoundStatus::Completed.can_draw());
    assert!(!RoundStatus::Closed.can_draw());
    assert!(RoundStatus::Failed.is_terminal());
    assert!(!RoundStatus::Paying.is_terminal());
    assert_eq!(RoundStatus::Confirming.to_string(), "confirming");
    assert_eq!(serde_json::to_string(&RoundStatus::Paying).unwrap(), "\"paying\"");
}

#[test]
fn test_invalid_configs() {
    let bad = [
        LotteryConfig { block_cadence: 0, ..Default::default() },
        LotteryConfig { sales_close_blocks_before_draw: 100, ..Default::default() },
        LotteryConfig { min_ticket_purchase: 0, ..Default::default() },
    ];
    for config in &bad {
        assert!(matches!(
            compute_round(850_000, config, true),
            Err(LotteryError::InvalidConfig(_))
        ));
    }

    let fee = LotteryConfig { platform_fee_percent: 150, ..Default::default() };
    assert_eq!(compute_round(1, &fee, true), Err(LotteryError::InvalidFeePercent(150)));
}

#[test]
fn test_pinned_before_first_round() {
    assert!(round_for_draw_block(50, 10, &LotteryConfig::default(), true).is_err());
}

#[test]
fn test_config_from_partial_json() {
    let config: LotteryConfig =
        serde_json::from_str(r#"{"block_cadence": 50, "platform_fee_percent": 2}"#).unwrap();
    assert_eq!(config.block_cadence, 50);
    assert_eq!(config.platform_fee_percent, 2);
    assert_eq!(config.sales_close_blocks_before_draw, 6);
    assert_eq!(config.confirmations_required, 6);
}

#[test]
fn test_time_estimates() {
    let est = estimate_time_to_block(58);
    assert_eq!(est.minutes, 580);
    assert_eq!(est.formatted, "~9.7 hours");
    assert_eq!(estimate_time_to_block(5).formatted, "~50 min");
}

proptest! {
    #[test]
    fn prop_milestones_ordered(height in 0u64..10_000_000, cadence in 2u64..1_000, close in 1u64..50) {
        prop_assume!(close < cadence);
        let config = LotteryConfig {
            block_cadence: cadence,
            sales_close_blocks_before_draw: close,
            ..Default::default()
        };
        let round = compute_round(height, &config, true).unwrap();

        prop_assert!(round.start_block <= height && height < round.draw_block);
        prop_assert_eq!(round.start_block % cadence, 0);
        prop_assert_eq!(round.draw_block - round.start_block, cadence);
        prop_assert!(round.sales_close_block < round.draw_block);
        prop_assert!(round.draw_block < round.payout_block);
        prop_assert!(!round.status.can_draw());
    }
}
