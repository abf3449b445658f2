mod support;

use std::sync::Arc;
use std::time::Duration;

use killzone::app::{CloseDecision, LifecycleParams, OpenDecision, PositionLifecycleManager};
use killzone::domain::{Direction, ExitReason, ProfileTable, RiskSizer, VolatilityProfile};
use killzone::store::PositionStore;
use rust_decimal_macros::dec;

use support::candles::{at, flat, session_trend, window};
use support::ledger::{long, short, temp_store};

fn manager(store: Arc<PositionStore>) -> PositionLifecycleManager {
    PositionLifecycleManager::new(store, RiskSizer::default(), LifecycleParams::default())
}

#[test]
fn kill_zone_trend_opens_long_with_atr_brackets() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));

    // Four in-session bars, +2 body each, range 4: bias 2, ATR 4,
    // threshold 4 * 0.05 = 0.2.
    let candles = session_trend(dec!(100), dec!(2), dec!(4));
    let decision = manager.evaluate_open("BTC/USD", &window(candles), at(17));

    let OpenDecision::Opened(position) = decision else {
        panic!("expected an open, got {decision:?}");
    };
    assert_eq!(position.direction(), Direction::Long);
    assert_eq!(position.entry_price(), dec!(108));
    assert_eq!(position.stop_loss(), dec!(102));
    assert_eq!(position.take_profit(), dec!(120));
    assert_eq!(store.open_positions(), vec![position]);
}

#[test]
fn kill_zone_sell_off_opens_short() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));

    let candles = session_trend(dec!(100), dec!(-2), dec!(4));
    let OpenDecision::Opened(position) = manager.evaluate_open("ETH/USD", &window(candles), at(17)) else {
        panic!("expected an open");
    };
    assert_eq!(position.direction(), Direction::Short);
    assert_eq!(position.entry_price(), dec!(92));
    assert_eq!(position.stop_loss(), dec!(98));
    assert_eq!(position.take_profit(), dec!(80));
}

#[test]
fn per_symbol_profile_overrides_default() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let profiles = ProfileTable::default().with(
        "SOL/USD",
        VolatilityProfile {
            stop_multiplier: dec!(1),
            target_multiplier: dec!(2),
        },
    );
    let manager = PositionLifecycleManager::new(store, RiskSizer::new(profiles), LifecycleParams::default());

    let candles = session_trend(dec!(100), dec!(2), dec!(4));
    let OpenDecision::Opened(position) = manager.evaluate_open("SOL/USD", &window(candles), at(17)) else {
        panic!("expected an open");
    };
    assert_eq!(position.stop_loss(), dec!(104));
    assert_eq!(position.take_profit(), dec!(116));
}

#[test]
fn atr_on_either_bound_stands_aside() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));
    let hours = [14, 15, 16, 17];

    for range in [dec!(0.05), dec!(100)] {
        let decision = manager.evaluate_open("BTC/USD", &window(flat(&hours, dec!(200), range)), at(17));
        assert_eq!(decision, OpenDecision::VolatilityOutOfBounds { atr: range });
    }
    for range in [dec!(0.01), dec!(150)] {
        let decision = manager.evaluate_open("BTC/USD", &window(flat(&hours, dec!(200), range)), at(17));
        assert!(matches!(decision, OpenDecision::VolatilityOutOfBounds { .. }));
    }

    // Just inside the band the gate passes and the flat bias decides.
    let decision = manager.evaluate_open("BTC/USD", &window(flat(&hours, dec!(200), dec!(0.06))), at(17));
    assert!(matches!(decision, OpenDecision::Neutral { .. }));
    assert!(store.open_positions().is_empty());
}

#[test]
fn repeated_open_keeps_a_single_position() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));
    let w = window(session_trend(dec!(100), dec!(2), dec!(4)));

    assert!(manager.evaluate_open("BTC/USD", &w, at(16)).is_opened());
    assert_eq!(manager.evaluate_open("BTC/USD", &w, at(17)), OpenDecision::AlreadyOpen);
    assert_eq!(store.open_positions().len(), 1);
}

#[test]
fn concurrent_try_open_admits_exactly_one() {
    let (_dir, store) = temp_store(Duration::from_secs(1));

    let admitted: usize = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                scope.spawn(move || store.try_open(long("XRP/USD", dec!(100), dec!(90), dec!(120))))
            })
            .collect();
        handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
    });

    assert_eq!(admitted, 1);
    assert_eq!(store.open_positions().len(), 1);
}

#[test]
fn take_profit_beats_time_exit() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));
    store.try_open(long("BTC/USD", dec!(100), dec!(90), dec!(120)));

    let decision = manager.evaluate_close("BTC/USD", dec!(121), true, at(19));
    let CloseDecision::Closed(closed) = decision else {
        panic!("expected a close, got {decision:?}");
    };
    assert_eq!(closed.exit_reason(), Some(ExitReason::TakeProfit));
    assert_eq!(closed.exit_price(), Some(dec!(120)));
    assert_eq!(closed.realized_pnl(), Some(dec!(20)));
    assert!(!store.is_open("BTC/USD"));
}

#[test]
fn stop_loss_beats_time_exit() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));
    store.try_open(short("ETH/USD", dec!(100), dec!(110), dec!(80)));

    let CloseDecision::Closed(closed) = manager.evaluate_close("ETH/USD", dec!(111), true, at(19)) else {
        panic!("expected a close");
    };
    assert_eq!(closed.exit_reason(), Some(ExitReason::StopLoss));
    assert_eq!(closed.realized_pnl(), Some(dec!(-10)));
}

#[test]
fn time_exit_fills_at_market_once_session_elapsed() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));
    store.try_open(long("BTC/USD", dec!(100), dec!(90), dec!(120)));

    assert_eq!(manager.evaluate_close("BTC/USD", dec!(104), false, at(17)), CloseDecision::Hold);
    assert!(store.is_open("BTC/USD"));

    let CloseDecision::Closed(closed) = manager.evaluate_close("BTC/USD", dec!(104), true, at(18)) else {
        panic!("expected a close");
    };
    assert_eq!(closed.exit_reason(), Some(ExitReason::TimeExit));
    assert_eq!(closed.exit_price(), Some(dec!(104)));
    assert_eq!(closed.realized_pnl(), Some(dec!(4)));
}

#[test]
fn pnl_sign_follows_direction() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    store.try_open(long("BTC/USD", dec!(100), dec!(90), dec!(120)));
    store.try_open(short("ETH/USD", dec!(100), dec!(120), dec!(90)));

    let long_closed = store.close("BTC/USD", dec!(110), ExitReason::TimeExit, at(18)).unwrap();
    let short_closed = store.close("ETH/USD", dec!(110), ExitReason::TimeExit, at(18)).unwrap();

    assert_eq!(long_closed.realized_pnl(), Some(dec!(10)));
    assert_eq!(short_closed.realized_pnl(), Some(dec!(-10)));
    assert_eq!(store.realized_pnl(), dec!(0));
}

#[test]
fn closed_symbol_can_open_a_new_position() {
    let (_dir, store) = temp_store(Duration::from_secs(1));
    let manager = manager(Arc::clone(&store));
    let w = window(session_trend(dec!(100), dec!(2), dec!(4)));

    assert!(manager.evaluate_open("BTC/USD", &w, at(15)).is_opened());
    assert!(matches!(
        manager.evaluate_close("BTC/USD", dec!(130), false, at(16)),
        CloseDecision::Closed(_)
    ));
    assert!(manager.evaluate_open("BTC/USD", &w, at(17)).is_opened());
    assert_eq!(store.closed_trades().len(), 1);
    assert_eq!(store.open_positions().len(), 1);
}
