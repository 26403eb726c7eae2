//! Property tests over random bar series.

mod common;

use common::t;
use extrema_trader::domain::backtest::{run_backtest, BacktestConfig};
use extrema_trader::domain::bar::Bar;
use extrema_trader::domain::execution::{RiskConfig, Simulator};
use extrema_trader::domain::metrics::ProfitabilityRate;
use extrema_trader::domain::position::Direction;
use extrema_trader::domain::signal::{
    generate_signals, Signal, SignalConfig, SignalEngine, SignalState, StreamingDriver,
};
use proptest::prelude::*;

fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-5.0f64..5.0, 0.0f64..3.0, 0.0f64..30.0), 1..max_len).prop_map(
        |steps| {
            let mut prev = 2000.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (delta, range, spread))| {
                    let open = prev;
                    let close = prev + delta;
                    prev = close;
                    Bar {
                        time: t(i),
                        open,
                        high: open.max(close) + range,
                        low: open.min(close) - range,
                        close,
                        spread,
                    }
                })
                .collect()
        },
    )
}

fn arb_signal_config() -> impl Strategy<Value = SignalConfig> {
    (2usize..15, 2usize..20, 0.0005f64..0.005, any::<bool>()).prop_map(
        |(ma_window, atr_period, volatility_threshold, atr_gate)| SignalConfig {
            ma_window,
            atr_period,
            volatility_threshold,
            atr_gate,
        },
    )
}

fn arb_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Buy), Just(Signal::Sell), Just(Signal::Flat)]
}

fn arb_bars_with_signals() -> impl Strategy<Value = Vec<(Bar, Signal, f64)>> {
    arb_bars(80).prop_flat_map(|bars| {
        let n = bars.len();
        (
            Just(bars),
            prop::collection::vec(arb_signal(), n),
            prop::collection::vec(-10.0f64..10.0, n),
        )
            .prop_map(|(bars, signals, offsets)| {
                bars.into_iter()
                    .zip(signals)
                    .zip(offsets)
                    .map(|((bar, signal), offset)| {
                        let ma = bar.close + offset;
                        (bar, signal, ma)
                    })
                    .collect()
            })
    })
}

/// Whole-series reference: moving average and ATR over the full arrays,
/// extrema found by scanning every MA triple, then filtered and shifted two
/// bars later. Shares no state with `SignalEngine`.
fn reference_signals(bars: &[Bar], config: &SignalConfig) -> Vec<(f64, Signal)> {
    let n = bars.len();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ma: Vec<f64> = (0..n)
        .map(|i| {
            let start = (i + 1).saturating_sub(config.ma_window);
            closes[start..=i].iter().sum::<f64>() / (i + 1 - start) as f64
        })
        .collect();
    let tr: Vec<f64> = (0..n)
        .map(|i| match i {
            0 => 0.0,
            _ => {
                let (b, pc) = (&bars[i], closes[i - 1]);
                (b.high - b.low)
                    .max((b.high - pc).abs())
                    .max((b.low - pc).abs())
            }
        })
        .collect();
    let period = config.atr_period;
    let atr: Vec<Option<f64>> = (0..n)
        .map(|i| (i >= period).then(|| tr[i + 1 - period..=i].iter().sum::<f64>() / period as f64))
        .collect();

    let mut fresh = vec![Signal::Flat; n];
    let mut extrema: Vec<f64> = Vec::new();
    for k in 2..n {
        let (a, mid, c) = (ma[k - 2], ma[k - 1], ma[k]);
        let kind = if mid < a && mid < c {
            Signal::Buy
        } else if mid > a && mid > c {
            Signal::Sell
        } else {
            continue;
        };
        extrema.push(mid);
        let calm = !config.atr_gate
            || atr[k - 1].is_some_and(|v| v < config.volatility_threshold * closes[k - 1]);
        let reverted = match extrema.as_slice() {
            [.., prev, last] => (closes[k] - ma[k]).abs() >= (last - prev).abs(),
            _ => false,
        };
        if calm && !reverted {
            fresh[k] = kind;
        }
    }

    (0..n)
        .map(|k| {
            let signal = if k < config.warmup_bars() || k < 2 {
                Signal::Flat
            } else {
                fresh[k - 2]
            };
            (ma[k], signal)
        })
        .collect()
}

proptest! {
    #[test]
    fn batch_matches_whole_series_reference(
        bars in arb_bars(150),
        config in arb_signal_config(),
    ) {
        let outputs = generate_signals(&bars, &config).unwrap();
        let expected = reference_signals(&bars, &config);

        prop_assert_eq!(outputs.len(), expected.len());
        for (i, (out, (ma, signal))) in outputs.iter().zip(&expected).enumerate() {
            prop_assert_eq!(out.ma, *ma, "ma at bar {}", i);
            prop_assert_eq!(out.signal, *signal, "signal at bar {}", i);
        }
    }

    #[test]
    fn streaming_matches_batch(
        bars in arb_bars(120),
        config in arb_signal_config(),
        fetch in 1usize..15,
        restart_every in 1usize..40,
    ) {
        let batch = generate_signals(&bars, &config).unwrap();

        let mut driver = StreamingDriver::new(SignalEngine::new(config.clone()));
        let mut streamed = Vec::new();
        for end in 0..bars.len() {
            let start = (end + 1).saturating_sub(fetch);
            streamed.extend(driver.ingest(&bars[start..=end]).unwrap());

            if end % restart_every == 0 {
                let json = serde_json::to_string(driver.engine().state()).unwrap();
                let state: SignalState = serde_json::from_str(&json).unwrap();
                let engine = SignalEngine::from_state(config.clone(), state).unwrap();
                driver = StreamingDriver::new(engine);
            }
        }

        prop_assert_eq!(streamed.len(), batch.len());
        for (s, b) in streamed.iter().zip(&batch) {
            prop_assert_eq!(s.time, b.time);
            prop_assert_eq!(s.ma, b.ma);
            prop_assert_eq!(s.signal, b.signal);
        }
    }

    #[test]
    fn warmup_bars_are_flat(bars in arb_bars(60), config in arb_signal_config()) {
        let outputs = generate_signals(&bars, &config).unwrap();
        for out in outputs.iter().take(config.warmup_bars()) {
            prop_assert_eq!(out.signal, Signal::Flat);
        }
    }

    #[test]
    fn trades_never_overlap(rows in arb_bars_with_signals()) {
        let mut sim = Simulator::new(RiskConfig::default());
        for (bar, signal, ma) in &rows {
            sim.on_bar(bar, *signal, *ma);
        }
        let open_time = sim.position().map(|p| p.open_time);
        let portfolio = sim.finish();

        for pair in portfolio.closed_trades.windows(2) {
            prop_assert!(pair[1].open_time >= pair[0].exit_time);
        }
        for trade in &portfolio.closed_trades {
            prop_assert!(trade.exit_time >= trade.open_time);
        }
        if let (Some(open), Some(last)) = (open_time, portfolio.closed_trades.last()) {
            prop_assert!(open >= last.exit_time);
        }
        // Every opening is counted, and every position but the last one closed.
        let still_open = usize::from(open_time.is_some());
        prop_assert_eq!(portfolio.total_signals, portfolio.closed_trades.len() + still_open);
    }

    #[test]
    fn stop_only_tightens(rows in arb_bars_with_signals()) {
        let mut sim = Simulator::new(RiskConfig::default());
        let mut tracked: Option<(chrono::NaiveDateTime, Direction, f64)> = None;

        for (bar, signal, ma) in &rows {
            sim.on_bar(bar, *signal, *ma);
            let Some(position) = sim.position() else {
                tracked = None;
                continue;
            };
            let Some(stop) = position.stop_loss else {
                prop_assert!(tracked.is_none_or(|(open, _, _)| open != position.open_time));
                continue;
            };
            if let Some((open, direction, previous)) = tracked {
                if open == position.open_time {
                    match direction {
                        Direction::Long => prop_assert!(stop >= previous),
                        Direction::Short => prop_assert!(stop <= previous),
                    }
                }
            }
            tracked = Some((position.open_time, position.direction(), stop));
        }
    }

    #[test]
    fn profitable_never_exceeds_total(
        bars in arb_bars(150),
        signal in arb_signal_config(),
    ) {
        let config = BacktestConfig { signal, risk: RiskConfig::default() };
        let result = run_backtest(&bars, &config).unwrap();
        let summary = &result.summary;

        prop_assert!(summary.profitable_signals <= summary.total_signals);
        if summary.total_signals == 0 {
            prop_assert_eq!(summary.profitability, ProfitabilityRate::NoSignals);
        }
        prop_assert_eq!(
            result.portfolio.records.len(),
            bars.len().saturating_sub(config.signal.warmup_bars())
        );
    }
}
