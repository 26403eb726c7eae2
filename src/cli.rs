//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::log_notifier::LogNotifier;
use crate::adapters::paper_venue::PaperVenue;
use crate::adapters::state_store::JsonStateStore;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::config_validation::{validate_backtest_config, validate_live_config};
use crate::domain::error::TraderError;
use crate::domain::execution::RiskConfig;
use crate::domain::metrics::Summary;
use crate::domain::signal::{SignalConfig, SignalEngine};
use crate::live::schedule::Schedule;
use crate::live::session::{Session, StopReason};
use crate::live::LiveConfig;
use crate::ports::broker_port::BrokerPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::market_port::MarketDataPort;
use crate::ports::notify_port::Notifier;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "extrema-trader",
    about = "MA extrema strategy backtester and live trader"
)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over a bar CSV
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Bar CSV: time,open,high,low,close,spread
        #[arg(short, long)]
        data: PathBuf,
        /// Per-bar results CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Trade live against the paper venue, replaying a bar CSV
    Live {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        replay: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
        /// Also check the [live] and [notify] sections
        #[arg(long)]
        live: bool,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            from,
            to,
        } => run_backtest(&config, &data, output.as_deref(), from, to),
        Command::Live { config, replay } => run_live(&config, &replay),
        Command::Validate { config, live } => run_validate(&config, live),
    }
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(Targets::new().with_default(level));
    // A second call (tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

fn fail(err: TraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(fail)
}

pub fn build_signal_config(adapter: &dyn ConfigPort, atr_gate_default: bool) -> SignalConfig {
    let defaults = SignalConfig::default();
    SignalConfig {
        ma_window: adapter.get_usize("strategy", "ma_window", defaults.ma_window),
        atr_period: adapter.get_usize("strategy", "atr_period", defaults.atr_period),
        volatility_threshold: adapter.get_double(
            "strategy",
            "volatility_threshold",
            defaults.volatility_threshold,
        ),
        atr_gate: adapter.get_bool("strategy", "atr_gate", atr_gate_default),
    }
}

pub fn build_risk_config(adapter: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    RiskConfig {
        initial_capital: adapter.get_double("risk", "initial_capital", defaults.initial_capital),
        risk_fraction: adapter.get_double("risk", "risk_fraction", defaults.risk_fraction),
        leverage: adapter.get_double("risk", "leverage", defaults.leverage),
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    BacktestConfig {
        signal: build_signal_config(adapter, true),
        risk: build_risk_config(adapter),
    }
}

pub fn build_live_config(adapter: &dyn ConfigPort) -> Result<LiveConfig, TraderError> {
    let defaults = LiveConfig::default();
    let symbol = adapter
        .get_string("live", "symbol")
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TraderError::ConfigMissing {
            section: "live".into(),
            key: "symbol".into(),
        })?;

    let int_setting = |key: &str, default: u32| -> u32 {
        u32::try_from(adapter.get_int("live", key, i64::from(default))).unwrap_or(default)
    };

    Ok(LiveConfig {
        symbol,
        timeframe_minutes: int_setting("timeframe_minutes", defaults.timeframe_minutes),
        fetch_count: adapter.get_usize("live", "fetch_count", defaults.fetch_count),
        risk_fraction: adapter.get_double("risk", "risk_fraction", defaults.risk_fraction),
        retry_interval: Duration::from_secs(adapter.get_u64(
            "live",
            "retry_interval_secs",
            defaults.retry_interval.as_secs(),
        )),
        stale_limit: int_setting("stale_limit", defaults.stale_limit),
        closure_poll: Duration::from_secs(adapter.get_u64(
            "live",
            "closure_poll_secs",
            defaults.closure_poll.as_secs(),
        )),
        closure_lookback: chrono::TimeDelta::hours(adapter.get_int(
            "live",
            "closure_lookback_hours",
            defaults.closure_lookback.num_hours(),
        )),
    })
}

/// Bundled replays trade at a fixed pace when `replay_interval_ms` is set and
/// on the wall clock otherwise.
pub fn build_schedule(adapter: &dyn ConfigPort, live: &LiveConfig) -> Schedule {
    match adapter.get_string("live", "replay_interval_ms") {
        Some(_) => Schedule::Fixed(Duration::from_millis(adapter.get_u64(
            "live",
            "replay_interval_ms",
            0,
        ))),
        None => Schedule::WallClock {
            timeframe_minutes: live.timeframe_minutes,
        },
    }
}

pub fn build_notifier(adapter: &dyn ConfigPort) -> Result<Arc<dyn Notifier>, TraderError> {
    let backend = adapter
        .get_string("notify", "backend")
        .unwrap_or_else(|| "log".to_string())
        .to_lowercase();
    match backend.as_str() {
        "log" => Ok(Arc::new(LogNotifier)),
        #[cfg(feature = "pushover")]
        "pushover" => {
            use crate::adapters::pushover_notifier::PushoverNotifier;
            let key = |name: &str| {
                adapter
                    .get_string("notify", name)
                    .ok_or_else(|| TraderError::ConfigMissing {
                        section: "notify".into(),
                        key: name.into(),
                    })
            };
            Ok(Arc::new(PushoverNotifier::new(key("user_key")?, key("api_token")?)))
        }
        other => Err(TraderError::ConfigInvalid {
            section: "notify".into(),
            key: "backend".into(),
            reason: format!("backend '{}' is not available in this build", other),
        }),
    }
}

fn run_backtest(
    config_path: &Path,
    data_path: &Path,
    output_path: Option<&Path>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        return fail(e);
    }
    let bt_config = build_backtest_config(&adapter);

    // Stage 2: Load bars
    let start: Option<NaiveDateTime> = from.and_then(|d| d.and_hms_opt(0, 0, 0));
    let end: Option<NaiveDateTime> = to.and_then(|d| d.and_hms_opt(23, 59, 59));
    let bars = match CsvAdapter::new(data_path.to_path_buf()).fetch_bars(start, end) {
        Ok(b) => b,
        Err(e) => return fail(e),
    };
    eprintln!("Loaded {} bars from {}", bars.len(), data_path.display());

    // Stage 3: Run
    let result = match backtest_engine::run_backtest(&bars, &bt_config) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 4: Console summary
    print_summary(&result.summary);

    // Stage 5: Per-bar results
    let output = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("backtest_results.csv"));
    match CsvReportAdapter.write(&result, &output) {
        Ok(()) => {
            eprintln!("\nResults written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

pub fn print_summary(summary: &Summary) {
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Initial Capital:    {:.2}", summary.initial_capital);
    eprintln!("Final Capital:      {:.2}", summary.final_capital);
    eprintln!("Final Balance:      {:.2}", summary.final_balance);
    eprintln!("Total Signals:      {}", summary.total_signals);
    eprintln!("Profitable Signals: {}", summary.profitable_signals);
    eprintln!("Profitability Rate: {}", summary.profitability);
    eprintln!("Total Return:       {:.2}%", summary.total_return * 100.0);
    eprintln!("Max Drawdown:       -{:.1}%", summary.max_drawdown * 100.0);
    eprintln!(
        "Trades Won/Lost:    {}/{}",
        summary.trades_won, summary.trades_lost
    );
    eprintln!("Profit Factor:      {:.2}", summary.profit_factor);
    eprintln!(
        "Average Win/Loss:   {:.2}/{:.2}",
        summary.avg_win, summary.avg_loss
    );
    eprintln!(
        "Largest Win/Loss:   {:.2}/{:.2}",
        summary.largest_win, summary.largest_loss
    );
}

fn run_live(config_path: &Path, replay_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_live_config(&adapter) {
        return fail(e);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return fail(e.into()),
    };
    match runtime.block_on(live_pipeline(&adapter, replay_path)) {
        Ok(StopReason::Shutdown) | Ok(StopReason::FeedExhausted) => ExitCode::SUCCESS,
        Err(e) => fail(e),
    }
}

async fn live_pipeline(adapter: &FileConfigAdapter, replay_path: &Path) -> Result<StopReason, TraderError> {
    let live = build_live_config(adapter)?;
    let signal = build_signal_config(adapter, false);
    let risk = build_risk_config(adapter);
    let schedule = build_schedule(adapter, &live);
    let notifier = build_notifier(adapter)?;

    let store = adapter
        .get_string("live", "state_path")
        .map(|p| JsonStateStore::new(PathBuf::from(p)));
    let engine = match store.as_ref().map(JsonStateStore::load).transpose()?.flatten() {
        Some(state) => SignalEngine::from_state(signal, state)?,
        None => SignalEngine::new(signal),
    };

    let bars = CsvAdapter::new(replay_path.to_path_buf()).fetch_bars(None, None)?;
    eprintln!(
        "Replaying {} bars of {} through the paper venue",
        bars.len(),
        live.symbol
    );
    let venue = Arc::new(PaperVenue::new(
        live.symbol.clone(),
        bars,
        risk.initial_capital,
    ));
    let market: Arc<dyn MarketDataPort> = venue.clone();
    let broker: Arc<dyn BrokerPort> = venue.clone();

    let mut session = Session::new(live, engine, market, broker, notifier, schedule);
    if let Some(store) = store {
        session = session.with_state_store(store);
    }
    let reason = session.run().await?;

    let balance = venue.account_balance().await?.unwrap_or(risk.initial_capital);
    eprintln!(
        "\nReplayed {} bars, paper balance {:.2}",
        venue.completed_bars().await,
        balance
    );
    Ok(reason)
}

fn run_validate(config_path: &Path, live: bool) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let result = if live {
        validate_live_config(&adapter)
    } else {
        validate_backtest_config(&adapter)
    };
    if let Err(e) = result {
        return fail(e);
    }

    let signal = build_signal_config(&adapter, !live);
    eprintln!("\nStrategy:");
    eprintln!("  ma_window:            {}", signal.ma_window);
    eprintln!("  atr_period:           {}", signal.atr_period);
    eprintln!("  volatility_threshold: {}", signal.volatility_threshold);
    eprintln!("  atr_gate:             {}", signal.atr_gate);
    let risk = build_risk_config(&adapter);
    eprintln!("\nRisk:");
    eprintln!("  initial_capital: {}", risk.initial_capital);
    eprintln!("  risk_fraction:   {}", risk.risk_fraction);
    eprintln!("  leverage:        {}", risk.leverage);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn signal_config_defaults_follow_mode() {
        let a = adapter("");
        assert!(build_signal_config(&a, true).atr_gate);
        assert!(!build_signal_config(&a, false).atr_gate);
        assert_eq!(build_signal_config(&a, true).ma_window, 10);

        let a = adapter("[strategy]\natr_gate = true\nma_window = 20\n");
        let cfg = build_signal_config(&a, false);
        assert!(cfg.atr_gate);
        assert_eq!(cfg.ma_window, 20);
    }

    #[test]
    fn live_config_from_ini() {
        let a = adapter(
            "[risk]\nrisk_fraction = 0.02\n\
             [live]\nsymbol = XAUUSD\ntimeframe_minutes = 15\nstale_limit = 3\nclosure_lookback_hours = 6\n",
        );
        let cfg = build_live_config(&a).unwrap();
        assert_eq!(cfg.symbol, "XAUUSD");
        assert_eq!(cfg.timeframe_minutes, 15);
        assert_eq!(cfg.stale_limit, 3);
        assert_eq!(cfg.fetch_count, 12);
        assert_eq!(cfg.risk_fraction, 0.02);
        assert_eq!(cfg.retry_interval, Duration::from_secs(1));
        assert_eq!(cfg.closure_lookback, chrono::TimeDelta::hours(6));
    }

    #[test]
    fn live_config_requires_symbol() {
        let err = build_live_config(&adapter("[live]\n")).unwrap_err();
        assert!(matches!(err, TraderError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn schedule_choice() {
        let live = LiveConfig::default();
        assert_eq!(
            build_schedule(&adapter(""), &live),
            Schedule::WallClock { timeframe_minutes: 5 }
        );
        assert_eq!(
            build_schedule(&adapter("[live]\nreplay_interval_ms = 10\n"), &live),
            Schedule::Fixed(Duration::from_millis(10))
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let result = build_notifier(&adapter("[notify]\nbackend = carrier_pigeon\n"));
        assert!(matches!(result, Err(TraderError::ConfigInvalid { .. })));
        assert!(build_notifier(&adapter("")).is_ok());
    }
}
