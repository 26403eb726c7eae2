//! The live trading loop.
//!
//! Each cycle fetches the latest completed bars, waits out stale polls, runs
//! the newest bar through the signal engine, acts on its published signal and
//! sweeps the trailing stops. Between cycles the session sleeps to the next
//! bar boundary while forwarding stop-out events from the closure watcher.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapters::state_store::JsonStateStore;
use crate::domain::bar::Bar;
use crate::domain::error::Result;
use crate::domain::position::Direction;
use crate::domain::signal::{Signal, SignalEngine, SignalOutput, StreamingDriver};
use crate::domain::sizing::order_volume;
use crate::live::closure_watcher::{ClosureWatcher, StopLossEvent, STOP_LOSS_TITLE};
use crate::live::dispatcher::{Dispatcher, ERROR_TITLE};
use crate::live::market_watch::{Freshness, MarketWatch};
use crate::live::schedule::Schedule;
use crate::live::stop_manager::{sweep_stops, StopChange};
use crate::live::LiveConfig;
use crate::ports::broker_port::BrokerPort;
use crate::ports::market_port::MarketDataPort;
use crate::ports::notify_port::Notifier;

pub const ALGORITHM_TITLE: &str = "Trading Algorithm";
pub const STARTED: &str = "MA Extrema Algorithm Has Started";
pub const STOPPED_MANUALLY: &str = "MA Extrema Algorithm Has Been Stopped Manually";
pub const FEED_FINISHED: &str = "MA Extrema Algorithm Has Stopped: market data exhausted";
pub const UNEXPECTED_ERROR_TITLE: &str = "Trading Algorithm Error";
pub const MARKET_STATUS_TITLE: &str = "Market Status";
pub const MARKET_CLOSED: &str = "Market has closed.";
pub const MARKET_REOPENED: &str = "Market has reopened.";
pub const ORDER_EXECUTED_TITLE: &str = "Order Executed";
pub const ORDER_FAILED_TITLE: &str = "Order Failed";
pub const POSITION_CLOSED_TITLE: &str = "Position Closed";

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The newest bar was processed.
    Processed {
        output: SignalOutput,
        stops: Vec<StopChange>,
    },
    /// Fresh window, but every bar in it was already seen.
    NoNewBar,
    /// A finite feed ran out.
    FeedExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    FeedExhausted,
}

fn side_name(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "BUY",
        Direction::Short => "SELL",
    }
}

pub struct Session {
    config: LiveConfig,
    market: Arc<dyn MarketDataPort>,
    broker: Arc<dyn BrokerPort>,
    dispatcher: Dispatcher,
    schedule: Schedule,
    driver: StreamingDriver,
    watch: MarketWatch,
    store: Option<JsonStateStore>,
    closures: Option<mpsc::UnboundedReceiver<StopLossEvent>>,
}

impl Session {
    pub fn new(
        config: LiveConfig,
        engine: SignalEngine,
        market: Arc<dyn MarketDataPort>,
        broker: Arc<dyn BrokerPort>,
        notifier: Arc<dyn Notifier>,
        schedule: Schedule,
    ) -> Self {
        let watch = MarketWatch::new(config.timeframe(), config.stale_limit);
        Session {
            config,
            market,
            broker,
            dispatcher: Dispatcher::new(notifier),
            schedule,
            driver: StreamingDriver::new(engine),
            watch,
            store: None,
            closures: None,
        }
    }

    /// Save the signal state after every processed bar.
    pub fn with_state_store(mut self, store: JsonStateStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn engine(&self) -> &SignalEngine {
        self.driver.engine()
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Spawn the closure watcher and forward its events from now on.
    pub fn watch_closures(&mut self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = ClosureWatcher::new(
            self.broker.clone(),
            self.config.closure_poll,
            self.config.closure_lookback,
        );
        // Detached; it ends when this session drops the receiver.
        let _handle = watcher.spawn(tx);
        self.closures = Some(rx);
    }

    /// Run until `shutdown` resolves, the feed runs out, or a cycle fails.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<StopReason>
    where
        F: Future<Output = ()>,
    {
        self.dispatcher.notify(ALGORITHM_TITLE, STARTED).await;
        if self.closures.is_none() {
            self.watch_closures();
        }
        info!(symbol = %self.config.symbol, "live session started");

        let dispatcher = self.dispatcher.clone();
        tokio::select! {
            result = self.run_loop() => match result {
                Ok(reason) => {
                    info!("market feed exhausted");
                    dispatcher.notify(ALGORITHM_TITLE, FEED_FINISHED).await;
                    Ok(reason)
                }
                Err(err) => {
                    error!(error = %err, "live session failed");
                    dispatcher
                        .notify(
                            UNEXPECTED_ERROR_TITLE,
                            &format!("An unexpected error occurred: {}", err),
                        )
                        .await;
                    Err(err)
                }
            },
            _ = shutdown => {
                info!("live session stopped by operator");
                dispatcher.notify(ALGORITHM_TITLE, STOPPED_MANUALLY).await;
                Ok(StopReason::Shutdown)
            }
        }
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<StopReason> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    async fn run_loop(&mut self) -> Result<StopReason> {
        loop {
            if let CycleOutcome::FeedExhausted = self.run_cycle().await? {
                self.drain_closures().await;
                return Ok(StopReason::FeedExhausted);
            }
            let wait = self.schedule.until_next_bar(Utc::now().naive_utc());
            debug!(secs = wait.as_secs_f64(), "sleeping until next bar");
            self.pause(wait).await;
        }
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let Some(bars) = self.fetch_fresh().await else {
            return Ok(CycleOutcome::FeedExhausted);
        };

        let outputs = self.driver.ingest(&bars)?;
        let Some((output, catch_up)) = outputs.split_last() else {
            debug!("no unseen bars in window");
            return Ok(CycleOutcome::NoNewBar);
        };
        for earlier in catch_up.iter().filter(|o| !o.signal.is_flat()) {
            debug!(time = %earlier.time, signal = %earlier.signal, "catch-up signal not traded");
        }
        let output = output.clone();
        info!(
            time = %output.time,
            ma = output.ma,
            signal = %output.signal,
            "bar processed"
        );

        match output.signal {
            Signal::Buy => self.enter(Direction::Long).await?,
            Signal::Sell => self.enter(Direction::Short).await?,
            Signal::Flat => {}
        }

        let stops = match self.driver.engine().state().previous_ma() {
            Some(last_ma) => {
                sweep_stops(
                    self.broker.as_ref(),
                    &self.dispatcher,
                    &self.config.symbol,
                    last_ma,
                )
                .await?
            }
            None => Vec::new(),
        };

        if let Some(store) = &self.store {
            store.save(self.driver.engine().state())?;
        }
        Ok(CycleOutcome::Processed { output, stops })
    }

    /// Poll until a fresh window arrives. `None` once a finite feed is done.
    async fn fetch_fresh(&mut self) -> Option<Vec<Bar>> {
        loop {
            let bars = match self.market.latest_bars(self.config.fetch_count).await {
                Ok(bars) => bars,
                Err(err) => {
                    warn!(error = %err, "bar fetch failed");
                    Vec::new()
                }
            };

            match self.watch.observe(bars.iter().map(|b| b.time).max()) {
                Freshness::Accept { reopened } => {
                    if reopened {
                        self.dispatcher
                            .notify(MARKET_STATUS_TITLE, MARKET_REOPENED)
                            .await;
                    }
                    return Some(bars);
                }
                Freshness::Retry { closed } => {
                    if closed {
                        self.dispatcher
                            .notify(MARKET_STATUS_TITLE, MARKET_CLOSED)
                            .await;
                    }
                    if self.market.exhausted() {
                        return None;
                    }
                    let retry = self.config.retry_interval;
                    self.pause(retry).await;
                }
            }
        }
    }

    /// Close opposite positions, then open one sized from the account balance.
    async fn enter(&mut self, direction: Direction) -> Result<()> {
        let symbol = self.config.symbol.clone();
        let side = side_name(direction);
        let opposite = direction.opposite();

        for position in self.broker.open_positions(&symbol).await? {
            if position.symbol != symbol || position.direction != opposite {
                continue;
            }
            let outcome = self.broker.close_position(position.ticket).await?;
            if outcome.is_done() {
                self.dispatcher
                    .notify(
                        POSITION_CLOSED_TITLE,
                        &format!("Closed previous {} position", side_name(opposite)),
                    )
                    .await;
            } else {
                self.dispatcher
                    .notify(
                        ORDER_FAILED_TITLE,
                        &format!(
                            "Failed to close {} position {}, retcode={}",
                            side_name(opposite),
                            position.ticket,
                            outcome.retcode
                        ),
                    )
                    .await;
            }
        }

        let Some(balance) = self.broker.account_balance().await? else {
            self.dispatcher
                .notify(ERROR_TITLE, "Failed to retrieve account balance")
                .await;
            return Ok(());
        };
        let price_kind = match direction {
            Direction::Long => "ask",
            Direction::Short => "bid",
        };
        let Some(quote) = self.broker.quote(&symbol).await? else {
            self.dispatcher
                .notify(
                    ERROR_TITLE,
                    &format!("Failed to retrieve current {} price for {}", price_kind, symbol),
                )
                .await;
            return Ok(());
        };
        let price = match direction {
            Direction::Long => quote.ask,
            Direction::Short => quote.bid,
        };

        let Some(volume) = order_volume(balance, self.config.risk_fraction, price) else {
            warn!(side, balance, price, "order volume rounds to zero");
            self.dispatcher
                .notify(
                    ERROR_TITLE,
                    &format!(
                        "{} order volume rounds to zero (balance {}, {} {})",
                        side, balance, price_kind, price
                    ),
                )
                .await;
            return Ok(());
        };

        info!(side, volume, price, "placing market order");
        let outcome = self
            .broker
            .place_market_order(&symbol, direction, volume)
            .await?;
        if outcome.is_done() {
            self.dispatcher
                .notify(
                    ORDER_EXECUTED_TITLE,
                    &format!("Position {} {} {} opened", side, volume, symbol),
                )
                .await;
        } else {
            self.dispatcher
                .notify(
                    ORDER_FAILED_TITLE,
                    &format!("Failed to execute {} order, retcode={}", side, outcome.retcode),
                )
                .await;
        }
        Ok(())
    }

    /// Sleep for `duration`, delivering stop-out notifications meanwhile.
    async fn pause(&mut self, duration: Duration) {
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            let Some(rx) = self.closures.as_mut() else {
                sleep.as_mut().await;
                return;
            };
            let event = tokio::select! {
                _ = &mut sleep => return,
                event = rx.recv() => event,
            };
            match event {
                Some(event) => {
                    self.dispatcher
                        .notify(STOP_LOSS_TITLE, &event.message())
                        .await
                }
                None => self.closures = None,
            }
        }
    }

    async fn drain_closures(&mut self) {
        let mut pending = Vec::new();
        if let Some(rx) = self.closures.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }
        for event in pending {
            self.dispatcher
                .notify(STOP_LOSS_TITLE, &event.message())
                .await;
        }
    }
}
