//! Live polling driver.
//!
//! Each step pulls the most recent bars, recomputes the strategy's features, reconciles
//! its position book with what the execution client reports, and acts on the current
//! signal. [`LiveExecutor::run`] repeats that on a fixed interval until shut down.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use trading_core::error::{DataError, ExecutionError, StrategyError};
use trading_core::events::{Event, SharedSink, TracingSink};
use trading_core::traits::{ExecutionClient, MarketDataProvider, Strategy};
use trading_core::types::{
    BarSeries, ExchangePosition, Order, OrderRequest, PositionType, Side, SignalFrame, SignalType, Timeframe,
};

/// Live driver errors.
#[derive(Error, Debug)]
pub enum LiveError {
    #[error("Market data unavailable after {attempts} attempts: {source}")]
    DataUnavailable {
        attempts: u32,
        #[source]
        source: DataError,
    },

    #[error("Provider returned no bars for {0}")]
    NoBars(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Bars fetched per step
    pub window: usize,
    pub check_interval: Duration,
    /// Fetch attempts per step
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `n × retry_delay` before retrying
    pub retry_delay: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::Hour1,
            window: 200,
            check_interval: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// What one step saw and did.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub price: f64,
    pub signal: SignalType,
    pub order: Option<Order>,
    /// Strategy position after the step
    pub position: PositionType,
}

/// Drives one strategy against a market data provider and an execution client.
pub struct LiveExecutor<P, C> {
    provider: P,
    client: C,
    strategy: Box<dyn Strategy>,
    config: LiveConfig,
    sink: SharedSink,
}

impl<P, C> LiveExecutor<P, C>
where
    P: MarketDataProvider,
    C: ExecutionClient,
{
    pub fn new(provider: P, client: C, strategy: Box<dyn Strategy>, config: LiveConfig) -> Self {
        info!(
            symbol = %config.symbol,
            timeframe = %config.timeframe,
            strategy = strategy.name(),
            provider = provider.name(),
            client = client.name(),
            "Live executor initialized"
        );
        Self {
            provider,
            client,
            strategy,
            config,
            sink: TracingSink::shared(),
        }
    }

    pub fn with_sink(mut self, sink: SharedSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Fetch the recent window, retrying with linear backoff.
    async fn fetch_bars(&self) -> Result<BarSeries, LiveError> {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self
                .provider
                .get_recent_bars(&self.config.symbol, self.config.timeframe, self.config.window)
                .await
            {
                Ok(series) => return Ok(series),
                Err(e) => {
                    self.sink.emit(&Event::PollFailed {
                        attempt,
                        error: e.to_string(),
                    });
                    if attempt >= attempts {
                        return Err(LiveError::DataUnavailable { attempts, source: e });
                    }
                    sleep(self.config.retry_delay * attempt).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Align the strategy's book with the client's reported position.
    fn reconcile(&mut self, reported: Option<&ExchangePosition>) {
        let (position, quantity, entry_price) = reported.map_or((PositionType::Flat, 0.0, 0.0), |p| {
            (p.position_type, p.quantity, p.entry_price)
        });
        let book = self.strategy.book();
        let tolerance = 1e-9 * quantity.max(1.0);
        if book.position() != position || (book.size() - quantity).abs() > tolerance {
            warn!(
                book_position = %book.position(),
                book_size = book.size(),
                reported_position = %position,
                reported_size = quantity,
                "Position book out of sync, adopting reported position"
            );
            self.strategy.on_position_changed(position, entry_price, quantity);
        }
    }

    /// Run one poll, decision and (at most one) order.
    pub async fn step(&mut self) -> Result<StepOutcome, LiveError> {
        let series = self.fetch_bars().await?;
        let price = series
            .last()
            .map(|b| b.close)
            .ok_or_else(|| LiveError::NoBars(self.config.symbol.clone()))?;

        let features = self.strategy.compute_signals(&series)?;
        let frame = SignalFrame::new(&series, &features)?;

        let reported = self.client.get_position(&self.config.symbol).await?;
        self.reconcile(reported.as_ref());

        let signal = self.strategy.current_signal(&frame)?;
        debug!(
            price,
            %signal,
            position = %self.strategy.book().position(),
            "Live step evaluated"
        );

        let held = reported.as_ref().map_or(PositionType::Flat, |p| p.position_type);
        let order = match (signal, held) {
            (SignalType::Buy, PositionType::Flat) => self.open(PositionType::Long, price).await?,
            (SignalType::Sell, PositionType::Flat) => self.open(PositionType::Short, price).await?,
            (SignalType::AddLong, PositionType::Long) => self.open(PositionType::Long, price).await?,
            (SignalType::CloseLong, PositionType::Long) | (SignalType::CloseShort, PositionType::Short) => {
                match reported.as_ref() {
                    Some(position) => Some(self.close(position).await?),
                    None => None,
                }
            }
            _ => None,
        };

        Ok(StepOutcome {
            price,
            signal,
            order,
            position: self.strategy.book().position(),
        })
    }

    /// Open or add to a position sized by the strategy.
    async fn open(&mut self, position: PositionType, price: f64) -> Result<Option<Order>, LiveError> {
        let Some(side) = Side::opening(position) else {
            return Ok(None);
        };
        let balance = self.client.get_balance().await?;
        let size = self.strategy.size_position(balance, price);
        let quantity = self.client.adjust_quantity(&self.config.symbol, size);
        if quantity <= 0.0 {
            warn!(balance, price, size, "Position size too small, skipping order");
            return Ok(None);
        }

        let order = self
            .client
            .place_market_order(OrderRequest::market(&self.config.symbol, side, quantity))
            .await?;
        let fill_price = order.fill_price.unwrap_or(price);
        self.sink.emit(&Event::OrderPlaced {
            symbol: order.symbol.clone(),
            side,
            quantity,
            fill_price: order.fill_price,
        });
        self.strategy.on_position_changed(position, fill_price, quantity);
        Ok(Some(order))
    }

    async fn close(&mut self, position: &ExchangePosition) -> Result<Order, LiveError> {
        let side = match position.position_type {
            PositionType::Short => Side::Buy,
            _ => Side::Sell,
        };
        let order = self
            .client
            .place_market_order(OrderRequest::close(&self.config.symbol, side, position.quantity))
            .await?;
        self.sink.emit(&Event::OrderPlaced {
            symbol: order.symbol.clone(),
            side,
            quantity: position.quantity,
            fill_price: order.fill_price,
        });
        self.strategy.on_position_changed(PositionType::Flat, 0.0, 0.0);
        Ok(order)
    }

    /// Step every `check_interval` until `shutdown` resolves. Failed steps are logged
    /// and the loop carries on. Returns the number of successful steps.
    pub async fn run<F>(&mut self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut steps = 0;

        info!(interval = ?self.config.check_interval, "Live trading started");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(steps, "Shutdown requested, stopping live trading");
                    break;
                }
                _ = ticker.tick() => {
                    match self.step().await {
                        Ok(outcome) => {
                            steps += 1;
                            info!(
                                price = outcome.price,
                                signal = %outcome.signal,
                                position = %outcome.position,
                                ordered = outcome.order.is_some(),
                                "Live step completed"
                            );
                        }
                        Err(e) => error!(error = %e, "Live step failed"),
                    }
                }
            }
        }
        steps
    }
}
