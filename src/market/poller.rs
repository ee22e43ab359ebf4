use crate::error::AppError;
use crate::market::coingecko::{MarketDataSource, RestMarketSource};
use crate::market::types::{
    chart_points, listing_to_entries, ChartPairWire, MarketEntry, PricePoint, Timeframe,
};
use crate::state::{AppState, ChartApplyOutcome};
use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const COMMAND_BUFFER: usize = 32;
const MOCK_DRIFT_LIMIT: f64 = 0.005;

/// Requests handled by the poller task in between scheduled refreshes.
#[derive(Debug)]
pub enum MarketCommand {
    RefreshList,
    FetchChart {
        asset_id: String,
        timeframe: Timeframe,
        epoch: u64,
    },
    CancelChart,
}

struct ChartTask {
    cancellation_token: CancellationToken,
}

/// Owns the listing refresh schedule and the in-flight chart fetch.
///
/// Listing refreshes run inline, so two cycles never interleave and the
/// latest applied listing is always the latest fetched one. Chart fetches are
/// spawned; a newer request supersedes the previous one by cancelling its
/// token, and the epoch check in the state owner drops whatever still lands.
pub async fn run_market_poller(
    state: Arc<AppState>,
    sources: Vec<RestMarketSource>,
    refresh_interval: Duration,
    mut commands: mpsc::Receiver<MarketCommand>,
    cancellation_token: CancellationToken,
) {
    let sources = Arc::new(sources);
    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut chart_task: Option<ChartTask> = None;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::debug!("market poller cancelled");
                return;
            }
            _ = ticker.tick() => {
                refresh_listings(&state, sources.as_slice()).await;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    log::debug!("market command channel closed");
                    return;
                };
                match command {
                    MarketCommand::RefreshList => {
                        ticker.reset();
                        refresh_listings(&state, sources.as_slice()).await;
                    }
                    MarketCommand::FetchChart { asset_id, timeframe, epoch } => {
                        if let Some(previous) = chart_task.take() {
                            previous.cancellation_token.cancel();
                        }
                        // Child token: poller shutdown tears the fetch down too.
                        let token = cancellation_token.child_token();
                        spawn_chart_fetch(
                            Arc::clone(&state),
                            Arc::clone(&sources),
                            asset_id,
                            timeframe,
                            epoch,
                            token.clone(),
                        );
                        chart_task = Some(ChartTask { cancellation_token: token });
                    }
                    MarketCommand::CancelChart => {
                        if let Some(previous) = chart_task.take() {
                            previous.cancellation_token.cancel();
                        }
                    }
                }
            }
        }
    }
}

pub(crate) async fn refresh_listings<S: MarketDataSource>(state: &AppState, sources: &[S]) {
    state.market.lock().mark_feed_refreshing();
    match fetch_listings_with_fallback(sources).await {
        Ok((entries, source_label)) => {
            let asset_count = entries.len();
            let mut market = state.market.lock();
            market.apply_listings(entries);
            market.mark_feed_live(source_label, now_unix_ms());
            log::info!("market list refreshed via {source_label} ({asset_count} assets)");
        }
        Err(error) => {
            state.market.lock().mark_feed_cached(error.to_string());
            log::warn!("market refresh failed, keeping cached listing: {error}");
        }
    }
}

/// Walks the source chain in order and returns the first successful listing
/// together with the label of the source that served it.
pub(crate) async fn fetch_listings_with_fallback<S: MarketDataSource>(
    sources: &[S],
) -> Result<(Vec<MarketEntry>, &str), AppError> {
    let mut last_error: Option<AppError> = None;
    for source in sources {
        match source.market_listings().await {
            Ok(wires) => return Ok((listing_to_entries(wires), source.label())),
            Err(error) => {
                log::warn!("{} listing fetch failed: {error}", source.label());
                last_error = Some(error);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| AppError::UnexpectedPayload("no market sources configured".into())))
}

pub(crate) async fn fetch_chart_with_fallback<S: MarketDataSource>(
    sources: &[S],
    asset_id: &str,
    timeframe: Timeframe,
) -> Result<Vec<PricePoint>, AppError> {
    let mut last_error: Option<AppError> = None;
    for source in sources {
        match source.market_chart(asset_id, timeframe).await {
            Ok(wire) => return Ok(chart_points(&wire.prices, &Local)),
            Err(error) => {
                log::warn!(
                    "{} chart fetch for {asset_id} failed: {error}",
                    source.label()
                );
                last_error = Some(error);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| AppError::UnexpectedPayload("no market sources configured".into())))
}

fn spawn_chart_fetch(
    state: Arc<AppState>,
    sources: Arc<Vec<RestMarketSource>>,
    asset_id: String,
    timeframe: Timeframe,
    epoch: u64,
    cancellation_token: CancellationToken,
) {
    tokio::spawn(async move {
        let fetch = fetch_chart_with_fallback(sources.as_slice(), &asset_id, timeframe);
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::debug!("chart fetch for {asset_id} cancelled");
            }
            result = fetch => match result {
                Ok(points) => {
                    let outcome = state.market.lock().apply_chart(epoch, points);
                    if matches!(outcome, ChartApplyOutcome::Stale { .. }) {
                        log::debug!("discarded superseded chart for {asset_id}");
                    }
                }
                Err(error) => {
                    state.market.lock().abandon_chart_request(epoch);
                    log::warn!("chart fetch for {asset_id} failed on every source: {error}");
                }
            }
        }
    });
}

/// Offline stand-in for the REST chain: drifts the shipped listing in place
/// and synthesizes chart series, on the same schedule the real poller runs.
pub async fn run_mock_market(
    state: Arc<AppState>,
    refresh_interval: Duration,
    mut commands: mpsc::Receiver<MarketCommand>,
    cancellation_token: CancellationToken,
) {
    let mut rng = StdRng::from_entropy();
    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::debug!("mock market cancelled");
                return;
            }
            _ = ticker.tick() => {
                drift_market(&state, &mut rng);
            }
            command = commands.recv() => {
                let Some(command) = command else { return; };
                match command {
                    MarketCommand::RefreshList => {
                        ticker.reset();
                        drift_market(&state, &mut rng);
                    }
                    MarketCommand::FetchChart { asset_id, timeframe, epoch } => {
                        let basis = {
                            let market = state.market.lock();
                            market
                                .entries
                                .iter()
                                .find(|entry| entry.id.as_deref() == Some(asset_id.as_str()))
                                .map(|entry| entry.price)
                        };
                        let pairs = mock_chart_pairs(
                            basis.unwrap_or(1.0),
                            timeframe,
                            now_unix_ms(),
                            &mut rng,
                        );
                        state.market.lock().apply_chart(epoch, chart_points(&pairs, &Local));
                    }
                    MarketCommand::CancelChart => {}
                }
            }
        }
    }
}

fn drift_market(state: &AppState, rng: &mut StdRng) {
    let mut market = state.market.lock();
    let mut entries = market.entries.clone();
    drift_entries(&mut entries, rng);
    market.apply_listings(entries);
    market.mark_feed_live("mock", now_unix_ms());
}

fn drift_entries(entries: &mut [MarketEntry], rng: &mut StdRng) {
    for entry in entries.iter_mut() {
        let drift = rng.gen_range(-MOCK_DRIFT_LIMIT..MOCK_DRIFT_LIMIT);
        let next = entry.price * (1.0 + drift);
        entry.change = crate::market::types::round_change(entry.change + drift * 100.0);
        entry.high = entry.high.max(next);
        entry.low = entry.low.min(next);
        entry.price = next;
    }
}

fn mock_chart_len(timeframe: Timeframe) -> usize {
    match timeframe {
        Timeframe::D1 => 24,
        Timeframe::D7 => 28,
        Timeframe::D30 => 30,
    }
}

/// Synthetic `[timestamp, price]` samples ending at `end_ms`, evenly spread
/// over the requested timeframe; mapped to points the same way live payloads
/// are.
fn mock_chart_pairs(
    basis: f64,
    timeframe: Timeframe,
    end_ms: i64,
    rng: &mut StdRng,
) -> Vec<ChartPairWire> {
    let count = mock_chart_len(timeframe);
    let span_ms = i64::from(timeframe.as_days()) * 86_400_000;
    let step_ms = span_ms / count as i64;
    let mut pairs = Vec::with_capacity(count);
    let mut value = basis * 0.96;
    for index in 0..count {
        value *= 1.0 + rng.gen_range(-0.01..0.01);
        let timestamp = end_ms - step_ms * (count - 1 - index) as i64;
        pairs.push(ChartPairWire(timestamp as f64, value));
    }
    pairs
}

pub fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
