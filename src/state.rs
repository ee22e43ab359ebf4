use crate::error::AppError;
use crate::market::seed::{seed_chart_points, seed_market_entries};
use crate::market::types::{
    MarketEntry, MarketFeedSnapshot, MarketFeedState, PricePoint, Timeframe, DEFAULT_TIMEFRAME,
};
use chrono::{DateTime, Local, NaiveDate};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BALANCE: f64 = 1250.0;
pub const DEFAULT_TON_BALANCE: f64 = 0.0;
pub const DEFAULT_PROFIT_PER_HOUR: f64 = 450.0;
pub const DEFAULT_LEVEL: u32 = 12;
pub const DEFAULT_XP: u32 = 7_500;
pub const TON_RATE_PER_SECOND: f64 = 0.000_07;
pub const SECONDS_PER_HOUR: f64 = 3_600.0;
pub const DAILY_REWARD_AMOUNT: f64 = 1_000.0;
pub const TON_MINER_ACTIVATION_COST: f64 = 0.7;
pub const XP_PER_LEVEL: u32 = 10_000;
pub const MIN_WITHDRAW_TON: f64 = 5.0;
const MAX_FEED_LINES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningType {
    Hypenax,
    Ton,
}

impl MiningType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hypenax => "HYPENAX",
            Self::Ton => "TON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
    Neon,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
            Self::Neon => "Neon",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Neon,
            Self::Neon => Self::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone)]
pub struct TaskState {
    pub id: &'static str,
    pub title: &'static str,
    pub reward: f64,
    pub status: TaskStatus,
}

pub struct CatalogTask {
    pub id: &'static str,
    pub title: &'static str,
    pub reward: f64,
}

pub const TASK_CATALOG: &[CatalogTask] = &[
    CatalogTask { id: "tg", title: "Join Telegram Channel", reward: 500.0 },
    CatalogTask { id: "x", title: "Follow on X", reward: 500.0 },
    CatalogTask { id: "yt", title: "Watch Daily Video", reward: 1_000.0 },
];

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub balance: f64,
    pub ton_balance: f64,
    pub profit_per_hour: f64,
    pub mining_type: MiningType,
    pub is_mining: bool,
    pub mining_started_at: Option<Instant>,
    pub session_mined: f64,
    pub last_daily_claim: Option<NaiveDate>,
    pub wallet_address: Option<String>,
    pub is_connected: bool,
    pub level: u32,
    pub xp: u32,
    pub theme: Theme,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    pub tasks: Vec<TaskState>,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            balance: DEFAULT_BALANCE,
            ton_balance: DEFAULT_TON_BALANCE,
            profit_per_hour: DEFAULT_PROFIT_PER_HOUR,
            mining_type: MiningType::Hypenax,
            is_mining: false,
            mining_started_at: None,
            session_mined: 0.0,
            last_daily_claim: None,
            wallet_address: None,
            is_connected: false,
            level: DEFAULT_LEVEL,
            xp: DEFAULT_XP,
            theme: Theme::Dark,
            sound_enabled: true,
            notifications_enabled: true,
            tasks: TASK_CATALOG
                .iter()
                .map(|task| TaskState {
                    id: task.id,
                    title: task.title,
                    reward: task.reward,
                    status: TaskStatus::Pending,
                })
                .collect(),
        }
    }

    pub fn current_rate(&self) -> f64 {
        match self.mining_type {
            MiningType::Ton => TON_RATE_PER_SECOND,
            MiningType::Hypenax => self.profit_per_hour / SECONDS_PER_HOUR,
        }
    }

    // Rate and target are read in the same critical section as the write, so
    // a tick can never land against a half-switched configuration.
    pub fn credit_mining_tick(&mut self) {
        if !self.is_mining {
            return;
        }
        let rate = self.current_rate();
        match self.mining_type {
            MiningType::Ton => self.ton_balance += rate,
            MiningType::Hypenax => self.balance += rate,
        }
        self.session_mined += rate;
    }

    pub fn begin_mining_session(&mut self) {
        self.is_mining = true;
        self.mining_started_at = Some(Instant::now());
        self.session_mined = 0.0;
    }

    pub fn end_mining_session(&mut self) {
        self.is_mining = false;
        self.mining_started_at = None;
    }

    pub fn set_mining_type(&mut self, mining_type: MiningType) {
        self.mining_type = mining_type;
    }

    pub fn daily_reward_available(&self, today: NaiveDate) -> bool {
        self.last_daily_claim != Some(today)
    }

    pub fn claim_daily_reward(&mut self, today: NaiveDate) -> bool {
        if !self.daily_reward_available(today) {
            return false;
        }
        self.balance += DAILY_REWARD_AMOUNT;
        self.last_daily_claim = Some(today);
        true
    }

    pub fn complete_task(&mut self, task_id: &str) -> Option<f64> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id && task.status == TaskStatus::Pending)?;
        task.status = TaskStatus::Completed;
        let reward = task.reward;
        self.balance += reward;
        Some(reward)
    }

    pub fn connect_wallet(&mut self, address: String) {
        self.wallet_address = Some(address);
        self.is_connected = true;
    }

    pub fn disconnect_wallet(&mut self) {
        self.wallet_address = None;
        self.is_connected = false;
    }

    pub fn apply_withdrawal(&mut self, amount: f64) -> Result<(), AppError> {
        if !self.is_connected {
            return Err(AppError::WalletNotConnected);
        }
        if amount > self.ton_balance {
            return Err(AppError::InsufficientFunds {
                required: amount,
                available: self.ton_balance,
            });
        }
        self.ton_balance -= amount;
        Ok(())
    }

    // The activation fee is a simulated external payment, so the TON balance
    // is untouched; a fresh session can still unlock the TON miner.
    pub fn activate_ton_miner(&mut self) {
        self.mining_type = MiningType::Ton;
    }

    pub fn level_progress_percent(&self) -> f64 {
        f64::from(self.xp % XP_PER_LEVEL) / 100.0
    }

    pub fn cycle_theme(&mut self) {
        self.theme = self.theme.next();
    }

    pub fn toggle_sound(&mut self) {
        self.sound_enabled = !self.sound_enabled;
    }

    pub fn toggle_notifications(&mut self) {
        self.notifications_enabled = !self.notifications_enabled;
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct SelectedAsset {
    pub entry: MarketEntry,
    pub timeframe: Timeframe,
    pub chart: Vec<PricePoint>,
    pub chart_loading: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartApplyOutcome {
    Applied,
    Stale { requested: u64, current: u64 },
    NoSelection,
}

#[derive(Debug, Clone)]
pub struct MarketState {
    pub entries: Vec<MarketEntry>,
    pub selected: Option<SelectedAsset>,
    pub chart_epoch: u64,
    pub feed: MarketFeedSnapshot,
}

impl MarketState {
    pub fn new() -> Self {
        Self {
            entries: seed_market_entries(),
            selected: None,
            chart_epoch: 0,
            feed: MarketFeedSnapshot::idle(),
        }
    }

    // Wholesale replacement; the open detail view survives by symbol lookup
    // and is left stale when the new list no longer carries the symbol.
    pub fn apply_listings(&mut self, entries: Vec<MarketEntry>) {
        self.entries = entries;
        if let Some(selected) = self.selected.as_mut() {
            if let Some(updated) = self
                .entries
                .iter()
                .find(|entry| entry.symbol == selected.entry.symbol)
            {
                selected.entry = updated.clone();
            }
        }
    }

    pub fn select_asset(&mut self, symbol: &str) -> Option<(Option<String>, Timeframe)> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.symbol == symbol)?
            .clone();
        let asset_id = entry.id.clone();
        self.selected = Some(SelectedAsset {
            entry,
            timeframe: DEFAULT_TIMEFRAME,
            chart: seed_chart_points(),
            chart_loading: false,
        });
        Some((asset_id, DEFAULT_TIMEFRAME))
    }

    pub fn set_timeframe(&mut self, timeframe: Timeframe) -> Option<Option<String>> {
        let selected = self.selected.as_mut()?;
        selected.timeframe = timeframe;
        Some(selected.entry.id.clone())
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
        // Invalidate whatever history fetch may still be in flight.
        self.chart_epoch = self.chart_epoch.wrapping_add(1);
    }

    pub fn begin_chart_request(&mut self) -> u64 {
        self.chart_epoch = self.chart_epoch.wrapping_add(1);
        if let Some(selected) = self.selected.as_mut() {
            selected.chart_loading = true;
        }
        self.chart_epoch
    }

    pub fn apply_chart(&mut self, epoch: u64, points: Vec<PricePoint>) -> ChartApplyOutcome {
        if epoch != self.chart_epoch {
            return ChartApplyOutcome::Stale {
                requested: epoch,
                current: self.chart_epoch,
            };
        }
        match self.selected.as_mut() {
            Some(selected) => {
                selected.chart = points;
                selected.chart_loading = false;
                ChartApplyOutcome::Applied
            }
            None => ChartApplyOutcome::NoSelection,
        }
    }

    // Failure path: keep whatever series is on screen.
    pub fn abandon_chart_request(&mut self, epoch: u64) {
        if epoch != self.chart_epoch {
            return;
        }
        if let Some(selected) = self.selected.as_mut() {
            selected.chart_loading = false;
        }
    }

    pub fn mark_feed_refreshing(&mut self) {
        self.feed.state = MarketFeedState::Refreshing;
        self.feed.reason = None;
    }

    pub fn mark_feed_live(&mut self, source: &str, now_unix_ms: i64) {
        self.feed = MarketFeedSnapshot {
            state: MarketFeedState::Live,
            source: Some(source.to_string()),
            last_success_unix_ms: Some(now_unix_ms),
            reason: None,
        };
    }

    pub fn mark_feed_cached(&mut self, reason: String) {
        self.feed.state = MarketFeedState::Cached;
        self.feed.reason = Some(reason);
    }

    pub fn showing_cached_data(&self) -> bool {
        self.feed.state == MarketFeedState::Cached
    }
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct FeedLine {
    pub at: DateTime<Local>,
    pub text: String,
}

pub struct EngineHandle {
    pub cancellation_token: CancellationToken,
    pub join_handle: tokio::task::JoinHandle<()>,
}

pub struct AppState {
    pub started_at: Instant,
    pub player: Mutex<PlayerState>,
    pub market: Mutex<MarketState>,
    pub engine: tokio::sync::Mutex<Option<EngineHandle>>,
    feed_lines: Mutex<VecDeque<FeedLine>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            player: Mutex::new(PlayerState::new()),
            market: Mutex::new(MarketState::new()),
            engine: tokio::sync::Mutex::new(None),
            feed_lines: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_feed(&self, text: impl Into<String>) {
        let mut lines = self.feed_lines.lock();
        lines.push_front(FeedLine {
            at: Local::now(),
            text: text.into(),
        });
        while lines.len() > MAX_FEED_LINES {
            lines.pop_back();
        }
    }

    pub fn recent_feed(&self, limit: usize) -> Vec<FeedLine> {
        let lines = self.feed_lines.lock();
        lines.iter().take(limit).cloned().collect()
    }

    pub fn player_snapshot(&self) -> PlayerState {
        self.player.lock().clone()
    }

    pub fn market_snapshot(&self) -> MarketState {
        self.market.lock().clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::QUOTE_PAIR;
    use chrono::NaiveDate;

    fn listed(symbol: &str, price: f64) -> MarketEntry {
        MarketEntry {
            id: Some(symbol.to_ascii_lowercase()),
            rank: 1,
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            pair: QUOTE_PAIR.to_string(),
            price,
            change: 0.0,
            volume: "$1.00M".to_string(),
            high: price,
            low: price,
            is_new: false,
        }
    }

    fn claim_day(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).expect("valid test date")
    }

    #[test]
    fn mining_ticks_accumulate_linearly_on_the_selected_target() {
        let mut player = PlayerState::new();
        player.begin_mining_session();

        for _ in 0..5 {
            player.credit_mining_tick();
        }

        let expected = DEFAULT_BALANCE + 5.0 * (DEFAULT_PROFIT_PER_HOUR / SECONDS_PER_HOUR);
        assert!((player.balance - expected).abs() < 1e-9);
        assert_eq!(player.ton_balance, DEFAULT_TON_BALANCE);
        assert!((player.session_mined - 5.0 * player.current_rate()).abs() < 1e-9);
    }

    #[test]
    fn ton_ticks_credit_the_ton_balance_only() {
        let mut player = PlayerState::new();
        player.set_mining_type(MiningType::Ton);
        player.begin_mining_session();

        for _ in 0..3 {
            player.credit_mining_tick();
        }

        assert!((player.ton_balance - 3.0 * TON_RATE_PER_SECOND).abs() < 1e-12);
        assert_eq!(player.balance, DEFAULT_BALANCE);
    }

    #[test]
    fn ticks_are_inert_while_mining_is_stopped() {
        let mut player = PlayerState::new();
        player.credit_mining_tick();
        player.credit_mining_tick();

        assert_eq!(player.balance, DEFAULT_BALANCE);
        assert_eq!(player.ton_balance, DEFAULT_TON_BALANCE);
    }

    #[test]
    fn daily_reward_credits_exactly_once_per_day() {
        let mut player = PlayerState::new();
        let today = claim_day(1);

        assert!(player.claim_daily_reward(today));
        assert_eq!(player.balance, DEFAULT_BALANCE + DAILY_REWARD_AMOUNT);

        assert!(!player.claim_daily_reward(today));
        assert_eq!(player.balance, DEFAULT_BALANCE + DAILY_REWARD_AMOUNT);
    }

    #[test]
    fn daily_reward_rearms_on_the_next_calendar_day() {
        let mut player = PlayerState::new();
        assert!(player.claim_daily_reward(claim_day(1)));
        assert!(player.claim_daily_reward(claim_day(2)));
        assert_eq!(player.balance, DEFAULT_BALANCE + 2.0 * DAILY_REWARD_AMOUNT);
    }

    #[test]
    fn task_rewards_credit_once() {
        let mut player = PlayerState::new();

        let reward = player.complete_task("tg").expect("task should complete");
        assert_eq!(reward, 500.0);
        assert_eq!(player.balance, DEFAULT_BALANCE + 500.0);

        assert!(player.complete_task("tg").is_none());
        assert!(player.complete_task("unknown").is_none());
        assert_eq!(player.balance, DEFAULT_BALANCE + 500.0);
    }

    #[test]
    fn withdrawal_requires_wallet_and_funds() {
        let mut player = PlayerState::new();
        assert!(matches!(
            player.apply_withdrawal(1.0),
            Err(AppError::WalletNotConnected)
        ));

        player.connect_wallet("UQAH...W0p".to_string());
        player.ton_balance = 10.0;
        assert!(matches!(
            player.apply_withdrawal(25.0),
            Err(AppError::InsufficientFunds { .. })
        ));

        player.apply_withdrawal(6.0).expect("covered withdrawal");
        assert!((player.ton_balance - 4.0).abs() < 1e-9);
    }

    #[test]
    fn ton_miner_activation_switches_type_without_touching_balances() {
        let mut player = PlayerState::new();
        player.activate_ton_miner();
        assert_eq!(player.mining_type, MiningType::Ton);
        assert_eq!(player.ton_balance, DEFAULT_TON_BALANCE);
    }

    #[test]
    fn level_progress_derives_from_xp_remainder() {
        let player = PlayerState::new();
        assert!((player.level_progress_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn listings_replace_wholesale_and_reresolve_selection_by_symbol() {
        let mut market = MarketState::new();
        market.select_asset("SOL").expect("seed listing carries SOL");

        market.apply_listings(vec![listed("BTC", 95_000.0), listed("SOL", 150.0)]);

        assert_eq!(market.entries.len(), 2);
        let selected = market.selected.as_ref().expect("detail view stays open");
        assert_eq!(selected.entry.symbol, "SOL");
        assert_eq!(selected.entry.price, 150.0);
    }

    #[test]
    fn unmatched_selection_is_left_stale_not_cleared() {
        let mut market = MarketState::new();
        market.select_asset("SOL").expect("seed listing carries SOL");
        let stale_price = market.selected.as_ref().map(|s| s.entry.price);

        market.apply_listings(vec![listed("BTC", 95_000.0)]);

        let selected = market.selected.as_ref().expect("detail view stays open");
        assert_eq!(Some(selected.entry.price), stale_price);
    }

    #[test]
    fn superseded_chart_results_are_discarded() {
        let mut market = MarketState::new();
        market.select_asset("TON").expect("seed listing carries TON");

        let first = market.begin_chart_request();
        let second = market.begin_chart_request();

        let late = market.apply_chart(
            first,
            vec![PricePoint { time: "10:00".to_string(), value: 1.0 }],
        );
        assert_eq!(
            late,
            ChartApplyOutcome::Stale { requested: first, current: second }
        );

        let current = market.apply_chart(
            second,
            vec![PricePoint { time: "11:00".to_string(), value: 2.0 }],
        );
        assert_eq!(current, ChartApplyOutcome::Applied);
        let selected = market.selected.as_ref().expect("detail view stays open");
        assert_eq!(selected.chart.len(), 1);
        assert_eq!(selected.chart[0].value, 2.0);
    }

    #[test]
    fn closing_the_detail_view_invalidates_in_flight_charts() {
        let mut market = MarketState::new();
        market.select_asset("TON").expect("seed listing carries TON");
        let epoch = market.begin_chart_request();

        market.close_detail();

        let outcome = market.apply_chart(
            epoch,
            vec![PricePoint { time: "10:00".to_string(), value: 1.0 }],
        );
        assert_ne!(outcome, ChartApplyOutcome::Applied);
        assert!(market.selected.is_none());
    }

    #[test]
    fn failed_chart_fetch_retains_the_displayed_series() {
        let mut market = MarketState::new();
        market.select_asset("TON").expect("seed listing carries TON");
        let shown = market
            .selected
            .as_ref()
            .map(|selected| selected.chart.clone())
            .expect("seed chart present");

        let epoch = market.begin_chart_request();
        market.abandon_chart_request(epoch);

        let selected = market.selected.as_ref().expect("detail view stays open");
        assert_eq!(selected.chart, shown);
        assert!(!selected.chart_loading);
    }

    #[test]
    fn feed_lines_are_capped() {
        let state = AppState::new();
        for index in 0..(MAX_FEED_LINES + 10) {
            state.push_feed(format!("line {index}"));
        }

        let lines = state.recent_feed(usize::MAX);
        assert_eq!(lines.len(), MAX_FEED_LINES);
        assert_eq!(lines[0].text, format!("line {}", MAX_FEED_LINES + 9));
    }
}
