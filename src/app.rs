use crate::market::poller::MarketCommand;
use crate::mining;
use crate::simulate::{self, PendingOp};
use crate::state::{AppState, MiningType, PlayerState, TaskStatus, MIN_WITHDRAW_TON};
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_AMOUNT_INPUT: usize = 12;
const MAX_ADDRESS_INPUT: usize = 64;
const PIN_LENGTH: usize = 4;
const PERCENT_STEPS: [u8; 4] = [25, 50, 75, 100];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Home,
    Earn,
    Trade,
    Refs,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Home, Tab::Earn, Tab::Trade, Tab::Refs, Tab::Profile];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Earn => "Earn",
            Tab::Trade => "Trade",
            Tab::Refs => "Refs",
            Tab::Profile => "Profile",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TradeForm {
    pub side: Option<OrderSide>,
    pub amount: String,
    pub percent_cursor: Option<usize>,
    pub notice: Option<String>,
}

impl TradeForm {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn parsed_amount(&self) -> Option<f64> {
        let amount: f64 = self.amount.trim().parse().ok()?;
        (amount.is_finite() && amount > 0.0).then_some(amount)
    }

    pub fn push_char(&mut self, input: char) {
        if self.amount.len() >= MAX_AMOUNT_INPUT {
            return;
        }
        let accepts = input.is_ascii_digit() || (input == '.' && !self.amount.contains('.'));
        if accepts {
            self.amount.push(input);
            self.percent_cursor = None;
            self.notice = None;
        }
    }

    pub fn pop_char(&mut self) {
        self.amount.pop();
        self.percent_cursor = None;
    }

    /// Cycles 25 -> 50 -> 75 -> 100 percent of the quote balance at the
    /// current price.
    pub fn apply_percent(&mut self, balance: f64, price: f64) {
        if price <= 0.0 {
            return;
        }
        let cursor = match self.percent_cursor {
            Some(cursor) => (cursor + 1) % PERCENT_STEPS.len(),
            None => 0,
        };
        self.percent_cursor = Some(cursor);
        let fraction = f64::from(PERCENT_STEPS[cursor]) / 100.0;
        self.amount = format!("{:.4}", balance * fraction / price);
        self.notice = None;
    }

    pub fn percent_label(&self) -> Option<u8> {
        self.percent_cursor.map(|cursor| PERCENT_STEPS[cursor])
    }
}

#[derive(Debug, Default, Clone)]
pub struct WithdrawForm {
    pub address: String,
    pub amount: String,
    pub focus: WithdrawField,
    pub notice: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawField {
    #[default]
    Address,
    Amount,
}

impl WithdrawForm {
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            WithdrawField::Address => WithdrawField::Amount,
            WithdrawField::Amount => WithdrawField::Address,
        };
    }

    pub fn push_char(&mut self, input: char) {
        self.notice = None;
        match self.focus {
            WithdrawField::Address => {
                if self.address.len() < MAX_ADDRESS_INPUT && !input.is_control() {
                    self.address.push(input);
                }
            }
            WithdrawField::Amount => {
                if self.amount.len() < MAX_AMOUNT_INPUT
                    && (input.is_ascii_digit() || (input == '.' && !self.amount.contains('.')))
                {
                    self.amount.push(input);
                }
            }
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            WithdrawField::Address => {
                self.address.pop();
            }
            WithdrawField::Amount => {
                self.amount.pop();
            }
        }
    }

    pub fn validate(&self, player: &PlayerState) -> Result<(String, f64), String> {
        if !player.is_connected {
            return Err("Connect a wallet first".to_string());
        }
        let address = self.address.trim();
        if address.is_empty() {
            return Err("Destination address is required".to_string());
        }
        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| "Enter a valid amount".to_string())?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err("Enter a positive amount".to_string());
        }
        if amount < MIN_WITHDRAW_TON {
            return Err(format!("Minimum withdrawal is {MIN_WITHDRAW_TON:.1} TON"));
        }
        if amount > player.ton_balance {
            return Err("Amount exceeds your TON balance".to_string());
        }
        Ok((address.to_string(), amount))
    }
}

#[derive(Debug, Default, Clone)]
pub struct AmountForm {
    pub amount: String,
    pub notice: Option<String>,
}

impl AmountForm {
    pub fn push_char(&mut self, input: char) {
        if self.amount.len() < MAX_AMOUNT_INPUT
            && (input.is_ascii_digit() || (input == '.' && !self.amount.contains('.')))
        {
            self.amount.push(input);
            self.notice = None;
        }
    }

    pub fn pop_char(&mut self) {
        self.amount.pop();
    }

    pub fn validate(&self) -> Result<f64, String> {
        let amount: f64 = self
            .amount
            .trim()
            .parse()
            .map_err(|_| "Enter a valid amount".to_string())?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err("Enter a positive amount".to_string());
        }
        Ok(amount)
    }
}

#[derive(Debug, Default, Clone)]
pub struct PinForm {
    pub digits: String,
    pub notice: Option<String>,
}

impl PinForm {
    pub fn push_char(&mut self, input: char) {
        if input.is_ascii_digit() && self.digits.len() < PIN_LENGTH {
            self.digits.push(input);
            self.notice = None;
        }
    }

    pub fn pop_char(&mut self) {
        self.digits.pop();
    }

    pub fn validate(&self) -> Result<String, String> {
        if self.digits.len() == PIN_LENGTH && self.digits.chars().all(|c| c.is_ascii_digit()) {
            Ok(self.digits.clone())
        } else {
            Err(format!("PIN must be exactly {PIN_LENGTH} digits"))
        }
    }
}

#[derive(Debug, Clone)]
pub enum Modal {
    ConfirmTonPurchase,
    Withdraw(WithdrawForm),
    Deposit(AmountForm),
    Pin(PinForm),
}

pub struct App {
    pub state: Arc<AppState>,
    pub market_tx: mpsc::Sender<MarketCommand>,
    pub active_tab: Tab,
    pub should_quit: bool,
    pub mock_mode: bool,
    pub market_cursor: usize,
    pub task_cursor: usize,
    pub modal: Option<Modal>,
    pub pending_op: Option<PendingOp>,
    pub trade_form: TradeForm,
}

impl App {
    pub fn new(state: Arc<AppState>, market_tx: mpsc::Sender<MarketCommand>, mock_mode: bool) -> Self {
        Self {
            state,
            market_tx,
            active_tab: Tab::Home,
            should_quit: false,
            mock_mode,
            market_cursor: 0,
            task_cursor: 0,
            modal: None,
            pending_op: None,
            trade_form: TradeForm::default(),
        }
    }

    pub fn on_tick(&mut self) {
        if self.pending_op.as_ref().is_some_and(PendingOp::is_finished) {
            self.pending_op = None;
        }
    }

    pub fn op_in_flight(&self) -> bool {
        self.pending_op.as_ref().is_some_and(|op| !op.is_finished())
    }

    fn launch(&mut self, op: PendingOp) {
        if self.op_in_flight() {
            // Abort outright; the rejected task must not reach the feed.
            op.join_handle.abort();
            self.state.push_feed("Another action is still processing");
            return;
        }
        self.state
            .push_feed(format!("{} submitted (ref {})", op.label, op.reference));
        self.pending_op = Some(op);
    }

    fn send_market(&self, command: MarketCommand) {
        if let Err(error) = self.market_tx.try_send(command) {
            log::warn!("market command dropped: {error}");
        }
    }

    pub async fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.modal.is_some() {
            self.on_modal_key(key);
            return;
        }

        if key.code == KeyCode::Esc && self.op_in_flight() {
            if let Some(op) = &self.pending_op {
                op.cancel();
            }
            return;
        }

        let detail_open = self.state.market.lock().selected.is_some();
        if self.active_tab == Tab::Trade && detail_open {
            self.on_detail_key(key).await;
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.active_tab = self.active_tab.next(),
            KeyCode::BackTab | KeyCode::Left => self.active_tab = self.active_tab.previous(),
            KeyCode::Char(digit @ '1'..='5') => {
                self.active_tab = Tab::ALL[digit as usize - '1' as usize];
            }
            _ => self.on_tab_key(key).await,
        }
    }

    async fn on_tab_key(&mut self, key: KeyEvent) {
        match self.active_tab {
            Tab::Home => self.on_home_key(key).await,
            Tab::Earn => self.on_earn_key(key),
            Tab::Trade => self.on_trade_key(key),
            Tab::Refs => {}
            Tab::Profile => self.on_profile_key(key).await,
        }
    }

    async fn on_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('m') => self.toggle_mining().await,
            KeyCode::Char('c') => self.claim_daily(),
            KeyCode::Char('t') => self.open_ton_purchase(),
            KeyCode::Char('h') => self.switch_to_hypenax().await,
            _ => {}
        }
    }

    async fn toggle_mining(&mut self) {
        let mining = self.state.player.lock().is_mining;
        if mining {
            mining::stop_mining(&self.state).await;
            self.state.push_feed("Mining stopped");
        } else {
            mining::start_mining(&self.state).await;
            let mining_type = self.state.player.lock().mining_type;
            self.state
                .push_feed(format!("Mining started ({})", mining_type.as_str()));
        }
    }

    fn claim_daily(&mut self) {
        let today = Local::now().date_naive();
        if !self.state.player.lock().daily_reward_available(today) {
            self.state.push_feed("Daily reward already claimed today");
            return;
        }
        let op = simulate::spawn_claim_daily(&self.state);
        self.launch(op);
    }

    fn open_ton_purchase(&mut self) {
        if self.state.player.lock().mining_type == MiningType::Ton {
            self.state.push_feed("TON miner is already active");
            return;
        }
        self.modal = Some(Modal::ConfirmTonPurchase);
    }

    async fn switch_to_hypenax(&mut self) {
        if self.state.player.lock().mining_type == MiningType::Hypenax {
            return;
        }
        mining::switch_mining_type(&self.state, MiningType::Hypenax).await;
        self.state
            .push_feed("Mining target set to HYPENAX. Restart to resume.");
    }

    fn on_earn_key(&mut self, key: KeyEvent) {
        let task_count = self.state.player.lock().tasks.len();
        match key.code {
            KeyCode::Up => self.task_cursor = self.task_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.task_cursor = (self.task_cursor + 1).min(task_count.saturating_sub(1));
            }
            KeyCode::Enter => self.verify_selected_task(),
            KeyCode::Char('c') => self.claim_daily(),
            _ => {}
        }
    }

    fn verify_selected_task(&mut self) {
        let selected = {
            let player = self.state.player.lock();
            player
                .tasks
                .get(self.task_cursor)
                .map(|task| (task.id, task.title, task.status))
        };
        let Some((id, title, status)) = selected else {
            return;
        };
        if status == TaskStatus::Completed {
            self.state.push_feed(format!("{title} is already verified"));
            return;
        }
        let op = simulate::spawn_verify_task(&self.state, id, title);
        self.launch(op);
    }

    fn on_trade_key(&mut self, key: KeyEvent) {
        let entry_count = self.state.market.lock().entries.len();
        match key.code {
            KeyCode::Up => self.market_cursor = self.market_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.market_cursor = (self.market_cursor + 1).min(entry_count.saturating_sub(1));
            }
            KeyCode::Enter => self.open_market_detail(),
            KeyCode::Char('r') => self.send_market(MarketCommand::RefreshList),
            _ => {}
        }
    }

    fn open_market_detail(&mut self) {
        let symbol = {
            let market = self.state.market.lock();
            market
                .entries
                .get(self.market_cursor.min(market.entries.len().saturating_sub(1)))
                .map(|entry| entry.symbol.clone())
        };
        let Some(symbol) = symbol else {
            return;
        };
        self.trade_form.reset();

        let fetch = {
            let mut market = self.state.market.lock();
            match market.select_asset(&symbol) {
                Some((Some(asset_id), timeframe)) => {
                    let epoch = market.begin_chart_request();
                    Some((asset_id, timeframe, epoch))
                }
                // Assets without a listing id keep the shipped chart.
                Some((None, _)) | None => None,
            }
        };
        if let Some((asset_id, timeframe, epoch)) = fetch {
            self.send_market(MarketCommand::FetchChart { asset_id, timeframe, epoch });
        }
    }

    async fn on_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state.market.lock().close_detail();
                self.send_market(MarketCommand::CancelChart);
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.cycle_timeframe(),
            KeyCode::Char('b') => {
                self.trade_form.side = Some(OrderSide::Buy);
                self.trade_form.notice = None;
            }
            KeyCode::Char('s') => {
                self.trade_form.side = Some(OrderSide::Sell);
                self.trade_form.notice = None;
            }
            KeyCode::Char('%') | KeyCode::Char('p') => {
                let balance = self.state.player.lock().balance;
                let price = self
                    .state
                    .market
                    .lock()
                    .selected
                    .as_ref()
                    .map(|selected| selected.entry.price)
                    .unwrap_or_default();
                self.trade_form.apply_percent(balance, price);
            }
            KeyCode::Char(input) if input.is_ascii_digit() || input == '.' => {
                self.trade_form.push_char(input);
            }
            KeyCode::Backspace => self.trade_form.pop_char(),
            KeyCode::Enter => self.submit_order(),
            _ => {}
        }
    }

    fn cycle_timeframe(&mut self) {
        let fetch = {
            let mut market = self.state.market.lock();
            let Some(current) = market.selected.as_ref().map(|selected| selected.timeframe)
            else {
                return;
            };
            let next = current.next();
            match market.set_timeframe(next) {
                Some(Some(asset_id)) => {
                    let epoch = market.begin_chart_request();
                    Some((asset_id, next, epoch))
                }
                _ => None,
            }
        };
        if let Some((asset_id, timeframe, epoch)) = fetch {
            self.send_market(MarketCommand::FetchChart { asset_id, timeframe, epoch });
        }
    }

    fn submit_order(&mut self) {
        let Some(side) = self.trade_form.side else {
            self.trade_form.notice = Some("Pick a side first (b/s)".to_string());
            return;
        };
        let Some(amount) = self.trade_form.parsed_amount() else {
            self.trade_form.notice = Some("Enter a positive amount".to_string());
            return;
        };
        let symbol = {
            let market = self.state.market.lock();
            market
                .selected
                .as_ref()
                .map(|selected| selected.entry.symbol.clone())
        };
        let Some(symbol) = symbol else {
            return;
        };
        let op = simulate::spawn_place_order(&self.state, side.as_str(), symbol, amount);
        self.launch(op);
        self.trade_form.amount.clear();
        self.trade_form.percent_cursor = None;
    }

    async fn on_profile_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') => self.connect_wallet(),
            KeyCode::Char('x') => self.disconnect_wallet(),
            KeyCode::Char('w') => self.open_withdraw(),
            KeyCode::Char('d') => self.modal = Some(Modal::Deposit(AmountForm::default())),
            KeyCode::Char('p') => self.modal = Some(Modal::Pin(PinForm::default())),
            KeyCode::Char('t') => {
                let theme = {
                    let mut player = self.state.player.lock();
                    player.cycle_theme();
                    player.theme
                };
                self.state
                    .push_feed(format!("Theme switched to {}", theme.as_str()));
            }
            KeyCode::Char('s') => {
                self.state.player.lock().toggle_sound();
            }
            KeyCode::Char('n') => {
                self.state.player.lock().toggle_notifications();
            }
            _ => {}
        }
    }

    fn connect_wallet(&mut self) {
        if self.state.player.lock().is_connected {
            self.state.push_feed("Wallet already connected");
            return;
        }
        let op = simulate::spawn_connect_wallet(&self.state);
        self.launch(op);
    }

    // Disconnect is the one wallet action that applies immediately.
    fn disconnect_wallet(&mut self) {
        let was_connected = {
            let mut player = self.state.player.lock();
            let was_connected = player.is_connected;
            player.disconnect_wallet();
            was_connected
        };
        if was_connected {
            self.state.push_feed("Wallet disconnected");
        }
    }

    fn open_withdraw(&mut self) {
        if !self.state.player.lock().is_connected {
            self.state.push_feed("Connect a wallet first");
            return;
        }
        self.modal = Some(Modal::Withdraw(WithdrawForm::default()));
    }

    fn on_modal_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.modal = None;
            return;
        }
        match self.modal.as_mut() {
            Some(Modal::ConfirmTonPurchase) => match key.code {
                KeyCode::Enter | KeyCode::Char('y') => {
                    self.modal = None;
                    let op = simulate::spawn_activate_ton_miner(&self.state);
                    self.launch(op);
                }
                KeyCode::Char('n') => self.modal = None,
                _ => {}
            },
            Some(Modal::Withdraw(form)) => match key.code {
                KeyCode::Tab | KeyCode::Up | KeyCode::Down => form.toggle_focus(),
                KeyCode::Backspace => form.pop_char(),
                KeyCode::Char(input) => form.push_char(input),
                KeyCode::Enter => self.submit_withdraw(),
                _ => {}
            },
            Some(Modal::Deposit(form)) => match key.code {
                KeyCode::Backspace => form.pop_char(),
                KeyCode::Char(input) => form.push_char(input),
                KeyCode::Enter => self.submit_deposit(),
                _ => {}
            },
            Some(Modal::Pin(form)) => match key.code {
                KeyCode::Backspace => form.pop_char(),
                KeyCode::Char(input) => form.push_char(input),
                KeyCode::Enter => self.submit_pin(),
                _ => {}
            },
            None => {}
        }
    }

    fn submit_withdraw(&mut self) {
        let snapshot = self.state.player_snapshot();
        let outcome = match self.modal.as_mut() {
            Some(Modal::Withdraw(form)) => match form.validate(&snapshot) {
                Ok(request) => Some(request),
                Err(message) => {
                    form.notice = Some(message);
                    None
                }
            },
            _ => None,
        };
        if let Some((address, amount)) = outcome {
            self.modal = None;
            let op = simulate::spawn_withdraw(&self.state, address, amount);
            self.launch(op);
        }
    }

    fn submit_deposit(&mut self) {
        let outcome = match self.modal.as_mut() {
            Some(Modal::Deposit(form)) => match form.validate() {
                Ok(amount) => Some(amount),
                Err(message) => {
                    form.notice = Some(message);
                    None
                }
            },
            _ => None,
        };
        if let Some(amount) = outcome {
            self.modal = None;
            let op = simulate::spawn_deposit(&self.state, amount);
            self.launch(op);
        }
    }

    fn submit_pin(&mut self) {
        let outcome = match self.modal.as_mut() {
            Some(Modal::Pin(form)) => match form.validate() {
                Ok(_) => Some(()),
                Err(message) => {
                    form.notice = Some(message);
                    None
                }
            },
            _ => None,
        };
        if outcome.is_some() {
            self.modal = None;
            let op = simulate::spawn_update_pin(&self.state);
            self.launch(op);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::Timeframe;
    use crate::state::AppState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> (App, mpsc::Receiver<MarketCommand>) {
        let (tx, rx) = mpsc::channel(8);
        let app = App::new(Arc::new(AppState::new()), tx, true);
        (app, rx)
    }

    #[test]
    fn tabs_cycle_in_both_directions() {
        assert_eq!(Tab::Home.next(), Tab::Earn);
        assert_eq!(Tab::Profile.next(), Tab::Home);
        assert_eq!(Tab::Home.previous(), Tab::Profile);
    }

    #[test]
    fn withdraw_form_walks_every_guard() {
        let mut player = PlayerState::new();
        let mut form = WithdrawForm::default();

        assert!(form.validate(&player).is_err());

        player.connect_wallet("addr".to_string());
        player.ton_balance = 20.0;
        assert_eq!(
            form.validate(&player),
            Err("Destination address is required".to_string())
        );

        form.address = "UQAHhbenPmLJ".to_string();
        form.amount = "abc".to_string();
        assert_eq!(form.validate(&player), Err("Enter a valid amount".to_string()));

        form.amount = "2".to_string();
        assert_eq!(
            form.validate(&player),
            Err("Minimum withdrawal is 5.0 TON".to_string())
        );

        form.amount = "25".to_string();
        assert_eq!(
            form.validate(&player),
            Err("Amount exceeds your TON balance".to_string())
        );

        form.amount = "6.5".to_string();
        assert_eq!(form.validate(&player), Ok(("UQAHhbenPmLJ".to_string(), 6.5)));
    }

    #[test]
    fn pin_form_accepts_exactly_four_digits() {
        let mut form = PinForm::default();
        for input in ['1', 'a', '2', '.', '3', '4', '5'] {
            form.push_char(input);
        }
        assert_eq!(form.digits, "1234");
        assert!(form.validate().is_ok());

        form.pop_char();
        assert!(form.validate().is_err());
    }

    #[test]
    fn trade_form_percent_helper_cycles_quarters() {
        let mut form = TradeForm::default();
        form.apply_percent(1_000.0, 100.0);
        assert_eq!(form.amount, "2.5000");
        assert_eq!(form.percent_label(), Some(25));

        form.apply_percent(1_000.0, 100.0);
        assert_eq!(form.amount, "5.0000");

        form.push_char('9');
        assert_eq!(form.percent_label(), None);
    }

    #[test]
    fn amount_inputs_reject_letters_and_double_dots() {
        let mut form = TradeForm::default();
        for input in ['1', '.', 'x', '5', '.', '2'] {
            form.push_char(input);
        }
        assert_eq!(form.amount, "1.52");
    }

    #[tokio::test]
    async fn tab_keys_move_between_views() {
        let (mut app, _rx) = test_app();
        app.on_key(key(KeyCode::Tab)).await;
        assert_eq!(app.active_tab, Tab::Earn);
        app.on_key(key(KeyCode::BackTab)).await;
        assert_eq!(app.active_tab, Tab::Home);
        app.on_key(key(KeyCode::Char('5'))).await;
        assert_eq!(app.active_tab, Tab::Profile);
        app.on_key(key(KeyCode::Char('3'))).await;
        assert_eq!(app.active_tab, Tab::Trade);
    }

    #[tokio::test]
    async fn opening_a_listing_requests_its_chart_with_a_fresh_epoch() {
        let (mut app, mut rx) = test_app();
        app.active_tab = Tab::Trade;

        app.on_key(key(KeyCode::Down)).await;
        app.on_key(key(KeyCode::Enter)).await;

        assert!(app.state.market.lock().selected.is_some());
        match rx.try_recv() {
            Ok(MarketCommand::FetchChart { asset_id, epoch, .. }) => {
                assert_eq!(asset_id, "solana");
                assert_eq!(epoch, 1);
            }
            other => panic!("expected a chart fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn closing_the_detail_cancels_the_chart_fetch() {
        let (mut app, mut rx) = test_app();
        app.active_tab = Tab::Trade;
        app.on_key(key(KeyCode::Enter)).await;
        let _ = rx.try_recv();

        app.on_key(key(KeyCode::Esc)).await;

        assert!(app.state.market.lock().selected.is_none());
        assert!(matches!(rx.try_recv(), Ok(MarketCommand::CancelChart)));
    }

    #[tokio::test]
    async fn timeframe_cycling_requests_a_superseding_epoch() {
        let (mut app, mut rx) = test_app();
        app.active_tab = Tab::Trade;
        app.on_key(key(KeyCode::Enter)).await;
        let _ = rx.try_recv();

        app.on_key(key(KeyCode::Tab)).await;

        let selected_timeframe = app
            .state
            .market
            .lock()
            .selected
            .as_ref()
            .map(|selected| selected.timeframe);
        assert_eq!(selected_timeframe, Some(Timeframe::D7));
        match rx.try_recv() {
            Ok(MarketCommand::FetchChart { timeframe, epoch, .. }) => {
                assert_eq!(timeframe, Timeframe::D7);
                assert_eq!(epoch, 2);
            }
            other => panic!("expected a chart fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn only_one_action_runs_at_a_time() {
        let (mut app, _rx) = test_app();
        app.on_key(key(KeyCode::Char('c'))).await;
        assert!(app.op_in_flight());

        app.on_key(key(KeyCode::Char('c'))).await;
        let feed = app.state.recent_feed(8);
        assert!(feed
            .iter()
            .any(|line| line.text.contains("still processing")));

        if let Some(op) = &app.pending_op {
            op.cancel();
        }
    }

    #[tokio::test]
    async fn withdraw_modal_blocks_until_the_form_validates() {
        let (mut app, _rx) = test_app();
        {
            let mut player = app.state.player.lock();
            player.connect_wallet("addr".to_string());
            player.ton_balance = 50.0;
        }
        app.active_tab = Tab::Profile;
        app.on_key(key(KeyCode::Char('w'))).await;
        assert!(matches!(app.modal, Some(Modal::Withdraw(_))));

        app.on_key(key(KeyCode::Enter)).await;
        match &app.modal {
            Some(Modal::Withdraw(form)) => assert!(form.notice.is_some()),
            other => panic!("modal should stay open, got {other:?}"),
        }

        for input in "UQAHhbenPmLJ".chars() {
            app.on_key(key(KeyCode::Char(input))).await;
        }
        app.on_key(key(KeyCode::Tab)).await;
        for input in "6.5".chars() {
            app.on_key(key(KeyCode::Char(input))).await;
        }
        app.on_key(key(KeyCode::Enter)).await;

        assert!(app.modal.is_none());
        assert!(app.op_in_flight());
        if let Some(op) = &app.pending_op {
            op.cancel();
        }
    }

    #[tokio::test]
    async fn purchase_modal_requires_confirmation() {
        let (mut app, _rx) = test_app();
        app.on_key(key(KeyCode::Char('t'))).await;
        assert!(matches!(app.modal, Some(Modal::ConfirmTonPurchase)));

        app.on_key(key(KeyCode::Esc)).await;
        assert!(app.modal.is_none());
        assert!(!app.op_in_flight());
    }
}
