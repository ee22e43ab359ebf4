//! In-game actions that stand in for remote calls. Each one runs as a spawned
//! task with a fixed latency and a cancellation token; the state mutation sits
//! after the sleep, so a cancelled action leaves every balance untouched.

use crate::mining;
use crate::state::{AppState, DAILY_REWARD_AMOUNT};
use chrono::Local;
use nanoid::nanoid;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const CLAIM_LATENCY: Duration = Duration::from_millis(1_500);
pub const WALLET_LATENCY: Duration = Duration::from_millis(1_500);
pub const PURCHASE_LATENCY: Duration = Duration::from_millis(2_000);
pub const TRANSFER_LATENCY: Duration = Duration::from_millis(2_000);
pub const PIN_LATENCY: Duration = Duration::from_millis(2_000);
pub const TASK_LATENCY: Duration = Duration::from_millis(1_500);
pub const ORDER_LATENCY: Duration = Duration::from_millis(1_500);

/// Address handed out by the demo wallet connector.
pub const DEMO_WALLET_ADDRESS: &str = "UQAHhbenPmLJk4BdhEOSDV1YRu3HlsA1wgx3OLeIdj7I7W0p";

const REFERENCE_ALPHABET: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];
const REFERENCE_LENGTH: usize = 10;

pub struct PendingOp {
    pub label: &'static str,
    pub reference: String,
    pub cancellation_token: CancellationToken,
    pub join_handle: JoinHandle<()>,
}

impl PendingOp {
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }
}

fn op_reference() -> String {
    nanoid!(REFERENCE_LENGTH, &REFERENCE_ALPHABET)
}

// Counted in chars, not bytes: withdraw addresses are free-form user input.
pub fn shorten_address(address: &str) -> String {
    let length = address.chars().count();
    if length <= 10 {
        return address.to_string();
    }
    let head: String = address.chars().take(6).collect();
    let tail: String = address.chars().skip(length - 4).collect();
    format!("{head}..{tail}")
}

fn spawn_op<F, Fut>(
    state: &Arc<AppState>,
    label: &'static str,
    latency: Duration,
    apply: F,
) -> PendingOp
where
    F: FnOnce(Arc<AppState>, String) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let state = Arc::clone(state);
    let cancellation_token = CancellationToken::new();
    let reference = op_reference();
    let task_token = cancellation_token.clone();
    let task_reference = reference.clone();
    let join_handle = tokio::spawn(async move {
        tokio::select! {
            _ = task_token.cancelled() => {
                log::debug!("{label} cancelled (ref {task_reference})");
                state.push_feed(format!("{label} cancelled"));
            }
            _ = tokio::time::sleep(latency) => {
                apply(state, task_reference).await;
            }
        }
    });
    PendingOp {
        label,
        reference,
        cancellation_token,
        join_handle,
    }
}

pub fn spawn_claim_daily(state: &Arc<AppState>) -> PendingOp {
    spawn_op(state, "Daily reward claim", CLAIM_LATENCY, |state, reference| async move {
        let today = Local::now().date_naive();
        let credited = state.player.lock().claim_daily_reward(today);
        if credited {
            log::info!("daily reward credited (ref {reference})");
            state.push_feed(format!(
                "Daily reward claimed: +{DAILY_REWARD_AMOUNT:.0} HPX (ref {reference})"
            ));
        } else {
            state.push_feed("Daily reward already claimed today");
        }
    })
}

pub fn spawn_connect_wallet(state: &Arc<AppState>) -> PendingOp {
    spawn_op(state, "Wallet connection", WALLET_LATENCY, |state, reference| async move {
        state
            .player
            .lock()
            .connect_wallet(DEMO_WALLET_ADDRESS.to_string());
        log::info!("wallet connected (ref {reference})");
        state.push_feed(format!(
            "Wallet connected: {}",
            shorten_address(DEMO_WALLET_ADDRESS)
        ));
    })
}

/// The activation fee settles externally, then the engine starts on the TON
/// target right away.
pub fn spawn_activate_ton_miner(state: &Arc<AppState>) -> PendingOp {
    spawn_op(state, "TON miner activation", PURCHASE_LATENCY, |state, reference| async move {
        state.player.lock().activate_ton_miner();
        mining::start_mining(&state).await;
        state.push_feed(format!("TON miner activated (ref {reference})"));
    })
}

pub fn spawn_withdraw(state: &Arc<AppState>, address: String, amount: f64) -> PendingOp {
    spawn_op(state, "Withdrawal", TRANSFER_LATENCY, move |state, reference| async move {
        let applied = state.player.lock().apply_withdrawal(amount);
        match applied {
            Ok(()) => {
                log::info!("withdrawal of {amount} TON sent (ref {reference})");
                state.push_feed(format!(
                    "Sent {amount:.4} TON to {} (ref {reference})",
                    shorten_address(&address)
                ));
            }
            Err(error) => {
                log::warn!("withdrawal rejected: {error}");
                state.push_feed(format!("Withdrawal failed: {error}"));
            }
        }
    })
}

/// The deposit check never touches the balances; only the acknowledgement
/// reaches the feed.
pub fn spawn_deposit(state: &Arc<AppState>, amount: f64) -> PendingOp {
    spawn_op(state, "Deposit check", TRANSFER_LATENCY, move |state, reference| async move {
        log::info!("deposit check for {amount} TON acknowledged (ref {reference})");
        state.push_feed(format!(
            "Deposit check successful: {amount:.4} TON (ref {reference})"
        ));
    })
}

pub fn spawn_update_pin(state: &Arc<AppState>) -> PendingOp {
    spawn_op(state, "PIN update", PIN_LATENCY, |state, reference| async move {
        state.push_feed(format!("Security PIN updated (ref {reference})"));
    })
}

pub fn spawn_verify_task(
    state: &Arc<AppState>,
    task_id: &'static str,
    title: &'static str,
) -> PendingOp {
    spawn_op(state, "Task verification", TASK_LATENCY, move |state, reference| async move {
        match state.player.lock().complete_task(task_id) {
            Some(reward) => {
                log::info!("task {task_id} verified (ref {reference})");
                state.push_feed(format!("{title} verified: +{reward:.0} HPX"));
            }
            None => state.push_feed(format!("{title} is already verified")),
        }
    })
}

/// Orders never touch the balances; the fill only reaches the activity feed.
pub fn spawn_place_order(
    state: &Arc<AppState>,
    side: &'static str,
    symbol: String,
    amount: f64,
) -> PendingOp {
    spawn_op(state, "Order", ORDER_LATENCY, move |state, reference| async move {
        state.push_feed(format!(
            "{side} {amount:.4} {symbol} order filled (ref {reference})"
        ));
    })
}
