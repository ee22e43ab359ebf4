use crate::state::{AppState, EngineHandle, MiningType};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const TICK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Credits the active mining target once per elapsed second until cancelled.
///
/// Rate resolution and the credit happen inside one lock acquisition, so a
/// tick observes either the old or the new mining configuration, never a mix.
pub async fn run_accrual_engine(state: Arc<AppState>, cancellation_token: CancellationToken) {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick completes immediately; consume it so the first
    // credit lands one full period after the session starts.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                log::debug!("accrual engine cancelled");
                return;
            }
            _ = ticker.tick() => {
                state.player.lock().credit_mining_tick();
            }
        }
    }
}

/// Starts a fresh accrual engine, replacing any engine already running.
pub async fn start_mining(state: &Arc<AppState>) {
    stop_engine(state).await;

    let mining_type = {
        let mut player = state.player.lock();
        player.begin_mining_session();
        player.mining_type
    };

    let cancellation_token = CancellationToken::new();
    let join_handle = tokio::spawn(run_accrual_engine(
        Arc::clone(state),
        cancellation_token.clone(),
    ));

    let mut slot = state.engine.lock().await;
    *slot = Some(EngineHandle {
        cancellation_token,
        join_handle,
    });
    log::info!("mining started ({})", mining_type.as_str());
}

/// Stops mining and waits for the engine to exit. Returns whether an engine
/// was actually running; stopping an idle state is a no-op.
pub async fn stop_mining(state: &Arc<AppState>) -> bool {
    let stopped = stop_engine(state).await;
    state.player.lock().end_mining_session();
    if stopped {
        log::info!("mining stopped");
    }
    stopped
}

/// Switching the mining target stops the engine. The session does not resume
/// on its own; the player restarts mining explicitly.
pub async fn switch_mining_type(state: &Arc<AppState>, mining_type: MiningType) {
    stop_mining(state).await;
    state.player.lock().set_mining_type(mining_type);
    log::info!("mining target switched to {}", mining_type.as_str());
}

async fn stop_engine(state: &Arc<AppState>) -> bool {
    let existing = { state.engine.lock().await.take() };
    match existing {
        Some(handle) => {
            handle.cancellation_token.cancel();
            // Join before returning so no tick can land after this point.
            let _ = handle.join_handle.await;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        AppState, DEFAULT_BALANCE, DEFAULT_PROFIT_PER_HOUR, DEFAULT_TON_BALANCE,
        SECONDS_PER_HOUR, TON_RATE_PER_SECOND,
    };

    fn hypenax_rate() -> f64 {
        DEFAULT_PROFIT_PER_HOUR / SECONDS_PER_HOUR
    }

    async fn let_engine_settle() {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
    }

    async fn advance_ticks(count: u32) {
        for _ in 0..count {
            tokio::time::advance(TICK_INTERVAL).await;
            let_engine_settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn credits_once_per_elapsed_second() {
        let state = Arc::new(AppState::new());
        start_mining(&state).await;
        let_engine_settle().await;

        advance_ticks(3).await;
        stop_mining(&state).await;

        let player = state.player.lock();
        let expected = DEFAULT_BALANCE + 3.0 * hypenax_rate();
        assert!((player.balance - expected).abs() < 1e-9);
        assert_eq!(player.ton_balance, DEFAULT_TON_BALANCE);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_lands_before_the_first_full_period() {
        let state = Arc::new(AppState::new());
        start_mining(&state).await;
        let_engine_settle().await;

        tokio::time::advance(Duration::from_millis(900)).await;
        let_engine_settle().await;

        assert_eq!(state.player.lock().balance, DEFAULT_BALANCE);
        stop_mining(&state).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_cancels_the_pending_tick() {
        let state = Arc::new(AppState::new());
        start_mining(&state).await;
        let_engine_settle().await;

        tokio::time::advance(Duration::from_millis(400)).await;
        let_engine_settle().await;
        assert!(stop_mining(&state).await);

        // The engine is joined on stop, so later clock movement is inert.
        tokio::time::advance(Duration::from_secs(5)).await;
        let_engine_settle().await;

        let player = state.player.lock();
        assert_eq!(player.balance, DEFAULT_BALANCE);
        assert!(!player.is_mining);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_reports_whether_an_engine_was_running() {
        let state = Arc::new(AppState::new());
        assert!(!stop_mining(&state).await);

        start_mining(&state).await;
        assert!(stop_mining(&state).await);
        assert!(!stop_mining(&state).await);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_target_stops_accrual_until_restarted() {
        let state = Arc::new(AppState::new());
        start_mining(&state).await;
        let_engine_settle().await;

        switch_mining_type(&state, MiningType::Ton).await;
        advance_ticks(3).await;

        {
            let player = state.player.lock();
            assert!(!player.is_mining);
            assert_eq!(player.mining_type, MiningType::Ton);
            assert_eq!(player.ton_balance, DEFAULT_TON_BALANCE);
        }

        start_mining(&state).await;
        let_engine_settle().await;
        advance_ticks(2).await;
        stop_mining(&state).await;

        let player = state.player.lock();
        assert!((player.ton_balance - 2.0 * TON_RATE_PER_SECOND).abs() < 1e-12);
        assert_eq!(player.balance, DEFAULT_BALANCE);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_previous_engine() {
        let state = Arc::new(AppState::new());
        start_mining(&state).await;
        let_engine_settle().await;
        start_mining(&state).await;
        let_engine_settle().await;

        advance_ticks(2).await;
        stop_mining(&state).await;

        // A single engine survives the restart, so two elapsed seconds credit
        // exactly twice.
        let balance = state.player.lock().balance;
        let expected = DEFAULT_BALANCE + 2.0 * hypenax_rate();
        assert!((balance - expected).abs() < 1e-9);
    }
}
