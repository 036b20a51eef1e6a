use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One second of countdown for a specific quiz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub attempt: u64,
}

/// Background one-second ticker feeding a quiz session.
///
/// At most one ticker runs per timer: starting again, cancelling, or
/// dropping the timer aborts the previous task.
#[derive(Debug, Default)]
pub struct QuizTimer {
    handle: Option<JoinHandle<()>>,
}

impl QuizTimer {
    pub fn new() -> Self {
        Self { handle: None }
    }

    /// Starts ticking for `attempt`; the first tick arrives one full period
    /// after the call.
    pub fn start(&mut self, attempt: u64, sender: mpsc::UnboundedSender<Tick>) {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sender.send(Tick { attempt }).is_err() {
                    break;
                }
            }
        }));
        log::debug!("Quiz timer started for attempt {}", attempt);
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::debug!("Quiz timer cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for QuizTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::TimerConfig;
    use crate::models::dto::response::SessionState;
    use crate::services::quiz_session_service::QuizSession;
    use crate::test_utils::fixtures::sample_quiz_set;

    #[tokio::test(start_paused = true)]
    async fn emits_one_tick_per_second() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = QuizTimer::new();
        timer.start(4, tx);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let mut ticks = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            ticks.push(tick);
        }

        assert_eq!(ticks, vec![Tick { attempt: 4 }; 3]);
        assert!(timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = QuizTimer::new();
        timer.start(1, tx);
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(!timer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_ticker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = QuizTimer::new();
        timer.start(1, tx.clone());
        timer.start(2, tx);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let mut attempts = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            attempts.push(tick.attempt);
        }
        assert_eq!(attempts, vec![2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn drives_session_to_time_expiry() {
        let mut session =
            QuizSession::new(sample_quiz_set(1), TimerConfig::per_question(3)).expect("non-empty set");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = QuizTimer::new();
        timer.start(session.attempt(), tx);

        while let Some(tick) = rx.recv().await {
            if session.apply_tick(tick) != SessionState::Active {
                timer.cancel();
                break;
            }
        }

        assert_eq!(session.state(), SessionState::FinishedSummary);
        assert_eq!(session.remaining_seconds(), Some(0));
    }
}
