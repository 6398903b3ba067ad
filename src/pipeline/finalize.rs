//! Cosmetic finalisation: walk the percentage from wherever the transfer
//! left it up to 100, one point per tick.
//!
//! Nothing here reflects real server state. The walk only gives the user
//! movement between "bytes sent" and "results shown".

use crate::pipeline::transfer::lock_progress;
use crate::progress::{ProgressCallback, ProgressState};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Advance `state` by one point every `tick` until it reaches 100.
///
/// The first step happens one full tick after the call.
pub async fn animate(
    state: &Mutex<ProgressState>,
    tick: Duration,
    callback: Option<&ProgressCallback>,
) {
    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if lock_progress(state).is_complete() {
            return;
        }
        ticker.tick().await;
        let mut progress = lock_progress(state);
        if progress.step() {
            if let Some(cb) = callback {
                cb.on_progress(progress.percent());
            }
        }
    }
}

/// Jump straight to 100, reporting if that was a change.
pub fn complete(state: &Mutex<ProgressState>, callback: Option<&ProgressCallback>) {
    let mut progress = lock_progress(state);
    if progress.advance_to(100) {
        if let Some(cb) = callback {
            cb.on_progress(100);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::UploadProgressCallback;
    use std::sync::Arc;

    struct Recorder(Mutex<Vec<u8>>);

    impl UploadProgressCallback for Recorder {
        fn on_progress(&self, percent: u8) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn walks_from_eighty_in_twenty_ticks() {
        let state = Mutex::new(ProgressState::new());
        state.lock().unwrap().advance_to(80);
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let cb: ProgressCallback = rec.clone();

        let start = Instant::now();
        animate(&state, Duration::from_millis(20), Some(&cb)).await;

        assert_eq!(state.lock().unwrap().percent(), 100);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(400) && elapsed < Duration::from_millis(420));
        let seen = rec.0.lock().unwrap();
        assert_eq!(seen.first(), Some(&81));
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(seen.len(), 20);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn already_complete_returns_immediately() {
        let state = Mutex::new(ProgressState::new());
        state.lock().unwrap().advance_to(100);
        let start = Instant::now();
        animate(&state, Duration::from_millis(20), None).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn complete_reports_once() {
        let state = Mutex::new(ProgressState::new());
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let cb: ProgressCallback = rec.clone();
        complete(&state, Some(&cb));
        complete(&state, Some(&cb));
        assert_eq!(*rec.0.lock().unwrap(), vec![100]);
    }
}
