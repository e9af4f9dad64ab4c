use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::model::PollSnapshot;
use crate::transport::StatusTransport;

/// Outcome of one poll tick, tagged with the run that produced it.
#[derive(Debug)]
pub struct PollUpdate {
    pub generation: u64,
    pub result: Result<PollSnapshot, TransportError>,
}

/// Fetch downloader status, then the gallery list. Either failure fails the
/// whole tick so the caller never sees a half-updated pair.
pub async fn poll_once(transport: &dyn StatusTransport) -> Result<PollSnapshot, TransportError> {
    let status = transport.downloader_status().await?;
    let gallery = transport.displayed_list().await?;
    Ok(PollSnapshot { status, gallery })
}

struct RunningPoll {
    generation: u64,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the background poll task for one logged-in session at a time.
pub struct StatusPoller {
    transport: Arc<dyn StatusTransport>,
    period: Duration,
    updates: mpsc::UnboundedSender<PollUpdate>,
    running: Option<RunningPoll>,
    next_generation: u64,
}

impl StatusPoller {
    pub fn new(
        transport: Arc<dyn StatusTransport>,
        period: Duration,
        updates: mpsc::UnboundedSender<PollUpdate>,
    ) -> Self {
        Self {
            transport,
            period,
            updates,
            running: None,
            next_generation: 0,
        }
    }

    /// Start polling; the first fetch is issued immediately. Returns the
    /// generation of the active run, which is unchanged if already running.
    pub fn start(&mut self) -> u64 {
        if let Some(running) = &self.running {
            if !running.handle.is_finished() {
                return running.generation;
            }
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(
            Arc::clone(&self.transport),
            self.period,
            generation,
            self.updates.clone(),
            shutdown_rx,
        ));
        info!(target: "frame::poller", generation, period_ms = self.period.as_millis() as u64, "poller started");
        self.running = Some(RunningPoll {
            generation,
            shutdown,
            handle,
        });
        generation
    }

    /// Cancel the schedule. A fetch already in progress runs to completion
    /// but its result is dropped.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
            info!(target: "frame::poller", generation = running.generation, "poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Generation of the active run, if any.
    pub fn generation(&self) -> Option<u64> {
        self.running.as_ref().map(|running| running.generation)
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    transport: Arc<dyn StatusTransport>,
    period: Duration,
    generation: u64,
    updates: mpsc::UnboundedSender<PollUpdate>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        let result = poll_once(transport.as_ref()).await;
        if *shutdown.borrow() {
            debug!(target: "frame::poller", generation, "poll finished after stop, result dropped");
            break;
        }

        let elapsed = started.elapsed();
        if elapsed >= period {
            // Skipped ticks are not replayed; the next one is a full period out.
            debug!(target: "frame::poller", generation, elapsed_ms = elapsed.as_millis() as u64, "poll overran its period");
            ticker.reset();
        }

        match &result {
            Ok(snapshot) => debug!(
                target: "frame::poller",
                generation,
                photos = snapshot.gallery.len(),
                "poll succeeded"
            ),
            Err(err) => warn!(target: "frame::poller", generation, error = %err, kind = err.kind(), "poll failed"),
        }

        if updates.send(PollUpdate { generation, result }).is_err() {
            break;
        }
    }

    debug!(target: "frame::poller", generation, "poll loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::time::sleep;

    const PERIOD: Duration = Duration::from_millis(5_000);

    fn poller(fake: &Arc<FakeTransport>) -> (StatusPoller, mpsc::UnboundedReceiver<PollUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StatusPoller::new(fake.clone(), PERIOD, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_on_each_period() {
        let fake = FakeTransport::new();
        fake.set_gallery(&["a.jpg"]);
        let (mut poller, mut rx) = poller(&fake);
        let origin = Instant::now();

        assert_eq!(poller.start(), 1);
        sleep(Duration::from_millis(10_001)).await;

        assert_eq!(fake.poll_offsets_ms(origin), [0, 5_000, 10_000]);
        for _ in 0..3 {
            let update = rx.try_recv().unwrap();
            assert_eq!(update.generation, 1);
            assert_eq!(update.result.unwrap().gallery.len(), 1);
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn no_fetch_after_stop() {
        let fake = FakeTransport::new();
        let (mut poller, _rx) = poller(&fake);
        let origin = Instant::now();

        poller.start();
        sleep(Duration::from_millis(5_001)).await;
        poller.stop();
        assert!(!poller.is_running());
        sleep(Duration::from_secs(60)).await;

        assert_eq!(fake.poll_offsets_ms(origin), [0, 5_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_the_fetch_in_progress() {
        let fake = FakeTransport::new();
        fake.set_poll_delay(Duration::from_secs(3));
        let (mut poller, mut rx) = poller(&fake);

        poller.start();
        sleep(Duration::from_secs(1)).await;
        poller.stop();
        sleep(Duration::from_secs(10)).await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Disconnected | TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ticks_are_skipped() {
        let fake = FakeTransport::new();
        fake.set_poll_delay(Duration::from_secs(12));
        let (mut poller, _rx) = poller(&fake);
        let origin = Instant::now();

        poller.start();
        sleep(Duration::from_millis(20_000)).await;

        assert_eq!(fake.poll_offsets_ms(origin), [0, 17_000]);
        assert_eq!(fake.max_polls_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_and_polling_continues() {
        let fake = FakeTransport::new();
        fake.fail_polls(Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        let (mut poller, mut rx) = poller(&fake);

        poller.start();
        sleep(Duration::from_millis(5_001)).await;

        for _ in 0..2 {
            let update = rx.try_recv().unwrap();
            assert!(matches!(update.result, Err(TransportError::Server { .. })));
        }
        assert!(poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_bumps_generation_and_start_is_idempotent() {
        let fake = FakeTransport::new();
        let (mut poller, mut rx) = poller(&fake);

        assert_eq!(poller.start(), 1);
        assert_eq!(poller.start(), 1);
        poller.stop();
        assert_eq!(poller.generation(), None);
        assert_eq!(poller.start(), 2);
        sleep(Duration::from_millis(1)).await;

        let update = rx.try_recv().unwrap();
        assert_eq!(update.generation, 2);
    }
}
