#![forbid(unsafe_code)]

//! Background recompute worker with latest-wins delivery.
//!
//! Rapid interaction can queue several filter changes before an aggregation
//! finishes. The worker makes sure only the newest request is ever applied:
//!
//! - **Ticketed**: every [`RecomputeWorker::submit`] returns a strictly
//!   increasing ticket.
//! - **Coalescing**: before computing, the worker thread drains its inbox and
//!   keeps only the newest request, so superseded filters are never computed.
//! - **Latest-wins**: [`RecomputeWorker::poll_latest`] returns a result only if
//!   its ticket is the newest submitted; anything older is discarded.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Worker thread gone | `submit` still returns a ticket; polls return `None` |
//! | Result for stale ticket | Dropped and counted in `stale_dropped` |
//! | Worker dropped with work queued | Channel closes, thread exits, join on drop |

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use aerolens_core::{DerivedView, FilterState, IncidentRecord, aggregate};
use tracing::{debug, trace};

struct Request {
    ticket: u64,
    filter: FilterState,
}

/// A finished recompute.
#[derive(Debug, Clone)]
pub struct Computed {
    pub ticket: u64,
    pub filter: FilterState,
    pub view: Arc<DerivedView>,
}

/// Owns the aggregation thread.
pub struct RecomputeWorker {
    tx: Option<Sender<Request>>,
    rx: Receiver<Computed>,
    handle: Option<JoinHandle<()>>,
    latest: u64,
    stale_dropped: u64,
}

impl RecomputeWorker {
    /// Spawn the worker over a shared, immutable record set.
    pub fn spawn(records: Arc<[IncidentRecord]>) -> std::io::Result<Self> {
        let (req_tx, req_rx) = mpsc::channel::<Request>();
        let (res_tx, res_rx) = mpsc::channel::<Computed>();

        let handle = thread::Builder::new()
            .name("aerolens-recompute".into())
            .spawn(move || run_worker(&records, &req_rx, &res_tx))?;

        Ok(Self {
            tx: Some(req_tx),
            rx: res_rx,
            handle: Some(handle),
            latest: 0,
            stale_dropped: 0,
        })
    }

    /// Queue a recompute for `filter`; returns its ticket.
    pub fn submit(&mut self, filter: FilterState) -> u64 {
        self.latest += 1;
        let ticket = self.latest;
        if let Some(tx) = &self.tx
            && tx.send(Request { ticket, filter }).is_err()
        {
            debug!(ticket, "recompute worker is gone; request dropped");
        }
        ticket
    }

    /// Newest ticket handed out (0 before the first submit).
    pub fn latest_ticket(&self) -> u64 {
        self.latest
    }

    /// Results discarded because a newer request superseded them.
    pub fn stale_dropped(&self) -> u64 {
        self.stale_dropped
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        ticket == self.latest
    }

    fn accept(&mut self, computed: Computed, best: &mut Option<Computed>) {
        if self.is_current(computed.ticket) {
            *best = Some(computed);
        } else {
            trace!(ticket = computed.ticket, latest = self.latest, "dropping stale view");
            self.stale_dropped += 1;
        }
    }

    /// Non-blocking: the result for the newest ticket, if it has arrived.
    pub fn poll_latest(&mut self) -> Option<Computed> {
        let mut best = None;
        loop {
            match self.rx.try_recv() {
                Ok(computed) => self.accept(computed, &mut best),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        best
    }

    /// Block up to `timeout` for the newest ticket's result.
    pub fn wait_latest(&mut self, timeout: Duration) -> Option<Computed> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(done) = self.poll_latest() {
                return Some(done);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(computed) => {
                    let mut best = None;
                    self.accept(computed, &mut best);
                    if best.is_some() {
                        return best;
                    }
                }
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for RecomputeWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            debug!("recompute worker panicked");
        }
    }
}

fn run_worker(records: &[IncidentRecord], inbox: &Receiver<Request>, outbox: &Sender<Computed>) {
    while let Ok(mut request) = inbox.recv() {
        // Skip straight to the newest queued filter.
        while let Ok(newer) = inbox.try_recv() {
            trace!(skipped = request.ticket, newer = newer.ticket, "coalescing recompute");
            request = newer;
        }
        let view = Arc::new(aggregate(records, &request.filter));
        let computed = Computed {
            ticket: request.ticket,
            filter: request.filter,
            view,
        };
        if outbox.send(computed).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerolens_core::{Manufacturer, Phase, Severity};

    fn records() -> Arc<[IncidentRecord]> {
        vec![
            IncidentRecord::new(2000, Some(Manufacturer::Boeing), Phase::Taxi, Severity::Fatal),
            IncidentRecord::new(2010, Some(Manufacturer::Airbus), Phase::Cruise, Severity::Incident),
        ]
        .into()
    }

    #[test]
    fn delivers_latest_result() {
        let mut worker = RecomputeWorker::spawn(records()).unwrap();
        let f = FilterState::default().with_year_range(2000, 2005);
        let ticket = worker.submit(f);
        let done = worker.wait_latest(Duration::from_secs(5)).unwrap();
        assert_eq!(done.ticket, ticket);
        assert_eq!(done.filter, f);
        assert_eq!(done.view.qualifying, 1);
    }

    #[test]
    fn only_newest_of_a_burst_is_applied() {
        let mut worker = RecomputeWorker::spawn(records()).unwrap();
        let base = FilterState::default();
        for year in 1996..2010 {
            let _ = worker.submit(base.with_year_range(1995, year));
        }
        let newest = base.with_year_range(2009, 2016);
        let last = worker.submit(newest);

        let done = worker.wait_latest(Duration::from_secs(5)).unwrap();
        assert_eq!(done.ticket, last);
        assert_eq!(done.filter, newest);
        assert_eq!(done.view, Arc::new(aggregate(&records(), &newest)));
        // Nothing older can surface afterwards.
        assert!(worker.poll_latest().is_none());
    }

    #[test]
    fn poll_before_submit_is_none() {
        let mut worker = RecomputeWorker::spawn(records()).unwrap();
        assert_eq!(worker.latest_ticket(), 0);
        assert!(worker.poll_latest().is_none());
    }
}
