//! Cross-walker collectives.
//!
//! Multiple walkers share one bias model. The only synchronization point in
//! the whole method is the histogram reduction at the start of every update
//! cycle, plus the stop decision at its end; both are blocking collectives
//! over *all* walkers of the run. The numerical code never talks to a
//! communication layer directly; it goes through [`WalkerTransport`] so a
//! run can be single-process, thread-backed, or bridged to MPI without
//! touching the update logic.
//!
//! Correctness requires every walker to reach the collective on the same
//! global step count. A walker that skips an update cycle deadlocks the
//! group.

use std::sync::{Arc, Condvar, Mutex};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("Walkers contributed histograms of different sizes ({expected} vs {got})")]
    SizeMismatch { expected: usize, got: usize },

    #[error("A walker panicked while holding the collective lock")]
    Poisoned,
}

pub trait WalkerTransport {
    fn walker_id(&self) -> usize;

    fn num_walkers(&self) -> usize;

    /// Whether this walker writes the periodic report. Exactly one walker
    /// per run answers true.
    fn is_designated_writer(&self) -> bool {
        self.walker_id() == 0
    }

    /// Blocking elementwise sum of local visit counts across all walkers.
    /// Every walker receives the same merged histogram.
    fn reduce_counts(&mut self, local: &[i64]) -> Result<Vec<i64>, TransportError>;

    /// Blocking logical OR of the local stop votes. All walkers receive
    /// the same decision, so they leave the run at the same collective
    /// point instead of exiting unilaterally.
    fn agree_on_stop(&mut self, stop: bool) -> Result<bool, TransportError>;
}

/// Transport for a single-walker run; both collectives are identities.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleWalker;

impl WalkerTransport for SingleWalker {
    fn walker_id(&self) -> usize {
        0
    }

    fn num_walkers(&self) -> usize {
        1
    }

    fn reduce_counts(&mut self, local: &[i64]) -> Result<Vec<i64>, TransportError> {
        Ok(local.to_vec())
    }

    fn agree_on_stop(&mut self, stop: bool) -> Result<bool, TransportError> {
        Ok(stop)
    }
}

struct Round<T> {
    generation: u64,
    arrived: usize,
    value: Option<T>,
    published: Option<T>,
}

impl<T> Round<T> {
    fn new() -> Self {
        Self {
            generation: 0,
            arrived: 0,
            value: None,
            published: None,
        }
    }
}

struct Shared {
    members: usize,
    counts: Mutex<Round<Vec<i64>>>,
    counts_cv: Condvar,
    stop: Mutex<Round<bool>>,
    stop_cv: Condvar,
}

/// Thread-backed transport: each walker runs on its own thread and the
/// collectives rendezvous through a shared accumulator. This is both the
/// in-process test double and the transport the bundled demo uses for
/// multi-walker runs.
pub struct InProcessTransport {
    shared: Arc<Shared>,
    id: usize,
}

impl InProcessTransport {
    /// Creates one connected transport handle per walker.
    pub fn group(members: usize) -> Vec<Self> {
        assert!(members > 0, "a walker group needs at least one member");
        let shared = Arc::new(Shared {
            members,
            counts: Mutex::new(Round::new()),
            counts_cv: Condvar::new(),
            stop: Mutex::new(Round::new()),
            stop_cv: Condvar::new(),
        });
        (0..members)
            .map(|id| Self {
                shared: Arc::clone(&shared),
                id,
            })
            .collect()
    }
}

fn rendezvous<T: Clone>(
    lock: &Mutex<Round<T>>,
    cv: &Condvar,
    members: usize,
    contribution: T,
    merge: impl Fn(&mut T, &T) -> Result<(), TransportError>,
) -> Result<T, TransportError> {
    let mut round = lock.lock().map_err(|_| TransportError::Poisoned)?;
    if let Some(acc) = round.value.as_mut() {
        merge(acc, &contribution)?;
    } else {
        round.value = Some(contribution);
    }
    round.arrived += 1;

    if round.arrived == members {
        round.published = round.value.take();
        round.arrived = 0;
        round.generation = round.generation.wrapping_add(1);
        cv.notify_all();
    } else {
        let target = round.generation;
        while round.generation == target {
            round = cv.wait(round).map_err(|_| TransportError::Poisoned)?;
        }
    }

    // The published value stays in place until the next round completes,
    // which cannot happen before every member of this round has returned.
    round.published.clone().ok_or(TransportError::Poisoned)
}

impl WalkerTransport for InProcessTransport {
    fn walker_id(&self) -> usize {
        self.id
    }

    fn num_walkers(&self) -> usize {
        self.shared.members
    }

    fn reduce_counts(&mut self, local: &[i64]) -> Result<Vec<i64>, TransportError> {
        rendezvous(
            &self.shared.counts,
            &self.shared.counts_cv,
            self.shared.members,
            local.to_vec(),
            |acc, contribution| {
                if acc.len() != contribution.len() {
                    return Err(TransportError::SizeMismatch {
                        expected: acc.len(),
                        got: contribution.len(),
                    });
                }
                for (a, c) in acc.iter_mut().zip(contribution) {
                    *a += c;
                }
                Ok(())
            },
        )
    }

    fn agree_on_stop(&mut self, stop: bool) -> Result<bool, TransportError> {
        rendezvous(
            &self.shared.stop,
            &self.shared.stop_cv,
            self.shared.members,
            stop,
            |acc, contribution| {
                *acc |= contribution;
                Ok(())
            },
        )
    }
}
