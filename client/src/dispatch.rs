//! Completion dispatch for network work.
//!
//! Requests run on tokio tasks; their results come back over a channel and
//! are applied only when the owner drains it, so every state mutation happens
//! on the owner's side. Each request is stamped with the [`Generation`]
//! current when it was dispatched. The owner advances the generation when a
//! screen is torn down; a completion carrying an older generation must not
//! touch screen-scoped state.

use crate::api::AuthResponse;
use crate::error::Result;
use rover_engine::{SyncRequest, UserRecord};
use std::future::Future;
use tokio::sync::mpsc;

/// Identifies the screen that issued a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// Result of a finished request.
#[derive(Debug)]
pub enum Completion {
    Login(Result<AuthResponse>),
    Register(Result<AuthResponse>),
    Resume(Result<AuthResponse>),
    Sync {
        /// What the request carried
        sent: SyncRequest,
        outcome: Result<UserRecord>,
    },
}

/// A completion with the generation it was dispatched under.
#[derive(Debug)]
pub struct Stamped {
    pub generation: Generation,
    pub completion: Completion,
}

/// Runs requests and queues their completions for the owner.
#[derive(Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Stamped>,
    rx: mpsc::UnboundedReceiver<Stamped>,
    generation: Generation,
    in_flight: usize,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx,
            generation: Generation::default(),
            in_flight: 0,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Start a new generation. Everything dispatched before becomes stale.
    pub fn advance(&mut self) -> Generation {
        self.generation = self.generation.next();
        tracing::debug!(generation = self.generation.value(), "Generation advanced");
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    /// Requests dispatched but not yet drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Run `task` on the tokio runtime. Must be called from within one.
    pub fn dispatch<F>(&mut self, task: F) -> Generation
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let generation = self.generation;
        let tx = self.tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let completion = task.await;
            // The receiver lives as long as the dispatcher; if it is gone
            // there is nobody left to apply the result.
            let _ = tx.send(Stamped {
                generation,
                completion,
            });
        });

        generation
    }

    /// Drain every completion that has already arrived, without waiting.
    pub fn poll(&mut self) -> Vec<Stamped> {
        let mut ready = Vec::new();
        while let Ok(stamped) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            ready.push(stamped);
        }
        ready
    }

    /// Wait for the next completion. `None` when nothing is in flight.
    pub async fn next(&mut self) -> Option<Stamped> {
        if self.in_flight == 0 {
            return None;
        }
        let stamped = self.rx.recv().await?;
        self.in_flight -= 1;
        Some(stamped)
    }
}
