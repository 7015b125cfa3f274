//! The synchronized superstep engine
//!
//! One round moves every vertex through five strictly ordered phases:
//!
//! 1. **Compute** — every vertex active at phase entry runs its program.
//! 2. **Drain** — all outboxes are collected into one round-wide sequence.
//! 3. **Deliver** — messages are grouped by recipient and appended to the
//!    recipients' pending buffers; unroutable groups are dropped with a
//!    warning.
//! 4. **Clear** — every outbox is reset.
//! 5. **Advance** — every vertex crosses the barrier: pending becomes
//!    incoming, superstep counters increment, deliveries reactivate.
//!
//! Phase boundaries are global barriers: the driver awaits every vertex's
//! response before the next phase begins. Because delivery lands in pending
//! buffers, no vertex ever observes a message sent in the same round.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::config::RunConfig;
use crate::error::EngineError;
use crate::graph::Graph;
use crate::message::Message;
use crate::vertex::{VertexHandle, VertexId};

/// What one superstep did
#[derive(Debug, Clone, Serialize)]
pub struct SuperstepReport {
    /// Round label (cumulative over the graph's lifetime)
    pub round: u64,
    /// Vertices that took a compute step this round
    pub computed: usize,
    /// Messages collected from outboxes
    pub sent: usize,
    /// Messages appended to recipients' pending buffers
    pub delivered: usize,
    /// Messages dropped because their recipient no longer exists
    pub dropped: usize,
    /// True when no vertex is active after the round
    pub halted: bool,
}

/// Summary of a bounded run that halted
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Rounds executed by this run
    pub rounds: u64,
    /// Per-round reports, in order
    pub log: Vec<SuperstepReport>,
}

impl Graph {
    /// Execute one superstep with default bounds (diagnostic entry point)
    pub async fn execute_superstep(&self) -> Result<SuperstepReport, EngineError> {
        self.superstep_with(&RunConfig::default(), None).await
    }

    /// Drive rounds until the graph halts or a bound trips.
    ///
    /// The round limit is checked at round boundaries; the wall-clock limit
    /// is checked between phases, so an in-flight program is never
    /// interrupted. Either bound failing reports the offending round.
    pub async fn run(&self, config: &RunConfig) -> Result<RunReport, EngineError> {
        self.try_begin_run()?;
        let result = self.run_inner(config).await;
        self.end_run();
        result
    }

    async fn run_inner(&self, config: &RunConfig) -> Result<RunReport, EngineError> {
        let deadline = Instant::now() + config.timeout;
        let mut log = Vec::new();
        let mut round: u64 = 0;

        loop {
            if round >= config.max_supersteps {
                return Err(EngineError::MaxSuperstepsExceeded { round });
            }
            if Instant::now() >= deadline {
                return Err(EngineError::TimeoutExceeded { round });
            }

            let report = self.superstep_with(config, Some(deadline)).await?;
            let halted = report.halted;
            log.push(report);
            round += 1;

            if halted {
                tracing::info!(graph = %self.id(), rounds = round, "run halted");
                return Ok(RunReport { rounds: round, log });
            }
        }
    }

    async fn superstep_with(
        &self,
        config: &RunConfig,
        deadline: Option<Instant>,
    ) -> Result<SuperstepReport, EngineError> {
        let round = self.rounds.fetch_add(1, Ordering::SeqCst);
        let handles = self.list_vertices();

        // Phase 1: compute, over the active set captured at phase entry.
        let active = self.active_set(&handles).await?;
        let computed = self.phase_compute(&active, config.parallelism).await?;
        self.check_deadline(deadline, round)?;

        // Phase 2: drain every outbox into one round-wide sequence.
        let sent = self.phase_drain(&handles).await?;
        let total_sent = sent.len();
        self.check_deadline(deadline, round)?;

        // Phase 3: group by recipient and deliver.
        let (delivered, dropped) = self.phase_deliver(sent).await?;
        self.check_deadline(deadline, round)?;

        // Phase 4: reset outboxes.
        for result in join_all(handles.iter().map(|h| h.clear_outbox())).await {
            result?;
        }
        self.check_deadline(deadline, round)?;

        // Phase 5: cross the barrier.
        for result in join_all(handles.iter().map(|h| h.advance())).await {
            result?;
        }

        let halted = self.all_inactive(&handles).await?;
        tracing::debug!(
            graph = %self.id(),
            round,
            computed,
            sent = total_sent,
            delivered,
            dropped,
            halted,
            "superstep complete"
        );

        Ok(SuperstepReport {
            round,
            computed,
            sent: total_sent,
            delivered,
            dropped,
            halted,
        })
    }

    async fn active_set(
        &self,
        handles: &[VertexHandle],
    ) -> Result<Vec<VertexHandle>, EngineError> {
        let flags = join_all(handles.iter().map(|h| h.is_active())).await;
        let mut active = Vec::new();
        for (handle, flag) in handles.iter().zip(flags) {
            if flag? {
                active.push(handle.clone());
            }
        }
        Ok(active)
    }

    async fn phase_compute(
        &self,
        active: &[VertexHandle],
        parallelism: usize,
    ) -> Result<usize, EngineError> {
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
        let computations = active.iter().map(|handle| {
            let handle = handle.clone();
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.ok();
                handle.compute().await
            }
        });

        let mut computed = 0;
        for result in join_all(computations).await {
            let report = result?;
            if report.ran {
                computed += 1;
            }
        }
        Ok(computed)
    }

    async fn phase_drain(&self, handles: &[VertexHandle]) -> Result<Vec<Message>, EngineError> {
        let mut sent = Vec::new();
        for drained in join_all(handles.iter().map(|h| h.drain_outbox())).await {
            sent.extend(drained?);
        }
        Ok(sent)
    }

    async fn phase_deliver(&self, sent: Vec<Message>) -> Result<(usize, usize), EngineError> {
        let mut groups: HashMap<VertexId, Vec<Message>> = HashMap::new();
        for message in sent {
            groups.entry(message.recipient.clone()).or_default().push(message);
        }

        let mut delivered = 0;
        let mut dropped = 0;
        for (recipient, batch) in groups {
            match self.vertex(&recipient) {
                Ok(handle) => {
                    let count = batch.len();
                    handle.receive(batch).await?;
                    delivered += count;
                }
                Err(_) => {
                    dropped += batch.len();
                    tracing::warn!(
                        graph = %self.id(),
                        recipient = %recipient,
                        count = batch.len(),
                        "dropping messages for missing recipient"
                    );
                }
            }
        }
        Ok((delivered, dropped))
    }

    async fn all_inactive(&self, handles: &[VertexHandle]) -> Result<bool, EngineError> {
        for flag in join_all(handles.iter().map(|h| h.is_active())).await {
            if flag? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn check_deadline(&self, deadline: Option<Instant>, round: u64) -> Result<(), EngineError> {
        match deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(EngineError::TimeoutExceeded { round })
            }
            _ => Ok(()),
        }
    }
}
