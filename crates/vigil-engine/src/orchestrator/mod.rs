//! Orchestrator
//!
//! Owns the baseline (`previous`, `current`) and drives one pass per change:
//! load, diff, evaluate each adapter's policy, deliver concurrently, commit.
//! Passes never overlap. Initial baselines for newly connected adapters and
//! admin status queries are handled on the same loop, so they always see a
//! committed state.
//!
//! ```text
//! Initializing -> Running -> ShuttingDown -> Terminated
//! ```

mod dispatch;
mod source;

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use vigil_core::errors::{VgError, VgErrorKind};
use vigil_core::render::{build_report_view, header_text, render_plain_lines, RenderOptions};
use vigil_core::{
    compute_change_set, log_op_end, log_op_error, log_op_start, ChangeSet, NotificationMode,
    RenderDecision, Snapshot,
};
use vigil_core_types::CycleId;
use vigil_store::config::Config;
use vigil_store::SnapshotStore;

use crate::adapter::{AdapterState, ChannelAdapter};
use crate::backoff::Backoff;
use crate::commands::{CommandDispatch, CommandRequest, StatusQuery};
use crate::supervisor::{spawn_supervisor, AdapterEvent};

use dispatch::{dispatch, dispatch_alert, DispatchRequest};

pub use dispatch::{AlertOutcome, DeliveryOutcome, DeliveryStatus};
pub use source::{ChangeSource, WatchSource};

const OP_INITIALIZE: &str = "orchestrator_initialize";
const OP_CYCLE: &str = "pipeline_cycle";
const OP_BASELINE: &str = "initial_baseline";
const OP_SHUTDOWN: &str = "orchestrator_shutdown";

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Running,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Upper bound on a single adapter delivery
    pub delivery_timeout: Duration,
    /// How long shutdown waits for adapters to stop
    pub shutdown_grace: Duration,
    /// How long an adapter waits for a status query answer
    pub command_timeout: Duration,
    pub backoff: Backoff,
    pub render: RenderOptions,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(10),
            command_timeout: Duration::from_secs(10),
            backoff: Backoff::new(Duration::from_secs(1), Duration::from_secs(60)),
            render: RenderOptions::default(),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            delivery_timeout: config.orchestrator.delivery_timeout(),
            shutdown_grace: config.orchestrator.shutdown_grace(),
            backoff: Backoff::from_config(&config.backoff),
            render: config.status.clone(),
            ..Self::default()
        }
    }
}

/// An adapter plus the per-adapter settings the orchestrator needs
pub struct Registration {
    pub adapter: Arc<dyn ChannelAdapter>,
    pub mode: NotificationMode,
    pub destinations: Vec<String>,
}

impl Registration {
    pub fn new(
        adapter: Arc<dyn ChannelAdapter>,
        mode: NotificationMode,
        destinations: Vec<String>,
    ) -> Self {
        Self {
            adapter,
            mode,
            destinations,
        }
    }
}

pub(crate) struct Registered {
    name: String,
    adapter: Arc<dyn ChannelAdapter>,
    mode: NotificationMode,
    destinations: Arc<[String]>,
    state: watch::Receiver<AdapterState>,
    task: Option<JoinHandle<()>>,
    baseline_delivered: bool,
    /// Evaluate the next pass as an initial baseline for this adapter
    rebaseline: bool,
}

impl Registered {
    fn note_delivery(&mut self, status: &DeliveryStatus) {
        match status {
            DeliveryStatus::Failed(_) | DeliveryStatus::TimedOut => {
                if !self.rebaseline {
                    tracing::warn!(adapter = %self.name, "Next report will be a full report after a failed delivery");
                }
                self.rebaseline = true;
            }
            DeliveryStatus::Delivered | DeliveryStatus::Suppressed => self.rebaseline = false,
            DeliveryStatus::NotConnected => {}
        }
    }
}

/// Result of one pipeline pass
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The new snapshot was diffed, dispatched and committed
    Committed {
        cycle_id: CycleId,
        change_count: usize,
        deliveries: Vec<DeliveryOutcome>,
    },
    /// Byte-identical content; nothing evaluated, nothing committed
    Unchanged { cycle_id: CycleId },
    /// The snapshot could not be used; the baseline is untouched and
    /// adapters were alerted
    Skipped {
        cycle_id: CycleId,
        error: VgError,
        alerts: Vec<AlertOutcome>,
    },
}

pub struct Orchestrator {
    phase: Phase,
    store: SnapshotStore,
    settings: OrchestratorSettings,
    options: Arc<RenderOptions>,
    previous: Option<Arc<Snapshot>>,
    current: Arc<Snapshot>,
    /// Set while the most recent load attempt failed
    load_error: Option<VgError>,
    registrations: Vec<Registered>,
    stop_tx: watch::Sender<bool>,
    events_tx: mpsc::Sender<AdapterEvent>,
    events_rx: mpsc::Receiver<AdapterEvent>,
    commands_tx: mpsc::Sender<CommandRequest>,
    commands_rx: mpsc::Receiver<CommandRequest>,
}

impl Orchestrator {
    /// Load the initial snapshot and take the adapter registrations.
    ///
    /// # Errors
    ///
    /// - The snapshot load error, when the initial document is unusable
    /// - `NoUsableAdapters`, when the document loads but `registrations` is empty
    pub async fn initialize(
        store: SnapshotStore,
        settings: OrchestratorSettings,
        registrations: Vec<Registration>,
    ) -> Result<Self, VgError> {
        let started = Instant::now();
        log_op_start!(OP_INITIALIZE, adapters = registrations.len() as u64);

        let result = Self::build(store, settings, registrations).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(orchestrator) => log_op_end!(
                OP_INITIALIZE,
                duration_ms = duration_ms,
                facility_count = orchestrator.current.facilities().len() as u64
            ),
            Err(err) => log_op_error!(OP_INITIALIZE, err.clone(), duration_ms = duration_ms),
        }
        result
    }

    async fn build(
        store: SnapshotStore,
        settings: OrchestratorSettings,
        registrations: Vec<Registration>,
    ) -> Result<Self, VgError> {
        let current = store
            .load()
            .await
            .map_err(|e| e.with_op(OP_INITIALIZE))?;

        if registrations.is_empty() {
            return Err(VgError::new(VgErrorKind::NoUsableAdapters)
                .with_op(OP_INITIALIZE)
                .with_message("no adapter is enabled and registered"));
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_rx);
        let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (commands_tx, commands_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let registrations = registrations
            .into_iter()
            .map(|r| {
                let (_, state) = watch::channel(AdapterState::Disconnected);
                Registered {
                    name: r.adapter.name().to_string(),
                    adapter: r.adapter,
                    mode: r.mode,
                    destinations: r.destinations.into(),
                    state,
                    task: None,
                    baseline_delivered: false,
                    rebaseline: false,
                }
            })
            .collect();

        Ok(Self {
            phase: Phase::Initializing,
            store,
            options: Arc::new(settings.render.clone()),
            settings,
            previous: None,
            current: Arc::new(current),
            load_error: None,
            registrations,
            stop_tx,
            events_tx,
            events_rx,
            commands_tx,
            commands_rx,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_deref()
    }

    /// Adapter names in registration order
    pub fn adapter_names(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.name.as_str())
    }

    /// Current connection state of the named adapter
    pub fn adapter_state(&self, name: &str) -> Option<AdapterState> {
        self.registrations
            .iter()
            .find(|r| r.name == name)
            .map(|r| *r.state.borrow())
    }

    /// Spawn one supervisor per registered adapter and enter `Running`.
    pub fn start_adapters(&mut self) {
        if self.phase != Phase::Initializing {
            return;
        }
        let dispatch = CommandDispatch::new(self.commands_tx.clone(), self.settings.command_timeout);
        for registered in &mut self.registrations {
            let handle = spawn_supervisor(
                Arc::clone(&registered.adapter),
                self.settings.backoff.clone(),
                dispatch.clone(),
                self.events_tx.clone(),
                self.stop_tx.subscribe(),
            );
            registered.state = handle.state;
            registered.task = Some(handle.task);
        }
        self.phase = Phase::Running;
        tracing::info!(adapters = self.registrations.len() as u64, "Orchestrator running");
    }

    /// Run until `shutdown` resolves, then stop every adapter.
    ///
    /// # Errors
    ///
    /// Never fails once running; the signature leaves room for fatal
    /// conditions discovered at run time.
    pub async fn run<S, F>(mut self, mut source: S, shutdown: F) -> Result<(), VgError>
    where
        S: ChangeSource,
        F: Future<Output = ()>,
    {
        self.start_adapters();
        tokio::pin!(shutdown);
        let mut watch_open = true;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                Some(event) = self.events_rx.recv() => self.on_adapter_event(event).await,
                Some(request) = self.commands_rx.recv() => self.answer(request),
                change = source.next_change(), if watch_open => match change {
                    Some(event) => {
                        tracing::debug!(raw_signals = event.raw_signals as u64, "Snapshot change signalled");
                        self.run_cycle().await;
                    }
                    None => {
                        watch_open = false;
                        tracing::error!("Snapshot watch ended; no further cycles will run");
                    }
                },
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// One pipeline pass: load, diff, dispatch, commit.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let cycle_id = CycleId::new();
        let started = Instant::now();
        log_op_start!(OP_CYCLE, cycle_id = %cycle_id);

        let next = match self.store.load().await {
            Ok(snapshot) => snapshot,
            Err(error) => return self.skip(cycle_id, error, started).await,
        };

        if next.digest().is_some() && next.digest() == self.current.digest() {
            self.load_error = None;
            tracing::info!(cycle_id = %cycle_id, "Snapshot content unchanged, nothing to do");
            log_op_end!(
                OP_CYCLE,
                duration_ms = started.elapsed().as_millis() as u64,
                cycle_id = %cycle_id,
                outcome = "unchanged"
            );
            return CycleOutcome::Unchanged { cycle_id };
        }

        let change_set = match compute_change_set(Some(&self.current), &next) {
            Ok(change_set) => Arc::new(change_set),
            Err(error) => return self.skip(cycle_id, error, started).await,
        };
        let next = Arc::new(next);
        self.load_error = None;

        tracing::info!(
            cycle_id = %cycle_id,
            changes = change_set.change_count() as u64,
            "Change set computed"
        );

        let request = DispatchRequest {
            cycle_id: &cycle_id,
            change_set: Arc::clone(&change_set),
            snapshot: Arc::clone(&next),
            options: Arc::clone(&self.options),
            is_initial_baseline: false,
            timeout: self.settings.delivery_timeout,
        };
        let deliveries = dispatch(request, self.registrations.iter()).await;
        for (registered, outcome) in self.registrations.iter_mut().zip(&deliveries) {
            registered.note_delivery(&outcome.status);
        }

        self.previous = Some(std::mem::replace(&mut self.current, next));

        log_op_end!(
            OP_CYCLE,
            duration_ms = started.elapsed().as_millis() as u64,
            cycle_id = %cycle_id,
            outcome = "committed",
            delivered = deliveries
                .iter()
                .filter(|d| matches!(d.status, DeliveryStatus::Delivered))
                .count() as u64
        );

        CycleOutcome::Committed {
            cycle_id,
            change_count: change_set.change_count(),
            deliveries,
        }
    }

    async fn skip(&mut self, cycle_id: CycleId, error: VgError, started: Instant) -> CycleOutcome {
        log_op_error!(
            OP_CYCLE,
            error.clone(),
            duration_ms = started.elapsed().as_millis() as u64,
            cycle_id = %cycle_id
        );
        tracing::warn!(cycle_id = %cycle_id, "Keeping the last good snapshot");

        let alerts = dispatch_alert(
            &cycle_id,
            &self.options.load_error_notice,
            self.settings.delivery_timeout,
            self.registrations.iter(),
        )
        .await;
        for registered in &mut self.registrations {
            registered.rebaseline = true;
        }
        self.load_error = Some(error.clone());

        CycleOutcome::Skipped {
            cycle_id,
            error,
            alerts,
        }
    }

    /// Deliver the initial baseline to `adapter` unless it already had one.
    ///
    /// Returns `None` when the adapter is unknown or its baseline was
    /// already delivered.
    pub async fn deliver_initial_baseline(&mut self, adapter: &str) -> Option<DeliveryOutcome> {
        let index = self
            .registrations
            .iter()
            .position(|r| r.name == adapter && !r.baseline_delivered)?;

        let cycle_id = CycleId::new();
        let started = Instant::now();
        log_op_start!(OP_BASELINE, cycle_id = %cycle_id, adapter = adapter);

        let change_set = match compute_change_set(None, &self.current) {
            Ok(change_set) => Arc::new(change_set),
            Err(error) => {
                log_op_error!(
                    OP_BASELINE,
                    error,
                    duration_ms = started.elapsed().as_millis() as u64,
                    cycle_id = %cycle_id,
                    adapter = adapter
                );
                return None;
            }
        };

        let request = DispatchRequest {
            cycle_id: &cycle_id,
            change_set,
            snapshot: Arc::clone(&self.current),
            options: Arc::clone(&self.options),
            is_initial_baseline: true,
            timeout: self.settings.delivery_timeout,
        };
        let outcome = dispatch(request, std::iter::once(&self.registrations[index]))
            .await
            .into_iter()
            .next()?;

        // A baseline missed while disconnected is retried on the next connect.
        let registered = &mut self.registrations[index];
        if !matches!(outcome.status, DeliveryStatus::NotConnected) {
            registered.baseline_delivered = true;
        }
        registered.note_delivery(&outcome.status);

        log_op_end!(
            OP_BASELINE,
            duration_ms = started.elapsed().as_millis() as u64,
            cycle_id = %cycle_id,
            adapter = adapter,
            status = outcome.status.as_str()
        );
        Some(outcome)
    }

    /// Handle adapter events already queued, without waiting for more.
    pub async fn process_pending_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.on_adapter_event(event).await;
        }
    }

    async fn on_adapter_event(&mut self, event: AdapterEvent) {
        match event {
            AdapterEvent::Connected { adapter } => {
                tracing::info!(adapter = %adapter, "Adapter connected");
                self.deliver_initial_baseline(&adapter).await;
            }
        }
    }

    /// Answer a status query from committed state.
    pub fn answer(&self, request: CommandRequest) {
        tracing::debug!(
            adapter = %request.adapter,
            query = ?request.query,
            "Answering status query"
        );
        let lines = self.status_lines(request.query);
        if request.reply.send(lines).is_err() {
            tracing::debug!(adapter = %request.adapter, "Status query abandoned by adapter");
        }
    }

    /// Text for a status query against the current baseline.
    ///
    /// While the latest load attempt has failed, reports and status lines
    /// are preceded by the load error notice.
    pub fn status_lines(&self, query: StatusQuery) -> Vec<String> {
        let mut lines = Vec::new();
        if self.load_error.is_some() && query != StatusQuery::Diff {
            lines.push(self.options.load_error_notice.clone());
        }
        lines.extend(self.query_lines(query));
        lines
    }

    fn query_lines(&self, query: StatusQuery) -> Vec<String> {
        let now = Utc::now();
        match query {
            StatusQuery::Report | StatusQuery::Status => {
                let change_set = self.change_set_since_previous();
                match build_report_view(
                    RenderDecision::RenderFull,
                    &change_set,
                    &self.current,
                    &self.options,
                    now,
                ) {
                    Some(view) if query == StatusQuery::Status => vec![header_text(&view)],
                    Some(view) => render_plain_lines(&view),
                    None => Vec::new(),
                }
            }
            StatusQuery::Diff => {
                let Some(previous) = self.previous.as_deref() else {
                    return vec!["No earlier snapshot to compare against.".to_string()];
                };
                let change_set = self.change_set_since_previous();
                if !change_set.has_any_change() {
                    return vec![format!(
                        "No changes between the snapshots of {} and {}.",
                        previous.generated_at().format("%Y-%m-%d %H:%M:%S UTC"),
                        self.current.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
                    )];
                }
                build_report_view(
                    RenderDecision::RenderChangesOnly,
                    &change_set,
                    &self.current,
                    &self.options,
                    now,
                )
                .map(|view| render_plain_lines(&view))
                .unwrap_or_default()
            }
        }
    }

    fn change_set_since_previous(&self) -> ChangeSet {
        compute_change_set(self.previous.as_deref(), &self.current).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Committed snapshots failed to diff");
            ChangeSet::default()
        })
    }

    /// Stop every adapter, waiting at most the grace period.
    pub async fn shutdown(&mut self) {
        if matches!(self.phase, Phase::ShuttingDown | Phase::Terminated) {
            return;
        }
        self.phase = Phase::ShuttingDown;
        let started = Instant::now();
        log_op_start!(OP_SHUTDOWN, adapters = self.registrations.len() as u64);

        self.stop_tx.send_replace(true);

        let tasks: Vec<JoinHandle<()>> = self
            .registrations
            .iter_mut()
            .filter_map(|r| r.task.take())
            .collect();
        let aborts: Vec<_> = tasks.iter().map(|t| t.abort_handle()).collect();

        if tokio::time::timeout(self.settings.shutdown_grace, join_all(tasks))
            .await
            .is_err()
        {
            tracing::warn!(
                grace_ms = self.settings.shutdown_grace.as_millis() as u64,
                "Adapters did not stop within the grace period, aborting"
            );
            for abort in aborts {
                abort.abort();
            }
        }

        self.phase = Phase::Terminated;
        log_op_end!(OP_SHUTDOWN, duration_ms = started.elapsed().as_millis() as u64);
    }
}
