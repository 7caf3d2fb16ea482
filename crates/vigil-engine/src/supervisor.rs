//! Adapter supervision
//!
//! Each registered adapter runs in its own task: connect, serve until the
//! transport is lost, wait out the backoff, try again. The orchestrator
//! observes the state through a `watch` channel and hears about every
//! successful connection through an [`AdapterEvent`].

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use vigil_core::errors::VgError;
use vigil_core::{log_op_end, log_op_error, log_op_start};

use crate::adapter::{AdapterState, ChannelAdapter};
use crate::backoff::Backoff;
use crate::commands::CommandDispatch;

const OP_CONNECT: &str = "adapter_connect";
const OP_SESSION: &str = "adapter_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterEvent {
    /// The adapter finished connection setup and is ready for deliveries
    Connected { adapter: String },
}

pub struct SupervisorHandle {
    pub state: watch::Receiver<AdapterState>,
    pub task: JoinHandle<()>,
}

/// Start the lifecycle task for `adapter`. It runs until `stop` turns true
/// (or its sender is dropped).
pub fn spawn_supervisor(
    adapter: Arc<dyn ChannelAdapter>,
    backoff: Backoff,
    commands: CommandDispatch,
    events: mpsc::Sender<AdapterEvent>,
    stop: watch::Receiver<bool>,
) -> SupervisorHandle {
    let (state_tx, state_rx) = watch::channel(AdapterState::Disconnected);
    let task = tokio::spawn(supervise(adapter, backoff, commands, events, stop, state_tx));
    SupervisorHandle {
        state: state_rx,
        task,
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}

fn set_state(state_tx: &watch::Sender<AdapterState>, name: &str, state: AdapterState) {
    let previous = state_tx.send_replace(state);
    if previous != state {
        tracing::debug!(
            adapter = name,
            from = previous.as_str(),
            to = state.as_str(),
            "Adapter state change"
        );
    }
}

async fn supervise(
    adapter: Arc<dyn ChannelAdapter>,
    mut backoff: Backoff,
    commands: CommandDispatch,
    events: mpsc::Sender<AdapterEvent>,
    mut stop: watch::Receiver<bool>,
    state_tx: watch::Sender<AdapterState>,
) {
    let name = adapter.name().to_string();

    loop {
        if *stop.borrow() {
            break;
        }

        set_state(&state_tx, &name, AdapterState::Connecting);
        let started = Instant::now();
        log_op_start!(OP_CONNECT, adapter = %name, kind = adapter.kind());

        let connected = tokio::select! {
            result = adapter.connect() => result,
            _ = stopped(&mut stop) => break,
        };

        match connected {
            Ok(()) => {
                log_op_end!(
                    OP_CONNECT,
                    duration_ms = started.elapsed().as_millis() as u64,
                    adapter = %name
                );
                backoff.reset();
                set_state(&state_tx, &name, AdapterState::Connected);
                if events
                    .send(AdapterEvent::Connected {
                        adapter: name.clone(),
                    })
                    .await
                    .is_err()
                {
                    tracing::debug!(adapter = %name, "Orchestrator gone, not announcing connection");
                }

                let session_started = Instant::now();
                let session = tokio::select! {
                    result = adapter.serve(commands.clone()) => result,
                    _ = stopped(&mut stop) => break,
                };
                set_state(&state_tx, &name, AdapterState::Disconnected);
                let duration_ms = session_started.elapsed().as_millis() as u64;
                match session {
                    Ok(()) => tracing::warn!(adapter = %name, duration_ms, "Adapter session ended"),
                    Err(err) => log_op_error!(
                        OP_SESSION,
                        VgError::from(err).with_adapter(&name),
                        duration_ms = duration_ms,
                        adapter = %name
                    ),
                }
                adapter.disconnect().await;
            }
            Err(err) => {
                set_state(&state_tx, &name, AdapterState::Disconnected);
                log_op_error!(
                    OP_CONNECT,
                    VgError::from(err).with_adapter(&name),
                    duration_ms = started.elapsed().as_millis() as u64,
                    adapter = %name
                );
                adapter.disconnect().await;
            }
        }

        let delay = backoff.next_delay();
        tracing::info!(
            adapter = %name,
            delay_ms = delay.as_millis() as u64,
            attempt = backoff.failures(),
            "Reconnecting after backoff"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = stopped(&mut stop) => break,
        }
    }

    set_state(&state_tx, &name, AdapterState::Stopping);
    adapter.disconnect().await;
    set_state(&state_tx, &name, AdapterState::Disconnected);
    tracing::info!(adapter = %name, "Adapter stopped");
}
