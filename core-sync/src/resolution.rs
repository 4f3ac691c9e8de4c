//! # Conflict Resolution Flow
//!
//! Drives a single conflicted entry from "revealed" to "resolved".
//!
//! ## Workflow
//!
//! 1. [`reveal`](ConflictResolutionFlow::reveal) a label; its candidate pair
//!    is fetched from the host.
//! 2. [`select`](ConflictResolutionFlow::select) one of the candidate values
//!    (or [`select_side`](ConflictResolutionFlow::select_side)).
//! 3. [`resolve`](ConflictResolutionFlow::resolve) commits the choice with
//!    `keepOriginal = (side == Local)` and reloads the entry cache.
//!
//! ## Superseded responses
//!
//! Every reveal and dismiss starts a new generation. A candidate pair that
//! arrives for an older generation is dropped, so the most recent reveal
//! always wins. A commit that completes after a newer reveal still reloads
//! the cache (or reports its failure) but leaves the new slot untouched.

use core_runtime::events::{ConflictEvent, CoreEvent, EventBus};
use core_vault::{ConflictPair, ErrorChannel, LedgerClient, MetadataCache};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::state::{ResolutionState, Side};

/// What a call to [`ConflictResolutionFlow::resolve`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The host accepted the choice and the slot returned to idle.
    Resolved,
    /// The host accepted the choice, but another label had been revealed
    /// in the meantime.
    Superseded,
    /// No choice was selected; nothing was sent.
    NothingSelected,
}

struct Inner {
    client: LedgerClient,
    cache: MetadataCache,
    errors: ErrorChannel,
    events: EventBus,
    generation: Mutex<u64>,
    state: watch::Sender<ResolutionState>,
}

impl Inner {
    fn emit(&self, event: ConflictEvent) {
        self.events.emit(CoreEvent::Conflict(event)).ok();
    }
}

#[derive(Clone)]
pub struct ConflictResolutionFlow {
    inner: Arc<Inner>,
}

impl ConflictResolutionFlow {
    pub fn new(
        client: LedgerClient,
        cache: MetadataCache,
        errors: ErrorChannel,
        events: EventBus,
    ) -> Self {
        let (state, _) = watch::channel(ResolutionState::Idle);
        Self {
            inner: Arc::new(Inner {
                client,
                cache,
                errors,
                events,
                generation: Mutex::new(0),
                state,
            }),
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionState> {
        self.inner.state.subscribe()
    }

    /// Reveal `label` and fetch its candidates.
    ///
    /// Returns the pair when it was applied, or `None` for an empty label or
    /// when a newer reveal superseded this one.
    #[instrument(skip(self))]
    pub async fn reveal(&self, label: &str) -> Result<Option<ConflictPair>> {
        if label.is_empty() {
            return Ok(None);
        }

        let generation = {
            let mut current = self.inner.generation.lock();
            *current += 1;
            self.inner.state.send_replace(ResolutionState::Revealed {
                label: label.to_string(),
                pair: None,
            });
            *current
        };
        self.inner.emit(ConflictEvent::Revealed {
            label: label.to_string(),
        });

        let fetched = self.inner.client.get_conf_pair(label).await;

        let current = self.inner.generation.lock();
        if *current != generation {
            debug!(generation, current = *current, "discarding stale conflict pair");
            self.inner.emit(ConflictEvent::StaleResponseDiscarded {
                label: label.to_string(),
            });
            return Ok(None);
        }

        match fetched {
            Ok(pair) => {
                self.inner.state.send_replace(ResolutionState::Revealed {
                    label: label.to_string(),
                    pair: Some(pair.clone()),
                });
                self.inner.emit(ConflictEvent::PairReady {
                    label: label.to_string(),
                });
                Ok(Some(pair))
            }
            Err(err) => {
                let message = err.message();
                self.inner.errors.report(message.clone());
                self.inner.emit(ConflictEvent::PairFailed {
                    label: label.to_string(),
                    message,
                });
                Err(err.into())
            }
        }
    }

    /// Select the candidate equal to `value`.
    ///
    /// Fails without changing state when `value` matches neither candidate,
    /// or when both candidates are equal (use [`select_side`](Self::select_side)).
    pub fn select(&self, value: &str) -> Result<()> {
        let _guard = self.inner.generation.lock();
        let state = self.state();
        let (Some(label), Some(pair)) = (state.label(), state.pair()) else {
            return Err(match state.label() {
                Some(label) => SyncError::PairPending {
                    label: label.to_string(),
                },
                None => SyncError::NothingRevealed,
            });
        };
        let label = label.to_string();

        let side = if pair.is_ambiguous() {
            return Err(SyncError::AmbiguousSelection { label });
        } else if value == pair.local_value {
            Side::Local
        } else if value == pair.remote_value {
            Side::Remote
        } else {
            return Err(SyncError::InvalidSelection { label });
        };

        let next = state.select(side)?;
        self.inner.state.send_replace(next);
        Ok(())
    }

    /// Select a side directly.
    pub fn select_side(&self, side: Side) -> Result<()> {
        let _guard = self.inner.generation.lock();
        let next = self.state().select(side)?;
        self.inner.state.send_replace(next);
        Ok(())
    }

    /// Commit the selected choice.
    ///
    /// Without a selection this is a no-op. On success the entry cache is
    /// reloaded before returning; on failure the candidates are shown again
    /// and the message is written to the error channel.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<ResolveOutcome> {
        let (generation, label, choice) = {
            let current = self.inner.generation.lock();
            let state = self.state();
            let Some(next) = state.begin_resolve() else {
                debug!(state = state.as_str(), "resolve without a selection");
                return Ok(ResolveOutcome::NothingSelected);
            };
            let (Some(label), Some(choice)) = (next.label(), next.choice()) else {
                return Ok(ResolveOutcome::NothingSelected);
            };
            let committed = (*current, label.to_string(), choice.clone());
            self.inner.state.send_replace(next);
            committed
        };

        let keep_original = choice.keep_original();
        self.inner.emit(ConflictEvent::Resolving {
            label: label.clone(),
            keep_original,
        });

        let committed = self.inner.client.resolve_conflict(&label, keep_original).await;

        match committed {
            Ok(()) => {
                let superseded = {
                    let current = self.inner.generation.lock();
                    let superseded = *current != generation;
                    if !superseded {
                        self.inner.state.send_replace(ResolutionState::Idle);
                    }
                    superseded
                };
                info!(label = %label, side = %choice.side, "conflict resolved");
                self.inner.emit(ConflictEvent::Resolved {
                    label: label.clone(),
                    keep_original,
                });

                self.inner.cache.reload().await;

                Ok(if superseded {
                    ResolveOutcome::Superseded
                } else {
                    ResolveOutcome::Resolved
                })
            }
            Err(err) => {
                let message = err.message();
                warn!(label = %label, error = %message, "conflict resolution rejected");
                self.inner.errors.report(message.clone());
                {
                    let current = self.inner.generation.lock();
                    if *current == generation {
                        let restored = self.state().after_failed_resolve()?;
                        self.inner.state.send_replace(restored);
                    }
                }
                self.inner.emit(ConflictEvent::ResolveFailed { label, message });
                Err(err.into())
            }
        }
    }

    /// Close the slot. Any candidate fetch still in flight is discarded.
    pub fn dismiss(&self) -> Result<()> {
        let mut current = self.inner.generation.lock();
        let state = self.state();
        if state.is_resolving() {
            return Err(SyncError::InvalidStateTransition {
                from: state.as_str().to_string(),
                to: ResolutionState::Idle.as_str().to_string(),
                reason: "A resolution is being committed".to_string(),
            });
        }
        *current += 1;
        self.inner.state.send_replace(ResolutionState::Idle);
        Ok(())
    }
}

impl std::fmt::Debug for ConflictResolutionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConflictResolutionFlow")
            .field("state", &self.inner.state.borrow().as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::testing::ScriptedBoundary;
    use bridge_traits::{args, Command};
    use serde_json::{json, Value};

    fn flow_over(boundary: Arc<ScriptedBoundary>) -> (ConflictResolutionFlow, ErrorChannel) {
        let events = EventBus::default();
        let errors = ErrorChannel::new(events.clone());
        let client = LedgerClient::new(boundary);
        let cache = MetadataCache::new(client.clone(), errors.clone(), events.clone());
        (
            ConflictResolutionFlow::new(client, cache, errors.clone(), events),
            errors,
        )
    }

    fn scripted() -> Arc<ScriptedBoundary> {
        let boundary = Arc::new(ScriptedBoundary::new());
        boundary
            .respond(Command::List, json!([]))
            .respond_for(
                Command::GetConfPair,
                "mail",
                json!({ "local_pw": "old", "remote_pw": "new" }),
            )
            .respond(Command::ResolveConflict, Value::Null);
        boundary
    }

    #[tokio::test]
    async fn test_reveal_empty_label_is_noop() {
        let boundary = scripted();
        let (flow, _) = flow_over(boundary.clone());

        assert_eq!(flow.reveal("").await.unwrap(), None);
        assert!(flow.state().is_idle());
        assert!(boundary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_select_rejects_unknown_value() {
        let (flow, _) = flow_over(scripted());
        flow.reveal("mail").await.unwrap();
        let before = flow.state();

        let err = flow.select("something else").unwrap_err();
        assert!(matches!(err, SyncError::InvalidSelection { .. }));
        assert_eq!(flow.state(), before);
    }

    #[tokio::test]
    async fn test_select_before_pair_arrives() {
        let boundary = scripted();
        let gate = boundary.hold(Command::GetConfPair, None);
        let (flow, _) = flow_over(boundary.clone());

        let reveal = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.reveal("mail").await })
        };
        boundary.wait_for_calls(Command::GetConfPair, 1).await;

        assert!(matches!(
            flow.select("old"),
            Err(SyncError::PairPending { .. })
        ));

        gate.release();
        reveal.await.unwrap().unwrap();
        flow.select("old").unwrap();
    }

    #[tokio::test]
    async fn test_ambiguous_pair_requires_side() {
        let boundary = scripted();
        boundary.respond_for(
            Command::GetConfPair,
            "same",
            json!({ "local_pw": "x", "remote_pw": "x" }),
        );
        let (flow, _) = flow_over(boundary.clone());
        flow.reveal("same").await.unwrap();

        assert!(matches!(
            flow.select("x"),
            Err(SyncError::AmbiguousSelection { .. })
        ));
        flow.select_side(Side::Remote).unwrap();
        flow.resolve().await.unwrap();

        let commit = boundary.last_call(Command::ResolveConflict).unwrap();
        assert_eq!(commit.arg_bool(args::KEEP_ORIGINAL), Some(false));
    }

    #[tokio::test]
    async fn test_pair_failure_keeps_revealed_without_pair() {
        let boundary = scripted();
        boundary.fail_for(Command::GetConfPair, "mail", BridgeError::from("entry locked"));
        let (flow, errors) = flow_over(boundary);

        assert!(flow.reveal("mail").await.is_err());
        assert_eq!(
            flow.state(),
            ResolutionState::Revealed {
                label: "mail".to_string(),
                pair: None
            }
        );
        assert_eq!(errors.latest().as_deref(), Some("entry locked"));
    }

    #[tokio::test]
    async fn test_dismiss_discards_in_flight_pair() {
        let boundary = scripted();
        let gate = boundary.hold(Command::GetConfPair, None);
        let (flow, _) = flow_over(boundary.clone());

        let reveal = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.reveal("mail").await })
        };
        boundary.wait_for_calls(Command::GetConfPair, 1).await;
        flow.dismiss().unwrap();
        gate.release();

        assert_eq!(reveal.await.unwrap().unwrap(), None);
        assert!(flow.state().is_idle());
    }

    #[tokio::test]
    async fn test_resolve_failure_restores_candidates() {
        let boundary = scripted();
        boundary.fail(Command::ResolveConflict, BridgeError::from("conflict changed"));
        let (flow, errors) = flow_over(boundary.clone());
        flow.reveal("mail").await.unwrap();
        flow.select("new").unwrap();

        assert!(flow.resolve().await.is_err());
        assert_eq!(
            flow.state(),
            ResolutionState::Revealed {
                label: "mail".to_string(),
                pair: Some(ConflictPair::new("old", "new"))
            }
        );
        assert_eq!(errors.latest().as_deref(), Some("conflict changed"));
        assert_eq!(boundary.call_count(Command::List), 0);
    }
}
