//! The governance engine.

use charter_types::{Clock, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::applier::ChangeApplier;
use crate::config::EngineConfig;
use crate::error::{ApplyError, GovernanceError};
use crate::events::{GovernanceEvent, GovernanceEventKind, EVENT_CHANNEL_CAPACITY};
use crate::proposal::{FailureReason, Proposal, ProposalDraft, ProposalState, Vote, VetoRecord};
use crate::tally;

type ProposalHandle = Arc<Mutex<Proposal>>;

/// One state change performed by [`Engine::tick`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub proposal_id: ProposalId,
    pub from: ProposalState,
    pub to: ProposalState,
}

/// Everything a tick did, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    pub at: Option<DateTime<Utc>>,
    pub transitions: Vec<Transition>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Transitions that ended in `state`.
    pub fn ended_in(&self, state: ProposalState) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.to == state)
    }
}

/// Proposal lifecycle driver.
///
/// The proposal map is guarded by a short-lived lock used only for insert and
/// lookup; each proposal carries its own async mutex, which `tick` holds
/// across the call into the [`ChangeApplier`]. Votes on one proposal are
/// therefore linearizable with each other and with its enactment, while other
/// proposals stay available.
pub struct Engine {
    config: EngineConfig,
    applier: Arc<dyn ChangeApplier>,
    clock: Arc<dyn Clock>,
    proposals: RwLock<BTreeMap<ProposalId, ProposalHandle>>,
    /// Time of the last tick. Also serializes ticks.
    last_tick: Mutex<Option<DateTime<Utc>>>,
    events: broadcast::Sender<GovernanceEvent>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        applier: Arc<dyn ChangeApplier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GovernanceError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        info!(
            voting_period_secs = config.voting_period_secs,
            enactment_delay_secs = config.enactment_delay_secs,
            quorum = %config.quorum_threshold,
            pass = %config.pass_threshold,
            total_voting_power = config.total_voting_power,
            "Governance engine initialized"
        );

        Ok(Self {
            config,
            applier,
            clock,
            proposals: RwLock::new(BTreeMap::new()),
            last_tick: Mutex::new(None),
            events,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<GovernanceEvent> {
        self.events.subscribe()
    }

    /// Register a new proposal in `Proposed`.
    ///
    /// Keys and values are parsed here so malformed changes are refused up
    /// front. Whether the combined result is a valid ruleset is only known at
    /// enactment.
    pub fn submit_proposal(&self, draft: ProposalDraft) -> Result<Proposal, GovernanceError> {
        if draft.id.is_empty() {
            return Err(GovernanceError::InvalidProposal(
                "proposal id must not be empty".into(),
            ));
        }
        if draft.changes.is_empty() {
            return Err(GovernanceError::InvalidProposal(format!(
                "proposal {} has no changes",
                draft.id
            )));
        }
        for change in &draft.changes {
            change.parse().map_err(|e| {
                GovernanceError::InvalidProposal(format!("change `{change}`: {e}"))
            })?;
        }

        let now = self.clock.now();
        let voting_end = now
            .checked_add_signed(self.config.voting_period())
            .ok_or_else(|| window_overflow(&draft.id))?;
        let enactment = voting_end
            .checked_add_signed(self.config.enactment_delay())
            .ok_or_else(|| window_overflow(&draft.id))?;

        let mut proposals = self.proposals.write().unwrap_or_else(PoisonError::into_inner);
        if proposals.contains_key(&draft.id) {
            return Err(GovernanceError::DuplicateId(draft.id));
        }

        let proposal = Proposal::from_draft(draft, now, voting_end, enactment);
        proposals.insert(proposal.id.clone(), Arc::new(Mutex::new(proposal.clone())));
        drop(proposals);

        info!(
            proposal_id = %proposal.id,
            proposer = %proposal.proposer,
            changes = proposal.changes.len(),
            voting_end = %proposal.voting_end_time,
            "Proposal submitted"
        );
        self.emit(
            &proposal.id,
            now,
            GovernanceEventKind::Submitted {
                proposer: proposal.proposer.clone(),
                changes: proposal.changes.len(),
            },
        );

        Ok(proposal)
    }

    /// Record a vote, timestamped by the engine clock.
    pub async fn cast_vote(&self, vote: Vote) -> Result<(), GovernanceError> {
        let handle = self.handle(&vote.proposal_id)?;
        let mut proposal = handle.lock().await;
        let now = self.clock.now();
        proposal.record_vote(&vote, now)?;

        debug!(
            proposal_id = %proposal.id,
            voter_id = %vote.voter_id,
            in_favor = vote.in_favor,
            votes_for = proposal.votes_for,
            votes_against = proposal.votes_against,
            "Vote recorded"
        );
        self.emit(
            &proposal.id,
            now,
            GovernanceEventKind::VoteCast {
                voter_id: vote.voter_id,
                in_favor: vote.in_favor,
            },
        );
        Ok(())
    }

    /// A snapshot of one proposal.
    pub async fn get_proposal(&self, id: &ProposalId) -> Result<Proposal, GovernanceError> {
        let handle = self.handle(id)?;
        let proposal = handle.lock().await;
        Ok(proposal.clone())
    }

    /// Snapshots of every proposal, oldest submission first.
    pub async fn list_proposals(&self) -> Vec<Proposal> {
        let mut out = Vec::new();
        for handle in self.handles_by_submission().await {
            out.push(handle.lock().await.clone());
        }
        out
    }

    /// Administrative override: stop a proposal before its vote closes.
    pub async fn veto(
        &self,
        id: &ProposalId,
        by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Result<Proposal, GovernanceError> {
        let handle = self.handle(id)?;
        let mut proposal = handle.lock().await;
        if !proposal.state.can_transition_to(ProposalState::Vetoed) {
            return Err(GovernanceError::InvalidState {
                proposal_id: id.clone(),
                state: proposal.state,
                operation: "veto",
            });
        }

        let now = self.clock.now();
        let record = VetoRecord {
            by: by.into(),
            reason: reason.into(),
            at: now,
        };
        warn!(
            proposal_id = %id,
            by = %record.by,
            reason = %record.reason,
            from = %proposal.state,
            "Proposal vetoed"
        );
        proposal.transition(ProposalState::Vetoed);
        proposal.veto = Some(record.clone());
        self.emit(
            id,
            now,
            GovernanceEventKind::Vetoed {
                by: record.by,
                reason: record.reason,
            },
        );
        Ok(proposal.clone())
    }

    /// Advance every proposal whose deadlines `now` has reached.
    ///
    /// Safe to repeat with the same `now`. A proposal may move through
    /// several states in one call. `now` must not precede the previous tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, GovernanceError> {
        let mut last_tick = self.last_tick.lock().await;
        if let Some(previous) = *last_tick {
            if now < previous {
                return Err(GovernanceError::ClockRegression { previous, now });
            }
        }
        *last_tick = Some(now);

        let mut report = TickReport {
            at: Some(now),
            transitions: Vec::new(),
        };
        for handle in self.handles_by_submission().await {
            let mut proposal = handle.lock().await;
            self.advance(&mut proposal, now, &mut report).await;
        }

        if !report.is_empty() {
            debug!(at = %now, transitions = report.len(), "Tick complete");
        }
        Ok(report)
    }

    /// [`tick`](Self::tick) at the engine clock's current time.
    pub async fn tick_now(&self) -> Result<TickReport, GovernanceError> {
        self.tick(self.clock.now()).await
    }

    async fn advance(&self, proposal: &mut Proposal, now: DateTime<Utc>, report: &mut TickReport) {
        loop {
            let from = proposal.state;
            match from {
                ProposalState::Proposed if now >= proposal.voting_start_time => {
                    proposal.transition(ProposalState::Voting);
                    info!(proposal_id = %proposal.id, "Voting opened");
                    self.emit(
                        &proposal.id,
                        now,
                        GovernanceEventKind::VotingOpened {
                            voting_end_time: proposal.voting_end_time,
                        },
                    );
                }
                ProposalState::Voting if now >= proposal.voting_end_time => {
                    self.close_vote(proposal, now);
                }
                ProposalState::Succeeded if self.is_expired(proposal, now) => {
                    proposal.transition(ProposalState::Expired);
                    warn!(
                        proposal_id = %proposal.id,
                        enactment_time = %proposal.enactment_time,
                        "Proposal expired before enactment"
                    );
                    self.emit(&proposal.id, now, GovernanceEventKind::Expired);
                }
                ProposalState::Succeeded if now >= proposal.enactment_time => {
                    self.enact(proposal, now).await;
                }
                _ => break,
            }
            report.transitions.push(Transition {
                proposal_id: proposal.id.clone(),
                from,
                to: proposal.state,
            });
        }
    }

    fn close_vote(&self, proposal: &mut Proposal, now: DateTime<Utc>) {
        let outcome = tally::evaluate(
            proposal.votes_for,
            proposal.votes_against,
            &self.config.voting_rules(),
        );

        match outcome.verdict.failure_reason() {
            None => {
                proposal.transition(ProposalState::Succeeded);
                info!(
                    proposal_id = %proposal.id,
                    votes_for = outcome.votes_for,
                    votes_against = outcome.votes_against,
                    participation = %outcome.participation,
                    enactment_time = %proposal.enactment_time,
                    "Proposal succeeded"
                );
                self.emit(
                    &proposal.id,
                    now,
                    GovernanceEventKind::Succeeded {
                        votes_for: outcome.votes_for,
                        votes_against: outcome.votes_against,
                    },
                );
            }
            Some(reason) => {
                info!(
                    proposal_id = %proposal.id,
                    votes_for = outcome.votes_for,
                    votes_against = outcome.votes_against,
                    participation = %outcome.participation,
                    reason = %reason,
                    "Proposal failed"
                );
                proposal.fail(reason.clone());
                self.emit(&proposal.id, now, GovernanceEventKind::Failed { reason });
            }
        }
        proposal.outcome = Some(outcome);
    }

    async fn enact(&self, proposal: &mut Proposal, now: DateTime<Utc>) {
        let result = match tokio::time::timeout(
            self.config.apply_timeout(),
            self.applier.apply(&proposal.id, &proposal.changes),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApplyError::Timeout(self.config.apply_timeout_ms)),
        };

        match result {
            Ok(enactment) => {
                proposal.transition(ProposalState::Enacted);
                proposal.enacted_version = enactment.ruleset_version;
                info!(
                    proposal_id = %proposal.id,
                    ruleset_version = ?enactment.ruleset_version,
                    "Proposal enacted"
                );
                self.emit(
                    &proposal.id,
                    now,
                    GovernanceEventKind::Enacted {
                        ruleset_version: enactment.ruleset_version,
                    },
                );
            }
            Err(e) => {
                error!(
                    proposal_id = %proposal.id,
                    error = %e,
                    "Enactment failed"
                );
                let error = e.to_string();
                proposal.fail(FailureReason::ApplicationFailed(error.clone()));
                self.emit(
                    &proposal.id,
                    now,
                    GovernanceEventKind::EnactmentFailed { error },
                );
            }
        }
    }

    /// Past the last moment the proposal may still be enacted.
    fn is_expired(&self, proposal: &Proposal, now: DateTime<Utc>) -> bool {
        self.config
            .enactment_grace()
            .and_then(|grace| proposal.enactment_time.checked_add_signed(grace))
            .is_some_and(|deadline| now > deadline)
    }

    fn handle(&self, id: &ProposalId) -> Result<ProposalHandle, GovernanceError> {
        self.proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| GovernanceError::NotFound(id.clone()))
    }

    fn handles(&self) -> Vec<ProposalHandle> {
        self.proposals
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Every handle, oldest submission first, ties broken by id.
    async fn handles_by_submission(&self) -> Vec<ProposalHandle> {
        let mut keyed = Vec::new();
        for handle in self.handles() {
            let key = {
                let proposal = handle.lock().await;
                (proposal.submit_time, proposal.id.clone())
            };
            keyed.push((key, handle));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, handle)| handle).collect()
    }

    fn emit(&self, proposal_id: &ProposalId, at: DateTime<Utc>, kind: GovernanceEventKind) {
        // No subscribers is fine.
        let _ = self
            .events
            .send(GovernanceEvent::new(proposal_id.clone(), at, kind));
    }
}

fn window_overflow(id: &ProposalId) -> GovernanceError {
    GovernanceError::InvalidProposal(format!(
        "proposal {id} deadlines fall outside the representable time range"
    ))
}
