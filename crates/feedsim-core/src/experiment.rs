//! The round controller.
//!
//! An [`Experiment`] runs a fixed number of rounds. Each round:
//!
//! 1. every agent receives the same snapshot: the previous round's batch
//!    (empty in round 0),
//! 2. all turns run concurrently, and the round waits for every one of
//!    them,
//! 3. results are concatenated in agent order, each agent's events in the
//!    order it emitted them,
//! 4. the batch goes to the [`EventSink`] exactly once,
//! 5. the batch becomes the next round's snapshot.
//!
//! The controller applies no deadline of its own. A completion source that
//! never resolves stalls its round; bounding calls is the completion
//! source's job.

use feedsim_events::Event;
use futures::future::join_all;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::completion::Completion;
use crate::sink::EventSink;

/// What one round produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    /// Round index, starting at 0.
    pub round: u32,
    /// Number of events in the round's batch.
    pub events: usize,
    /// Whether the sink accepted the batch.
    pub persisted: bool,
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentSummary {
    /// The experiment identifier.
    pub experiment_id: String,
    /// Per-round summaries, in round order.
    pub rounds: Vec<RoundSummary>,
    /// The last round's batch.
    pub final_events: Vec<Event>,
}

impl ExperimentSummary {
    /// Events produced across all rounds.
    pub fn total_events(&self) -> usize {
        self.rounds.iter().map(|r| r.events).sum()
    }

    /// Rounds whose batch the sink rejected.
    pub fn failed_rounds(&self) -> impl Iterator<Item = u32> + '_ {
        self.rounds.iter().filter(|r| !r.persisted).map(|r| r.round)
    }
}

/// A bounded run of agents over rounds.
pub struct Experiment<C> {
    id: String,
    name: String,
    max_rounds: u32,
    agents: Vec<Agent<C>>,
}

impl<C: Completion> Experiment<C> {
    /// Set up a run of `max_rounds` rounds. Agents act in the given order.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        max_rounds: u32,
        agents: Vec<Agent<C>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_rounds,
            agents,
        }
    }

    /// The experiment identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The experiment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rounds a full run executes.
    pub const fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// The agents, in acting order.
    pub fn agents(&self) -> &[Agent<C>] {
        &self.agents
    }

    /// Run one round over `snapshot` and return the aggregated batch.
    pub async fn run_round(&mut self, snapshot: &[Event]) -> Vec<Event> {
        let turns = self.agents.iter_mut().map(|agent| agent.turn(snapshot));
        join_all(turns).await.into_iter().flatten().collect()
    }

    /// Run every round, persisting each batch through `sink`.
    ///
    /// Sink failures are logged and recorded in the summary; later rounds
    /// still run.
    pub async fn run<S: EventSink>(&mut self, sink: &mut S) -> ExperimentSummary {
        info!(
            experiment_id = %self.id,
            name = %self.name,
            agents = self.agents.len(),
            max_rounds = self.max_rounds,
            "Experiment starting"
        );

        let mut carried: Vec<Event> = Vec::new();
        let mut rounds = Vec::new();

        for round in 0..self.max_rounds {
            let batch = self.run_round(&carried).await;

            let persisted = match sink.persist(&self.id, round, &batch).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        experiment_id = %self.id,
                        round,
                        events = batch.len(),
                        error = %e,
                        "Failed to persist round batch"
                    );
                    false
                }
            };

            info!(
                experiment_id = %self.id,
                round,
                events = batch.len(),
                persisted,
                "Round complete"
            );

            rounds.push(RoundSummary {
                round,
                events: batch.len(),
                persisted,
            });
            carried = batch;
        }

        let summary = ExperimentSummary {
            experiment_id: self.id.clone(),
            rounds,
            final_events: carried,
        };

        info!(
            experiment_id = %self.id,
            rounds = summary.rounds.len(),
            total_events = summary.total_events(),
            "Experiment finished"
        );

        summary
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use std::collections::{BTreeSet, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use feedsim_events::EventKind;
    use feedsim_types::UserId;

    use super::*;
    use crate::completion::Prompt;
    use crate::error::PersistError;
    use crate::persona::{DraftPersona, PersonaTemplate, finalize_all};
    use crate::sink::MemorySink;

    /// Replays canned replies, optionally after a delay, and records the
    /// history each call saw.
    struct Scripted {
        replies: VecDeque<String>,
        delay: Duration,
        hang: bool,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|r| (*r).to_owned()).collect(),
                delay: Duration::ZERO,
                hang: false,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn hanging(mut self) -> Self {
            self.hang = true;
            self
        }
    }

    impl Completion for Scripted {
        fn complete(
            &mut self,
            prompt: &Prompt<'_>,
        ) -> impl Future<Output = Option<String>> + Send {
            self.seen.lock().unwrap().push(prompt.user.to_owned());
            let reply = self.replies.pop_front();
            let delay = self.delay;
            let hang = self.hang;
            async move {
                if hang {
                    std::future::pending::<()>().await;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                reply
            }
        }
    }

    fn experiment(rounds: u32, completions: Vec<Scripted>) -> Experiment<Scripted> {
        let drafts = (0..completions.len())
            .map(|i| DraftPersona::new(format!("agent{i}"), "Act naturally").unwrap())
            .collect();
        let personas = finalize_all(drafts, &PersonaTemplate::builtin().unwrap()).unwrap();
        let agents = personas
            .into_iter()
            .zip(completions)
            .map(|(persona, completion)| Agent::new(persona, completion))
            .collect();
        Experiment::new("exp-test", "test", rounds, agents)
    }

    struct FailingSink {
        calls: Vec<u32>,
    }

    impl EventSink for FailingSink {
        async fn persist(
            &mut self,
            _experiment_id: &str,
            round: u32,
            _events: &[Event],
        ) -> Result<(), PersistError> {
            self.calls.push(round);
            Err(PersistError::Backend("storage offline".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_agent_still_contributes_in_agent_order() {
        let mut exp = experiment(
            1,
            vec![
                Scripted::new(&["LikeEvent(user_id=0, post_id=1)"]),
                Scripted::new(&["LikeEvent(user_id=0, post_id=2)"]).delayed(Duration::from_secs(30)),
                Scripted::new(&["LikeEvent(user_id=0, post_id=3)"]),
            ],
        );
        let ids: Vec<UserId> = exp.agents().iter().map(Agent::id).collect();

        let mut sink = MemorySink::new();
        let summary = exp.run(&mut sink).await;

        let actors: Vec<UserId> = summary.final_events.iter().map(Event::actor).collect();
        assert_eq!(actors, ids);
        let lines: Vec<String> = summary.final_events.iter().map(ToString::to_string).collect();
        assert!(lines[1].ends_with("post_id=2)"));
    }

    #[tokio::test]
    async fn each_round_feeds_the_next() {
        let a = Scripted::new(&[
            "PostEvent(user_id=0, post=Post(id=0, content=first))",
            "LikeEvent(user_id=0, post_id=7)",
            "",
        ]);
        let b = Scripted::new(&["", "FollowEvent(follower_id=0, followee_id=1000000)", ""]);
        let seen_a = Arc::clone(&a.seen);
        let seen_b = Arc::clone(&b.seen);

        let mut exp = experiment(3, vec![a, b]);
        let mut sink = MemorySink::new();
        let summary = exp.run(&mut sink).await;

        let batches = sink.into_batches();
        assert_eq!(batches.len(), 3);

        let seen_a = seen_a.lock().unwrap();
        let seen_b = seen_b.lock().unwrap();
        assert_eq!(seen_a.len(), 3);
        assert_eq!(seen_a[0], "");
        for k in 0..2 {
            let rendered = feedsim_events::encode_batch(&batches[k].events);
            assert_eq!(seen_a[k + 1], rendered);
            assert_eq!(seen_b[k + 1], rendered);
        }
        assert_eq!(summary.rounds.iter().map(|r| r.events).collect::<Vec<_>>(), vec![1, 2, 0]);
        assert!(summary.final_events.is_empty());
    }

    #[tokio::test]
    async fn sink_sees_every_round_including_empty_ones() {
        let mut exp = experiment(4, vec![Scripted::new(&[]), Scripted::new(&[])]);
        let mut sink = MemorySink::new();
        let summary = exp.run(&mut sink).await;

        let rounds: Vec<u32> = sink.batches().iter().map(|b| b.round).collect();
        assert_eq!(rounds, vec![0, 1, 2, 3]);
        assert!(sink.batches().iter().all(|b| b.events.is_empty()));
        assert!(sink.batches().iter().all(|b| b.experiment_id == "exp-test"));
        assert_eq!(summary.total_events(), 0);
    }

    #[tokio::test]
    async fn zero_rounds_never_calls_agents_or_sink() {
        let agent = Scripted::new(&["LikeEvent(user_id=0, post_id=1)"]);
        let seen = Arc::clone(&agent.seen);
        let mut exp = experiment(0, vec![agent]);
        let mut sink = MemorySink::new();

        let summary = exp.run(&mut sink).await;
        assert!(summary.rounds.is_empty());
        assert!(sink.batches().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sink_failures_do_not_stop_the_run() {
        let mut exp = experiment(
            3,
            vec![Scripted::new(&[
                "LikeEvent(user_id=0, post_id=1)",
                "LikeEvent(user_id=0, post_id=2)",
                "LikeEvent(user_id=0, post_id=3)",
            ])],
        );
        let mut sink = FailingSink { calls: Vec::new() };
        let summary = exp.run(&mut sink).await;

        assert_eq!(sink.calls, vec![0, 1, 2]);
        assert_eq!(summary.failed_rounds().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(summary.total_events(), 3);
    }

    #[tokio::test]
    async fn identifiers_are_unique_across_a_run() {
        let reply = "PostEvent(user_id=0, post=Post(id=1, content=same))\nLikeEvent(user_id=0, post_id=1)";
        let mut exp = experiment(
            3,
            vec![
                Scripted::new(&[reply, reply, reply]),
                Scripted::new(&[reply, reply, reply]),
            ],
        );
        let mut sink = MemorySink::new();
        exp.run(&mut sink).await;

        let events: Vec<Event> = sink
            .into_batches()
            .into_iter()
            .flat_map(|b| b.events)
            .collect();
        assert_eq!(events.len(), 12);

        let event_ids: BTreeSet<_> = events.iter().map(Event::id).collect();
        assert_eq!(event_ids.len(), events.len());

        let post_ids: BTreeSet<_> = events
            .iter()
            .filter_map(|e| match e.kind() {
                EventKind::Post { post, .. } => Some(post.id()),
                _ => None,
            })
            .collect();
        assert_eq!(post_ids.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_completion_stalls_the_round() {
        // The controller has no deadline of its own: one agent that never
        // answers keeps the round, and the run, from completing.
        let mut exp = experiment(
            2,
            vec![
                Scripted::new(&["LikeEvent(user_id=0, post_id=1)"]),
                Scripted::new(&[]).hanging(),
            ],
        );
        let mut sink = MemorySink::new();

        let outcome = tokio::time::timeout(Duration::from_secs(3600), exp.run(&mut sink)).await;
        assert!(outcome.is_err());
        assert!(sink.batches().is_empty());
    }
}
