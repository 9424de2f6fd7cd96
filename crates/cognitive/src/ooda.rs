//! The observation loop — the tutor's heartbeat.
//!
//! Runs one tool exchange per cycle, records what the reasoner did, then
//! sleeps until the next cycle. Sleep is interruptible: the gateway wakes
//! the loop early when a trigger fires, and a watch channel stops it.

use crate::exchange::{ExchangeReport, ToolExchange};
use chrono::Utc;
use oxtutor_core::provider::Provider;
use oxtutor_core::tool::ToolRegistry;
use oxtutor_core::{CycleRecord, Message, NextAction, SessionState};
use oxtutor_tools::{END_CYCLE_TOOL, ObservationState};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, watch};
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "\
You are an attentive tutor sitting beside a student who is working through \
a problem. You observe through your tools: listen to the transcript, look \
at the whiteboard, check how long the student has been silent. You act \
only when it helps: a quiet student making progress should be left alone; \
a student who is stuck or asks a question deserves a short, warm, concrete \
response. Never lecture. When you have decided what to do, call \
end_observation_cycle with your next action and reasoning.";

const CYCLE_PROMPT: &str = "\
Begin an observation cycle. Check the session status first, then pull \
whatever observations you need (transcript, whiteboard). Decide whether to \
intervene, act if so, and finish by calling end_observation_cycle.";

/// How fast to come back when the reasoner asked to observe again.
const OBSERVE_AGAIN_INTERVAL: f64 = 2.0;

/// How many of the reasoner's previous cycle summaries to carry forward.
const HISTORY_DEPTH: usize = 4;

/// Where the loop currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Running,
    Sleeping,
    Stopped,
}

/// Knobs the gateway passes down from configuration.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub max_tool_iterations: u32,
    pub cycle_cooldown_seconds: f64,
    /// Sampling temperature for every reasoner call the loop makes.
    pub temperature: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: 10,
            cycle_cooldown_seconds: 5.0,
            temperature: 0.3,
        }
    }
}

/// The per-session observe-orient-decide-act loop.
pub struct ToolOodaLoop {
    exchange: ToolExchange,
    tools: Arc<ToolRegistry>,
    session: Arc<Mutex<SessionState>>,
    observation: Arc<Mutex<ObservationState>>,
    cooldown: Duration,
    phase: Arc<StdMutex<LoopPhase>>,
    stop: watch::Receiver<bool>,
    wake: Arc<Notify>,
    /// The reasoner's final text from recent cycles, newest last.
    history: Vec<Message>,
}

impl ToolOodaLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
        session: Arc<Mutex<SessionState>>,
        observation: Arc<Mutex<ObservationState>>,
        config: LoopConfig,
        stop: watch::Receiver<bool>,
        wake: Arc<Notify>,
    ) -> Self {
        let exchange = ToolExchange::new(provider, model, config.temperature)
            .with_max_iterations(config.max_tool_iterations)
            .with_terminal_tool(END_CYCLE_TOOL);
        Self {
            exchange,
            tools,
            session,
            observation,
            cooldown: Duration::from_secs_f64(config.cycle_cooldown_seconds),
            phase: Arc::new(StdMutex::new(LoopPhase::Idle)),
            stop,
            wake,
            history: Vec::new(),
        }
    }

    /// A handle the gateway can poll for the current phase.
    pub fn phase_handle(&self) -> Arc<StdMutex<LoopPhase>> {
        self.phase.clone()
    }

    fn set_phase(&self, phase: LoopPhase) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = phase;
    }

    /// Run until stopped. Intended to be spawned as its own task.
    pub async fn run(mut self) {
        info!("Observation loop starting");

        loop {
            if *self.stop.borrow() {
                break;
            }

            self.set_phase(LoopPhase::Running);
            let next_interval = match self.run_cycle().await {
                Ok(interval) => interval,
                Err(e) => {
                    warn!(error = %e, "Observation cycle failed, backing off");
                    self.cooldown
                }
            };

            self.set_phase(LoopPhase::Sleeping);
            debug!(seconds = next_interval.as_secs_f64(), "Sleeping until next cycle");

            tokio::select! {
                _ = tokio::time::sleep(next_interval) => {}
                _ = self.wake.notified() => {
                    debug!("Woken early by trigger");
                }
                _ = self.stop.changed() => {}
            }
        }

        self.set_phase(LoopPhase::Stopped);
        info!("Observation loop stopped");
    }

    /// One full cycle: prompt, exchange, record. Returns the sleep
    /// interval before the next cycle.
    async fn run_cycle(&mut self) -> Result<Duration, oxtutor_core::Error> {
        let cycle_number = {
            let session = self.session.lock().await;
            session.cycle_history.len() as u64 + 1
        };
        debug!(cycle_number, "Starting observation cycle");

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(SYSTEM_PROMPT));
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(CYCLE_PROMPT));

        let report = self.exchange.run(&mut messages, &self.tools).await?;
        let record = Self::derive_record(cycle_number, &report);

        info!(
            cycle_number,
            tools = ?record.tools_called,
            action = ?record.final_action,
            spoke = record.spoke_to_student,
            "Cycle complete"
        );

        let next_action = record.final_action;
        self.session.lock().await.add_cycle_record(record);

        if !report.content.is_empty() {
            self.history.push(Message::assistant(&report.content));
            if self.history.len() > HISTORY_DEPTH {
                let excess = self.history.len() - HISTORY_DEPTH;
                self.history.drain(..excess);
            }
        }

        let interval = if next_action == Some(NextAction::ObserveAgain) {
            OBSERVE_AGAIN_INTERVAL
        } else {
            self.observation.lock().await.interval_seconds
        };
        Ok(Duration::from_secs_f64(interval.max(0.1)))
    }

    /// Distill an exchange into the cycle's permanent record.
    fn derive_record(cycle_number: u64, report: &ExchangeReport) -> CycleRecord {
        let tools_called = report
            .tools_called()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (final_action, reasoning) = match report.invocation_args(END_CYCLE_TOOL) {
            Some(args) => (
                args["next_action"].as_str().and_then(NextAction::parse),
                args["reasoning"].as_str().map(str::to_string),
            ),
            None => (None, None),
        };

        let spoken_text = report
            .invocation_args("speak")
            .and_then(|args| args["text"].as_str())
            .map(str::to_string);

        CycleRecord {
            cycle_number,
            tools_called,
            final_action,
            spoke_to_student: spoken_text.is_some(),
            spoken_text,
            reasoning,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ToolInvocation;

    fn report(invocations: Vec<(&str, serde_json::Value)>) -> ExchangeReport {
        ExchangeReport {
            content: String::new(),
            invocations: invocations
                .into_iter()
                .map(|(name, arguments)| ToolInvocation {
                    name: name.into(),
                    arguments,
                })
                .collect(),
            hit_ceiling: false,
        }
    }

    #[test]
    fn record_captures_speak_and_end_cycle() {
        let r = report(vec![
            ("get_session_status", serde_json::json!({})),
            ("speak", serde_json::json!({"text": "Try factoring first."})),
            (
                END_CYCLE_TOOL,
                serde_json::json!({"next_action": "wait", "reasoning": "gave a hint"}),
            ),
        ]);

        let record = ToolOodaLoop::derive_record(3, &r);
        assert_eq!(record.cycle_number, 3);
        assert_eq!(
            record.tools_called,
            vec!["get_session_status", "speak", "end_observation_cycle"]
        );
        assert_eq!(record.final_action, Some(NextAction::Wait));
        assert_eq!(record.reasoning.as_deref(), Some("gave a hint"));
        assert!(record.spoke_to_student);
        assert_eq!(record.spoken_text.as_deref(), Some("Try factoring first."));
    }

    #[test]
    fn record_without_end_cycle_has_no_action() {
        let r = report(vec![("get_whiteboard", serde_json::json!({}))]);
        let record = ToolOodaLoop::derive_record(1, &r);
        assert!(record.final_action.is_none());
        assert!(record.reasoning.is_none());
        assert!(!record.spoke_to_student);
    }

    #[test]
    fn unparseable_next_action_is_dropped() {
        let r = report(vec![(
            END_CYCLE_TOOL,
            serde_json::json!({"next_action": "dance"}),
        )]);
        let record = ToolOodaLoop::derive_record(1, &r);
        assert!(record.final_action.is_none());
    }

    mod lifecycle {
        use super::*;
        use async_trait::async_trait;
        use oxtutor_core::error::ProviderError;
        use oxtutor_core::provider::{ProviderRequest, ProviderResponse};

        struct QuietProvider;

        #[async_trait]
        impl Provider for QuietProvider {
            fn name(&self) -> &str {
                "quiet"
            }
            async fn complete(
                &self,
                _request: ProviderRequest,
            ) -> Result<ProviderResponse, ProviderError> {
                Ok(ProviderResponse {
                    message: Message::assistant("all quiet, waiting"),
                    finish_reason: Some("stop".into()),
                    model: "mock".into(),
                    usage: None,
                })
            }
        }

        #[tokio::test(start_paused = true)]
        async fn loop_records_cycles_and_stops() {
            let session = Arc::new(Mutex::new(SessionState::new("s1", "alice")));
            let observation = Arc::new(Mutex::new(ObservationState::new(5.0)));
            let (stop_tx, stop_rx) = watch::channel(false);
            let wake = Arc::new(Notify::new());

            let ooda = ToolOodaLoop::new(
                Arc::new(QuietProvider),
                "mock",
                Arc::new(ToolRegistry::new()),
                session.clone(),
                observation,
                LoopConfig::default(),
                stop_rx,
                wake,
            );
            let phase = ooda.phase_handle();
            let handle = tokio::spawn(ooda.run());

            // Let two cycles and their sleeps elapse.
            tokio::time::sleep(Duration::from_secs(11)).await;
            assert!(session.lock().await.cycle_history.len() >= 2);

            stop_tx.send(true).unwrap();
            handle.await.unwrap();
            assert_eq!(*phase.lock().unwrap(), LoopPhase::Stopped);
        }

        struct TemperatureProbe {
            seen: StdMutex<Vec<f32>>,
        }

        #[async_trait]
        impl Provider for TemperatureProbe {
            fn name(&self) -> &str {
                "temperature-probe"
            }
            async fn complete(
                &self,
                request: ProviderRequest,
            ) -> Result<ProviderResponse, ProviderError> {
                self.seen
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .push(request.temperature);
                Ok(ProviderResponse {
                    message: Message::assistant("noted"),
                    finish_reason: Some("stop".into()),
                    model: "mock".into(),
                    usage: None,
                })
            }
        }

        #[tokio::test(start_paused = true)]
        async fn configured_temperature_reaches_provider() {
            let provider = Arc::new(TemperatureProbe {
                seen: StdMutex::new(Vec::new()),
            });
            let session = Arc::new(Mutex::new(SessionState::new("s1", "alice")));
            let observation = Arc::new(Mutex::new(ObservationState::new(5.0)));
            let (stop_tx, stop_rx) = watch::channel(false);

            let ooda = ToolOodaLoop::new(
                provider.clone(),
                "mock",
                Arc::new(ToolRegistry::new()),
                session,
                observation,
                LoopConfig {
                    temperature: 0.7,
                    ..LoopConfig::default()
                },
                stop_rx,
                Arc::new(Notify::new()),
            );
            let handle = tokio::spawn(ooda.run());

            tokio::time::sleep(Duration::from_secs(1)).await;
            stop_tx.send(true).unwrap();
            handle.await.unwrap();

            let seen = provider.seen.lock().unwrap();
            assert!(!seen.is_empty());
            assert!(seen.iter().all(|t| (*t - 0.7).abs() < f32::EPSILON));
        }
    }
}
