//! Bounded iterative research loop.
//!
//! Each iteration reflects on the history, evaluates what is still missing,
//! selects capability tasks for the most important gap and runs them. The
//! loop ends when the decider reports the research complete or when the
//! iteration or time budget is spent; either way a synthesis over every
//! finding is returned.

use crate::decision::{decide_gaps, decide_reflection, decide_synthesis, decide_tasks, Decider};
use crate::progress::{EventType, ProgressPublisher};
use crate::research::dispatcher::ToolDispatcher;
use crate::research::ledger::HistoryLedger;
use crate::types::{AppError, CapabilityTask, GapEvaluation, LoopBounds, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::Instrument;

/// Gap recorded when the evaluation cannot be used.
pub const UNPARSEABLE_GAP: &str = "Unable to parse the knowledge gap evaluation";

const NO_FINDINGS: &str = "No findings available yet.";

/// Per-loop settings.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub bounds: LoopBounds,
    /// Maximum number of tasks kept from one tool selection
    pub max_tasks: usize,
    /// Desired length of the synthesized output, e.g. "3 paragraphs"
    pub output_length: Option<String>,
    /// Extra instructions for the synthesized output
    pub output_instructions: Option<String>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            bounds: LoopBounds::default(),
            max_tasks: 3,
            output_length: None,
            output_instructions: None,
        }
    }
}

/// What a finished loop produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub output: String,
    pub iterations: usize,
    pub elapsed: Duration,
    pub ledger: HistoryLedger,
}

/// Loop state. `Done` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopState {
    Observe,
    Evaluate,
    Select(String),
    Execute(Vec<CapabilityTask>),
    Done,
}

pub struct ConvergenceLoop {
    decider: Arc<dyn Decider>,
    dispatcher: ToolDispatcher,
    publisher: ProgressPublisher,
    settings: LoopSettings,
}

impl ConvergenceLoop {
    pub fn new(
        decider: Arc<dyn Decider>,
        dispatcher: ToolDispatcher,
        publisher: ProgressPublisher,
        settings: LoopSettings,
    ) -> Self {
        Self {
            decider,
            dispatcher,
            publisher,
            settings,
        }
    }

    /// Research `query` until done and return the synthesized answer.
    pub async fn run(&self, title: &str, query: &str, background_context: &str) -> Result<LoopOutcome> {
        let span = tracing::info_span!("section", title = %title);
        self.run_inner(query, background_context).instrument(span).await
    }

    async fn run_inner(&self, query: &str, background_context: &str) -> Result<LoopOutcome> {
        let started = Instant::now();
        let bounds = self.settings.bounds;
        let mut ledger = HistoryLedger::new();
        let mut iteration = 0usize;
        let mut state = LoopState::Observe;

        self.publisher.publish(
            EventType::ResearchStart,
            format!("<iteration-flow>\nStarting iterative research\n{}\n</iteration-flow>", query),
        );

        loop {
            state = match state {
                LoopState::Observe => {
                    if iteration >= bounds.max_iterations {
                        tracing::info!(max_iterations = bounds.max_iterations, "Reached maximum iterations");
                        LoopState::Done
                    } else if started.elapsed() >= bounds.max_time {
                        tracing::info!(max_time_secs = bounds.max_time.as_secs(), "Reached maximum time");
                        LoopState::Done
                    } else {
                        iteration += 1;
                        ledger.start_iteration();
                        self.publisher.publish(
                            EventType::IterationStart,
                            format!(
                                "<iteration>\n=== Starting iteration {} ===\nQuery: {}\n</iteration>",
                                iteration, query
                            ),
                        );
                        self.observe(&mut ledger, query, background_context).await;
                        LoopState::Evaluate
                    }
                }

                LoopState::Evaluate => {
                    let evaluation = self
                        .evaluate(&ledger, query, background_context, iteration, started)
                        .await?;
                    if evaluation.research_complete {
                        tracing::info!(iteration, "Research marked complete");
                        LoopState::Done
                    } else {
                        let gap = evaluation
                            .outstanding_gaps
                            .into_iter()
                            .next()
                            .unwrap_or_else(|| UNPARSEABLE_GAP.to_string());
                        ledger.set_gap(gap.clone());
                        if let Some(task) = ledger.latest_task() {
                            self.publisher.publish(EventType::Task, task);
                        }
                        LoopState::Select(gap)
                    }
                }

                LoopState::Select(gap) => {
                    match self.select(&ledger, &gap, query, background_context).await {
                        Ok(tasks) => {
                            ledger.set_tool_calls(tasks.iter().map(|t| t.to_string()).collect());
                            if let Some(action) = ledger.latest_action() {
                                self.publisher.publish(EventType::Action, action);
                            }
                            LoopState::Execute(tasks)
                        }
                        Err(message) => {
                            tracing::warn!("{}", message);
                            self.publisher.publish(EventType::Error, message.clone());
                            ledger.add_findings(vec![message]);
                            LoopState::Observe
                        }
                    }
                }

                LoopState::Execute(tasks) => {
                    let outcomes = self.dispatcher.dispatch(tasks).await;
                    ledger.add_findings(outcomes.into_iter().map(|o| o.result.text));
                    if let Some(findings) = ledger.latest_findings() {
                        self.publisher.publish(EventType::Findings, findings);
                    }
                    LoopState::Observe
                }

                LoopState::Done => break,
            };
        }

        let output = self.synthesize(&ledger, query).await?;
        let elapsed = started.elapsed();
        self.publisher.publish(
            EventType::Info,
            format!(
                "Iterative research finished after {} minutes and {} seconds, {} iterations",
                elapsed.as_secs() / 60,
                elapsed.as_secs() % 60,
                iteration
            ),
        );

        Ok(LoopOutcome {
            output,
            iterations: iteration,
            elapsed,
            ledger,
        })
    }

    fn background(background_context: &str) -> String {
        if background_context.trim().is_empty() {
            String::new()
        } else {
            format!("BACKGROUND CONTEXT:\n{}\n\n", background_context)
        }
    }

    async fn observe(&self, ledger: &mut HistoryLedger, query: &str, background_context: &str) {
        let context = format!(
            "ORIGINAL QUERY:\n{}\n\n{}HISTORY OF ACTIONS, FINDINGS AND THOUGHTS:\n{}",
            query,
            Self::background(background_context),
            ledger.transcript()
        );

        let reflection = match decide_reflection(self.decider.as_ref(), &context).await {
            Ok(reflection) => reflection,
            Err(e) => {
                tracing::warn!("Reflection failed, continuing without it: {}", e);
                String::new()
            }
        };
        ledger.set_reflection(reflection);
        if let Some(thought) = ledger.latest_thought() {
            self.publisher.publish(EventType::Thought, thought);
        }
    }

    async fn evaluate(
        &self,
        ledger: &HistoryLedger,
        query: &str,
        background_context: &str,
        iteration: usize,
        started: Instant,
    ) -> Result<GapEvaluation> {
        let context = format!(
            "Current Iteration Number: {}\nTime Elapsed: {:.2} minutes of maximum {:.2} minutes\n\n\
ORIGINAL QUERY:\n{}\n\n{}HISTORY OF ACTIONS, FINDINGS AND THOUGHTS:\n{}",
            iteration,
            started.elapsed().as_secs_f64() / 60.0,
            self.settings.bounds.max_time.as_secs_f64() / 60.0,
            query,
            Self::background(background_context),
            ledger.transcript()
        );

        let sentinel = || GapEvaluation {
            research_complete: false,
            outstanding_gaps: vec![UNPARSEABLE_GAP.to_string()],
        };

        match decide_gaps(self.decider.as_ref(), &context).await {
            Ok(evaluation) if !evaluation.research_complete && evaluation.outstanding_gaps.is_empty() => {
                tracing::warn!("Evaluation reported gaps without naming any");
                Ok(sentinel())
            }
            Ok(evaluation) => Ok(evaluation),
            Err(e) if e.is_parse() => {
                tracing::warn!("Knowledge gap evaluation could not be parsed: {}", e);
                self.publisher.publish(
                    EventType::Error,
                    format!("Knowledge gap evaluation parse error: {}", e),
                );
                Ok(sentinel())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pick tasks for `gap`. The error is a readable finding.
    async fn select(
        &self,
        ledger: &HistoryLedger,
        gap: &str,
        query: &str,
        background_context: &str,
    ) -> std::result::Result<Vec<CapabilityTask>, String> {
        let context = format!(
            "ORIGINAL QUERY:\n{}\n\nKNOWLEDGE GAP TO ADDRESS:\n{}\n\n{}HISTORY OF ACTIONS, FINDINGS AND THOUGHTS:\n{}",
            query,
            gap,
            Self::background(background_context),
            ledger.transcript()
        );

        let mut tasks = decide_tasks(self.decider.as_ref(), &context)
            .await
            .map_err(|e| format!("Tool selection failed for gap '{}': {}", gap, e))?;

        tasks.truncate(self.settings.max_tasks.max(1));
        for task in &mut tasks {
            if task.gap.as_deref().map_or(true, |g| g.trim().is_empty()) {
                task.gap = Some(gap.to_string());
            }
        }
        Ok(tasks)
    }

    async fn synthesize(&self, ledger: &HistoryLedger, query: &str) -> Result<String> {
        let findings = ledger.all_findings();
        let findings = if findings.is_empty() {
            NO_FINDINGS.to_string()
        } else {
            findings.join("\n\n")
        };

        let mut guidelines = Vec::new();
        if let Some(length) = self.settings.output_length.as_deref().filter(|s| !s.is_empty()) {
            guidelines.push(format!("* The full response should be approximately {}.", length));
        }
        if let Some(instructions) = self
            .settings
            .output_instructions
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            guidelines.push(format!("* {}", instructions));
        }
        let guidelines = if guidelines.is_empty() {
            String::new()
        } else {
            format!("\n\nGUIDELINES:\n{}", guidelines.join("\n"))
        };

        let context = format!(
            "Provide a response based on the query and findings below with as much detail as possible.{}\n\n\
QUERY: {}\n\nFINDINGS:\n{}",
            guidelines, query, findings
        );

        self.publisher
            .publish(EventType::Info, "=== Drafting final response ===");
        decide_synthesis(self.decider.as_ref(), &context)
            .await
            .map_err(|e| AppError::Decision(format!("Synthesis failed: {}", e)))
    }
}
