//! Research Orchestration
//!
//! The research side of a run, from the top down:
//!
//! - [`coordinator::WorkflowCoordinator`] - plans the report, runs one loop
//!   per section concurrently and assembles the sections in outline order
//! - [`convergence::ConvergenceLoop`] - bounded observe / evaluate / select /
//!   execute loop for a single question
//! - [`dispatcher::ToolDispatcher`] - concurrent, isolated execution of the
//!   capability tasks chosen in one iteration
//! - [`ledger::HistoryLedger`] - append-only record of a loop's iterations,
//!   rendered as the transcript every decision sees
//!
//! # Usage
//!
//! ```ignore
//! use deep_research::research::coordinator::{WorkflowCoordinator, WorkflowSettings};
//!
//! let coordinator = WorkflowCoordinator::new(decider, registry, publisher, WorkflowSettings::default());
//! let report = coordinator
//!     .run(RunOptions {
//!         query: "How do Rust async runtimes schedule tasks?".to_string(),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("{}", report);
//! ```
//!
//! # Workflow
//!
//! 1. **Plan** - outline, key questions and background context
//! 2. **Research** - one convergence loop per section, all concurrent
//! 3. **Write** - each section polished in outline order
//! 4. **Reconcile** - citations renumbered into one global list
//! 5. **Assemble** - title, contents, sections, references

/// Bounded iterative research loop.
pub mod convergence;
/// Report planning, section fan-out and assembly.
pub mod coordinator;
/// Concurrent capability task execution.
pub mod dispatcher;
/// Per-section iteration history.
pub mod ledger;

pub use convergence::{ConvergenceLoop, LoopOutcome, LoopSettings};
pub use coordinator::{WorkflowCoordinator, WorkflowSettings};
pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use ledger::{HistoryLedger, IterationRecord};
