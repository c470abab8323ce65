//! Per-section history of the research loop.
//!
//! Only the newest [`IterationRecord`] is ever written to; older records are
//! frozen as soon as a new one is started.

use std::fmt::Write;

/// Everything that happened in one loop iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationRecord {
    pub gap: Option<String>,
    pub tool_calls: Vec<String>,
    pub findings: Vec<String>,
    pub reflection: Option<String>,
}

impl IterationRecord {
    fn thought_block(&self) -> Option<String> {
        self.reflection
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(|r| format!("<thought>\n{}\n</thought>", r))
    }

    fn task_block(&self) -> Option<String> {
        self.gap
            .as_deref()
            .filter(|g| !g.is_empty())
            .map(|g| format!("<task>\nAddress this knowledge gap: {}\n</task>", g))
    }

    fn action_block(&self) -> Option<String> {
        if self.tool_calls.is_empty() {
            return None;
        }
        Some(format!(
            "<action>\nCalling the following tools to address the knowledge gap:\n{}\n</action>",
            self.tool_calls.join("\n")
        ))
    }

    fn findings_block(&self) -> Option<String> {
        if self.findings.is_empty() {
            return None;
        }
        Some(format!(
            "<findings>\n{}\n</findings>",
            self.findings.join("\n\n")
        ))
    }
}

/// Ordered iteration records of one section.
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    records: Vec<IterationRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a blank record; it becomes the only writable one.
    pub fn start_iteration(&mut self) {
        self.records.push(IterationRecord::default());
    }

    fn current(&mut self) -> &mut IterationRecord {
        if self.records.is_empty() {
            self.records.push(IterationRecord::default());
        }
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    pub fn set_reflection(&mut self, reflection: impl Into<String>) {
        self.current().reflection = Some(reflection.into());
    }

    pub fn set_gap(&mut self, gap: impl Into<String>) {
        self.current().gap = Some(gap.into());
    }

    pub fn set_tool_calls(&mut self, tool_calls: Vec<String>) {
        self.current().tool_calls = tool_calls;
    }

    pub fn add_findings(&mut self, findings: impl IntoIterator<Item = String>) {
        self.current().findings.extend(findings);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Findings of every iteration, oldest first.
    pub fn all_findings(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|r| r.findings.iter().cloned())
            .collect()
    }

    /// Chronological transcript, newest last. Empty when nothing was recorded.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for (i, record) in self.records.iter().enumerate() {
            let _ = write!(out, "[Iteration {}]\n\n", i + 1);
            let blocks = [
                record.thought_block(),
                record.task_block(),
                record.action_block(),
                record.findings_block(),
            ];
            for block in blocks.into_iter().flatten() {
                out.push_str(&block);
                out.push_str("\n\n");
            }
        }
        out
    }

    /// Render the latest record's blocks for progress events.
    pub fn latest_thought(&self) -> Option<String> {
        self.latest().and_then(IterationRecord::thought_block)
    }

    pub fn latest_task(&self) -> Option<String> {
        self.latest().and_then(IterationRecord::task_block)
    }

    pub fn latest_action(&self) -> Option<String> {
        self.latest().and_then(IterationRecord::action_block)
    }

    pub fn latest_findings(&self) -> Option<String> {
        self.latest().and_then(IterationRecord::findings_block)
    }
}
