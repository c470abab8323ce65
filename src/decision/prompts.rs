use crate::decision::DecisionKind;
use crate::tools::registry::CapabilityInfo;
use crate::types::{GapEvaluation, ReportPlan, WrittenSection};
use chrono::Utc;
use schemars::{schema_for, JsonSchema, Schema};
use serde::{Deserialize, Serialize};

/// Wire shape of the tool-selection decision.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolSelection {
    pub tasks: Vec<crate::types::CapabilityTask>,
}

fn schema_block(schema: Schema) -> String {
    let json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "Only output JSON that follows this JSON schema. Do not output anything else:\n{}",
        json
    )
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// System instructions for a decision kind.
pub fn instructions(kind: DecisionKind, capabilities: &[CapabilityInfo], max_tasks: usize) -> String {
    match kind {
        DecisionKind::Plan => format!(
            r#"You are a research manager. Today's date is {}.
Given a research query, produce an outline for a report: a list of sections,
each with a title and the key question it must answer, plus a report title.
Add at most two paragraphs of background context only when the query needs it.
Each section should cover a single topic that is independent of the others.

{}"#,
            today(),
            schema_block(schema_for!(ReportPlan))
        ),

        DecisionKind::Reflection => format!(
            r#"You are a research expert reviewing progress on a research task. Today's date is {}.
Reflect on the history of tasks, actions, findings and thoughts so far.
Note what worked, what did not, and what should be tried next.
Answer in one or two short paragraphs of plain text."#,
            today()
        ),

        DecisionKind::GapEvaluation => format!(
            r#"You evaluate the state of a research task. Today's date is {}.
Decide whether the findings so far fully answer the original query.
If not, list up to 3 specific knowledge gaps, most important first.
Each gap must be understandable without further context.

{}"#,
            today(),
            schema_block(schema_for!(GapEvaluation))
        ),

        DecisionKind::ToolSelection => {
            let available = capabilities
                .iter()
                .map(|c| format!("- {}: {}", c.name, c.description))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                r#"You choose which capabilities to run to close a knowledge gap. Today's date is {}.
Available capabilities:
{}

Call at most {} capabilities. Keep each query short (3-6 words).
Set "scope" to a website or domain when the gap concerns a specific entity.
Do not repeat approaches that already failed in the history.

{}"#,
                today(),
                available,
                max_tasks,
                schema_block(schema_for!(ToolSelection))
            )
        }

        DecisionKind::Synthesis => format!(
            r#"You are a senior researcher writing up findings. Today's date is {}.
Write a detailed answer to the query using only the findings provided.
Use Markdown headings. Cite sources inline as [n] and end with a list of
references in the form "[n] url"."#,
            today()
        ),

        DecisionKind::SectionWrite => format!(
            r#"You are an expert report writer composing a report one section at a time. Today's date is {}.
You receive the original query, the report written so far and the draft of the
next section. Rewrite the draft so it flows with the report, keep every detail,
and make the section heading match the table of contents.
Cite with numbered square brackets [1], [2] in the text and return the matching
references as "[n] url" strings. Never invent URLs.

{}"#,
            today(),
            schema_block(schema_for!(WrittenSection))
        ),
    }
}
