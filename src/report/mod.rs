//! Report Assembly
//!
//! Builds the final Markdown document from independently written sections:
//!
//! - [`citations`](crate::report::citations) - merges per-section reference
//!   lists into one global, gap-free numbering
//! - [`headings`](crate::report::headings) - shifts section headings under
//!   the report title
//!
//! # Layout
//!
//! ```text
//! # <report title>
//!
//! ## Table of Contents
//!
//! 1. <section 1>
//! 2. <section 2>
//!
//! <section 1, headings from level 2>
//!
//! <section 2, headings from level 2>
//!
//! ## References
//!
//! [1] https://...
//! [2] https://...
//! ```
//!
//! Sections must be appended in outline order; the reference numbering
//! depends on it.

/// Citation renumbering across sections.
pub mod citations;
/// Markdown heading level normalization.
pub mod headings;

pub use citations::{DanglingCitationPolicy, GlobalReferenceTable};
pub use headings::normalize_headings;

use crate::types::{Result, SectionDraft, SectionSpec};

/// The assembled report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReport {
    pub title: String,
    pub markdown: String,
    /// Global `"[n] url"` lines, ascending
    pub references: Vec<String>,
}

/// Incrementally assembles a report, one section at a time.
pub struct ReportAssembler {
    title: String,
    draft: String,
    references: GlobalReferenceTable,
    policy: DanglingCitationPolicy,
}

impl ReportAssembler {
    /// Start a report with its title and table of contents.
    pub fn new(title: &str, outline: &[SectionSpec], policy: DanglingCitationPolicy) -> Self {
        let toc = outline
            .iter()
            .enumerate()
            .map(|(i, section)| format!("{}. {}", i + 1, section.title))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            title: title.to_string(),
            draft: format!("# {}\n\n## Table of Contents\n\n{}\n\n", title, toc),
            references: GlobalReferenceTable::new(),
            policy,
        }
    }

    /// The report written so far, without references.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn references(&self) -> &GlobalReferenceTable {
        &self.references
    }

    /// Renumber the section's citations, normalize its headings and append it.
    /// Returns the markdown that was appended.
    pub fn append_section(&mut self, section: &SectionDraft) -> Result<String> {
        let reconciled = citations::reconcile(
            &section.markdown,
            &section.references,
            &mut self.references,
            self.policy,
        )?;
        let markdown = normalize_headings(&reconciled.markdown);

        self.draft.push_str(&markdown);
        self.draft.push_str("\n\n");
        Ok(markdown)
    }

    /// Append the reference list and return the finished report.
    pub fn finish(self) -> FinalReport {
        let references = self.references.lines();
        let markdown = format!(
            "{}## References\n\n{}",
            self.draft,
            references.join("  \n")
        );

        FinalReport {
            title: self.title,
            markdown,
            references,
        }
    }
}
