use crate::decision::{decide_plan, decide_section, decide_tasks, Decider};
use crate::progress::{EventType, ProgressPublisher};
use crate::report::{DanglingCitationPolicy, FinalReport, ReportAssembler};
use crate::research::convergence::{ConvergenceLoop, LoopSettings};
use crate::research::dispatcher::ToolDispatcher;
use crate::tools::registry::CapabilityRegistry;
use crate::types::{
    AppError, LoopBounds, ReportPlan, ResearchMode, Result, RunOptions, SectionDraft, SectionSpec,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

const SCOPING_GAP: &str = "Background context needed to plan a report on this query";

/// Settings shared by every run of a coordinator.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub max_concurrent_tasks: usize,
    pub capability_timeout: Duration,
    pub dangling_citations: DanglingCitationPolicy,
    /// Run a capability round over the query before planning
    pub scoping_search: bool,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 3,
            capability_timeout: Duration::from_secs(120),
            dangling_citations: DanglingCitationPolicy::Drop,
            scoping_search: false,
        }
    }
}

/// Plans a report, researches every section concurrently and assembles the
/// sections in outline order.
pub struct WorkflowCoordinator {
    decider: Arc<dyn Decider>,
    registry: Arc<CapabilityRegistry>,
    publisher: ProgressPublisher,
    settings: WorkflowSettings,
}

impl WorkflowCoordinator {
    pub fn new(
        decider: Arc<dyn Decider>,
        registry: Arc<CapabilityRegistry>,
        publisher: ProgressPublisher,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            decider,
            registry,
            publisher,
            settings,
        }
    }

    pub fn publisher(&self) -> &ProgressPublisher {
        &self.publisher
    }

    /// Execute a research run and return the report markdown.
    ///
    /// The publisher is closed when the run ends, whatever the outcome.
    pub async fn run(&self, options: RunOptions) -> Result<String> {
        let started = Instant::now();
        let result = if options.query.trim().is_empty() {
            Err(AppError::InvalidInput("Research query is empty".to_string()))
        } else {
            match options.mode {
                ResearchMode::Deep => self.run_deep(&options).await.map(|report| report.markdown),
                ResearchMode::Simple => self.run_simple(&options).await,
            }
        };

        match &result {
            Ok(_) => {
                let elapsed = started.elapsed();
                tracing::info!(elapsed_secs = elapsed.as_secs(), "Research run finished");
                self.publisher.publish(
                    EventType::ReportComplete,
                    format!(
                        "Research finished in {} minutes and {} seconds",
                        elapsed.as_secs() / 60,
                        elapsed.as_secs() % 60
                    ),
                );
            }
            Err(e) => {
                tracing::error!("Research run failed: {}", e);
                self.publisher.publish(EventType::Error, e.to_string());
            }
        }

        self.publisher.close();
        result
    }

    fn dispatcher(&self) -> ToolDispatcher {
        ToolDispatcher::new(
            self.registry.clone(),
            self.publisher.clone(),
            self.settings.max_concurrent_tasks,
            self.settings.capability_timeout,
        )
    }

    fn research_loop(&self, settings: LoopSettings) -> ConvergenceLoop {
        ConvergenceLoop::new(
            self.decider.clone(),
            self.dispatcher(),
            self.publisher.clone(),
            settings,
        )
    }

    async fn run_simple(&self, options: &RunOptions) -> Result<String> {
        let settings = LoopSettings {
            bounds: options.bounds,
            max_tasks: self.settings.max_concurrent_tasks,
            output_length: options.output_length.clone(),
            output_instructions: options.output_instructions.clone(),
        };
        let outcome = self
            .research_loop(settings)
            .run(&options.query, &options.query, "")
            .await?;
        Ok(outcome.output)
    }

    /// Plan, research every section, then write and assemble the report.
    async fn run_deep(&self, options: &RunOptions) -> Result<FinalReport> {
        let plan = self.plan(&options.query).await?;
        let drafts = self.research_sections(&plan, options.bounds).await?;
        self.write_report(&options.query, &plan, drafts).await
    }

    async fn plan(&self, query: &str) -> Result<ReportPlan> {
        tracing::info!("Building report plan");
        self.publisher
            .publish(EventType::PlanStart, "=== Building report plan ===");

        let context = match self.scope(query).await {
            Some(findings) => format!("QUERY: {}\n\nSCOPING FINDINGS:\n{}", query, findings),
            None => format!("QUERY: {}", query),
        };
        let plan = decide_plan(self.decider.as_ref(), &context).await?;
        if plan.report_outline.is_empty() {
            return Err(AppError::InvalidInput(
                "Report plan has no sections".to_string(),
            ));
        }

        for section in &plan.report_outline {
            self.publisher.publish(
                EventType::PlanSection,
                format!(
                    "Section: {}\nKey question: {}",
                    section.title, section.key_question
                ),
            );
        }

        let background = if plan.background_context.trim().is_empty() {
            "No background context was provided for the report.".to_string()
        } else {
            format!(
                "The following background context is included in the report:\n{}",
                plan.background_context
            )
        };
        self.publisher.publish(
            EventType::PlanEnd,
            format!(
                "Report plan created with {} sections: {}\n{}",
                plan.report_outline.len(),
                plan.report_title,
                background
            ),
        );
        tracing::info!(sections = plan.report_outline.len(), "Report plan ready");

        Ok(plan)
    }

    /// Scoping round ahead of planning. Failures only cost the findings.
    async fn scope(&self, query: &str) -> Option<String> {
        if !self.settings.scoping_search {
            return None;
        }

        let context = format!(
            "ORIGINAL QUERY:\n{}\n\nKNOWLEDGE GAP TO ADDRESS:\n{}",
            query, SCOPING_GAP
        );
        let mut tasks = match decide_tasks(self.decider.as_ref(), &context).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!("Scoping search skipped: {}", e);
                return None;
            }
        };
        tasks.truncate(self.settings.max_concurrent_tasks.max(1));
        if tasks.is_empty() {
            return None;
        }
        for task in &mut tasks {
            task.gap = Some(SCOPING_GAP.to_string());
        }

        tracing::info!(tasks = tasks.len(), "Running scoping search");
        let findings: Vec<String> = self
            .dispatcher()
            .dispatch(tasks)
            .await
            .into_iter()
            .map(|outcome| outcome.result.text)
            .collect();
        Some(findings.join("\n\n"))
    }

    /// Run one loop per section concurrently. Results are in outline order.
    async fn research_sections(&self, plan: &ReportPlan, bounds: LoopBounds) -> Result<Vec<String>> {
        tracing::info!("Starting research loops");
        let background = Arc::new(plan.background_context.clone());
        let mut set = JoinSet::new();

        for (index, section) in plan.report_outline.iter().enumerate() {
            let research = self.research_loop(LoopSettings {
                bounds,
                max_tasks: self.settings.max_concurrent_tasks,
                output_length: None,
                output_instructions: None,
            });
            let SectionSpec {
                title,
                key_question,
            } = section.clone();
            let background = background.clone();

            set.spawn(async move {
                let outcome = research.run(&title, &key_question, &background).await;
                (index, title, outcome)
            });
        }

        let mut slots: Vec<Option<String>> = vec![None; plan.report_outline.len()];
        while let Some(joined) = set.join_next().await {
            let (index, title, outcome) =
                joined.map_err(|e| AppError::Internal(format!("Section research task failed: {}", e)))?;
            let outcome = outcome?;
            tracing::info!(
                section = %title,
                iterations = outcome.iterations,
                elapsed_secs = outcome.elapsed.as_secs(),
                "Section research complete"
            );
            self.publisher.publish(
                EventType::SectionComplete,
                format!("Research complete for section: {}", title),
            );
            slots[index] = Some(outcome.output);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| AppError::Internal(format!("Section {} produced no result", i + 1)))
            })
            .collect()
    }

    async fn write_report(
        &self,
        query: &str,
        plan: &ReportPlan,
        drafts: Vec<String>,
    ) -> Result<FinalReport> {
        tracing::info!("Writing final report");
        let mut assembler = ReportAssembler::new(
            &plan.report_title,
            &plan.report_outline,
            self.settings.dangling_citations,
        );

        for (section, raw) in plan.report_outline.iter().zip(drafts) {
            let draft = self
                .write_section(query, assembler.draft(), &section.title, &raw)
                .await;
            assembler.append_section(&draft)?;
            self.publisher.publish(
                EventType::ReportDraft,
                format!("Section written: {}", section.title),
            );
        }

        let report = assembler.finish();
        tracing::info!(references = report.references.len(), "Final report assembled");
        Ok(report)
    }

    /// Polish one section; falls back to the raw loop output on failure.
    async fn write_section(
        &self,
        query: &str,
        report_draft: &str,
        title: &str,
        section_draft: &str,
    ) -> SectionDraft {
        let context = format!(
            "<ORIGINAL QUERY>\n{}\n</ORIGINAL QUERY>\n\n\
<CURRENT REPORT DRAFT>\n{}\n</CURRENT REPORT DRAFT>\n\n\
<TITLE OF NEXT SECTION TO WRITE>\n{}\n</TITLE OF NEXT SECTION TO WRITE>\n\n\
<DRAFT OF NEXT SECTION>\n{}\n</DRAFT OF NEXT SECTION>",
            query,
            if report_draft.trim().is_empty() {
                "No draft yet"
            } else {
                report_draft
            },
            title,
            section_draft
        );

        match decide_section(self.decider.as_ref(), &context).await {
            Ok(written) => SectionDraft {
                title: title.to_string(),
                markdown: written.next_section_markdown,
                references: written.references,
            },
            Err(e) => {
                tracing::warn!(section = %title, "Section writing failed, using raw draft: {}", e);
                self.publisher.publish(
                    EventType::Error,
                    format!("Failed to write section '{}': {}", title, e),
                );
                SectionDraft {
                    title: title.to_string(),
                    markdown: format!("## {}\n\n{}", title, section_draft),
                    references: Vec::new(),
                }
            }
        }
    }
}
