use anyhow::{bail, Context};
use deep_research::cli::output::Output;
use deep_research::cli::Cli;
use deep_research::decision::{LlmDecider, ModelTiers};
use deep_research::llm::LLMClient;
use deep_research::progress::{EventType, ProgressPublisher};
use deep_research::research::{WorkflowCoordinator, WorkflowSettings};
use deep_research::tools::crawl::SiteCrawlCapability;
use deep_research::tools::registry::CapabilityRegistry;
use deep_research::tools::search::WebSearchCapability;
use deep_research::utils::toml_config::{LogFormat, ModelConfig, ResearchConfig};
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &ResearchConfig, span_timings: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let span_events = if span_timings {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_span_events(span_events);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn read_query(cli: &Cli) -> anyhow::Result<String> {
    let query = match &cli.query {
        Some(query) => query.clone(),
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprint!("What would you like to research? ");
                io::stderr().flush()?;
                let mut line = String::new();
                stdin.lock().read_line(&mut line)?;
                line
            } else {
                io::read_to_string(stdin)?
            }
        }
    };

    let query = query.trim().to_string();
    if query.is_empty() {
        bail!("No research query given");
    }
    Ok(query)
}

fn client_for(tier: &str, model: &ModelConfig) -> anyhow::Result<Arc<dyn LLMClient>> {
    let provider = model
        .to_provider(|name| std::env::var(name).ok())
        .with_context(|| format!("configuring the {} model", tier))?;
    let client = provider
        .create_client()
        .with_context(|| format!("creating the {} model client", tier))?;
    Ok(client)
}

async fn run(cli: Cli, output: &Output) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = ResearchConfig::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    cli.apply_overrides(&mut config);
    config.validate().context("validating configuration")?;
    config.validate_env()?;

    init_tracing(&config, cli.tracing);

    let query = read_query(&cli)?;
    let options = cli.run_options(query, &config);

    let models = ModelTiers {
        reasoning: client_for("reasoning", &config.models.reasoning)?,
        main: client_for("main", &config.models.main)?,
        fast: client_for("fast", &config.models.fast)?,
    };

    let mut search = WebSearchCapability::new(config.search.options());
    let mut crawl = SiteCrawlCapability::new(
        config.search.crawl_max_pages,
        config.search.content_length_limit,
    )?;
    if config.search.summarize {
        search = search.with_summarizer(models.fast.clone());
        crawl = crawl.with_summarizer(models.fast.clone());
    }

    let mut registry = CapabilityRegistry::new();
    registry.register(Arc::new(search));
    registry.register(Arc::new(crawl));

    let decider = LlmDecider::new(
        models,
        registry.infos(),
        config.research.max_concurrent_tasks,
    );

    let publisher = ProgressPublisher::new();
    let mode = format!("{:?}", options.mode).to_lowercase();
    if cli.verbose {
        output.banner();
        output.kv("query", &options.query);
        output.kv("mode", &mode);
        output.kv("run", &publisher.correlation_id().to_string());
    } else {
        output.info(&format!("Researching in {} mode: {}", mode, options.query));
    }

    // Quiet runs still surface capability failures
    let verbose = cli.verbose;
    let mut events = publisher.subscribe();
    let printer_output = if output.colored {
        Output::new()
    } else {
        Output::no_color()
    };
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if verbose {
                printer_output.event(&event);
            } else if event.event_type == EventType::ToolError {
                printer_output.warning(&event.message);
            }
        }
    });

    let coordinator = WorkflowCoordinator::new(
        Arc::new(decider),
        Arc::new(registry),
        publisher,
        WorkflowSettings {
            max_concurrent_tasks: config.research.max_concurrent_tasks,
            capability_timeout: config.research.capability_timeout(),
            dangling_citations: config.research.dangling_citations,
            scoping_search: config.research.scoping_search,
        },
    );

    let result = coordinator.run(options).await;
    // The publisher is closed by now, so the printer drains and exits
    let _ = printer.await;
    let report = result.context("research failed")?;

    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, &report)
                .await
                .with_context(|| format!("writing report to {}", path.display()))?;
            output.success(&format!("Report written to {}", path.display()));
        }
        None => println!("{}", report),
    }

    Ok(())
}
