//! `strata assemble`: build a token-budgeted context.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use strata_config::{AppConfig, GeneratorConfig};
use strata_context::{
    AssemblyRequest, ContextPipeline, ConversationTurn, DriftMonitor, RollingSummarizer, SmartContextAssembler,
    TracingSink,
};
use strata_core::{BudgetPatch, Document, GenerationError, TextGenerator};
use strata_providers::{FallbackGenerator, OpenAiCompatGenerator};
use strata_retrieval::FastReranker;

#[derive(Debug, Args)]
pub struct AssembleArgs {
    /// System instructions
    #[arg(short, long, required_unless_present = "system_file", conflicts_with = "system_file")]
    pub system: Option<String>,

    /// Read system instructions from a file
    #[arg(long)]
    pub system_file: Option<PathBuf>,

    /// JSON array of retrieved documents
    #[arg(short, long)]
    pub documents: Option<PathBuf>,

    /// JSON array of conversation turns (strings or {role, content} objects)
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Earlier summary to carry over (repeatable, oldest first)
    #[arg(long = "summary")]
    pub summaries: Vec<String>,

    /// Current task state, rendered last
    #[arg(short, long)]
    pub task: Option<String>,

    /// Rerank documents against this query before assembly
    #[arg(short, long)]
    pub query: Option<String>,

    /// Override the total token limit
    #[arg(long)]
    pub total_tokens: Option<usize>,

    /// Override the RAG token limit
    #[arg(long)]
    pub rag_tokens: Option<usize>,

    /// Never call the generator; condense dropped history locally
    #[arg(long)]
    pub local_summary: bool,

    /// Print `{context, report}` as JSON instead of the bare context
    #[arg(long)]
    pub report: bool,
}

pub async fn run(config_path: Option<&Path>, args: AssembleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let assembler = build_assembler(&config, &args)?;
    let request = build_request(&args)?;

    let assembled = match args.query.as_deref() {
        Some(query) => {
            let reranker = Arc::new(FastReranker::new(config.rerank.clone()));
            let pipeline = ContextPipeline::new(reranker, Arc::new(assembler), config.rerank.top_k);
            pipeline.prepare(query, request).await.assembled
        }
        None => assembler.assemble(request).await,
    };

    if assembled.report.over_budget {
        tracing::warn!(
            tokens = assembled.report.total_tokens,
            budget = assembled.report.budget,
            "Assembled context is over budget"
        );
    }

    if args.report {
        println!("{}", serde_json::to_string_pretty(&assembled)?);
    } else {
        println!("{}", assembled.context);
    }
    Ok(())
}

/// Assembler wired from config, with command-line budget overrides applied.
pub fn build_assembler(
    config: &AppConfig,
    args: &AssembleArgs,
) -> Result<SmartContextAssembler, Box<dyn std::error::Error>> {
    let mut assembler = SmartContextAssembler::new(config.budget.clone())?
        .with_summarizer(Arc::new(build_summarizer(config, args.local_summary)))
        .with_drift_monitor(Arc::new(DriftMonitor::with_sinks(vec![Box::new(TracingSink)])));

    if args.total_tokens.is_some() || args.rag_tokens.is_some() {
        assembler.update_budget(BudgetPatch {
            total_token_limit: args.total_tokens,
            rag_token_limit: args.rag_tokens,
            ..Default::default()
        })?;
    }
    Ok(assembler)
}

/// Generator-backed summarizer when enabled and a key is configured,
/// otherwise the local fallback.
pub fn build_summarizer(config: &AppConfig, force_local: bool) -> RollingSummarizer {
    let settings = &config.summarizer;
    if force_local || !settings.enabled {
        return RollingSummarizer::local();
    }

    let entry_timeout = Duration::from_secs(settings.timeout_secs);
    match summary_generator(&config.generator, entry_timeout) {
        Ok(generator) => {
            // Each chain entry gets the full timeout.
            let entries = 1 + config.generator.fallback_models.len() as u32;
            let mut summarizer = RollingSummarizer::new(generator)
                .with_timeout(entry_timeout * entries)
                .with_temperature(settings.temperature);
            if let Some(max_tokens) = settings.max_tokens {
                summarizer = summarizer.with_max_tokens(max_tokens);
            }
            summarizer
        }
        Err(e) => {
            tracing::debug!(error = %e, "Summary generator unavailable, using local summaries");
            RollingSummarizer::local()
        }
    }
}

/// The configured model, chained with `fallback_models` on the same
/// endpoint when any are set.
fn summary_generator(
    config: &GeneratorConfig,
    entry_timeout: Duration,
) -> Result<Arc<dyn TextGenerator>, GenerationError> {
    let primary: Arc<dyn TextGenerator> = Arc::new(OpenAiCompatGenerator::from_config(config)?);
    if config.fallback_models.is_empty() {
        return Ok(primary);
    }

    let api_key = config.api_key.as_deref().unwrap_or_default();
    let mut chain = FallbackGenerator::new("summary-chain").add(primary, entry_timeout);
    for model in &config.fallback_models {
        let fallback =
            OpenAiCompatGenerator::new(format!("openai-compat/{model}"), &config.base_url, api_key, model)?;
        chain = chain.add(Arc::new(fallback), entry_timeout);
    }
    tracing::debug!(entries = chain.len(), "Summary generator fallback chain built");
    Ok(Arc::new(chain))
}

pub fn build_request(args: &AssembleArgs) -> Result<AssemblyRequest, Box<dyn std::error::Error>> {
    let system = match (&args.system, &args.system_file) {
        (Some(system), _) => system.clone(),
        (None, Some(path)) => super::read_input(path)?,
        (None, None) => return Err("either --system or --system-file is required".into()),
    };

    let mut request = AssemblyRequest::new(system).with_summaries(args.summaries.clone());
    if let Some(task) = &args.task {
        request = request.with_active_task(task.clone());
    }
    if let Some(path) = &args.documents {
        let documents: Vec<Document> = super::read_json(path)?;
        request = request.with_documents(documents);
    }
    if let Some(path) = &args.history {
        let history: Vec<ConversationTurn> = super::read_json(path)?;
        request = request.with_history(history);
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> AssembleArgs {
        AssembleArgs {
            system: Some("You are helpful.".into()),
            system_file: None,
            documents: None,
            history: None,
            summaries: Vec::new(),
            task: None,
            query: None,
            total_tokens: None,
            rag_tokens: None,
            local_summary: false,
            report: false,
        }
    }

    #[test]
    fn overrides_patch_the_budget() {
        let args = AssembleArgs {
            total_tokens: Some(5000),
            rag_tokens: Some(100),
            ..args()
        };
        let assembler = build_assembler(&AppConfig::default(), &args).unwrap();
        assert_eq!(assembler.budget().total_limit(), 5000);
        assert_eq!(assembler.budget().rag_budget(), 100);
    }

    #[test]
    fn invalid_override_is_an_error() {
        let args = AssembleArgs {
            total_tokens: Some(0),
            ..args()
        };
        assert!(build_assembler(&AppConfig::default(), &args).is_err());
    }

    #[test]
    fn request_reads_history_and_documents() {
        let mut history = tempfile::NamedTempFile::new().unwrap();
        write!(history, r#"["hello", {{"role": "assistant", "content": "hi"}}]"#).unwrap();
        let mut docs = tempfile::NamedTempFile::new().unwrap();
        write!(docs, r#"[{{"pageContent": "doc body", "metadata": {{"title": "T"}}}}]"#).unwrap();

        let args = AssembleArgs {
            history: Some(history.path().to_path_buf()),
            documents: Some(docs.path().to_path_buf()),
            task: Some("finish".into()),
            ..args()
        };
        let request = build_request(&args).unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].role.as_deref(), Some("assistant"));
        assert_eq!(request.documents[0].page_content, "doc body");
        assert_eq!(request.active_task.as_deref(), Some("finish"));
    }

    #[test]
    fn system_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "from file").unwrap();
        let args = AssembleArgs {
            system: None,
            system_file: Some(file.path().to_path_buf()),
            ..args()
        };
        assert_eq!(build_request(&args).unwrap().system_instructions, "from file");
    }

    #[test]
    fn local_summary_without_api_key() {
        let summarizer = build_summarizer(&AppConfig::default(), false);
        assert!(format!("{summarizer:?}").contains("generator: None"));
    }

    #[test]
    fn fallback_models_build_a_generator_chain() {
        let mut config = AppConfig::default();
        config.generator.api_key = Some("sk-test".into());
        let summarizer = build_summarizer(&config, false);
        assert!(format!("{summarizer:?}").contains("\"openai-compat\""));

        config.generator.fallback_models = vec!["gpt-4o".into(), "gpt-3.5-turbo".into()];
        let debug = format!("{:?}", build_summarizer(&config, false));
        assert!(debug.contains("\"summary-chain\""));
        assert!(debug.contains("timeout: 90s"));

        assert!(format!("{:?}", build_summarizer(&config, true)).contains("generator: None"));
    }
}
