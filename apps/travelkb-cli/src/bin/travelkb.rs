//! travelkb: ask about Vietnamese provinces from the command line.
//!
//! Startup loads the corpus and alias table, builds the encoder and the
//! embedding index, and sets up the generation providers once; every
//! subcommand then works against those shared, read-only pieces.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use travelkb_core::traits::Embedder;
use travelkb_core::{AliasTable, Config, Corpus, Settings};
use travelkb_embed::load_encoder;
use travelkb_rag::scope::NLU_FALLBACK;
use travelkb_rag::{AnswerSource, Orchestrator, OrchestratorOptions, ProviderRegistry, Reply, SynthesisOptions, Synthesizer, Turn};
use travelkb_vector::{EmbeddingIndex, Retriever};

#[derive(Parser)]
#[command(name = "travelkb")]
#[command(about = "Vietnamese province travel knowledge: direct lookups and retrieval-backed answers")]
#[command(version)]
struct Cli {
    /// Directory that relative corpus, alias and model paths resolve against
    #[arg(long, global = true, env = "TRAVELKB_HOME", default_value = ".")]
    base: PathBuf,

    /// Debug logging (RUST_LOG wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one message through the fallback pipeline
    Ask {
        message: String,
        /// Intent label from an upstream classifier
        #[arg(long, default_value = NLU_FALLBACK)]
        intent: String,
        /// Location entity from an upstream extractor
        #[arg(long)]
        entity: Option<String>,
    },
    /// Templated answer for a knowledge intent, e.g. ask_cuisine
    Lookup {
        #[arg(long)]
        intent: String,
        #[arg(long)]
        entity: Option<String>,
    },
    /// Show ranked chunks for a query
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Read messages from stdin, one per line
    Chat,
    /// Corpus, alias, index and provider statistics
    Inspect,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Config::load()?.settings().context("invalid configuration")?;
    let app = App::build(settings, &cli.base)?;

    match cli.command {
        Command::Ask { message, intent, entity } => {
            let mut turn = Turn::new(message).with_intent(intent);
            if let Some(e) = entity { turn = turn.with_entity("location", e); }
            print_reply(&app.orchestrator.handle(&turn));
        }
        Command::Lookup { intent, entity } => print_reply(&app.orchestrator.lookup(&intent, entity.as_deref())),
        Command::Search { query, k } => app.search(&query, k.unwrap_or(app.settings.top_k)),
        Command::Chat => app.chat()?,
        Command::Inspect => app.inspect(),
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::registry().with(fmt::layer().with_writer(io::stderr)).with(filter).init();
}

struct App {
    settings: Settings,
    orchestrator: Orchestrator,
    aliases_from: String,
}

impl App {
    fn build(settings: Settings, base: &Path) -> Result<Self> {
        let corpus_dir = settings.corpus_path(base);
        let corpus = Arc::new(
            Corpus::load_dir(&corpus_dir).with_context(|| format!("loading corpus from {}", corpus_dir.display()))?,
        );

        let alias_path = settings.alias_path(base);
        let (aliases, aliases_from) = if alias_path.is_file() {
            let table = AliasTable::load(&alias_path).with_context(|| format!("loading aliases from {}", alias_path.display()))?;
            (table, alias_path.display().to_string())
        } else {
            info!(path = %alias_path.display(), "alias file not found, using the built-in table");
            (AliasTable::builtin()?, "built-in".to_string())
        };
        let dangling = aliases.dangling(&corpus).len();
        if dangling > 0 { warn!(dangling, "some aliases point at provinces missing from the corpus"); }

        let encoder: Arc<dyn Embedder> = Arc::from(load_encoder(&settings, base).context("loading encoder")?);
        let index = EmbeddingIndex::build_with_progress(&corpus, encoder.as_ref()).context("building embedding index")?;
        let retriever = Retriever::new(Arc::new(index), encoder)?.with_cache(settings.query_cache_capacity);

        let synthesizer = Synthesizer::new(ProviderRegistry::from_settings(&settings), SynthesisOptions::from_settings(&settings));
        let orchestrator = Orchestrator::new(
            corpus,
            Arc::new(aliases),
            Arc::new(retriever),
            synthesizer,
            OrchestratorOptions::from_settings(&settings),
        );
        Ok(Self { settings, orchestrator, aliases_from })
    }

    fn search(&self, query: &str, k: usize) {
        let rewritten = self.orchestrator.aliases().rewrite(query);
        if rewritten != query { println!("(searching for: {rewritten})"); }
        let result = self.orchestrator.retriever().search(&rewritten, k);
        if result.is_empty() {
            println!("No results.");
            return;
        }
        let gate = self.orchestrator.gate();
        for (i, hit) in result.iter().enumerate() {
            println!("{:>2}. score={:.4}  {}", i + 1, hit.score, hit.chunk.tag());
            println!("    {}", hit.chunk.text);
        }
        let verdict = if gate.admits(&result) { "answer" } else { "decline" };
        println!("\nthreshold {:.2} -> {verdict}", gate.threshold());
    }

    fn chat(&self) -> Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        loop {
            print!("> ");
            stdout.flush()?;
            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 { break; }
            let line = line.trim();
            if line.is_empty() { continue; }
            if matches!(line, "exit" | "quit") { break; }
            print_reply(&self.orchestrator.handle(&Turn::new(line).with_intent(NLU_FALLBACK)));
            println!();
        }
        Ok(())
    }

    fn inspect(&self) {
        let o = &self.orchestrator;
        let corpus = o.corpus();
        let index = o.retriever().index();
        println!("Corpus: {} provinces, {} chunks", corpus.len(), index.len());
        for skipped in corpus.skipped() { println!("  skipped: {skipped}"); }
        println!("  {}", corpus.names().collect::<Vec<_>>().join(", "));

        let aliases = o.aliases();
        println!("Aliases ({}): {} entries, {} canonical names", self.aliases_from, aliases.len(), aliases.canonicals().len());
        for c in aliases.conflicts() { println!("  conflict: {} -> {} (dropped {})", c.alias, c.kept, c.dropped); }
        let dangling = aliases.dangling(corpus);
        if !dangling.is_empty() {
            let mut targets: Vec<&str> = dangling.iter().map(|e| e.canonical.as_str()).collect();
            targets.sort_unstable();
            targets.dedup();
            println!("  {} aliases point at provinces without records: {}", dangling.len(), targets.join(", "));
        }

        println!("Index: encoder {} (dim {})", index.encoder_id(), index.dim());
        println!("Gate: threshold {:.2}, top_k {}", self.settings.confidence_threshold, self.settings.top_k);
        println!("Providers ({}):", String::from(self.settings.generation_provider));
        let registry = o.synthesizer().registry();
        if registry.descriptors().is_empty() { println!("  none, answers are extractive"); }
        for d in registry.descriptors() {
            match &d.reason {
                Some(reason) => println!("  {:<12} off ({reason})", d.name),
                None => println!("  {:<12} on", d.name),
            }
        }
    }
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Deferred => println!("(not handled by the fallback path)"),
        Reply::Synthesized(answer) => {
            println!("{}", answer.text);
            match &answer.source {
                AnswerSource::Generated { provider } => info!(provider = %provider, "generated answer"),
                AnswerSource::Extractive { province } => info!(province = %province, failed = answer.failures.len(), "extractive answer"),
            }
        }
        other => {
            if let Some(text) = other.text() { println!("{text}"); }
        }
    }
}
