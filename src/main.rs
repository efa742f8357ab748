//! agent-router command line entry point

use agent_router::benchmark::{run_benchmark_file, BenchmarkOptions, NO_AGENT_FOUND};
use agent_router::config::{EmbeddingProvider, RouterConfig, RoutingStrategy};
use agent_router::llm::{
    create_model_client, DefaultModelPromptProvider, ExternalModelPromptProvider, ModelClient,
    ModelPromptProvider,
};
use agent_router::observability::{init_default_logging, init_logging, LogFormat};
use agent_router::protocol::{Context, UserMessage};
use agent_router::registry::{
    JsonAgentRoutingSpecsProvider, NameSpecFilter, SpecFilter, VersionSpecFilter,
};
use agent_router::routing::{
    AgentRoutingSpecsResolver, HybridAgentRoutingSpecsResolver, LlmAgentRoutingSpecsResolver,
    VectorAgentRoutingSpecsResolver,
};
use agent_router::vector::{
    EmbeddingClient, InMemoryVectorClient, OllamaEmbeddingClient, OllamaEmbeddingConfig,
    OpenAiEmbeddingClient, OpenAiEmbeddingConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, Level};

/// Route user utterances to the best-matching agent
#[derive(Parser)]
#[command(name = "agent-router")]
#[command(about = "Routes user utterances to the best-matching agent")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "AGENT_ROUTER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a single utterance
    Resolve {
        /// User utterance to route
        #[arg(short, long)]
        input: String,
        /// Only consider the agent with this name
        #[arg(long)]
        name: Option<String>,
        /// Only consider agents with this version
        #[arg(long)]
        version: Option<String>,
    },
    /// Annotate a JSON Lines file of instructions with predicted agents
    Benchmark {
        /// Input JSON Lines file; each record needs an "instruction" field
        #[arg(short, long)]
        input: PathBuf,
        /// Output JSON Lines file
        #[arg(short, long)]
        output: PathBuf,
        /// Maximum number of records to resolve
        #[arg(long)]
        samples: Option<usize>,
        /// Maximum resolutions in flight
        #[arg(long, default_value_t = 4)]
        concurrency: usize,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        1 => init_logging(Level::DEBUG, LogFormat::Compact, false),
        _ => init_logging(Level::TRACE, LogFormat::Compact, true),
    }

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Resolve {
            input,
            name,
            version,
        } => handle_resolve_command(config, input, name, version).await,
        Commands::Benchmark {
            input,
            output,
            samples,
            concurrency,
        } => {
            let options = BenchmarkOptions {
                samples,
                concurrency,
            };
            handle_benchmark_command(config, input, output, options).await
        }
        Commands::Config { show } => handle_config_command(&config, show),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<RouterConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(RouterConfig::load_from_file(path)?);
    }

    for path_str in ["agent-router.toml", "config/agent-router.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(RouterConfig::load_from_file(&path)?);
        }
    }

    Err("No configuration file found. Provide one with -c/--config or create agent-router.toml".into())
}

/// Builds embedding clients from the `[embedding]` section
struct EmbeddingClientFactory;

impl EmbeddingClientFactory {
    fn create_client(
        config: &RouterConfig,
    ) -> Result<Arc<dyn EmbeddingClient>, Box<dyn std::error::Error>> {
        let section = config
            .embedding
            .as_ref()
            .ok_or("vector routing requires an [embedding] section")?;

        match section.provider {
            EmbeddingProvider::Ollama => {
                let mut ollama = OllamaEmbeddingConfig::default();
                if let Some(url) = &section.url {
                    ollama.url = url.clone();
                }
                if let Some(model) = &section.model {
                    ollama.model = model.clone();
                }
                Ok(Arc::new(OllamaEmbeddingClient::new(ollama)?))
            }
            EmbeddingProvider::OpenAi => {
                let mut openai = OpenAiEmbeddingConfig {
                    api_key: config.get_embedding_api_key().unwrap_or_default(),
                    batch_size: section.batch_size,
                    ..Default::default()
                };
                if let Some(url) = &section.url {
                    openai.url = url.clone();
                }
                if let Some(model) = &section.model {
                    openai.model = model.clone();
                }
                Ok(Arc::new(OpenAiEmbeddingClient::new(openai)?))
            }
        }
    }
}

fn create_prompt_provider(config: &RouterConfig) -> Arc<dyn ModelPromptProvider> {
    match &config.llm {
        Some(llm) => match &llm.prompt_file {
            Some(path) => Arc::new(ExternalModelPromptProvider::new(path, llm.agents_list)),
            None => Arc::new(DefaultModelPromptProvider::with_list_type(llm.agents_list)),
        },
        None => Arc::new(DefaultModelPromptProvider::new()),
    }
}

fn create_model_client_from_config(
    config: &RouterConfig,
) -> Result<Arc<dyn ModelClient>, Box<dyn std::error::Error>> {
    let properties = config.model_client_properties()?;
    info!(provider = %properties.provider, model = %properties.model, "Creating model client");
    Ok(create_model_client(&properties)?)
}

async fn create_vector_client(
    config: &RouterConfig,
) -> Result<Arc<InMemoryVectorClient>, Box<dyn std::error::Error>> {
    let embedding_client = EmbeddingClientFactory::create_client(config)?;
    let vector = config
        .vector
        .as_ref()
        .ok_or("vector routing requires a [vector] section")?;

    let client = InMemoryVectorClient::new(embedding_client).with_limit(vector.limit);
    if let Some(seed_file) = &vector.seed_file {
        client.seed_from_file(seed_file).await?;
    }
    Ok(Arc::new(client))
}

/// Bootstrap: wire the configured strategy with its backends
async fn build_resolver(
    config: &RouterConfig,
) -> Result<Arc<dyn AgentRoutingSpecsResolver>, Box<dyn std::error::Error>> {
    let provider = Arc::new(JsonAgentRoutingSpecsProvider::from_file(
        &config.registry.path,
    )?);

    let resolver: Arc<dyn AgentRoutingSpecsResolver> = match config.routing.strategy {
        RoutingStrategy::Llm => Arc::new(
            LlmAgentRoutingSpecsResolver::new(provider, create_model_client_from_config(config)?)
                .with_prompt_provider(create_prompt_provider(config)),
        ),
        RoutingStrategy::Vector => Arc::new(VectorAgentRoutingSpecsResolver::new(
            provider,
            create_vector_client(config).await?,
        )),
        RoutingStrategy::Hybrid => Arc::new(
            HybridAgentRoutingSpecsResolver::new(
                provider,
                create_model_client_from_config(config)?,
                create_vector_client(config).await?,
            )
            .with_prompt_provider(create_prompt_provider(config)),
        ),
    };

    info!(strategy = ?config.routing.strategy, "Resolver ready");
    Ok(resolver)
}

async fn handle_resolve_command(
    config: RouterConfig,
    input: String,
    name: Option<String>,
    version: Option<String>,
) -> Result<i32, Box<dyn std::error::Error>> {
    let resolver = build_resolver(&config).await?;

    let mut filters: Vec<Box<dyn SpecFilter>> = Vec::new();
    if let Some(name) = name {
        filters.push(Box::new(NameSpecFilter::new(name)));
    }
    if let Some(version) = version {
        filters.push(Box::new(VersionSpecFilter::new(version)));
    }

    let resolved = resolver
        .resolve_with_filters(&filters, &Context::empty(), &UserMessage::new(input))
        .await?;

    match resolved {
        Some(spec) => {
            println!("{}", serde_json::to_string_pretty(&spec)?);
            Ok(0)
        }
        None => {
            println!("{NO_AGENT_FOUND}");
            Ok(2)
        }
    }
}

async fn handle_benchmark_command(
    config: RouterConfig,
    input: PathBuf,
    output: PathBuf,
    options: BenchmarkOptions,
) -> Result<i32, Box<dyn std::error::Error>> {
    let resolver = build_resolver(&config).await?;
    let summary = run_benchmark_file(resolver, &input, &output, options).await?;

    println!(
        "processed={} matched={} unmatched={} failed={}",
        summary.processed, summary.matched, summary.unmatched, summary.failed
    );
    Ok(0)
}

fn handle_config_command(
    config: &RouterConfig,
    show: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(config)?);
    }

    info!("Configuration validation complete");
    Ok(0)
}
