//! CLI interface for voicesig

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::VoiceConfig;
use crate::embedding::{select_embedder, EmbedderConfig, ProviderKind};
use crate::voice::{PromptOptions, SignatureStore, VoiceManager, VoiceSignature};

#[derive(Parser)]
#[command(name = "voicesig")]
#[command(about = "Learn a writer's voice from samples and keep it honest with feedback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a fresh voice signature from sample files
    Learn {
        /// Writer identifier
        #[arg(short, long)]
        writer: String,
        /// Plain-text sample files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Merge more samples into an existing signature
    Add {
        #[arg(short, long)]
        writer: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Add labeled counter-examples (what this voice is NOT)
    Contrast {
        #[arg(short, long)]
        writer: String,
        /// Contrast label, e.g. "ai_generated"
        #[arg(short, long)]
        label: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Record "sounds like me" / "doesn't sound like me" feedback on a text
    Feedback {
        #[arg(short, long)]
        writer: String,
        /// File holding the judged text
        file: PathBuf,
        /// The text does NOT sound like the writer
        #[arg(long)]
        negative: bool,
        /// Feedback strength in (0, 1]
        #[arg(short, long, default_value_t = 1.0)]
        strength: f64,
    },
    /// Score a text against the stored signature
    Evaluate {
        #[arg(short, long)]
        writer: String,
        file: PathBuf,
    },
    /// Compare which of two texts sounds more like the writer
    Compare {
        #[arg(short, long)]
        writer: String,
        file_a: PathBuf,
        file_b: PathBuf,
    },
    /// Print the voice-conditioning prompt fragment
    Prompt {
        #[arg(short, long)]
        writer: String,
        /// Sample files to include as exemplars
        #[arg(short, long)]
        exemplar: Vec<PathBuf>,
        /// Maximum exemplars to include
        #[arg(long, default_value_t = 3)]
        max_exemplars: usize,
    },
    /// Show a stored signature (or list all writers)
    Status {
        #[arg(short, long)]
        writer: Option<String>,
    },
    /// Delete a stored signature
    Delete {
        #[arg(short, long)]
        writer: String,
    },
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = VoiceConfig::load()?;

    let mut providers = config.providers.clone();
    fill_api_keys_from_env(&mut providers);

    let embedder = select_embedder(&providers)?;
    let store = SignatureStore::new(&config.database_path).await?;
    let mut manager = VoiceManager::with_chunk_size(embedder, store, config.chunk_size);

    match cli.command {
        Commands::Learn { writer, files } => {
            let samples = read_files(&files).await?;
            let signature = manager.setup_voice(&writer, samples).await?;
            print_signature(&signature);
        }
        Commands::Add { writer, files } => {
            let samples = read_files(&files).await?;
            let signature = manager.add_samples(&writer, samples).await?;
            print_signature(&signature);
        }
        Commands::Contrast { writer, label, files } => {
            let texts = read_files(&files).await?;
            let signature = manager.add_contrast(&writer, texts, &label).await?;
            println!("Contrast '{}' recorded for '{}'", label, writer);
            println!("Contrast anchors: {}", signature.contrast_vectors.len());
        }
        Commands::Feedback { writer, file, negative, strength } => {
            let text = read_file(&file).await?;
            let outcome = manager.feedback(&writer, &text, !negative, strength).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Evaluate { writer, file } => {
            let text = read_file(&file).await?;
            let evaluation = manager.evaluate(&writer, &text).await?;
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
        }
        Commands::Compare { writer, file_a, file_b } => {
            let text_a = read_file(&file_a).await?;
            let text_b = read_file(&file_b).await?;
            let comparison = manager.compare(&writer, &text_a, &text_b).await?;
            println!("{}", serde_json::to_string_pretty(&comparison)?);
        }
        Commands::Prompt { writer, exemplar, max_exemplars } => {
            // Exemplars are session-scoped; for a one-shot CLI run the
            // caller supplies them as files
            if !exemplar.is_empty() {
                let samples = read_files(&exemplar).await?;
                manager.add_exemplars(&writer, samples);
            }
            let options = PromptOptions {
                include_exemplars: !exemplar.is_empty(),
                max_exemplars,
            };
            let prompt = manager.compose_prompt(&writer, &options).await?;
            println!("{}", prompt);
        }
        Commands::Status { writer } => match writer {
            Some(writer) => match manager.load_voice(&writer).await? {
                Some(signature) => print_signature(&signature),
                None => println!("No signature stored for '{}'", writer),
            },
            None => {
                let writers = manager.list_voices().await?;
                if writers.is_empty() {
                    println!("No voice signatures stored yet");
                } else {
                    for writer in writers {
                        println!("{}", writer);
                    }
                }
            }
        },
        Commands::Delete { writer } => {
            if manager.delete_voice(&writer).await? {
                println!("Deleted signature for '{}'", writer);
            } else {
                println!("No signature stored for '{}'", writer);
            }
        }
    }

    Ok(())
}

/// Fill missing API keys from the environment. This happens at the CLI
/// boundary only; the engine itself takes explicit configuration.
fn fill_api_keys_from_env(providers: &mut [EmbedderConfig]) {
    for provider in providers.iter_mut() {
        if provider.api_key.is_some() {
            continue;
        }
        let var = match provider.provider {
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Hash => continue,
        };
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                provider.api_key = Some(key);
            }
        }
    }
}

async fn read_file(path: &PathBuf) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<String>> {
    let mut texts = Vec::with_capacity(paths.len());
    for path in paths {
        texts.push(read_file(path).await?);
    }
    Ok(texts)
}

fn print_signature(signature: &VoiceSignature) {
    println!("Writer:      {}", signature.writer_id);
    println!("Samples:     {}", signature.sample_count);
    println!("Words:       {}", signature.total_word_count);
    println!("Dimension:   {}", signature.dimension);
    println!("Threshold:   {:.3}", signature.threshold);
    println!("Confidence:  {:.0}%", signature.confidence * 100.0);
    println!(
        "Feedback:    {} positive / {} negative",
        signature.positive_feedback_count, signature.negative_feedback_count
    );
    let labels = signature.contrast_labels();
    if !labels.is_empty() {
        println!("Contrasts:   {}", labels.join(", "));
    }
    println!("Updated:     {}", signature.updated_at.format("%Y-%m-%d %H:%M UTC"));
}
