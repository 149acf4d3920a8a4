mod display;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use phytoscan_ai::{ConfidencePolicy, ResultNormalizer, SymptomCatalog};
use phytoscan_core::{DetectionType, LocationData, LocationSource, WorkflowConfig};
use phytoscan_sync::{
    ExifLocation, FixedLocation, GeocodedProvider, LocationProvider, PredictionClient,
    ReverseGeocoder,
};
use phytoscan_workflow::{DetectionStatus, FinalResult, WorkflowSession};
use tracing::info;

#[derive(Parser)]
#[command(name = "phytoscan", about = "Verify plant-disease detections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workflow configuration file (JSON)
    #[arg(long, global = true, env = "PHYTOSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Use the staged results-first workflow preset
    #[arg(long, global = true, conflicts_with = "config")]
    staged: bool,

    /// Print JSON instead of a card
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a saved classifier response and show the result
    Inspect {
        /// Path to the response JSON
        file: PathBuf,
        #[arg(long, default_value = "leaf")]
        part: DetectionType,
    },
    /// List the symptom checklist for a disease
    Symptoms {
        #[arg(required_unless_present = "list")]
        disease: Option<String>,
        #[arg(long)]
        part: Option<DetectionType>,
        /// List the diseases with a catalog entry instead
        #[arg(long, conflicts_with = "disease")]
        list: bool,
    },
    /// Show the configured workflow steps
    Steps,
    /// Classify an image, answer the verification steps, and submit
    Verify {
        /// Path to the image (JPEG)
        image: PathBuf,
        #[arg(long, default_value = "leaf")]
        part: DetectionType,
        #[arg(long, env = "PHYTOSCAN_API_URL", default_value = "http://localhost:8000")]
        api_url: String,
        #[arg(long, env = "PHYTOSCAN_TOKEN")]
        token: Option<String>,
        /// Whether the detection matches what is seen on the plant
        #[arg(long)]
        correct: bool,
        /// Unified symptom indices to tick (see `symptoms` output)
        #[arg(long = "symptom", value_delimiter = ',')]
        symptoms: Vec<usize>,
        #[arg(long)]
        feedback: Option<String>,
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
        /// Confirm the location is accurate
        #[arg(long)]
        location_ok: bool,
        /// Seconds to keep waiting for a classification that missed the
        /// fail-open deadline
        #[arg(long, default_value_t = 30)]
        wait: u64,
        /// Skip reverse geocoding of the location
        #[arg(long)]
        no_geocode: bool,
        /// Classify and show the checklist without submitting
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.staged)?;

    match cli.command {
        Commands::Inspect { file, part } => cmd_inspect(&config, &file, part, cli.json),
        Commands::Symptoms {
            disease,
            part,
            list,
        } => match disease {
            Some(disease) if !list => cmd_symptoms(&disease, part, cli.json),
            _ => cmd_list_diseases(part, cli.json),
        },
        Commands::Steps => cmd_steps(config, cli.json),
        Commands::Verify {
            image,
            part,
            api_url,
            token,
            correct,
            symptoms,
            feedback,
            latitude,
            longitude,
            location_ok,
            wait,
            no_geocode,
            dry_run,
        } => {
            let mut client = PredictionClient::new(api_url);
            if let Some(token) = token {
                client = client.with_token(token);
            }
            let client = Arc::new(client);
            let answers = Answers {
                correct,
                symptoms,
                feedback,
                location: latitude.zip(longitude),
                location_ok,
                geocode: !no_geocode,
                wait: Duration::from_secs(wait),
            };
            cmd_verify(config, client, &image, part, answers, dry_run, cli.json).await
        }
    }
}

fn load_config(path: Option<&Path>, staged: bool) -> anyhow::Result<WorkflowConfig> {
    let config = match path {
        Some(path) => WorkflowConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if staged => WorkflowConfig::staged(),
        None => WorkflowConfig::default(),
    };
    config.validate().context("invalid workflow config")?;
    Ok(config)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Commands ──

fn cmd_inspect(
    config: &WorkflowConfig,
    file: &Path,
    part: DetectionType,
    json: bool,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let raw: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;

    let result = FinalResult::from_response(
        &raw,
        &ResultNormalizer::from_config(config),
        &ConfidencePolicy::from_config(config),
    );
    if json {
        return print_json(&result);
    }

    let mut session = WorkflowSession::new(config.clone(), part);
    session.ingest_response(&raw);
    display::print_detection_card(&session);
    display::print_result_card(&result);
    Ok(())
}

fn cmd_symptoms(disease: &str, part: Option<DetectionType>, json: bool) -> anyhow::Result<()> {
    let catalog = SymptomCatalog::builtin();
    if !catalog.contains(disease, part) {
        info!(disease, "no catalog entry; showing generic checklist");
    }
    let list = catalog.lookup(disease, part);
    if json {
        return print_json(&list.symptoms());
    }
    println!("=== {disease} ===");
    println!();
    display::print_symptoms(&phytoscan_ai::SymptomSet::new(list, Default::default()));
    Ok(())
}

fn cmd_list_diseases(part: Option<DetectionType>, json: bool) -> anyhow::Result<()> {
    let catalog = SymptomCatalog::builtin();
    let diseases: Vec<&str> = catalog
        .diseases()
        .into_iter()
        .filter(|d| part.is_none() || catalog.contains(d, part))
        .collect();
    if json {
        return print_json(&diseases);
    }
    for disease in diseases {
        println!("  {:<26} {}", disease, catalog.statements(disease, part).len());
    }
    Ok(())
}

fn cmd_steps(config: WorkflowConfig, json: bool) -> anyhow::Result<()> {
    let session = WorkflowSession::new(config, DetectionType::default());
    if json {
        return print_json(&session.overview());
    }
    display::print_steps(&session.overview(), session.progress_percentage());
    Ok(())
}

struct Answers {
    correct: bool,
    symptoms: Vec<usize>,
    feedback: Option<String>,
    location: Option<(f64, f64)>,
    location_ok: bool,
    geocode: bool,
    wait: Duration,
}

async fn cmd_verify(
    config: WorkflowConfig,
    client: Arc<PredictionClient>,
    image: &Path,
    part: DetectionType,
    answers: Answers,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("reading image {}", image.display()))?;
    info!(url = %client.predict_url(), image = %image.display(), %part, "verifying detection");

    let mut session = WorkflowSession::new(config, part);
    let provider: Arc<dyn LocationProvider> = match (answers.location, answers.geocode) {
        (Some((latitude, longitude)), geocode) => {
            let fix = FixedLocation(LocationData::new(latitude, longitude, LocationSource::Manual));
            if geocode {
                Arc::new(GeocodedProvider::new(fix, ReverseGeocoder::default()))
            } else {
                Arc::new(fix)
            }
        }
        (None, true) => Arc::new(GeocodedProvider::new(
            ExifLocation::new(bytes.clone()),
            ReverseGeocoder::default(),
        )),
        (None, false) => Arc::new(ExifLocation::new(bytes.clone())),
    };
    session.start_location(provider);

    session.load_detection(client.clone(), bytes).await;
    if *session.status() == DetectionStatus::TimedOut && !answers.wait.is_zero() {
        info!(wait_secs = answers.wait.as_secs(), "classification is slow; still waiting");
        session.await_detection(answers.wait).await;
    }
    if !json {
        display::print_detection_card(&session);
    }
    if dry_run {
        if json {
            print_json(&session.shown_result())?;
        }
        return Ok(());
    }

    if answers.correct {
        session.mark_correct();
    } else {
        session.mark_incorrect();
    }
    for index in answers.symptoms {
        session.set_unified_symptom(index, true)?;
    }
    if let Some(text) = answers.feedback {
        session.set_feedback(text);
    }
    session.set_location_confirmed(answers.location_ok);

    while !session.is_final_step() {
        if let Err(e) = session.next() {
            if !json {
                display::print_steps(&session.overview(), session.progress_percentage());
            }
            bail!("cannot continue: {e}");
        }
    }

    if let Some(fix) = session.location() {
        info!(location = %fix.display_label(), "location attached");
    }

    let result = match session.confirm(client.as_ref()).await {
        Ok(result) => result.clone(),
        Err(e) if e.is_retryable() => bail!("submission failed, try again: {e}"),
        Err(e) => return Err(e).context("submission rejected"),
    };
    if json {
        return print_json(&result);
    }
    display::print_result_card(&result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn staged_conflicts_with_config_file() {
        let parsed =
            Cli::try_parse_from(["phytoscan", "--config", "flow.json", "--staged", "steps"]);
        assert!(parsed.is_err());
        assert!(Cli::try_parse_from(["phytoscan", "--staged", "steps"]).is_ok());
    }

    #[test]
    fn symptoms_takes_disease_or_list() {
        assert!(Cli::try_parse_from(["phytoscan", "symptoms"]).is_err());
        assert!(Cli::try_parse_from(["phytoscan", "symptoms", "--list"]).is_ok());
        let cli = Cli::try_parse_from(["phytoscan", "symptoms", "Anthracnose", "--part", "fruit"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Symptoms {
                disease: Some(_),
                part: Some(DetectionType::Fruit),
                list: false,
            }
        ));
    }
}
