//! folio - story publishing gateway and CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::client::{
    Autosaver, CollectionStore, DraftStore, HttpRegistrationClient, KvStore, Orchestrator, PreferencesStore,
    PublishForm, StepController,
};
use folio::license::LicenseType;
use folio::models::{ContentType, FileRef, StoryDraft};
use folio::pinning::{ContentPinner, LocalPinStore, PinataClient, PinataConfig};
use folio::server::{
    self, AppState, AssetSource, Catalog, Config, DryRunRegistrar, IpRegistrar, LogFormat, RegistrationService,
    RelayRegistrar, StoryApiClient,
};

/// Folio - publish fiction as on-chain IP assets
#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Story publishing gateway and CLI")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,
    /// Publish a story through a running gateway
    Publish(PublishArgs),
    /// List stories in the local collection
    Stories,
}

#[derive(clap::Args)]
struct PublishArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    description: String,

    /// Plain-text story body
    #[arg(long, conflicts_with = "pdf", required_unless_present = "pdf")]
    text_file: Option<PathBuf>,

    /// PDF story body
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// Cover image (png, jpg, gif or webp)
    #[arg(long)]
    cover: PathBuf,

    /// License tag; repeat for several
    #[arg(long = "license", required = true)]
    licenses: Vec<LicenseType>,

    /// Wallet address credited as author
    #[arg(long, env = "FOLIO_AUTHOR")]
    author: String,

    /// Gateway base URL
    #[arg(long, env = "FOLIO_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(&cli.config);

    if let Err(e) = cli.config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config).await,
        Command::Publish(args) => publish(&cli.config, args).await,
        Command::Stories => list_stories(&cli.config),
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("folio={},info", config.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Pinata when a JWT is set, the local pin store in dev mode, otherwise none
async fn build_pinner(config: &Config) -> anyhow::Result<Option<Arc<dyn ContentPinner>>> {
    if let Some(ref jwt) = config.pinata_jwt {
        let pinata = PinataClient::new(PinataConfig {
            api_url: config.pinata_api_url.clone(),
            jwt: jwt.clone(),
            gateway: config.ipfs_gateway.clone(),
            timeout: config.request_timeout(),
        })?;
        return Ok(Some(Arc::new(pinata)));
    }

    if config.dev_mode {
        warn!("PINATA_JWT not set (dev mode, pinning locally to {})", config.pin_dir().display());
        let local = LocalPinStore::new(config.pin_dir(), config.ipfs_gateway.clone()).await?;
        return Ok(Some(Arc::new(local)));
    }

    Ok(None)
}

fn build_registrar(config: &Config) -> anyhow::Result<Option<Arc<dyn IpRegistrar>>> {
    match (&config.registrar_url, &config.wallet_private_key) {
        (Some(url), Some(key)) => {
            let relay = RelayRegistrar::new(url, key.clone(), config.network, config.request_timeout())?;
            Ok(Some(Arc::new(relay)))
        }
        _ if config.dev_mode => {
            warn!("Registrar not configured (dev mode, using dry-run registrar)");
            Ok(Some(Arc::new(DryRunRegistrar::new())))
        }
        _ => Ok(None),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("======================================");
    info!("  Folio gateway");
    info!("======================================");
    info!("Listen: {}", config.listen);
    info!("Mode: {}", if config.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Network: {:?} (chain {})", config.network, config.network.chain_id());
    info!("Asset API: {}", config.story_api_url);
    info!("IPFS gateway: {}", config.ipfs_gateway);
    info!("======================================");

    for name in config.missing_credentials() {
        warn!("{} is not set; requests that need it will fail", name);
    }

    let assets: Option<Arc<dyn AssetSource>> = match config.story_api_key {
        Some(ref key) => Some(Arc::new(StoryApiClient::new(
            config.story_api_url.clone(),
            key.clone(),
            config.network,
            config.request_timeout(),
        )?)),
        None => None,
    };

    let registration = RegistrationService::new(
        build_pinner(&config).await?,
        build_registrar(&config)?,
        config.network,
        config.spg_nft_contract.clone(),
        config.license_template.clone(),
    );

    let catalog = Catalog::bundled().context("loading bundled catalog")?;
    info!("Catalog: {} stories", catalog.len());

    let state = AppState::new(
        assets,
        catalog,
        registration,
        config.story_cache_ttl(),
        config.license_cache_ttl(),
    );

    server::run(config.listen, state).await?;
    Ok(())
}

fn image_mime(path: &Path) -> anyhow::Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    Ok(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        other => bail!("Unsupported cover image type: {:?}", other),
    })
}

async fn publish(config: &Config, args: PublishArgs) -> anyhow::Result<()> {
    let kv = KvStore::open(&config.data_dir)?;
    let drafts = DraftStore::new(kv.clone());
    let collection = CollectionStore::new(kv.clone());
    let autosaver = Autosaver::from_preferences(drafts.clone(), &PreferencesStore::new(kv))?;

    let mut draft = StoryDraft::new();
    draft.title = args.title;
    draft.description = args.description;
    draft.license_types = args.licenses;
    draft.cover_image = Some(FileRef::new(&args.cover, image_mime(&args.cover)?));
    match (args.text_file, args.pdf) {
        (Some(text), _) => {
            draft.content_type = ContentType::Text;
            draft.content = tokio::fs::read_to_string(&text)
                .await
                .with_context(|| format!("reading {}", text.display()))?;
        }
        (None, Some(pdf)) => {
            draft.content_type = ContentType::Pdf;
            draft.file = Some(FileRef::new(pdf, ContentType::Pdf.mime()));
        }
        (None, None) => bail!("Either --text-file or --pdf is required"),
    }
    let draft = autosaver.record_change(draft)?;

    let form = PublishForm::from(&draft);
    let mut wizard = StepController::<PublishForm>::new();
    while !wizard.is_last() {
        if !wizard.advance(&form) {
            for e in wizard.errors(wizard.current()) {
                error!("{}", e);
            }
            bail!("Draft {} saved but not valid for publishing", draft.id);
        }
    }
    if !wizard.can_submit(&form) {
        bail!("Draft {} saved but not valid for publishing", draft.id);
    }

    let Some(pinner) = build_pinner(config).await? else {
        bail!("PINATA_JWT is required to upload content (or run with --dev-mode)");
    };
    let registrar = HttpRegistrationClient::new(&args.server, config.request_timeout())?;
    let orchestrator = Orchestrator::new(pinner, Arc::new(registrar), collection, drafts);

    let status = orchestrator.publish(Some(&draft.id), &form, &args.author).await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn list_stories(config: &Config) -> anyhow::Result<()> {
    let collection = CollectionStore::new(KvStore::open(&config.data_dir)?);
    let stories = collection.published()?;
    if stories.is_empty() {
        println!("No published stories");
        return Ok(());
    }

    for story in stories {
        let licenses: Vec<&str> = story.license_types.iter().map(|l| l.as_str()).collect();
        println!("{}  {}  [{}]", story.id, story.title, licenses.join(", "));
        println!("    {}", story.explorer_url);
    }
    Ok(())
}
