//! catalog-merge CLI
//!
//! Entry point for the `catalog-merge` administrative tool.

use catalog_merge::config::{self, ConfigError, EffectiveConfig, LOCAL_CONFIG_FILE};
use catalog_merge::{
    merger, resolver, CatalogEntry, FileStore, ImageSource, MergeCache, MergeError,
    MergeRegistry, MergeService, ProductImage, Variant,
};
use catalog_model::image::ImagesResponse;
use catalog_upstream::AdminImageClient;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Exit code for a rejected directive or unknown id
const EXIT_REJECTED: i32 = 1;
/// Exit code for configuration errors
const EXIT_CONFIG: i32 = 2;
/// Exit code when the directive store cannot be used
const EXIT_STORE: i32 = 3;

#[derive(Parser)]
#[command(name = "catalog-merge")]
#[command(about = "Manage catalog merge directives", version)]
struct Cli {
    /// Path to local config file (default: ./catalog-merge.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Override `store.dir` for this run
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Override `cache.ttl_seconds` for this run
    #[arg(long, global = true)]
    cache_ttl: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Flag overrides as the top config layer, `None` when no flag is set.
    fn config_overrides(&self) -> Option<Value> {
        let mut overrides = Map::new();
        if let Some(dir) = &self.store_dir {
            overrides.insert("store".to_string(), json!({ "dir": dir.to_string_lossy() }));
        }
        if let Some(ttl) = self.cache_ttl {
            overrides.insert("cache".to_string(), json!({ "ttl_seconds": ttl }));
        }
        (!overrides.is_empty()).then_some(Value::Object(overrides))
    }
}

/// Where to load configuration from for this invocation.
struct ConfigArgs {
    path: Option<PathBuf>,
    overrides: Option<Value>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold a secondary product into a primary
    Create { primary: String, secondary: String },

    /// Remove a merge directive by id
    Delete { id: String },

    /// List merge directives, newest first
    List,

    /// List handles hidden from listings
    Hidden,

    /// Show the secondaries folded into a primary
    Secondaries { primary: String },

    /// Show the primary a handle is folded into
    PrimaryOf { handle: String },

    /// Merge captured product JSON files and print the result
    Merge {
        /// Primary product JSON
        primary: PathBuf,

        /// Secondary product JSON files, in merge order
        #[arg(required = true)]
        secondaries: Vec<PathBuf>,
    },

    /// Group product images by color, from a captured payload or the admin API
    Colors {
        /// Admin API images payload (`{"images": [...]}`)
        #[arg(long, required_unless_present = "product", conflicts_with = "product")]
        images: Option<PathBuf>,

        /// Fetch images from the admin API for this product gid or numeric id
        #[arg(long)]
        product: Option<String>,

        /// Variant list JSON
        #[arg(long)]
        variants: PathBuf,
    },

    /// Show effective configuration and store status
    Status,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;
    let config = ConfigArgs {
        path: cli.config.clone(),
        overrides: cli.config_overrides(),
    };

    match cli.command {
        Commands::Create { primary, secondary } => {
            let service = open_service(&load_config(&config, json), json);
            match service.create_merge(&primary, &secondary) {
                Ok(d) if json => print_json(&d),
                Ok(d) => println!("Created {} ({} <- {})", d.id, d.primary_handle, d.secondary_handle),
                Err(e) => fail(&e, json),
            }
        }
        Commands::Delete { id } => {
            let service = open_service(&load_config(&config, json), json);
            match service.delete_merge(&id) {
                Ok(d) if json => print_json(&d),
                Ok(d) => println!("Deleted {} ({} <- {})", d.id, d.primary_handle, d.secondary_handle),
                Err(e) => fail(&e, json),
            }
        }
        Commands::List => {
            let service = open_service(&load_config(&config, json), json);
            run_list(&service, json);
        }
        Commands::Hidden => {
            let service = open_service(&load_config(&config, json), json);
            match service.registry().hidden_handles() {
                Ok(hidden) if json => print_json(&hidden),
                Ok(hidden) => hidden.iter().for_each(|h| println!("{}", h)),
                Err(e) => fail(&MergeError::from(e), json),
            }
        }
        Commands::Secondaries { primary } => {
            let service = open_service(&load_config(&config, json), json);
            match service.get_secondary_handles(primary.trim()) {
                Ok(handles) if json => print_json(&handles),
                Ok(handles) => handles.iter().for_each(|h| println!("{}", h)),
                Err(e) => fail(&e, json),
            }
        }
        Commands::PrimaryOf { handle } => {
            let service = open_service(&load_config(&config, json), json);
            match service.get_primary_for_secondary(handle.trim()) {
                Ok(primary) if json => print_json(&json!({ "primary": primary })),
                Ok(Some(primary)) => println!("{}", primary),
                Ok(None) => {
                    eprintln!("{} is not merged into any primary", handle.trim());
                    process::exit(EXIT_REJECTED);
                }
                Err(e) => fail(&e, json),
            }
        }
        Commands::Merge {
            primary,
            secondaries,
        } => run_merge(&primary, &secondaries),
        Commands::Colors {
            images,
            product,
            variants,
        } => run_colors(&config, images.as_deref(), product.as_deref(), &variants, json),
        Commands::Status => run_status(&config, json),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
}

fn load_config(args: &ConfigArgs, json: bool) -> EffectiveConfig {
    let host = config::host_config_path();
    let local = args
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE));

    match EffectiveConfig::build(host.as_deref(), Some(&local), args.overrides.clone()) {
        Ok(c) => c,
        Err(e) => fail_config(&e, json),
    }
}

fn open_service(effective: &EffectiveConfig, json: bool) -> MergeService {
    let store = match FileStore::open(effective.store_dir(), effective.lock_timeout()) {
        Ok(s) => s,
        Err(e) => fail(&MergeError::StoreUnavailable(e), json),
    };

    let registry = MergeRegistry::new(Arc::new(store));
    let cache = Arc::new(MergeCache::new(registry.clone(), effective.cache_ttl()));
    MergeService::new(registry, cache)
}

fn run_list(service: &MergeService, json: bool) {
    let directives = match service.list_merges() {
        Ok(d) => d,
        Err(e) => fail(&e, json),
    };

    if json {
        print_json(&directives);
        return;
    }

    if directives.is_empty() {
        println!("No merge directives.");
        return;
    }
    for d in &directives {
        println!(
            "{}  {}  {} <- {}",
            d.id,
            d.created_at.format("%Y-%m-%dT%H:%M:%SZ"),
            d.primary_handle,
            d.secondary_handle
        );
    }
}

fn run_merge(primary: &Path, secondaries: &[PathBuf]) {
    let primary: CatalogEntry = read_json(primary);
    let secondaries: Vec<CatalogEntry> = secondaries.iter().map(|p| read_json(p)).collect();

    print_json(&merger::merge_into(&primary, &secondaries));
}

fn run_colors(
    config: &ConfigArgs,
    images: Option<&Path>,
    product: Option<&str>,
    variants: &Path,
    json: bool,
) {
    let variants: Vec<Variant> = read_json(variants);
    let images = match (product, images) {
        (Some(product_id), _) => fetch_images(&load_config(config, json), product_id, json),
        (None, Some(path)) => read_json::<ImagesResponse>(path).images,
        (None, None) => {
            eprintln!("Either --images or --product is required");
            process::exit(EXIT_REJECTED);
        }
    };

    let map = resolver::resolve_color_images(&images, &variants);

    if json {
        print_json(&map);
        return;
    }
    if map.is_empty() {
        println!("No colored variant tags found.");
        return;
    }
    for (color, srcs) in map.iter() {
        println!("{} ({})", color, srcs.len());
        for src in srcs {
            println!("  {}", src);
        }
    }
}

/// Live fetch; unlike page assembly, a failure here is reported, not degraded.
fn fetch_images(effective: &EffectiveConfig, product_id: &str, json: bool) -> Vec<ProductImage> {
    let client = AdminImageClient::new(effective.upstream());
    match client.product_images(product_id) {
        Ok(images) => images,
        Err(e) => fail(&MergeError::UpstreamUnavailable(e), json),
    }
}

fn run_status(config: &ConfigArgs, json: bool) {
    let effective = load_config(config, json);
    let service = open_service(&effective, json);

    let directives = match service.list_merges() {
        Ok(d) => d,
        Err(e) => fail(&e, json),
    };
    let stats = service.cache_stats();
    let upstream = effective.upstream();

    if json {
        print_json(&json!({
            "effective_config": effective,
            "directives": directives.len(),
            "upstream_configured": upstream.is_configured(),
            "cache": {
                "ttl_seconds": effective.cache_ttl().as_secs(),
                "generation": stats.generation,
                "rebuilds": stats.rebuilds,
            }
        }));
        return;
    }

    println!("Store: {}", effective.store_dir().display());
    println!("  Directives: {}", directives.len());
    println!("Cache TTL: {}s", effective.cache_ttl().as_secs());
    println!(
        "Upstream: {}",
        if upstream.is_configured() {
            upstream.domain.as_deref().unwrap_or_default()
        } else {
            "not configured"
        }
    );
    println!("Config sources:");
    for source in &effective.sources {
        match (&source.path, &source.digest) {
            (Some(path), Some(digest)) => {
                println!(
                    "  {:?}: {} (sha256 {})",
                    source.origin,
                    path,
                    digest.get(..12).unwrap_or(digest)
                )
            }
            _ => println!("  {:?}", source.origin),
        }
    }
    if !effective.redactions.is_empty() {
        println!("Redacted: {}", effective.redactions.join(", "));
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            process::exit(EXIT_REJECTED);
        }
    };
    match serde_json::from_str(&contents) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error parsing {}: {}", path.display(), e);
            process::exit(EXIT_REJECTED);
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing output: {}", e);
            process::exit(EXIT_REJECTED);
        }
    }
}

fn exit_code(err: &MergeError) -> i32 {
    match err {
        MergeError::StoreUnavailable(_) => EXIT_STORE,
        _ => EXIT_REJECTED,
    }
}

fn fail(err: &MergeError, json: bool) -> ! {
    if json {
        print_json(&err.to_payload());
    } else {
        eprintln!("Error [{}]: {}", err.code(), err);
    }
    process::exit(exit_code(err));
}

fn fail_config(err: &ConfigError, json: bool) -> ! {
    if json {
        print_json(&json!({
            "code": "CONFIG",
            "message": err.to_string(),
        }));
    } else {
        eprintln!("Configuration error: {}", err);
    }
    process::exit(EXIT_CONFIG);
}
