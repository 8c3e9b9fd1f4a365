use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use mvault_store::{FsManifestStore, ListMode, Manifest, ManifestStore, StoreConfig};
use mvault_types::{Layer, Name};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    debug!(models_dir = %config.models_dir.display(), synthetic = config.synthetic_models, "opening store");
    let store = FsManifestStore::open(config);
    let format = cli.format;

    match cli.command {
        Command::List(args) => cmd_list(&store, args, format),
        Command::Show(args) => cmd_show(&store, args, format),
        Command::Put(args) => cmd_put(&store, args),
        Command::Rm(args) => cmd_rm(&store, args),
    }
}

/// Config file (or defaults), then environment, then command-line flags.
fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let base = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let mut config = base.from_env();
    if let Some(models) = &cli.models {
        config.models_dir = models.clone();
    }
    if cli.synthetic {
        config.synthetic_models = true;
    }
    Ok(config)
}

fn parse_name(s: &str) -> anyhow::Result<Name> {
    let name = Name::parse(s).fill_defaults();
    if let Err(reason) = name.validate() {
        bail!("invalid model name {s:?}: {reason}");
    }
    Ok(name)
}

/// One row of `list` / the body of `show` in JSON output.
#[derive(Debug, Serialize)]
struct ManifestSummary {
    name: Name,
    digest: String,
    size: u64,
    modified: chrono::DateTime<chrono::Utc>,
    synthetic: bool,
    config: Layer,
    layers: Vec<Layer>,
}

impl ManifestSummary {
    fn new(name: Name, manifest: &Manifest) -> Self {
        Self {
            name,
            digest: manifest.digest().to_string(),
            size: manifest.size(),
            modified: manifest.metadata().modified(),
            synthetic: manifest.is_synthetic(),
            config: manifest.config().clone(),
            layers: manifest.layers().to_vec(),
        }
    }
}

/// Input file for `put`.
#[derive(Debug, Deserialize)]
struct PutInput {
    config: Layer,
    #[serde(default)]
    layers: Vec<Layer>,
}

fn read_put_input(path: &Path) -> anyhow::Result<PutInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("malformed layer file {}", path.display()))
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn cmd_list(store: &dyn ManifestStore, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mode = if args.strict { ListMode::Strict } else { ListMode::Tolerant };
    let mut rows: Vec<ManifestSummary> = store
        .list(mode)?
        .into_iter()
        .map(|(name, manifest)| ManifestSummary::new(name, &manifest))
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No models.");
        return Ok(());
    }
    println!("{:<40} {:<14} {:>10}  {}", "NAME".bold(), "ID".bold(), "SIZE".bold(), "MODIFIED".bold());
    for row in &rows {
        let marker = if row.synthetic { " (built-in)".cyan().to_string() } else { String::new() };
        println!(
            "{:<40} {:<14} {:>10}  {}{}",
            row.name.to_string().yellow(),
            short_digest(&row.digest).dimmed(),
            human_size(row.size),
            row.modified.format("%Y-%m-%d %H:%M"),
            marker,
        );
    }
    Ok(())
}

fn cmd_show(store: &dyn ManifestStore, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    let manifest = store.lookup(&name)?;
    let summary = ManifestSummary::new(name, &manifest);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", summary.name.to_string().yellow().bold());
    println!("  Digest: {}", summary.digest);
    println!("  Size: {}", human_size(summary.size));
    if summary.synthetic {
        println!("  Source: {}", "built-in".cyan());
    } else if let Some(path) = manifest.source_path() {
        println!("  Source: {}", path.display());
    }
    println!("  Config: {} {} ({})", summary.config.media_type, summary.config.digest.dimmed(), human_size(summary.config.size));
    for layer in &summary.layers {
        println!("  Layer:  {} {} ({})", layer.media_type, layer.digest.dimmed(), human_size(layer.size));
    }
    Ok(())
}

fn cmd_put(store: &dyn ManifestStore, args: PutArgs) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    let input = read_put_input(&args.file)?;
    store.put(&name, input.config, input.layers)?;
    let written = store.get(&name)?;
    println!("{} Wrote {} ({})", "✓".green().bold(), name.to_string().yellow(), short_digest(written.digest()));
    Ok(())
}

fn cmd_rm(store: &dyn ManifestStore, args: RmArgs) -> anyhow::Result<()> {
    let name = parse_name(&args.name)?;
    let manifest = store.get(&name)?;
    store.remove(&name)?;
    if !args.keep_layers {
        store.remove_layers(&manifest)?;
    }
    println!("{} Deleted {}", "✓".green(), name.to_string().yellow());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvault_store::StoreError;

    fn write_input(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("layers.json");
        let digest = |b: &str| format!("sha256:{}", b.repeat(32));
        let body = serde_json::json!({
            "config": {"mediaType": "cfg", "digest": digest("aa"), "size": 10},
            "layers": [{"mediaType": "weights", "digest": digest("bb"), "size": 2048}],
        });
        std::fs::write(&path, body.to_string()).unwrap();
        path
    }

    #[test]
    fn parse_name_fills_defaults() {
        assert_eq!(parse_name("demo").unwrap(), Name::new("library", "demo", "latest"));
        assert!(parse_name("bad name").is_err());
    }

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(2058), "2.1 KB");
        assert_eq!(human_size(1_500_000), "1.5 MB");
    }

    #[test]
    fn short_digest_truncates() {
        assert_eq!(short_digest("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_digest("abc"), "abc");
    }

    #[test]
    fn put_then_rm() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsManifestStore::open(StoreConfig::new(dir.path()));
        let input = write_input(dir.path());

        cmd_put(&store, PutArgs { name: "demo".into(), file: input }).unwrap();
        let name = Name::new("library", "demo", "latest");
        assert_eq!(store.get(&name).unwrap().size(), 2058);

        cmd_list(&store, ListArgs { strict: true }, OutputFormat::Json).unwrap();
        cmd_show(&store, ShowArgs { name: "demo".into() }, OutputFormat::Text).unwrap();

        cmd_rm(&store, RmArgs { name: "demo".into(), keep_layers: false }).unwrap();
        assert!(matches!(store.get(&name), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn malformed_put_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{\"layers\": []}").unwrap();
        assert!(read_put_input(&path).is_err());
    }

    #[test]
    fn summary_of_synthetic_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsManifestStore::open(StoreConfig::new(dir.path()).with_synthetic_models(true));
        let name = Name::new("library", "foundation", "latest");
        let summary = ManifestSummary::new(name.clone(), &store.lookup(&name).unwrap());
        assert!(summary.synthetic);
        assert_eq!(summary.layers.len(), 2);
    }
}
