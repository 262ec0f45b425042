//! CLI module for Architectum

mod args;

pub use args::{Args, Command, FeatureCommand, ScanOptions, SelectionOptions};

use crate::blueprint::{Blueprint, BlueprintDefinition, BlueprintKind, Component, Composer, ElementRef, Selection};
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::extract::Scanner;
use crate::index::{ScanIndex, ScanReport};
use crate::model::{normalize_path, DetailLevel};
use crate::output::{render, Format};
use crate::versioning::{DirectoryBackend, FeatureRegistry};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_logging(args.verbose);

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    let verbose = args.verbose;
    let config = args.config;

    match args.command {
        Command::Scan { path, scan } => {
            let cfg = load_config(config.as_deref(), &path, &scan, None, None)?;
            let (index, report) = scan_project(&path, &cfg, true)?;
            print_scan(&path, &index, &report, verbose);
            Ok(())
        }

        Command::Blueprint {
            path,
            selection,
            name,
            format,
            output,
            scan,
        } => {
            let format = format.as_deref().map(str::parse::<Format>).transpose()?;
            let detail = parse_detail(selection.detail.as_deref())?;
            let cfg = load_config(config.as_deref(), &path, &scan, detail, format)?;
            let (plan, detail) = plan_selection(&selection, name.as_deref(), cfg.blueprint.detail_level)?;

            let (index, report) = scan_project(&path, &cfg, false)?;
            report_failures(&report);
            let mut blueprint = Composer::from_index(&index).compose(&plan, detail)?;
            if let Some(name) = name.or_else(|| plan.name().map(str::to_string)) {
                blueprint = blueprint.with_name(name);
            }
            write_output(&render(&blueprint, cfg.blueprint.format)?, output.as_deref())
        }

        Command::Feature { store, action } => execute_feature(action, store, config.as_deref()),

        Command::Version => {
            println!("architectum {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn execute_feature(action: FeatureCommand, store: Option<PathBuf>, config: Option<&Path>) -> Result<()> {
    match action {
        FeatureCommand::Create {
            name,
            path,
            selection,
            scan,
        } => {
            let (cfg, blueprint) = compose_feature(&name, &path, &selection, &scan, config)?;
            let registry = open_registry(&cfg, store)?;
            let stored = registry.create(&name, &blueprint)?;
            println!("Created feature {} v{} ({})", stored.name, stored.version, describe(&blueprint));
            Ok(())
        }

        FeatureCommand::Update {
            name,
            path,
            selection,
            scan,
        } => {
            let (cfg, blueprint) = compose_feature(&name, &path, &selection, &scan, config)?;
            let registry = open_registry(&cfg, store)?;
            let previous = registry.versions(&name)?.last().copied();
            let stored = registry.update(&name, &blueprint)?;
            println!("Updated feature {} to v{} ({})", stored.name, stored.version, describe(&blueprint));
            if let Some(previous) = previous {
                let diff = registry.diff(&name, previous, stored.version)?;
                println!("Changes since v{}: {}", previous, diff.summary());
            }
            Ok(())
        }

        FeatureCommand::Show {
            name,
            version,
            format,
            output,
        } => {
            let cfg = load_config(config, Path::new("."), &ScanOptions::default(), None, None)?;
            let format = match format {
                Some(f) => f.parse()?,
                None => cfg.blueprint.format,
            };
            let registry = open_registry(&cfg, store)?;
            let blueprint = registry.get(&name, version)?.blueprint()?;
            write_output(&render(&blueprint, format)?, output.as_deref())
        }

        FeatureCommand::Diff { name, from, to } => {
            let cfg = load_config(config, Path::new("."), &ScanOptions::default(), None, None)?;
            let registry = open_registry(&cfg, store)?;
            let diff = registry.diff(&name, from, to)?;

            println!("Feature {} v{} -> v{}: {}", name, from, to, diff.summary());
            for id in &diff.added_elements {
                println!("  + {}", id);
            }
            for id in &diff.removed_elements {
                println!("  - {}", id);
            }
            for id in &diff.modified_elements {
                println!("  ~ {}", id);
            }
            for key in &diff.added_edges {
                println!("  + {} {} {}", key.source, key.kind, key.target);
            }
            for key in &diff.removed_edges {
                println!("  - {} {} {}", key.source, key.kind, key.target);
            }
            for id in &diff.added_members {
                println!("  + member {}", id);
            }
            for id in &diff.removed_members {
                println!("  - member {}", id);
            }
            Ok(())
        }

        FeatureCommand::List => {
            let cfg = load_config(config, Path::new("."), &ScanOptions::default(), None, None)?;
            let registry = open_registry(&cfg, store)?;
            let names = registry.names()?;
            if names.is_empty() {
                println!("No features stored");
            }
            for name in names {
                let versions = registry.versions(&name)?;
                let latest = versions.last().copied().unwrap_or_default();
                println!("{} (v{}, {} versions)", name, latest, versions.len());
            }
            Ok(())
        }
    }
}

/// Explicit `--config` must exist; otherwise `architectum.toml` in the scanned
/// directory is used when present
fn load_config(
    explicit: Option<&Path>,
    root: &Path,
    scan: &ScanOptions,
    detail: Option<DetailLevel>,
    format: Option<Format>,
) -> Result<Config> {
    let mut cfg = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&root.join(CONFIG_FILE))?,
    };

    // CLI takes precedence
    cfg.merge_cli(scan.include.clone(), scan.exclude.clone(), detail, format, scan.sequential);
    cfg.validate()?;
    Ok(cfg)
}

fn parse_detail(detail: Option<&str>) -> Result<Option<DetailLevel>> {
    detail.map(str::parse).transpose()
}

fn scan_project(path: &Path, cfg: &Config, progress: bool) -> Result<(ScanIndex, ScanReport)> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }
    debug!("Scanning {} (include {:?}, exclude {:?})", path.display(), cfg.scan.include, cfg.scan.exclude);

    let output = Scanner::new(&cfg.scan)?.with_progress(progress).scan(path)?;
    let (index, mut report) = ScanIndex::from_batch(&output.extractions)?;
    report.failures.extend(output.failures);
    report.failures.extend(output.skipped);
    Ok((index, report))
}

/// Build the selection from a definition file or from inline flags, along
/// with the detail level to compose at
fn plan_selection(
    options: &SelectionOptions,
    name: Option<&str>,
    configured: DetailLevel,
) -> Result<(Selection, DetailLevel)> {
    let cli_detail = parse_detail(options.detail.as_deref())?;

    let definition = match &options.definition {
        Some(path) => {
            let mut definition = BlueprintDefinition::load(path)?;
            if name.is_some() {
                definition.name = name.map(str::to_string);
            }
            definition
        }
        None => inline_definition(options, name)?,
    };

    let detail = cli_detail.or(definition.detail_level).unwrap_or(configured);
    Ok((definition.validate()?, detail))
}

fn inline_definition(options: &SelectionOptions, name: Option<&str>) -> Result<BlueprintDefinition> {
    let kind: BlueprintKind = match &options.kind {
        Some(kind) => kind.parse()?,
        None if !options.element.is_empty() => BlueprintKind::Method,
        None => BlueprintKind::File,
    };

    // Elements are grouped under their file, in the order files first appear
    let mut grouped: BTreeMap<usize, Component> = BTreeMap::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    for file in &options.file {
        let file = normalize_path(file);
        let next = positions.len();
        let position = *positions.entry(file.clone()).or_insert(next);
        grouped.entry(position).or_insert_with(|| Component { file, elements: None });
    }
    for spec in &options.element {
        let element = ElementRef::parse(spec)?;
        let next = positions.len();
        let position = *positions.entry(element.file.clone()).or_insert(next);
        let component = grouped.entry(position).or_insert_with(|| Component {
            file: element.file.clone(),
            elements: Some(Vec::new()),
        });
        match component.elements.as_mut() {
            Some(names) => names.push(element.name),
            None => {
                return Err(Error::invalid_definition(format!(
                    "'{}' is selected both as a whole file and by element",
                    element.file
                )))
            }
        }
    }

    Ok(BlueprintDefinition {
        kind,
        name: name.map(str::to_string),
        description: None,
        detail_level: None,
        persistence: kind == BlueprintKind::Feature,
        components: grouped.into_values().collect(),
    })
}

fn compose_feature(
    name: &str,
    path: &Path,
    selection: &SelectionOptions,
    scan: &ScanOptions,
    config: Option<&Path>,
) -> Result<(Config, Blueprint)> {
    let detail = parse_detail(selection.detail.as_deref())?;
    let cfg = load_config(config, path, scan, detail, None)?;

    let mut options = selection.clone();
    if options.definition.is_none() {
        options.kind = Some(BlueprintKind::Feature.to_string());
    }
    let (plan, detail) = plan_selection(&options, Some(name), cfg.blueprint.detail_level)?;
    if plan.kind() != BlueprintKind::Feature {
        return Err(Error::NotPersistent(format!(
            "{} blueprints are not versioned; only feature blueprints are",
            plan.kind()
        )));
    }

    let (index, report) = scan_project(path, &cfg, false)?;
    report_failures(&report);
    let blueprint = Composer::from_index(&index).compose(&plan, detail)?.with_name(name);
    Ok((cfg, blueprint))
}

/// Element total with a per-kind breakdown, e.g. `5 elements: 2 file, 3 function`
fn describe(blueprint: &Blueprint) -> String {
    let kinds: Vec<String> = blueprint
        .counts_by_kind()
        .iter()
        .map(|(kind, count)| format!("{} {}", count, kind))
        .collect();
    if kinds.is_empty() {
        return "0 elements".to_string();
    }
    format!("{} elements: {}", blueprint.len(), kinds.join(", "))
}

fn open_registry(cfg: &Config, store: Option<PathBuf>) -> Result<FeatureRegistry<DirectoryBackend>> {
    let root = match store {
        Some(directory) => directory.join("features"),
        None => cfg.storage.features_dir(),
    };
    debug!("Feature store at {}", root.display());
    Ok(FeatureRegistry::new(DirectoryBackend::new(root)))
}

fn write_output(bytes: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, bytes)?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn report_failures(report: &ScanReport) {
    for failure in &report.failures {
        eprintln!("warning: {}: {}", failure.path, failure.message);
    }
}

fn print_scan(path: &Path, index: &ScanIndex, report: &ScanReport, verbose: bool) {
    let stats = index.map().stats();
    println!("Scanned {}", path.display());
    println!(
        "Found {} files, {} elements, {} relationships",
        stats.files, stats.elements, stats.relationships
    );
    for (kind, count) in &stats.elements_by_kind {
        println!("  {}: {}", kind, count);
    }
    for (kind, count) in &stats.relationships_by_kind {
        println!("  {}: {}", kind, count);
    }
    println!("{}", report.summary());

    if !report.failures.is_empty() {
        println!("\nProblems ({}):", report.failures.len());
        for failure in report.failures.iter().take(5) {
            println!("  {}: {}", failure.path, failure.message);
        }
        if report.failures.len() > 5 {
            println!("  ... and {} more", report.failures.len() - 5);
        }
    }

    if verbose {
        for edge in index.unresolved() {
            println!("  unresolved: {} -> {} ({})", edge.source, edge.target_name, edge.kind);
        }
    }
}
