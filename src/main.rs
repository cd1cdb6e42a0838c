use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use classweave::filter::ClassNameFilter;
use classweave::logging::init_logging;
use classweave::pipeline::{Pipeline, PipelineConfig, find_array_initializers};
use classweave::report::{RunSummary, build_invocation, build_sarif};
use classweave::scan::scan_inputs;

/// CLI arguments for classweave execution.
#[derive(Parser, Debug)]
#[command(
    name = "classweave",
    about = "Links JVM class files into a cross-referenced class graph and reports SARIF.",
    version
)]
struct Cli {
    /// Program classes: a class file, a directory, or a JAR.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Library classes; JAR manifests are followed.
    #[arg(long, value_name = "PATH")]
    classpath: Vec<PathBuf>,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Class name filter for warnings to drop, e.g. `org/slf4j/**,!org/slf4j/Logger`.
    #[arg(long, value_name = "FILTER")]
    dontwarn: Option<String>,
    /// Resolve member references in the named class only.
    #[arg(long)]
    no_hierarchy_search: bool,
    #[arg(long)]
    quiet: bool,
    #[arg(long)]
    timing: bool,
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            search_hierarchy: !self.no_hierarchy_search,
            dont_warn: self.dontwarn.as_deref().map(ClassNameFilter::parse),
            log_warnings: true,
            ..PipelineConfig::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    if !cli.input.exists() {
        anyhow::bail!("input not found: {}", cli.input.display());
    }
    for entry in &cli.classpath {
        if !entry.exists() {
            anyhow::bail!("classpath entry not found: {}", entry.display());
        }
    }

    let started_at = Instant::now();
    let scan = scan_inputs(&cli.input, &cli.classpath)?;
    let scan_duration_ms = started_at.elapsed().as_millis();
    let class_count = scan.class_count;
    let (mut universe, artifacts) = scan.into_universe()?;

    let output = Pipeline::new(cli.pipeline_config()).run(&mut universe);
    let initializers = find_array_initializers(&universe);
    info!("found {} array initializers", initializers.len());

    let summary = RunSummary {
        scan_ms: scan_duration_ms,
        class_count,
        artifact_count: artifacts.len(),
        ..RunSummary::from_pipeline(&output, &initializers)
    };
    let invocation = build_invocation(&summary, std::env::args().collect())?;
    let sarif = build_sarif(artifacts, invocation, &output.warnings, &initializers);

    let mut writer = output_writer(cli.output.as_deref())?;
    serde_json::to_writer_pretty(&mut writer, &sarif)
        .context("failed to serialize SARIF output")?;
    writer
        .write_all(b"\n")
        .context("failed to write SARIF output")?;

    if cli.timing && !cli.quiet {
        let timings = output.timings;
        eprintln!(
            "timing: total_ms={} scan_ms={} super_ms={} sub_ms={} references_ms={} methods_ms={} classes={}",
            started_at.elapsed().as_millis(),
            scan_duration_ms,
            timings.super_link.as_millis(),
            timings.sub_link.as_millis(),
            timings.references.as_millis(),
            timings.method_link.as_millis(),
            class_count
        );
    }

    Ok(())
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}
