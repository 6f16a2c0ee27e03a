use anyhow::Result;
use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::EnhanceArgs;
use crate::config::{Config, Language};
use crate::error::DocError;
use crate::llm::create_provider;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::runner::ExampleRunner;

static WRITING: Emoji<'_, '_> = Emoji("📝 ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");

/// Layer command-line flags over the loaded configuration.
fn apply_flags(config: &mut Config, args: &EnhanceArgs) {
    if let Some(provider) = &args.provider {
        config.select_provider(provider);
    }
    if let Some(model) = &args.model {
        config.provider.model = Some(model.clone());
    }
    if let Some(key) = &args.api_key {
        config.provider.api_key = Some(key.clone());
    }
    if let Some(endpoint) = &args.endpoint {
        config.provider.endpoint = Some(endpoint.clone());
    }
    if let Some(timeout) = args.timeout {
        config.provider.timeout_secs = timeout;
    }
    if let Some(language) = &args.language {
        config.language = Language(language.clone());
    }
    if let Some(python) = &args.python {
        config.runner.python = python.clone();
    }
}

pub async fn run_enhance(mut config: Config, args: &EnhanceArgs) -> Result<()> {
    apply_flags(&mut config, args);
    config.fill_provider_key(|key| std::env::var(key).ok());

    // Everything is validated before the first network call.
    let resolved = config.resolve_provider()?;
    if let Some(target) = &args.translate {
        if target.trim().is_empty() {
            return Err(DocError::config("--translate needs a language code").into());
        }
    }

    let provider = create_provider(&resolved)?;
    let options = PipelineOptions {
        language: config.language().to_string(),
        translate_to: args.translate.clone(),
        run_examples: !args.no_run_examples,
        test_generated: args.test_generated,
    };
    let pipeline = Pipeline::new(provider, ExampleRunner::new(config.runner.clone()), options);

    let root = std::env::current_dir().map_err(|e| DocError::io(".", e))?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "{}Documenting {} with {} ({})...",
        WRITING,
        args.module.display(),
        resolved.kind,
        resolved.model
    ));
    pb.enable_steady_tick(Duration::from_millis(100));

    let outcome = pipeline.run(&args.module, &root, &args.output).await;
    pb.finish_and_clear();
    let report = outcome?;

    let language = args.translate.as_deref().unwrap_or(config.language());
    println!(
        "{}Documentation written to {} (language: {})",
        SUCCESS,
        style(report.output.display()).green(),
        style(language).cyan()
    );
    println!(
        "  Units documented: {}/{}",
        style(report.documented).green(),
        report.units
    );
    if report.examples_passed + report.examples_failed > 0 {
        println!(
            "  Examples:         {} passed, {} failed",
            style(report.examples_passed).green(),
            style(report.examples_failed).red()
        );
    }

    if report.is_success() {
        return Ok(());
    }

    eprintln!(
        "\n{}{} of {} units could not be enhanced:",
        WARNING,
        report.failures.len(),
        report.units
    );
    for failure in &report.failures {
        eprintln!(
            "  - {}: {}",
            style(&failure.qualified_name).yellow(),
            failure.error
        );
    }

    // The first failure decides the reported error kind and exit status.
    match report.failures.into_iter().next() {
        Some(first) => Err(first.error.into()),
        None => Ok(()),
    }
}
