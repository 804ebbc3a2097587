// ABOUTME: Gc command implementation.
// ABOUTME: Applies CLI policy overrides, runs the collector, and reports the outcome.

use super::connect::connect;
use crate::cli::GcArgs;
use registry_gc::config::Config;
use registry_gc::diagnostics::Diagnostics;
use registry_gc::error::{Error, Result};
use registry_gc::gc::{GarbageCollector, GcOptions};
use registry_gc::output::Output;

/// Merge command-line policy flags into the loaded configuration.
///
/// `--keep` rules replace the configured count for the same prefix and add
/// new prefixes; other configured prefixes stay.
pub fn apply_gc_overrides(config: &mut Config, args: &GcArgs) -> Result<()> {
    config.policy.keep.extend(args.keep.iter().cloned());
    if args.delete_untagged {
        config.policy.delete_untagged = true;
    }
    if let Some(cap) = args.max_images {
        config.policy.max_images = Some(cap);
    }
    if !args.repositories.is_empty() {
        config.repositories = args.repositories.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.execution.batch_size = batch_size;
    }
    config.validate()
}

/// Collect every selected repository.
pub async fn gc(config: &Config, dry_run: bool, output: &mut Output) -> Result<()> {
    output.start_timer();
    let output = &*output;

    if config.policy.is_empty() {
        output.progress("Retention policy is empty; nothing will be deleted");
    }

    let registry = connect(config, output).await?;
    let options = GcOptions::from_config(&config.execution).with_dry_run(dry_run);
    let collector = GarbageCollector::new(&registry, &config.policy, options);

    let repositories = collector.repositories(&config.repositories).await?;
    output.progress(&format!(
        "{} {} repositories on {}",
        if dry_run { "Evaluating" } else { "Collecting" },
        repositories.len(),
        registry.describe()
    ));

    let report = collector.run(&repositories).await;
    output.run(&report);

    let diag = Diagnostics::from_report(&report);
    if diag.has_warnings() {
        output.progress(&format!("{} warning(s), see log", diag.warnings().len()));
    }

    match report.incomplete() {
        0 => Ok(()),
        failed => Err(Error::Incomplete {
            failed,
            total: report.repositories.len(),
        }),
    }
}
