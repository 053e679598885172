//! Drives a sequence of targets through the gate, the transfer and expansion.

use std::{collections::HashSet, path::PathBuf};

use futures::{stream, StreamExt};
use indicatif::{MultiProgress, ProgressBar};
use tracing::{info, warn};

use crate::{
    archive,
    cli::create_transfer_bar,
    download::{fetch, should_fetch, ByteSource, SkipReason, TransferOutcome, WritePolicy},
    plan::FetchTarget,
    summary::Summary,
};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub policy: WritePolicy,
    /// Upper bound on transfers in flight. One means strictly sequential.
    pub jobs: usize,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            policy: WritePolicy::default(),
            jobs: 1,
            show_progress: false,
        }
    }
}

struct Processed {
    target: FetchTarget,
    outcome: TransferOutcome,
    expansion: Option<Result<Vec<String>, String>>,
}

/// Fetches every target and returns the tally.
///
/// Outcomes are aggregated in target order by this loop alone, whatever the
/// number of jobs.
pub async fn run_targets<S, I>(source: &S, targets: I, options: RunOptions) -> Summary
where
    S: ByteSource,
    I: IntoIterator<Item = FetchTarget>,
{
    let multi = if options.show_progress {
        MultiProgress::new()
    } else {
        MultiProgress::with_draw_target(indicatif::ProgressDrawTarget::hidden())
    };

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut processed = stream::iter(targets)
        .map(|target| {
            let duplicate = !seen.insert(target.local_path.clone());
            let bar = multi.add(create_transfer_bar(&target));
            process_target(source, target, duplicate, options.policy, bar)
        })
        .buffered(options.jobs.max(1));

    let mut summary = Summary::default();
    while let Some(Processed {
        target,
        outcome,
        expansion,
    }) = processed.next().await
    {
        summary.record(&target, &outcome);

        match expansion {
            Some(Ok(names)) => {
                println!(
                    "Extracted {} files from {}",
                    names.len(),
                    target.local_path.display()
                );
                for name in names {
                    println!("  - {}", name);
                }
            }
            Some(Err(cause)) => summary.record_archive_error(&target, cause),
            None => {}
        }
    }

    summary
}

async fn process_target<S: ByteSource>(
    source: &S,
    target: FetchTarget,
    duplicate: bool,
    policy: WritePolicy,
    bar: ProgressBar,
) -> Processed {
    let file_name = target
        .local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let skip = if duplicate {
        Some(SkipReason::Duplicate)
    } else if !should_fetch(&target.local_path) {
        Some(SkipReason::AlreadyExists)
    } else {
        None
    };

    if let Some(reason) = skip {
        bar.finish_and_clear();
        info!(path = %target.local_path.display(), "skipping {} - {}", file_name, reason);
        return Processed {
            target,
            outcome: TransferOutcome::Skipped(reason),
            expansion: None,
        };
    }

    info!(url = %target.url, "downloading: {}", target.description);
    let outcome = fetch(source, &target.url, &target.local_path, policy, &bar).await;

    let expansion = match &outcome {
        TransferOutcome::Downloaded(bytes) => {
            bar.finish_with_message(format!("✓ {}", file_name));
            info!(path = %target.local_path.display(), bytes = *bytes, "saved");

            target.is_archive.then(|| {
                archive::expand(&target.local_path).map_err(|e| {
                    warn!(
                        path = %target.local_path.display(),
                        error = %e,
                        "could not expand archive"
                    );
                    e.to_string()
                })
            })
        }
        _ => {
            bar.abandon_with_message(format!("✗ {}", file_name));
            None
        }
    };

    Processed {
        target,
        outcome,
        expansion,
    }
}

// -- Tests -------------------------------------------------------------------
