//! `digito publish`: resolve, assemble and publish documents.

use super::helpers::{load_assembler, load_store};
use anyhow::{Context, Result, bail};
use digito_common::aws::AwsClients;
use digito_common::config::DigitoConfig;
use digito_common::publish::{
    PublishOutcome, Publisher, get_documents_list_by_manifest_file, get_documents_list_by_names,
};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

pub async fn run(
    config: &DigitoConfig,
    manifest: Option<&Path>,
    names: &[String],
    dry_run: bool,
) -> Result<ExitCode> {
    let store = load_store(config)?;
    let documents = match manifest {
        Some(path) => get_documents_list_by_manifest_file(&store, path)
            .with_context(|| format!("failed to resolve documents from {}", path.display()))?,
        None if !names.is_empty() => get_documents_list_by_names(&store, names)
            .context("failed to resolve requested documents")?,
        None => bail!("nothing to publish: pass document names or --file-name"),
    };
    info!(documents = documents.len(), dry_run, "publishing");

    let assembler = load_assembler(config)?;
    let clients = AwsClients::connect(config.region.value.clone(), config.aws_max_attempts.value).await;
    let publisher = Publisher::new(clients.ssm, assembler).dry_run(dry_run);
    let report = match publisher.publish_document(&documents).await {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{}", err.code().entry().format_full());
            return Err(anyhow::Error::new(err).context("publish aborted"));
        }
    };

    for (name, outcome) in &report.outcomes {
        println!("{name}: {outcome}");
    }
    println!(
        "{} created, {} updated, {} unchanged",
        report.count(|o| matches!(o, PublishOutcome::Created)),
        report.count(|o| matches!(o, PublishOutcome::Updated { .. })),
        report.count(|o| matches!(o, PublishOutcome::Unchanged)),
    );
    Ok(ExitCode::SUCCESS)
}
