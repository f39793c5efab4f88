//! `digito validate`: CI checks over the whole documents tree.

use super::helpers::{indent_lines, load_assembler, load_store};
use anyhow::Result;
use digito_common::audit::{CorpusAuditor, Severity};
use digito_common::config::DigitoConfig;
use std::process::ExitCode;

pub fn run(config: &DigitoConfig, warn_only: &[String], json: bool) -> Result<ExitCode> {
    let store = load_store(config)?;
    let assembler = load_assembler(config)?;

    let services = if warn_only.is_empty() {
        config.warn_only_services.value.clone()
    } else {
        warn_only.to_vec()
    };
    let report = CorpusAuditor::new(&store, &assembler).warn_only(services).run();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for finding in &report.findings {
            let label = match finding.severity {
                Severity::Warning => "warning",
                Severity::Error => "error",
            };
            println!("{label}[{}]: {}", finding.code.code_string(), finding.file.display());
            println!("{}", indent_lines(&finding.message, "    "));
        }
        println!(
            "{} files checked, {} errors, {} warnings",
            report.files,
            report.errors().count(),
            report.warnings().count()
        );
    }

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
