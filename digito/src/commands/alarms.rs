//! `digito alarms check`: deploy one alarm template, look for metrics that
//! have no data, then remove every stack that was created.

use super::helpers::parse_bindings;
use anyhow::{Context, Result};
use digito_common::alarms::{AlarmManager, AlarmManagerSettings};
use digito_common::aws::AwsClients;
use digito_common::config::DigitoConfig;
use digito_common::errors::ErrorCode;
use std::process::ExitCode;
use tracing::{error, info};

pub async fn check(
    config: &DigitoConfig,
    reference_id: &str,
    vars: &[String],
    lookback: u32,
) -> Result<ExitCode> {
    let bindings = parse_bindings(vars)?;
    let settings = AlarmManagerSettings::from_config(config).context("alarm manager is not configured")?;
    let clients = AwsClients::from_config(config).await;
    let mut manager = AlarmManager::new(clients.stacks, clients.objects, clients.metrics, settings);

    let checked = async {
        let alarm_id = manager.deploy_alarm(reference_id, &bindings, None).await?;
        info!(alarm = %alarm_id, reference = %reference_id, "alarm stack ready");
        manager.collect_alarms_without_data(lookback).await
    }
    .await;

    // Stacks are removed even when deployment or the metric query failed.
    let teardown = manager.destroy_deployed_alarms().await;
    for (stack, message) in &teardown.failures {
        error!(
            code = %ErrorCode::AlarmTeardownFailed.code_string(),
            stack = %stack,
            error = %message,
            "alarm stack left behind"
        );
    }

    let without_data = match checked {
        Ok(without_data) => without_data,
        Err(err) => {
            eprintln!("{}", err.code().entry().format_full());
            return Err(anyhow::Error::new(err).context(format!("alarm check failed for {reference_id}")));
        }
    };
    if without_data.is_empty() {
        println!("{reference_id}: every alarm metric has data");
    } else {
        for (alarm, metrics) in &without_data {
            for metric in metrics {
                println!("{alarm}: no data for {}/{}", metric.namespace, metric.metric_name);
            }
        }
    }

    Ok(if without_data.is_empty() && teardown.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
