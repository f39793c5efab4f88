//! Alarm deployment, data checks and teardown against in-memory AWS ports.

use digito_common::alarms::{AlarmError, AlarmManager, AlarmManagerSettings};
use digito_common::errors::ErrorCode;
use digito_common::ports::stack::CREATE_COMPLETE;
use digito_common::ports::{
    MockMetricApi, MockObjectStore, MockStackApi, StackCall, StackEventRecord,
};
use digito_common::testing::init_global_test_logging;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[ctor::ctor]
fn setup() {
    init_global_test_logging();
}

const REFERENCE: &str = "compute:alarm:asg-cpu-util:2020-07-13";
const BUCKET: &str = "digito-alarm-templates";

const TEMPLATE: &str = "\
AWSTemplateFormatVersion: '2010-09-09'
Resources:
  CpuAlarm:
    Type: AWS::CloudWatch::Alarm
    Properties:
      AlarmName: ${AlarmName}
      Namespace: AWS/EC2
      MetricName: CPUUtilization
      Dimensions:
        - Name: AutoScalingGroupName
          Value: ${AutoScalingGroupName}
      Period: 300
      Threshold: ${Threshold}
  StatusAlarm:
    Type: AWS::CloudWatch::Alarm
    Properties:
      AlarmName: ${AlarmName}-status
      Namespace: AWS/EC2
      MetricName: StatusCheckFailed
      Dimensions:
        - Name: AutoScalingGroupName
          Value: ${AutoScalingGroupName}
      Period: 60
      Threshold: 1
";

type Manager = AlarmManager<MockStackApi, MockObjectStore, MockMetricApi>;

struct Fixture {
    _dir: TempDir,
    stacks: MockStackApi,
    objects: MockObjectStore,
    metrics: MockMetricApi,
    manager: Manager,
}

fn write_alarm(root: &Path) {
    let dir = root.join("compute/alarm/asg-cpu-util/2020-07-13/Documents");
    fs::create_dir_all(&dir).expect("create alarm dir");
    let metadata = serde_json::json!({
        "alarmName": "ASG CPU utilization",
        "alarmType": "ASG",
        "alarmContentPath": "AlarmTemplate.yml",
        "tag": REFERENCE,
    });
    fs::write(dir.join("metadata.json"), metadata.to_string()).expect("write metadata");
    fs::write(dir.join("AlarmTemplate.yml"), TEMPLATE).expect("write template");
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("tempdir");
    write_alarm(dir.path());
    let stacks = MockStackApi::new();
    let objects = MockObjectStore::new();
    let metrics = MockMetricApi::new();
    let mut settings = AlarmManagerSettings::new(dir.path(), BUCKET);
    settings.teardown_parallelism = 2;
    let manager = AlarmManager::new(stacks.clone(), objects.clone(), metrics.clone(), settings);
    Fixture {
        _dir: dir,
        stacks,
        objects,
        metrics,
        manager,
    }
}

fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
}

fn full_bindings() -> BTreeMap<String, String> {
    bindings(&[
        ("AlarmName", "asg-cpu"),
        ("AutoScalingGroupName", "web-asg"),
        ("Threshold", "80"),
    ])
}

#[tokio::test]
async fn test_missing_binding_is_reported_before_any_call() {
    let mut fx = fixture();
    let err = fx
        .manager
        .deploy_alarm(REFERENCE, &bindings(&[("Threshold", "80")]), None)
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::AlarmMissingVariables);
    let message = err.to_string();
    assert!(message.contains("AlarmName"), "{message}");
    assert!(message.contains("AutoScalingGroupName"), "{message}");
    assert!(fx.objects.keys().is_empty());
    assert!(fx.stacks.calls().is_empty());
}

#[tokio::test]
async fn test_deploy_uploads_rendered_template_and_tracks_stack() {
    let mut fx = fixture();
    let alarm_id = fx
        .manager
        .deploy_alarm(REFERENCE, &full_bindings(), Some("cpu"))
        .await
        .expect("deploy");
    assert_eq!(alarm_id, "cpu");

    let deployed = fx.manager.get("cpu").expect("tracked");
    assert!(deployed.stack_name.starts_with("compute-alarm-asg-cpu-util-2020-07-13-"));
    assert!(deployed.template.get_variables().is_empty());

    let key = format!("alarms/{}.yml", deployed.stack_name);
    let body = fx.objects.object(BUCKET, &key).expect("uploaded template");
    let body = String::from_utf8(body).expect("utf8");
    assert!(body.contains("Value: web-asg"));
    assert!(!body.contains("${"));
    assert_eq!(fx.stacks.stack_names(), vec![deployed.stack_name.clone()]);
}

#[tokio::test]
async fn test_alarms_without_data_are_collected() {
    let mut fx = fixture();
    fx.manager
        .deploy_alarm(REFERENCE, &full_bindings(), None)
        .await
        .expect("deploy");
    fx.metrics.set_datapoints("AWS/EC2", "CPUUtilization", 3);

    let without_data = fx.manager.collect_alarms_without_data(5).await.expect("collect");

    assert_eq!(without_data.keys().collect::<Vec<_>>(), vec!["StatusAlarm"]);
    let spec = &without_data["StatusAlarm"][0];
    assert_eq!(spec.metric_name, "StatusCheckFailed");
    assert_eq!(spec.period, 60);
    assert_eq!(
        spec.dimensions.get("AutoScalingGroupName").map(String::as_str),
        Some("web-asg")
    );

    let queries = fx.metrics.queries();
    assert_eq!(queries.len(), 2);
    let cpu = queries
        .iter()
        .find(|q| q.metric.metric_name == "CPUUtilization")
        .expect("cpu query");
    assert_eq!((cpu.end - cpu.start).num_seconds(), 1500);
}

#[tokio::test]
async fn test_failed_stack_is_cleaned_up_and_reported() {
    let mut fx = fixture();
    fx.stacks.push_outcome(
        "ROLLBACK_COMPLETE",
        vec![StackEventRecord {
            logical_resource_id: "CpuAlarm".to_string(),
            resource_status: "CREATE_FAILED".to_string(),
            reason: Some("Invalid threshold".to_string()),
        }],
    );

    let err = fx
        .manager
        .deploy_alarm(REFERENCE, &full_bindings(), None)
        .await
        .unwrap_err();

    match err {
        AlarmError::StackFailed { status, events, .. } => {
            assert_eq!(status, "ROLLBACK_COMPLETE");
            assert_eq!(events.len(), 1);
            assert!(events[0].contains("Invalid threshold"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(fx.manager.deployed().next().is_none());
    assert!(fx.stacks.calls().iter().any(|c| matches!(c, StackCall::Delete(_))));
}

#[tokio::test]
async fn test_teardown_attempts_every_stack_and_reports_failures() {
    let mut fx = fixture();
    for id in ["a", "b", "c"] {
        fx.stacks.push_outcome(CREATE_COMPLETE, Vec::new());
        fx.manager
            .deploy_alarm(REFERENCE, &full_bindings(), Some(id))
            .await
            .expect("deploy");
    }
    let doomed = fx.manager.get("b").expect("b").stack_name.clone();
    fx.stacks.fail_delete(&doomed);

    let report = fx.manager.destroy_deployed_alarms().await;

    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, doomed);
    assert!(!report.is_clean());
    assert!(fx.manager.deployed().next().is_none());
    let deletes = fx
        .stacks
        .calls()
        .iter()
        .filter(|c| matches!(c, StackCall::Delete(_)))
        .count();
    assert_eq!(deletes, 3);
}

#[tokio::test]
async fn test_reused_alarm_id_is_rejected_and_first_stack_still_torn_down() {
    let mut fx = fixture();
    fx.manager
        .deploy_alarm(REFERENCE, &full_bindings(), Some("cpu"))
        .await
        .expect("first deploy");
    let first = fx.manager.get("cpu").expect("tracked").stack_name.clone();

    let err = fx
        .manager
        .deploy_alarm(REFERENCE, &full_bindings(), Some("cpu"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlarmDuplicateId);
    assert!(matches!(err, AlarmError::DuplicateAlarmId { ref stack, .. } if *stack == first));
    assert_eq!(fx.objects.keys().len(), 1);
    assert_eq!(fx.stacks.stack_names(), vec![first.clone()]);

    let report = fx.manager.destroy_deployed_alarms().await;
    assert_eq!(report.deleted, vec![first]);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_generated_ids_skip_ids_taken_by_caller() {
    let mut fx = fixture();
    fx.manager
        .deploy_alarm(REFERENCE, &full_bindings(), Some("1"))
        .await
        .expect("explicit id");
    let generated = fx
        .manager
        .deploy_alarm(REFERENCE, &full_bindings(), None)
        .await
        .expect("generated id");
    assert_eq!(generated, "2");
    assert_eq!(fx.manager.deployed().count(), 2);
}

#[tokio::test]
async fn test_unknown_reference_is_not_found() {
    let mut fx = fixture();
    let err = fx
        .manager
        .deploy_alarm("compute:alarm:nope:2020-01-01", &full_bindings(), None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlarmTemplateNotFound);

    let err = fx
        .manager
        .deploy_alarm("compute:sop:nope:2020-01-01", &full_bindings(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AlarmError::InvalidReference { .. }));
}
