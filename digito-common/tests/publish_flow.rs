//! Discovery through publish against the in-memory SSM store.

use digito_common::assemble::{BuilderRegistry, DocumentAssembler, SnippetRegistry};
use digito_common::metadata::{MetadataError, MetadataStore};
use digito_common::ports::{MockSsmDocumentApi, SsmCall};
use digito_common::publish::{
    PublishError, PublishOutcome, Publisher, REFERENCE_ID_TAG, get_documents_list_by_manifest_file,
    get_documents_list_by_names,
};
use digito_common::testing::{TestLogger, TestPhase, init_global_test_logging};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[ctor::ctor]
fn setup() {
    init_global_test_logging();
}

const TEST_NAME: &str = "Digito-KillProcessOnEc2Test_2020-07-28";
const TEST_TAG: &str = "compute:test:ec2-kill_process:2020-07-28";
const UTIL_NAME: &str = "Digito-CommonHelpers_2020-07-28";

const TEST_CONTENT: &str = "\
description: Kill a process on an instance
schemaVersion: '0.3'
assumeRole: '{{ AutomationAssumeRole }}'
parameters:
  AutomationAssumeRole:
    type: String
    description: (Required) The role
mainSteps:
  - name: KillProcess
    action: aws:executeScript
    inputs:
      Runtime: python3.8
      Handler: kill
      Script: |-
        SCRIPT_PLACEHOLDER::ec2.process.imports

        SCRIPT_PLACEHOLDER::ec2.process.kill
";

const SCRIPT: &str = "import boto3\n\n\ndef kill(events, context):\n    return {'killed': True}\n";

struct Corpus {
    dir: TempDir,
    store: MetadataStore,
    assembler: DocumentAssembler,
}

fn write_document(root: &Path, relative: &str, metadata: serde_json::Value, content: &str) {
    let dir = root.join("documents").join(relative).join("Documents");
    fs::create_dir_all(&dir).expect("create document dir");
    fs::write(dir.join("metadata.json"), metadata.to_string()).expect("write metadata");
    fs::write(dir.join("AutomationDocument.yml"), content).expect("write content");
}

fn document_metadata(name: &str, tag: &str, depends_on: Option<&str>) -> serde_json::Value {
    let mut metadata = serde_json::json!({
        "documentName": name,
        "documentType": "Automation",
        "documentFormat": "YAML",
        "documentContentPath": "AutomationDocument.yml",
        "tag": tag,
        "risk": "SMALL",
        "failureType": "SOFTWARE",
        "minorVersion": "001"
    });
    if let Some(depends_on) = depends_on {
        metadata["dependsOn"] = serde_json::json!(depends_on);
    }
    metadata
}

fn corpus(test_content: &str) -> Corpus {
    let dir = TempDir::new().expect("tempdir");
    write_document(
        dir.path(),
        "compute/test/ec2-kill_process/2020-07-28",
        document_metadata(TEST_NAME, TEST_TAG, Some(UTIL_NAME)),
        test_content,
    );
    write_document(
        dir.path(),
        "common/util/helpers/2020-07-28",
        document_metadata(UTIL_NAME, "common:util:helpers:2020-07-28", None),
        "description: helpers\nschemaVersion: '0.3'\nmainSteps: []\n",
    );
    let scripts = dir.path().join("scripts/ec2");
    fs::create_dir_all(&scripts).expect("create scripts dir");
    fs::write(scripts.join("process.py"), SCRIPT).expect("write script");

    let store = MetadataStore::discover(&dir.path().join("documents")).expect("discover");
    let snippets = SnippetRegistry::from_scripts_dir(&dir.path().join("scripts")).expect("snippets");
    Corpus {
        dir,
        store,
        assembler: DocumentAssembler::new(snippets, BuilderRegistry::new()),
    }
}

fn is_create(call: &SsmCall) -> bool {
    matches!(call, SsmCall::Create(_))
}

fn is_update(call: &SsmCall) -> bool {
    matches!(call, SsmCall::Update(_))
}

#[tokio::test]
async fn test_new_document_is_created_with_reference_tag() {
    let logger = TestLogger::for_test("test_new_document_is_created_with_reference_tag");
    logger.log(TestPhase::Setup, "writing corpus");
    let corpus = corpus(TEST_CONTENT);
    let documents =
        get_documents_list_by_names(&corpus.store, &[TEST_NAME.to_string()]).expect("resolve");
    let names: Vec<&str> = documents.iter().map(|d| d.document_name.as_str()).collect();
    assert_eq!(names, vec![UTIL_NAME, TEST_NAME]);

    let ssm = MockSsmDocumentApi::new();
    let publisher = Publisher::new(ssm.clone(), corpus.assembler);
    logger.log(TestPhase::Execute, "publishing");
    let report = publisher.publish_document(&documents).await.expect("publish");

    logger.log_value(TestPhase::Verify, "publish report", &report);
    assert_eq!(report.outcome(TEST_NAME), Some(&PublishOutcome::Created));
    assert_eq!(ssm.count_calls(is_create), 2);
    assert_eq!(
        ssm.tags(TEST_NAME),
        vec![(REFERENCE_ID_TAG.to_string(), TEST_TAG.to_string())]
    );

    let stored = ssm.latest_content(TEST_NAME).expect("stored content");
    assert!(!stored.contains("SCRIPT_PLACEHOLDER"));
    assert!(stored.contains("        import boto3\n"));
    assert!(stored.contains("        def kill(events, context):\n            return {'killed': True}\n"));
}

#[tokio::test]
async fn test_publishing_twice_changes_nothing() {
    let corpus = corpus(TEST_CONTENT);
    let documents =
        get_documents_list_by_names(&corpus.store, &[TEST_NAME.to_string()]).expect("resolve");
    let ssm = MockSsmDocumentApi::new();
    let publisher = Publisher::new(ssm.clone(), corpus.assembler);

    publisher.publish_document(&documents).await.expect("first publish");
    ssm.clear_calls();
    let report = publisher.publish_document(&documents).await.expect("second publish");

    assert_eq!(report.count(|o| *o == PublishOutcome::Unchanged), 2);
    assert_eq!(ssm.count_calls(is_create), 0);
    assert_eq!(ssm.count_calls(is_update), 0);
}

#[tokio::test]
async fn test_changed_content_updates_and_moves_default_version() {
    let first = corpus(TEST_CONTENT);
    let documents =
        get_documents_list_by_names(&first.store, &[TEST_NAME.to_string()]).expect("resolve");
    let ssm = MockSsmDocumentApi::new();
    Publisher::new(ssm.clone(), first.assembler)
        .publish_document(&documents)
        .await
        .expect("first publish");

    let edited = TEST_CONTENT.replace("Kill a process", "Kill one process");
    let second = corpus(&edited);
    let documents =
        get_documents_list_by_names(&second.store, &[TEST_NAME.to_string()]).expect("resolve");
    ssm.clear_calls();
    let report = Publisher::new(ssm.clone(), second.assembler)
        .publish_document(&documents)
        .await
        .expect("second publish");

    assert_eq!(
        report.outcome(TEST_NAME),
        Some(&PublishOutcome::Updated {
            version: "2".to_string()
        })
    );
    assert_eq!(report.outcome(UTIL_NAME), Some(&PublishOutcome::Unchanged));

    let calls = ssm.calls();
    let update_index = calls.iter().position(is_update).expect("one update");
    assert_eq!(calls.iter().filter(|c| is_update(c)).count(), 1);
    assert_eq!(
        calls[update_index + 1],
        SsmCall::UpdateDefaultVersion {
            name: TEST_NAME.to_string(),
            version: "2".to_string()
        }
    );
    assert_eq!(ssm.default_version(TEST_NAME).as_deref(), Some("2"));
}

#[tokio::test]
async fn test_dry_run_never_touches_ssm() {
    let corpus = corpus(TEST_CONTENT);
    let documents =
        get_documents_list_by_names(&corpus.store, &[TEST_NAME.to_string()]).expect("resolve");
    let ssm = MockSsmDocumentApi::new();
    let report = Publisher::new(ssm.clone(), corpus.assembler)
        .dry_run(true)
        .publish_document(&documents)
        .await
        .expect("dry run");

    assert!(matches!(
        report.outcome(TEST_NAME),
        Some(PublishOutcome::DryRun { bytes }) if *bytes > 0
    ));
    assert!(ssm.calls().is_empty());
}

#[tokio::test]
async fn test_create_failure_aborts_the_run() {
    let corpus = corpus(TEST_CONTENT);
    let documents =
        get_documents_list_by_names(&corpus.store, &[TEST_NAME.to_string()]).expect("resolve");
    let ssm = MockSsmDocumentApi::new();
    ssm.fail_next("CreateDocument", "AccessDenied");

    let err = Publisher::new(ssm.clone(), corpus.assembler)
        .publish_document(&documents)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Create { ref document, .. } if document == UTIL_NAME));
    assert!(ssm.latest_content(TEST_NAME).is_none());
}

#[test]
fn test_manifest_selection_and_missing_dependencies() {
    let corpus = corpus(TEST_CONTENT);
    let manifest = corpus.dir.path().join("manifest.txt");
    fs::write(&manifest, format!("# documents to ship\n\n{TEST_NAME}\n")).expect("write manifest");

    let documents = get_documents_list_by_manifest_file(&corpus.store, &manifest).expect("manifest");
    assert_eq!(documents.len(), 2);

    let err = get_documents_list_by_names(&corpus.store, &["Digito-Nope_2020-01-01".to_string()])
        .unwrap_err();
    assert!(matches!(err, MetadataError::DependencyMissing { ref names } if names == &["Digito-Nope_2020-01-01".to_string()]));
}
