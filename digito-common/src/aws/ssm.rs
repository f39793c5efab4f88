use crate::ports::{AwsPortError, CreateDocumentRequest, SsmDocumentApi, UpdateDocumentRequest};
use crate::ports::ssm::LATEST_VERSION;
use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::{DocumentFormat, DocumentType, Tag};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SsmAdapter {
    client: aws_sdk_ssm::Client,
}

impl SsmAdapter {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

impl SsmDocumentApi for SsmAdapter {
    async fn describe_document(&self, name: &str) -> Result<bool, AwsPortError> {
        match self.client.describe_document().name(name).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some() => {
                debug!(document = %name, error = %DisplayErrorContext(&err), "document not found");
                Ok(false)
            }
            Err(err) => Err(AwsPortError::transport(
                "DescribeDocument",
                name,
                DisplayErrorContext(&err),
            )),
        }
    }

    async fn get_document_content(&self, name: &str, version: &str) -> Result<String, AwsPortError> {
        let output = self
            .client
            .get_document()
            .name(name)
            .document_version(version)
            .send()
            .await
            .map_err(|err| AwsPortError::service("GetDocument", name, DisplayErrorContext(&err)))?;
        output
            .content()
            .map(str::to_string)
            .ok_or_else(|| AwsPortError::MissingField {
                operation: "GetDocument",
                resource: name.to_string(),
                field: "Content",
            })
    }

    async fn create_document(&self, request: &CreateDocumentRequest) -> Result<(), AwsPortError> {
        let mut call = self
            .client
            .create_document()
            .name(&request.name)
            .content(&request.content)
            .document_type(DocumentType::from(request.document_type.as_str()))
            .document_format(DocumentFormat::from(request.document_format.as_str()));
        for (key, value) in &request.tags {
            let tag = Tag::builder()
                .key(key)
                .value(value)
                .build()
                .map_err(|err| AwsPortError::InvalidRequest {
                    operation: "CreateDocument",
                    resource: request.name.clone(),
                    detail: err.to_string(),
                })?;
            call = call.tags(tag);
        }
        call.send()
            .await
            .map_err(|err| AwsPortError::service("CreateDocument", &request.name, DisplayErrorContext(&err)))?;
        Ok(())
    }

    async fn update_document(&self, request: &UpdateDocumentRequest) -> Result<String, AwsPortError> {
        let output = self
            .client
            .update_document()
            .name(&request.name)
            .content(&request.content)
            .document_version(LATEST_VERSION)
            .document_format(DocumentFormat::from(request.document_format.as_str()))
            .send()
            .await
            .map_err(|err| AwsPortError::service("UpdateDocument", &request.name, DisplayErrorContext(&err)))?;
        output
            .document_description()
            .and_then(|description| description.document_version())
            .map(str::to_string)
            .ok_or_else(|| AwsPortError::MissingField {
                operation: "UpdateDocument",
                resource: request.name.clone(),
                field: "DocumentDescription.DocumentVersion",
            })
    }

    async fn update_default_version(&self, name: &str, version: &str) -> Result<(), AwsPortError> {
        self.client
            .update_document_default_version()
            .name(name)
            .document_version(version)
            .send()
            .await
            .map_err(|err| {
                AwsPortError::service("UpdateDocumentDefaultVersion", name, DisplayErrorContext(&err))
            })?;
        Ok(())
    }
}
