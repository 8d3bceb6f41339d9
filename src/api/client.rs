//! reqwest client for the pipeline endpoints

use super::types::{ApiResponse, FileOperationResponse, GenerateExcelRequest, ProgressResponse};
use crate::config::ClientConfig;
use crate::error::ApiError;
use futures_util::future::BoxFuture;
use log::{debug, info};
use reqwest::multipart::Form;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Seam between the tracking core and the generation endpoints.
///
/// `ApiClient` implements it over HTTP; tests drive the submitter and the
/// poller through in-memory fakes.
pub trait GenerationApi: Send + Sync {
    fn submit_generation<'a>(
        &'a self,
        request: &'a GenerateExcelRequest,
    ) -> BoxFuture<'a, Result<ApiResponse<String>, ApiError>>;

    fn fetch_progress<'a>(
        &'a self,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<ApiResponse<ProgressResponse>, ApiError>>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = ClientBuilder::new()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `POST /generate-excel`. Each call starts a new server job.
    pub async fn generate_excel(
        &self,
        request: &GenerateExcelRequest,
    ) -> Result<ApiResponse<String>, ApiError> {
        info!(
            "generate_excel: records={} file_name={:?}",
            request.records, request.file_name
        );
        let response = self
            .http
            .post(self.endpoint("generate-excel"))
            .json(request)
            .send()
            .await?;
        read_envelope(response).await
    }

    /// `GET /generate-excel/progress/{operationId}`
    pub async fn generation_progress(
        &self,
        operation_id: &str,
    ) -> Result<ApiResponse<ProgressResponse>, ApiError> {
        let url = self.endpoint(&format!(
            "generate-excel/progress/{}",
            urlencoding::encode(operation_id)
        ));
        debug!("generation_progress: {}", operation_id);
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(operation_id.to_string()));
        }
        read_envelope(response).await
    }

    pub async fn health_check(&self) -> Result<ApiResponse<String>, ApiError> {
        let response = self.http.get(self.endpoint("health")).send().await?;
        read_envelope(response).await
    }

    /// Multipart POST used by the transfer emitter.
    pub(crate) async fn post_file(
        &self,
        path: &str,
        form: Form,
    ) -> Result<ApiResponse<FileOperationResponse>, ApiError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .multipart(form)
            .send()
            .await?;
        read_envelope(response).await
    }
}

impl GenerationApi for ApiClient {
    fn submit_generation<'a>(
        &'a self,
        request: &'a GenerateExcelRequest,
    ) -> BoxFuture<'a, Result<ApiResponse<String>, ApiError>> {
        Box::pin(self.generate_excel(request))
    }

    fn fetch_progress<'a>(
        &'a self,
        operation_id: &'a str,
    ) -> BoxFuture<'a, Result<ApiResponse<ProgressResponse>, ApiError>> {
        Box::pin(self.generation_progress(operation_id))
    }
}

/// Decode the `{success, message, data}` envelope.
///
/// Error statuses that still carry an envelope with `success == false` are
/// returned as-is so callers can surface the server message.
async fn read_envelope<T: DeserializeOwned>(
    response: Response,
) -> Result<ApiResponse<T>, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    match serde_json::from_str::<ApiResponse<T>>(&body) {
        Ok(envelope) if status.is_success() || !envelope.success => Ok(envelope),
        Ok(_) => Err(ApiError::Status { status, body }),
        Err(err) if status.is_success() => Err(ApiError::Decode(err)),
        Err(_) => Err(ApiError::Status { status, body }),
    }
}
