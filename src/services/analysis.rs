use serde::Deserialize;

use crate::error::AppError;

/// Client for the external document-analysis service. Documents live there
/// under an opaque numeric id captured at upload time; everything else this
/// service does with them is keyed by that id.
#[derive(Clone)]
pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadDocResponse {
    id: i64,
}

#[derive(Deserialize)]
struct GetTextResponse {
    #[serde(default)]
    texts: Vec<String>,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// POST /upload_doc — register the document and return its external id.
    pub async fn upload_document(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<i64, AppError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|_| AppError::BadRequest("Invalid content type".to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{}/upload_doc", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Analysis service unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Analysis service rejected the upload (status {})",
                resp.status()
            )));
        }

        let body: UploadDocResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Bad upload response: {e}")))?;
        Ok(body.id)
    }

    /// GET /get_text/{id} — extracted text of an uploaded document.
    pub async fn fetch_text(&self, external_id: i64) -> Result<Vec<String>, AppError> {
        let resp = self
            .http
            .get(format!("{}/get_text/{}", self.base_url, external_id))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Analysis service unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to fetch document text (status {})",
                resp.status()
            )));
        }

        let body: GetTextResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Bad get_text response: {e}")))?;
        Ok(body.texts)
    }

    /// PUT /doc_analyse/{id} — kick off analysis. Failure here is transient
    /// for the caller: ledger state is untouched and the trigger can be
    /// retried without re-paying.
    pub async fn trigger_analysis(&self, external_id: i64) -> Result<(), AppError> {
        let resp = self
            .http
            .put(format!("{}/doc_analyse/{}", self.base_url, external_id))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Analysis service unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to start analysis (status {})",
                resp.status()
            )));
        }
        Ok(())
    }

    /// DELETE /doc_delete/{id} — best-effort; callers may ignore the error.
    pub async fn delete_document(&self, external_id: i64) -> Result<(), AppError> {
        let resp = self
            .http
            .delete(format!("{}/doc_delete/{}", self.base_url, external_id))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Analysis service unreachable: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to delete document (status {})",
                resp.status()
            )));
        }
        Ok(())
    }
}
