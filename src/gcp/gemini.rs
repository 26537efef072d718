//! Vertex AI Gemini client for structured document extraction.

use crate::gcp::{
    http::{GcpHttp, join_url},
    types::{ExtractionRequest, GcpError, GenerateContentResponse},
};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Value, json};

const SERVICE: &str = "aiplatform";

/// Generative model answering a document extraction request with JSON text.
#[async_trait]
pub trait MetadataModel: Send + Sync {
    /// Run the extraction and return the raw text of the model's answer.
    async fn generate_json(&self, request: &ExtractionRequest) -> Result<String, GcpError>;
}

/// Gemini model published by Google on Vertex AI.
pub struct GeminiClient {
    pub(crate) http: GcpHttp,
    pub(crate) generate_url: String,
}

impl GeminiClient {
    /// Address `model` in `location` of `project`.
    pub fn new(http: GcpHttp, endpoint: &str, project: &str, location: &str, model: &str) -> Self {
        let generate_url = join_url(
            endpoint,
            &format!(
                "v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent"
            ),
        );
        Self { http, generate_url }
    }
}

/// Build the `generateContent` body for an extraction request.
pub fn generate_content_body(request: &ExtractionRequest) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "fileData": {
                        "mimeType": request.mime_type,
                        "fileUri": request.file_uri
                    }
                },
                { "text": request.instruction }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
            "temperature": request.temperature
        }
    })
}

#[async_trait]
impl MetadataModel for GeminiClient {
    async fn generate_json(&self, request: &ExtractionRequest) -> Result<String, GcpError> {
        let response = self
            .http
            .request(Method::POST, &self.generate_url)
            .await?
            .json(&generate_content_body(request))
            .send()
            .await?;
        let payload: GenerateContentResponse = GcpHttp::read_json(SERVICE, response).await?;

        let candidate = payload
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GcpError::invalid(SERVICE, "response contained no candidates"))?;
        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.is_empty() {
            return Err(GcpError::invalid(SERVICE, "candidate contained no text"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcp::http::test_transport;
    use httpmock::{Method::POST, MockServer};

    fn request() -> ExtractionRequest {
        ExtractionRequest {
            file_uri: "gs://leases/lease-sample/a.pdf".into(),
            mime_type: "application/pdf".into(),
            instruction: "Extract the lease fields.".into(),
            response_schema: json!({ "type": "OBJECT" }),
            temperature: 0.0,
        }
    }

    #[test]
    fn body_carries_document_instruction_and_schema() {
        let body = generate_content_body(&request());
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["fileData"]["fileUri"], "gs://leases/lease-sample/a.pdf");
        assert_eq!(parts[0]["fileData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["text"], "Extract the lease fields.");
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "OBJECT");
        assert_eq!(config["temperature"], 0.0);
    }

    #[tokio::test]
    async fn candidate_parts_are_concatenated() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path(
                    "/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent",
                );
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{ "text": "{\"city\":" }, { "text": "\"Toronto\"}" }]
                        }
                    }]
                }));
            })
            .await;

        let client = GeminiClient::new(
            test_transport(),
            &server.base_url(),
            "demo",
            "us-central1",
            "gemini-2.5-flash",
        );
        let text = client.generate_json(&request()).await.expect("generate");

        mock.assert();
        assert_eq!(text, "{\"city\":\"Toronto\"}");
    }

    #[tokio::test]
    async fn empty_candidates_are_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let client = GeminiClient::new(test_transport(), &server.base_url(), "p", "l", "m");
        let err = client.generate_json(&request()).await.expect_err("empty");
        assert!(matches!(err, GcpError::InvalidResponse { .. }));
    }
}
