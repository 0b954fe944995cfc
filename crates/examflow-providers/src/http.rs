//! HTTP exam backend client.
//!
//! Implements both service traits against a REST backend:
//!
//! - `GET  /api/exams/{exam_id}` — exam definition
//! - `POST /api/exams/{exam_id}/attempts` — start an attempt
//! - `PUT  /api/attempts/{attempt_id}/answers/{question_id}` — save one answer
//! - `POST /api/attempts/{attempt_id}/submit` — finalize

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use examflow_core::model::{
    Answer, AnswerValue, AttemptHandle, ConfirmationReceipt, ExamDefinition,
};
use examflow_core::traits::{AnswerPersistence, AttemptStart, ExamContentProvider, SaveAck};

use crate::error::TransportError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the remote exam backend.
pub struct HttpExamService {
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpExamService {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: &str, token: Option<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout_secs,
            client,
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn send_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Map a non-2xx response to a `TransportError`. `subject` names the
/// resource for 404/409 responses (exam id or attempt id).
async fn error_for_status(
    response: reqwest::Response,
    subject: &str,
    attempt_scoped: bool,
) -> TransportError {
    let status = response.status().as_u16();
    match status {
        401 => {
            let body = response.text().await.unwrap_or_default();
            TransportError::AuthenticationFailed(body)
        }
        404 if attempt_scoped => TransportError::AttemptNotFound(subject.to_string()),
        404 => TransportError::ExamNotFound(subject.to_string()),
        409 => TransportError::AttemptClosed(subject.to_string()),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            TransportError::RateLimited {
                retry_after_ms: retry_after,
            }
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            TransportError::ApiError { status, message }
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct StartAttemptResponse {
    attempt_id: String,
    started_at: DateTime<Utc>,
    /// Present when the server regenerated or reordered the question set.
    #[serde(default)]
    exam: Option<ExamDefinition>,
}

#[derive(Serialize)]
struct SaveAnswerRequest<'a> {
    value: &'a AnswerValue,
    revision: u64,
}

#[derive(Serialize)]
struct FinalizeRequest<'a> {
    answers: &'a [Answer],
}

#[async_trait]
impl ExamContentProvider for HttpExamService {
    #[instrument(skip(self))]
    async fn fetch_exam(&self, exam_id: &str) -> anyhow::Result<ExamDefinition> {
        let response = self
            .request(
                self.client
                    .get(format!("{}/api/exams/{exam_id}", self.base_url)),
            )
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, exam_id, false).await.into());
        }

        let exam: ExamDefinition =
            response.json().await.map_err(|e| TransportError::ApiError {
                status: 0,
                message: format!("failed to parse exam response: {e}"),
            })?;
        Ok(exam)
    }

    #[instrument(skip(self))]
    async fn start_attempt(&self, exam_id: &str) -> anyhow::Result<AttemptStart> {
        let response = self
            .request(
                self.client
                    .post(format!("{}/api/exams/{exam_id}/attempts", self.base_url)),
            )
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, exam_id, false).await.into());
        }

        let body: StartAttemptResponse =
            response.json().await.map_err(|e| TransportError::ApiError {
                status: 0,
                message: format!("failed to parse attempt response: {e}"),
            })?;

        Ok(AttemptStart {
            handle: AttemptHandle {
                attempt_id: body.attempt_id,
                started_at: body.started_at,
            },
            exam: body.exam,
        })
    }
}

#[async_trait]
impl AnswerPersistence for HttpExamService {
    #[instrument(skip(self, value), fields(attempt_id = %handle.attempt_id))]
    async fn save_answer(
        &self,
        handle: &AttemptHandle,
        question_id: &str,
        value: &AnswerValue,
        revision: u64,
    ) -> anyhow::Result<SaveAck> {
        let response = self
            .request(self.client.put(format!(
                "{}/api/attempts/{}/answers/{question_id}",
                self.base_url, handle.attempt_id
            )))
            .json(&SaveAnswerRequest { value, revision })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &handle.attempt_id, true)
                .await
                .into());
        }

        Ok(SaveAck {
            question_id: question_id.to_string(),
            revision,
        })
    }

    #[instrument(skip(self, answers), fields(attempt_id = %handle.attempt_id))]
    async fn finalize_attempt(
        &self,
        handle: &AttemptHandle,
        answers: &[Answer],
    ) -> anyhow::Result<ConfirmationReceipt> {
        let response = self
            .request(self.client.post(format!(
                "{}/api/attempts/{}/submit",
                self.base_url, handle.attempt_id
            )))
            .json(&FinalizeRequest { answers })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &handle.attempt_id, true)
                .await
                .into());
        }

        let receipt: ConfirmationReceipt =
            response.json().await.map_err(|e| TransportError::ApiError {
                status: 0,
                message: format!("failed to parse receipt: {e}"),
            })?;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn handle() -> AttemptHandle {
        AttemptHandle {
            attempt_id: "attempt-1".into(),
            started_at: Utc::now(),
        }
    }

    fn exam_json() -> serde_json::Value {
        serde_json::json!({
            "id": "rust-101",
            "title": "Rust Basics",
            "duration_secs": 600,
            "questions": [
                {
                    "id": "q1",
                    "prompt": "What does `let` introduce?",
                    "kind": "single-choice",
                    "choices": [
                        {"id": "a", "text": "A binding"},
                        {"id": "b", "text": "A loop"}
                    ]
                },
                {"id": "q2", "prompt": "Explain ownership.", "kind": "free-text"}
            ]
        })
    }

    #[tokio::test]
    async fn fetch_exam_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/exams/rust-101"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(exam_json()))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), Some("test-token".into()));
        let exam = service.fetch_exam("rust-101").await.unwrap();
        assert_eq!(exam.id, "rust-101");
        assert_eq!(exam.duration_secs, 600);
        assert_eq!(exam.questions.len(), 2);
    }

    #[tokio::test]
    async fn fetch_exam_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/exams/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let err = service.fetch_exam("missing").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::ExamNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/exams/rust-101"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), Some("stale".into()));
        let err = service.fetch_exam("rust-101").await.unwrap_err();
        let transport = err.downcast_ref::<TransportError>().unwrap();
        assert!(transport.is_permanent());
        assert!(transport.to_string().contains("authentication"));
    }

    #[tokio::test]
    async fn start_attempt_adopts_server_question_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/exams/rust-101/attempts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "attempt_id": "attempt-9",
                "started_at": "2026-03-01T09:00:00Z",
                "exam": exam_json(),
            })))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let start = service.start_attempt("rust-101").await.unwrap();
        assert_eq!(start.handle.attempt_id, "attempt-9");
        assert!(start.exam.is_some());
    }

    #[tokio::test]
    async fn start_attempt_without_question_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/exams/rust-101/attempts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "attempt_id": "attempt-9",
                "started_at": "2026-03-01T09:00:00Z",
            })))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let start = service.start_attempt("rust-101").await.unwrap();
        assert!(start.exam.is_none());
    }

    #[tokio::test]
    async fn save_answer_carries_value_and_revision() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/attempts/attempt-1/answers/q1"))
            .and(body_partial_json(serde_json::json!({
                "value": {"choice": "a"},
                "revision": 3,
            })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let ack = service
            .save_answer(&handle(), "q1", &AnswerValue::Choice("a".into()), 3)
            .await
            .unwrap();
        assert_eq!(ack.question_id, "q1");
        assert_eq!(ack.revision, 3);
    }

    #[tokio::test]
    async fn save_answer_to_closed_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/attempts/attempt-1/answers/q1"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let err = service
            .save_answer(&handle(), "q1", &AnswerValue::Text("late".into()), 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::AttemptClosed(_))
        ));
    }

    #[tokio::test]
    async fn finalize_returns_receipt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/attempts/attempt-1/submit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "attempt_id": "attempt-1",
                "received_answers": 2,
                "completed_at": "2026-03-01T09:10:00Z",
            })))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let answers = vec![
            Answer {
                question_id: "q1".into(),
                value: AnswerValue::Choice("a".into()),
                revision: 1,
            },
            Answer {
                question_id: "q2".into(),
                value: AnswerValue::Text("moves".into()),
                revision: 2,
            },
        ];
        let receipt = service
            .finalize_attempt(&handle(), &answers)
            .await
            .unwrap();
        assert_eq!(receipt.attempt_id, "attempt-1");
        assert_eq!(receipt.received_answers, 2);
    }

    #[tokio::test]
    async fn rate_limiting_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/attempts/attempt-1/submit"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let err = service
            .finalize_attempt(&handle(), &[])
            .await
            .unwrap_err();
        let transport = err.downcast_ref::<TransportError>().unwrap();
        assert_eq!(transport.retry_after_ms(), Some(5000));
    }

    #[tokio::test]
    async fn api_error_message_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/exams/rust-101"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"error": "database offline"})),
            )
            .mount(&server)
            .await;

        let service = HttpExamService::new(&server.uri(), None);
        let err = service.fetch_exam("rust-101").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransportError>(),
            Some(TransportError::ApiError { status: 500, message }) if message == "database offline"
        ));
    }
}
