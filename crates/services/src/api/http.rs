use std::env;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use treatment_core::model::{
    AssessmentResult, AssessmentSession, BaselineSession, Identity, ProgressSnapshot, QuestionSet,
    ReviewResultEnvelope, TestNo,
};

use super::{BaselineAnswer, ProgressApi};
use crate::error::ApiError;

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads `TREATMENT_API_BASE_URL` and `TREATMENT_API_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("TREATMENT_API_BASE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let timeout = env::var("TREATMENT_API_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS), Duration::from_secs);
        Some(Self { base_url, timeout })
    }
}

/// `ProgressApi` over HTTP + JSON.
#[derive(Clone)]
pub struct HttpProgressApi {
    client: Client,
    base_url: String,
}

impl HttpProgressApi {
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `ApiError::Disabled` when no configuration is present in the environment.
    pub fn from_env() -> Result<Self, ApiError> {
        let config = ApiConfig::from_env().ok_or(ApiError::Disabled)?;
        Self::new(&config)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        identity: Option<&Identity>,
    ) -> Result<T, ApiError> {
        debug!(path, "GET");
        let cache_buster = Utc::now().timestamp_millis().to_string();
        let mut request = self.client.get(self.url(path));
        if let Some(identity) = identity {
            request = request.query(&[("phone", identity.as_str())]);
        }
        request = request.query(&[("_ts", cache_buster.as_str())]);
        Self::send(request).await
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<MutationResponse, ApiError> {
        debug!(path, "POST");
        let response: MutationResponse =
            Self::send(self.client.post(self.url(path)).json(body)).await?;
        if response.ok {
            Ok(response)
        } else {
            Err(ApiError::Rejected {
                reason: response.error,
            })
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ProgressApi for HttpProgressApi {
    async fn fetch_state(&self, identity: &Identity) -> Result<ProgressSnapshot, ApiError> {
        self.get("state", Some(identity)).await
    }

    async fn baseline_state(
        &self,
        identity: &Identity,
    ) -> Result<Option<BaselineSession>, ApiError> {
        let body: SessionResponse<BaselineSession> =
            self.get("baseline/state", Some(identity)).await?;
        Ok(body.session)
    }

    async fn baseline_start(&self, identity: &Identity) -> Result<(), ApiError> {
        self.post("baseline/start", &PhoneBody::new(identity)).await?;
        Ok(())
    }

    async fn baseline_answer(
        &self,
        identity: &Identity,
        answer: &BaselineAnswer,
    ) -> Result<(), ApiError> {
        let body = BaselineAnswerBody {
            phone: identity.as_str(),
            answer,
        };
        self.post("baseline/answer", &body).await?;
        Ok(())
    }

    async fn baseline_submit(&self, identity: &Identity) -> Result<(), ApiError> {
        self.post("baseline/submit", &PhoneBody::new(identity)).await?;
        Ok(())
    }

    async fn question_set(&self) -> Result<QuestionSet, ApiError> {
        self.get("review/question-set", None).await
    }

    async fn review_state(
        &self,
        identity: &Identity,
    ) -> Result<Option<AssessmentSession>, ApiError> {
        let body: SessionResponse<AssessmentSession> =
            self.get("review/state", Some(identity)).await?;
        Ok(body.session)
    }

    async fn review_start(&self, identity: &Identity) -> Result<(), ApiError> {
        self.post("review/start", &PhoneBody::new(identity)).await?;
        Ok(())
    }

    async fn review_answer(
        &self,
        identity: &Identity,
        test: TestNo,
        index: usize,
        value: i32,
    ) -> Result<(), ApiError> {
        let body = ReviewAnswerBody {
            phone: identity.as_str(),
            test_no: test,
            index,
            value,
        };
        self.post("review/answer", &body).await?;
        Ok(())
    }

    async fn review_complete_test(
        &self,
        identity: &Identity,
        test: TestNo,
    ) -> Result<(), ApiError> {
        let body = CompleteTestBody {
            phone: identity.as_str(),
            test_no: test,
        };
        self.post("review/complete-test", &body).await?;
        Ok(())
    }

    async fn review_skip_test2(&self, identity: &Identity) -> Result<(), ApiError> {
        self.post("review/skip-test2", &PhoneBody::new(identity)).await?;
        Ok(())
    }

    async fn review_finish(
        &self,
        identity: &Identity,
    ) -> Result<Option<AssessmentResult>, ApiError> {
        let response = self.post("review/finish", &PhoneBody::new(identity)).await?;
        Ok(response.result)
    }

    async fn review_result(&self, identity: &Identity) -> Result<ReviewResultEnvelope, ApiError> {
        self.get("review/result", Some(identity)).await
    }
}

//
// ─── WIRE SHAPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct PhoneBody<'a> {
    phone: &'a str,
}

impl<'a> PhoneBody<'a> {
    fn new(identity: &'a Identity) -> Self {
        Self {
            phone: identity.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct BaselineAnswerBody<'a> {
    phone: &'a str,
    #[serde(flatten)]
    answer: &'a BaselineAnswer,
}

#[derive(Debug, Serialize)]
struct ReviewAnswerBody<'a> {
    phone: &'a str,
    test_no: TestNo,
    index: usize,
    value: i32,
}

#[derive(Debug, Serialize)]
struct CompleteTestBody<'a> {
    phone: &'a str,
    test_no: TestNo,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Option<AssessmentResult>,
}

#[derive(Debug, Deserialize)]
struct SessionResponse<T> {
    session: Option<T>,
}
