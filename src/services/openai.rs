// src/services/openai.rs
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::ocr::{ExtractedCoupon, OcrError, OcrProvider, GPT4O_PROVIDER};

const EXTRACTION_PROMPT: &str = r#"Analyze this coupon image and extract the following information in JSON format:
{
    "code": "the coupon/promo code",
    "title": "coupon title or description",
    "provider": "business or merchant name",
    "discount": "discount amount or percentage",
    "terms": "terms and conditions visible",
    "expiryDate": "ISO format date when coupon expires",
    "deadline": "ISO format deadline date if different from expiry"
}

If a field is not visible or unclear, use null. Return only valid JSON."#;

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub max_retries: u32,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o".to_string(),
            max_tokens: 1024,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<VisionMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct VisionMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Shape the model is asked to answer with; dates are still strings here
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExtraction {
    code: Option<String>,
    title: Option<String>,
    provider: Option<String>,
    discount: Option<String>,
    terms: Option<String>,
    expiry_date: Option<String>,
    deadline: Option<String>,
}

/// GPT-4o vision backed coupon extraction
#[derive(Debug)]
pub struct OpenAIVisionOcr {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIVisionOcr {
    pub fn new(config: OpenAIConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { config, client }
    }

    fn build_request(&self, image: &[u8]) -> ChatCompletionRequest {
        let data_url = format!("data:image/jpeg;base64,{}", BASE64.encode(image));

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![VisionMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: self.config.max_tokens,
        }
    }

    /// Make API request with retry logic
    async fn make_request_with_retry(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OcrError> {
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.make_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_retryable() => {
                    warn!(attempt = attempt, error = %e, "OpenAI OCR request failed, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        attempt = attempt,
                        max_retries = max_retries,
                        error = %e,
                        "OpenAI OCR request failed, retrying..."
                    );
                    last_error = Some(e);

                    // Exponential backoff
                    if attempt < max_retries {
                        let delay = std::time::Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| OcrError::RequestFailed("Unknown error".to_string())))
    }

    /// Make a single API request
    async fn make_request(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OcrError> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| OcrError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "OpenAI API request failed");
            return Err(status_error(status, &error_text));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| OcrError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl OcrProvider for OpenAIVisionOcr {
    fn name(&self) -> &str {
        GPT4O_PROVIDER
    }

    async fn extract(&self, image: &[u8]) -> Result<ExtractedCoupon, OcrError> {
        let request = self.build_request(image);

        debug!(
            model = %self.config.model,
            image_bytes = image.len(),
            "Sending OpenAI coupon extraction request"
        );

        let response = self.make_request_with_retry(&request).await?;

        if let Some(usage) = &response.usage {
            info!(
                model = %self.config.model,
                tokens_used = usage.total_tokens,
                "OpenAI coupon extraction completed"
            );
        }

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or_else(|| OcrError::InvalidResponse("No choices in response".to_string()))?;

        parse_extraction(content)
    }
}

/// Map a non-success HTTP status to an error; only 429 and 5xx are worth retrying
fn status_error(status: reqwest::StatusCode, body: &str) -> OcrError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        OcrError::RateLimitExceeded
    } else if status.is_server_error() {
        OcrError::RequestFailed(format!("HTTP {}: {}", status, body))
    } else {
        OcrError::Rejected(format!("HTTP {}: {}", status, body))
    }
}

/// Parse the model's reply into coupon fields
///
/// Models often wrap JSON in a Markdown fence even when told not to.
pub fn parse_extraction(content: &str) -> Result<ExtractedCoupon, OcrError> {
    let json = strip_code_fence(content);
    let raw: RawExtraction = serde_json::from_str(json)
        .map_err(|e| OcrError::InvalidResponse(format!("reply is not coupon JSON: {}", e)))?;

    Ok(ExtractedCoupon {
        code: non_blank(raw.code),
        title: non_blank(raw.title),
        provider: non_blank(raw.provider),
        discount: non_blank(raw.discount),
        terms: non_blank(raw.terms),
        expiry_date: raw.expiry_date.as_deref().and_then(parse_date),
        deadline: raw.deadline.as_deref().and_then(parse_date),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// RFC 3339, naive datetime (taken as UTC) or a plain date at midnight UTC
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()),
        Err(_) => {
            debug!(value = %value, "Unparsable date in OCR reply");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config() {
        let config = OpenAIConfig::new("sk-test");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_only_throttling_and_server_errors_retry() {
        let throttled = status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(throttled, OcrError::RateLimitExceeded));
        assert!(throttled.is_retryable());

        let unavailable = status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "try later");
        assert!(matches!(unavailable, OcrError::RequestFailed(_)));
        assert!(unavailable.is_retryable());

        let bad_image = status_error(reqwest::StatusCode::BAD_REQUEST, "invalid image");
        assert!(matches!(bad_image, OcrError::Rejected(_)));
        assert!(!bad_image.is_retryable());
        assert!(!status_error(reqwest::StatusCode::UNAUTHORIZED, "bad key").is_retryable());

        assert!(!OcrError::InvalidResponse("not json".to_string()).is_retryable());
    }

    #[test]
    fn test_request_shape() {
        let ocr = OpenAIVisionOcr::new(OpenAIConfig::new("sk-test"));
        let request = ocr.build_request(b"\xff\xd8\xff");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 1024);
        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/jpeg;base64,/9j/"
        );
    }

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"code":"SAVE20","title":"20% off","provider":"TechStore","discount":"20%","terms":null,"expiryDate":"2026-12-31T23:59:59Z","deadline":null}"#;
        let extracted = parse_extraction(reply).unwrap();

        assert_eq!(extracted.code.as_deref(), Some("SAVE20"));
        assert_eq!(extracted.terms, None);
        assert_eq!(
            extracted.expiry_date,
            Some(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap())
        );
        assert_eq!(extracted.deadline, None);
    }

    #[test]
    fn test_parse_fenced_json_and_loose_dates() {
        let reply = "```json\n{\"code\": \" WELCOME5 \", \"title\": \"\", \"expiryDate\": \"2026-07-04\", \"deadline\": \"2026-07-01 10:30:00\"}\n```";
        let extracted = parse_extraction(reply).unwrap();

        assert_eq!(extracted.code.as_deref(), Some("WELCOME5"));
        assert_eq!(extracted.title, None);
        assert_eq!(
            extracted.expiry_date,
            Some(Utc.with_ymd_and_hms(2026, 7, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(
            extracted.deadline,
            Some(Utc.with_ymd_and_hms(2026, 7, 1, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(matches!(
            parse_extraction("I could not read this coupon."),
            Err(OcrError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_date_variants() {
        assert!(parse_date("2026-01-02T03:04:05+02:00").is_some());
        assert!(parse_date("2026-01-02T03:04:05.123").is_some());
        assert_eq!(parse_date("next tuesday"), None);
        assert_eq!(parse_date("  "), None);
    }
}
