//! Airtable-style upstream record store client.
//!
//! Creates and updates are a single `PATCH` with `performUpsert` merging on
//! the configured local-id field, so replaying an event is harmless.
//! Deletes look the record up by that field and treat "already gone" as
//! success.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use coachsync_core::config::UpstreamConfig;
use coachsync_core::error::{AppError, ErrorKind};
use coachsync_core::result::AppResult;
use coachsync_core::traits::{UpstreamClient, UpstreamError, UpstreamEvent, UpstreamRecord};

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    records: Vec<RawRecord>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: String,
    #[serde(default)]
    fields: Value,
}

/// [`UpstreamClient`] over the Airtable REST API.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    client: reqwest::Client,
    base_url: String,
    base_id: Option<String>,
    api_token: Option<String>,
    merge_field: String,
}

impl AirtableClient {
    /// Build a client from configuration.
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    "Failed to build upstream HTTP client",
                    e,
                )
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            base_id: config.base_id.clone(),
            api_token: config.api_token.clone(),
            merge_field: config.merge_field.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str), UpstreamError> {
        match (self.base_id.as_deref(), self.api_token.as_deref()) {
            (Some(base), Some(token)) if !base.is_empty() && !token.is_empty() => Ok((base, token)),
            _ => Err(UpstreamError::permanent("upstream not configured")),
        }
    }

    fn table_url(&self, table: &str) -> Result<Url, UpstreamError> {
        let (base_id, _) = self.credentials()?;
        Url::parse(&format!("{}/{base_id}/{table}", self.base_url))
            .map_err(|e| UpstreamError::permanent(format!("invalid upstream URL: {e}")))
    }

    async fn request(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value, UpstreamError> {
        let (_, token) = self.credentials()?;
        let mut request = self.client.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::retryable(format!("upstream request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(
                Some(status.as_u16()),
                format!("upstream returned HTTP {}: {}", status.as_u16(), detail.trim()),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::retryable(format!("invalid upstream response: {e}")))
    }

    async fn upsert(&self, event: &UpstreamEvent) -> Result<(), UpstreamError> {
        let mut fields = match &event.payload {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(UpstreamError::permanent(format!(
                    "payload must be an object, got {other}"
                )));
            }
        };
        fields.insert(
            self.merge_field.clone(),
            Value::String(event.entity_id.clone()),
        );

        let body = json!({
            "performUpsert": { "fieldsToMergeOn": [self.merge_field] },
            "records": [{ "fields": fields }],
            "typecast": true,
        });

        self.request(Method::PATCH, self.table_url(&event.entity_type)?, Some(&body))
            .await
            .map(|_| ())
    }

    async fn delete(&self, event: &UpstreamEvent) -> Result<(), UpstreamError> {
        let formula = format!(
            "{{{}}}='{}'",
            self.merge_field,
            escape_formula(&event.entity_id)
        );
        let url = Url::parse_with_params(
            self.table_url(&event.entity_type)?.as_str(),
            &[("filterByFormula", formula.as_str())],
        )
        .map_err(|e| UpstreamError::permanent(format!("invalid upstream URL: {e}")))?;

        let found: ListResponse = serde_json::from_value(self.request(Method::GET, url, None).await?)
            .map_err(|e| UpstreamError::retryable(format!("invalid upstream response: {e}")))?;

        for record in found.records {
            let mut url = self.table_url(&event.entity_type)?;
            url.path_segments_mut()
                .map_err(|_| UpstreamError::permanent("invalid upstream URL"))?
                .push(&record.id);

            match self.request(Method::DELETE, url, None).await {
                Ok(_) => {}
                Err(e) if e.status_code == Some(404) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UpstreamClient for AirtableClient {
    fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    async fn apply(&self, event: &UpstreamEvent) -> Result<(), UpstreamError> {
        match event.event_type.as_str() {
            "create" | "update" | "upsert" => self.upsert(event).await,
            "delete" => self.delete(event).await,
            other => Err(UpstreamError::permanent(format!(
                "unsupported event type '{other}'"
            ))),
        }
    }

    async fn list_records(
        &self,
        table: &str,
        modified_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<UpstreamRecord>, UpstreamError> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![("pageSize", "100".to_string())];
            if let Some(since) = modified_since {
                params.push(("filterByFormula", modified_since_formula(since)));
            }
            if let Some(offset) = &offset {
                params.push(("offset", offset.clone()));
            }

            let url = Url::parse_with_params(self.table_url(table)?.as_str(), &params)
                .map_err(|e| UpstreamError::permanent(format!("invalid upstream URL: {e}")))?;
            let page: ListResponse =
                serde_json::from_value(self.request(Method::GET, url, None).await?).map_err(
                    |e| UpstreamError::retryable(format!("invalid upstream response: {e}")),
                )?;

            records.extend(page.records.into_iter().map(|r| UpstreamRecord {
                id: r.id,
                fields: r.fields,
            }));

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::debug!("Listed {} upstream records from '{}'", records.len(), table);
        Ok(records)
    }
}

fn escape_formula(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn modified_since_formula(since: DateTime<Utc>) -> String {
    format!(
        "IS_AFTER(LAST_MODIFIED_TIME(), '{}')",
        since.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn configured() -> AirtableClient {
        AirtableClient::new(&UpstreamConfig {
            base_id: Some("appXYZ".to_string()),
            api_token: Some("pat123".to_string()),
            ..UpstreamConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_configuration_detection() {
        assert!(!AirtableClient::new(&UpstreamConfig::default()).unwrap().is_configured());
        assert!(configured().is_configured());
    }

    #[test]
    fn test_table_url() {
        let url = configured().table_url("programs").unwrap();
        assert_eq!(url.as_str(), "https://api.airtable.com/v0/appXYZ/programs");
    }

    #[test]
    fn test_formula_helpers() {
        assert_eq!(escape_formula("it's"), "it\\'s");
        let since = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            modified_since_formula(since),
            "IS_AFTER(LAST_MODIFIED_TIME(), '2026-03-01T12:00:00Z')"
        );
    }

    #[tokio::test]
    async fn test_unknown_event_type_is_permanent() {
        let event = UpstreamEvent {
            event_type: "archive".to_string(),
            entity_type: "programs".to_string(),
            entity_id: "p1".to_string(),
            payload: Value::Null,
        };
        let err = configured().apply(&event).await.unwrap_err();
        assert!(!err.kind.is_retryable());
    }

    #[tokio::test]
    async fn test_non_object_payload_is_permanent() {
        let event = UpstreamEvent {
            event_type: "update".to_string(),
            entity_type: "programs".to_string(),
            entity_id: "p1".to_string(),
            payload: json!([1, 2]),
        };
        let err = configured().apply(&event).await.unwrap_err();
        assert!(!err.kind.is_retryable());
    }
}
