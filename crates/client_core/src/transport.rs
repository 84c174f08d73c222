use async_trait::async_trait;
use reqwest::multipart;
use shared::{
    domain::SlaughterNumber,
    protocol::{
        AnimalInfo, LivenessResponse, NextActionResponse, ResetResponse, StationInfo,
        SubmitRequest,
    },
};

use crate::{
    error::SourceError, ActionSource, FetchOutcome, LivenessProbe, PhotoAttachment,
    SessionControl, SubmissionChannel,
};

/// HTTP client for the MES backend. All failures are returned as typed
/// `SourceError`s at this boundary, never propagated as panics.
#[derive(Debug, Clone)]
pub struct MesClient {
    http: reqwest::Client,
    base_url: String,
}

impl MesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn fetch_next(&self, unit: &SlaughterNumber) -> Result<FetchOutcome, SourceError> {
        let body: NextActionResponse = self
            .http
            .get(format!("{}/next-action", self.base_url))
            .query(&[("slaughter", unit.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(match body {
            NextActionResponse::Step(action) => FetchOutcome::Step(action),
            NextActionResponse::Exhausted(_) => FetchOutcome::Finished,
        })
    }

    pub async fn submit_value(
        &self,
        unit: &SlaughterNumber,
        action_id: &str,
        value: &str,
    ) -> Result<(), SourceError> {
        self.http
            .post(format!("{}/submit", self.base_url))
            .json(&SubmitRequest {
                slaughter_number: unit.clone(),
                action: action_id.to_string(),
                value: value.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn submit_photo(
        &self,
        unit: &SlaughterNumber,
        action_id: &str,
        photo: &PhotoAttachment,
    ) -> Result<(), SourceError> {
        let mut part =
            multipart::Part::bytes(photo.bytes.clone()).file_name(photo.filename.clone());
        if let Some(mime) = &photo.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|err| SourceError::Protocol(format!("invalid mime type: {err}")))?;
        }
        let form = multipart::Form::new()
            .part("photo", part)
            .text("slaughterNumber", unit.as_str().to_string())
            .text("action", action_id.to_string());

        self.http
            .post(format!("{}/upload-photo", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub async fn station(&self) -> Result<StationInfo, SourceError> {
        Ok(self
            .http
            .get(format!("{}/station", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn animal_info(&self, unit: &SlaughterNumber) -> Result<AnimalInfo, SourceError> {
        Ok(self
            .http
            .get(format!("{}/animal-info", self.base_url))
            .query(&[("number", unit.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn probe_session(&self) -> Result<LivenessResponse, SourceError> {
        Ok(self
            .http
            .get(format!("{}/session", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    pub async fn reset(&self, unit: &SlaughterNumber) -> Result<ResetResponse, SourceError> {
        Ok(self
            .http
            .post(format!("{}/reset", self.base_url))
            .query(&[("slaughter", unit.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }
}

#[async_trait]
impl ActionSource for MesClient {
    async fn fetch_next(&self, unit: &SlaughterNumber) -> Result<FetchOutcome, SourceError> {
        MesClient::fetch_next(self, unit).await
    }
}

#[async_trait]
impl SubmissionChannel for MesClient {
    async fn submit_value(
        &self,
        unit: &SlaughterNumber,
        action_id: &str,
        value: &str,
    ) -> Result<(), SourceError> {
        MesClient::submit_value(self, unit, action_id, value).await
    }

    async fn submit_photo(
        &self,
        unit: &SlaughterNumber,
        action_id: &str,
        photo: &PhotoAttachment,
    ) -> Result<(), SourceError> {
        MesClient::submit_photo(self, unit, action_id, photo).await
    }
}

#[async_trait]
impl SessionControl for MesClient {
    async fn reset(&self, unit: &SlaughterNumber) -> Result<(), SourceError> {
        MesClient::reset(self, unit).await.map(|_| ())
    }
}

#[async_trait]
impl LivenessProbe for MesClient {
    async fn probe(&self) -> Result<LivenessResponse, SourceError> {
        self.probe_session().await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
