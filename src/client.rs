//! This module provides a client to talk to the site and to its submission endpoints

use std::error::Error;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::EventId;
use crate::config::SiteConfig;
use crate::submission::{EventSubmission, SubmissionResponse};
use crate::traits::{EventSource, SubmissionTransport};


/// An HTTP client for a community events site.
///
/// It fetches the canonical dataset, and sends submissions to the server-side endpoints.
pub struct Client {
    http: reqwest::Client,
    events_url: Url,
    submit_url: Url,
    edit_url: Url,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new(config: &SiteConfig) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            http: reqwest::Client::new(),
            events_url: config.events_url()?,
            submit_url: config.submit_url()?,
            edit_url: config.edit_url()?,
        })
    }

    async fn post(&self, url: &Url, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        let body = serde_json::to_string(submission)?;

        let res = self.http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await?;
        let status = res.status();
        let text = res.text().await?;

        // Logical failures come with an error status, but still with a meaningful body
        match serde_json::from_str::<SubmissionResponse>(&text) {
            Ok(response) => {
                log::debug!("Submission answered with {} (success: {})", status, response.success);
                Ok(response)
            },
            Err(err) => Err(format!("Unexpected answer to the submission (HTTP status {:?}): {}", status, err).into()),
        }
    }
}

#[async_trait]
impl EventSource for Client {
    async fn fetch_events(&self) -> Result<Vec<serde_json::Value>, Box<dyn Error>> {
        let res = self.http
            .get(self.events_url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if res.status().is_success() == false {
            return Err(format!("Unexpected HTTP status code {:?}", res.status()).into());
        }

        let text = res.text().await?;
        let records: Vec<serde_json::Value> = serde_json::from_str(&text)?;
        log::debug!("Fetched {} event(s) from {}", records.len(), self.events_url);
        Ok(records)
    }
}

#[async_trait]
impl SubmissionTransport for Client {
    async fn create_event(&self, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        self.post(&self.submit_url, submission).await
    }

    async fn edit_event(&self, id: &EventId, submission: &EventSubmission) -> Result<SubmissionResponse, Box<dyn Error>> {
        log::debug!("Editing event {}", id);
        let mut submission = submission.clone();
        submission.id = Some(id.clone());
        self.post(&self.edit_url, &submission).await
    }
}
