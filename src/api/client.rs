use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::api::models::Contact;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid base url {0}: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("base url {0} cannot carry a path")]
    NotABase(String),

    #[error("unexpected payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[cfg(test)]
use mockall::automock;

/// The remote contact service. Every call is a single attempt; callers decide what a failure means.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// GET /contacts
    async fn fetch_all(&self) -> Result<Vec<Contact>>;
    /// POST /add
    async fn add(&self, contact: &Contact) -> Result<()>;
    /// DELETE /delete/{id}
    async fn delete(&self, id: &str) -> Result<()>;
    /// PUT /update/{id}
    async fn update(&self, id: &str, contact: &Contact) -> Result<()>;
}

pub struct ApiClient {
    pub http: HttpClient,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| Error::InvalidUrl(base_url.to_string(), e))?;
        if base.cannot_be_a_base() {
            return Err(Error::NotABase(base_url.to_string()));
        }
        Ok(Self {
            http: HttpClient::new(),
            base,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::NotABase(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(Error::Status(resp.status()))
        }
    }
}

/// Pulls the contact array out of a load response: either a bare array or one wrapped under
/// `data` or `contacts`.
fn contacts_from_payload(json: Value) -> Result<Vec<Contact>> {
    let items = match json {
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("contacts")) {
            Some(items) => items,
            None => Value::Object(map),
        },
        other => other,
    };
    Ok(serde_json::from_value(items)?)
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn fetch_all(&self) -> Result<Vec<Contact>> {
        let endpoint = self.endpoint(&["contacts"])?;
        let resp = Self::check(self.http.get(endpoint).send().await?)?;
        let json: Value = resp.json().await?;
        contacts_from_payload(json)
    }

    async fn add(&self, contact: &Contact) -> Result<()> {
        let endpoint = self.endpoint(&["add"])?;
        Self::check(self.http.post(endpoint).json(contact).send().await?)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let endpoint = self.endpoint(&["delete", id])?;
        Self::check(self.http.delete(endpoint).send().await?)?;
        Ok(())
    }

    async fn update(&self, id: &str, contact: &Contact) -> Result<()> {
        let endpoint = self.endpoint(&["update", id])?;
        Self::check(self.http.put(endpoint).json(contact).send().await?)?;
        Ok(())
    }
}
