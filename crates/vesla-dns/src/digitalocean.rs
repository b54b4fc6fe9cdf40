use std::net::IpAddr;
use std::time::Duration;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::DnsRegistrar;
use crate::error::DnsError;

/// Environment variable holding the DigitalOcean API token.
pub const TOKEN_ENV: &str = "VESLA_DO_TOKEN";

const API_BASE: &str = "https://api.digitalocean.com/v2";

/// DigitalOcean Domains API client.
pub struct DigitalOceanDns {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    ttl: u32,
}

#[derive(Serialize)]
struct NewRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    data: String,
    ttl: u32,
}

#[derive(Serialize)]
struct RecordUpdate {
    data: String,
    ttl: u32,
}

#[derive(Deserialize)]
struct RecordList {
    #[serde(default)]
    domain_records: Vec<DomainRecord>,
}

#[derive(Deserialize)]
struct DomainRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
}

impl DigitalOceanDns {
    pub fn new(token: SecretString, ttl: u32) -> Result<Self, DnsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("vesla/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DnsError::Http { source: e })?;
        Ok(Self {
            client,
            base_url: API_BASE.to_owned(),
            token,
            ttl,
        })
    }

    /// Build a client from [`TOKEN_ENV`]. `None` when the variable is unset or empty.
    pub fn from_env(ttl: u32) -> Result<Option<Self>, DnsError> {
        match std::env::var(TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                Self::new(SecretString::from(token), ttl).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Point the client at another API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn records_url(&self, domain: &str) -> String {
        format!("{}/domains/{domain}/records", self.base_url)
    }

    /// Id of the record named `subdomain` with the given type, if any.
    pub async fn find_record_id(
        &self,
        subdomain: &str,
        domain: &str,
        record_type: &str,
    ) -> Result<Option<u64>, DnsError> {
        let fqdn = format!("{subdomain}.{domain}");
        let response = self
            .client
            .get(self.records_url(domain))
            .bearer_auth(self.token.expose_secret())
            .query(&[("type", record_type), ("name", fqdn.as_str()), ("per_page", "200")])
            .send()
            .await
            .map_err(|e| DnsError::Http { source: e })?;
        let response = check(response).await?;

        let list: RecordList = response
            .json()
            .await
            .map_err(|e| DnsError::Http { source: e })?;
        Ok(list
            .domain_records
            .into_iter()
            .find(|r| r.record_type == record_type && r.name == subdomain)
            .map(|r| r.id))
    }

    async fn update_record(
        &self,
        subdomain: &str,
        domain: &str,
        ip: IpAddr,
    ) -> Result<(), DnsError> {
        let record_type = record_type(ip);
        let id = self
            .find_record_id(subdomain, domain, record_type)
            .await?
            .ok_or_else(|| DnsError::RecordNotFound {
                record_type,
                fqdn: format!("{subdomain}.{domain}"),
            })?;

        let response = self
            .client
            .put(format!("{}/{id}", self.records_url(domain)))
            .bearer_auth(self.token.expose_secret())
            .json(&RecordUpdate {
                data: ip.to_string(),
                ttl: self.ttl,
            })
            .send()
            .await
            .map_err(|e| DnsError::Http { source: e })?;
        check(response).await?;

        tracing::info!("updated {record_type} record for {subdomain}.{domain}");
        Ok(())
    }
}

impl DnsRegistrar for DigitalOceanDns {
    async fn create_or_update_record(
        &self,
        subdomain: &str,
        domain: &str,
        ip: IpAddr,
    ) -> Result<(), DnsError> {
        let record_type = record_type(ip);
        tracing::info!("creating DNS {record_type} record: {subdomain}.{domain} -> {ip}");

        let response = self
            .client
            .post(self.records_url(domain))
            .bearer_auth(self.token.expose_secret())
            .json(&NewRecord {
                record_type,
                name: subdomain,
                data: ip.to_string(),
                ttl: self.ttl,
            })
            .send()
            .await
            .map_err(|e| DnsError::Http { source: e })?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::warn!("record for {subdomain}.{domain} may already exist, updating");
            return self.update_record(subdomain, domain, ip).await;
        }
        check(response).await?;

        tracing::info!("created {record_type} record for {subdomain}.{domain}");
        Ok(())
    }

    async fn delete_record(&self, subdomain: &str, domain: &str) -> Result<bool, DnsError> {
        let mut deleted = false;
        for record_type in ["A", "AAAA"] {
            let Some(id) = self.find_record_id(subdomain, domain, record_type).await? else {
                continue;
            };
            let response = self
                .client
                .delete(format!("{}/{id}", self.records_url(domain)))
                .bearer_auth(self.token.expose_secret())
                .send()
                .await
                .map_err(|e| DnsError::Http { source: e })?;
            check(response).await?;
            tracing::info!("deleted {record_type} record for {subdomain}.{domain}");
            deleted = true;
        }

        if !deleted {
            tracing::warn!("no record found for {subdomain}.{domain}");
        }
        Ok(deleted)
    }
}

fn record_type(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

/// Turn a non-2xx response into [`DnsError::Api`] carrying the API's message.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, DnsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["message"].as_str().map(str::to_owned))
        .unwrap_or(body);
    Err(DnsError::Api {
        status: status.as_u16(),
        message,
    })
}
