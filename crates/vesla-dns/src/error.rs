#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    #[error("DNS API request failed")]
    Http { source: reqwest::Error },

    #[error("DNS API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("no {record_type} record found for {fqdn}")]
    RecordNotFound { record_type: &'static str, fqdn: String },

    #[error("public IP lookup failed")]
    PublicIp { source: reqwest::Error },

    #[error("public IP service returned an invalid address: {0:?}")]
    InvalidIp(String),
}
