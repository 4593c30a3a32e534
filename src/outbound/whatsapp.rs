// src/outbound/whatsapp.rs
// WhatsApp Cloud API client for outbound text messages.

use anyhow::{Result, anyhow};
use reqwest::Client;
use serde::Serialize;

use crate::config::MessengerConfig;
use crate::models::TenantMessagingConfig;

const GRAPH_BASE_URL: &str = "https://graph.facebook.com";

pub struct WhatsAppClient {
    http: Client,
    access_token: String,
    api_version: String,
    phone_number_id: String,
}

#[derive(Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'a str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    text: TextBody<'a>,
}

#[derive(Serialize)]
struct TextBody<'a> {
    body: &'a str,
}

impl WhatsAppClient {
    pub fn new(
        http: Client,
        access_token: String,
        api_version: String,
        phone_number_id: String,
    ) -> Self {
        Self {
            http,
            access_token,
            api_version,
            phone_number_id,
        }
    }

    /// Client using a tenant's own credentials.
    pub fn from_tenant_config(http: Client, config: &TenantMessagingConfig) -> Self {
        Self::new(
            http,
            config.access_token.clone(),
            config.api_version.clone(),
            config.phone_number_id.clone(),
        )
    }

    /// Client using the process-wide fallback credentials, when configured.
    pub fn from_defaults(http: Client, config: &MessengerConfig) -> Option<Self> {
        let access_token = config.default_access_token.clone()?;
        let phone_number_id = config.default_phone_number_id.clone()?;
        Some(Self::new(
            http,
            access_token,
            config.default_api_version.clone(),
            phone_number_id,
        ))
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/{}/messages",
            GRAPH_BASE_URL, self.api_version, self.phone_number_id
        )
    }

    /// Send a text message. Success iff the API answers with status < 300.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        let request = SendTextRequest {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: TextBody { body },
        };

        let response = self
            .http
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 300 {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "whatsapp api error: status={} body={}",
                status,
                error_text
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_url_embeds_version_and_phone_id() {
        let client = WhatsAppClient::new(
            Client::new(),
            "token".to_string(),
            "v24.0".to_string(),
            "1234567890".to_string(),
        );
        assert_eq!(
            client.messages_url(),
            "https://graph.facebook.com/v24.0/1234567890/messages"
        );
    }

    #[test]
    fn defaults_client_requires_both_credentials() {
        let complete = MessengerConfig {
            default_access_token: Some("token".to_string()),
            default_phone_number_id: Some("123".to_string()),
            default_api_version: "v20.0".to_string(),
            default_country_code: "55".to_string(),
        };
        assert!(WhatsAppClient::from_defaults(Client::new(), &complete).is_some());

        let missing_phone = MessengerConfig {
            default_phone_number_id: None,
            ..complete.clone()
        };
        assert!(WhatsAppClient::from_defaults(Client::new(), &missing_phone).is_none());

        let missing_token = MessengerConfig {
            default_access_token: None,
            ..complete
        };
        assert!(WhatsAppClient::from_defaults(Client::new(), &missing_token).is_none());
    }
}
