// Minimal client for Twilio's Programmable Messaging API.
//
// Only outbound SMS is supported; verification codes are generated and
// checked by the caller, so the Verify service is not used.

use std::collections::HashMap;

pub mod models;
use reqwest::{header, Client};

use crate::models::{MessageErrorResponse, MessageResponse};

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 format (e.g. "+15005550006")
    pub from_number: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    api_base: String,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            api_base: DEFAULT_API_BASE.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different API host (useful for local fakes).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Send a plain SMS to `recipient`.
    ///
    /// Returns the created message resource on success. Twilio accepting the
    /// message does not guarantee handset delivery.
    pub async fn send_sms(&self, recipient: &str, body: &str) -> Result<MessageResponse, &'static str> {
        let url = format!(
            "{base}/2010-04-01/Accounts/{sid}/Messages.json",
            base = self.api_base,
            sid = self.options.account_sid
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("From", &self.options.from_number);
        form_body.insert("Body", body);

        let res = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(headers)
            .form(&form_body)
            .send()
            .await;

        match res {
            Ok(response) => {
                if !response.status().is_success() {
                    // Twilio reports failures as {code, message, status}
                    return match response.json::<MessageErrorResponse>().await {
                        Ok(err) if err.code == Some(21211) => Err("Invalid 'To' phone number"),
                        Ok(err) if err.code == Some(21608) => {
                            Err("Recipient is not verified for this trial account")
                        }
                        _ => Err("Twilio returned an error"),
                    };
                }

                response
                    .json::<MessageResponse>()
                    .await
                    .map_err(|_| "Error parsing message response")
            }
            Err(_) => Err("Error sending SMS"),
        }
    }
}
