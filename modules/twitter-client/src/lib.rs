pub mod error;
pub mod oauth;
pub mod types;

pub use error::{Result, TwitterError};
pub use oauth::Keypair;
pub use types::{
    AccessToken, DmEvent, DmMessage, DmPage, Entities, MessageData, RequestToken, UrlEntity,
};

use std::collections::HashMap;

use reqwest::header::AUTHORIZATION;
use serde_json::Value;

const API_BASE: &str = "https://api.twitter.com";

/// Events per page of the DM feed.
const DM_PAGE_SIZE: &str = "50";

/// Client for the v1.1 REST API, signing every request with OAuth1.
///
/// Feed and tweet lookups require a user token (`with_token`); the
/// request-token/access-token exchange runs on consumer credentials alone.
pub struct TwitterClient {
    client: reqwest::Client,
    consumer: Keypair,
    token: Option<Keypair>,
}

impl TwitterClient {
    pub fn new(consumer: Keypair) -> Self {
        Self {
            client: reqwest::Client::new(),
            consumer,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Keypair) -> Self {
        self.token = Some(token);
        self
    }

    /// Fetch one page of DM events. `cursor` of `None` requests the newest
    /// page; the returned `next_cursor` feeds the next call.
    pub async fn dm_events(&self, cursor: Option<&str>) -> Result<DmPage> {
        let mut query: Vec<(&str, &str)> = vec![("count", DM_PAGE_SIZE)];
        if let Some(c) = cursor {
            query.push(("cursor", c));
        }
        let resp = self
            .get_signed("/1.1/direct_messages/events/list.json", &query)
            .await?;
        let page: DmPage = resp.json().await?;
        tracing::debug!(events = page.events.len(), "fetched DM events page");
        Ok(page)
    }

    /// Fetch one tweet with entities, extended mode.
    ///
    /// Returns the raw JSON payload: the caller stores it verbatim and
    /// derives fields from it path-wise, so nothing may be dropped here.
    pub async fn show_tweet(&self, id: u64) -> Result<Value> {
        let id_str = id.to_string();
        let query: Vec<(&str, &str)> = vec![
            ("id", id_str.as_str()),
            ("include_entities", "true"),
            ("tweet_mode", "extended"),
        ];
        let resp = self.get_signed("/1.1/statuses/show.json", &query).await?;
        Ok(resp.json().await?)
    }

    /// First leg of the login flow: obtain a temporary request token.
    pub async fn request_token(&self, callback_url: &str) -> Result<RequestToken> {
        let url = format!("{API_BASE}/oauth/request_token");
        let auth = oauth::authorization_header(
            "POST",
            &url,
            &[],
            &self.consumer,
            None,
            &[("oauth_callback", callback_url)],
        );
        let resp = self.client.post(&url).header(AUTHORIZATION, auth).send().await?;
        let resp = check_status(resp).await?;
        let fields = parse_form_body(&resp.text().await?);
        Ok(RequestToken {
            token: field(&fields, "oauth_token")?,
            secret: field(&fields, "oauth_token_secret")?,
        })
    }

    /// URL the user is redirected to for authorization.
    pub fn authorize_url(&self, request_token: &str) -> String {
        format!(
            "{API_BASE}/oauth/authorize?oauth_token={}",
            urlencoding::encode(request_token)
        )
    }

    /// Final leg of the login flow: exchange the verified request token for
    /// a user access token. The response also identifies the user.
    pub async fn access_token(
        &self,
        request: &RequestToken,
        verifier: &str,
    ) -> Result<AccessToken> {
        let url = format!("{API_BASE}/oauth/access_token");
        let request_pair = Keypair::new(request.token.clone(), request.secret.clone());
        let auth = oauth::authorization_header(
            "POST",
            &url,
            &[],
            &self.consumer,
            Some(&request_pair),
            &[("oauth_verifier", verifier)],
        );
        let resp = self.client.post(&url).header(AUTHORIZATION, auth).send().await?;
        let resp = check_status(resp).await?;
        let fields = parse_form_body(&resp.text().await?);
        Ok(AccessToken {
            token: field(&fields, "oauth_token")?,
            secret: field(&fields, "oauth_token_secret")?,
            user_id: field(&fields, "user_id")?,
            screen_name: field(&fields, "screen_name")?,
        })
    }

    async fn get_signed(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let url = format!("{API_BASE}{path}");
        let auth = oauth::authorization_header(
            "GET",
            &url,
            query,
            &self.consumer,
            self.token.as_ref(),
            &[],
        );
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        check_status(resp).await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(TwitterError::RateLimited);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(TwitterError::Api {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

/// The oauth token endpoints answer `application/x-www-form-urlencoded`.
fn parse_form_body(body: &str) -> HashMap<String, String> {
    body.split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| {
            (
                k.to_string(),
                urlencoding::decode(v).map(|v| v.into_owned()).unwrap_or_default(),
            )
        })
        .collect()
}

fn field(fields: &HashMap<String, String>, name: &str) -> Result<String> {
    fields
        .get(name)
        .cloned()
        .ok_or_else(|| TwitterError::Parse(format!("missing {name} in token response")))
}
