use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Characters that can appear in a Clash of Clans tag.
const TAG_ALPHABET: &str = "0289PYLQGRJCUV";

pub const DEFAULT_API_BASE: &str = "https://api.clashofclans.com/v1";

/// A clan's in-game chat language
#[derive(Debug, Clone, Deserialize)]
pub struct ChatLanguage {
    pub id: u32,
    pub name: String,
    #[serde(rename = "languageCode")]
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clan {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub clan_level: u32,
    #[serde(default)]
    pub members: u32,
    #[serde(default)]
    pub is_war_log_public: bool,
    #[serde(default)]
    pub chat_language: Option<ChatLanguage>,
}

#[derive(Debug, Deserialize)]
struct CurrentWar {
    state: String,
}

/// Outcome of peeking at a clan's current war.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarStatus {
    /// The clan's war log is private; the API answers 403.
    Private,
    /// War state as reported by the API ("notInWar", "preparation", "inWar", "warEnded").
    State(String),
}

#[derive(Debug)]
pub enum CocError {
    InvalidTag(String),
    NotFound,
    Status(reqwest::StatusCode),
    Request(reqwest::Error),
}

impl fmt::Display for CocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CocError::InvalidTag(raw) => write!(f, "'{}' is not a valid clan tag", raw),
            CocError::NotFound => write!(f, "clan not found"),
            CocError::Status(status) => write!(f, "API answered {}", status),
            CocError::Request(err) => write!(f, "request failed: {}", err),
        }
    }
}

impl std::error::Error for CocError {}

/// Normalize a user-supplied clan tag: trim, uppercase, strip leading '#',
/// map the letter O to zero (the game has no O in tags), then validate
/// against the tag alphabet. Returns the canonical "#XXXX" form.
pub fn normalize_tag(raw: &str) -> Result<String, CocError> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('#')
        .to_uppercase()
        .replace('O', "0");

    if cleaned.is_empty() || !cleaned.chars().all(|c| TAG_ALPHABET.contains(c)) {
        return Err(CocError::InvalidTag(raw.to_string()));
    }
    Ok(format!("#{}", cleaned))
}

/// Whether a message token plausibly is a clan tag (used by the context-menu lookup).
pub fn looks_like_tag(token: &str) -> bool {
    token.starts_with('#') && token.len() >= 4 && normalize_tag(token).is_ok()
}

fn encode_tag(tag: &str) -> String {
    tag.replace('#', "%23")
}

/// Thin client for the Clash of Clans REST API.
///
/// Rate-limited so the refresh cycles cannot stampede the API; every caller
/// shares the same limiter.
pub struct CocClient {
    http: reqwest::Client,
    base: String,
    token: String,
    limiter: DefaultDirectRateLimiter,
}

impl CocClient {
    pub fn new(token: String, base: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base,
            token,
            limiter: RateLimiter::direct(Quota::per_second(nonzero!(10u32))),
        })
    }

    /// Fetch a clan by its normalized tag.
    pub async fn clan(&self, tag: &str) -> Result<Clan, CocError> {
        self.limiter.until_ready().await;

        let url = format!("{}/clans/{}", self.base, encode_tag(tag));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(CocError::Request)?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(CocError::Request),
            reqwest::StatusCode::NOT_FOUND => Err(CocError::NotFound),
            status => Err(CocError::Status(status)),
        }
    }

    /// Peek at a clan's current war. A private war log is a normal outcome,
    /// not an error.
    pub async fn current_war(&self, tag: &str) -> Result<WarStatus, CocError> {
        self.limiter.until_ready().await;

        let url = format!("{}/clans/{}/currentwar", self.base, encode_tag(tag));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(CocError::Request)?;

        match response.status() {
            status if status.is_success() => {
                let war: CurrentWar = response.json().await.map_err(CocError::Request)?;
                Ok(WarStatus::State(war.state))
            }
            reqwest::StatusCode::FORBIDDEN => Ok(WarStatus::Private),
            reqwest::StatusCode::NOT_FOUND => Err(CocError::NotFound),
            status => Err(CocError::Status(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_canonical_form() {
        assert_eq!(normalize_tag("#2pp").unwrap(), "#2PP");
        assert_eq!(normalize_tag("  8qu8j9lp ").unwrap(), "#8QU8J9LP");
        assert_eq!(normalize_tag("##2PP").unwrap(), "#2PP");
    }

    #[test]
    fn test_normalize_tag_maps_o_to_zero() {
        assert_eq!(normalize_tag("#2OPP").unwrap(), "#20PP");
    }

    #[test]
    fn test_normalize_tag_rejects_garbage() {
        assert!(normalize_tag("").is_err());
        assert!(normalize_tag("#").is_err());
        assert!(normalize_tag("not a tag").is_err());
        assert!(normalize_tag("#2PP!").is_err());
    }

    #[test]
    fn test_looks_like_tag() {
        assert!(looks_like_tag("#2PPP"));
        assert!(!looks_like_tag("2PPP"));
        assert!(!looks_like_tag("#2P"));
        assert!(!looks_like_tag("#hello"));
    }

    #[test]
    fn test_encode_tag() {
        assert_eq!(encode_tag("#2PP"), "%232PP");
    }

    #[test]
    fn test_clan_deserializes_from_api_shape() {
        let body = r##"{
            "tag": "#2PP",
            "name": "Lost Boys",
            "clanLevel": 12,
            "members": 43,
            "isWarLogPublic": true,
            "chatLanguage": { "id": 75000000, "name": "English", "languageCode": "EN" }
        }"##;

        let clan: Clan = serde_json::from_str(body).unwrap();
        assert_eq!(clan.tag, "#2PP");
        assert_eq!(clan.clan_level, 12);
        assert!(clan.is_war_log_public);
        let language = clan.chat_language.unwrap();
        assert_eq!(language.code, "EN");
        assert_eq!(language.name, "English");
    }

    #[test]
    fn test_clan_tolerates_missing_optional_fields() {
        let clan: Clan = serde_json::from_str(r##"{"tag": "#2PP", "name": "Lost Boys"}"##).unwrap();
        assert_eq!(clan.members, 0);
        assert!(!clan.is_war_log_public);
        assert!(clan.chat_language.is_none());
    }
}
