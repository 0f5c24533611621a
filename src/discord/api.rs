use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::discord::rate_limit::RateLimiter;
use crate::error::{BotError, Result};
use crate::types::discord::*;

/// Everything the dispatch core needs from the platform.
///
/// One instance is shared by every in-flight interaction, so implementations
/// must be cheap to call concurrently.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn get_channel(&self, channel_id: &str) -> Result<Channel>;

    async fn get_guild(&self, guild_id: &str) -> Result<Guild>;

    async fn get_user(&self, user_id: &str) -> Result<User>;

    /// `Ok(None)` when the user is not a member of the guild.
    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Option<GuildMember>>;

    async fn create_message(&self, channel_id: &str, body: &MessageBody) -> Result<()>;

    /// `POST /webhooks/{application_id}/{token}`
    async fn create_followup(&self, interaction_token: &str, body: &MessageBody) -> Result<()>;

    /// `PATCH /webhooks/{application_id}/{token}/messages/@original`
    async fn edit_original(&self, interaction_token: &str, body: &MessageBody) -> Result<()>;
}

const USER_CACHE_CAPACITY: usize = 10_000;
const USER_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Users change rarely and are looked up on almost every interaction.
/// Entries expire after `ttl`; a full cache first drops expired entries and
/// starts over if that frees nothing.
struct UserCache {
    entries: DashMap<String, (User, Instant)>,
    capacity: usize,
    ttl: Duration,
}

impl UserCache {
    fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            ttl,
        }
    }

    fn get(&self, user_id: &str) -> Option<User> {
        let entry = self.entries.get(user_id)?;
        let (user, stored) = entry.value();
        (stored.elapsed() < self.ttl).then(|| user.clone())
    }

    fn insert(&self, user: User) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&user.id) {
            self.entries.retain(|_, (_, stored)| stored.elapsed() < self.ttl);
            if self.entries.len() >= self.capacity {
                debug!("user cache full ({} entries), clearing", self.entries.len());
                self.entries.clear();
            }
        }
        self.entries.insert(user.id.clone(), (user, Instant::now()));
    }
}

pub struct RestClient {
    client: Client,
    api_base: String,
    token: String,
    application_id: String,
    limiter: RateLimiter,
    users: UserCache,
}

impl RestClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().user_agent(config.user_agent.clone()).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.as_str().trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            application_id: config.application_id.clone(),
            limiter: RateLimiter::new(config.rate_limit),
            users: UserCache::new(USER_CACHE_CAPACITY, USER_CACHE_TTL),
        })
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        route: &str,
        body: Option<&B>,
        authorized: bool,
    ) -> Result<Response> {
        self.limiter.acquire().await;

        let mut builder = self
            .client
            .request(method.clone(), format!("{}{}", self.api_base, route));

        if authorized {
            builder = builder.header("Authorization", format!("Bot {}", self.token));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        debug!("{} {} -> {}", method, route, response.status());
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T> {
        let response = self.request::<()>(Method::GET, route, None, true).await?;
        let response = ensure_success(Method::GET, route, response).await?;
        Ok(response.json().await?)
    }

    async fn send_body(
        &self,
        method: Method,
        route: &str,
        body: &MessageBody,
        authorized: bool,
    ) -> Result<()> {
        let response = self.request(method.clone(), route, Some(body), authorized).await?;
        ensure_success(method, route, response).await?;
        Ok(())
    }

    /// Bulk overwrite of the global application command set.
    pub async fn register_commands(&self, commands: &[SlashCommand]) -> Result<()> {
        let route = format!("/applications/{}/commands", self.application_id);
        let response = self
            .request(Method::PUT, &route, Some(commands), true)
            .await?;
        ensure_success(Method::PUT, &route, response).await?;
        Ok(())
    }
}

/// Turns a non-2xx response into a `BotError`, preferring the platform's own
/// error payload when it can be decoded.
async fn ensure_success(method: Method, route: &str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(api_error(&method, route, status, &error_text))
}

fn api_error(method: &Method, route: &str, status: StatusCode, error_text: &str) -> BotError {
    if let Ok(discord_err) = serde_json::from_str::<DiscordErrorResponse>(error_text) {
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("rate limited on {} {}: {}", method, route, discord_err);
        }
        return BotError::new("discord_api_error")
            .push_str(format!("{} {}: {}", method, route, discord_err));
    }

    BotError::new("http_error").push_str(format!("{} {}: {} - {}", method, route, status, error_text))
}

#[async_trait]
impl PlatformApi for RestClient {
    async fn get_channel(&self, channel_id: &str) -> Result<Channel> {
        self.get_json(&format!("/channels/{}", channel_id)).await
    }

    async fn get_guild(&self, guild_id: &str) -> Result<Guild> {
        self.get_json(&format!("/guilds/{}", guild_id)).await
    }

    async fn get_user(&self, user_id: &str) -> Result<User> {
        if let Some(user) = self.users.get(user_id) {
            return Ok(user);
        }

        let user: User = self.get_json(&format!("/users/{}", user_id)).await?;
        self.users.insert(user.clone());
        Ok(user)
    }

    async fn get_member(&self, guild_id: &str, user_id: &str) -> Result<Option<GuildMember>> {
        let route = format!("/guilds/{}/members/{}", guild_id, user_id);
        let response = self.request::<()>(Method::GET, &route, None, true).await?;

        if response.status() == StatusCode::NOT_FOUND {
            let error_text = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<DiscordErrorResponse>(&error_text) {
                Ok(e) if e.code == Some(DiscordErrorResponse::UNKNOWN_MEMBER) => Ok(None),
                _ => Err(api_error(&Method::GET, &route, StatusCode::NOT_FOUND, &error_text)),
            };
        }

        let response = ensure_success(Method::GET, &route, response).await?;
        Ok(Some(response.json().await?))
    }

    async fn create_message(&self, channel_id: &str, body: &MessageBody) -> Result<()> {
        let route = format!("/channels/{}/messages", channel_id);
        self.send_body(Method::POST, &route, body, true).await
    }

    async fn create_followup(&self, interaction_token: &str, body: &MessageBody) -> Result<()> {
        let route = format!("/webhooks/{}/{}", self.application_id, interaction_token);
        self.send_body(Method::POST, &route, body, false).await
    }

    async fn edit_original(&self, interaction_token: &str, body: &MessageBody) -> Result<()> {
        let route = format!(
            "/webhooks/{}/{}/messages/@original",
            self.application_id, interaction_token
        );
        self.send_body(Method::PATCH, &route, body, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorded {
        calls: Arc<Mutex<Vec<(String, Option<String>, Option<String>, Value)>>>,
    }

    impl Recorded {
        fn push(&self, route: String, headers: &HeaderMap, body: Value) {
            let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);
            self.calls
                .lock()
                .unwrap()
                .push((route, header("user-agent"), header("authorization"), body));
        }
    }

    async fn fake_platform() -> (RestClient, Recorded) {
        let recorded = Recorded::default();

        let routes = Router::new()
            .route(
                "/users/:id",
                get(|State(r): State<Recorded>, Path(id): Path<String>, headers: HeaderMap| async move {
                    r.push(format!("GET /users/{}", id), &headers, Value::Null);
                    Json(json!({ "id": id, "username": "krook" }))
                }),
            )
            .route(
                "/guilds/:guild/members/:user",
                get(|Path((_, user)): Path<(String, String)>| async move {
                    if user == "1" {
                        Json(json!({ "user": { "id": "1", "username": "krook" }, "roles": [] }))
                            .into_response()
                    } else {
                        (AxumStatus::NOT_FOUND, Json(json!({ "message": "Unknown Member", "code": 10007 })))
                            .into_response()
                    }
                }),
            )
            .route(
                "/channels/:id",
                get(|| async { (AxumStatus::FORBIDDEN, Json(json!({ "message": "Missing Access", "code": 50001 }))) }),
            )
            .route(
                "/webhooks/:app/:token/messages/@original",
                patch(
                    |State(r): State<Recorded>, Path((app, token)): Path<(String, String)>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        r.push(format!("PATCH /webhooks/{}/{}/messages/@original", app, token), &headers, body);
                        Json(json!({ "id": "m1" }))
                    },
                ),
            )
            .route(
                "/webhooks/:app/:token",
                post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "upstream exploded") }),
            )
            .with_state(recorded.clone());

        let app = Router::new().nest("/api/v10", routes);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = Config::from_lookup(|key| match key {
            "DISCORD_APPLICATION_ID" => Some("app".into()),
            "DISCORD_BOT_TOKEN" => Some("secret".into()),
            "DISCORD_API_BASE" => Some(format!("http://{}/api/v10/", addr)),
            "BOT_USER_AGENT" => Some("DiscordBot (test, 1.0)".into()),
            _ => None,
        })
        .unwrap();

        (RestClient::new(&config).unwrap(), recorded)
    }

    #[tokio::test]
    async fn edit_original_hits_webhook_route_with_user_agent() {
        let (client, recorded) = fake_platform().await;

        client
            .edit_original("tok", &MessageBody::text("hello"))
            .await
            .unwrap();

        let calls = recorded.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (route, agent, auth, body) = &calls[0];
        assert_eq!(route, "PATCH /webhooks/app/tok/messages/@original");
        assert_eq!(agent.as_deref(), Some("DiscordBot (test, 1.0)"));
        assert!(auth.is_none());
        assert_eq!(body, &json!({ "content": "hello" }));
    }

    #[tokio::test]
    async fn non_success_followup_is_an_error() {
        let (client, _) = fake_platform().await;

        let err = client
            .create_followup("tok", &MessageBody::text("hello"))
            .await
            .unwrap_err();
        assert_eq!(err.key, "http_error");
        assert!(err.message().contains("upstream exploded"));
    }

    #[tokio::test]
    async fn platform_error_payload_is_decoded() {
        let (client, _) = fake_platform().await;

        let err = client.get_channel("42").await.unwrap_err();
        assert_eq!(err.key, "discord_api_error");
        assert!(err.message().contains("Missing Access"));
    }

    #[tokio::test]
    async fn unknown_member_is_not_a_failure() {
        let (client, _) = fake_platform().await;

        assert!(client.get_member("g", "1").await.unwrap().is_some());
        assert!(client.get_member("g", "2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn users_are_cached_and_authorized() {
        let (client, recorded) = fake_platform().await;

        let first = client.get_user("7").await.unwrap();
        let second = client.get_user("7").await.unwrap();
        assert_eq!(first, second);

        let calls = recorded.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2.as_deref(), Some("Bot secret"));
    }

    fn user_fetches(recorded: &Recorded) -> usize {
        recorded
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.0.starts_with("GET /users/"))
            .count()
    }

    #[tokio::test]
    async fn expired_users_are_fetched_again() {
        let (mut client, recorded) = fake_platform().await;
        client.users = UserCache::new(USER_CACHE_CAPACITY, Duration::ZERO);

        client.get_user("7").await.unwrap();
        client.get_user("7").await.unwrap();

        assert_eq!(user_fetches(&recorded), 2);
    }

    #[tokio::test]
    async fn full_cache_does_not_grow() {
        let (mut client, recorded) = fake_platform().await;
        client.users = UserCache::new(2, USER_CACHE_TTL);

        for id in ["1", "2", "3", "4", "5"] {
            client.get_user(id).await.unwrap();
            assert!(client.users.entries.len() <= 2);
        }
        client.get_user("5").await.unwrap();
        assert_eq!(user_fetches(&recorded), 5);

        client.get_user("1").await.unwrap();
        assert_eq!(user_fetches(&recorded), 6);
    }
}
