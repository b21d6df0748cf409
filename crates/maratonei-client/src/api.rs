//! HTTP client for the Maratonei server.

use async_trait::async_trait;
use maratonei_shared::constants::USER_ID_HEADER;
use maratonei_shared::lookup::{LookupError, UserDirectory};
use maratonei_shared::types::{Comment, NewPost, Post, PostId, SeriesRef, Stamp, UserId, UserSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{read_json, ClientError};

/// Server metadata from `GET /info`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub badges_enabled: bool,
    pub admin_enabled: bool,
}

/// A published post and the stamp it earned, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishedPost {
    pub post: Post,
    pub earned_stamp: Option<Stamp>,
}

#[derive(Serialize)]
struct PublishBody<'a> {
    content: &'a str,
    image_url: Option<&'a str>,
    series: Option<&'a SeriesRef>,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    content: &'a str,
}

#[derive(Clone)]
pub struct ServerApi {
    http: reqwest::Client,
    base_url: String,
    user: Option<UserId>,
}

impl ServerApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.server_url.clone())
    }

    /// Act as `user` on every following request.
    pub fn signed_in(mut self, user: UserId) -> Self {
        self.user = Some(user);
        self
    }

    pub fn user(&self) -> Option<UserId> {
        self.user
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, ClientError> {
        let user = self.user.ok_or(ClientError::NotSignedIn)?;
        Ok(req.header(USER_ID_HEADER, user.to_string()))
    }

    pub async fn info(&self) -> Result<ServerInfo, ClientError> {
        let resp = self.http.get(self.url("/info")).send().await?;
        read_json(resp).await
    }

    /// Directory search by name or handle. A blank query returns nothing
    /// without a request.
    pub async fn search(&self, query: &str) -> Result<Vec<UserSummary>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let resp = self
            .http
            .get(self.url("/users/search"))
            .query(&[("q", query)])
            .send()
            .await?;
        let users: Vec<UserSummary> = read_json(resp).await?;
        debug!(%query, results = users.len(), "user search");
        Ok(users)
    }

    /// Publish as the signed-in user. The server answers once the badge
    /// evaluation for this post has finished.
    pub async fn publish(&self, post: &NewPost) -> Result<PublishedPost, ClientError> {
        post.validate()?;
        let body = PublishBody {
            content: &post.content,
            image_url: post.image_url.as_deref(),
            series: post.series.as_ref(),
        };
        let req = self.authed(self.http.post(self.url("/posts")))?;
        let published: PublishedPost = read_json(req.json(&body).send().await?).await?;

        if let Some(stamp) = &published.earned_stamp {
            info!(post = %published.post.id, stamp = %stamp.name, "badge earned");
        }
        Ok(published)
    }

    pub async fn add_comment(&self, post: PostId, content: &str) -> Result<Comment, ClientError> {
        let req = self.authed(self.http.post(self.url(&format!("/posts/{post}/comments"))))?;
        read_json(req.json(&CommentBody { content }).send().await?).await
    }
}

#[async_trait]
impl UserDirectory for ServerApi {
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
        Ok(self.search(query).await?)
    }
}
