use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, HeaderMap, Method, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use maratonei_shared::constants::USER_ID_HEADER;
use maratonei_shared::lookup::UserDirectory;
use maratonei_store::{
    Comment, FeedItem, FeedScope, NewPost, NewStamp, NewWatchEntry, Notification, NotificationId,
    Post, PostId, Profile, Role, SeriesRef, Stamp, StampId, StoreError, UserId, UserStamp,
    UserSummary, WatchEntry, WatchEntryId,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::backend::SqliteBackend;
use crate::badges::BadgeEvaluator;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::mentions::MentionNotifier;
use crate::posting::PostService;

#[derive(Clone)]
pub struct AppState {
    pub backend: SqliteBackend,
    pub posts: PostService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire every service to the one SQLite backend.
    pub fn new(backend: SqliteBackend, config: ServerConfig) -> Self {
        let shared = Arc::new(backend.clone());
        let badges = config.badges_enabled.then(|| {
            BadgeEvaluator::new(shared.clone(), shared.clone(), shared.clone())
        });
        let mentions = MentionNotifier::new(shared.clone(), shared.clone());

        Self {
            backend,
            posts: PostService::new(shared, mentions, badges),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/profiles", post(create_profile))
        .route("/users/search", get(search_users))
        .route("/users/{id}", get(get_profile))
        .route("/users/{id}/posts", get(user_posts))
        .route("/users/{id}/stamps", get(user_stamps))
        .route("/users/{id}/followers/count", get(follower_count))
        .route("/users/{id}/following/count", get(following_count))
        .route("/users/{id}/follow", post(follow).delete(unfollow))
        .route("/feed", get(feed))
        .route("/posts", post(publish_post))
        .route("/posts/{id}", delete(delete_post))
        .route("/posts/{id}/like", post(like_post).delete(unlike_post))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/stamps", get(list_stamps))
        .route("/stamps/{id}", get(get_stamp))
        .route("/admin/stamps", post(admin_create_stamp))
        .route("/admin/stamps/{id}", delete(admin_delete_stamp))
        .route("/admin/users/{id}/role", put(admin_set_role))
        .route("/me/series", get(list_watchlist).post(add_to_watchlist))
        .route("/me/series/{id}", delete(remove_from_watchlist))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Identity ───

/// The acting user, as asserted by the auth gateway in the `x-user-id`
/// header.
pub struct CurrentUser(pub UserId);

impl CurrentUser {
    fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, ServerError> {
        let Some(raw) = headers.get(USER_ID_HEADER) else {
            return Ok(None);
        };
        let id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<UserId>().ok())
            .ok_or_else(|| ServerError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;
        Ok(Some(Self(id)))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)?
            .ok_or_else(|| ServerError::Unauthorized(format!("missing {USER_ID_HEADER} header")))
    }
}

fn verify_admin_token(headers: &HeaderMap, config: &ServerConfig) -> Result<(), ServerError> {
    let Some(ref expected) = config.admin_token else {
        return Err(ServerError::Forbidden(
            "Admin API is disabled (no ADMIN_TOKEN configured)".into(),
        ));
    };

    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth);

    use subtle::ConstantTimeEq;
    let token_bytes = token.as_bytes();
    let expected_bytes = expected.as_bytes();
    if token_bytes.len() != expected_bytes.len()
        || token_bytes.ct_eq(expected_bytes).unwrap_u8() != 1
    {
        return Err(ServerError::Forbidden("Invalid admin token".into()));
    }

    Ok(())
}

// ─── Response / request bodies ───

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    badges_enabled: bool,
    admin_enabled: bool,
}

#[derive(Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Deserialize)]
struct CreateProfileRequest {
    email: String,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct FeedQuery {
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    scope: FeedScope,
}

#[derive(Deserialize)]
struct PublishRequest {
    content: String,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    series: Option<SeriesRef>,
}

#[derive(Serialize, Deserialize)]
pub struct PublishResponse {
    pub post: Post,
    pub earned_stamp: Option<Stamp>,
}

#[derive(Deserialize)]
struct CommentRequest {
    content: String,
}

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

// ─── Handlers ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(State(state): State<AppState>) -> Json<ServerInfoResponse> {
    Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        badges_enabled: state.config.badges_enabled,
        admin_enabled: state.config.admin_token.is_some(),
    })
}

async fn create_profile(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(req): Json<CreateProfileRequest>,
) -> Result<Json<Profile>, ServerError> {
    let profile = state.backend.with_db(|db| db.create_profile(me, &req.email))?;
    Ok(Json(profile))
}

async fn search_users(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserSummary>>, ServerError> {
    let users = state
        .backend
        .search_users(&query.q)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(users))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Profile>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.get_profile(id))?))
}

async fn user_posts(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<Post>>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.list_posts_by_author(id))?))
}

async fn user_stamps(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<Vec<UserStamp>>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.user_stamps(id))?))
}

async fn follower_count(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<CountResponse>, ServerError> {
    let count = state.backend.with_db(|db| db.follower_count(id))?;
    Ok(Json(CountResponse { count }))
}

async fn following_count(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<CountResponse>, ServerError> {
    let count = state.backend.with_db(|db| db.following_count(id))?;
    Ok(Json(CountResponse { count }))
}

async fn follow(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ServerError> {
    state.backend.with_db(|db| db.follow(me, id)).map_err(|e| match e {
        StoreError::AlreadyExists => ServerError::Conflict("Already following".into()),
        other => other.into(),
    })?;
    info!(follower = %me, following = %id, "followed");
    Ok(StatusCode::NO_CONTENT)
}

async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ServerError> {
    state.backend.with_db(|db| db.unfollow(me, id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn feed(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedItem>>, ServerError> {
    let viewer = CurrentUser::from_headers(&headers)?.map(|CurrentUser(id)| id);
    let items = state.backend.with_db(|db| {
        db.feed(
            query.scope,
            viewer,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(0),
        )
    })?;
    Ok(Json(items))
}

async fn publish_post(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(req): Json<PublishRequest>,
) -> Result<(StatusCode, Json<PublishResponse>), ServerError> {
    let published = state
        .posts
        .publish(NewPost {
            author_id: me,
            content: req.content,
            image_url: req.image_url,
            series: req.series,
        })
        .await?;

    // The side effects run on their own task, so a client hanging up here
    // does not cancel them.
    let (post, earned_stamp) = published.earned_stamp().await;
    info!(post = %post.id, author = %me, badge = earned_stamp.is_some(), "post published");

    Ok((
        StatusCode::CREATED,
        Json(PublishResponse { post, earned_stamp }),
    ))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<PostId>,
) -> Result<StatusCode, ServerError> {
    state.backend.with_db(|db| db.delete_post(id, me))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<PostId>,
) -> Result<StatusCode, ServerError> {
    state.backend.with_db(|db| db.like_post(id, me)).map_err(|e| match e {
        StoreError::AlreadyExists => ServerError::Conflict("Already liked".into()),
        other => other.into(),
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unlike_post(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<PostId>,
) -> Result<StatusCode, ServerError> {
    state.backend.with_db(|db| db.unlike_post(id, me))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<Json<Vec<Comment>>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.list_comments(id))?))
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<PostId>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ServerError> {
    let published = state.posts.comment(id, me, &req.content).await?;
    Ok((StatusCode::CREATED, Json(published.item)))
}

async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> Result<Json<Vec<Notification>>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.list_notifications(me))?))
}

async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> Result<Json<CountResponse>, ServerError> {
    let count = state.backend.with_db(|db| db.unread_count(me))?;
    Ok(Json(CountResponse { count }))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<NotificationId>,
) -> Result<StatusCode, ServerError> {
    state
        .backend
        .with_db(|db| db.mark_notification_read(id, me))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> Result<Json<CountResponse>, ServerError> {
    let updated = state
        .backend
        .with_db(|db| db.mark_all_notifications_read(me))?;
    Ok(Json(CountResponse {
        count: updated as u64,
    }))
}

async fn list_stamps(State(state): State<AppState>) -> Result<Json<Vec<Stamp>>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.list_stamps())?))
}

async fn get_stamp(
    State(state): State<AppState>,
    Path(id): Path<StampId>,
) -> Result<Json<Stamp>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.get_stamp(id))?))
}

async fn admin_create_stamp(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<NewStamp>,
) -> Result<(StatusCode, Json<Stamp>), ServerError> {
    verify_admin_token(&headers, &state.config)?;
    let stamp = state.backend.with_db(|db| db.create_stamp(&req))?;
    Ok((StatusCode::CREATED, Json(stamp)))
}

async fn admin_delete_stamp(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<StampId>,
) -> Result<StatusCode, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    state.backend.with_db(|db| db.delete_stamp(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_set_role(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<RoleRequest>,
) -> Result<StatusCode, ServerError> {
    verify_admin_token(&headers, &state.config)?;
    state.backend.with_db(|db| db.set_role(id, req.role))?;
    info!(user = %id, role = req.role.as_str(), "Admin changed role");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_watchlist(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
) -> Result<Json<Vec<WatchEntry>>, ServerError> {
    Ok(Json(state.backend.with_db(|db| db.list_watch_entries(me))?))
}

async fn add_to_watchlist(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Json(req): Json<NewWatchEntry>,
) -> Result<(StatusCode, Json<WatchEntry>), ServerError> {
    let entry = state
        .backend
        .with_db(|db| db.add_watch_entry(me, &req))
        .map_err(|e| match e {
            StoreError::AlreadyExists => ServerError::Conflict("Series already added".into()),
            other => other.into(),
        })?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn remove_from_watchlist(
    State(state): State<AppState>,
    CurrentUser(me): CurrentUser,
    Path(id): Path<WatchEntryId>,
) -> Result<StatusCode, ServerError> {
    state.backend.with_db(|db| db.remove_watch_entry(id, me))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use maratonei_store::{Database, NotificationKind};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const ADMIN: &str = "admin-secret";

    fn state() -> AppState {
        let config = ServerConfig {
            admin_token: Some(ADMIN.into()),
            ..ServerConfig::default()
        };
        AppState::new(
            SqliteBackend::new(Database::open_in_memory().unwrap()),
            config,
        )
    }

    fn request(method: &str, uri: &str, user: Option<UserId>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn sign_up(state: &AppState, email: &str) -> UserId {
        let id = UserId::new();
        let (status, _) = send(
            state,
            request("POST", "/profiles", Some(id), Some(json!({ "email": email }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        id
    }

    #[tokio::test]
    async fn health_and_info() {
        let state = state();
        let (status, body) = send(&state, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = send(&state, request("GET", "/info", None, None)).await;
        assert_eq!(body["name"], "Maratonei");
        assert_eq!(body["admin_enabled"], true);
    }

    #[tokio::test]
    async fn identity_header_is_required() {
        let state = state();
        let (status, body) = send(
            &state,
            request("POST", "/posts", None, Some(json!({ "content": "oi" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains(USER_ID_HEADER));
    }

    #[tokio::test]
    async fn publish_returns_earned_stamp() {
        let state = state();
        let maria = sign_up(&state, "maria@example.com").await;

        let admin = Request::builder()
            .method("POST")
            .uri("/admin/stamps")
            .header("authorization", format!("Bearer {ADMIN}"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "name": "Heisenberg",
                    "rarity": "epic",
                    "image_url": "https://img/h.png",
                    "series": { "id": 1396, "title": "Breaking Bad" },
                    "requirement": { "type": "post_count", "threshold": 1 }
                })
                .to_string(),
            ))
            .unwrap();
        let (status, stamp) = send(&state, admin).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &state,
            request(
                "POST",
                "/posts",
                Some(maria),
                Some(json!({
                    "content": "Say my name",
                    "series": { "id": 1396, "title": "Breaking Bad" }
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["earned_stamp"]["id"], stamp["id"]);

        let (_, body) = send(&state, request("GET", "/notifications", Some(maria), None)).await;
        let kinds: Vec<_> = body.as_array().unwrap().iter().map(|n| n["kind"].clone()).collect();
        assert_eq!(kinds, vec![json!(NotificationKind::BadgeEarned.as_str())]);

        let (_, body) = send(
            &state,
            request("GET", "/notifications/unread-count", Some(maria), None),
        )
        .await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn user_search() {
        let state = state();
        sign_up(&state, "mariana@example.com").await;
        sign_up(&state, "pedro@example.com").await;

        let (status, body) = send(&state, request("GET", "/users/search?q=mari", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["handle"], "@mariana");
    }

    #[tokio::test]
    async fn blank_post_is_bad_request() {
        let state = state();
        let maria = sign_up(&state, "maria@example.com").await;
        let (status, _) = send(
            &state,
            request("POST", "/posts", Some(maria), Some(json!({ "content": "  " }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_routes_check_token() {
        let state = state();
        let body = json!({
            "name": "X",
            "rarity": "common",
            "image_url": "x",
            "requirement": { "type": "none" }
        });

        let (status, _) = send(&state, request("POST", "/admin/stamps", None, Some(body.clone()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let wrong = Request::builder()
            .method("POST")
            .uri("/admin/stamps")
            .header("authorization", "Bearer nope")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _) = send(&state, wrong).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn follow_twice_is_conflict() {
        let state = state();
        let maria = sign_up(&state, "maria@example.com").await;
        let john = sign_up(&state, "john@example.com").await;
        let uri = format!("/users/{maria}/follow");

        let (status, _) = send(&state, request("POST", &uri, Some(john), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&state, request("POST", &uri, Some(john), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("Already following"));

        let (_, body) = send(
            &state,
            request("GET", &format!("/users/{maria}/followers/count"), None, None),
        )
        .await;
        assert_eq!(body["count"], 1);

        let (status, _) = send(
            &state,
            request("POST", &format!("/users/{maria}/follow"), Some(maria), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn feed_scopes() {
        let state = state();
        let maria = sign_up(&state, "maria@example.com").await;
        let john = sign_up(&state, "john@example.com").await;
        send(
            &state,
            request("POST", "/posts", Some(maria), Some(json!({ "content": "oi" }))),
        )
        .await;

        let (_, body) = send(&state, request("GET", "/feed", None, None)).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(
            &state,
            request("GET", "/feed?scope=following", Some(john), None),
        )
        .await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_post_by_other_user_is_forbidden() {
        let state = state();
        let maria = sign_up(&state, "maria@example.com").await;
        let john = sign_up(&state, "john@example.com").await;
        let (_, body) = send(
            &state,
            request("POST", "/posts", Some(maria), Some(json!({ "content": "minha" }))),
        )
        .await;
        let uri = format!("/posts/{}", body["post"]["id"].as_str().unwrap());

        let (status, _) = send(&state, request("DELETE", &uri, Some(john), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&state, request("DELETE", &uri, Some(maria), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, request("DELETE", &uri, Some(maria), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn watchlist_duplicate_says_already_added() {
        let state = state();
        let maria = sign_up(&state, "maria@example.com").await;
        let entry = json!({
            "series": { "id": 70523, "title": "Dark" },
            "status": "completed",
            "rating": 3
        });

        let (status, _) = send(
            &state,
            request("POST", "/me/series", Some(maria), Some(entry.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&state, request("POST", "/me/series", Some(maria), Some(entry))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("already added"));

        let (_, body) = send(&state, request("GET", "/me/series", Some(maria), None)).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }
}
