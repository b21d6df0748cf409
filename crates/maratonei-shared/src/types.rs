use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::BADGE_LINK_PREFIX;
use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Profile identity, issued by the auth gateway.
    UserId
);
uuid_id!(PostId);
uuid_id!(CommentId);
uuid_id!(StampId);
uuid_id!(NotificationId);
uuid_id!(WatchEntryId);

/// TMDB series identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SeriesId(pub i64);

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A series as referenced from a post or a stamp: the id plus the title
/// captured at the time of reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeriesRef {
    pub id: SeriesId,
    pub title: String,
}

/// Where a piece of text was written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Comment,
}

fn parse_variant<T>(field: &'static str, value: &str, table: &[(&str, T)]) -> Result<T, ValidationError>
where
    T: Copy,
{
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, v)| *v)
        .ok_or_else(|| ValidationError::UnknownVariant {
            field,
            value: value.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("role", s, &[("user", Role::User), ("admin", Role::Admin)])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub id: UserId,
    pub email: Option<String>,
    pub name: String,
    /// Stored with its leading `@`, e.g. `@maria`.
    pub handle: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub coins: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            handle: Some(self.handle.clone()),
            avatar: self.avatar.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ---------------------------------------------------------------------------
// Mention candidates
// ---------------------------------------------------------------------------

/// A user as returned by the directory lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub handle: Option<String>,
    pub avatar: Option<String>,
}

impl UserSummary {
    /// The handle without any leading `@`, falling back to the display name.
    pub fn mention_handle(&self) -> &str {
        match self.handle.as_deref() {
            Some(handle) if !handle.trim_start_matches('@').is_empty() => {
                handle.strip_prefix('@').unwrap_or(handle)
            }
            _ => &self.name,
        }
    }
}

/// A series as returned by the metadata API (TMDB `/search/tv` shape).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesSummary {
    pub id: SeriesId,
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

impl SeriesSummary {
    /// Year component of `first_air_date` (`"2008-01-20"` -> `"2008"`).
    pub fn first_air_year(&self) -> Option<&str> {
        self.first_air_date
            .as_deref()
            .and_then(|date| date.split('-').next())
            .filter(|year| !year.is_empty())
    }

    pub fn to_ref(&self) -> SeriesRef {
        SeriesRef {
            id: self.id,
            title: self.name.clone(),
        }
    }
}

/// One entry of the mention dropdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MentionCandidate {
    User(UserSummary),
    Series(SeriesSummary),
}

// ---------------------------------------------------------------------------
// Posts and comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub image_url: Option<String>,
    pub series: Option<SeriesRef>,
    pub created_at: DateTime<Utc>,
    pub like_count: u32,
    pub comment_count: u32,
}

/// A post as submitted by its author, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: UserId,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub series: Option<SeriesRef>,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeedScope {
    #[default]
    Global,
    Following,
}

// ---------------------------------------------------------------------------
// Stamps (badges)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "rarity",
            s,
            &[
                ("common", Rarity::Common),
                ("rare", Rarity::Rare),
                ("epic", Rarity::Epic),
                ("legendary", Rarity::Legendary),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// Manual grants only.
    None,
    /// Auto-awarded once the holder's post count for the linked series
    /// reaches the threshold.
    PostCount,
}

impl RequirementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementKind::None => "none",
            RequirementKind::PostCount => "post_count",
        }
    }
}

impl FromStr for RequirementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "requirement",
            s,
            &[
                ("none", RequirementKind::None),
                ("post_count", RequirementKind::PostCount),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    None,
    PostCount { threshold: u32 },
}

impl Requirement {
    pub fn kind(&self) -> RequirementKind {
        match self {
            Requirement::None => RequirementKind::None,
            Requirement::PostCount { .. } => RequirementKind::PostCount,
        }
    }

    pub fn threshold(&self) -> u32 {
        match self {
            Requirement::None => 0,
            Requirement::PostCount { threshold } => *threshold,
        }
    }

    /// Rebuild from the `(req_type, req_value)` column pair.
    pub fn from_parts(kind: RequirementKind, threshold: u32) -> Self {
        match kind {
            RequirementKind::None => Requirement::None,
            RequirementKind::PostCount => Requirement::PostCount { threshold },
        }
    }
}

/// A badge definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stamp {
    pub id: StampId,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub image_url: String,
    /// `Some(coins)` when the stamp is sold in the marketplace.
    pub price: Option<u32>,
    pub series: Option<SeriesRef>,
    pub requirement: Requirement,
    pub max_supply: Option<u32>,
    pub current_supply: u32,
    pub created_at: DateTime<Utc>,
}

impl Stamp {
    pub fn is_purchasable(&self) -> bool {
        self.price.is_some()
    }

    /// Link stored on `badge_earned` notifications.
    pub fn badge_link(&self) -> String {
        format!("{BADGE_LINK_PREFIX}{}", self.id)
    }

    /// Whether `post_count` posts tagged with this stamp's series earn it.
    pub fn is_satisfied_by(&self, post_count: u64) -> bool {
        match self.requirement {
            Requirement::None => false,
            Requirement::PostCount { threshold } => post_count >= u64::from(threshold),
        }
    }
}

/// Admin input for a new stamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewStamp {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rarity: Rarity,
    pub image_url: String,
    #[serde(default)]
    pub price: Option<u32>,
    #[serde(default)]
    pub series: Option<SeriesRef>,
    pub requirement: Requirement,
    #[serde(default)]
    pub max_supply: Option<u32>,
}

impl NewStamp {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if let Requirement::PostCount { threshold } = self.requirement {
            if threshold < 1 {
                return Err(ValidationError::InvalidThreshold);
            }
            if self.series.is_none() {
                return Err(ValidationError::MissingSeriesLink);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
    Mention,
    BadgeEarned,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Mention => "mention",
            NotificationKind::BadgeEarned => "badge_earned",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "notification kind",
            s,
            &[
                ("follow", NotificationKind::Follow),
                ("like", NotificationKind::Like),
                ("comment", NotificationKind::Comment),
                ("mention", NotificationKind::Mention),
                ("badge_earned", NotificationKind::BadgeEarned),
            ],
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub actor_id: UserId,
    pub kind: NotificationKind,
    pub text: String,
    pub read: bool,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// The stamp a `badge:<id>` link points at.
    pub fn linked_stamp(&self) -> Option<StampId> {
        self.link
            .as_deref()?
            .strip_prefix(BADGE_LINK_PREFIX)?
            .parse()
            .ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub actor_id: UserId,
    pub kind: NotificationKind,
    pub text: String,
    pub link: Option<String>,
}

impl NewNotification {
    pub fn badge_earned(user: UserId, stamp: &Stamp) -> Self {
        Self {
            recipient_id: user,
            actor_id: user,
            kind: NotificationKind::BadgeEarned,
            text: format!("Você desbloqueou uma nova conquista: {}!", stamp.name),
            link: Some(stamp.badge_link()),
        }
    }

    pub fn mention(recipient: UserId, actor: UserId, origin: ContentKind) -> Self {
        let place = match origin {
            ContentKind::Post => "uma publicação",
            ContentKind::Comment => "um comentário",
        };
        Self {
            recipient_id: recipient,
            actor_id: actor,
            kind: NotificationKind::Mention,
            text: format!("mencionou você em {place}."),
            link: None,
        }
    }

    pub fn follow(recipient: UserId, actor: UserId) -> Self {
        Self {
            recipient_id: recipient,
            actor_id: actor,
            kind: NotificationKind::Follow,
            text: "começou a seguir você.".to_string(),
            link: None,
        }
    }

    pub fn like(recipient: UserId, actor: UserId) -> Self {
        Self {
            recipient_id: recipient,
            actor_id: actor,
            kind: NotificationKind::Like,
            text: "curtiu sua publicação.".to_string(),
            link: None,
        }
    }

    pub fn comment(recipient: UserId, actor: UserId) -> Self {
        Self {
            recipient_id: recipient,
            actor_id: actor,
            kind: NotificationKind::Comment,
            text: "comentou na sua publicação.".to_string(),
            link: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Watchlist
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    Watching,
    Completed,
    PlanToWatch,
    Dropped,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::Watching => "watching",
            WatchStatus::Completed => "completed",
            WatchStatus::PlanToWatch => "plan_to_watch",
            WatchStatus::Dropped => "dropped",
        }
    }
}

impl FromStr for WatchStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "watch status",
            s,
            &[
                ("watching", WatchStatus::Watching),
                ("completed", WatchStatus::Completed),
                ("plan_to_watch", WatchStatus::PlanToWatch),
                ("dropped", WatchStatus::Dropped),
            ],
        )
    }
}

/// A series on a user's profile, with their verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchEntry {
    pub id: WatchEntryId,
    pub user_id: UserId,
    pub series: SeriesRef,
    pub poster_path: Option<String>,
    pub status: WatchStatus,
    /// 3 = recommended, 2 = pastime, 1 = waste of time.
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewWatchEntry {
    pub series: SeriesRef,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub review: Option<String>,
}

impl NewWatchEntry {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.rating {
            Some(r) if !(1..=3).contains(&r) => Err(ValidationError::InvalidRating(r)),
            _ => Ok(()),
        }
    }
}
