/// Application name
pub const APP_NAME: &str = "Maratonei";

/// Trigger character opening a user reference in the composer
pub const USER_TRIGGER: char = '@';

/// Trigger character opening a series reference in the composer
pub const SERIES_TRIGGER: char = '/';

/// Longest pending query (in characters) that keeps a mention search open
pub const MAX_PENDING_QUERY_CHARS: usize = 30;

/// Inactivity delay before a mention lookup is issued, in milliseconds
pub const MENTION_DEBOUNCE_MS: u64 = 300;

/// Series candidates shown in the mention dropdown
pub const SERIES_SUGGESTION_LIMIT: usize = 5;

/// Trending series shown in the sidebar
pub const TRENDING_LIMIT: usize = 5;

/// Users returned by a directory search
pub const USER_SEARCH_LIMIT: usize = 10;

/// Notifications returned per listing
pub const NOTIFICATION_PAGE_SIZE: usize = 20;

/// Default feed page size
pub const DEFAULT_FEED_PAGE_SIZE: u32 = 5;

/// Coins granted to a freshly created profile
pub const STARTING_COINS: i64 = 50;

/// Bio given to a freshly created profile
pub const DEFAULT_BIO: &str = "Novo na comunidade Maratonei!";

/// Prefix of the notification link pointing at a stamp (`badge:<id>`)
pub const BADGE_LINK_PREFIX: &str = "badge:";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Header carrying the authenticated user id, set by the auth gateway
pub const USER_ID_HEADER: &str = "x-user-id";
