use maratonei_shared::lookup::LookupError;
use maratonei_shared::ValidationError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No signed-in user")]
    NotSignedIn,

    #[error("TMDB API key is not configured")]
    MissingApiKey,
}

impl From<ClientError> for LookupError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http(e) => LookupError::Transport(e.to_string()),
            ClientError::Server { status, .. } => LookupError::Status(status),
            ClientError::Decode(msg) => LookupError::Decode(msg),
            other => LookupError::Backend(other.to_string()),
        }
    }
}

/// Error body returned by the Maratonei server.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Decode a successful response as `T`, or turn a non-2xx response into
/// [`ClientError::Server`] carrying the server's message when it sent one.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        return Err(server_error(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
}

fn server_error(status: u16, body: &str) -> ClientError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no details".to_string(),
        Err(_) => body.trim().to_string(),
    };
    ClientError::Server { status, message }
}
