use std::env;

/// Application configuration loaded from environment variables.
///
/// Built once at startup and passed by reference into the orchestrator;
/// nothing else in the process reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    // Twitter app credentials (consumer pair)
    pub twitter_api_key: String,
    pub twitter_api_key_secret: String,

    /// User id of the bot account. Only this identity may complete the
    /// OAuth login flow and have its token persisted.
    pub bot_user_id: String,

    // Spreadsheet target
    pub spreadsheet_id: String,
    pub google_access_token: String,

    /// Where the user-delegated OAuth token is persisted between runs.
    pub credentials_path: String,

    /// Absolute URL the OAuth provider redirects back to after authorization.
    pub oauth_callback_url: String,

    // Web server
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            twitter_api_key: required_env("TWITTER_API_KEY"),
            twitter_api_key_secret: required_env("TWITTER_API_KEY_SECRET"),
            bot_user_id: required_env("TWITTER_BOT_USER_ID"),
            spreadsheet_id: required_env("SPREADSHEET_ID"),
            google_access_token: required_env("GOOGLE_ACCESS_TOKEN"),
            credentials_path: env::var("CREDENTIALS_PATH")
                .unwrap_or_else(|_| "./credentials.json".to_string()),
            oauth_callback_url: required_env("OAUTH_CALLBACK_URL"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
