use std::env;

pub const DEFAULT_JWT_ISSUER: &str = "firdesk";
pub const DEFAULT_JWT_AUDIENCE: &str = "firdesk-staff";

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub uploads_dir: String,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let jwt_issuer =
            env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string());
        let jwt_audience =
            env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_JWT_AUDIENCE.to_string());

        let uploads_dir = env::var("UPLOADS_DIR").unwrap_or_else(|_| "./uploads".to_string());

        let session_ttl_hours = env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|hours| *hours > 0)
            .unwrap_or(12);

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Config {
            database_url,
            frontend_origin,
            jwt_issuer,
            jwt_audience,
            uploads_dir,
            session_ttl_hours,
            cookie_secure,
        }
    }
}
