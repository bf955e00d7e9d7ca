use std::env;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};

use firdesk_backend::config::{DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_ISSUER};
use firdesk_backend::routes::auth::claims::{Claims, TokenUse};
use firdesk_backend::utils::jwt::{create_jwt, JwtKeys};

/// Mints a bootstrap token a named staff member can exchange for a session.
/// Usage: mint_bootstrap <staff-id> <display-name> [ttl-minutes]
fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut args = env::args().skip(1);
    let staff_id = match args.next() {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => bail!("usage: mint_bootstrap <staff-id> <display-name> [ttl-minutes]"),
    };
    let display_name = match args.next() {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => bail!("usage: mint_bootstrap <staff-id> <display-name> [ttl-minutes]"),
    };
    let ttl_minutes: i64 = match args.next() {
        Some(raw) => raw
            .parse()
            .ok()
            .filter(|minutes| *minutes > 0)
            .context("ttl-minutes must be a positive integer")?,
        None => 15,
    };

    let keys = JwtKeys::from_env().context("JWT_SECRET must be set to a strong secret")?;
    let issuer = env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string());
    let audience = env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_JWT_AUDIENCE.to_string());

    let claims = Claims {
        id: staff_id.clone(),
        name: display_name,
        anonymous: false,
        exp: (Utc::now() + Duration::minutes(ttl_minutes)).timestamp() as usize,
        iss: String::new(),
        aud: String::new(),
        token_use: TokenUse::Bootstrap,
    };

    let token = create_jwt(claims, &keys, &issuer, &audience)
        .context("failed to sign bootstrap token")?;

    eprintln!("Bootstrap token for {staff_id}, valid {ttl_minutes} minutes:");
    println!("{token}");

    Ok(())
}
