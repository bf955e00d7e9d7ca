use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    /// Session cookie minted by the login endpoint.
    Access,
    /// Short-lived token minted out of band; only exchangeable for a session.
    Bootstrap,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: String,   // staff id, recorded on every submission
    pub name: String, // display name shown on tickets
    pub anonymous: bool,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iss: String,
    pub aud: String,
    pub token_use: TokenUse,
}
