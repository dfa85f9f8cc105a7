/// JWT issue and validation for the help desk services
///
/// Tokens are signed with HS256 using a secret loaded once at startup.
/// Every service that validates tokens must call `initialize_jwt_secret()`
/// before handling requests:
///
/// ```rust,ignore
/// use crypto_core::jwt;
///
/// let secret = std::env::var("JWT_SECRET")?;
/// jwt::initialize_jwt_secret(&secret)?;
/// ```
use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub email: String,
}

struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

static JWT_KEYS: OnceCell<JwtKeys> = OnceCell::new();

/// Initialize the signing secret.
///
/// Can only be called once per process; later calls return an error.
pub fn initialize_jwt_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        return Err(anyhow!("JWT secret must not be empty"));
    }

    let keys = JwtKeys {
        encoding: EncodingKey::from_secret(secret.as_bytes()),
        decoding: DecodingKey::from_secret(secret.as_bytes()),
    };

    JWT_KEYS
        .set(keys)
        .map_err(|_| anyhow!("JWT secret already initialized"))
}

/// Whether `initialize_jwt_secret()` has already succeeded
pub fn is_initialized() -> bool {
    JWT_KEYS.get().is_some()
}

fn get_keys() -> Result<&'static JwtKeys> {
    JWT_KEYS
        .get()
        .ok_or_else(|| anyhow!("JWT secret not initialized. Call initialize_jwt_secret() during startup."))
}

/// Generate an access token valid for `expiry_minutes`
pub fn generate_access_token(user_id: Uuid, email: &str, expiry_minutes: i64) -> Result<String> {
    let now = Utc::now();
    let expiry = now + Duration::minutes(expiry_minutes);

    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: expiry.timestamp(),
        email: email.to_string(),
    };

    let keys = get_keys()?;
    encode(&Header::new(JWT_ALGORITHM), &claims, &keys.encoding)
        .map_err(|e| anyhow!("Failed to generate access token: {e}"))
}

/// Validate signature and expiry, returning the decoded claims
pub fn validate_token(token: &str) -> Result<TokenData<Claims>> {
    let keys = get_keys()?;

    let mut validation = Validation::new(JWT_ALGORITHM);
    validation.validate_exp = true;

    decode::<Claims>(token, &keys.decoding, &validation)
        .map_err(|e| anyhow!("Token validation failed: {e}"))
}

/// Extract the user ID from a token after validating it
pub fn get_user_id_from_token(token: &str) -> Result<Uuid> {
    let token_data = validate_token(token)?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|e| anyhow!("Invalid user ID format in token: {e}"))
}
