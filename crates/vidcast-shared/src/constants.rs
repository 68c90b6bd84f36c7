/// Application name
pub const APP_NAME: &str = "vidcast";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 7000;

/// Name of the cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Default access token lifetime (7 days)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Longest access token lifetime the server will accept (1 year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Maximum accepted upload size in bytes (100 MiB)
pub const MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

/// Key derivation context (BLAKE3) for the token signing key
pub const KDF_CONTEXT_ACCESS_TOKEN: &str = "vidcast-access-token-v1";

/// Argon2id salt length in bytes
pub const PASSWORD_SALT_SIZE: usize = 16;

/// Argon2id output length in bytes
pub const PASSWORD_HASH_SIZE: usize = 32;

/// Media assigned to new accounts and channels until they upload their own.
pub const DEFAULT_AVATAR_URL: &str =
    "https://res.cloudinary.com/dpdwl1tsu/image/upload/v1733578739/egt2sufg3qzyn1ofws9t_xvfn00.jpg";
pub const DEFAULT_BANNER_URL: &str =
    "https://res.cloudinary.com/dpdwl1tsu/image/upload/v1733578478/dlekdyn1dep7gevz9zyn.avif";
