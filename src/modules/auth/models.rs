use garde::Validate;
use serde::{Deserialize, Serialize};

/// `POST /auth/signup/` body; echoed back on success.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[garde(length(chars, min = 1, max = 150), pattern(r"^[\w.@+-]+$"))]
    pub username: String,
    #[garde(email, length(chars, max = 254))]
    pub email: String,
}

/// `POST /auth/token/` body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TokenRequest {
    #[garde(length(chars, min = 1, max = 150))]
    pub username: String,
    #[garde(length(chars, min = 1))]
    pub confirmation_code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
}
