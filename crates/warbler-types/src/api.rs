use serde::{Deserialize, Serialize};

use crate::models::{Message, MessageId, User, UserId};

// -- JWT Claims --

/// Bearer token claims. `sub` is the user id the token was issued for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

/// Signup form. Required fields are optional here on purpose: a missing
/// username, email or password is rejected by the store's NOT NULL
/// constraints when the staged user is committed.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// -- Users --

/// Profile edit form. `password` is the user's current password and must
/// verify before any change is applied.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub user: User,
    pub messages: Vec<Message>,
    pub following_count: u64,
    pub followers_count: u64,
    pub likes_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub user_id: UserId,
    pub following: bool,
    pub changed: bool,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(flatten)]
    pub message: Message,
    pub author: Option<User>,
    pub like_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub message_id: MessageId,
    pub liked: bool,
    pub changed: bool,
    pub like_count: u64,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
