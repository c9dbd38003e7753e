use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::calendar;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_login: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub hobbies: Option<sqlx::types::Json<Vec<String>>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Start-of-tracking date: first login, else account creation.
    pub fn anchor(&self, today: NaiveDate) -> NaiveDate {
        calendar::anchor_from(
            self.first_login.map(|t| t.date_naive()),
            Some(self.created_at.date_naive()),
            today,
        )
    }

    pub fn hobby_list(&self) -> Vec<String> {
        self.hobbies.as_ref().map(|j| j.0.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32, message = "Username must be 3-32 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub first_login: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            created_at: u.created_at,
            first_login: u.first_login,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub hobbies: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserInfoUpdateRequest {
    pub birth_date: Option<NaiveDate>,
    #[validate(length(max = 32, message = "Gender too long"))]
    pub gender: Option<String>,
    pub hobbies: Option<Vec<String>>,
}
