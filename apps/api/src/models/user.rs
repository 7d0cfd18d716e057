use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Subscription tier. Unknown strings resolve to `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Weekly,
    Standard,
    Premium,
    EmployerJd,
}

impl Plan {
    pub fn parse(raw: &str) -> Self {
        Self::from_known(raw).unwrap_or(Plan::Free)
    }

    pub fn from_known(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "weekly" => Some(Plan::Weekly),
            "standard" => Some(Plan::Standard),
            "premium" => Some(Plan::Premium),
            "employer_jd" => Some(Plan::EmployerJd),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Weekly => "weekly",
            Plan::Standard => "standard",
            Plan::Premium => "premium",
            Plan::EmployerJd => "employer_jd",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
    Superadmin,
}

impl Role {
    /// Unknown roles are ordinary users.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "guest" => Role::Guest,
            "admin" => Role::Admin,
            "superadmin" => Role::Superadmin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Active,
    PastDue,
    Canceled,
    None,
}

impl PlanStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => PlanStatus::Active,
            "past_due" => PlanStatus::PastDue,
            "canceled" | "cancelled" => PlanStatus::Canceled,
            _ => PlanStatus::None,
        }
    }
}

/// Raw `users` row as stored. Role and plan are free-form text in the table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRow {
    pub auth_id: String,
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub role: Option<String>,
    pub plan: Option<String>,
    pub plan_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Identity behind a live session, as handed over by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthIdentity {
    pub auth_id: String,
    pub email: Option<String>,
}

/// Typed user record the admission pipeline works with.
/// `auth_id` is `None` for the synthetic guest.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserRecord {
    pub auth_id: Option<String>,
    pub email: Option<String>,
    pub fullname: Option<String>,
    pub role: Role,
    pub plan: Plan,
    pub plan_status: PlanStatus,
}

impl UserRecord {
    pub fn guest() -> Self {
        Self {
            auth_id: None,
            email: None,
            fullname: None,
            role: Role::Guest,
            plan: Plan::Free,
            plan_status: PlanStatus::None,
        }
    }

    /// Record used when the user store cannot be reached.
    pub fn fallback(auth_id: &str, email: Option<&str>) -> Self {
        Self {
            auth_id: Some(auth_id.to_string()),
            email: email.map(str::to_string),
            fullname: None,
            role: Role::User,
            plan: Plan::Free,
            plan_status: PlanStatus::None,
        }
    }
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            role: Role::parse(row.role.as_deref().unwrap_or("user")),
            plan: Plan::parse(row.plan.as_deref().unwrap_or("free")),
            plan_status: PlanStatus::parse(row.plan_status.as_deref().unwrap_or("none")),
            auth_id: Some(row.auth_id),
            email: row.email,
            fullname: row.fullname,
        }
    }
}
