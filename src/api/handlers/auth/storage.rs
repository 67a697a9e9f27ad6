//! Database access for the credential store and the one-time-code ledger.
//!
//! All statements are single-document, single-operation; nothing here needs
//! a cross-row transaction. The one place concurrency matters is
//! [`consume_code`]: the pending->verified transition is a single
//! conditional `UPDATE`, so two racing submissions of the same code can
//! never both succeed.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::Role;
use super::utils::is_unique_violation;

/// Purpose a one-time code was issued for; verification matches on it
/// exactly, so a signup code can never be replayed against login.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodePurpose {
    Login,
    Signup,
    PasswordReset,
}

impl CodePurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Signup => "signup",
            Self::PasswordReset => "password_reset",
        }
    }
}

/// Credential store row, minus timestamps nothing here reads.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_verified: bool,
}

/// Fields for a new credential store row.
#[derive(Debug)]
pub(super) struct NewUser<'a> {
    pub(super) email: &'a str,
    pub(super) first_name: &'a str,
    pub(super) last_name: &'a str,
    pub(super) password_hash: Option<&'a str>,
    pub(super) is_verified: bool,
}

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(UserRecord),
    Conflict,
}

/// A consumed ledger row; `user_id` is absent for signup codes.
#[derive(Debug)]
pub(super) struct ConsumedCode {
    pub(super) user_id: Option<Uuid>,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    let role: String = row.get("role");
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role: Role::parse(&role).unwrap_or_default(),
        is_verified: row.get("is_verified"),
    }
}

pub(super) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query =
        "SELECT id, email, first_name, last_name, password_hash, role, is_verified \
         FROM users WHERE email = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(super) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query =
        "SELECT id, email, first_name, last_name, password_hash, role, is_verified \
         FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.as_ref().map(user_from_row))
}

/// Insert a user; the store-level unique index on email is the single
/// authority on duplicates, surfaced as [`SignupOutcome::Conflict`].
pub(super) async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users
            (email, first_name, last_name, password_hash, role, is_verified)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, email, first_name, last_name, password_hash, role, is_verified
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user.email)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.password_hash)
        .bind(Role::default().as_str())
        .bind(user.is_verified)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(user_from_row(&row))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Store a new password hash; returns false when the user row is gone.
pub(super) async fn set_password_hash(pool: &PgPool, user_id: Uuid, hash: &str) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store password hash")?;

    Ok(result.rows_affected() > 0)
}

/// Flip the verification flag; safe to call for already-verified users.
pub(super) async fn mark_verified(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE users
        SET is_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
          AND NOT is_verified
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to mark user verified")?;

    Ok(())
}

/// Write a pending ledger row. Several pending codes may coexist for the
/// same (email, purpose); verification matches on the exact code value.
pub(super) async fn insert_code(
    pool: &PgPool,
    email: &str,
    user_id: Option<Uuid>,
    code: &str,
    purpose: CodePurpose,
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO one_time_codes
            (email, user_id, code, purpose, status, expires_at)
        VALUES ($1, $2, $3, $4, 'pending', NOW() + ($5 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(user_id)
        .bind(code)
        .bind(purpose.as_str())
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert one-time code")?;

    Ok(())
}

/// Atomically consume a pending, unexpired code matching (email, code,
/// purpose) exactly.
///
/// The match-and-set is one conditional `UPDATE`, never read-then-write:
/// of two concurrent submissions of the same valid code, exactly one
/// observes `status = 'pending'` and wins. Which dimension failed to match
/// is deliberately not distinguishable from the result.
pub(super) async fn consume_code(
    pool: &PgPool,
    email: &str,
    code: &str,
    purpose: CodePurpose,
) -> Result<Option<ConsumedCode>> {
    let query = r"
        UPDATE one_time_codes
        SET status = 'verified',
            verified_at = NOW()
        WHERE email = $1
          AND code = $2
          AND purpose = $3
          AND status = 'pending'
          AND expires_at > NOW()
        RETURNING user_id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(code)
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume one-time code")?;

    Ok(row.map(|row| ConsumedCode {
        user_id: row.get("user_id"),
    }))
}

/// Delete every ledger row past its expiry, pending or verified alike.
/// Idempotent and safe alongside issuance/verification.
pub async fn sweep_expired_codes(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM one_time_codes WHERE expires_at <= NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to sweep expired codes")?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_purpose_strings() {
        assert_eq!(CodePurpose::Login.as_str(), "login");
        assert_eq!(CodePurpose::Signup.as_str(), "signup");
        assert_eq!(CodePurpose::PasswordReset.as_str(), "password_reset");
    }

    #[test]
    fn signup_outcome_debug_names() {
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

    #[test]
    fn user_record_defaults_role_on_unknown_label() {
        // Role::parse is the single decode point for the role column.
        assert_eq!(Role::parse("owner"), None);
        assert_eq!(Role::parse("owner").unwrap_or_default(), Role::User);
    }
}
