//! Admin identity and capability checks.
//!
//! Every mutating engine operation requires a verified admin identity.
//! The boundary layer authenticates a presented token once, obtains an
//! [`AdminContext`], and passes it into the engine; each operation then
//! checks a single capability from a closed set before touching any state.
//!
//! # Flow
//!
//! 1. Hash the presented token using SHA-256
//! 2. Look up the hash in `admin_tokens` where `is_active = true`
//! 3. If found: build an `AdminContext` carrying the admin id and role
//! 4. If not found: return `Unauthorized`

use crate::{db::DbPool, error::AppError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Closed set of administrative roles.
///
/// Stored in the `role` column of `admin_tokens`. Roles map to capability
/// sets below; there is no per-admin capability override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Read-only support staff; holds no financial capability.
    Support,
    /// Day-to-day finance staff: wallet adjustments and payout review.
    FinanceOperator,
    /// Full authority, including refunds and escrow release.
    SuperAdmin,
}

/// Closed set of capabilities an engine operation may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ManageWallets,
    ReviewPayouts,
    IssueRefunds,
    ReleaseEscrow,
}

impl AdminRole {
    /// Whether this role grants the given capability.
    pub fn allows(self, capability: Capability) -> bool {
        match self {
            AdminRole::Support => false,
            AdminRole::FinanceOperator => matches!(
                capability,
                Capability::ManageWallets | Capability::ReviewPayouts
            ),
            AdminRole::SuperAdmin => true,
        }
    }
}

/// Verified admin identity attached to every mutating engine call.
///
/// Only [`authenticate_admin`] constructs this from untrusted input; the
/// engine never trusts a caller-supplied admin id that did not come from a
/// validated token.
#[derive(Debug, Clone)]
pub struct AdminContext {
    /// ID of the authenticated admin, recorded on audit rows and entries.
    pub admin_id: Uuid,

    /// Role of the authenticated admin.
    pub role: AdminRole,
}

impl AdminContext {
    /// Check a capability at the operation boundary.
    ///
    /// Returns `Forbidden` when the role does not grant it. Called before
    /// any state is read or written.
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

#[derive(sqlx::FromRow)]
struct AdminTokenRow {
    admin_id: Uuid,
    role: AdminRole,
}

/// Authenticate a presented admin token.
///
/// # Errors
///
/// - `Unauthorized`: no active token matches the hash
/// - `Database`: lookup failed
pub async fn authenticate_admin(pool: &DbPool, token: &str) -> Result<AdminContext, AppError> {
    // Only the SHA-256 hash is stored; the plaintext never reaches the database.
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let token_hash = hex::encode(hasher.finalize());

    let record = sqlx::query_as::<_, AdminTokenRow>(
        "SELECT admin_id, role FROM admin_tokens WHERE token_hash = $1 AND is_active = true",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    Ok(AdminContext {
        admin_id: record.admin_id,
        role: record.role,
    })
}

/// Issue a new token for an admin and return the plaintext.
///
/// The plaintext is shown exactly once; only its hash is persisted.
/// 32 random bytes, hex-encoded to 64 characters.
pub async fn issue_admin_token(
    pool: &DbPool,
    admin_id: Uuid,
    role: AdminRole,
) -> Result<String, AppError> {
    let bytes: [u8; 32] = rand::random();
    let token = hex::encode(bytes);

    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let token_hash = hex::encode(hasher.finalize());

    sqlx::query("INSERT INTO admin_tokens (admin_id, token_hash, role) VALUES ($1, $2, $3)")
        .bind(admin_id)
        .bind(&token_hash)
        .bind(role)
        .execute(pool)
        .await?;

    Ok(token)
}
