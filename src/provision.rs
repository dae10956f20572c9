use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::auth::repo::Role;
use crate::config::AppConfig;

/// One-time admin bootstrap, driven by configuration and safe to run on every
/// startup: the insert is a no-op once the account exists.
pub async fn ensure_admin(db: &PgPool, config: &AppConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    if password.len() < 8 {
        warn!("ADMIN_PASSWORD shorter than 8 characters; skipping admin provisioning");
        return Ok(());
    }

    let hash = hash_password(password)?;
    let result = sqlx::query(
        r#"
        INSERT INTO users (email, password_hash, name, role, is_active, is_verified)
        VALUES ($1, $2, $3, $4, TRUE, TRUE)
        ON CONFLICT (email) DO NOTHING
        "#,
    )
    .bind(email.trim().to_lowercase())
    .bind(hash)
    .bind("Administrator")
    .bind(Role::Admin)
    .execute(db)
    .await?;

    if result.rows_affected() > 0 {
        info!(email = %email, "admin account provisioned");
    }
    Ok(())
}
