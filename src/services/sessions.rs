use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::db::models::User;
use crate::db::{sessions, users};
use crate::error::{ApiError, ApiResult};
use crate::services::credentials::{generate_token, hash_token, verify_password_blocking};

/// Issues a new bearer token for `user`, valid for `ttl`.
pub async fn issue(pool: &SqlitePool, user: &User, ttl: Duration) -> ApiResult<String> {
    let token = generate_token();
    sessions::insert(pool, &hash_token(&token), user.id, Utc::now() + ttl).await?;
    Ok(token)
}

/// Verifies credentials and issues a token. Unknown users and wrong
/// passwords are indistinguishable to the caller.
pub async fn login(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    ttl: Duration,
) -> ApiResult<(User, String)> {
    let user = users::find_by_username(pool, username.trim())
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
        log::warn!("Failed login for {}", user.username);
        return Err(ApiError::Unauthorized);
    }

    let purged = sessions::purge_expired(pool, Utc::now()).await?;
    if purged > 0 {
        log::debug!("Purged {} expired sessions", purged);
    }

    let token = issue(pool, &user, ttl).await?;
    log::info!("User {} logged in", user.username);
    Ok((user, token))
}

pub async fn resolve(pool: &SqlitePool, token: &str) -> ApiResult<User> {
    sessions::find_user(pool, &hash_token(token), Utc::now())
        .await?
        .ok_or(ApiError::Unauthorized)
}

pub async fn revoke(pool: &SqlitePool, token: &str) -> ApiResult<()> {
    sessions::delete(pool, &hash_token(token)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Role;
    use crate::db::testing::{insert_user, temp_pool};

    #[tokio::test]
    async fn login_resolve_revoke() {
        let (_dir, pool) = temp_pool().await;
        let root = insert_user(&pool, "root", Role::Admin, None, None).await;

        let (user, token) = login(&pool, "root", "correct horse battery", Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(user.id, root.id);

        let resolved = resolve(&pool, &token).await.unwrap();
        assert_eq!(resolved.username, "root");

        revoke(&pool, &token).await.unwrap();
        assert!(matches!(
            resolve(&pool, &token).await.unwrap_err(),
            ApiError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (_dir, pool) = temp_pool().await;
        insert_user(&pool, "root", Role::Admin, None, None).await;

        let wrong = login(&pool, "root", "wrong password", Duration::hours(1)).await;
        assert!(matches!(wrong, Err(ApiError::Unauthorized)));
        let unknown = login(&pool, "nobody", "whatever", Duration::hours(1)).await;
        assert!(matches!(unknown, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn expired_tokens_do_not_resolve() {
        let (_dir, pool) = temp_pool().await;
        let root = insert_user(&pool, "root", Role::Admin, None, None).await;
        let token = issue(&pool, &root, Duration::seconds(-1)).await.unwrap();
        assert!(resolve(&pool, &token).await.is_err());
    }

    #[tokio::test]
    async fn login_purges_expired_sessions() {
        let (_dir, pool) = temp_pool().await;
        let root = insert_user(&pool, "root", Role::Admin, None, None).await;
        issue(&pool, &root, Duration::seconds(-1)).await.unwrap();

        login(&pool, "root", "correct horse battery", Duration::hours(1))
            .await
            .unwrap();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
