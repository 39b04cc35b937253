use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

// Argon2 is CPU bound; keep it off the async workers.

pub async fn hash_password(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })
    })
    .await?
}

pub async fn verify_password(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_is_a_phc_string_and_verifies() {
        let hash = hash_password("Secur3P@ssw0rd!".into()).await.expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("Secur3P@ssw0rd!"));
        assert!(verify_password("Secur3P@ssw0rd!".into(), hash).await.expect("verify"));
    }

    #[tokio::test]
    async fn wrong_password_does_not_verify() {
        let hash = hash_password("correct-horse-battery-staple".into()).await.expect("hash");
        assert!(!verify_password("wrong-password".into(), hash).await.expect("verify"));
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        assert!(verify_password("anything".into(), "not-a-valid-hash".into())
            .await
            .is_err());
    }
}
