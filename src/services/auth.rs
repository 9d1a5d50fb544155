use base64::Engine;
use blake2::{Blake2b512, Digest};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

// Stateless bearer tokens: `base64(user_id).expiry_ts.base64(hmac-sha1)`.
// The signature covers the decoded user id and the expiry timestamp.

pub fn hash_password(password: &str) -> String {
    let digest = Blake2b512::digest(password.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}

fn sign(secret: &str, payload: &str) -> Option<String> {
    let mut mac = match Hmac::<Sha1>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return None,
    };
    mac.update(payload.as_bytes());
    let result = mac.finalize().into_bytes();
    Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(result))
}

pub fn mint_token(secret: &str, user_id: &str, expires_at: DateTime<Utc>) -> Option<String> {
    let ts = expires_at.timestamp();
    let sig = sign(secret, &format!("{user_id}.{ts}"))?;
    let id_part = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(user_id.as_bytes());
    Some(format!("{id_part}.{ts}.{sig}"))
}

/// Returns the user id for a well-formed, unexpired, correctly-signed token.
pub fn verify_token(secret: &str, token: &str, now: DateTime<Utc>) -> Option<String> {
    let mut parts = token.splitn(3, '.');
    let id_part = parts.next()?;
    let ts_part = parts.next()?;
    let sig = parts.next()?;

    let id_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(id_part)
        .ok()?;
    let user_id = String::from_utf8(id_bytes).ok()?;
    let ts: i64 = ts_part.parse().ok()?;

    if ts <= now.timestamp() {
        return None;
    }

    let expected = sign(secret, &format!("{user_id}.{ts}"))?;
    if expected != sig {
        return None;
    }
    Some(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("hunter2");
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_token_round_trip() {
        let now = Utc::now();
        let token = mint_token("secret", "user-1", now + Duration::hours(1)).unwrap();
        assert_eq!(
            verify_token("secret", &token, now).as_deref(),
            Some("user-1")
        );
    }

    #[test]
    fn test_token_rejects_wrong_secret() {
        let now = Utc::now();
        let token = mint_token("secret", "user-1", now + Duration::hours(1)).unwrap();
        assert!(verify_token("other", &token, now).is_none());
    }

    #[test]
    fn test_token_rejects_expired() {
        let now = Utc::now();
        let token = mint_token("secret", "user-1", now - Duration::hours(1)).unwrap();
        assert!(verify_token("secret", &token, now).is_none());
    }

    #[test]
    fn test_token_rejects_tampered_id() {
        let now = Utc::now();
        let token = mint_token("secret", "user-1", now + Duration::hours(1)).unwrap();
        let forged_id =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode("user-2".as_bytes());
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[0] = &forged_id;
        let forged = parts.join(".");
        assert!(verify_token("secret", &forged, now).is_none());
    }

    #[test]
    fn test_token_rejects_garbage() {
        let now = Utc::now();
        assert!(verify_token("secret", "", now).is_none());
        assert!(verify_token("secret", "a.b.c", now).is_none());
        assert!(verify_token("secret", "not-a-token", now).is_none());
    }
}
