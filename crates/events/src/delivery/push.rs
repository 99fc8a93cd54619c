//! Browser push delivery via the Web Push protocol.
//!
//! Payloads are encrypted with RFC 8291 (`aes128gcm` content coding) and
//! requests are authorised with a VAPID ES256 JWT (RFC 8292). A 404 or 410
//! from the push service is reported as [`DeliveryError::Gone`] so the caller
//! can expire the subscription.

use std::time::Duration;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hkdf::Hkdf;
use notifypro_core::channels::Channel;
use notifypro_core::subscription::{PushKeys, STATUS_GONE, STATUS_NOT_FOUND};
use p256::ecdh::EphemeralSecret;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::Sha256;
use url::Url;

use super::{error_body, ChannelSender, DeliveryError, DeliveryReceipt, Destination, NotificationPayload};

const SALT_LEN: usize = 16;
const PUBLIC_KEY_LEN: usize = 65;
const PRIVATE_KEY_LEN: usize = 32;
const AUTH_SECRET_LEN: usize = 16;
const TAG_LEN: usize = 16;
const RECORD_SIZE: u32 = 4096;

/// `salt | rs | idlen | keyid` in front of the ciphertext.
const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;

/// Largest plaintext that fits one record, and the 4096-byte push body limit,
/// after the padding delimiter and the GCM tag.
const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - HEADER_LEN - TAG_LEN - 1;

const IKM_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// Lifetime of a VAPID JWT.
const VAPID_JWT_EXP_SECS: i64 = 12 * 60 * 60;

/// How long the push service should hold an undelivered message.
const PUSH_TTL_SECS: u32 = 24 * 60 * 60;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_TITLE_CHARS: usize = 120;
const MAX_BODY_CHARS: usize = 1000;

const DEFAULT_SUBJECT: &str = "mailto:admin@localhost";
const ICON_PATH: &str = "/icon.png";
const BADGE_PATH: &str = "/badge.png";

// ---------------------------------------------------------------------------
// WebPushConfig
// ---------------------------------------------------------------------------

/// VAPID key material.
#[derive(Debug, Clone)]
pub struct WebPushConfig {
    public_key_b64: String,
    private_key: [u8; PRIVATE_KEY_LEN],
    subject: String,
}

impl WebPushConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when neither key is set (push not configured).
    ///
    /// | Variable                     | Required | Default                  |
    /// |------------------------------|----------|--------------------------|
    /// | `WEB_PUSH_VAPID_PUBLIC_KEY`  | yes      | -                        |
    /// | `WEB_PUSH_VAPID_PRIVATE_KEY` | yes      | -                        |
    /// | `WEB_PUSH_VAPID_SUBJECT`     | no       | `mailto:admin@localhost` |
    pub fn from_env() -> Result<Option<Self>, DeliveryError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let (public, private) = match (
            read("WEB_PUSH_VAPID_PUBLIC_KEY"),
            read("WEB_PUSH_VAPID_PRIVATE_KEY"),
        ) {
            (None, None) => return Ok(None),
            (Some(public), Some(private)) => (public, private),
            _ => {
                return Err(DeliveryError::Config(
                    "Both WEB_PUSH_VAPID_PUBLIC_KEY and WEB_PUSH_VAPID_PRIVATE_KEY must be set"
                        .to_string(),
                ))
            }
        };
        let subject = read("WEB_PUSH_VAPID_SUBJECT").unwrap_or_else(|| DEFAULT_SUBJECT.to_string());

        Self::from_parts(public, &private, subject).map(Some)
    }

    /// Build from base64url keys, checking their lengths.
    pub fn from_parts(
        public_key_b64: String,
        private_key_b64: &str,
        subject: String,
    ) -> Result<Self, DeliveryError> {
        let public = decode_fixed::<PUBLIC_KEY_LEN>(&public_key_b64, "VAPID public key")
            .map_err(|e| DeliveryError::Config(e.to_string()))?;
        p256::PublicKey::from_sec1_bytes(&public)
            .map_err(|_| DeliveryError::Config("VAPID public key is not a P-256 point".to_string()))?;
        let private_key = decode_fixed::<PRIVATE_KEY_LEN>(private_key_b64, "VAPID private key")
            .map_err(|e| DeliveryError::Config(e.to_string()))?;

        Ok(Self {
            public_key_b64,
            private_key,
            subject,
        })
    }

    /// Public key handed to browsers as `applicationServerKey`.
    pub fn public_key(&self) -> &str {
        &self.public_key_b64
    }
}

// ---------------------------------------------------------------------------
// Wire payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage<'a> {
    title: String,
    body: String,
    icon: &'static str,
    badge: &'static str,
    data: PushMessageData<'a>,
    tag: String,
    require_interaction: bool,
    silent: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushMessageData<'a> {
    url: &'a str,
    conversation_id: Option<&'a str>,
    contact_id: Option<&'a str>,
}

impl<'a> PushMessage<'a> {
    fn new(payload: &'a NotificationPayload, now_ms: i64) -> Self {
        Self {
            title: payload.title.chars().take(MAX_TITLE_CHARS).collect(),
            body: payload.body.chars().take(MAX_BODY_CHARS).collect(),
            icon: ICON_PATH,
            badge: BADGE_PATH,
            data: PushMessageData {
                url: &payload.url,
                conversation_id: payload.conversation_id.as_deref(),
                contact_id: payload.contact_id.as_deref(),
            },
            tag: format!("conversation-notification-{now_ms}"),
            require_interaction: payload.is_priority,
            silent: !payload.sound,
        }
    }

    /// Serialize, trimming the body until the JSON fits [`MAX_PLAINTEXT_LEN`].
    ///
    /// The character caps alone are not enough: 1000 emoji are 4000 bytes.
    fn into_bytes(mut self) -> Result<Vec<u8>, DeliveryError> {
        loop {
            let bytes = serde_json::to_vec(&self).map_err(|e| DeliveryError::Build(e.to_string()))?;
            if bytes.len() <= MAX_PLAINTEXT_LEN {
                return Ok(bytes);
            }
            if self.body.is_empty() {
                return Err(DeliveryError::Build(format!(
                    "Push payload is {} bytes without a body, limit is {MAX_PLAINTEXT_LEN}",
                    bytes.len()
                )));
            }
            let overflow = bytes.len() - MAX_PLAINTEXT_LEN;
            let keep = floor_char_boundary(&self.body, self.body.len().saturating_sub(overflow));
            self.body.truncate(keep);
        }
    }
}

/// Largest char boundary in `s` at or below `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut index = index;
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ---------------------------------------------------------------------------
// WebPushSender
// ---------------------------------------------------------------------------

/// Delivers notifications to a single browser push subscription.
pub struct WebPushSender {
    config: WebPushConfig,
    client: reqwest::Client,
}

impl WebPushSender {
    pub fn new(config: WebPushConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

}

#[async_trait]
impl ChannelSender for WebPushSender {
    fn channel(&self) -> Channel {
        Channel::Push
    }

    async fn send(
        &self,
        destination: &Destination,
        payload: &NotificationPayload,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let Destination::Push(target) = destination else {
            return Err(DeliveryError::WrongDestination(Channel::Push));
        };

        let now = Utc::now();
        let message = PushMessage::new(payload, now.timestamp_millis()).into_bytes()?;

        let audience = push_service_audience(&target.endpoint)?;
        let jwt = build_vapid_jwt(
            &audience,
            &self.config.subject,
            &self.config.private_key,
            now.timestamp() + VAPID_JWT_EXP_SECS,
        )?;
        let body = encrypt_aes128gcm(&message, &target.keys)?;

        let response = self
            .client
            .post(&target.endpoint)
            .header("TTL", PUSH_TTL_SECS.to_string())
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .header(
                "Authorization",
                format!("vapid t={jwt}, k={}", self.config.public_key()),
            )
            .header("Urgency", if payload.is_priority { "high" } else { "normal" })
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            tracing::debug!(endpoint = %target.endpoint, status, "Push notification sent");
            return Ok(DeliveryReceipt {
                channel: Channel::Push,
                status_code: Some(status),
            });
        }

        if status == STATUS_GONE || status == STATUS_NOT_FOUND {
            return Err(DeliveryError::Gone { status });
        }

        Err(DeliveryError::Rejected {
            status,
            message: error_body(response, 500).await,
        })
    }
}

// ---------------------------------------------------------------------------
// Crypto helpers
// ---------------------------------------------------------------------------

fn encode_b64url(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

fn decode_fixed<const N: usize>(input: &str, what: &str) -> Result<[u8; N], DeliveryError> {
    let raw = URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('=').as_bytes())
        .map_err(|e| DeliveryError::Crypto(format!("{what} is not base64url: {e}")))?;
    raw.try_into()
        .map_err(|_| DeliveryError::Crypto(format!("{what} must decode to {N} bytes")))
}

/// Check that browser keys have the shape RFC 8291 requires.
pub fn validate_keys(keys: &PushKeys) -> Result<(), DeliveryError> {
    let public = decode_fixed::<PUBLIC_KEY_LEN>(&keys.p256dh, "p256dh key")?;
    p256::PublicKey::from_sec1_bytes(&public)
        .map_err(|_| DeliveryError::Crypto("p256dh key is not a P-256 point".to_string()))?;
    decode_fixed::<AUTH_SECRET_LEN>(&keys.auth, "auth secret")?;
    Ok(())
}

/// `scheme://host[:port]` of the push endpoint, used as the JWT audience.
fn push_service_audience(endpoint: &str) -> Result<String, DeliveryError> {
    let url = Url::parse(endpoint)
        .map_err(|e| DeliveryError::Build(format!("Invalid push endpoint URL: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| DeliveryError::Build("Push endpoint has no host".to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

fn hkdf_sha256<const N: usize>(salt: &[u8], ikm: &[u8], info: &[u8]) -> Result<[u8; N], DeliveryError> {
    let mut okm = [0u8; N];
    Hkdf::<Sha256>::new(Some(salt), ikm)
        .expand(info, &mut okm)
        .map_err(|_| DeliveryError::Crypto("HKDF expand failed".to_string()))?;
    Ok(okm)
}

/// Encrypt `plaintext` as a single `aes128gcm` record.
///
/// Output layout: `salt(16) | rs(4) | idlen(1) | sender public key(65) | ciphertext`.
fn encrypt_aes128gcm(plaintext: &[u8], keys: &PushKeys) -> Result<Vec<u8>, DeliveryError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(DeliveryError::Build(format!(
            "Push plaintext is {} bytes, limit is {MAX_PLAINTEXT_LEN}",
            plaintext.len()
        )));
    }
    let client_public_raw = decode_fixed::<PUBLIC_KEY_LEN>(&keys.p256dh, "p256dh key")?;
    let auth_secret = decode_fixed::<AUTH_SECRET_LEN>(&keys.auth, "auth secret")?;
    let client_public = p256::PublicKey::from_sec1_bytes(&client_public_raw)
        .map_err(|_| DeliveryError::Crypto("p256dh key is not a P-256 point".to_string()))?;

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let local_secret = EphemeralSecret::random(&mut OsRng);
    let local_public = p256::PublicKey::from(&local_secret).to_encoded_point(false);
    let local_public_raw = local_public.as_bytes();
    let shared = local_secret.diffie_hellman(&client_public);

    let mut key_info = Vec::with_capacity(IKM_INFO_PREFIX.len() + PUBLIC_KEY_LEN * 2);
    key_info.extend_from_slice(IKM_INFO_PREFIX);
    key_info.extend_from_slice(&client_public_raw);
    key_info.extend_from_slice(local_public_raw);

    let ikm: [u8; 32] = hkdf_sha256(&auth_secret, shared.raw_secret_bytes().as_slice(), &key_info)?;
    let cek: [u8; 16] = hkdf_sha256(&salt, &ikm, CEK_INFO)?;
    let nonce: [u8; 12] = hkdf_sha256(&salt, &ikm, NONCE_INFO)?;

    // Single final record: the padding delimiter is 0x02.
    let mut padded = Vec::with_capacity(plaintext.len() + 1);
    padded.extend_from_slice(plaintext);
    padded.push(2);

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|_| DeliveryError::Crypto("Invalid content encryption key".to_string()))?;
    let ciphertext = cipher
        .encrypt((&nonce).into(), padded.as_slice())
        .map_err(|_| DeliveryError::Crypto("AES-GCM encryption failed".to_string()))?;

    let mut body = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(local_public_raw);
    body.extend_from_slice(&ciphertext);
    Ok(body)
}

/// Sign a VAPID JWT (`header.claims.signature`, ES256).
fn build_vapid_jwt(
    audience: &str,
    subject: &str,
    private_key: &[u8; PRIVATE_KEY_LEN],
    expires_at: i64,
) -> Result<String, DeliveryError> {
    #[derive(Serialize)]
    struct Claims<'a> {
        aud: &'a str,
        exp: i64,
        sub: &'a str,
    }

    let header = serde_json::json!({ "typ": "JWT", "alg": "ES256" });
    let claims = Claims {
        aud: audience,
        exp: expires_at,
        sub: subject,
    };

    let header_json = serde_json::to_vec(&header)
        .map_err(|e| DeliveryError::Build(format!("JWT header serialization failed: {e}")))?;
    let claims_json = serde_json::to_vec(&claims)
        .map_err(|e| DeliveryError::Build(format!("JWT claims serialization failed: {e}")))?;
    let signing_input = format!("{}.{}", encode_b64url(&header_json), encode_b64url(&claims_json));

    let signing_key = SigningKey::from_bytes(private_key.into())
        .map_err(|_| DeliveryError::Config("Invalid VAPID private key".to_string()))?;
    let signature: p256::ecdsa::Signature = signing_key.sign(signing_input.as_bytes());

    Ok(format!("{signing_input}.{}", encode_b64url(&signature.to_bytes())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::VerifyingKey;
    use p256::SecretKey;

    use super::*;

    /// Browser-side key material for decrypting in tests.
    struct Browser {
        secret: SecretKey,
        auth: [u8; AUTH_SECRET_LEN],
    }

    impl Browser {
        fn new() -> Self {
            let mut auth = [0u8; AUTH_SECRET_LEN];
            OsRng.fill_bytes(&mut auth);
            Self {
                secret: SecretKey::random(&mut OsRng),
                auth,
            }
        }

        fn keys(&self) -> PushKeys {
            PushKeys {
                p256dh: encode_b64url(self.secret.public_key().to_encoded_point(false).as_bytes()),
                auth: encode_b64url(&self.auth),
            }
        }

        /// RFC 8291 decryption of a single-record body.
        fn decrypt(&self, body: &[u8]) -> Vec<u8> {
            let salt = &body[..SALT_LEN];
            let id_len = body[SALT_LEN + 4] as usize;
            let key_start = SALT_LEN + 5;
            let sender_raw = &body[key_start..key_start + id_len];
            let ciphertext = &body[key_start + id_len..];

            let sender = p256::PublicKey::from_sec1_bytes(sender_raw).unwrap();
            let shared =
                p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), sender.as_affine());

            let own_raw = self.secret.public_key().to_encoded_point(false);
            let mut info = IKM_INFO_PREFIX.to_vec();
            info.extend_from_slice(own_raw.as_bytes());
            info.extend_from_slice(sender_raw);

            let ikm: [u8; 32] =
                hkdf_sha256(&self.auth, shared.raw_secret_bytes().as_slice(), &info).unwrap();
            let cek: [u8; 16] = hkdf_sha256(salt, &ikm, CEK_INFO).unwrap();
            let nonce: [u8; 12] = hkdf_sha256(salt, &ikm, NONCE_INFO).unwrap();

            let mut plain = Aes128Gcm::new_from_slice(&cek)
                .unwrap()
                .decrypt((&nonce).into(), ciphertext)
                .unwrap();
            assert_eq!(plain.pop(), Some(2), "final record delimiter");
            plain
        }
    }

    fn test_config() -> (WebPushConfig, SigningKey) {
        let signing = SigningKey::random(&mut OsRng);
        let public = VerifyingKey::from(&signing).to_encoded_point(false);
        let config = WebPushConfig::from_parts(
            encode_b64url(public.as_bytes()),
            &encode_b64url(&signing.to_bytes()),
            "mailto:ops@example.com".to_string(),
        )
        .unwrap();
        (config, signing)
    }

    #[test]
    fn browser_can_decrypt_payload() {
        let browser = Browser::new();
        let plaintext = br#"{"title":"New message from Ada"}"#;

        let body = encrypt_aes128gcm(plaintext, &browser.keys()).unwrap();

        assert_eq!(&body[SALT_LEN..SALT_LEN + 4], &RECORD_SIZE.to_be_bytes());
        assert_eq!(body[SALT_LEN + 4] as usize, PUBLIC_KEY_LEN);
        assert_eq!(browser.decrypt(&body), plaintext.to_vec());
    }

    #[test]
    fn each_encryption_uses_fresh_salt() {
        let browser = Browser::new();
        let a = encrypt_aes128gcm(b"x", &browser.keys()).unwrap();
        let b = encrypt_aes128gcm(b"x", &browser.keys()).unwrap();
        assert_ne!(&a[..SALT_LEN], &b[..SALT_LEN]);
    }

    #[test]
    fn vapid_jwt_verifies_with_public_key() {
        let (config, signing) = test_config();
        let jwt = build_vapid_jwt(
            "https://fcm.googleapis.com",
            &config.subject,
            &config.private_key,
            1_700_000_000,
        )
        .unwrap();

        let (signing_input, sig_b64) = jwt.rsplit_once('.').unwrap();
        let sig_bytes = URL_SAFE_NO_PAD.decode(sig_b64).unwrap();
        let signature = p256::ecdsa::Signature::from_slice(&sig_bytes).unwrap();
        VerifyingKey::from(&signing)
            .verify(signing_input.as_bytes(), &signature)
            .unwrap();

        let claims_b64 = signing_input.split('.').nth(1).unwrap();
        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(claims_b64).unwrap()).unwrap();
        assert_eq!(claims["aud"], "https://fcm.googleapis.com");
        assert_eq!(claims["sub"], "mailto:ops@example.com");
    }

    #[test]
    fn audience_keeps_scheme_host_and_port() {
        assert_eq!(
            push_service_audience("https://updates.push.services.mozilla.com/wpush/v2/abc").unwrap(),
            "https://updates.push.services.mozilla.com"
        );
        assert_eq!(
            push_service_audience("http://127.0.0.1:8080/push/1").unwrap(),
            "http://127.0.0.1:8080"
        );
        assert!(push_service_audience("not a url").is_err());
    }

    #[test]
    fn malformed_browser_keys_are_rejected() {
        let mut keys = Browser::new().keys();
        assert!(validate_keys(&keys).is_ok());

        keys.auth = encode_b64url(&[0u8; 8]);
        assert!(validate_keys(&keys).is_err());

        keys.p256dh = "***".to_string();
        assert!(validate_keys(&keys).is_err());
    }

    #[test]
    fn config_rejects_wrong_key_lengths() {
        let result = WebPushConfig::from_parts(
            encode_b64url(&[4u8; 10]),
            &encode_b64url(&[1u8; 32]),
            DEFAULT_SUBJECT.to_string(),
        );
        assert!(matches!(result, Err(DeliveryError::Config(_))));
    }

    #[test]
    fn push_message_carries_priority_and_links() {
        let payload = NotificationPayload {
            title: "New message from Ada".to_string(),
            body: "b".repeat(2000),
            contact_name: "Ada".to_string(),
            url: "https://app/x".to_string(),
            conversation_id: Some("conv-1".to_string()),
            contact_id: None,
            is_priority: true,
            sound: false,
        };
        let json = serde_json::to_value(PushMessage::new(&payload, 42)).unwrap();
        assert_eq!(json["requireInteraction"], true);
        assert_eq!(json["silent"], true);
        assert_eq!(json["tag"], "conversation-notification-42");
        assert_eq!(json["data"]["conversationId"], "conv-1");
        assert_eq!(json["icon"], ICON_PATH);
        assert_eq!(json["body"].as_str().unwrap().len(), MAX_BODY_CHARS);
    }

    fn payload_with_body(body: String) -> NotificationPayload {
        NotificationPayload {
            title: "New message from Ada".to_string(),
            body,
            contact_name: "Ada".to_string(),
            url: "https://app.example.com/v2/location/loc-1/conversations/conv-1".to_string(),
            conversation_id: Some("conv-1".to_string()),
            contact_id: Some("contact-1".to_string()),
            is_priority: false,
            sound: true,
        }
    }

    #[test]
    fn multibyte_body_fits_one_record() {
        let browser = Browser::new();
        let payload = payload_with_body("\u{1F600}".repeat(1500));

        let message = PushMessage::new(&payload, 42).into_bytes().unwrap();
        let body = encrypt_aes128gcm(&message, &browser.keys()).unwrap();

        assert!(
            body.len() <= RECORD_SIZE as usize,
            "encrypted body is {} bytes",
            body.len()
        );
        let json: serde_json::Value = serde_json::from_slice(&browser.decrypt(&body)).unwrap();
        let text = json["body"].as_str().unwrap();
        assert!(!text.is_empty());
        assert!(text.chars().all(|c| c == '\u{1F600}'));
        assert_eq!(json["data"]["conversationId"], "conv-1");
    }

    #[test]
    fn short_body_is_untouched() {
        let payload = payload_with_body("Call me back".to_string());
        let message = PushMessage::new(&payload, 42).into_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&message).unwrap();
        assert_eq!(json["body"], "Call me back");
    }

    #[test]
    fn oversized_plaintext_is_refused() {
        let browser = Browser::new();
        let plaintext = vec![b'a'; MAX_PLAINTEXT_LEN + 1];
        assert!(matches!(
            encrypt_aes128gcm(&plaintext, &browser.keys()),
            Err(DeliveryError::Build(_))
        ));
    }

    #[test]
    fn char_boundary_never_splits_a_code_point() {
        let s = "a\u{1F600}b";
        assert_eq!(floor_char_boundary(s, 3), 1);
        assert_eq!(floor_char_boundary(s, 5), 5);
        assert_eq!(floor_char_boundary(s, 99), s.len());
    }

    #[tokio::test]
    async fn wrong_destination_is_rejected() {
        let (config, _) = test_config();
        let sender = WebPushSender::new(config).unwrap();
        let payload = NotificationPayload {
            title: String::new(),
            body: String::new(),
            contact_name: String::new(),
            url: String::new(),
            conversation_id: None,
            contact_id: None,
            is_priority: false,
            sound: true,
        };
        let result = sender
            .send(&Destination::Email("a@b.c".to_string()), &payload)
            .await;
        assert!(matches!(result, Err(DeliveryError::WrongDestination(Channel::Push))));
    }
}
