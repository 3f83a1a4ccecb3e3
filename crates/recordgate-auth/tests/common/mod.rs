//! Shared fixtures: a mock identity provider and RSA signing material

#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// RSA keypair with everything needed to mint tokens and publish the key
pub struct TestKeyPair {
    pub kid: String,
    private_pem: String,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl TestKeyPair {
    /// Generate a fresh 2048-bit keypair under the given key id
    pub fn generate(kid: &str) -> Self {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).unwrap();
        let public = RsaPublicKey::from(&private);
        let private_pem = private.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();

        Self {
            kid: kid.to_string(),
            private_pem,
            modulus: public.n().to_bytes_be(),
            exponent: public.e().to_bytes_be(),
        }
    }

    /// Public half as a JWK document entry
    pub fn jwk(&self) -> Value {
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": self.kid,
            "n": URL_SAFE_NO_PAD.encode(&self.modulus),
            "e": URL_SAFE_NO_PAD.encode(&self.exponent),
        })
    }

    /// Base64url modulus, for telling keys apart
    pub fn modulus_b64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.modulus)
    }

    /// Sign claims as an RS256 token carrying this key's id
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid.clone());
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).unwrap();
        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }

    /// Same as [`sign`](Self::sign) but without a `kid` in the header
    pub fn sign_without_kid(&self, claims: &Value) -> String {
        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).unwrap();
        jsonwebtoken::encode(&header, claims, &key).unwrap()
    }
}

/// Seconds-since-epoch timestamp offset from now
pub fn unix_time_offset(seconds: i64) -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    now + seconds
}

/// Serve a key document at `/jwks.json`, expecting `expected_fetches` hits
pub async fn mount_jwks(server: &MockServer, keys: &[&TestKeyPair], expected_fetches: u64) {
    let body = json!({
        "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>(),
    });
    Mock::given(method("GET"))
        .and(path("/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

/// Key document URL for a mock server
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}/jwks.json", server.uri())
}
