//! `ds.crypto` — digests, HMACs, and symmetric encryption.
//!
//! Primitives come from the RustCrypto crates and are treated as black
//! boxes over bytes. `encrypt`/`decrypt` use AES-256-GCM with a
//! SHA-256-derived key; the random 96-bit nonce is prepended to the
//! ciphertext and the whole payload travels base64-encoded.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use md5::{Digest as Md5Digest, Md5};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::error::{Error, Result};
use crate::value::{Function, Value};

use super::binaries::hex_encode;
use super::{as_str, expect_arity};

pub(crate) fn entries() -> Vec<Function> {
    vec![
        Function::native("hash", &["value", "algorithm"], |_, args| {
            expect_arity("hash", args, 2)?;
            let value = as_str(&args[0])?;
            let algorithm = as_str(&args[1])?;
            let digest = match algorithm.as_ref() {
                "MD5" => Md5::digest(value.as_bytes()).to_vec(),
                "SHA-1" => Sha1::digest(value.as_bytes()).to_vec(),
                "SHA-256" => Sha256::digest(value.as_bytes()).to_vec(),
                "SHA-384" => Sha384::digest(value.as_bytes()).to_vec(),
                "SHA-512" => Sha512::digest(value.as_bytes()).to_vec(),
                other => {
                    return Err(Error::Domain(format!("Unknown hash algorithm: {other}")))
                }
            };
            Ok(Value::string(hex_encode(&digest).to_lowercase()))
        }),
        Function::native("hmac", &["value", "secret", "algorithm"], |_, args| {
            expect_arity("hmac", args, 3)?;
            let value = as_str(&args[0])?;
            let secret = as_str(&args[1])?;
            let algorithm = as_str(&args[2])?;
            let tag = match algorithm.as_ref() {
                "HmacSHA1" => {
                    let mut mac: HmacSha1 = Mac::new_from_slice(secret.as_bytes())
                        .map_err(|_| Error::Domain("Invalid HMAC key".to_string()))?;
                    mac.update(value.as_bytes());
                    mac.finalize().into_bytes().to_vec()
                }
                "HmacSHA256" => {
                    let mut mac: HmacSha256 = Mac::new_from_slice(secret.as_bytes())
                        .map_err(|_| Error::Domain("Invalid HMAC key".to_string()))?;
                    mac.update(value.as_bytes());
                    mac.finalize().into_bytes().to_vec()
                }
                "HmacSHA512" => {
                    let mut mac: HmacSha512 = Mac::new_from_slice(secret.as_bytes())
                        .map_err(|_| Error::Domain("Invalid HMAC key".to_string()))?;
                    mac.update(value.as_bytes());
                    mac.finalize().into_bytes().to_vec()
                }
                other => {
                    return Err(Error::Domain(format!("Unknown HMAC algorithm: {other}")))
                }
            };
            Ok(Value::string(hex_encode(&tag).to_lowercase()))
        }),
        Function::native("encrypt", &["value", "password"], |_, args| {
            expect_arity("encrypt", args, 2)?;
            let value = as_str(&args[0])?;
            let password = as_str(&args[1])?;
            let cipher = cipher_for(&password)?;
            let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
            let ciphertext = cipher
                .encrypt(&nonce, value.as_bytes())
                .map_err(|_| Error::Domain("Encryption failed".to_string()))?;
            let mut payload = nonce.to_vec();
            payload.extend_from_slice(&ciphertext);
            Ok(Value::string(STANDARD.encode(payload)))
        }),
        Function::native("decrypt", &["value", "password"], |_, args| {
            expect_arity("decrypt", args, 2)?;
            let value = as_str(&args[0])?;
            let password = as_str(&args[1])?;
            let payload = STANDARD
                .decode(value.as_ref())
                .map_err(|e| Error::Domain(format!("Could not decode base64: {e}")))?;
            if payload.len() < 12 {
                return Err(Error::Domain("Ciphertext too short".to_string()));
            }
            let (nonce, ciphertext) = payload.split_at(12);
            let cipher = cipher_for(&password)?;
            let plain = cipher
                .decrypt(Nonce::from_slice(nonce), ciphertext)
                .map_err(|_| Error::Domain("Failed to decrypt value".to_string()))?;
            String::from_utf8(plain)
                .map(Value::string)
                .map_err(|e| Error::Domain(format!("Decrypted value is not UTF-8: {e}")))
        }),
    ]
}

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

fn cipher_for(password: &str) -> Result<Aes256Gcm> {
    let key = Sha256::digest(password.as_bytes());
    Aes256Gcm::new_from_slice(&key)
        .map_err(|_| Error::Domain("Invalid encryption key".to_string()))
}
