use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::Digest;
use snafu::Snafu;

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum RandomSourceError {
    #[snafu(display("RandomSourceError: No secure random source available: {message}"))]
    Unavailable { message: String },
}

/// Source of cryptographically secure random bytes.
///
/// Implementations must never fall back to a weaker generator. If no secure source exists, fail.
pub trait SecureRandomSource {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), RandomSourceError>;
}

/// The operating system's (or browser's) secure random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl SecureRandomSource for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<(), RandomSourceError> {
        use rand::TryRngCore;

        rand::rngs::OsRng.try_fill_bytes(dest).map_err(|err| {
            tracing::error!(?err, "Secure random source failed.");
            UnavailableSnafu {
                message: err.to_string(),
            }
            .build()
        })
    }
}

pub(crate) fn random_bytes<const N: usize>(
    random: &impl SecureRandomSource,
) -> Result<[u8; N], RandomSourceError> {
    let mut bytes = [0u8; N];
    random.fill_bytes(&mut bytes)?;
    Ok(bytes)
}

pub fn sha256(bytes: impl AsRef<[u8]>) -> [u8; 32] {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes.as_ref());
    hasher.finalize().into()
}

/// Standard base64 alphabet with `+` -> `-`, `/` -> `_` and no trailing `=` padding.
pub fn base64_url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Lenient inverse of [`base64_url_encode`]. Accepts input with or without padding.
pub fn base64_url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertr::prelude::*;

    struct BrokenRandom;

    impl SecureRandomSource for BrokenRandom {
        fn fill_bytes(&self, _dest: &mut [u8]) -> Result<(), RandomSourceError> {
            UnavailableSnafu {
                message: "no entropy",
            }
            .fail()
        }
    }

    #[test]
    fn os_random_fills_buffer() {
        let bytes = random_bytes::<32>(&OsRandom).unwrap();
        assert_that(bytes.iter().any(|b| *b != 0)).is_true();
    }

    #[test]
    fn broken_random_source_fails_loudly() {
        let result = random_bytes::<16>(&BrokenRandom);
        assert_that(result.is_err()).is_true();
    }

    #[test]
    fn sha256_of_known_input() {
        // RFC 7636 Appendix B.
        let challenge = base64_url_encode(sha256("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"));
        assert_that(challenge.as_str()).is_equal_to("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn encoding_is_url_safe_and_unpadded() {
        // 0xfb 0xff produce '+' and '/' in the standard alphabet.
        let encoded = base64_url_encode([0xfb, 0xff, 0xfe]);
        assert_that(encoded.as_str()).is_equal_to("-__-");

        let encoded = base64_url_encode([1u8]);
        assert_that(encoded.as_str()).is_equal_to("AQ");
    }

    #[test]
    fn decoding_accepts_padded_input() {
        assert_that(base64_url_decode("AQ==").unwrap()).is_equal_to(vec![1u8]);
        assert_that(base64_url_decode("AQ").unwrap()).is_equal_to(vec![1u8]);
    }
}
