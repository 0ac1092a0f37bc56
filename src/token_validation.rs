use crate::token_claims::{EntraIdTokenClaims, UserIdentity};
use snafu::{ResultExt, Snafu, ensure};

#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum JwtValidationError {
    #[snafu(display(
        "JwtValidationError: Could not decode JWT header. Input may have the wrong format"
    ))]
    DecodeHeader { source: jsonwebtoken::errors::Error },

    #[snafu(display(
        "JwtValidationError: Could not find a JWK which would match the tokens 'kid': {token_kid:?}"
    ))]
    NoMatchingJwk { token_kid: Option<String> },

    #[snafu(display(
        "JwtValidationError: Token is signed with {token_alg:?}, but the matching JWK is declared for {key_alg}"
    ))]
    AlgorithmMismatch {
        token_alg: jsonwebtoken::Algorithm,
        key_alg: String,
    },

    #[snafu(display("JwtValidationError: Could not construct DecodingKey from JWK"))]
    JwkToDecodingKey { source: jsonwebtoken::errors::Error },

    #[snafu(display("JwtValidationError: Could not decode JWT: {source}"))]
    Decode { source: jsonwebtoken::errors::Error },
}

/// Verify signature, expiry and, when given, audience and issuer of an identity token.
///
/// Opt-in counterpart of [`crate::token_claims::decode_identity`]. Entra signs with the keys
/// served at [`crate::config::EntraAuthOptions::jwks_endpoint`], which can be fetched with
/// [`crate::request::retrieve_jwk_set`].
pub fn validate(
    id_token: &str,
    jwk_set: &jsonwebtoken::jwk::JwkSet,
    expected_audiences: Option<&[String]>,
    expected_issuers: Option<&[String]>,
) -> Result<UserIdentity, JwtValidationError> {
    validate_claims(id_token, jwk_set, expected_audiences, expected_issuers)
        .map(UserIdentity::from)
}

pub fn validate_claims(
    id_token: &str,
    jwk_set: &jsonwebtoken::jwk::JwkSet,
    expected_audiences: Option<&[String]>,
    expected_issuers: Option<&[String]>,
) -> Result<EntraIdTokenClaims, JwtValidationError> {
    let jwt_header = jsonwebtoken::decode_header(id_token).context(DecodeHeaderSnafu {})?;

    tracing::trace!(?jwt_header, "Decoded JWT header");

    let jwk = jwk_set
        .keys
        .iter()
        .find(|it| it.common.key_id == jwt_header.kid)
        .ok_or_else(|| {
            NoMatchingJwkSnafu {
                token_kid: jwt_header.kid.clone(),
            }
            .build()
        })?;

    // A key declaring its algorithm is only ever verified with that algorithm.
    if let Some(key_alg) = jwk.common.key_algorithm {
        let pinned = key_alg.to_string().parse::<jsonwebtoken::Algorithm>().ok();
        ensure!(
            pinned == Some(jwt_header.alg),
            AlgorithmMismatchSnafu {
                token_alg: jwt_header.alg,
                key_alg: key_alg.to_string(),
            }
        );
    }

    let mut validation = jsonwebtoken::Validation::new(jwt_header.alg);
    match expected_audiences {
        Some(expected_audiences) => validation.set_audience(expected_audiences),
        None => validation.validate_aud = false,
    }
    if let Some(expected_issuers) = expected_issuers {
        validation.set_issuer(expected_issuers);
    }

    let decoding_key =
        jsonwebtoken::DecodingKey::from_jwk(jwk).context(JwkToDecodingKeySnafu {})?;

    let token_data =
        jsonwebtoken::decode::<EntraIdTokenClaims>(id_token, &decoding_key, &validation)
            .context(DecodeSnafu {})?;

    tracing::trace!("Identity token signature verified.");

    Ok(token_data.claims)
}
