// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::{Caller, Claims},
};

/// Valida um Bearer token HS256 e devolve o chamador.
/// Os tokens são emitidos pelo serviço de identidade com o mesmo segredo.
pub fn decode_caller(token: &str, secret: &str) -> Result<Caller, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            tracing::debug!("Token rejeitado: {:?}", e);
            AppError::InvalidToken
        })?;
    Ok(token_data.claims.into())
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Caller);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Já extraído antes nesta requisição (ex: pelo guardião de tipo de tenant)
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);
        let reject = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| reject(AppError::InvalidToken))?;

        let caller = decode_caller(bearer.token(), &app_state.jwt_secret).map_err(reject)?;

        let user = AuthenticatedUser(caller);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenancy::TenantType;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token(secret: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role: "admin".into(),
            tenant_type: TenantType::Company,
            exp: (now + exp_offset) as usize,
            iat: now as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn valid_token_yields_the_caller() {
        let caller = decode_caller(&token("segredo", 3600), "segredo").unwrap();
        assert_eq!(caller.tenant_type, TenantType::Company);
        assert_eq!(caller.company_scope(), Some(caller.tenant_id));
    }

    #[test]
    fn wrong_secret_and_expired_tokens_are_rejected() {
        assert!(matches!(decode_caller(&token("outro", 3600), "segredo"), Err(AppError::InvalidToken)));
        assert!(matches!(decode_caller(&token("segredo", -3600), "segredo"), Err(AppError::InvalidToken)));
        assert!(matches!(decode_caller("lixo", "segredo"), Err(AppError::InvalidToken)));
    }
}
