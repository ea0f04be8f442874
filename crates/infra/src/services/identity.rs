use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use fintrack_auth::{
    Credentials, Entitlement, EntitlementPolicy, Hs256Jwt, JwtValidator, ProfilePatch,
    RegistrationDraft, TokenIssuer, User, derive_public_id, hash_password, verify_password,
};
use fintrack_core::{DomainError, UserId};

use super::{ServiceError, ServiceResult};
use crate::store::{StoreError, UserStore};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const PUBLIC_ID_ATTEMPTS: usize = 5;

/// A freshly authenticated user and the bearer token minted for them.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserStore>,
    issuer: Arc<dyn TokenIssuer>,
    validator: Arc<dyn JwtValidator>,
    policy: Arc<EntitlementPolicy>,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<Hs256Jwt>, policy: EntitlementPolicy) -> Self {
        Self {
            users,
            issuer: jwt.clone(),
            validator: jwt,
            policy: Arc::new(policy),
        }
    }

    #[instrument(skip(self, draft))]
    pub async fn register(&self, draft: RegistrationDraft) -> ServiceResult<Session> {
        let registration = draft.validate()?;

        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(email_taken());
        }

        let password = registration.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| ServiceError::internal(e.to_string()))?;

        let entitlements = self.policy.grants_for(&registration.email);

        for _ in 0..PUBLIC_ID_ATTEMPTS {
            let public_id = derive_public_id(&registration.email, &mut rand::thread_rng());
            let user = User::register(
                registration.clone(),
                password_hash.clone(),
                public_id,
                entitlements.clone(),
                Utc::now(),
            );

            match self.users.insert(user.clone()).await {
                Ok(()) => {
                    info!(user_id = %user.id, public_id = %user.public_id, "user registered");
                    return self.session_for(user);
                }
                Err(StoreError::Conflict(_)) => {
                    if self.users.find_by_email(&registration.email).await?.is_some() {
                        return Err(email_taken());
                    }
                    debug!("public id collision; regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::internal("could not allocate a unique public user id"))
    }

    #[instrument(skip(self, credentials))]
    pub async fn login(&self, credentials: Credentials) -> ServiceResult<Session> {
        let (email, password) = credentials.validate()?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| DomainError::unauthenticated(INVALID_CREDENTIALS))?;

        if !user.is_active {
            return Err(DomainError::unauthenticated("Account is inactive").into());
        }

        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| ServiceError::internal(format!("password check task failed: {e}")))?
            .map_err(|e| ServiceError::internal(e.to_string()))?;

        if !matches {
            debug!(user_id = %user.id, "password mismatch");
            return Err(DomainError::unauthenticated(INVALID_CREDENTIALS).into());
        }

        self.session_for(user)
    }

    /// Resolve a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<User> {
        let claims = self.validator.validate(token, Utc::now()).map_err(|e| {
            debug!(error = %e, "token rejected");
            DomainError::unauthenticated("Invalid or expired token")
        })?;

        match self.users.get(claims.sub).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(DomainError::unauthenticated("User not found or inactive").into()),
        }
    }

    pub async fn profile(&self, user_id: UserId) -> ServiceResult<User> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User").into())
    }

    #[instrument(skip(self, patch), fields(user_id = %user_id))]
    pub async fn update_profile(&self, user_id: UserId, patch: ProfilePatch) -> ServiceResult<User> {
        let mut user = self.profile(user_id).await?;
        user.apply_profile(patch, Utc::now());
        self.users.update(&user).await?;
        Ok(user)
    }

    pub fn has_interest_access(&self, user: &User) -> bool {
        user.has_entitlement(Entitlement::InterestSection)
    }

    fn session_for(&self, user: User) -> ServiceResult<Session> {
        let token = self
            .issuer
            .issue(user.id, Utc::now())
            .map_err(|e| ServiceError::internal(format!("failed to sign token: {e}")))?;
        Ok(Session { token, user })
    }
}

fn email_taken() -> ServiceError {
    DomainError::conflict("User with this email already exists").into()
}
