//! User identity record and the inputs that create or change it.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use fintrack_core::{DomainResult, Entity, UserId, Violations, validate};

use crate::entitlements::Entitlement;

pub const PASSWORD_MIN_CHARS: usize = 6;

/// A registered account.
///
/// `public_id` is the human-shareable handle (`<email-local>_<8 hex>`), fixed
/// at registration. The credential hash never leaves this struct through any
/// serialised view; see [`UserProfile`].
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub public_id: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub photo_url: String,
    pub is_active: bool,
    pub entitlements: BTreeSet<Entitlement>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("public_id", &self.public_id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("entitlements", &self.entitlements)
            .finish_non_exhaustive()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl User {
    pub fn register(
        registration: Registration,
        password_hash: String,
        public_id: String,
        entitlements: BTreeSet<Entitlement>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::new(),
            public_id,
            email: registration.email,
            password_hash,
            display_name: registration.display_name,
            photo_url: String::new(),
            is_active: true,
            entitlements,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_entitlement(&self, entitlement: Entitlement) -> bool {
        self.entitlements.contains(&entitlement)
    }

    pub fn apply_profile(&mut self, patch: ProfilePatch, now: DateTime<Utc>) {
        if let Some(display_name) = patch.display_name {
            self.display_name = display_name;
        }
        if let Some(photo_url) = patch.photo_url {
            self.photo_url = photo_url;
        }
        self.updated_at = now;
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            user_id: self.public_id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            member_since: self.created_at,
        }
    }
}

/// Derive a public handle from the local part of `email` plus 4 random bytes.
pub fn derive_public_id(email: &str, rng: &mut impl Rng) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let suffix: [u8; 4] = rng.r#gen();
    format!("{local}_{}", hex::encode(suffix))
}

/// The outward-facing view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub user_id: String,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub member_since: DateTime<Utc>,
}

/// Unvalidated sign-up input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub email: Option<String>,
    pub password: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Trimmed and lowercased.
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl RegistrationDraft {
    pub fn validate(self) -> DomainResult<Registration> {
        let mut v = Violations::new();

        let email = normalize_email(self.email.as_deref());
        if email.is_empty() {
            v.push("email", "Email is required");
        } else {
            v.check(validate::is_valid_email(&email), "email", "Invalid email format");
        }

        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            v.push("password", "Password is required");
        } else {
            v.check(
                password.chars().count() >= PASSWORD_MIN_CHARS,
                "password",
                "Password must be at least 6 characters",
            );
        }

        v.into_result()?;

        Ok(Registration {
            email,
            password,
            display_name: self.display_name.map(|d| d.trim().to_string()).unwrap_or_default(),
        })
    }
}

/// Login input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

const CREDENTIALS_REQUIRED: &str = "Email and password are required";

impl Credentials {
    /// Both fields must be present; returns `(normalised email, password)`.
    pub fn validate(self) -> DomainResult<(String, String)> {
        let email = normalize_email(self.email.as_deref());
        let password = self.password.unwrap_or_default();

        let mut v = Violations::new();
        v.check(!email.is_empty(), "email", CREDENTIALS_REQUIRED);
        v.check(!password.is_empty(), "password", CREDENTIALS_REQUIRED);
        v.into_result()?;

        Ok((email, password))
    }
}

/// Profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

fn normalize_email(email: Option<&str>) -> String {
    email.map(|e| e.trim().to_lowercase()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fintrack_core::DomainError;
    use rand::{SeedableRng, rngs::StdRng};

    fn registration(email: &str) -> Registration {
        RegistrationDraft {
            email: Some(email.to_string()),
            password: Some("secret1".to_string()),
            display_name: Some(" Ada ".to_string()),
        }
        .validate()
        .unwrap()
    }

    fn fields(err: DomainError) -> Vec<&'static str> {
        match err {
            DomainError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn public_id_uses_local_part_and_eight_hex_chars() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = derive_public_id("ada.lovelace@example.com", &mut rng);

        let (local, suffix) = id.rsplit_once('_').unwrap();
        assert_eq!(local, "ada.lovelace");
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn registration_normalises_email_and_display_name() {
        let reg = registration("  Ada@Example.COM ");
        assert_eq!(reg.email, "ada@example.com");
        assert_eq!(reg.display_name, "Ada");
    }

    #[test]
    fn registration_rejects_bad_email_and_short_password() {
        let err = RegistrationDraft {
            email: Some("nope".to_string()),
            password: Some("12345".to_string()),
            display_name: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(err), vec!["email", "password"]);
    }

    #[test]
    fn credentials_require_both_fields() {
        let missing_password = Credentials {
            email: Some("a@b.co".to_string()),
            password: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(fields(missing_password), vec!["password"]);

        let missing_both = Credentials::default().validate().unwrap_err();
        assert_eq!(fields(missing_both), vec!["email", "password"]);

        let (email, _) = Credentials {
            email: Some("A@B.co".to_string()),
            password: Some("pw".to_string()),
        }
        .validate()
        .unwrap();
        assert_eq!(email, "a@b.co");
    }

    #[test]
    fn profile_view_hides_the_hash_and_renames_fields() {
        let user = User::register(
            registration("ada@example.com"),
            "$argon2id$secret".to_string(),
            "ada_0badf00d".to_string(),
            BTreeSet::new(),
            Utc::now(),
        );

        let value = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(value["userId"], "ada_0badf00d");
        assert!(value.get("photoURL").is_some());
        assert!(value.get("memberSince").is_some());
        assert!(!value.to_string().contains("argon2"));
        assert!(!format!("{user:?}").contains("argon2"));
    }

    #[test]
    fn profile_patch_touches_present_fields_only() {
        let mut user = User::register(
            registration("ada@example.com"),
            String::new(),
            "ada_00000000".to_string(),
            BTreeSet::new(),
            Utc::now(),
        );
        user.apply_profile(
            ProfilePatch {
                display_name: None,
                photo_url: Some("https://img".to_string()),
            },
            Utc::now(),
        );
        assert_eq!(user.display_name, "Ada");
        assert_eq!(user.photo_url, "https://img");
    }
}
