use fintrack_auth::User;
use fintrack_core::UserId;

/// The authenticated account behind a request.
///
/// Inserted by the auth middleware; every protected handler reads it as an
/// `Extension`. Records are always scoped by this user's id.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.0.id
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}
