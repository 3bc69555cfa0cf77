//! Authenticated user as seen by checkout

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: Uuid::now_v7(), name: name.into(), email: None, phone: None, is_admin: false }
    }

    /// Email and phone, when both are on file and non-blank.
    pub fn contact(&self) -> Option<(&str, &str)> {
        let email = self.email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let phone = self.phone.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some((email, phone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_contact_requires_both() {
        let mut u = User::new("Sara");
        assert!(u.contact().is_none());
        u.email = Some("sara@example.com".into());
        assert!(u.contact().is_none());
        u.phone = Some("  ".into());
        assert!(u.contact().is_none());
        u.phone = Some("09120000000".into());
        assert_eq!(u.contact(), Some(("sara@example.com", "09120000000")));
    }
}
