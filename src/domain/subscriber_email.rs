use crate::domain::ValidationError;
use validator::validate_email;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, ValidationError> {
        if email.trim().is_empty() {
            return Err(ValidationError::new("email", "cannot be empty"));
        }
        match validate_email(&email) {
            true => Ok(Self(email)),
            false => Err(ValidationError::new(
                "email",
                format!("{} is not a valid email address", email),
            )),
        }
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SubscriberEmail> for String {
    fn from(email: SubscriberEmail) -> Self {
        email.0
    }
}
