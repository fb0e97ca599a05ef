use base64::{Engine, engine::general_purpose::STANDARD};

/// Credentials for a remote calendar account
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Credentials::Basic { username, .. } => username,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Credentials::Basic { password, .. } => password,
        }
    }

    /// Generate the Authorization header value
    pub fn auth_header(&self) -> String {
        match self {
            Credentials::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{}:{}", username, password).as_bytes());
                format!("Basic {}", encoded)
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<hidden>")
                .finish(),
        }
    }
}
