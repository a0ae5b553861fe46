/// Storage key holding the bearer token.
pub const AUTH_TOKEN: &str = "authToken";

/// Storage key holding the auth bypass flag. Only the literal `"true"` enables it.
pub const BYPASS_AUTH: &str = "bypassAuth";

/// The keys the client reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    AuthToken,
    BypassAuth,
}

impl SessionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthToken => AUTH_TOKEN,
            Self::BypassAuth => BYPASS_AUTH,
        }
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
