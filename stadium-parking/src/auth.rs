use log::info;

/// Who is logged in. The page owns one of these and hands it to anything that talks to the
/// backend, instead of everyone reading tokens out of ambient storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthContext {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl AuthContext {
    pub fn new() -> AuthContext {
        AuthContext::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn login(&mut self, access_token: String, refresh_token: Option<String>) {
        info!("Logged in");
        self.access_token = Some(access_token).filter(|t| !t.is_empty());
        self.refresh_token = refresh_token.filter(|t| !t.is_empty());
    }

    pub fn logout(&mut self) {
        if self.is_authenticated() {
            info!("Logged out");
        }
        self.access_token = None;
        self.refresh_token = None;
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// The value of the Authorization header, if logged in
    pub fn authorization_header(&self) -> Option<String> {
        let token = self.access_token.as_ref()?;
        Some(format!("Bearer {token}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_logout() {
        let mut auth = AuthContext::new();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.authorization_header(), None);

        auth.login("abc".to_string(), Some("def".to_string()));
        assert!(auth.is_authenticated());
        assert_eq!(auth.authorization_header().as_deref(), Some("Bearer abc"));
        assert_eq!(auth.refresh_token(), Some("def"));

        auth.logout();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.refresh_token(), None);
    }

    #[test]
    fn test_empty_token_is_not_a_login() {
        let mut auth = AuthContext::new();
        auth.login(String::new(), None);
        assert!(!auth.is_authenticated());
    }
}
