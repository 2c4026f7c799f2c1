//! Request-scoped token holder.

use super::Token;

/// Holds the token of the request being processed.
///
/// One instance per in-flight request; never shared.
#[derive(Debug, Default, Clone)]
pub struct TokenStorage {
    token: Option<Token>,
}

impl TokenStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage already holding `token`, e.g. restored from a session.
    pub fn with_token(token: Token) -> Self {
        Self { token: Some(token) }
    }

    /// The current token.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// The current token, mutably.
    pub fn token_mut(&mut self) -> Option<&mut Token> {
        self.token.as_mut()
    }

    /// Replaces the current token.
    pub fn set_token(&mut self, token: Option<Token>) {
        self.token = token;
    }

    /// Removes and returns the current token.
    pub fn take(&mut self) -> Option<Token> {
        self.token.take()
    }

    /// Removes the current token.
    pub fn clear(&mut self) {
        self.token = None;
    }

    /// Whether an authenticated token is stored.
    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().is_some_and(Token::is_authenticated)
    }
}
