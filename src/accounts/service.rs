//! Account workflows: register, login, profile and password changes.
//!
//! Flow Overview:
//! 1) Validate input shape.
//! 2) Enforce uniqueness and ownership against the repository.
//! 3) Hash or verify passwords on the blocking pool.
//! 4) Issue a session token where the workflow hands one back.

use chrono::Utc;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;
use tokio::task;
use tracing::{debug, info, instrument};

use super::{
    models::{
        ChangePassword, LoginOutcome, LoginUser, NewUser, RegisterUser, UpdateUser, User,
        UserResponse,
    },
    repo::{RepositoryError, UserRepository},
};
use crate::credentials::{
    AuthConfig, CredentialError, PasswordHasher, TokenCodec, TokenError,
};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("email already exists")]
    DuplicateIdentity,
    #[error("user not found")]
    IdentityNotFound,
    #[error("password does not match")]
    CredentialMismatch,
    #[error("email does not match the logged-in account")]
    OwnershipViolation,
    #[error("{0}")]
    InvalidInput(&'static str),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("repository error: {0}")]
    Repository(#[source] RepositoryError),
    #[error("worker task failed: {0}")]
    Worker(#[from] task::JoinError),
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::IdentityNotFound,
            RepositoryError::Duplicate => Self::DuplicateIdentity,
            other @ RepositoryError::Database(_) => Self::Repository(other),
        }
    }
}

pub struct AccountService {
    repo: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
    tokens: TokenCodec,
}

impl AccountService {
    /// Build the service from startup configuration.
    ///
    /// # Errors
    /// Returns an error if the configured hash cost is rejected by Argon2.
    pub fn new(repo: Arc<dyn UserRepository>, config: &AuthConfig) -> Result<Self, AccountError> {
        let hasher = PasswordHasher::new(config.hash_cost())?;
        let tokens = TokenCodec::new(config.token_secret(), config.token_ttl_seconds());

        Ok(Self {
            repo,
            hasher,
            tokens,
        })
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Create an account.
    ///
    /// # Errors
    /// [`AccountError::DuplicateIdentity`] if the email is taken,
    /// [`AccountError::InvalidInput`] for malformed fields.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterUser) -> Result<UserResponse, AccountError> {
        validate_name(&input.name)?;
        validate_email(&input.email)?;
        validate_password(&input.password)?;

        match self.repo.find_by_email(&input.email).await {
            Ok(_) => return Err(AccountError::DuplicateIdentity),
            Err(RepositoryError::NotFound) => {}
            Err(err) => return Err(err.into()),
        }

        let password_hash = self.hash(input.password).await?;

        // The unique index still catches a concurrent registration that won the race.
        let user = self
            .repo
            .create(NewUser {
                name: input.name,
                email: input.email,
                password_hash,
            })
            .await?;

        info!(user_id = user.id, "account registered");

        Ok(user.to_response())
    }

    /// Check credentials and issue a session token.
    ///
    /// # Errors
    /// [`AccountError::IdentityNotFound`] for an unknown email,
    /// [`AccountError::CredentialMismatch`] for a wrong password.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginUser) -> Result<LoginOutcome, AccountError> {
        let user = match self.repo.find_by_email(&input.email).await {
            Ok(user) => user,
            Err(RepositoryError::NotFound) => {
                // Spend the same work as a real verify before reporting the miss.
                let hasher = self.hasher.clone();
                let password = input.password;
                run_blocking(move || hasher.verify_dummy(&password)).await?;
                debug!("login for unknown email");
                return Err(AccountError::IdentityNotFound);
            }
            Err(err) => return Err(err.into()),
        };

        if !self.verify(input.password, &user.password_hash).await? {
            debug!(user_id = user.id, "login with wrong password");
            return Err(AccountError::CredentialMismatch);
        }

        let token = self.tokens.issue(&user.email)?;

        Ok(LoginOutcome {
            user: user.to_response(),
            token,
        })
    }

    /// Tokens are stateless, so there is nothing to revoke server-side.
    pub fn logout(&self, principal_email: Option<&str>) {
        debug!(email = principal_email.unwrap_or("anonymous"), "logout");
    }

    /// Change name and email of the logged-in account and re-issue its token.
    ///
    /// # Errors
    /// [`AccountError::OwnershipViolation`] unless `current_email` is the
    /// caller's own email; [`AccountError::DuplicateIdentity`] if the new email
    /// belongs to another account.
    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        principal_email: &str,
        input: UpdateUser,
    ) -> Result<LoginOutcome, AccountError> {
        if principal_email != input.current_email {
            return Err(AccountError::OwnershipViolation);
        }
        validate_name(&input.name)?;
        validate_email(&input.email)?;

        let mut user = self.repo.find_by_email(&input.current_email).await?;

        if input.email != user.email {
            match self.repo.find_by_email(&input.email).await {
                Ok(_) => return Err(AccountError::DuplicateIdentity),
                Err(RepositoryError::NotFound) => {}
                Err(err) => return Err(err.into()),
            }
        }

        user.name = input.name;
        user.email = input.email;
        user.updated_at = Utc::now();

        let user = self.repo.update(&user).await?;
        let token = self.tokens.issue(&user.email)?;

        info!(user_id = user.id, "profile updated");

        Ok(LoginOutcome {
            user: user.to_response(),
            token,
        })
    }

    /// Replace the password of the logged-in account.
    ///
    /// Existing tokens stay valid and no new token is issued.
    ///
    /// # Errors
    /// [`AccountError::CredentialMismatch`] if `current_password` is wrong; the
    /// stored hash is left untouched in that case.
    #[instrument(skip(self, input))]
    pub async fn change_password(
        &self,
        principal_email: &str,
        input: ChangePassword,
    ) -> Result<UserResponse, AccountError> {
        validate_password(&input.new_password)?;

        let mut user = self.repo.find_by_email(principal_email).await?;

        if !self
            .verify(input.current_password, &user.password_hash)
            .await?
        {
            return Err(AccountError::CredentialMismatch);
        }

        user.password_hash = self.hash(input.new_password).await?;
        user.updated_at = Utc::now();

        let user = self.repo.update(&user).await?;

        info!(user_id = user.id, "password changed");

        Ok(user.to_response())
    }

    /// # Errors
    /// Propagates repository failures.
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, AccountError> {
        let users = self.repo.list().await?;
        Ok(users.iter().map(User::to_response).collect())
    }

    /// # Errors
    /// [`AccountError::IdentityNotFound`] if no row has this id.
    pub async fn get_user(&self, id: i64) -> Result<UserResponse, AccountError> {
        Ok(self.repo.find_by_id(id).await?.to_response())
    }

    /// # Errors
    /// [`AccountError::IdentityNotFound`] if no row has this id.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<(), AccountError> {
        self.repo.delete(id).await?;
        info!(user_id = id, "account deleted");
        Ok(())
    }

    /// # Errors
    /// Returns the repository error if storage is unreachable.
    pub async fn health(&self) -> Result<(), RepositoryError> {
        self.repo.ping().await
    }

    async fn hash(&self, password: SecretString) -> Result<String, AccountError> {
        let hasher = self.hasher.clone();
        run_blocking(move || hasher.hash(&password)).await
    }

    async fn verify(&self, password: SecretString, hash: &str) -> Result<bool, AccountError> {
        let hasher = self.hasher.clone();
        let hash = hash.to_string();
        run_blocking(move || hasher.verify(&password, &hash)).await
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, AccountError>
where
    F: FnOnce() -> Result<T, CredentialError> + Send + 'static,
    T: Send + 'static,
{
    Ok(task::spawn_blocking(f).await??)
}

fn validate_name(name: &str) -> Result<(), AccountError> {
    if name.trim().is_empty() {
        return Err(AccountError::InvalidInput("name must not be empty"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AccountError> {
    if valid_email(email) {
        Ok(())
    } else {
        Err(AccountError::InvalidInput("invalid email"))
    }
}

fn validate_password(password: &SecretString) -> Result<(), AccountError> {
    if password.expose_secret().is_empty() {
        return Err(AccountError::InvalidInput("password must not be empty"));
    }
    Ok(())
}

#[must_use]
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{accounts::memory::MemoryUserRepository, credentials::HashCost};

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn service() -> (AccountService, Arc<MemoryUserRepository>) {
        let repo = Arc::new(MemoryUserRepository::new());
        let config = AuthConfig::new(secret("0123456789abcdef0123456789abcdef"))
            .with_hash_cost(HashCost::new(1024, 1, 1));
        let service = AccountService::new(repo.clone(), &config).unwrap();
        (service, repo)
    }

    fn register_input(name: &str, email: &str, password: &str) -> RegisterUser {
        RegisterUser {
            name: name.to_string(),
            email: email.to_string(),
            password: secret(password),
        }
    }

    fn login_input(email: &str, password: &str) -> LoginUser {
        LoginUser {
            email: email.to_string(),
            password: secret(password),
        }
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("a@x.com"));
        assert!(valid_email("first.last+tag@sub.example.org"));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("ax.com"));
        assert!(!valid_email("a @x.com"));
        assert!(!valid_email(""));
    }

    #[tokio::test]
    async fn register_stores_hash_not_plaintext() {
        let (service, repo) = service();
        let user = service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();
        assert_eq!(user.email, "a@x.com");

        let stored = repo.find_by_email("a@x.com").await.unwrap();
        assert_ne!(stored.password_hash, "secret");
        assert!(stored.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn duplicate_register_keeps_first_record() {
        let (service, repo) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();
        let before = repo.find_by_email("a@x.com").await.unwrap();

        let result = service
            .register(register_input("B", "a@x.com", "other"))
            .await;
        assert!(matches!(result, Err(AccountError::DuplicateIdentity)));

        let after = repo.find_by_email("a@x.com").await.unwrap();
        assert_eq!(after.name, "A");
        assert_eq!(after.password_hash, before.password_hash);
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let (service, _) = service();
        for input in [
            register_input("  ", "a@x.com", "secret"),
            register_input("A", "not-an-email", "secret"),
            register_input("A", "a@x.com", ""),
        ] {
            assert!(matches!(
                service.register(input).await,
                Err(AccountError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn login_issues_token_for_email() {
        let (service, _) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();

        let outcome = service.login(login_input("a@x.com", "secret")).await.unwrap();
        assert_eq!(outcome.user.email, "a@x.com");
        assert_eq!(service.tokens().validate(&outcome.token).unwrap(), "a@x.com");
    }

    #[tokio::test]
    async fn login_failures_are_typed() {
        let (service, _) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();

        assert!(matches!(
            service.login(login_input("a@x.com", "wrong")).await,
            Err(AccountError::CredentialMismatch)
        ));
        assert!(matches!(
            service.login(login_input("b@x.com", "secret")).await,
            Err(AccountError::IdentityNotFound)
        ));
    }

    #[tokio::test]
    async fn update_profile_requires_ownership() {
        let (service, _) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();

        let result = service
            .update_profile(
                "a@x.com",
                UpdateUser {
                    name: "B".to_string(),
                    email: "b@x.com".to_string(),
                    current_email: "someone@x.com".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::OwnershipViolation)));
    }

    #[tokio::test]
    async fn update_profile_reissues_token_for_new_email() {
        let (service, repo) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();

        let outcome = service
            .update_profile(
                "a@x.com",
                UpdateUser {
                    name: "Alice".to_string(),
                    email: "alice@x.com".to_string(),
                    current_email: "a@x.com".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(outcome.user.name, "Alice");
        assert_eq!(
            service.tokens().validate(&outcome.token).unwrap(),
            "alice@x.com"
        );
        assert!(matches!(
            repo.find_by_email("a@x.com").await,
            Err(RepositoryError::NotFound)
        ));
        // The password moves with the record.
        assert!(service.login(login_input("alice@x.com", "secret")).await.is_ok());
    }

    #[tokio::test]
    async fn update_profile_to_taken_email_is_duplicate() {
        let (service, _) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();
        service
            .register(register_input("B", "b@x.com", "secret"))
            .await
            .unwrap();

        let result = service
            .update_profile(
                "a@x.com",
                UpdateUser {
                    name: "A".to_string(),
                    email: "b@x.com".to_string(),
                    current_email: "a@x.com".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::DuplicateIdentity)));
    }

    #[tokio::test]
    async fn wrong_current_password_leaves_hash_untouched() {
        let (service, repo) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();
        let token = service
            .login(login_input("a@x.com", "secret"))
            .await
            .unwrap()
            .token;
        let before = repo.find_by_email("a@x.com").await.unwrap();

        let result = service
            .change_password(
                "a@x.com",
                ChangePassword {
                    current_password: secret("wrong"),
                    new_password: secret("next"),
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::CredentialMismatch)));

        let after = repo.find_by_email("a@x.com").await.unwrap();
        assert_eq!(after.password_hash, before.password_hash);
        assert!(service.login(login_input("a@x.com", "secret")).await.is_ok());
        assert_eq!(service.tokens().validate(&token).unwrap(), "a@x.com");
    }

    #[tokio::test]
    async fn change_password_swaps_credentials() {
        let (service, _) = service();
        service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();

        service
            .change_password(
                "a@x.com",
                ChangePassword {
                    current_password: secret("secret"),
                    new_password: secret("next"),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.login(login_input("a@x.com", "secret")).await,
            Err(AccountError::CredentialMismatch)
        ));
        assert!(service.login(login_input("a@x.com", "next")).await.is_ok());
    }

    #[tokio::test]
    async fn get_and_delete_map_missing_rows() {
        let (service, _) = service();
        let user = service
            .register(register_input("A", "a@x.com", "secret"))
            .await
            .unwrap();

        assert_eq!(service.get_user(user.id).await.unwrap().email, "a@x.com");
        service.delete_user(user.id).await.unwrap();
        assert!(matches!(
            service.get_user(user.id).await,
            Err(AccountError::IdentityNotFound)
        ));
        assert!(matches!(
            service.delete_user(user.id).await,
            Err(AccountError::IdentityNotFound)
        ));
        assert!(service.list_users().await.unwrap().is_empty());
    }
}
