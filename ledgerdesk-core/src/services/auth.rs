//! Auth service - login, logout and password management

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, StoredSession};
use crate::domain::result::{Error, Result};
use crate::domain::Session;
use crate::ports::Repository;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Auth service
///
/// The active session is kept in `settings.json` so it survives between
/// CLI invocations.
pub struct AuthService {
    repository: Arc<dyn Repository>,
    data_dir: PathBuf,
}

impl AuthService {
    pub fn new(repository: Arc<dyn Repository>, data_dir: &Path) -> Self {
        Self {
            repository,
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn login(&self, email: &str, password: &str) -> Result<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Auth("Email y contraseña son obligatorios".to_string()));
        }
        let session = self.repository.authenticate(email, password)?;

        let mut config = self.load_config()?;
        config.session = Some(StoredSession {
            token: session.token.clone(),
            user_id: session.user.id.unwrap_or_default(),
            email: session.user.email.clone(),
        });
        self.save_config(&config)?;
        Ok(session)
    }

    /// Ends the stored session. Returns false when nobody was logged in.
    pub fn logout(&self) -> Result<bool> {
        let mut config = self.load_config()?;
        let session = match config.session.take() {
            Some(s) => s,
            None => return Ok(false),
        };
        self.repository.end_session(&session.token)?;
        self.save_config(&config)?;
        Ok(true)
    }

    pub fn current(&self) -> Result<Option<StoredSession>> {
        Ok(self.load_config()?.session)
    }

    pub fn set_password(&self, user_id: i64, password: &str) -> Result<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::validation(
                "password",
                format!(
                    "La contraseña debe tener al menos {} caracteres",
                    MIN_PASSWORD_LEN
                ),
            ));
        }
        if self.repository.get_user(user_id)?.is_none() {
            return Err(Error::not_found(format!("Usuario {} no encontrado", user_id)));
        }
        self.repository.set_password(user_id, password)
    }

    fn load_config(&self) -> Result<Config> {
        Config::load(&self.data_dir).map_err(|e| Error::Config(e.to_string()))
    }

    fn save_config(&self, config: &Config) -> Result<()> {
        config
            .save(&self.data_dir)
            .map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::UserDraft;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AuthService, i64) {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("test.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        let user = repo
            .create_user(&UserDraft {
                name: "Juan".into(),
                surname: "Pérez".into(),
                email: "juan@example.com".into(),
                phone: "123456789".into(),
                role: None,
            })
            .unwrap();
        let service = AuthService::new(repo, dir.path());
        (dir, service, user.id.unwrap())
    }

    #[test]
    fn test_short_password_rejected() {
        let (_dir, service, id) = setup();
        let err = service.set_password(id, "short").unwrap_err();
        assert!(err.field_errors().unwrap().contains("password"));
    }

    #[test]
    fn test_password_for_unknown_user() {
        let (_dir, service, _) = setup();
        assert!(matches!(
            service.set_password(42, "long enough").unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_login_persists_session_and_logout_clears_it() {
        let (_dir, service, id) = setup();
        service.set_password(id, "secreto123").unwrap();

        let session = service.login("Juan@Example.com", "secreto123").unwrap();
        assert_eq!(session.user.id, Some(id));

        let stored = service.current().unwrap().unwrap();
        assert_eq!(stored.token, session.token);
        assert_eq!(stored.user_id, id);

        assert!(service.logout().unwrap());
        assert!(service.current().unwrap().is_none());
        assert!(!service.logout().unwrap());
    }

    #[test]
    fn test_wrong_password_stores_nothing() {
        let (_dir, service, id) = setup();
        service.set_password(id, "secreto123").unwrap();

        assert!(matches!(
            service.login("juan@example.com", "otra-clave").unwrap_err(),
            Error::Auth(_)
        ));
        assert!(service.current().unwrap().is_none());
    }
}
