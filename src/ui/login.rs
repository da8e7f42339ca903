use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::error::{ApiError, FieldError, Result};
use crate::api::models::{BuyerRegistration, Credentials, PasswordReset, SellerRegistration};
use crate::api::AuthBackend;
use crate::app::{Session, SessionHandle};
use crate::storage::Storage;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone pattern"));

pub const MIN_PASSWORD_LEN: usize = 8;
pub const PASSWORD_MISMATCH: &str = "passwords do not match";

#[derive(Default)]
struct Checks(Vec<FieldError>);

impl Checks {
    fn required(&mut self, field: &str, value: &str) -> bool {
        if value.trim().is_empty() {
            self.0.push(FieldError::new(field, "is required"));
            return false;
        }
        true
    }

    fn email(&mut self, value: &str) {
        if self.required("email", value) && !EMAIL.is_match(value.trim()) {
            self.0.push(FieldError::new("email", "is not a valid email address"));
        }
    }

    fn phone(&mut self, value: &str) {
        let digits: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if self.required("phone", value) && !PHONE.is_match(&digits) {
            self.0.push(FieldError::new("phone", "is not a valid phone number"));
        }
    }

    fn password(&mut self, password: &str, confirm: &str) {
        if !self.required("password", password) {
            return;
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            self.0.push(FieldError::new("password", &format!("must be at least {MIN_PASSWORD_LEN} characters")));
        }
        if password != confirm {
            self.0.push(FieldError::new("confirmPassword", PASSWORD_MISMATCH));
        }
    }

    fn finish(self) -> Result<()> {
        if self.0.is_empty() { Ok(()) } else { Err(ApiError::Validation(self.0)) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<()> {
        let mut checks = Checks::default();
        checks.email(&self.email);
        checks.required("password", &self.password);
        checks.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuyerRegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl BuyerRegistrationForm {
    pub fn validate(&self) -> Result<()> {
        let mut checks = Checks::default();
        checks.required("name", &self.name);
        checks.email(&self.email);
        checks.password(&self.password, &self.confirm_password);
        checks.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SellerRegistrationForm {
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub category: String,
    pub city: String,
    pub state: String,
    pub password: String,
    pub confirm_password: String,
}

impl SellerRegistrationForm {
    pub fn validate(&self) -> Result<()> {
        let mut checks = Checks::default();
        checks.required("businessName", &self.business_name);
        checks.email(&self.email);
        checks.phone(&self.phone);
        checks.required("category", &self.category);
        checks.required("city", &self.city);
        checks.required("state", &self.state);
        checks.password(&self.password, &self.confirm_password);
        checks.finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResetPasswordForm {
    pub token: String,
    pub password: String,
    pub confirm_password: String,
}

impl ResetPasswordForm {
    pub fn validate(&self) -> Result<()> {
        let mut checks = Checks::default();
        checks.required("token", &self.token);
        checks.password(&self.password, &self.confirm_password);
        checks.finish()
    }
}

/// Login, registration and password flows. Every form is validated locally
/// before anything is sent.
pub struct AuthFlow<B> {
    backend: Arc<B>,
    session: SessionHandle,
    storage: Option<Arc<Storage>>,
}

impl<B: AuthBackend> AuthFlow<B> {
    pub fn new(backend: Arc<B>, session: SessionHandle, storage: Option<Arc<Storage>>) -> Self {
        Self { backend, session, storage }
    }

    pub async fn login(&self, form: &LoginForm) -> Result<Session> {
        form.validate()?;
        let credentials = Credentials { email: form.email.trim().to_string(), password: form.password.clone() };
        let resp = self.backend.login(&credentials).await?;
        let session = Session::from(resp);
        self.session.replace(session.clone());
        if let Some(storage) = &self.storage {
            if let Err(e) = self.session.persist(storage) {
                self.session.clear();
                return Err(e);
            }
        }
        log::info!("[auth] signed in as {:?}", session.role);
        Ok(session)
    }

    pub fn logout(&self) -> Result<()> {
        self.session.clear();
        if let Some(storage) = &self.storage {
            storage.clear()?;
        }
        log::info!("[auth] signed out");
        Ok(())
    }

    pub async fn register_buyer(&self, form: &BuyerRegistrationForm) -> Result<()> {
        form.validate()?;
        let registration = BuyerRegistration {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone(),
        };
        self.backend.register_buyer(&registration).await
    }

    pub async fn register_seller(&self, form: &SellerRegistrationForm) -> Result<()> {
        form.validate()?;
        let registration = SellerRegistration {
            business_name: form.business_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            password: form.password.clone(),
            category: form.category.trim().to_string(),
            city: form.city.trim().to_string(),
            state: form.state.trim().to_string(),
        };
        self.backend.register_seller(&registration).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let mut checks = Checks::default();
        checks.email(email);
        checks.finish()?;
        self.backend.forgot_password(email.trim()).await
    }

    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<()> {
        form.validate()?;
        let reset = PasswordReset { token: form.token.trim().to_string(), password: form.password.clone() };
        self.backend.reset_password(&reset).await
    }

    pub async fn verify_email(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(ApiError::invalid("token", "is required"));
        }
        self.backend.verify_email(token.trim()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{LoginResponse, Role};
    use parking_lot::Mutex;
    use async_trait::async_trait;

    #[derive(Default)]
    struct FakeAuth {
        calls: Mutex<Vec<String>>,
    }

    impl FakeAuth {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl AuthBackend for FakeAuth {
        async fn login(&self, credentials: &Credentials) -> Result<LoginResponse> {
            self.calls.lock().push("login".into());
            if credentials.password != "correct-horse" {
                return Err(ApiError::Unauthorized("Invalid credentials".into()));
            }
            Ok(LoginResponse {
                token: "jwt".into(),
                role: Role::Seller,
                user_id: "u1".into(),
                seller_id: Some("s1".into()),
            })
        }

        async fn register_buyer(&self, _: &BuyerRegistration) -> Result<()> {
            self.calls.lock().push("register_buyer".into());
            Ok(())
        }

        async fn register_seller(&self, _: &SellerRegistration) -> Result<()> {
            self.calls.lock().push("register_seller".into());
            Ok(())
        }

        async fn forgot_password(&self, _: &str) -> Result<()> {
            self.calls.lock().push("forgot_password".into());
            Ok(())
        }

        async fn reset_password(&self, _: &PasswordReset) -> Result<()> {
            self.calls.lock().push("reset_password".into());
            Ok(())
        }

        async fn verify_email(&self, _: &str) -> Result<()> {
            self.calls.lock().push("verify_email".into());
            Ok(())
        }
    }

    fn seller_form() -> SellerRegistrationForm {
        SellerRegistrationForm {
            business_name: "Grace Collections".into(),
            email: "grace@example.com".into(),
            phone: "+234 801-234-5678".into(),
            category: "fashion".into(),
            city: "Lagos".into(),
            state: "Lagos".into(),
            password: "correct-horse".into(),
            confirm_password: "correct-horse".into(),
        }
    }

    fn flow(backend: Arc<FakeAuth>) -> (AuthFlow<FakeAuth>, SessionHandle, Arc<Storage>) {
        let session = SessionHandle::default();
        let storage = Arc::new(Storage::in_memory().unwrap());
        (AuthFlow::new(backend, session.clone(), Some(storage.clone())), session, storage)
    }

    #[tokio::test]
    async fn mismatched_passwords_never_reach_the_network() {
        let backend = Arc::new(FakeAuth::default());
        let (flow, _, _) = flow(backend.clone());
        let mut form = seller_form();
        form.confirm_password = "correct-horse!".into();

        let err = flow.register_seller(&form).await.unwrap_err();
        assert_eq!(err.field_errors(), &[FieldError::new("confirmPassword", PASSWORD_MISMATCH)]);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn valid_seller_registration_is_sent() {
        let backend = Arc::new(FakeAuth::default());
        let (flow, _, _) = flow(backend.clone());
        flow.register_seller(&seller_form()).await.unwrap();
        assert_eq!(backend.calls(), vec!["register_seller"]);
    }

    #[test]
    fn field_rules() {
        let form = SellerRegistrationForm { phone: "12ab".into(), email: "nope".into(), ..seller_form() };
        let fields: Vec<String> = form.validate().unwrap_err().field_errors().iter().map(|e| e.field.clone()).collect();
        assert_eq!(fields, vec!["email", "phone"]);

        let form = BuyerRegistrationForm {
            name: String::new(),
            email: "a@b.co".into(),
            password: "short".into(),
            confirm_password: "short".into(),
        };
        let fields: Vec<String> = form.validate().unwrap_err().field_errors().iter().map(|e| e.field.clone()).collect();
        assert_eq!(fields, vec!["name", "password"]);

        assert!(LoginForm { email: "a@b.co".into(), password: "x".into() }.validate().is_ok());
    }

    #[tokio::test]
    async fn login_fills_and_persists_session() {
        let backend = Arc::new(FakeAuth::default());
        let (flow, session, storage) = flow(backend);
        let form = LoginForm { email: " grace@example.com ".into(), password: "correct-horse".into() };
        flow.login(&form).await.unwrap();

        assert_eq!(session.token().as_deref(), Some("jwt"));
        assert_eq!(session.seller_id().as_deref(), Some("s1"));
        assert_eq!(SessionHandle::restore(&storage).unwrap().snapshot(), session.snapshot());

        flow.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(storage.get(crate::storage::KEY_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn login_is_undone_when_storage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.sqlite");
        let storage = Arc::new(Storage::open(&path).unwrap());
        rusqlite::Connection::open(&path).unwrap().execute_batch("DROP TABLE kv").unwrap();

        let session = SessionHandle::default();
        let flow = AuthFlow::new(Arc::new(FakeAuth::default()), session.clone(), Some(storage));
        let form = LoginForm { email: "grace@example.com".into(), password: "correct-horse".into() };
        assert!(matches!(flow.login(&form).await, Err(ApiError::Storage(_))));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn rejected_login_leaves_session_empty() {
        let backend = Arc::new(FakeAuth::default());
        let (flow, session, _) = flow(backend);
        let form = LoginForm { email: "grace@example.com".into(), password: "wrong".into() };
        assert!(matches!(flow.login(&form).await, Err(ApiError::Unauthorized(_))));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn password_flows_validate_first() {
        let backend = Arc::new(FakeAuth::default());
        let (flow, _, _) = flow(backend.clone());
        assert!(flow.forgot_password("not-an-email").await.is_err());
        assert!(flow.verify_email("  ").await.is_err());
        let form = ResetPasswordForm { token: "t".into(), password: "abcdefgh".into(), confirm_password: "abcdefgh".into() };
        flow.reset_password(&form).await.unwrap();
        flow.forgot_password("grace@example.com").await.unwrap();
        assert_eq!(backend.calls(), vec!["reset_password", "forgot_password"]);
    }
}
