//! Session-state orchestration for the interactive UI layer.
//!
//! The original app kept auth state in a module-global singleton; here it is
//! an explicit [`SessionContext`] the UI owns, with token persistence behind
//! the injected [`TokenStore`] abstraction. Every mutating flow takes
//! `&mut self`, so a session naturally runs one mutation at a time against
//! its in-memory snapshot. Errors never escape a flow: they degrade into
//! `error_message` for the page to render.

use axum::extract::FromRef;
use uuid::Uuid;

use crate::auth::dto::PublicUser;
use crate::auth::jwt::SessionKeys;
use crate::auth::services::{load_profile, login_user, register_user};
use crate::error::AppError;
use crate::movements::balance::{compute_balance_from_rows, initial_balance, Balance};
use crate::movements::repo;
use crate::movements::services::{
    convert_rows_to_movements, group_movements_by_date, record_movement, validate_movement_input,
    Movement, MovementGroup, MovementKind,
};
use crate::state::AppState;

/// Client-side persistence for the session token (the browser's persistent
/// storage in the web shell). Injected so tests and alternative shells can
/// supply their own backing.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&mut self, token: &str);
    fn clear(&mut self);
}

/// Token store backed by plain memory. Used in tests and headless contexts.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Option<String>,
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.clone()
    }

    fn set(&mut self, token: &str) {
        self.token = Some(token.to_string());
    }

    fn clear(&mut self) {
        self.token = None;
    }
}

/// The movement-entry form. No kind selected means no form is shown;
/// selecting a kind opens it, re-selecting the same kind toggles it closed,
/// and switching kinds blanks every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryForm {
    pub selected: Option<MovementKind>,
    pub name: String,
    pub value: f64,
    pub total_amount: f64,
    pub monthly_payment: f64,
    pub term_months: i64,
}

impl EntryForm {
    pub fn select(&mut self, kind: MovementKind) {
        if self.selected == Some(kind) {
            self.selected = None;
        } else {
            self.selected = Some(kind);
            self.clear_fields();
        }
    }

    fn clear_fields(&mut self) {
        self.name.clear();
        self.value = 0.0;
        self.total_amount = 0.0;
        self.monthly_payment = 0.0;
        self.term_months = 0;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // Inputs arrive as raw strings; anything unparsable becomes zero.

    pub fn set_value(&mut self, raw: &str) {
        self.value = raw.trim().parse().unwrap_or(0.0);
    }

    pub fn set_total_amount(&mut self, raw: &str) {
        self.total_amount = raw.trim().parse().unwrap_or(0.0);
    }

    pub fn set_monthly_payment(&mut self, raw: &str) {
        self.monthly_payment = raw.trim().parse().unwrap_or(0.0);
    }

    pub fn set_term_months(&mut self, raw: &str) {
        self.term_months = raw.trim().parse().unwrap_or(0);
    }
}

/// Per-session orchestrator: holds the logged-in user, the balance and
/// movement snapshot the page renders, and the form state for login,
/// registration and movement entry.
pub struct SessionContext {
    state: AppState,
    keys: SessionKeys,
    tokens: Box<dyn TokenStore>,

    pub current_user: Option<PublicUser>,
    pub balance: Balance,
    pub movements: Vec<Movement>,
    pub grouped: Vec<MovementGroup>,
    pub entry: EntryForm,

    pub login_email: String,
    pub login_password: String,
    pub register_name: String,
    pub register_email: String,
    pub register_password: String,

    pub error_message: String,
}

impl SessionContext {
    pub fn new(state: AppState, tokens: Box<dyn TokenStore>) -> Self {
        let keys = SessionKeys::from_ref(&state);
        Self {
            state,
            keys,
            tokens,
            current_user: None,
            balance: initial_balance(Uuid::nil()),
            movements: Vec::new(),
            grouped: Vec::new(),
            entry: EntryForm::default(),
            login_email: String::new(),
            login_password: String::new(),
            register_name: String::new(),
            register_email: String::new(),
            register_password: String::new(),
            error_message: String::new(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.current_user.is_some()
    }

    /// Session restore, run once per page load. Fails open: any verification
    /// or load failure leaves the session logged out with the stale token
    /// cleared, and never surfaces an error.
    pub async fn restore(&mut self) {
        let Some(token) = self.tokens.get() else {
            return;
        };
        match self.keys.verify(&token) {
            Some(user_id) => {
                if self.load_user(user_id).await.is_err() {
                    self.clear_session();
                }
            }
            None => self.tokens.clear(),
        }
    }

    /// Login flow: validate presence, authenticate, persist the token and
    /// load the user's balance and movements. Failures become an inline
    /// message.
    pub async fn login(&mut self) {
        let result = login_user(
            &self.state.db,
            &self.keys,
            &self.login_email,
            &self.login_password,
        )
        .await;
        match result {
            Ok((token, user)) => {
                self.tokens.set(&token);
                self.current_user = Some(user);
                self.login_email.clear();
                self.login_password.clear();
                self.error_message.clear();
                if let Err(e) = self.reload().await {
                    self.error_message = e.to_string();
                }
            }
            Err(e) => self.error_message = e.to_string(),
        }
    }

    /// Registration flow. The multi-step store write and its compensating
    /// rollback live in [`register_user`]; this layer persists the token and
    /// primes the fresh session.
    pub async fn register(&mut self) {
        let result = register_user(
            &self.state.db,
            &self.keys,
            &self.register_name,
            &self.register_email,
            &self.register_password,
        )
        .await;
        match result {
            Ok((token, user)) => {
                self.tokens.set(&token);
                self.current_user = Some(user);
                self.register_name.clear();
                self.register_email.clear();
                self.register_password.clear();
                self.error_message.clear();
                if let Err(e) = self.reload().await {
                    self.error_message = e.to_string();
                }
            }
            Err(e) => self.error_message = e.to_string(),
        }
    }

    /// Clears the session and the persisted token.
    pub fn logout(&mut self) {
        self.tokens.clear();
        self.clear_session();
    }

    /// Submits the movement-entry form for the selected kind. On validation
    /// failure the form keeps its kind and fields and only the message
    /// changes; on success the form closes and the snapshot reloads.
    pub async fn add_movement(&mut self) {
        let Some(user) = self.current_user.clone() else {
            self.error_message = "you must be logged in".to_string();
            return;
        };
        let Some(kind) = self.entry.selected else {
            self.error_message = "select a movement type first".to_string();
            return;
        };

        let check = validate_movement_input(
            kind.as_str(),
            &self.entry.name,
            self.entry.value,
            self.entry.total_amount,
            self.entry.monthly_payment,
            self.entry.term_months,
        );
        if !check.is_valid {
            self.error_message = check.error;
            return;
        }

        let result = record_movement(
            &self.state.db,
            user.id,
            kind,
            &self.entry.name,
            self.entry.value,
            self.entry.total_amount,
            self.entry.monthly_payment,
            self.entry.term_months,
        )
        .await;
        match result {
            Ok((_, balance)) => {
                self.balance = balance;
                self.entry.reset();
                self.error_message.clear();
                if let Err(e) = self.reload().await {
                    self.error_message = e.to_string();
                }
            }
            Err(e) => self.error_message = e.to_string(),
        }
    }

    /// Reloads the user's movements, regroups them and recomputes the
    /// balance snapshot from the same rows.
    pub async fn reload(&mut self) -> Result<(), AppError> {
        let Some(user) = &self.current_user else {
            return Ok(());
        };
        let rows = repo::list_recent_by_owner(&self.state.db, user.id).await?;
        self.movements = convert_rows_to_movements(&rows);
        self.grouped = group_movements_by_date(&self.movements);
        self.balance = compute_balance_from_rows(&rows, user.id);
        Ok(())
    }

    async fn load_user(&mut self, user_id: Uuid) -> Result<(), AppError> {
        let user = load_profile(&self.state.db, user_id).await?;
        self.current_user = Some(user);
        self.reload().await
    }

    fn clear_session(&mut self) {
        self.current_user = None;
        self.balance = initial_balance(Uuid::nil());
        self.movements.clear();
        self.grouped.clear();
        self.entry.reset();
        self.error_message.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_context() -> SessionContext {
        SessionContext::new(AppState::fake(), Box::<MemoryTokenStore>::default())
    }

    fn fake_user() -> PublicUser {
        PublicUser {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            name: "Ana".into(),
        }
    }

    #[test]
    fn entry_form_toggles_and_resets() {
        let mut form = EntryForm::default();
        assert_eq!(form.selected, None);

        form.select(MovementKind::Income);
        assert_eq!(form.selected, Some(MovementKind::Income));
        form.name = "salary".into();
        form.set_value("1200.50");
        assert_eq!(form.value, 1200.5);

        // Same kind again: back to no selection, fields untouched.
        form.select(MovementKind::Income);
        assert_eq!(form.selected, None);
        assert_eq!(form.name, "salary");

        // A different kind blanks every field.
        form.select(MovementKind::Debt);
        form.name = "car".into();
        form.set_total_amount("600");
        form.select(MovementKind::Expense);
        assert_eq!(form.selected, Some(MovementKind::Expense));
        assert_eq!(form.name, "");
        assert_eq!(form.total_amount, 0.0);
    }

    #[test]
    fn entry_form_setters_default_unparsable_input_to_zero() {
        let mut form = EntryForm::default();
        form.set_value("abc");
        form.set_total_amount("");
        form.set_monthly_payment("12,5");
        form.set_term_months("ten");
        assert_eq!(form.value, 0.0);
        assert_eq!(form.total_amount, 0.0);
        assert_eq!(form.monthly_payment, 0.0);
        assert_eq!(form.term_months, 0);
    }

    #[tokio::test]
    async fn restore_without_token_stays_logged_out() {
        let mut ctx = make_context();
        ctx.restore().await;
        assert!(!ctx.is_logged_in());
        assert!(ctx.error_message.is_empty());
    }

    #[tokio::test]
    async fn restore_clears_an_invalid_token() {
        let mut ctx = make_context();
        ctx.tokens.set("garbage-token");
        ctx.restore().await;
        assert!(!ctx.is_logged_in());
        assert_eq!(ctx.tokens.get(), None);
        assert!(ctx.error_message.is_empty());
    }

    #[tokio::test]
    async fn login_with_blank_fields_sets_inline_message() {
        let mut ctx = make_context();
        ctx.login_password = "secret".into();
        ctx.login().await;
        assert!(!ctx.is_logged_in());
        assert_eq!(ctx.error_message, "email is required");
    }

    #[tokio::test]
    async fn register_with_invalid_input_sets_inline_message() {
        let mut ctx = make_context();
        ctx.register_name = "Ana".into();
        ctx.register_email = "not-an-email".into();
        ctx.register_password = "abc123".into();
        ctx.register().await;
        assert!(!ctx.is_logged_in());
        assert!(ctx.error_message.contains("email"));
    }

    #[tokio::test]
    async fn add_movement_requires_a_logged_in_user() {
        let mut ctx = make_context();
        ctx.entry.select(MovementKind::Income);
        ctx.add_movement().await;
        assert_eq!(ctx.error_message, "you must be logged in");
    }

    #[tokio::test]
    async fn add_movement_requires_a_selected_kind() {
        let mut ctx = make_context();
        ctx.current_user = Some(fake_user());
        ctx.add_movement().await;
        assert_eq!(ctx.error_message, "select a movement type first");
    }

    #[tokio::test]
    async fn failed_validation_keeps_the_form_open() {
        let mut ctx = make_context();
        ctx.current_user = Some(fake_user());
        ctx.entry.select(MovementKind::Debt);
        ctx.entry.name = "car".into();
        ctx.entry.set_total_amount("600");
        ctx.entry.set_monthly_payment("50");
        ctx.entry.set_term_months("10");

        ctx.add_movement().await;

        assert!(ctx.error_message.contains("insufficient"));
        assert_eq!(ctx.entry.selected, Some(MovementKind::Debt));
        assert_eq!(ctx.entry.name, "car");
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let mut ctx = make_context();
        ctx.tokens.set("some-token");
        ctx.current_user = Some(fake_user());
        ctx.error_message = "old error".into();
        ctx.entry.select(MovementKind::Income);

        ctx.logout();

        assert!(!ctx.is_logged_in());
        assert_eq!(ctx.tokens.get(), None);
        assert!(ctx.error_message.is_empty());
        assert_eq!(ctx.entry, EntryForm::default());
        assert!(ctx.movements.is_empty());
    }
}
