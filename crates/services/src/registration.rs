//! Registration form.

use domains::{
    CandidateProfile, DomainError, IdentityProvider, ProfileStore, Result, UserId,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::signal::Signal;

#[derive(Debug, Default)]
pub struct RegistrationForm {
    full_name: String,
    email: String,
    password: String,
    photo_url: Option<String>,
    is_valid: Signal<bool>,
    is_registering: Signal<bool>,
}

impl RegistrationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_full_name(&mut self, value: impl Into<String>) {
        self.full_name = value.into();
        self.check_validity();
    }

    pub fn set_email(&mut self, value: impl Into<String>) {
        self.email = value.into();
        self.check_validity();
    }

    pub fn set_password(&mut self, value: impl Into<String>) {
        self.password = value.into();
        self.check_validity();
    }

    /// Already uploaded cover photo.
    pub fn set_photo_url(&mut self, url: impl Into<String>) {
        self.photo_url = Some(url.into());
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid.get()
    }

    pub fn watch_validity(&self) -> watch::Receiver<bool> {
        self.is_valid.subscribe()
    }

    pub fn watch_registering(&self) -> watch::Receiver<bool> {
        self.is_registering.subscribe()
    }

    fn check_validity(&self) {
        let valid =
            !self.full_name.is_empty() && !self.email.is_empty() && !self.password.is_empty();
        self.is_valid.set(valid);
    }

    /// Creates the account, then stores its initial profile.
    ///
    /// `is_registering` is raised for the duration and lowered on every exit.
    pub async fn register(
        &self,
        identity: &dyn IdentityProvider,
        profiles: &dyn ProfileStore,
    ) -> Result<UserId> {
        if !self.is_valid() {
            return Err(DomainError::Validation(
                "full name, email and password are required".into(),
            ));
        }

        self.is_registering.set(true);
        let result = self.create_account(identity, profiles).await;
        self.is_registering.set(false);

        match &result {
            Ok(user_id) => info!(%user_id, "registered"),
            Err(e) => warn!(error = %e, "registration failed"),
        }
        result
    }

    async fn create_account(
        &self,
        identity: &dyn IdentityProvider,
        profiles: &dyn ProfileStore,
    ) -> Result<UserId> {
        let user_id = identity.create_user(&self.email, &self.password).await?;
        let mut profile = CandidateProfile::new(user_id, self.full_name.clone());
        profile.photo_urls.extend(self.photo_url.clone());
        profiles.put_profile(profile).await?;
        Ok(user_id)
    }
}
