//! # Profile settings
//!
//! Edits the session user's own profile. The seeking-age sliders push each
//! other so the saved range is never inverted.

use std::sync::Arc;

use domains::{
    AuthContext, CandidateProfile, DomainError, ProfileStore, Result, SeekingAgeRange,
};
use tracing::{info, warn};

/// Photo slots on the settings screen.
pub const PHOTO_SLOTS: usize = 3;

pub struct ProfileEditor {
    auth: Arc<dyn AuthContext>,
    profiles: Arc<dyn ProfileStore>,
    draft: CandidateProfile,
    /// Slot contents as shown on screen; `draft.photo_urls` is their
    /// compacted form in slot order.
    photos: [Option<String>; PHOTO_SLOTS],
}

impl ProfileEditor {
    /// Loads the current user's profile, or a blank one if none was saved.
    pub async fn load(auth: Arc<dyn AuthContext>, profiles: Arc<dyn ProfileStore>) -> Result<Self> {
        let user_id = auth.current_user_id().ok_or(DomainError::NotAuthenticated)?;
        let draft = profiles
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| CandidateProfile::new(user_id, ""));
        let mut photos: [Option<String>; PHOTO_SLOTS] = Default::default();
        for (slot, url) in photos.iter_mut().zip(&draft.photo_urls) {
            *slot = Some(url.clone());
        }
        let mut editor = Self {
            auth,
            profiles,
            draft,
            photos,
        };
        editor.sync_photos();
        Ok(editor)
    }

    pub fn draft(&self) -> &CandidateProfile {
        &self.draft
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    /// Text-field input; anything that is not a number clears the age.
    pub fn set_age_text(&mut self, text: &str) {
        self.draft.age = text.trim().parse().ok();
    }

    pub fn set_bio(&mut self, bio: impl Into<String>) {
        self.draft.bio = bio.into();
    }

    pub fn photo_slots(&self) -> &[Option<String>; PHOTO_SLOTS] {
        &self.photos
    }

    /// Puts `url` into `slot`, replacing whatever was there. Other slots keep
    /// their positions.
    pub fn set_photo(&mut self, slot: usize, url: impl Into<String>) -> Result<()> {
        *self.slot_mut(slot)? = Some(url.into());
        self.sync_photos();
        Ok(())
    }

    pub fn clear_photo(&mut self, slot: usize) -> Result<()> {
        *self.slot_mut(slot)? = None;
        self.sync_photos();
        Ok(())
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Option<String>> {
        self.photos.get_mut(slot).ok_or_else(|| {
            DomainError::Validation(format!("photo slot {slot} out of range (max {PHOTO_SLOTS})"))
        })
    }

    fn sync_photos(&mut self) {
        self.draft.photo_urls = self.photos.iter().flatten().cloned().collect();
    }

    pub fn seeking_range(&self) -> SeekingAgeRange {
        self.draft.seeking_range()
    }

    /// Min slider moved. Dragging it past max pulls max along.
    pub fn set_min_seeking_age(&mut self, value: u32) -> SeekingAgeRange {
        let min = clamp_slider(value);
        let max = self.seeking_range().max().max(min);
        self.store_range(min, max)
    }

    /// Max slider moved. Dragging it below min pushes min down.
    pub fn set_max_seeking_age(&mut self, value: u32) -> SeekingAgeRange {
        let max = clamp_slider(value);
        let min = self.seeking_range().min().min(max);
        self.store_range(min, max)
    }

    fn store_range(&mut self, min: u32, max: u32) -> SeekingAgeRange {
        self.draft.min_seeking_age = Some(min);
        self.draft.max_seeking_age = Some(max);
        self.seeking_range()
    }

    /// Writes the whole draft back. The caller should refresh discovery
    /// afterwards since the seeking range may have changed.
    pub async fn save(&self) -> Result<()> {
        let user_id = self.auth.current_user_id().ok_or(DomainError::NotAuthenticated)?;
        if user_id != self.draft.id {
            return Err(DomainError::NotAuthenticated);
        }
        if self.draft.name.trim().is_empty() {
            return Err(DomainError::Validation("name must not be empty".into()));
        }

        self.profiles
            .put_profile(self.draft.clone())
            .await
            .inspect_err(|e| warn!(%user_id, error = %e, "failed to save settings"))?;
        info!(%user_id, "settings saved");
        Ok(())
    }
}

fn clamp_slider(value: u32) -> u32 {
    value.clamp(SeekingAgeRange::SLIDER_MIN, SeekingAgeRange::SLIDER_MAX)
}
