//! # Card
//!
//! Presentation state and gesture interpretation for one card.
//! Nothing here talks to a store: a card only turns touches into intents and
//! animation parameters. The discovery controller acts on the intents.
//!
//! What a card shows comes from its [`CardFace`]. Candidates and sponsored
//! advertiser cards share photo paging and drag handling; only candidate
//! cards can ask for a details screen.

use std::time::Duration;

use domains::{Advertiser, CandidateProfile, UserId, Verdict};
use tokio::sync::watch;

use crate::signal::Signal;

/// Gesture and animation constants. Defaults are the design values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeTuning {
    /// Horizontal drag distance, in points, beyond which a release swipes.
    pub threshold: f64,
    /// A drag of `dx` points rotates the card by `dx / rotation_divisor` degrees.
    pub rotation_divisor: f64,
    pub button_translation: f64,
    pub button_rotation_degrees: f64,
    pub button_duration: Duration,
}

impl Default for SwipeTuning {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            rotation_divisor: 20.0,
            button_translation: 700.0,
            button_rotation_degrees: 15.0,
            button_duration: Duration::from_millis(500),
        }
    }
}

/// What a finished interaction asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardIntent {
    Swipe(Verdict),
    SpringBack,
    ShowDetails(UserId),
}

/// Affine parameters for a card being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardTransform {
    pub rotation_degrees: f64,
    pub translation_x: f64,
    pub translation_y: f64,
}

/// Fixed fly-off used by the like / dislike buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedAnimation {
    pub translation_x: f64,
    pub rotation_degrees: f64,
    pub duration: Duration,
}

impl ScriptedAnimation {
    pub fn for_verdict(verdict: Verdict, tuning: &SwipeTuning) -> Self {
        let direction = if verdict.is_accept() { 1.0 } else { -1.0 };
        Self {
            translation_x: direction * tuning.button_translation,
            rotation_degrees: direction * tuning.button_rotation_degrees,
            duration: tuning.button_duration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Heavy,
    Bold,
    Regular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    Leading,
    Center,
}

/// One run of the card's attributed text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub weight: FontWeight,
    pub size: f32,
}

/// Anything that can be drawn as a deck card.
pub trait CardFace {
    fn photo_urls(&self) -> &[String];

    /// The attributed text block drawn over the bottom of the photo.
    fn text_block(&self) -> Vec<TextSpan>;

    fn text_alignment(&self) -> TextAlignment {
        TextAlignment::Leading
    }
}

impl CardFace for CandidateProfile {
    fn photo_urls(&self) -> &[String] {
        &self.photo_urls
    }

    /// Name in heavy type followed by the age, then the bio on its own line.
    fn text_block(&self) -> Vec<TextSpan> {
        let age = self
            .age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "N\\A".to_string());
        let mut spans = vec![
            TextSpan {
                text: self.name.clone(),
                weight: FontWeight::Heavy,
                size: 32.0,
            },
            TextSpan {
                text: format!("  {age}"),
                weight: FontWeight::Regular,
                size: 24.0,
            },
        ];
        if !self.bio.is_empty() {
            spans.push(TextSpan {
                text: format!("\n{}", self.bio),
                weight: FontWeight::Regular,
                size: 20.0,
            });
        }
        spans
    }
}

impl CardFace for Advertiser {
    fn photo_urls(&self) -> &[String] {
        &self.poster_photos
    }

    /// Title in heavy type, brand in bold underneath.
    fn text_block(&self) -> Vec<TextSpan> {
        vec![
            TextSpan {
                text: self.title.clone(),
                weight: FontWeight::Heavy,
                size: 34.0,
            },
            TextSpan {
                text: format!("\n{}", self.brand_name),
                weight: FontWeight::Bold,
                size: 24.0,
            },
        ]
    }

    fn text_alignment(&self) -> TextAlignment {
        TextAlignment::Center
    }
}

pub struct Card<F = CandidateProfile> {
    face: F,
    tuning: SwipeTuning,
    photo_index: Signal<usize>,
}

impl<F: CardFace> Card<F> {
    pub fn new(face: F, tuning: SwipeTuning) -> Self {
        Self {
            face,
            tuning,
            photo_index: Signal::new(0),
        }
    }

    pub fn face(&self) -> &F {
        &self.face
    }

    pub fn photo_count(&self) -> usize {
        self.face.photo_urls().len()
    }

    pub fn photo_index(&self) -> usize {
        self.photo_index.get()
    }

    /// Notified every time the displayed photo changes.
    pub fn watch_photo_index(&self) -> watch::Receiver<usize> {
        self.photo_index.subscribe()
    }

    pub fn current_photo(&self) -> Option<&str> {
        self.face
            .photo_urls()
            .get(self.photo_index())
            .map(String::as_str)
    }

    /// One flag per photo, set for the one on screen (the progress bars).
    pub fn photo_indicator(&self) -> Vec<bool> {
        let current = self.photo_index();
        (0..self.photo_count()).map(|i| i == current).collect()
    }

    /// Clamped at the last photo.
    pub fn next_photo(&self) -> usize {
        let last = self.photo_count().saturating_sub(1);
        let next = (self.photo_index() + 1).min(last);
        self.photo_index.set(next);
        next
    }

    /// Clamped at the first photo.
    pub fn previous_photo(&self) -> usize {
        let previous = self.photo_index().saturating_sub(1);
        self.photo_index.set(previous);
        previous
    }

    /// A tap at `x` on a photo area `width` points wide: right half pages
    /// forward, left half pages back.
    pub fn tap(&self, x: f64, width: f64) -> usize {
        if x > width / 2.0 {
            self.next_photo()
        } else {
            self.previous_photo()
        }
    }

    /// Raw displacement while the finger is down. Animation only.
    pub fn drag_changed(&self, dx: f64, dy: f64) -> CardTransform {
        CardTransform {
            rotation_degrees: dx / self.tuning.rotation_divisor,
            translation_x: dx,
            translation_y: dy,
        }
    }

    /// Resolution of a drag released at horizontal displacement `dx`.
    pub fn drag_ended(&self, dx: f64) -> CardIntent {
        resolve_drag(dx, &self.tuning)
    }

    pub fn text_block(&self) -> Vec<TextSpan> {
        self.face.text_block()
    }

    pub fn text_alignment(&self) -> TextAlignment {
        self.face.text_alignment()
    }
}

impl Card<CandidateProfile> {
    pub fn profile(&self) -> &CandidateProfile {
        &self.face
    }

    pub fn show_details(&self) -> CardIntent {
        CardIntent::ShowDetails(self.face.id)
    }
}

/// Strictly beyond the threshold swipes; at or inside it springs back.
pub fn resolve_drag(dx: f64, tuning: &SwipeTuning) -> CardIntent {
    if dx.abs() > tuning.threshold {
        CardIntent::Swipe(Verdict::from(dx > 0.0))
    } else {
        CardIntent::SpringBack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_with_photos(n: usize) -> Card {
        let mut profile = CandidateProfile::new(UserId::new(), "Kelly");
        profile.age = Some(23);
        profile.bio = "Music DJ".into();
        profile.photo_urls = (0..n).map(|i| format!("https://img/{i}")).collect();
        Card::new(profile, SwipeTuning::default())
    }

    #[test]
    fn test_release_past_threshold_swipes() {
        let card = card_with_photos(1);
        assert_eq!(card.drag_ended(150.0), CardIntent::Swipe(Verdict::Accept));
        assert_eq!(card.drag_ended(-101.0), CardIntent::Swipe(Verdict::Reject));
    }

    #[test]
    fn test_release_inside_threshold_springs_back() {
        let card = card_with_photos(1);
        assert_eq!(card.drag_ended(100.0), CardIntent::SpringBack);
        assert_eq!(card.drag_ended(-40.0), CardIntent::SpringBack);
        assert_eq!(card.drag_ended(0.0), CardIntent::SpringBack);
    }

    #[test]
    fn test_drag_rotation_is_proportional() {
        let card = card_with_photos(1);
        let t = card.drag_changed(60.0, -12.0);
        assert_eq!(t.rotation_degrees, 3.0);
        assert_eq!((t.translation_x, t.translation_y), (60.0, -12.0));
    }

    #[test]
    fn test_taps_page_and_clamp() {
        let card = card_with_photos(3);
        assert_eq!(card.tap(10.0, 300.0), 0);
        assert_eq!(card.tap(250.0, 300.0), 1);
        assert_eq!(card.tap(250.0, 300.0), 2);
        assert_eq!(card.tap(299.0, 300.0), 2);
        assert_eq!(card.current_photo(), Some("https://img/2"));
        assert_eq!(card.photo_indicator(), vec![false, false, true]);
        assert_eq!(card.tap(149.0, 300.0), 1);
    }

    #[test]
    fn test_paging_without_photos_stays_at_zero() {
        let card = card_with_photos(0);
        assert_eq!(card.next_photo(), 0);
        assert_eq!(card.current_photo(), None);
    }

    #[test]
    fn test_photo_index_is_observable() {
        let card = card_with_photos(2);
        let mut rx = card.watch_photo_index();
        card.next_photo();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);

        // Clamped: no change, no notification.
        card.next_photo();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_button_animation_is_scripted() {
        let tuning = SwipeTuning::default();
        let like = ScriptedAnimation::for_verdict(Verdict::Accept, &tuning);
        let nope = ScriptedAnimation::for_verdict(Verdict::Reject, &tuning);
        assert_eq!((like.translation_x, like.rotation_degrees), (700.0, 15.0));
        assert_eq!((nope.translation_x, nope.rotation_degrees), (-700.0, -15.0));
        assert_eq!(like.duration, Duration::from_millis(500));
    }

    #[test]
    fn test_details_intent_names_the_candidate() {
        let card = card_with_photos(1);
        assert_eq!(card.show_details(), CardIntent::ShowDetails(card.profile().id));
    }

    #[test]
    fn test_text_block() {
        let card = card_with_photos(1);
        let text: String = card.text_block().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, "Kelly  23\nMusic DJ");
        assert_eq!(card.text_block()[0].weight, FontWeight::Heavy);
        assert_eq!(card.text_alignment(), TextAlignment::Leading);
    }

    #[test]
    fn test_missing_age_and_bio() {
        let card = Card::new(CandidateProfile::new(UserId::new(), "Jane"), SwipeTuning::default());
        let text: String = card.text_block().iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, "Jane  N\\A");
    }

    #[test]
    fn test_advertiser_card_is_centred_title_and_brand() {
        let ad = Advertiser {
            title: "Slide Out Menu".into(),
            brand_name: "Lets Build That App".into(),
            poster_photos: vec!["https://img/ad/0".into(), "https://img/ad/1".into()],
        };
        let card = Card::new(ad, SwipeTuning::default());

        let spans = card.text_block();
        assert_eq!(spans[0].text, "Slide Out Menu");
        assert_eq!((spans[0].weight, spans[0].size), (FontWeight::Heavy, 34.0));
        assert_eq!(spans[1].text, "\nLets Build That App");
        assert_eq!((spans[1].weight, spans[1].size), (FontWeight::Bold, 24.0));
        assert_eq!(card.text_alignment(), TextAlignment::Center);

        assert_eq!(card.tap(250.0, 300.0), 1);
        assert_eq!(card.current_photo(), Some("https://img/ad/1"));
        assert_eq!(card.drag_ended(-140.0), CardIntent::Swipe(Verdict::Reject));
    }
}
