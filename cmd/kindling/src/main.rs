//! # Kindling Binary
//!
//! Wires the adapters selected by configuration (and compile-time features)
//! into the services, seeds a population of fake profiles and drives one
//! scripted discovery session end to end, finishing with a chat on the
//! newest match.
//!
//! Usage: `kindling [config-file]`

use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::CredentialAuth;
use configs::{AppConfig, CardConfig, LogConfig, StorageBackend, StorageConfig};
use domains::{Advertiser, CandidateProfile, DecisionMap, IdentityProvider, UserId};
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use services::{
    Card, ChatLog, Discovery, DiscoveryEvent, MatchesInbox, PendingSwipe, ProfileEditor,
    RegistrationForm, Stores, SwipeTuning,
};
use storage_adapters::MemoryStore;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_EMAIL: &str = "demo@kindling.local";
const DEMO_PASSWORD: &str = "kindling";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let config = AppConfig::load(path.as_deref()).context("loading configuration")?;
    init_tracing(&config.log);

    let stores = open_stores(&config.storage).await?;
    let auth = Arc::new(CredentialAuth::new());

    // 1. Register the demo account
    let mut form = RegistrationForm::new();
    form.set_full_name("Demo User");
    form.set_email(DEMO_EMAIL);
    form.set_password(DEMO_PASSWORD);
    form.set_photo_url("https://picsum.photos/seed/demo/600/800");
    let me = form.register(auth.as_ref(), stores.profiles.as_ref()).await?;

    // 2. Populate the store; some candidates already liked us
    seed_candidates(&stores, me, config.demo.candidates).await?;

    // 3. Fill in settings
    let mut editor = ProfileEditor::load(auth.clone(), stores.profiles.clone()).await?;
    editor.set_age_text("31");
    editor.set_bio("Here for the demo.");
    editor.set_min_seeking_age(21);
    editor.set_max_seeking_age(45);
    editor.save().await?;

    // 4. Discovery
    let mut discovery = Discovery::new(
        auth.clone(),
        stores.clone(),
        tuning(&config.card),
        config.discovery.event_capacity,
    );
    let listener = tokio::spawn(log_events(discovery.subscribe()));

    let candidates = discovery.refresh().await?;
    info!(candidates, "deck ready");
    show_sponsored_card(&discovery);
    swipe_through(&discovery).await?;

    // 5. Sign out and back in, then read the inbox
    auth.sign_out();
    if let Err(e) = discovery.refresh().await {
        info!(error = %e, "refresh while signed out refused");
    }
    auth.sign_in(DEMO_EMAIL, DEMO_PASSWORD).await?;

    let inbox = MatchesInbox::new(auth.clone(), stores.matches.clone())
        .fetch()
        .await?;
    info!(matches = inbox.len(), "inbox loaded");
    for record in &inbox {
        info!(peer = %record.peer, name = %record.name, matched_at = %record.matched_at, "match");
    }

    // 6. Say hello to the newest match
    if let Some(newest) = inbox.first() {
        let chat = ChatLog::open(auth.clone(), &stores, newest.peer).await?;
        chat.send(&format!("Hi {}!", newest.name)).await?;
        for line in chat.load().await? {
            info!(mine = line.is_from_current_user, text = %line.message.text, "chat");
        }
    }

    drop(discovery);
    listener.await?;
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn open_stores(storage: &StorageConfig) -> anyhow::Result<Stores> {
    match storage.backend {
        StorageBackend::Memory => Ok(Stores::shared(Arc::new(MemoryStore::new()))),
        StorageBackend::Sqlite => open_sqlite(storage).await,
    }
}

#[cfg(feature = "db-sqlite")]
async fn open_sqlite(storage: &StorageConfig) -> anyhow::Result<Stores> {
    use secrecy::ExposeSecret;

    let Some(url) = storage.database_url.as_ref() else {
        bail!("storage.database_url is not set");
    };
    let store = storage_adapters::SqliteStore::connect(url.expose_secret(), storage.max_connections)
        .await
        .context("opening sqlite store")?;
    Ok(Stores::shared(Arc::new(store)))
}

#[cfg(not(feature = "db-sqlite"))]
async fn open_sqlite(_storage: &StorageConfig) -> anyhow::Result<Stores> {
    bail!("sqlite backend requested but kindling was built without the `db-sqlite` feature")
}

fn tuning(card: &CardConfig) -> SwipeTuning {
    SwipeTuning {
        threshold: card.swipe_threshold,
        rotation_divisor: card.rotation_divisor,
        button_translation: card.button_translation,
        button_rotation_degrees: card.button_rotation_degrees,
        button_duration: card.button_duration(),
    }
}

async fn seed_candidates(stores: &Stores, me: UserId, count: usize) -> anyhow::Result<()> {
    for i in 0..count {
        let id = UserId::new();
        let profile = CandidateProfile {
            age: Some((18u32..60).fake()),
            bio: Sentence(3..8).fake(),
            photo_urls: (0..(1usize..4).fake::<usize>())
                .map(|n| format!("https://picsum.photos/seed/{id}-{n}/600/800"))
                .collect(),
            ..CandidateProfile::new(id, Name().fake::<String>())
        };
        stores.profiles.put_profile(profile).await?;

        if i % 2 == 0 {
            let liked: DecisionMap = [(me, true)].into_iter().collect();
            stores.swipes.put_decisions(id, liked).await?;
        }
    }
    info!(count, "seeded candidates");
    Ok(())
}

fn show_sponsored_card(discovery: &Discovery) {
    let ad = Card::new(
        Advertiser {
            title: "Kindling Gold".into(),
            brand_name: "Kindling".into(),
            poster_photos: vec!["https://picsum.photos/seed/ad/600/800".into()],
        },
        *discovery.tuning(),
    );
    let text: String = ad.text_block().into_iter().map(|span| span.text).collect();
    info!(text = %text.replace('\n', " / "), alignment = ?ad.text_alignment(), "sponsored card");
}

/// Alternates buttons and drags until the deck is drained.
async fn swipe_through(discovery: &Discovery) -> anyhow::Result<()> {
    let past_threshold = discovery.tuning().threshold + 40.0;
    let mut round = 0usize;

    while let Some(card) = discovery.top_card() {
        info!(
            name = %card.profile().name,
            photos = card.photo_count(),
            remaining = discovery.remaining(),
            "top card"
        );
        let pending = match round % 4 {
            0 => discovery.like()?,
            1 => discovery.release_drag(-past_threshold)?,
            2 => discovery.release_drag(past_threshold)?,
            _ => discovery.dislike()?,
        };
        round += 1;

        let Some(pending) = pending else {
            bail!("top card was not resolved");
        };
        settle(pending).await?;
    }
    Ok(())
}

async fn settle(pending: PendingSwipe) -> anyhow::Result<()> {
    let PendingSwipe {
        subject,
        verdict,
        handle,
        ..
    } = pending;
    match handle.await? {
        Ok(outcome) if outcome.matched.is_some() => match outcome.record_error {
            Some(e) => warn!(%subject, error = %e, "it's a match, but the inbox was not updated"),
            None => info!(%subject, "it's a match"),
        },
        Ok(_) => info!(%subject, %verdict, "swipe saved"),
        Err(e) => warn!(%subject, error = %e, "swipe failed"),
    }
    Ok(())
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<DiscoveryEvent>) {
    loop {
        match events.recv().await {
            Ok(DiscoveryEvent::DeckReady {
                generation,
                candidates,
            }) => info!(generation, candidates, "event: deck ready"),
            Ok(DiscoveryEvent::FetchFailed(e)) => warn!(error = %e, "event: fetch failed"),
            Ok(DiscoveryEvent::Matched(m)) => info!(peer = %m.peer, "event: matched"),
            Ok(DiscoveryEvent::MatchRecordFailed { peer, error }) => {
                warn!(%peer, %error, "event: match record failed")
            }
            Ok(DiscoveryEvent::SwipeFailed { subject, error }) => {
                warn!(%subject, %error, remote = error.is_remote(), "event: swipe failed")
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event listener lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
