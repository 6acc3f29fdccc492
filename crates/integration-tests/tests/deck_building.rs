//! Deck construction against the in-memory store.

mod common;

use std::sync::Arc;

use common::{discovery, person, settle, SwitchableAuth};
use domains::{CandidateProfile, DecisionMap, DomainError, ProfileStore, SwipeStore, UserId};
use fake::{Fake, Faker};
use services::{Deck, DeckBuilder, Session, Stores};
use storage_adapters::MemoryStore;

fn top_first(deck: &Deck) -> Vec<String> {
    (0..deck.len())
        .filter_map(|i| deck.node(i))
        .map(|node| node.profile().name.clone())
        .collect()
}

#[tokio::test]
async fn default_range_is_inclusive_at_both_ends() {
    let me = CandidateProfile::new(UserId::new(), "me");
    let store = Arc::new(MemoryStore::with_profiles([
        me.clone(),
        person("17", 17),
        person("18", 18),
        person("50", 50),
        person("51", 51),
    ]));

    let deck = DeckBuilder::new(store, Session::for_profile(me))
        .build(&DecisionMap::new(), 1)
        .await
        .unwrap();
    assert_eq!(top_first(&deck), vec!["18", "50"]);
}

#[tokio::test]
async fn prior_decisions_of_either_kind_are_excluded() {
    let me = CandidateProfile {
        age: Some(30),
        ..CandidateProfile::new(UserId::new(), "me")
    };
    let (liked, passed, fresh) = (person("liked", 30), person("passed", 30), person("fresh", 30));
    let store = Arc::new(MemoryStore::with_profiles([
        me.clone(),
        liked.clone(),
        passed.clone(),
        fresh,
    ]));
    store
        .put_decisions(me.id, [(liked.id, true), (passed.id, false)].into_iter().collect())
        .await
        .unwrap();

    let prior = store.get_decisions(me.id).await.unwrap();
    let deck = DeckBuilder::new(store, Session::for_profile(me))
        .build(&prior, 1)
        .await
        .unwrap();
    assert_eq!(top_first(&deck), vec!["fresh"]);
}

#[tokio::test]
async fn random_populations_only_yield_eligible_candidates() {
    for _ in 0..25 {
        let min: u32 = (18u32..60).fake();
        let max: u32 = (min..=100).fake();
        let me = CandidateProfile {
            age: Some((18u32..70).fake()),
            min_seeking_age: Some(min),
            max_seeking_age: Some(max),
            ..CandidateProfile::new(UserId::new(), "me")
        };

        let population: Vec<CandidateProfile> = (0..(5usize..30).fake::<usize>())
            .map(|i| CandidateProfile {
                age: Faker.fake::<bool>().then(|| (15u32..90).fake()),
                ..CandidateProfile::new(UserId::new(), format!("c{i}"))
            })
            .collect();
        let prior: DecisionMap = population
            .iter()
            .filter(|_| (0..4).fake::<u8>() == 0)
            .map(|p| (p.id, Faker.fake::<bool>()))
            .collect();

        let store = Arc::new(MemoryStore::with_profiles(
            std::iter::once(me.clone()).chain(population.iter().cloned()),
        ));
        let deck = DeckBuilder::new(store, Session::for_profile(me.clone()))
            .build(&prior, 7)
            .await
            .unwrap();

        let expected: Vec<String> = population
            .iter()
            .filter(|p| p.age.is_some_and(|a| (min..=max).contains(&a)))
            .filter(|p| !prior.contains(&p.id))
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(top_first(&deck), expected);
        assert_eq!(deck.generation(), 7);
        assert!(!deck.contains(&me.id));
    }
}

#[tokio::test]
async fn draining_the_deck_leaves_no_top() {
    let me = CandidateProfile::new(UserId::new(), "me");
    let store = Arc::new(MemoryStore::with_profiles([
        me.clone(),
        person("a", 20),
        person("b", 30),
        person("c", 40),
    ]));
    let mut discovery = discovery(SwitchableAuth::signed_in(me.id), Stores::shared(store.clone()));

    assert_eq!(discovery.refresh().await, Ok(3));
    settle(discovery.like().unwrap()).await;
    settle(discovery.swipe(domains::Verdict::Reject).unwrap()).await;
    settle(discovery.dislike().unwrap()).await;

    assert_eq!(discovery.remaining(), 0);
    assert!(discovery.top().is_none());
    assert!(discovery.render_order().is_empty());
    assert!(discovery.like().unwrap().is_none());

    let stored = store.get_decisions(me.id).await.unwrap();
    assert_eq!(stored.len(), 3);

    // Everything is decided now, so a rebuild stays empty.
    assert_eq!(discovery.refresh().await, Ok(0));
}

#[tokio::test]
async fn signed_out_refresh_touches_no_store() {
    let store = Arc::new(MemoryStore::with_profiles([person("a", 20)]));
    let auth = Arc::new(SwitchableAuth::default());
    let mut discovery = discovery(auth, Stores::shared(store));
    let mut events = discovery.subscribe();

    assert_eq!(discovery.refresh().await, Err(DomainError::NotAuthenticated));
    assert_eq!(discovery.remaining(), 0);
    assert!(matches!(
        discovery.like(),
        Err(DomainError::NotAuthenticated)
    ));
    assert_eq!(
        events.recv().await.unwrap(),
        services::DiscoveryEvent::FetchFailed(DomainError::NotAuthenticated)
    );
}

#[tokio::test]
async fn missing_own_profile_falls_back_to_default_range() {
    let store = Arc::new(MemoryStore::with_profiles([person("a", 20)]));
    let me = UserId::new();
    let mut discovery = discovery(SwitchableAuth::signed_in(me), Stores::shared(store.clone()));

    assert_eq!(discovery.refresh().await, Ok(1));
    let session = discovery.session().unwrap();
    assert_eq!(session.user_id(), me);
    assert_eq!((session.seeking().min(), session.seeking().max()), (18, 50));
    assert!(store.get_profile(me).await.unwrap().is_none());
}
