use std::time::{Duration, Instant};

use animora_overlay::{
    ConnectionTab, DismissDecision, GestureConfig, GesturePhase, GestureSample, ModalStack,
    OverlayComposer, OverlayError, OverlayEvent, OverlayKey, OverlayKind, OverlayState,
    TransitionConfig,
};

const OPEN_MS: u64 = 300;
const CLOSE_MS: u64 = 200;

struct Clock {
    t0: Instant,
    ms: u64,
}

impl Clock {
    fn new() -> Self {
        Self {
            t0: Instant::now(),
            ms: 0,
        }
    }

    fn now(&self) -> Instant {
        self.t0 + Duration::from_millis(self.ms)
    }

    fn advance(&mut self, ms: u64) -> Instant {
        self.ms += ms;
        self.now()
    }
}

fn composer() -> OverlayComposer {
    OverlayComposer::new(
        ModalStack::new(),
        GestureConfig::default(),
        TransitionConfig::default(),
    )
}

fn key(s: &str) -> OverlayKey {
    OverlayKey::from(s)
}

fn settle_open(composer: &mut OverlayComposer, clock: &mut Clock) -> Vec<OverlayEvent> {
    composer.tick(clock.advance(OPEN_MS)).unwrap()
}

/// likers -> profile(b) -> followers(b), all fully open.
fn likers_profile_followers(composer: &mut OverlayComposer, clock: &mut Clock) -> [OverlayKey; 3] {
    let likers = composer
        .open_root(OverlayKind::likers("post-1"), clock.now())
        .unwrap();
    settle_open(composer, clock);
    let profile = composer
        .open_child(&likers, OverlayKind::profile("b@example.com"), clock.now())
        .unwrap();
    settle_open(composer, clock);
    let followers = composer
        .open_child(
            &profile,
            OverlayKind::connections("b@example.com", ConnectionTab::Followers),
            clock.now(),
        )
        .unwrap();
    settle_open(composer, clock);
    [likers, profile, followers]
}

fn popped(events: &[OverlayEvent]) -> Vec<OverlayKey> {
    events
        .iter()
        .filter_map(|event| match event {
            OverlayEvent::Popped(key) => Some(key.clone()),
            OverlayEvent::Opened(_) => None,
        })
        .collect()
}

// =============================================================================
// Opening
// =============================================================================

#[test]
fn test_open_registers_and_reports_opened() {
    let mut clock = Clock::new();
    let mut composer = composer();

    let likers = composer
        .open_root(OverlayKind::likers("post-1"), clock.now())
        .unwrap();
    assert_eq!(likers, key("likers"));
    assert_eq!(composer.stack().state(&likers), OverlayState::Opening);

    let events = settle_open(&mut composer, &mut clock);
    assert_eq!(events, vec![OverlayEvent::Opened(likers.clone())]);
    assert_eq!(composer.stack().state(&likers), OverlayState::Open);
    assert_eq!(composer.layer(&likers).unwrap().progress(), 1.0);
}

#[test]
fn test_keys_follow_depth_not_entity() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [_, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    let again = composer
        .open_child(&followers, OverlayKind::profile("b@example.com"), clock.now())
        .unwrap();

    assert_eq!(profile, key("likers.profile"));
    assert_eq!(again, key("likers.profile.followers.profile"));
    assert_ne!(profile, again);
    assert_eq!(composer.layer(&profile).unwrap().kind(), composer.layer(&again).unwrap().kind());
    assert_eq!(composer.stack().len(), 4);
}

#[test]
fn test_profile_connection_recursion_is_unbounded() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let mut parent = composer
        .open_root(OverlayKind::profile("a@example.com"), clock.now())
        .unwrap();

    for i in 0..20 {
        settle_open(&mut composer, &mut clock);
        let kind = if i % 2 == 0 {
            OverlayKind::connections("a@example.com", ConnectionTab::Follows)
        } else {
            OverlayKind::profile("a@example.com")
        };
        parent = composer.open_child(&parent, kind, clock.now()).unwrap();
    }

    assert_eq!(composer.len(), 21);
    assert_eq!(composer.stack().len(), 21);
    assert_eq!(parent.depth(), 20);
    assert!(composer.stack().is_top(&parent));
}

#[test]
fn test_unsupported_nesting_is_rejected() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let likers = composer
        .open_root(OverlayKind::likers("post-1"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);

    let err = composer
        .open_child(&likers, OverlayKind::likers("post-2"), clock.now())
        .unwrap_err();
    assert_eq!(
        err,
        OverlayError::UnsupportedNesting {
            parent: "likers",
            child: "likers",
        }
    );
    assert_eq!(composer.stack().len(), 1);
}

#[test]
fn test_comments_open_from_post_and_recurse() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let post = composer
        .open_root(OverlayKind::post("post-1"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);
    let comments = composer
        .open_child(&post, OverlayKind::comments("post-1"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);
    let author = composer
        .open_child(&comments, OverlayKind::profile("b@example.com"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);
    let again = composer
        .open_child(&author, OverlayKind::post("post-2"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);

    assert_eq!(comments, key("post.comments"));
    assert_eq!(again, key("post.comments.profile.post"));
    assert!(composer.stack().is_top(&again));

    let nested = composer
        .open_child(&again, OverlayKind::comments("post-2"), clock.now())
        .unwrap();
    assert_eq!(nested, key("post.comments.profile.post.comments"));
    assert_eq!(composer.stack().len(), 5);
}

#[test]
fn test_comments_only_open_from_a_post() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let profile = composer
        .open_root(OverlayKind::profile("b@example.com"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);

    let err = composer
        .open_child(&profile, OverlayKind::comments("post-1"), clock.now())
        .unwrap_err();
    assert_eq!(
        err,
        OverlayError::UnsupportedNesting {
            parent: "profile",
            child: "comments",
        }
    );
}

#[test]
fn test_children_only_open_from_top() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, _, _] = likers_profile_followers(&mut composer, &mut clock);

    let err = composer
        .open_child(&likers, OverlayKind::profile("c@example.com"), clock.now())
        .unwrap_err();
    assert_eq!(err, OverlayError::ParentNotActive(likers));
}

#[test]
fn test_second_root_is_rejected_while_covered() {
    let clock = Clock::new();
    let mut composer = composer();
    composer
        .open_root(OverlayKind::post("post-1"), clock.now())
        .unwrap();

    let err = composer
        .open_root(OverlayKind::post("post-2"), clock.now())
        .unwrap_err();
    assert!(matches!(err, OverlayError::ParentNotActive(_)));
}

#[test]
fn test_open_picks_current_top() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let post = composer.open(OverlayKind::post("post-1"), clock.now()).unwrap();
    settle_open(&mut composer, &mut clock);
    let likers = composer.open(OverlayKind::likers("post-1"), clock.now()).unwrap();

    assert_eq!(post, key("post"));
    assert_eq!(likers, key("post.likers"));
}

// =============================================================================
// Gestures
// =============================================================================

#[test]
fn test_swipe_on_followers_pops_only_followers() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);
    assert_eq!(followers, key("likers.profile.followers"));

    assert!(composer.drag_start(&followers, clock.now()));
    composer.gesture_sample(&followers, GestureSample::at(80.0, 4.0));
    composer.gesture_sample(&followers, GestureSample::at(160.0, 6.0));
    let decision = composer.gesture_release(&followers, clock.now()).unwrap();
    assert_eq!(decision, DismissDecision::Commit);

    let events = composer.tick(clock.advance(CLOSE_MS)).unwrap();
    assert_eq!(events, vec![OverlayEvent::Popped(followers.clone())]);
    assert_eq!(composer.stack().len(), 2);
    assert!(composer.stack().is_top(&profile));
    assert!(!composer.stack().contains(&followers));
    assert_eq!(composer.stack().state(&likers), OverlayState::Open);
}

#[test]
fn test_swipe_on_covered_layer_is_ignored() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, _] = likers_profile_followers(&mut composer, &mut clock);

    assert!(!composer.drag_start(&likers, clock.now()));
    assert!(!composer.drag_start(&profile, clock.now()));
    composer.gesture_sample(&profile, GestureSample::at(300.0, 0.0));
    let decision = composer.gesture_release(&profile, clock.now()).unwrap();

    assert_eq!(decision, DismissDecision::Continue);
    assert_eq!(composer.stack().len(), 3);
    assert_eq!(composer.layer(&profile).unwrap().progress(), 1.0);
}

#[test]
fn test_commit_never_returns_to_open() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let post = composer.open(OverlayKind::post("post-1"), clock.now()).unwrap();
    settle_open(&mut composer, &mut clock);

    composer.drag_start(&post, clock.now());
    composer.gesture_sample(&post, GestureSample::at(150.0, 0.0));
    composer.gesture_release(&post, clock.now()).unwrap();

    let events = composer.tick(clock.advance(CLOSE_MS / 2)).unwrap();
    assert!(events.is_empty());
    assert_eq!(composer.stack().state(&post), OverlayState::Closing);
    assert!(!composer.drag_start(&post, clock.now()));

    let events = composer.tick(clock.advance(CLOSE_MS)).unwrap();
    assert_eq!(popped(&events), vec![post.clone()]);
    assert_eq!(composer.stack().state(&post), OverlayState::Closed);

    let events = composer.tick(clock.advance(CLOSE_MS)).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_release_on_unknown_overlay_errors() {
    let clock = Clock::new();
    let mut composer = composer();
    let err = composer.gesture_release(&key("ghost"), clock.now()).unwrap_err();
    assert_eq!(err, OverlayError::UnknownOverlay(key("ghost")));
}

// =============================================================================
// Cascade close
// =============================================================================

#[test]
fn test_cascade_closes_deepest_first() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);
    let deep_profile = composer
        .open_child(&followers, OverlayKind::profile("c@example.com"), clock.now())
        .unwrap();
    settle_open(&mut composer, &mut clock);

    composer.close(&profile, clock.now()).unwrap();
    assert!(composer.is_cascading());

    let mut pops = Vec::new();
    for _ in 0..5 {
        let closing: Vec<_> = composer
            .layers()
            .iter()
            .filter(|layer| composer.stack().state(layer.key()) == OverlayState::Closing)
            .map(|layer| layer.key().clone())
            .collect();
        assert!(closing.len() <= 1, "two overlays closing at once: {closing:?}");
        if let Some(closing) = closing.first() {
            assert!(composer.stack().is_top(closing));
        }

        pops.extend(popped(&composer.tick(clock.advance(CLOSE_MS)).unwrap()));
    }

    assert_eq!(pops, vec![deep_profile, followers, profile]);
    assert!(!composer.is_cascading());
    assert_eq!(composer.stack().keys(), vec![likers.clone()]);
    assert_eq!(composer.stack().state(&likers), OverlayState::Open);
}

#[test]
fn test_cascade_waits_for_each_close() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.close(&likers, clock.now()).unwrap();
    assert_eq!(composer.stack().state(&followers), OverlayState::Closing);
    assert_eq!(composer.stack().state(&profile), OverlayState::Open);

    let events = composer.tick(clock.advance(CLOSE_MS - 1)).unwrap();
    assert!(events.is_empty());
    assert_eq!(composer.stack().state(&profile), OverlayState::Open);

    let events = composer.tick(clock.advance(1)).unwrap();
    assert_eq!(popped(&events), vec![followers]);
    assert_eq!(composer.stack().state(&profile), OverlayState::Closing);
}

#[test]
fn test_close_all_pops_everything() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.close_all(clock.now()).unwrap();
    let mut pops = Vec::new();
    while composer.is_cascading() {
        pops.extend(popped(&composer.tick(clock.advance(CLOSE_MS)).unwrap()));
    }

    assert_eq!(pops, vec![followers, profile, likers]);
    assert!(composer.stack().is_empty());
    assert!(composer.is_empty());
}

#[test]
fn test_cascade_absorbs_inflight_swipe() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.drag_start(&followers, clock.now());
    composer.gesture_sample(&followers, GestureSample::at(200.0, 0.0));
    composer.gesture_release(&followers, clock.now()).unwrap();

    composer.close(&profile, clock.now()).unwrap();
    let pops = popped(&composer.tick(clock.advance(CLOSE_MS)).unwrap());
    assert_eq!(pops, vec![followers]);
    let pops = popped(&composer.tick(clock.advance(CLOSE_MS)).unwrap());
    assert_eq!(pops, vec![profile]);
    assert!(composer.stack().is_top(&likers));
}

#[test]
fn test_open_is_rejected_during_cascade() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, _, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.close(&likers, clock.now()).unwrap();
    let err = composer
        .open_child(&followers, OverlayKind::profile("d@example.com"), clock.now())
        .unwrap_err();
    assert_eq!(err, OverlayError::CascadeInProgress);
}

#[test]
fn test_shallower_close_retargets_cascade() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.close(&profile, clock.now()).unwrap();
    composer.close(&likers, clock.now()).unwrap();
    // A deeper close while a shallower cascade runs is absorbed.
    composer.close(&followers, clock.now()).unwrap();

    let mut pops = Vec::new();
    while composer.is_cascading() {
        pops.extend(popped(&composer.tick(clock.advance(CLOSE_MS)).unwrap()));
    }
    assert_eq!(pops, vec![followers, profile, likers]);
}

// =============================================================================
// Teardown
// =============================================================================

#[test]
fn test_destroy_mid_open_leaves_no_orphans() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let post = composer.open(OverlayKind::post("post-1"), clock.now()).unwrap();
    settle_open(&mut composer, &mut clock);
    let likers = composer.open(OverlayKind::likers("post-1"), clock.now()).unwrap();

    let removed = composer.destroy(&post, clock.now()).unwrap();
    assert_eq!(removed, vec![likers, post]);
    assert!(composer.stack().is_empty());

    // The cancelled open must not fire later.
    let events = composer.tick(clock.advance(OPEN_MS * 2)).unwrap();
    assert!(events.is_empty());
}

#[test]
fn test_destroy_during_cascade_continues_with_ancestor() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.close(&profile, clock.now()).unwrap();
    let removed = composer.destroy(&followers, clock.now()).unwrap();
    assert_eq!(removed, vec![followers]);
    assert!(composer.is_cascading());
    assert_eq!(composer.stack().state(&profile), OverlayState::Closing);

    let pops = popped(&composer.tick(clock.advance(CLOSE_MS)).unwrap());
    assert_eq!(pops, vec![profile]);
    assert!(!composer.is_cascading());
    assert!(composer.stack().is_top(&likers));
}

#[test]
fn test_each_layer_owns_its_animation() {
    let mut clock = Clock::new();
    let mut composer = composer();
    let [likers, profile, followers] = likers_profile_followers(&mut composer, &mut clock);

    composer.drag_start(&followers, clock.now());
    composer.gesture_sample(&followers, GestureSample::at(97.5, 0.0));

    assert!((composer.layer(&followers).unwrap().progress() - 0.75).abs() < 0.001);
    assert_eq!(composer.layer(&profile).unwrap().progress(), 1.0);
    assert_eq!(composer.layer(&likers).unwrap().progress(), 1.0);
    assert_eq!(composer.layer(&followers).unwrap().phase(), GesturePhase::Tracking);
    assert_eq!(composer.layer(&profile).unwrap().phase(), GesturePhase::Idle);
}
