//! Scripted session: page the feed, like a post in a burst, drill into
//! likers, profiles and followers, swipe and cascade back out, then comment
//! on a post.

use std::sync::Arc;
use std::time::{Duration, Instant};

use animora_feed::{
    CommentOutcome, CommentThread, FeedConfig, FeedEngine, FetchOutcome, LikeOutcome,
    MemoryBackend, NoticeQueue, ProfileLoader, Session, StaticSession,
};
use animora_overlay::{
    ConnectionTab, GestureConfig, GestureSample, ModalStack, OverlayComposer, OverlayEvent,
    OverlayKey, OverlayKind, TransitionConfig,
};

use crate::config::DemoConfig;
use crate::error::DemoError;

const SEED: &str = include_str!("../seed.json");
const VIEWER: &str = "me@animora.app";

/// Synthetic frame clock; the composer only ever sees these instants.
struct FrameClock {
    now: Instant,
}

impl FrameClock {
    fn advance(&mut self, ms: u64) -> Instant {
        self.now += Duration::from_millis(ms);
        self.now
    }
}

pub struct Walkthrough {
    backend: Arc<MemoryBackend>,
    notices: NoticeQueue,
    feed: FeedEngine,
    profile: ProfileLoader,
    comments: CommentThread,
    composer: OverlayComposer,
    transitions: TransitionConfig,
    clock: FrameClock,
}

impl Walkthrough {
    pub fn new(config: &DemoConfig) -> Result<Self, DemoError> {
        let backend = Arc::new(MemoryBackend::from_seed_json(SEED)?);
        let me = backend.user_id(VIEWER)?;
        backend.set_viewer(me);
        let user = backend
            .user(me)
            .ok_or_else(|| DemoError::step("viewer missing from seed"))?;
        let session: Arc<dyn Session> = Arc::new(StaticSession::new(user, "demo-token"));

        let notices = NoticeQueue::new();
        let feed = FeedEngine::new(
            backend.clone(),
            backend.clone(),
            session.clone(),
            FeedConfig::default().with_page_size(config.page_size),
        )
        .with_notices(notices.clone());
        let profile = ProfileLoader::new(backend.clone(), backend.clone(), session.clone())
            .with_notices(notices.clone());
        let comments = CommentThread::new(backend.clone(), session).with_notices(notices.clone());

        let transitions = TransitionConfig::default();
        let composer =
            OverlayComposer::new(ModalStack::new(), GestureConfig::default(), transitions);

        Ok(Self {
            backend,
            notices,
            feed,
            profile,
            comments,
            composer,
            transitions,
            clock: FrameClock {
                now: Instant::now(),
            },
        })
    }

    pub async fn run(&mut self) -> Result<(), DemoError> {
        self.load_feed().await?;
        self.like_burst().await?;
        self.drill_down().await?;
        self.cascade_close()?;
        self.comment_thread().await?;
        println!("\nDone.");
        Ok(())
    }

    async fn load_feed(&mut self) -> Result<(), DemoError> {
        println!("== Feed ==");
        loop {
            match self.feed.fetch_next().await? {
                FetchOutcome::Loaded {
                    appended,
                    exhausted,
                } => {
                    println!("page: +{} posts ({} total)", appended, self.feed.len());
                    if exhausted {
                        break;
                    }
                }
                FetchOutcome::Skipped | FetchOutcome::Discarded => break,
            }
        }
        println!("end of feed reached: {}", self.feed.is_exhausted());

        self.backend.fail_next_fetch();
        if let Err(err) = self.feed.refresh().await {
            println!("refresh failed ({}), still showing {} posts", err, self.feed.len());
        }
        self.print_notices();

        self.feed.refresh().await?;
        println!("refreshed: {} posts", self.feed.len());
        Ok(())
    }

    async fn like_burst(&mut self) -> Result<(), DemoError> {
        println!("\n== Likes ==");
        let post = self
            .feed
            .items()
            .into_iter()
            .next()
            .ok_or_else(|| DemoError::step("feed is empty"))?;
        println!("\"{}\" has {} likes", post.caption, post.likes_count);

        self.backend.set_latency(Duration::from_millis(30));
        let before = self.backend.like_count();
        let taps = futures::future::join_all((0..3).map(|_| self.feed.toggle_like(post.id))).await;
        let applied = taps
            .iter()
            .filter(|r| matches!(r, Ok(LikeOutcome::Applied { .. })))
            .count();
        println!(
            "3 quick taps: {} applied, {} mutation(s) sent",
            applied,
            self.backend.like_count() - before
        );
        self.backend.set_latency(Duration::ZERO);

        self.backend.reject_likes(true);
        if let Err(err) = self.feed.toggle_like(post.id).await {
            log::warn!("{}", err);
        }
        self.backend.reject_likes(false);
        if let Some(state) = self.feed.like_state(post.id) {
            println!("after a rejected unlike, still liked: {}", state.liked_by_current_user);
        }
        self.print_notices();
        Ok(())
    }

    async fn drill_down(&mut self) -> Result<(), DemoError> {
        println!("\n== Overlays ==");
        let post = self
            .feed
            .items()
            .into_iter()
            .next()
            .ok_or_else(|| DemoError::step("feed is empty"))?;

        let likers = self
            .composer
            .open_root(OverlayKind::likers(post.id.to_string()), self.clock.now)?;
        self.settle_open()?;

        let liker = self
            .backend
            .likers(post.id)
            .into_iter()
            .next()
            .ok_or_else(|| DemoError::step("post has no likers"))?;
        let profile = self.composer.open_child(
            &likers,
            OverlayKind::profile(liker.email.clone()),
            self.clock.now,
        )?;
        self.settle_open()?;

        let user = self.profile.load(&liker.email).await?;
        println!(
            "{}: {} followers, following: {}",
            user.summary.name,
            user.followers_count,
            self.profile.is_following()
        );
        self.profile.toggle_follow().await?;
        println!("toggled follow, following: {}", self.profile.is_following());
        self.profile.toggle_follow().await?;
        println!("toggled back, following: {}", self.profile.is_following());

        let followers = self.composer.open_child(
            &profile,
            OverlayKind::connections(liker.email, ConnectionTab::Followers),
            self.clock.now,
        )?;
        self.settle_open()?;
        self.print_stack();

        self.composer.drag_start(&followers, self.clock.now);
        for dx in [40.0, 90.0, 160.0] {
            self.composer
                .gesture_sample(&followers, GestureSample::at(dx, 3.0));
        }
        let decision = self.composer.gesture_release(&followers, self.clock.now)?;
        println!("swipe on {}: {:?}", followers, decision);
        self.settle_close()?;
        self.print_stack();

        if self.composer.stack().len() != 2 || !self.composer.stack().is_top(&profile) {
            return Err(DemoError::step("swipe should pop only the followers layer"));
        }
        Ok(())
    }

    fn cascade_close(&mut self) -> Result<(), DemoError> {
        println!("\n== Cascade ==");
        let profile = self
            .composer
            .top_layer()
            .map(|layer| layer.key().clone())
            .ok_or_else(|| DemoError::step("no overlay open"))?;
        let followers = self.composer.open_child(
            &profile,
            OverlayKind::connections(VIEWER, ConnectionTab::Followers),
            self.clock.now,
        )?;
        self.settle_open()?;
        self.composer
            .open_child(&followers, OverlayKind::profile(VIEWER), self.clock.now)?;
        self.settle_open()?;
        self.print_stack();

        let root = OverlayKey::root("likers");
        self.composer.close(&root, self.clock.now)?;
        while self.composer.is_cascading() {
            self.settle_close()?;
        }
        self.print_stack();
        Ok(())
    }

    async fn comment_thread(&mut self) -> Result<(), DemoError> {
        println!("\n== Comments ==");
        let post = self
            .feed
            .items()
            .into_iter()
            .next()
            .ok_or_else(|| DemoError::step("feed is empty"))?;

        let root = self
            .composer
            .open_root(OverlayKind::post(post.id.to_string()), self.clock.now)?;
        self.settle_open()?;
        self.composer.open_child(
            &root,
            OverlayKind::comments(post.id.to_string()),
            self.clock.now,
        )?;
        self.settle_open()?;
        self.print_stack();

        for comment in self.comments.load(post.id).await? {
            println!("  {}: {}", comment.user.name, comment.content);
        }

        self.backend.reject_comments(true);
        if let Err(err) = self.comments.post_comment("Pochi looks so happy").await {
            log::warn!("{}", err);
        }
        self.backend.reject_comments(false);
        self.print_notices();

        if let CommentOutcome::Posted(comment) =
            self.comments.post_comment("Pochi looks so happy").await?
        {
            println!("posted on retry: {}", comment.content);
        }
        println!("thread now has {} comments", self.comments.len());

        self.composer.close(&root, self.clock.now)?;
        while self.composer.is_cascading() {
            self.settle_close()?;
        }
        self.print_stack();
        Ok(())
    }

    fn tick(&mut self, ms: u64) -> Result<(), DemoError> {
        let now = self.clock.advance(ms);
        for event in self.composer.tick(now)? {
            match event {
                OverlayEvent::Opened(key) => println!("  opened {}", key),
                OverlayEvent::Popped(key) => println!("  popped {}", key),
            }
        }
        Ok(())
    }

    fn settle_open(&mut self) -> Result<(), DemoError> {
        self.tick(self.transitions.open_duration.as_millis() as u64)
    }

    fn settle_close(&mut self) -> Result<(), DemoError> {
        self.tick(self.transitions.close_duration.as_millis() as u64)
    }

    fn print_stack(&self) {
        let keys: Vec<String> = self
            .composer
            .stack()
            .keys()
            .iter()
            .map(|k| k.to_string())
            .collect();
        if keys.is_empty() {
            println!("stack: (empty)");
        } else {
            println!("stack: {}", keys.join(" > "));
        }
    }

    fn print_notices(&self) {
        for notice in self.notices.drain() {
            println!("notice: {}", notice);
        }
    }
}
