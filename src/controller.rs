use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::data::FeedError;
use crate::filter::{filter, TagFilter};
use crate::post::{posts_from_records, Post, Record};
use crate::render::{self, FeedStatus, PageView};
use crate::scheduler::RefreshScheduler;
use crate::tags::{extract_tags, tag_options, TagUniverse};

/// Side effects requested by a state transition. The runtime performs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch { generation: u64 },
    Render,
    Countdown { remaining_secs: u64 },
}

/// Inputs the runtime feeds into the state.
#[derive(Debug)]
pub enum Command {
    Tick,
    ManualRefresh,
    FilterChange(String),
    FetchComplete {
        generation: u64,
        result: Result<Vec<Record>, FeedError>,
    },
    Quit,
}

/// Everything the page shows. Only the runtime thread mutates it.
#[derive(Debug, Clone)]
pub struct FeedState {
    posts: Vec<Post>,
    tags: TagUniverse,
    selected: TagFilter,
    notice: Option<String>,
    loaded: bool,
    scheduler: RefreshScheduler,
    next_generation: u64,
    applied_generation: u64,
    in_flight: usize,
}

impl FeedState {
    pub fn new(period: Duration, selected: TagFilter) -> Self {
        Self {
            posts: Vec::new(),
            tags: TagUniverse::default(),
            selected,
            notice: None,
            loaded: false,
            scheduler: RefreshScheduler::new(period),
            next_generation: 1,
            applied_generation: 0,
            in_flight: 0,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn tags(&self) -> &TagUniverse {
        &self.tags
    }

    pub fn selected(&self) -> &TagFilter {
        &self.selected
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.scheduler.remaining()
    }

    /// True while at least one fetch has not reported back.
    pub fn is_fetching(&self) -> bool {
        self.in_flight > 0
    }

    pub fn visible_posts(&self) -> Vec<&Post> {
        filter(&self.posts, &self.selected)
    }

    pub fn status(&self) -> FeedStatus {
        if !self.loaded {
            FeedStatus::Loading
        } else if self.posts.is_empty() {
            FeedStatus::Empty
        } else if self.visible_posts().is_empty() {
            FeedStatus::NoMatches
        } else {
            FeedStatus::Ready
        }
    }

    pub fn dispatch(&mut self, command: Command, now: DateTime<Utc>) -> Vec<Effect> {
        match command {
            Command::Tick => self.on_tick(),
            Command::ManualRefresh => self.on_manual_refresh(),
            Command::FilterChange(value) => self.on_filter_change(&value),
            Command::FetchComplete { generation, result } => {
                self.on_fetch_complete(generation, result, now)
            }
            Command::Quit => Vec::new(),
        }
    }

    /// First fetch at startup.
    pub fn start(&mut self) -> Vec<Effect> {
        vec![self.begin_fetch(), Effect::Render]
    }

    pub fn on_tick(&mut self) -> Vec<Effect> {
        let due = self.scheduler.tick();
        let mut effects = vec![Effect::Countdown {
            remaining_secs: self.scheduler.remaining(),
        }];
        if due {
            debug!("refresh period elapsed");
            effects.push(self.begin_fetch());
            effects.push(Effect::Render);
        }
        effects
    }

    pub fn on_manual_refresh(&mut self) -> Vec<Effect> {
        self.scheduler.reset();
        vec![
            Effect::Countdown {
                remaining_secs: self.scheduler.remaining(),
            },
            self.begin_fetch(),
            Effect::Render,
        ]
    }

    pub fn on_filter_change(&mut self, value: &str) -> Vec<Effect> {
        let next = TagFilter::parse(value);
        if next == self.selected {
            return Vec::new();
        }
        debug!(filter = %next, "filter changed");
        self.selected = next;
        vec![Effect::Render]
    }

    /// Applies a finished fetch. Failures keep the current posts and only
    /// set the fallback notice; completions older than the last applied
    /// generation are dropped. Only a successful load advances the applied
    /// generation.
    pub fn on_fetch_complete(
        &mut self,
        generation: u64,
        result: Result<Vec<Record>, FeedError>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        self.in_flight = self.in_flight.saturating_sub(1);

        if generation < self.applied_generation {
            debug!(
                generation,
                applied = self.applied_generation,
                "discarding stale fetch result"
            );
            return if self.in_flight == 0 {
                vec![Effect::Render]
            } else {
                Vec::new()
            };
        }

        match result {
            Ok(records) => {
                self.applied_generation = generation;
                self.posts = posts_from_records(records, now);
                self.tags = extract_tags(&self.posts);
                self.loaded = true;
                self.notice = None;
                if let TagFilter::Tag(tag) = &self.selected {
                    if !self.tags.contains(tag) {
                        debug!(%tag, "selected tag vanished, showing all posts");
                        self.selected = TagFilter::All;
                    }
                }
                info!(
                    generation,
                    posts = self.posts.len(),
                    tags = self.tags.len(),
                    "feed refreshed"
                );
            }
            Err(err) => {
                warn!(generation, error = %err, "feed refresh failed");
                self.notice = Some(err.fallback_message().to_string());
            }
        }
        vec![Effect::Render]
    }

    pub fn render_page(&self) -> String {
        render::render_page(&PageView {
            status: self.status(),
            posts: self.visible_posts(),
            options: tag_options(&self.tags),
            selected: &self.selected,
            countdown_secs: self.scheduler.remaining(),
            notice: self.notice(),
            fetching: self.is_fetching(),
        })
    }

    fn begin_fetch(&mut self) -> Effect {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.in_flight += 1;
        Effect::Fetch { generation }
    }
}
