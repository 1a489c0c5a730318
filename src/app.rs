use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, trace, warn};

use crate::config;
use crate::controller::{Command, Effect, FeedState};
use crate::data::{self, FeedSource, FileFeedSource, HttpFeedSource, HttpSourceConfig};
use crate::filter::TagFilter;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub url: Option<String>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub filter: Option<String>,
    pub once: bool,
    pub open: bool,
}

pub fn run(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;

    let source = build_source(&cfg, &opts)?;
    let initial_filter = opts
        .filter
        .clone()
        .unwrap_or_else(|| cfg.output.initial_filter.clone());
    let state = FeedState::new(cfg.feed.refresh_interval, TagFilter::parse(&initial_filter));

    info!(source = %source.describe(), "postboard starting");

    if opts.once {
        let page = render_once(state, source.as_ref());
        let mut stdout = io::stdout().lock();
        stdout.write_all(page.as_bytes()).context("write page to stdout")?;
        return stdout.flush().context("flush stdout");
    }

    let output = opts
        .output
        .clone()
        .or_else(|| cfg.output.path.clone())
        .context("no output path configured; pass --output or set output.path")?;

    let mut runtime = Runtime::new(state, source, output);
    runtime.open_browser = opts.open;
    let stderr = io::stderr();
    if stderr.is_terminal() {
        runtime.countdown = Some(Box::new(stderr));
    }
    runtime.run()
}

fn build_source(cfg: &config::Config, opts: &RunOptions) -> Result<Arc<dyn FeedSource>> {
    if let Some(path) = opts.input.as_ref() {
        return Ok(Arc::new(FileFeedSource::new(path)));
    }
    let url = opts.url.clone().unwrap_or_else(|| cfg.feed.url.clone());
    let source = HttpFeedSource::new(HttpSourceConfig {
        url,
        user_agent: cfg.feed.user_agent.clone(),
        timeout: cfg.feed.timeout,
        cache_bust_param: cfg.feed.cache_bust_param.clone(),
    })
    .context("configure feed source; pass --url, --input or set feed.url")?;
    Ok(Arc::new(source))
}

/// One synchronous refresh cycle, for `--once`.
pub fn render_once(mut state: FeedState, source: &dyn FeedSource) -> String {
    for effect in state.start() {
        if let Effect::Fetch { generation } = effect {
            let result = data::load_records(source);
            state.on_fetch_complete(generation, result, Utc::now());
        }
    }
    state.render_page()
}

/// Owns the state and performs its effects. Commands arrive on one
/// channel from stdin, the ticker's select arm and fetch workers.
struct Runtime {
    state: FeedState,
    source: Arc<dyn FeedSource>,
    output: PathBuf,
    open_browser: bool,
    opened: bool,
    /// Where the countdown line goes, when someone is watching.
    countdown: Option<Box<dyn Write + Send>>,
    tick_interval: Duration,
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl Runtime {
    fn new(state: FeedState, source: Arc<dyn FeedSource>, output: PathBuf) -> Self {
        let (tx, rx) = unbounded();
        Self {
            state,
            source,
            output,
            open_browser: false,
            opened: false,
            countdown: None,
            tick_interval: TICK_INTERVAL,
            tx,
            rx,
        }
    }

    fn sender(&self) -> Sender<Command> {
        self.tx.clone()
    }

    fn run(self) -> Result<()> {
        spawn_input_reader(self.sender());
        self.event_loop()
    }

    fn event_loop(mut self) -> Result<()> {
        let ticker = crossbeam_channel::tick(self.tick_interval);
        let commands = self.rx.clone();

        let effects = self.state.start();
        self.perform(effects);

        loop {
            let command = crossbeam_channel::select! {
                recv(ticker) -> _ => Some(Command::Tick),
                recv(commands) -> msg => msg.ok(),
            };
            let Some(command) = command else {
                break;
            };
            if matches!(command, Command::Quit) {
                info!("quit requested");
                break;
            }
            let effects = self.state.dispatch(command, Utc::now());
            self.perform(effects);
        }

        if let Some(out) = self.countdown.as_mut() {
            let _ = writeln!(out);
        }
        Ok(())
    }

    fn perform(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch { generation } => self.spawn_fetch(generation),
                Effect::Render => {
                    if let Err(err) = self.write_page() {
                        error!(error = ?err, "failed to write page");
                    }
                }
                Effect::Countdown { remaining_secs } => {
                    trace!(remaining_secs, "next refresh");
                    self.show_countdown(remaining_secs);
                }
            }
        }
    }

    fn show_countdown(&mut self, remaining_secs: u64) {
        let Some(out) = self.countdown.as_mut() else {
            return;
        };
        let written = out
            .write_all(countdown_line(remaining_secs).as_bytes())
            .and_then(|()| out.flush());
        if let Err(err) = written {
            debug!(error = %err, "countdown line disabled");
            self.countdown = None;
        }
    }

    fn spawn_fetch(&self, generation: u64) {
        debug!(generation, "starting fetch");
        let source = self.source.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = data::load_records(source.as_ref());
            let _ = tx.send(Command::FetchComplete { generation, result });
        });
    }

    fn write_page(&mut self) -> Result<()> {
        let page = self.state.render_page();
        write_atomic(&self.output, page.as_bytes())?;
        debug!(path = %self.output.display(), "page written");

        if self.open_browser && !self.opened {
            self.opened = true;
            if let Err(err) = webbrowser::open(&self.output.to_string_lossy()) {
                warn!(error = %err, "could not open browser");
            }
        }
        Ok(())
    }
}

/// Status line redrawn in place on each tick.
fn countdown_line(remaining_secs: u64) -> String {
    format!("\rNext refresh in {:>3}s", remaining_secs)
}

/// Replaces `path` in one rename so readers never see a half-written page.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(&dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    file.write_all(contents).context("write page")?;
    file.persist(path)
        .with_context(|| format!("persist page to {}", path.display()))?;
    Ok(())
}

/// Reads commands from stdin: Enter or `r` refreshes, `q` quits, anything
/// else selects a tag (`all` clears the filter).
fn spawn_input_reader(tx: Sender<Command>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(parse_command(&line)).is_err() {
                break;
            }
        }
    });
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    match line {
        "" | "r" | "refresh" => Command::ManualRefresh,
        "q" | "quit" | "exit" => Command::Quit,
        _ => {
            let value = line
                .strip_prefix("filter ")
                .or_else(|| line.strip_prefix("f "))
                .unwrap_or(line);
            Command::FilterChange(value.trim().to_string())
        }
    }
}
