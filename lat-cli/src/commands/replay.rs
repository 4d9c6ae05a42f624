//! `lat replay` - push recorded page sessions through the whole pipeline
//!
//! Each line of the input is one [`PageSession`]: a tab, the page it shows
//! and the DOM events observed on it. Sessions run through a capture agent,
//! the in-process runtime channel and the relay agent, and the resulting
//! envelopes go to the collector (or to stdout with `--dry-run`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use lat_capture::{CaptureAgent, DomEvent, Handoff, PageSnapshot};
use lat_core::{
    ActiveInfo, Collector, Tab, TabChangeInfo, TabId, TabStatus, WindowId, channel,
};
use lat_relay::{HttpCollector, MemoryCollector, RelayAgent, TabCache, serve_channel};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, LatConfig, validate_endpoint};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// JSON-lines file of page sessions
    pub file: PathBuf,

    /// Keep the heartbeat running while sessions replay
    #[arg(long)]
    pub heartbeat: bool,

    /// Collector URL, overriding the configuration
    #[arg(long, conflicts_with = "dry_run")]
    pub endpoint: Option<String>,

    /// Print envelopes as JSON lines instead of posting them
    #[arg(long)]
    pub dry_run: bool,
}

/// One recorded page visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSession {
    pub tab_id: TabId,
    #[serde(default)]
    pub window_id: WindowId,
    pub page: PageSnapshot,
    #[serde(default)]
    pub events: Vec<DomEvent>,
    /// Pause between consecutive events
    #[serde(default, with = "humantime_serde")]
    pub event_gap: Option<Duration>,
}

impl PageSession {
    fn tab(&self) -> Tab {
        Tab {
            id: self.tab_id,
            window_id: self.window_id,
            url: Some(self.page.url.clone()),
            title: Some(self.page.title.clone()),
            status: Some(TabStatus::Complete),
        }
    }
}

/// Outcome counts for a replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub sessions: usize,
    pub sent: usize,
    pub throttled: usize,
    pub failed: usize,
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sessions: {} sent, {} throttled, {} failed",
            self.sessions, self.sent, self.throttled, self.failed
        )
    }
}

/// Parse a JSON-lines session file, skipping blank lines
pub fn parse_sessions(contents: &str) -> Result<Vec<PageSession>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("line {}: invalid session", n + 1))
        })
        .collect()
}

/// Replay sessions against `collector`, waiting for every delivery
pub async fn replay(
    config: &LatConfig,
    sessions: Vec<PageSession>,
    collector: Arc<dyn Collector>,
    heartbeat: bool,
) -> ReplaySummary {
    let tabs = Arc::new(TabCache::new());
    let agent = Arc::new(RelayAgent::new(&config.relay, collector, tabs.clone()));
    let shutdown = CancellationToken::new();

    let heartbeat = heartbeat.then(|| agent.spawn_heartbeat(shutdown.clone()));

    let (messenger, rx) = channel();
    let relay = tokio::spawn(serve_channel(agent.clone(), rx, shutdown.clone()));

    let mut summary = ReplaySummary::default();
    let complete = TabChangeInfo {
        status: Some(TabStatus::Complete),
        ..Default::default()
    };

    for session in sessions {
        summary.sessions += 1;
        let tab = session.tab();
        tabs.upsert(tab.clone());
        agent.on_tab_updated(&complete, &tab);
        agent
            .on_tab_activated(ActiveInfo {
                tab_id: tab.id,
                window_id: tab.window_id,
            })
            .await;

        let mut capture = CaptureAgent::new(
            session.page,
            messenger.for_tab(session.tab_id, session.window_id),
        );
        for (i, event) in session.events.iter().enumerate() {
            if i > 0
                && let Some(gap) = session.event_gap
            {
                tokio::time::sleep(gap).await;
            }
            match capture.handle(event) {
                Handoff::Sent => summary.sent += 1,
                Handoff::Throttled => summary.throttled += 1,
                Handoff::Failed => summary.failed += 1,
            }
        }
        debug!(tab_id = tab.id, "Session replayed");
    }

    // Closing the last messenger ends the channel once it is drained
    drop(messenger);
    let handled = joined(relay.await, "Runtime channel");

    shutdown.cancel();
    if let Some(heartbeat) = heartbeat {
        joined(heartbeat.await, "Heartbeat");
    }
    agent.drain().await;

    info!(handled, "Replay finished");
    summary
}

/// Output of a finished task, or its default if the task panicked
fn joined<T: Default>(result: Result<T, JoinError>, task: &str) -> T {
    result.unwrap_or_else(|e| {
        warn!(task, error = %e, "Replay task failed");
        T::default()
    })
}

pub async fn run(args: ReplayArgs) -> Result<()> {
    let mut config = ConfigLoader::load()?;
    if let Some(endpoint) = &args.endpoint {
        config.collector.endpoint = validate_endpoint(endpoint)?;
    }

    let sessions = read_sessions(&args.file)?;

    if args.dry_run {
        let collector = Arc::new(MemoryCollector::new());
        let summary = replay(&config, sessions, collector.clone(), args.heartbeat).await;
        for envelope in collector.envelopes() {
            println!("{}", serde_json::to_string(&envelope)?);
        }
        eprintln!("{summary}");
    } else {
        info!(endpoint = %config.collector.endpoint, "Replaying to collector");
        let collector = Arc::new(HttpCollector::new(&config.collector)?);
        let summary = replay(&config, sessions, collector, args.heartbeat).await;
        println!("{summary}");
    }
    Ok(())
}

fn read_sessions(path: &Path) -> Result<Vec<PageSession>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    parse_sessions(&contents).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lat_core::kinds;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SESSIONS: &str = r#"
{"tab_id": 7, "window_id": 1, "page": {"url": "https://example.com/settings", "title": "Settings", "labels": {"submit-btn": "Save changes"}}, "events": [{"type": "click", "target": {"tag_name": "BUTTON", "type": "submit", "id": "submit-btn", "text": "Save"}}, {"type": "scroll"}, {"type": "scroll"}]}

{"tab_id": 8, "window_id": 1, "page": {"url": "chrome://settings/", "title": "Settings"}, "events": [{"type": "visibilitychange"}]}
"#;

    #[test]
    fn test_parse_sessions_skips_blank_lines() {
        let sessions = parse_sessions(SESSIONS).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].events.len(), 3);
        assert_eq!(sessions[0].page.labels["submit-btn"], "Save changes");
        assert!(sessions[1].event_gap.is_none());
    }

    #[test]
    fn test_parse_sessions_reports_line() {
        let err = parse_sessions("\n{\"tab_id\": 1}\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_read_sessions_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SESSIONS}").unwrap();
        assert_eq!(read_sessions(file.path()).unwrap().len(), 2);
        assert!(read_sessions(Path::new("/nonexistent/sessions.jsonl")).is_err());
    }

    #[tokio::test]
    async fn test_panicked_task_falls_back_to_default() {
        let ok = tokio::spawn(async { 4usize });
        assert_eq!(joined(ok.await, "ok"), 4);

        let panicked = tokio::spawn(async {
            panic!("task blew up");
            #[allow(unreachable_code)]
            7usize
        });
        assert_eq!(joined(panicked.await, "panicked"), 0);
    }

    #[tokio::test]
    async fn test_replay_through_pipeline() {
        let collector = Arc::new(MemoryCollector::new());
        let summary = replay(
            &LatConfig::default(),
            parse_sessions(SESSIONS).unwrap(),
            collector.clone(),
            false,
        )
        .await;

        // Second scroll lands inside the one-second gate
        assert_eq!(
            summary,
            ReplaySummary {
                sessions: 2,
                sent: 3,
                throttled: 1,
                failed: 0,
            }
        );

        let envelopes = collector.envelopes();
        let count = |kind: &str| envelopes.iter().filter(|e| e.kind == kind).count();

        // The privileged tab produces no lifecycle envelopes, but its
        // page-side events still flow
        assert_eq!(count(kinds::PAGE_LOADED), 1);
        assert_eq!(count(kinds::TAB_ACTIVATED), 1);
        assert_eq!(count("click"), 1);
        assert_eq!(count("scroll"), 1);
        assert_eq!(count("visibilitychange"), 1);
        assert_eq!(count(kinds::HEARTBEAT), 0);

        let click = envelopes.iter().find(|e| e.kind == "click").unwrap();
        assert_eq!(click.payload.tab_id, Some(7));
        let record = click.payload.dom_event.as_ref().unwrap();
        assert_eq!(record["element_label"], "Save changes");
        assert_eq!(record["value_preview"], "Save");
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_with_heartbeat_and_gaps() {
        let line = r#"{"tab_id": 2, "page": {"url": "https://example.com/"}, "event_gap": "20s", "events": [{"type": "focus"}, {"type": "blur"}, {"type": "focus"}]}"#;
        let collector = Arc::new(MemoryCollector::new());
        let config = LatConfig::default();

        let summary = replay(&config, parse_sessions(line).unwrap(), collector.clone(), true).await;

        assert_eq!(summary.sent, 3);
        // 40s of gaps covers exactly one 30s heartbeat
        let heartbeats = collector
            .envelopes()
            .iter()
            .filter(|e| e.is_heartbeat())
            .count();
        assert_eq!(heartbeats, 1);
    }
}
