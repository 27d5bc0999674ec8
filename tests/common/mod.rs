//! Common test utilities
//!
//! Scripted collaborators for the tracker seams and builders for NHC feed
//! documents.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use stormwatch::config::Config;
use stormwatch::feed::{DocumentFetcher, FetchedDocument};
use stormwatch::models::{CandidateCyclone, Cyclone, SchedulerToken};
use stormwatch::notifications::{ChannelResult, DeliveryStatus, NotificationSink, Notifier};
use stormwatch::tracker::{
    Clock, CycloneRegistry, SchedulerContext, SchedulerSettings, TrackingCoordinator,
};
use stormwatch::utils::error::FetchError;

pub const BASIN_URL: &str = "https://www.nhc.noaa.gov/index-at.xml";

// ============================================================================
// Fetcher
// ============================================================================

/// A canned fetch response
#[derive(Debug, Clone)]
pub enum Reply {
    Document(FetchedDocument),
    NotModified,
    NotFound,
    ServerError(u16),
}

impl Reply {
    pub fn body(body: impl Into<String>) -> Self {
        Self::Document(FetchedDocument::new(body))
    }

    fn into_result(self, url: &str) -> Result<FetchedDocument, FetchError> {
        match self {
            Self::Document(doc) => Ok(doc),
            Self::NotModified => Err(FetchError::NotModified),
            Self::NotFound => Err(FetchError::NotFound(url.to_string())),
            Self::ServerError(code) => Err(FetchError::ServerError(code)),
        }
    }
}

/// Holds the next `validate()` call until released
#[derive(Default)]
pub struct ValidationGate {
    /// Notified once the held call has started
    pub entered: Notify,
    pub release: Notify,
}

/// Fetcher answering from per-URL reply queues
///
/// The last reply of a queue repeats forever; unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    invalid: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
    gate: Mutex<Option<Arc<ValidationGate>>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, url: &str, replies: impl IntoIterator<Item = Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into_iter().collect());
    }

    pub fn reject(&self, url: &str) {
        self.invalid.lock().unwrap().insert(url.to_string());
    }

    /// Block the next `validate()` call until `release` is notified
    pub fn hold_validation(&self) -> Arc<ValidationGate> {
        let gate = Arc::new(ValidationGate::default());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Every fetch so far as `(url, if-modified-since token)`
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|(u, _)| u == url).count()
    }
}

#[async_trait]
impl DocumentFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<&str>,
    ) -> Result<FetchedDocument, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), last_modified.map(str::to_string)));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        reply.unwrap_or(Reply::NotFound).into_result(url)
    }

    async fn validate(&self, url: &str) -> Result<(), FetchError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        if self.invalid.lock().unwrap().contains(url) {
            Err(FetchError::Validation {
                url: url.to_string(),
                reason: "status 404".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Sink and clock
// ============================================================================

/// Sink that keeps every post
#[derive(Default)]
pub struct RecordingSink {
    posts: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, destination: &str, text: &str) -> ChannelResult<DeliveryStatus> {
        self.posts
            .lock()
            .unwrap()
            .push((destination.to_string(), text.to_string()));
        Ok(DeliveryStatus::delivered("recording", destination))
    }
}

/// Clock pinned to one instant
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 2022-09-27 14:00 EDT
pub fn reference_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 9, 27, 18, 0, 0).unwrap()
}

// ============================================================================
// Wiring
// ============================================================================

pub fn notifier(sink: Arc<RecordingSink>) -> Arc<Notifier> {
    Arc::new(Notifier::new(sink, chrono_tz::America::New_York).with_destination("storm-updates"))
}

pub fn context(
    fetcher: Arc<ScriptedFetcher>,
    sink: Arc<RecordingSink>,
    config: &Config,
) -> SchedulerContext {
    SchedulerContext {
        registry: CycloneRegistry::new(config.schedule.blacklist_purge_cycles),
        fetcher,
        notifier: notifier(sink),
        clock: Arc::new(FixedClock(reference_instant())),
        settings: SchedulerSettings::from_config(config),
    }
}

pub fn coordinator(fetcher: Arc<ScriptedFetcher>, sink: Arc<RecordingSink>) -> TrackingCoordinator {
    TrackingCoordinator::from_config(
        &Config::default(),
        fetcher,
        notifier(sink),
        Arc::new(FixedClock(reference_instant())),
    )
}

pub fn advisory_url(wallet: &str) -> String {
    format!("https://www.nhc.noaa.gov/xml/TCP{wallet}.xml")
}

/// Registry record for a storm owned by `token`
pub fn tracked(storm: &Storm, token: SchedulerToken, ignore_strength: bool) -> Cyclone {
    let mut cyclone = Cyclone::from_candidate(
        CandidateCyclone {
            atcf: storm.atcf.to_string(),
            name: storm.name.to_lowercase(),
            strength: storm.strength.to_string(),
            advisory_url: advisory_url(storm.wallet),
            image_url: format!("https://www.nhc.noaa.gov/storm_graphics/{}_cone.png", storm.atcf),
        },
        10,
        ignore_strength,
    );
    cyclone.scheduler = Some(token);
    cyclone
}

// ============================================================================
// Documents
// ============================================================================

/// One active storm in a basin feed
#[derive(Debug, Clone, Copy)]
pub struct Storm {
    pub atcf: &'static str,
    pub name: &'static str,
    pub strength: &'static str,
    pub wallet: &'static str,
}

pub const IAN: Storm = Storm {
    atcf: "AL092022",
    name: "Ian",
    strength: "Hurricane",
    wallet: "AT4",
};

pub const ELEVEN: Storm = Storm {
    atcf: "AL112022",
    name: "Eleven",
    strength: "Tropical Depression",
    wallet: "AT5",
};

pub const JULIA: Storm = Storm {
    atcf: "AL132022",
    name: "Julia",
    strength: "Tropical Storm",
    wallet: "AT3",
};

/// Basin feed listing `storms`, each with a graphics item under `image_base`
pub fn basin_xml(storms: &[Storm], image_base: &str) -> String {
    let mut items = String::new();

    for storm in storms {
        items.push_str(&format!(
            r#"
    <item>
      <title>{strength} {name}</title>
      <nhc:Cyclone>
        <nhc:center>26.5, -82.4</nhc:center>
        <nhc:type>{strength}</nhc:type>
        <nhc:name>{name}</nhc:name>
        <nhc:wallet>{wallet}</nhc:wallet>
        <nhc:atcf>{atcf}</nhc:atcf>
      </nhc:Cyclone>
    </item>"#,
            strength = storm.strength,
            name = storm.name,
            wallet = storm.wallet,
            atcf = storm.atcf,
        ));
    }

    for storm in storms {
        items.push_str(&format!(
            r#"
    <item>
      <title>{strength} {name} Graphics</title>
      <description><![CDATA[<a href="https://www.nhc.noaa.gov/graphics_at4.shtml"><img src="{image_base}/{atcf}_cone_sm2.png" alt="cone"></a>]]></description>
    </item>"#,
            strength = storm.strength,
            name = storm.name,
            atcf = storm.atcf,
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:nhc="https://www.nhc.noaa.gov">
  <channel>
    <title>National Hurricane Center (Atlantic)</title>{items}
  </channel>
</rss>"#
    )
}

/// Advisory feed with the given title and description text
pub fn advisory_xml(title: &str, description: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>{title}</title>
    <item>
      <title>{title}</title>
      <description><![CDATA[<pre>{description}</pre>]]></description>
    </item>
  </channel>
</rss>"#
    )
}

/// Advisory announcing the next bulletin at `time tz`
pub fn advisory_with_next(title: &str, time: &str, tz: &str) -> String {
    advisory_xml(
        title,
        &format!("...IAN MAKES LANDFALL...\nNext complete advisory at {time} {tz}.\n$$"),
    )
}
