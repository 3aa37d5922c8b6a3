use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::{BatchId, ControlFrame, JobId};

const GLOBAL_CHANNEL: &str = "updates";
const BATCH_PREFIX: &str = "batch:";
const JOB_PREFIX: &str = "job:";

/// Named subscription scope within the multiplexed event stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    /// Every update the server publishes.
    Updates,
    Batch(BatchId),
    Job(JobId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Updates => f.write_str(GLOBAL_CHANNEL),
            Channel::Batch(id) => write!(f, "{BATCH_PREFIX}{id}"),
            Channel::Job(id) => write!(f, "{JOB_PREFIX}{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised channel name {0:?}")]
pub struct ChannelParseError(pub String);

impl FromStr for Channel {
    type Err = ChannelParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw == GLOBAL_CHANNEL {
            return Ok(Channel::Updates);
        }
        let parsed = if let Some(id) = raw.strip_prefix(BATCH_PREFIX) {
            (!id.is_empty()).then(|| Channel::Batch(id.to_string()))
        } else if let Some(id) = raw.strip_prefix(JOB_PREFIX) {
            (!id.is_empty()).then(|| Channel::Job(id.to_string()))
        } else {
            None
        };
        parsed.ok_or_else(|| ChannelParseError(raw.to_string()))
    }
}

/// Desired channel set for one connection.
///
/// While the link is live, changes produce the incremental control frame to
/// send. While it is down they only edit the set; the next handshake carries
/// the whole set, so nothing has to be replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionRegistry {
    desired: BTreeSet<Channel>,
}

impl SubscriptionRegistry {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            desired: channels.into_iter().collect(),
        }
    }

    pub fn subscribe(&mut self, channel: Channel, live: bool) -> Option<ControlFrame> {
        let name = channel.to_string();
        let added = self.desired.insert(channel);
        (added && live).then_some(ControlFrame::Subscribe { channel: name })
    }

    pub fn unsubscribe(&mut self, channel: &Channel, live: bool) -> Option<ControlFrame> {
        let removed = self.desired.remove(channel);
        (removed && live).then(|| ControlFrame::Unsubscribe {
            channel: channel.to_string(),
        })
    }

    pub fn contains(&self, channel: &Channel) -> bool {
        self.desired.contains(channel)
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.desired.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }

    /// Comma-separated list for the handshake query.
    pub fn handshake_param(&self) -> String {
        join_channels(self.desired.iter())
    }
}

pub fn join_channels<'a>(channels: impl IntoIterator<Item = &'a Channel>) -> String {
    channels
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
