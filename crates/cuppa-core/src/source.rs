//! Item source: one reachability probe per image, strictly one after another.

use crate::{gen_id, Error, Item};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;

pub const DEFAULT_BASE_URL: &str = "https://coffee.alexflipnote.dev";
pub const DEFAULT_USER_AGENT: &str = concat!("cuppa/", env!("CARGO_PKG_VERSION"));

/// Confirms an address answers. The response body is never looked at.
pub trait Probe: Send + Sync {
    fn probe(&self, url: &str) -> anyhow::Result<()>;
}

impl<F> Probe for F
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    fn probe(&self, url: &str) -> anyhow::Result<()> {
        self(url)
    }
}

/// Parses a user-typed batch size.
pub fn parse_count(raw: &str) -> Result<NonZeroUsize, Error> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| Error::InvalidCount(raw.to_string()))
}

// Hands out strictly increasing timestamps plus a sequence number for filenames.
#[derive(Default)]
struct Stamper {
    last: Option<OffsetDateTime>,
    seq: u64,
}

impl Stamper {
    fn next(&mut self) -> (OffsetDateTime, u64) {
        let mut now = OffsetDateTime::now_utc();
        if let Some(last) = self.last {
            if now <= last {
                now = last + time::Duration::nanoseconds(1);
            }
        }
        self.last = Some(now);
        self.seq += 1;
        (now, self.seq)
    }
}

pub struct ItemSource<P> {
    base_url: String,
    probe: Arc<P>,
    stamps: Arc<Mutex<Stamper>>,
}

impl<P> Clone for ItemSource<P> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            probe: Arc::clone(&self.probe),
            stamps: Arc::clone(&self.stamps),
        }
    }
}

impl<P: Probe> ItemSource<P> {
    pub fn new<S: Into<String>>(base_url: S, probe: P) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            probe: Arc::new(probe),
            stamps: Arc::new(Mutex::new(Stamper::default())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> String {
        format!("{}/random", self.base_url)
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Fetches `count` items in request order. The first failed probe abandons the whole
    /// batch; nothing fetched before it is returned.
    pub fn fetch_batch(&self, count: NonZeroUsize) -> Result<Vec<Item>, Error> {
        let count = count.get();
        let mut batch = Vec::with_capacity(count);
        for index in 1..=count {
            let (added_at, seq) = self.stamps.lock().expect("poisoned").next();
            let url = format!(
                "{}?t={}-{}",
                self.endpoint(),
                added_at.unix_timestamp_nanos(),
                seq
            );
            if let Err(e) = self.probe.probe(&url) {
                tracing::warn!(index, count, %url, error = %e, "probe failed, dropping batch");
                return Err(Error::Unreachable {
                    index,
                    count,
                    url,
                    reason: format!("{:#}", e),
                });
            }
            tracing::debug!(index, count, %url, "probe ok");
            let millis = added_at.unix_timestamp_nanos() / 1_000_000;
            batch.push(Item {
                id: gen_id(),
                source_url: url.clone(),
                display_url: url,
                filename: format!("coffee-{}-{}.jpg", millis, seq),
                added_at,
            });
        }
        tracing::info!(count, "batch fetched");
        Ok(batch)
    }
}

#[cfg(feature = "http")]
mod http {
    use super::Probe;
    use std::time::Duration;

    /// Blocking GET through a shared `ureq` agent.
    pub struct HttpProbe {
        agent: ureq::Agent,
    }

    impl HttpProbe {
        pub fn new(user_agent: &str, timeout: Option<Duration>) -> Self {
            let mut builder = ureq::AgentBuilder::new().user_agent(user_agent);
            if let Some(t) = timeout {
                builder = builder.timeout(t);
            }
            Self {
                agent: builder.build(),
            }
        }
    }

    impl Default for HttpProbe {
        fn default() -> Self {
            Self::new(super::DEFAULT_USER_AGENT, None)
        }
    }

    impl Probe for HttpProbe {
        fn probe(&self, url: &str) -> anyhow::Result<()> {
            match self.agent.get(url).call() {
                Ok(resp) => {
                    tracing::trace!(url, status = resp.status(), "probe response");
                    Ok(())
                }
                Err(ureq::Error::Status(code, _)) => {
                    anyhow::bail!("upstream answered HTTP {}", code)
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpProbe;
