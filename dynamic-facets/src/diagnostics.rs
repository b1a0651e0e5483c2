use crate::config::DiscoveryStrategy;
use serde::Serialize;
use std::fmt;

/// Where the facet list of a regeneration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetSource {
    /// A discovery pass that ran for this query.
    Discovery(DiscoveryStrategy),
    /// The per-query cache.
    Cache,
    /// Discovery failed; the query went through without generated facets.
    Fallback,
}

/// Timings of one regeneration round trip, reported on the next successful
/// query when diagnostics are enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsReport {
    pub query: String,
    pub source: FacetSource,
    pub facets: usize,
    /// From the intercepted query to the success of its replay.
    pub total_time_ms: u64,
    /// Scoring of the discovery results.
    pub scan_time_ms: Option<u64>,
    /// From the end of discovery to the success of the replay.
    pub replay_time_ms: Option<u64>,
    /// Server-side duration of the discovery query.
    pub discovery_query_ms: Option<u64>,
}

impl DiagnosticsReport {
    pub fn from_cache(&self) -> bool {
        self.source == FacetSource::Cache
    }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timer (ALL)             => {}ms", self.total_time_ms)?;
        if let Some(scan) = self.scan_time_ms {
            writeln!(f, "Timer (ParsingResults)  => {scan}ms")?;
        }
        if let Some(replay) = self.replay_time_ms {
            writeln!(f, "Timer (Re-Execute)      => {replay}ms")?;
        }
        match self.source {
            FacetSource::Cache => {
                writeln!(f, "FROM FACET CACHE")?;
                write!(f, "Duration Facets Query => 0")?;
            }
            FacetSource::Fallback => {
                writeln!(f, "DISCOVERY FAILED")?;
                write!(f, "Duration Facets Query => N/A")?;
            }
            FacetSource::Discovery(_) => match self.discovery_query_ms {
                Some(duration) => write!(f, "Duration Facets Query => {duration}ms")?,
                None => write!(f, "Duration Facets Query => N/A")?,
            },
        }
        Ok(())
    }
}
