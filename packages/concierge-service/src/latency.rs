//! Per-component latency of external calls and whole chat turns.

use std::{collections::VecDeque, time::Duration};

use dashmap::DashMap;
use serde::Serialize;

pub const TURN: &str = "turn";
/// Calls slower than this are counted and logged as slow.
pub const SLOW_OPERATION: Duration = Duration::from_secs(2);

const MAX_SAMPLES: usize = 512;

#[derive(Debug, Default)]
struct ComponentStats {
	calls: u64,
	timeouts: u64,
	slow_calls: u64,
	total_ms: u64,
	max_ms: u64,
	recent_ms: VecDeque<u64>,
}
impl ComponentStats {
	fn record(&mut self, elapsed_ms: u64, timed_out: bool) {
		self.calls += 1;
		self.total_ms = self.total_ms.saturating_add(elapsed_ms);
		self.max_ms = self.max_ms.max(elapsed_ms);

		if timed_out {
			self.timeouts += 1;
		}
		if elapsed_ms >= millis(SLOW_OPERATION) {
			self.slow_calls += 1;
		}

		if self.recent_ms.len() == MAX_SAMPLES {
			self.recent_ms.pop_front();
		}

		self.recent_ms.push_back(elapsed_ms);
	}

	/// Nearest-rank percentile over the retained samples.
	fn percentile(&self, pct: u64) -> u64 {
		let mut sorted = self.recent_ms.iter().copied().collect::<Vec<_>>();

		if sorted.is_empty() {
			return 0;
		}

		sorted.sort_unstable();

		let rank = (sorted.len() as u64 * pct).div_ceil(100).max(1) as usize;

		sorted[rank.min(sorted.len()) - 1]
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentLatency {
	pub component: &'static str,
	pub calls: u64,
	pub timeouts: u64,
	pub slow_calls: u64,
	pub avg_ms: u64,
	pub p95_ms: u64,
	pub max_ms: u64,
}

#[derive(Debug, Default)]
pub struct LatencyMonitor {
	components: DashMap<&'static str, ComponentStats>,
}
impl LatencyMonitor {
	pub fn record(&self, component: &'static str, elapsed: Duration, timed_out: bool) {
		let elapsed_ms = millis(elapsed);

		self.components.entry(component).or_default().record(elapsed_ms, timed_out);

		if elapsed >= SLOW_OPERATION {
			tracing::warn!(component, elapsed_ms, timed_out, "Slow operation detected.");
		}
	}

	/// Sorted by component name.
	pub fn snapshot(&self) -> Vec<ComponentLatency> {
		let mut out = self
			.components
			.iter()
			.map(|entry| {
				let stats = entry.value();

				ComponentLatency {
					component: *entry.key(),
					calls: stats.calls,
					timeouts: stats.timeouts,
					slow_calls: stats.slow_calls,
					avg_ms: stats.total_ms.checked_div(stats.calls).unwrap_or(0),
					p95_ms: stats.percentile(95),
					max_ms: stats.max_ms,
				}
			})
			.collect::<Vec<_>>();

		out.sort_by_key(|latency| latency.component);

		out
	}
}

pub fn millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
