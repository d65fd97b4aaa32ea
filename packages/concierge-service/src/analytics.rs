use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use concierge_domain::text;

use crate::latency::{ComponentLatency, LatencyMonitor};

const SATISFACTION_KEYWORDS: &[&str] = &[
	"gracias", "genial", "excelente", "perfecto", "buenisimo", "thanks", "thank you", "great",
	"perfect", "awesome",
];
const CONVERSION_KEYWORDS: &[&str] = &[
	"comprar", "inscrib", "matricul", "precio", "disponib", "buy", "purchase", "enroll", "price",
	"available",
];

/// Process-wide conversation counters and latency. Reset on restart.
#[derive(Debug, Default)]
pub struct Analytics {
	total_messages: AtomicU64,
	satisfaction_signals: AtomicU64,
	conversion_signals: AtomicU64,
	pub latency: LatencyMonitor,
}
impl Analytics {
	pub fn record_message(&self, message: &str) {
		self.total_messages.fetch_add(1, Ordering::Relaxed);

		if text::mentions_any(message, SATISFACTION_KEYWORDS) {
			self.satisfaction_signals.fetch_add(1, Ordering::Relaxed);
		}
		if text::mentions_any(message, CONVERSION_KEYWORDS) {
			self.conversion_signals.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub fn snapshot(&self) -> AnalyticsSnapshot {
		AnalyticsSnapshot {
			total_messages: self.total_messages.load(Ordering::Relaxed),
			satisfaction_signals: self.satisfaction_signals.load(Ordering::Relaxed),
			conversion_signals: self.conversion_signals.load(Ordering::Relaxed),
			latency: self.latency.snapshot(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalyticsSnapshot {
	pub total_messages: u64,
	pub satisfaction_signals: u64,
	pub conversion_signals: u64,
	pub latency: Vec<ComponentLatency>,
}
