//! Process-global usage counters and recent-request ring.
//!
//! The global plane of the usage recorder: atomic counters by category
//! and token plus a small mutex-guarded history ring. Per-payer usage
//! lives in the payer's shard. All updates are best effort and happen
//! off the response path.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ring capacity.
const RING_CAPACITY: usize = 100;

/// One settled request in the history ring.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRequest {
    pub endpoint: String,
    pub category: String,
    pub token: String,
    pub amount: String,
    pub status: u16,
    pub at: i64,
}

/// Global usage and revenue counters.
#[derive(Default)]
pub struct GatewayMetrics {
    total_requests: AtomicU64,
    settled_requests: AtomicU64,
    failed_payments: AtomicU64,
    requests_by_category: Mutex<HashMap<String, u64>>,
    revenue_by_token: Mutex<HashMap<String, u128>>,
    ring: Mutex<VecDeque<RecentRequest>>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts any request entering the dispatcher.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a payment that failed settlement or classification.
    pub fn record_payment_failure(&self) {
        self.failed_payments.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one settled, paid request.
    pub fn record_settled(
        &self,
        endpoint: &str,
        category: &str,
        token: &str,
        amount: u128,
        status: u16,
    ) {
        self.settled_requests.fetch_add(1, Ordering::Relaxed);
        *self
            .requests_by_category
            .lock()
            .entry(category.to_string())
            .or_insert(0) += 1;
        *self
            .revenue_by_token
            .lock()
            .entry(token.to_string())
            .or_insert(0) += amount;

        let mut ring = self.ring.lock();
        if ring.len() >= RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(RecentRequest {
            endpoint: endpoint.to_string(),
            category: category.to_string(),
            token: token.to_string(),
            amount: amount.to_string(),
            status,
            at: chrono::Utc::now().timestamp(),
        });
    }

    /// Point-in-time snapshot for the health/root endpoints.
    pub fn snapshot(&self) -> Value {
        let by_category: HashMap<String, u64> = self.requests_by_category.lock().clone();
        let revenue: HashMap<String, String> = self
            .revenue_by_token
            .lock()
            .iter()
            .map(|(token, amount)| (token.clone(), amount.to_string()))
            .collect();
        let recent: Vec<RecentRequest> = self.ring.lock().iter().cloned().collect();

        json!({
            "totalRequests": self.total_requests.load(Ordering::Relaxed),
            "settledRequests": self.settled_requests.load(Ordering::Relaxed),
            "failedPayments": self.failed_payments.load(Ordering::Relaxed),
            "requestsByCategory": by_category,
            "revenueByToken": revenue,
            "recent": recent,
        })
    }
}
