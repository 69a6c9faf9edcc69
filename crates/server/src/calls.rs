//! Active call tracking
//!
//! Maps Twilio call SIDs to the customer on the line and counts turns.
//! Ending a call also drops the customer's conversation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use loan_advisor_agent::LoanAdvisor;
use loan_advisor_config::TelephonyConfig;

/// One live call
#[derive(Debug, Clone, Serialize)]
pub struct CallSession {
    pub call_sid: String,
    pub customer_phone: String,
    pub conversation_started: bool,
    pub turn_count: u32,
    pub max_turns: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl CallSession {
    pub fn turns_exhausted(&self) -> bool {
        self.turn_count >= self.max_turns
    }
}

/// Registry of live calls
pub struct CallRegistry {
    calls: RwLock<HashMap<String, CallSession>>,
    advisor: Arc<LoanAdvisor>,
    max_turns: u32,
    idle_timeout: Duration,
    cleanup_interval: Duration,
}

impl CallRegistry {
    pub fn new(
        advisor: Arc<LoanAdvisor>,
        max_turns: u32,
        idle_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            advisor,
            max_turns,
            idle_timeout,
            cleanup_interval,
        }
    }

    pub fn from_config(config: &TelephonyConfig, advisor: Arc<LoanAdvisor>) -> Self {
        Self::new(
            advisor,
            config.max_turns,
            Duration::from_secs(config.call_idle_timeout_secs),
            Duration::from_secs(config.cleanup_interval_secs.max(1)),
        )
    }

    /// Register a call; a repeated SID replaces the old entry
    pub fn start_call(&self, call_sid: &str, customer_phone: &str) -> CallSession {
        let now = Utc::now();
        let session = CallSession {
            call_sid: call_sid.to_string(),
            customer_phone: customer_phone.to_string(),
            conversation_started: false,
            turn_count: 0,
            max_turns: self.max_turns,
            started_at: now,
            last_activity: now,
        };

        self.calls.write().insert(call_sid.to_string(), session.clone());
        metrics::counter!("loan_advisor_calls_total", "event" => "started").increment(1);
        tracing::info!(call_sid = %call_sid, phone = %customer_phone, "Call registered");
        session
    }

    pub fn mark_conversation_started(&self, call_sid: &str) {
        if let Some(call) = self.calls.write().get_mut(call_sid) {
            call.conversation_started = true;
            call.last_activity = Utc::now();
        }
    }

    pub fn get(&self, call_sid: &str) -> Option<CallSession> {
        self.calls.read().get(call_sid).cloned()
    }

    /// Count a customer turn, returning the updated session
    pub fn record_turn(&self, call_sid: &str) -> Option<CallSession> {
        let mut calls = self.calls.write();
        let call = calls.get_mut(call_sid)?;
        call.turn_count += 1;
        call.last_activity = Utc::now();
        Some(call.clone())
    }

    pub fn touch(&self, call_sid: &str) {
        if let Some(call) = self.calls.write().get_mut(call_sid) {
            call.last_activity = Utc::now();
        }
    }

    /// Forget a call, and its conversation once no other call uses that phone
    pub fn end_call(&self, call_sid: &str) -> Option<CallSession> {
        let (removed, phone_in_use) = {
            let mut calls = self.calls.write();
            let removed = calls.remove(call_sid);
            let phone_in_use = removed.as_ref().is_some_and(|call| {
                calls
                    .values()
                    .any(|other| other.customer_phone == call.customer_phone)
            });
            (removed, phone_in_use)
        };

        if let Some(call) = &removed {
            if phone_in_use {
                tracing::debug!(call_sid = %call_sid, "Conversation kept for another call");
            } else {
                self.advisor.end_conversation(&call.customer_phone);
            }
            metrics::counter!("loan_advisor_calls_total", "event" => "ended").increment(1);
            tracing::info!(
                call_sid = %call_sid,
                turns = call.turn_count,
                duration_secs = (Utc::now() - call.started_at).num_seconds(),
                "Call ended"
            );
        }
        removed
    }

    /// All live calls, oldest first
    pub fn list(&self) -> Vec<CallSession> {
        let mut calls: Vec<CallSession> = self.calls.read().values().cloned().collect();
        calls.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        calls
    }

    pub fn count(&self) -> usize {
        self.calls.read().len()
    }

    /// End calls idle longer than the timeout; returns how many
    pub fn cleanup_expired(&self) -> usize {
        let idle = chrono::Duration::from_std(self.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        let cutoff = Utc::now() - idle;

        let stale: Vec<String> = self
            .calls
            .read()
            .values()
            .filter(|call| call.last_activity < cutoff)
            .map(|call| call.call_sid.clone())
            .collect();

        for sid in &stale {
            tracing::info!(call_sid = %sid, "Expiring stale call");
            self.end_call(sid);
        }
        stale.len()
    }

    /// Periodically expire idle calls until the returned sender fires
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);
        let interval = registry.cleanup_interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let removed = registry.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(
                                removed,
                                remaining = registry.count(),
                                "Call cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Call cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }
}
