//! # Relay Metrics
//!
//! Prometheus counters for the relay engine.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! xc-relay = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `xc_relay_confirmations_total` - Confirmations counted (by source: adapter/recovery)
//! - `xc_relay_deliveries_total` - Threshold deliveries handed to the sink
//! - `xc_relay_rounds_sent_total` - Outbound rounds transmitted
//! - `xc_relay_rounds_underpaid_total` - Outbound rounds parked as underpaid
//! - `xc_relay_rounds_repaid_total` - Underpaid rounds repaid
//! - `xc_relay_messages_failed_total` - Inbound messages recorded as failed
//! - `xc_relay_messages_retried_total` - Failed messages retried successfully

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Confirmations counted, labeled by source
    pub static ref CONFIRMATIONS: IntCounterVec = register_int_counter_vec!(
        "xc_relay_confirmations_total",
        "Total number of confirmations counted",
        &["source"]
    )
    .expect("Failed to create CONFIRMATIONS metric");

    /// Deliveries handed to the sink
    pub static ref DELIVERIES: IntCounter = register_int_counter!(
        "xc_relay_deliveries_total",
        "Total number of threshold deliveries"
    )
    .expect("Failed to create DELIVERIES metric");

    /// Outbound rounds transmitted
    pub static ref ROUNDS_SENT: IntCounter = register_int_counter!(
        "xc_relay_rounds_sent_total",
        "Total number of outbound rounds transmitted"
    )
    .expect("Failed to create ROUNDS_SENT metric");

    /// Outbound rounds parked as underpaid
    pub static ref ROUNDS_UNDERPAID: IntCounter = register_int_counter!(
        "xc_relay_rounds_underpaid_total",
        "Total number of outbound rounds parked as underpaid"
    )
    .expect("Failed to create ROUNDS_UNDERPAID metric");

    /// Underpaid rounds repaid
    pub static ref ROUNDS_REPAID: IntCounter = register_int_counter!(
        "xc_relay_rounds_repaid_total",
        "Total number of underpaid rounds repaid"
    )
    .expect("Failed to create ROUNDS_REPAID metric");

    /// Inbound messages recorded as failed
    pub static ref MESSAGES_FAILED: IntCounter = register_int_counter!(
        "xc_relay_messages_failed_total",
        "Total number of inbound messages recorded as failed"
    )
    .expect("Failed to create MESSAGES_FAILED metric");

    /// Failed messages retried successfully
    pub static ref MESSAGES_RETRIED: IntCounter = register_int_counter!(
        "xc_relay_messages_retried_total",
        "Total number of failed messages retried successfully"
    )
    .expect("Failed to create MESSAGES_RETRIED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a confirmation
#[cfg(feature = "metrics")]
pub fn record_confirmation(recovered: bool) {
    let source = if recovered { "recovery" } else { "adapter" };
    CONFIRMATIONS.with_label_values(&[source]).inc();
}

/// Record a delivery
#[cfg(feature = "metrics")]
pub fn record_delivery() {
    DELIVERIES.inc();
}

/// Record a transmitted round
#[cfg(feature = "metrics")]
pub fn record_round_sent() {
    ROUNDS_SENT.inc();
}

/// Record an underpaid round
#[cfg(feature = "metrics")]
pub fn record_round_underpaid() {
    ROUNDS_UNDERPAID.inc();
}

/// Record a repaid round
#[cfg(feature = "metrics")]
pub fn record_round_repaid() {
    ROUNDS_REPAID.inc();
}

/// Record a failed inbound message
#[cfg(feature = "metrics")]
pub fn record_message_failed() {
    MESSAGES_FAILED.inc();
}

/// Record a successful retry
#[cfg(feature = "metrics")]
pub fn record_message_retried() {
    MESSAGES_RETRIED.inc();
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_confirmation(_recovered: bool) {}

#[cfg(not(feature = "metrics"))]
pub fn record_delivery() {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_sent() {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_underpaid() {}

#[cfg(not(feature = "metrics"))]
pub fn record_round_repaid() {}

#[cfg(not(feature = "metrics"))]
pub fn record_message_failed() {}

#[cfg(not(feature = "metrics"))]
pub fn record_message_retried() {}
