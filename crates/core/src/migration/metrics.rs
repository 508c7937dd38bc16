//! Migration metrics: usage counters, response-time samples, fallbacks,
//! errors and the alerts derived from them.
//!
//! One [`MigrationMetrics`] is built at startup and shared by `Arc` between
//! the router and the monitoring endpoints. Alert rules are re-evaluated for
//! the affected API after every `record_*` call.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::alert::{
    message_prefix, AlertSeverity, AlertType, MigrationAlert, SeverityThresholds,
    ERROR_RATE_THRESHOLDS, FALLBACK_RATE_THRESHOLDS, RESPONSE_TIME_THRESHOLDS,
};
use crate::migration::{ApiName, Variant};

/// Response-time samples kept per API per path.
pub const MAX_RESPONSE_SAMPLES: usize = 100;

/// Rate alerts are only evaluated once an API has seen more requests than this.
pub const MIN_REQUESTS_FOR_RATE_ALERTS: u64 = 10;

// ---------------------------------------------------------------------------
// Counter containers
// ---------------------------------------------------------------------------

/// One value per tracked API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCounters<T> {
    pub submit_checklist: T,
    pub save_anomalies: T,
    pub init_checklist: T,
    pub load_checklist: T,
}

impl<T> ApiCounters<T> {
    pub fn get(&self, api: ApiName) -> &T {
        match api {
            ApiName::SubmitChecklist => &self.submit_checklist,
            ApiName::SaveAnomalies => &self.save_anomalies,
            ApiName::InitChecklist => &self.init_checklist,
            ApiName::LoadChecklist => &self.load_checklist,
        }
    }

    pub fn get_mut(&mut self, api: ApiName) -> &mut T {
        match api {
            ApiName::SubmitChecklist => &mut self.submit_checklist,
            ApiName::SaveAnomalies => &mut self.save_anomalies,
            ApiName::InitChecklist => &mut self.init_checklist,
            ApiName::LoadChecklist => &mut self.load_checklist,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApiName, &T)> {
        ApiName::ALL.into_iter().map(move |api| (api, self.get(api)))
    }

    fn map<U>(&self, f: impl Fn(ApiName, &T) -> U) -> ApiCounters<U> {
        ApiCounters {
            submit_checklist: f(ApiName::SubmitChecklist, &self.submit_checklist),
            save_anomalies: f(ApiName::SaveAnomalies, &self.save_anomalies),
            init_checklist: f(ApiName::InitChecklist, &self.init_checklist),
            load_checklist: f(ApiName::LoadChecklist, &self.load_checklist),
        }
    }
}

/// One [`ApiCounters`] per code path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathCounters<T> {
    pub ddd: ApiCounters<T>,
    pub legacy: ApiCounters<T>,
}

impl<T> PathCounters<T> {
    pub fn get(&self, variant: Variant) -> &ApiCounters<T> {
        match variant {
            Variant::Ddd => &self.ddd,
            Variant::Legacy => &self.legacy,
        }
    }

    pub fn get_mut(&mut self, variant: Variant) -> &mut ApiCounters<T> {
        match variant {
            Variant::Ddd => &mut self.ddd,
            Variant::Legacy => &mut self.legacy,
        }
    }
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub usage: PathCounters<u64>,
    /// Recent response times in milliseconds, oldest first.
    pub performance: PathCounters<Vec<u64>>,
    pub fallbacks: ApiCounters<u64>,
    pub errors: PathCounters<u64>,
    /// Percentages rounded to two decimals.
    pub error_rates: PathCounters<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStats {
    pub total_requests: u64,
    pub ddd_requests: u64,
    pub legacy_requests: u64,
    pub adoption_rate: f64,
    pub avg_ddd_response_ms: f64,
    pub avg_legacy_response_ms: f64,
    pub avg_performance_improvement: f64,
    pub total_fallbacks: u64,
    pub fallback_rate: f64,
}

// ---------------------------------------------------------------------------
// MigrationMetrics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MetricsState {
    usage: PathCounters<u64>,
    samples: PathCounters<VecDeque<u64>>,
    fallbacks: ApiCounters<u64>,
    errors: PathCounters<u64>,
    alerts: Vec<MigrationAlert>,
}

impl MetricsState {
    /// Attempts on the DDD path, including those that fell back.
    fn ddd_attempts(&self, api: ApiName) -> u64 {
        self.usage.ddd.get(api) + self.fallbacks.get(api)
    }

    fn requests(&self, api: ApiName, variant: Variant) -> u64 {
        match variant {
            Variant::Ddd => self.ddd_attempts(api),
            Variant::Legacy => *self.usage.legacy.get(api),
        }
    }

    fn error_rate(&self, api: ApiName, variant: Variant) -> f64 {
        rate(*self.errors.get(variant).get(api), self.requests(api, variant))
    }

    fn fallback_rate(&self, api: ApiName) -> f64 {
        rate(*self.fallbacks.get(api), self.ddd_attempts(api))
    }
}

#[derive(Debug, Default)]
pub struct MigrationMetrics {
    state: Mutex<MetricsState>,
}

impl MigrationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_ddd_usage(&self, api: ApiName, response_ms: u64) {
        self.record_usage(api, Variant::Ddd, response_ms);
    }

    pub fn record_legacy_usage(&self, api: ApiName, response_ms: u64) {
        self.record_usage(api, Variant::Legacy, response_ms);
    }

    fn record_usage(&self, api: ApiName, variant: Variant, response_ms: u64) {
        let mut state = self.lock();
        *state.usage.get_mut(variant).get_mut(api) += 1;
        let samples = state.samples.get_mut(variant).get_mut(api);
        samples.push_back(response_ms);
        while samples.len() > MAX_RESPONSE_SAMPLES {
            samples.pop_front();
        }
        evaluate_alerts(&mut state, api);
    }

    pub fn record_fallback(&self, api: ApiName) {
        let mut state = self.lock();
        *state.fallbacks.get_mut(api) += 1;
        evaluate_alerts(&mut state, api);
    }

    pub fn record_error(&self, api: ApiName, variant: Variant) {
        let mut state = self.lock();
        *state.errors.get_mut(variant).get_mut(api) += 1;
        evaluate_alerts(&mut state, api);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let to_vec =
            |_: ApiName, samples: &VecDeque<u64>| -> Vec<u64> { samples.iter().copied().collect() };
        let error_rates = |variant: Variant| {
            state
                .errors
                .get(variant)
                .map(|api, _| round2(state.error_rate(api, variant)))
        };
        MetricsSnapshot {
            usage: state.usage.clone(),
            performance: PathCounters {
                ddd: state.samples.ddd.map(to_vec),
                legacy: state.samples.legacy.map(to_vec),
            },
            fallbacks: state.fallbacks.clone(),
            errors: state.errors.clone(),
            error_rates: PathCounters {
                ddd: error_rates(Variant::Ddd),
                legacy: error_rates(Variant::Legacy),
            },
        }
    }

    pub fn migration_stats(&self) -> MigrationStats {
        let state = self.lock();
        let ddd_requests: u64 = state.usage.ddd.iter().map(|(_, n)| n).sum();
        let legacy_requests: u64 = state.usage.legacy.iter().map(|(_, n)| n).sum();
        let total_requests = ddd_requests + legacy_requests;
        let total_fallbacks: u64 = state.fallbacks.iter().map(|(_, n)| n).sum();

        let avg_ddd = average_all(&state.samples.ddd);
        let avg_legacy = average_all(&state.samples.legacy);
        let improvement = match (avg_ddd, avg_legacy) {
            (Some(ddd), Some(legacy)) if legacy > 0.0 => (legacy - ddd) * 100.0 / legacy,
            _ => 0.0,
        };

        MigrationStats {
            total_requests,
            ddd_requests,
            legacy_requests,
            adoption_rate: round2(rate(ddd_requests, total_requests)),
            avg_ddd_response_ms: round2(avg_ddd.unwrap_or(0.0)),
            avg_legacy_response_ms: round2(avg_legacy.unwrap_or(0.0)),
            avg_performance_improvement: round2(improvement),
            total_fallbacks,
            fallback_rate: round2(rate(total_fallbacks, ddd_requests + total_fallbacks)),
        }
    }

    /// Unresolved alerts, newest first.
    pub fn active_alerts(&self) -> Vec<MigrationAlert> {
        let mut alerts: Vec<_> = self
            .lock()
            .alerts
            .iter()
            .filter(|a| !a.resolved)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    pub fn all_alerts(&self) -> Vec<MigrationAlert> {
        self.lock().alerts.clone()
    }

    /// Mark an alert resolved. Returns `false` when the id is unknown or the
    /// alert was already resolved.
    pub fn resolve_alert(&self, id: Uuid) -> bool {
        let mut state = self.lock();
        match state.alerts.iter_mut().find(|a| a.id == id && !a.resolved) {
            Some(alert) => {
                alert.resolved = true;
                tracing::info!(alert_id = %id, "Migration alert resolved");
                true
            }
            None => false,
        }
    }

    /// Drop every counter, sample and alert.
    pub fn reset(&self) {
        *self.lock() = MetricsState::default();
    }
}

// ---------------------------------------------------------------------------
// Alert rules
// ---------------------------------------------------------------------------

fn evaluate_alerts(state: &mut MetricsState, api: ApiName) {
    for variant in [Variant::Ddd, Variant::Legacy] {
        let samples = state.samples.get(variant).get(api);
        if let Some(avg) = average(samples.iter()) {
            check(
                state,
                AlertType::ResponseTime,
                &RESPONSE_TIME_THRESHOLDS,
                avg,
                format!("Slow {variant} response time for {api}: {avg:.0}ms"),
                json!({ "api": api, "variant": variant, "avg_response_ms": round2(avg) }),
            );
        }

        let requests = state.requests(api, variant);
        if requests > MIN_REQUESTS_FOR_RATE_ALERTS {
            let error_rate = state.error_rate(api, variant);
            check(
                state,
                AlertType::ErrorRate,
                &ERROR_RATE_THRESHOLDS,
                error_rate,
                format!("High {variant} error rate for {api}: {error_rate:.1}%"),
                json!({
                    "api": api,
                    "variant": variant,
                    "error_rate": round2(error_rate),
                    "requests": requests,
                }),
            );
        }
    }

    let attempts = state.ddd_attempts(api);
    if attempts > MIN_REQUESTS_FOR_RATE_ALERTS {
        let fallback_rate = state.fallback_rate(api);
        let details = json!({
            "api": api,
            "fallback_rate": round2(fallback_rate),
            "fallbacks": state.fallbacks.get(api),
            "attempts": attempts,
        });
        check(
            state,
            AlertType::FallbackRate,
            &FALLBACK_RATE_THRESHOLDS,
            fallback_rate,
            format!("High fallback rate for {api}: {fallback_rate:.1}%"),
            details,
        );
    }
}

fn check(
    state: &mut MetricsState,
    alert_type: AlertType,
    thresholds: &SeverityThresholds,
    value: f64,
    message: String,
    details: serde_json::Value,
) {
    if let Some(severity) = thresholds.classify(value) {
        raise(state, alert_type, severity, message, details);
    }
}

/// Add an alert, or refresh an unresolved one with the same type, severity
/// and message prefix.
fn raise(
    state: &mut MetricsState,
    alert_type: AlertType,
    severity: AlertSeverity,
    message: String,
    details: serde_json::Value,
) {
    let now = Utc::now();
    let prefix = message_prefix(&message);
    if let Some(existing) = state.alerts.iter_mut().find(|a| {
        !a.resolved
            && a.alert_type == alert_type
            && a.severity == severity
            && a.message_prefix() == prefix
    }) {
        existing.timestamp = now;
        existing.details = details;
        return;
    }

    tracing::warn!(
        alert_type = ?alert_type,
        severity = severity.as_str(),
        %message,
        "Migration alert raised",
    );
    state.alerts.push(MigrationAlert {
        id: Uuid::new_v4(),
        alert_type,
        severity,
        message,
        details,
        timestamp: now,
        resolved: false,
    });
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

fn rate(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

fn average<'a>(samples: impl Iterator<Item = &'a u64>) -> Option<f64> {
    let (sum, count) = samples.fold((0f64, 0u64), |(sum, count), v| (sum + *v as f64, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean over the samples of every API on one path.
fn average_all(samples: &ApiCounters<VecDeque<u64>>) -> Option<f64> {
    average(samples.iter().flat_map(|(_, s)| s.iter()))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_survive_huge_samples() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::SubmitChecklist, u64::MAX);
        metrics.record_ddd_usage(ApiName::SubmitChecklist, u64::MAX);

        let avg = metrics.migration_stats().avg_ddd_response_ms;
        assert!(avg.is_finite());
        assert!((avg - u64::MAX as f64).abs() / (u64::MAX as f64) < 1e-9);
    }

    #[test]
    fn samples_are_kept_in_order() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::SubmitChecklist, 100);
        metrics.record_ddd_usage(ApiName::SubmitChecklist, 150);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.performance.ddd.submit_checklist, vec![100, 150]);
        assert_eq!(snapshot.usage.ddd.submit_checklist, 2);
    }

    #[test]
    fn samples_are_capped_at_most_recent_hundred() {
        let metrics = MigrationMetrics::new();
        for ms in 0..105 {
            metrics.record_ddd_usage(ApiName::SubmitChecklist, ms);
        }
        let samples = metrics.snapshot().performance.ddd.submit_checklist;
        assert_eq!(samples.len(), MAX_RESPONSE_SAMPLES);
        assert_eq!(samples.first(), Some(&5));
        assert_eq!(samples.last(), Some(&104));
        assert_eq!(metrics.snapshot().usage.ddd.submit_checklist, 105);
    }

    #[test]
    fn adoption_and_improvement() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::SubmitChecklist, 100);
        metrics.record_ddd_usage(ApiName::SaveAnomalies, 150);
        metrics.record_legacy_usage(ApiName::SubmitChecklist, 200);
        metrics.record_legacy_usage(ApiName::InitChecklist, 250);
        metrics.record_legacy_usage(ApiName::LoadChecklist, 300);

        let stats = metrics.migration_stats();
        assert_eq!(stats.total_requests, 5);
        assert_eq!(stats.ddd_requests, 2);
        assert_eq!(stats.adoption_rate, 40.0);
        assert_eq!(stats.avg_ddd_response_ms, 125.0);
        assert_eq!(stats.avg_legacy_response_ms, 250.0);
        assert_eq!(stats.avg_performance_improvement, 50.0);
        assert!(metrics.active_alerts().is_empty());
    }

    #[test]
    fn empty_metrics_have_zero_rates() {
        let stats = MigrationMetrics::new().migration_stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.adoption_rate, 0.0);
        assert_eq!(stats.avg_performance_improvement, 0.0);
        assert_eq!(stats.fallback_rate, 0.0);
    }

    #[test]
    fn improvement_is_zero_without_legacy_samples() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::SubmitChecklist, 100);
        let stats = metrics.migration_stats();
        assert_eq!(stats.adoption_rate, 100.0);
        assert_eq!(stats.avg_performance_improvement, 0.0);
    }

    #[test]
    fn fallback_alert_after_enough_attempts() {
        let metrics = MigrationMetrics::new();
        for _ in 0..5 {
            metrics.record_ddd_usage(ApiName::SubmitChecklist, 100);
        }
        for _ in 0..5 {
            metrics.record_fallback(ApiName::SubmitChecklist);
        }
        // 10 attempts: still under the noise guard.
        assert!(metrics.active_alerts().is_empty());

        metrics.record_fallback(ApiName::SubmitChecklist);
        let alerts = metrics.active_alerts();
        assert_eq!(alerts.len(), 1);
        let alert = &alerts[0];
        assert_eq!(alert.alert_type, AlertType::FallbackRate);
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert!(alert.message.starts_with("High fallback rate for submitChecklist"));

        assert!(metrics.resolve_alert(alert.id));
        assert!(metrics.active_alerts().is_empty());
        assert_eq!(metrics.all_alerts().len(), 1);
    }

    #[test]
    fn resolve_is_idempotent() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::InitChecklist, 4000);
        let id = metrics.active_alerts()[0].id;

        assert!(metrics.resolve_alert(id));
        assert!(!metrics.resolve_alert(id));
        assert!(!metrics.resolve_alert(Uuid::new_v4()));
    }

    #[test]
    fn repeated_conditions_refresh_instead_of_duplicating() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::LoadChecklist, 4000);
        let first = metrics.active_alerts();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].alert_type, AlertType::ResponseTime);
        assert_eq!(first[0].severity, AlertSeverity::Medium);

        metrics.record_ddd_usage(ApiName::LoadChecklist, 4000);
        let second = metrics.active_alerts();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
        assert!(second[0].timestamp >= first[0].timestamp);
    }

    #[test]
    fn legacy_error_rate_uses_real_errors() {
        let metrics = MigrationMetrics::new();
        for _ in 0..20 {
            metrics.record_legacy_usage(ApiName::SaveAnomalies, 50);
        }
        for _ in 0..3 {
            metrics.record_error(ApiName::SaveAnomalies, Variant::Legacy);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.errors.legacy.save_anomalies, 3);
        assert_eq!(snapshot.error_rates.legacy.save_anomalies, 15.0);

        let alerts = metrics.active_alerts();
        assert!(alerts
            .iter()
            .any(|a| a.alert_type == AlertType::ErrorRate && a.severity == AlertSeverity::High));
    }

    #[test]
    fn error_rate_needs_enough_requests() {
        let metrics = MigrationMetrics::new();
        metrics.record_legacy_usage(ApiName::SaveAnomalies, 50);
        metrics.record_error(ApiName::SaveAnomalies, Variant::Legacy);
        assert!(metrics.active_alerts().is_empty());
    }

    #[test]
    fn snapshot_serializes_camel_case_api_names() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::SubmitChecklist, 100);
        let value = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(value["performance"]["ddd"]["submitChecklist"][0], 100);
        assert_eq!(value["errorRates"]["legacy"]["loadChecklist"], 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let metrics = MigrationMetrics::new();
        metrics.record_ddd_usage(ApiName::SubmitChecklist, 12000);
        metrics.record_fallback(ApiName::SubmitChecklist);
        assert!(!metrics.all_alerts().is_empty());

        metrics.reset();
        assert_eq!(metrics.migration_stats().total_requests, 0);
        assert_eq!(metrics.snapshot().fallbacks.submit_checklist, 0);
        assert!(metrics.all_alerts().is_empty());
    }
}
