//! Feature-flag router between the aggregate-backed and legacy checklist paths.
//!
//! Every call goes through [`ChecklistApiRouter::execute`]: the flag for the
//! API picks a path, the outcome is timed and recorded in
//! [`MigrationMetrics`], and any failure on the DDD path (error or panic)
//! falls back to the legacy path. Callers only ever see the legacy error when
//! both paths fail.
//!
//! A rule refusal ([`CoreError::is_rejection`]) is an answer, not a failure:
//! it goes back to the caller as is, counts as usage of the path that gave
//! it, and never triggers a fallback or an error count.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;

use crate::checklist::api::{
    ChecklistApi, ChecklistDetails, InitChecklistRequest, InitChecklistResponse,
    LoadChecklistRequest, SaveAnomaliesRequest, SaveAnomaliesResponse, SubmitChecklistRequest,
    SubmitChecklistResponse,
};
use crate::error::{CoreError, CoreResult};
use crate::migration::flags::MigrationFlags;
use crate::migration::metrics::MigrationMetrics;
use crate::migration::{ApiName, Variant};

pub struct ChecklistApiRouter {
    ddd: Arc<dyn ChecklistApi>,
    legacy: Arc<dyn ChecklistApi>,
    flags: MigrationFlags,
    metrics: Arc<MigrationMetrics>,
}

impl ChecklistApiRouter {
    pub fn new(
        ddd: Arc<dyn ChecklistApi>,
        legacy: Arc<dyn ChecklistApi>,
        flags: MigrationFlags,
        metrics: Arc<MigrationMetrics>,
    ) -> Self {
        Self {
            ddd,
            legacy,
            flags,
            metrics,
        }
    }

    pub fn flags(&self) -> MigrationFlags {
        self.flags
    }

    pub fn metrics(&self) -> &Arc<MigrationMetrics> {
        &self.metrics
    }

    /// Run `call` against the implementation selected for `api`.
    pub async fn execute<T, F, Fut>(&self, api: ApiName, call: F) -> CoreResult<T>
    where
        T: Send,
        F: Fn(Arc<dyn ChecklistApi>) -> Fut + Send + Sync,
        Fut: Future<Output = CoreResult<T>> + Send,
    {
        if self.flags.variant(api) == Variant::Legacy {
            return self.run_legacy(api, &call).await;
        }

        let started = Instant::now();
        let failure = match AssertUnwindSafe(call(Arc::clone(&self.ddd)))
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => {
                self.metrics.record_ddd_usage(api, elapsed_ms(started));
                return Ok(value);
            }
            Ok(Err(e)) if e.is_rejection() => {
                self.metrics.record_ddd_usage(api, elapsed_ms(started));
                tracing::debug!(api = %api, error = %e, "DDD checklist path refused request");
                return Err(e);
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
        };

        self.metrics.record_error(api, Variant::Ddd);
        self.metrics.record_fallback(api);
        tracing::warn!(
            api = %api,
            error = %failure,
            "DDD checklist path failed, falling back to legacy",
        );
        self.run_legacy(api, &call).await
    }

    async fn run_legacy<T, F, Fut>(&self, api: ApiName, call: &F) -> CoreResult<T>
    where
        F: Fn(Arc<dyn ChecklistApi>) -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let started = Instant::now();
        let result = match AssertUnwindSafe(call(Arc::clone(&self.legacy)))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(CoreError::Internal(format!(
                "legacy {api} panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        self.metrics.record_legacy_usage(api, elapsed_ms(started));

        match &result {
            Err(e) if e.is_rejection() => {
                tracing::debug!(api = %api, error = %e, "Legacy checklist path refused request");
            }
            Err(e) => {
                self.metrics.record_error(api, Variant::Legacy);
                tracing::error!(api = %api, error = %e, "Legacy checklist path failed");
            }
            Ok(_) => {}
        }
        result
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl ChecklistApi for ChecklistApiRouter {
    async fn submit_checklist(
        &self,
        request: SubmitChecklistRequest,
    ) -> CoreResult<SubmitChecklistResponse> {
        self.execute(ApiName::SubmitChecklist, |api| {
            let request = request.clone();
            async move { api.submit_checklist(request).await }
        })
        .await
    }

    async fn save_anomalies(
        &self,
        request: SaveAnomaliesRequest,
    ) -> CoreResult<SaveAnomaliesResponse> {
        self.execute(ApiName::SaveAnomalies, |api| {
            let request = request.clone();
            async move { api.save_anomalies(request).await }
        })
        .await
    }

    async fn init_checklist(
        &self,
        request: InitChecklistRequest,
    ) -> CoreResult<InitChecklistResponse> {
        self.execute(ApiName::InitChecklist, |api| {
            let request = request.clone();
            async move { api.init_checklist(request).await }
        })
        .await
    }

    async fn load_checklist(
        &self,
        request: LoadChecklistRequest,
    ) -> CoreResult<Option<ChecklistDetails>> {
        self.execute(ApiName::LoadChecklist, |api| {
            let request = request.clone();
            async move { api.load_checklist(request).await }
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
