//! One-call test flow: resolve, execute, attach the cURL equivalent, record.

use crate::error::ResolveError;
use crate::executor::TestExecutor;
use crate::history::HistoryRecorder;
use crate::model::{ApiDefinition, EndpointDefinition, RequestOverride, ResolvedRequest, TestResult};
use crate::resolver;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct TestHarness {
    executor: TestExecutor,
    recorder: Arc<dyn HistoryRecorder>,
    timeout: Duration,
}

impl TestHarness {
    #[must_use]
    pub fn new(executor: TestExecutor, recorder: Arc<dyn HistoryRecorder>) -> Self {
        Self {
            executor,
            recorder,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Zero disables the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn recorder(&self) -> &Arc<dyn HistoryRecorder> {
        &self.recorder
    }

    /// Run one test end to end.
    ///
    /// A history failure is logged and does not affect the returned result.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when no URL can be resolved; nothing is sent or recorded then.
    pub async fn run(
        &self,
        api: &ApiDefinition,
        endpoint: Option<&EndpointDefinition>,
        overrides: &RequestOverride,
    ) -> Result<(ResolvedRequest, TestResult), ResolveError> {
        let request = resolver::resolve(api, endpoint, overrides)?;
        debug!(
            api = %api.id,
            endpoint = endpoint.map(|e| e.id.as_str()),
            method = %request.method,
            "resolved test request"
        );

        let mut result = self.executor.execute(&request, self.timeout).await;
        result.curl_equivalent = Some(TestExecutor::to_curl(&request));

        if let Err(e) = self.recorder.record(&api.id, &request, &result).await {
            warn!(api = %api.id, error = %e, "failed to record test history");
        }

        Ok((request, result))
    }
}
