//! Infrastructure shared by the stages that call the text generator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::collaborators::TextGenerator;
use crate::error::{AppResult, LangbaseError};
use crate::langbase::PipeRequest;

/// Text generator plus the per-call deadline, composed into each stage.
#[derive(Clone)]
pub struct StageCore {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl StageCore {
    /// Create a core with the given generator and per-call deadline.
    pub fn new(generator: Arc<dyn TextGenerator>, timeout_ms: u64) -> Self {
        Self {
            generator,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Deadline applied to every collaborator call.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one generation call; expiry of the deadline is a collaborator failure.
    pub async fn complete(&self, request: PipeRequest) -> AppResult<String> {
        let pipe = request.name.clone();
        let start = Instant::now();

        match tokio::time::timeout(self.timeout, self.generator.generate(request)).await {
            Ok(Ok(completion)) => {
                debug!(
                    pipe = %pipe,
                    latency_ms = start.elapsed().as_millis(),
                    chars = completion.chars().count(),
                    "Generation completed"
                );
                Ok(completion)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(pipe = %pipe, timeout_ms, "Generation timed out");
                Err(LangbaseError::Timeout { timeout_ms }.into())
            }
        }
    }
}
