//! Effectors perform one kind of I/O each, after the Guard approved it.

pub mod device;
pub mod file;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

pub use device::{GpuBackend, NoGpu};
pub use file::FileOperations;
pub use http::{HttpExecutor, HttpResponse, HttpTransport, ReqwestTransport};

use crate::error::GuardError;
use crate::sandbox::{IsolationContext, PreopenSandbox};

/// The full set of effectors a Guard dispatches to, plus the isolation
/// context wrapped around every effector call.
pub struct Effectors {
    pub files: FileOperations,
    pub http: HttpExecutor,
    pub gpu: Arc<dyn GpuBackend>,
    pub sandbox: Arc<dyn IsolationContext>,
}

impl Effectors {
    /// Production wiring: `reqwest`, no GPU, preopen sandbox.
    pub fn new(http_timeout: Duration) -> Result<Self, GuardError> {
        Ok(Self::with_parts(
            Arc::new(ReqwestTransport::new()?),
            Arc::new(NoGpu),
            Arc::new(PreopenSandbox::new()),
            http_timeout,
        ))
    }

    pub fn with_parts(
        transport: Arc<dyn HttpTransport>,
        gpu: Arc<dyn GpuBackend>,
        sandbox: Arc<dyn IsolationContext>,
        http_timeout: Duration,
    ) -> Self {
        Self {
            files: FileOperations::new(),
            http: HttpExecutor::new(transport, http_timeout),
            gpu,
            sandbox,
        }
    }
}
