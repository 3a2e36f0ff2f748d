use std::{fmt, sync::Arc};

use ort::session::builder::SessionBuilder;

use crate::error::{Error, Result};

// Hardware acceleration for the four ONNX sessions. CPU is the default and
// the only provider exercised in CI; every accelerated provider is registered
// with a CPU fallback so session creation degrades instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(feature = "tensorrt")]
    TensorRT,
    #[cfg(feature = "coreml")]
    CoreML,
    #[cfg(feature = "directml")]
    DirectML,
    #[cfg(feature = "openvino")]
    OpenVINO,
    #[cfg(feature = "webgpu")]
    WebGPU,
}

#[cfg(any(
    feature = "cuda",
    feature = "tensorrt",
    feature = "coreml",
    feature = "directml",
    feature = "openvino",
    feature = "webgpu"
))]
impl ExecutionProvider {
    /// Dispatch for the accelerated provider, or `None` for plain CPU.
    fn accelerator(self) -> Option<ort::ep::ExecutionProviderDispatch> {
        match self {
            ExecutionProvider::Cpu => None,
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => Some(ort::ep::CUDA::default().build()),
            #[cfg(feature = "tensorrt")]
            ExecutionProvider::TensorRT => Some(ort::ep::TensorRT::default().build()),
            #[cfg(feature = "coreml")]
            ExecutionProvider::CoreML => {
                use ort::ep::coreml::{ComputeUnits, CoreML};
                Some(
                    CoreML::default()
                        .with_compute_units(ComputeUnits::CPUAndGPU)
                        .build(),
                )
            }
            #[cfg(feature = "directml")]
            ExecutionProvider::DirectML => Some(ort::ep::DirectML::default().build()),
            #[cfg(feature = "openvino")]
            ExecutionProvider::OpenVINO => Some(ort::ep::OpenVINO::default().build()),
            #[cfg(feature = "webgpu")]
            ExecutionProvider::WebGPU => Some(ort::ep::WebGPU::default().build()),
        }
    }
}

/// The accelerated provider first, CPU as the mandatory fallback.
#[cfg(any(
    feature = "cuda",
    feature = "tensorrt",
    feature = "coreml",
    feature = "directml",
    feature = "openvino",
    feature = "webgpu"
))]
fn with_cpu_fallback(
    primary: ort::ep::ExecutionProviderDispatch,
) -> [ort::ep::ExecutionProviderDispatch; 2] {
    [
        primary,
        ort::ep::CPU::default().build().error_on_failure(),
    ]
}

/// Session construction options shared by all four models.
#[derive(Clone)]
pub struct SessionConfig {
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    pub inter_threads: usize,
    pub configure: Option<Arc<dyn Fn(SessionBuilder) -> ort::Result<SessionBuilder> + Send + Sync>>,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("execution_provider", &self.execution_provider)
            .field("intra_threads", &self.intra_threads)
            .field("inter_threads", &self.inter_threads)
            .field(
                "configure",
                &if self.configure.is_some() { "<fn>" } else { "None" },
            )
            .finish()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            execution_provider: ExecutionProvider::default(),
            intra_threads: 4,
            inter_threads: 1,
            configure: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.execution_provider = provider;
        self
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = threads;
        self
    }

    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = threads;
        self
    }

    pub fn with_custom_configure(
        mut self,
        configure: impl Fn(SessionBuilder) -> ort::Result<SessionBuilder> + Send + Sync + 'static,
    ) -> Self {
        self.configure = Some(Arc::new(configure));
        self
    }

    pub(crate) fn apply(&self, builder: SessionBuilder) -> Result<SessionBuilder> {
        use ort::session::builder::GraphOptimizationLevel;

        fn load<T>(e: ort::Error<T>) -> Error {
            Error::ModelLoadFailed(e.to_string())
        }

        let mut builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load)?
            .with_intra_threads(self.intra_threads)
            .map_err(load)?
            .with_inter_threads(self.inter_threads)
            .map_err(load)?;

        #[cfg(any(
            feature = "cuda",
            feature = "tensorrt",
            feature = "coreml",
            feature = "directml",
            feature = "openvino",
            feature = "webgpu"
        ))]
        if let Some(primary) = self.execution_provider.accelerator() {
            builder = builder
                .with_execution_providers(with_cpu_fallback(primary))
                .map_err(load)?;
        }

        if let Some(configure) = self.configure.as_ref() {
            builder = configure(builder).map_err(load)?;
        }

        Ok(builder)
    }
}
