use crate::errors::ToolError;
use crate::managers::platform::PlatformManager;
use crate::services::executor::RequestExecutor;
use crate::services::logger::Logger;
use crate::services::tool_executor::ToolExecutor;
use crate::services::transport::{HttpTransport, ReqwestTransport};
use crate::services::validation::Validation;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub tool_executor: Arc<ToolExecutor>,
    pub platform_manager: Arc<PlatformManager>,
}

impl App {
    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("platform-tasks");
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(logger.clone()));
        Self::with_transport(logger, transport)
    }

    /// Wires the task surface over an arbitrary transport.
    pub fn with_transport(
        logger: Logger,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ToolError> {
        let validation = Validation::new();
        let executor = RequestExecutor::new(logger.clone(), transport);
        let platform_manager = Arc::new(PlatformManager::new(
            logger.clone(),
            validation,
            executor,
        ));

        let tool_executor = ToolExecutor::new(logger.clone()).register(
            "platform",
            platform_manager.clone(),
            PlatformManager::actions(),
        );

        logger.debug(
            "Task surface initialized",
            Some(&serde_json::json!({"tasks": PlatformManager::actions().len()})),
        );

        Ok(Self {
            logger,
            tool_executor: Arc::new(tool_executor),
            platform_manager,
        })
    }
}
