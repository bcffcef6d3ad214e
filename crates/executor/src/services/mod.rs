pub mod execution_service;
pub mod position_resolver;
pub mod position_sizer;
pub mod telegram_service;
