pub mod callback_processor;
pub mod dto;
pub mod payment_service;
pub mod session_builder;

#[cfg(test)]
pub mod testing;

pub use callback_processor::CallbackProcessor;
pub use dto::{ErrorResponse, PaymentStatusResponse, RefundResponse};
pub use payment_service::DibsPaymentService;
pub use session_builder::PaymentSessionBuilder;
