pub mod host_port;
pub mod payment_provider_port;
pub mod refund_gateway_port;

pub use host_port::{ConfirmOutcome, HostPort};
pub use payment_provider_port::{
    CallbackOutcome, CallbackParams, EventContext, PaymentProvider, PreparedRedirect,
    RejectReason,
};
pub use refund_gateway_port::{RefundGatewayPort, RefundRequest, RefundResult};
