//! Off-site redirect integration for the IDPay payment processor.
//!
//! The flow has two halves. [`gateway::OffsiteGateway::initiate`] asks the
//! processor for a hosted payment page, records the pending payment, and
//! hands back the redirect target. When the customer returns,
//! [`gateway::OffsiteGateway::reconcile`] cross-checks the callback against
//! the order, verifies the outcome with a server-to-server inquiry, and
//! moves the record to its terminal state. The callback's own status field
//! is never trusted.
//!
//! Persistence and the HTTP client sit behind traits ([`store::PaymentStore`],
//! [`gateway::client::ProcessorApi`]) so the embedding checkout pipeline can
//! swap either out.

pub mod config;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod store;

pub use config::{GatewayConfig, GatewayMode};
pub use error::{GatewayError, GatewayResult};
pub use gateway::client::{IdpayClient, ProcessorApi};
pub use gateway::types::{CallbackParams, Money, OrderContext, PaymentState, RedirectTarget};
pub use gateway::OffsiteGateway;
pub use messages::{CollectedMessages, MessageSink, TracingMessages};
pub use store::{PaymentRecord, PaymentStore};
