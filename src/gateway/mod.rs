//! The gateway core: payment initiation and callback reconciliation.
//!
//! Initiation runs at checkout and leaves behind a pending payment record;
//! reconciliation runs when the customer returns and decides the record's
//! final state from a server-to-server inquiry, never from the parameters
//! the browser carried back.

pub mod client;
pub mod types;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::client::{
    CreatePaymentRequest, InquiryRequest, ProcessorApi, VERIFIED_PAID_STATUS,
};
use crate::gateway::types::{CallbackParams, OrderContext, PaymentState, RedirectTarget};
use crate::messages::MessageSink;
use crate::store::{NewPaymentRecord, PaymentStore};
use std::sync::Arc;
use tracing::{info, warn};

pub struct OffsiteGateway {
    gateway_id: String,
    return_base_url: String,
    api: Arc<dyn ProcessorApi>,
    store: Arc<dyn PaymentStore>,
    messages: Arc<dyn MessageSink>,
}

impl OffsiteGateway {
    pub fn new(
        config: &GatewayConfig,
        api: Arc<dyn ProcessorApi>,
        store: Arc<dyn PaymentStore>,
        messages: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            gateway_id: config.gateway_id.clone(),
            return_base_url: config.return_base_url.trim_end_matches('/').to_string(),
            api,
            store,
            messages,
        }
    }

    /// Absolute return URL for the order. The per-order redirect key is
    /// unguessable, so a captured callback cannot be replayed against a
    /// different order.
    fn callback_url(&self, order: &OrderContext) -> String {
        format!(
            "{}/checkout/{}/payment/return/{}",
            self.return_base_url, order.order_id, order.redirect_key
        )
    }

    /// Ask the processor for a redirect link and record the pending payment.
    ///
    /// On success exactly one new record exists in `authorization` keyed by
    /// the processor-assigned transaction id; on any failure no record is
    /// created.
    pub async fn initiate(&self, order: &OrderContext) -> GatewayResult<RedirectTarget> {
        order.total.validate_positive("total")?;
        let amount = order.total.payable_amount()?;

        let request = CreatePaymentRequest {
            order_id: order.order_id.clone(),
            amount,
            phone: String::new(),
            desc: format!("Order number #{}", order.order_id),
            callback: self.callback_url(order),
        };

        let data = match self.api.create_payment(&request).await {
            Ok(data) => data,
            Err(error) => {
                self.surface_upstream(&error);
                return Err(error);
            }
        };

        info!(
            order_id = %order.order_id,
            remote_id = %data.id,
            "payment initiated, awaiting off-site redirect"
        );

        self.store
            .create(NewPaymentRecord {
                order_id: order.order_id.clone(),
                remote_id: data.id,
                gateway_id: self.gateway_id.clone(),
                amount: order.total.clone(),
                state: PaymentState::Authorization,
            })
            .await?;

        Ok(RedirectTarget::post(data.link))
    }

    /// Close the loop on a returning callback.
    ///
    /// The callback's own `status` field never decides anything: after the
    /// identity cross-check, the matching pending record is verified with an
    /// inquiry call and moved to `completed` or `failed` accordingly. A
    /// repeated callback for an already-terminal record finds no pending
    /// match and gets [`GatewayError::PaymentNotFound`].
    pub async fn reconcile(
        &self,
        order: &OrderContext,
        params: &CallbackParams,
    ) -> GatewayResult<()> {
        if params.order_id != order.order_id {
            return Err(GatewayError::Security {
                order_id: order.order_id.clone(),
                callback_order_id: params.order_id.clone(),
            });
        }

        let mut matches = self.store.find_pending(&params.id, &params.order_id).await?;
        let mut record = match matches.len() {
            1 => matches.remove(0),
            0 => {
                return Err(GatewayError::PaymentNotFound {
                    remote_id: params.id.clone(),
                    order_id: params.order_id.clone(),
                })
            }
            count => {
                return Err(GatewayError::StoreIntegrity {
                    remote_id: params.id.clone(),
                    order_id: params.order_id.clone(),
                    count,
                })
            }
        };

        let request = InquiryRequest {
            id: record.remote_id.clone(),
            order_id: record.order_id.clone(),
        };
        let data = match self.api.inquire(&request).await {
            Ok(data) => data,
            Err(error) => {
                // Inquiry never answered; the record stays in authorization.
                self.surface_upstream(&error);
                return Err(error);
            }
        };

        record.remote_state = Some(format!(
            "track_id: {} / status: {} / card_no: {}",
            data.track_id,
            data.status,
            data.card_no.as_deref().unwrap_or_default()
        ));

        if data.status == VERIFIED_PAID_STATUS {
            record.state = PaymentState::Completed;
            self.store.save(&record).await?;
            info!(
                order_id = %record.order_id,
                remote_id = %record.remote_id,
                track_id = %data.track_id,
                "payment verified and completed"
            );
            Ok(())
        } else {
            record.state = PaymentState::Failed;
            self.store.save(&record).await?;
            warn!(
                order_id = %record.order_id,
                remote_id = %record.remote_id,
                status = data.status,
                "payment inquiry returned a non-success status"
            );
            Err(GatewayError::PaymentFailed {
                status: data.status,
            })
        }
    }

    fn surface_upstream(&self, error: &GatewayError) {
        if let Some(message) = error.upstream_user_message() {
            self.messages.add_error(message);
        }
    }
}
