//! End-to-end gateway flows through the public API: initiation, return
//! callback, reconciliation, and the record states left behind.

use async_trait::async_trait;
use idpay_gateway::gateway::client::{
    CreatePaymentData, CreatePaymentRequest, InquiryData, InquiryRequest, ProcessorApi,
};
use idpay_gateway::store::memory::InMemoryPaymentStore;
use idpay_gateway::{
    CallbackParams, CollectedMessages, GatewayConfig, GatewayError, GatewayMode, GatewayResult,
    Money, OffsiteGateway, OrderContext, PaymentState,
};
use std::sync::{Arc, Mutex};

/// Scripted processor: answers initiation with a fixed link and inquiry
/// with a fixed status, recording every request it sees.
struct ScriptedProcessor {
    remote_id: String,
    inquiry_status: i64,
    create_requests: Mutex<Vec<CreatePaymentRequest>>,
    inquiry_requests: Mutex<Vec<InquiryRequest>>,
}

impl ScriptedProcessor {
    fn new(remote_id: &str, inquiry_status: i64) -> Self {
        Self {
            remote_id: remote_id.to_string(),
            inquiry_status,
            create_requests: Mutex::new(Vec::new()),
            inquiry_requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ProcessorApi for ScriptedProcessor {
    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> GatewayResult<CreatePaymentData> {
        self.create_requests.lock().unwrap().push(request.clone());
        Ok(CreatePaymentData {
            id: self.remote_id.clone(),
            link: format!("https://idpay.ir/p/{}", self.remote_id),
        })
    }

    async fn inquire(&self, request: &InquiryRequest) -> GatewayResult<InquiryData> {
        self.inquiry_requests.lock().unwrap().push(request.clone());
        Ok(InquiryData {
            status: self.inquiry_status,
            track_id: "880".to_string(),
            card_no: Some("6219-xxxx".to_string()),
        })
    }
}

fn config() -> GatewayConfig {
    GatewayConfig {
        gateway_id: "idpay_offsite_redirect".to_string(),
        api_key: "integration-key".to_string(),
        mode: GatewayMode::Test,
        base_url: "https://api.idpay.ir".to_string(),
        return_base_url: "https://shop.example/".to_string(),
        timeout_secs: 5,
    }
}

fn order(order_id: &str, amount: &str, currency: &str) -> OrderContext {
    OrderContext {
        order_id: order_id.to_string(),
        total: Money::new(amount, currency),
        redirect_key: "a1b2c3".to_string(),
    }
}

fn returned(remote_id: &str, order_id: &str, status: &str) -> CallbackParams {
    CallbackParams {
        status: Some(status.to_string()),
        track_id: Some("880".to_string()),
        id: remote_id.to_string(),
        order_id: order_id.to_string(),
        amount: None,
        date: None,
    }
}

fn setup(
    processor: ScriptedProcessor,
) -> (
    OffsiteGateway,
    Arc<ScriptedProcessor>,
    Arc<InMemoryPaymentStore>,
) {
    let processor = Arc::new(processor);
    let store = Arc::new(InMemoryPaymentStore::new());
    let messages = Arc::new(CollectedMessages::new());
    let gateway = OffsiteGateway::new(&config(), processor.clone(), store.clone(), messages);
    (gateway, processor, store)
}

#[tokio::test]
async fn successful_payment_from_checkout_to_completion() {
    let (gateway, processor, store) = setup(ScriptedProcessor::new("rem_77", 100));
    let order = order("1001", "250000", "IRR");

    let target = gateway.initiate(&order).await.unwrap();
    assert_eq!(target.url, "https://idpay.ir/p/rem_77");

    {
        let sent = processor.create_requests.lock().unwrap();
        assert_eq!(sent[0].order_id, "1001");
        assert_eq!(sent[0].amount, 250000);
        assert_eq!(
            sent[0].callback,
            "https://shop.example/checkout/1001/payment/return/a1b2c3"
        );
    }

    gateway
        .reconcile(&order, &returned("rem_77", "1001", "100"))
        .await
        .unwrap();

    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, PaymentState::Completed);
    assert_eq!(
        records[0].remote_state.as_deref(),
        Some("track_id: 880 / status: 100 / card_no: 6219-xxxx")
    );

    let inquiries = processor.inquiry_requests.lock().unwrap();
    assert_eq!(inquiries.len(), 1);
    assert_eq!(inquiries[0].id, "rem_77");
}

#[tokio::test]
async fn toman_order_is_charged_in_rial_upstream() {
    let (gateway, processor, store) = setup(ScriptedProcessor::new("rem_78", 100));
    gateway.initiate(&order("1002", "5000", "TMN")).await.unwrap();

    let sent = processor.create_requests.lock().unwrap();
    assert_eq!(sent[0].amount, 50000);
    // The stored record keeps the original Toman total.
    assert_eq!(store.records().await[0].amount, Money::new("5000", "TMN"));
}

#[tokio::test]
async fn declined_payment_is_marked_failed_once() {
    let (gateway, _, store) = setup(ScriptedProcessor::new("rem_79", 11));
    let order = order("1003", "250000", "IRR");
    gateway.initiate(&order).await.unwrap();

    let params = returned("rem_79", "1003", "11");
    let outcome = gateway.reconcile(&order, &params).await;
    assert!(matches!(
        outcome,
        Err(GatewayError::PaymentFailed { status: 11 })
    ));
    assert_eq!(store.records().await[0].state, PaymentState::Failed);

    // The failed record is terminal; a redelivered callback finds nothing.
    let repeat = gateway.reconcile(&order, &params).await;
    assert!(matches!(repeat, Err(GatewayError::PaymentNotFound { .. })));
    assert_eq!(store.records().await[0].state, PaymentState::Failed);
}

#[tokio::test]
async fn callback_for_another_order_is_rejected_outright() {
    let (gateway, processor, store) = setup(ScriptedProcessor::new("rem_80", 100));
    let order = order("1004", "250000", "IRR");
    gateway.initiate(&order).await.unwrap();

    let outcome = gateway
        .reconcile(&order, &returned("rem_80", "2004", "100"))
        .await;
    assert!(matches!(outcome, Err(GatewayError::Security { .. })));

    // No inquiry went out and the record is still pending.
    assert!(processor.inquiry_requests.lock().unwrap().is_empty());
    assert_eq!(store.records().await[0].state, PaymentState::Authorization);
}
