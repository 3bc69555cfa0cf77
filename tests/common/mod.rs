#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use storefront_checkout::domain::aggregates::{Product, User};
use storefront_checkout::events::RecordingPublisher;
use storefront_checkout::payment::{PaymentGateway, PaymentRequest, PaymentRequestReply, VerifyReply, VerifyRequest};
use storefront_checkout::services::{PaymentSettings, Services};
use storefront_checkout::store::{MemoryStore, Stores};
use storefront_checkout::Result;

/// Gateway double with scripted status codes and call counters.
#[derive(Debug)]
pub struct FakeGateway {
    pub request_status: AtomicI32,
    pub verify_status: AtomicI32,
    pub request_calls: AtomicUsize,
    pub verify_calls: AtomicUsize,
    pub last_amount: AtomicI64,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            request_status: AtomicI32::new(100),
            verify_status: AtomicI32::new(100),
            request_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            last_amount: AtomicI64::new(0),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn request_payment(&self, request: PaymentRequest) -> Result<PaymentRequestReply> {
        let n = self.request_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_amount.store(request.amount, Ordering::SeqCst);
        let status = self.request_status.load(Ordering::SeqCst);
        if status != 100 {
            return Ok(PaymentRequestReply { status, url: None, authority: None });
        }
        let authority = format!("A{n:035}");
        Ok(PaymentRequestReply { status, url: Some(format!("https://pay.test/StartPay/{authority}")), authority: Some(authority) })
    }

    async fn verify_payment(&self, request: VerifyRequest) -> Result<VerifyReply> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.last_amount.store(request.amount, Ordering::SeqCst);
        let status = self.verify_status.load(Ordering::SeqCst);
        if status != 100 && status != 101 {
            return Ok(VerifyReply { status, ref_id: None, card_pan: None, fee: None });
        }
        Ok(VerifyReply {
            status,
            ref_id: Some("20161".into()),
            card_pan: Some("603799******7999".into()),
            fee: Some(Decimal::new(250, 0)),
        })
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub stores: Stores,
    pub gateway: Arc<FakeGateway>,
    pub events: Arc<RecordingPublisher>,
    pub services: Services,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let stores = Stores::in_memory(store.clone());
        let gateway = Arc::new(FakeGateway::default());
        let events = Arc::new(RecordingPublisher::new());
        let settings = PaymentSettings {
            callback_url: "http://localhost:8083/api/v1/payments/callback".into(),
            description: "Test order".into(),
        };
        let services = Services::new(&stores, gateway.clone(), events.clone(), settings);
        Self { store, stores, gateway, events, services }
    }

    pub async fn product(&self, title: &str, price: i64) -> Product {
        let mut product = Product::new(title, Decimal::new(price, 0));
        product.product_code = format!("P-{title}");
        product.image_urls = vec![format!("/images/{title}.jpg")];
        product.category = "kitchen".into();
        self.store.put_product(product.clone()).await;
        product
    }

    pub async fn user(&self, name: &str) -> User {
        let mut user = User::new(name);
        user.email = Some(format!("{}@example.com", name.to_lowercase()));
        user.phone = Some("09120000000".into());
        self.store.put_user(user.clone()).await;
        user
    }

    pub async fn admin(&self, name: &str) -> User {
        let mut user = self.user(name).await;
        user.is_admin = true;
        self.store.put_user(user.clone()).await;
        user
    }
}

pub fn dec(v: i64) -> Decimal {
    Decimal::new(v, 0)
}
