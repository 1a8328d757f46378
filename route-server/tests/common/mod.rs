//! 集成测试公共设施
//!
//! 真实 SQLite 文件 (tempfile 目录) + 假支付网关 + JWT 签发

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use route_server::auth::{Identity, JwtIdentityProvider, JwtService};
use route_server::core::{Config, ServerState};
use route_server::db::{RecordStore, SqliteStore};
use route_server::gateway::{
    CheckoutSession, CheckoutSessionLink, GatewayError, NewCheckoutSession, PaymentGateway,
};
use shared::models::{Order, OrderCreate, OrderItem, Role, User};
use shared::util::{now_millis, snowflake_id};
use tempfile::TempDir;

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// 可编程的支付网关替身
#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, CheckoutSession>>,
    created: Mutex<Vec<NewCheckoutSession>>,
    unavailable: AtomicBool,
    delay_ms: AtomicUsize,
    pub retrieve_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn put_session(&self, session: CheckoutSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn created_sessions(&self) -> Vec<NewCheckoutSession> {
        self.created.lock().unwrap().clone()
    }

    async fn simulate_latency(&self) -> Result<(), GatewayError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        session: &NewCheckoutSession,
    ) -> Result<CheckoutSessionLink, GatewayError> {
        self.simulate_latency().await?;
        let mut created = self.created.lock().unwrap();
        created.push(session.clone());
        let id = format!("cs_fake_{}", created.len());
        Ok(CheckoutSessionLink {
            url: format!("https://checkout.fake/pay/{id}"),
            id,
        })
    }

    async fn retrieve_session(&self, session_ref: &str) -> Result<CheckoutSession, GatewayError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await?;
        self.sessions
            .lock()
            .unwrap()
            .get(session_ref)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(session_ref.to_string()))
    }
}

/// 已支付的结账会话
pub fn paid_session(id: &str, intent: &str, order_id: i64, amount_minor: i64) -> CheckoutSession {
    CheckoutSession {
        id: id.to_string(),
        payment_status: "paid".into(),
        payment_intent_id: Some(intent.to_string()),
        amount_total: Some(amount_minor),
        currency: Some("bdt".into()),
        customer_email: Some("reader@example.com".into()),
        metadata: HashMap::from([
            ("orderId".to_string(), order_id.to_string()),
            ("orderName".to_string(), "Dune".to_string()),
        ]),
    }
}

pub fn unpaid_session(id: &str, order_id: i64) -> CheckoutSession {
    CheckoutSession {
        payment_status: "unpaid".into(),
        payment_intent_id: None,
        ..paid_session(id, "", order_id, 70000)
    }
}

pub struct TestApp {
    pub state: ServerState,
    pub store: Arc<SqliteStore>,
    pub gateway: Arc<FakeGateway>,
    pub jwt: JwtService,
    _dir: TempDir,
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("route.db");
    let mut config = Config::for_tests(db_path.to_string_lossy(), JWT_SECRET);
    configure(&mut config);

    let store = Arc::new(
        SqliteStore::open(
            &config.database_path,
            config.db_max_connections,
            config.db_busy_timeout(),
        )
        .await
        .unwrap(),
    );
    let jwt = JwtService::with_config(config.jwt.clone());
    let gateway = Arc::new(FakeGateway::default());
    let state = ServerState::with_components(
        config,
        store.clone(),
        Arc::new(JwtIdentityProvider::new(jwt.clone())),
        gateway.clone(),
    );

    TestApp {
        state,
        store,
        gateway,
        jwt,
        _dir: dir,
    }
}

impl TestApp {
    /// `Authorization` header value for an email
    pub fn bearer(&self, email: &str) -> String {
        format!("Bearer {}", self.jwt.generate_token(email, email).unwrap())
    }

    pub async fn seed_user(&self, email: &str, role: Role) -> User {
        let user = User {
            id: snowflake_id(),
            email: email.to_string(),
            name: None,
            photo_url: None,
            role,
            created_at: now_millis(),
        };
        self.store.insert_user(&user).await.unwrap();
        user
    }

    /// 下单: 2 × 350.00，未支付
    pub async fn seed_order(&self, customer: &str, librarian: &str) -> Order {
        self.state
            .orders
            .create_order(
                &Identity::new(customer),
                OrderCreate {
                    librarian_email: librarian.to_string(),
                    items: vec![OrderItem {
                        book_id: 1,
                        title: "Dune".into(),
                        quantity: 2,
                        unit_price: 350.0,
                    }],
                },
            )
            .await
            .unwrap()
    }

    pub async fn order(&self, id: i64) -> Order {
        self.store.find_order(id).await.unwrap().unwrap()
    }

    pub async fn payment_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(self.store.pool())
            .await
            .unwrap()
    }
}
