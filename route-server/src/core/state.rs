use std::sync::Arc;

use shared::error::{AppError, AppResult};

use crate::auth::{AccessGuard, IdentityProvider, IdentityResolver, JwtIdentityProvider, JwtService};
use crate::catalog::CatalogService;
use crate::core::Config;
use crate::db::{RecordStore, SqliteStore};
use crate::gateway::{PaymentGateway, StripeGateway};
use crate::orders::OrderManager;
use crate::payments::{CheckoutService, CheckoutUrls, ReconciliationEngine};
use crate::users::UserService;

/// 服务器状态 - 持有所有组件的共享引用
///
/// 每个组件内部只持有 `Arc` 句柄，Clone 成本很低。
/// 记录存储是唯一的共享可变资源。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | store | 记录存储 (SQLite) |
/// | resolver | 身份解析 |
/// | guard | 访问守卫 |
/// | orders | 订单生命周期 |
/// | reconciler | 支付对账 |
/// | checkout | 结账会话、支付流水 |
/// | catalog | 图书目录 |
/// | users | 用户服务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub resolver: IdentityResolver,
    pub guard: AccessGuard,
    pub orders: OrderManager,
    pub reconciler: ReconciliationEngine,
    pub checkout: CheckoutService,
    pub catalog: CatalogService,
    pub users: UserService,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 打开 SQLite (含迁移)，构建 JWT 身份提供者和 Stripe 网关。
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let store = SqliteStore::open(
            &config.database_path,
            config.db_max_connections,
            config.db_busy_timeout(),
        )
        .await?;

        let provider = JwtIdentityProvider::new(JwtService::with_config(config.jwt.clone()));
        let gateway = StripeGateway::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
            config.gateway_timeout(),
        )
        .map_err(|e| AppError::internal(format!("Failed to build payment gateway: {e}")))?;

        Ok(Self::with_components(
            config.clone(),
            Arc::new(store),
            Arc::new(provider),
            Arc::new(gateway),
        ))
    }

    /// 用现成的组件装配状态 (测试注入替身)
    pub fn with_components(
        config: Config,
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn IdentityProvider>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let resolver = IdentityResolver::new(provider, store.clone());
        let guard = AccessGuard::new(resolver.clone());

        let orders = OrderManager::new(store.clone(), guard.clone());
        let reconciler = ReconciliationEngine::new(
            store.clone(),
            gateway.clone(),
            guard.clone(),
            config.gateway_timeout(),
        );
        let checkout = CheckoutService::new(
            store.clone(),
            gateway,
            guard.clone(),
            CheckoutUrls::for_site(&config.site_domain),
            config.checkout_currency.clone(),
            config.gateway_timeout(),
        );
        let catalog = CatalogService::new(store.clone(), guard.clone());
        let users = UserService::new(store.clone(), guard.clone());

        Self {
            config,
            store,
            resolver,
            guard,
            orders,
            reconciler,
            checkout,
            catalog,
            users,
        }
    }

    /// webhook 密钥；未配置时 webhook 路由返回 404
    pub fn webhook_secret(&self) -> Option<&str> {
        self.config.stripe_webhook_secret.as_deref()
    }
}
