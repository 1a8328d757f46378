//! Payment Repository
//!
//! The ledger is append-only. `record` is the only write path and it runs the
//! order update and the payment insert in one transaction.

use super::{RepoError, RepoResult};
use shared::models::Payment;
use sqlx::SqlitePool;

const PAYMENT_SELECT: &str = "SELECT id, transaction_id, order_id, order_name, amount, amount_minor, currency, customer_email, payment_status, tracking_id, paid_at FROM payments";

/// Payment fields known before the order's tracking id is read
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub transaction_id: String,
    pub order_id: i64,
    pub order_name: Option<String>,
    pub amount: f64,
    pub amount_minor: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub payment_status: String,
    pub paid_at: i64,
}

/// Outcome of [`record`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// This call wrote the payment and marked the order paid
    Recorded(Payment),
    /// The transaction id was already in the ledger; nothing was written
    AlreadyRecorded(Payment),
}

pub async fn find_by_transaction_id(
    pool: &SqlitePool,
    transaction_id: &str,
) -> RepoResult<Option<Payment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE transaction_id = ?");
    let row = sqlx::query_as::<_, Payment>(&sql)
        .bind(transaction_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_customer(pool: &SqlitePool, email: &str) -> RepoResult<Vec<Payment>> {
    let sql = format!("{PAYMENT_SELECT} WHERE customer_email = ? ORDER BY paid_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Payment>(&sql)
        .bind(email)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Payment>> {
    let sql = format!("{PAYMENT_SELECT} ORDER BY paid_at DESC, id DESC");
    let rows = sqlx::query_as::<_, Payment>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// 主键碰撞时换新 id 重试的次数
const ID_ATTEMPTS: usize = 3;

/// Mark the order paid and append the payment, atomically.
///
/// - order absent: rolled back, [`RepoError::NotFound`]
/// - transaction id already recorded: rolled back, [`RecordOutcome::AlreadyRecorded`]
/// - generated payment id already taken: retried with a fresh id
pub async fn record(pool: &SqlitePool, new: NewPayment) -> RepoResult<RecordOutcome> {
    let ids = std::iter::repeat_with(shared::util::snowflake_id).take(ID_ATTEMPTS);
    record_with_ids(pool, new, ids).await
}

/// One transaction attempt per candidate id
enum Attempt {
    Done(RecordOutcome),
    IdTaken,
}

async fn record_with_ids(
    pool: &SqlitePool,
    new: NewPayment,
    ids: impl IntoIterator<Item = i64>,
) -> RepoResult<RecordOutcome> {
    for id in ids {
        match try_record(pool, &new, id).await? {
            Attempt::Done(outcome) => return Ok(outcome),
            Attempt::IdTaken => {
                tracing::warn!(
                    payment_id = id,
                    transaction_id = %new.transaction_id,
                    "Payment id already taken, retrying with a fresh id"
                );
            }
        }
    }
    Err(RepoError::Database(format!(
        "no free payment id for transaction {}",
        new.transaction_id
    )))
}

async fn try_record(pool: &SqlitePool, new: &NewPayment, id: i64) -> RepoResult<Attempt> {
    let mut tx = pool.begin().await?;

    // 1. 标记订单已支付，同时读出运单号 (不重新生成)
    let tracking_id: Option<String> = sqlx::query_scalar(
        "UPDATE orders SET payment_status = 'paid' WHERE id = ? RETURNING tracking_id",
    )
    .bind(new.order_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(tracking_id) = tracking_id else {
        tx.rollback().await?;
        return Err(RepoError::NotFound(format!("Order {} not found", new.order_id)));
    };

    // 2. 追加支付记录，transaction_id 唯一约束兜底并发重复
    let payment = Payment {
        id,
        transaction_id: new.transaction_id.clone(),
        order_id: new.order_id,
        order_name: new.order_name.clone(),
        amount: new.amount,
        amount_minor: new.amount_minor,
        currency: new.currency.clone(),
        customer_email: new.customer_email.clone(),
        payment_status: new.payment_status.clone(),
        tracking_id,
        paid_at: new.paid_at,
    };

    let inserted = sqlx::query(
        "INSERT INTO payments (id, transaction_id, order_id, order_name, amount, amount_minor, currency, customer_email, payment_status, tracking_id, paid_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )
    .bind(payment.id)
    .bind(&payment.transaction_id)
    .bind(payment.order_id)
    .bind(&payment.order_name)
    .bind(payment.amount)
    .bind(payment.amount_minor)
    .bind(&payment.currency)
    .bind(&payment.customer_email)
    .bind(&payment.payment_status)
    .bind(&payment.tracking_id)
    .bind(payment.paid_at)
    .execute(&mut *tx)
    .await;

    match inserted.map_err(RepoError::from) {
        Ok(_) => {
            tx.commit().await?;
            Ok(Attempt::Done(RecordOutcome::Recorded(payment)))
        }
        Err(RepoError::Duplicate(_)) => {
            tx.rollback().await?;
            // 唯一冲突来自 transaction_id 还是主键: 查账本区分
            match find_by_transaction_id(pool, &payment.transaction_id).await? {
                Some(existing) => Ok(Attempt::Done(RecordOutcome::AlreadyRecorded(existing))),
                None => Ok(Attempt::IdTaken),
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::order;
    use shared::models::{Order, OrderItem, PaymentStatus};
    use std::time::Duration;

    async fn open_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let path = dir.path().join("ledger.db");
        let db = DbService::new(path.to_str().unwrap(), 1, Duration::from_secs(5))
            .await
            .unwrap();
        db.pool
    }

    async fn insert_order(pool: &SqlitePool, id: i64) {
        let order = Order {
            id,
            customer_email: "reader@example.com".into(),
            librarian_email: "lib@example.com".into(),
            items: vec![OrderItem {
                book_id: 1,
                title: "Dune".into(),
                quantity: 1,
                unit_price: 350.0,
            }],
            total: 350.0,
            order_status: "pending".into(),
            payment_status: PaymentStatus::Unpaid,
            tracking_id: format!("TRK-20261015-{id:06}"),
            ordered_at: 1_760_000_000_000,
        };
        order::create(pool, &order).await.unwrap();
    }

    fn new_payment(transaction_id: &str, order_id: i64) -> NewPayment {
        NewPayment {
            transaction_id: transaction_id.into(),
            order_id,
            order_name: Some("Dune".into()),
            amount: 350.0,
            amount_minor: 35000,
            currency: "bdt".into(),
            customer_email: Some("reader@example.com".into()),
            payment_status: "paid".into(),
            paid_at: 1_760_000_100_000,
        }
    }

    #[tokio::test]
    async fn test_taken_payment_id_retries_with_next() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_pool(&dir).await;
        insert_order(&pool, 1).await;
        insert_order(&pool, 2).await;

        let first = record_with_ids(&pool, new_payment("pi_1", 1), [7]).await.unwrap();
        assert!(matches!(first, RecordOutcome::Recorded(ref p) if p.id == 7));

        // 7 已被占用，换下一个 id 写入
        let second = record_with_ids(&pool, new_payment("pi_2", 2), [7, 8])
            .await
            .unwrap();
        match second {
            RecordOutcome::Recorded(p) => {
                assert_eq!(p.id, 8);
                assert_eq!(p.transaction_id, "pi_2");
            }
            other => panic!("expected Recorded, got {other:?}"),
        }

        // 同一 transaction_id 仍然是幂等命中，而不是重试
        let again = record_with_ids(&pool, new_payment("pi_1", 1), [9]).await.unwrap();
        assert!(matches!(again, RecordOutcome::AlreadyRecorded(ref p) if p.id == 7));
    }

    #[tokio::test]
    async fn test_exhausted_payment_ids_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_pool(&dir).await;
        insert_order(&pool, 1).await;
        insert_order(&pool, 2).await;
        record_with_ids(&pool, new_payment("pi_1", 1), [7]).await.unwrap();

        let err = record_with_ids(&pool, new_payment("pi_2", 2), [7, 7])
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
        assert!(find_by_transaction_id(&pool, "pi_2").await.unwrap().is_none());
        let order = order::find_by_id(&pool, 2).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    }
}
