use super::stock::{self, Adjustment, ProductLevels, StockFlags};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "PENDING_PAYMENT")]
    PendingPayment,
    #[serde(rename = "PAID")]
    Paid,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "REFUNDED")]
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(OrderStatus::PendingPayment),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            "REFUNDED" => Ok(OrderStatus::Refunded),
            _ => Err(format!("'{}' is not a valid OrderStatus", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: String,
    pub buyer_uid: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub price: Option<i64>,
    pub quantity: Option<i32>,
    pub total: Option<i64>,
    pub receiver_name: Option<String>,
    pub receiver_phone: Option<String>,
    pub address: Option<String>,
    pub status: OrderStatus,
    pub stock_deducted: bool,
    pub stock_reserved_released: bool,
    pub payment: Option<serde_json::Value>,
}

impl Order {
    /// Orders written before quantities were tracked count as one unit.
    pub fn quantity(&self) -> i64 {
        quantity_or_default(self.quantity)
    }

    #[cfg(test)]
    pub fn stock_flags(&self) -> StockFlags {
        StockFlags {
            deducted: self.stock_deducted,
            reserved_released: self.stock_reserved_released,
        }
    }
}

fn quantity_or_default(quantity: Option<i32>) -> i64 {
    quantity
        .filter(|quantity| *quantity > 0)
        .map(i64::from)
        .unwrap_or(1)
}

/// What the gateway told us about the payment, kept on the order for audit.
#[derive(Clone, Debug)]
pub struct PaymentAudit {
    pub transaction_status: String,
    pub payment_type: Option<String>,
    pub fraud_status: Option<String>,
    pub raw_notification: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

impl PaymentAudit {
    fn to_json(&self) -> serde_json::Value {
        json!({
            "provider": "MIDTRANS",
            "transactionStatus": self.transaction_status,
            "paymentType": self.payment_type,
            "fraudStatus": self.fraud_status,
            "rawNotification": self.raw_notification,
            "updatedAt": self.updated_at.to_rfc3339(),
        })
    }
}

fn snap_token_json(snap_token: &str, at: DateTime<Utc>) -> serde_json::Value {
    json!({
        "provider": "MIDTRANS",
        "snapToken": snap_token,
        "createdAt": at.to_rfc3339(),
    })
}

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnexpectedError,
    CorruptRecord,
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>>;

    /// Marks the order as awaiting payment and merges the token into its
    /// payment record.
    async fn record_snap_token(&self, id: &str, snap_token: &str, at: DateTime<Utc>)
        -> Result<()>;

    /// Merges the new status and audit into the order and applies the
    /// inventory side effect, all in one atomic step. Returns `None` when the
    /// order did not exist and only a minimal status record was written.
    async fn apply_transition(
        &self,
        id: &str,
        status: OrderStatus,
        audit: &PaymentAudit,
    ) -> Result<Option<Adjustment>>;
}

#[derive(FromRow)]
struct OrderRow {
    id: String,
    buyer_uid: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
    price: Option<i64>,
    quantity: Option<i32>,
    total: Option<i64>,
    receiver_name: Option<String>,
    receiver_phone: Option<String>,
    address: Option<String>,
    status: String,
    stock_deducted: bool,
    stock_reserved_released: bool,
    payment: Option<serde_json::Value>,
}

impl TryFrom<OrderRow> for Order {
    type Error = Error;

    fn try_from(row: OrderRow) -> Result<Self> {
        let status = row.status.parse::<OrderStatus>().map_err(|err| {
            tracing::error!("Order {} has an unreadable status: {}", row.id, err);
            Error::CorruptRecord
        })?;

        Ok(Order {
            id: row.id,
            buyer_uid: row.buyer_uid,
            product_id: row.product_id,
            product_name: row.product_name,
            price: row.price,
            quantity: row.quantity,
            total: row.total,
            receiver_name: row.receiver_name,
            receiver_phone: row.receiver_phone,
            address: row.address,
            status,
            stock_deducted: row.stock_deducted,
            stock_reserved_released: row.stock_reserved_released,
            payment: row.payment,
        })
    }
}

#[derive(FromRow)]
struct LockedOrderRow {
    product_id: Option<String>,
    quantity: Option<i32>,
    stock_deducted: bool,
    stock_reserved_released: bool,
}

pub async fn find_by_id<'e, E: PgExecutor<'e>>(e: E, id: &str) -> Result<Option<Order>> {
    sqlx::query_as::<_, OrderRow>(
        "
        SELECT
            id,
            buyer_uid,
            product_id,
            product_name,
            price,
            quantity,
            total,
            receiver_name,
            receiver_phone,
            address,
            status,
            stock_deducted,
            stock_reserved_released,
            payment
        FROM orders
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(e)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to fetch order {}: {}", id, err);
        Error::UnexpectedError
    })?
    .map(Order::try_from)
    .transpose()
}

pub async fn merge_payment<'e, E: PgExecutor<'e>>(
    e: E,
    id: &str,
    status: OrderStatus,
    payment: serde_json::Value,
    at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "
        UPDATE orders SET
            status = $2,
            payment = COALESCE(payment, '{}'::jsonb) || $3,
            updated_at = $4
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(payment)
    .bind(at)
    .execute(e)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!(
            "Error occurred while trying to merge payment into order {}: {}",
            id,
            err
        );
        Error::UnexpectedError
    })
}

pub async fn apply_transition(
    pool: &PgPool,
    id: &str,
    status: OrderStatus,
    audit: &PaymentAudit,
) -> Result<Option<Adjustment>> {
    let mut tx = pool.begin().await.map_err(|err| {
        tracing::error!("Failed to start database transaction: {}", err);
        Error::UnexpectedError
    })?;

    let order = sqlx::query_as::<_, LockedOrderRow>(
        "
        SELECT product_id, quantity, stock_deducted, stock_reserved_released
        FROM orders
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to lock order {}: {}", id, err);
        Error::UnexpectedError
    })?;

    let Some(order) = order else {
        sqlx::query(
            "
            INSERT INTO orders (id, status, payment, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                payment = COALESCE(orders.payment, '{}'::jsonb) || EXCLUDED.payment,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(audit.to_json())
        .bind(audit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to record status of unknown order {}: {}",
                id,
                err
            );
            Error::UnexpectedError
        })?;

        tx.commit().await.map_err(|err| {
            tracing::error!("Failed to commit database transaction: {}", err);
            Error::UnexpectedError
        })?;

        return Ok(None);
    };

    let levels = match &order.product_id {
        Some(product_id) => sqlx::query_as::<_, (i64, i64)>(
            "SELECT stock, reserved FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to lock product {}: {}",
                product_id,
                err
            );
            Error::UnexpectedError
        })?
        .map(|(stock, reserved)| ProductLevels { stock, reserved }),
        None => None,
    };

    let flags = StockFlags {
        deducted: order.stock_deducted,
        reserved_released: order.stock_reserved_released,
    };
    let adjustment = stock::plan_adjustment(
        status,
        flags,
        quantity_or_default(order.quantity),
        levels,
    );

    sqlx::query(
        "
        UPDATE orders SET
            status = $2,
            payment = COALESCE(payment, '{}'::jsonb) || $3,
            stock_deducted = $4,
            stock_reserved_released = $5,
            updated_at = $6
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(audit.to_json())
    .bind(adjustment.flags.deducted)
    .bind(adjustment.flags.reserved_released)
    .bind(audit.updated_at)
    .execute(&mut *tx)
    .await
    .map_err(|err| {
        tracing::error!("Error occurred while trying to update order {}: {}", id, err);
        Error::UnexpectedError
    })?;

    if let (Some(product_id), Some(levels)) = (&order.product_id, adjustment.product) {
        sqlx::query(
            "
            UPDATE products SET
                stock = $2,
                reserved = $3,
                updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .bind(levels.stock)
        .bind(levels.reserved)
        .bind(audit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            tracing::error!(
                "Error occurred while trying to update stock of product {}: {}",
                product_id,
                err
            );
            Error::UnexpectedError
        })?;
    }

    tx.commit().await.map_err(|err| {
        tracing::error!("Failed to commit database transaction: {}", err);
        Error::UnexpectedError
    })?;

    Ok(Some(adjustment))
}

pub struct PgOrderLedger {
    pool: PgPool,
}

impl PgOrderLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for PgOrderLedger {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>> {
        find_by_id(&self.pool, id).await
    }

    async fn record_snap_token(
        &self,
        id: &str,
        snap_token: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        merge_payment(
            &self.pool,
            id,
            OrderStatus::PendingPayment,
            snap_token_json(snap_token, at),
            at,
        )
        .await
    }

    async fn apply_transition(
        &self,
        id: &str,
        status: OrderStatus,
        audit: &PaymentAudit,
    ) -> Result<Option<Adjustment>> {
        apply_transition(&self.pool, id, status, audit).await
    }
}


#[cfg(test)]
mod tests {
    use super::memory::{pending_order, MemoryOrderLedger};
    use super::*;
    use chrono::TimeZone;

    fn audit(transaction_status: &str) -> PaymentAudit {
        PaymentAudit {
            transaction_status: transaction_status.to_string(),
            payment_type: Some("bank_transfer".to_string()),
            fraud_status: None,
            raw_notification: json!({ "transaction_status": transaction_status }),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    fn ledger() -> MemoryOrderLedger {
        let ledger = MemoryOrderLedger::default();
        ledger.insert_order(pending_order("order-1", "buyer-1", "product-1", 3));
        ledger.insert_product(
            "product-1",
            ProductLevels {
                stock: 10,
                reserved: 5,
            },
        );
        ledger
    }

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn missing_or_zero_quantity_counts_as_one() {
        let mut order = pending_order("order-1", "buyer-1", "product-1", 0);
        assert_eq!(order.quantity(), 1);
        order.quantity = None;
        assert_eq!(order.quantity(), 1);
        order.quantity = Some(4);
        assert_eq!(order.quantity(), 4);
    }

    #[tokio::test]
    async fn settlement_deducts_stock_once() {
        let ledger = ledger();

        ledger
            .apply_transition("order-1", OrderStatus::Paid, &audit("settlement"))
            .await
            .unwrap();
        ledger
            .apply_transition("order-1", OrderStatus::Paid, &audit("settlement"))
            .await
            .unwrap();

        let order = ledger.order("order-1").unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.stock_deducted);
        assert!(order.stock_reserved_released);
        assert_eq!(
            ledger.product("product-1"),
            Some(ProductLevels {
                stock: 7,
                reserved: 2
            })
        );
    }

    #[tokio::test]
    async fn unknown_order_gets_a_minimal_record() {
        let ledger = ledger();

        let adjustment = ledger
            .apply_transition("order-404", OrderStatus::Paid, &audit("settlement"))
            .await
            .unwrap();

        assert_eq!(adjustment, None);
        let order = ledger.order("order-404").unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(!order.stock_deducted);
        assert_eq!(
            order.payment.unwrap()["transactionStatus"],
            json!("settlement")
        );
        assert_eq!(
            ledger.product("product-1"),
            Some(ProductLevels {
                stock: 10,
                reserved: 5
            })
        );
    }

    #[tokio::test]
    async fn audit_merge_keeps_the_snap_token() {
        let ledger = ledger();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();

        ledger
            .record_snap_token("order-1", "snap-abc", at)
            .await
            .unwrap();
        ledger
            .apply_transition("order-1", OrderStatus::Cancelled, &audit("expire"))
            .await
            .unwrap();

        let payment = ledger.order("order-1").unwrap().payment.unwrap();
        assert_eq!(payment["snapToken"], json!("snap-abc"));
        assert_eq!(payment["transactionStatus"], json!("expire"));
        assert_eq!(payment["provider"], json!("MIDTRANS"));
    }
}

#[cfg(test)]
mod pg_tests {
    use super::*;
    use crate::utils::database::testing;
    use chrono::TimeZone;

    fn settlement() -> PaymentAudit {
        PaymentAudit {
            transaction_status: "settlement".to_string(),
            payment_type: Some("qris".to_string()),
            fraud_status: Some("accept".to_string()),
            raw_notification: json!({ "transaction_status": "settlement" }),
            updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    async fn seed(pool: &PgPool, stock: i64, reserved: i64, quantity: i32) -> (String, String) {
        let product_id = ulid::Ulid::new().to_string();
        let order_id = ulid::Ulid::new().to_string();
        sqlx::query("INSERT INTO products (id, name, stock, reserved) VALUES ($1, 'Kopi', $2, $3)")
            .bind(&product_id)
            .bind(stock)
            .bind(reserved)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "
            INSERT INTO orders (id, buyer_uid, product_id, quantity, status)
            VALUES ($1, 'buyer-1', $2, $3, 'PENDING_PAYMENT')
            ",
        )
        .bind(&order_id)
        .bind(&product_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
        (order_id, product_id)
    }

    async fn levels(pool: &PgPool, product_id: &str) -> (i64, i64) {
        sqlx::query_as::<_, (i64, i64)>("SELECT stock, reserved FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn replayed_settlement_deducts_once() {
        let Some(pool) = testing::pool().await else {
            return;
        };
        let ledger = PgOrderLedger::new(pool.clone());
        let (order_id, product_id) = seed(&pool, 10, 5, 3).await;

        let (settlement_a, settlement_b) = (settlement(), settlement());
        let (first, second) = tokio::join!(
            ledger.apply_transition(&order_id, OrderStatus::Paid, &settlement_a),
            ledger.apply_transition(&order_id, OrderStatus::Paid, &settlement_b),
        );
        first.unwrap();
        second.unwrap();
        ledger
            .apply_transition(&order_id, OrderStatus::Paid, &settlement())
            .await
            .unwrap();

        assert_eq!(levels(&pool, &product_id).await, (7, 2));
        let order = ledger.find_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(order.stock_deducted);
        assert!(order.stock_reserved_released);
    }

    #[tokio::test]
    async fn settlement_never_drives_stock_below_zero() {
        let Some(pool) = testing::pool().await else {
            return;
        };
        let ledger = PgOrderLedger::new(pool.clone());
        let (order_id, product_id) = seed(&pool, 2, 1, 3).await;

        ledger
            .apply_transition(&order_id, OrderStatus::Paid, &settlement())
            .await
            .unwrap();

        assert_eq!(levels(&pool, &product_id).await, (0, 0));
    }

    #[tokio::test]
    async fn unknown_order_is_recorded_with_status_only() {
        let Some(pool) = testing::pool().await else {
            return;
        };
        let ledger = PgOrderLedger::new(pool);
        let order_id = ulid::Ulid::new().to_string();

        let adjustment = ledger
            .apply_transition(&order_id, OrderStatus::Paid, &settlement())
            .await
            .unwrap();

        assert_eq!(adjustment, None);
        let order = ledger.find_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.buyer_uid, None);
        assert!(!order.stock_deducted);
        let payment = order.payment.unwrap();
        assert_eq!(payment["transactionStatus"], json!("settlement"));
        assert_eq!(payment["fraudStatus"], json!("accept"));
    }
}
