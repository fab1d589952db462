use super::types::{request, response};
use crate::{
    modules::{
        order::repository::Order,
        payment::gateway::{
            self, CustomerDetails, ItemDetails, ShippingAddress, SnapRequest, TransactionDetails,
            ENABLED_PAYMENTS,
        },
    },
    types::Context,
    utils::response::{ApiError, ErrorKind},
};
use std::sync::Arc;

const NAME_LIMIT: usize = 50;
const ADDRESS_LIMIT: usize = 200;

fn truncate(value: &str, limit: usize) -> String {
    value.chars().take(limit).collect()
}

fn snap_request(order: &Order, total: i64) -> SnapRequest {
    let receiver_name = truncate(
        order.receiver_name.as_deref().unwrap_or("Customer"),
        NAME_LIMIT,
    );
    let receiver_phone = order.receiver_phone.clone().unwrap_or_default();

    SnapRequest {
        transaction_details: TransactionDetails {
            order_id: order.id.clone(),
            gross_amount: total,
        },
        item_details: vec![ItemDetails {
            id: order.product_id.clone().unwrap_or_else(|| "item".to_string()),
            price: order.price.unwrap_or(total),
            quantity: order.quantity(),
            name: truncate(
                order.product_name.as_deref().unwrap_or("Produk"),
                NAME_LIMIT,
            ),
        }],
        customer_details: CustomerDetails {
            first_name: receiver_name.clone(),
            phone: receiver_phone.clone(),
            shipping_address: ShippingAddress {
                first_name: receiver_name,
                phone: receiver_phone,
                address: truncate(order.address.as_deref().unwrap_or_default(), ADDRESS_LIMIT),
            },
        },
        enabled_payments: ENABLED_PAYMENTS.iter().map(|p| p.to_string()).collect(),
    }
}

pub async fn service(ctx: Arc<Context>, payload: request::Payload) -> response::Response {
    let order_id = payload.body.order_id.trim();

    let order = ctx
        .orders
        .find_by_id(order_id)
        .await
        .map_err(|_| ApiError::internal("Server error"))?
        .ok_or_else(|| ApiError::new(ErrorKind::NotFound, "Order not found"))?;

    if order.buyer_uid.as_deref() != Some(payload.auth.uid.as_str()) {
        return Err(ApiError::new(ErrorKind::Forbidden, "Not your order"));
    }

    let total = order.total.unwrap_or_default();
    if total <= 0 {
        return Err(ApiError::validation("Invalid total"));
    }

    if ctx.payment.server_key.is_none() || ctx.payment.client_key.is_none() {
        tracing::error!("Midtrans keys are not configured");
        return Err(ApiError::internal("Midtrans env missing"));
    }

    let snap_token = ctx
        .gateway
        .create_transaction_token(&snap_request(&order, total))
        .await
        .map_err(|err| match err {
            gateway::Error::NotConfigured => ApiError::internal("Midtrans env missing"),
            err => ApiError::new(ErrorKind::Upstream, err.to_string()),
        })?;

    ctx.orders
        .record_snap_token(&order.id, &snap_token, ctx.clock.now())
        .await
        .map_err(|_| ApiError::internal("Server error"))?;

    tracing::info!("Created snap token for order {}", order.id);

    Ok(response::Success::TokenCreated(snap_token))
}
