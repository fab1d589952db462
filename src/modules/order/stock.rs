use super::repository::OrderStatus;

/// One-shot guards stored on the order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StockFlags {
    pub deducted: bool,
    pub reserved_released: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductLevels {
    pub stock: i64,
    pub reserved: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjustment {
    pub flags: StockFlags,
    /// New product levels, `None` when the product row is left untouched.
    pub product: Option<ProductLevels>,
}

fn floor_sub(value: i64, by: i64) -> i64 {
    (value - by).max(0)
}

/// Decides the inventory side effect of moving an order to `status`.
///
/// Each flag flips at most once over the order's lifetime, so replaying the
/// same transition is a no-op. A missing product still flips the flags; there
/// is nothing to reconcile against later.
pub fn plan_adjustment(
    status: OrderStatus,
    flags: StockFlags,
    quantity: i64,
    product: Option<ProductLevels>,
) -> Adjustment {
    match status {
        OrderStatus::Paid if !flags.deducted => Adjustment {
            flags: StockFlags {
                deducted: true,
                reserved_released: true,
            },
            product: product.map(|levels| ProductLevels {
                stock: floor_sub(levels.stock, quantity),
                reserved: floor_sub(levels.reserved, quantity),
            }),
        },
        OrderStatus::Cancelled | OrderStatus::Refunded if !flags.reserved_released => Adjustment {
            flags: StockFlags {
                reserved_released: true,
                ..flags
            },
            product: product.map(|levels| ProductLevels {
                stock: levels.stock,
                reserved: floor_sub(levels.reserved, quantity),
            }),
        },
        _ => Adjustment {
            flags,
            product: None,
        },
    }
}
