use std::collections::HashMap;
use uuid::Uuid;

use crate::discounts::{DiscountLine, DiscountResolver};
use crate::models::MenuItem;
use crate::orders::{
    CreateOrderRequest, Order, OrderError, OrderItemsRepository, OrderResponse, OrderStatus,
    OrdersRepository, StatusMachine,
};
use crate::orders::repository::MenuItemsRepository;

/// Service for order business logic.
#[derive(Clone)]
pub struct OrderService {
    orders_repo: OrdersRepository,
    order_items_repo: OrderItemsRepository,
    menu_items_repo: MenuItemsRepository,
    discount_resolver: DiscountResolver,
}

impl OrderService {
    pub fn new(
        orders_repo: OrdersRepository,
        order_items_repo: OrderItemsRepository,
        menu_items_repo: MenuItemsRepository,
        discount_resolver: DiscountResolver,
    ) -> Self {
        Self {
            orders_repo,
            order_items_repo,
            menu_items_repo,
            discount_resolver,
        }
    }

    /// Create a new order from a cart.
    ///
    /// Validates every line against the stated cafeteria (existence,
    /// ownership, availability, stock), snapshots current prices, resolves
    /// per-line discounts, then hands the resolved lines to the repository
    /// for atomic placement. The returned order has status pending and
    /// payment status pending; payment is initiated separately.
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, OrderError> {
        if request.items.is_empty() {
            return Err(OrderError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }

        for item in &request.items {
            if item.quantity < 1 {
                return Err(OrderError::InvalidQuantity(format!(
                    "Quantity must be at least 1, got {}",
                    item.quantity
                )));
            }
        }

        let menu_item_ids: Vec<i32> = request.items.iter().map(|i| i.menu_item_id).collect();
        let menu_items = self.menu_items_repo.find_by_ids(&menu_item_ids).await?;
        let menu_map: HashMap<i32, MenuItem> =
            menu_items.into_iter().map(|m| (m.id, m)).collect();

        let mut discount_lines = Vec::with_capacity(request.items.len());
        for line in &request.items {
            let menu_item = menu_map
                .get(&line.menu_item_id)
                .ok_or(OrderError::MenuItemNotFound(line.menu_item_id))?;

            if menu_item.cafeteria_id != request.cafeteria_id {
                return Err(OrderError::WrongCafeteria {
                    menu_item_id: menu_item.id,
                    cafeteria_id: request.cafeteria_id,
                });
            }
            if !menu_item.available {
                return Err(OrderError::ItemUnavailable(menu_item.id));
            }
            if menu_item.stock < line.quantity {
                return Err(OrderError::InsufficientStock {
                    menu_item_id: menu_item.id,
                    requested: line.quantity,
                    available: menu_item.stock,
                });
            }

            discount_lines.push(DiscountLine {
                menu_item_id: menu_item.id,
                category_id: menu_item.category_id,
                unit_price: menu_item.price,
                quantity: line.quantity,
            });
        }

        let resolved = self
            .discount_resolver
            .resolve(request.cafeteria_id, &discount_lines)
            .await?;

        let order = self
            .orders_repo
            .place_order(
                request.user_id,
                request.cafeteria_id,
                &request.payment_method,
                resolved,
            )
            .await?;

        tracing::info!(
            "Created order {} for user {} at cafeteria {} (total {})",
            order.id,
            order.user_id,
            order.cafeteria_id,
            order.total
        );

        let items = self.order_items_repo.find_by_order_id(order.id).await?;
        Ok(OrderResponse::from_order(order, items))
    }

    /// Orders of one user, newest first, optionally filtered by status.
    pub async fn get_user_orders(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let orders = self.orders_repo.find_by_user_id(user_id, status).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.order_items_repo.find_by_order_id(order.id).await?;
            responses.push(OrderResponse::from_order(order, items));
        }

        Ok(responses)
    }

    pub async fn get_order_by_id(&self, order_id: Uuid) -> Result<OrderResponse, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let items = self.order_items_repo.find_by_order_id(order.id).await?;
        Ok(OrderResponse::from_order(order, items))
    }

    /// Update order status under the transition rules of the status
    /// machine. Same-status updates are accepted as no-ops.
    pub async fn update_order_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        StatusMachine::transition(order.status, new_status)
            .map_err(OrderError::InvalidStateTransition)?;

        let updated = self
            .orders_repo
            .update_status(order_id, order.status, new_status)
            .await?;
        tracing::info!("Order {} moved from {} to {}", order_id, order.status, new_status);

        Ok(updated)
    }
}
