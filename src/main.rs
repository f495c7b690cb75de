pub mod db;
pub mod discounts;
pub mod error;
pub mod models;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod query;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use discounts::{DiscountResolver, DiscountsRepository};
use error::ApiError;
use models::{Cafeteria, Category, CreateMenuItem, MenuItem, UpdateMenuItem};
use orders::{MenuItemsRepository, OrderItemsRepository, OrderService, OrdersRepository};
use payments::{DarajaConfig, DarajaGateway, PaymentGateway, PaymentService, TransactionsRepository};
use pricing::{PriceHistoryRepository, PricingService};
use query::{MenuQueryBuilder, MenuQueryParams, QueryValidator};
use validator::Validate;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        create_menu_item,
        get_menu_item_by_id,
        update_menu_item,
        delete_menu_item,
        get_cafeterias,
        get_cafeteria_by_id,
    ),
    components(
        schemas(MenuItem, CreateMenuItem, UpdateMenuItem, Cafeteria, Category)
    ),
    tags(
        (name = "catalogue", description = "Cafeteria and menu management endpoints")
    ),
    info(
        title = "Campus Eats API",
        version = "1.0.0",
        description = "RESTful API for campus cafeteria ordering, discounts and M-Pesa payments",
        contact(
            name = "API Support",
            email = "support@campuseats.co.ke"
        )
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub order_service: OrderService,
    pub payment_service: PaymentService,
    pub pricing_service: PricingService,
    pub discounts_repo: DiscountsRepository,
}

impl AppState {
    /// Wires repositories and services from a pool plus a payment gateway.
    pub fn new(db: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        let orders_repo = OrdersRepository::new(db.clone());
        let order_items_repo = OrderItemsRepository::new(db.clone());
        let menu_items_repo = MenuItemsRepository::new(db.clone());
        let discounts_repo = DiscountsRepository::new(db.clone());
        let transactions_repo = TransactionsRepository::new(db.clone());
        let history_repo = PriceHistoryRepository::new(db.clone());

        let order_service = OrderService::new(
            orders_repo.clone(),
            order_items_repo,
            menu_items_repo,
            DiscountResolver::new(discounts_repo.clone()),
        );
        let payment_service =
            PaymentService::new(db.clone(), orders_repo, transactions_repo, gateway);
        let pricing_service = PricingService::new(db.clone(), history_repo);

        Self {
            db,
            order_service,
            payment_service,
            pricing_service,
            discounts_repo,
        }
    }
}

/// Handler for POST /api/menu-items
/// Creates a new menu item
#[utoipa::path(
    post,
    path = "/api/menu-items",
    request_body = CreateMenuItem,
    responses(
        (status = 201, description = "Menu item created successfully", body = MenuItem),
        (status = 400, description = "Invalid input data", body = String, example = json!({"error": "Price must not be negative"})),
        (status = 409, description = "Duplicate name within cafeteria", body = String),
        (status = 500, description = "Internal server error", body = String, example = json!({"error": "Database error"}))
    ),
    tag = "catalogue"
)]
async fn create_menu_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateMenuItem>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    tracing::debug!("Creating new menu item: {}", payload.name);

    payload.validate()?;

    // Names are unique per cafeteria, not across the whole platform
    if db::check_duplicate_menu_item(&state.db, payload.cafeteria_id, &payload.name).await? {
        tracing::warn!(
            "Attempt to create duplicate menu item '{}' in cafeteria {}",
            payload.name,
            payload.cafeteria_id
        );
        return Err(ApiError::Conflict {
            message: format!(
                "Menu item with name '{}' already exists in this cafeteria",
                payload.name
            ),
        });
    }

    let mut tx = state.db.begin().await?;

    let item = sqlx::query_as::<_, MenuItem>(
        r#"
        INSERT INTO menu_items
            (cafeteria_id, category_id, name, description, image_url, price, stock, available)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(payload.cafeteria_id)
    .bind(payload.category_id)
    .bind(&payload.name)
    .bind(&payload.description)
    .bind(&payload.image_url)
    .bind(payload.price)
    .bind(payload.stock)
    .bind(payload.available)
    .fetch_one(&mut *tx)
    .await?;

    // The opening price is audited like any later change so the trail is
    // complete from day one.
    pricing::PriceHistoryRepository::record(
        &mut *tx,
        pricing::PriceChangeRecord {
            menu_item_id: item.id,
            cafeteria_id: item.cafeteria_id,
            old_price: rust_decimal::Decimal::ZERO,
            new_price: item.price,
            change_type: pricing::PriceChangeType::Individual,
            changed_by: payload.created_by,
            reason: Some("Initial price"),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully created menu item with id: {}", item.id);
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for GET /api/menu-items with query parameters
/// Supports cafeteria/category filtering, search, price range, sorting
/// and pagination
async fn get_menu_items(
    Query(params): Query<MenuQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    tracing::debug!("Fetching menu items with query parameters: {:?}", params);

    let validated = QueryValidator::validate(params).map_err(ApiError::InvalidQuery)?;

    let mut builder = MenuQueryBuilder::new();

    if let Some(cafeteria_id) = validated.cafeteria_id {
        builder.add_cafeteria_filter(cafeteria_id);
    }
    if let Some(search) = validated.search {
        builder.add_search_filter(&search);
    }
    if let Some(category_id) = validated.category_id {
        builder.add_category_filter(category_id);
    }
    if validated.available_only {
        builder.add_available_only();
    }
    builder.add_price_range(validated.min_price, validated.max_price);

    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }
    builder.set_pagination(validated.page, validated.limit);

    let (query_str, params) = builder.build();

    let mut query = sqlx::query_as::<_, MenuItem>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let items = query.fetch_all(&state.db).await?;

    tracing::debug!("Query returned {} menu items", items.len());
    Ok(Json(items))
}

/// Handler for GET /api/menu-items/:id
#[utoipa::path(
    get,
    path = "/api/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item ID")
    ),
    responses(
        (status = 200, description = "Menu item found", body = MenuItem),
        (status = 404, description = "Menu item not found", body = String, example = json!({"error": "Menu item with id 1 not found"})),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "catalogue"
)]
async fn get_menu_item_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MenuItem>, ApiError> {
    tracing::debug!("Fetching menu item with id: {}", id);

    let item = sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Menu item with id {} not found", id);
            ApiError::NotFound {
                resource: "Menu item".to_string(),
                id: id.to_string(),
            }
        })?;

    tracing::debug!("Successfully retrieved menu item: {}", item.name);
    Ok(Json(item))
}

/// Handler for PUT /api/menu-items/:id
/// Updates a menu item's non-price fields. Price changes go through
/// PATCH /api/menu-items/:id/price so every change is audited.
#[utoipa::path(
    put,
    path = "/api/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item ID")
    ),
    request_body = UpdateMenuItem,
    responses(
        (status = 200, description = "Menu item updated successfully", body = MenuItem),
        (status = 400, description = "Invalid input data", body = String),
        (status = 404, description = "Menu item not found", body = String),
        (status = 409, description = "Duplicate name within cafeteria", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "catalogue"
)]
async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateMenuItem>,
) -> Result<Json<MenuItem>, ApiError> {
    tracing::debug!("Updating menu item with id: {}", id);

    payload.validate()?;

    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, MenuItem>("SELECT * FROM menu_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Menu item with id {} not found for update", id);
            ApiError::NotFound {
                resource: "Menu item".to_string(),
                id: id.to_string(),
            }
        })?;

    if let Some(ref new_name) = payload.name {
        if new_name != &existing.name {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM menu_items WHERE cafeteria_id = $1 AND name = $2 AND id != $3)",
            )
            .bind(existing.cafeteria_id)
            .bind(new_name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                tracing::warn!(
                    "Attempt to rename menu item {} to duplicate name: {}",
                    id,
                    new_name
                );
                return Err(ApiError::Conflict {
                    message: format!(
                        "Menu item with name '{}' already exists in this cafeteria",
                        new_name
                    ),
                });
            }
        }
    }

    let updated = sqlx::query_as::<_, MenuItem>(
        r#"
        UPDATE menu_items
        SET category_id = $1,
            name = $2,
            description = $3,
            image_url = $4,
            stock = $5,
            available = $6,
            updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(payload.category_id.or(existing.category_id))
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.description.unwrap_or(existing.description))
    .bind(payload.image_url.unwrap_or(existing.image_url))
    .bind(payload.stock.unwrap_or(existing.stock))
    .bind(payload.available.unwrap_or(existing.available))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated menu item with id: {}", id);
    Ok(Json(updated))
}

/// Handler for DELETE /api/menu-items/:id
#[utoipa::path(
    delete,
    path = "/api/menu-items/{id}",
    params(
        ("id" = i32, Path, description = "Menu item ID")
    ),
    responses(
        (status = 204, description = "Menu item deleted successfully"),
        (status = 404, description = "Menu item not found", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "catalogue"
)]
async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting menu item with id: {}", id);

    let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("Menu item with id {} not found for deletion", id);
        return Err(ApiError::NotFound {
            resource: "Menu item".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted menu item with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/cafeterias
#[utoipa::path(
    get,
    path = "/api/cafeterias",
    responses(
        (status = 200, description = "List of all cafeterias", body = Vec<Cafeteria>),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "catalogue"
)]
async fn get_cafeterias(State(state): State<AppState>) -> Result<Json<Vec<Cafeteria>>, ApiError> {
    tracing::debug!("Fetching all cafeterias");

    let cafeterias =
        sqlx::query_as::<_, Cafeteria>("SELECT * FROM cafeterias ORDER BY id")
            .fetch_all(&state.db)
            .await?;

    tracing::debug!("Retrieved {} cafeterias", cafeterias.len());
    Ok(Json(cafeterias))
}

/// Handler for GET /api/cafeterias/:id
#[utoipa::path(
    get,
    path = "/api/cafeterias/{id}",
    params(
        ("id" = i32, Path, description = "Cafeteria ID")
    ),
    responses(
        (status = 200, description = "Cafeteria found", body = Cafeteria),
        (status = 404, description = "Cafeteria not found", body = String),
        (status = 500, description = "Internal server error", body = String)
    ),
    tag = "catalogue"
)]
async fn get_cafeteria_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Cafeteria>, ApiError> {
    let cafeteria = sqlx::query_as::<_, Cafeteria>("SELECT * FROM cafeterias WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "Cafeteria".to_string(),
            id: id.to_string(),
        })?;

    Ok(Json(cafeteria))
}

/// Handler for GET /api/cafeterias/:id/categories
async fn get_cafeteria_categories(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories =
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE cafeteria_id = $1 ORDER BY id")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(categories))
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Catalogue
        .route("/api/cafeterias", get(get_cafeterias))
        .route("/api/cafeterias/:id", get(get_cafeteria_by_id))
        .route("/api/cafeterias/:id/categories", get(get_cafeteria_categories))
        .route("/api/menu-items", post(create_menu_item))
        .route("/api/menu-items", get(get_menu_items))
        .route("/api/menu-items/:id", get(get_menu_item_by_id))
        .route("/api/menu-items/:id", put(update_menu_item))
        .route("/api/menu-items/:id", delete(delete_menu_item))
        // Pricing
        .route(
            "/api/menu-items/:id/price",
            patch(pricing::update_price_handler),
        )
        .route(
            "/api/menu-items/:id/price-history",
            get(pricing::price_history_handler),
        )
        .route(
            "/api/cafeterias/:id/price-adjustments",
            post(pricing::bulk_adjust_handler),
        )
        // Discounts
        .route("/api/discounts", post(discounts::create_discount_handler))
        .route("/api/discounts", get(discounts::list_discounts_handler))
        .route(
            "/api/discounts/:id/deactivate",
            patch(discounts::deactivate_discount_handler),
        )
        // Orders
        .route("/api/orders", post(orders::create_order_handler))
        .route("/api/orders", get(orders::get_order_history_handler))
        .route("/api/orders/:order_id", get(orders::get_order_by_id_handler))
        .route(
            "/api/orders/:order_id/status",
            patch(orders::update_order_status_handler),
        )
        // Payments
        .route(
            "/api/orders/:order_id/checkout",
            post(payments::initiate_checkout_handler),
        )
        .route(
            "/api/orders/:order_id/transactions",
            get(payments::get_order_transactions_handler),
        )
        .route("/api/payments/callback", post(payments::mpesa_callback_handler))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Campus Eats API - Starting...");

    // Get configuration from environment variables
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    let daraja_config =
        DarajaConfig::from_env().expect("M-Pesa gateway configuration must be set in environment");
    let gateway: Arc<dyn PaymentGateway> = Arc::new(DarajaGateway::new(daraja_config));

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    // Run SQLx migrations on startup
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    // Create the application router
    let app = create_router(AppState::new(db_pool, gateway));

    // Start the Axum server
    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Campus Eats API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}

#[cfg(test)]
mod tests;
