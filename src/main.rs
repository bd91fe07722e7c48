mod db;
mod error;
mod models;
mod pricing;
mod query;
mod validation;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ApiError;
use models::{CreateProduct, CreateTierPrice, Product, TierPrice, UpdateProduct};
use pricing::PricingService;
use query::{QueryParams, QueryValidator};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        create_product,
        get_product_by_id,
        update_product,
        delete_product,
        pricing::handlers::quote_handler,
    ),
    components(
        schemas(
            Product,
            CreateProduct,
            UpdateProduct,
            TierPrice,
            CreateTierPrice,
            pricing::CalculatedPrice,
            pricing::Discount,
            pricing::PriceCalculationOptions,
            pricing::handlers::QuoteRequest,
        )
    ),
    tags(
        (name = "products", description = "Product catalog management endpoints"),
        (name = "pricing", description = "Price calculation endpoints")
    ),
    info(
        title = "Storefront Pricing API",
        version = "1.0.0",
        description = "Product catalog with tier prices, discounts and a price calculation pipeline"
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pricing: Arc<PricingService>,
}

/// Handler for POST /api/products
/// Creates a new catalog product
#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProduct,
    responses(
        (status = 201, description = "Product created successfully", body = Product),
        (status = 400, description = "Invalid input data"),
        (status = 409, description = "Duplicate product name"),
        (status = 500, description = "Internal server error")
    ),
    tag = "products"
)]
async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    tracing::debug!("Creating new product: {}", payload.name);

    validation::validate_create_product(&payload)?;

    if db::check_duplicate_product(&state.db, &payload.name).await? {
        tracing::warn!("Attempt to create duplicate product: {}", payload.name);
        return Err(ApiError::Conflict {
            message: format!("Product with name '{}' already exists", payload.name),
        });
    }

    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (name, sku, price, offer_price, offer_starts_at, offer_ends_at,
                              is_bundle, per_item_pricing)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, name, sku, price, offer_price, offer_starts_at, offer_ends_at,
                  has_tier_prices, is_bundle, per_item_pricing, created_at, updated_at
        "#,
    )
    .bind(&payload.name)
    .bind(&payload.sku)
    .bind(payload.price)
    .bind(payload.offer_price)
    .bind(payload.offer_starts_at)
    .bind(payload.offer_ends_at)
    .bind(payload.is_bundle)
    .bind(payload.per_item_pricing)
    .fetch_one(&state.db)
    .await?;

    tracing::info!("Successfully created product with id: {}", product.id);
    Ok((StatusCode::CREATED, Json(product)))
}

/// Handler for GET /api/products
/// Supports search, SKU and price filtering, sorting, and pagination
async fn get_products_with_query(
    Query(params): Query<QueryParams>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    tracing::debug!("Fetching products with query parameters: {:?}", params);

    let validated = QueryValidator::validate(params)
        .map_err(|_e| ApiError::ValidationError(validator::ValidationErrors::new()))?;

    let mut builder = query::SQLQueryBuilder::new();

    if let Some(search) = validated.search {
        builder.add_search_filter(&search);
    }
    if let Some(sku) = validated.sku {
        builder.add_sku_filter(&sku);
    }
    builder.add_price_range(validated.min_price, validated.max_price);

    if let Some(sort_field) = validated.sort_field {
        builder.set_sort(sort_field, validated.sort_order);
    }

    builder.set_pagination(validated.page, validated.limit);

    let (query_str, params) = builder.build();

    let mut query = sqlx::query_as::<_, Product>(&query_str);
    for param in params {
        query = query.bind(param);
    }

    let products = query.fetch_all(&state.db).await?;

    tracing::debug!("Query returned {} products", products.len());
    Ok(Json(products))
}

/// Handler for GET /api/products/:id
/// Retrieves a specific product by ID
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = Product),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "products"
)]
async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Product>, ApiError> {
    tracing::debug!("Fetching product with id: {}", id);

    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Product with id {} not found", id);
            ApiError::NotFound {
                resource: "Product".to_string(),
                id: id.to_string(),
            }
        })?;

    tracing::debug!("Successfully retrieved product: {}", product.name);
    Ok(Json(product))
}

/// Handler for PUT /api/products/:id
/// Updates an existing product
#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    request_body = UpdateProduct,
    responses(
        (status = 200, description = "Product updated successfully", body = Product),
        (status = 400, description = "Invalid input data"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Duplicate product name"),
        (status = 500, description = "Internal server error")
    ),
    tag = "products"
)]
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProduct>,
) -> Result<Json<Product>, ApiError> {
    tracing::debug!("Updating product with id: {}", id);

    validation::validate_update_product(&payload)?;

    // A transaction keeps the existence check, duplicate check and update
    // atomic; dropping the transaction on any error rolls everything back.
    let mut tx = state.db.begin().await?;

    let existing = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Product with id {} not found for update", id);
            ApiError::NotFound {
                resource: "Product".to_string(),
                id: id.to_string(),
            }
        })?;

    if let Some(ref new_name) = payload.name {
        if new_name != &existing.name {
            let duplicate_exists: Option<bool> = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM products WHERE name = $1 AND id != $2)",
            )
            .bind(new_name)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            if duplicate_exists.unwrap_or(false) {
                tracing::warn!("Attempt to update product {} to duplicate name: {}", id, new_name);
                return Err(ApiError::Conflict {
                    message: format!("Product with name '{}' already exists", new_name),
                });
            }
        }
    }

    let updated_product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET name = $1,
            sku = $2,
            price = $3,
            offer_price = $4,
            offer_starts_at = $5,
            offer_ends_at = $6,
            is_bundle = $7,
            per_item_pricing = $8,
            updated_at = now()
        WHERE id = $9
        RETURNING id, name, sku, price, offer_price, offer_starts_at, offer_ends_at,
                  has_tier_prices, is_bundle, per_item_pricing, created_at, updated_at
        "#,
    )
    .bind(payload.name.unwrap_or(existing.name))
    .bind(payload.sku.unwrap_or(existing.sku))
    .bind(payload.price.unwrap_or(existing.price))
    .bind(payload.offer_price.or(existing.offer_price))
    .bind(payload.offer_starts_at.or(existing.offer_starts_at))
    .bind(payload.offer_ends_at.or(existing.offer_ends_at))
    .bind(payload.is_bundle.unwrap_or(existing.is_bundle))
    .bind(payload.per_item_pricing.unwrap_or(existing.per_item_pricing))
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!("Successfully updated product with id: {}", id);
    Ok(Json(updated_product))
}

/// Handler for DELETE /api/products/:id
/// Deletes a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 204, description = "Product deleted successfully"),
        (status = 404, description = "Product not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "products"
)]
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    tracing::debug!("Deleting product with id: {}", id);

    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        tracing::debug!("Product with id {} not found for deletion", id);
        return Err(ApiError::NotFound {
            resource: "Product".to_string(),
            id: id.to_string(),
        });
    }

    tracing::info!("Successfully deleted product with id: {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/products/:id/tier-prices
/// Lists a product's tier prices, ascending by quantity threshold
async fn list_tier_prices(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<TierPrice>>, ApiError> {
    let tiers = sqlx::query_as::<_, TierPrice>(
        r#"
        SELECT id, product_id, quantity, price, calculation_method
        FROM tier_prices
        WHERE product_id = $1
        ORDER BY quantity ASC, id ASC
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(tiers))
}

/// Handler for POST /api/products/:id/tier-prices
/// Adds a tier price to a product
async fn create_tier_price(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CreateTierPrice>,
) -> Result<(StatusCode, Json<TierPrice>), ApiError> {
    validation::validate_create_tier_price(&payload)?;

    let tier = db::insert_tier_price_with_flag(
        &state.db,
        id,
        payload.quantity,
        payload.price,
        payload.calculation_method,
    )
    .await?;

    tracing::info!("Added tier price {} to product {}", tier.id, id);
    Ok((StatusCode::CREATED, Json(tier)))
}

/// Handler for DELETE /api/products/:id/tier-prices/:tier_id
/// Removes a tier price from a product
async fn delete_tier_price(
    State(state): State<AppState>,
    Path((id, tier_id)): Path<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    let removed = db::delete_tier_price_with_flag(&state.db, id, tier_id).await?;

    if !removed {
        return Err(ApiError::NotFound {
            resource: "Tier price".to_string(),
            id: tier_id.to_string(),
        });
    }

    tracing::info!("Removed tier price {} from product {}", tier_id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(db: PgPool, pricing: Arc<PricingService>) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let state = AppState { db, pricing };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Catalog routes
        .route("/api/products", post(create_product))
        .route("/api/products", get(get_products_with_query))
        .route("/api/products/:id", get(get_product_by_id))
        .route("/api/products/:id", put(update_product))
        .route("/api/products/:id", delete(delete_product))
        .route("/api/products/:id/tier-prices", get(list_tier_prices))
        .route("/api/products/:id/tier-prices", post(create_tier_price))
        .route(
            "/api/products/:id/tier-prices/:tier_id",
            delete(delete_tier_price),
        )
        // Pricing routes
        .route("/api/pricing/quote", post(pricing::handlers::quote_handler))
        .route(
            "/api/pricing/bundle-quote",
            post(pricing::handlers::bundle_quote_handler),
        )
        .route(
            "/api/pricing/discounts",
            get(pricing::handlers::list_discounts_handler),
        )
        .route(
            "/api/pricing/discounts",
            post(pricing::handlers::create_discount_handler),
        )
        .route(
            "/api/pricing/discounts/:id",
            delete(pricing::handlers::delete_discount_handler),
        )
        .route(
            "/api/pricing/audit/:product_id",
            get(pricing::handlers::get_audit_handler),
        )
        .route(
            "/api/pricing/cache/invalidate",
            post(pricing::handlers::invalidate_cache_handler),
        )
        .route(
            "/api/pricing/metrics",
            get(pricing::handlers::get_metrics_handler),
        )
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

    tracing::info!("Storefront Pricing API - Starting...");

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let pricing = Arc::new(
        PricingService::new(db_pool.clone()).expect("Failed to build the calculator pipeline"),
    );

    if let Err(e) = pricing.warm_cache().await {
        tracing::warn!("Failed to warm the discount cache: {}", e);
    }

    let app = create_router(db_pool, pricing);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Storefront Pricing API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
