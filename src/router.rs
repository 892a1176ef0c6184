use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{
    ErrorResponse, HealthResponse,
    auth_handlers::{
        login_handler, logout_handler, me_handler, register_handler, update_me_handler,
    },
    category_handlers::{
        category_stats_handler, create_category_handler, delete_category_handler,
        get_category_handler, list_categories_handler, update_category_handler,
    },
    expense_handlers::{
        create_expense_handler, delete_expense_handler, expense_summary_handler,
        get_expense_handler, list_expenses_handler, update_expense_handler,
    },
    health_handler,
};
use crate::logging::add_tracing_layer;
use crate::middleware::auth_middleware;
use crate::models::{
    AuthResponse, CategoryListResponse, CategoryResponse, CategoryStats, CategoryStatsResponse,
    CategorySummary, CreateCategoryRequest, CreateExpenseRequest, CreateUserRequest, Expense,
    ExpenseListResponse, ExpenseSummary, LoginRequest, Pagination, UpdateCategoryRequest,
    UpdateExpenseRequest, UpdateProfileRequest, User,
};
use crate::state::AppState;
use crate::validation::FieldError;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_handler,
        crate::handlers::auth_handlers::register_handler,
        crate::handlers::auth_handlers::login_handler,
        crate::handlers::auth_handlers::logout_handler,
        crate::handlers::auth_handlers::me_handler,
        crate::handlers::auth_handlers::update_me_handler,
        crate::handlers::category_handlers::list_categories_handler,
        crate::handlers::category_handlers::get_category_handler,
        crate::handlers::category_handlers::category_stats_handler,
        crate::handlers::category_handlers::create_category_handler,
        crate::handlers::category_handlers::update_category_handler,
        crate::handlers::category_handlers::delete_category_handler,
        crate::handlers::expense_handlers::list_expenses_handler,
        crate::handlers::expense_handlers::expense_summary_handler,
        crate::handlers::expense_handlers::get_expense_handler,
        crate::handlers::expense_handlers::create_expense_handler,
        crate::handlers::expense_handlers::update_expense_handler,
        crate::handlers::expense_handlers::delete_expense_handler,
    ),
    components(
        schemas(
            User, CreateUserRequest, UpdateProfileRequest, LoginRequest, AuthResponse,
            CategoryResponse, CategoryListResponse, CategoryStats, CategoryStatsResponse,
            CreateCategoryRequest, UpdateCategoryRequest,
            Expense, CategorySummary, CreateExpenseRequest, UpdateExpenseRequest,
            ExpenseListResponse, Pagination, ExpenseSummary,
            ErrorResponse, FieldError, HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "categories", description = "Expense categories"),
        (name = "expenses", description = "Expense records and queries")
    ),
    info(
        title = "Expense Tracker API",
        version = "0.1.0",
        description = "REST API for tracking personal expenses",
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by the protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the application router with every route, the auth middleware and the shared layers
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler));

    let protected = Router::new()
        .route("/api/auth/me", get(me_handler).put(update_me_handler))
        .route(
            "/api/categories",
            get(list_categories_handler).post(create_category_handler),
        )
        .route(
            "/api/categories/{id}",
            get(get_category_handler)
                .put(update_category_handler)
                .delete(delete_category_handler),
        )
        .route("/api/categories/{id}/stats", get(category_stats_handler))
        .route(
            "/api/expenses",
            get(list_expenses_handler).post(create_expense_handler),
        )
        .route("/api/expenses/summary", get(expense_summary_handler))
        .route(
            "/api/expenses/{id}",
            get(get_expense_handler)
                .put(update_expense_handler)
                .delete(delete_expense_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let app = public
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive());

    add_tracing_layer(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for path in [
            "/api/health",
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/logout",
            "/api/auth/me",
            "/api/categories",
            "/api/categories/{id}",
            "/api/categories/{id}/stats",
            "/api/expenses",
            "/api/expenses/summary",
            "/api/expenses/{id}",
        ] {
            assert!(paths.contains(&path), "{} is not documented", path);
        }

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
