use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        categories::{CategoryList, CategoryRequest},
        customers::{CreateCustomerRequest, CustomerList},
        dashboard::{DashboardStats, NewOrdersCount, StatusCounts},
        orders::{
            CreateOrderRequest, OrderItemInput, OrderList, UpdateOrderRequest,
            UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        seed::SeedSummary,
    },
    models::{
        Category, Customer, Modification, Order, OrderItem, OrderStatus, Product, Role,
        UserSummary,
    },
    response::{ApiResponse, Meta},
    routes::{
        auth, categories, customers, dashboard, health, orders, params, products, seed,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        products::list_products,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        categories::create_category,
        categories::update_category,
        categories::delete_category,
        customers::list_customers,
        customers::create_customer,
        orders::list_orders,
        orders::list_unacknowledged,
        orders::new_orders_count,
        orders::get_order,
        orders::create_order,
        orders::update_order,
        orders::update_order_status,
        orders::acknowledge_order,
        orders::delete_order,
        dashboard::stats,
        seed::seed
    ),
    components(
        schemas(
            Role,
            UserSummary,
            Product,
            Category,
            Customer,
            Order,
            OrderItem,
            OrderStatus,
            Modification,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CategoryRequest,
            CategoryList,
            CreateCustomerRequest,
            CustomerList,
            OrderItemInput,
            CreateOrderRequest,
            UpdateOrderRequest,
            UpdateOrderStatusRequest,
            OrderList,
            StatusCounts,
            DashboardStats,
            NewOrdersCount,
            SeedSummary,
            params::ProductQuery,
            params::CustomerQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<ProductList>,
            ApiResponse<DashboardStats>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and token echo"),
        (name = "Products", description = "Product catalog"),
        (name = "Categories", description = "Product categories"),
        (name = "Customers", description = "Customer directory"),
        (name = "Orders", description = "Orders, status and acknowledgement"),
        (name = "Dashboard", description = "Daily counters"),
        (name = "Seed", description = "Demo data bootstrap"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
