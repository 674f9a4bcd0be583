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
        admin::{
            AdminDashboard, CouponList, CreateCouponRequest, DashboardStats, LowStockQuery,
            LowStockRow, UpdateCouponRequest, UpdateOrderStatusRequest,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartLine, CartView, ToggleWishlistRequest, UpdateCartItemRequest, WishlistEntry, WishlistList},
        catalog::{
            CreateCategoryRequest, CreateProductRequest, CreateSubCategoryRequest,
            CreateVariantRequest, ProductDetail, ProductList, ProductSummary,
            UpdateProductRequest, UpdateVariantRequest,
        },
        delivery::{
            CompleteDeliveryRequest, DeliveryDashboard, DeliveryStats, ReplyTicketRequest,
            SubmitTicketRequest, TicketList, UpdateDeliveryStatusRequest,
        },
        orders::{CheckoutRequest, OrderList, OrderQuote, OrderWithItems},
        returns::{
            ConfirmPickupRequest, ProcessRefundRequest, ReturnDecisionRequest, ReturnList,
            ReturnWithRefund, SubmitReturnRequest,
        },
        salary::{CreateSalaryRequest, PaySalaryRequest, SalaryList, UpdateSalaryStatusRequest},
    },
    models::{
        Address, BankDetails, CartItem, Category, Coupon, HelpdeskTicket, Order, OrderItem,
        Payment, Product, ProductImage, ProductTag, ProductVariant, Refund, Return,
        SalaryPayment, Review, SubCategory, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, cart, catalog, delivery as delivery_routes, health, orders, params,
        payments, profile, returns as return_routes, reviews, wishlist,
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
        profile::me,
        profile::list_addresses,
        profile::create_address,
        profile::update_address,
        profile::delete_address,
        profile::get_bank_details,
        profile::upsert_bank_details,
        catalog::list_products,
        catalog::list_categories,
        catalog::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        wishlist::list_wishlist,
        wishlist::toggle_wishlist,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::get_invoice,
        payments::gateway_webhook,
        return_routes::submit_return,
        return_routes::list_my_returns,
        return_routes::get_return,
        reviews::submit_review,
        reviews::delete_review,
        delivery_routes::dashboard,
        delivery_routes::update_status,
        delivery_routes::send_otp,
        delivery_routes::complete_delivery,
        delivery_routes::confirm_pickup,
        delivery_routes::submit_ticket,
        admin::dashboard,
        admin::list_low_stock,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::create_category,
        admin::update_category,
        admin::delete_category,
        admin::create_subcategory,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::add_variant,
        admin::update_variant,
        admin::delete_variant,
        admin::list_coupons,
        admin::create_coupon,
        admin::update_coupon,
        admin::delete_coupon,
        admin::list_returns,
        admin::decide_return,
        admin::list_refunds,
        admin::process_refund,
        admin::list_partners,
        admin::list_salaries,
        admin::create_salary,
        admin::pay_salary,
        admin::update_salary_status,
        admin::list_tickets,
        admin::reply_ticket
    ),
    components(
        schemas(
            User,
            Address,
            BankDetails,
            Category,
            SubCategory,
            ProductTag,
            Product,
            ProductImage,
            ProductVariant,
            CartItem,
            Coupon,
            Order,
            OrderItem,
            Payment,
            Return,
            Refund,
            HelpdeskTicket,
            SalaryPayment,
            Review,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            profile::UpsertAddressRequest,
            profile::UpsertBankDetailsRequest,
            catalog::CategoryWithSubs,
            health::HealthData,
            ProductSummary,
            ProductList,
            ProductDetail,
            CreateCategoryRequest,
            CreateSubCategoryRequest,
            CreateProductRequest,
            UpdateProductRequest,
            CreateVariantRequest,
            UpdateVariantRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartLine,
            CartView,
            ToggleWishlistRequest,
            WishlistEntry,
            WishlistList,
            CheckoutRequest,
            OrderQuote,
            OrderList,
            OrderWithItems,
            SubmitReturnRequest,
            ReturnDecisionRequest,
            ConfirmPickupRequest,
            ProcessRefundRequest,
            ReturnWithRefund,
            ReturnList,
            UpdateDeliveryStatusRequest,
            CompleteDeliveryRequest,
            SubmitTicketRequest,
            ReplyTicketRequest,
            DeliveryStats,
            DeliveryDashboard,
            TicketList,
            CreateSalaryRequest,
            PaySalaryRequest,
            UpdateSalaryStatusRequest,
            SalaryList,
            DashboardStats,
            LowStockRow,
            LowStockQuery,
            AdminDashboard,
            UpdateOrderStatusRequest,
            CreateCouponRequest,
            UpdateCouponRequest,
            CouponList,
            admin::PartnerRow,
            reviews::SubmitReviewRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<DeliveryDashboard>,
            ApiResponse<AdminDashboard>,
            ApiResponse<SalaryList>,
            ApiResponse<ReturnList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Profile", description = "Addresses and bank details"),
        (name = "Products", description = "Storefront catalog"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Payments", description = "Payment gateway webhook"),
        (name = "Returns", description = "Return requests"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Delivery", description = "Delivery partner endpoints"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
