mod content;
mod customer_cases;
mod documents;
mod industries;
mod mappings;
mod solutions;
mod sub_industries;
mod use_cases;

use aide::axum::{
    routing::{get, put},
    ApiRouter,
};
use axum::middleware;

use crate::middleware::auth_middleware;

/// Creates the v1 API router with all v1 handler routes
///
/// Reads are public. Writes take an `AuthenticatedUser`, which the auth
/// middleware provides when a valid Bearer token is sent.
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/health", get(super::health::handler))
        .api_route(
            "/industries",
            get(industries::list_industries).post(industries::create_industry),
        )
        .api_route(
            "/industries/{id}",
            get(industries::get_industry)
                .put(industries::update_industry)
                .delete(industries::delete_industry),
        )
        .api_route(
            "/industries/{id}/sub-industries",
            get(sub_industries::list_sub_industries).post(sub_industries::create_sub_industry),
        )
        .api_route(
            "/sub-industries/{id}",
            get(sub_industries::get_sub_industry)
                .put(sub_industries::update_sub_industry)
                .delete(sub_industries::delete_sub_industry),
        )
        .api_route(
            "/sub-industries/{id}/use-cases",
            get(use_cases::list_use_cases).post(use_cases::create_use_case),
        )
        .api_route(
            "/use-cases/{id}",
            get(use_cases::get_use_case)
                .put(use_cases::update_use_case)
                .delete(use_cases::delete_use_case),
        )
        .api_route(
            "/use-cases/{id}/document",
            get(use_cases::get_use_case_document).put(use_cases::put_use_case_document),
        )
        .api_route(
            "/use-cases/{id}/solutions",
            get(mappings::list_use_case_solutions),
        )
        .api_route(
            "/use-cases/{id}/solutions/{solution_id}",
            put(mappings::map_solution).delete(mappings::unmap_solution),
        )
        .api_route(
            "/solutions",
            get(solutions::list_solutions).post(solutions::create_solution),
        )
        .api_route(
            "/solutions/{id}",
            get(solutions::get_solution)
                .put(solutions::update_solution)
                .delete(solutions::delete_solution),
        )
        .api_route(
            "/solutions/{id}/document",
            get(solutions::get_solution_document).put(solutions::put_solution_document),
        )
        .api_route(
            "/solutions/{id}/use-cases",
            get(mappings::list_solution_use_cases),
        )
        .api_route(
            "/solutions/{id}/customer-cases",
            get(customer_cases::list_customer_cases).post(customer_cases::create_customer_case),
        )
        .api_route(
            "/solutions/{id}/customer-cases/{case_id}",
            get(customer_cases::get_customer_case)
                .put(customer_cases::update_customer_case)
                .delete(customer_cases::delete_customer_case),
        )
        .api_route(
            "/news",
            get(content::list_news).post(content::create_news),
        )
        .api_route(
            "/news/{id}",
            get(content::get_news)
                .put(content::update_news)
                .delete(content::delete_news),
        )
        .api_route(
            "/blogs",
            get(content::list_blogs).post(content::create_blog),
        )
        .api_route(
            "/blogs/{id}",
            get(content::get_blog)
                .put(content::update_blog)
                .delete(content::delete_blog),
        )
        .layer(middleware::from_fn(auth_middleware))
}
