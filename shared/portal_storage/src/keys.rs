//! Synthetic partition and sort keys of the portal tables

use crate::store::ItemKey;

/// Sort key of root records
pub const METADATA: &str = "METADATA";

/// Prefix of industry partitions
pub const INDUSTRY_PREFIX: &str = "INDUSTRY#";
/// Prefix of sub-industry keys
pub const SUB_INDUSTRY_PREFIX: &str = "SUBINDUSTRY#";
/// Prefix of use case keys
pub const USE_CASE_PREFIX: &str = "USECASE#";
/// Prefix of solution keys
pub const SOLUTION_PREFIX: &str = "SOLUTION#";
/// Prefix of customer case sort keys
pub const CUSTOMER_CASE_PREFIX: &str = "CUSTOMERCASE#";
/// Prefix of news partitions
pub const NEWS_PREFIX: &str = "NEWS#";
/// Prefix of blog partitions
pub const BLOG_PREFIX: &str = "BLOG#";

/// `INDUSTRY#<id>`
#[must_use]
pub fn industry_partition(industry_id: &str) -> String {
    format!("{INDUSTRY_PREFIX}{industry_id}")
}

/// `SUBINDUSTRY#<id>`
#[must_use]
pub fn sub_industry_partition(sub_industry_id: &str) -> String {
    format!("{SUB_INDUSTRY_PREFIX}{sub_industry_id}")
}

/// `USECASE#<id>`
#[must_use]
pub fn use_case_partition(use_case_id: &str) -> String {
    format!("{USE_CASE_PREFIX}{use_case_id}")
}

/// `SOLUTION#<id>`
#[must_use]
pub fn solution_partition(solution_id: &str) -> String {
    format!("{SOLUTION_PREFIX}{solution_id}")
}

/// Industry record key
#[must_use]
pub fn industry(industry_id: &str) -> ItemKey {
    ItemKey::new(industry_partition(industry_id), METADATA)
}

/// Sub-industry record key, nested under its industry
#[must_use]
pub fn sub_industry(industry_id: &str, sub_industry_id: &str) -> ItemKey {
    ItemKey::new(
        industry_partition(industry_id),
        sub_industry_partition(sub_industry_id),
    )
}

/// Use case record key, nested under its sub-industry
#[must_use]
pub fn use_case(sub_industry_id: &str, use_case_id: &str) -> ItemKey {
    ItemKey::new(
        sub_industry_partition(sub_industry_id),
        use_case_partition(use_case_id),
    )
}

/// Solution record key
#[must_use]
pub fn solution(solution_id: &str) -> ItemKey {
    ItemKey::new(solution_partition(solution_id), METADATA)
}

/// Use case to solution mapping key
#[must_use]
pub fn mapping(use_case_id: &str, solution_id: &str) -> ItemKey {
    ItemKey::new(
        use_case_partition(use_case_id),
        solution_partition(solution_id),
    )
}

/// Customer case record key, nested under its solution
#[must_use]
pub fn customer_case(solution_id: &str, customer_case_id: &str) -> ItemKey {
    ItemKey::new(
        solution_partition(solution_id),
        format!("{CUSTOMER_CASE_PREFIX}{customer_case_id}"),
    )
}

/// News or blog record key
#[must_use]
pub fn content(prefix: &str, content_id: &str) -> ItemKey {
    ItemKey::new(format!("{prefix}{content_id}"), METADATA)
}
