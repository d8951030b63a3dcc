use std::sync::Arc;

use aws_sdk_dynamodb::types::AttributeValue;
use pretty_assertions::assert_eq;

use portal_storage::content::{ContentKind, ContentPatch, NewContent};
use portal_storage::customer_case::NewCustomerCase;
use portal_storage::industry::{IndustryPatch, NewIndustry};
use portal_storage::solution::NewSolution;
use portal_storage::store::memory::InMemoryStore;
use portal_storage::sub_industry::NewSubIndustry;
use portal_storage::use_case::{NewUseCase, UseCasePatch};
use portal_storage::{keys, Catalog, CatalogTables, GuardError, DEPENDENTS_REVISION_ATTRIBUTE};

fn setup() -> (Arc<InMemoryStore>, Catalog) {
    let store = Arc::new(InMemoryStore::new());
    let catalog = Catalog::new(store.clone(), CatalogTables::with_prefix("test"));
    (store, catalog)
}

fn named_industry(name: &str) -> NewIndustry {
    NewIndustry {
        name: name.to_string(),
        description: None,
    }
}

fn assert_blocked_by(result: Result<(), GuardError>, expected: &str) {
    match result {
        Err(GuardError::ReferentialIntegrityViolation { dependents, .. }) => {
            assert_eq!(dependents, expected);
        }
        other => panic!("expected violation citing {expected}, got {other:?}"),
    }
}

#[tokio::test]
async fn test_industry_delete_waits_for_sub_industries() {
    let (_, catalog) = setup();
    let industry = catalog
        .industries
        .create(named_industry("Manufacturing"))
        .await
        .unwrap();
    let sub_industry = catalog
        .sub_industries
        .create(
            &industry.id,
            NewSubIndustry {
                name: "Automotive".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    assert_blocked_by(
        catalog.industries.delete(&industry.id).await,
        "sub-industries",
    );

    catalog.sub_industries.delete(&sub_industry.id).await.unwrap();
    catalog.industries.delete(&industry.id).await.unwrap();

    let gone = catalog.industries.get(&industry.id).await;
    assert!(matches!(gone, Err(GuardError::NotFound { entity, .. }) if entity == "Industry"));
}

#[tokio::test]
async fn test_second_writer_with_same_version_loses() {
    let (_, catalog) = setup();
    let industry = catalog
        .industries
        .create(named_industry("Energy"))
        .await
        .unwrap();
    let first = catalog
        .industries
        .update(
            &industry.id,
            &IndustryPatch {
                description: Some("Power and utilities".to_string()),
                ..IndustryPatch::default()
            },
            industry.version,
        )
        .await
        .unwrap();
    assert_eq!(first.version, 2);

    // Both readers now hold version 2
    let reader_a = catalog.industries.get(&industry.id).await.unwrap();
    let reader_b = catalog.industries.get(&industry.id).await.unwrap();

    let updated = catalog
        .industries
        .update(
            &industry.id,
            &IndustryPatch {
                name: Some("Energy & Utilities".to_string()),
                ..IndustryPatch::default()
            },
            reader_a.version,
        )
        .await
        .unwrap();
    assert_eq!(updated.version, 3);

    let stale = catalog
        .industries
        .update(
            &industry.id,
            &IndustryPatch {
                name: Some("Oil".to_string()),
                ..IndustryPatch::default()
            },
            reader_b.version,
        )
        .await;
    assert!(matches!(stale, Err(GuardError::ConcurrentModification)));

    let stored = catalog.industries.get(&industry.id).await.unwrap();
    assert_eq!(stored.name, "Energy & Utilities");
    assert_eq!(stored.description.as_deref(), Some("Power and utilities"));
    assert_eq!(stored.version, 3);
}

#[tokio::test]
async fn test_update_of_missing_record_is_not_found() {
    let (_, catalog) = setup();
    let result = catalog
        .industries
        .update("nope", &IndustryPatch::default(), 1)
        .await;
    assert!(matches!(result, Err(GuardError::NotFound { .. })));
}

#[tokio::test]
async fn test_sub_industry_of_missing_industry_is_rejected() {
    let (store, catalog) = setup();
    let result = catalog
        .sub_industries
        .create("missing", NewSubIndustry::default())
        .await;

    assert!(matches!(result, Err(GuardError::NotFound { entity, .. }) if entity == "Industry"));
    assert!(store.is_empty("test-sub-industries").await);
}

#[tokio::test]
async fn test_full_catalog_tree_tears_down_bottom_up() {
    let (_, catalog) = setup();
    let industry = catalog
        .industries
        .create(named_industry("Retail"))
        .await
        .unwrap();
    let sub_industry = catalog
        .sub_industries
        .create(
            &industry.id,
            NewSubIndustry {
                name: "Grocery".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
    let use_case = catalog
        .use_cases
        .create(
            &sub_industry.id,
            NewUseCase {
                name: "Shelf monitoring".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(use_case.industry_id, industry.id);

    let solution = catalog
        .solutions
        .create(NewSolution {
            name: "ShelfCam".to_string(),
            ..NewSolution::default()
        })
        .await
        .unwrap();

    let unmapped = catalog
        .customer_cases
        .create(
            &solution.id,
            NewCustomerCase {
                use_case_id: use_case.id.clone(),
                title: "Fewer empty shelves".to_string(),
                customer_name: "FreshMart".to_string(),
                summary: None,
            },
        )
        .await;
    assert!(matches!(unmapped, Err(GuardError::MissingReference(_))));

    catalog
        .mappings
        .create(&use_case.id, &solution.id, Some("Camera based".to_string()))
        .await
        .unwrap();
    let duplicate = catalog
        .mappings
        .create(&use_case.id, &solution.id, None)
        .await;
    assert!(matches!(duplicate, Err(GuardError::AlreadyExists { .. })));

    let by_solution = catalog.mappings.list_by_solution(&solution.id).await.unwrap();
    assert_eq!(by_solution.len(), 1);
    assert_eq!(by_solution[0].use_case_id, use_case.id);

    let customer_case = catalog
        .customer_cases
        .create(
            &solution.id,
            NewCustomerCase {
                use_case_id: use_case.id.clone(),
                title: "Fewer empty shelves".to_string(),
                customer_name: "FreshMart".to_string(),
                summary: None,
            },
        )
        .await
        .unwrap();

    assert_blocked_by(
        catalog.solutions.delete(&solution.id).await,
        "customer cases",
    );
    assert_blocked_by(
        catalog.mappings.delete(&use_case.id, &solution.id).await,
        "customer cases",
    );
    assert_blocked_by(
        catalog.use_cases.delete(&use_case.id).await,
        "solution mappings",
    );
    assert_blocked_by(
        catalog.sub_industries.delete(&sub_industry.id).await,
        "use cases",
    );

    catalog
        .customer_cases
        .delete(&solution.id, &customer_case.id)
        .await
        .unwrap();
    assert_blocked_by(
        catalog.solutions.delete(&solution.id).await,
        "use case mappings",
    );

    catalog
        .mappings
        .delete(&use_case.id, &solution.id)
        .await
        .unwrap();
    catalog.solutions.delete(&solution.id).await.unwrap();
    catalog.use_cases.delete(&use_case.id).await.unwrap();
    catalog.sub_industries.delete(&sub_industry.id).await.unwrap();
    catalog.industries.delete(&industry.id).await.unwrap();
}

#[tokio::test]
async fn test_use_case_update_preserves_unset_fields() {
    let (_, catalog) = setup();
    let industry = catalog
        .industries
        .create(named_industry("Logistics"))
        .await
        .unwrap();
    let sub_industry = catalog
        .sub_industries
        .create(&industry.id, NewSubIndustry::default())
        .await
        .unwrap();
    let use_case = catalog
        .use_cases
        .create(
            &sub_industry.id,
            NewUseCase {
                name: "Route planning".to_string(),
                description: Some("Daily routes".to_string()),
            },
        )
        .await
        .unwrap();

    let updated = catalog
        .use_cases
        .update(
            &use_case.id,
            &UseCasePatch {
                name: Some("Route optimisation".to_string()),
                description: None,
            },
            use_case.version,
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Route optimisation");
    assert_eq!(updated.description.as_deref(), Some("Daily routes"));
    assert_eq!(updated.sub_industry_id, sub_industry.id);
    assert!(updated.updated_at >= use_case.updated_at);

    let listed = catalog
        .use_cases
        .list_by_sub_industry(&sub_industry.id)
        .await
        .unwrap();
    assert_eq!(listed, vec![updated]);
}

#[tokio::test]
async fn test_content_filters_by_industry() {
    let (_, catalog) = setup();
    let industry = catalog
        .industries
        .create(named_industry("Health"))
        .await
        .unwrap();

    let tagged = catalog
        .content
        .create(
            ContentKind::News,
            NewContent {
                title: "New clinic opens".to_string(),
                body: "...".to_string(),
                industry_id: Some(industry.id.clone()),
                ..NewContent::default()
            },
        )
        .await
        .unwrap();
    catalog
        .content
        .create(
            ContentKind::News,
            NewContent {
                title: "Portal update".to_string(),
                body: "...".to_string(),
                ..NewContent::default()
            },
        )
        .await
        .unwrap();

    let all = catalog
        .content
        .list(ContentKind::News, None, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let filtered = catalog
        .content
        .list(ContentKind::News, Some(&industry.id), None)
        .await
        .unwrap();
    assert_eq!(filtered, vec![tagged.clone()]);

    let blogs = catalog
        .content
        .list(ContentKind::Blog, None, None)
        .await
        .unwrap();
    assert!(blogs.is_empty());

    let edited = catalog
        .content
        .update(
            ContentKind::News,
            &tagged.id,
            &ContentPatch {
                title: Some("Clinic opens".to_string()),
                ..ContentPatch::default()
            },
            tagged.version,
        )
        .await
        .unwrap();
    assert_eq!(edited.industry_id, tagged.industry_id);

    let wrong_kind = catalog.content.get(ContentKind::Blog, &tagged.id).await;
    assert!(matches!(wrong_kind, Err(GuardError::NotFound { entity, .. }) if entity == "Blog"));
}

#[tokio::test]
async fn test_content_with_unknown_industry_is_rejected() {
    let (store, catalog) = setup();
    let result = catalog
        .content
        .create(
            ContentKind::Blog,
            NewContent {
                title: "Orphan".to_string(),
                body: "...".to_string(),
                industry_id: Some("missing".to_string()),
                ..NewContent::default()
            },
        )
        .await;

    assert!(matches!(result, Err(GuardError::NotFound { .. })));
    assert!(store.is_empty("test-blogs").await);
}

#[tokio::test]
async fn test_industry_delete_waits_for_tagged_content() {
    let (store, catalog) = setup();
    let industry = catalog
        .industries
        .create(named_industry("Energy"))
        .await
        .unwrap();

    let tagged = |title: &str| NewContent {
        title: title.to_string(),
        body: "...".to_string(),
        industry_id: Some(industry.id.clone()),
        ..NewContent::default()
    };
    let news = catalog
        .content
        .create(ContentKind::News, tagged("Grid expansion"))
        .await
        .unwrap();
    let blog = catalog
        .content
        .create(ContentKind::Blog, tagged("Why storage matters"))
        .await
        .unwrap();

    // Each tagged post bumped the industry like any other child
    let stored = store
        .raw_item("test-industries", &keys::industry(&industry.id))
        .await
        .unwrap();
    assert_eq!(
        stored.get(DEPENDENTS_REVISION_ATTRIBUTE),
        Some(&AttributeValue::N("2".to_string()))
    );

    assert_blocked_by(catalog.industries.delete(&industry.id).await, "news");
    catalog
        .content
        .delete(ContentKind::News, &news.id)
        .await
        .unwrap();

    assert_blocked_by(catalog.industries.delete(&industry.id).await, "blogs");
    catalog
        .content
        .delete(ContentKind::Blog, &blog.id)
        .await
        .unwrap();

    catalog.industries.delete(&industry.id).await.unwrap();
    assert!(matches!(
        catalog.industries.get(&industry.id).await,
        Err(GuardError::NotFound { .. })
    ));
}
