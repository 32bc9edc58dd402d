use agora::{
    AgoraError, AggregationSettings, DocumentStore, MarketAggregationService, MemoryStore, ProductFilters,
    fixtures::Fixture,
    market::{NewProduct, NewVariant, ProductOwner},
    models::{SellerType, collections},
};
use serde_json::json;

const DEMO: &str = include_str!("../fixtures/demo.json");

async fn demo_store(store: MemoryStore) -> MemoryStore {
    Fixture::from_json(DEMO).unwrap().load(&store).await.unwrap();
    store
}

fn product_ids(products: &[agora::models::Product]) -> Vec<&str> {
    let mut ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn base_data_resolves_owners() {
    let store = demo_store(MemoryStore::new()).await;
    let market = MarketAggregationService::new(&store, AggregationSettings::default());
    let snapshot = market.get_base_data().await.unwrap();

    assert_eq!(snapshot.products.len(), 3);
    let mut categories = snapshot.categories.clone();
    categories.sort();
    assert_eq!(categories, vec!["apparel", "tech"]);

    match &snapshot.ownership["p-keyboard"] {
        ProductOwner::Business {
            business,
            image_url,
            reviews,
            ..
        } => {
            assert_eq!(business.as_ref().unwrap().profile.name, "Dee's Goods");
            assert_eq!(image_url.as_deref(), Some("https://cdn.example.com/dee/logo.png"));
            let ids: Vec<&str> = reviews.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["r2", "r1"]);
        }
        other => panic!("expected a business owner, got {other:?}"),
    }
    assert!(matches!(snapshot.ownership["p-mouse"], ProductOwner::Individual { .. }));
}

#[tokio::test]
async fn category_then_price_filter() {
    let store = demo_store(MemoryStore::new()).await;
    let market = MarketAggregationService::new(&store, AggregationSettings::default());

    let tech = market
        .filter_products(&ProductFilters {
            categories: vec!["tech".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(product_ids(&tech.catalog.products), vec!["p-keyboard", "p-mouse"]);

    // Keyboard SKUs cost $15 and $40; only the $15 one is in range, which is enough.
    let in_range = market
        .filter_products(&ProductFilters {
            categories: vec!["tech".into()],
            price_range: Some((10.0, 20.0)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(product_ids(&in_range.catalog.products), vec!["p-keyboard"]);
    assert_eq!(in_range.total_products, 3);
    assert!(in_range.catalog.ownership.contains_key("p-keyboard"));
    assert!(!in_range.catalog.ownership.contains_key("p-mouse"));

    let reversed = market
        .filter_products(&ProductFilters {
            price_range: Some((25.0, 20.0)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(product_ids(&reversed.catalog.products), vec!["p-scarf"]);
}

#[tokio::test]
async fn snapshot_reads_are_idempotent() {
    let store = demo_store(MemoryStore::new()).await;
    let market = MarketAggregationService::new(&store, AggregationSettings::default());
    let first = market.get_base_data().await.unwrap();
    let second = market.get_base_data().await.unwrap();
    assert_eq!(first, second);

    let filters = ProductFilters {
        colors: vec!["red".into()],
        ..Default::default()
    };
    assert_eq!(first.filter(&filters), second.filter(&filters));
}

#[tokio::test]
async fn ownership_resolution_is_chunked() {
    let store = MemoryStore::with_max_in_values(2);
    for idx in 0..7 {
        let id = format!("p{idx}");
        store
            .set(
                collections::PRODUCTS,
                &id,
                json!({"title": format!("Item {idx}"), "category": "misc", "createdAt": "2024-01-01T00:00:00Z"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        store
            .set(
                collections::OWNERSHIP,
                &format!("o{idx}"),
                json!({"productId": id, "userId": "seller", "sellerType": "individual"})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let market = MarketAggregationService::new(&store, AggregationSettings::default());
    let snapshot = market.get_base_data().await.unwrap();
    assert_eq!(snapshot.ownership.len(), 7);
}

#[tokio::test]
async fn add_product_writes_every_row() {
    let store = demo_store(MemoryStore::new()).await;
    let market = MarketAggregationService::new(&store, AggregationSettings::default());

    let product_id = market
        .add_product(NewProduct {
            seller_id: "u-dee".into(),
            seller_type: SellerType::Business,
            title: "Desk Mat".into(),
            short_description: "Felt".into(),
            description: String::new(),
            category: "home".into(),
            color_ids: vec!["c-black".into()],
            size_ids: vec!["s-l".into()],
            variants: vec![NewVariant {
                color_id: Some("c-black".into()),
                size_id: Some("s-l".into()),
                price: 30.0,
                stock: 2,
                sku: Some("MAT-BLK-L".into()),
            }],
            sub_images: vec!["https://cdn.example.com/mat.png".into()],
        })
        .await
        .unwrap();

    let snapshot = market.get_base_data().await.unwrap();
    let listing = snapshot.listing(&product_id).unwrap();
    assert_eq!(listing.price_range, Some((30.0, 30.0)));
    assert!(listing.in_stock);
    assert_eq!(listing.colors[0].color.as_ref().unwrap().name, "Black");
    assert_eq!(listing.sizes[0].size.as_ref().unwrap().name, "L");
    assert_eq!(listing.variants[0].color_variant_id.as_deref(), Some(listing.colors[0].color_variant_id.as_str()));
    assert_eq!(listing.sub_images.len(), 1);
    assert!(matches!(listing.owner, Some(ProductOwner::Business { .. })));
    assert!(snapshot.categories.contains(&"home".to_string()));
}

#[tokio::test]
async fn add_product_rejects_invalid_input() {
    let store = demo_store(MemoryStore::new()).await;
    let market = MarketAggregationService::new(&store, AggregationSettings::default());
    let base = NewProduct {
        seller_id: "u-bob".into(),
        seller_type: SellerType::Individual,
        title: "Thing".into(),
        short_description: String::new(),
        description: String::new(),
        category: "misc".into(),
        color_ids: Vec::new(),
        size_ids: Vec::new(),
        variants: Vec::new(),
        sub_images: Vec::new(),
    };

    let invalid = NewProduct {
        title: " ".into(),
        variants: vec![NewVariant {
            price: -1.0,
            color_id: Some("c-red".into()),
            ..Default::default()
        }],
        ..base.clone()
    };
    match market.add_product(invalid).await {
        Err(AgoraError::Validation(err)) => assert_eq!(err.issues.len(), 3),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let not_a_business = NewProduct {
        seller_type: SellerType::Business,
        ..base.clone()
    };
    assert!(matches!(
        market.add_product(not_a_business).await,
        Err(AgoraError::InvalidRequest { .. })
    ));

    let unknown_color = NewProduct {
        color_ids: vec!["c-plaid".into()],
        ..base
    };
    assert!(matches!(
        market.add_product(unknown_color).await,
        Err(AgoraError::NotFound { entity: "color", .. })
    ));
    assert_eq!(store.len(collections::PRODUCTS), 3);
}
