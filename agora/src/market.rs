//! Marketplace catalog aggregation.
//!
//! [`MarketAggregationService::get_base_data`] reads every catalog collection
//! once and resolves who sells each product. Filtering is a pure operation on
//! the resulting [`CatalogSnapshot`], so callers can keep one snapshot and
//! filter it repeatedly.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::AggregationSettings,
    errors::{AgoraError, AgoraResult, ValidationError, ValidationIssue},
    id::generate_document_id,
    images::ImageRoleResolver,
    models::{
        Business, Color, ColorVariant, ImageRole, Ownership, Product, Review, SellerType, Size, SizeVariant,
        SubImage, Variant, collections,
    },
    store::{DocumentStore, DocumentStoreExt, Query, SortOrder},
    with_deadline,
};

/// Image roles tried, in order, for a business seller.
const BUSINESS_IMAGE_PREFERENCE: [ImageRole; 2] = [ImageRole::CompanyProfile, ImageRole::Profile];

/// Who sells a product.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProductOwner {
    Individual {
        ownership: Ownership,
    },
    #[serde(rename_all = "camelCase")]
    Business {
        ownership: Ownership,
        /// Absent when the seller has no business profile document.
        business: Option<Business>,
        image_url: Option<String>,
        reviews: Vec<Review>,
    },
}

impl ProductOwner {
    pub fn ownership(&self) -> &Ownership {
        match self {
            ProductOwner::Individual { ownership } | ProductOwner::Business { ownership, .. } => ownership,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub colors: Vec<Color>,
    pub sizes: Vec<Size>,
    pub color_variants: Vec<ColorVariant>,
    pub size_variants: Vec<SizeVariant>,
    pub variants: Vec<Variant>,
    pub sub_images: Vec<SubImage>,
    /// Distinct product categories, first-seen order.
    pub categories: Vec<String>,
    /// Owner of each product, keyed by product id. Products without an ownership row are absent.
    pub ownership: BTreeMap<String, ProductOwner>,
}

/// Catalog filters. Every populated field narrows the result; empty fields are ignored.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductFilters {
    pub categories: Vec<String>,
    /// Global color ids or names (case-insensitive).
    pub colors: Vec<String>,
    /// Global size ids or names (case-insensitive).
    pub sizes: Vec<String>,
    /// Inclusive `[min, max]`; a product matches when any of its SKUs is in range.
    pub price_range: Option<(f64, f64)>,
    /// Case-insensitive substring of title, short description or category.
    pub search_term: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilteredCatalogSnapshot {
    pub filters: ProductFilters,
    /// Products before filtering.
    pub total_products: usize,
    /// Matching products and the rows that belong to them. Vocabularies and
    /// categories stay complete so they can still be offered as facets.
    #[serde(flatten)]
    pub catalog: CatalogSnapshot,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColorOption {
    pub color_variant_id: String,
    pub color: Option<Color>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizeOption {
    pub size_variant_id: String,
    pub size: Option<Size>,
}

/// Denormalized view of one product.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductListing {
    pub product: Product,
    pub colors: Vec<ColorOption>,
    pub sizes: Vec<SizeOption>,
    pub variants: Vec<Variant>,
    pub sub_images: Vec<SubImage>,
    pub price_range: Option<(f64, f64)>,
    pub in_stock: bool,
    pub owner: Option<ProductOwner>,
}

impl CatalogSnapshot {
    /// Applies `filters` as successive AND-combined narrowing stages.
    pub fn filter(&self, filters: &ProductFilters) -> FilteredCatalogSnapshot {
        let products_by_id: HashMap<&str, &Product> =
            self.products.iter().map(|product| (product.id.as_str(), product)).collect();
        let mut matching: HashSet<&str> = products_by_id.keys().copied().collect();

        if !filters.categories.is_empty() {
            let wanted: HashSet<&str> = filters.categories.iter().map(String::as_str).collect();
            matching.retain(|id| {
                products_by_id
                    .get(id)
                    .is_some_and(|product| wanted.contains(product.category.as_str()))
            });
        }

        if !filters.colors.is_empty() {
            let color_ids = vocabulary_ids(self.colors.iter().map(|c| (c.id.as_str(), c.name.as_str())), &filters.colors);
            let with_color: HashSet<&str> = self
                .color_variants
                .iter()
                .filter(|bridge| color_ids.contains(bridge.color_id.as_str()))
                .map(|bridge| bridge.product_id.as_str())
                .collect();
            matching.retain(|id| with_color.contains(id));
        }

        if !filters.sizes.is_empty() {
            let size_ids = vocabulary_ids(self.sizes.iter().map(|s| (s.id.as_str(), s.name.as_str())), &filters.sizes);
            let with_size: HashSet<&str> = self
                .size_variants
                .iter()
                .filter(|bridge| size_ids.contains(bridge.size_id.as_str()))
                .map(|bridge| bridge.product_id.as_str())
                .collect();
            matching.retain(|id| with_size.contains(id));
        }

        if let Some((low, high)) = filters.price_range {
            let (min, max) = if low <= high { (low, high) } else { (high, low) };
            let in_range: HashSet<&str> = self
                .variants
                .iter()
                .filter(|sku| sku.price >= min && sku.price <= max)
                .map(|sku| sku.product_id.as_str())
                .collect();
            matching.retain(|id| in_range.contains(id));
        }

        if let Some(term) = filters
            .search_term
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
        {
            let needle = term.to_lowercase();
            matching.retain(|id| {
                products_by_id.get(id).is_some_and(|product| {
                    [&product.title, &product.short_description, &product.category]
                        .iter()
                        .any(|field| field.to_lowercase().contains(&needle))
                })
            });
        }

        FilteredCatalogSnapshot {
            filters: filters.clone(),
            total_products: self.products.len(),
            catalog: self.restrict_to(&matching),
        }
    }

    /// Everything known about one product, or `None` if it is not in the catalog.
    pub fn listing(&self, product_id: &str) -> Option<ProductListing> {
        let product = self.product(product_id)?.clone();
        let colors_by_id: HashMap<&str, &Color> = self.colors.iter().map(|color| (color.id.as_str(), color)).collect();
        let sizes_by_id: HashMap<&str, &Size> = self.sizes.iter().map(|size| (size.id.as_str(), size)).collect();

        let colors = self
            .color_variants
            .iter()
            .filter(|bridge| bridge.product_id == product_id)
            .map(|bridge| ColorOption {
                color_variant_id: bridge.id.clone(),
                color: colors_by_id.get(bridge.color_id.as_str()).map(|color| (*color).clone()),
            })
            .collect();
        let sizes = self
            .size_variants
            .iter()
            .filter(|bridge| bridge.product_id == product_id)
            .map(|bridge| SizeOption {
                size_variant_id: bridge.id.clone(),
                size: sizes_by_id.get(bridge.size_id.as_str()).map(|size| (*size).clone()),
            })
            .collect();
        let variants: Vec<Variant> = self
            .variants
            .iter()
            .filter(|sku| sku.product_id == product_id)
            .cloned()
            .collect();
        let mut sub_images: Vec<SubImage> = self
            .sub_images
            .iter()
            .filter(|image| image.product_id == product_id)
            .cloned()
            .collect();
        sub_images.sort_by_key(|image| image.order);

        let price_range = variants.iter().map(|sku| sku.price).fold(None, |range, price| match range {
            None => Some((price, price)),
            Some((low, high)) => Some((f64::min(low, price), f64::max(high, price))),
        });
        let in_stock = variants.iter().any(|sku| sku.stock > 0);

        Some(ProductListing {
            product,
            colors,
            sizes,
            variants,
            sub_images,
            price_range,
            in_stock,
            owner: self.ownership.get(product_id).cloned(),
        })
    }

    fn product(&self, product_id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id == product_id)
    }

    fn restrict_to(&self, matching: &HashSet<&str>) -> CatalogSnapshot {
        let keep = |product_id: &String| matching.contains(product_id.as_str());
        CatalogSnapshot {
            products: self.products.iter().filter(|p| keep(&p.id)).cloned().collect(),
            colors: self.colors.clone(),
            sizes: self.sizes.clone(),
            color_variants: self.color_variants.iter().filter(|c| keep(&c.product_id)).cloned().collect(),
            size_variants: self.size_variants.iter().filter(|s| keep(&s.product_id)).cloned().collect(),
            variants: self.variants.iter().filter(|v| keep(&v.product_id)).cloned().collect(),
            sub_images: self.sub_images.iter().filter(|i| keep(&i.product_id)).cloned().collect(),
            categories: self.categories.clone(),
            ownership: self
                .ownership
                .iter()
                .filter(|(product_id, _)| keep(product_id))
                .map(|(product_id, owner)| (product_id.clone(), owner.clone()))
                .collect(),
        }
    }
}

/// Ids of vocabulary entries whose id or name (case-insensitive) is in `wanted`.
fn vocabulary_ids<'v>(entries: impl Iterator<Item = (&'v str, &'v str)>, wanted: &[String]) -> HashSet<&'v str> {
    entries
        .filter(|(id, name)| {
            wanted
                .iter()
                .any(|value| value.as_str() == *id || value.eq_ignore_ascii_case(name))
        })
        .map(|(id, _)| id)
        .collect()
}

fn distinct_categories(products: &[Product]) -> Vec<String> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter(|product| seen.insert(product.category.as_str()))
        .map(|product| product.category.clone())
        .collect()
}

/// SKU requested when listing a product.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewVariant {
    /// Global color id; must be one of the product's colors.
    pub color_id: Option<String>,
    /// Global size id; must be one of the product's sizes.
    pub size_id: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sku: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub seller_id: String,
    pub seller_type: SellerType,
    pub title: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub color_ids: Vec<String>,
    #[serde(default)]
    pub size_ids: Vec<String>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
    /// Gallery image URLs in display order.
    #[serde(default)]
    pub sub_images: Vec<String>,
}

impl NewProduct {
    fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::new("title", "validation.required", "title is required"));
        }
        if self.category.trim().is_empty() {
            issues.push(ValidationIssue::new("category", "validation.required", "category is required"));
        }
        for (idx, variant) in self.variants.iter().enumerate() {
            if !variant.price.is_finite() || variant.price < 0.0 {
                issues.push(ValidationIssue::new(
                    format!("variants[{idx}].price"),
                    "validation.range",
                    "price must be a non-negative number",
                ));
            }
            if let Some(color_id) = &variant.color_id
                && !self.color_ids.contains(color_id)
            {
                issues.push(ValidationIssue::new(
                    format!("variants[{idx}].colorId"),
                    "validation.reference",
                    format!("color {color_id} is not offered for this product"),
                ));
            }
            if let Some(size_id) = &variant.size_id
                && !self.size_ids.contains(size_id)
            {
                issues.push(ValidationIssue::new(
                    format!("variants[{idx}].sizeId"),
                    "validation.reference",
                    format!("size {size_id} is not offered for this product"),
                ));
            }
        }
        for (idx, image_url) in self.sub_images.iter().enumerate() {
            if url::Url::parse(image_url).is_err() {
                issues.push(ValidationIssue::new(
                    format!("subImages[{idx}]"),
                    "validation.url",
                    "must be a valid URL",
                ));
            }
        }
        if issues.is_empty() { Ok(()) } else { Err(ValidationError::new(issues)) }
    }
}

pub struct MarketAggregationService<'a, S> {
    store: &'a S,
    settings: AggregationSettings,
}

impl<'a, S: DocumentStore> MarketAggregationService<'a, S> {
    pub fn new(store: &'a S, settings: AggregationSettings) -> Self {
        Self { store, settings }
    }

    pub async fn get_base_data(&self) -> AgoraResult<CatalogSnapshot> {
        with_deadline(self.settings.request_timeout(), self.load_snapshot()).await
    }

    /// Reads one snapshot and filters it. Callers filtering repeatedly should
    /// hold on to [`get_base_data`](Self::get_base_data) and call
    /// [`CatalogSnapshot::filter`] instead.
    pub async fn filter_products(&self, filters: &ProductFilters) -> AgoraResult<FilteredCatalogSnapshot> {
        let snapshot = self.get_base_data().await?;
        let filtered = snapshot.filter(filters);
        debug!(
            "catalog filter kept {} of {} products",
            filtered.catalog.products.len(),
            filtered.total_products
        );
        Ok(filtered)
    }

    async fn load_snapshot(&self) -> AgoraResult<CatalogSnapshot> {
        let products_query = Query::collection(collections::PRODUCTS);
        let colors_query = Query::collection(collections::COLORS);
        let sizes_query = Query::collection(collections::SIZES);
        let color_variants_query = Query::collection(collections::COLOR_VARIANTS);
        let size_variants_query = Query::collection(collections::SIZE_VARIANTS);
        let variants_query = Query::collection(collections::VARIANTS);
        let sub_images_query = Query::collection(collections::SUB_IMAGES);
        let (products, colors, sizes, color_variants, size_variants, variants, sub_images) = tokio::try_join!(
            self.store.query_as::<Product>(&products_query),
            self.store.query_as::<Color>(&colors_query),
            self.store.query_as::<Size>(&sizes_query),
            self.store.query_as::<ColorVariant>(&color_variants_query),
            self.store.query_as::<SizeVariant>(&size_variants_query),
            self.store.query_as::<Variant>(&variants_query),
            self.store.query_as::<SubImage>(&sub_images_query),
        )?;

        let categories = distinct_categories(&products);
        let product_ids: Vec<String> = products.iter().map(|product| product.id.clone()).collect();
        let ownership = self.resolve_ownership(&product_ids).await?;

        Ok(CatalogSnapshot {
            products,
            colors,
            sizes,
            color_variants,
            size_variants,
            variants,
            sub_images,
            categories,
            ownership,
        })
    }

    /// Seller of each product. Business sellers are joined to their business
    /// profile, their preferred image and the product's reviews.
    async fn resolve_ownership(&self, product_ids: &[String]) -> AgoraResult<BTreeMap<String, ProductOwner>> {
        let rows: Vec<Ownership> = self
            .store
            .query_in_chunks_as(&Query::collection(collections::OWNERSHIP), "productId", product_ids)
            .await?;

        let mut by_product: BTreeMap<String, Ownership> = BTreeMap::new();
        for row in rows {
            if by_product.contains_key(&row.product_id) {
                warn!("product {} has more than one ownership row; keeping the first", row.product_id);
                continue;
            }
            by_product.insert(row.product_id.clone(), row);
        }

        let business_rows: Vec<&Ownership> = by_product
            .values()
            .filter(|row| row.seller_type == SellerType::Business)
            .collect();
        let mut seller_ids: Vec<String> = business_rows.iter().map(|row| row.user_id.clone()).collect();
        seller_ids.sort();
        seller_ids.dedup();
        let business_product_ids: Vec<String> = business_rows.iter().map(|row| row.product_id.clone()).collect();

        let resolver = ImageRoleResolver::new(self.store);
        let reviews_query = Query::collection(collections::REVIEWS).order_by("createdAt", SortOrder::Desc);
        let (businesses, company_images, profile_images, reviews) = tokio::try_join!(
            async {
                self.store
                    .query_in_chunks_as::<Business>(&Query::collection(collections::BUSINESSES), "userId", &seller_ids)
                    .await
                    .map_err(AgoraError::from)
            },
            resolver.resolve_role_for_many(&seller_ids, BUSINESS_IMAGE_PREFERENCE[0]),
            resolver.resolve_role_for_many(&seller_ids, BUSINESS_IMAGE_PREFERENCE[1]),
            async {
                self.store
                    .query_in_chunks_as::<Review>(&reviews_query, "productId", &business_product_ids)
                    .await
                    .map_err(AgoraError::from)
            },
        )?;

        let businesses_by_user: HashMap<&str, &Business> = businesses
            .iter()
            .map(|business| (business.user_id.as_str(), business))
            .collect();
        let mut reviews_by_product: HashMap<String, Vec<Review>> = HashMap::new();
        for review in reviews {
            reviews_by_product
                .entry(review.product_id.clone())
                .or_default()
                .push(review);
        }

        Ok(by_product
            .into_iter()
            .map(|(product_id, ownership)| {
                let owner = match ownership.seller_type {
                    SellerType::Individual => ProductOwner::Individual { ownership },
                    SellerType::Business => {
                        let seller = ownership.user_id.as_str();
                        let business = businesses_by_user.get(seller).map(|business| (*business).clone());
                        if business.is_none() {
                            warn!("business seller {seller} of product {product_id} has no business profile");
                        }
                        let image_url = company_images
                            .get(seller)
                            .or_else(|| profile_images.get(seller))
                            .cloned();
                        let reviews = reviews_by_product.remove(&product_id).unwrap_or_default();
                        ProductOwner::Business {
                            ownership,
                            business,
                            image_url,
                            reviews,
                        }
                    }
                };
                (product_id, owner)
            })
            .collect())
    }

    /// Lists a new product with its color/size bridges, SKUs, gallery and ownership row.
    pub async fn add_product(&self, new_product: NewProduct) -> AgoraResult<String> {
        new_product.validate()?;
        if self.store.get(collections::USERS, &new_product.seller_id).await?.is_none() {
            return Err(AgoraError::not_found("user", new_product.seller_id));
        }
        if new_product.seller_type == SellerType::Business {
            let query = Query::collection(collections::BUSINESSES)
                .eq("userId", new_product.seller_id.as_str())
                .limit(1);
            if self.store.query(&query).await?.is_empty() {
                return Err(AgoraError::invalid(format!(
                    "seller {} has no business profile",
                    new_product.seller_id
                )));
            }
        }
        for color_id in &new_product.color_ids {
            if self.store.get(collections::COLORS, color_id).await?.is_none() {
                return Err(AgoraError::not_found("color", color_id.as_str()));
            }
        }
        for size_id in &new_product.size_ids {
            if self.store.get(collections::SIZES, size_id).await?.is_none() {
                return Err(AgoraError::not_found("size", size_id.as_str()));
            }
        }

        let product_id = generate_document_id();
        let product = Product {
            id: product_id.clone(),
            title: new_product.title,
            short_description: new_product.short_description,
            description: new_product.description,
            category: new_product.category,
            created_at: chrono::Utc::now(),
        };
        self.store.set_as(collections::PRODUCTS, &product_id, &product).await?;

        let mut color_variant_ids = HashMap::new();
        for color_id in new_product.color_ids {
            let bridge = ColorVariant {
                id: generate_document_id(),
                product_id: product_id.clone(),
                color_id,
            };
            self.store.set_as(collections::COLOR_VARIANTS, &bridge.id, &bridge).await?;
            color_variant_ids.insert(bridge.color_id, bridge.id);
        }
        let mut size_variant_ids = HashMap::new();
        for size_id in new_product.size_ids {
            let bridge = SizeVariant {
                id: generate_document_id(),
                product_id: product_id.clone(),
                size_id,
            };
            self.store.set_as(collections::SIZE_VARIANTS, &bridge.id, &bridge).await?;
            size_variant_ids.insert(bridge.size_id, bridge.id);
        }

        for requested in new_product.variants {
            let sku = Variant {
                id: generate_document_id(),
                product_id: product_id.clone(),
                color_variant_id: requested
                    .color_id
                    .and_then(|color_id| color_variant_ids.get(&color_id).cloned()),
                size_variant_id: requested
                    .size_id
                    .and_then(|size_id| size_variant_ids.get(&size_id).cloned()),
                price: requested.price,
                stock: requested.stock,
                sku: requested.sku,
            };
            self.store.set_as(collections::VARIANTS, &sku.id, &sku).await?;
        }

        for (order, image_url) in new_product.sub_images.into_iter().enumerate() {
            let image = SubImage {
                id: String::new(),
                product_id: product_id.clone(),
                image_url,
                order: order as i64,
            };
            self.store.add_as(collections::SUB_IMAGES, &image).await?;
        }

        let ownership = Ownership {
            id: String::new(),
            product_id: product_id.clone(),
            user_id: new_product.seller_id,
            seller_type: new_product.seller_type,
        };
        self.store.add_as(collections::OWNERSHIP, &ownership).await?;
        debug!("listed product {product_id}");
        Ok(product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, title: &str, category: &str) -> Product {
        Product {
            id: id.to_string(),
            title: title.to_string(),
            short_description: format!("{title} for everyday use"),
            description: String::new(),
            category: category.to_string(),
            created_at: Utc::now(),
        }
    }

    fn sku(id: &str, product_id: &str, price: f64) -> Variant {
        Variant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            color_variant_id: None,
            size_variant_id: None,
            price,
            stock: 1,
            sku: None,
        }
    }

    fn snapshot() -> CatalogSnapshot {
        let products = vec![
            product("p1", "Keyboard", "tech"),
            product("p2", "Mouse", "tech"),
            product("p3", "Scarf", "apparel"),
        ];
        CatalogSnapshot {
            categories: distinct_categories(&products),
            products,
            colors: vec![Color {
                id: "red".into(),
                name: "Red".into(),
                hex_code: None,
            }],
            sizes: vec![Size {
                id: "m".into(),
                name: "Medium".into(),
            }],
            color_variants: vec![ColorVariant {
                id: "cv1".into(),
                product_id: "p3".into(),
                color_id: "red".into(),
            }],
            size_variants: vec![SizeVariant {
                id: "sv1".into(),
                product_id: "p3".into(),
                size_id: "m".into(),
            }],
            variants: vec![sku("v1", "p1", 15.0), sku("v2", "p1", 40.0), sku("v3", "p2", 8.0), sku("v4", "p3", 12.0)],
            sub_images: Vec::new(),
            ownership: BTreeMap::new(),
        }
    }

    fn ids(filtered: &FilteredCatalogSnapshot) -> Vec<&str> {
        filtered.catalog.products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        assert_eq!(snapshot().categories, vec!["tech", "apparel"]);
    }

    #[test]
    fn category_and_price_filters_intersect() {
        let catalog = snapshot();
        let tech = catalog.filter(&ProductFilters {
            categories: vec!["tech".into()],
            ..Default::default()
        });
        assert_eq!(ids(&tech), vec!["p1", "p2"]);

        let tech_in_range = catalog.filter(&ProductFilters {
            categories: vec!["tech".into()],
            price_range: Some((10.0, 20.0)),
            ..Default::default()
        });
        assert_eq!(ids(&tech_in_range), vec!["p1"]);
        assert_eq!(tech_in_range.total_products, 3);
    }

    #[test]
    fn any_sku_in_range_qualifies() {
        let filtered = snapshot().filter(&ProductFilters {
            price_range: Some((20.0, 50.0)),
            ..Default::default()
        });
        assert_eq!(ids(&filtered), vec!["p1"]);
        assert_eq!(filtered.catalog.variants.len(), 2);
    }

    #[test]
    fn colors_sizes_and_search_use_bridges_and_text() {
        let catalog = snapshot();
        let red = catalog.filter(&ProductFilters {
            colors: vec!["RED".into()],
            sizes: vec!["m".into()],
            ..Default::default()
        });
        assert_eq!(ids(&red), vec!["p3"]);

        let search = catalog.filter(&ProductFilters {
            search_term: Some("  mOuSe ".into()),
            ..Default::default()
        });
        assert_eq!(ids(&search), vec!["p2"]);

        let nothing = catalog.filter(&ProductFilters {
            colors: vec!["blue".into()],
            ..Default::default()
        });
        assert!(nothing.catalog.products.is_empty());
        assert_eq!(nothing.catalog.colors.len(), 1);
    }

    #[test]
    fn listing_summarises_prices_and_stock() {
        let listing = snapshot().listing("p1").unwrap();
        assert_eq!(listing.price_range, Some((15.0, 40.0)));
        assert!(listing.in_stock);
        assert!(listing.owner.is_none());
        assert!(snapshot().listing("missing").is_none());
    }

    #[test]
    fn filters_deserialize_from_camel_case() {
        let filters: ProductFilters =
            serde_json::from_str(r#"{"categories":["tech"],"priceRange":[10,20],"searchTerm":"key"}"#).unwrap();
        assert_eq!(filters.price_range, Some((10.0, 20.0)));
        assert!(filters.colors.is_empty());
    }
}
