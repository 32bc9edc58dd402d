use std::collections::HashMap;

use agora::{
    FilteredCatalogSnapshot, MarketAggregationService, ProductFilters,
    market::{ProductListing, ProductOwner},
};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Table};

use super::{format_price, format_price_range};
use crate::context::AppContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::{ICONS, THEME};

pub const CATALOG_EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Browse",
        commands: &[
            "agora catalog                                 # Every product",
            "agora catalog --category tech --category home # Products in either category",
        ],
    },
    ExampleGroup {
        title: "Narrow Down",
        commands: &[
            "agora catalog --color red --size M            # By color and size name or id",
            "agora catalog --min-price 10 --max-price 20   # Any SKU priced in range",
            "agora catalog --search keyboard               # Title, description or category",
        ],
    },
];

pub const LISTING_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Product Listing",
    commands: &["agora listing p-keyboard                     # Variants, gallery and seller"],
}];

#[derive(Args)]
pub struct CatalogArgs {
    /// Only products in this category (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Only products offered in this color, by id or name (repeatable)
    #[arg(long = "color")]
    pub colors: Vec<String>,

    /// Only products offered in this size, by id or name (repeatable)
    #[arg(long = "size")]
    pub sizes: Vec<String>,

    /// Lower bound of the price range
    #[arg(long)]
    pub min_price: Option<f64>,

    /// Upper bound of the price range
    #[arg(long)]
    pub max_price: Option<f64>,

    /// Case-insensitive text search
    #[arg(long)]
    pub search: Option<String>,
}

impl CatalogArgs {
    fn into_filters(self) -> ProductFilters {
        let price_range = match (self.min_price, self.max_price) {
            (None, None) => None,
            (min, max) => Some((min.unwrap_or(0.0), max.unwrap_or(f64::MAX))),
        };
        ProductFilters {
            categories: self.categories,
            colors: self.colors,
            sizes: self.sizes,
            price_range,
            search_term: self.search,
        }
    }
}

#[derive(Args)]
pub struct ListingArgs {
    /// Product id
    pub product_id: String,
}

fn seller_label(owner: Option<&ProductOwner>) -> String {
    match owner {
        None => "-".to_string(),
        Some(ProductOwner::Individual { ownership }) => ownership.user_id.clone(),
        Some(ProductOwner::Business { ownership, business, .. }) => business
            .as_ref()
            .map(|business| business.profile.name.clone())
            .unwrap_or_else(|| ownership.user_id.clone()),
    }
}

impl TableDisplay for FilteredCatalogSnapshot {
    fn to_table(&self, output: &OutputManager) -> Table {
        let catalog = &self.catalog;
        let mut prices: HashMap<&str, (f64, f64)> = HashMap::new();
        for sku in &catalog.variants {
            prices
                .entry(sku.product_id.as_str())
                .and_modify(|(low, high)| {
                    *low = low.min(sku.price);
                    *high = high.max(sku.price);
                })
                .or_insert((sku.price, sku.price));
        }

        let mut table = output.table_with_header(&["ID", "Title", "Category", "Price", "Seller"]);
        for product in &catalog.products {
            table.add_row(vec![
                Cell::new(&product.id),
                Cell::new(&product.title),
                Cell::new(&product.category),
                output.price_cell(format_price_range(prices.get(product.id.as_str()).copied())),
                Cell::new(seller_label(catalog.ownership.get(&product.id))),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let ids: Vec<&str> = self.catalog.products.iter().map(|p| p.id.as_str()).collect();
        format!("{}/{} {}", ids.len(), self.total_products, ids.join(","))
    }
}

impl TableDisplay for ProductListing {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.table_with_header(&["SKU", "Color", "Size", "Price", "Stock"]);
        let color_names: HashMap<&str, &str> = self
            .colors
            .iter()
            .filter_map(|option| {
                option
                    .color
                    .as_ref()
                    .map(|color| (option.color_variant_id.as_str(), color.name.as_str()))
            })
            .collect();
        let size_names: HashMap<&str, &str> = self
            .sizes
            .iter()
            .filter_map(|option| {
                option
                    .size
                    .as_ref()
                    .map(|size| (option.size_variant_id.as_str(), size.name.as_str()))
            })
            .collect();

        for sku in &self.variants {
            let lookup = |names: &HashMap<&str, &str>, id: &Option<String>| {
                id.as_deref()
                    .and_then(|id| names.get(id).copied())
                    .unwrap_or("-")
                    .to_string()
            };
            table.add_row(vec![
                Cell::new(sku.sku.clone().unwrap_or_else(|| sku.id.clone())),
                Cell::new(lookup(&color_names, &sku.color_variant_id)),
                Cell::new(lookup(&size_names, &sku.size_variant_id)),
                output.price_cell(format_price(sku.price)),
                Cell::new(sku.stock.to_string()),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!(
            "{} {} {}",
            self.product.id,
            format_price_range(self.price_range),
            if self.in_stock { "in-stock" } else { "sold-out" }
        )
    }
}

pub async fn handle_catalog(args: CatalogArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let service = MarketAggregationService::new(&ctx.store, ctx.settings.aggregation.clone());
    output.progress("Loading catalog");
    let filtered = service.filter_products(&args.into_filters()).await?;
    output.clear_line();

    output.heading("Catalog");
    if filtered.catalog.products.is_empty() {
        output.warning("No products match these filters");
    }
    output.display(&filtered)?;
    output.info(&format!(
        "{} of {} products. Categories: {}",
        filtered.catalog.products.len(),
        filtered.total_products,
        filtered.catalog.categories.join(", ")
    ));
    Ok(())
}

pub async fn handle_listing(args: ListingArgs, ctx: &AppContext, output: &OutputManager) -> Result<()> {
    let service = MarketAggregationService::new(&ctx.store, ctx.settings.aggregation.clone());
    output.progress("Loading catalog");
    let snapshot = service.get_base_data().await?;
    output.clear_line();

    let Some(listing) = snapshot.listing(&args.product_id) else {
        output.error(&format!("No product with id '{}'", args.product_id));
        anyhow::bail!("product not found");
    };

    output.heading(&listing.product.title);
    output.key_value("Category", &listing.product.category);
    output.key_value("Price", &format_price_range(listing.price_range));
    output.key_value("In stock", if listing.in_stock { "yes" } else { "no" });
    output.key_value("Seller", &seller_label(listing.owner.as_ref()));
    if let Some(ProductOwner::Business { reviews, .. }) = &listing.owner {
        for review in reviews {
            let stars = if output.options.no_color {
                format!("{} {:.1}", ICONS.star, review.rating)
            } else {
                format!("{} {:.1}", ICONS.star.color(THEME.warning), review.rating)
            };
            output.bullet(&format!("{stars} {}", review.comment.as_deref().unwrap_or("")));
        }
    }
    for image in &listing.sub_images {
        output.bullet(&image.image_url);
    }
    output.display(&listing)
}
