//! Category → seller → product navigation with client-side filtering.
//!
//! Everything here is synchronous and recomputed on demand; the only network
//! access is [`Browser::load`].

use crate::api::error::{ApiError, Result};
use crate::api::models::{Category, Listing, Seller};
use crate::api::CatalogBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Original,
    MostReviewed,
}

/// Case-insensitive substring match. A blank term matches everything.
pub fn matches(haystack: &str, term: &str) -> bool {
    let term = term.trim();
    term.is_empty() || haystack.to_lowercase().contains(&term.to_lowercase())
}

pub fn filter_sellers(sellers: &[Seller], term: &str) -> Vec<Seller> {
    sellers.iter().filter(|s| matches(&s.name, term)).cloned().collect()
}

pub fn filter_products(products: &[Listing], term: &str) -> Vec<Listing> {
    products.iter().filter(|p| matches(&p.name, term)).cloned().collect()
}

pub fn filter_categories(categories: &[Category], term: &str) -> Vec<Category> {
    categories.iter().filter(|c| matches(&c.name, term)).cloned().collect()
}

/// Stable: sellers with equal review counts keep their relative order.
pub fn sort_by_reviews(sellers: &mut [Seller]) {
    sellers.sort_by(|a, b| b.reviews.cmp(&a.reviews));
}

#[derive(Debug, Clone, Default)]
pub struct Browser {
    categories: Vec<Category>,
    selected: Option<String>,
    term: String,
    sort: SortOrder,
}

impl Browser {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories, ..Default::default() }
    }

    pub async fn load(backend: &impl CatalogBackend) -> Result<Self> {
        let categories = backend.categories().await?;
        log::info!("[browse] loaded {} categories", categories.len());
        Ok(Self::new(categories))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select_category(&mut self, id: &str) -> Result<()> {
        self.category(id)?;
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn set_term(&mut self, term: &str) {
        self.term = term.to_string();
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    /// Sellers of the selected category (or of every category), narrowed by
    /// the current term and ordered per the current sort.
    pub fn visible_sellers(&self) -> Vec<Seller> {
        let pool: Vec<Seller> = match &self.selected {
            Some(id) => self
                .categories
                .iter()
                .filter(|c| &c.id == id)
                .flat_map(|c| c.sellers.iter().cloned())
                .collect(),
            None => self.categories.iter().flat_map(|c| c.sellers.iter().cloned()).collect(),
        };
        let mut sellers = filter_sellers(&pool, &self.term);
        if self.sort == SortOrder::MostReviewed {
            sort_by_reviews(&mut sellers);
        }
        sellers
    }

    pub fn visible_categories(&self) -> Vec<Category> {
        filter_categories(&self.categories, &self.term)
    }

    pub fn category(&self, id: &str) -> Result<&Category> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("category {id}")))
    }

    pub fn seller(&self, id: &str) -> Result<&Seller> {
        self.categories
            .iter()
            .flat_map(|c| c.sellers.iter())
            .find(|s| s.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("seller {id}")))
    }

    pub fn product(&self, seller_id: &str, product_id: &str) -> Result<&Listing> {
        self.seller(seller_id)?
            .products
            .iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| ApiError::NotFound(format!("product {product_id}")))
    }

    pub fn seller_products(&self, seller_id: &str, term: &str) -> Result<Vec<Listing>> {
        Ok(filter_products(&self.seller(seller_id)?.products, term))
    }
}
