//! Seed the database with a demo catalog and accounts.
//!
//! The built-in data (`seed/default.yaml`) is embedded in the binary; `--file`
//! loads the same format from disk. Seeding is idempotent: categories are
//! matched by name, accounts by email or username, and products are only
//! inserted into an empty catalog.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info, warn};

use shoplite_core::{CategoryId, UserRole};
use shoplite_storefront::db::categories::CategoryRepository;
use shoplite_storefront::db::products::ProductRepository;
use shoplite_storefront::models::category::CategoryRequest;
use shoplite_storefront::models::product::ProductRequest;
use shoplite_storefront::models::user::UpdateProfile;
use shoplite_storefront::services::auth::AuthError;
use shoplite_storefront::services::users::{NewAccount, UserService};

use super::connect;

const BUILT_IN: &str = include_str!("../../seed/default.yaml");

/// Contents of a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCategory {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    /// Category name, resolved against the seeded categories.
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    #[serde(default = "default_role")]
    pub role: UserRole,
}

const fn default_role() -> UserRole {
    UserRole::Customer
}

/// Inserted/skipped counts for one section.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SectionSummary {
    pub inserted: usize,
    pub skipped: usize,
}

impl SeedData {
    /// Parse seed data from YAML.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the document does not match the seed format.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// The data compiled into the binary.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded file is malformed.
    pub fn built_in() -> Result<Self, serde_yaml::Error> {
        Self::from_yaml(BUILT_IN)
    }

    /// Check the data for problems the database would reject or silently accept.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let mut category_names = HashSet::new();
        for category in &self.categories {
            if category.name.trim().is_empty() {
                errors.push("category with empty name".to_owned());
            } else if !category_names.insert(category.name.as_str()) {
                errors.push(format!("duplicate category: {}", category.name));
            }
        }

        let mut product_names = HashSet::new();
        for product in &self.products {
            if product.name.trim().is_empty() {
                errors.push("product with empty name".to_owned());
            } else if !product_names.insert(product.name.as_str()) {
                errors.push(format!("duplicate product: {}", product.name));
            }
            if product.price < Decimal::ZERO {
                errors.push(format!("{}: price must not be negative", product.name));
            }
            if product.stock_quantity < 0 {
                errors.push(format!("{}: stock must not be negative", product.name));
            }
            if let Some(category) = &product.category
                && !category_names.contains(category.as_str())
            {
                errors.push(format!("{}: unknown category {category}", product.name));
            }
        }

        let mut emails = HashSet::new();
        for user in &self.users {
            if !emails.insert(user.email.to_ascii_lowercase()) {
                errors.push(format!("duplicate user email: {}", user.email));
            }
        }

        errors
    }
}

/// Seed from `file`, or from the built-in data when no file is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database operation fails.
pub async fn run(file: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let data = match file {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(format!("File not found: {file_path}").into());
            }
            info!(path = %file_path, "Loading seed data from file");
            SeedData::from_yaml(&tokio::fs::read_to_string(path).await?)?
        }
        None => {
            info!("Loading built-in seed data");
            SeedData::built_in()?
        }
    };

    let errors = data.validate();
    if !errors.is_empty() {
        error!("Seed data validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;

    let (category_ids, categories) = seed_categories(&pool, &data.categories).await?;
    let products = seed_products(&pool, &data.products, &category_ids).await?;
    let users = seed_users(&pool, &data.users).await?;

    info!("Seeding complete!");
    info!(
        "  Categories: {} inserted, {} skipped",
        categories.inserted, categories.skipped
    );
    info!(
        "  Products: {} inserted, {} skipped",
        products.inserted, products.skipped
    );
    info!("  Users: {} inserted, {} skipped", users.inserted, users.skipped);

    Ok(())
}

async fn seed_categories(
    pool: &sqlx::PgPool,
    categories: &[SeedCategory],
) -> Result<(HashMap<String, CategoryId>, SectionSummary), Box<dyn std::error::Error>> {
    let repo = CategoryRepository::new(pool);
    let mut ids = HashMap::new();
    let mut summary = SectionSummary::default();

    for category in categories {
        let id = if let Some(existing) = repo.get_by_name(&category.name).await? {
            summary.skipped += 1;
            existing.id
        } else {
            let request = CategoryRequest {
                name: None,
                description: category.description.clone(),
                image_url: category.image_url.clone(),
                display_order: Some(category.display_order),
                is_active: Some(true),
            };
            summary.inserted += 1;
            repo.create(&category.name, &request).await?.id
        };
        ids.insert(category.name.clone(), id);
    }

    Ok((ids, summary))
}

async fn seed_products(
    pool: &sqlx::PgPool,
    products: &[SeedProduct],
    category_ids: &HashMap<String, CategoryId>,
) -> Result<SectionSummary, Box<dyn std::error::Error>> {
    let repo = ProductRepository::new(pool);

    let existing = repo.count().await?;
    if existing > 0 {
        warn!(existing, "Catalog already has products, skipping product seed");
        return Ok(SectionSummary {
            inserted: 0,
            skipped: products.len(),
        });
    }

    for product in products {
        let request = ProductRequest {
            name: None,
            description: product.description.clone(),
            price: Some(product.price),
            image_url: product.image_url.clone(),
            stock_quantity: Some(product.stock_quantity),
            category_id: product
                .category
                .as_ref()
                .and_then(|name| category_ids.get(name).copied()),
            is_active: Some(true),
        };
        repo.create(&product.name, &request).await?;
    }

    Ok(SectionSummary {
        inserted: products.len(),
        skipped: 0,
    })
}

async fn seed_users(
    pool: &sqlx::PgPool,
    users: &[SeedUser],
) -> Result<SectionSummary, Box<dyn std::error::Error>> {
    let service = UserService::new(pool);
    let mut summary = SectionSummary::default();

    for user in users {
        let account = NewAccount {
            username: &user.username,
            email: &user.email,
            password: &user.password,
            full_name: user.full_name.as_deref(),
            role: user.role,
        };

        let created = match service.register(&account).await {
            Ok(created) => created,
            Err(AuthError::UserAlreadyExists(_)) => {
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if user.phone_number.is_some() || user.address.is_some() {
            let profile = UpdateProfile {
                full_name: None,
                phone_number: user.phone_number.clone(),
                address: user.address.clone(),
            };
            service.update_profile(created.id, &profile).await?;
        }

        info!(email = %created.email, role = %created.role, "Created account");
        summary.inserted += 1;
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_data() {
        let data = SeedData::built_in().unwrap();
        assert_eq!(data.categories.len(), 4);
        assert_eq!(data.products.len(), 8);
        assert_eq!(data.users.len(), 2);
        assert!(data.validate().is_empty());

        let orders: Vec<i32> = data.categories.iter().map(|c| c.display_order).collect();
        assert_eq!(orders, [1, 2, 3, 4]);

        let macbook = data
            .products
            .iter()
            .find(|p| p.name == "MacBook Pro")
            .unwrap();
        assert_eq!(macbook.price, Decimal::from(2_500_000));
        assert_eq!(macbook.stock_quantity, 20);
        assert_eq!(macbook.category.as_deref(), Some("전자제품"));

        let admin = data.users.iter().find(|u| u.username == "admin").unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(admin.email, "admin@shoplite.com");
    }

    #[test]
    fn test_role_defaults_to_customer() {
        let data = SeedData::from_yaml(
            "users:\n  - username: kim\n    email: kim@example.com\n    password: secret1\n",
        )
        .unwrap();
        assert_eq!(data.users.first().unwrap().role, UserRole::Customer);
        assert!(data.categories.is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let data = SeedData::from_yaml(
            r#"
categories:
  - name: Books
  - name: Books
products:
  - name: Novel
    price: "-1"
    stockQuantity: -3
    category: Music
users:
  - username: a
    email: A@example.com
    password: secret1
  - username: b
    email: a@example.com
    password: secret1
"#,
        )
        .unwrap();

        let errors = data.validate();
        assert!(errors.contains(&"duplicate category: Books".to_owned()));
        assert!(errors.contains(&"Novel: price must not be negative".to_owned()));
        assert!(errors.contains(&"Novel: stock must not be negative".to_owned()));
        assert!(errors.contains(&"Novel: unknown category Music".to_owned()));
        assert!(errors.contains(&"duplicate user email: a@example.com".to_owned()));
    }

    #[test]
    fn test_rejects_unknown_role() {
        let result = SeedData::from_yaml(
            "users:\n  - username: x\n    email: x@example.com\n    password: secret1\n    role: OWNER\n",
        );
        assert!(result.is_err());
    }
}
