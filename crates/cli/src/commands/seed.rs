//! Demo data.
//!
//! Creates a demo account that owns `demo-store`, with two categories, four
//! products, one customer with a default address and five orders carrying
//! 18% tax and 50.00 shipping. Refuses to run twice against the same
//! database.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use etic_api::db::categories::NewCategory;
use etic_api::db::customers::{NewAddress, NewCustomer};
use etic_api::db::orders::{NewOrder, NewOrderItem, StatusChanges};
use etic_api::db::products::NewProduct;
use etic_api::db::stores::NewStore;
use etic_api::db::{
    CategoryRepository, CustomerRepository, OrderRepository, ProductRepository, RepositoryError,
    StoreRepository, UserRepository,
};
use etic_api::models::catalog::Product;
use etic_api::models::customer::Customer;
use etic_api::models::order::AddressSnapshot;
use etic_api::services::auth::hash_password;
use etic_core::{
    Adjustments, CategoryId, CurrencyCode, Email, FulfillmentStatus, LineAmount, LocalizedText,
    OrderStatus, OrderTotals, PaymentStatus, ProductStatus, StoreId, UserId, round_money,
};
use sqlx::PgPool;

use super::{CommandError, connect};

const DEMO_EMAIL: &str = "demo@etic.com";
const DEMO_PASSWORD: &str = "demo12345";
const DEMO_STORE_SLUG: &str = "demo-store";

fn money(units: i64) -> Decimal {
    Decimal::new(units * 100, 2)
}

fn text(tr: &str, en: &str) -> LocalizedText {
    LocalizedText::Localized(BTreeMap::from([
        ("tr".to_owned(), tr.to_owned()),
        ("en".to_owned(), en.to_owned()),
    ]))
}

fn invalid(message: &str) -> CommandError {
    CommandError::InvalidInput(message.to_owned())
}

/// Seed the demo store.
pub async fn demo() -> Result<(), CommandError> {
    let pool = connect().await?;

    let owner = demo_user(&pool).await?;
    let store = StoreRepository::new(&pool)
        .create(
            owner,
            NewStore {
                slug: DEMO_STORE_SLUG.to_owned(),
                name: "Demo Mağaza".to_owned(),
                description: Some("ETIC demo store".to_owned()),
                email: Some(DEMO_EMAIL.to_owned()),
                phone: Some("+90 212 555 00 00".to_owned()),
                default_currency: CurrencyCode::default(),
                default_language: "tr".to_owned(),
            },
        )
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => invalid("demo-store already exists; nothing to do"),
            other => other.into(),
        })?;
    tracing::info!(store_id = %store.id, "Created store {}", store.slug);

    let (electronics, clothing) = categories(&pool, store.id).await?;
    let products = products(&pool, store.id, electronics, clothing).await?;
    let customer = customer(&pool, store.id).await?;
    orders(&pool, store.id, &customer, &products).await?;

    tracing::info!("Demo data loaded!");
    tracing::info!("  Login: {} / {}", DEMO_EMAIL, DEMO_PASSWORD);
    tracing::info!("  Store: {} ({})", store.slug, store.id);
    Ok(())
}

async fn demo_user(pool: &PgPool) -> Result<UserId, CommandError> {
    let users = UserRepository::new(pool);
    let email = Email::parse(DEMO_EMAIL).map_err(|e| invalid(&e.to_string()))?;

    if let Some(user) = users.get_by_email(&email).await? {
        tracing::info!("Reusing existing user {}", user.email);
        return Ok(user.id);
    }

    let hash = hash_password(DEMO_PASSWORD)?;
    let user = users.create(&email, &hash, Some("Demo Kullanıcı")).await?;
    tracing::info!("Created user {}", user.email);
    Ok(user.id)
}

async fn categories(
    pool: &PgPool,
    store: StoreId,
) -> Result<(CategoryId, CategoryId), CommandError> {
    let repo = CategoryRepository::new(pool);

    let electronics = repo
        .create(
            store,
            NewCategory {
                name: text("Elektronik", "Electronics"),
                description: Some(text("Telefon, bilgisayar ve aksesuar", "Phones, computers and accessories")),
                slug: "elektronik".to_owned(),
                parent_id: None,
                position: 0,
                is_visible: true,
            },
        )
        .await?;

    let clothing = repo
        .create(
            store,
            NewCategory {
                name: text("Giyim", "Clothing"),
                description: None,
                slug: "giyim".to_owned(),
                parent_id: None,
                position: 1,
                is_visible: true,
            },
        )
        .await?;

    tracing::info!("Created 2 categories");
    Ok((electronics.id, clothing.id))
}

async fn products(
    pool: &PgPool,
    store: StoreId,
    electronics: CategoryId,
    clothing: CategoryId,
) -> Result<Vec<Product>, CommandError> {
    let repo = ProductRepository::new(pool);

    let catalog = [
        ("Akıllı Telefon", "Smartphone", "akilli-telefon", "PHN-001", 45_000, Some(50_000), 50, electronics, true),
        ("Dizüstü Bilgisayar", "Laptop", "dizustu-bilgisayar", "LPT-001", 65_000, None, 20, electronics, true),
        ("Pamuklu Tişört", "Cotton T-Shirt", "pamuklu-tisort", "TSH-001", 450, Some(600), 200, clothing, false),
        ("Kot Pantolon", "Jeans", "kot-pantolon", "JNS-001", 1_200, None, 80, clothing, false),
    ];

    let mut created = Vec::with_capacity(catalog.len());
    for (tr, en, slug, sku, price, compare_at, quantity, category, featured) in catalog {
        let product = repo
            .create(
                store,
                NewProduct {
                    title: text(tr, en),
                    description: None,
                    slug: slug.to_owned(),
                    price: money(price),
                    compare_at_price: compare_at.map(money),
                    sku: Some(sku.to_owned()),
                    barcode: None,
                    quantity,
                    track_inventory: true,
                    status: ProductStatus::Active,
                    featured,
                    seo_title: None,
                    seo_description: None,
                    category_ids: vec![category],
                    collection_ids: Vec::new(),
                },
            )
            .await?;
        created.push(product);
    }

    tracing::info!("Created {} products", created.len());
    Ok(created)
}

async fn customer(pool: &PgPool, store: StoreId) -> Result<Customer, CommandError> {
    let repo = CustomerRepository::new(pool);

    let customer = repo
        .create(
            store,
            NewCustomer {
                email: Email::parse("ayse@example.com").map_err(|e| invalid(&e.to_string()))?,
                first_name: Some("Ayşe".to_owned()),
                last_name: Some("Yılmaz".to_owned()),
                phone: Some("+90 532 555 00 01".to_owned()),
                accepts_marketing: true,
                tags: vec!["vip".to_owned()],
                note: None,
            },
        )
        .await?;

    repo.add_address(
        store,
        customer.id,
        NewAddress {
            first_name: "Ayşe".to_owned(),
            last_name: "Yılmaz".to_owned(),
            company: None,
            address1: "Bağdat Caddesi No: 123".to_owned(),
            address2: Some("Daire 4".to_owned()),
            city: "İstanbul".to_owned(),
            province: Some("Kadıköy".to_owned()),
            zip: "34710".to_owned(),
            country: "TR".to_owned(),
            phone: Some("+90 532 555 00 01".to_owned()),
            is_default: true,
        },
    )
    .await?;

    tracing::info!("Created customer {}", customer.email);
    Ok(customer)
}

fn snapshot() -> AddressSnapshot {
    AddressSnapshot {
        first_name: "Ayşe".to_owned(),
        last_name: "Yılmaz".to_owned(),
        company: None,
        address1: "Bağdat Caddesi No: 123".to_owned(),
        address2: Some("Daire 4".to_owned()),
        city: "İstanbul".to_owned(),
        province: Some("Kadıköy".to_owned()),
        zip: "34710".to_owned(),
        country: "TR".to_owned(),
        phone: Some("+90 532 555 00 01".to_owned()),
    }
}

/// Price lines at 18% tax and 50.00 shipping.
fn demo_order_lines(lines: &[(&Product, u32)]) -> Result<(Vec<NewOrderItem>, OrderTotals), CommandError> {
    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;

    for (product, quantity) in lines {
        let line = LineAmount {
            price: product.price,
            quantity: *quantity,
        };
        let total = line.total().map_err(|e| invalid(&e.to_string()))?;
        subtotal += total;
        items.push(NewOrderItem {
            product_id: Some(product.id),
            title: product.title.resolve("tr").to_owned(),
            sku: product.sku.clone(),
            quantity: i32::try_from(*quantity).map_err(|e| invalid(&e.to_string()))?,
            price: product.price,
            total,
        });
    }

    let adjustments = Adjustments {
        discount: Decimal::ZERO,
        tax: round_money(subtotal * Decimal::new(18, 2)),
        shipping: money(50),
    };
    let totals = OrderTotals::compute(
        lines.iter().map(|(p, q)| LineAmount {
            price: p.price,
            quantity: *q,
        }),
        adjustments,
    )
    .map_err(|e| invalid(&e.to_string()))?;

    Ok((items, totals))
}

async fn orders(
    pool: &PgPool,
    store: StoreId,
    customer: &Customer,
    products: &[Product],
) -> Result<(), CommandError> {
    let [phone, laptop, shirt, jeans] = products else {
        return Err(invalid("expected four demo products"));
    };

    let plans: [(&[(&Product, u32)], PaymentStatus, OrderStatus, FulfillmentStatus); 5] = [
        (&[(phone, 1)], PaymentStatus::Paid, OrderStatus::Delivered, FulfillmentStatus::Fulfilled),
        (&[(laptop, 1), (shirt, 2)], PaymentStatus::Paid, OrderStatus::Shipped, FulfillmentStatus::Fulfilled),
        (&[(shirt, 3), (jeans, 1)], PaymentStatus::Paid, OrderStatus::Processing, FulfillmentStatus::Unfulfilled),
        (&[(jeans, 2)], PaymentStatus::Pending, OrderStatus::Pending, FulfillmentStatus::Unfulfilled),
        (&[(phone, 1), (shirt, 1)], PaymentStatus::Refunded, OrderStatus::Cancelled, FulfillmentStatus::Cancelled),
    ];

    let repo = OrderRepository::new(pool);
    for (lines, payment_status, order_status, fulfillment_status) in plans {
        let (items, totals) = demo_order_lines(lines)?;
        let order = repo
            .create(
                store,
                NewOrder {
                    customer_id: Some(customer.id),
                    email: customer.email.clone(),
                    phone: customer.phone.clone(),
                    billing_address: snapshot(),
                    shipping_address: snapshot(),
                    currency: CurrencyCode::default(),
                    totals,
                    items,
                    note: None,
                },
            )
            .await?;

        repo.update_status(
            store,
            order.order.id,
            StatusChanges {
                order_status: Some(order_status),
                payment_status: Some(payment_status),
                fulfillment_status: Some(fulfillment_status),
                expected_updated_at: None,
            },
        )
        .await?;

        tracing::info!(
            "Created order {} (total {})",
            order.order.order_number,
            order.order.total
        );
    }

    Ok(())
}
