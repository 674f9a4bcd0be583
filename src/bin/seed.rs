use chrono::{Datelike, Days, Utc};
use skincraft_api::{config::AppConfig, db::create_pool, services::auth_service};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin@skincraft.test", "admin123", "Admin", "Store Admin").await?;
    let customer_id =
        ensure_user(&pool, "customer@skincraft.test", "customer123", "Customer", "Asha Rao").await?;
    let partner_id =
        ensure_user(&pool, "partner@skincraft.test", "partner123", "Delivery", "Ravi Kumar").await?;

    ensure_delivery_profile(&pool, partner_id).await?;
    seed_catalog(&pool).await?;
    seed_coupons(&pool).await?;

    println!(
        "Seed completed. Admin: {admin_id}, Customer: {customer_id}, Partner: {partner_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
    full_name: &str,
) -> anyhow::Result<Uuid> {
    let password_hash =
        auth_service::hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, full_name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(full_name)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(row.0)
}

async fn ensure_delivery_profile(pool: &sqlx::PgPool, partner_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO delivery_profiles
            (user_id, license_number, vehicle_type, vehicle_number, base_salary)
        VALUES ($1, 'DL-042-2024', 'Bike', 'KA01AB1234', 1500000)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(partner_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let categories = [("Skincare", "Face Serum"), ("Haircare", "Shampoo")];

    for (category, subcategory) in categories {
        let (category_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO categories (id, name) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category)
        .fetch_one(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO subcategories (id, category_id, name) VALUES ($1, $2, $3)
            ON CONFLICT (category_id, name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category_id)
        .bind(subcategory)
        .execute(pool)
        .await?;

        seed_products(pool, category_id, category).await?;
    }

    println!("Seeded catalog");
    Ok(())
}

async fn seed_products(
    pool: &sqlx::PgPool,
    category_id: Uuid,
    category: &str,
) -> anyhow::Result<()> {
    // (name, description, [(unit_value, price paise, stock)])
    let products: &[(&str, &str, &[(i32, i64, i32)])] = match category {
        "Skincare" => &[
            (
                "Vitamin C Glow Serum",
                "Brightening serum with 10% vitamin C",
                &[(15, 54_900, 40), (30, 89_900, 25)],
            ),
            (
                "Ceramide Barrier Cream",
                "Daily moisturizer for sensitive skin",
                &[(50, 64_900, 30)],
            ),
        ],
        _ => &[(
            "Argan Repair Shampoo",
            "Sulphate-free wash for damaged hair",
            &[(200, 39_900, 60), (400, 69_900, 35)],
        )],
    };

    let expiry = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(540))
        .unwrap_or_else(|| Utc::now().date_naive());
    let batch = format!("B{}{:02}", Utc::now().year(), Utc::now().month());

    for (name, description, variants) in products {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            continue;
        }

        let (product_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, description, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(category_id)
        .fetch_one(pool)
        .await?;

        for (unit_value, price, stock) in *variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants
                    (id, product_id, unit_value, unit_type, price, stock, batch_number, expiry_date)
                VALUES ($1, $2, $3, 'ml', $4, $5, $6, $7)
                ON CONFLICT (product_id, unit_value, unit_type, batch_number) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(unit_value)
            .bind(price)
            .bind(stock)
            .bind(&batch)
            .bind(expiry)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

async fn seed_coupons(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let today = Utc::now().date_naive();
    let next_year = today
        .checked_add_days(Days::new(365))
        .unwrap_or(today);

    // (code, type, value, min_order, max_discount)
    let coupons: &[(&str, &str, i64, i64, Option<i64>)] = &[
        ("NEW50", "Percent", 50, 0, Some(25_000)),
        ("GLOW10", "Percent", 10, 30_000, Some(10_000)),
        ("FLAT100", "Flat", 10_000, 50_000, None),
    ];

    for (code, discount_type, value, min_order, max_discount) in coupons {
        sqlx::query(
            r#"
            INSERT INTO coupons
                (id, code, discount_type, value, min_order_amount, max_discount, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(discount_type)
        .bind(value)
        .bind(min_order)
        .bind(max_discount)
        .bind(today)
        .bind(next_year)
        .execute(pool)
        .await?;
    }

    println!("Seeded coupons");
    Ok(())
}
