use bookstore_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    models::Role,
    services::auth_service::hash_password,
};
use uuid::Uuid;

struct SeedBook {
    title: &'static str,
    author: &'static str,
    category: &'static str,
    year: i32,
    description: &'static str,
    price: i64,
    rental_price: i64,
}

const BOOKS: &[SeedBook] = &[
    SeedBook {
        title: "1984",
        author: "George Orwell",
        category: "Science Fiction",
        year: 1949,
        description: "A dystopian novel set in a totalitarian society. One of the best known novels of the 20th century.",
        price: 650,
        rental_price: 120,
    },
    SeedBook {
        title: "Crime and Punishment",
        author: "Fyodor Dostoevsky",
        category: "Novels",
        year: 1866,
        description: "A psychological and philosophical novel about guilt and redemption.",
        price: 700,
        rental_price: 150,
    },
    SeedBook {
        title: "Harry Potter and the Philosopher's Stone",
        author: "J. K. Rowling",
        category: "Science Fiction",
        year: 1997,
        description: "The first novel in the series about the young wizard Harry Potter.",
        price: 800,
        rental_price: 200,
    },
    SeedBook {
        title: "The Master and Margarita",
        author: "Mikhail Bulgakov",
        category: "Novels",
        year: 1967,
        description: "The devil visits Soviet Moscow in a satire full of mysticism and love.",
        price: 750,
        rental_price: 180,
    },
    SeedBook {
        title: "Murder on the Orient Express",
        author: "Agatha Christie",
        category: "Detective",
        year: 1934,
        description: "Hercule Poirot investigates a murder aboard a snowbound train.",
        price: 600,
        rental_price: 130,
    },
    SeedBook {
        title: "The Martian",
        author: "Andy Weir",
        category: "Science Fiction",
        year: 2011,
        description: "An astronaut stranded on Mars has to survive with what is left of his mission.",
        price: 850,
        rental_price: 200,
    },
    SeedBook {
        title: "Three Comrades",
        author: "Erich Maria Remarque",
        category: "Novels",
        year: 1936,
        description: "Friendship and love in Germany between the wars.",
        price: 720,
        rental_price: 160,
    },
    SeedBook {
        title: "Thinking, Fast and Slow",
        author: "Daniel Kahneman",
        category: "Psychology",
        year: 2011,
        description: "How the two systems of thought shape our judgement and decisions.",
        price: 900,
        rental_price: 220,
    },
    SeedBook {
        title: "Sapiens: A Brief History of Humankind",
        author: "Yuval Noah Harari",
        category: "History",
        year: 2011,
        description: "The history of our species from the Stone Age to the present.",
        price: 950,
        rental_price: 230,
    },
    SeedBook {
        title: "Steve Jobs",
        author: "Walter Isaacson",
        category: "Biographies",
        year: 2011,
        description: "The authorized biography of the co-founder of Apple.",
        price: 880,
        rental_price: 210,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 1).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "Administrator", "admin@example.com", "admin123", Role::Admin).await?;
    let user_id = ensure_user(&pool, "Test User", "user@example.com", "user123", Role::User).await?;
    let inserted = seed_books(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}, new books: {inserted}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    // Existing accounts keep their password; only the role is enforced.
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

/// Insert catalog books that are not present yet, matched on title and author.
async fn seed_books(pool: &sqlx::PgPool) -> anyhow::Result<u64> {
    let mut inserted = 0;
    for book in BOOKS {
        let result = sqlx::query(
            r#"
            INSERT INTO books (id, title, author, category, year, description, price, rental_price, image_url)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
            WHERE NOT EXISTS (SELECT 1 FROM books WHERE title = $2 AND author = $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(book.title)
        .bind(book.author)
        .bind(book.category)
        .bind(book.year)
        .bind(book.description)
        .bind(book.price)
        .bind(book.rental_price)
        .bind(format!(
            "https://via.placeholder.com/300x450?text={}",
            book.title.replace(' ', "+")
        ))
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    println!("Seeded books");
    Ok(inserted)
}
