use clap::Parser;
use sea_orm::{ConnectionTrait, Database, DbBackend, Statement};

/// Maintenance tool: wipe cart ledger rows, either for one owner or for
/// everyone. The HTTP API only lets users clear their own cart.
#[derive(Parser)]
#[command(name = "clear_carts")]
struct Args {
    /// Only clear this owner's cart; omit to clear every cart.
    #[arg(long)]
    owner_id: Option<i32>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = Database::connect(database_url)
        .await
        .expect("Failed to connect to database");

    let res = match args.owner_id {
        Some(owner_id) => db
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "DELETE FROM cart_items WHERE owner_id = $1",
                [owner_id.into()],
            ))
            .await,
        None => db
            .execute(Statement::from_string(
                DbBackend::Postgres,
                "DELETE FROM cart_items".to_owned(),
            ))
            .await,
    }
    .expect("Failed to clear carts");

    println!("Removed {} cart entries", res.rows_affected());
}
