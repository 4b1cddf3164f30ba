mod admin;
mod cli;
pub mod infra;
mod routes;
mod server;

use homestead::error::AppError;

pub use routes::with_portal_routes;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
