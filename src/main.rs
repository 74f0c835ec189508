#[tokio::main]
async fn main() {
    if let Err(err) = app::run().await {
        eprintln!("qr_pages exited with error: {}", err);
        std::process::exit(1);
    }
}

mod api;
mod app;
mod auth;
mod db;
mod dto;
mod error;
mod models;
mod repositories;
mod services;
mod telemetry;
mod usecases;
mod validation;

#[cfg(test)]
mod testing;
