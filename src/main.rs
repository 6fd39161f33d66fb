mod backend;
mod msg;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use backend::firebase::{FirebaseBackend, FirebaseConfig};
use backend::memory::MemoryBackend;
use backend::{AuthProvider, TaskStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let admin_email = services::auth::admin_email_from_env();

    // Backend selection (non-fatal: without Firebase credentials the server
    // runs against seeded in-memory demo data).
    let (auth, store): (Arc<dyn AuthProvider>, Arc<dyn TaskStore>) = match FirebaseConfig::from_env() {
        Some(config) => {
            tracing::info!(project_id = %config.project_id, "firebase backend initialized");
            let firebase = Arc::new(FirebaseBackend::new(config));
            (firebase.clone(), firebase)
        }
        None => {
            tracing::warn!("firebase credentials not configured — using in-memory demo backend");
            let memory = Arc::new(MemoryBackend::with_demo_data(&admin_email));
            (memory.clone(), memory)
        }
    };

    let state = state::AppState::new(auth, store, &admin_email);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, %admin_email, "todo-admin listening");
    axum::serve(listener, app).await.expect("server failed");
}
