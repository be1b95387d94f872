use std::net::SocketAddr;

use clap::Parser;
use letdesk::cli::{Args, build_config, init_logging, validate_api_base_url};
use letdesk::create_app;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(api_base_url) = validate_api_base_url(&args.api_base_url) else {
        std::process::exit(1);
    };

    let config = build_config(&args, api_base_url);
    let app = create_app(&config).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build upstream client");
        std::process::exit(1);
    });

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    let local_addr = listener.local_addr().unwrap();
    info!(
        address = %local_addr,
        api = %config.api_base_url,
        "Listening"
    );

    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    if let Err(e) = axum::serve(listener, make_service).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
