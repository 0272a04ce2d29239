use anyhow::{Context, Result};
use axum_server::tls_rustls::RustlsConfig;
use env_logger::Env;
use log::*;
use structopt::StructOpt;

use k8s_auth_injector::admission_handler::{self, AdmissionServer};
use k8s_auth_injector::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    info!("Starting k8s-auth-injector");

    let config = Config::from_args();

    // Initialize rustls crypto provider
    let provider = rustls::crypto::ring::default_provider();
    rustls::crypto::CryptoProvider::install_default(provider)
        .expect("failed to install crypto provider");

    // check that the cert and key files exist
    if !config.tls_cert_file.exists() {
        error!(
            "TLS certificate file does not exist: {}",
            config.tls_cert_file.display()
        );
        std::process::exit(1);
    }
    if !config.tls_private_key_file.exists() {
        error!(
            "TLS key file does not exist: {}",
            config.tls_private_key_file.display()
        );
        std::process::exit(1);
    }

    info!(
        "Loading TLS certificate {} and key {}",
        config.tls_cert_file.display(),
        config.tls_private_key_file.display()
    );
    let tls_config =
        RustlsConfig::from_pem_file(&config.tls_cert_file, &config.tls_private_key_file)
            .await
            .context("Failed to load TLS configuration")?;

    let sidecar = config.sidecar();
    info!("Injecting sidecar image {}", sidecar.image);
    let app = admission_handler::router(AdmissionServer::new(sidecar));

    let addr = config.listen_addr();
    info!("Starting TLS server on {}", addr);

    axum_server::bind_rustls(addr, tls_config)
        .serve(app.into_make_service())
        .await
        .context("TLS server failed")?;

    info!("Shutting down");
    Ok(())
}
