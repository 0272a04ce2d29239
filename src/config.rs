use std::net::SocketAddr;
use std::path::PathBuf;

use structopt::StructOpt;

use crate::patch::SidecarConfig;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "k8s-auth-injector",
    about = "Mutating admission webhook that puts a basic-auth proxy in front of pod ports"
)]
pub struct Config {
    /// File containing the tls certificate
    #[structopt(long, env = "TLS_CERT_PATH", default_value = "./tls.crt")]
    pub tls_cert_file: PathBuf,

    /// File containing the tls private key matching --tls-cert-file
    #[structopt(long, env = "TLS_KEY_PATH", default_value = "./tls.key")]
    pub tls_private_key_file: PathBuf,

    /// Port to serve the webhook on
    #[structopt(long, env = "PORT", default_value = "8443")]
    pub port: u16,

    /// Image of the injected basic-auth proxy
    #[structopt(
        long,
        env = "SIDECAR_IMAGE",
        default_value = "docker.io/alvaroaleman/k8s-auth-injector-sidecar"
    )]
    pub sidecar_image: String,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    pub fn sidecar(&self) -> SidecarConfig {
        SidecarConfig::with_image(self.sidecar_image.clone())
    }
}
