//! Builds the sidecar, its credential volume and the ordered JSON Patch
//! operations that route traffic through it.
//!
//! Operations are emitted as typed [`PodPatch`] values so the positional
//! index arithmetic can be checked without going through serialization.
//! Every index refers to the pod as it was submitted; consumers apply the
//! operations in emission order.

use json_patch::jsonptr::PointerBuf;
use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, SecretVolumeSource, Volume, VolumeMount,
};

use crate::endpoint::UpstreamPort;
use crate::error::PatchError;

pub const SIDECAR_NAME: &str = "auth-sidecar";
pub const DEFAULT_SIDECAR_IMAGE: &str = "docker.io/alvaroaleman/k8s-auth-injector-sidecar";
pub const CREDENTIALS_MOUNT_PATH: &str = "/etc/nginx/.htpasswd";
pub const CREDENTIALS_SUB_PATH: &str = "auth";
pub const VOLUME_NAME_PREFIX: &str = "authinjector-basic-auth-secret";

pub const UPSTREAM_PORT_ENV: &str = "UPSTREAM_PORT";
pub const LISTEN_PORT_ENV: &str = "LISTEN_PORT";

/// Sidecar pull policy; the image tag is not pinned by callers
pub const PULL_ALWAYS: &str = "Always";

/// Describes the proxy container that gets injected
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidecarConfig {
    /// Container name of the sidecar
    pub name: String,
    /// Image reference of the sidecar
    pub image: String,
    /// Path where the sidecar expects the htpasswd file
    pub mount_path: String,
    /// Key within the secret that holds the htpasswd entries
    pub sub_path: String,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            name: SIDECAR_NAME.to_string(),
            image: DEFAULT_SIDECAR_IMAGE.to_string(),
            mount_path: CREDENTIALS_MOUNT_PATH.to_string(),
            sub_path: CREDENTIALS_SUB_PATH.to_string(),
        }
    }
}

impl SidecarConfig {
    pub fn with_image(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }
}

/// A single structural edit against the submitted pod
#[derive(Clone, Debug, PartialEq)]
pub enum PodPatch {
    /// Drop a port from a container so it is only reachable via the sidecar
    RemovePort { container: usize, port: usize },
    /// Insert a container at `index` in `spec.containers`
    AddContainer { index: usize, container: Container },
    /// Insert a volume at `index` in `spec.volumes`
    AddVolume { index: usize, volume: Volume },
}

impl PodPatch {
    pub fn path(&self) -> String {
        match self {
            Self::RemovePort { container, port } => {
                format!("/spec/containers/{container}/ports/{port}")
            }
            Self::AddContainer { index, .. } => format!("/spec/containers/{index}"),
            Self::AddVolume { index, .. } => format!("/spec/volumes/{index}"),
        }
    }

    pub fn to_operation(&self) -> Result<PatchOperation, PatchError> {
        let path = self.path();
        let pointer = PointerBuf::parse(path.as_str()).map_err(|err| PatchError::Path {
            path: path.clone(),
            reason: err.to_string(),
        })?;

        let op = match self {
            Self::RemovePort { .. } => PatchOperation::Remove(RemoveOperation { path: pointer }),
            Self::AddContainer { container, .. } => PatchOperation::Add(AddOperation {
                path: pointer,
                value: serde_json::to_value(container)?,
            }),
            Self::AddVolume { volume, .. } => PatchOperation::Add(AddOperation {
                path: pointer,
                value: serde_json::to_value(volume)?,
            }),
        };

        Ok(op)
    }
}

/// Converts typed operations into an RFC 6902 document, preserving order
pub fn to_json_patch(operations: &[PodPatch]) -> Result<Patch, PatchError> {
    operations
        .iter()
        .map(PodPatch::to_operation)
        .collect::<Result<Vec<_>, _>>()
        .map(Patch)
}

/// Name shared by the credential volume and the sidecar's mount of it
pub fn volume_name(secret_name: &str) -> String {
    format!("{VOLUME_NAME_PREFIX}-{secret_name}")
}

pub fn sidecar_container(
    config: &SidecarConfig,
    upstream: &ContainerPort,
    listen_port: i32,
    secret_name: &str,
) -> Container {
    Container {
        name: config.name.clone(),
        image: Some(config.image.clone()),
        ports: Some(vec![ContainerPort {
            name: upstream.name.clone(),
            container_port: listen_port,
            protocol: upstream.protocol.clone(),
            ..Default::default()
        }]),
        env: Some(vec![
            EnvVar {
                name: UPSTREAM_PORT_ENV.to_string(),
                value: Some(upstream.container_port.to_string()),
                ..Default::default()
            },
            EnvVar {
                name: LISTEN_PORT_ENV.to_string(),
                value: Some(listen_port.to_string()),
                ..Default::default()
            },
        ]),
        volume_mounts: Some(vec![VolumeMount {
            name: volume_name(secret_name),
            mount_path: config.mount_path.clone(),
            sub_path: Some(config.sub_path.clone()),
            ..Default::default()
        }]),
        image_pull_policy: Some(PULL_ALWAYS.to_string()),
        ..Default::default()
    }
}

pub fn secret_volume(secret_name: &str) -> Volume {
    Volume {
        name: volume_name(secret_name),
        secret: Some(SecretVolumeSource {
            secret_name: Some(secret_name.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Builds the ordered operations that move `upstream` behind the sidecar.
///
/// The order is fixed: the port removal comes first and addresses the
/// upstream port's original position, then the sidecar and its volume are
/// appended at `container_count` and `volume_count`.
pub fn build_patch(
    config: &SidecarConfig,
    upstream: &UpstreamPort,
    listen_port: i32,
    secret_name: &str,
    container_count: usize,
    volume_count: usize,
) -> Vec<PodPatch> {
    vec![
        PodPatch::RemovePort {
            container: upstream.container_index,
            port: upstream.port_index,
        },
        PodPatch::AddContainer {
            index: container_count,
            container: sidecar_container(config, &upstream.port, listen_port, secret_name),
        },
        PodPatch::AddVolume {
            index: volume_count,
            volume: secret_volume(secret_name),
        },
    ]
}
