use k8s_openapi::api::core::v1::Pod;

use crate::annotations;
use crate::endpoint::{self, UpstreamPort};
use crate::error::ResolutionError;
use crate::patch::{self, PodPatch, SidecarConfig};

/// Outcome of evaluating a single pod
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// The pod carries no secret-name annotation
    Unchanged,
    /// The sidecar gets injected
    Patched(Injection),
}

/// Everything decided for a pod that gets a sidecar
#[derive(Clone, Debug, PartialEq)]
pub struct Injection {
    pub secret_name: String,
    pub upstream: UpstreamPort,
    pub listen_port: i32,
    pub operations: Vec<PodPatch>,
}

impl Mutation {
    pub fn operations(&self) -> &[PodPatch] {
        match self {
            Self::Unchanged => &[],
            Self::Patched(injection) => &injection.operations,
        }
    }
}

/// Decides whether and how to inject the auth sidecar into `pod`.
///
/// Pure function of the pod and the sidecar description; it performs no
/// I/O and leaves error policy to the caller.
pub fn mutate(pod: &Pod, sidecar: &SidecarConfig) -> Result<Mutation, ResolutionError> {
    let Some(secret_name) = annotations::secret_name(pod) else {
        return Ok(Mutation::Unchanged);
    };

    let upstream = endpoint::select_upstream_port(pod, annotations::port_name(pod))?;
    let listen_port = endpoint::unused_listen_port(pod)?;

    let spec = pod.spec.as_ref();
    let container_count = spec.map_or(0, |spec| spec.containers.len());
    let volume_count = spec
        .and_then(|spec| spec.volumes.as_ref())
        .map_or(0, Vec::len);

    let operations = patch::build_patch(
        sidecar,
        &upstream,
        listen_port,
        secret_name,
        container_count,
        volume_count,
    );

    Ok(Mutation::Patched(Injection {
        secret_name: secret_name.to_string(),
        upstream,
        listen_port,
        operations,
    }))
}
