use std::collections::BTreeSet;

use k8s_openapi::api::core::v1::{Container, ContainerPort, Pod};

use crate::error::ResolutionError;

/// First port number tried for the sidecar listener
pub const LISTEN_PORT_START: i32 = 80;

/// Highest valid container port number
pub const MAX_PORT: i32 = 65535;

/// The port selected as upstream, with its position in the original pod
#[derive(Clone, Debug, PartialEq)]
pub struct UpstreamPort {
    /// Index of the owning container in `spec.containers`
    pub container_index: usize,
    /// Index of the port in that container's `ports`
    pub port_index: usize,
    pub port: ContainerPort,
}

/// Containers of the pod, empty when it has no spec
pub fn containers(pod: &Pod) -> &[Container] {
    pod.spec
        .as_ref()
        .map(|spec| spec.containers.as_slice())
        .unwrap_or_default()
}

/// Enumerates every declared port in container-then-port order, keeping
/// the position of each one
pub fn declared_ports(pod: &Pod) -> impl Iterator<Item = (usize, usize, &ContainerPort)> {
    containers(pod)
        .iter()
        .enumerate()
        .flat_map(|(container_index, container)| {
            container
                .ports
                .as_deref()
                .unwrap_or_default()
                .iter()
                .enumerate()
                .map(move |(port_index, port)| (container_index, port_index, port))
        })
}

/// Resolves the single port the sidecar will sit in front of.
///
/// With a port name, exactly one declared port must carry that name. Without
/// one, the pod must declare exactly one port in total. Anything else is an
/// error; the selector never guesses.
pub fn select_upstream_port(
    pod: &Pod,
    port_name: Option<&str>,
) -> Result<UpstreamPort, ResolutionError> {
    let mut candidates = declared_ports(pod).filter(|(_, _, port)| match port_name {
        Some(name) => port.name.as_deref() == Some(name),
        None => true,
    });

    let first = candidates.next();
    let extra = candidates.count();

    match (first, extra, port_name) {
        (Some((container_index, port_index, port)), 0, _) => Ok(UpstreamPort {
            container_index,
            port_index,
            port: port.clone(),
        }),
        (None, _, Some(name)) => Err(ResolutionError::PortNotFound(name.to_string())),
        (Some(_), _, Some(name)) => Err(ResolutionError::AmbiguousPort(name.to_string())),
        (first, extra, None) => Err(ResolutionError::PortSelectionRequiresAnnotation {
            found: first.map_or(0, |_| 1 + extra),
        }),
    }
}

/// Finds the lowest port number, starting at 80, that no container of the
/// pod declares
pub fn unused_listen_port(pod: &Pod) -> Result<i32, ResolutionError> {
    let used: BTreeSet<i32> = declared_ports(pod)
        .map(|(_, _, port)| port.container_port)
        .collect();

    (LISTEN_PORT_START..=MAX_PORT)
        .find(|candidate| !used.contains(candidate))
        .ok_or(ResolutionError::NoFreePort)
}
