use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

/// Names the basic-auth secret; its presence triggers sidecar injection
pub const SECRET_NAME: &str = "authinjector/basic-auth-secret-name";

/// Names the container port to protect when a pod declares more than one
pub const PORT_NAME: &str = "authinjector/port-name";

/// Secret to mount into the sidecar, if injection is requested
pub fn secret_name(pod: &Pod) -> Option<&str> {
    pod.annotations().get(SECRET_NAME).map(String::as_str)
}

/// Name of the port to protect, if given
pub fn port_name(pod: &Pod) -> Option<&str> {
    pod.annotations().get(PORT_NAME).map(String::as_str)
}
