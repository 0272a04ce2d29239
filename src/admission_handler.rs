use std::sync::Arc;

use axum::extract::Json;
use axum::routing::{get, post};
use axum::Router;
use k8s_openapi::api::core::v1::Pod;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::core::{DynamicObject, GroupVersionResource};
use log::*;

use crate::error::{AdmissionError, Result};
use crate::mutation::{self, Mutation};
use crate::patch::{self, SidecarConfig};

/// The only resource this webhook mutates
pub fn pod_resource() -> GroupVersionResource {
    GroupVersionResource::gvr("", "v1", "pods")
}

#[derive(Clone)]
pub struct AdmissionServer {
    sidecar: Arc<SidecarConfig>,
}

impl AdmissionServer {
    pub fn new(sidecar: SidecarConfig) -> Self {
        Self {
            sidecar: Arc::new(sidecar),
        }
    }

    pub async fn handle(
        &self,
        Json(review): Json<AdmissionReview<DynamicObject>>,
    ) -> Json<AdmissionReview<DynamicObject>> {
        let req: AdmissionRequest<_> = match review.try_into() {
            Ok(req) => req,
            Err(err) => {
                error!("invalid request: {}", err);
                return Json(AdmissionResponse::invalid(err.to_string()).into_review());
            }
        };

        Json(self.review(&req).into_review())
    }

    /// Answers a single request. The response is always allowed; failures
    /// leave the pod untouched and are reported in the status message and
    /// as a warning.
    pub fn review(&self, req: &AdmissionRequest<DynamicObject>) -> AdmissionResponse {
        debug!(
            "reviewing {:?} of {}/{} (uid: '{}')",
            req.operation, req.resource.resource, req.name, req.uid
        );

        match self.admit(req) {
            Ok(res) => res,
            Err(err) => {
                match &err {
                    AdmissionError::MissingObject => {
                        debug!("skipping {:?} (uid: '{}'): {}", req.operation, req.uid, err)
                    }
                    AdmissionError::Resolution(_) => {
                        warn!("not mutating pod {} (uid: '{}'): {}", req.name, req.uid, err)
                    }
                    _ => error!("error mutating pod {} (uid: '{}'): {}", req.name, req.uid, err),
                }
                let mut res = AdmissionResponse::from(req);
                res.result.message = err.to_string();
                res.warnings = Some(vec![err.to_string()]);
                res
            }
        }
    }

    fn admit(&self, req: &AdmissionRequest<DynamicObject>) -> Result<AdmissionResponse> {
        let expected = pod_resource();
        if req.resource.group != expected.group
            || req.resource.version != expected.version
            || req.resource.resource != expected.resource
        {
            return Err(AdmissionError::ResourceMismatch {
                expected: describe(&expected),
                actual: describe(&req.resource),
            });
        }

        let obj = req.object.as_ref().ok_or(AdmissionError::MissingObject)?;
        let pod = convert_dynamic_to_pod(obj).map_err(AdmissionError::Decode)?;

        let res = AdmissionResponse::from(req);
        let injection = match mutation::mutate(&pod, &self.sidecar)? {
            Mutation::Unchanged => return Ok(res),
            Mutation::Patched(injection) => injection,
        };

        let patch = patch::to_json_patch(&injection.operations)?;
        let res = res
            .with_patch(patch)
            .map_err(|err| AdmissionError::Serialization(err.to_string()))?;

        info!(
            "injecting {} into pod {}: port {} now behind listen port {} (secret {})",
            self.sidecar.name,
            pod_name(&pod, req),
            injection.upstream.port.container_port,
            injection.listen_port,
            injection.secret_name,
        );

        Ok(res)
    }
}

/// Builds the webhook router. The mutating endpoint is served on both `/`
/// and `/mutate`.
pub fn router(server: AdmissionServer) -> Router {
    let mutate = move |review| {
        let server = server.clone();
        async move { server.handle(review).await }
    };

    Router::new()
        .route("/", post(mutate.clone()))
        .route("/mutate", post(mutate))
        .route("/healthz", get(|| async { "ok" }))
}

fn convert_dynamic_to_pod(obj: &DynamicObject) -> std::result::Result<Pod, serde_json::Error> {
    let value = serde_json::to_value(obj)?;
    serde_json::from_value(value)
}

// pods created from a template only get their name after admission
fn pod_name<'a>(pod: &'a Pod, req: &'a AdmissionRequest<DynamicObject>) -> &'a str {
    pod.metadata
        .name
        .as_deref()
        .or(pod.metadata.generate_name.as_deref())
        .unwrap_or(req.name.as_str())
}

fn describe(gvr: &GroupVersionResource) -> String {
    format!("{}/{}/{}", gvr.group, gvr.version, gvr.resource)
}
