//! Visiting every string reachable from an object.
//!
//! Parameter substitution must reach strings at arbitrary depth, in typed
//! structures as well as in generic documents. [`VisitStrings`] is the
//! common capability of both:
//!
//! - generic documents ([`serde_json::Value`]) visit string values of maps and
//!   arrays recursively;
//! - typed structures visit their fields, either through
//!   [`#[derive(VisitStrings)]`](derive@VisitStrings) or, for the
//!   `k8s-openapi` kinds, through their serde representation (see
//!   [`visit_serialized`]).
//!
//! Map keys and non-string scalars are never passed to the rewrite function.
use std::{
    collections::{BTreeMap, HashMap},
    hash::BuildHasher,
};

use indexmap::IndexMap;
use k8s_openapi::{
    ByteString,
    api::{
        apps::v1::{DaemonSet, Deployment, StatefulSet},
        batch::v1::{CronJob, Job},
        core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Secret, Service, ServiceAccount},
        networking::v1::Ingress,
        rbac::v1::{Role, RoleBinding},
    },
    apimachinery::pkg::{
        api::resource::Quantity,
        apis::meta::v1::{MicroTime, ObjectMeta, OwnerReference, Time},
        util::intstr::IntOrString,
    },
};
use kube::core::{DynamicObject, TypeMeta};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

pub use stackable_template_derive::VisitStrings;

use crate::template::TemplateResource;

/// A type containing strings which can be rewritten in place.
///
/// Most users will want to implement this for custom types using [the
/// associated derive macro](derive@VisitStrings).
///
/// # Example
///
/// ```
/// # use stackable_template::visit::{VisitStrings, visit_object_strings};
/// #[derive(VisitStrings)]
/// struct Container {
///     image: String,
///     args: Vec<String>,
///     replicas: u16,
/// }
///
/// let mut container = Container {
///     image: "nginx:${VERSION}".to_owned(),
///     args: vec!["--port".to_owned(), "${PORT}".to_owned()],
///     replicas: 1,
/// };
/// visit_object_strings(&mut container, |s| {
///     s.replace("${VERSION}", "1.27").replace("${PORT}", "8080")
/// });
///
/// assert_eq!(container.image, "nginx:1.27");
/// assert_eq!(container.args, ["--port", "8080"]);
/// ```
pub trait VisitStrings {
    /// Replaces every reachable string with the result of `rewrite`.
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String);
}

/// Rewrites every string reachable from `root`. Each string location is
/// passed to `rewrite` exactly once.
pub fn visit_object_strings<T>(root: &mut T, mut rewrite: impl FnMut(&str) -> String)
where
    T: VisitStrings + ?Sized,
{
    root.visit_strings(&mut rewrite);
}

/// Visits the strings of `value` through its serde representation.
///
/// The value is serialized into a JSON document, the document's strings are
/// rewritten and the result is deserialized back into `value`. Values which
/// fail to (de)serialize are left unchanged. Returns whether `value` was
/// replaced.
///
/// Every string of the serialized form is passed to `rewrite`, including the
/// encoded form of non-string scalars such as [`ByteString`] or [`Time`].
/// Callers move such fields out of `value` before visiting it.
pub fn visit_serialized<T>(value: &mut T, rewrite: &mut dyn FnMut(&str) -> String) -> bool
where
    T: Serialize + DeserializeOwned,
{
    let mut document = match serde_json::to_value(&*value) {
        Ok(document) => document,
        Err(error) => {
            tracing::warn!(
                error = &error as &dyn std::error::Error,
                r#type = std::any::type_name::<T>(),
                "failed to serialize value, skipping string substitution"
            );
            return false;
        }
    };

    document.visit_strings(rewrite);

    match serde_json::from_value(document) {
        Ok(rewritten) => {
            *value = rewritten;
            true
        }
        Err(error) => {
            tracing::warn!(
                error = &error as &dyn std::error::Error,
                r#type = std::any::type_name::<T>(),
                "rewritten value no longer matches its type, leaving it unchanged"
            );
            false
        }
    }
}

impl VisitStrings for String {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        let rewritten = rewrite(self);
        if rewritten != *self {
            *self = rewritten;
        }
    }
}

impl<T: VisitStrings + ?Sized> VisitStrings for Box<T> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        T::visit_strings(self, rewrite);
    }
}

impl<T: VisitStrings> VisitStrings for Option<T> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        if let Some(value) = self {
            value.visit_strings(rewrite);
        }
    }
}

impl<T: VisitStrings> VisitStrings for [T] {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        for item in self {
            item.visit_strings(rewrite);
        }
    }
}

impl<T: VisitStrings> VisitStrings for Vec<T> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        self.as_mut_slice().visit_strings(rewrite);
    }
}

impl<K, V: VisitStrings> VisitStrings for BTreeMap<K, V> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        for value in self.values_mut() {
            value.visit_strings(rewrite);
        }
    }
}

impl<K, V: VisitStrings, S: BuildHasher> VisitStrings for HashMap<K, V, S> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        for value in self.values_mut() {
            value.visit_strings(rewrite);
        }
    }
}

impl<K, V: VisitStrings, S> VisitStrings for IndexMap<K, V, S> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        for value in self.values_mut() {
            value.visit_strings(rewrite);
        }
    }
}

impl VisitStrings for Value {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        match self {
            Self::String(value) => value.visit_strings(rewrite),
            Self::Array(items) => items.visit_strings(rewrite),
            Self::Object(map) => map.visit_strings(rewrite),
            Self::Null | Self::Bool(_) | Self::Number(_) => {}
        }
    }
}

impl VisitStrings for Map<String, Value> {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        for value in self.values_mut() {
            value.visit_strings(rewrite);
        }
    }
}

/// Scalars without strings in them.
macro_rules! impl_without_strings {
    ($($ty:ty),* $(,)?) => {
        $(
            impl VisitStrings for $ty {
                fn visit_strings(&mut self, _rewrite: &mut dyn FnMut(&str) -> String) {}
            }
        )*
    };
}

impl_without_strings!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    ByteString,
    MicroTime,
    Time,
);

impl VisitStrings for Quantity {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        self.0.visit_strings(rewrite);
    }
}

impl VisitStrings for IntOrString {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        match self {
            Self::Int(_) => {}
            Self::String(value) => value.visit_strings(rewrite),
        }
    }
}

impl VisitStrings for TypeMeta {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        self.api_version.visit_strings(rewrite);
        self.kind.visit_strings(rewrite);
    }
}

impl VisitStrings for ObjectMeta {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        let Self {
            annotations,
            creation_timestamp: _,
            deletion_grace_period_seconds: _,
            deletion_timestamp: _,
            finalizers,
            generate_name,
            generation: _,
            labels,
            // Written by the API server only
            managed_fields: _,
            name,
            namespace,
            owner_references,
            resource_version,
            self_link,
            uid,
        } = self;

        annotations.visit_strings(rewrite);
        finalizers.visit_strings(rewrite);
        generate_name.visit_strings(rewrite);
        labels.visit_strings(rewrite);
        name.visit_strings(rewrite);
        namespace.visit_strings(rewrite);
        owner_references.visit_strings(rewrite);
        resource_version.visit_strings(rewrite);
        self_link.visit_strings(rewrite);
        uid.visit_strings(rewrite);
    }
}

impl VisitStrings for DynamicObject {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        self.types.visit_strings(rewrite);
        self.metadata.visit_strings(rewrite);
        self.data.visit_strings(rewrite);
    }
}

impl TemplateResource for DynamicObject {
    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl VisitStrings for OwnerReference {
    fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
        visit_serialized(self, rewrite);
    }
}

/// `k8s-openapi` kinds, which are visited through their serde
/// representation.
///
/// The metadata is visited through its typed [`VisitStrings`] impl. The
/// fields listed in braces (binary data and the server-written status) are
/// moved out for the round trip and restored untouched afterwards.
macro_rules! impl_serialized_resources {
    ($($ty:ident $({ $($untouched:ident),* })?),* $(,)?) => {
        $(
            impl VisitStrings for $ty {
                fn visit_strings(&mut self, rewrite: &mut dyn FnMut(&str) -> String) {
                    $($(let $untouched = self.$untouched.take();)*)?
                    let mut metadata = std::mem::take(&mut self.metadata);

                    if visit_serialized(self, rewrite) {
                        metadata.visit_strings(rewrite);
                    }

                    self.metadata = metadata;
                    $($(self.$untouched = $untouched;)*)?
                }
            }

            impl TemplateResource for $ty {
                fn metadata_mut(&mut self) -> &mut ObjectMeta {
                    &mut self.metadata
                }
            }
        )*
    };
}

impl_serialized_resources!(
    ConfigMap { binary_data },
    CronJob { status },
    DaemonSet { status },
    Deployment { status },
    Ingress { status },
    Job { status },
    PersistentVolumeClaim { status },
    Pod { status },
    Role,
    RoleBinding,
    Secret { data },
    Service { status },
    ServiceAccount,
    StatefulSet { status },
);
