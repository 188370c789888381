//! Snapshot fetching from a live API server.
//!
//! [`KubeFetcher`] lists every collection the checks need in one concurrent
//! round of API calls and assembles them into an [`Objects`] snapshot.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use clusterlint_core::{ObjectFetcher, ObjectFilter, Objects, VolumeSnapshot, SYSTEM_NAMESPACE};
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhookConfiguration, ValidatingWebhookConfiguration,
};
use k8s_openapi::api::batch::v1::CronJob;
use k8s_openapi::api::core::v1::{
    ConfigMap, LimitRange, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod,
    PodTemplate, ResourceQuota, Secret, Service, ServiceAccount,
};
use k8s_openapi::api::storage::v1::StorageClass;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::KubeConfig;
use crate::{KubeError, Result};

/// Fetches snapshots through the Kubernetes API.
#[derive(Clone)]
pub struct KubeFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl KubeFetcher {
    /// Connect to the cluster described by `config`.
    ///
    /// No request is sent until the first fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if the kubeconfig cannot be read, the context does
    /// not exist, or no configuration can be inferred.
    pub async fn connect(config: &KubeConfig) -> Result<Self> {
        let client_config = Self::client_config(config).await?;
        info!(
            cluster_url = %client_config.cluster_url,
            context = config.context.as_deref().unwrap_or("<current>"),
            "Connecting to cluster"
        );
        let client = Client::try_from(client_config)?;
        Ok(Self::with_client(client, config.timeout))
    }

    /// Create a fetcher around a pre-configured client.
    #[must_use]
    pub fn with_client(client: Client, timeout: Option<Duration>) -> Self {
        Self { client, timeout }
    }

    async fn client_config(config: &KubeConfig) -> Result<Config> {
        if config.kubeconfig.is_none() && config.context.is_none() {
            return Ok(Config::infer().await?);
        }

        let kubeconfig = match &config.kubeconfig {
            Some(path) => Kubeconfig::read_from(path)?,
            None => Kubeconfig::read()?,
        };
        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..Default::default()
        };
        Ok(Config::from_custom_kubeconfig(kubeconfig, &options).await?)
    }

    /// List a cluster-scoped collection.
    async fn list_all<K>(&self) -> Result<Vec<K>>
    where
        K: kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    /// List a namespaced collection across namespaces, narrowed by the
    /// filter's field selector.
    async fn list_namespaced<K>(&self, selector: Option<&str>) -> Result<Vec<K>>
    where
        K: kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let params = match selector {
            Some(fields) => ListParams::default().fields(fields),
            None => ListParams::default(),
        };
        Ok(api.list(&params).await?.items)
    }

    /// Snapshots are a CRD; a cluster without it simply has none.
    async fn list_volume_snapshots(&self, selector: Option<&str>) -> Result<Vec<VolumeSnapshot>> {
        match self.list_namespaced::<VolumeSnapshot>(selector).await {
            Err(KubeError::Kube(kube::Error::Api(response))) if response.code == 404 => {
                debug!("VolumeSnapshot CRD not installed");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn system_namespace(&self) -> Result<Option<Namespace>> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        Ok(api.get_opt(SYSTEM_NAMESPACE).await?)
    }

    async fn fetch(&self, filter: &ObjectFilter) -> Result<Objects> {
        let selector = filter.field_selector();
        let selector = selector.as_deref();
        if let Some(fields) = selector {
            debug!(fields, "Narrowing namespaced lists");
        }

        let (
            nodes,
            persistent_volumes,
            persistent_volume_claims,
            pods,
            pod_templates,
            config_maps,
            services,
            secrets,
            service_accounts,
            resource_quotas,
            limit_ranges,
            storage_classes,
            mutating_webhook_configurations,
            validating_webhook_configurations,
            namespaces,
            cron_jobs,
            volume_snapshots,
            system_namespace,
        ) = futures::try_join!(
            self.list_all::<Node>(),
            self.list_all::<PersistentVolume>(),
            self.list_namespaced::<PersistentVolumeClaim>(selector),
            self.list_namespaced::<Pod>(selector),
            self.list_namespaced::<PodTemplate>(selector),
            self.list_namespaced::<ConfigMap>(selector),
            self.list_namespaced::<Service>(selector),
            self.list_namespaced::<Secret>(selector),
            self.list_namespaced::<ServiceAccount>(selector),
            self.list_namespaced::<ResourceQuota>(selector),
            self.list_namespaced::<LimitRange>(selector),
            self.list_all::<StorageClass>(),
            self.list_all::<MutatingWebhookConfiguration>(),
            self.list_all::<ValidatingWebhookConfiguration>(),
            self.list_all::<Namespace>(),
            self.list_namespaced::<CronJob>(selector),
            self.list_volume_snapshots(selector),
            self.system_namespace(),
        )?;

        Ok(Objects {
            nodes,
            persistent_volumes,
            persistent_volume_claims,
            pods,
            pod_templates,
            config_maps,
            services,
            secrets,
            service_accounts,
            resource_quotas,
            limit_ranges,
            storage_classes,
            mutating_webhook_configurations,
            validating_webhook_configurations,
            namespaces,
            cron_jobs,
            volume_snapshots,
            system_namespace,
            namespace_filter: filter.clone(),
        })
    }
}

#[async_trait]
impl ObjectFetcher for KubeFetcher {
    async fn fetch_objects(&self, filter: &ObjectFilter) -> clusterlint_core::Result<Objects> {
        let started = Instant::now();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch(filter))
                .await
                .unwrap_or_else(|_| Err(KubeError::Timeout(limit))),
            None => self.fetch(filter).await,
        };

        match result {
            Ok(objects) => {
                debug!(
                    objects = objects.len(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Fetched snapshot"
                );
                Ok(objects)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch cluster objects");
                Err(e.into())
            }
        }
    }
}

impl std::fmt::Debug for KubeFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeFetcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
