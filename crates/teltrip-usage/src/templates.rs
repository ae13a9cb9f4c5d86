//! Package template resolution with a per-run cache.
//!
//! Many subscribers on one account share the same plan, so a
//! [`TemplateResolver`] memoizes lookups by template id for the lifetime of
//! one aggregation run. Concurrent lookups of the same id share a single
//! upstream request. Failed lookups are not cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use teltrip_ocs::{OcsApi, OcsRequest, OneOrMany, TemplatePayload, extract_payload};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::error::Result;
use crate::models::{Package, RawPackage, TemplateInfo};

/// Resolves template ids to canonical name and unit cost.
pub struct TemplateResolver<'a> {
    api: &'a dyn OcsApi,
    cache: Mutex<HashMap<i64, Arc<OnceCell<TemplateInfo>>>>,
    upstream_lookups: AtomicUsize,
}

impl<'a> TemplateResolver<'a> {
    /// Create a resolver with an empty cache.
    pub fn new(api: &'a dyn OcsApi) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
            upstream_lookups: AtomicUsize::new(0),
        }
    }

    /// Resolve a template id.
    ///
    /// A missing (or zero) id resolves to an empty [`TemplateInfo`] without
    /// contacting the OCS.
    pub async fn resolve(&self, template_id: Option<i64>) -> Result<TemplateInfo> {
        let Some(template_id) = template_id.filter(|id| *id != 0) else {
            return Ok(TemplateInfo::default());
        };

        let cell = self
            .cache
            .lock()
            .await
            .entry(template_id)
            .or_default()
            .clone();

        let info = cell.get_or_try_init(|| self.fetch(template_id)).await?;
        Ok(info.clone())
    }

    /// Resolve a raw package's template and merge the result into it.
    pub async fn enrich(&self, raw: RawPackage) -> Result<Package> {
        let template = self.resolve(raw.template_id).await?;
        Ok(Package::from_parts(raw, template))
    }

    /// Number of requests actually sent upstream so far.
    pub fn upstream_lookups(&self) -> usize {
        self.upstream_lookups.load(Ordering::SeqCst)
    }

    async fn fetch(&self, template_id: i64) -> Result<TemplateInfo> {
        self.upstream_lookups.fetch_add(1, Ordering::SeqCst);

        let request = OcsRequest::list_prepaid_package_template(template_id);
        let body = self.api.execute(&request).await?;

        let template = extract_payload::<TemplatePayload>(&body, request.operation())?
            .and_then(|p| p.template)
            .and_then(OneOrMany::into_first);

        let info = match template {
            Some(template) => TemplateInfo {
                name: template.name().map(str::to_string),
                cost: template.cost,
            },
            None => TemplateInfo::default(),
        };

        debug!(template_id, name = ?info.name, cost = ?info.cost, "resolved package template");
        Ok(info)
    }
}
