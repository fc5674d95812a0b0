//! Scripted browse session against an in-memory API.
//!
//! ```sh
//! cargo run -p catalog-core --example browse
//! ```

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use catalog_core::{
    BaseApiClient, BaseAuthClient, CatalogConfig, Channel, CompiledData, LogoutRedirect, Service,
    ServiceCatalog, Software, SoftwareCatalog,
};

struct DemoApi {
    data: CompiledData,
}

#[async_trait]
impl BaseApiClient for DemoApi {
    async fn get_compiled_data(&self) -> Result<CompiledData> {
        Ok(self.data.clone())
    }

    async fn delete_service(&self, _service_id: i64, _reason: &str) -> Result<()> {
        Ok(())
    }

    async fn declare_user_referent(&self, _software_id: i64, _is_expert: bool) -> Result<()> {
        Ok(())
    }

    async fn user_no_longer_referent(&self, _software_id: i64) -> Result<()> {
        Ok(())
    }
}

struct DemoAuth {
    logged_in: AtomicBool,
}

#[async_trait]
impl BaseAuthClient for DemoAuth {
    fn is_user_logged_in(&self) -> bool {
        self.logged_in.load(std::sync::atomic::Ordering::SeqCst)
    }

    async fn login(&self, _current_href_requires_auth: bool) -> Result<()> {
        self.logged_in.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self, _redirect: LogoutRedirect) -> Result<()> {
        self.logged_in.store(false, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

fn sample_data() -> CompiledData {
    let softwares = vec![
        Software {
            id: 1,
            name: "Jitsi Meet".to_owned(),
            function: "Video conferencing".to_owned(),
            license: "Apache-2.0".to_owned(),
            tags: vec!["communication".to_owned(), "visio".to_owned()],
            logo_url: None,
            referent_count: 4,
            alike_software_ids: vec![2],
        },
        Software {
            id: 2,
            name: "BigBlueButton".to_owned(),
            function: "Virtual classrooms".to_owned(),
            license: "LGPL-3.0".to_owned(),
            tags: vec!["communication".to_owned(), "education".to_owned()],
            logo_url: None,
            referent_count: 2,
            alike_software_ids: vec![1],
        },
    ];
    let services = vec![
        Service {
            id: 10,
            agency_name: "Ministère de l'Intérieur".to_owned(),
            agency_url: "https://interieur.gouv.fr".to_owned(),
            description: "Visioconférence souveraine pour les agents".to_owned(),
            last_update_date: "2024-02-01".to_owned(),
            public_sector: "state".to_owned(),
            publication_date: "2023-01-15".to_owned(),
            service_url: "https://visio.interieur.gouv.fr".to_owned(),
            signup_scope: "agents".to_owned(),
            signup_validation_method: "email".to_owned(),
            usage_scope: "internal".to_owned(),
            content_moderation_method: "none".to_owned(),
            software_sill_id: Some(1),
            software_name: "Jitsi Meet".to_owned(),
            comptoir_du_libre_id: None,
        },
        Service {
            id: 11,
            agency_name: "Éducation nationale".to_owned(),
            agency_url: "https://education.gouv.fr".to_owned(),
            description: "Classes virtuelles pour les enseignants".to_owned(),
            last_update_date: "2024-03-12".to_owned(),
            public_sector: "state".to_owned(),
            publication_date: "2022-09-01".to_owned(),
            service_url: "https://classes.education.gouv.fr".to_owned(),
            signup_scope: "teachers".to_owned(),
            signup_validation_method: "sso".to_owned(),
            usage_scope: "public".to_owned(),
            content_moderation_method: "moderated".to_owned(),
            software_sill_id: Some(2),
            software_name: "BigBlueButton".to_owned(),
            comptoir_du_libre_id: None,
        },
    ];
    CompiledData { softwares, services }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let api = Arc::new(DemoApi { data: sample_data() });
    let auth = Arc::new(DemoAuth {
        logged_in: AtomicBool::new(true),
    });
    let software_events = Channel::new();
    let service_events = Channel::new();

    // Fast debounces so the scripted session stays snappy.
    let config = CatalogConfig {
        search_debounce: Duration::from_millis(50),
        ..CatalogConfig::default()
    };

    let mut softwares = SoftwareCatalog::new(
        api.clone(),
        auth.clone(),
        software_events.subscribe(),
        config.clone(),
    );
    let mut services = ServiceCatalog::new(api, auth, service_events.subscribe(), config);

    services.fetch(&mut softwares).await?;
    info!(
        services = services.search_result_count(&softwares)?.unwrap_or(0),
        "catalog loaded"
    );

    for visible in services.visible_services(&softwares)?.unwrap_or_default() {
        info!(
            service = visible.service_name,
            agency = visible.service.agency_name,
            software = visible.deployed_software.software_name(),
            "visible"
        );
    }

    services.set_query_string("visioconference").await?;
    let matches = services.visible_services(&softwares)?.unwrap_or_default();
    info!(count = matches.len(), "accent-insensitive search for 'visioconference'");

    softwares.declare_referent(1, false).await?;
    if let Some(items) = softwares.softwares() {
        info!(referents = items[0].referent_count, software = %items[0].name, "declared referent");
    }

    Ok(())
}
