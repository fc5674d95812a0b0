//! End-to-end session over both catalogs through the public API only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use catalog_core::{
    BaseApiClient, BaseAuthClient, CatalogConfig, CatalogError, Channel, CompiledData,
    LogoutRedirect, Service, ServiceCatalog, ServiceEvent, Software, SoftwareCatalog,
    SoftwareEvent,
};

struct FakeApi {
    data: CompiledData,
    fail_next: AtomicBool,
    deleted: Mutex<Vec<(i64, String)>>,
}

impl FakeApi {
    fn new(data: CompiledData) -> Self {
        Self {
            data,
            fail_next: AtomicBool::new(false),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn gate(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("gateway timeout"));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseApiClient for FakeApi {
    async fn get_compiled_data(&self) -> Result<CompiledData> {
        self.gate()?;
        Ok(self.data.clone())
    }

    async fn delete_service(&self, service_id: i64, reason: &str) -> Result<()> {
        self.gate()?;
        self.deleted
            .lock()
            .unwrap()
            .push((service_id, reason.to_owned()));
        Ok(())
    }

    async fn declare_user_referent(&self, _software_id: i64, _is_expert: bool) -> Result<()> {
        self.gate()
    }

    async fn user_no_longer_referent(&self, _software_id: i64) -> Result<()> {
        self.gate()
    }
}

struct FakeAuth {
    logged_in: AtomicBool,
}

#[async_trait]
impl BaseAuthClient for FakeAuth {
    fn is_user_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    async fn login(&self, _current_href_requires_auth: bool) -> Result<()> {
        self.logged_in.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self, _redirect: LogoutRedirect) -> Result<()> {
        self.logged_in.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn software(id: i64, name: &str, function: &str) -> Software {
    Software {
        id,
        name: name.to_owned(),
        function: function.to_owned(),
        license: "AGPL-3.0".to_owned(),
        tags: vec!["communication".to_owned()],
        logo_url: None,
        referent_count: 0,
        alike_software_ids: Vec::new(),
    }
}

fn service(id: i64, agency: &str, description: &str, software_sill_id: Option<i64>) -> Service {
    Service {
        id,
        agency_name: agency.to_owned(),
        agency_url: format!("https://{}.gouv.fr", agency.to_lowercase()),
        description: description.to_owned(),
        last_update_date: "2024-01-10".to_owned(),
        public_sector: "state".to_owned(),
        publication_date: "2023-06-01".to_owned(),
        service_url: format!("https://www.visio.{}.gouv.fr/rooms", agency.to_lowercase()),
        signup_scope: "agents".to_owned(),
        signup_validation_method: "email".to_owned(),
        usage_scope: "public".to_owned(),
        content_moderation_method: "none".to_owned(),
        software_sill_id,
        software_name: "Jitsi".to_owned(),
        comptoir_du_libre_id: None,
    }
}

fn compiled_data() -> CompiledData {
    let mut services: Vec<Service> = (1..=30)
        .map(|i| service(i, "Interieur", "visioconférence souveraine", Some(1)))
        .collect();
    services.push(service(31, "Culture", "réunions des musées", Some(2)));
    CompiledData {
        softwares: vec![
            software(1, "Jitsi", "Video conferencing"),
            software(2, "BigBlueButton", "Virtual classrooms"),
        ],
        services,
    }
}

struct Session {
    softwares: SoftwareCatalog,
    services: ServiceCatalog,
    api: Arc<FakeApi>,
    auth: Arc<FakeAuth>,
    software_events: Channel<SoftwareEvent>,
    service_events: Channel<ServiceEvent>,
}

fn session(logged_in: bool) -> Session {
    let api = Arc::new(FakeApi::new(compiled_data()));
    let auth = Arc::new(FakeAuth {
        logged_in: AtomicBool::new(logged_in),
    });
    let software_events = Channel::new();
    let service_events = Channel::new();
    Session {
        softwares: SoftwareCatalog::new(
            api.clone(),
            auth.clone(),
            software_events.subscribe(),
            CatalogConfig::default(),
        ),
        services: ServiceCatalog::new(
            api.clone(),
            auth.clone(),
            service_events.subscribe(),
            CatalogConfig::default(),
        ),
        api,
        auth,
        software_events,
        service_events,
    }
}

#[tokio::test]
async fn full_browse_session() {
    let mut s = session(false);

    // Landing on the service page fetches both catalogs in one step.
    s.services.fetch(&mut s.softwares).await.unwrap();
    assert!(s.softwares.is_ready());
    assert_eq!(s.services.search_result_count(&s.softwares).unwrap(), Some(31));

    // Paginated browse: one page, then one more.
    let visible = s.services.visible_services(&s.softwares).unwrap().unwrap();
    assert_eq!(visible.len(), 24);
    s.services.load_more().await.unwrap();
    let visible = s.services.visible_services(&s.softwares).unwrap().unwrap();
    assert_eq!(visible.len(), 31);

    // Accent-insensitive search over the full list, pasted in one go.
    s.services.set_query_string("reunions").await.unwrap();
    let visible = s.services.visible_services(&s.softwares).unwrap().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].service.agency_name, "Culture");
    assert_eq!(visible[0].deployed_software.software_name(), "BigBlueButton");

    // Clearing the query goes back to pagination mode.
    s.services.set_query_string("").await.unwrap();
    let visible = s.services.visible_services(&s.softwares).unwrap().unwrap();
    assert_eq!(visible.len(), 24);
}

#[tokio::test]
async fn deletion_requires_a_session_and_survives_failures() {
    let mut s = session(false);
    s.services.fetch(&mut s.softwares).await.unwrap();

    let err = s.services.delete_service(31, "service retired").await.unwrap_err();
    assert!(matches!(err, CatalogError::NotLoggedIn));

    s.auth.login(false).await.unwrap();

    // A rejected call leaves the catalog intact and the flag reset.
    s.api.fail_next.store(true, Ordering::SeqCst);
    let err = s.services.delete_service(31, "service retired").await.unwrap_err();
    assert!(matches!(err, CatalogError::Api(_)));
    assert!(!s.services.is_processing());
    assert_eq!(s.services.services().unwrap().len(), 31);

    s.services.delete_service(31, "service retired").await.unwrap();
    assert_eq!(s.services.services().unwrap().len(), 30);
    assert_eq!(
        *s.api.deleted.lock().unwrap(),
        vec![(31, "service retired".to_owned())]
    );
}

#[tokio::test]
async fn cross_slice_events_reach_both_catalogs() {
    let mut s = session(false);
    s.services.fetch(&mut s.softwares).await.unwrap();

    s.software_events.publish(SoftwareEvent::AddedOrUpdated(software(
        3,
        "Nextcloud",
        "File sync and share",
    )));
    s.service_events.publish(ServiceEvent::AddedOrUpdated(service(
        40,
        "Education",
        "partage de fichiers",
        Some(3),
    )));

    assert_eq!(s.softwares.softwares().unwrap().len(), 3);
    assert_eq!(s.services.services().unwrap().len(), 32);

    // The new service joins against the software that arrived with it.
    let annotated = s
        .services
        .services_with_software(&s.softwares)
        .unwrap()
        .unwrap();
    let added = annotated
        .iter()
        .find(|service| service.service.id == 40)
        .unwrap();
    assert_eq!(added.deployed_software.software_name(), "Nextcloud");
}

#[tokio::test]
async fn referent_declarations_update_the_software_catalog() {
    let mut s = session(true);
    s.softwares.fetch().await.unwrap();

    s.softwares.declare_referent(1, false).await.unwrap();
    s.softwares.declare_referent(2, true).await.unwrap();
    s.softwares.revoke_referent(1).await.unwrap();

    let softwares = s.softwares.softwares().unwrap();
    assert_eq!(softwares[0].referent_count, 0);
    assert_eq!(softwares[1].referent_count, 1);
}

#[tokio::test]
async fn software_facet_filters_the_service_list() {
    let mut s = session(false);
    s.services.fetch(&mut s.softwares).await.unwrap();

    let names = s.services.software_names(&s.softwares).unwrap().unwrap();
    assert_eq!(names, vec!["Jitsi".to_owned(), "BigBlueButton".to_owned()]);

    let query = catalog_core::ServiceQuery {
        search: String::new(),
        software_name: Some("Jitsi".to_owned()),
    };
    s.services.set_query_string(&query.stringify()).await.unwrap();
    let visible = s.services.visible_services(&s.softwares).unwrap().unwrap();
    assert_eq!(visible.len(), 30);
    assert_eq!(s.services.search_result_count(&s.softwares).unwrap(), Some(30));
}
