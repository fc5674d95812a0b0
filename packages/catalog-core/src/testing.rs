//! In-memory stub ports and fixture builders for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::ports::{BaseApiClient, BaseAuthClient, LogoutRedirect};
use crate::types::{CompiledData, Service, Software};

/// Stub API serving a fixed compiled-data payload and recording mutations.
/// Set `fail_next` to make the next call reject.
pub(crate) struct StubApi {
    pub data: CompiledData,
    pub fail_next: AtomicBool,
    pub deleted_services: Mutex<Vec<(i64, String)>>,
    pub referent_calls: Mutex<Vec<(i64, bool)>>,
}

impl StubApi {
    pub fn new(data: CompiledData) -> Self {
        Self {
            data,
            fail_next: AtomicBool::new(false),
            deleted_services: Mutex::new(Vec::new()),
            referent_calls: Mutex::new(Vec::new()),
        }
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("remote rejected the call"));
        }
        Ok(())
    }
}

#[async_trait]
impl BaseApiClient for StubApi {
    async fn get_compiled_data(&self) -> Result<CompiledData> {
        self.check_failure()?;
        Ok(self.data.clone())
    }

    async fn delete_service(&self, service_id: i64, reason: &str) -> Result<()> {
        self.check_failure()?;
        self.deleted_services
            .lock()
            .unwrap()
            .push((service_id, reason.to_owned()));
        Ok(())
    }

    async fn declare_user_referent(&self, software_id: i64, is_expert: bool) -> Result<()> {
        self.check_failure()?;
        self.referent_calls
            .lock()
            .unwrap()
            .push((software_id, is_expert));
        Ok(())
    }

    async fn user_no_longer_referent(&self, software_id: i64) -> Result<()> {
        self.check_failure()?;
        self.referent_calls
            .lock()
            .unwrap()
            .push((software_id, false));
        Ok(())
    }
}

/// Stub session: a toggleable logged-in flag.
pub(crate) struct StubAuth {
    pub logged_in: AtomicBool,
}

impl StubAuth {
    pub fn new(logged_in: bool) -> Self {
        Self {
            logged_in: AtomicBool::new(logged_in),
        }
    }
}

#[async_trait]
impl BaseAuthClient for StubAuth {
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

pub(crate) fn software(id: i64, name: &str) -> Software {
    Software {
        id,
        name: name.to_owned(),
        function: format!("{name} function"),
        license: "MIT".to_owned(),
        tags: Vec::new(),
        logo_url: None,
        referent_count: 0,
        alike_software_ids: Vec::new(),
    }
}

pub(crate) fn service(id: i64, agency: &str, software_sill_id: Option<i64>) -> Service {
    Service {
        id,
        agency_name: agency.to_owned(),
        agency_url: format!("https://www.{}.example.fr", agency.to_lowercase()),
        description: String::new(),
        last_update_date: String::new(),
        public_sector: String::new(),
        publication_date: String::new(),
        service_url: format!("https://www.{}.example.fr/app", agency.to_lowercase()),
        signup_scope: String::new(),
        signup_validation_method: String::new(),
        usage_scope: String::new(),
        content_moderation_method: String::new(),
        software_sill_id,
        software_name: "Jitsi".to_owned(),
        comptoir_du_libre_id: None,
    }
}
