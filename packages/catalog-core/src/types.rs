//! Entity types for the two catalogs.
//!
//! `Software` and `Service` mirror the compiled data payload served by the
//! remote API. Records are immutable by convention; the few mutable fields
//! (referent count, catalog membership) are patched through the state
//! machine, keyed by id.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Anything that lives in a [`crate::state::CatalogState`] item list.
pub trait Entity {
    fn id(&self) -> i64;
}

/// A software entry of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Software {
    pub id: i64,
    pub name: String,
    /// One-line description of what the software does.
    pub function: String,
    pub license: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Number of agents who declared themselves referent for this software.
    #[serde(default)]
    pub referent_count: usize,
    /// Ids of comparable softwares that are also in the catalog.
    #[serde(default)]
    pub alike_software_ids: Vec<i64>,
}

impl Entity for Software {
    fn id(&self) -> i64 {
        self.id
    }
}

/// A public online service backed by a software.
///
/// `software_sill_id` is the foreign key into the software catalog; when it
/// is absent the deployed software is only known by name (and possibly by
/// its Comptoir du Libre id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub agency_name: String,
    pub agency_url: String,
    pub description: String,
    pub last_update_date: String,
    pub public_sector: String,
    pub publication_date: String,
    pub service_url: String,
    pub signup_scope: String,
    pub signup_validation_method: String,
    pub usage_scope: String,
    pub content_moderation_method: String,
    #[serde(default)]
    pub software_sill_id: Option<i64>,
    pub software_name: String,
    #[serde(default)]
    pub comptoir_du_libre_id: Option<i64>,
}

impl Entity for Service {
    fn id(&self) -> i64 {
        self.id
    }
}

/// The payload of one compiled-data fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompiledData {
    pub softwares: Vec<Software>,
    pub services: Vec<Service>,
}

/// What the deployed software of a service resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeployedSoftware {
    InSill {
        software_name: String,
        logo_url: Option<String>,
    },
    NotInSill {
        software_name: String,
        comptoir_du_libre_id: Option<i64>,
    },
}

// Hand-rolled so `isInSill` stays a boolean discriminant on the wire, which
// serde's internal tagging cannot express.
impl Serialize for DeployedSoftware {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeployedSoftware::InSill {
                software_name,
                logo_url,
            } => {
                let mut record = serializer.serialize_struct("DeployedSoftware", 3)?;
                record.serialize_field("isInSill", &true)?;
                record.serialize_field("softwareName", software_name)?;
                record.serialize_field("logoUrl", logo_url)?;
                record.end()
            }
            DeployedSoftware::NotInSill {
                software_name,
                comptoir_du_libre_id,
            } => {
                let mut record = serializer.serialize_struct("DeployedSoftware", 3)?;
                record.serialize_field("isInSill", &false)?;
                record.serialize_field("softwareName", software_name)?;
                record.serialize_field("comptoirDuLibreId", comptoir_du_libre_id)?;
                record.end()
            }
        }
    }
}

impl DeployedSoftware {
    pub fn software_name(&self) -> &str {
        match self {
            DeployedSoftware::InSill { software_name, .. } => software_name,
            DeployedSoftware::NotInSill { software_name, .. } => software_name,
        }
    }
}

/// A service annotated with the resolved software facet, the shape the
/// derivation layer hands to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceWithSoftware {
    #[serde(flatten)]
    pub service: Service,
    /// Host part of the service URL, scheme and `www.` stripped.
    pub service_name: String,
    pub deployed_software: DeployedSoftware,
}

impl Entity for ServiceWithSoftware {
    fn id(&self) -> i64 {
        self.service.id
    }
}
