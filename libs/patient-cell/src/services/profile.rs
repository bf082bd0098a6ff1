use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use shared_storage::{DocumentStore, Filter, StorageError};

use crate::models::{PatientProfile, UpdateProfileRequest};

const PATIENTS: &str = "patients";

/// Reads and writes the `patients` collection. Documents carry a `uid`
/// field holding the authenticated user's id; at most one document per uid.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The profile for `uid`, or an empty one if the patient has never
    /// registered. A malformed stored document is treated as empty so the
    /// patient can repair it by saving again.
    pub async fn get_profile(&self, uid: &str) -> Result<PatientProfile, StorageError> {
        match self.find_document(uid).await? {
            Some(doc) => Ok(parse_or_default(&doc, uid)),
            None => Ok(PatientProfile::default()),
        }
    }

    /// Writes the provided fields, creating the document on first save.
    /// Untouched fields keep their stored values.
    pub async fn upsert(
        &self,
        uid: &str,
        request: &UpdateProfileRequest,
    ) -> Result<PatientProfile, StorageError> {
        let patch = request_patch(request);

        match self.find_document(uid).await? {
            Some(doc) => {
                debug!("Updating patient profile for {}", uid);
                let updated = self.store.update(PATIENTS, &doc.id, Value::Object(patch)).await?;
                Ok(parse_or_default(&updated, uid))
            }
            None => {
                debug!("Creating patient profile for {}", uid);
                let mut data = patch;
                data.insert("uid".to_string(), json!(uid));
                let created = self.store.insert(PATIENTS, Value::Object(data)).await?;
                Ok(parse_or_default(&created, uid))
            }
        }
    }

    /// Flags the patient as a returning visitor. Called by the booking flow
    /// on repeat visits; a patient with no stored document is left alone.
    pub async fn mark_returning(&self, uid: &str) -> Result<(), StorageError> {
        if let Some(doc) = self.find_document(uid).await? {
            self.store
                .update(PATIENTS, &doc.id, json!({"returning": true}))
                .await?;
        }
        Ok(())
    }

    async fn find_document(
        &self,
        uid: &str,
    ) -> Result<Option<shared_storage::Document>, StorageError> {
        let filter = Filter::new().eq("uid", uid);
        let docs = self.store.find(PATIENTS, &filter).await?;
        Ok(docs.into_iter().next())
    }
}

fn parse_or_default(doc: &shared_storage::Document, uid: &str) -> PatientProfile {
    match doc.parse::<PatientProfile>() {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Malformed patient document for {}: {}", uid, e);
            PatientProfile::default()
        }
    }
}

fn request_patch(request: &UpdateProfileRequest) -> Map<String, Value> {
    let mut patch = Map::new();
    let fields = [
        ("name", &request.name),
        ("lastname", &request.lastname),
        ("email", &request.email),
        ("phone", &request.phone),
        ("insurance", &request.insurance),
        ("dni", &request.dni),
        ("gender", &request.gender),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            patch.insert(key.to_string(), json!(value.trim()));
        }
    }
    patch
}
