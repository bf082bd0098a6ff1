use serde::{Deserialize, Serialize};

/// One row of the `patients` collection, keyed by the authenticated user's
/// id. All identity fields are optional in storage; completeness is checked
/// at booking time, not at registration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub insurance: Option<String>,
    #[serde(default)]
    pub dni: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Set the first time the patient books a repeat visit.
    #[serde(default)]
    pub returning: bool,
}

impl PatientProfile {
    /// Required booking fields that are absent or blank, in a stable order
    /// suitable for error payloads.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map(str::trim).unwrap_or("").is_empty()
        }

        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.lastname) {
            missing.push("lastname");
        }
        if blank(&self.email) {
            missing.push("email");
        }
        if blank(&self.phone) {
            missing.push("phone");
        }
        if blank(&self.insurance) {
            missing.push("insurance");
        }
        if blank(&self.dni) {
            missing.push("dni");
        }
        if blank(&self.gender) {
            missing.push("gender");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// "Name Lastname" as written on the appointment record.
    pub fn full_name(&self) -> String {
        let name = self.name.as_deref().unwrap_or("").trim();
        let lastname = self.lastname.as_deref().unwrap_or("").trim();
        format!("{} {}", name, lastname).trim().to_string()
    }
}

/// Body of `PUT /patients/me`. Only provided fields are written; the
/// `returning` flag is managed by the booking flow and cannot be set here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub insurance: Option<String>,
    #[serde(default)]
    pub dni: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_reports_blank_and_absent() {
        let profile = PatientProfile {
            name: Some("Ana".to_string()),
            lastname: Some("   ".to_string()),
            email: Some("ana@example.com".to_string()),
            phone: None,
            insurance: Some("OSDE".to_string()),
            dni: Some("30123456".to_string()),
            gender: Some("F".to_string()),
            returning: false,
        };
        assert_eq!(profile.missing_fields(), vec!["lastname", "phone"]);
        assert!(!profile.is_complete());
    }

    #[test]
    fn full_name_trims_partial_data() {
        let profile = PatientProfile {
            name: Some("Ana".to_string()),
            ..Default::default()
        };
        assert_eq!(profile.full_name(), "Ana");
    }
}
