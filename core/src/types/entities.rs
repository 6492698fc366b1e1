//! Patient, Study and Equipment entities and their identity keys

/// Normalizes a DICOM string value for use in an identity key
///
/// Strips NUL padding and surrounding whitespace, then collapses inner
/// whitespace runs to a single space.
pub fn normalize(value: &str) -> String {
    value
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes a person name (PN), dropping trailing empty `^` components
///
/// `"DOE^JOHN^^^"` and `"DOE^JOHN"` name the same person.
pub fn normalize_person_name(value: &str) -> String {
    let normalized = normalize(value);
    let components: Vec<&str> = normalized.split('^').map(str::trim).collect();
    let last = components
        .iter()
        .rposition(|c| !c.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    components[..last].join("^")
}

macro_rules! entity_id {
    ($name:ident) => {
        /// Index of an entity inside the scan-scoped registry
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

entity_id!(PatientId);
entity_id!(StudyId);
entity_id!(EquipmentId);

/// Patient identity: normalized (PatientID, PatientName)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct PatientKey {
    pub patient_id: String,
    pub name: String,
}

impl PatientKey {
    pub fn new(patient_id: &str, name: &str) -> Self {
        Self {
            patient_id: normalize(patient_id),
            name: normalize_person_name(name),
        }
    }

    /// Both identifying tags are missing or blank
    pub fn is_empty(&self) -> bool {
        self.patient_id.is_empty() && self.name.is_empty()
    }
}

/// Equipment identity: normalized (Manufacturer, StationName, InstitutionName)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct EquipmentKey {
    pub manufacturer: String,
    pub station: String,
    pub institution: String,
}

impl EquipmentKey {
    pub fn new(manufacturer: &str, station: &str, institution: &str) -> Self {
        Self {
            manufacturer: normalize(manufacturer),
            station: normalize(station),
            institution: normalize(institution),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.manufacturer.is_empty() && self.station.is_empty() && self.institution.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Patient {
    pub key: PatientKey,
    pub birth_date: String,
    pub sex: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Study {
    pub instance_uid: String,
    /// Owning patient; a study belongs to exactly one patient
    #[cfg_attr(feature = "json", serde(skip))]
    pub patient: PatientId,
    pub date: String,
    pub time: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct Equipment {
    pub key: EquipmentKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  ACME   Medical\0"), "ACME Medical");
        assert_eq!(normalize("\0\0"), "");
    }

    #[test]
    fn test_normalize_person_name() {
        assert_eq!(normalize_person_name("DOE^JOHN^^^"), "DOE^JOHN");
        assert_eq!(normalize_person_name(" DOE ^JOHN "), "DOE^JOHN");
        assert_eq!(normalize_person_name("^^"), "");
    }

    #[test]
    fn test_patient_key_equality_after_normalization() {
        assert_eq!(
            PatientKey::new("PAT-1 ", "DOE^JOHN^"),
            PatientKey::new("PAT-1", "DOE^JOHN")
        );
        assert!(PatientKey::new("", " ").is_empty());
    }

    #[test]
    fn test_equipment_key() {
        let key = EquipmentKey::new("ACME", " CT01", "General  Hospital");
        assert_eq!(key.station, "CT01");
        assert_eq!(key.institution, "General Hospital");
        assert!(!key.is_empty());
    }
}
