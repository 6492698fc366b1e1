use log::{debug, warn};
use std::collections::HashMap;
use std::hash::Hash;

use crate::extraction::ScannedInstance;
use crate::types::{
    normalize, DicomSeries, EmptyKeyPolicy, Equipment, EquipmentId, EquipmentKey, Patient,
    PatientId, PatientKey, SeriesContext, Study, StudyId,
};

/// Key-to-id index with an optional per-series identity for empty keys
#[derive(Debug)]
struct KeyIndex<K> {
    by_key: HashMap<K, usize>,
    /// Isolated empty-key entities, by SeriesInstanceUID
    isolated: HashMap<String, usize>,
}

impl<K: Eq + Hash> KeyIndex<K> {
    fn new() -> Self {
        Self {
            by_key: HashMap::new(),
            isolated: HashMap::new(),
        }
    }

    fn get(&self, key: &K, isolate_on: Option<&str>) -> Option<usize> {
        match isolate_on {
            Some(series_uid) => self.isolated.get(series_uid).copied(),
            None => self.by_key.get(key).copied(),
        }
    }

    /// Returns the index for the key, inserting `next` when unseen
    fn resolve(&mut self, key: K, isolate_on: Option<&str>, next: usize) -> (usize, bool) {
        if let Some(series_uid) = isolate_on {
            if let Some(&index) = self.isolated.get(series_uid) {
                return (index, false);
            }
            self.isolated.insert(series_uid.to_string(), next);
            return (next, true);
        }
        match self.by_key.get(&key) {
            Some(&index) => (index, false),
            None => {
                self.by_key.insert(key, next);
                (next, true)
            }
        }
    }
}

/// Scan-scoped Patient/Study/Equipment registry
///
/// Resolving the same normalized key always yields the same id; entities are
/// never duplicated. Attributes are taken from the first instance that creates
/// the entity.
#[derive(Debug)]
pub struct EntityRegistry {
    policy: EmptyKeyPolicy,
    patients: Vec<Patient>,
    patient_index: KeyIndex<PatientKey>,
    studies: Vec<Study>,
    study_index: KeyIndex<String>,
    equipment: Vec<Equipment>,
    equipment_index: KeyIndex<EquipmentKey>,
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(EmptyKeyPolicy::default())
    }
}

impl EntityRegistry {
    pub fn new(policy: EmptyKeyPolicy) -> Self {
        Self {
            policy,
            patients: Vec::new(),
            patient_index: KeyIndex::new(),
            studies: Vec::new(),
            study_index: KeyIndex::new(),
            equipment: Vec::new(),
            equipment_index: KeyIndex::new(),
        }
    }

    pub fn policy(&self) -> EmptyKeyPolicy {
        self.policy
    }

    /// Series to isolate an empty key on, per policy
    fn isolate_on<'a>(&self, empty: bool, series_uid: &'a str) -> Option<&'a str> {
        match self.policy {
            EmptyKeyPolicy::Isolate if empty => Some(series_uid),
            _ => None,
        }
    }

    fn resolve_patient(&mut self, scanned: &ScannedInstance, series_uid: &str) -> PatientId {
        let key = PatientKey::new(&scanned.patient_id, &scanned.patient_name);
        let isolate_on = self.isolate_on(key.is_empty(), series_uid);
        let (index, created) =
            self.patient_index
                .resolve(key.clone(), isolate_on, self.patients.len());
        if created {
            debug!("New patient {:?}", key);
            self.patients.push(Patient {
                key,
                birth_date: normalize(&scanned.patient_birth_date),
                sex: normalize(&scanned.patient_sex),
            });
        }
        PatientId(index)
    }

    /// Resolves the study; a study keeps the patient it was first seen with
    ///
    /// The patient is only resolved for a new study.
    pub fn resolve_study(&mut self, scanned: &ScannedInstance, series_uid: &str) -> StudyId {
        let uid = normalize(&scanned.study_instance_uid);
        let isolate_on = self.isolate_on(uid.is_empty(), series_uid);
        if let Some(index) = self.study_index.get(&uid, isolate_on) {
            let owner = &self.patients[self.studies[index].patient.0].key;
            if *owner != PatientKey::new(&scanned.patient_id, &scanned.patient_name) {
                warn!(
                    "Study '{}' seen with a second patient, keeping the first",
                    self.studies[index].instance_uid
                );
            }
            return StudyId(index);
        }

        let patient = self.resolve_patient(scanned, series_uid);
        let (index, _) = self
            .study_index
            .resolve(uid.clone(), isolate_on, self.studies.len());
        debug!("New study '{}'", uid);
        self.studies.push(Study {
            instance_uid: uid,
            patient,
            date: normalize(&scanned.study_date),
            time: normalize(&scanned.study_time),
            description: normalize(&scanned.study_description),
        });
        StudyId(index)
    }

    pub fn resolve_equipment(&mut self, scanned: &ScannedInstance, series_uid: &str) -> EquipmentId {
        let key = EquipmentKey::new(
            &scanned.manufacturer,
            &scanned.station_name,
            &scanned.institution_name,
        );
        let isolate_on = self.isolate_on(key.is_empty(), series_uid);
        let (index, created) =
            self.equipment_index
                .resolve(key.clone(), isolate_on, self.equipment.len());
        if created {
            debug!("New equipment {:?}", key);
            self.equipment.push(Equipment { key });
        }
        EquipmentId(index)
    }

    /// Resolves all three entities of an instance
    ///
    /// The patient of an existing study wins over the instance's own patient
    /// tags, so a series always hangs off its study's patient.
    pub fn resolve(
        &mut self,
        scanned: &ScannedInstance,
        series_uid: &str,
    ) -> (PatientId, StudyId, EquipmentId) {
        let study = self.resolve_study(scanned, series_uid);
        let equipment = self.resolve_equipment(scanned, series_uid);
        (self.studies[study.0].patient, study, equipment)
    }

    pub fn patient(&self, id: PatientId) -> &Patient {
        &self.patients[id.0]
    }

    pub fn study(&self, id: StudyId) -> &Study {
        &self.studies[id.0]
    }

    pub fn equipment(&self, id: EquipmentId) -> &Equipment {
        &self.equipment[id.0]
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn studies(&self) -> &[Study] {
        &self.studies
    }

    pub fn equipments(&self) -> &[Equipment] {
        &self.equipment
    }

    /// Snapshot of the entities a series references
    pub fn context(&self, series: &DicomSeries) -> SeriesContext {
        SeriesContext {
            patient: self.patient(series.patient).clone(),
            study: self.study(series.study).clone(),
            equipment: self.equipment(series.equipment).clone(),
        }
    }
}
