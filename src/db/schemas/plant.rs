//! Plant document schema

use bson::{doc, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::IntoIndexes;
use crate::db::schemas::Metadata;
use crate::types::{form, time, FieldError, GardenError, Id, Timestamp};

/// Collection name for plants
pub const PLANT_COLLECTION: &str = "plants";

/// Growth stage, roughly in order
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlantStatus {
    #[default]
    Seed,
    Seedling,
    Vegetative,
    Flowering,
    Fruiting,
    Harvested,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlantHealth {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    Critical,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlantDoc {
    #[serde(rename = "_id")]
    pub id: Id,

    pub name: String,

    #[serde(default)]
    pub species: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,

    pub planted_date: Timestamp,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_harvest_date: Option<Timestamp>,

    #[serde(default)]
    pub status: PlantStatus,

    #[serde(default)]
    pub health: PlantHealth,

    /// Spot inside the garden, e.g. "Bed A"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Parent garden
    pub garden: Id,

    pub planted_by: Id,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_watered: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fertilized: Option<Timestamp>,

    #[serde(flatten)]
    pub metadata: Metadata,
}

impl IntoIndexes for PlantDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "garden": 1, "createdAt": -1 },
            Some(
                IndexOptions::builder()
                    .name("garden_created_index".to_string())
                    .build(),
            ),
        )]
    }
}

/// Input for adding a plant to a garden
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewPlant {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub species: String,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub variety: Option<String>,
    #[serde(default, deserialize_with = "time::optional")]
    pub planted_date: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional")]
    pub expected_harvest_date: Option<Timestamp>,
    #[serde(default)]
    pub status: Option<PlantStatus>,
    #[serde(default)]
    pub health: Option<PlantHealth>,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "form::optional_text")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "time::optional")]
    pub last_watered: Option<Timestamp>,
    #[serde(default, deserialize_with = "time::optional")]
    pub last_fertilized: Option<Timestamp>,
}

impl NewPlant {
    pub fn validate(&self) -> Result<(), GardenError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Plant name is required"));
        }
        if self.species.trim().is_empty() {
            errors.push(FieldError::new("species", "Species is required"));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GardenError::Validation(errors))
        }
    }

    pub fn into_doc(self, garden: Id, planted_by: Id) -> PlantDoc {
        PlantDoc {
            id: Id::new(),
            name: self.name,
            species: self.species,
            variety: self.variety,
            planted_date: self.planted_date.unwrap_or_else(Timestamp::now),
            expected_harvest_date: self.expected_harvest_date,
            status: self.status.unwrap_or_default(),
            health: self.health.unwrap_or_default(),
            location: self.location,
            notes: self.notes,
            garden,
            planted_by,
            last_watered: self.last_watered,
            last_fertilized: self.last_fertilized,
            metadata: Metadata::new(),
        }
    }
}

/// Partial update; the parent garden and planter cannot be changed
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub variety: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "time::optional")]
    pub planted_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "time::optional")]
    pub expected_harvest_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlantStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<PlantHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "form::optional_text")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "time::optional")]
    pub last_watered: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "time::optional")]
    pub last_fertilized: Option<Timestamp>,
}

impl PlantPatch {
    pub fn validate(&self) -> Result<(), GardenError> {
        if matches!(self.name.as_deref(), Some(n) if n.trim().is_empty()) {
            return Err(GardenError::invalid("name", "Plant name cannot be empty"));
        }
        Ok(())
    }

    pub fn apply(&self, plant: &mut PlantDoc) {
        if let Some(v) = &self.name {
            plant.name = v.clone();
        }
        if let Some(v) = &self.species {
            plant.species = v.clone();
        }
        if let Some(v) = &self.variety {
            plant.variety = Some(v.clone());
        }
        if let Some(v) = self.planted_date {
            plant.planted_date = v;
        }
        if let Some(v) = self.expected_harvest_date {
            plant.expected_harvest_date = Some(v);
        }
        if let Some(v) = self.status {
            plant.status = v;
        }
        if let Some(v) = self.health {
            plant.health = v;
        }
        if let Some(v) = &self.location {
            plant.location = Some(v.clone());
        }
        if let Some(v) = &self.notes {
            plant.notes = Some(v.clone());
        }
        if let Some(v) = self.last_watered {
            plant.last_watered = Some(v);
        }
        if let Some(v) = self.last_fertilized {
            plant.last_fertilized = Some(v);
        }
        plant.metadata.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_species_required() {
        let err = NewPlant::default().validate().unwrap_err();
        assert!(matches!(err, GardenError::Validation(ref f) if f.len() == 2));

        let ok = NewPlant {
            name: "Tomato".into(),
            species: "Solanum".into(),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_defaults_applied_on_create() {
        let garden = Id::new();
        let user = Id::new();
        let plant = NewPlant {
            name: "Tomato".into(),
            species: "Solanum".into(),
            ..Default::default()
        }
        .into_doc(garden.clone(), user.clone());

        assert_eq!(plant.garden, garden);
        assert_eq!(plant.planted_by, user);
        assert_eq!(plant.status, PlantStatus::Seed);
        assert_eq!(plant.health, PlantHealth::Good);
    }

    #[test]
    fn test_form_body_with_blank_fields() {
        let input: NewPlant = serde_json::from_str(
            r#"{"name":"Basil","species":"Ocimum","variety":"","plantedDate":"2024-04-02"}"#,
        )
        .unwrap();
        assert!(input.variety.is_none());
        assert_eq!(
            input.planted_date.unwrap().to_string(),
            "2024-04-02T00:00:00.000Z"
        );
    }

    #[test]
    fn test_patch_ignores_parent_fields() {
        let garden = Id::new();
        let mut plant = NewPlant {
            name: "Tomato".into(),
            species: "Solanum".into(),
            ..Default::default()
        }
        .into_doc(garden.clone(), Id::new());

        let patch: PlantPatch = serde_json::from_str(
            r#"{"status":"flowering","health":"fair","garden":"65a1b2c3d4e5f60718293a4b"}"#,
        )
        .unwrap();
        patch.apply(&mut plant);

        assert_eq!(plant.status, PlantStatus::Flowering);
        assert_eq!(plant.health, PlantHealth::Fair);
        assert_eq!(plant.garden, garden);
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let patch = PlantPatch {
            status: Some(PlantStatus::Harvested),
            ..Default::default()
        };
        let set = bson::to_document(&patch).unwrap();
        assert_eq!(set, doc! { "status": "harvested" });
    }
}
