//! Caliper 1.1 wire types.
//!
//! Only the subset of the IMS Caliper vocabulary this relay emits is modelled:
//! reading events whose object is a page nested in a chapter and a document.

use serde::{Deserialize, Serialize};

pub const CALIPER_CONTEXT: &str = "http://purl.imsglobal.org/ctx/caliper/v1p1";
pub const CALIPER_DATA_VERSION: &str = "http://purl.imsglobal.org/ctx/caliper/v1p1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ViewEvent,
    NavigationEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Viewed,
    NavigatedTo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityType {
    Person,
    SoftwareApplication,
    Organization,
    Page,
    Chapter,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
}

impl Entity {
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type,
        }
    }
}

/// A digital resource, optionally part of a larger one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<Box<Resource>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaliperEvent {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub actor: Entity,
    pub action: Action,
    pub object: Resource,
    pub event_time: String,
    pub ed_app: Entity,
    pub group: Entity,
}

/// The request body for one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorEnvelope {
    pub sensor: String,
    pub send_time: String,
    pub data_version: String,
    pub data: Vec<CaliperEvent>,
}
