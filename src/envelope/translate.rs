use super::caliper::{
    Action, CaliperEvent, Entity, EntityType, EventKind, Resource, CALIPER_CONTEXT,
};
use crate::storage::RawEvent;
use chrono::SecondsFormat;
use std::collections::HashMap;
use uuid::Uuid;

/// Document, chapter and page derived from a navigation path.
///
/// Paths look like `/runestone/static/<document>/<chapter>/<page>`; splitting
/// on `/` puts the document at index 3, the chapter at 4 and the page at 5.
/// Short or missing paths leave the deeper levels empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIdentity {
    pub page_path: String,
    pub chapter_path: String,
    pub document_path: String,
    pub document_id: Option<String>,
    pub chapter_id: Option<String>,
    pub page_id: Option<String>,
}

impl ResourceIdentity {
    pub fn from_path(path: Option<&str>) -> Self {
        let Some(path) = path.filter(|p| !p.is_empty()) else {
            return Self::default();
        };

        let segments: Vec<&str> = path.split('/').collect();
        let prefix = |n: usize| format!("{}/", segments[..n.min(segments.len())].join("/"));
        let segment = |i: usize| segments.get(i).map(|s| s.to_string());

        Self {
            page_path: path.to_string(),
            chapter_path: prefix(5),
            document_path: prefix(4),
            document_id: segment(3),
            chapter_id: segment(4),
            page_id: segment(5),
        }
    }

    /// The page, nested in its chapter and document
    pub fn to_resource(&self) -> Resource {
        let document = Resource {
            id: self.document_path.clone(),
            entity_type: EntityType::Document,
            name: self.document_id.clone(),
            is_part_of: None,
        };
        let chapter = Resource {
            id: self.chapter_path.clone(),
            entity_type: EntityType::Chapter,
            name: self.chapter_id.clone(),
            is_part_of: Some(Box::new(document)),
        };
        Resource {
            id: self.page_path.clone(),
            entity_type: EntityType::Page,
            name: self.page_id.clone(),
            is_part_of: Some(Box::new(chapter)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationRule {
    pub kind: EventKind,
    pub action: Action,
}

/// Maps `(event_type, action_type)` pairs to the Caliper event they become.
///
/// The fetch filter is configured separately and may be broader than this
/// table; fetched rows with no entry are skipped, not translated.
#[derive(Debug, Clone)]
pub struct TranslationTable {
    rules: HashMap<(String, String), TranslationRule>,
}

impl Default for TranslationTable {
    fn default() -> Self {
        Self::empty().with_rule(
            "page",
            "view",
            TranslationRule {
                kind: EventKind::ViewEvent,
                action: Action::Viewed,
            },
        )
    }
}

impl TranslationTable {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, event_type: &str, action_type: &str, rule: TranslationRule) -> Self {
        self.rules
            .insert((event_type.to_string(), action_type.to_string()), rule);
        self
    }

    pub fn lookup(&self, event_type: &str, action_type: &str) -> Option<TranslationRule> {
        self.rules
            .get(&(event_type.to_string(), action_type.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Build the Caliper event for `raw` under `rule`. Pure apart from the fresh event id.
pub fn translate(raw: &RawEvent, rule: TranslationRule, organization: &str) -> CaliperEvent {
    let identity = ResourceIdentity::from_path(raw.resource_path.as_deref());

    CaliperEvent {
        context: CALIPER_CONTEXT.to_string(),
        id: format!("urn:uuid:{}", Uuid::new_v4()),
        kind: rule.kind,
        actor: Entity::new(EntityType::Person, raw.subject_id.clone()),
        action: rule.action,
        object: identity.to_resource(),
        event_time: raw.occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        ed_app: Entity::new(EntityType::SoftwareApplication, raw.context_id.clone()),
        group: Entity::new(EntityType::Organization, organization),
    }
}

/// Translates raw events with a fixed table and organization
#[derive(Debug, Clone)]
pub struct Translator {
    table: TranslationTable,
    organization: String,
}

impl Translator {
    pub fn new(table: TranslationTable, organization: impl Into<String>) -> Self {
        Self {
            table,
            organization: organization.into(),
        }
    }

    /// `None` when the event's type pair has no rule
    pub fn translate(&self, raw: &RawEvent) -> Option<CaliperEvent> {
        let rule = self.table.lookup(&raw.event_type, &raw.action_type)?;
        Some(translate(raw, rule, &self.organization))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn raw(event_type: &str, action_type: &str, path: Option<&str>) -> RawEvent {
        RawEvent {
            event_type: event_type.to_string(),
            action_type: action_type.to_string(),
            subject_id: "student1".to_string(),
            context_id: "course101".to_string(),
            resource_path: path.map(str::to_string),
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap(),
        }
    }

    #[test]
    fn test_identity_full_path() {
        let identity = ResourceIdentity::from_path(Some("a/b/c/DOC1/CH1/PG1"));
        assert_eq!(identity.document_id.as_deref(), Some("DOC1"));
        assert_eq!(identity.chapter_id.as_deref(), Some("CH1"));
        assert_eq!(identity.page_id.as_deref(), Some("PG1"));
        assert_eq!(identity.document_path, "a/b/c/DOC1/");
        assert_eq!(identity.chapter_path, "a/b/c/DOC1/CH1/");
        assert_eq!(identity.page_path, "a/b/c/DOC1/CH1/PG1");
    }

    #[test]
    fn test_identity_runestone_path() {
        let identity =
            ResourceIdentity::from_path(Some("/runestone/static/thinkcspy/Functions/index.html"));
        assert_eq!(identity.document_id.as_deref(), Some("thinkcspy"));
        assert_eq!(identity.chapter_id.as_deref(), Some("Functions"));
        assert_eq!(identity.page_id.as_deref(), Some("index.html"));
        assert_eq!(identity.document_path, "/runestone/static/thinkcspy/");
    }

    #[test]
    fn test_identity_short_path() {
        let identity = ResourceIdentity::from_path(Some("a/b"));
        assert_eq!(identity.document_id, None);
        assert_eq!(identity.chapter_id, None);
        assert_eq!(identity.page_id, None);
        assert_eq!(identity.document_path, "a/b/");
    }

    #[test]
    fn test_identity_partial_levels() {
        let identity = ResourceIdentity::from_path(Some("a/b/c/DOC1/CH1"));
        assert_eq!(identity.document_id.as_deref(), Some("DOC1"));
        assert_eq!(identity.chapter_id.as_deref(), Some("CH1"));
        assert_eq!(identity.page_id, None);
    }

    #[test]
    fn test_identity_missing_path() {
        for path in [None, Some("")] {
            let identity = ResourceIdentity::from_path(path);
            assert_eq!(identity, ResourceIdentity::default());
            assert_eq!(identity.document_path, "");
            assert_eq!(identity.chapter_path, "");
        }
    }

    #[test]
    fn test_default_table_only_maps_page_view() {
        let table = TranslationTable::default();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("page", "view"),
            Some(TranslationRule {
                kind: EventKind::ViewEvent,
                action: Action::Viewed,
            })
        );
        assert_eq!(table.lookup("page", "edit"), None);
        assert_eq!(table.lookup("video", "view"), None);
    }

    #[test]
    fn test_translator_skips_unmapped_pairs() {
        let translator = Translator::new(TranslationTable::default(), "Umich");
        assert!(translator.translate(&raw("page", "view", Some("a/b"))).is_some());
        assert!(translator.translate(&raw("page", "edit", Some("a/b"))).is_none());
        assert!(translator.translate(&raw("video", "play", None)).is_none());
    }

    #[test]
    fn test_translator_with_extra_rule() {
        let table = TranslationTable::default().with_rule(
            "page",
            "navigate",
            TranslationRule {
                kind: EventKind::NavigationEvent,
                action: Action::NavigatedTo,
            },
        );
        let translator = Translator::new(table, "Umich");
        let event = translator.translate(&raw("page", "navigate", None)).unwrap();
        assert_eq!(event.kind, EventKind::NavigationEvent);
        assert_eq!(event.action, Action::NavigatedTo);
    }

    #[test]
    fn test_translate_fields() {
        let rule = TranslationRule {
            kind: EventKind::ViewEvent,
            action: Action::Viewed,
        };
        let event = translate(&raw("page", "view", Some("a/b/c/DOC1/CH1/PG1")), rule, "Umich");

        assert!(event.id.starts_with("urn:uuid:"));
        assert_eq!(event.context, CALIPER_CONTEXT);
        assert_eq!(event.actor, Entity::new(EntityType::Person, "student1"));
        assert_eq!(event.ed_app, Entity::new(EntityType::SoftwareApplication, "course101"));
        assert_eq!(event.group, Entity::new(EntityType::Organization, "Umich"));
        assert_eq!(event.event_time, "2024-03-01T09:15:00.000Z");

        assert_eq!(event.object.id, "a/b/c/DOC1/CH1/PG1");
        assert_eq!(event.object.name.as_deref(), Some("PG1"));
        let chapter = event.object.is_part_of.as_ref().unwrap();
        assert_eq!(chapter.entity_type, EntityType::Chapter);
        assert_eq!(chapter.name.as_deref(), Some("CH1"));
        let document = chapter.is_part_of.as_ref().unwrap();
        assert_eq!(document.entity_type, EntityType::Document);
        assert_eq!(document.id, "a/b/c/DOC1/");
    }

    #[test]
    fn test_serialized_shape() {
        let rule = TranslationRule {
            kind: EventKind::ViewEvent,
            action: Action::Viewed,
        };
        let event = translate(&raw("page", "view", Some("a/b")), rule, "Umich");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["@context"], CALIPER_CONTEXT);
        assert_eq!(json["type"], "ViewEvent");
        assert_eq!(json["action"], "Viewed");
        assert_eq!(json["eventTime"], "2024-03-01T09:15:00.000Z");
        assert_eq!(json["edApp"]["type"], "SoftwareApplication");
        assert_eq!(json["object"]["type"], "Page");
        assert_eq!(json["object"]["isPartOf"]["type"], "Chapter");
        // Absent identity levels are omitted rather than null
        assert!(json["object"].get("name").is_none());
    }
}
