//! Resource entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use warden_core::traits::Identifiable;

/// Field names the server stamps onto every resource.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "created_by", "created_at"];

/// A free-form JSON object stamped with an id and its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    /// Username of the creator.
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    /// Caller-supplied fields, flattened into the top-level object.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Resource {
    /// Stamp caller-supplied attributes. Reserved field names are dropped
    /// from the attributes so the stamped values always win.
    pub fn new(created_by: impl Into<String>, mut attributes: Map<String, Value>) -> Self {
        for field in RESERVED_FIELDS {
            attributes.remove(field);
        }
        Self {
            id: Uuid::new_v4(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            attributes,
        }
    }
}

impl Identifiable for Resource {
    type Id = Uuid;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stamped_fields_win() {
        let Value::Object(attrs) = json!({"name": "report", "id": "spoofed", "created_by": "mallory"})
        else {
            unreachable!()
        };
        let resource = Resource::new("manager_user", attrs);
        let json = serde_json::to_value(&resource).unwrap();

        assert_eq!(json["name"], "report");
        assert_eq!(json["created_by"], "manager_user");
        assert_eq!(json["id"], resource.id.to_string());
    }
}
