//! The slice of the storefront order model the pipeline reads

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<u64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Completed sales order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Order {
    pub fn line_item(&self, line_item_id: u64) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.id == line_item_id)
    }

    /// Email for the audit trail, preferring the customer record
    pub fn customer_email(&self) -> Option<&str> {
        self.customer
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .or(self.email.as_deref())
    }

    pub fn customer_id(&self) -> Option<u64> {
        self.customer.as_ref().and_then(|c| c.id)
    }
}

/// Custom key/value attached to a line item at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemProperty {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl LineItemProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Value::String(value.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub properties: Vec<LineItemProperty>,
}

impl LineItem {
    /// Look up a property by name.
    ///
    /// Also matches the hidden `_Name` form the theme uses for properties it
    /// does not want shown at checkout. Blank values count as absent.
    pub fn property(&self, name: &str) -> Option<String> {
        self.properties.iter().find_map(|p| {
            let key = p.name.trim();
            if key != name && key.strip_prefix('_') != Some(name) {
                return None;
            }
            let value = match &p.value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!value.is_empty()).then_some(value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_lookup_forms() {
        let item = LineItem {
            id: 1,
            title: None,
            properties: vec![
                LineItemProperty::new("_Configuration ID", "cfg_42"),
                LineItemProperty::new(" Preview ID ", "   "),
                LineItemProperty {
                    name: "Activity ID".into(),
                    value: json!(123456),
                },
            ],
        };
        assert_eq!(item.property("Configuration ID").as_deref(), Some("cfg_42"));
        assert_eq!(item.property("Preview ID"), None);
        assert_eq!(item.property("Activity ID").as_deref(), Some("123456"));
        assert_eq!(item.property("Map Config"), None);
    }

    #[test]
    fn test_deserialize_storefront_order() {
        let order: Order = serde_json::from_value(json!({
            "id": 5001,
            "name": "#1042",
            "email": "buyer@example.com",
            "customer": {"id": 77, "email": "owner@example.com"},
            "line_items": [
                {"id": 9, "title": "Route poster", "properties": [{"name": "Configuration ID", "value": "cfg_42"}]}
            ]
        }))
        .unwrap();

        assert_eq!(order.customer_email(), Some("owner@example.com"));
        assert_eq!(order.customer_id(), Some(77));
        let item = order.line_item(9).unwrap();
        assert_eq!(item.property("Configuration ID").as_deref(), Some("cfg_42"));
        assert!(order.line_item(10).is_none());
    }
}
