use serde_json::{json, Value};

/// Fixed attribute keys, in the order they appear in `product_details`.
pub const DETAIL_KEYS: [&str; 5] = ["MARQUE", "TAILLE", "ÉTAT", "COULEUR", "EMPLACEMENT"];

/// The five structured detail attributes of an offer. Every key is always
/// present in the stored form; values are nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferDetails {
    pub brand: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
    pub color: Option<String>,
    pub location: Option<String>,
}

impl OfferDetails {
    /// Serialize as the ordered array of single-key records:
    /// `[{"MARQUE": ...}, {"TAILLE": ...}, ...]`.
    pub fn to_value(&self) -> Value {
        let values = [
            &self.brand,
            &self.size,
            &self.condition,
            &self.color,
            &self.location,
        ];
        Value::Array(
            DETAIL_KEYS
                .iter()
                .zip(values)
                .map(|(key, value)| json!({ (*key): value }))
                .collect(),
        )
    }

    pub fn from_value(value: &Value) -> Self {
        let mut details = OfferDetails::default();
        let Some(entries) = value.as_array() else {
            return details;
        };
        for entry in entries {
            let Some(map) = entry.as_object() else {
                continue;
            };
            for (key, slot) in [
                ("MARQUE", &mut details.brand),
                ("TAILLE", &mut details.size),
                ("ÉTAT", &mut details.condition),
                ("COULEUR", &mut details.color),
                ("EMPLACEMENT", &mut details.location),
            ] {
                if let Some(v) = map.get(key).and_then(|v| v.as_str()) {
                    *slot = Some(v.to_string());
                }
            }
        }
        details
    }

    /// Overwrite only the entries present in `patch`; absent fields are
    /// left untouched.
    pub fn apply(&mut self, patch: &OfferDetails) {
        if let Some(brand) = &patch.brand {
            self.brand = Some(brand.clone());
        }
        if let Some(size) = &patch.size {
            self.size = Some(size.clone());
        }
        if let Some(condition) = &patch.condition {
            self.condition = Some(condition.clone());
        }
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
        if let Some(location) = &patch.location {
            self.location = Some(location.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_five_keys_always_present_and_ordered() {
        let value = OfferDetails::default().to_value();
        let entries = value.as_array().unwrap();
        assert_eq!(entries.len(), 5);
        for (entry, key) in entries.iter().zip(DETAIL_KEYS) {
            let map = entry.as_object().unwrap();
            assert!(map.contains_key(key));
            assert!(map[key].is_null());
        }
    }

    #[test]
    fn roundtrip_preserves_values() {
        let details = OfferDetails {
            brand: Some("Zara".into()),
            size: Some("M".into()),
            condition: None,
            color: Some("bleu".into()),
            location: Some("Paris".into()),
        };
        assert_eq!(OfferDetails::from_value(&details.to_value()), details);
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let mut details = OfferDetails {
            brand: Some("Zara".into()),
            size: Some("M".into()),
            condition: Some("Bon état".into()),
            color: Some("bleu".into()),
            location: Some("Paris".into()),
        };
        details.apply(&OfferDetails {
            size: Some("L".into()),
            location: Some("Lyon".into()),
            ..Default::default()
        });
        assert_eq!(details.brand.as_deref(), Some("Zara"));
        assert_eq!(details.size.as_deref(), Some("L"));
        assert_eq!(details.condition.as_deref(), Some("Bon état"));
        assert_eq!(details.color.as_deref(), Some("bleu"));
        assert_eq!(details.location.as_deref(), Some("Lyon"));
    }

    #[test]
    fn from_value_tolerates_garbage() {
        assert_eq!(
            OfferDetails::from_value(&json!("nonsense")),
            OfferDetails::default()
        );
        assert_eq!(
            OfferDetails::from_value(&json!([42, {"TAILLE": "S"}])),
            OfferDetails {
                size: Some("S".into()),
                ..Default::default()
            }
        );
    }
}
