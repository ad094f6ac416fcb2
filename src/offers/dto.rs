use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::offers::repo::{OfferFilters, OfferRow, PriceSort, DEFAULT_PAGE_SIZE};

/// Raw query string of `GET /offers`. Numeric parameters arrive as strings
/// so that malformed values can fall back to defaults instead of bouncing
/// the whole request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
    #[serde(rename = "priceMin")]
    pub price_min: Option<String>,
    #[serde(rename = "priceMax")]
    pub price_max: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn normalize(self) -> OfferFilters {
        let sort = match self.sort.as_deref() {
            Some("price-asc") => Some(PriceSort::Asc),
            Some("price-desc") => Some(PriceSort::Desc),
            _ => None,
        };
        // page < 1 clamps to 1; anything unparseable does too.
        let page = self
            .page
            .and_then(|p| p.parse::<i64>().ok())
            .map(|p| p.max(1))
            .unwrap_or(1);
        // Absent or invalid limit gets the documented default.
        let limit = self
            .limit
            .and_then(|l| l.parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        OfferFilters {
            title: self.title.filter(|t| !t.is_empty()),
            price_min: self.price_min.and_then(|p| p.parse::<f64>().ok()),
            price_max: self.price_max.and_then(|p| p.parse::<f64>().ok()),
            sort,
            page,
            limit,
        }
    }
}

/// Owner of an offer, reduced to public account info.
#[derive(Debug, Serialize)]
pub struct OwnerResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub account: OwnerAccount,
}

#[derive(Debug, Serialize)]
pub struct OwnerAccount {
    pub username: String,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_price: f64,
    pub product_details: Value,
    pub product_pictures: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image: Option<Value>,
    pub product_date: OffsetDateTime,
    pub owner: OwnerResponse,
}

impl From<OfferRow> for OfferResponse {
    fn from(row: OfferRow) -> Self {
        Self {
            id: row.id,
            product_name: row.product_name,
            product_description: row.product_description,
            product_price: row.product_price,
            product_details: row.product_details,
            product_pictures: row.product_pictures,
            product_image: row.product_image,
            product_date: row.product_date,
            owner: OwnerResponse {
                id: row.owner,
                account: OwnerAccount {
                    username: row.owner_username,
                    phone: row.owner_phone,
                    avatar: row.owner_avatar,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: i64,
    pub offers: Vec<OfferResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn page_clamps_to_one() {
        assert_eq!(query(Some("0"), None).normalize().page, 1);
        assert_eq!(query(Some("-3"), None).normalize().page, 1);
        assert_eq!(query(Some("abc"), None).normalize().page, 1);
        assert_eq!(query(None, None).normalize().page, 1);
        assert_eq!(query(Some("4"), None).normalize().page, 4);
    }

    #[test]
    fn extreme_page_values_stay_usable() {
        let filters = query(Some("9223372036854775807"), None).normalize();
        assert_eq!(filters.page, i64::MAX);
        // The derived offset saturates instead of overflowing.
        assert_eq!(filters.offset(), i64::MAX);
    }

    #[test]
    fn limit_defaults_when_absent_or_invalid() {
        assert_eq!(query(None, None).normalize().limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query(None, Some("nope")).normalize().limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query(None, Some("0")).normalize().limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query(None, Some("-2")).normalize().limit, DEFAULT_PAGE_SIZE);
        assert_eq!(query(None, Some("2")).normalize().limit, 2);
    }

    #[test]
    fn sort_strings_map_to_directions() {
        let q = |s: &str| ListQuery {
            sort: Some(s.to_string()),
            ..Default::default()
        };
        assert_eq!(q("price-asc").normalize().sort, Some(PriceSort::Asc));
        assert_eq!(q("price-desc").normalize().sort, Some(PriceSort::Desc));
        assert_eq!(q("date-desc").normalize().sort, None);
        assert_eq!(ListQuery::default().normalize().sort, None);
    }

    #[test]
    fn price_bounds_are_optional_and_tolerant() {
        let filters = ListQuery {
            price_min: Some("10".into()),
            price_max: Some("garbage".into()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(filters.price_min, Some(10.0));
        assert_eq!(filters.price_max, None);
    }

    #[test]
    fn offer_response_uses_mongo_style_ids() {
        let row = OfferRow {
            id: Uuid::new_v4(),
            product_name: "Shirt".into(),
            product_description: None,
            product_price: 20.0,
            product_details: serde_json::json!([]),
            product_pictures: serde_json::json!([]),
            product_image: None,
            product_date: OffsetDateTime::UNIX_EPOCH,
            owner: Uuid::new_v4(),
            owner_username: "Anna".into(),
            owner_phone: None,
            owner_avatar: None,
        };
        let json = serde_json::to_value(OfferResponse::from(row)).unwrap();
        assert!(json.get("_id").is_some());
        assert!(json["owner"].get("_id").is_some());
        assert_eq!(json["owner"]["account"]["username"], "Anna");
        // Only public account info on the owner.
        assert!(json["owner"].get("email").is_none());
        assert!(json["owner"].get("token").is_none());
    }
}
