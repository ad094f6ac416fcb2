use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSort {
    Asc,
    Desc,
}

/// Normalized listing filters. Pagination is always well-defined here:
/// `page` >= 1 and `limit` >= 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferFilters {
    pub title: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub sort: Option<PriceSort>,
    pub page: i64,
    pub limit: i64,
}

impl OfferFilters {
    /// Row offset of the current page. Saturates so that absurdly large
    /// page numbers stay valid (and simply select past the end).
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Offer row with its owner's public account columns joined in.
#[derive(Debug, Clone, FromRow)]
pub struct OfferRow {
    pub id: Uuid,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_price: f64,
    pub product_details: Value,
    pub product_pictures: Value,
    pub product_image: Option<Value>,
    pub product_date: OffsetDateTime,
    pub owner: Uuid,
    pub owner_username: String,
    pub owner_phone: Option<String>,
    pub owner_avatar: Option<Value>,
}

const SELECT_WITH_OWNER: &str = "SELECT o.id, o.product_name, o.product_description, \
     o.product_price, o.product_details, o.product_pictures, o.product_image, \
     o.product_date, o.owner, u.username AS owner_username, u.phone AS owner_phone, \
     u.avatar AS owner_avatar \
     FROM offers o JOIN users u ON u.id = o.owner";

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &OfferFilters) {
    let mut sep = " WHERE ";
    if let Some(title) = &filters.title {
        qb.push(sep).push("o.product_name ILIKE ");
        qb.push_bind(format!("%{}%", title));
        sep = " AND ";
    }
    if let Some(min) = filters.price_min {
        qb.push(sep).push("o.product_price >= ");
        qb.push_bind(min);
        sep = " AND ";
    }
    if let Some(max) = filters.price_max {
        qb.push(sep).push("o.product_price <= ");
        qb.push_bind(max);
    }
}

/// Count statement: same WHERE clause as the page query, no pagination.
fn count_query(filters: &OfferFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM offers o");
    push_filters(&mut qb, filters);
    qb
}

/// Page statement: filters, optional price ordering, LIMIT/OFFSET.
fn page_query(filters: &OfferFilters) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(SELECT_WITH_OWNER);
    push_filters(&mut qb, filters);
    match filters.sort {
        Some(PriceSort::Asc) => {
            qb.push(" ORDER BY o.product_price ASC");
        }
        Some(PriceSort::Desc) => {
            qb.push(" ORDER BY o.product_price DESC");
        }
        None => {}
    }
    qb.push(" LIMIT ");
    qb.push_bind(filters.limit);
    qb.push(" OFFSET ");
    qb.push_bind(filters.offset());
    qb
}

pub struct Offer;

impl Offer {
    /// Total matching count plus one page of results. The count ignores
    /// pagination by construction.
    pub async fn list(
        db: &PgPool,
        filters: &OfferFilters,
    ) -> anyhow::Result<(i64, Vec<OfferRow>)> {
        let count: i64 = count_query(filters)
            .build_query_scalar()
            .fetch_one(db)
            .await?;
        let offers = page_query(filters)
            .build_query_as::<OfferRow>()
            .fetch_all(db)
            .await?;
        Ok((count, offers))
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<OfferRow>> {
        let row = sqlx::query_as::<_, OfferRow>(&format!("{SELECT_WITH_OWNER} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        db: &PgPool,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        price: f64,
        details: &Value,
        pictures: &Value,
        owner: Uuid,
    ) -> anyhow::Result<OffsetDateTime> {
        let (product_date,): (OffsetDateTime,) = sqlx::query_as(
            "INSERT INTO offers (id, product_name, product_description, product_price, \
             product_details, product_pictures, owner) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING product_date",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(details)
        .bind(pictures)
        .bind(owner)
        .fetch_one(db)
        .await?;
        Ok(product_date)
    }

    /// Re-persist the whole offer after a partial update has been applied
    /// in memory.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        price: f64,
        details: &Value,
        image: Option<&Value>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE offers SET product_name = $1, product_description = $2, \
             product_price = $3, product_details = $4, product_image = $5 \
             WHERE id = $6",
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(details)
        .bind(image)
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
        let res = sqlx::query("DELETE FROM offers WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn all_ids(db: &PgPool) -> anyhow::Result<Vec<Uuid>> {
        let ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM offers")
            .fetch_all(db)
            .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters() -> OfferFilters {
        OfferFilters {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            ..Default::default()
        }
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let mut qb = count_query(&filters());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM offers o");
    }

    #[test]
    fn title_filter_matches_case_insensitively() {
        let mut qb = count_query(&OfferFilters {
            title: Some("shirt".into()),
            ..filters()
        });
        assert!(qb.sql().contains("o.product_name ILIKE "));
    }

    #[test]
    fn price_bounds_are_inclusive_and_independent() {
        let mut min_only = count_query(&OfferFilters {
            price_min: Some(10.0),
            ..filters()
        });
        let sql = min_only.sql().to_string();
        assert!(sql.contains("o.product_price >= "));
        assert!(!sql.contains("<="));

        let mut max_only = count_query(&OfferFilters {
            price_max: Some(30.0),
            ..filters()
        });
        let sql = max_only.sql().to_string();
        assert!(sql.contains("o.product_price <= "));
        assert!(!sql.contains(">="));

        let mut both = count_query(&OfferFilters {
            price_min: Some(10.0),
            price_max: Some(30.0),
            ..filters()
        });
        let sql = both.sql().to_string();
        assert!(sql.contains("o.product_price >= "));
        assert!(sql.contains(" AND o.product_price <= "));
    }

    #[test]
    fn count_shares_filters_but_never_paginates() {
        let f = OfferFilters {
            title: Some("shirt".into()),
            price_min: Some(10.0),
            sort: Some(PriceSort::Asc),
            page: 2,
            limit: 2,
            ..Default::default()
        };
        let count_sql = count_query(&f).sql().to_string();
        let page_sql = page_query(&f).sql().to_string();

        for clause in ["o.product_name ILIKE ", "o.product_price >= "] {
            assert!(count_sql.contains(clause));
            assert!(page_sql.contains(clause));
        }
        assert!(!count_sql.contains("LIMIT"));
        assert!(!count_sql.contains("OFFSET"));
        assert!(!count_sql.contains("ORDER BY"));
        assert!(page_sql.contains(" LIMIT "));
        assert!(page_sql.contains(" OFFSET "));
    }

    #[test]
    fn order_by_follows_the_requested_sort() {
        let sql = page_query(&OfferFilters {
            sort: Some(PriceSort::Asc),
            ..filters()
        })
        .sql()
        .to_string();
        assert!(sql.contains("ORDER BY o.product_price ASC"));

        let sql = page_query(&OfferFilters {
            sort: Some(PriceSort::Desc),
            ..filters()
        })
        .sql()
        .to_string();
        assert!(sql.contains("ORDER BY o.product_price DESC"));

        let sql = page_query(&filters()).sql().to_string();
        assert!(!sql.contains("ORDER BY"));
    }

    #[test]
    fn consecutive_pages_cover_disjoint_row_ranges() {
        let page = |n| OfferFilters {
            page: n,
            limit: 2,
            ..Default::default()
        };
        assert_eq!(page(1).offset(), 0);
        assert_eq!(page(2).offset(), 2);
        assert_eq!(page(3).offset(), 4);
    }

    #[test]
    fn offset_saturates_instead_of_overflowing() {
        let f = OfferFilters {
            page: i64::MAX,
            limit: DEFAULT_PAGE_SIZE,
            ..Default::default()
        };
        assert_eq!(f.offset(), i64::MAX);
        // Building the statement with the extreme offset must not panic.
        let mut qb = page_query(&f);
        assert!(qb.sql().contains(" OFFSET "));
    }
}
