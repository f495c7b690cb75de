use serde::Deserialize;

/// SQL query builder for the menu listing endpoint.
/// Builds one parameterized SELECT with filters, sorting and pagination.
///
/// All parameters are carried as strings and cast in SQL (`$n::numeric`,
/// `$n::int`) so a single `Vec<String>` can back every filter type.
pub struct MenuQueryBuilder {
    base_query: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
    limit: u32,
    offset: u32,
}

impl MenuQueryBuilder {
    pub fn new() -> Self {
        Self {
            base_query: "SELECT * FROM menu_items".to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: None,
            limit: 20,
            offset: 0,
        }
    }

    /// Restrict results to a single cafeteria.
    pub fn add_cafeteria_filter(&mut self, cafeteria_id: i32) {
        let param_index = self.params.len() + 1;
        self.where_clauses
            .push(format!("cafeteria_id = ${}::int", param_index));
        self.params.push(cafeteria_id.to_string());
    }

    /// Partial name match, case-insensitive.
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("name ILIKE ${}", param_index));
        self.params.push(format!("%{}%", search));
    }

    /// Exact category match.
    pub fn add_category_filter(&mut self, category_id: i32) {
        let param_index = self.params.len() + 1;
        self.where_clauses
            .push(format!("category_id = ${}::int", param_index));
        self.params.push(category_id.to_string());
    }

    /// Only items that can currently be ordered.
    pub fn add_available_only(&mut self) {
        self.where_clauses
            .push("available = TRUE AND stock > 0".to_string());
    }

    /// Inclusive price bounds.
    pub fn add_price_range(&mut self, min: Option<f64>, max: Option<f64>) {
        if let Some(min_price) = min {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price >= ${}::numeric", param_index));
            self.params.push(min_price.to_string());
        }

        if let Some(max_price) = max {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price <= ${}::numeric", param_index));
            self.params.push(max_price.to_string());
        }
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Price => "price",
            SortField::Name => "name",
        };

        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        self.order_clause = Some(format!("{} {}", field_name, order_str));
    }

    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        self.offset = (page - 1) * limit;
    }

    /// Build the final SQL string plus its bind parameters.
    /// LIMIT/OFFSET are validated integers and inlined directly.
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = self.base_query.clone();

        if !self.where_clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(ref order) = self.order_clause {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        } else {
            query.push_str(" ORDER BY id");
        }

        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

impl Default for MenuQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw query parameters from the HTTP request; everything optional.
#[derive(Debug, Deserialize)]
pub struct MenuQueryParams {
    pub cafeteria_id: Option<i32>,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    /// When true, hide unavailable and out-of-stock items.
    pub available: Option<bool>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// "price" or "name".
    pub sort: Option<String>,
    /// "asc" or "desc".
    pub order: Option<String>,
    /// 1-indexed, defaults to 1.
    pub page: Option<u32>,
    /// Defaults to 20, capped at 100.
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query parameters after validation and defaulting.
#[derive(Debug)]
pub struct ValidatedMenuQuery {
    pub cafeteria_id: Option<i32>,
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub available_only: bool,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

pub struct QueryValidator;

impl QueryValidator {
    /// Validate raw params, apply defaults and clamp pagination.
    pub fn validate(params: MenuQueryParams) -> Result<ValidatedMenuQuery, String> {
        if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
            if min > max {
                return Err("min_price must not exceed max_price".to_string());
            }
        }
        if params.min_price.map_or(false, |p| p < 0.0)
            || params.max_price.map_or(false, |p| p < 0.0)
        {
            return Err("Price bounds must not be negative".to_string());
        }

        let sort_field = match params.sort.as_deref() {
            None => None,
            Some("price") => Some(SortField::Price),
            Some("name") => Some(SortField::Name),
            Some(other) => return Err(format!("Invalid sort field: {}", other)),
        };

        let sort_order = match params.order.as_deref() {
            None | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => return Err(format!("Invalid sort order: {}", other)),
        };

        let page = params.page.unwrap_or(1).max(1);
        let limit = params.limit.unwrap_or(20).clamp(1, 100);

        Ok(ValidatedMenuQuery {
            cafeteria_id: params.cafeteria_id,
            search: params.search.filter(|s| !s.trim().is_empty()),
            category_id: params.category_id,
            available_only: params.available.unwrap_or(false),
            min_price: params.min_price,
            max_price: params.max_price,
            sort_field,
            sort_order,
            page,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_params() -> MenuQueryParams {
        MenuQueryParams {
            cafeteria_id: None,
            search: None,
            category_id: None,
            available: None,
            min_price: None,
            max_price: None,
            sort: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_build_plain_query() {
        let builder = MenuQueryBuilder::new();
        let (query, params) = builder.build();
        assert_eq!(query, "SELECT * FROM menu_items ORDER BY id LIMIT 20 OFFSET 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_with_all_filters() {
        let mut builder = MenuQueryBuilder::new();
        builder.add_cafeteria_filter(2);
        builder.add_search_filter("chapati");
        builder.add_category_filter(5);
        builder.add_available_only();
        builder.add_price_range(Some(50.0), Some(200.0));
        builder.set_sort(SortField::Price, SortOrder::Desc);
        builder.set_pagination(3, 10);

        let (query, params) = builder.build();
        assert!(query.contains("cafeteria_id = $1::int"));
        assert!(query.contains("name ILIKE $2"));
        assert!(query.contains("category_id = $3::int"));
        assert!(query.contains("available = TRUE AND stock > 0"));
        assert!(query.contains("price >= $4::numeric"));
        assert!(query.contains("price <= $5::numeric"));
        assert!(query.contains("ORDER BY price DESC"));
        assert!(query.ends_with("LIMIT 10 OFFSET 20"));
        assert_eq!(params, vec!["2", "%chapati%", "5", "50", "200"]);
    }

    #[test]
    fn test_validator_defaults() {
        let validated = QueryValidator::validate(empty_params()).unwrap();
        assert_eq!(validated.page, 1);
        assert_eq!(validated.limit, 20);
        assert_eq!(validated.sort_order, SortOrder::Asc);
        assert!(validated.sort_field.is_none());
        assert!(!validated.available_only);
    }

    #[test]
    fn test_validator_rejects_inverted_price_range() {
        let mut params = empty_params();
        params.min_price = Some(100.0);
        params.max_price = Some(50.0);
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validator_rejects_unknown_sort() {
        let mut params = empty_params();
        params.sort = Some("rating".to_string());
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validator_clamps_limit() {
        let mut params = empty_params();
        params.limit = Some(5000);
        params.page = Some(0);
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.limit, 100);
        assert_eq!(validated.page, 1);
    }

    #[test]
    fn test_blank_search_is_dropped() {
        let mut params = empty_params();
        params.search = Some("   ".to_string());
        let validated = QueryValidator::validate(params).unwrap();
        assert!(validated.search.is_none());
    }
}
