//! Customer resolution by email address.

use std::sync::Arc;

use tracing::debug;

use super::model::CustomerMatch;
use crate::config::MatchPolicy;
use crate::error::DatabaseError;
use crate::store::{Column, Directory, Filter, SearchQuery, SearchRow};

fn email_column() -> Column {
    Column::new("email")
}

fn id_column() -> Column {
    Column::new("internalid")
}

fn sales_rep_email_column() -> Column {
    Column::joined("email", "salesRep")
}

/// Finds the customer a submission belongs to.
pub struct CustomerResolver {
    directory: Arc<dyn Directory>,
    policy: MatchPolicy,
}

impl CustomerResolver {
    pub fn new(directory: Arc<dyn Directory>, policy: MatchPolicy) -> Self {
        Self { directory, policy }
    }

    /// Look up a customer by exact email.
    ///
    /// No match is not an error. An absent or empty email skips the lookup.
    /// Directory faults are returned as-is, without retries.
    pub async fn resolve(&self, email: Option<&str>) -> Result<CustomerMatch, DatabaseError> {
        let Some(email) = email.filter(|e| !e.is_empty()) else {
            return Ok(CustomerMatch::default());
        };

        let query = SearchQuery::new("customer")
            .filter(Filter::is("email", email))
            .column(email_column())
            .column(id_column())
            .column(sales_rep_email_column());
        let rows = self.directory.search(&query).await?;

        debug!(email = email, rows = rows.len(), "Customer directory searched");
        self.pick(&rows)
    }

    fn pick(&self, rows: &[SearchRow]) -> Result<CustomerMatch, DatabaseError> {
        let chosen = match self.policy {
            MatchPolicy::LastWins => rows.last(),
            MatchPolicy::FirstWins => rows.first(),
            MatchPolicy::RejectAmbiguous if rows.len() > 1 => {
                let ids: Vec<_> = rows.iter().filter_map(|r| r.get(&id_column())).collect();
                return Err(DatabaseError::Constraint(format!(
                    "ambiguous customer match: {}",
                    ids.join(", ")
                )));
            }
            MatchPolicy::RejectAmbiguous => rows.first(),
        };

        Ok(chosen.map(to_match).unwrap_or_default())
    }
}

fn to_match(row: &SearchRow) -> CustomerMatch {
    let text = |c: Column| row.get(&c).map(str::to_string);
    CustomerMatch {
        customer_id: text(id_column()),
        customer_email: text(email_column()),
        sales_owner_email: text(sales_rep_email_column()),
    }
}
