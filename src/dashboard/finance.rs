//! Finance: transactions and the aggregate summary.
//!
//! Finance endpoints aggregate over the whole ledger and get the longer
//! finance timeout.

use tokio_util::sync::CancellationToken;

use crate::api::ApiRequest;
use crate::error::ApiResult;

use super::resource::{decode_entity, Resource};
use super::types::{FinanceSummary, Transaction};
use super::Dashboard;

pub const TRANSACTIONS_PATH: &str = "/finance/transactions";
pub const SUMMARY_PATH: &str = "/finance/summary";

/// Optional bounds for the summary, as ISO dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryPeriod {
  pub from: Option<String>,
  pub to: Option<String>,
}

pub struct FinanceApi<'a> {
  dashboard: &'a Dashboard,
}

impl<'a> FinanceApi<'a> {
  pub(crate) fn new(dashboard: &'a Dashboard) -> Self {
    Self { dashboard }
  }

  pub fn transactions(&self) -> Resource<'a, Transaction> {
    Resource::new(self.dashboard, TRANSACTIONS_PATH)
      .with_timeout(self.dashboard.api.finance_timeout())
  }

  pub async fn summary(
    &self,
    period: &SummaryPeriod,
    cancel: &CancellationToken,
  ) -> ApiResult<FinanceSummary> {
    let mut request =
      ApiRequest::get(SUMMARY_PATH).timeout(self.dashboard.api.finance_timeout());
    if let Some(from) = &period.from {
      request = request.query("from", from);
    }
    if let Some(to) = &period.to {
      request = request.query("to", to);
    }

    let body = self.dashboard.api.send(request, cancel).await?;
    decode_entity(body)
  }
}
