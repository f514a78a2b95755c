use crate::error::{ReportError, Result};
use crate::schema::{CurrencyCode, DealPropertyNames, DealRecord, ExchangeRate, Metric, RawDeal};
use log::debug;
use rust_decimal::Decimal;

/// Running totals over a deal stream. Totals only ever grow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationState {
    pub total_amount: Decimal,
    pub total_net_revenue: Decimal,
    pub count: usize,
}

impl AggregationState {
    /// `total_net_revenue / total_amount * 100`, undefined while the amount
    /// total is zero or when the ratio does not fit a `Decimal`.
    pub fn margin(&self) -> Option<Decimal> {
        if self.total_amount.is_zero() {
            return None;
        }
        self.total_net_revenue
            .checked_div(self.total_amount)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    pub fn cost(&self) -> Option<Decimal> {
        self.total_amount.checked_sub(self.total_net_revenue)
    }
}

/// What a batch of deals folds down to.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginSummary {
    pub margin: Metric<Decimal>,
    pub deal_count: Metric<usize>,
    /// `None` for an empty batch.
    pub totals: Option<AggregationState>,
}

impl MarginSummary {
    pub fn not_available() -> Self {
        Self {
            margin: Metric::NotAvailable,
            deal_count: Metric::NotAvailable,
            totals: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_none()
    }
}

pub struct Aggregator {
    foreign_currency: CurrencyCode,
    properties: DealPropertyNames,
}

impl Aggregator {
    pub fn new(foreign_currency: CurrencyCode, properties: DealPropertyNames) -> Self {
        Self {
            foreign_currency,
            properties,
        }
    }

    /// Net revenue in the base currency, falling back to the amount when
    /// net revenue is missing or comes out as zero. `None` when the
    /// conversion overflows.
    pub fn effective_net_revenue(
        &self,
        deal: &DealRecord,
        rate: Option<ExchangeRate>,
    ) -> Option<Decimal> {
        let is_foreign = deal.currency_code.as_ref() == Some(&self.foreign_currency);

        let net_revenue = match (deal.net_revenue, rate) {
            (Some(net), Some(rate)) if is_foreign => Some(rate.to_base(net)?),
            (net, _) => net,
        };

        match net_revenue {
            Some(net) if !net.is_zero() => Some(net),
            _ => Some(deal.amount),
        }
    }

    fn accumulate(
        &self,
        state: &mut AggregationState,
        deal: &DealRecord,
        rate: Option<ExchangeRate>,
    ) -> Result<()> {
        let overflow = |field: &'static str, value: Option<Decimal>| ReportError::Data {
            deal_id: deal.id.clone().unwrap_or_else(|| "<unknown>".to_string()),
            field,
            value: value.map(|v| v.to_string()),
        };

        let total_amount = state
            .total_amount
            .checked_add(deal.amount)
            .ok_or_else(|| overflow("amount", Some(deal.amount)))?;
        let total_net_revenue = self
            .effective_net_revenue(deal, rate)
            .and_then(|net| state.total_net_revenue.checked_add(net))
            .ok_or_else(|| overflow("net_revenue", deal.net_revenue))?;

        state.total_amount = total_amount;
        state.total_net_revenue = total_net_revenue;
        state.count += 1;
        Ok(())
    }

    /// Folds parsed deals left to right. A running total that leaves the
    /// `Decimal` range is a data error on the deal that pushed it there.
    pub fn fold(&self, deals: &[DealRecord], rate: Option<ExchangeRate>) -> Result<MarginSummary> {
        if deals.is_empty() {
            return Ok(MarginSummary::not_available());
        }

        let mut state = AggregationState::default();
        for deal in deals {
            self.accumulate(&mut state, deal, rate)?;
        }
        Ok(Self::summarise(state))
    }

    /// Parses and folds CRM deals. The first unparseable deal aborts the batch.
    pub fn fold_raw(&self, deals: &[RawDeal], rate: Option<ExchangeRate>) -> Result<MarginSummary> {
        if deals.is_empty() {
            return Ok(MarginSummary::not_available());
        }

        let mut state = AggregationState::default();
        for raw in deals {
            let deal = raw.parse(&self.properties)?;
            self.accumulate(&mut state, &deal, rate)?;
        }
        Ok(Self::summarise(state))
    }

    fn summarise(state: AggregationState) -> MarginSummary {
        let margin = state.margin();
        if margin.is_none() {
            debug!(
                "Margin over {} deals is undefined (zero or out-of-range amount total)",
                state.count
            );
        }

        MarginSummary {
            margin: margin.into(),
            deal_count: Metric::Value(state.count),
            totals: Some(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use rust_decimal_macros::dec;

    fn aggregator() -> Aggregator {
        Aggregator::new(CurrencyCode::new("NZD"), DealPropertyNames::default())
    }

    fn deal(amount: Decimal, net_revenue: Option<Decimal>, currency: &str) -> DealRecord {
        DealRecord {
            id: None,
            amount,
            net_revenue,
            currency_code: Some(CurrencyCode::new(currency)),
        }
    }

    #[test]
    fn test_empty_batch_is_not_available() {
        let summary = aggregator().fold(&[], None).unwrap();
        assert_eq!(summary.margin, Metric::NotAvailable);
        assert_eq!(summary.deal_count, Metric::NotAvailable);
        assert!(summary.is_empty());

        let summary = aggregator().fold_raw(&[], ExchangeRate::new(dec!(2))).unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn test_base_currency_batch() {
        let deals = vec![
            deal(dec!(100), Some(dec!(50)), "AUD"),
            deal(dec!(200), None, "AUD"),
        ];
        let summary = aggregator().fold(&deals, None).unwrap();
        let totals = summary.totals.clone().unwrap();

        assert_eq!(totals.total_amount, dec!(300));
        assert_eq!(totals.total_net_revenue, dec!(250));
        assert_eq!(totals.cost(), Some(dec!(50)));
        assert_eq!(summary.deal_count, Metric::Value(2));
        assert_eq!(summary.margin.value().unwrap().round_dp(2), dec!(83.33));
    }

    #[test]
    fn test_margin_matches_closed_form() {
        let deals = vec![
            deal(dec!(1000), Some(dec!(250)), "AUD"),
            deal(dec!(400), Some(dec!(400)), "AUD"),
            deal(dec!(600), None, "AUD"),
            deal(dec!(0), Some(dec!(10)), "AUD"),
        ];
        let expected = (dec!(250) + dec!(400) + dec!(600) + dec!(10))
            / (dec!(1000) + dec!(400) + dec!(600) + dec!(0))
            * dec!(100);

        let summary = aggregator().fold(&deals, None).unwrap();
        assert_eq!(summary.margin, Metric::Value(expected));
        assert_eq!(summary.deal_count, Metric::Value(4));
    }

    #[test]
    fn test_foreign_currency_conversion() {
        let rate = ExchangeRate::new(dec!(2.0));
        let deals = vec![deal(dec!(100), Some(dec!(100)), "NZD")];

        let summary = aggregator().fold(&deals, rate).unwrap();
        assert_eq!(summary.margin, Metric::Value(dec!(50)));

        // Without a rate the foreign net revenue passes through unchanged
        let summary = aggregator().fold(&deals, None).unwrap();
        assert_eq!(summary.margin, Metric::Value(dec!(100)));
    }

    #[test]
    fn test_conversion_only_touches_net_revenue() {
        let rate = ExchangeRate::new(dec!(4));
        let deals = vec![deal(dec!(80), Some(dec!(40)), "NZD")];
        let totals = aggregator().fold(&deals, rate).unwrap().totals.unwrap();
        assert_eq!(totals.total_amount, dec!(80));
        assert_eq!(totals.total_net_revenue, dec!(10));
    }

    #[test]
    fn test_missing_net_revenue_falls_back_to_amount() {
        let summary = aggregator().fold(&[deal(dec!(75), None, "AUD")], None).unwrap();
        assert_eq!(summary.margin, Metric::Value(dec!(100)));

        let summary = aggregator().fold(&[deal(dec!(75), Some(dec!(0)), "AUD")], None).unwrap();
        assert_eq!(summary.margin, Metric::Value(dec!(100)));
    }

    #[test]
    fn test_margin_may_exceed_one_hundred() {
        let summary = aggregator().fold(&[deal(dec!(50), Some(dec!(80)), "AUD")], None).unwrap();
        assert_eq!(summary.margin, Metric::Value(dec!(160)));
    }

    #[test]
    fn test_zero_amount_total_has_no_margin() {
        let summary = aggregator().fold(&[deal(dec!(0), Some(dec!(5)), "AUD")], None).unwrap();
        assert_eq!(summary.margin, Metric::NotAvailable);
        assert_eq!(summary.deal_count, Metric::Value(1));
    }

    #[test]
    fn test_fold_raw_aborts_on_bad_field() {
        let good = RawDeal {
            id: Some("1".to_string()),
            properties: [("amount".to_string(), Some("10".to_string()))].into(),
        };
        let bad = RawDeal {
            id: Some("2".to_string()),
            properties: [("amount".to_string(), Some("ten".to_string()))].into(),
        };

        assert!(aggregator().fold_raw(&[good.clone()], None).is_ok());
        match aggregator().fold_raw(&[good, bad], None) {
            Err(ReportError::Data { deal_id, field, .. }) => {
                assert_eq!(deal_id, "2");
                assert_eq!(field, "amount");
            }
            other => panic!("expected a data error, got {:?}", other),
        }
    }

    fn raw(id: &str, amount: &str, net_revenue: &str) -> RawDeal {
        RawDeal {
            id: Some(id.to_string()),
            properties: [
                ("amount".to_string(), Some(amount.to_string())),
                ("net_revenue".to_string(), Some(net_revenue.to_string())),
            ]
            .into(),
        }
    }

    #[test]
    fn test_total_overflow_is_data_error() {
        let huge = "50000000000000000000000000000";
        let err = aggregator()
            .fold_raw(&[raw("1", huge, "1"), raw("2", huge, "1")], None)
            .unwrap_err();

        assert!(matches!(
            err,
            ReportError::Data { ref deal_id, field: "amount", .. } if deal_id == "2"
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_conversion_overflow_is_data_error() {
        let rate = ExchangeRate::new(dec!(0.0000000000000000000000000001));
        let deals = vec![deal(dec!(10), Some(dec!(100)), "NZD")];

        assert!(matches!(
            aggregator().fold(&deals, rate),
            Err(ReportError::Data {
                field: "net_revenue",
                ..
            })
        ));
    }

    #[test]
    fn test_out_of_range_margin_is_not_available() {
        let summary = aggregator()
            .fold_raw(&[raw("1", "0.000001", "1000000000000000000000000")], None)
            .unwrap();

        assert_eq!(summary.margin, Metric::NotAvailable);
        assert_eq!(summary.deal_count, Metric::Value(1));
    }
}
