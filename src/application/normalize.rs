use crate::domain::entities::activity::{position_comment, Activity};
use crate::domain::entities::raw_position::RawPosition;
use crate::domain::error::DomainError;
use crate::domain::values::direction::ActivityType;
use crate::domain::values::symbol_resolution::SymbolResolution;
use rust_decimal::Decimal;

/// Convert one brokerage position into an importable activity.
///
/// Closed positions use their close date and price, open positions their
/// open date and price. Fees pass through unchanged, rebates included.
/// Fails when the position id, a non-zero quantity, or the currency is
/// missing, and when the id holds a comma or whitespace, which would cut it
/// short once read back from the comment.
pub fn normalize(
    position: &RawPosition,
    resolution: &SymbolResolution,
    account_id: &str,
) -> Result<Activity, DomainError> {
    let position_id = position.position_id.trim();
    if position_id.is_empty() {
        return Err(DomainError::Normalization(format!(
            "position on uic {} has no id",
            position.uic
        )));
    }
    if position_id.contains(|c: char| c == ',' || c.is_whitespace()) {
        return Err(DomainError::Normalization(format!(
            "position id {position_id:?} cannot be used as an import key"
        )));
    }

    let quantity = position
        .quantity
        .map(|q| q.abs())
        .filter(|q| !q.is_zero())
        .ok_or_else(|| {
            DomainError::Normalization(format!("position {position_id} has no quantity"))
        })?;

    let currency = position
        .currency
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            DomainError::Normalization(format!("position {position_id} has no currency"))
        })?
        .to_uppercase();

    let date = position.close_date.unwrap_or(position.open_date);
    let unit_price = position
        .close_price
        .or(position.open_price)
        .unwrap_or(Decimal::ZERO);

    Ok(Activity {
        account_id: account_id.to_string(),
        symbol: resolution.symbol.clone(),
        data_source: resolution.data_source,
        activity_type: ActivityType::from(position.direction),
        date,
        quantity,
        unit_price,
        fee: position.trade_cost.unwrap_or(Decimal::ZERO),
        currency,
        comment: position_comment(position_id),
        isin: resolution.isin.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::values::asset_type::AssetType;
    use crate::domain::values::direction::Direction;
    use crate::domain::values::symbol_resolution::ResolutionSource;
    use crate::domain::values::data_source::DataSource;
    use chrono::{TimeZone, Utc};

    fn position() -> RawPosition {
        RawPosition {
            position_id: "100".into(),
            uic: 555,
            asset_type: AssetType::Stock,
            direction: Direction::Sell,
            quantity: Some(Decimal::new(-10, 0)),
            open_price: Some(Decimal::new(1000, 2)),
            close_price: Some(Decimal::new(1200, 2)),
            trade_cost: Some(Decimal::new(-150, 2)),
            currency: Some("usd".into()),
            open_date: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap(),
            close_date: Some(Utc.with_ymd_and_hms(2024, 2, 3, 15, 0, 0).unwrap()),
            symbol_hint: Some("QUBT:xnas".into()),
            isin: None,
        }
    }

    fn resolution() -> SymbolResolution {
        SymbolResolution {
            symbol: "QUBT".into(),
            isin: None,
            source: ResolutionSource::Lookup,
            data_source: DataSource::Yahoo,
        }
    }

    #[test]
    fn test_closed_position_uses_close_fields() {
        let a = normalize(&position(), &resolution(), "acc-1").unwrap();
        assert_eq!(a.activity_type, ActivityType::Sell);
        assert_eq!(a.date, Utc.with_ymd_and_hms(2024, 2, 3, 15, 0, 0).unwrap());
        assert_eq!(a.unit_price, Decimal::new(1200, 2));
        assert_eq!(a.quantity, Decimal::new(10, 0));
        assert_eq!(a.currency, "USD");
        assert_eq!(a.comment, "saxoPositionId=100");
        assert_eq!(a.account_id, "acc-1");
    }

    #[test]
    fn test_open_position_uses_open_fields() {
        let mut p = position();
        p.close_date = None;
        p.close_price = None;
        let a = normalize(&p, &resolution(), "acc-1").unwrap();
        assert_eq!(a.date, p.open_date);
        assert_eq!(a.unit_price, Decimal::new(1000, 2));
    }

    #[test]
    fn test_negative_fee_passes_through() {
        let a = normalize(&position(), &resolution(), "acc-1").unwrap();
        assert_eq!(a.fee, Decimal::new(-150, 2));
    }

    #[test]
    fn test_missing_required_fields_fail() {
        let mut p = position();
        p.position_id = " ".into();
        assert!(matches!(
            normalize(&p, &resolution(), "a"),
            Err(DomainError::Normalization(_))
        ));

        let mut p = position();
        p.quantity = None;
        assert!(normalize(&p, &resolution(), "a").is_err());

        let mut p = position();
        p.quantity = Some(Decimal::ZERO);
        assert!(normalize(&p, &resolution(), "a").is_err());

        let mut p = position();
        p.currency = None;
        assert!(normalize(&p, &resolution(), "a").is_err());
    }

    #[test]
    fn test_id_with_separator_is_rejected() {
        for id in ["5023811,1", "5023811 2", "50238\t11"] {
            let mut p = position();
            p.position_id = id.into();
            assert!(
                matches!(normalize(&p, &resolution(), "a"), Err(DomainError::Normalization(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_key_reads_back_verbatim() {
        let mut p = position();
        p.position_id = " 5023811-5023899 ".into();
        let a = normalize(&p, &resolution(), "a").unwrap();
        assert_eq!(a.position_id(), Some("5023811-5023899"));
    }

    #[test]
    fn test_missing_prices_default_to_zero() {
        let mut p = position();
        p.open_price = None;
        p.close_price = None;
        p.trade_cost = None;
        let a = normalize(&p, &resolution(), "a").unwrap();
        assert_eq!(a.unit_price, Decimal::ZERO);
        assert_eq!(a.fee, Decimal::ZERO);
    }
}
