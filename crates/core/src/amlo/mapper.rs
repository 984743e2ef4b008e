//! Reservation → widget-value mapping.

use std::collections::BTreeMap;

use serde_json::Value;

use super::types::Reservation;
use crate::ledger::TradeDirection;

/// Flattens a reservation into `{business_field: value}`.
///
/// Core fields are derived from the reservation record; the operator's
/// `form_data` blob then overlays anything else the form captured. Keys in
/// the blob win over derived values, matching the intake UI which lets the
/// operator correct pre-filled fields.
#[must_use]
pub fn map_fields(reservation: &Reservation, report_no: &str) -> BTreeMap<String, Value> {
    let mut values: BTreeMap<String, Value> = BTreeMap::new();
    values.insert(
        "maker_name".to_string(),
        Value::String(reservation.customer_name.clone()),
    );
    values.insert(
        "customer_id".to_string(),
        Value::String(reservation.customer_id.clone()),
    );
    values.insert(
        "amount_thb".to_string(),
        Value::String(reservation.amount.to_string()),
    );
    values.insert(
        "currency".to_string(),
        Value::String(reservation.currency.clone()),
    );
    values.insert(
        "report_no".to_string(),
        Value::String(report_no.to_string()),
    );
    values.insert(
        "transaction_date".to_string(),
        Value::String(reservation.created_at.format("%Y-%m-%d").to_string()),
    );
    let (buy, sell) = match reservation.direction {
        TradeDirection::BranchBuys => (true, false),
        TradeDirection::BranchSells => (false, true),
    };
    values.insert("is_buy".to_string(), Value::Bool(buy));
    values.insert("is_sell".to_string(), Value::Bool(sell));

    if let Value::Object(form) = &reservation.form_data {
        for (key, value) in form {
            values.insert(key.clone(), value.clone());
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amlo::state::ReservationStatus;
    use crate::amlo::types::ReportType;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use satang_shared::types::{BranchId, OperatorId, ReservationId};
    use serde_json::json;

    fn reservation(form_data: Value) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            reservation_no: "700-012-69-5".to_string(),
            branch_id: BranchId::new(),
            customer_name: "Somchai P.".to_string(),
            customer_id: "1103700123456".to_string(),
            amount: dec!(750000),
            currency: "USD".to_string(),
            direction: TradeDirection::BranchBuys,
            report_type: ReportType::Cash,
            status: ReservationStatus::Pending,
            rejection_reason: None,
            audited_by: None,
            created_by: OperatorId::new(),
            linked_transaction_id: None,
            form_data,
            created_at: Utc.with_ymd_and_hms(2026, 8, 26, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_derived_fields() {
        let values = map_fields(&reservation(json!({})), "700-012-69-5");
        assert_eq!(values["maker_name"], json!("Somchai P."));
        assert_eq!(values["amount_thb"], json!("750000"));
        assert_eq!(values["report_no"], json!("700-012-69-5"));
        assert_eq!(values["is_buy"], json!(true));
        assert_eq!(values["is_sell"], json!(false));
        assert_eq!(values["transaction_date"], json!("2026-08-26"));
    }

    #[test]
    fn test_form_data_overlays_derived() {
        let values = map_fields(
            &reservation(json!({"maker_name": "สมชาย พ.", "occupation": "merchant"})),
            "700-012-69-5",
        );
        assert_eq!(values["maker_name"], json!("สมชาย พ."));
        assert_eq!(values["occupation"], json!("merchant"));
    }
}
