use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Longest simulation the workbook template has rows for
pub const MAX_MONTHS: u32 = 12;

/// Upper bound on pallets per request; arrivals are allocated one pallet at a time
pub const MAX_PALLETS: u32 = 1_000_000;

/// Raw request body of `POST /simular`.
///
/// Fields are kept as JSON values so that numeric strings and booleans coerce the
/// same way the template's web client expects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimulationPayload {
    #[serde(default)]
    pub uf: Value,
    #[serde(default)]
    pub pallets: Value,
    #[serde(default)]
    pub meses: Value,
}

/// Validated simulation inputs
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub cost_per_unit: f64,
    pub pallet_count: u32,
    /// Always within 1..=MAX_MONTHS
    pub months: u32,
}

impl SimulationRequest {
    /// Validate and normalize a payload. The error lists the offending fields.
    pub fn from_payload(payload: &SimulationPayload) -> Result<Self, String> {
        let uf = coerce_number(&payload.uf);
        let pallets = coerce_number(&payload.pallets).trunc();
        let meses = coerce_number(&payload.meses);

        let mut invalid = Vec::new();
        if !(uf.is_finite() && uf > 0.0) {
            invalid.push("uf");
        }
        if !(pallets.is_finite() && pallets >= 1.0) {
            invalid.push("pallets");
        }
        // Any non-zero number is a usable month count once clamped
        if meses == 0.0 || meses.is_nan() {
            invalid.push("meses");
        }
        if !invalid.is_empty() {
            return Err(format!(
                "Invalid parameters: uf and pallets must be positive numbers and meses a non-zero number (invalid: {})",
                invalid.join(", ")
            ));
        }

        if pallets > MAX_PALLETS as f64 {
            return Err(format!(
                "Invalid parameters: pallets must not exceed {}",
                MAX_PALLETS
            ));
        }

        Ok(SimulationRequest {
            cost_per_unit: uf,
            pallet_count: pallets as u32,
            months: meses.trunc().clamp(1.0, MAX_MONTHS as f64) as u32,
        })
    }
}

/// Number coercion with the usual loose JSON client semantics:
/// numbers as-is, numeric strings parsed, booleans as 1/0, missing/null/blank as 0,
/// anything else NaN.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// One row of the monthly table returned to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMovement {
    #[serde(rename = "mes")]
    pub month: u32,
    #[serde(rename = "entradas")]
    pub inbound: u32,
    #[serde(rename = "salidas")]
    pub outbound: u32,
    /// Stock after the month, as computed by the workbook
    pub stock: f64,
}

/// Successful response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    #[serde(rename = "palletParking")]
    pub pallet_parking_cost: f64,
    #[serde(rename = "tradicional")]
    pub traditional_cost: f64,
    #[serde(rename = "ahorro")]
    pub savings: f64,
    #[serde(rename = "tabla")]
    pub monthly_table: Vec<MonthlyMovement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> SimulationPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_zero_cost_is_rejected() {
        let err = SimulationRequest::from_payload(&payload(json!({"uf": 0, "pallets": 10, "meses": 6})))
            .unwrap_err();
        assert!(err.contains("uf"));
        assert!(!err.contains("invalid: uf, pallets"));
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let err = SimulationRequest::from_payload(&payload(json!({}))).unwrap_err();
        assert!(err.contains("invalid: uf, pallets, meses"));
    }

    #[test]
    fn test_months_are_clamped() {
        let request =
            SimulationRequest::from_payload(&payload(json!({"uf": 100, "pallets": 20, "meses": 15})))
                .unwrap();
        assert_eq!(request.months, MAX_MONTHS);
        assert_eq!(request.pallet_count, 20);
        assert_eq!(request.cost_per_unit, 100.0);
    }

    #[test]
    fn test_negative_and_fractional_months_clamp_to_one() {
        for meses in [json!(-3), json!(0.5), json!("-0.2")] {
            let request = SimulationRequest::from_payload(&payload(
                json!({"uf": 10, "pallets": 5, "meses": meses}),
            ))
            .unwrap();
            assert_eq!(request.months, 1);
        }
    }

    #[test]
    fn test_zero_and_non_numeric_months_are_rejected() {
        for meses in [json!(0), json!("0"), json!(false), json!("tres"), json!(null)] {
            let err = SimulationRequest::from_payload(&payload(
                json!({"uf": 10, "pallets": 5, "meses": meses}),
            ))
            .unwrap_err();
            assert!(err.contains("invalid: meses"));
        }
    }

    #[test]
    fn test_numeric_strings_coerce() {
        let request = SimulationRequest::from_payload(&payload(
            json!({"uf": " 36.5 ", "pallets": "8.9", "meses": true}),
        ))
        .unwrap();
        assert_eq!(request.cost_per_unit, 36.5);
        assert_eq!(request.pallet_count, 8);
        assert_eq!(request.months, 1);
    }

    #[test]
    fn test_garbage_and_negative_values_are_rejected() {
        assert!(SimulationRequest::from_payload(&payload(
            json!({"uf": "abc", "pallets": 1, "meses": 1})
        ))
        .is_err());
        assert!(SimulationRequest::from_payload(&payload(
            json!({"uf": 10, "pallets": -4, "meses": 1})
        ))
        .is_err());
        assert!(SimulationRequest::from_payload(&payload(
            json!({"uf": 10, "pallets": 4, "meses": [3]})
        ))
        .is_err());
    }

    #[test]
    fn test_pallet_ceiling() {
        let err = SimulationRequest::from_payload(&payload(
            json!({"uf": 10, "pallets": 2_000_000, "meses": 3}),
        ))
        .unwrap_err();
        assert!(err.contains("must not exceed"));
    }

    #[test]
    fn test_result_uses_wire_names() {
        let result = SimulationResult {
            pallet_parking_cost: 10.0,
            traditional_cost: 12.0,
            savings: 2.0,
            monthly_table: vec![MonthlyMovement {
                month: 1,
                inbound: 3,
                outbound: 3,
                stock: 0.0,
            }],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "palletParking": 10.0,
                "tradicional": 12.0,
                "ahorro": 2.0,
                "tabla": [{"mes": 1, "entradas": 3, "salidas": 3, "stock": 0.0}]
            })
        );
    }
}
