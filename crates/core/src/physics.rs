//! Unit conversions of the introductory lab.

use crate::{LabError, LabResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// A temperature expressed in the two other usual scales.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Conversion {
    pub fahrenheit: f64,
    pub kelvin: f64,
}

pub fn convert_celsius(celsius: f64) -> Conversion {
    Conversion {
        fahrenheit: celsius * 9.0 / 5.0 + 32.0,
        kelvin: celsius + 273.15,
    }
}

/// Electrical quantities related by Ohm's law (`V = R·I`) and Joule's law (`P = I·V`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Resistance,
    Current,
    Power,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [
        Quantity::Voltage,
        Quantity::Resistance,
        Quantity::Current,
        Quantity::Power,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Quantity::Voltage => "voltage",
            Quantity::Resistance => "resistance",
            Quantity::Current => "current",
            Quantity::Power => "power",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Quantity::ALL.into_iter().find(|q| q.name() == name)
    }
}

/// Given exactly two known quantities, compute the two others.
///
/// The input maps quantity names to JSON numbers. The returned map contains exactly the
/// two missing quantities.
///
/// # Errors
///
/// Returns [`LabError::InvalidInput`] if:
/// - the input does not hold exactly two entries,
/// - an entry is not a known quantity or its value is not a number,
/// - a division by zero would be required.
pub fn compute_electricity(known: &Map<String, Value>) -> LabResult<Map<String, Value>> {
    if known.len() != 2 {
        return Err(LabError::InvalidInput(
            "exactly two quantities must be provided".into(),
        ));
    }

    let mut values = Vec::with_capacity(2);
    for (name, value) in known {
        let quantity = Quantity::from_name(name)
            .ok_or_else(|| LabError::InvalidInput(format!("unknown quantity: {name}")))?;
        let number = value
            .as_f64()
            .ok_or_else(|| LabError::InvalidInput(format!("{name} must be a number")))?;
        values.push((quantity, number));
    }

    let get = |q: Quantity| values.iter().find(|(k, _)| *k == q).map(|(_, v)| *v);
    let (v, r, i, p) = (
        get(Quantity::Voltage),
        get(Quantity::Resistance),
        get(Quantity::Current),
        get(Quantity::Power),
    );

    let computed = match (v, r, i, p) {
        (Some(v), Some(r), None, None) => {
            let i = divide(v, r)?;
            vec![(Quantity::Current, i), (Quantity::Power, v * i)]
        }
        (Some(v), None, Some(i), None) => {
            vec![(Quantity::Resistance, divide(v, i)?), (Quantity::Power, v * i)]
        }
        (Some(v), None, None, Some(p)) => {
            let i = divide(p, v)?;
            vec![(Quantity::Current, i), (Quantity::Resistance, divide(v, i)?)]
        }
        (None, Some(r), Some(i), None) => {
            let v = r * i;
            vec![(Quantity::Voltage, v), (Quantity::Power, v * i)]
        }
        (None, Some(r), None, Some(p)) => {
            let i = divide(p, r)?.sqrt();
            vec![(Quantity::Current, i), (Quantity::Voltage, r * i)]
        }
        (None, None, Some(i), Some(p)) => {
            let v = divide(p, i)?;
            vec![(Quantity::Voltage, v), (Quantity::Resistance, divide(v, i)?)]
        }
        _ => {
            return Err(LabError::InvalidInput(
                "two distinct quantities must be provided".into(),
            ))
        }
    };

    computed
        .into_iter()
        .map(|(quantity, value)| {
            let number = serde_json::Number::from_f64(value).ok_or_else(|| {
                LabError::InvalidInput(format!("{} is not a finite number", quantity.name()))
            })?;
            Ok((quantity.name().to_string(), Value::Number(number)))
        })
        .collect()
}

fn divide(numerator: f64, denominator: f64) -> LabResult<f64> {
    if denominator == 0.0 {
        Err(LabError::InvalidInput("division by zero".into()))
    } else {
        Ok(numerator / denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn compute(input: Value) -> LabResult<Map<String, Value>> {
        let map = input.as_object().expect("object").clone();
        compute_electricity(&map)
    }

    #[test]
    fn converts_celsius() {
        let c = convert_celsius(15.0);
        assert!(close(c.fahrenheit, 59.0));
        assert!(close(c.kelvin, 288.15));

        let c = convert_celsius(-10.3);
        assert!(close(c.fahrenheit, 13.46));
        assert!(close(c.kelvin, 262.85));
    }

    #[test]
    fn current_and_resistance_give_power_and_voltage() {
        let out = compute(json!({ "current": 6, "resistance": 5 })).expect("valid");
        assert_eq!(out.len(), 2);
        assert!(close(out["power"].as_f64().expect("power"), 180.0));
        assert!(close(out["voltage"].as_f64().expect("voltage"), 30.0));
    }

    #[test]
    fn every_pair_is_consistent() {
        let (v, r, i, p) = (12.0, 4.0, 3.0, 36.0);
        let all = json!({ "voltage": v, "resistance": r, "current": i, "power": p });
        let names = ["voltage", "resistance", "current", "power"];
        for (a, first) in names.iter().enumerate() {
            for second in &names[a + 1..] {
                let mut input = Map::new();
                input.insert(first.to_string(), all[*first].clone());
                input.insert(second.to_string(), all[*second].clone());
                let out = compute_electricity(&input).expect("valid pair");
                assert_eq!(out.len(), 2, "{first}/{second}");
                for (name, value) in &out {
                    assert!(!input.contains_key(name));
                    assert!(
                        close(value.as_f64().expect("number"), all[name].as_f64().expect("n")),
                        "{first}/{second} -> {name}"
                    );
                }
            }
        }
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert!(compute(json!({ "current": 6 })).is_err());
        assert!(compute(json!({ "current": 6, "resistance": 5, "power": 1 })).is_err());
        assert!(compute(json!({ "current": 6, "speed": 5 })).is_err());
        assert!(compute(json!({ "current": "6", "resistance": 5 })).is_err());
        assert!(compute(json!({ "current": true, "resistance": 5 })).is_err());
        assert!(matches!(
            compute(json!({ "voltage": 6, "resistance": 0 })),
            Err(LabError::InvalidInput(_))
        ));
    }
}
