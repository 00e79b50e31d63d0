//! Clinical attribute records submitted for risk classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoder::{EncodeError, EncodeResult};

/// A categorical clinical field with a fixed set of dataset labels.
pub trait Category: Sized + Copy + 'static {
    /// Field name used in error messages and the encoding vocabulary.
    const FIELD: &'static str;

    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// Label as it appears in the training dataset.
    fn label(&self) -> &'static str;

    /// Parse a dataset label (exact match after trimming).
    fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.iter().copied().find(|v| v.label() == label)
    }
}

macro_rules! category {
    ($(#[$meta:meta])* $name:ident, $field:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl Category for $name {
            const FIELD: &'static str = $field;
            const ALL: &'static [Self] = &[$(Self::$variant),+];

            fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

category!(
    /// Patient gender.
    Gender, "gender", { Male => "M", Female => "F" }
);

category!(
    /// Chest pain type.
    ChestPainType, "chest_pain_type", {
        TypicalAngina => "TA",
        AtypicalAngina => "ATA",
        NonAnginalPain => "NAP",
        Asymptomatic => "ASY",
    }
);

category!(
    /// Resting electrocardiogram result.
    RestingEcg, "resting_ecg", { Normal => "Normal", StAbnormality => "ST", Lvh => "LVH" }
);

category!(
    /// Exercise-induced angina.
    ExerciseAngina, "exercise_angina", { Yes => "Y", No => "N" }
);

category!(
    /// Slope of the peak exercise ST segment.
    StSlope, "st_slope", { Up => "Up", Flat => "Flat", Down => "Down" }
);

/// Names of the categorical fields, in feature order.
pub const CATEGORICAL_FIELDS: [&str; 5] = [
    Gender::FIELD,
    ChestPainType::FIELD,
    RestingEcg::FIELD,
    ExerciseAngina::FIELD,
    StSlope::FIELD,
];

/// Names of all attributes, in the order the model consumes them.
pub const FEATURE_NAMES: [&str; 11] = [
    "age",
    "gender",
    "chest_pain_type",
    "resting_bp",
    "cholesterol",
    "fasting_bs",
    "resting_ecg",
    "max_hr",
    "exercise_angina",
    "oldpeak",
    "st_slope",
];

/// One patient observation: the 11 clinical fields the model is fitted on.
///
/// Deserialization runs [`validate`](Self::validate), and so does the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedAttributes")]
pub struct AttributeRecord {
    /// Age in years
    pub age: i32,
    pub gender: Gender,
    pub chest_pain_type: ChestPainType,
    /// Resting blood pressure in mm Hg
    pub resting_bp: i32,
    /// Serum cholesterol in mg/dl (0 means not measured)
    pub cholesterol: i32,
    /// 1 if fasting blood sugar > 120 mg/dl, otherwise 0
    pub fasting_bs: u8,
    pub resting_ecg: RestingEcg,
    /// Maximum heart rate achieved
    pub max_hr: i32,
    pub exercise_angina: ExerciseAngina,
    /// ST depression induced by exercise relative to rest
    pub oldpeak: f64,
    pub st_slope: StSlope,
}

impl AttributeRecord {
    /// Range checks the type system does not enforce.
    pub fn validate(&self) -> EncodeResult<()> {
        for (field, value) in [
            ("age", self.age),
            ("resting_bp", self.resting_bp),
            ("cholesterol", self.cholesterol),
            ("max_hr", self.max_hr),
        ] {
            if value < 0 {
                return Err(EncodeError::schema(field, "must not be negative"));
            }
        }
        if self.fasting_bs > 1 {
            return Err(EncodeError::schema(
                "fasting_bs",
                format!("expected 0 or 1, got '{}'", self.fasting_bs),
            ));
        }
        if !self.oldpeak.is_finite() {
            return Err(EncodeError::schema("oldpeak", "must be finite"));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct UncheckedAttributes {
    age: i32,
    gender: Gender,
    chest_pain_type: ChestPainType,
    resting_bp: i32,
    cholesterol: i32,
    fasting_bs: u8,
    resting_ecg: RestingEcg,
    max_hr: i32,
    exercise_angina: ExerciseAngina,
    oldpeak: f64,
    st_slope: StSlope,
}

impl TryFrom<UncheckedAttributes> for AttributeRecord {
    type Error = EncodeError;

    fn try_from(f: UncheckedAttributes) -> Result<Self, Self::Error> {
        let record = Self {
            age: f.age,
            gender: f.gender,
            chest_pain_type: f.chest_pain_type,
            resting_bp: f.resting_bp,
            cholesterol: f.cholesterol,
            fasting_bs: f.fasting_bs,
            resting_ecg: f.resting_ecg,
            max_hr: f.max_hr,
            exercise_angina: f.exercise_angina,
            oldpeak: f.oldpeak,
            st_slope: f.st_slope,
        };
        record.validate()?;
        Ok(record)
    }
}

/// Untyped attribute form as submitted at the system boundary.
///
/// Accepts both the long field names and the short form names
/// (`cp`, `trestbps`, `chol`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAttributes {
    pub age: Option<String>,
    #[serde(alias = "sex")]
    pub gender: Option<String>,
    #[serde(alias = "cp")]
    pub chest_pain_type: Option<String>,
    #[serde(alias = "trestbps")]
    pub resting_bp: Option<String>,
    #[serde(alias = "chol")]
    pub cholesterol: Option<String>,
    #[serde(alias = "fbs")]
    pub fasting_bs: Option<String>,
    #[serde(alias = "restecg")]
    pub resting_ecg: Option<String>,
    #[serde(alias = "maxhr")]
    pub max_hr: Option<String>,
    #[serde(alias = "exang")]
    pub exercise_angina: Option<String>,
    pub oldpeak: Option<String>,
    #[serde(alias = "slope")]
    pub st_slope: Option<String>,
}

impl RawAttributes {
    /// Validate every field and build a typed record.
    pub fn parse(&self) -> EncodeResult<AttributeRecord> {
        let fasting_bs = match required("fasting_bs", &self.fasting_bs)? {
            "0" => 0,
            "1" => 1,
            other => {
                return Err(EncodeError::schema(
                    "fasting_bs",
                    format!("expected 0 or 1, got '{}'", other),
                ))
            }
        };

        let oldpeak_raw = required("oldpeak", &self.oldpeak)?;
        let oldpeak: f64 = oldpeak_raw.parse().map_err(|_| {
            EncodeError::schema("oldpeak", format!("'{}' is not a number", oldpeak_raw))
        })?;
        if !oldpeak.is_finite() {
            return Err(EncodeError::schema("oldpeak", "must be finite"));
        }

        let record = AttributeRecord {
            age: non_negative_int("age", &self.age)?,
            gender: category(&self.gender)?,
            chest_pain_type: category(&self.chest_pain_type)?,
            resting_bp: non_negative_int("resting_bp", &self.resting_bp)?,
            cholesterol: non_negative_int("cholesterol", &self.cholesterol)?,
            fasting_bs,
            resting_ecg: category(&self.resting_ecg)?,
            max_hr: non_negative_int("max_hr", &self.max_hr)?,
            exercise_angina: category(&self.exercise_angina)?,
            oldpeak,
            st_slope: category(&self.st_slope)?,
        };
        record.validate()?;
        Ok(record)
    }
}

impl From<&AttributeRecord> for RawAttributes {
    fn from(record: &AttributeRecord) -> Self {
        Self {
            age: Some(record.age.to_string()),
            gender: Some(record.gender.label().to_string()),
            chest_pain_type: Some(record.chest_pain_type.label().to_string()),
            resting_bp: Some(record.resting_bp.to_string()),
            cholesterol: Some(record.cholesterol.to_string()),
            fasting_bs: Some(record.fasting_bs.to_string()),
            resting_ecg: Some(record.resting_ecg.label().to_string()),
            max_hr: Some(record.max_hr.to_string()),
            exercise_angina: Some(record.exercise_angina.label().to_string()),
            oldpeak: Some(record.oldpeak.to_string()),
            st_slope: Some(record.st_slope.label().to_string()),
        }
    }
}

fn required<'a>(field: &'static str, value: &'a Option<String>) -> EncodeResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(EncodeError::schema(field, "missing")),
    }
}

fn non_negative_int(field: &'static str, value: &Option<String>) -> EncodeResult<i32> {
    let raw = required(field, value)?;
    let parsed: i32 = raw
        .parse()
        .map_err(|_| EncodeError::schema(field, format!("'{}' is not an integer", raw)))?;
    if parsed < 0 {
        return Err(EncodeError::schema(field, "must not be negative"));
    }
    Ok(parsed)
}

fn category<C: Category>(value: &Option<String>) -> EncodeResult<C> {
    let raw = required(C::FIELD, value)?;
    C::from_label(raw).ok_or_else(|| EncodeError::UnknownCategory {
        field: C::FIELD.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RawAttributes {
        RawAttributes {
            age: Some("55".into()),
            gender: Some("M".into()),
            chest_pain_type: Some("ASY".into()),
            resting_bp: Some("140".into()),
            cholesterol: Some("250".into()),
            fasting_bs: Some("1".into()),
            resting_ecg: Some("ST".into()),
            max_hr: Some("120".into()),
            exercise_angina: Some("Y".into()),
            oldpeak: Some("2.0".into()),
            st_slope: Some("Flat".into()),
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let record = form().parse().unwrap();
        assert_eq!(record.age, 55);
        assert_eq!(record.gender, Gender::Male);
        assert_eq!(record.chest_pain_type, ChestPainType::Asymptomatic);
        assert_eq!(record.resting_ecg, RestingEcg::StAbnormality);
        assert_eq!(record.exercise_angina, ExerciseAngina::Yes);
        assert_eq!(record.st_slope, StSlope::Flat);
        assert_eq!(record.fasting_bs, 1);
        assert_eq!(record.oldpeak, 2.0);
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let mut raw = form();
        raw.max_hr = None;
        match raw.parse() {
            Err(EncodeError::Schema { field, .. }) => assert_eq!(field, "max_hr"),
            other => panic!("expected schema error, got {:?}", other),
        }

        let mut raw = form();
        raw.cholesterol = Some("   ".into());
        assert!(matches!(raw.parse(), Err(EncodeError::Schema { .. })));
    }

    #[test]
    fn test_malformed_values() {
        let mut raw = form();
        raw.age = Some("fifty".into());
        assert!(matches!(raw.parse(), Err(EncodeError::Schema { .. })));

        let mut raw = form();
        raw.fasting_bs = Some("2".into());
        assert!(matches!(raw.parse(), Err(EncodeError::Schema { .. })));

        let mut raw = form();
        raw.oldpeak = Some("NaN".into());
        assert!(matches!(raw.parse(), Err(EncodeError::Schema { .. })));

        let mut raw = form();
        raw.resting_bp = Some("-5".into());
        assert!(matches!(raw.parse(), Err(EncodeError::Schema { .. })));
    }

    #[test]
    fn test_unknown_category() {
        let mut raw = form();
        raw.chest_pain_type = Some("XYZ".into());
        match raw.parse() {
            Err(EncodeError::UnknownCategory { field, value }) => {
                assert_eq!(field, "chest_pain_type");
                assert_eq!(value, "XYZ");
            }
            other => panic!("expected unknown category, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_category_in_every_field() {
        let cases: [(&str, fn(&mut RawAttributes)); 5] = [
            ("gender", |r| r.gender = Some("X".into())),
            ("chest_pain_type", |r| r.chest_pain_type = Some("X".into())),
            ("resting_ecg", |r| r.resting_ecg = Some("X".into())),
            ("exercise_angina", |r| r.exercise_angina = Some("X".into())),
            ("st_slope", |r| r.st_slope = Some("X".into())),
        ];
        for (expected, corrupt) in cases {
            let mut raw = form();
            corrupt(&mut raw);
            match raw.parse() {
                Err(EncodeError::UnknownCategory { field, value }) => {
                    assert_eq!(field, expected);
                    assert_eq!(value, "X");
                }
                other => panic!("Case '{}': expected unknown category, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_fields() {
        let valid = form().parse().unwrap();
        assert!(valid.validate().is_ok());

        let cases: [(&str, fn(&mut AttributeRecord)); 6] = [
            ("age", |r| r.age = -40),
            ("resting_bp", |r| r.resting_bp = -1),
            ("cholesterol", |r| r.cholesterol = -5),
            ("max_hr", |r| r.max_hr = -120),
            ("fasting_bs", |r| r.fasting_bs = 7),
            ("oldpeak", |r| r.oldpeak = f64::INFINITY),
        ];
        for (expected, corrupt) in cases {
            let mut record = valid;
            corrupt(&mut record);
            match record.validate() {
                Err(EncodeError::Schema { field, .. }) => assert_eq!(field, expected),
                other => panic!("Case '{}': expected schema error, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let record = form().parse().unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: AttributeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);

        let mut value = serde_json::to_value(record).unwrap();
        value["fasting_bs"] = serde_json::json!(9);
        assert!(serde_json::from_value::<AttributeRecord>(value).is_err());

        let mut value = serde_json::to_value(record).unwrap();
        value["age"] = serde_json::json!(-3);
        let err = serde_json::from_value::<AttributeRecord>(value).unwrap_err();
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_form_aliases() {
        let json = r#"{
            "age": "61", "gender": "F", "cp": "NAP", "trestbps": "120",
            "chol": "0", "fbs": "0", "restecg": "Normal", "maxhr": "150",
            "exang": "N", "oldpeak": "0.0", "slope": "Up"
        }"#;
        let raw: RawAttributes = serde_json::from_str(json).unwrap();
        let record = raw.parse().unwrap();
        assert_eq!(record.chest_pain_type, ChestPainType::NonAnginalPain);
        assert_eq!(record.cholesterol, 0);
        assert_eq!(record.st_slope, StSlope::Up);
    }

    #[test]
    fn test_typed_record_round_trips_through_form() {
        let record = form().parse().unwrap();
        let again = RawAttributes::from(&record).parse().unwrap();
        assert_eq!(record, again);
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(Gender::from_label(" F "), Some(Gender::Female));
        assert_eq!(StSlope::Down.to_string(), "Down");
        assert_eq!(
            serde_json::to_string(&RestingEcg::Lvh).unwrap(),
            "\"LVH\""
        );
    }
}
