//! Clinical input submitted for a single heart disease assessment

use crate::error::{PredictorError, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Age slider bounds (years)
pub const AGE_RANGE: RangeInclusive<u32> = 20..=100;
/// Resting blood pressure slider bounds (mmHg)
pub const RESTING_BP_RANGE: RangeInclusive<u32> = 80..=200;
/// Serum cholesterol slider bounds (mg/dL)
pub const CHOLESTEROL_RANGE: RangeInclusive<u32> = 100..=400;
/// Maximum heart rate slider bounds (bpm)
pub const MAX_HEART_RATE_RANGE: RangeInclusive<u32> = 60..=220;
/// ST depression slider bounds, in steps of 0.1
pub const OLDPEAK_RANGE: RangeInclusive<f64> = 0.0..=6.5;

/// Declares a categorical field whose variants carry the integer code used
/// at training time, a snake_case wire name and the form label.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($field:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, $key:literal, $label:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// Every option, in form order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Integer code fed to the classifier
            pub fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Canonical snake_case name
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }

            /// Label shown on the input form
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = PredictorError;

            /// Accepts the snake_case name or the form label. Case and
            /// surrounding whitespace are ignored.
            fn from_str(s: &str) -> Result<Self> {
                let s = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s) || v.label().eq_ignore_ascii_case(s))
                    .ok_or_else(|| PredictorError::invalid($field, format!("unknown option '{}'", s)))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

coded_enum! {
    /// Biological sex
    Sex ("sex") {
        Female = 0, "female", "Female";
        Male = 1, "male", "Male";
    }
}

coded_enum! {
    /// Chest pain type
    ChestPainType ("chest_pain_type") {
        TypicalAngina = 1, "typical_angina", "Typical Angina (1)";
        AtypicalAngina = 2, "atypical_angina", "Atypical Angina (2)";
        NonAnginalPain = 3, "non_anginal_pain", "Non-Anginal Pain (3)";
        Asymptomatic = 4, "asymptomatic", "Asymptomatic (4)";
    }
}

coded_enum! {
    /// Fasting blood sugar relative to 120 mg/dL
    FastingBloodSugar ("fasting_blood_sugar") {
        Le120 = 0, "le_120", "<=120 mg/dL (0)";
        Gt120 = 1, "gt_120", ">120 mg/dL (1)";
    }
}

coded_enum! {
    /// Resting electrocardiogram result
    RestingEcg ("resting_ecg") {
        Normal = 0, "normal", "Normal (0)";
        StTAbnormality = 1, "st_t_abnormality", "ST-T Abnormality (1)";
        LvHypertrophy = 2, "lv_hypertrophy", "LV Hypertrophy (2)";
    }
}

coded_enum! {
    /// Exercise induced angina
    ExerciseAngina ("exercise_angina") {
        No = 0, "no", "No (0)";
        Yes = 1, "yes", "Yes (1)";
    }
}

coded_enum! {
    /// Slope of the peak exercise ST segment
    StSlope ("st_slope") {
        Upward = 1, "upward", "Upward (1)";
        Flat = 2, "flat", "Flat (2)";
        Downward = 3, "downward", "Downward (3)";
    }
}

/// Clinical parameters for one patient, as submitted from the input form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClinicalSubmission")]
pub struct ClinicalInput {
    /// Age in years
    pub age: u32,

    pub sex: Sex,

    pub chest_pain_type: ChestPainType,

    /// Resting blood pressure (mmHg)
    #[serde(alias = "resting_bp_s")]
    pub resting_bp: u32,

    /// Serum cholesterol (mg/dL)
    pub cholesterol: u32,

    pub fasting_blood_sugar: FastingBloodSugar,

    pub resting_ecg: RestingEcg,

    /// Maximum heart rate achieved
    pub max_heart_rate: u32,

    pub exercise_angina: ExerciseAngina,

    /// ST depression induced by exercise relative to rest
    pub oldpeak: f64,

    pub st_slope: StSlope,
}

/// Raw submission as it arrives on the wire, before the categorical
/// options are parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct ClinicalSubmission {
    pub age: u32,
    pub sex: String,
    pub chest_pain_type: String,
    #[serde(alias = "resting_bp_s")]
    pub resting_bp: u32,
    pub cholesterol: u32,
    pub fasting_blood_sugar: String,
    pub resting_ecg: String,
    pub max_heart_rate: u32,
    pub exercise_angina: String,
    pub oldpeak: f64,
    pub st_slope: String,
}

impl TryFrom<ClinicalSubmission> for ClinicalInput {
    type Error = PredictorError;

    fn try_from(raw: ClinicalSubmission) -> Result<Self> {
        Ok(Self {
            age: raw.age,
            sex: raw.sex.parse()?,
            chest_pain_type: raw.chest_pain_type.parse()?,
            resting_bp: raw.resting_bp,
            cholesterol: raw.cholesterol,
            fasting_blood_sugar: raw.fasting_blood_sugar.parse()?,
            resting_ecg: raw.resting_ecg.parse()?,
            max_heart_rate: raw.max_heart_rate,
            exercise_angina: raw.exercise_angina.parse()?,
            oldpeak: raw.oldpeak,
            st_slope: raw.st_slope.parse()?,
        })
    }
}

impl ClinicalInput {
    /// Check every numeric field against the form's slider bounds.
    ///
    /// Categorical fields need no check: an unknown option fails to parse.
    pub fn validate(&self) -> Result<()> {
        check_range("age", self.age, &AGE_RANGE)?;
        check_range("resting_bp", self.resting_bp, &RESTING_BP_RANGE)?;
        check_range("cholesterol", self.cholesterol, &CHOLESTEROL_RANGE)?;
        check_range("max_heart_rate", self.max_heart_rate, &MAX_HEART_RATE_RANGE)?;

        if !self.oldpeak.is_finite() || !OLDPEAK_RANGE.contains(&self.oldpeak) {
            return Err(PredictorError::invalid(
                "oldpeak",
                format!(
                    "{} is outside {:.1}..={:.1}",
                    self.oldpeak,
                    OLDPEAK_RANGE.start(),
                    OLDPEAK_RANGE.end()
                ),
            ));
        }
        let tenths = self.oldpeak * 10.0;
        if (tenths - tenths.round()).abs() > 1e-6 {
            return Err(PredictorError::invalid(
                "oldpeak",
                format!("{} is not a multiple of 0.1", self.oldpeak),
            ));
        }

        Ok(())
    }
}

fn check_range(field: &'static str, value: u32, range: &RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(PredictorError::invalid(
            field,
            format!("{} is outside {}..={}", value, range.start(), range.end()),
        ))
    }
}

impl Default for ClinicalInput {
    /// Initial state of the input form
    fn default() -> Self {
        Self {
            age: 50,
            sex: Sex::Female,
            chest_pain_type: ChestPainType::TypicalAngina,
            resting_bp: 120,
            cholesterol: 200,
            fasting_blood_sugar: FastingBloodSugar::Le120,
            resting_ecg: RestingEcg::Normal,
            max_heart_rate: 150,
            exercise_angina: ExerciseAngina::No,
            oldpeak: 1.0,
            st_slope: StSlope::Upward,
        }
    }
}
