// 🐄 Record types for the two tables: Calf Registry + Treatment Log
//
// Dates are kept as the DD/MM/YYYY text found on disk and parsed on demand,
// so a bad value in one row only surfaces where a transform needs the date.

use crate::error::{RecordError, RecordResult};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// On-disk date format for every date column
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const CALF_COLUMNS: [&str; 8] = [
    "Propriedade",
    "Brinco",
    "Nascimento",
    "Brinco mãe",
    "Peso",
    "Altura",
    "Vol. Colostro",
    "Brix",
];

pub const TREATMENT_COLUMNS: [&str; 9] = [
    "Propriedade",
    "Brinco da Bezerra",
    "Razão do Tratamento",
    "Tipo de Medicamento",
    "Nome do Medicamento",
    "Dose",
    "Data da 1ª Dose",
    "Nº de Doses",
    "Responsável",
];

pub fn format_br_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_br_date(field: &'static str, value: &str) -> RecordResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| RecordError::parse(field, value))
}

// ============================================================================
// TABLE RECORD TRAIT
// ============================================================================

/// A row type stored in one of the flat `;`-delimited tables
pub trait TableRecord: Serialize + DeserializeOwned + Clone {
    /// Canonical header, in file order
    const COLUMNS: &'static [&'static str];

    /// Human name used in notices ("tratamentos", "cadastro de bezerras")
    const LABEL: &'static str;

    /// Value of the `Propriedade` column
    fn property(&self) -> &str;
}

// ============================================================================
// CALF RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalfRecord {
    #[serde(rename = "Propriedade")]
    pub property: String,

    #[serde(rename = "Brinco")]
    pub ear_tag: String,

    #[serde(rename = "Nascimento")]
    pub birth_date: String,

    #[serde(rename = "Brinco mãe")]
    pub mother_ear_tag: String,

    #[serde(rename = "Peso")]
    pub weight_kg: f64,

    #[serde(rename = "Altura")]
    pub height_cm: f64,

    #[serde(rename = "Vol. Colostro")]
    pub colostrum_volume: f64,

    #[serde(rename = "Brix")]
    pub brix_score: f64,
}

impl CalfRecord {
    /// Create a calf as submitted from a registration form
    pub fn new(property: impl Into<String>, ear_tag: impl Into<String>, birth_date: NaiveDate) -> Self {
        CalfRecord {
            property: property.into(),
            ear_tag: ear_tag.into(),
            birth_date: format_br_date(birth_date),
            mother_ear_tag: String::new(),
            weight_kg: 0.0,
            height_cm: 0.0,
            colostrum_volume: 0.0,
            brix_score: 0.0,
        }
    }

    /// Builder pattern: add mother's ear tag
    pub fn with_mother(mut self, mother_ear_tag: impl Into<String>) -> Self {
        self.mother_ear_tag = mother_ear_tag.into();
        self
    }

    /// Builder pattern: add weight (kg) and height (cm)
    pub fn with_measurements(mut self, weight_kg: f64, height_cm: f64) -> Self {
        self.weight_kg = weight_kg;
        self.height_cm = height_cm;
        self
    }

    /// Builder pattern: add colostrum volume and Brix score
    pub fn with_colostrum(mut self, volume: f64, brix_score: f64) -> Self {
        self.colostrum_volume = volume;
        self.brix_score = brix_score;
        self
    }

    pub fn birth_day(&self) -> RecordResult<NaiveDate> {
        parse_br_date("Nascimento", &self.birth_date)
    }
}

impl TableRecord for CalfRecord {
    const COLUMNS: &'static [&'static str] = &CALF_COLUMNS;
    const LABEL: &'static str = "cadastro de bezerras";

    fn property(&self) -> &str {
        &self.property
    }
}

// ============================================================================
// TREATMENT RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    #[serde(rename = "Propriedade")]
    pub property: String,

    /// Reference to `CalfRecord::ear_tag` (not enforced)
    #[serde(rename = "Brinco da Bezerra")]
    pub calf_ear_tag: String,

    #[serde(rename = "Razão do Tratamento")]
    pub reason: String,

    #[serde(rename = "Tipo de Medicamento")]
    pub medication_type: String,

    #[serde(rename = "Nome do Medicamento")]
    pub medication_name: String,

    /// Free text ("5 ml", "2 comprimidos")
    #[serde(rename = "Dose")]
    pub dose: String,

    #[serde(rename = "Data da 1ª Dose")]
    pub first_dose_date: String,

    #[serde(rename = "Nº de Doses")]
    pub dose_count: u32,

    #[serde(rename = "Responsável")]
    pub responsible: String,
}

impl TreatmentRecord {
    pub fn new(
        property: impl Into<String>,
        calf_ear_tag: impl Into<String>,
        reason: impl Into<String>,
        first_dose_date: NaiveDate,
    ) -> Self {
        TreatmentRecord {
            property: property.into(),
            calf_ear_tag: calf_ear_tag.into(),
            reason: reason.into(),
            medication_type: String::new(),
            medication_name: String::new(),
            dose: String::new(),
            first_dose_date: format_br_date(first_dose_date),
            dose_count: 1,
            responsible: String::new(),
        }
    }

    /// Builder pattern: medication type, name and free-text dose
    pub fn with_medication(
        mut self,
        medication_type: impl Into<String>,
        medication_name: impl Into<String>,
        dose: impl Into<String>,
    ) -> Self {
        self.medication_type = medication_type.into();
        self.medication_name = medication_name.into();
        self.dose = dose.into();
        self
    }

    pub fn with_dose_count(mut self, dose_count: u32) -> Self {
        self.dose_count = dose_count;
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = responsible.into();
        self
    }

    pub fn first_dose_day(&self) -> RecordResult<NaiveDate> {
        parse_br_date("Data da 1ª Dose", &self.first_dose_date)
    }
}

impl TableRecord for TreatmentRecord {
    const COLUMNS: &'static [&'static str] = &TREATMENT_COLUMNS;
    const LABEL: &'static str = "tratamentos";

    fn property(&self) -> &str {
        &self.property
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_dates_are_formatted_day_first() {
        let calf = CalfRecord::new("Fazenda A", "001", day(2023, 1, 5));
        assert_eq!(calf.birth_date, "05/01/2023");
        assert_eq!(calf.birth_day().unwrap(), day(2023, 1, 5));
    }

    #[test]
    fn test_parse_rejects_non_dates() {
        let err = parse_br_date("Data da 1ª Dose", "not-a-date").unwrap_err();
        assert!(matches!(err, RecordError::Parse { field: "Data da 1ª Dose", .. }));

        // month-first input is not silently accepted
        assert!(parse_br_date("Nascimento", "12/31/2023").is_err());
    }

    #[test]
    fn test_calf_builder() {
        let calf = CalfRecord::new("Fazenda A", "001", day(2023, 1, 1))
            .with_mother("M-17")
            .with_measurements(38.5, 74.0)
            .with_colostrum(4.0, 24.5);

        assert_eq!(calf.mother_ear_tag, "M-17");
        assert_eq!(calf.weight_kg, 38.5);
        assert_eq!(calf.height_cm, 74.0);
        assert_eq!(calf.colostrum_volume, 4.0);
        assert_eq!(calf.brix_score, 24.5);
    }

    #[test]
    fn test_treatment_builder_defaults_to_one_dose() {
        let t = TreatmentRecord::new("Fazenda A", "001", "Diarreia", day(2023, 1, 15));
        assert_eq!(t.dose_count, 1);
        assert_eq!(t.first_dose_date, "15/01/2023");

        let t = t
            .with_medication("Antibiótico", "Enrofloxacina", "5 ml")
            .with_dose_count(3)
            .with_responsible("João");
        assert_eq!(t.dose_count, 3);
        assert_eq!(t.dose, "5 ml");
        assert_eq!(t.responsible, "João");
    }

    #[test]
    fn test_canonical_columns() {
        assert_eq!(CalfRecord::COLUMNS.len(), 8);
        assert_eq!(TreatmentRecord::COLUMNS.len(), 9);
        assert_eq!(TreatmentRecord::COLUMNS[6], "Data da 1ª Dose");
    }
}
