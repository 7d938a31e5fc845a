use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One parsed CSV row, ready to be inserted.
///
/// Every field is nullable: malformed source values become `None` instead of
/// rejecting the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionRecord {
    pub notification_id: Option<String>,
    pub notification_date: Option<NaiveDate>,
    pub onset_date: Option<NaiveDate>,
    pub state_code: Option<String>,
    pub municipality_code: Option<String>,
    pub sex: Option<String>,
    pub age: Option<i32>,
    pub outcome: Option<i32>,
    pub icu: Option<i32>,
    pub icu_entry_date: Option<NaiveDate>,
    pub icu_exit_date: Option<NaiveDate>,
    pub vaccinated: Option<i32>,
    pub dose1_date: Option<NaiveDate>,
    pub dose2_date: Option<NaiveDate>,
    pub booster_date: Option<NaiveDate>,
}

/// A persisted row of the `srag` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SragRecord {
    pub id: Uuid,
    pub notification_id: Option<String>,
    pub notification_date: Option<NaiveDate>,
    pub onset_date: Option<NaiveDate>,
    pub state_code: Option<String>,
    pub municipality_code: Option<String>,
    pub sex: Option<String>,
    pub age: Option<i32>,
    pub outcome: Option<i32>,
    pub icu: Option<i32>,
    pub icu_entry_date: Option<NaiveDate>,
    pub icu_exit_date: Option<NaiveDate>,
    pub vaccinated: Option<i32>,
    pub dose1_date: Option<NaiveDate>,
    pub dose2_date: Option<NaiveDate>,
    pub booster_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl SragRecord {
    pub fn from_ingestion(record: IngestionRecord, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            notification_id: record.notification_id,
            notification_date: record.notification_date,
            onset_date: record.onset_date,
            state_code: record.state_code,
            municipality_code: record.municipality_code,
            sex: record.sex,
            age: record.age,
            outcome: record.outcome,
            icu: record.icu,
            icu_entry_date: record.icu_entry_date,
            icu_exit_date: record.icu_exit_date,
            vaccinated: record.vaccinated,
            dose1_date: record.dose1_date,
            dose2_date: record.dose2_date,
            booster_date: record.booster_date,
            created_at,
        }
    }

    pub fn facts(&self) -> CaseFacts {
        CaseFacts {
            onset_date: self.onset_date,
            outcome: self.outcome,
            icu: self.icu,
            vaccinated: self.vaccinated,
            state_code: self.state_code.clone(),
            municipality_code: self.municipality_code.clone(),
        }
    }
}

/// Projection of a stored row carrying only what chart and metrics need.
#[derive(Debug, Clone, Default, PartialEq, FromRow)]
pub struct CaseFacts {
    pub onset_date: Option<NaiveDate>,
    pub outcome: Option<i32>,
    pub icu: Option<i32>,
    pub vaccinated: Option<i32>,
    pub state_code: Option<String>,
    pub municipality_code: Option<String>,
}

impl CaseFacts {
    pub fn is_death(&self) -> bool {
        Outcome::from_code(self.outcome) == Some(Outcome::Death)
    }

    pub fn in_icu(&self) -> bool {
        YesNoUnknown::from_code(self.icu) == Some(YesNoUnknown::Yes)
    }

    pub fn is_vaccinated(&self) -> bool {
        YesNoUnknown::from_code(self.vaccinated) == Some(YesNoUnknown::Yes)
    }
}

/// `EVOLUCAO` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Cure = 1,
    Death = 2,
    DeathOtherCauses = 3,
}

impl Outcome {
    pub fn from_code(code: Option<i32>) -> Option<Self> {
        match code? {
            1 => Some(Outcome::Cure),
            2 => Some(Outcome::Death),
            3 => Some(Outcome::DeathOtherCauses),
            _ => None,
        }
    }
}

/// `UTI` and `VACINA_COV` columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNoUnknown {
    Yes = 1,
    No = 2,
    Unknown = 9,
}

impl YesNoUnknown {
    pub fn from_code(code: Option<i32>) -> Option<Self> {
        match code? {
            1 => Some(YesNoUnknown::Yes),
            2 => Some(YesNoUnknown::No),
            9 => Some(YesNoUnknown::Unknown),
            _ => None,
        }
    }
}
