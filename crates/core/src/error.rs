use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum MyopiaError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid clinic settings: {0}")]
    InvalidSettings(String),
    #[error("treatment colour map has no entry for '{0}'")]
    MissingTreatmentColor(String),
    #[error("invalid colour: {0}")]
    InvalidColour(#[from] myopia_types::TypesError),

    #[error("patient not found: {0}")]
    PatientNotFound(Uuid),
    #[error("visit {visit} refers to unknown patient {patient}")]
    VisitOrphaned { visit: Uuid, patient: Uuid },
    #[error("visits out of order: current visit ({current}) precedes previous visit ({previous})")]
    VisitsOutOfOrder {
        previous: NaiveDate,
        current: NaiveDate,
    },
    #[error("record store lock poisoned")]
    StoreLock,

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to serialize JSON: {0}")]
    JsonSerialization(serde_json::Error),
}

pub type MyopiaResult<T> = std::result::Result<T, MyopiaError>;
