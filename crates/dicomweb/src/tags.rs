//! DICOM tags in the notation of the DICOM JSON model.

pub const PATIENT_ID: &str = "00100020";
pub const PATIENT_NAME: &str = "00100010";
pub const STUDY_DESCRIPTION: &str = "00081030";
pub const STUDY_INSTANCE_UID: &str = "0020000D";
pub const MODALITY: &str = "00080060";
pub const SERIES_DESCRIPTION: &str = "0008103E";
pub const SERIES_INSTANCE_UID: &str = "0020000E";
pub const SOP_INSTANCE_UID: &str = "00080018";
pub const INSTANCE_NUMBER: &str = "00200013";
