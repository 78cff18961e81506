//! Composition wire formats.
//!
//! EHRbase accepts and returns compositions in three encodings. The labs mostly use the
//! "simplified JSON flat" format, where every leaf of the composition is a key such as
//! `basic/temperature/temperature|magnitude`.

use crate::{OpenEhrError, OpenEhrResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{Map, Value};

/// File formats supported by the openEHR REST API for compositions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CompositionFormat {
    CanonicalJson,
    #[default]
    SimplifiedJsonFlat,
    SimplifiedJsonStructured,
}

impl CompositionFormat {
    /// Value of the `format` query parameter of the EHRbase `ecis` endpoints.
    pub(crate) fn ecis_name(self) -> Option<&'static str> {
        match self {
            CompositionFormat::CanonicalJson => None,
            CompositionFormat::SimplifiedJsonFlat => Some("FLAT"),
            CompositionFormat::SimplifiedJsonStructured => Some("STRUCTURED"),
        }
    }
}

/// A composition in simplified flat JSON: path → value.
pub type FlatComposition = Map<String, Value>;

/// A composition as returned by `GET /ecis/v1/composition/{uid}?format=FLAT`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredComposition {
    pub composition_uid: String,
    pub ehr_id: String,
    pub template_id: String,
    #[serde(default)]
    pub composition: FlatComposition,
}

impl StoredComposition {
    /// Parse the JSON envelope returned by the `ecis` composition endpoint.
    ///
    /// Errors report the path of the first offending field.
    pub fn from_value(value: Value) -> OpenEhrResult<Self> {
        serde_path_to_error::deserialize::<_, StoredComposition>(value).map_err(|err| {
            let path = err.path().to_string();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            OpenEhrError::InvalidResponse(format!(
                "composition schema mismatch at {path}: {}",
                err.into_inner()
            ))
        })
    }

    pub fn field(&self, path: &str) -> Option<&Value> {
        self.composition.get(path)
    }

    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    pub fn f64_field(&self, path: &str) -> Option<f64> {
        self.field(path).and_then(Value::as_f64)
    }
}

/// Fill a `DV_MULTIMEDIA` field of a flat composition with inline content.
///
/// Any previous `<field>/content` entry is replaced by the `|size`, `|data` (base64) and
/// `|mediatype` attributes.
pub fn set_multimedia_content_into_flat(
    composition: &mut FlatComposition,
    field: &str,
    content: &[u8],
    mime_type: &str,
) {
    composition.remove(&format!("{field}/content"));
    composition.insert(format!("{field}/content|size"), Value::from(content.len()));
    composition.insert(
        format!("{field}/content|data"),
        Value::from(BASE64.encode(content)),
    );
    composition.insert(format!("{field}/content|mediatype"), Value::from(mime_type));
}

/// Retrieve the inline content of a `DV_MULTIMEDIA` field of a flat composition.
pub fn get_multimedia_content_from_flat(
    composition: &FlatComposition,
    field: &str,
) -> OpenEhrResult<Vec<u8>> {
    let data = composition
        .get(&format!("{field}/content|data"))
        .and_then(Value::as_str)
        .ok_or_else(|| OpenEhrError::Multimedia(format!("{field}: missing content|data")))?;
    let size = composition
        .get(&format!("{field}/content|size"))
        .and_then(Value::as_u64)
        .ok_or_else(|| OpenEhrError::Multimedia(format!("{field}: missing content|size")))?;
    decode_checked(data, size)
}

/// Fill a `DV_MULTIMEDIA` field of a structured composition.
///
/// `field` must be the one-element array that the structured format uses for the element.
pub fn set_multimedia_content_into_structured(
    field: &mut Value,
    content: &[u8],
    mime_type: &str,
) -> OpenEhrResult<()> {
    let element = single_element_mut(field)?;
    let object = element
        .as_object_mut()
        .ok_or_else(|| OpenEhrError::Multimedia("structured element is not an object".into()))?;
    object.insert(
        "content".into(),
        serde_json::json!([{
            "|size": content.len(),
            "|data": BASE64.encode(content),
            "|mediatype": mime_type,
        }]),
    );
    Ok(())
}

/// Retrieve the inline content of a `DV_MULTIMEDIA` field of a structured composition.
pub fn get_multimedia_content_from_structured(field: &Value) -> OpenEhrResult<Vec<u8>> {
    let elements = field
        .as_array()
        .filter(|a| a.len() == 1)
        .ok_or_else(|| OpenEhrError::Multimedia("expected exactly one element".into()))?;
    let contents = elements[0]
        .get("content")
        .and_then(Value::as_array)
        .filter(|a| a.len() == 1)
        .ok_or_else(|| OpenEhrError::Multimedia("expected exactly one content item".into()))?;
    let data = contents[0]
        .get("|data")
        .and_then(Value::as_str)
        .ok_or_else(|| OpenEhrError::Multimedia("missing |data".into()))?;
    let size = contents[0]
        .get("|size")
        .and_then(Value::as_u64)
        .ok_or_else(|| OpenEhrError::Multimedia("missing |size".into()))?;
    decode_checked(data, size)
}

fn single_element_mut(field: &mut Value) -> OpenEhrResult<&mut Value> {
    match field.as_array_mut() {
        Some(items) if items.len() == 1 => Ok(&mut items[0]),
        _ => Err(OpenEhrError::Multimedia(
            "expected exactly one element".into(),
        )),
    }
}

fn decode_checked(data: &str, size: u64) -> OpenEhrResult<Vec<u8>> {
    let content = BASE64
        .decode(data)
        .map_err(|e| OpenEhrError::Multimedia(format!("invalid base64: {e}")))?;
    if content.len() as u64 != size {
        return Err(OpenEhrError::Multimedia(format!(
            "declared size {size} does not match decoded size {}",
            content.len()
        )));
    }
    Ok(content)
}
