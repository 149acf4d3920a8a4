//! The classification collaborator and the two requests it accepts.
//!
//! Both calls hit the same endpoint. A preview call carries only the image
//! and detection type and must never be persisted; a submission call adds
//! the user's verification answers and is persisted.

use async_trait::async_trait;
use phytoscan_core::{DetectionType, LocationData};
use serde_json::Value;

use crate::http::ClientError;

/// Remote classifier. Responses are returned raw; shape handling belongs
/// to the normalizer.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Value, ClientError>;

    async fn submit(&self, request: &SubmissionRequest) -> Result<Value, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub image: Vec<u8>,
    pub file_name: String,
    pub detection_type: DetectionType,
    /// `true` guarantees the collaborator persists nothing.
    pub preview: bool,
}

impl ClassificationRequest {
    pub fn preview(image: Vec<u8>, detection_type: DetectionType) -> Self {
        Self {
            image,
            file_name: "image.jpg".into(),
            detection_type,
            preview: true,
        }
    }

    /// Text fields of the multipart form. The image travels as its own part.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("detection_type", self.detection_type.to_string()),
            ("preview_only", self.preview.to_string()),
        ]
    }
}

/// Persisted submission of a verified detection.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRequest {
    pub image: Vec<u8>,
    pub file_name: String,
    pub detection_type: DetectionType,
    pub is_detection_correct: bool,
    pub user_feedback: Option<String>,
    pub selected_symptoms: Option<Vec<String>>,
    pub primary_symptoms: Option<Vec<String>>,
    pub alternative_symptoms: Option<Vec<String>>,
    pub detected_disease: Option<String>,
    pub top_diseases: Option<Value>,
    pub symptoms_data: Option<Value>,
    pub location: Option<LocationData>,
    pub location_accuracy_confirmed: bool,
}

impl SubmissionRequest {
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("detection_type", self.detection_type.to_string()),
            ("preview_only", "false".to_string()),
            ("is_detection_correct", self.is_detection_correct.to_string()),
        ];

        if let Some(feedback) = self.user_feedback.as_deref().filter(|f| !f.is_empty()) {
            fields.push(("user_feedback", feedback.to_string()));
        }
        for (name, list) in [
            ("selected_symptoms", &self.selected_symptoms),
            ("primary_symptoms", &self.primary_symptoms),
            ("alternative_symptoms", &self.alternative_symptoms),
        ] {
            if let Some(list) = list {
                fields.push((name, Value::from(list.clone()).to_string()));
            }
        }
        if let Some(disease) = &self.detected_disease {
            fields.push(("detected_disease", disease.clone()));
        }
        if let Some(top) = &self.top_diseases {
            fields.push(("top_diseases", top.to_string()));
        }
        if let Some(data) = &self.symptoms_data {
            fields.push(("symptoms_data", data.to_string()));
        }

        match &self.location {
            Some(location) => {
                fields.push(("latitude", location.latitude.to_string()));
                fields.push(("longitude", location.longitude.to_string()));
                fields.push(("location_source", location.source.to_string()));
                fields.push((
                    "location_accuracy_confirmed",
                    self.location_accuracy_confirmed.to_string(),
                ));
                if let Some(address) = &location.address {
                    fields.push(("location_address", address.clone()));
                }
            }
            None => fields.push(("location_consent_given", "false".to_string())),
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use phytoscan_core::LocationSource;
    use serde_json::json;

    use super::*;

    fn field<'a>(fields: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn preview_request_is_flagged() {
        let req = ClassificationRequest::preview(vec![1, 2, 3], DetectionType::Fruit);
        let fields = req.form_fields();
        assert_eq!(field(&fields, "detection_type"), Some("fruit"));
        assert_eq!(field(&fields, "preview_only"), Some("true"));
    }

    #[test]
    fn submission_without_location_withholds_consent() {
        let req = SubmissionRequest {
            is_detection_correct: true,
            selected_symptoms: Some(vec!["Premature fruit drop".into()]),
            top_diseases: Some(json!([{ "disease": "Anthracnose", "confidence": 85.3 }])),
            ..Default::default()
        };
        let fields = req.form_fields();
        assert_eq!(field(&fields, "preview_only"), Some("false"));
        assert_eq!(field(&fields, "is_detection_correct"), Some("true"));
        assert_eq!(
            field(&fields, "selected_symptoms"),
            Some(r#"["Premature fruit drop"]"#)
        );
        assert_eq!(field(&fields, "location_consent_given"), Some("false"));
        assert!(field(&fields, "latitude").is_none());
        assert!(field(&fields, "user_feedback").is_none());
    }

    #[test]
    fn submission_with_location_sends_coordinates() {
        let req = SubmissionRequest {
            is_detection_correct: false,
            user_feedback: Some("spots look different".into()),
            location: Some(
                LocationData::new(14.5995, 120.9842, LocationSource::DeviceGps)
                    .with_address("Manila"),
            ),
            location_accuracy_confirmed: true,
            ..Default::default()
        };
        let fields = req.form_fields();
        assert_eq!(field(&fields, "is_detection_correct"), Some("false"));
        assert_eq!(field(&fields, "user_feedback"), Some("spots look different"));
        assert_eq!(field(&fields, "latitude"), Some("14.5995"));
        assert_eq!(field(&fields, "location_source"), Some("device_gps"));
        assert_eq!(field(&fields, "location_accuracy_confirmed"), Some("true"));
        assert_eq!(field(&fields, "location_address"), Some("Manila"));
        assert!(field(&fields, "location_consent_given").is_none());
    }
}
