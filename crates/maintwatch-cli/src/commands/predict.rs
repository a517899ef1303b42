//! `maintwatch predict`: classify one feature vector.

use maintwatch_core::{
    FEATURE_LAYOUT, FeatureVector, FieldIssue, FieldProblem, InferenceError, MonitorConfig,
};

/// Feature input from the command line.
pub struct PredictInput {
    /// JSON object; takes precedence over `fields`.
    pub json: Option<String>,
    /// Individual flags in layout order.
    pub fields: [Option<f64>; 4],
}

impl PredictInput {
    /// Build a feature vector, naming every missing or invalid field.
    pub fn to_features(&self) -> Result<FeatureVector, String> {
        if let Some(text) = &self.json {
            let body: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| format!("--features is not valid JSON: {e}"))?;
            return FeatureVector::from_json(&body).map_err(|e| e.to_string());
        }

        let issues: Vec<FieldIssue> = FEATURE_LAYOUT
            .iter()
            .zip(self.fields)
            .filter(|(_, value)| value.is_none())
            .map(|(&field, _)| FieldIssue {
                field,
                problem: FieldProblem::Missing,
            })
            .collect();
        if !issues.is_empty() {
            return Err(InferenceError::InvalidFeatureVector { issues }.to_string());
        }
        let [a, b, c, d] = self.fields.map(Option::unwrap_or_default);
        let vector = FeatureVector::new(a, b, c, d);
        vector.validate().map_err(|e| e.to_string())?;
        Ok(vector)
    }
}

pub fn run(config: &MonitorConfig, input: PredictInput) {
    let features = input
        .to_features()
        .unwrap_or_else(|e| super::fail("reading features", e));
    let service = super::load_service(config);

    match service.predict(&features) {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => super::fail("encoding result", e),
        },
        Err(e @ InferenceError::InvalidFeatureVector { .. }) => super::fail("invalid input", e),
        Err(e) => super::fail("prediction", e),
    }
}
