//! Disease background and treatment text shown alongside a final result.

use phytoscan_core::config::UNKNOWN_DISEASE;

struct Advice {
    disease: &'static str,
    info: &'static str,
    treatment: &'static str,
}

const ADVICE: &[Advice] = &[
    Advice {
        disease: "Anthracnose",
        info: "A fungal disease that causes dark, sunken spots on leaves and fruits. It thrives in warm, humid conditions and can significantly reduce fruit quality.",
        treatment: "Apply copper-based fungicides and improve air circulation. Remove infected plant parts and avoid overhead watering.",
    },
    Advice {
        disease: "Bacterial Canker",
        info: "A bacterial infection that causes cankers on stems and branches, leading to wilting and dieback. Early detection is crucial for management.",
        treatment: "Prune infected branches, apply copper bactericides, and improve plant hygiene. Avoid wounding during wet conditions.",
    },
    Advice {
        disease: "Cutting Weevil",
        info: "An insect pest that damages young shoots and leaves. The larvae bore into stems, causing wilting and stunted growth.",
        treatment: "Use appropriate insecticides, maintain field hygiene, and monitor regularly for early detection.",
    },
    Advice {
        disease: "Die Back",
        info: "A disease that causes branch tips to die back progressively, often starting from the ends. It can be caused by various pathogens or environmental stress.",
        treatment: "Prune affected branches, improve drainage, and apply appropriate fungicides. Ensure proper nutrition and avoid stress.",
    },
    Advice {
        disease: "Gall Midge",
        info: "Small fly larvae that cause galls on leaves and shoots, leading to deformed growth and reduced plant vigor.",
        treatment: "Use systemic insecticides, maintain field sanitation, and monitor for adult flies during peak activity periods.",
    },
    Advice {
        disease: "Healthy",
        info: "No disease detected. The plant appears healthy; continue with regular care and monitoring.",
        treatment: "Continue regular care including proper watering, fertilization, and monitoring for early signs of problems.",
    },
    Advice {
        disease: "Powdery Mildew",
        info: "A fungal disease that causes white, powdery coating on leaves and shoots. It can reduce photosynthesis and fruit quality.",
        treatment: "Apply sulfur-based fungicides, improve air circulation, and avoid overhead irrigation.",
    },
    Advice {
        disease: "Sooty Mould",
        info: "Black fungal growth that develops on honeydew secreted by insects. While not directly harmful, it reduces photosynthesis.",
        treatment: "Control the underlying insect problem (aphids, scales) and wash off mould with water.",
    },
    Advice {
        disease: "Black Mold Rot",
        info: "A fungal infection that causes black mold growth on fruits, leading to rapid deterioration and spoilage.",
        treatment: "Harvest fruits at proper maturity, handle carefully to avoid wounds, and store in proper conditions.",
    },
    Advice {
        disease: "Stem end Rot",
        info: "A post-harvest disease that affects fruits at the stem end, causing rot and reducing storage life.",
        treatment: "Ensure proper fruit handling, avoid harvesting wet fruits, and maintain clean storage conditions.",
    },
    Advice {
        disease: UNKNOWN_DISEASE,
        info: "The detection confidence is too low to identify the condition accurately. Consult agricultural experts or capture a clearer image for better analysis.",
        treatment: "Consult local agricultural experts or extension services. Capture a clearer, well-lit image from different angles, monitor the plant closely, and apply general preventive care.",
    },
];

const FALLBACK_TREATMENT: &str =
    "Consult with local agricultural experts for specific treatment recommendations.";

fn find(disease: &str) -> Option<&'static Advice> {
    ADVICE.iter().find(|a| a.disease == disease)
}

pub fn disease_info(disease: &str) -> String {
    match find(disease) {
        Some(advice) => advice.info.to_string(),
        None => format!(
            "Information about {disease} is being researched. Please consult with agricultural experts for specific guidance."
        ),
    }
}

pub fn treatment(disease: &str) -> &'static str {
    find(disease).map_or(FALLBACK_TREATMENT, |a| a.treatment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_disease_has_info_and_treatment() {
        assert!(disease_info("Powdery Mildew").starts_with("A fungal disease"));
        assert!(treatment("Powdery Mildew").contains("sulfur"));
    }

    #[test]
    fn unknown_label_has_its_own_advice() {
        assert!(disease_info("Unknown").contains("too low"));
        assert!(treatment("Unknown").contains("clearer"));
    }

    #[test]
    fn unlisted_disease_gets_fallback_text() {
        assert!(disease_info("Leaf Curl").starts_with("Information about Leaf Curl"));
        assert_eq!(treatment("Leaf Curl"), FALLBACK_TREATMENT);
    }
}
