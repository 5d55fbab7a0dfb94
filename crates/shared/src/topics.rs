//! Keyword-based research topic classification.

pub const OTHER: &str = "Other";

/// Topics in display order, each with the lowercase substrings that select it.
/// Short stems ("metabol", "bronch") are intentional prefix matches.
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Cardiovascular",
        &[
            "cardiovascular", "cardiac", "heart", "coronary", "atrial", "aortic",
            "atherosclerosis", "myocardial", "echocardiograph", "vascular", "artery",
            "arterial", "carotid", "plaque", "stroke", "hypertension", "blood pressure",
            "fibrillation", "cardiometabolic",
        ],
    ),
    (
        "Respiratory",
        &[
            "pulmonary", "lung", "respiratory", "airway", "copd", "asthma", "bronch",
            "emphysema", "spirometr", "airflow", "ventilat",
        ],
    ),
    (
        "Imaging",
        &[
            "imaging", "ct ", "computed tomography", "mri", "magnetic resonance", "ccta",
            "scan", "radiograph", "angiograph", "ultrasound", "echocardiograph",
            "densitometr",
        ],
    ),
    (
        "Metabolic",
        &[
            "metabol", "diabetes", "insulin", "glucose", "lipid", "cholesterol",
            "triglyceride", "adipos", "obesity", "bmi", "body mass", "fatty liver",
            "hepatic steatosis", "nafld",
        ],
    ),
    (
        "Risk Factors",
        &[
            "risk factor", "smoking", "alcohol", "physical activity", "exercise",
            "sedentary", "diet", "sleep", "socioeconomic", "education", "lifestyle",
            "occupation",
        ],
    ),
    (
        "Biomarkers",
        &[
            "biomarker", "proteom", "genom", "genetic", "snp", "gwas", "polygenic",
            "mendelian", "transcriptom", "metabolom", "troponin", "nt-probnp", "crp",
            "interleukin", "cytokine",
        ],
    ),
    (
        "Mental Health",
        &[
            "mental", "depression", "anxiety", "psychiatric", "psychological", "stress",
            "wellbeing", "well-being", "insomnia", "cogniti",
        ],
    ),
];

pub fn classify_topics(title: &str, abstract_text: &str) -> Vec<String> {
    let text = format!("{} {}", title, abstract_text).to_lowercase();

    let topics: Vec<String> = TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(topic, _)| topic.to_string())
        .collect();

    if topics.is_empty() {
        vec![OTHER.to_string()]
    } else {
        topics
    }
}
