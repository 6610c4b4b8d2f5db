use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Human-readable description of a classifier label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TumorInfo {
    pub display_name: Cow<'static, str>,
    pub location: &'static str,
    pub severity: &'static str,
    pub description: &'static str,
}

static TUMOR_TABLE: LazyLock<HashMap<&'static str, TumorInfo>> = LazyLock::new(|| {
    HashMap::from([
        (
            "glioma_tumor",
            TumorInfo {
                display_name: Cow::Borrowed("Glioma Tumor"),
                location: "Glioma usually occurs in the brain or spinal cord and arises from glial cells.",
                severity: "High – considered dangerous and may be malignant.",
                description: "Glioma is a serious type of brain tumor that can grow aggressively and may affect \
                    brain function, causing headaches, seizures, personality changes, and other neurological symptoms. \
                    Early medical evaluation and treatment are very important.",
            },
        ),
        (
            "meningioma_tumor",
            TumorInfo {
                display_name: Cow::Borrowed("Meningioma Tumor"),
                location: "Meningioma arises from the meninges – the protective membranes covering the brain and spinal cord.",
                severity: "Moderate – often slow-growing and sometimes operable.",
                description: "Meningioma is usually a slow-growing tumor that may remain silent for a long time. \
                    It can cause headaches, weakness, or vision problems depending on its size and location. \
                    Many meningiomas are benign but still need medical supervision.",
            },
        ),
        (
            "pituitary_tumor",
            TumorInfo {
                display_name: Cow::Borrowed("Pituitary Tumor"),
                location: "Pituitary tumor is found in the pituitary gland at the base of the brain.",
                severity: "Low to Moderate – often non-cancerous but can affect hormones.",
                description: "Pituitary tumors are commonly benign but can disturb hormone levels, leading to fatigue, \
                    weight changes, vision problems, or other hormonal symptoms. \
                    Treatment depends on size, type, and hormone activity.",
            },
        ),
        (
            "no_tumor",
            TumorInfo {
                display_name: Cow::Borrowed("No Tumor Detected"),
                location: "No tumor region identified in the visible brain MRI scan.",
                severity: "None – no tumor detected by the AI model.",
                description: "The AI model did not detect any tumor-like abnormality in this MRI scan. \
                    However, if symptoms persist, you should still consult a qualified doctor for a full evaluation.",
            },
        ),
    ])
});

impl TumorInfo {
    /// Table entry for `label`, or the generic entry named after the raw label.
    pub fn lookup(label: &str) -> TumorInfo {
        TUMOR_TABLE
            .get(label)
            .cloned()
            .unwrap_or_else(|| TumorInfo::fallback(label))
    }

    pub fn fallback(label: &str) -> TumorInfo {
        let display_name = if label.is_empty() {
            Cow::Borrowed("Unknown")
        } else {
            Cow::Owned(title_case(&label.replace('_', " ")))
        };
        TumorInfo {
            display_name,
            location: "Information not available.",
            severity: "Unknown",
            description: "No detailed description available for this condition.",
        }
    }

    pub fn is_known(label: &str) -> bool {
        TUMOR_TABLE.contains_key(label)
    }
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
