//! Known Ollama models, grouped by family

/// A model family offered by the interactive front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelFamily {
    /// Display label
    pub label: &'static str,
    /// Tag prefix shared by the family's models
    pub prefix: &'static str,
    pub description: &'static str,
    /// Ollama model identifiers
    pub models: &'static [&'static str],
}

pub const MODEL_FAMILIES: &[ModelFamily] = &[
    ModelFamily {
        label: "Qwen 3",
        prefix: "qwen3",
        description: "Latest Qwen 3 (2025)",
        models: &["qwen3:latest", "qwen3:8b", "qwen3-coder:latest"],
    },
    ModelFamily {
        label: "Qwen 2.5",
        prefix: "qwen2.5",
        description: "Stable & reliable",
        models: &["qwen2.5:latest", "qwen2.5:7b", "qwen2.5:3b", "qwen2.5-coder:latest"],
    },
    ModelFamily {
        label: "DeepSeek",
        prefix: "deepseek-r1",
        description: "Advanced reasoning",
        models: &["deepseek-r1:latest", "deepseek-r1:8b"],
    },
    ModelFamily {
        label: "Llama 3.2",
        prefix: "llama3.2",
        description: "Fast & efficient",
        models: &["llama3.2:latest"],
    },
    ModelFamily {
        label: "Llama 3.1",
        prefix: "llama3.1",
        description: "Powerful Llama",
        models: &["llama3.1:latest"],
    },
    ModelFamily {
        label: "Mistral",
        prefix: "mistral",
        description: "Fast performance",
        models: &["mistral:latest"],
    },
    ModelFamily {
        label: "Gemma 3",
        prefix: "gemma3",
        description: "Latest Gemma 3",
        models: &["gemma3:latest"],
    },
    ModelFamily {
        label: "Gemma 2",
        prefix: "gemma2",
        description: "Stable Gemma 2",
        models: &["gemma2:latest"],
    },
    ModelFamily {
        label: "Phi 4",
        prefix: "phi4",
        description: "Latest Phi 4 (2025)",
        models: &["phi4:latest"],
    },
    ModelFamily {
        label: "Phi 3",
        prefix: "phi3",
        description: "Efficient Phi 3",
        models: &["phi3.5:latest", "phi3:latest"],
    },
    ModelFamily {
        label: "GPT-OSS",
        prefix: "gpt-oss",
        description: "OpenAI-style (Open Source)",
        models: &["gpt-oss:latest", "gpt-oss:20b"],
    },
];

const UNKNOWN_MODEL: &str = "Ollama model";

/// Family a model identifier belongs to, by tag prefix
pub fn family_of(model: &str) -> Option<&'static ModelFamily> {
    let model = model.trim();
    MODEL_FAMILIES.iter().find(|family| model.starts_with(family.prefix))
}

/// One-line description of a model
pub fn describe(model: &str) -> &'static str {
    family_of(model).map_or(UNKNOWN_MODEL, |family| family.description)
}

/// Every catalogued model identifier, in display order
pub fn all_models() -> impl Iterator<Item = &'static str> {
    MODEL_FAMILIES.iter().flat_map(|family| family.models.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_by_prefix() {
        assert_eq!(describe("qwen2.5:7b"), "Stable & reliable");
        assert_eq!(describe("qwen3-coder:latest"), "Latest Qwen 3 (2025)");
        assert_eq!(describe("phi3.5:latest"), "Efficient Phi 3");
        assert_eq!(describe("deepseek-r1:8b"), "Advanced reasoning");
    }

    #[test]
    fn test_unknown_model() {
        assert_eq!(describe("tinyllama:latest"), "Ollama model");
        assert!(family_of("").is_none());
    }

    #[test]
    fn test_catalog_contents() {
        let models: Vec<_> = all_models().collect();
        assert_eq!(models.len(), 19);
        assert!(models.contains(&"qwen2.5:7b"));
        for model in models {
            assert!(family_of(model).is_some(), "{} has no family", model);
        }
    }
}
